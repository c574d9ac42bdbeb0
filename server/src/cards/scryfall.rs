use crate::cards::Card;

/// Search that matches nothing, shown for an empty card list.
pub const EMPTY_POOL_URL: &str = "https://scryfall.com/search?q=cn%3A-1";

/// Build a Scryfall grid search showing exactly the given cards of a set,
/// matched by collector number.
pub fn cardlist_link(cards: &[Card], set: &str) -> String {
    if cards.is_empty() {
        return EMPTY_POOL_URL.to_string();
    }

    let numbers = cards
        .iter()
        .map(|card| format!("cn%3A{}", card.number()))
        .collect::<Vec<_>>()
        .join("+or+");

    format!(
        "https://scryfall.com/search?q=set%3A{}+%28{numbers}%29&as=grid",
        set.to_ascii_lowercase()
    )
}
