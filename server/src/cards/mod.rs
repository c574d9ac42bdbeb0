use std::collections::HashMap;

pub mod mtgjson;
pub mod scryfall;

/// Identifier of a printing, the MTGJSON uuid.
pub type CardId = String;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum Color {
    W,
    U,
    B,
    R,
    G,
}

impl Color {
    pub const ALL: [Color; 5] = [Color::W, Color::U, Color::B, Color::R, Color::G];
}

#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct Card {
    id: CardId,
    name: String,
    number: String,
    colors: Vec<Color>,

    /// Set when drawn from a foil sheet. Not part of the printing.
    pub foil: bool,
}

impl Card {
    pub fn new(id: CardId, name: String, number: String, colors: Vec<Color>) -> Self {
        Self {
            id,
            name,
            number,
            colors,
            foil: false,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn number(&self) -> &str {
        &self.number
    }

    #[cfg(test)]
    pub fn colors(&self) -> &[Color] {
        &self.colors
    }

    /// The card's colour if it has exactly one. Colourless and multicoloured
    /// cards have none.
    pub fn single_color(&self) -> Option<Color> {
        match self.colors.as_slice() {
            [color] => Some(*color),
            _ => None,
        }
    }

    /// Name as shown to players, with foils marked.
    pub fn display_name(&self) -> String {
        if self.foil {
            format!("{} *FOIL*", self.name)
        } else {
            self.name.clone()
        }
    }

    #[cfg(test)]
    pub fn sample(colors: &[Color]) -> Self {
        static ID: std::sync::atomic::AtomicUsize = std::sync::atomic::AtomicUsize::new(1);

        let id = ID.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        Self::new(
            format!("card-{id}"),
            format!("Card {id}"),
            id.to_string(),
            colors.to_vec(),
        )
    }
}

/// Card list of one set, indexed by id.
#[derive(Debug, Default)]
pub struct CardList {
    cards: Vec<Card>,
    by_id: HashMap<CardId, usize>,
}

impl CardList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, card: Card) {
        self.by_id.insert(card.id.clone(), self.cards.len());
        self.cards.push(card);
    }

    pub fn get(&self, id: &str) -> Option<&Card> {
        self.by_id.get(id).map(|&i| &self.cards[i])
    }

    pub fn size(&self) -> usize {
        self.cards.len()
    }
}

impl FromIterator<Card> for CardList {
    fn from_iter<I: IntoIterator<Item = Card>>(iter: I) -> Self {
        let mut list = Self::new();
        for card in iter {
            list.add(card);
        }
        list
    }
}

#[cfg(test)]
mod test {
    use super::{Card, CardList, Color};

    #[test]
    fn test_single_color() {
        assert_eq!(Card::sample(&[Color::G]).single_color(), Some(Color::G));
        assert_eq!(Card::sample(&[]).single_color(), None);
        assert_eq!(Card::sample(&[Color::W, Color::U]).single_color(), None);
    }

    #[test]
    fn test_display_name() {
        let mut card = Card::sample(&[Color::R]);
        assert_eq!(card.display_name(), card.name());
        card.foil = true;
        assert!(card.display_name().ends_with(" *FOIL*"));
    }

    #[test]
    fn test_card_list() {
        let a = Card::sample(&[Color::B]);
        let b = Card::sample(&[]);
        let list: CardList = vec![a.clone(), b.clone()].into_iter().collect();
        assert_eq!(list.size(), 2);
        assert_eq!(list.get(a.id()), Some(&a));
        assert_eq!(list.get(b.id()).map(Card::name), Some(b.name()));
        assert!(list.get("missing").is_none());
    }
}
