use uuid::Uuid;

use crate::cards::{scryfall::cardlist_link, Card};

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize)]
pub enum SeatStatus {
    /// No pack open, waiting on the next one.
    Waiting,
    /// A pack is open and picks are expected.
    Reviewing,
    /// The seat's pool is complete.
    Done,
}

#[derive(Clone, Debug, serde::Serialize)]
pub struct PackCard {
    /// 1-based position used by pick and reserve.
    pub number: usize,
    pub name: String,
    pub foil: bool,
}

/// What a player sees of their open pack.
#[derive(Clone, Debug, serde::Serialize)]
pub struct PackView {
    pub status: SeatStatus,
    pub round: usize,
    pub pick: usize,
    pub picks_remaining: usize,

    /// Seat that opened the pack at the start of the round.
    pub origin: Option<Uuid>,
    pub cards: Vec<PackCard>,
    pub reserved: Vec<String>,
    pub link: String,
}

impl PackView {
    pub fn title(&self) -> String {
        format!("Pack {} Pick {}", self.round, self.pick)
    }
}

pub fn pack_cards(cards: &[Card]) -> Vec<PackCard> {
    cards
        .iter()
        .enumerate()
        .map(|(i, card)| PackCard {
            number: i + 1,
            name: card.name().to_string(),
            foil: card.foil,
        })
        .collect()
}

#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct PoolEntry {
    pub count: usize,
    pub name: String,
    pub number: String,
    pub foil: bool,
}

/// A player's drafted cards, with copies of a printing grouped together.
#[derive(Clone, Debug, serde::Serialize)]
pub struct PoolView {
    pub size: usize,
    pub entries: Vec<PoolEntry>,
    pub link: String,
}

impl PoolView {
    pub fn new(pool: &[Card], set: &str) -> Self {
        let mut entries: Vec<PoolEntry> = Vec::new();
        for card in pool {
            // Foil and non foil copies of a printing are listed apart.
            match entries
                .iter_mut()
                .find(|e| e.number == card.number() && e.foil == card.foil)
            {
                Some(entry) => entry.count += 1,
                None => entries.push(PoolEntry {
                    count: 1,
                    name: card.name().to_string(),
                    number: card.number().to_string(),
                    foil: card.foil,
                }),
            }
        }

        Self {
            size: pool.len(),
            entries,
            link: cardlist_link(pool, set),
        }
    }
}

impl std::fmt::Display for PoolView {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.entries.is_empty() {
            return write!(f, "(No cards in pool yet)");
        }
        for entry in &self.entries {
            if entry.foil {
                writeln!(f, "{}x {} *FOIL*", entry.count, entry.name)?;
            } else {
                writeln!(f, "{}x {}", entry.count, entry.name)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use crate::cards::{scryfall::EMPTY_POOL_URL, Card, Color};

    use super::PoolView;

    #[test]
    fn test_pool_grouping() {
        let a = Card::sample(&[Color::W]);
        let b = Card::sample(&[Color::U]);
        let mut foil_a = a.clone();
        foil_a.foil = true;

        let view = PoolView::new(&[a.clone(), b.clone(), a.clone(), foil_a], "TST");
        assert_eq!(view.size, 4);
        assert_eq!(view.entries.len(), 3);
        assert_eq!(view.entries[0].count, 2);
        assert_eq!(view.entries[1].name, b.name());
        assert!(view.entries[2].foil);

        let text = view.to_string();
        assert!(text.starts_with(&format!("2x {}\n", a.name())));
        assert!(text.contains("*FOIL*"));
    }

    #[test]
    fn test_empty_pool() {
        let view = PoolView::new(&[], "TST");
        assert_eq!(view.link, EMPTY_POOL_URL);
        assert_eq!(view.to_string(), "(No cards in pool yet)");
    }
}
