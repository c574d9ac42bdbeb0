use std::collections::HashMap;

use rand::{distributions::WeightedIndex, prelude::Distribution, Rng};
use uuid::Uuid;

use crate::{
    cards::{Card, CardId, Color},
    catalog::SetData,
    config::SetRules,
    error::{ConfigError, Res},
};

/// A weighted pool of cards filling one kind of slot in a pack.
#[derive(Clone, Debug)]
pub struct Sheet {
    name: String,

    /// Card ids and their weights, in configured order.
    cards: Vec<(CardId, f64)>,

    pub balance_colors: bool,
    pub foil: bool,
}

impl Sheet {
    pub fn new(name: String, cards: Vec<(CardId, f64)>, balance_colors: bool, foil: bool) -> Self {
        Self {
            name,
            cards,
            balance_colors,
            foil,
        }
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    /// Selection probability of each card, in configured order. The final
    /// entry takes whatever the others leave so the total is exactly 1.
    pub fn probabilities(&self) -> Res<Vec<(&str, f64)>> {
        let malformed = |message: String| ConfigError::MalformedSheet {
            sheet: self.name.clone(),
            message,
        };

        if let Some((id, weight)) = self
            .cards
            .iter()
            .find(|(_, weight)| !weight.is_finite() || *weight <= 0.0)
        {
            return Err(malformed(format!("card {id} has weight {weight}")).into());
        }

        let total: f64 = self.cards.iter().map(|(_, weight)| weight).sum();
        if self.cards.is_empty() || total <= 0.0 {
            return Err(malformed("total weight is not positive".to_string()).into());
        }

        let mut probabilities: Vec<(&str, f64)> = self
            .cards
            .iter()
            .map(|(id, weight)| (id.as_str(), weight / total))
            .collect();
        let last = probabilities.len() - 1;
        let prefix: f64 = probabilities[..last].iter().map(|(_, p)| p).sum();
        probabilities[last].1 = 1.0 - prefix;

        Ok(probabilities)
    }
}

/// One way of filling a pack: how many cards to take from each sheet.
#[derive(Clone, Debug)]
pub struct BoosterContents {
    pub weight: f64,

    /// (sheet name, count) in pack order.
    pub sheets: Vec<(String, usize)>,
}

impl BoosterContents {
    /// Cards in a pack opened from this layout.
    pub fn size(&self) -> usize {
        self.sheets.iter().map(|(_, count)| count).sum()
    }
}

#[derive(Clone, Debug, Default)]
pub struct BoosterConfiguration {
    pub boosters: Vec<BoosterContents>,
    pub sheets: HashMap<String, Sheet>,
}

#[derive(Clone, Debug)]
pub struct Pack {
    cards: Vec<Card>,
    round: usize,
    size: usize,

    /// Seat the pack was opened by, set when the table is seeded.
    origin: Option<Uuid>,
}

impl Pack {
    pub fn new(cards: Vec<Card>, round: usize) -> Self {
        Self {
            size: cards.len(),
            cards,
            round,
            origin: None,
        }
    }

    pub fn with_origin(mut self, seat: Uuid) -> Self {
        self.origin = Some(seat);
        self
    }

    pub fn cards(&self) -> &[Card] {
        &self.cards
    }

    /// Round this pack is drafted in, counting from 1.
    pub fn round(&self) -> usize {
        self.round
    }

    /// Number of cards the pack was generated with.
    pub fn size(&self) -> usize {
        self.size
    }

    pub fn origin(&self) -> Option<Uuid> {
        self.origin
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    /// Card at a 1-based position, as players number them.
    pub fn get(&self, position: usize) -> Option<&Card> {
        position.checked_sub(1).and_then(|i| self.cards.get(i))
    }

    /// Remove the card at a 1-based position.
    pub fn take(&mut self, position: usize) -> Option<Card> {
        if position >= 1 && position <= self.cards.len() {
            Some(self.cards.remove(position - 1))
        } else {
            None
        }
    }
}

pub struct BoosterGenerator<'a> {
    set: &'a SetData,
    rules: &'a SetRules,
}

impl<'a> BoosterGenerator<'a> {
    pub fn new(set: &'a SetData, rules: &'a SetRules) -> Self {
        Self { set, rules }
    }

    /// Open one pack for the given round.
    pub fn generate<R: Rng + ?Sized>(&self, rng: &mut R, round: usize) -> Res<Pack> {
        self.generate_sized(rng, round, None)
    }

    /// Open one pack, choosing only among layouts of `size` cards if given.
    pub fn generate_sized<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        round: usize,
        size: Option<usize>,
    ) -> Res<Pack> {
        let contents = self.choose_contents(rng, size)?;

        let mut cards = Vec::new();
        for (sheet_name, count) in &contents.sheets {
            let Some(sheet) = self.set.booster.sheets.get(sheet_name) else {
                return Err(ConfigError::MalformedSheet {
                    sheet: sheet_name.clone(),
                    message: format!("not defined for set {}", self.set.code),
                }
                .into());
            };
            cards.extend(self.draw_sheet(rng, sheet, *count)?);
        }

        Ok(Pack::new(cards, round))
    }

    /// Pick one of the set's booster layouts by configured weight.
    fn choose_contents<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        size: Option<usize>,
    ) -> Res<&'a BoosterContents> {
        let boosters: Vec<&'a BoosterContents> = self
            .set
            .booster
            .boosters
            .iter()
            .filter(|b| size.map_or(true, |size| b.size() == size))
            .collect();
        let no_boosters = || ConfigError::NoBoosters {
            set: self.set.code.clone(),
        };

        if boosters.is_empty() {
            return Err(no_boosters().into());
        }
        let index = WeightedIndex::new(boosters.iter().map(|b| b.weight))
            .map_err(|_| no_boosters())?;
        Ok(boosters[index.sample(rng)])
    }

    /// Draw `count` distinct cards from a sheet, redrawing until the colour
    /// balance holds if the sheet asks for it.
    fn draw_sheet<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        sheet: &Sheet,
        count: usize,
    ) -> Res<Vec<Card>> {
        if count > sheet.len() {
            return Err(ConfigError::MalformedSheet {
                sheet: sheet.name.clone(),
                message: format!("{count} cards requested from {}", sheet.len()),
            }
            .into());
        }

        let probabilities = sheet.probabilities()?;
        let attempts = if sheet.balance_colors {
            self.rules.balance_attempts.max(1)
        } else {
            1
        };

        for _ in 0..attempts {
            let mut cards = Vec::with_capacity(count);
            for id in draw_without_replacement(rng, &probabilities, count, sheet)? {
                let Some(card) = self.set.cards.get(id) else {
                    return Err(ConfigError::MalformedSheet {
                        sheet: sheet.name.clone(),
                        message: format!("unknown card {id}"),
                    }
                    .into());
                };
                let mut card = card.clone();
                card.foil = sheet.foil;
                cards.push(card);
            }

            if !sheet.balance_colors || is_balanced(&cards, self.rules.color_balance_max) {
                return Ok(cards);
            }
        }

        tracing::warn!(
            "Sheet {} of {} failed colour balance {attempts} times.",
            sheet.name,
            self.set.code
        );
        Err(ConfigError::Unbalanceable {
            sheet: sheet.name.clone(),
            attempts,
        }
        .into())
    }
}

fn draw_without_replacement<'p, R: Rng + ?Sized>(
    rng: &mut R,
    probabilities: &[(&'p str, f64)],
    count: usize,
    sheet: &Sheet,
) -> Res<Vec<&'p str>> {
    let mut remaining = probabilities.to_vec();
    let mut chosen = Vec::with_capacity(count);
    for _ in 0..count {
        let index = WeightedIndex::new(remaining.iter().map(|(_, p)| *p)).map_err(|e| {
            ConfigError::MalformedSheet {
                sheet: sheet.name.clone(),
                message: e.to_string(),
            }
        })?;
        chosen.push(remaining.remove(index.sample(rng)).0);
    }
    Ok(chosen)
}

/// Every colour must appear on between 1 and `max` single coloured cards.
/// Colourless and multicoloured cards are ignored.
fn is_balanced(cards: &[Card], max: usize) -> bool {
    let mut counts: HashMap<Color, usize> = HashMap::new();
    for color in cards.iter().filter_map(Card::single_color) {
        *counts.entry(color).or_default() += 1;
    }

    Color::ALL
        .iter()
        .all(|color| (1..=max).contains(&counts.get(color).copied().unwrap_or(0)))
}

#[cfg(test)]
mod test {
    use std::collections::{HashMap, HashSet};

    use rand::{rngs::StdRng, SeedableRng};

    use crate::{
        cards::{Card, CardList, Color},
        catalog::SetData,
        config::SetRules,
        error::{ConfigError, Error},
    };

    use super::{is_balanced, BoosterConfiguration, BoosterContents, BoosterGenerator, Sheet};

    fn rng() -> StdRng {
        StdRng::seed_from_u64(0x5eed)
    }

    /// Ten cards of each colour, five colourless and five gold cards.
    fn balanced_set(max_per_color: usize) -> (SetData, SetRules) {
        let mut cards = Vec::new();
        for color in Color::ALL {
            for _ in 0..10 {
                cards.push(Card::sample(&[color]));
            }
        }
        for _ in 0..5 {
            cards.push(Card::sample(&[]));
            cards.push(Card::sample(&[Color::W, Color::B]));
        }

        let weights = cards
            .iter()
            .enumerate()
            .map(|(i, c)| (c.id().to_string(), (i % 4 + 1) as f64))
            .collect();
        let foil_weights = cards.iter().take(3).map(|c| (c.id().to_string(), 1.0)).collect();

        let mut sheets = HashMap::new();
        sheets.insert(
            "common".to_string(),
            Sheet::new("common".to_string(), weights, true, false),
        );
        sheets.insert(
            "foil".to_string(),
            Sheet::new("foil".to_string(), foil_weights, false, true),
        );

        let set = SetData {
            code: "TST".to_string(),
            cards: cards.into_iter().collect::<CardList>(),
            booster: BoosterConfiguration {
                boosters: vec![BoosterContents {
                    weight: 1.0,
                    sheets: vec![("common".to_string(), 10), ("foil".to_string(), 1)],
                }],
                sheets,
            },
        };
        let rules = SetRules {
            color_balance_max: max_per_color,
            ..Default::default()
        };
        (set, rules)
    }

    #[test]
    fn test_probabilities_sum_to_one() {
        let weights = [3.0, 7.0, 0.1, 11.0, 0.3, 5.0, 13.0]
            .iter()
            .enumerate()
            .map(|(i, w)| (format!("c{i}"), *w))
            .collect();
        let sheet = Sheet::new("odd".to_string(), weights, false, false);
        let probabilities = sheet.probabilities().unwrap();
        assert_eq!(probabilities.len(), 7);
        assert_eq!(probabilities.iter().map(|(_, p)| p).sum::<f64>(), 1.0);
        assert_eq!(probabilities[0].0, "c0");
    }

    #[test]
    fn test_malformed_weights() {
        let sheet = Sheet::new("bad".to_string(), vec![("a".into(), 0.0)], false, false);
        assert!(sheet.probabilities().is_err());

        let sheet = Sheet::new("empty".to_string(), Vec::new(), false, false);
        assert!(sheet.probabilities().is_err());
    }

    #[test]
    fn test_packs_have_no_duplicates() {
        let (set, rules) = balanced_set(3);
        let generator = BoosterGenerator::new(&set, &rules);
        let rng = &mut rng();

        // Draws are distinct within a sheet. The foil slot may repeat a common.
        for _ in 0..200 {
            let pack = generator.generate(rng, 1).unwrap();
            let common: HashSet<&str> = pack.cards()[..10].iter().map(Card::id).collect();
            assert_eq!(common.len(), 10);
        }
    }

    #[test]
    fn test_colour_balance_bounds() {
        for max in [3, 4] {
            let (set, rules) = balanced_set(max);
            let generator = BoosterGenerator::new(&set, &rules);
            let rng = &mut rng();

            for _ in 0..200 {
                let pack = generator.generate(rng, 2).unwrap();
                let mut counts: HashMap<Color, usize> = HashMap::new();
                for color in pack.cards()[..10].iter().filter_map(Card::single_color) {
                    *counts.entry(color).or_default() += 1;
                }
                for color in Color::ALL {
                    let n = counts.get(&color).copied().unwrap_or(0);
                    assert!(n >= 1 && n <= max, "{color:?} appeared {n} times");
                }
            }
        }
    }

    #[test]
    fn test_pack_shape() {
        let (set, rules) = balanced_set(3);
        let pack = BoosterGenerator::new(&set, &rules)
            .generate(&mut rng(), 3)
            .unwrap();

        assert_eq!(pack.round(), 3);
        assert_eq!(pack.size(), 11);
        assert_eq!(pack.len(), 11);
        assert!(pack.cards()[..10].iter().all(|c| !c.foil));
        assert!(pack.cards()[10].foil);
        assert!(pack.origin().is_none());
    }

    #[test]
    fn test_unbalanceable_sheet() {
        let (mut set, mut rules) = balanced_set(3);
        rules.balance_attempts = 25;

        // Only 25 cards fit under three per colour plus the ten off-colour cards.
        set.booster.boosters[0].sheets = vec![("common".to_string(), 30)];
        let result = BoosterGenerator::new(&set, &rules).generate(&mut rng(), 1);
        assert!(matches!(
            result,
            Err(Error::Config(ConfigError::Unbalanceable { attempts: 25, .. }))
        ));
    }

    #[test]
    fn test_contents_weighting() {
        let (mut set, rules) = balanced_set(3);
        set.booster.boosters = vec![
            BoosterContents {
                weight: 0.0,
                sheets: vec![("foil".to_string(), 3)],
            },
            BoosterContents {
                weight: 2.0,
                sheets: vec![("foil".to_string(), 1)],
            },
        ];

        let generator = BoosterGenerator::new(&set, &rules);
        let rng = &mut rng();
        for _ in 0..50 {
            assert_eq!(generator.generate(rng, 1).unwrap().len(), 1);
        }
    }

    #[test]
    fn test_sized_generation() {
        let (mut set, rules) = balanced_set(3);
        set.booster.boosters = vec![
            BoosterContents {
                weight: 1.0,
                sheets: vec![("foil".to_string(), 2)],
            },
            BoosterContents {
                weight: 1.0,
                sheets: vec![("foil".to_string(), 3)],
            },
        ];
        assert_eq!(set.booster.boosters[1].size(), 3);

        let generator = BoosterGenerator::new(&set, &rules);
        let rng = &mut rng();
        for _ in 0..50 {
            assert_eq!(generator.generate_sized(rng, 1, Some(2)).unwrap().len(), 2);
            assert_eq!(generator.generate_sized(rng, 1, Some(3)).unwrap().len(), 3);
        }
        assert!(matches!(
            generator.generate_sized(rng, 1, Some(4)),
            Err(Error::Config(ConfigError::NoBoosters { .. }))
        ));
    }

    #[test]
    fn test_missing_sheet_or_card() {
        let (mut set, rules) = balanced_set(3);
        set.booster.boosters[0].sheets.push(("rare".to_string(), 1));
        assert!(BoosterGenerator::new(&set, &rules).generate(&mut rng(), 1).is_err());

        let (mut set, rules) = balanced_set(3);
        set.booster.sheets.insert(
            "foil".to_string(),
            Sheet::new("foil".to_string(), vec![("nope".into(), 1.0)], false, true),
        );
        assert!(BoosterGenerator::new(&set, &rules).generate(&mut rng(), 1).is_err());

        let (mut set, rules) = balanced_set(3);
        set.booster.boosters.clear();
        assert!(matches!(
            BoosterGenerator::new(&set, &rules).generate(&mut rng(), 1),
            Err(Error::Config(ConfigError::NoBoosters { .. }))
        ));
    }

    #[test]
    fn test_is_balanced() {
        let mut cards: Vec<Card> = Color::ALL.iter().map(|c| Card::sample(&[*c])).collect();
        assert!(is_balanced(&cards, 1));

        cards.pop();
        cards.push(Card::sample(&[Color::G, Color::U]));
        assert!(!is_balanced(&cards, 3));

        cards.push(Card::sample(&[Color::G]));
        cards.push(Card::sample(&[Color::G]));
        assert!(is_balanced(&cards, 2));
        assert!(!is_balanced(&cards, 1));
    }

    #[test]
    fn test_take_is_one_based() {
        let cards: Vec<Card> = (0..3).map(|_| Card::sample(&[])).collect();
        let mut pack = super::Pack::new(cards.clone(), 1);
        assert!(pack.take(0).is_none());
        assert!(pack.take(4).is_none());
        assert_eq!(pack.get(3), Some(&cards[2]));
        assert_eq!(pack.take(1), Some(cards[0].clone()));
        assert_eq!(pack.len(), 2);
        assert_eq!(pack.size(), 3);
    }
}
