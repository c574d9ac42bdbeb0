use std::{collections::HashMap, path::Path, sync::Arc};

use crate::{
    cards::{mtgjson, CardList},
    draft::packs::BoosterConfiguration,
    error::{ConfigError, Res},
};

/// Everything needed to open packs of one set.
#[derive(Debug)]
pub struct SetData {
    /// Upper case set code, e.g. "CMR".
    pub code: String,
    pub cards: CardList,
    pub booster: BoosterConfiguration,
}

/// Read only lookup of set data by code.
pub trait CardCatalog: Send + Sync {
    fn set_data(&self, code: &str) -> Res<Arc<SetData>>;
}

#[derive(Default)]
pub struct SetCatalog {
    sets: HashMap<String, Arc<SetData>>,
}

impl SetCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, set: SetData) {
        self.sets.insert(set.code.to_ascii_uppercase(), Arc::new(set));
    }

    pub fn size(&self) -> usize {
        self.sets.len()
    }

    /// Load each of the named sets from the data directory.
    pub async fn load(data: &Path, codes: &[String]) -> Res<Self> {
        let mut catalog = Self::new();
        for code in codes {
            catalog.add(mtgjson::load_set(data, code).await?);
        }
        Ok(catalog)
    }
}

impl CardCatalog for SetCatalog {
    fn set_data(&self, code: &str) -> Res<Arc<SetData>> {
        self.sets
            .get(&code.to_ascii_uppercase())
            .cloned()
            .ok_or_else(|| ConfigError::UnknownSet(code.to_string()).into())
    }
}

#[cfg(test)]
impl SetData {
    /// A set with `3 * pack_size` cards cycling through the colours and
    /// colourless, opened as a single unbalanced sheet of `pack_size` cards.
    pub fn sample(code: &str, pack_size: usize) -> Self {
        use crate::{
            cards::{Card, Color},
            draft::packs::{BoosterContents, Sheet},
        };

        let cards: Vec<Card> = (0..pack_size * 3)
            .map(|i| match Color::ALL.get(i % 6) {
                Some(color) => Card::sample(&[*color]),
                None => Card::sample(&[]),
            })
            .collect();
        let weights = cards.iter().map(|c| (c.id().to_string(), 1.0)).collect();

        let mut sheets = HashMap::new();
        sheets.insert(
            "common".to_string(),
            Sheet::new("common".to_string(), weights, false, false),
        );

        Self {
            code: code.to_string(),
            cards: cards.into_iter().collect(),
            booster: BoosterConfiguration {
                boosters: vec![BoosterContents {
                    weight: 1.0,
                    sheets: vec![("common".to_string(), pack_size)],
                }],
                sheets,
            },
        }
    }
}

#[cfg(test)]
mod test {
    use crate::error::{ConfigError, Error};

    use super::{CardCatalog, SetCatalog, SetData};

    #[test]
    fn test_lookup() {
        let mut catalog = SetCatalog::new();
        catalog.add(SetData::sample("TST", 3));
        assert_eq!(catalog.size(), 1);
        assert_eq!(catalog.set_data("tst").unwrap().cards.size(), 9);
        assert!(matches!(
            catalog.set_data("NOPE"),
            Err(Error::Config(ConfigError::UnknownSet(_)))
        ));
    }

    #[tokio::test]
    async fn test_load_from_directory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("TST.json"),
            crate::cards::mtgjson::test::SAMPLE,
        )
        .unwrap();

        let catalog = SetCatalog::load(dir.path(), &["tst".to_string()]).await.unwrap();
        assert!(catalog.set_data("TST").is_ok());
    }
}
