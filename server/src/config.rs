use std::{collections::HashMap, path::Path};

use crate::error::{ConfigError, Res};

/// Per-set drafting rules. Missing fields fall back to the defaults below.
#[derive(Clone, Debug, PartialEq, serde::Deserialize)]
#[serde(default)]
pub struct SetRules {
    /// Cards taken from a pack before it is passed on.
    pub max_picks: usize,

    /// Reservations held at once. The oldest is dropped when exceeded.
    pub max_reserved: usize,

    /// Upper bound on single coloured cards of each colour in a colour
    /// balanced sheet draw. The lower bound is always 1.
    pub color_balance_max: usize,

    /// Number of draws tried before a colour balanced sheet is rejected.
    pub balance_attempts: usize,
}

impl Default for SetRules {
    fn default() -> Self {
        Self {
            max_picks: 1,
            max_reserved: 1,
            color_balance_max: 3,
            balance_attempts: 10_000,
        }
    }
}

#[derive(Debug, serde::Deserialize)]
#[serde(default)]
pub struct DraftConfig {
    pub table_size: usize,
    pub rounds: usize,

    /// Set codes loaded into the catalog at startup.
    pub sets: Vec<String>,

    pub defaults: SetRules,

    /// Overrides keyed by set code.
    pub rules: HashMap<String, SetRules>,
}

impl Default for DraftConfig {
    fn default() -> Self {
        // Two picks per pack for the multiplayer-focused sets.
        let two_pick = SetRules {
            max_picks: 2,
            max_reserved: 2,
            ..Default::default()
        };
        let rules = ["CMR", "BBD", "2XM"]
            .into_iter()
            .map(|code| (code.to_string(), two_pick.clone()))
            .collect();

        Self {
            table_size: 8,
            rounds: 3,
            sets: vec!["CMR".to_string()],
            defaults: SetRules::default(),
            rules,
        }
    }
}

impl DraftConfig {
    pub fn from_toml(text: &str, path: &Path) -> Res<Self> {
        let config: Self = toml::from_str(text).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

        if config.rounds == 0 || config.table_size == 0 {
            return Err(ConfigError::Parse {
                path: path.to_path_buf(),
                message: "rounds and table_size must be positive".to_string(),
            }
            .into());
        }

        Ok(config)
    }

    pub async fn load(path: &Path) -> Res<Self> {
        let text = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| ConfigError::Read {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;
        Self::from_toml(&text, path)
    }

    pub fn rules_for(&self, set: &str) -> SetRules {
        self.rules
            .get(&set.to_ascii_uppercase())
            .cloned()
            .unwrap_or_else(|| self.defaults.clone())
    }
}

#[cfg(test)]
mod test {
    use std::path::Path;

    use super::{DraftConfig, SetRules};

    #[test]
    fn test_default_rules() {
        let config = DraftConfig::default();
        assert_eq!(config.rules_for("cmr").max_picks, 2);
        assert_eq!(config.rules_for("2XM").max_reserved, 2);
        assert_eq!(config.rules_for("KHM"), SetRules::default());
    }

    #[test]
    fn test_parse_toml() {
        let text = r#"
            table_size = 4
            sets = ["KHM", "CMR"]

            [defaults]
            color_balance_max = 4

            [rules.KHM]
            max_picks = 3
        "#;
        let config = DraftConfig::from_toml(text, Path::new("draft.toml")).unwrap();
        assert_eq!(config.table_size, 4);
        assert_eq!(config.rounds, 3);
        assert_eq!(config.sets, vec!["KHM", "CMR"]);
        assert_eq!(config.rules_for("KHM").max_picks, 3);
        assert_eq!(config.rules_for("KHM").max_reserved, 1);
        assert_eq!(config.rules_for("ELD").color_balance_max, 4);

        // A file that names [rules] replaces the built in overrides.
        assert!(config.rules_for("CMR").max_picks == 1);
    }

    #[test]
    fn test_reject_zero_rounds() {
        assert!(DraftConfig::from_toml("rounds = 0", Path::new("draft.toml")).is_err());
        assert!(DraftConfig::from_toml("rounds = \"x\"", Path::new("draft.toml")).is_err());
    }
}
