use std::{collections::HashMap, fmt, marker::PhantomData, path::Path};

use bytes::Buf;
use serde::{
    de::{MapAccess, Visitor},
    Deserialize, Deserializer,
};

use crate::{
    cards::{Card, CardList, Color},
    catalog::SetData,
    draft::packs::{BoosterConfiguration, BoosterContents, Sheet},
    error::{ConfigError, Res},
};

async fn get_bytes(uri: &str) -> Result<bytes::Bytes, String> {
    reqwest::get(uri)
        .await
        .map_err(|e| e.to_string())?
        .error_for_status()
        .map_err(|e| e.to_string())?
        .bytes()
        .await
        .map_err(|e| e.to_string())
}

/// Deserialize a JSON object into its entries, keeping document order.
fn ordered<'de, D, V>(deserializer: D) -> Result<Vec<(String, V)>, D::Error>
where
    D: Deserializer<'de>,
    V: Deserialize<'de>,
{
    struct Entries<V>(PhantomData<V>);

    impl<'de, V: Deserialize<'de>> Visitor<'de> for Entries<V> {
        type Value = Vec<(String, V)>;

        fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
            f.write_str("an object")
        }

        fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
            let mut entries = Vec::with_capacity(map.size_hint().unwrap_or(0));
            while let Some(entry) = map.next_entry()? {
                entries.push(entry);
            }
            Ok(entries)
        }
    }

    deserializer.deserialize_map(Entries(PhantomData))
}

#[derive(serde::Deserialize)]
struct MtgJsonFile {
    data: MtgJsonSet,
}

#[derive(serde::Deserialize)]
struct MtgJsonSet {
    code: String,
    cards: Vec<MtgJsonCard>,

    /// Booster kinds by name, "default" is the draft booster.
    #[serde(default)]
    booster: HashMap<String, MtgJsonBooster>,
}

#[derive(serde::Deserialize)]
struct MtgJsonCard {
    uuid: String,
    name: String,

    /// Collector number. Not always numeric, e.g. "123a".
    number: String,

    #[serde(default)]
    colors: Vec<Color>,
}

#[derive(serde::Deserialize)]
struct MtgJsonBooster {
    boosters: Vec<MtgJsonContents>,
    sheets: HashMap<String, MtgJsonSheet>,
}

#[derive(serde::Deserialize)]
struct MtgJsonContents {
    #[serde(deserialize_with = "ordered")]
    contents: Vec<(String, usize)>,
    weight: f64,
}

#[derive(serde::Deserialize)]
#[serde(rename_all = "camelCase")]
struct MtgJsonSheet {
    #[serde(default)]
    balance_colors: bool,

    #[serde(deserialize_with = "ordered")]
    cards: Vec<(String, f64)>,

    #[serde(default)]
    foil: bool,
}

impl MtgJsonSet {
    fn to_set(mut self) -> SetData {
        let cards = self
            .cards
            .into_iter()
            .map(|c| Card::new(c.uuid, c.name, c.number, c.colors))
            .collect::<CardList>();

        let booster = match self.booster.remove("default") {
            Some(default) => default.to_config(),
            None => BoosterConfiguration::default(),
        };

        SetData {
            code: self.code.to_ascii_uppercase(),
            cards,
            booster,
        }
    }
}

impl MtgJsonBooster {
    fn to_config(self) -> BoosterConfiguration {
        BoosterConfiguration {
            boosters: self
                .boosters
                .into_iter()
                .map(|b| BoosterContents {
                    weight: b.weight,
                    sheets: b.contents,
                })
                .collect(),
            sheets: self
                .sheets
                .into_iter()
                .map(|(name, sheet)| {
                    let sheet =
                        Sheet::new(name.clone(), sheet.cards, sheet.balance_colors, sheet.foil);
                    (name, sheet)
                })
                .collect(),
        }
    }
}

pub fn decode_set(bytes: bytes::Bytes) -> Result<SetData, String> {
    let file: MtgJsonFile = serde_json::de::from_reader(bytes.reader()).map_err(|e| e.to_string())?;
    Ok(file.data.to_set())
}

async fn download_set(path: &Path, code: &str) -> Res<()> {
    let uri = format!("https://mtgjson.com/api/v5/{code}.json");
    let raw = get_bytes(&uri)
        .await
        .map_err(|message| ConfigError::Download {
            uri: uri.clone(),
            message,
        })?;

    tokio::fs::write(path, raw)
        .await
        .map_err(|e| ConfigError::Read {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
    Ok(())
}

/// Load a set from `<data>/<CODE>.json`, downloading the file from MTGJSON
/// first if it isn't cached.
pub async fn load_set(data: &Path, code: &str) -> Res<SetData> {
    let code = code.to_ascii_uppercase();
    let read_error = |path: &Path, e: std::io::Error| ConfigError::Read {
        path: path.to_path_buf(),
        message: e.to_string(),
    };

    tokio::fs::create_dir_all(data)
        .await
        .map_err(|e| read_error(data, e))?;
    let file = data.join(format!("{code}.json"));

    if !file.exists() {
        tracing::debug!("Set {code} not cached, downloading to {}", file.display());
        download_set(&file, &code).await?;
        tracing::debug!("Successfully downloaded {code}.");
    }

    let raw = tokio::fs::read(&file)
        .await
        .map_err(|e| read_error(&file, e))?;
    tracing::debug!("Read {code} from disk. Parsing JSON.");
    let set = decode_set(bytes::Bytes::from(raw)).map_err(|message| ConfigError::Parse {
        path: file.clone(),
        message,
    })?;
    tracing::debug!("Loaded {code} with {} cards.", set.cards.size());
    Ok(set)
}
