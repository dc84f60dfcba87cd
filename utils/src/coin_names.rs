//! Display names for coin ids, read from the CoinGecko catalog snapshot that
//! `supported-coins` writes into the project directory.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::{disk_storage::ProjectDir, price_manager::CoinListEntry};

pub const CATALOG_FILE_NAME: &str = "coingeckoSupportedTokens.csv";

#[derive(Serialize, Deserialize, Debug, PartialEq)]
struct CatalogRow {
    #[serde(rename = "Coin id")]
    id: String,
    #[serde(rename = "Coin name")]
    name: String,
    #[serde(rename = "Coin symbol")]
    symbol: String,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct CoinNames {
    names: HashMap<String, String>,
}

impl CoinNames {
    pub fn new(names: HashMap<String, String>) -> Self {
        Self { names }
    }

    /// Loads the catalog, shown names are the coin symbols. A missing catalog only
    /// degrades the report to raw coin ids.
    pub fn load(dir: &ProjectDir) -> crate::Result<Self> {
        let path = dir.file(CATALOG_FILE_NAME);
        if !path.exists() {
            warn!(
                path = %path.display(),
                "Coin catalog not found, coin ids will be used as names. Run `walletscan supported-coins` to create it"
            );
            return Ok(Self::default());
        }

        let mut reader =
            csv::Reader::from_path(&path).map_err(|e| crate::Error::CsvFailed(path.clone(), e))?;

        let mut names = HashMap::new();
        for row in reader.deserialize::<CatalogRow>() {
            let row = row.map_err(|e| crate::Error::CsvFailed(path.clone(), e))?;
            names.insert(row.id, row.symbol);
        }

        Ok(Self { names })
    }

    /// Name shown in the report, falling back to the id itself.
    pub fn name_of(&self, coin_id: &str) -> String {
        self.names
            .get(coin_id)
            .cloned()
            .unwrap_or_else(|| coin_id.to_string())
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// Writes the catalog snapshot into the project directory.
pub fn save_catalog(dir: &ProjectDir, coins: Vec<CoinListEntry>) -> crate::Result<()> {
    let path = dir.file(CATALOG_FILE_NAME);
    std::fs::create_dir_all(dir.root())
        .map_err(|e| crate::Error::FileWriteFailed(path.clone(), e))?;

    let mut writer =
        csv::Writer::from_path(&path).map_err(|e| crate::Error::CsvFailed(path.clone(), e))?;

    let count = coins.len();
    for coin in coins {
        writer
            .serialize(CatalogRow {
                id: coin.id,
                name: coin.name,
                symbol: coin.symbol,
            })
            .map_err(|e| crate::Error::CsvFailed(path.clone(), e))?;
    }
    writer
        .flush()
        .map_err(|e| crate::Error::FileWriteFailed(path.clone(), e))?;

    info!(count, path = %path.display(), "Coin catalog saved");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutils::TempProjectDir;

    #[test]
    fn test_catalog_maps_id_to_symbol() {
        let dir = TempProjectDir::new("catalog");
        dir.write(
            CATALOG_FILE_NAME,
            "Coin id,Coin name,Coin symbol\nethereum,Ethereum,eth\nusd-coin,\"USD Coin, bridged\",usdc\n",
        );

        let names = CoinNames::load(&dir).unwrap();

        assert_eq!(names.len(), 2);
        assert_eq!(names.name_of("ethereum"), "eth");
        assert_eq!(names.name_of("usd-coin"), "usdc");
        assert_eq!(names.name_of("unknown-coin"), "unknown-coin");
    }

    #[test]
    fn test_missing_catalog_is_not_fatal() {
        let dir = TempProjectDir::new("no-catalog");
        let names = CoinNames::load(&dir).unwrap();
        assert!(names.is_empty());
        assert_eq!(names.name_of("ethereum"), "ethereum");
    }

    #[test]
    fn test_saved_catalog_loads_back() {
        let dir = TempProjectDir::new("save");
        save_catalog(
            &dir,
            vec![CoinListEntry {
                id: "tether".to_string(),
                symbol: "usdt".to_string(),
                name: "Tether".to_string(),
            }],
        )
        .unwrap();

        let content = std::fs::read_to_string(dir.file(CATALOG_FILE_NAME)).unwrap();
        assert!(content.starts_with("Coin id,Coin name,Coin symbol\n"));
        assert_eq!(CoinNames::load(&dir).unwrap().name_of("tether"), "usdt");
    }
}
