use std::collections::{BTreeSet, HashMap};

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, warn};

pub const COINGECKO_API_URL: &str = "https://api.coingecko.com/api/v3";
pub const FIAT_CURRENCY: &str = "usd";

/// Fiat unit prices by coin id, fetched once per scan.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PriceTable {
    prices: HashMap<String, f64>,
}

impl PriceTable {
    pub fn new(prices: HashMap<String, f64>) -> Self {
        Self { prices }
    }

    pub fn get(&self, coin_id: &str) -> crate::Result<f64> {
        self.prices
            .get(coin_id)
            .copied()
            .ok_or_else(|| crate::Error::PriceNotFound(coin_id.to_string()))
    }

    pub fn len(&self) -> usize {
        self.prices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prices.is_empty()
    }
}

impl FromIterator<(String, f64)> for PriceTable {
    fn from_iter<T: IntoIterator<Item = (String, f64)>>(iter: T) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

#[async_trait]
pub trait PriceOracle: Send + Sync {
    /// Looks up every id in a single batched request.
    async fn fetch_prices(&self, coin_ids: &BTreeSet<String>) -> crate::Result<PriceTable>;
}

/// Fetches prices and degrades to an empty table when the lookup fails, so that
/// the affected rows fail individually later instead of aborting the scan.
pub async fn fetch_price_snapshot(
    oracle: &dyn PriceOracle,
    coin_ids: &BTreeSet<String>,
) -> PriceTable {
    match oracle.fetch_prices(coin_ids).await {
        Ok(prices) => {
            let missing: Vec<&String> = coin_ids
                .iter()
                .filter(|id| prices.get(id).is_err())
                .collect();
            if !missing.is_empty() {
                warn!(?missing, "Price lookup returned no price for some coins");
            }
            prices
        }
        Err(err) => {
            if err.is_connect() {
                warn!("Price lookup failed, please check your internet connection: {err}");
            } else {
                warn!("Price lookup failed, all priced rows will be skipped: {err}");
            }
            PriceTable::default()
        }
    }
}

pub struct CoinGecko {
    base_url: String,
}

impl Default for CoinGecko {
    fn default() -> Self {
        Self::new(COINGECKO_API_URL)
    }
}

impl CoinGecko {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
        }
    }
}

type SimplePriceResponse = HashMap<String, HashMap<String, f64>>;

#[async_trait]
impl PriceOracle for CoinGecko {
    // docs: https://docs.coingecko.com/reference/simple-price
    async fn fetch_prices(&self, coin_ids: &BTreeSet<String>) -> crate::Result<PriceTable> {
        if coin_ids.is_empty() {
            return Ok(PriceTable::default());
        }

        let ids = coin_ids.iter().map(String::as_str).collect::<Vec<_>>().join(",");
        debug!(%ids, "Fetching prices");

        let response = crate::Reqwest::get(format!("{}/simple/price", self.base_url))?
            .query(&[("ids", ids.as_str()), ("vs_currencies", FIAT_CURRENCY)])
            .receive_json::<SimplePriceResponse>()
            .await?;

        Ok(parse_simple_price(response))
    }
}

fn parse_simple_price(response: SimplePriceResponse) -> PriceTable {
    response
        .into_iter()
        .filter_map(|(id, quotes)| quotes.get(FIAT_CURRENCY).map(|price| (id, *price)))
        .collect()
}

#[derive(Deserialize, Debug)]
pub struct CoinListEntry {
    pub id: String,
    pub symbol: String,
    pub name: String,
}

impl CoinGecko {
    /// The full catalog of coin ids CoinGecko can price.
    pub async fn coins_list(&self) -> crate::Result<Vec<CoinListEntry>> {
        crate::Reqwest::get(format!("{}/coins/list", self.base_url))?
            .receive_json()
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{serde::SerdeResponseParse, testutils::StaticPriceOracle};

    #[test]
    fn test_parse_simple_price() {
        let response: SimplePriceResponse = r#"{
            "ethereum": {"usd": 2000.5},
            "tether": {"usd": 1.0},
            "odd-coin": {"eur": 3.0}
        }"#
        .serde_parse_custom()
        .unwrap();

        let table = parse_simple_price(response);

        assert_eq!(table.get("ethereum").unwrap(), 2000.5);
        assert_eq!(table.get("tether").unwrap(), 1.0);
        assert!(matches!(
            table.get("odd-coin"),
            Err(crate::Error::PriceNotFound(id)) if id == "odd-coin"
        ));
    }

    #[tokio::test]
    async fn test_snapshot_falls_back_to_empty_table() {
        let oracle = StaticPriceOracle::failing();
        let ids = BTreeSet::from(["ethereum".to_string()]);

        let table = fetch_price_snapshot(&oracle, &ids).await;

        assert!(table.is_empty());
        assert_eq!(oracle.calls(), 1);
    }

    #[tokio::test]
    async fn test_snapshot_keeps_partial_table() {
        let oracle = StaticPriceOracle::new([("ethereum", 2000.0)]);
        let ids = BTreeSet::from(["ethereum".to_string(), "missing".to_string()]);

        let table = fetch_price_snapshot(&oracle, &ids).await;

        assert_eq!(table.len(), 1);
        assert!(table.get("missing").is_err());
    }

    #[tokio::test]
    #[ignore]
    async fn test_coingecko_live() {
        let ids = BTreeSet::from(["ethereum".to_string(), "tether".to_string()]);
        let table = CoinGecko::default().fetch_prices(&ids).await.unwrap();
        println!("{table:#?}");
        assert!(table.get("ethereum").unwrap() > 0.0);
    }
}
