use std::{collections::BTreeSet, fmt::Display};

use alloy::primitives::{address, Address};
use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;

use crate::{
    config::ScanConfig,
    disk_storage::{DiskStorageInterface, FileFormat, ProjectDir},
};

pub const ANKR_URL: &str = "https://rpc.ankr.com";
pub const DEFAULT_NATIVE_DECIMALS: u8 = 18;

/// Chain entry as written in `chainConfig.json`.
#[skip_serializing_none]
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ChainConfig {
    pub name: String,
    pub rpc_url: Option<String>,
    pub ankr_rpc_name: Option<String>,
    pub coin_gecko_coin_id: String,
    pub native_decimals: Option<u8>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tokens: Vec<Token>,
    pub is_enabled: Option<bool>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub is_test_network: bool,
}

fn is_false(b: &bool) -> bool {
    !*b
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Token {
    pub name: String,
    pub coin_gecko_coin_id: String,
    pub contract: Address,
}

/// A chain ready to be scanned: enabled, with a concrete RPC endpoint.
#[derive(Clone, Debug, PartialEq)]
pub struct Chain {
    pub name: String,
    pub rpc_url: String,
    pub price_coin_id: String,
    pub native_decimals: u8,
    pub tokens: Vec<Token>,
    pub is_test_network: bool,
}

impl Display for Chain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({} tokens)", self.name, self.tokens.len())
    }
}

impl ChainConfig {
    pub fn is_enabled(&self) -> bool {
        self.is_enabled.unwrap_or(true)
    }

    /// Provider alias wins over a literal RPC URL.
    pub fn get_rpc(&self, ankr_token: Option<&str>) -> crate::Result<String> {
        if let Some(alias) = &self.ankr_rpc_name {
            Ok(ankr_url(alias, ankr_token))
        } else if let Some(rpc_url) = &self.rpc_url {
            Ok(rpc_url.clone())
        } else {
            Err(crate::Error::RpcUrlNotFound {
                chain: self.name.clone(),
            })
        }
    }

    pub fn resolve(self, ankr_token: Option<&str>) -> crate::Result<Chain> {
        let rpc_url = self.get_rpc(ankr_token)?;
        Ok(Chain {
            name: self.name,
            rpc_url,
            price_coin_id: self.coin_gecko_coin_id,
            native_decimals: self.native_decimals.unwrap_or(DEFAULT_NATIVE_DECIMALS),
            tokens: self.tokens,
            is_test_network: self.is_test_network,
        })
    }
}

pub fn ankr_url(alias: &str, ankr_token: Option<&str>) -> String {
    match ankr_token {
        Some(token) => format!("{ANKR_URL}/{alias}/{token}"),
        None => format!("{ANKR_URL}/{alias}"),
    }
}

#[derive(Serialize, Deserialize, Debug, PartialEq)]
#[serde(transparent)]
pub struct ChainStore {
    pub chains: Vec<ChainConfig>,
}

impl Default for ChainStore {
    fn default() -> Self {
        Self {
            chains: default_chains(),
        }
    }
}

impl DiskStorageInterface for ChainStore {
    const FILE_NAME: &'static str = "chainConfig.json";
    const FORMAT: FileFormat = FileFormat::JSON;
}

impl ChainStore {
    /// Drops disabled chains and resolves the RPC endpoint of the rest, keeping file order.
    pub fn resolve(self, ankr_token: Option<&str>) -> crate::Result<Vec<Chain>> {
        self.chains
            .into_iter()
            .filter(ChainConfig::is_enabled)
            .map(|chain| chain.resolve(ankr_token))
            .collect()
    }
}

/// Loads the override chain config if present (bundled defaults otherwise) and
/// returns the chains to scan.
pub fn load_chains(dir: &ProjectDir, config: &ScanConfig) -> crate::Result<Vec<Chain>> {
    ChainStore::load(dir)?.resolve(config.ankr_token.as_deref())
}

/// Every coin id that needs a price, across native coins and tokens.
pub fn distinct_price_ids(chains: &[Chain]) -> BTreeSet<String> {
    chains
        .iter()
        .flat_map(|chain| {
            std::iter::once(chain.price_coin_id.clone())
                .chain(chain.tokens.iter().map(|t| t.coin_gecko_coin_id.clone()))
        })
        .collect()
}

fn default_chains() -> Vec<ChainConfig> {
    vec![
        ChainConfig {
            name: "Ethereum".to_string(),
            ankr_rpc_name: Some("eth".to_string()),
            coin_gecko_coin_id: "ethereum".to_string(),
            tokens: vec![
                Token {
                    name: "USDT".to_string(),
                    coin_gecko_coin_id: "tether".to_string(),
                    contract: address!("dac17f958d2ee523a2206206994597c13d831ec7"),
                },
                Token {
                    name: "USDC".to_string(),
                    coin_gecko_coin_id: "usd-coin".to_string(),
                    contract: address!("a0b86991c6218b36c1d19d4a2e9eb0ce3606eb48"),
                },
            ],
            ..Default::default()
        },
        ChainConfig {
            name: "BSC".to_string(),
            ankr_rpc_name: Some("bsc".to_string()),
            coin_gecko_coin_id: "binancecoin".to_string(),
            tokens: vec![Token {
                name: "USDT".to_string(),
                coin_gecko_coin_id: "tether".to_string(),
                contract: address!("55d398326f99059ff775485246999027b3197955"),
            }],
            ..Default::default()
        },
        ChainConfig {
            name: "Polygon".to_string(),
            ankr_rpc_name: Some("polygon".to_string()),
            coin_gecko_coin_id: "matic-network".to_string(),
            tokens: vec![Token {
                name: "USDC".to_string(),
                coin_gecko_coin_id: "usd-coin".to_string(),
                contract: address!("3c499c542cef5e3811e1192ce70d8cc03d5c3359"),
            }],
            ..Default::default()
        },
        ChainConfig {
            name: "Arbitrum".to_string(),
            ankr_rpc_name: Some("arbitrum".to_string()),
            coin_gecko_coin_id: "ethereum".to_string(),
            tokens: vec![
                Token {
                    name: "USDC".to_string(),
                    coin_gecko_coin_id: "usd-coin".to_string(),
                    contract: address!("af88d065e77c8cc2239327c5edb3a432268e5831"),
                },
                Token {
                    name: "USDT".to_string(),
                    coin_gecko_coin_id: "tether".to_string(),
                    contract: address!("fd086bc7cd5c481dcc9c85ebe478a1c0b69fcbb9"),
                },
            ],
            ..Default::default()
        },
        ChainConfig {
            name: "Optimism".to_string(),
            ankr_rpc_name: Some("optimism".to_string()),
            coin_gecko_coin_id: "ethereum".to_string(),
            ..Default::default()
        },
        ChainConfig {
            name: "Base".to_string(),
            ankr_rpc_name: Some("base".to_string()),
            coin_gecko_coin_id: "ethereum".to_string(),
            tokens: vec![Token {
                name: "USDC".to_string(),
                coin_gecko_coin_id: "usd-coin".to_string(),
                contract: address!("833589fcd6edb6e08f4c7c32d4f71b54bda02913"),
            }],
            ..Default::default()
        },
        ChainConfig {
            name: "Avalanche".to_string(),
            ankr_rpc_name: Some("avalanche".to_string()),
            coin_gecko_coin_id: "avalanche-2".to_string(),
            ..Default::default()
        },
        ChainConfig {
            name: "Sepolia".to_string(),
            rpc_url: Some("https://ethereum-sepolia-rpc.publicnode.com".to_string()),
            coin_gecko_coin_id: "ethereum".to_string(),
            is_test_network: true,
            ..Default::default()
        },
    ]
}
