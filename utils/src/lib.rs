pub mod alloy;
pub mod assets;
pub mod balances;
pub mod coin_names;
pub mod collector;
pub mod config;
pub mod disk_storage;
pub mod error;
pub mod log;
pub mod network;
pub mod price_manager;
pub mod rate_limiter;
pub mod report;
pub mod reqwest;
pub mod scan;
pub mod serde;
pub mod wallets;

#[cfg(test)]
mod testutils;

pub use error::{Result, UtilsError as Error};

pub use reqwest::Reqwest;
