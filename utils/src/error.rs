use std::path::PathBuf;

use url::Url;

use crate::reqwest::{ReqwestErrorContext, ReqwestInnerError, ReqwestStage};

pub type Result<T> = std::result::Result<T, UtilsError>;

#[derive(Debug, thiserror::Error)]
pub enum UtilsError {
    #[error(transparent)]
    ParseFloatError(#[from] std::num::ParseFloatError),

    #[error("Address '{0}' is not a valid Ethereum address.")]
    InvalidAddress(String),

    #[error("Failed to get the current working directory. (Error: {0:?})")]
    CurrentDirFailed(std::io::Error),

    #[error("Failed to read the file: {0}. (Error: {1:?})")]
    FileReadFailed(PathBuf, std::io::Error),

    #[error("Failed to write to the file: {0}. (Error: {1:?})")]
    FileWriteFailed(PathBuf, std::io::Error),

    #[error("Parsing the json file failed: {0}. (Error: {1})")]
    JsonParsingFailed(PathBuf, serde_path_to_error::Error<serde_json::Error>),

    #[error("Parsing the properties file failed: {0}. (Error: {1})")]
    PropertiesParsingFailed(PathBuf, String),

    #[error("Csv file {0} could not be processed. (Error: {1})")]
    CsvFailed(PathBuf, csv::Error),

    #[error("Chain {chain} has no RPC URL, set either rpcUrl or ankrRpcName.")]
    RpcUrlNotFound { chain: String },

    #[error("Failed to parse URL: {0}. (Error: {1:?})")]
    UrlParsingFailed(String, url::ParseError),

    #[error("Please check your internet connection, the URL seems to be unreachable: {0}")]
    Internet(Url),

    #[error("Request '{url}' failed at stage '{stage:?}' (Error='{inner:?}', Context='{context:?}')", url = context.url)]
    ReqwestFailed {
        stage: ReqwestStage,
        context: Box<ReqwestErrorContext>,
        inner: ReqwestInnerError,
    },

    #[error("Reqwest builder missing error context, this is a bug please report it.")]
    ReqwestErrorContextMissing,

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("No RPC provider registered for {0}.")]
    ProviderNotRegistered(String),

    #[error("Failed to fetch native balance from {rpc_url}. (Error: {error})")]
    NativeBalanceFailed {
        rpc_url: String,
        error: Box<alloy::transports::TransportError>,
    },

    #[error("Failed to call {method} on token contract {contract}. (Error: {error})")]
    TokenCallFailed {
        contract: String,
        method: &'static str,
        error: Box<alloy::contract::Error>,
    },

    #[error(transparent)]
    UnitsError(#[from] alloy::primitives::utils::UnitsError),

    #[error("Price for coin '{0}' is missing from the price table.")]
    PriceNotFound(String),
}

impl UtilsError {
    pub fn is_connect(&self) -> bool {
        match self {
            Self::Internet(_) => true,
            Self::ReqwestFailed { inner, .. } => inner.is_connect(),
            _ => false,
        }
    }
}
