use std::fmt::Display;

use serde::Deserialize;
use serde_with::{serde_as, DisplayFromStr};

use crate::disk_storage::{DiskStorageInterface, FileFormat, ProjectDir};

pub const DEFAULT_REQUESTS_PER_MINUTE: u32 = 300;
pub const ANKR_PUBLIC_REQUESTS_PER_MINUTE: u32 = 300;
pub const ANKR_PREMIUM_REQUESTS_PER_MINUTE: u32 = 1000;

/// Raw contents of the optional `.properties` file.
#[serde_as]
#[derive(Deserialize, Debug, Default, PartialEq)]
pub struct RuntimeProperties {
    #[serde(rename = "ANKR_TOKEN", default)]
    pub ankr_token: Option<String>,
    #[serde_as(as = "Option<DisplayFromStr>")]
    #[serde(rename = "ANKR_REQUESTS_PER_MINUTE", default)]
    pub ankr_requests_per_minute: Option<u32>,
    #[serde_as(as = "Option<DisplayFromStr>")]
    #[serde(rename = "RPC_REQUESTS_PER_MINUTE", default)]
    pub rpc_requests_per_minute: Option<u32>,
}

impl DiskStorageInterface for RuntimeProperties {
    const FILE_NAME: &'static str = ".properties";
    const FORMAT: FileFormat = FileFormat::Properties;
}

/// Effective settings of a scan after defaults are applied.
#[derive(Clone, Debug, PartialEq)]
pub struct ScanConfig {
    pub ankr_token: Option<String>,
    pub ankr_requests_per_minute: u32,
    pub default_requests_per_minute: u32,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self::from_properties(RuntimeProperties::default())
    }
}

impl ScanConfig {
    pub fn load(dir: &ProjectDir) -> crate::Result<Self> {
        RuntimeProperties::load(dir).map(Self::from_properties)
    }

    pub fn from_properties(properties: RuntimeProperties) -> Self {
        let ankr_token = properties.ankr_token.filter(|t| !t.trim().is_empty());

        // Keyless access to the public endpoint has a much lower ceiling
        let ankr_default = if ankr_token.is_some() {
            ANKR_PREMIUM_REQUESTS_PER_MINUTE
        } else {
            ANKR_PUBLIC_REQUESTS_PER_MINUTE
        };

        Self {
            ankr_token,
            ankr_requests_per_minute: properties.ankr_requests_per_minute.unwrap_or(ankr_default),
            default_requests_per_minute: properties
                .rpc_requests_per_minute
                .unwrap_or(DEFAULT_REQUESTS_PER_MINUTE),
        }
    }
}

impl Display for ScanConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "ankr token: {}, ankr requests/min: {}, default requests/min: {}",
            if self.ankr_token.is_some() { "set" } else { "not set" },
            self.ankr_requests_per_minute,
            self.default_requests_per_minute
        )
    }
}
