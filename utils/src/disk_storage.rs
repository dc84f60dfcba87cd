//! Utilities for loading a struct from a file in the project config directory.
//! The struct should implement Deserialize from serde.
//! Supported file formats are JSON and Java-style `KEY=VALUE` properties.

use std::{
    fmt::Debug,
    fs,
    io::BufReader,
    path::{Path, PathBuf},
};

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::serde::SerdeResponseParse;

pub const DEFAULT_PROJECT: &str = "walletsScan";

pub enum FileFormat {
    JSON,
    Properties,
}

/// Directory holding every input of a scan, `<cwd>/resource/config/<project>` by default.
#[derive(Clone, Debug, PartialEq)]
pub struct ProjectDir {
    root: PathBuf,
}

impl ProjectDir {
    pub fn new(project: &str) -> crate::Result<Self> {
        let cwd = std::env::current_dir().map_err(crate::Error::CurrentDirFailed)?;
        Ok(Self::with_root(
            cwd.join("resource").join("config").join(project),
        ))
    }

    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn file(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }
}

pub trait DiskStorageInterface
where
    Self: Sized + Debug + Default + DeserializeOwned,
{
    const FILE_NAME: &'static str;
    const FORMAT: FileFormat;

    /// Get the path to the file
    fn path(dir: &ProjectDir) -> PathBuf {
        dir.file(Self::FILE_NAME)
    }

    /// Load the content from the file if it exists otherwise return the default value
    fn load(dir: &ProjectDir) -> crate::Result<Self> {
        let path = Self::path(dir);

        if !path.exists() {
            return Ok(Self::default());
        }

        let content =
            fs::read_to_string(&path).map_err(|e| crate::Error::FileReadFailed(path.clone(), e))?;

        match Self::FORMAT {
            FileFormat::JSON => content
                .as_str()
                .serde_parse_custom()
                .map_err(|e| crate::Error::JsonParsingFailed(path, e)),
            FileFormat::Properties => {
                let properties = parse_properties(&path)?;
                (&properties)
                    .serde_parse_custom()
                    .map_err(|e| crate::Error::PropertiesParsingFailed(path, e.to_string()))
            }
        }
    }
}

/// Reads a Java properties file (`KEY=VALUE` or `KEY: VALUE`) into a JSON object of
/// string values. Values are taken literally.
fn parse_properties(path: &Path) -> crate::Result<Value> {
    let file =
        fs::File::open(path).map_err(|e| crate::Error::FileReadFailed(path.to_path_buf(), e))?;
    let properties = java_properties::read(BufReader::new(file))
        .map_err(|e| crate::Error::PropertiesParsingFailed(path.to_path_buf(), e.to_string()))?;

    Ok(Value::Object(
        properties
            .into_iter()
            .map(|(key, value)| (key, Value::String(value)))
            .collect::<Map<String, Value>>(),
    ))
}
