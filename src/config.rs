//! Project configuration
//!
//! ```toml
//! index = "wirekit-index.json"  # declaration index dumped by the type checker
//! root = "."                    # project root, source paths are relative to it
//! suffix = "generated"          # app.ts -> app.generated.ts
//! wrappers = ["Module"]         # type names tagging containers
//! ```
//!
//! Relative paths are resolved against the directory of the configuration file.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::Error;
use crate::pipeline::Options;
use crate::scan::DEFAULT_WRAPPER;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub index: PathBuf,
    pub root: PathBuf,
    pub suffix: String,
    pub wrappers: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            index: PathBuf::from("wirekit-index.json"),
            root: PathBuf::from("."),
            suffix: "generated".to_string(),
            wrappers: vec![DEFAULT_WRAPPER.to_string()],
        }
    }
}

impl Config {
    /// Read a configuration file and anchor its paths to the file's directory.
    pub fn load(path: &Path) -> Result<Self, Error> {
        let raw = std::fs::read_to_string(path).map_err(|source| Error::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::parse(&raw).map_err(|source| Error::Config {
            path: path.to_path_buf(),
            source,
        })?;
        let base = path.parent().unwrap_or_else(|| Path::new("."));
        Ok(config.anchored(base))
    }

    pub fn parse(raw: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(raw)
    }

    fn anchored(self, base: &Path) -> Self {
        Self {
            index: base.join(&self.index),
            root: base.join(&self.root),
            ..self
        }
    }

    pub fn options(&self) -> Options {
        Options {
            wrappers: self.wrappers.clone(),
            suffix: self.suffix.clone(),
        }
    }
}
