//! Run configuration
//!
//! [`Config`] drives the library without any command-line layer. The
//! optional JSON config file only names databases:
//!
//! ```json
//! {
//!   "db": "pdb",
//!   "database": {
//!     "sdb": { "driver": "sqlite", "dsn": "/tmp/text.sqlite" },
//!     "pdb": { "driver": "postgres", "dsn": "host=localhost user=postgres" }
//!   }
//! }
//! ```

use crate::error::ConfigError;
use crate::import::ImportOptions;
use crate::resolve::ResolveOptions;
use crate::sql::Engine;
use crate::writer::{OutputFormat, WriteOptions};
use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Backing engine and its data source name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EngineConfig {
    pub engine: Engine,
    /// Empty means the engine's default (an in-memory database for SQLite).
    pub dsn: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Config {
    pub import: ImportOptions,
    pub resolve: ResolveOptions,
    pub write: WriteOptions,
    pub output: OutputFormat,
    pub engine: EngineConfig,
}

impl Config {
    /// Check option combinations that are only invalid together.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.output == OutputFormat::Csv {
            if let Some(delimiter) = &self.write.delimiter {
                parse_byte(delimiter)?;
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseEntry {
    #[serde(default)]
    pub driver: Engine,
    #[serde(default)]
    pub dsn: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConfigFile {
    /// Database used when none is named on the command line.
    #[serde(default)]
    pub db: Option<String>,
    #[serde(default)]
    pub database: HashMap<String, DatabaseEntry>,
}

impl ConfigFile {
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("textsql").join("config.json"))
    }

    /// Load `path`, or the default location when `path` is `None`.
    ///
    /// A missing default file yields an empty config; a missing explicit
    /// file is an error.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::read(path),
            None => match Self::default_path() {
                Some(path) if path.is_file() => Self::read(&path),
                _ => Ok(Self::default()),
            },
        }
    }

    fn read(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::debug!("Loaded config from {}", path.display());
        serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// The engine of database `name`, or of the default database.
    pub fn engine(&self, name: Option<&str>) -> Result<Option<EngineConfig>, ConfigError> {
        let Some(name) = name.or(self.db.as_deref()) else {
            return Ok(None);
        };
        match self.database.get(name) {
            Some(entry) => Ok(Some(EngineConfig {
                engine: entry.driver,
                dsn: entry.dsn.clone(),
            })),
            None => Err(ConfigError::UnknownDatabase(name.to_string())),
        }
    }
}

/// Expand `\t`, `\n`, `\r` and `\\` so delimiters can be typed in a shell.
pub fn unescape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('t') => out.push('\t'),
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('\\') => out.push('\\'),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}

/// A delimiter that must be exactly one byte after unescaping.
pub fn parse_byte(text: &str) -> Result<u8, ConfigError> {
    match unescape(text).as_bytes() {
        [byte] => Ok(*byte),
        _ => Err(ConfigError::InvalidDelimiter(text.to_string())),
    }
}
