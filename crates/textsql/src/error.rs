//! Error types for textsql
//!
//! Each pipeline stage has its own error enum; [`Error`] wraps them so the
//! binary can surface any failure verbatim and map it to a non-zero exit.
//! Messages name only their own context; the underlying cause is reached
//! through [`std::error::Error::source`], so print chains with `{:#}`
//! (anyhow) or walk the sources.

use crate::format::Format;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error(transparent)]
    Import(#[from] ImportError),

    #[error(transparent)]
    Query(#[from] QueryError),

    #[error(transparent)]
    Write(#[from] WriteError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Connection error")]
    Connection(#[from] DriverError),
}

/// Malformed table references found while scanning the query text.
#[derive(Error, Debug)]
pub enum ResolveError {
    #[error("Unterminated quoted table reference at byte {position}: {fragment}")]
    UnterminatedQuote { position: usize, fragment: String },

    #[error("Glob pattern matched no files: {0}")]
    EmptyGlob(String),

    #[error("Invalid glob pattern {pattern}")]
    InvalidGlob {
        pattern: String,
        #[source]
        source: glob::PatternError,
    },

    #[error("Table reference {path} is requested as both {first} and {second}")]
    ConflictingFormat {
        path: String,
        first: Format,
        second: Format,
    },
}

#[derive(Error, Debug)]
pub enum ImportError {
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Failed to read {path}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("{path}: malformed record {record}: {message}")]
    Malformed {
        path: String,
        record: u64,
        message: String,
    },

    #[error("{path}: record {record} has {found} fields, expected {expected}")]
    Arity {
        path: String,
        record: u64,
        found: usize,
        expected: usize,
    },

    #[error("{path}: columns {found:?} differ from {expected:?} of the first matched file")]
    SchemaMismatch {
        path: String,
        expected: Vec<String>,
        found: Vec<String>,
    },

    #[error("Failed to create table {table}")]
    CreateTable {
        table: String,
        #[source]
        source: DriverError,
    },

    #[error("Failed to load rows into {table}")]
    Load {
        table: String,
        #[source]
        source: DriverError,
    },
}

/// An error reported by the backing engine while running the rewritten query.
#[derive(Error, Debug)]
#[error("Query error in {sql}")]
pub struct QueryError {
    pub sql: String,
    #[source]
    pub source: DriverError,
}

#[derive(Error, Debug)]
pub enum WriteError {
    #[error("Failed to write output")]
    Io(#[from] io::Error),

    #[error("CSV error")]
    Csv(#[from] csv::Error),

    #[error("JSON error")]
    Json(#[from] serde_json::Error),
}

/// Errors raised by a [`Driver`](crate::sql::Driver) implementation.
#[derive(Error, Debug)]
pub enum DriverError {
    #[error("SQLite error")]
    Sqlite(#[from] rusqlite::Error),

    #[cfg(feature = "postgres")]
    #[error("PostgreSQL error")]
    Postgres(#[from] postgres::Error),

    #[error("Unsupported engine: {0}")]
    UnsupportedEngine(String),

    #[error("Already disconnected")]
    Disconnected,

    #[error("Table {0} already exists")]
    TableExists(String),

    /// The result sink failed while the engine was streaming rows.
    #[error(transparent)]
    Sink(#[from] WriteError),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Invalid config file {path}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Database {0} is not defined in the config file")]
    UnknownDatabase(String),

    #[error("Invalid delimiter {0:?}: expected a single byte")]
    InvalidDelimiter(String),
}
