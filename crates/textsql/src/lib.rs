//! # textsql
//!
//! Run SQL queries directly against CSV, LTSV, JSON and TBLN files.
//!
//! File paths written in the `FROM`/`JOIN` clauses of a query are treated as
//! virtual tables: each referenced file is detected, decompressed if needed,
//! type-inferred and loaded into a backing relational engine (SQLite by
//! default, PostgreSQL optionally), the query is rewritten to reference the
//! loaded tables, and the result set is rendered in one of several output
//! formats.
//!
//! ## Quick Start
//!
//! ```no_run
//! use textsql::{Config, QueryRunner};
//!
//! fn main() -> textsql::Result<()> {
//!     let runner = QueryRunner::new(Config::default());
//!     let mut out = std::io::stdout();
//!     runner.run("SELECT c1, c2 FROM data/fruit.csv WHERE c1 > 1", &mut out)?;
//!     Ok(())
//! }
//! ```
//!
//! ## Pipeline
//!
//! - [`resolve`] finds file references in the query text and rewrites them.
//! - [`format`] detects the encoding and compression of each file.
//! - [`reader`] turns a file into header + records.
//! - [`guess`] infers integer/real/text column types from a sample.
//! - [`import`] creates and fills one backing table per reference.
//! - [`sql`] is the driver contract plus the SQLite and PostgreSQL drivers.
//! - [`writer`] renders the result set.

pub mod analyze;
pub mod cli;
pub mod config;
pub mod error;
pub mod format;
pub mod guess;
pub mod import;
pub mod models;
pub mod query;
pub mod reader;
pub mod resolve;
pub mod sql;
pub mod writer;

pub use config::{Config, EngineConfig};
pub use error::{
    ConfigError, DriverError, Error, ImportError, QueryError, ResolveError, Result, WriteError,
};
pub use format::{Format, InputFormat};
pub use models::{Column, ColumnType, ResultColumn, Value};
pub use query::QueryRunner;
pub use resolve::{Resolution, Resolver, TableReference};
pub use sql::{Driver, Engine, Session};
pub use writer::{OutputFormat, WriteOptions, Writer};
