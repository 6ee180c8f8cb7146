//! Backing SQL engines
//!
//! A [`Driver`] is one open connection to an engine. The query pipeline only
//! talks to engines through this trait; [`connect`] picks the implementation
//! from an [`Engine`] tag and a data source name.

mod session;
mod sqlite;

#[cfg(feature = "postgres")]
mod postgres;

pub use session::Session;
pub use sqlite::SqliteDriver;

#[cfg(feature = "postgres")]
pub use self::postgres::PostgresDriver;

use crate::error::{DriverError, WriteError};
use crate::models::{Column, ResultColumn, Value};
use crate::writer::Writer;
use serde::Deserialize;
use std::fmt;

/// Supported backing engines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Engine {
    /// Embedded SQLite, in memory unless a DSN names a file
    #[default]
    #[value(alias = "sqlite3")]
    #[serde(alias = "sqlite3")]
    Sqlite,
    /// PostgreSQL server reached through a connection string
    #[value(alias = "postgresql")]
    #[serde(alias = "postgresql")]
    Postgres,
}

impl Engine {
    pub fn name(&self) -> &'static str {
        match self {
            Engine::Sqlite => "sqlite",
            Engine::Postgres => "postgres",
        }
    }
}

impl fmt::Display for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Receives query results as the engine produces them.
pub trait ResultSink {
    fn columns(&mut self, columns: &[ResultColumn]) -> Result<(), WriteError>;
    fn row(&mut self, values: &[Value]) -> Result<(), WriteError>;
}

impl<'a> ResultSink for Box<dyn Writer + 'a> {
    fn columns(&mut self, columns: &[ResultColumn]) -> Result<(), WriteError> {
        self.pre_write(columns)
    }

    fn row(&mut self, values: &[Value]) -> Result<(), WriteError> {
        self.write_row(values)
    }
}

/// Sink that keeps the whole result in memory.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct RowBuffer {
    pub columns: Vec<ResultColumn>,
    pub rows: Vec<Vec<Value>>,
}

impl ResultSink for RowBuffer {
    fn columns(&mut self, columns: &[ResultColumn]) -> Result<(), WriteError> {
        self.columns = columns.to_vec();
        Ok(())
    }

    fn row(&mut self, values: &[Value]) -> Result<(), WriteError> {
        self.rows.push(values.to_vec());
        Ok(())
    }
}

/// One open connection to a backing engine.
pub trait Driver {
    fn engine(&self) -> Engine;

    /// Quote an identifier so any table name is syntactically legal.
    fn quote_identifier(&self, ident: &str) -> String {
        quote_identifier(ident)
    }

    /// Run a statement that returns no rows.
    fn exec(&mut self, sql: &str) -> Result<(), DriverError>;

    /// Run a query, handing column metadata and then each row to `sink`.
    fn query(&mut self, sql: &str, sink: &mut dyn ResultSink) -> Result<(), DriverError>;

    /// Create a session-scoped table.
    fn create_table(&mut self, name: &str, columns: &[Column]) -> Result<(), DriverError>;

    /// Insert rows into a table made by [`create_table`](Driver::create_table).
    /// Returns the number of rows inserted.
    fn bulk_import(
        &mut self,
        name: &str,
        columns: &[Column],
        rows: &[Vec<Value>],
    ) -> Result<u64, DriverError>;

    /// Close the connection, dropping every table created through it.
    fn disconnect(self: Box<Self>) -> Result<(), DriverError>;
}

/// Standard SQL identifier quoting: wrap in `"` and double embedded quotes.
pub fn quote_identifier(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

/// Open a connection to `engine`.
///
/// For SQLite an empty DSN (or `:memory:`) opens a private in-memory database.
pub fn connect(engine: Engine, dsn: &str) -> Result<Box<dyn Driver>, DriverError> {
    tracing::debug!("Connecting to {}", engine);
    match engine {
        Engine::Sqlite => Ok(Box::new(SqliteDriver::open(dsn)?)),
        #[cfg(feature = "postgres")]
        Engine::Postgres => Ok(Box::new(PostgresDriver::open(dsn)?)),
        #[cfg(not(feature = "postgres"))]
        Engine::Postgres => Err(DriverError::UnsupportedEngine(format!(
            "{} (built without the postgres feature)",
            engine
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quote_identifier() {
        assert_eq!(quote_identifier("test"), "\"test\"");
        assert_eq!(quote_identifier("a\"b"), "\"a\"\"b\"");
    }

    #[test]
    fn test_connect_sqlite_in_memory() {
        let driver = connect(Engine::Sqlite, "").unwrap();
        assert_eq!(driver.engine(), Engine::Sqlite);
        driver.disconnect().unwrap();
    }

    #[test]
    fn test_engine_names() {
        assert_eq!(Engine::Sqlite.to_string(), "sqlite");
        let engine: Engine = serde_json::from_str("\"postgresql\"").unwrap();
        assert_eq!(engine, Engine::Postgres);
    }
}
