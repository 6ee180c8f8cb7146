//! SQLite driver over rusqlite.

use super::{quote_identifier, Driver, Engine, ResultSink};
use crate::error::DriverError;
use crate::models::{Column, ColumnType, ResultColumn, Value};
use rusqlite::{params_from_iter, Connection};

pub struct SqliteDriver {
    conn: Connection,
}

impl SqliteDriver {
    /// Open `dsn` as a database file, or a fresh in-memory database when
    /// `dsn` is empty or `:memory:`.
    pub fn open(dsn: &str) -> Result<Self, DriverError> {
        let conn = if dsn.is_empty() || dsn == ":memory:" {
            Connection::open_in_memory()?
        } else {
            Connection::open(dsn)?
        };
        Ok(Self { conn })
    }
}

fn sqlite_type(ty: ColumnType) -> &'static str {
    match ty {
        ColumnType::Integer => "INTEGER",
        ColumnType::Real => "REAL",
        ColumnType::Text => "TEXT",
    }
}

impl Driver for SqliteDriver {
    fn engine(&self) -> Engine {
        Engine::Sqlite
    }

    fn exec(&mut self, sql: &str) -> Result<(), DriverError> {
        self.conn.execute_batch(sql)?;
        Ok(())
    }

    fn query(&mut self, sql: &str, sink: &mut dyn ResultSink) -> Result<(), DriverError> {
        let mut stmt = self.conn.prepare(sql)?;
        let columns: Vec<ResultColumn> = stmt
            .columns()
            .iter()
            .map(|c| ResultColumn::new(c.name(), c.decl_type().map(ColumnType::from_decl)))
            .collect();
        sink.columns(&columns)?;

        let count = columns.len();
        let mut values = Vec::with_capacity(count);
        let mut rows = stmt.query([])?;
        while let Some(row) = rows.next()? {
            values.clear();
            for i in 0..count {
                values.push(Value::from(row.get_ref(i)?));
            }
            sink.row(&values)?;
        }
        Ok(())
    }

    fn create_table(&mut self, name: &str, columns: &[Column]) -> Result<(), DriverError> {
        // A TEMP table would shadow a main table of the same name.
        let exists = self
            .conn
            .prepare(
                "SELECT 1 FROM sqlite_master WHERE name = ?1 COLLATE NOCASE \
                 UNION ALL SELECT 1 FROM sqlite_temp_master WHERE name = ?1 COLLATE NOCASE",
            )?
            .exists([name])?;
        if exists {
            return Err(DriverError::TableExists(name.to_string()));
        }

        let defs: Vec<String> = columns
            .iter()
            .map(|c| format!("{} {}", quote_identifier(&c.name), sqlite_type(c.ty)))
            .collect();
        let sql = format!(
            "CREATE TEMP TABLE {} ({})",
            quote_identifier(name),
            defs.join(", ")
        );
        tracing::debug!("{}", sql);
        self.conn.execute(&sql, [])?;
        Ok(())
    }

    fn bulk_import(
        &mut self,
        name: &str,
        columns: &[Column],
        rows: &[Vec<Value>],
    ) -> Result<u64, DriverError> {
        let placeholders = vec!["?"; columns.len()].join(", ");
        let sql = format!(
            "INSERT INTO {} VALUES ({})",
            quote_identifier(name),
            placeholders
        );

        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare_cached(&sql)?;
            for row in rows {
                stmt.execute(params_from_iter(row.iter()))?;
            }
        }
        tx.commit()?;
        Ok(rows.len() as u64)
    }

    fn disconnect(self: Box<Self>) -> Result<(), DriverError> {
        self.conn.close().map_err(|(_, e)| DriverError::Sqlite(e))
    }
}
