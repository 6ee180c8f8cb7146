//! PostgreSQL driver over the blocking `postgres` client.

use super::{quote_identifier, Driver, Engine, ResultSink};
use crate::error::DriverError;
use crate::models::{Column, ColumnType, ResultColumn, Value};
use postgres::types::{ToSql, Type};
use postgres::{Client, NoTls, SimpleQueryMessage};
use std::collections::HashMap;

/// Bind parameters allowed in one statement by the wire protocol.
const MAX_PARAMS: usize = 65535;

/// Upper bound on rows per multi-row INSERT.
const MAX_ROWS_PER_INSERT: usize = 1000;

/// Rows pulled from the result cursor per round trip.
const FETCH_ROWS: usize = 1000;

const CURSOR: &str = "textsql_result";

pub struct PostgresDriver {
    client: Client,
    /// Current column types of the tables created in this session.
    tables: HashMap<String, Vec<ColumnType>>,
}

impl PostgresDriver {
    pub fn open(dsn: &str) -> Result<Self, DriverError> {
        let client = Client::connect(dsn, NoTls)?;
        Ok(Self {
            client,
            tables: HashMap::new(),
        })
    }

    /// Retype numeric columns to text when a batch carries a cell that kept
    /// its text form, and return the column types to bind with.
    fn widen(
        &mut self,
        name: &str,
        columns: &[Column],
        rows: &[Vec<Value>],
    ) -> Result<Vec<ColumnType>, DriverError> {
        let mut types = self
            .tables
            .get(name)
            .cloned()
            .unwrap_or_else(|| columns.iter().map(|c| c.ty).collect());

        for (i, column) in columns.iter().enumerate() {
            if types[i] == ColumnType::Text {
                continue;
            }
            let has_text = rows
                .iter()
                .any(|row| matches!(row.get(i), Some(Value::Text(_)) | Some(Value::Blob(_))));
            if has_text {
                let ident = quote_identifier(&column.name);
                let sql = format!(
                    "ALTER TABLE {} ALTER COLUMN {} TYPE text USING {}::text",
                    quote_identifier(name),
                    ident,
                    ident
                );
                tracing::debug!("{}", sql);
                self.client.batch_execute(&sql)?;
                types[i] = ColumnType::Text;
            }
        }

        self.tables.insert(name.to_string(), types.clone());
        Ok(types)
    }
}

fn postgres_type(ty: ColumnType) -> &'static str {
    match ty {
        ColumnType::Integer => "bigint",
        ColumnType::Real => "double precision",
        ColumnType::Text => "text",
    }
}

fn column_type(ty: &Type) -> ColumnType {
    if [Type::INT2, Type::INT4, Type::INT8, Type::OID].contains(ty) {
        ColumnType::Integer
    } else if [Type::FLOAT4, Type::FLOAT8, Type::NUMERIC].contains(ty) {
        ColumnType::Real
    } else {
        ColumnType::Text
    }
}

fn bind(value: &Value, ty: ColumnType) -> Box<dyn ToSql + Sync> {
    match ty {
        ColumnType::Integer => Box::new(match value {
            Value::Integer(n) => Some(*n),
            _ => None::<i64>,
        }),
        ColumnType::Real => Box::new(match value {
            Value::Real(n) => Some(*n),
            Value::Integer(n) => Some(*n as f64),
            _ => None::<f64>,
        }),
        ColumnType::Text => Box::new(match value {
            Value::Null => None::<String>,
            other => Some(other.render().into_owned()),
        }),
    }
}

/// Parse a text-protocol cell according to its result column type.
fn parse_cell(cell: Option<&str>, ty: ColumnType) -> Value {
    let Some(text) = cell else {
        return Value::Null;
    };
    match ty {
        ColumnType::Integer => text
            .parse()
            .map(Value::Integer)
            .unwrap_or_else(|_| Value::Text(text.to_string())),
        ColumnType::Real => text
            .parse()
            .map(Value::Real)
            .unwrap_or_else(|_| Value::Text(text.to_string())),
        ColumnType::Text => Value::Text(text.to_string()),
    }
}

/// Send each data row of a text-protocol batch to the sink, returning the
/// number of rows sent.
fn emit_rows(
    messages: &[SimpleQueryMessage],
    types: &[ColumnType],
    sink: &mut dyn ResultSink,
) -> Result<usize, DriverError> {
    let mut values = Vec::with_capacity(types.len());
    let mut count = 0;
    for message in messages {
        if let SimpleQueryMessage::Row(row) = message {
            values.clear();
            for (i, ty) in types.iter().enumerate().take(row.len()) {
                values.push(parse_cell(row.get(i), *ty));
            }
            sink.row(&values)?;
            count += 1;
        }
    }
    Ok(count)
}

fn insert_sql(table: &str, width: usize, rows: usize) -> String {
    let mut sql = format!("INSERT INTO {} VALUES ", quote_identifier(table));
    let mut param = 1;
    for r in 0..rows {
        if r > 0 {
            sql.push_str(", ");
        }
        sql.push('(');
        for c in 0..width {
            if c > 0 {
                sql.push_str(", ");
            }
            sql.push_str(&format!("${}", param));
            param += 1;
        }
        sql.push(')');
    }
    sql
}

impl Driver for PostgresDriver {
    fn engine(&self) -> Engine {
        Engine::Postgres
    }

    fn exec(&mut self, sql: &str) -> Result<(), DriverError> {
        self.client.batch_execute(sql)?;
        Ok(())
    }

    fn query(&mut self, sql: &str, sink: &mut dyn ResultSink) -> Result<(), DriverError> {
        let stmt = self.client.prepare(sql)?;
        let columns: Vec<ResultColumn> = stmt
            .columns()
            .iter()
            .map(|c| ResultColumn::new(c.name(), Some(column_type(c.type_()))))
            .collect();
        sink.columns(&columns)?;
        if columns.is_empty() {
            self.client.execute(&stmt, &[])?;
            return Ok(());
        }

        let types: Vec<ColumnType> = columns
            .iter()
            .map(|c| c.decl_type.unwrap_or(ColumnType::Text))
            .collect();

        let mut tx = self.client.transaction()?;
        let declare = format!("DECLARE {} NO SCROLL CURSOR FOR {}", CURSOR, sql);
        if let Err(e) = tx.batch_execute(&declare) {
            // Only SELECT and VALUES can back a cursor.
            tracing::debug!("No cursor for query, reading it whole: {}", e);
            drop(tx);
            let messages = self.client.simple_query(sql)?;
            emit_rows(&messages, &types, sink)?;
            return Ok(());
        }

        let fetch = format!("FETCH {} FROM {}", FETCH_ROWS, CURSOR);
        loop {
            let messages = tx.simple_query(&fetch)?;
            if emit_rows(&messages, &types, sink)? < FETCH_ROWS {
                break;
            }
        }
        tx.batch_execute(&format!("CLOSE {}", CURSOR))?;
        tx.commit()?;
        Ok(())
    }

    fn create_table(&mut self, name: &str, columns: &[Column]) -> Result<(), DriverError> {
        let defs: Vec<String> = columns
            .iter()
            .map(|c| format!("{} {}", quote_identifier(&c.name), postgres_type(c.ty)))
            .collect();
        let sql = format!(
            "CREATE TEMPORARY TABLE {} ({})",
            quote_identifier(name),
            defs.join(", ")
        );
        tracing::debug!("{}", sql);
        self.client.batch_execute(&sql)?;
        self.tables
            .insert(name.to_string(), columns.iter().map(|c| c.ty).collect());
        Ok(())
    }

    fn bulk_import(
        &mut self,
        name: &str,
        columns: &[Column],
        rows: &[Vec<Value>],
    ) -> Result<u64, DriverError> {
        if rows.is_empty() || columns.is_empty() {
            return Ok(0);
        }
        let types = self.widen(name, columns, rows)?;
        let per_insert = (MAX_PARAMS / columns.len()).clamp(1, MAX_ROWS_PER_INSERT);

        let mut tx = self.client.transaction()?;
        for chunk in rows.chunks(per_insert) {
            let sql = insert_sql(name, columns.len(), chunk.len());
            let params: Vec<Box<dyn ToSql + Sync>> = chunk
                .iter()
                .flat_map(|row| {
                    types
                        .iter()
                        .enumerate()
                        .map(move |(i, ty)| bind(row.get(i).unwrap_or(&Value::Null), *ty))
                })
                .collect();
            let refs: Vec<&(dyn ToSql + Sync)> = params.iter().map(|p| p.as_ref()).collect();
            tx.execute(sql.as_str(), &refs)?;
        }
        tx.commit()?;
        Ok(rows.len() as u64)
    }

    fn disconnect(self: Box<Self>) -> Result<(), DriverError> {
        self.client.close()?;
        Ok(())
    }
}
