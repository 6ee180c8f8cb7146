//! Result writers
//!
//! A writer receives the column metadata once, then each row in order, then
//! a final `post_write`. Streaming formats emit rows as they arrive; the
//! table formats (`at`, `md`) buffer until `post_write` to size columns.

mod csv;
mod json;
mod ltsv;
mod raw;
mod table;
mod tbln;
mod vf;

pub use self::csv::CsvWriter;
pub use self::json::JsonWriter;
pub use self::ltsv::LtsvWriter;
pub use self::raw::RawWriter;
pub use self::table::{AsciiTableWriter, MarkdownWriter};
pub use self::tbln::TblnWriter;
pub use self::vf::VerticalWriter;

use crate::error::WriteError;
use crate::models::{ResultColumn, Value};
use std::io::Write;

/// Output encodings selectable on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Comma separated values
    #[default]
    Csv,
    /// Labeled tab separated values
    Ltsv,
    /// ASCII table
    At,
    /// Markdown table
    Md,
    /// JSON array of objects
    Json,
    /// One JSON object per line
    Jsonl,
    /// Delimiter-joined cells without quoting
    Raw,
    /// Vertical, one `name: value` line per column
    Vf,
    /// TBLN with name and type extras
    Tbln,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteOptions {
    /// Emit a header of column names (csv and raw).
    pub header: bool,
    /// Field delimiter (csv and raw).
    pub delimiter: Option<String>,
    /// Quote every CSV field.
    pub quote_all: bool,
}

pub trait Writer {
    /// Called once with the result columns before any row.
    fn pre_write(&mut self, columns: &[ResultColumn]) -> Result<(), WriteError>;

    fn write_row(&mut self, values: &[Value]) -> Result<(), WriteError>;

    /// Called once after the last row; flushes buffered output.
    fn post_write(&mut self) -> Result<(), WriteError>;
}

/// Build the writer for `format` over `out`.
pub fn new_writer<'a>(
    format: OutputFormat,
    out: Box<dyn Write + 'a>,
    options: &WriteOptions,
) -> Box<dyn Writer + 'a> {
    match format {
        OutputFormat::Csv => Box::new(CsvWriter::new(out, options)),
        OutputFormat::Ltsv => Box::new(LtsvWriter::new(out)),
        OutputFormat::At => Box::new(AsciiTableWriter::new(out)),
        OutputFormat::Md => Box::new(MarkdownWriter::new(out)),
        OutputFormat::Json => Box::new(JsonWriter::new(out, false)),
        OutputFormat::Jsonl => Box::new(JsonWriter::new(out, true)),
        OutputFormat::Raw => Box::new(RawWriter::new(out, options)),
        OutputFormat::Vf => Box::new(VerticalWriter::new(out)),
        OutputFormat::Tbln => Box::new(TblnWriter::new(out)),
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use crate::models::ColumnType;

    /// Run a two-column, two-row result through `format` and return the text.
    pub fn render(format: OutputFormat, options: &WriteOptions) -> String {
        let columns = vec![
            ResultColumn::new("id", Some(ColumnType::Integer)),
            ResultColumn::new("name", Some(ColumnType::Text)),
        ];
        let rows = vec![
            vec![Value::Integer(1), Value::Text("Orange".into())],
            vec![Value::Integer(2), Value::Null],
        ];
        render_rows(format, options, &columns, &rows)
    }

    pub fn render_rows(
        format: OutputFormat,
        options: &WriteOptions,
        columns: &[ResultColumn],
        rows: &[Vec<Value>],
    ) -> String {
        let mut buf = Vec::new();
        {
            let mut writer = new_writer(format, Box::new(&mut buf), options);
            writer.pre_write(columns).unwrap();
            for row in rows {
                writer.write_row(row).unwrap();
            }
            writer.post_write().unwrap();
        }
        String::from_utf8(buf).unwrap()
    }
}
