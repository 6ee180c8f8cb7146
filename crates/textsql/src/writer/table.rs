//! Boxed table formats. Both need every row to size their columns, so rows
//! are buffered until `post_write`.

use super::Writer;
use crate::error::WriteError;
use crate::models::{ResultColumn, Value};
use comfy_table::presets::UTF8_FULL_CONDENSED;
use comfy_table::{Cell, CellAlignment, ContentArrangement, Table};
use std::io::Write;
use tabled::builder::Builder;
use tabled::settings::Style;

pub struct AsciiTableWriter<'a> {
    out: Box<dyn Write + 'a>,
    table: Table,
    width: usize,
}

impl<'a> AsciiTableWriter<'a> {
    pub fn new(out: Box<dyn Write + 'a>) -> Self {
        let mut table = Table::new();
        table
            .load_preset(UTF8_FULL_CONDENSED)
            .set_content_arrangement(ContentArrangement::Disabled);
        Self {
            out,
            table,
            width: 0,
        }
    }
}

impl Writer for AsciiTableWriter<'_> {
    fn pre_write(&mut self, columns: &[ResultColumn]) -> Result<(), WriteError> {
        self.width = columns.len();
        self.table
            .set_header(columns.iter().map(|c| Cell::new(&c.name)));
        Ok(())
    }

    fn write_row(&mut self, values: &[Value]) -> Result<(), WriteError> {
        let cells: Vec<Cell> = values
            .iter()
            .map(|value| {
                let cell = Cell::new(value.render());
                match value {
                    Value::Integer(_) | Value::Real(_) => cell.set_alignment(CellAlignment::Right),
                    _ => cell,
                }
            })
            .collect();
        self.table.add_row(cells);
        Ok(())
    }

    fn post_write(&mut self) -> Result<(), WriteError> {
        if self.width > 0 {
            writeln!(self.out, "{}", self.table)?;
        }
        self.out.flush()?;
        Ok(())
    }
}

pub struct MarkdownWriter<'a> {
    out: Box<dyn Write + 'a>,
    records: Vec<Vec<String>>,
}

impl<'a> MarkdownWriter<'a> {
    pub fn new(out: Box<dyn Write + 'a>) -> Self {
        Self {
            out,
            records: Vec::new(),
        }
    }
}

/// Keep a cell inside its markdown column.
fn md_escape(text: &str) -> String {
    text.replace('|', "\\|").replace(['\r', '\n'], " ")
}

impl Writer for MarkdownWriter<'_> {
    fn pre_write(&mut self, columns: &[ResultColumn]) -> Result<(), WriteError> {
        self.records = vec![columns.iter().map(|c| md_escape(&c.name)).collect()];
        Ok(())
    }

    fn write_row(&mut self, values: &[Value]) -> Result<(), WriteError> {
        self.records
            .push(values.iter().map(|v| md_escape(&v.render())).collect());
        Ok(())
    }

    fn post_write(&mut self) -> Result<(), WriteError> {
        if self.records.first().is_some_and(|names| !names.is_empty()) {
            let mut builder = Builder::default();
            for record in self.records.drain(..) {
                builder.push_record(record);
            }
            let mut table = builder.build();
            table.with(Style::markdown());
            writeln!(self.out, "{}", table)?;
        }
        self.out.flush()?;
        Ok(())
    }
}
