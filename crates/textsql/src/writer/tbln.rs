use super::Writer;
use crate::error::WriteError;
use crate::models::{ColumnType, ResultColumn, Value};
use crate::reader::join_row;
use std::io::Write;

fn tbln_type(ty: ColumnType) -> &'static str {
    match ty {
        ColumnType::Integer => "int",
        ColumnType::Real => "numeric",
        ColumnType::Text => "text",
    }
}

/// TBLN output with `; name:` and `; type:` extras.
///
/// Columns without a declared type take the type of their first non-null
/// value, so the extras are written with the first row. The extras carry
/// the schema and are written regardless of the output header flag.
pub struct TblnWriter<'a> {
    out: Box<dyn Write + 'a>,
    columns: Vec<ResultColumn>,
    header_written: bool,
}

impl<'a> TblnWriter<'a> {
    pub fn new(out: Box<dyn Write + 'a>) -> Self {
        Self {
            out,
            columns: Vec::new(),
            header_written: false,
        }
    }

    fn write_header(&mut self, first: Option<&[Value]>) -> Result<(), WriteError> {
        self.header_written = true;
        if self.columns.is_empty() {
            return Ok(());
        }
        let types: Vec<&str> = self
            .columns
            .iter()
            .enumerate()
            .map(|(i, c)| {
                let ty = c
                    .decl_type
                    .or_else(|| first.and_then(|row| row.get(i)).and_then(Value::column_type))
                    .unwrap_or(ColumnType::Text);
                tbln_type(ty)
            })
            .collect();
        let names = join_row(self.columns.iter().map(|c| c.name.as_str()));
        writeln!(self.out, "; name: {}", names)?;
        writeln!(self.out, "; type: {}", join_row(types))?;
        Ok(())
    }
}

impl Writer for TblnWriter<'_> {
    fn pre_write(&mut self, columns: &[ResultColumn]) -> Result<(), WriteError> {
        self.columns = columns.to_vec();
        Ok(())
    }

    fn write_row(&mut self, values: &[Value]) -> Result<(), WriteError> {
        if !self.header_written {
            self.write_header(Some(values))?;
        }
        if self.columns.is_empty() {
            return Ok(());
        }
        let cells: Vec<_> = values.iter().map(Value::render).collect();
        writeln!(self.out, "{}", join_row(cells.iter().map(|c| &**c)))?;
        Ok(())
    }

    fn post_write(&mut self) -> Result<(), WriteError> {
        if !self.header_written {
            self.write_header(None)?;
        }
        self.out.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::{render, render_rows};
    use super::super::{OutputFormat, WriteOptions};
    use crate::models::{ResultColumn, Value};

    #[test]
    fn test_tbln() {
        assert_eq!(
            render(OutputFormat::Tbln, &WriteOptions::default()),
            "; name: | id | name |\n; type: | int | text |\n| 1 | Orange |\n| 2 |  |\n"
        );
    }

    #[test]
    fn test_tbln_types_from_first_row() {
        let columns = vec![ResultColumn::new("a", None), ResultColumn::new("b", None)];
        let rows = vec![vec![Value::Real(1.5), Value::Text("x|y".into())]];
        assert_eq!(
            render_rows(OutputFormat::Tbln, &WriteOptions::default(), &columns, &rows),
            "; name: | a | b |\n; type: | numeric | text |\n| 1.5 | x||y |\n"
        );
    }

    #[test]
    fn test_tbln_empty_result_still_has_header() {
        let columns = vec![ResultColumn::new("a", None)];
        assert_eq!(
            render_rows(OutputFormat::Tbln, &WriteOptions::default(), &columns, &[]),
            "; name: | a |\n; type: | text |\n"
        );
    }
}
