use super::{WriteOptions, Writer};
use crate::error::WriteError;
use crate::models::{ResultColumn, Value};
use std::io::Write;

/// Cells joined by the delimiter as-is, with no quoting or escaping.
pub struct RawWriter<'a> {
    out: Box<dyn Write + 'a>,
    delimiter: String,
    header: bool,
    width: usize,
}

impl<'a> RawWriter<'a> {
    pub fn new(out: Box<dyn Write + 'a>, options: &WriteOptions) -> Self {
        Self {
            out,
            delimiter: options.delimiter.clone().unwrap_or_else(|| ",".to_string()),
            header: options.header,
            width: 0,
        }
    }
}

impl Writer for RawWriter<'_> {
    fn pre_write(&mut self, columns: &[ResultColumn]) -> Result<(), WriteError> {
        self.width = columns.len();
        if self.header && self.width > 0 {
            let names: Vec<&str> = columns.iter().map(|c| c.name.as_str()).collect();
            writeln!(self.out, "{}", names.join(self.delimiter.as_str()))?;
        }
        Ok(())
    }

    fn write_row(&mut self, values: &[Value]) -> Result<(), WriteError> {
        if self.width == 0 {
            return Ok(());
        }
        let cells: Vec<_> = values.iter().map(Value::render).collect();
        writeln!(self.out, "{}", cells.join(self.delimiter.as_str()))?;
        Ok(())
    }

    fn post_write(&mut self) -> Result<(), WriteError> {
        self.out.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::render_rows;
    use super::super::{OutputFormat, WriteOptions};
    use crate::models::{ResultColumn, Value};

    #[test]
    fn test_raw_does_not_quote() {
        let columns = vec![ResultColumn::new("a", None), ResultColumn::new("b", None)];
        let rows = vec![vec![Value::Text("x,y".into()), Value::Text("\"z\"".into())]];
        let options = WriteOptions {
            header: true,
            delimiter: Some(" | ".into()),
            quote_all: false,
        };
        assert_eq!(
            render_rows(OutputFormat::Raw, &options, &columns, &rows),
            "a | b\nx,y | \"z\"\n"
        );
    }
}
