use super::Writer;
use crate::error::WriteError;
use crate::models::{ResultColumn, Value};
use crate::reader::escape_ltsv;
use std::io::Write;

/// LTSV output. Backslash, tab, newline and carriage return in labels and
/// values are written as `\\`, `\t`, `\n` and `\r`.
pub struct LtsvWriter<'a> {
    out: Box<dyn Write + 'a>,
    names: Vec<String>,
}

impl<'a> LtsvWriter<'a> {
    pub fn new(out: Box<dyn Write + 'a>) -> Self {
        Self {
            out,
            names: Vec::new(),
        }
    }
}

impl Writer for LtsvWriter<'_> {
    fn pre_write(&mut self, columns: &[ResultColumn]) -> Result<(), WriteError> {
        self.names = columns.iter().map(|c| c.name.clone()).collect();
        Ok(())
    }

    fn write_row(&mut self, values: &[Value]) -> Result<(), WriteError> {
        if self.names.is_empty() {
            return Ok(());
        }
        let fields: Vec<String> = self
            .names
            .iter()
            .zip(values)
            .map(|(name, value)| {
                format!("{}:{}", escape_ltsv(name), escape_ltsv(&value.render()))
            })
            .collect();
        writeln!(self.out, "{}", fields.join("\t"))?;
        Ok(())
    }

    fn post_write(&mut self) -> Result<(), WriteError> {
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
    fn test_ltsv() {
        assert_eq!(
            render(OutputFormat::Ltsv, &WriteOptions::default()),
            "id:1\tname:Orange\nid:2\tname:\n"
        );
    }

    #[test]
    fn test_ltsv_escapes_control_characters() {
        let columns = vec![ResultColumn::new("a\tb", None)];
        let rows = vec![vec![Value::Text("x\ty\nz\\".into())]];
        assert_eq!(
            render_rows(OutputFormat::Ltsv, &WriteOptions::default(), &columns, &rows),
            "a\\tb:x\\ty\\nz\\\\\n"
        );
    }
}
