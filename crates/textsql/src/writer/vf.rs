use super::Writer;
use crate::error::WriteError;
use crate::models::{ResultColumn, Value};
use std::io::Write;

const RULE_WIDTH: usize = 60;

/// One block per row, one right-aligned `name: value` line per column.
pub struct VerticalWriter<'a> {
    out: Box<dyn Write + 'a>,
    names: Vec<String>,
    name_width: usize,
    rows: usize,
}

impl<'a> VerticalWriter<'a> {
    pub fn new(out: Box<dyn Write + 'a>) -> Self {
        Self {
            out,
            names: Vec::new(),
            name_width: 0,
            rows: 0,
        }
    }
}

impl Writer for VerticalWriter<'_> {
    fn pre_write(&mut self, columns: &[ResultColumn]) -> Result<(), WriteError> {
        self.names = columns.iter().map(|c| c.name.clone()).collect();
        self.name_width = self.names.iter().map(|n| n.chars().count()).max().unwrap_or(0);
        Ok(())
    }

    fn write_row(&mut self, values: &[Value]) -> Result<(), WriteError> {
        if self.names.is_empty() {
            return Ok(());
        }
        self.rows += 1;
        let title = format!("---[ {}]", self.rows);
        let fill = RULE_WIDTH.saturating_sub(title.len());
        writeln!(self.out, "{}{}", title, "-".repeat(fill))?;
        for (name, value) in self.names.iter().zip(values) {
            writeln!(
                self.out,
                "{:>width$}: {}",
                name,
                value.render(),
                width = self.name_width
            )?;
        }
        Ok(())
    }

    fn post_write(&mut self) -> Result<(), WriteError> {
        self.out.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::render;
    use super::super::{OutputFormat, WriteOptions};

    #[test]
    fn test_vertical() {
        let out = render(OutputFormat::Vf, &WriteOptions::default());
        let lines: Vec<&str> = out.lines().collect();
        assert!(lines[0].starts_with("---[ 1]---"));
        assert_eq!(lines[0].len(), 60);
        assert_eq!(lines[1], "  id: 1");
        assert_eq!(lines[2], "name: Orange");
        assert!(lines[3].starts_with("---[ 2]"));
        assert_eq!(lines[5], "name: ");
    }
}
