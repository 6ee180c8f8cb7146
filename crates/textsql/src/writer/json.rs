use super::Writer;
use crate::error::WriteError;
use crate::models::{ResultColumn, Value};
use std::io::Write;

/// JSON array (or JSON Lines) of one object per row.
///
/// Objects are written key by key so column order and duplicate column
/// names survive exactly as the query produced them.
pub struct JsonWriter<'a> {
    out: Box<dyn Write + 'a>,
    names: Vec<String>,
    lines: bool,
    rows: usize,
}

impl<'a> JsonWriter<'a> {
    pub fn new(out: Box<dyn Write + 'a>, lines: bool) -> Self {
        Self {
            out,
            names: Vec::new(),
            lines,
            rows: 0,
        }
    }

    fn write_object(&mut self, values: &[Value]) -> Result<(), WriteError> {
        self.out.write_all(b"{")?;
        for (i, (name, value)) in self.names.iter().zip(values).enumerate() {
            if i > 0 {
                self.out.write_all(b",")?;
            }
            serde_json::to_writer(&mut self.out, name)?;
            self.out.write_all(b":")?;
            serde_json::to_writer(&mut self.out, &value.to_json())?;
        }
        self.out.write_all(b"}")?;
        Ok(())
    }
}

impl Writer for JsonWriter<'_> {
    fn pre_write(&mut self, columns: &[ResultColumn]) -> Result<(), WriteError> {
        self.names = columns.iter().map(|c| c.name.clone()).collect();
        Ok(())
    }

    fn write_row(&mut self, values: &[Value]) -> Result<(), WriteError> {
        if self.lines {
            self.write_object(values)?;
            self.out.write_all(b"\n")?;
        } else {
            let lead: &[u8] = if self.rows == 0 { b"[\n  " } else { b",\n  " };
            self.out.write_all(lead)?;
            self.write_object(values)?;
        }
        self.rows += 1;
        Ok(())
    }

    fn post_write(&mut self) -> Result<(), WriteError> {
        if !self.lines {
            if self.rows == 0 {
                self.out.write_all(b"[]\n")?;
            } else {
                self.out.write_all(b"\n]\n")?;
            }
        }
        self.out.flush()?;
        Ok(())
    }
}
