use super::{read_line, ReadError, ReadOptions, Record, RecordReader};
use crate::models::ColumnType;
use std::io::BufRead;

/// TBLN: a pipe-delimited table whose header lines declare column names
/// (`; name: | a | b |`) and types (`; type: | int | text |`).
///
/// Declared types bypass inference entirely.
pub struct TblnReader {
    input: Box<dyn BufRead + Send>,
    terminator: u8,
    names: Option<Vec<String>>,
    types: Option<Vec<ColumnType>>,
    first: Option<String>,
    buf: Vec<u8>,
    index: u64,
}

impl TblnReader {
    pub fn new(input: Box<dyn BufRead + Send>, options: &ReadOptions) -> Result<Self, ReadError> {
        let mut reader = Self {
            input,
            terminator: options.terminator.unwrap_or(b'\n'),
            names: None,
            types: None,
            first: None,
            buf: Vec::new(),
            index: 0,
        };

        // Header extras precede the first data row.
        while let Some(line) = reader.next_line()? {
            let Some(extra) = line.strip_prefix(';') else {
                reader.first = Some(line);
                break;
            };
            let Some((key, value)) = extra.split_once(':') else {
                continue;
            };
            match key.trim() {
                "name" => reader.names = Some(split_row(value.trim())),
                "type" => {
                    reader.types = Some(
                        split_row(value.trim())
                            .iter()
                            .map(|t| ColumnType::from_decl(t))
                            .collect(),
                    )
                }
                other => tracing::debug!("Ignoring TBLN extra {:?}", other),
            }
        }

        Ok(reader)
    }

    fn next_line(&mut self) -> Result<Option<String>, ReadError> {
        loop {
            let Some(line) = read_line(self.input.as_mut(), self.terminator, &mut self.buf)? else {
                return Ok(None);
            };
            self.index += 1;
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            return Ok(Some(trimmed.to_string()));
        }
    }
}

/// Split `| a | b |` into trimmed values; `||` stands for a literal `|`.
pub(crate) fn split_row(line: &str) -> Record {
    let body = line.trim();
    let body = body.strip_prefix('|').unwrap_or(body);

    let mut fields = Vec::new();
    let mut current = String::new();
    let mut chars = body.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '|' {
            if chars.peek() == Some(&'|') {
                chars.next();
                current.push('|');
            } else {
                fields.push(current.trim().to_string());
                current.clear();
            }
        } else {
            current.push(c);
        }
    }
    if !current.trim().is_empty() {
        fields.push(current.trim().to_string());
    }
    fields
}

/// Inverse of [`split_row`].
pub(crate) fn join_row<'a>(cells: impl IntoIterator<Item = &'a str>) -> String {
    let mut line = String::from("|");
    for cell in cells {
        line.push(' ');
        line.push_str(&cell.replace('|', "||"));
        line.push_str(" |");
    }
    line
}

impl RecordReader for TblnReader {
    fn names(&self) -> Option<&[String]> {
        self.names.as_deref()
    }

    fn types(&self) -> Option<&[ColumnType]> {
        self.types.as_deref()
    }

    fn read_record(&mut self) -> Result<Option<Record>, ReadError> {
        let line = match self.first.take() {
            Some(line) => line,
            None => match self.next_line()? {
                Some(line) => line,
                None => return Ok(None),
            },
        };
        if !line.starts_with('|') {
            return Err(ReadError::Malformed {
                record: self.index,
                message: format!("row does not start with '|': {:?}", line),
            });
        }
        Ok(Some(split_row(&line)))
    }
}
