use super::{read_line, ReadError, ReadOptions, Record, RecordReader};
use crate::config::unescape;
use std::borrow::Cow;
use std::collections::HashMap;
use std::io::BufRead;

/// Labeled Tab-separated Values.
///
/// Labels are columns in first-seen order. Each record is aligned to the
/// labels known when it is read, so a label first seen on a later line
/// widens the records from that line on.
pub struct LtsvReader {
    input: Box<dyn BufRead + Send>,
    delimiter: char,
    terminator: u8,
    names: Vec<String>,
    positions: HashMap<String, usize>,
    first: Option<Record>,
    buf: Vec<u8>,
    index: u64,
}

impl LtsvReader {
    pub fn new(input: Box<dyn BufRead + Send>, options: &ReadOptions) -> Result<Self, ReadError> {
        let mut reader = Self {
            input,
            delimiter: options.delimiter.map(char::from).unwrap_or('\t'),
            terminator: options.terminator.unwrap_or(b'\n'),
            names: Vec::new(),
            positions: HashMap::new(),
            first: None,
            buf: Vec::new(),
            index: 0,
        };

        // Labels are known from the first well-formed line on.
        while let Some(line) = reader.next_line()? {
            match reader.parse_line(&line) {
                Ok(pairs) => {
                    reader.first = Some(reader.align(pairs));
                    break;
                }
                Err(err) => {
                    tracing::warn!("Skipping LTSV line before header: {}", err);
                }
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
            if !line.trim().is_empty() {
                return Ok(Some(line));
            }
        }
    }

    fn parse_line(&self, line: &str) -> Result<Vec<(String, String)>, ReadError> {
        line.split(self.delimiter)
            .filter(|field| !field.is_empty())
            .map(|field| match field.split_once(':') {
                Some((label, value)) => Ok((unescape_field(label), unescape_field(value))),
                None => Err(ReadError::Malformed {
                    record: self.index,
                    message: format!("field without label: {:?}", field),
                }),
            })
            .collect()
    }

    fn align(&mut self, pairs: Vec<(String, String)>) -> Record {
        let mut record = vec![String::new(); self.names.len()];
        for (label, value) in pairs {
            match self.positions.get(&label) {
                Some(&i) => record[i] = value,
                None => {
                    self.positions.insert(label.clone(), self.names.len());
                    self.names.push(label);
                    record.push(value);
                }
            }
        }
        record
    }
}

/// Escape backslash, tab, newline and carriage return so a label or value
/// stays inside one field of one line.
pub(crate) fn escape(text: &str) -> Cow<'_, str> {
    if !text.contains(['\\', '\t', '\n', '\r']) {
        return Cow::Borrowed(text);
    }
    let mut out = String::with_capacity(text.len() + 4);
    for c in text.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\t' => out.push_str("\\t"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            c => out.push(c),
        }
    }
    Cow::Owned(out)
}

fn unescape_field(text: &str) -> String {
    if text.contains('\\') {
        unescape(text)
    } else {
        text.to_string()
    }
}

impl RecordReader for LtsvReader {
    fn names(&self) -> Option<&[String]> {
        Some(&self.names)
    }

    fn labeled(&self) -> bool {
        true
    }

    fn read_record(&mut self) -> Result<Option<Record>, ReadError> {
        if let Some(first) = self.first.take() {
            return Ok(Some(first));
        }
        match self.next_line()? {
            Some(line) => {
                let pairs = self.parse_line(&line)?;
                Ok(Some(self.align(pairs)))
            }
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn reader(data: &str) -> LtsvReader {
        LtsvReader::new(
            Box::new(Cursor::new(data.as_bytes().to_vec())),
            &ReadOptions::default(),
        )
        .unwrap()
    }

    #[test]
    fn test_labels_from_first_line() {
        let mut r = reader("id:1\tname:Orange\tprice:50\nid:2\tname:Melon\tprice:500\n");
        assert_eq!(
            r.names().unwrap(),
            &["id".to_string(), "name".to_string(), "price".to_string()]
        );
        assert_eq!(
            r.read_record().unwrap(),
            Some(vec!["1".to_string(), "Orange".to_string(), "50".to_string()])
        );
        assert_eq!(
            r.read_record().unwrap(),
            Some(vec!["2".to_string(), "Melon".to_string(), "500".to_string()])
        );
        assert_eq!(r.read_record().unwrap(), None);
    }

    #[test]
    fn test_aligns_reordered_and_missing_labels() {
        let mut r = reader("a:1\tb:2\nb:3\nb:5\ta:4\n");
        r.read_record().unwrap();
        assert_eq!(
            r.read_record().unwrap(),
            Some(vec![String::new(), "3".to_string()])
        );
        assert_eq!(
            r.read_record().unwrap(),
            Some(vec!["4".to_string(), "5".to_string()])
        );
    }

    #[test]
    fn test_later_labels_extend_columns() {
        let mut r = reader("a:1\nc:9\ta:4\n");
        assert_eq!(r.read_record().unwrap(), Some(vec!["1".to_string()]));
        assert_eq!(
            r.read_record().unwrap(),
            Some(vec!["4".to_string(), "9".to_string()])
        );
        assert_eq!(r.names().unwrap(), &["a".to_string(), "c".to_string()]);
    }

    #[test]
    fn test_escaped_values() {
        let mut r = reader("x:a\\tb\\\\c\ty:l1\\nl2\n");
        assert_eq!(
            r.read_record().unwrap(),
            Some(vec!["a\tb\\c".to_string(), "l1\nl2".to_string()])
        );
    }

    #[test]
    fn test_escape() {
        assert_eq!(escape("plain"), "plain");
        assert_eq!(escape("a\tb\nc\\d\re"), "a\\tb\\nc\\\\d\\re");
    }

    #[test]
    fn test_value_may_contain_colon() {
        let mut r = reader("time:12:30:00\n");
        assert_eq!(r.read_record().unwrap(), Some(vec!["12:30:00".to_string()]));
    }

    #[test]
    fn test_malformed_line_then_continue() {
        let mut r = reader("a:1\nbroken\na:2\n");
        assert!(r.read_record().unwrap().is_some());
        assert!(matches!(r.read_record(), Err(ReadError::Malformed { record: 2, .. })));
        assert_eq!(r.read_record().unwrap(), Some(vec!["2".to_string()]));
    }

    #[test]
    fn test_blank_lines_skipped() {
        let mut r = reader("\na:1\n\n\na:2\n");
        assert!(r.read_record().unwrap().is_some());
        assert_eq!(r.read_record().unwrap(), Some(vec!["2".to_string()]));
        assert!(r.read_record().unwrap().is_none());
    }
}
