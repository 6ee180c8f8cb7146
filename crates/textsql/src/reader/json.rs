use super::{ReadError, Record, RecordReader};
use serde_json::de::IoRead;
use serde_json::{Deserializer, StreamDeserializer, Value};
use std::collections::HashMap;
use std::io::BufRead;

type ValueStream = StreamDeserializer<'static, IoRead<Box<dyn BufRead + Send>>, Value>;

/// JSON reader accepting a top-level array or a stream of values (NDJSON).
///
/// Objects map to columns by key, in first-seen order: a key that first
/// appears in a later object widens the records from that object on.
/// Arrays map positionally and scalars form a single column. Nested values
/// are flattened to their JSON text.
pub struct JsonReader {
    stream: Option<ValueStream>,
    elements: std::vec::IntoIter<Value>,
    names: Option<Vec<String>>,
    positions: HashMap<String, usize>,
    first: Option<Value>,
    index: u64,
}

impl JsonReader {
    pub fn new(mut input: Box<dyn BufRead + Send>) -> Result<Self, ReadError> {
        let is_array = loop {
            let buf = input.fill_buf()?;
            if buf.is_empty() {
                break false;
            }
            let skip = buf
                .iter()
                .take_while(|b| b.is_ascii_whitespace() || matches!(b, 0xef | 0xbb | 0xbf))
                .count();
            if skip < buf.len() {
                let is_array = buf[skip] == b'[';
                input.consume(skip);
                break is_array;
            }
            input.consume(skip);
        };

        let mut reader = if is_array {
            let value: Value =
                serde_json::from_reader(input).map_err(|e| ReadError::Malformed {
                    record: 1,
                    message: e.to_string(),
                })?;
            let elements = match value {
                Value::Array(items) => items,
                other => vec![other],
            };
            Self {
                stream: None,
                elements: elements.into_iter(),
                names: None,
                positions: HashMap::new(),
                first: None,
                index: 0,
            }
        } else {
            Self {
                stream: Some(Deserializer::from_reader(input).into_iter::<Value>()),
                elements: Vec::new().into_iter(),
                names: None,
                positions: HashMap::new(),
                first: None,
                index: 0,
            }
        };

        reader.first = reader.next_value()?;
        if let Some(Value::Object(map)) = &reader.first {
            let keys: Vec<String> = map.keys().cloned().collect();
            for key in keys {
                reader.position(key);
            }
        }

        Ok(reader)
    }

    fn next_value(&mut self) -> Result<Option<Value>, ReadError> {
        if let Some(value) = self.elements.next() {
            self.index += 1;
            return Ok(Some(value));
        }
        let Some(stream) = self.stream.as_mut() else {
            return Ok(None);
        };
        match stream.next() {
            Some(Ok(value)) => {
                self.index += 1;
                Ok(Some(value))
            }
            Some(Err(err)) if err.is_io() => Err(ReadError::Io(err.into())),
            Some(Err(err)) => {
                // The stream cannot resynchronize after a syntax error.
                self.stream = None;
                Err(ReadError::Malformed {
                    record: self.index + 1,
                    message: err.to_string(),
                })
            }
            None => Ok(None),
        }
    }

    /// Column index of `key`, appending it to the column set when new.
    fn position(&mut self, key: String) -> usize {
        if let Some(&i) = self.positions.get(&key) {
            return i;
        }
        let names = self.names.get_or_insert_with(Vec::new);
        let i = names.len();
        self.positions.insert(key.clone(), i);
        names.push(key);
        i
    }

    fn to_record(&mut self, value: Value) -> Record {
        match value {
            Value::Object(map) => {
                let mut record = vec![String::new(); self.positions.len()];
                for (key, value) in map {
                    let i = self.position(key);
                    if i >= record.len() {
                        record.resize(i + 1, String::new());
                    }
                    record[i] = flatten(value);
                }
                record
            }
            Value::Array(items) => items.into_iter().map(flatten).collect(),
            scalar => vec![flatten(scalar)],
        }
    }
}

/// String form of a JSON cell; strings are unquoted, null is empty.
fn flatten(value: Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s,
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        nested => nested.to_string(),
    }
}

impl RecordReader for JsonReader {
    fn names(&self) -> Option<&[String]> {
        self.names.as_deref()
    }

    fn labeled(&self) -> bool {
        self.names.is_some()
    }

    fn read_record(&mut self) -> Result<Option<Record>, ReadError> {
        let value = match self.first.take() {
            Some(value) => value,
            None => match self.next_value()? {
                Some(value) => value,
                None => return Ok(None),
            },
        };
        Ok(Some(self.to_record(value)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn reader(data: &str) -> JsonReader {
        JsonReader::new(Box::new(Cursor::new(data.as_bytes().to_vec()))).unwrap()
    }

    fn collect(reader: &mut JsonReader) -> Vec<Record> {
        let mut rows = Vec::new();
        while let Some(row) = reader.read_record().unwrap() {
            rows.push(row);
        }
        rows
    }

    fn row(cells: &[&str]) -> Record {
        cells.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_array_of_objects() {
        let mut r = reader(
            r#"[{"id":"1","name":"Orange","price":50},{"id":"2","name":"Melon","price":500}]"#,
        );
        assert_eq!(
            r.names().unwrap(),
            &["id".to_string(), "name".to_string(), "price".to_string()]
        );
        assert_eq!(
            collect(&mut r),
            vec![row(&["1", "Orange", "50"]), row(&["2", "Melon", "500"])]
        );
    }

    #[test]
    fn test_ndjson_with_missing_keys() {
        let mut r = reader("{\"a\":1,\"b\":\"x\"}\n{\"b\":\"y\"}\n");
        assert_eq!(collect(&mut r), vec![row(&["1", "x"]), row(&["", "y"])]);
    }

    #[test]
    fn test_later_keys_extend_columns() {
        let mut r = reader("{\"a\":1}\n{\"a\":2,\"b\":3}\n{\"b\":4}\n");
        assert_eq!(
            collect(&mut r),
            vec![row(&["1"]), row(&["2", "3"]), row(&["", "4"])]
        );
        assert_eq!(r.names().unwrap(), &["a".to_string(), "b".to_string()]);
        assert!(r.labeled());
    }

    #[test]
    fn test_nested_values_are_flattened() {
        let mut r = reader(r#"{"id":1,"tags":["a","b"],"meta":{"k":true},"n":null}"#);
        assert_eq!(
            collect(&mut r),
            vec![row(&["1", r#"["a","b"]"#, r#"{"k":true}"#, ""])]
        );
    }

    #[test]
    fn test_array_of_arrays_is_positional() {
        let mut r = reader("[[1,\"Orange\"],[2,\"Melon\"]]");
        assert!(r.names().is_none());
        assert_eq!(collect(&mut r), vec![row(&["1", "Orange"]), row(&["2", "Melon"])]);
    }

    #[test]
    fn test_scalar_array() {
        let mut r = reader("[1, 2, 3]");
        assert_eq!(collect(&mut r), vec![row(&["1"]), row(&["2"]), row(&["3"])]);
    }

    #[test]
    fn test_empty_input() {
        let mut r = reader("  \n");
        assert!(r.names().is_none());
        assert!(collect(&mut r).is_empty());
    }

    #[test]
    fn test_syntax_error_in_stream_stops_reading() {
        let mut r = reader("{\"a\":1}\n{\"a\":\n");
        assert!(r.read_record().unwrap().is_some());
        assert!(matches!(r.read_record(), Err(ReadError::Malformed { .. })));
        assert!(r.read_record().unwrap().is_none());
    }

    #[test]
    fn test_pretty_printed_objects() {
        let mut r = reader("{\n  \"a\": 1\n}\n{\n  \"a\": 2\n}\n");
        assert_eq!(collect(&mut r), vec![row(&["1"]), row(&["2"])]);
    }
}
