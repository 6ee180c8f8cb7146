use super::{ReadError, ReadOptions, Record, RecordReader};
use std::io::BufRead;

/// CSV reader built on the `csv` crate; rows may have any number of fields.
pub struct CsvReader {
    inner: ::csv::Reader<Box<dyn BufRead + Send>>,
    names: Option<Vec<String>>,
    record: ::csv::StringRecord,
    index: u64,
}

impl CsvReader {
    pub fn new(input: Box<dyn BufRead + Send>, options: &ReadOptions) -> Result<Self, ReadError> {
        let mut builder = ::csv::ReaderBuilder::new();
        builder
            .has_headers(false)
            .flexible(true)
            .delimiter(options.delimiter.unwrap_or(b','));
        if let Some(terminator) = options.terminator {
            builder.terminator(::csv::Terminator::Any(terminator));
        }

        let mut reader = Self {
            inner: builder.from_reader(input),
            names: None,
            record: ::csv::StringRecord::new(),
            index: 0,
        };

        if options.header {
            reader.names = Some(reader.read_record()?.unwrap_or_default());
        }

        Ok(reader)
    }
}

impl RecordReader for CsvReader {
    fn names(&self) -> Option<&[String]> {
        self.names.as_deref()
    }

    fn read_record(&mut self) -> Result<Option<Record>, ReadError> {
        self.index += 1;
        match self.inner.read_record(&mut self.record) {
            Ok(true) => Ok(Some(self.record.iter().map(str::to_string).collect())),
            Ok(false) => Ok(None),
            Err(err) if err.is_io_error() => match err.into_kind() {
                ::csv::ErrorKind::Io(io) => Err(ReadError::Io(io)),
                other => Err(ReadError::Malformed {
                    record: self.index,
                    message: format!("{:?}", other),
                }),
            },
            Err(err) => Err(ReadError::Malformed {
                record: self.index,
                message: err.to_string(),
            }),
        }
    }
}
