use super::ImportOptions;
use crate::error::ImportError;
use crate::format::{open_source, Detection, Format, Source, StdinBuffer};
use crate::guess::infer;
use crate::models::{Column, ColumnType, Value};
use crate::reader::{open_reader, ReadError, ReadOptions, Record, RecordReader};
use std::collections::{HashSet, VecDeque};
use std::io;

/// One source opened for import: its schema is fixed from the sampled
/// records, after which rows stream out shaped to that schema.
pub(crate) struct TableScan {
    pub detection: Detection,
    pub columns: Vec<Column>,
    path: String,
    reader: Box<dyn RecordReader>,
    sample: VecDeque<(u64, Record)>,
    record: u64,
    skipped: u64,
    truncated: u64,
    strict: bool,
}

impl TableScan {
    pub fn open(
        source: &Source,
        hint: Option<Format>,
        header: bool,
        options: &ImportOptions,
        stdin: &StdinBuffer,
    ) -> Result<Self, ImportError> {
        let path = source.to_string();
        let opened = open_source(source, hint, options.gzip, stdin).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => ImportError::FileNotFound(source.path().to_path_buf()),
            _ => ImportError::Io {
                path: path.clone(),
                source: e,
            },
        })?;

        let read_options = ReadOptions {
            header: header || options.read.header,
            ..options.read.clone()
        };
        let reader = open_reader(opened.detection.format, opened.reader, &read_options)
            .map_err(|e| read_error(&path, e))?;

        let mut scan = Self {
            detection: opened.detection,
            columns: Vec::new(),
            path,
            reader,
            sample: VecDeque::new(),
            record: 0,
            skipped: 0,
            truncated: 0,
            strict: options.strict,
        };

        while scan.sample.len() < options.sample_rows.max(1) {
            match scan.read()? {
                Some(record) => scan.sample.push_back((scan.record, record)),
                None => break,
            }
        }
        if scan.reader.labeled() {
            // Labels first seen late in the sample widen the earlier records.
            let width = scan.reader.names().map_or(0, <[String]>::len);
            for (_, record) in scan.sample.iter_mut() {
                if record.len() < width {
                    record.resize(width, String::new());
                }
            }
        }
        scan.columns = scan.infer_columns(options.guess_types);
        tracing::debug!(
            "{}: {} columns from {} sampled records",
            scan.path,
            scan.columns.len(),
            scan.sample.len()
        );
        Ok(scan)
    }

    fn read(&mut self) -> Result<Option<Record>, ImportError> {
        loop {
            match self.reader.read_record() {
                Ok(Some(record)) => {
                    self.record += 1;
                    return Ok(Some(record));
                }
                Ok(None) => return Ok(None),
                Err(ReadError::Malformed { record, message }) if !self.strict => {
                    self.record += 1;
                    self.skipped += 1;
                    tracing::warn!("{}: skipping record {}: {}", self.path, record, message);
                }
                Err(e) => return Err(read_error(&self.path, e)),
            }
        }
    }

    fn infer_columns(&self, guess_types: bool) -> Vec<Column> {
        let names = match self.reader.names() {
            Some(names) if !names.is_empty() => column_names(names),
            _ => {
                let width = self
                    .sample
                    .iter()
                    .map(|(_, r)| r.len())
                    .max()
                    .unwrap_or(0)
                    .max(1);
                (1..=width).map(Column::positional_name).collect()
            }
        };

        let records: Vec<Record> = self.sample.iter().map(|(_, r)| r.clone()).collect();
        let types = if !guess_types {
            vec![ColumnType::Text; names.len()]
        } else {
            match self.reader.types() {
                Some(declared) if declared.len() == names.len() => declared.to_vec(),
                _ => infer(&records, names.len()),
            }
        };

        names
            .into_iter()
            .zip(types)
            .enumerate()
            .map(|(i, (name, ty))| Column::new(name, ty, i + 1))
            .collect()
    }

    /// Sampled records not yet returned by [`next_row`](Self::next_row).
    pub fn sample(&self) -> impl Iterator<Item = &Record> {
        self.sample.iter().map(|(_, r)| r)
    }

    /// Replace the inferred schema, as when a later file of a glob union is
    /// loaded into the table created for the first.
    pub fn adopt(&mut self, columns: &[Column]) {
        self.columns = columns.to_vec();
    }

    /// The next record shaped to the schema and converted to values.
    pub fn next_row(&mut self) -> Result<Option<Vec<Value>>, ImportError> {
        let (index, record) = match self.sample.pop_front() {
            Some(entry) => entry,
            None => match self.read()? {
                Some(record) => (self.record, record),
                None => return Ok(None),
            },
        };
        self.shape(index, record).map(Some)
    }

    fn shape(&mut self, index: u64, mut record: Record) -> Result<Vec<Value>, ImportError> {
        let width = self.columns.len();
        if record.len() != width {
            if self.strict {
                return Err(ImportError::Arity {
                    path: self.path.clone(),
                    record: index,
                    found: record.len(),
                    expected: width,
                });
            }
            if record.len() > width {
                self.truncated += 1;
            }
            record.resize(width, String::new());
        }
        Ok(record
            .into_iter()
            .zip(&self.columns)
            .map(|(field, column)| Value::coerce(field, column.ty))
            .collect())
    }

    /// Malformed records skipped so far.
    pub fn skipped(&self) -> u64 {
        self.skipped
    }

    /// Records that had more fields than columns and were cut short.
    pub fn truncated(&self) -> u64 {
        self.truncated
    }

    pub fn path(&self) -> &str {
        &self.path
    }
}

fn read_error(path: &str, e: ReadError) -> ImportError {
    match e {
        ReadError::Io(source) => ImportError::Io {
            path: path.to_string(),
            source,
        },
        ReadError::Malformed { record, message } => ImportError::Malformed {
            path: path.to_string(),
            record,
            message,
        },
    }
}

/// Header names with blanks replaced by positional names and duplicates
/// suffixed, compared case-insensitively as SQL engines do.
pub(crate) fn column_names(names: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    names
        .iter()
        .enumerate()
        .map(|(i, name)| {
            let base = match name.trim() {
                "" => Column::positional_name(i + 1),
                trimmed => trimmed.to_string(),
            };
            let mut candidate = base.clone();
            let mut n = 2;
            while !seen.insert(candidate.to_lowercase()) {
                candidate = format!("{}_{}", base, n);
                n += 1;
            }
            candidate
        })
        .collect()
}
