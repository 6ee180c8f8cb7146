//! Format-specific record readers
//!
//! Every reader yields a header (when the input carries one) and a finite,
//! lazy sequence of records terminating at end of input. Readers are
//! restartable by reopening the source.

mod csv;
mod json;
mod ltsv;
mod tbln;

pub use self::csv::CsvReader;
pub use self::json::JsonReader;
pub use self::ltsv::LtsvReader;
pub use self::tbln::TblnReader;
pub(crate) use self::ltsv::escape as escape_ltsv;
pub(crate) use self::tbln::join_row;

use crate::format::Format;
use crate::models::ColumnType;
use std::io::{self, BufRead};
use thiserror::Error;

/// Raw field strings of one input record.
pub type Record = Vec<String>;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReadOptions {
    /// The first CSV record holds column names.
    pub header: bool,
    /// Field delimiter; defaults to `,` for CSV and tab for LTSV.
    pub delimiter: Option<u8>,
    /// Record terminator; defaults to `\n` (with `\r\n` accepted).
    pub terminator: Option<u8>,
}

#[derive(Error, Debug)]
pub enum ReadError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// A single record could not be parsed; reading may continue.
    #[error("record {record}: {message}")]
    Malformed { record: u64, message: String },
}

pub trait RecordReader: Send {
    /// Column names carried by the input itself.
    fn names(&self) -> Option<&[String]>;

    /// Column types declared by the input itself.
    fn types(&self) -> Option<&[ColumnType]> {
        None
    }

    /// Records are aligned by label and [`names`](Self::names) grows as new
    /// labels appear, so an early record may be shorter than the final
    /// column set without missing anything but trailing labels.
    fn labeled(&self) -> bool {
        false
    }

    /// The next record, or `Ok(None)` at end of input.
    fn read_record(&mut self) -> Result<Option<Record>, ReadError>;
}

/// Build the reader for `format` over already-decompressed input.
pub fn open_reader(
    format: Format,
    input: Box<dyn BufRead + Send>,
    options: &ReadOptions,
) -> Result<Box<dyn RecordReader>, ReadError> {
    Ok(match format {
        Format::Csv => Box::new(CsvReader::new(input, options)?),
        Format::Ltsv => Box::new(LtsvReader::new(input, options)?),
        Format::Json => Box::new(JsonReader::new(input)?),
        Format::Tbln => Box::new(TblnReader::new(input, options)?),
    })
}

/// Read one line ending in `terminator`, stripping the terminator and any
/// carriage return before a newline. Returns `None` at end of input.
pub(crate) fn read_line(
    input: &mut dyn BufRead,
    terminator: u8,
    buf: &mut Vec<u8>,
) -> io::Result<Option<String>> {
    buf.clear();
    if input.read_until(terminator, buf)? == 0 {
        return Ok(None);
    }
    if buf.last() == Some(&terminator) {
        buf.pop();
        if terminator == b'\n' && buf.last() == Some(&b'\r') {
            buf.pop();
        }
    }
    let line = String::from_utf8_lossy(buf);
    Ok(Some(line.trim_start_matches('\u{feff}').to_string()))
}
