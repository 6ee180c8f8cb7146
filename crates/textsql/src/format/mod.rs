//! Input format detection
//!
//! A format is chosen from an explicit hint, then from the file extension
//! (after stripping a trailing `.gz`), and finally by sniffing the leading
//! bytes of the decompressed content. Detection never fails: anything
//! unrecognized is read as CSV.

mod source;

pub use source::{open_source, Opened, Source, StdinBuffer};

use regex::Regex;
use serde::Deserialize;
use std::fmt;
use std::path::Path;
use std::sync::LazyLock;

/// Gzip member header magic.
pub const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

static LTSV_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[0-9A-Za-z_.\-]+:[^\t]*(\t[0-9A-Za-z_.\-]+:[^\t]*)*$")
        .expect("LTSV line pattern is valid")
});

/// Encodings a table reference can be read as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    Csv,
    Ltsv,
    Json,
    Tbln,
}

impl Format {
    pub const ALL: [Format; 4] = [Format::Csv, Format::Ltsv, Format::Json, Format::Tbln];

    pub fn name(&self) -> &'static str {
        match self {
            Format::Csv => "csv",
            Format::Ltsv => "ltsv",
            Format::Json => "json",
            Format::Tbln => "tbln",
        }
    }

    pub fn from_name(name: &str) -> Option<Format> {
        Format::ALL
            .into_iter()
            .find(|f| f.name().eq_ignore_ascii_case(name))
    }

    /// Map a bare extension (without the dot) to a format.
    pub fn from_extension(ext: &str) -> Option<Format> {
        match ext.to_ascii_lowercase().as_str() {
            "csv" => Some(Format::Csv),
            "ltsv" => Some(Format::Ltsv),
            "json" | "jsonl" | "ndjson" => Some(Format::Json),
            "tbln" => Some(Format::Tbln),
            _ => None,
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Input format selector exposed on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum InputFormat {
    /// Detect by extension, then by content
    #[default]
    Guess,
    Csv,
    Ltsv,
    Json,
    Tbln,
}

impl InputFormat {
    /// The explicit format, or `None` in guess mode.
    pub fn hint(self) -> Option<Format> {
        match self {
            InputFormat::Guess => None,
            InputFormat::Csv => Some(Format::Csv),
            InputFormat::Ltsv => Some(Format::Ltsv),
            InputFormat::Json => Some(Format::Json),
            InputFormat::Tbln => Some(Format::Tbln),
        }
    }
}

/// Outcome of detecting one source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Detection {
    pub format: Format,
    pub compressed: bool,
}

/// Split a file name into its format by extension and whether it ends in `.gz`.
pub fn extension_format(path: &Path) -> (Option<Format>, bool) {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    let lower = name.to_ascii_lowercase();
    let (stem, gz) = match lower.strip_suffix(".gz") {
        Some(stem) => (stem.to_string(), true),
        None => (lower, false),
    };
    let format = Path::new(&stem)
        .extension()
        .and_then(|e| e.to_str())
        .and_then(Format::from_extension);
    (format, gz)
}

/// Pick the format of a source whose leading decompressed bytes are `head`.
pub fn detect_format(path: &Path, head: &[u8], hint: Option<Format>) -> Format {
    if let Some(format) = hint {
        return format;
    }
    match extension_format(path) {
        (Some(format), _) => format,
        (None, _) => sniff(head),
    }
}

/// Open `path` and detect its format, defaulting to CSV on any failure.
pub fn detect(path: &Path, hint: Option<Format>) -> Format {
    let source = Source::File(path.to_path_buf());
    match open_source(&source, hint, true, &StdinBuffer::default()) {
        Ok(opened) => opened.detection.format,
        Err(_) => hint.or(extension_format(path).0).unwrap_or(Format::Csv),
    }
}

/// Guess the format from content alone.
pub fn sniff(head: &[u8]) -> Format {
    let text = String::from_utf8_lossy(head);
    let text = text.trim_start_matches('\u{feff}').trim_start();

    match text.chars().next() {
        Some('{') | Some('[') => return Format::Json,
        Some(';') | Some('|') => return Format::Tbln,
        _ => {}
    }

    // The last line may be cut off mid-record; only judge complete lines
    // unless the whole input fit in the head.
    let mut lines: Vec<&str> = text.lines().collect();
    if lines.len() > 1 && !text.ends_with('\n') {
        lines.pop();
    }
    let lines: Vec<&str> = lines
        .into_iter()
        .map(|l| l.trim_end_matches('\r'))
        .filter(|l| !l.is_empty())
        .collect();

    if !lines.is_empty() && lines.iter().all(|l| LTSV_LINE.is_match(l)) {
        Format::Ltsv
    } else {
        Format::Csv
    }
}
