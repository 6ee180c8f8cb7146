use super::{detect_format, extension_format, Detection, Format, GZIP_MAGIC};
use flate2::read::MultiGzDecoder;
use std::fmt;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Cursor, Read};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

const READ_BUFFER: usize = 64 * 1024;

/// Where the bytes of a table reference come from.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Source {
    File(PathBuf),
    /// Standard input, written as `-` in the query.
    Stdin,
}

impl Source {
    pub fn path(&self) -> &Path {
        match self {
            Source::File(path) => path,
            Source::Stdin => Path::new("-"),
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Source::File(path) => write!(f, "{}", path.display()),
            Source::Stdin => f.write_str("<stdin>"),
        }
    }
}

/// Standard input read once and replayed for every open.
#[derive(Debug, Default)]
pub struct StdinBuffer {
    bytes: Mutex<Option<Arc<Vec<u8>>>>,
}

impl StdinBuffer {
    fn bytes(&self) -> io::Result<Arc<Vec<u8>>> {
        let mut guard = self.bytes.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(bytes) = guard.as_ref() {
            return Ok(Arc::clone(bytes));
        }
        let mut buf = Vec::new();
        io::stdin().lock().read_to_end(&mut buf)?;
        let bytes = Arc::new(buf);
        *guard = Some(Arc::clone(&bytes));
        Ok(bytes)
    }
}

/// A source opened for reading with decompression already applied.
pub struct Opened {
    pub detection: Detection,
    pub reader: Box<dyn BufRead + Send>,
}

/// Open a source, transparently un-gzip it, and detect its format.
///
/// With `gzip` enabled, compression is recognised by the gzip magic bytes
/// rather than trusted from the extension.
pub fn open_source(
    source: &Source,
    hint: Option<Format>,
    gzip: bool,
    stdin: &StdinBuffer,
) -> io::Result<Opened> {
    let raw: Box<dyn Read + Send> = match source {
        Source::File(path) => Box::new(File::open(path)?),
        Source::Stdin => Box::new(Cursor::new(stdin.bytes()?.as_ref().clone())),
    };
    let mut raw = BufReader::with_capacity(READ_BUFFER, raw);

    let compressed = gzip && raw.fill_buf()?.starts_with(&GZIP_MAGIC);
    if !compressed && extension_format(source.path()).1 {
        tracing::debug!("{} has a .gz extension but no gzip header", source);
    }

    let decoded: Box<dyn Read + Send> = if compressed {
        Box::new(MultiGzDecoder::new(raw))
    } else {
        Box::new(raw)
    };
    let mut reader = BufReader::with_capacity(READ_BUFFER, decoded);

    let format = match hint.or(extension_format(source.path()).0) {
        Some(format) => format,
        None => detect_format(source.path(), reader.fill_buf()?, None),
    };
    tracing::debug!("{}: format {}, compressed {}", source, format, compressed);

    Ok(Opened {
        detection: Detection { format, compressed },
        reader: Box::new(reader),
    })
}
