//! Table reference resolution
//!
//! Finds file paths, glob patterns and `-` (standard input) in table
//! positions of a query, assigns each distinct reference a unique table
//! identifier, and rewrites the query text to use those identifiers.
//! Everything outside the replaced spans is left byte-for-byte intact.

mod scanner;

use crate::error::ResolveError;
use crate::format::{extension_format, Format, Source};
use std::collections::{HashMap, HashSet};
use std::ops::Range;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolveOptions {
    /// Expand glob patterns into unions of files.
    pub glob: bool,
    /// The first record of CSV inputs holds column names.
    pub header: bool,
}

impl Default for ResolveOptions {
    fn default() -> Self {
        Self {
            glob: true,
            header: false,
        }
    }
}

/// A file, glob or stdin reference found in the query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableReference {
    /// Text of the first occurrence as written in the query.
    pub raw: String,
    /// Byte ranges of every occurrence in the original query.
    pub spans: Vec<Range<usize>>,
    /// Files to import; more than one for a glob union.
    pub sources: Vec<Source>,
    /// Engine-side table name.
    pub identifier: String,
    /// Explicit format from a `fmt:` prefix.
    pub format: Option<Format>,
    pub header: bool,
}

impl TableReference {
    pub fn is_union(&self) -> bool {
        self.sources.len() > 1
    }
}

/// The rewritten query and the references it now depends on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub sql: String,
    pub refs: Vec<TableReference>,
}

/// A table position that names something to import.
struct FileRef {
    key: String,
    format: Option<Format>,
    sources: Vec<Source>,
    name_hint: String,
}

pub struct Resolver {
    options: ResolveOptions,
}

impl Resolver {
    pub fn new(options: ResolveOptions) -> Self {
        Self { options }
    }

    /// Resolve `sql`, quoting identifiers with the engine's `quote` rule.
    pub fn resolve(
        &self,
        sql: &str,
        quote: impl Fn(&str) -> String,
    ) -> Result<Resolution, ResolveError> {
        let tokens = scanner::tokenize(sql)?;
        let positions = scanner::table_positions(sql, &tokens);

        let mut taken = HashSet::new();
        let mut found = Vec::new();
        for position in positions {
            match self.classify(&position.text)? {
                Some(file) => found.push((position, file)),
                None => {
                    taken.insert(position.text.to_lowercase());
                }
            }
        }

        let mut refs: Vec<TableReference> = Vec::new();
        let mut by_key: HashMap<String, usize> = HashMap::new();
        for (position, file) in found {
            if let Some(&index) = by_key.get(&file.key) {
                let existing = &mut refs[index];
                match (existing.format, file.format) {
                    (Some(first), Some(second)) if first != second => {
                        return Err(ResolveError::ConflictingFormat {
                            path: file.key,
                            first,
                            second,
                        });
                    }
                    (None, Some(second)) => existing.format = Some(second),
                    _ => {}
                }
                existing.spans.push(position.span);
                continue;
            }

            let identifier = unique_identifier(&file.name_hint, &mut taken);
            tracing::debug!("{} -> {}", file.key, identifier);
            by_key.insert(file.key, refs.len());
            refs.push(TableReference {
                raw: sql[position.span.clone()].to_string(),
                spans: vec![position.span],
                sources: file.sources,
                identifier,
                format: file.format,
                header: self.options.header,
            });
        }

        Ok(Resolution {
            sql: rewrite(sql, &refs, quote),
            refs,
        })
    }

    /// Decide whether a table position names a file, and which.
    fn classify(&self, text: &str) -> Result<Option<FileRef>, ResolveError> {
        let (format, rest) = split_format_prefix(text);

        if rest == "-" {
            return Ok(Some(FileRef {
                key: "-".to_string(),
                format,
                sources: vec![Source::Stdin],
                name_hint: "stdin".to_string(),
            }));
        }

        let expanded = shellexpand::tilde(rest).into_owned();
        let looks_like_file = format.is_some()
            || has_known_extension(&expanded)
            || expanded.contains('/')
            || expanded.contains(std::path::MAIN_SEPARATOR);

        if self.options.glob && has_glob_meta(&expanded) {
            let paths = expand_glob(&expanded)?;
            if paths.is_empty() {
                if looks_like_file {
                    return Err(ResolveError::EmptyGlob(expanded));
                }
                return Ok(None);
            }
            return Ok(Some(FileRef {
                name_hint: table_identifier(&expanded),
                key: expanded,
                format,
                sources: paths.into_iter().map(Source::File).collect(),
            }));
        }

        let path = PathBuf::from(&expanded);
        if path.is_file() || looks_like_file {
            Ok(Some(FileRef {
                name_hint: table_identifier(&expanded),
                key: expanded,
                format,
                sources: vec![Source::File(path)],
            }))
        } else {
            Ok(None)
        }
    }
}

/// Split an optional `csv:`/`ltsv:`/`json:`/`tbln:` prefix off a reference.
fn split_format_prefix(text: &str) -> (Option<Format>, &str) {
    if let Some((prefix, rest)) = text.split_once(':') {
        if let Some(format) = Format::from_name(prefix) {
            if !rest.is_empty() {
                return (Some(format), rest);
            }
        }
    }
    (None, text)
}

fn has_known_extension(path: &str) -> bool {
    let (format, gz) = extension_format(Path::new(path));
    format.is_some() || gz
}

fn has_glob_meta(path: &str) -> bool {
    path.contains(['*', '?', '['])
}

/// Expand a glob pattern into the regular files it matches, sorted.
fn expand_glob(pattern: &str) -> Result<Vec<PathBuf>, ResolveError> {
    let entries = glob::glob(pattern).map_err(|source| ResolveError::InvalidGlob {
        pattern: pattern.to_string(),
        source,
    })?;

    let mut paths = Vec::new();
    for entry in entries {
        match entry {
            Ok(path) if path.is_file() => paths.push(path),
            Ok(_) => {}
            Err(e) => tracing::warn!("Skipping unreadable glob match: {}", e),
        }
    }
    paths.sort();
    Ok(paths)
}

/// Derive a table name from a path: the file name without compression and
/// format extensions, reduced to `[a-z0-9_]`.
pub fn table_identifier(path: &str) -> String {
    let name = path.rsplit(['/', '\\']).next().unwrap_or(path);
    let name = strip_suffix_ignore_case(name, ".gz");
    let name = match name.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem,
        _ => name,
    };

    let mut ident = String::with_capacity(name.len());
    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            ident.push(c.to_ascii_lowercase());
        } else if !ident.ends_with('_') {
            ident.push('_');
        }
    }
    let ident = ident.trim_matches('_');

    if ident.is_empty() {
        "t".to_string()
    } else if ident.starts_with(|c: char| c.is_ascii_digit()) {
        format!("t_{}", ident)
    } else {
        ident.to_string()
    }
}

fn strip_suffix_ignore_case<'a>(s: &'a str, suffix: &str) -> &'a str {
    if s.len() > suffix.len() && s.is_char_boundary(s.len() - suffix.len()) {
        let (head, tail) = s.split_at(s.len() - suffix.len());
        if tail.eq_ignore_ascii_case(suffix) {
            return head;
        }
    }
    s
}

fn unique_identifier(hint: &str, taken: &mut HashSet<String>) -> String {
    let mut candidate = hint.to_string();
    let mut n = 2;
    while taken.contains(&candidate) {
        candidate = format!("{}_{}", hint, n);
        n += 1;
    }
    taken.insert(candidate.clone());
    candidate
}

/// Replace every reference span with its quoted identifier.
fn rewrite(sql: &str, refs: &[TableReference], quote: impl Fn(&str) -> String) -> String {
    let mut replacements: Vec<(Range<usize>, String)> = Vec::new();
    for r in refs {
        let quoted = quote(&r.identifier);
        for span in &r.spans {
            replacements.push((span.clone(), quoted.clone()));
        }
    }
    replacements.sort_by_key(|(span, _)| span.start);

    let mut out = String::with_capacity(sql.len());
    let mut cursor = 0;
    for (span, text) in replacements {
        out.push_str(&sql[cursor..span.start]);
        out.push_str(&text);
        cursor = span.end;
    }
    out.push_str(&sql[cursor..]);
    out
}
