//! File analysis: what a file would look like as a table, without running a
//! query.

use crate::error::ImportError;
use crate::format::{Format, Source, StdinBuffer};
use crate::import::{ImportOptions, TableScan};
use crate::models::Column;
use crate::reader::Record;
use crate::resolve::table_identifier;
use comfy_table::presets::UTF8_FULL_CONDENSED;
use comfy_table::{ContentArrangement, Table};
use std::io::{self, Write};
use std::path::PathBuf;

/// Records shown in the sample section.
const SAMPLE_ROWS: usize = 3;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Analysis {
    /// Path as given by the user.
    pub path: String,
    /// Table name the path resolves to inside a query.
    pub identifier: String,
    pub format: Format,
    pub compressed: bool,
    pub columns: Vec<Column>,
    pub sample: Vec<Record>,
}

/// Detect, sample and type-infer `path` the same way an import would.
pub fn analyze(path: &str, header: bool, options: &ImportOptions) -> Result<Analysis, ImportError> {
    let source = match path {
        "-" => Source::Stdin,
        _ => Source::File(PathBuf::from(shellexpand::tilde(path).into_owned())),
    };
    let stdin = StdinBuffer::default();
    let scan = TableScan::open(&source, options.input.hint(), header, options, &stdin)?;

    let identifier = match source {
        Source::Stdin => "stdin".to_string(),
        Source::File(_) => table_identifier(path),
    };
    Ok(Analysis {
        path: path.to_string(),
        identifier,
        format: scan.detection.format,
        compressed: scan.detection.compressed,
        columns: scan.columns.clone(),
        sample: scan.sample().take(SAMPLE_ROWS).cloned().collect(),
    })
}

fn new_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table
}

impl Analysis {
    /// The path as it must be written in a query.
    fn query_path(&self) -> String {
        if self.path.contains(char::is_whitespace) {
            format!("\"{}\"", self.path)
        } else {
            self.path.clone()
        }
    }

    /// Example queries against this file.
    pub fn examples(&self) -> Vec<String> {
        let names: Vec<&str> = self.columns.iter().map(|c| c.name.as_str()).collect();
        let from = self.query_path();
        let mut examples = vec![format!("SELECT {} FROM {}", names.join(", "), from)];
        if let Some(first) = names.first() {
            examples.push(format!(
                "SELECT {}, count(*) FROM {} GROUP BY {}",
                first, from, first
            ));
        }
        examples
    }

    pub fn render(&self, out: &mut dyn Write) -> io::Result<()> {
        writeln!(out, "The table name is {}.", self.identifier)?;
        writeln!(
            out,
            "The file type is {}{}.",
            self.format.name().to_uppercase(),
            if self.compressed { " (gzip)" } else { "" }
        )?;

        writeln!(out, "\nData types:")?;
        let mut types = new_table();
        types.set_header(vec!["column name", "type"]);
        for column in &self.columns {
            types.add_row(vec![column.name.clone(), column.ty.to_string()]);
        }
        writeln!(out, "{}", types)?;

        writeln!(out, "\nData samples:")?;
        let mut samples = new_table();
        samples.set_header(self.columns.iter().map(|c| c.name.clone()));
        for record in &self.sample {
            samples.add_row(record.clone());
        }
        writeln!(out, "{}", samples)?;

        writeln!(out, "\nExamples:")?;
        for example in self.examples() {
            writeln!(out, "textsql '{}'", example)?;
        }
        Ok(())
    }
}
