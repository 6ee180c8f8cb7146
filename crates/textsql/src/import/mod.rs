//! Import of file references into engine tables
//!
//! Each reference is scanned on a worker thread: sources are opened, a
//! sample fixes the schema, and rows stream back over a bounded channel.
//! The calling thread owns the engine connection and performs every table
//! creation and insert, so the engine never sees concurrent access.

mod scan;

pub(crate) use scan::TableScan;

use crate::error::ImportError;
use crate::format::{InputFormat, StdinBuffer};
use crate::guess::DEFAULT_SAMPLE_ROWS;
use crate::models::{Column, Value};
use crate::reader::ReadOptions;
use crate::resolve::TableReference;
use crate::sql::Driver;
use crossbeam_channel::Sender;
use std::collections::HashSet;
use std::thread;

/// Rows handed to the engine per insert batch.
pub const DEFAULT_BATCH_ROWS: usize = 1000;

/// Worker threads scanning references concurrently.
pub const DEFAULT_JOBS: usize = 4;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportOptions {
    pub read: ReadOptions,
    /// Format applied to references without a `fmt:` prefix.
    pub input: InputFormat,
    /// Recognise gzip input by its magic bytes.
    pub gzip: bool,
    /// Fail on malformed records and rows whose width differs from the
    /// schema instead of skipping or padding them.
    pub strict: bool,
    pub sample_rows: usize,
    /// Infer column types; when off every column is text.
    pub guess_types: bool,
    pub jobs: usize,
    pub batch_rows: usize,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            read: ReadOptions::default(),
            input: InputFormat::Guess,
            gzip: true,
            strict: false,
            sample_rows: DEFAULT_SAMPLE_ROWS,
            guess_types: true,
            jobs: DEFAULT_JOBS,
            batch_rows: DEFAULT_BATCH_ROWS,
        }
    }
}

/// Outcome of importing one reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportReport {
    pub identifier: String,
    pub columns: Vec<Column>,
    pub rows: u64,
    /// Malformed records skipped in lenient mode.
    pub skipped: u64,
}

enum ImportEvent {
    Schema { slot: usize, columns: Vec<Column> },
    Rows { slot: usize, rows: Vec<Vec<Value>> },
    Done { slot: usize, skipped: u64 },
    Failed(ImportError),
}

pub struct Importer {
    options: ImportOptions,
    stdin: StdinBuffer,
    imported: HashSet<String>,
}

impl Importer {
    pub fn new(options: ImportOptions) -> Self {
        Self {
            options,
            stdin: StdinBuffer::default(),
            imported: HashSet::new(),
        }
    }

    pub fn is_imported(&self, identifier: &str) -> bool {
        self.imported.contains(identifier)
    }

    /// Create and fill one table per reference.
    ///
    /// References already imported by this importer are skipped, so a
    /// repeated call is a no-op. The first failure aborts the whole import.
    pub fn import_all(
        &mut self,
        driver: &mut dyn Driver,
        refs: &[TableReference],
    ) -> Result<Vec<ImportReport>, ImportError> {
        let pending: Vec<(usize, &TableReference)> = refs
            .iter()
            .enumerate()
            .filter(|(_, r)| !self.imported.contains(&r.identifier))
            .collect();
        if pending.is_empty() {
            return Ok(Vec::new());
        }

        let workers = self.options.jobs.clamp(1, pending.len());
        let (work_tx, work_rx) = crossbeam_channel::unbounded();
        for item in &pending {
            // The receiver is alive until the scope below ends.
            let _ = work_tx.send(*item);
        }
        drop(work_tx);

        let (tx, rx) = crossbeam_channel::bounded::<ImportEvent>(workers * 4);
        let options = &self.options;
        let stdin = &self.stdin;
        let imported = &mut self.imported;
        let mut reports: Vec<Option<ImportReport>> = vec![None; refs.len()];

        thread::scope(|scope| -> Result<(), ImportError> {
            for _ in 0..workers {
                let work_rx = work_rx.clone();
                let tx = tx.clone();
                scope.spawn(move || {
                    for (slot, reference) in work_rx.iter() {
                        match scan_reference(options, stdin, slot, reference, &tx) {
                            Ok(true) => {}
                            Ok(false) => break,
                            Err(error) => {
                                if tx.send(ImportEvent::Failed(error)).is_err() {
                                    break;
                                }
                            }
                        }
                    }
                });
            }
            drop(tx);

            // Dropping the receiver on early return unblocks the workers.
            let rx = rx;
            let mut remaining = pending.len();
            while remaining > 0 {
                let Ok(event) = rx.recv() else {
                    break;
                };
                match event {
                    ImportEvent::Schema { slot, columns } => {
                        let table = &refs[slot].identifier;
                        driver
                            .create_table(table, &columns)
                            .map_err(|source| ImportError::CreateTable {
                                table: table.clone(),
                                source,
                            })?;
                        reports[slot] = Some(ImportReport {
                            identifier: table.clone(),
                            columns,
                            rows: 0,
                            skipped: 0,
                        });
                    }
                    ImportEvent::Rows { slot, rows } => {
                        if let Some(report) = reports[slot].as_mut() {
                            report.rows += driver
                                .bulk_import(&report.identifier, &report.columns, &rows)
                                .map_err(|source| ImportError::Load {
                                    table: report.identifier.clone(),
                                    source,
                                })?;
                        }
                    }
                    ImportEvent::Done { slot, skipped } => {
                        if let Some(report) = reports[slot].as_mut() {
                            report.skipped = skipped;
                            tracing::debug!(
                                "Imported {} rows into {}",
                                report.rows,
                                report.identifier
                            );
                            imported.insert(report.identifier.clone());
                        }
                        remaining -= 1;
                    }
                    ImportEvent::Failed(error) => return Err(error),
                }
            }
            Ok(())
        })?;

        Ok(reports.into_iter().flatten().collect())
    }
}

/// Scan every source of one reference and stream its rows to `tx`.
///
/// Returns `Ok(false)` once the receiving side has gone away.
fn scan_reference(
    options: &ImportOptions,
    stdin: &StdinBuffer,
    slot: usize,
    reference: &TableReference,
    tx: &Sender<ImportEvent>,
) -> Result<bool, ImportError> {
    let hint = reference.format.or(options.input.hint());
    if reference.is_union() {
        tracing::debug!(
            "{}: union of {} files",
            reference.identifier,
            reference.sources.len()
        );
    }
    let mut schema: Option<Vec<Column>> = None;
    let mut skipped = 0;

    for source in &reference.sources {
        let mut scan = TableScan::open(source, hint, reference.header, options, stdin)?;

        match &schema {
            None => {
                if tx
                    .send(ImportEvent::Schema {
                        slot,
                        columns: scan.columns.clone(),
                    })
                    .is_err()
                {
                    return Ok(false);
                }
                schema = Some(scan.columns.clone());
            }
            Some(first) => {
                let expected: Vec<String> = first.iter().map(|c| c.name.clone()).collect();
                let found: Vec<String> = scan.columns.iter().map(|c| c.name.clone()).collect();
                if expected != found {
                    return Err(ImportError::SchemaMismatch {
                        path: scan.path().to_string(),
                        expected,
                        found,
                    });
                }
                scan.adopt(first);
            }
        }

        let mut batch = Vec::with_capacity(options.batch_rows);
        while let Some(row) = scan.next_row()? {
            batch.push(row);
            if batch.len() >= options.batch_rows.max(1) {
                let rows = std::mem::replace(&mut batch, Vec::with_capacity(options.batch_rows));
                if tx.send(ImportEvent::Rows { slot, rows }).is_err() {
                    return Ok(false);
                }
            }
        }
        if !batch.is_empty() && tx.send(ImportEvent::Rows { slot, rows: batch }).is_err() {
            return Ok(false);
        }

        if scan.truncated() > 0 {
            tracing::warn!(
                "{}: {} records had more fields than the {} columns; the extra fields were dropped",
                scan.path(),
                scan.truncated(),
                scan.columns.len()
            );
        }
        skipped += scan.skipped();
    }

    Ok(tx.send(ImportEvent::Done { slot, skipped }).is_ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::Source;
    use crate::models::ColumnType;
    use crate::sql::{RowBuffer, SqliteDriver};
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    fn reference(identifier: &str, paths: &[&Path]) -> TableReference {
        TableReference {
            raw: identifier.to_string(),
            spans: vec![0..0],
            sources: paths.iter().map(|p| Source::File(p.to_path_buf())).collect(),
            identifier: identifier.to_string(),
            format: None,
            header: false,
        }
    }

    fn query(driver: &mut SqliteDriver, sql: &str) -> Vec<Vec<Value>> {
        let mut buffer = RowBuffer::default();
        driver.query(sql, &mut buffer).unwrap();
        buffer.rows
    }

    #[test]
    fn test_import_single_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("test.csv");
        fs::write(&path, "1,Orange\n2,Melon\n3,Apple\n").unwrap();

        let mut driver = SqliteDriver::open("").unwrap();
        let mut importer = Importer::new(ImportOptions::default());
        let reports = importer
            .import_all(&mut driver, &[reference("test", &[&path])])
            .unwrap();

        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].rows, 3);
        assert_eq!(reports[0].columns[0].ty, ColumnType::Integer);
        assert!(importer.is_imported("test"));
        assert_eq!(
            query(&mut driver, "SELECT c2 FROM test WHERE c1 = 2"),
            vec![vec![Value::Text("Melon".into())]]
        );
    }

    #[test]
    fn test_reimport_is_noop() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("test.csv");
        fs::write(&path, "1\n").unwrap();

        let mut driver = SqliteDriver::open("").unwrap();
        let mut importer = Importer::new(ImportOptions::default());
        let refs = [reference("test", &[&path])];
        importer.import_all(&mut driver, &refs).unwrap();
        assert!(importer.import_all(&mut driver, &refs).unwrap().is_empty());
        assert_eq!(
            query(&mut driver, "SELECT count(*) FROM test"),
            vec![vec![Value::Integer(1)]]
        );
    }

    #[test]
    fn test_many_references_in_parallel() {
        let dir = TempDir::new().unwrap();
        let mut refs = Vec::new();
        for i in 0..8 {
            let path = dir.path().join(format!("t{}.csv", i));
            let body: String = (0..250).map(|n| format!("{},{}\n", n, i)).collect();
            fs::write(&path, body).unwrap();
            refs.push(reference(&format!("t{}", i), &[&path]));
        }

        let mut driver = SqliteDriver::open("").unwrap();
        let mut importer = Importer::new(ImportOptions {
            jobs: 3,
            batch_rows: 100,
            ..ImportOptions::default()
        });
        let reports = importer.import_all(&mut driver, &refs).unwrap();
        assert_eq!(reports.len(), 8);
        assert!(reports.iter().all(|r| r.rows == 250));
        assert_eq!(
            query(&mut driver, "SELECT sum(c2) FROM t7"),
            vec![vec![Value::Integer(7 * 250)]]
        );
    }

    #[test]
    fn test_glob_union() {
        let dir = TempDir::new().unwrap();
        let a = dir.path().join("tt1.csv");
        let b = dir.path().join("tt2.csv");
        fs::write(&a, "1,Orange\n").unwrap();
        fs::write(&b, "2,Melon\nx,Apple\n").unwrap();

        let mut driver = SqliteDriver::open("").unwrap();
        let mut importer = Importer::new(ImportOptions::default());
        let reports = importer
            .import_all(&mut driver, &[reference("tt", &[&a, &b])])
            .unwrap();
        assert_eq!(reports[0].rows, 3);
        assert_eq!(
            query(&mut driver, "SELECT c1 FROM tt ORDER BY c2"),
            vec![
                vec![Value::Text("x".into())],
                vec![Value::Integer(2)],
                vec![Value::Integer(1)],
            ]
        );
    }

    #[test]
    fn test_glob_union_schema_mismatch() {
        let dir = TempDir::new().unwrap();
        let a = dir.path().join("tt1.csv");
        let b = dir.path().join("tt2.csv");
        fs::write(&a, "1,Orange\n").unwrap();
        fs::write(&b, "2,Melon,extra\n").unwrap();

        let mut driver = SqliteDriver::open("").unwrap();
        let mut importer = Importer::new(ImportOptions::default());
        let err = importer
            .import_all(&mut driver, &[reference("tt", &[&a, &b])])
            .unwrap_err();
        assert!(matches!(err, ImportError::SchemaMismatch { .. }));
    }

    #[test]
    fn test_missing_file_aborts() {
        let mut driver = SqliteDriver::open("").unwrap();
        let mut importer = Importer::new(ImportOptions::default());
        let err = importer
            .import_all(
                &mut driver,
                &[reference("missing", &[Path::new("/nonexistent/missing.csv")])],
            )
            .unwrap_err();
        assert!(matches!(err, ImportError::FileNotFound(_)));
        assert!(!importer.is_imported("missing"));
    }

    #[test]
    fn test_create_table_failure() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("test.csv");
        fs::write(&path, "1\n").unwrap();

        let mut driver = SqliteDriver::open("").unwrap();
        driver.exec("CREATE TEMP TABLE test (x)").unwrap();
        let mut importer = Importer::new(ImportOptions::default());
        let err = importer
            .import_all(&mut driver, &[reference("test", &[&path])])
            .unwrap_err();
        assert!(matches!(err, ImportError::CreateTable { .. }));
    }
}
