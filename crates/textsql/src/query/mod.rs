//! Query execution
//!
//! [`QueryRunner`] drives one run: connect, resolve file references, import
//! them, execute the rewritten query and stream the result into a writer.
//! The connection is owned by a [`Session`], which tears it down on every
//! exit path.

use crate::config::Config;
use crate::error::{DriverError, Error, QueryError, Result};
use crate::import::{ImportReport, Importer};
use crate::resolve::{Resolution, Resolver};
use crate::sql::Session;
use crate::writer::new_writer;
use std::io::Write;

pub struct QueryRunner {
    config: Config,
}

impl QueryRunner {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Run `sql` on a fresh session and write the result to `out`.
    pub fn run(&self, sql: &str, out: &mut dyn Write) -> Result<()> {
        self.config.validate()?;
        let mut session = Session::connect(self.config.engine.engine, &self.config.engine.dsn)?;
        let mut importer = Importer::new(self.config.import.clone());
        self.execute(&mut session, &mut importer, sql, out)?;
        session.disconnect()?;
        Ok(())
    }

    /// Run `sql` on an existing session.
    ///
    /// Tables imported by earlier calls with the same `importer` are reused.
    pub fn execute(
        &self,
        session: &mut Session,
        importer: &mut Importer,
        sql: &str,
        out: &mut dyn Write,
    ) -> Result<()> {
        let resolution = self.resolve(session, sql)?;
        let reports = importer.import_all(session.driver()?, &resolution.refs)?;
        log_reports(&reports);

        let mut writer = new_writer(self.config.output, Box::new(out), &self.config.write);
        session
            .query(&resolution.sql, &mut writer)
            .map_err(|e| match e {
                DriverError::Sink(e) => Error::Write(e),
                source => Error::Query(QueryError {
                    sql: resolution.sql.clone(),
                    source,
                }),
            })?;
        writer.post_write()?;
        Ok(())
    }

    /// Rewrite `sql` with identifiers quoted for the session's engine.
    pub fn resolve(&self, session: &Session, sql: &str) -> Result<Resolution> {
        let sql = sql.trim().trim_end_matches(';').trim_end();
        let resolver = Resolver::new(self.config.resolve.clone());
        let resolution = resolver.resolve(sql, |ident| session.quote_identifier(ident))?;
        tracing::debug!("Rewritten query: {}", resolution.sql);
        Ok(resolution)
    }
}

fn log_reports(reports: &[ImportReport]) {
    for report in reports {
        tracing::info!(
            "Imported {} rows into {} ({} columns)",
            report.rows,
            report.identifier,
            report.columns.len()
        );
        if report.skipped > 0 {
            tracing::warn!(
                "{}: skipped {} malformed records",
                report.identifier,
                report.skipped
            );
        }
    }
}
