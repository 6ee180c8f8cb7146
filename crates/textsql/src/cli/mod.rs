//! Command-line surface
//!
//! [`Cli`] maps flags onto a library [`Config`]; [`run`] executes one
//! invocation and leaves exit-status mapping to the binary.

use crate::analyze::analyze;
use crate::config::{parse_byte, unescape, Config, ConfigFile, EngineConfig};
use crate::format::InputFormat;
use crate::guess::DEFAULT_SAMPLE_ROWS;
use crate::import::{ImportOptions, DEFAULT_BATCH_ROWS, DEFAULT_JOBS};
use crate::query::QueryRunner;
use crate::reader::ReadOptions;
use crate::resolve::ResolveOptions;
use crate::sql::Engine;
use crate::writer::{OutputFormat, WriteOptions};
use anyhow::Context;
use clap::{CommandFactory, Parser};
use std::fs;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

const LONG_ABOUT: &str = r#"Run SQL queries directly against CSV, LTSV, JSON and TBLN files.

File paths in FROM and JOIN clauses are loaded as tables, so any SQL the
backing engine understands works on plain text files.

QUICK START
═══════════════════════════════════════════════════════════════════════════════

  textsql "SELECT * FROM data.csv"
  textsql --ih --oh "SELECT name, price FROM fruit.csv WHERE price > 100"
  textsql -o at "SELECT host, count(*) FROM access.ltsv GROUP BY host"
  textsql -a data.csv          # Show detected format, columns and types"#;

const AFTER_LONG_HELP: &str = r#"
TABLE REFERENCES
═══════════════════════════════════════════════════════════════════════════════

  data/test.csv          Bare path
  "data/a b.csv"         Quoted path containing spaces
  data/tt*.csv           Glob: every match is loaded into one table
  data/log.ltsv.gz       Gzip input is detected and decompressed
  ltsv:data/access.log   Explicit format for one reference
  -                      Standard input

  Columns are named from the header (--ih, or the keys of LTSV/JSON/TBLN
  input) or positionally as c1, c2, ...

EXAMPLES
═══════════════════════════════════════════════════════════════════════════════

  textsql "SELECT t.c2, h.c2 FROM test.csv AS t JOIN hist.csv AS h USING (c1)"
  textsql -i ltsv "SELECT * FROM access.log"
  cat data.json | textsql -o md "SELECT * FROM -"
  textsql --engine postgres --dsn "host=localhost user=postgres" "SELECT ..."

OUTPUT FORMATS: -o csv | ltsv | at | md | json | jsonl | raw | vf | tbln"#;

#[derive(Parser, Debug)]
#[command(name = "textsql")]
#[command(version)]
#[command(about = "Run SQL queries against CSV, LTSV, JSON and TBLN files")]
#[command(long_about = LONG_ABOUT)]
#[command(after_long_help = AFTER_LONG_HELP)]
pub struct Cli {
    /// SQL query to execute
    /// Example: "SELECT * FROM data.csv LIMIT 10"
    #[arg(value_name = "QUERY")]
    pub query: Option<String>,

    /// Read the SQL query from a file
    #[arg(short = 'q', long, value_name = "FILE", conflicts_with = "query")]
    pub query_file: Option<PathBuf>,

    /// Input format
    #[arg(short, long, value_enum, default_value = "guess")]
    pub input: InputFormat,

    /// The first input record is a header of column names
    #[arg(long = "ih")]
    pub input_header: bool,

    /// Input field delimiter (e.g. ";" or "\t")
    #[arg(long = "id", value_name = "DELIM")]
    pub input_delimiter: Option<String>,

    /// Input record terminator
    #[arg(long = "ir", value_name = "CHAR")]
    pub input_terminator: Option<String>,

    /// Fail on malformed records and ragged rows instead of skipping or padding
    #[arg(long)]
    pub strict: bool,

    /// Do not detect gzip-compressed input
    #[arg(long)]
    pub no_gzip: bool,

    /// Treat glob characters in table references literally
    #[arg(long)]
    pub no_glob: bool,

    /// Records sampled per table for type inference
    #[arg(long, value_name = "N", default_value_t = DEFAULT_SAMPLE_ROWS)]
    pub sample: usize,

    /// Import every column as text
    #[arg(long)]
    pub no_guess_types: bool,

    /// Output format
    #[arg(short, long, value_enum, default_value = "csv")]
    pub output: OutputFormat,

    /// Emit a header row of column names
    #[arg(long = "oh")]
    pub output_header: bool,

    /// Output field delimiter
    #[arg(long = "od", value_name = "DELIM")]
    pub output_delimiter: Option<String>,

    /// Quote every output field (csv)
    #[arg(long = "oq")]
    pub output_quote: bool,

    /// Backing SQL engine
    #[arg(long, value_enum)]
    pub engine: Option<Engine>,

    /// Data source name for the engine
    #[arg(long, env = "TEXTSQL_DSN")]
    pub dsn: Option<String>,

    /// Named database from the config file
    #[arg(long, value_name = "NAME")]
    pub db: Option<String>,

    /// Config file (default: <config dir>/textsql/config.json)
    #[arg(long, env = "TEXTSQL_CONFIG", value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Analyze a file and print its table layout instead of running a query
    #[arg(short, long, value_name = "FILE", conflicts_with_all = ["query", "query_file"])]
    pub analyze: Option<String>,

    /// Files imported concurrently
    #[arg(short, long, value_name = "N", default_value_t = DEFAULT_JOBS)]
    pub jobs: usize,

    /// Enable debug logging
    #[arg(long)]
    pub debug: bool,
}

impl Cli {
    /// Build the library configuration, with flags overriding the config file.
    pub fn to_config(&self, file: &ConfigFile) -> anyhow::Result<Config> {
        let read = ReadOptions {
            header: self.input_header,
            delimiter: self.input_delimiter.as_deref().map(parse_byte).transpose()?,
            terminator: self.input_terminator.as_deref().map(parse_byte).transpose()?,
        };
        let import = ImportOptions {
            read,
            input: self.input,
            gzip: !self.no_gzip,
            strict: self.strict,
            sample_rows: self.sample,
            guess_types: !self.no_guess_types,
            jobs: self.jobs,
            batch_rows: DEFAULT_BATCH_ROWS,
        };

        let mut engine = match (self.db.as_deref(), self.engine) {
            (None, Some(engine)) => EngineConfig {
                engine,
                dsn: String::new(),
            },
            (db, engine) => {
                let mut config = file.engine(db)?.unwrap_or_default();
                if let Some(engine) = engine {
                    config.engine = engine;
                }
                config
            }
        };
        if let Some(dsn) = &self.dsn {
            engine.dsn = dsn.clone();
        }

        let config = Config {
            import,
            resolve: ResolveOptions {
                glob: !self.no_glob,
                header: self.input_header,
            },
            write: WriteOptions {
                header: self.output_header,
                delimiter: self.output_delimiter.as_deref().map(unescape),
                quote_all: self.output_quote,
            },
            output: self.output,
            engine,
        };
        config.validate()?;
        Ok(config)
    }
}

/// Execute one invocation, writing results to standard output.
pub fn run(cli: Cli) -> anyhow::Result<()> {
    let file = ConfigFile::load(cli.config.as_deref()).context("Failed to load configuration")?;
    let config = cli.to_config(&file)?;
    tracing::debug!("Engine: {} {:?}", config.engine.engine, config.engine.dsn);

    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());

    if let Some(path) = &cli.analyze {
        let analysis = analyze(path, cli.input_header, &config.import)?;
        analysis.render(&mut out)?;
        out.flush()?;
        return Ok(());
    }

    let sql = match (&cli.query, &cli.query_file) {
        (_, Some(path)) => read_query_file(path)?,
        (Some(query), None) => query.clone(),
        (None, None) => {
            Cli::command().print_help()?;
            return Ok(());
        }
    };

    QueryRunner::new(config).run(&sql, &mut out)?;
    out.flush()?;
    Ok(())
}

fn read_query_file(path: &Path) -> anyhow::Result<String> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read query file {}", path.display()))?;
    Ok(text.trim().trim_end_matches(';').trim_end().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("textsql").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_defaults() {
        let cli = parse(&["SELECT 1"]);
        let config = cli.to_config(&ConfigFile::default()).unwrap();
        assert_eq!(config.output, OutputFormat::Csv);
        assert_eq!(config.engine, EngineConfig::default());
        assert!(config.import.gzip);
        assert!(config.resolve.glob);
        assert_eq!(config.import.sample_rows, DEFAULT_SAMPLE_ROWS);
    }

    #[test]
    fn test_io_flags() {
        let cli = parse(&[
            "--ih", "--id", "\\t", "--oh", "--od", ";", "--oq", "-i", "ltsv", "-o", "json",
            "--no-glob", "--strict", "SELECT 1",
        ]);
        let config = cli.to_config(&ConfigFile::default()).unwrap();
        assert!(config.import.read.header);
        assert!(config.resolve.header);
        assert_eq!(config.import.read.delimiter, Some(b'\t'));
        assert_eq!(config.import.input, InputFormat::Ltsv);
        assert!(config.import.strict);
        assert!(!config.resolve.glob);
        assert_eq!(config.output, OutputFormat::Json);
        assert_eq!(config.write.delimiter.as_deref(), Some(";"));
        assert!(config.write.header && config.write.quote_all);
    }

    #[test]
    fn test_invalid_input_delimiter() {
        let cli = parse(&["--id", "ab", "SELECT 1"]);
        assert!(cli.to_config(&ConfigFile::default()).is_err());
    }

    #[test]
    fn test_engine_flags_override_config_file() {
        let file: ConfigFile = serde_json::from_str(
            r#"{"db": "pdb", "database": {"pdb": {"driver": "postgres", "dsn": "host=db"}}}"#,
        )
        .unwrap();

        let config = parse(&["SELECT 1"]).to_config(&file).unwrap();
        assert_eq!(config.engine.engine, Engine::Postgres);
        assert_eq!(config.engine.dsn, "host=db");

        let config = parse(&["--engine", "sqlite", "SELECT 1"]).to_config(&file).unwrap();
        assert_eq!(config.engine, EngineConfig::default());

        let config = parse(&["--db", "pdb", "--dsn", "host=other", "SELECT 1"])
            .to_config(&file)
            .unwrap();
        assert_eq!(config.engine.dsn, "host=other");

        assert!(parse(&["--db", "missing", "SELECT 1"]).to_config(&file).is_err());
    }

    #[test]
    fn test_query_and_query_file_conflict() {
        assert!(Cli::try_parse_from(["textsql", "-q", "a.sql", "SELECT 1"]).is_err());
    }

    #[test]
    fn test_read_query_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("q.sql");
        fs::write(&path, "\n SELECT 1+1;\n\n").unwrap();
        assert_eq!(read_query_file(&path).unwrap(), "SELECT 1+1");
    }
}
