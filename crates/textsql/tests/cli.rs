//! CLI integration tests using assert_cmd.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

/// Creates a working directory with fixture files for CLI testing.
fn create_test_dir() -> TempDir {
    let temp = TempDir::new().expect("Failed to create temp dir");
    let path = temp.path();

    fs::write(path.join("test.csv"), "1,Orange\n2,Melon\n3,Apple\n").expect("Failed to write file");
    fs::write(path.join("header.csv"), "c1,c2\n1,Orange\n2,Melon\n3,Apple\n")
        .expect("Failed to write file");
    fs::write(path.join("a b.csv"), "1,spaced\n").expect("Failed to write file");
    fs::write(path.join("tt1.csv"), "1,a\n").expect("Failed to write file");
    fs::write(path.join("tt2.csv"), "2,b\n").expect("Failed to write file");
    fs::write(
        path.join("access.ltsv"),
        "host:127.0.0.1\tstatus:200\nhost:10.0.0.1\tstatus:404\n",
    )
    .expect("Failed to write file");
    fs::write(
        path.join("data.json"),
        "{\"id\": 1, \"name\": \"Orange\"}\n{\"id\": 2, \"name\": \"Melon\"}\n",
    )
    .expect("Failed to write file");
    fs::write(
        path.join("data.tbln"),
        "; name: | id | name |\n; type: | int | text |\n| 1 | Orange |\n",
    )
    .expect("Failed to write file");

    temp
}

fn textsql(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("textsql").unwrap();
    cmd.current_dir(dir.path())
        .env_remove("TEXTSQL_DSN")
        .env_remove("TEXTSQL_CONFIG")
        .env_remove("RUST_LOG");
    cmd
}

#[test]
fn test_help() {
    let mut cmd = Command::cargo_bin("textsql").unwrap();
    cmd.arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("CSV, LTSV, JSON and TBLN"));
}

#[test]
fn test_version() {
    let mut cmd = Command::cargo_bin("textsql").unwrap();
    cmd.arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("textsql"));
}

#[test]
fn test_no_query_prints_help() {
    let dir = create_test_dir();
    textsql(&dir)
        .assert()
        .success()
        .stdout(predicate::str::contains("Usage"));
}

#[test]
fn test_select_all() {
    let dir = create_test_dir();
    textsql(&dir)
        .arg("SELECT * FROM test.csv")
        .assert()
        .success()
        .stdout("1,Orange\n2,Melon\n3,Apple\n");
}

#[test]
fn test_header_in_and_out() {
    let dir = create_test_dir();
    textsql(&dir)
        .args(["--ih", "--oh", "SELECT * FROM header.csv"])
        .assert()
        .success()
        .stdout("c1,c2\n1,Orange\n2,Melon\n3,Apple\n");
}

#[test]
fn test_no_from_clause() {
    let dir = create_test_dir();
    textsql(&dir)
        .arg("SELECT 1+1")
        .assert()
        .success()
        .stdout("2\n");
}

#[test]
fn test_unknown_function_fails() {
    let dir = create_test_dir();
    textsql(&dir)
        .arg("SELECT * FROM func()")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Query error"))
        .stderr(predicate::str::contains("func()"));
}

#[test]
fn test_quoted_path_with_space() {
    let dir = create_test_dir();
    textsql(&dir)
        .arg("SELECT * FROM \"a b.csv\"")
        .assert()
        .success()
        .stdout("1,spaced\n");
}

#[test]
fn test_missing_file_fails() {
    let dir = create_test_dir();
    textsql(&dir)
        .arg("SELECT * FROM missing.csv")
        .assert()
        .failure()
        .stderr(predicate::str::contains("missing.csv"));
}

#[test]
fn test_glob_union() {
    let dir = create_test_dir();
    textsql(&dir)
        .arg("SELECT c2 FROM tt*.csv")
        .assert()
        .success()
        .stdout("a\nb\n");
}

#[test]
fn test_no_glob_treats_pattern_literally() {
    let dir = create_test_dir();
    textsql(&dir)
        .args(["--no-glob", "SELECT c2 FROM tt*.csv"])
        .assert()
        .failure();
}

#[test]
fn test_gzip_input() {
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::Write;

    let dir = create_test_dir();
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(b"1,Orange\n2,Melon\n").unwrap();
    fs::write(dir.path().join("fruit.csv.gz"), encoder.finish().unwrap()).unwrap();

    textsql(&dir)
        .arg("SELECT count(*) FROM fruit.csv.gz")
        .assert()
        .success()
        .stdout("2\n");
}

#[test]
fn test_ltsv_input() {
    let dir = create_test_dir();
    textsql(&dir)
        .arg("SELECT host FROM access.ltsv WHERE status = 404")
        .assert()
        .success()
        .stdout("10.0.0.1\n");
}

#[test]
fn test_json_input() {
    let dir = create_test_dir();
    textsql(&dir)
        .arg("SELECT name FROM data.json WHERE id = 2")
        .assert()
        .success()
        .stdout("Melon\n");
}

#[test]
fn test_tbln_input() {
    let dir = create_test_dir();
    textsql(&dir)
        .arg("SELECT id + 1, name FROM data.tbln")
        .assert()
        .success()
        .stdout("2,Orange\n");
}

#[test]
fn test_stdin_input() {
    let dir = create_test_dir();
    textsql(&dir)
        .arg("SELECT c2 FROM - WHERE c1 = 2")
        .write_stdin("1,x\n2,y\n")
        .assert()
        .success()
        .stdout("y\n");
}

#[test]
fn test_output_ltsv() {
    let dir = create_test_dir();
    textsql(&dir)
        .args(["-o", "ltsv", "SELECT * FROM test.csv LIMIT 1"])
        .assert()
        .success()
        .stdout("c1:1\tc2:Orange\n");
}

#[test]
fn test_output_json() {
    let dir = create_test_dir();
    textsql(&dir)
        .args(["-o", "json", "SELECT * FROM test.csv LIMIT 2"])
        .assert()
        .success()
        .stdout("[\n  {\"c1\":1,\"c2\":\"Orange\"},\n  {\"c1\":2,\"c2\":\"Melon\"}\n]\n");
}

#[test]
fn test_output_jsonl() {
    let dir = create_test_dir();
    textsql(&dir)
        .args(["-o", "jsonl", "SELECT * FROM test.csv LIMIT 1"])
        .assert()
        .success()
        .stdout("{\"c1\":1,\"c2\":\"Orange\"}\n");
}

#[test]
fn test_output_raw_with_delimiter() {
    let dir = create_test_dir();
    textsql(&dir)
        .args(["-o", "raw", "--od", "|", "SELECT * FROM test.csv LIMIT 1"])
        .assert()
        .success()
        .stdout("1|Orange\n");
}

#[test]
fn test_output_csv_quote_all() {
    let dir = create_test_dir();
    textsql(&dir)
        .args(["--oq", "SELECT * FROM test.csv LIMIT 1"])
        .assert()
        .success()
        .stdout("\"1\",\"Orange\"\n");
}

#[test]
fn test_output_ascii_table() {
    let dir = create_test_dir();
    textsql(&dir)
        .args(["-o", "at", "SELECT * FROM test.csv"])
        .assert()
        .success()
        .stdout(predicate::str::contains("c2"))
        .stdout(predicate::str::contains("│"))
        .stdout(predicate::str::contains("Melon"));
}

#[test]
fn test_output_markdown() {
    let dir = create_test_dir();
    textsql(&dir)
        .args(["-o", "md", "SELECT * FROM test.csv"])
        .assert()
        .success()
        .stdout(predicate::str::contains("| c1 |"))
        .stdout(predicate::str::contains("Apple"));
}

#[test]
fn test_output_vertical() {
    let dir = create_test_dir();
    textsql(&dir)
        .args(["-o", "vf", "SELECT * FROM test.csv LIMIT 1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("---[ 1]"))
        .stdout(predicate::str::contains("c2: Orange"));
}

#[test]
fn test_output_tbln() {
    let dir = create_test_dir();
    textsql(&dir)
        .args(["-o", "tbln", "SELECT * FROM test.csv LIMIT 1"])
        .assert()
        .success()
        .stdout("; name: | c1 | c2 |\n; type: | int | text |\n| 1 | Orange |\n");
}

#[test]
fn test_analyze() {
    let dir = create_test_dir();
    textsql(&dir)
        .args(["-a", "test.csv"])
        .assert()
        .success()
        .stdout(predicate::str::contains("The table name is test."))
        .stdout(predicate::str::contains("The file type is CSV."))
        .stdout(predicate::str::contains("SELECT c1, c2 FROM test.csv"));
}

#[test]
fn test_query_file() {
    let dir = create_test_dir();
    fs::write(dir.path().join("query.sql"), "SELECT c2 FROM test.csv WHERE c1 = 3;\n").unwrap();
    textsql(&dir)
        .args(["-q", "query.sql"])
        .assert()
        .success()
        .stdout("Apple\n");
}

#[test]
fn test_missing_query_file() {
    let dir = create_test_dir();
    textsql(&dir)
        .args(["-q", "nope.sql"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to read query file"));
}

#[test]
fn test_config_file_database() {
    let dir = create_test_dir();
    let config = dir.path().join("config.json");
    let db = dir.path().join("store.sqlite");
    fs::write(
        &config,
        format!(
            r#"{{"db": "local", "database": {{"local": {{"driver": "sqlite", "dsn": "{}"}}}}}}"#,
            db.display()
        ),
    )
    .unwrap();

    textsql(&dir)
        .args(["--config", config.to_str().unwrap(), "SELECT count(*) FROM test.csv"])
        .assert()
        .success()
        .stdout("3\n");
    assert!(db.exists());
}

#[test]
fn test_unknown_database_fails() {
    let dir = create_test_dir();
    let config = dir.path().join("config.json");
    fs::write(&config, r#"{"database": {}}"#).unwrap();
    textsql(&dir)
        .args(["--config", config.to_str().unwrap(), "--db", "nope", "SELECT 1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("nope"));
}
