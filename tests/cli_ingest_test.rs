use assert_cmd::Command;
use chrono::Utc;
use predicates::prelude::*;
use serde_json::Value;
use std::fs;
use std::path::Path;
use tempfile::tempdir;

fn surfscan(home: &Path) -> Command {
    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("surfscan");
    cmd.current_dir(home)
        .env("SURFSCAN_HOME", home)
        .env("SURFSCAN_TIMEZONE", "utc")
        .env_remove("SURFSCAN_DATA_DIR")
        .env_remove("SURFSCAN_EXPORTS_DIR")
        .env_remove("SURFSCAN_LOGS_DIR")
        .env_remove("SURFSCAN_CONFIG_PATH")
        .env_remove("SURFSCAN_MAX_FILE_AGE_DAYS")
        .env_remove("SURFSCAN_LOG_LEVEL");
    cmd
}

fn json_report(output: &[u8]) -> Value {
    serde_json::from_slice(output).expect("report json")
}

#[test]
fn ingest_from_stdin_writes_todays_partition() {
    let tmp = tempdir().expect("tempdir");
    let today = Utc::now().date_naive().format("%Y-%m-%d").to_string();

    surfscan(tmp.path())
        .arg("ingest")
        .write_stdin(
            r#"{"data":{"title":"<b>Hi</b> there","author":"  Jane   Doe ","url":"www.example.com/a","date":"March 5, 2024"}}"#,
        )
        .assert()
        .success()
        .stdout(predicate::str::contains(format!("partition={today}")));

    let partition = tmp.path().join("data").join(format!("{today}.csv"));
    let raw = fs::read_to_string(&partition).expect("partition");
    let mut lines = raw.lines();
    assert_eq!(
        lines.next(),
        Some("title,author,publisher,date,abstract,url,time_received")
    );
    let row = lines.next().expect("row");
    assert!(row.starts_with("Hi there,Jane Doe,example.com,2024-03-05,,https://www.example.com/a,"));
    assert!(tmp.path().join("logs").join("audit.log").exists());
}

#[test]
fn ingest_reads_input_file_and_read_returns_rows() {
    let tmp = tempdir().expect("tempdir");
    let today = Utc::now().date_naive().format("%Y-%m-%d").to_string();
    let body = tmp.path().join("body.json");
    fs::write(&body, r#"{"title":"Commas, \"quotes\"\nand lines"}"#).expect("write body");

    surfscan(tmp.path())
        .args(["ingest", "--input"])
        .arg(&body)
        .assert()
        .success();

    let output = surfscan(tmp.path())
        .args(["--json", "read", "--date", &today])
        .output()
        .expect("run read");
    assert!(output.status.success());
    let report = json_report(&output.stdout);
    let details = report["details"].as_array().expect("details");
    assert!(details.iter().any(|d| d == "count=1"));
    let entry: Value = details
        .iter()
        .filter_map(Value::as_str)
        .find_map(|d| serde_json::from_str(d).ok())
        .expect("entry line");
    assert_eq!(entry["title"], "Commas, \"quotes\" and lines");
    assert_eq!(entry["author"], "");
    assert!(entry["time_received"].as_str().is_some_and(|s| !s.is_empty()));
}

#[test]
fn non_json_body_is_stored_as_placeholder() {
    let tmp = tempdir().expect("tempdir");
    surfscan(tmp.path())
        .arg("ingest")
        .write_stdin("definitely not json")
        .assert()
        .success()
        .stdout(predicate::str::contains("record=placeholder"));
}

#[test]
fn empty_body_is_rejected() {
    let tmp = tempdir().expect("tempdir");
    surfscan(tmp.path())
        .arg("ingest")
        .write_stdin("   ")
        .assert()
        .failure()
        .stdout(predicate::str::contains("no JSON data provided"));
}

#[test]
fn reading_a_missing_day_fails() {
    let tmp = tempdir().expect("tempdir");
    surfscan(tmp.path())
        .args(["read", "--date", "1999-01-01"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("no data found for date: 1999-01-01"));
}

#[test]
fn malformed_date_is_an_invalid_key() {
    let tmp = tempdir().expect("tempdir");
    surfscan(tmp.path())
        .args(["read", "--date", "../secrets"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("E003_INVALID_PARTITION_KEY"));
}

#[test]
fn stats_and_partitions_reflect_ingested_rows() {
    let tmp = tempdir().expect("tempdir");
    for title in ["one", "two", "three"] {
        surfscan(tmp.path())
            .arg("ingest")
            .write_stdin(format!(r#"{{"title":"{title}"}}"#))
            .assert()
            .success();
    }

    surfscan(tmp.path())
        .arg("stats")
        .assert()
        .success()
        .stdout(predicate::str::contains("total_partitions=1"))
        .stdout(predicate::str::contains("total_records=3"));

    surfscan(tmp.path())
        .arg("partitions")
        .assert()
        .success()
        .stdout(predicate::str::contains("rows=3"));
}
