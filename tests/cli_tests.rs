//! Binary-level tests: input formats, output formats, and error exits
#![allow(deprecated)] // assert_cmd::Command::cargo_bin

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

const JSONL_FIXTURE: &str = "tests/fixtures/sample_trace.jsonl";
const BABELTRACE_FIXTURE: &str = "tests/fixtures/sample_babeltrace.txt";

fn latencia() -> Command {
    Command::cargo_bin("latencia").unwrap()
}

#[test]
fn test_text_report_lists_slowest_tier() {
    latencia()
        .arg(JSONL_FIXTURE)
        .assert()
        .success()
        .stdout(predicate::str::contains("Syscall Latency Tiers"))
        .stdout(predicate::str::contains("Matched system calls: 7"))
        .stdout(predicate::str::contains("rank 0, 1 calls"))
        .stdout(predicate::str::contains("  poll"))
        .stdout(predicate::str::contains("1 exits without entry, 1 entries still open"));
}

#[test]
fn test_rank_selects_middle_tier() {
    latencia()
        .args(["--rank", "1", JSONL_FIXTURE])
        .assert()
        .success()
        .stdout(predicate::str::contains("rank 1, 3 calls"))
        .stdout(predicate::str::contains("  write"));
}

#[test]
fn test_json_output_is_parseable() {
    let output = latencia()
        .args(["--format", "json", JSONL_FIXTURE])
        .output()
        .unwrap();
    assert!(output.status.success());

    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(value["total_calls"], 7);
    assert_eq!(value["clusters"], 3);
    assert_eq!(value["selected_members"], serde_json::json!(["poll"]));
    assert_eq!(value["extraction"]["unmatched_exits"], 1);
    assert_eq!(value["extraction"]["open_at_end"], 1);
    assert_eq!(value["tiers"][2]["mean_duration_ns"], 1.0);
}

#[test]
fn test_csv_output_header() {
    latencia()
        .args(["--format", "csv", JSONL_FIXTURE])
        .assert()
        .success()
        .stdout(predicate::str::starts_with(
            "group,rank,count,mean_ns,min_ns,max_ns,centroid_ns\n",
        ))
        .stdout(predicate::str::contains(",0,1,1000000.00,1000000,1000000,"));
}

#[test]
fn test_babeltrace_input() {
    latencia()
        .args(["--format", "csv", BABELTRACE_FIXTURE])
        .assert()
        .success()
        .stdout(predicate::str::contains(",0,1,1000000.00,"))
        .stdout(predicate::str::contains(",1,1,1000.00,"))
        .stdout(predicate::str::contains(",2,1,1.00,"));
}

#[test]
fn test_show_durations() {
    latencia()
        .args(["--show-durations", JSONL_FIXTURE])
        .assert()
        .success()
        .stdout(predicate::str::contains("=== Syscall Durations ==="))
        .stdout(predicate::str::is_match(r"write\s+1000").unwrap());
}

#[test]
fn test_filter_excludes_calls() {
    latencia()
        .args(["-e", "trace=!poll", "--show-durations", JSONL_FIXTURE])
        .assert()
        .success()
        .stdout(predicate::str::contains("Matched system calls: 6"))
        .stdout(predicate::str::contains("poll").not());
}

#[test]
fn test_stdin_input() {
    let trace = fs::read_to_string(JSONL_FIXTURE).unwrap();
    latencia()
        .args(["--input-format", "jsonl", "-"])
        .write_stdin(trace)
        .assert()
        .success()
        .stdout(predicate::str::contains("Matched system calls: 7"));
}

#[test]
fn test_config_file() {
    let tmp_dir = TempDir::new().unwrap();
    let config = tmp_dir.path().join("latencia.toml");
    fs::write(&config, "clusters = 2\nseed = 5\n").unwrap();

    latencia()
        .args(["--format", "json", "--config"])
        .arg(&config)
        .arg(JSONL_FIXTURE)
        .assert()
        .success()
        .stdout(predicate::str::contains("\"clusters\": 2"))
        .stdout(predicate::str::contains("\"seed\": 5"));
}

#[test]
fn test_out_of_order_trace_fails() {
    let tmp_dir = TempDir::new().unwrap();
    let trace = tmp_dir.path().join("bad.jsonl");
    fs::write(
        &trace,
        "{\"name\": \"syscall_entry_read\", \"timestamp_ns\": 100}\n\
         {\"name\": \"syscall_exit_read\", \"timestamp_ns\": 50}\n",
    )
    .unwrap();

    latencia()
        .arg(&trace)
        .assert()
        .failure()
        .stderr(predicate::str::contains("out of order"));
}

#[test]
fn test_malformed_trace_fails() {
    let tmp_dir = TempDir::new().unwrap();
    let trace = tmp_dir.path().join("bad.jsonl");
    fs::write(&trace, "{\"name\": \"syscall_entry_read\"}\n").unwrap();

    latencia()
        .arg(&trace)
        .assert()
        .failure()
        .stderr(predicate::str::contains("line 1"));
}

#[test]
fn test_trace_without_pairs_fails() {
    let tmp_dir = TempDir::new().unwrap();
    let trace = tmp_dir.path().join("exits.jsonl");
    fs::write(&trace, "{\"name\": \"syscall_exit_read\", \"timestamp_ns\": 5}\n").unwrap();

    latencia()
        .arg(&trace)
        .assert()
        .failure()
        .stderr(predicate::str::contains("No matched syscall"));
}

#[test]
fn test_missing_trace_file_fails() {
    latencia()
        .arg("/nonexistent/trace.jsonl")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to open trace"));
}

#[test]
fn test_zero_clusters_rejected() {
    latencia()
        .args(["-k", "0", JSONL_FIXTURE])
        .assert()
        .failure()
        .stderr(predicate::str::contains("clusters must be >= 1"));
}

#[test]
fn test_group_out_of_range_rejected() {
    latencia()
        .args(["--group", "7", JSONL_FIXTURE])
        .assert()
        .failure()
        .stderr(predicate::str::contains("out of range"));
}

#[test]
fn test_huge_cluster_count_rejected() {
    latencia()
        .args(["-k", "18446744073709551615", JSONL_FIXTURE])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to cluster syscall durations"))
        .stderr(predicate::str::contains("exceeds the number of durations"))
        .stderr(predicate::str::contains("panicked").not());
}

#[test]
fn test_unrecognized_trace_format_rejected() {
    let tmp_dir = TempDir::new().unwrap();
    let trace = tmp_dir.path().join("trace.txt");
    fs::write(&trace, "syscall_entry_read at 100\n").unwrap();

    latencia()
        .arg(&trace)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Cannot detect trace format"));
}

#[test]
fn test_overlapping_markers_rejected() {
    latencia()
        .args([
            "--entry-marker",
            "sys_",
            "--exit-marker",
            "sys_exit_",
            JSONL_FIXTURE,
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("must not contain one another"));
}
