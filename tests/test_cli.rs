
use fixtures::*;

use assert_cmd::prelude::*;
use predicates::str::contains;
use std::fs::File;
use std::io::{Read, Write};
use std::process::Command;
use tempfile::tempdir;

fn fast_run_args() -> [&'static str; 4] {
    ["-n", "1", "--warmup", "0"]
}

#[test]
fn it_runs_the_bundled_suite() {
    let suite = suite_file();

    let mut cmd = Command::new(assert_cmd::cargo_bin!("xmlbench_run"));
    cmd.args(fast_run_args());
    cmd.arg(suite.to_str().unwrap());

    let output = cmd.output().unwrap();
    assert!(output.status.success(), "run failed: {output:?}");

    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.contains("suite `codecs`"));
    assert!(stdout.contains("text-parse"));
    assert!(stdout.contains("purchase-order"));
    assert!(!stdout.contains("FAILED"), "unexpected failures:\n{stdout}");
}

#[test]
fn json_reports_carry_one_row_per_pair() {
    let suite = suite_file();

    let mut cmd = Command::new(assert_cmd::cargo_bin!("xmlbench_run"));
    cmd.args(["-o", "json"]);
    cmd.args(fast_run_args());
    cmd.arg(suite.to_str().unwrap());

    let output = cmd.output().unwrap();
    assert!(output.status.success(), "run failed: {output:?}");

    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["suite"], "codecs");

    let rows = report["rows"].as_array().unwrap();
    // Six drivers crossed with two cases.
    assert_eq!(rows.len(), 12);
    for row in rows {
        assert!(row.get("error").is_none(), "failed pair: {row}");
        assert_eq!(row["iterations"], 1);
        assert!(row["results"]["inputKilobytes"].as_f64().unwrap() > 0.0);
    }
}

#[test]
fn it_respects_directory_output() {
    let d = tempdir().unwrap();
    let f = d.as_ref().join("report.txt");

    let suite = suite_file();

    let mut cmd = Command::new(assert_cmd::cargo_bin!("xmlbench_run"));
    cmd.args(["-f", &f.to_string_lossy()]);
    cmd.args(fast_run_args());
    cmd.arg(suite.to_str().unwrap());

    assert!(
        cmd.output().unwrap().stdout.is_empty(),
        "Expected output to be printed to file, but was printed to stdout"
    );

    let mut expected = vec![];

    File::open(&f).unwrap().read_to_end(&mut expected).unwrap();
    assert!(
        !expected.is_empty(),
        "Expected output to be printed to file"
    )
}

#[test]
fn test_it_refuses_to_overwrite_directory() {
    let d = tempdir().unwrap();

    let suite = suite_file();
    let mut cmd = Command::new(assert_cmd::cargo_bin!("xmlbench_run"));
    cmd.args(["-f", &d.path().to_string_lossy()]);
    cmd.args(fast_run_args());
    cmd.arg(suite.to_str().unwrap());

    cmd.assert()
        .failure()
        .code(1)
        .stderr(contains("refusing to overwrite"));
}

#[test]
fn test_it_overwrites_file_anyways_if_passed_flag() {
    let d = tempdir().unwrap();
    let f = d.as_ref().join("report.txt");

    let mut file = File::create(&f).unwrap();
    file.write_all(b"I'm a file!").unwrap();

    let suite = suite_file();
    let mut cmd = Command::new(assert_cmd::cargo_bin!("xmlbench_run"));
    cmd.args(["-f", &f.to_string_lossy(), "--no-confirm-overwrite"]);
    cmd.args(fast_run_args());
    cmd.arg(suite.to_str().unwrap());

    cmd.assert().success();

    let mut expected = vec![];

    File::open(&f).unwrap().read_to_end(&mut expected).unwrap();
    assert!(
        !expected.is_empty(),
        "Expected output to be printed to file"
    )
}

#[test]
fn it_supports_stdin_input_with_dash() {
    let suite = suite_file();

    let mut cmd_file = Command::new(assert_cmd::cargo_bin!("xmlbench_run"));
    cmd_file.args(["-o", "json"]);
    cmd_file.args(fast_run_args());
    cmd_file.arg(suite.to_str().unwrap());
    let out_file = cmd_file.output().unwrap();
    assert!(
        out_file.status.success(),
        "expected file-input run to succeed"
    );

    // Relative case inputs resolve against the working directory, so run
    // from the samples directory.
    let stdin_file = File::open(&suite).unwrap();
    let mut cmd_stdin = Command::new(assert_cmd::cargo_bin!("xmlbench_run"));
    cmd_stdin.current_dir(samples_dir());
    cmd_stdin.args(["-o", "json"]);
    cmd_stdin.args(fast_run_args());
    cmd_stdin.arg("-");
    cmd_stdin.stdin(stdin_file);
    let out_stdin = cmd_stdin.output().unwrap();
    assert!(
        out_stdin.status.success(),
        "expected stdin-input run to succeed"
    );

    let file_report: serde_json::Value = serde_json::from_slice(&out_file.stdout).unwrap();
    let stdin_report: serde_json::Value = serde_json::from_slice(&out_stdin.stdout).unwrap();
    assert_eq!(stdin_report["suite"], file_report["suite"]);
    assert_eq!(
        stdin_report["rows"].as_array().unwrap().len(),
        file_report["rows"].as_array().unwrap().len()
    );
}

#[test]
fn a_missing_input_fails_the_pair_but_not_the_run() {
    let d = tempdir().unwrap();
    let suite_path = d.as_ref().join("suite.json");
    let raw = format!(
        r#"{{
            "name": "mixed",
            "drivers": [{{"name": "text-parse"}}],
            "cases": [
                {{"name": "good", "input": {good:?}}},
                {{"name": "gone", "input": "no-such-file.xml"}}
            ]
        }}"#,
        good = inventory_sample()
    );
    std::fs::write(&suite_path, raw).unwrap();

    let mut cmd = Command::new(assert_cmd::cargo_bin!("xmlbench_run"));
    cmd.args(fast_run_args());
    cmd.arg(suite_path.to_str().unwrap());

    let output = cmd.output().unwrap();
    // The report is still produced; the exit code flags the failure.
    assert_eq!(output.status.code(), Some(1));
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.contains("FAILED"));
    assert!(stdout.contains("good"));

    // With --fail-fast nothing is reported at all.
    let mut cmd = Command::new(assert_cmd::cargo_bin!("xmlbench_run"));
    cmd.arg("--fail-fast");
    cmd.args(fast_run_args());
    cmd.arg(suite_path.to_str().unwrap());
    cmd.assert().failure();
}
