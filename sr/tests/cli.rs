//! Tests for the sr binary

use std::fs;
use std::path::{Path, PathBuf};

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::{TempDir, tempdir};

use seqreport::replay::write_events;
use seqreport::{CheckDescriptor, CheckKind, Config, SequenceEvent, TestInfo, TestStatus};

fn sr(home: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("sr").unwrap();
    cmd.env("XDG_DATA_HOME", home.path().join("data"))
        .env("XDG_CONFIG_HOME", home.path().join("config"))
        .env("HOME", home.path());
    cmd
}

fn events() -> Vec<SequenceEvent> {
    let test = TestInfo::new("Rails").with_parameter("rail", "3V3");
    vec![
        SequenceEvent::SequenceUpdate {
            status: "Running".to_string(),
        },
        SequenceEvent::TestStart {
            test: test.clone(),
            test_index: 1,
        },
        SequenceEvent::Check {
            passed: true,
            check: CheckDescriptor::new(CheckKind::InTolerance, "3V3")
                .observed(3.31)
                .nominal(3.3)
                .tolerance(0.1),
            test_index: 1,
            check_count: Some(1),
        },
        SequenceEvent::TestComplete {
            test,
            test_index: 1,
            status: TestStatus::Pass,
        },
        SequenceEvent::SequenceComplete {
            status: "Finished".to_string(),
            passed: 1,
            failed: 0,
            error: 0,
            skipped: 0,
            sequence_status: "PASSED".to_string(),
        },
    ]
}

fn only_report(dir: &Path) -> PathBuf {
    let reports: Vec<PathBuf> = fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().path())
        .filter(|p| p.extension().is_some_and(|e| e == "csv"))
        .collect();
    assert_eq!(reports.len(), 1, "{:?}", reports);
    reports.into_iter().next().unwrap()
}

#[test]
fn test_replay_writes_report() {
    let home = tempdir().unwrap();
    let events_path = home.path().join("events.jsonl");
    write_events(&events_path, &events()).unwrap();
    let out = home.path().join("reports");

    sr(&home)
        .args(["replay", events_path.to_str().unwrap(), "--script", "scripts/psu.py", "-v", "4", "-o"])
        .arg(&out)
        .assert()
        .success()
        .stdout(predicate::str::contains("Wrote 6 rows"));

    let report = only_report(&out);
    assert!(report.file_name().unwrap().to_string_lossy().starts_with("psu-"));
    let content = fs::read_to_string(report).unwrap();
    assert!(content.contains("test-script-name=psu,test_script-version=4,report-format=1\r\n"));
    assert!(content.contains(",Test 1,test-parameters,rail=3V3\r\n"));
}

#[test]
fn test_replay_uses_config_output_dir() {
    let home = tempdir().unwrap();
    let events_path = home.path().join("events.jsonl");
    write_events(&events_path, &events()).unwrap();

    let config = Config {
        output_dir: home.path().join("from-config"),
        framework_version: "9.9".to_string(),
        fsync: false,
        ..Default::default()
    };
    let config_path = home.path().join("seqreport.yml");
    config.save(&config_path).unwrap();

    sr(&home)
        .arg("--config")
        .arg(&config_path)
        .args(["replay", events_path.to_str().unwrap(), "--script", "psu.py"])
        .assert()
        .success();

    let content = fs::read_to_string(only_report(&home.path().join("from-config"))).unwrap();
    assert!(content.contains("fixate-version=9.9"));
    assert!(content.contains("test_script-version=unknown"));
}

#[test]
fn test_replay_without_session() {
    let home = tempdir().unwrap();
    let events_path = home.path().join("events.jsonl");
    write_events(&events_path, &events()[1..4]).unwrap();
    let out = home.path().join("reports");

    sr(&home)
        .args(["replay", events_path.to_str().unwrap(), "--script", "psu.py", "-o"])
        .arg(&out)
        .assert()
        .success()
        .stdout(predicate::str::contains("nothing written"));
    assert!(!out.exists());
}

#[test]
fn test_replay_missing_events_file() {
    let home = tempdir().unwrap();
    sr(&home)
        .args(["replay", "does-not-exist.jsonl", "--script", "psu.py"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to load events"));
}

#[test]
fn test_show_json() {
    let home = tempdir().unwrap();
    let events_path = home.path().join("events.jsonl");
    write_events(&events_path, &events()).unwrap();
    let out = home.path().join("reports");

    sr(&home)
        .args(["replay", events_path.to_str().unwrap(), "--script", "psu.py", "-o"])
        .arg(&out)
        .assert()
        .success();

    let output = sr(&home)
        .arg("show")
        .arg(only_report(&out))
        .args(["-f", "json"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let summary: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(summary["script_name"], "psu");
    assert_eq!(summary["tests_passed"], 1);
    assert_eq!(summary["checks_passed"], 1);
    assert_eq!(summary["sequence_status"], "PASSED");
    assert_eq!(summary["sessions"], 1);
}

#[test]
fn test_show_text() {
    let home = tempdir().unwrap();
    let report = home.path().join("psu-20240307-090502.csv");
    fs::write(
        &report,
        "0.00,Sequence,started=20240307-090502,fixate-version=1,test-script-name=psu,test_script-version=2,report-format=1\r\n\
         0.10,Test 1,start,Rails,\r\n",
    )
    .unwrap();

    sr(&home)
        .arg("show")
        .arg(&report)
        .assert()
        .success()
        .stdout(predicate::str::contains("psu"))
        .stdout(predicate::str::contains("incomplete"))
        .stdout(predicate::str::contains("1 started"));
}

#[test]
fn test_show_rejects_non_report() {
    let home = tempdir().unwrap();
    let bogus = home.path().join("bogus.csv");
    fs::write(&bogus, "a,b,c\r\n").unwrap();

    sr(&home).arg("show").arg(&bogus).assert().failure();
}
