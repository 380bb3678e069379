use std::fs;

use epiwalk::report::{FrameReport, StateCountReport};
use tempfile::tempdir;

fn epiwalk() -> assert_cmd::Command {
    assert_cmd::Command::cargo_bin("epiwalk").unwrap()
}

#[test]
fn headless_run_prints_summary() {
    let output = epiwalk()
        .args(["--random-seed", "1", "--max-ticks", "8", "--no-pacing"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.starts_with("8 ticks in "), "unexpected stdout: {stdout}");
    assert!(stdout.contains("MaxTicks"));
}

#[test]
fn writes_reports() {
    let temp_dir = tempdir().unwrap();
    epiwalk()
        .args([
            "--random-seed",
            "3",
            "--max-ticks",
            "4",
            "--population-size",
            "25",
            "--movement-mode",
            "fixed-drift",
            "--boundary-policy",
            "wrap-to-zero",
            "--no-pacing",
            "--frames",
            "--output-dir",
        ])
        .arg(temp_dir.path())
        .assert()
        .success();

    let mut reader = csv::Reader::from_path(temp_dir.path().join("state_counts.csv")).unwrap();
    let rows: Vec<StateCountReport> = reader.deserialize().map(Result::unwrap).collect();
    assert_eq!(rows.iter().map(|row| row.tick).collect::<Vec<_>>(), vec![1, 2, 3, 4]);
    assert!(rows.iter().all(|row| row.healthy + row.infected == 25));

    let mut reader = csv::Reader::from_path(temp_dir.path().join("frames.csv")).unwrap();
    let frames: Vec<FrameReport> = reader.deserialize().map(Result::unwrap).collect();
    assert_eq!(frames.len(), 100);
    assert!(frames
        .iter()
        .all(|frame| (0.0..=1.0).contains(&frame.x) && (0.0..=1.0).contains(&frame.y)));
}

#[test]
fn same_seed_same_frames() {
    let run = || {
        let temp_dir = tempdir().unwrap();
        epiwalk()
            .args(["-r", "11", "-t", "6", "-n", "10", "--no-pacing", "--frames", "-o"])
            .arg(temp_dir.path())
            .assert()
            .success();
        fs::read_to_string(temp_dir.path().join("frames.csv")).unwrap()
    };
    assert_eq!(run(), run());
}

#[test]
fn refuses_to_overwrite_reports() {
    let temp_dir = tempdir().unwrap();
    let args = ["-r", "1", "-t", "1", "--no-pacing", "-o"];
    epiwalk().args(args).arg(temp_dir.path()).assert().success();
    epiwalk().args(args).arg(temp_dir.path()).assert().failure();
    epiwalk()
        .args(args)
        .arg(temp_dir.path())
        .arg("--force-overwrite")
        .assert()
        .success();
}

#[test]
fn reads_config_file() {
    let temp_dir = tempdir().unwrap();
    let config = temp_dir.path().join("parameters.json");
    fs::write(
        &config,
        r#"{ "population_size": 5, "max_ticks": 3, "tick_interval_ms": null, "seed": 2 }"#,
    )
    .unwrap();
    let output = epiwalk().arg("--config").arg(&config).output().unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.contains("Loading parameters from:"));
    assert!(stdout.contains("3 ticks in "));
}

#[test]
fn invalid_configuration_fails_at_start() {
    let output = epiwalk()
        .args(["--population-size", "0", "--max-ticks", "1", "--no-pacing"])
        .output()
        .unwrap();
    assert!(!output.status.success());
    let stderr = String::from_utf8(output.stderr).unwrap();
    assert!(stderr.contains("Invalid configuration"), "unexpected stderr: {stderr}");
}

#[test]
fn interval_conflicts_with_no_pacing() {
    epiwalk()
        .args(["--interval-ms", "5", "--no-pacing", "-t", "1"])
        .assert()
        .failure();
}
