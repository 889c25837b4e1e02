//! Command-line behavior tests
//!
//! Every run uses the simulated backend so no OpenCL installation is needed.

use std::process::{Command, Output};

use clbw_core::JsonReport;

fn clbw(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_clbw"))
        .args(args)
        .env("RUST_LOG", "off")
        .output()
        .expect("failed to launch clbw")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

#[test]
fn test_sim_run_default_script() {
    let output = clbw(&["--backend", "sim", "1024"]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));

    let text = stdout(&output);
    assert!(text.starts_with("buffer_size: 1024\n"));
    assert!(text.contains("    Platform (0) Intel(R) OpenCL Graphics\n"));
    assert!(text.contains("    Device (0) Simulated Accelerator 0\n"));
    assert!(text.contains("    Device (1) Simulated Accelerator 1\n"));
    assert!(text.contains("Profiling read and write operations with 100 repetitions\n"));
    assert!(text.contains("  Hto0: 100 times 8.192e-06 GB in "));
    assert!(text.contains("  1toH: 100 times "));
    assert!(text.contains("  1mg0: 100 times "));
    assert!(stderr(&output).is_empty());
}

#[test]
fn test_missing_buffer_size_prints_usage() {
    let output = clbw(&[]);
    assert_eq!(output.status.code(), Some(1));
    let text = stdout(&output);
    assert!(text.starts_with("Usage: "));
    assert!(text.ends_with(" <buffer_size>\n"));
}

#[test]
fn test_non_numeric_buffer_size_prints_usage() {
    for arg in ["abc", "12kb", ""] {
        let output = clbw(&["--backend", "sim", arg]);
        assert_eq!(output.status.code(), Some(1), "argument {arg:?}");
        assert!(stdout(&output).starts_with("Usage: "));
        assert!(!stdout(&output).contains("buffer_size:"));
    }
}

#[test]
fn test_small_buffer_size_rejected() {
    let output = clbw(&["--backend", "sim", "8"]);
    assert_eq!(output.status.code(), Some(1));
    assert_eq!(stdout(&output), "Parameter <buffer_size> must be greater than 8.\n");
}

#[test]
fn test_help_exits_zero() {
    let output = clbw(&["--help"]);
    assert!(output.status.success());
    assert!(stdout(&output).contains("--backend"));
}

#[test]
fn test_single_device_fails_before_profiling() {
    let output = clbw(&["--backend", "sim", "--sim-devices", "1", "64"]);
    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("\nEpic fail:\nNot enough devices are available\n"));
    assert!(!stdout(&output).contains("Profiling"));
}

#[test]
fn test_missing_config_file_fails() {
    let missing = std::env::temp_dir().join(format!("clbw-missing-{}.json", std::process::id()));
    let config_arg = missing.to_string_lossy().to_string();
    let output = clbw(&["--backend", "sim", "--config", &config_arg, "64"]);
    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("\nEpic fail:\n"));
    assert!(stderr(&output).contains(&config_arg));
}

#[test]
fn test_json_report_on_stdout() {
    let output = clbw(&["-b", "sim", "--sim-devices", "3", "-f", "json", "-p", "Sim", "128"]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));

    let report: JsonReport = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report.buffer_size, 128);
    assert_eq!(report.platforms, vec!["Sim".to_string()]);
    assert_eq!(report.devices.len(), 3);
    assert!(!report.measurements.is_empty());
}

#[test]
fn test_config_file_script() {
    let path = std::env::temp_dir().join(format!("clbw-cli-{}.json", std::process::id()));
    std::fs::write(
        &path,
        r#"{
            "target_platform": "Configured",
            "script": [
                {"op": "section", "title": "Only copies"},
                {"op": "copy", "repeat": 3, "src": 1}
            ]
        }"#,
    )
    .unwrap();

    let config_arg = path.to_string_lossy().to_string();
    let output = clbw(&["-b", "sim", "-c", &config_arg, "64"]);
    std::fs::remove_file(&path).unwrap();

    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let text = stdout(&output);
    assert!(text.contains("    Platform (0) Configured\n"));
    assert!(text.contains("Only copies\n  1to0:   3 times "));
    assert!(!text.contains("Hto0"));
}

#[test]
fn test_oversized_buffer_size_rejected() {
    let output = clbw(&["--backend", "sim", "18446744073709551615"]);
    assert_eq!(output.status.code(), Some(1));
    assert_eq!(stdout(&output), "Parameter <buffer_size> is too large.\n");
}
