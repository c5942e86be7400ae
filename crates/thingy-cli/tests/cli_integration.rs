//! CLI Integration Tests
//!
//! These tests run the `thingy` binary and check help, completions,
//! argument validation and configuration management. Commands that talk to
//! a device are covered by the hardware tests in thingy-core.
//!
//! ```
//! cargo test --package thingy-cli --test cli_integration
//! ```

use std::path::Path;
use std::process::{Command, Output};

fn thingy() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_thingy"));
    cmd.env_remove("THINGY_DEVICE").env_remove("RUST_LOG");
    cmd
}

fn run(args: &[&str]) -> Output {
    thingy().args(args).output().expect("Failed to run thingy")
}

/// Run with the platform config directory pointed at `home`.
fn run_with_config(home: &Path, args: &[&str]) -> Output {
    thingy()
        .env("XDG_CONFIG_HOME", home)
        .env("HOME", home)
        .args(args)
        .output()
        .expect("Failed to run thingy")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).to_string()
}

// --- Help and version ---

#[test]
fn test_help_lists_commands() {
    let output = run(&["--help"]);
    assert!(output.status.success(), "Help should succeed");

    let text = stdout(&output);
    for command in ["scan", "watch", "led", "beep", "config", "completions"] {
        assert!(text.contains(command), "Help should list {}", command);
    }
}

#[test]
fn test_version() {
    let output = run(&["--version"]);
    assert!(output.status.success());
    assert!(stdout(&output).contains("thingy"));
}

#[test]
fn test_subcommand_help() {
    let subcommands: [&[&str]; 7] = [
        &["scan"],
        &["watch"],
        &["led"],
        &["led", "breathe"],
        &["led", "flash"],
        &["beep"],
        &["config"],
    ];
    for cmd in subcommands {
        let mut args = cmd.to_vec();
        args.push("--help");
        let output = run(&args);
        assert!(output.status.success(), "{:?} --help should succeed", cmd);
        assert!(!stdout(&output).is_empty());
    }
}

// --- Argument validation ---

#[test]
fn test_rejects_invalid_arguments() {
    let cases: [&[&str]; 5] = [
        &["led", "on", "300", "0", "0"],
        &["led", "breathe", "orange"],
        &["led", "flash", "red", "--intensity", "0"],
        &["beep", "--volume", "150"],
        &["watch", "--events", "humidity"],
    ];
    for args in cases {
        let output = run(args);
        assert!(!output.status.success(), "{:?} should fail", args);
        assert_eq!(output.status.code(), Some(2), "{:?} should be a usage error", args);
    }
}

#[test]
fn test_unknown_command() {
    let output = run(&["download"]);
    assert!(!output.status.success());
}

// --- Completions ---

#[test]
fn test_completions() {
    for shell in ["bash", "zsh", "fish"] {
        let output = run(&["completions", shell]);
        assert!(output.status.success(), "{} completions should succeed", shell);
        assert!(stdout(&output).contains("thingy"));
    }
}

// --- Config ---

#[test]
fn test_config_path() {
    let output = run(&["config", "path"]);
    assert!(output.status.success());
    assert!(stdout(&output).trim_end().ends_with("config.toml"));
}

#[cfg(target_os = "linux")]
#[test]
fn test_config_set_get_unset() {
    let home = tempfile::tempdir().unwrap();

    let output = run_with_config(home.path(), &["config", "set", "throttle-ms", "250"]);
    assert!(output.status.success());
    assert!(home.path().join("thingy").join("config.toml").exists());

    let output = run_with_config(home.path(), &["config", "get", "throttle-ms"]);
    assert_eq!(stdout(&output).trim(), "250");

    let output = run_with_config(home.path(), &["config", "show"]);
    assert!(stdout(&output).contains("throttle_ms = 250"));

    let output = run_with_config(home.path(), &["config", "unset", "throttle-ms"]);
    assert!(output.status.success());
    let output = run_with_config(home.path(), &["config", "get", "throttle-ms"]);
    assert_eq!(stdout(&output).trim(), "(not set)");
}

#[cfg(target_os = "linux")]
#[test]
fn test_config_set_rejects_invalid_value() {
    let home = tempfile::tempdir().unwrap();

    let output = run_with_config(home.path(), &["config", "set", "tone-volume", "loud"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("tone-volume"));
    assert!(!home.path().join("thingy").join("config.toml").exists());
}
