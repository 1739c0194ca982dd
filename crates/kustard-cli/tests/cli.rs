//! Smoke tests for the `kustard` binary.

use std::process::Command;

fn kustard() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_kustard"));
    cmd.env_remove("KUSTARD_CONFIG").env("RUST_LOG", "off");
    cmd
}

#[test]
fn version_flag() {
    let output = kustard().arg("-V").output().unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.starts_with("kustard "), "{stdout}");
}

#[test]
fn missing_config_file_fails() {
    let dir = tempfile::tempdir().unwrap();
    let output = kustard()
        .current_dir(dir.path())
        .args(["--config", "nope.styx", "targets"])
        .output()
        .unwrap();
    assert!(!output.status.success());
    let stderr = String::from_utf8(output.stderr).unwrap();
    assert!(stderr.contains("Failed to read nope.styx"), "{stderr}");
}

#[test]
fn unknown_command_fails() {
    let output = kustard().arg("deploy").output().unwrap();
    assert!(!output.status.success());
}
