//! Exit status of the `synq-sqlmesh` binary.

use std::process::Command;

fn synq_sqlmesh() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_synq-sqlmesh"));
    cmd.env_remove("RUST_LOG").env_remove("SYNQ_TOKEN");
    cmd
}

#[test]
fn failed_command_exits_with_status_1_and_logs_once() {
    let dir = tempfile::tempdir().unwrap();

    let output = synq_sqlmesh()
        .current_dir(dir.path())
        .args(["upload-run", "missing-run.log", "--output", "run.json"])
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Error executing command"), "{stderr}");
    assert_eq!(stderr.matches("failed to read run log").count(), 1, "{stderr}");
    assert!(!dir.path().join("run.json").exists());
}

#[test]
fn version_exits_successfully() {
    let output = synq_sqlmesh().arg("version").output().unwrap();

    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).starts_with("synq-sqlmesh "));
}
