use assert_cmd::Command;
use predicates::prelude::*;
use std::io::Write;

fn write_config(dir: &tempfile::TempDir, body: &str) -> String {
    let path = dir.path().join("itla.toml");
    let mut f = std::fs::File::create(&path).unwrap();
    f.write_all(body.as_bytes()).unwrap();
    path.to_str().unwrap().to_string()
}

const SIM_CONFIG: &str = r#"
[connection]
port = "SIM"
baud = 9600
"#;

#[test]
fn help_lists_the_command_surface() {
    Command::cargo_bin("itla_cli")
        .unwrap()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("jump"))
        .stdout(predicate::str::contains("sweep"))
        .stdout(predicate::str::contains("monitor"));
}

#[test]
fn missing_config_fails_with_context() {
    Command::cargo_bin("itla_cli")
        .unwrap()
        .args(["--config", "/nonexistent/itla.toml", "status"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to read config"));
}

#[test]
fn invalid_config_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(
        &dir,
        r#"
[connection]
port = "COM2"
baud = 1234
"#,
    );
    Command::cargo_bin("itla_cli")
        .unwrap()
        .args(["--config", &path, "status"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid config"));
}

#[test]
fn regs_prints_the_register_map() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(&dir, SIM_CONFIG);
    Command::cargo_bin("itla_cli")
        .unwrap()
        .args(["--config", &path, "regs"])
        .assert()
        .success()
        .stdout(predicate::str::contains("CjumpTHz"))
        .stdout(predicate::str::contains("0xed"));
}

#[test]
fn sim_status_reads_a_snapshot() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(&dir, SIM_CONFIG);
    Command::cargo_bin("itla_cli")
        .unwrap()
        .args(["--config", &path, "--sim", "status"])
        .assert()
        .success()
        .stdout(predicate::str::contains("THz"));
}

#[test]
fn sim_jump_without_calibration_fails_typed() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(&dir, SIM_CONFIG);
    Command::cargo_bin("itla_cli")
        .unwrap()
        .args(["--config", &path, "--sim", "jump", "194.5"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no jump calibration"));
}
