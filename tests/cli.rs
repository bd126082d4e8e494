use assert_cmd::Command;
use predicates::prelude::*;

fn label_worker() -> Command {
    let mut cmd = Command::cargo_bin("label-worker").unwrap();
    cmd.env_remove("LABEL_WORKER_SLACK_WEBHOOK_URL");
    cmd
}

#[test]
fn run_requires_worker_type() {
    label_worker()
        .arg("run")
        .assert()
        .failure()
        .stderr(predicate::str::contains("required arguments were not provided"));
}

#[test]
fn run_rejects_unknown_worker_type() {
    label_worker()
        .args(["run", "both"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid value 'both'"))
        .stderr(predicate::str::contains("exec-issue"));
}

#[test]
fn run_help_lists_worker_types() {
    label_worker()
        .args(["run", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("fix-review-point"))
        .stdout(predicate::str::contains("update-issue"))
        .stdout(predicate::str::contains("all"));
}

#[test]
fn missing_gh_is_fatal_at_startup() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("config.toml");
    std::fs::write(&config, "[status]\nmode = \"never\"\n").unwrap();

    label_worker()
        .args(["run", "exec-issue", "--gh", "nonexistent-gh-xyz", "--config"])
        .arg(&config)
        .assert()
        .code(3)
        .stderr(predicate::str::contains("tool not found"));
}

#[test]
fn malformed_config_exits_with_config_code() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("config.toml");
    std::fs::write(&config, "[status\nmode = ").unwrap();

    label_worker()
        .args(["run", "all", "--config"])
        .arg(&config)
        .assert()
        .code(2)
        .stderr(predicate::str::contains("invalid .label-worker.toml"));
}

#[test]
fn local_config_file_is_discovered() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join(".label-worker.toml"), "[status]\nrefresh = 0\n").unwrap();

    label_worker()
        .current_dir(dir.path())
        .args(["run", "exec-issue", "--gh", "nonexistent-gh-xyz"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("refresh"));
}

#[test]
fn init_without_gh_fails() {
    label_worker()
        .args(["init", "--gh", "nonexistent-gh-xyz"])
        .assert()
        .code(3)
        .stderr(predicate::str::contains("Creating labels"));
}

#[test]
fn schema_describes_config_sections() {
    label_worker()
        .arg("schema")
        .assert()
        .success()
        .stdout(predicate::str::contains("\"webhook_url\""))
        .stdout(predicate::str::contains("\"fix-review-point\""))
        .stdout(predicate::str::contains("\"prompt_flag\""));
}
