use std::path::Path;
use std::process::{Command, Output};

use assert_cmd::prelude::*;
use predicates::prelude::*;
use serde_json::Value;
use tempfile::tempdir;

fn fstk(config_folder: &Path) -> Command {
    let binary = assert_cmd::cargo::cargo_bin!("fstk");
    let mut cmd = Command::new(binary);
    cmd.env("NO_COLOR", "1");
    cmd.env_remove("FSTK_CONFIG_FOLDER");
    cmd.arg("--config-folder").arg(config_folder);
    cmd.arg("--log-file").arg(config_folder.join("fstk.log"));
    cmd
}

fn run_ok(config_folder: &Path, args: &[&str]) -> Output {
    let output = fstk(config_folder).args(args).output().expect("fstk executes");
    assert!(
        output.status.success(),
        "fstk {:?} failed:\nstdout:\n{}\nstderr:\n{}",
        args,
        String::from_utf8_lossy(&output.stdout),
        String::from_utf8_lossy(&output.stderr)
    );
    output
}

fn run_json(config_folder: &Path, args: &[&str]) -> Value {
    let output = run_ok(config_folder, args);
    serde_json::from_slice(&output.stdout).expect("valid json stdout")
}

#[test]
fn first_list_shows_the_example_task_and_writes_both_files() {
    let dir = tempdir().unwrap();
    let list = run_json(dir.path(), &["list"]);
    assert_eq!(list["tasks"][0]["name"], "Example task");
    assert_eq!(list["tasks"][0]["elapsed"], "01:17:12");
    assert_eq!(list["total_time"], 4632);

    assert!(dir.path().join("config.json").is_file());
    assert!(dir.path().join("tasks.json").is_file());
    assert!(!dir.path().join("fstk.lock").exists());
}

#[test]
fn task_lifecycle_round_trips_through_the_save_files() {
    let dir = tempdir().unwrap();
    let created = run_json(
        dir.path(),
        &["add", "Write report", "--ticket", "#77", "--color", "blue", "--notes", "draft"],
    );
    assert_eq!(created["index"], 1);
    assert_eq!(created["ticket"], "77");
    assert_eq!(created["color_group"], "Blue");

    let adjusted = run_json(dir.path(), &["adjust", "1", "300"]);
    assert_eq!(adjusted["elapsed_time"], 300);
    let adjusted = run_json(dir.path(), &["adjust", "1", "-500"]);
    assert_eq!(adjusted["elapsed_time"], 0);

    let edited = run_json(dir.path(), &["edit", "1", "--name", "Final report", "--ticket", ""]);
    assert_eq!(edited["name"], "Final report");
    assert_eq!(edited["ticket"], "");

    let moved = run_json(dir.path(), &["move", "1", "0"]);
    assert_eq!(moved["tasks"][0]["name"], "Final report");

    let cleared = run_json(dir.path(), &["clear", "1"]);
    assert_eq!(cleared["name"], "Example task");
    assert_eq!(cleared["elapsed_time"], 0);

    let deleted = run_json(dir.path(), &["delete", "0"]);
    assert_eq!(deleted["task"]["name"], "Final report");

    let stats = run_json(dir.path(), &["stats"]);
    assert_eq!(stats["total_created_tasks"], 1);
    assert_eq!(stats["total_deleted_tasks"], 1);
    assert_eq!(stats["total_time_clears"], 1);
    assert_eq!(stats["total_app_launches"], 8);
}

#[test]
fn run_accrues_time_on_the_selected_task() {
    let dir = tempdir().unwrap();
    let before = run_json(dir.path(), &["list"]);
    let start = before["tasks"][0]["elapsed_time"].as_u64().unwrap();

    let ran = run_json(dir.path(), &["run", "0", "--duration", "2"]);
    assert_eq!(ran["elapsed_time"], start + 2);

    let stats = run_json(dir.path(), &["stats"]);
    assert_eq!(stats["total_task_switches"], 1);
}

#[cfg(unix)]
#[test]
fn interrupted_run_saves_accrued_time_and_releases_the_lock() {
    let dir = tempdir().unwrap();
    let before = run_json(dir.path(), &["list"]);
    let start = before["tasks"][0]["elapsed_time"].as_u64().unwrap();

    let child = fstk(dir.path())
        .args(["run", "0"])
        .stdout(std::process::Stdio::piped())
        .spawn()
        .unwrap();
    std::thread::sleep(std::time::Duration::from_millis(3500));
    let status = Command::new("kill")
        .args(["-INT", &child.id().to_string()])
        .status()
        .unwrap();
    assert!(status.success());

    let output = child.wait_with_output().unwrap();
    assert!(output.status.success());
    let ran: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert!(ran["elapsed_time"].as_u64().unwrap() >= start + 2);
    assert!(!dir.path().join("fstk.lock").exists());

    let after = run_json(dir.path(), &["list"]);
    assert_eq!(after["tasks"][0]["elapsed_time"], ran["elapsed_time"]);
}

#[test]
fn pause_is_persisted_in_the_config() {
    let dir = tempdir().unwrap();
    run_json(dir.path(), &["pause"]);
    assert_eq!(run_json(dir.path(), &["config", "get", "time_running"]), false);
    run_json(dir.path(), &["resume"]);
    assert_eq!(run_json(dir.path(), &["config", "get", "time_running"]), true);
}

#[test]
fn config_set_reports_effective_changes() {
    let dir = tempdir().unwrap();
    let set = run_json(dir.path(), &["config", "set", "options.redmine.host", "tracker.example"]);
    assert_eq!(set["changed"], true);
    assert_eq!(set["value"], "tracker.example");

    let again = run_json(dir.path(), &["config", "set", "options.redmine.host", "tracker.example"]);
    assert_eq!(again["changed"], false);

    let on_disk: Value =
        serde_json::from_str(&std::fs::read_to_string(dir.path().join("config.json")).unwrap())
            .unwrap();
    assert_eq!(on_disk["options"]["redmine"]["host"], "tracker.example");
}

#[test]
fn config_set_refuses_values_that_would_break_later_launches() {
    let dir = tempdir().unwrap();
    for (path, value) in [("version", "99"), ("stats", "5"), ("stats", "{}"), ("window", "[]")] {
        fstk(dir.path())
            .args(["config", "set", path, value])
            .assert()
            .failure()
            .stderr(predicate::str::contains("\"error\":\"validation_error\""));
    }

    let list = run_json(dir.path(), &["list"]);
    assert_eq!(list["tasks"].as_array().unwrap().len(), 1);
    assert_eq!(run_json(dir.path(), &["config", "get", "version"]), 7);
    assert_eq!(
        run_json(dir.path(), &["config", "get", "stats.total_app_launches"]),
        7
    );
}

#[test]
fn validation_errors_are_reported_as_json() {
    let dir = tempdir().unwrap();
    fstk(dir.path())
        .args(["add", "Bad ticket", "--ticket", "abc"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("\"error\":\"validation_error\""));

    fstk(dir.path())
        .args(["add", "   "])
        .assert()
        .failure()
        .stderr(predicate::str::contains("The text cannot be empty"));

    fstk(dir.path())
        .args(["delete", "9"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("task_not_found"));

    fstk(dir.path())
        .args(["--format", "pretty", "config", "get", "options.nope"])
        .assert()
        .failure()
        .stderr(predicate::str::starts_with("error: "));
}

#[test]
fn newer_save_file_refuses_to_load() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("config.json");
    std::fs::write(&path, r#"{"version": 99}"#).unwrap();

    fstk(dir.path())
        .arg("list")
        .assert()
        .failure()
        .stderr(predicate::str::contains("migration_error"));
    assert_eq!(std::fs::read_to_string(&path).unwrap(), r#"{"version": 99}"#);
    assert!(!dir.path().join("fstk.lock").exists());
}

#[test]
fn pretty_list_renders_total() {
    let dir = tempdir().unwrap();
    fstk(dir.path())
        .args(["--format", "pretty", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Example task"))
        .stdout(predicate::str::contains("#1234"))
        .stdout(predicate::str::contains("total"));
}
