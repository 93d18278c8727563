//! E2E maintenance and reporting: status, validate/repair, config, and the
//! tmux-facing commands when tmux is switched off.

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;
use std::path::Path;
use tempfile::TempDir;

// ---------------------------------------------------------------------------
// Test Harness
// ---------------------------------------------------------------------------

fn chore_cmd(dir: &Path) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("chore"));
    cmd.current_dir(dir);
    cmd.env("CHORES_LOG", "error");
    cmd.env("XDG_CONFIG_HOME", dir.join(".xdg"));
    cmd.env_remove("FORMAT");
    cmd.env_remove("TMUX");
    cmd
}

fn init_project(dir: &Path) {
    chore_cmd(dir)
        .args(["init", "--disable-tmux"])
        .assert()
        .success();
}

fn json_of(dir: &Path, args: &[&str]) -> Value {
    let output = chore_cmd(dir)
        .args(args)
        .arg("--json")
        .output()
        .expect("chore should not crash");
    assert!(
        output.status.success(),
        "{args:?} failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).expect("--json should produce valid JSON")
}

fn create(dir: &Path, name: &str) -> u64 {
    json_of(dir, &["create", name])["id"].as_u64().unwrap()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[test]
fn status_counts_by_phase() {
    let dir = TempDir::new().unwrap();
    init_project(dir.path());
    create(dir.path(), "a");
    create(dir.path(), "b");
    let c = create(dir.path(), "c");
    json_of(dir.path(), &["advance", &c.to_string()]);

    let status = json_of(dir.path(), &["status"]);
    assert_eq!(status["total"], 3);
    assert_eq!(status["counts"]["design"], 2);
    assert_eq!(status["counts"]["design_review"], 1);

    chore_cmd(dir.path())
        .args(["status"])
        .assert()
        .success()
        .stdout("Chores[DSN:2 D-R:1]\n");
}

#[test]
fn empty_project_status() {
    let dir = TempDir::new().unwrap();
    init_project(dir.path());
    chore_cmd(dir.path())
        .args(["status"])
        .assert()
        .success()
        .stdout("Chores[none]\n");
}

#[test]
fn repair_moves_stray_completed_chore_to_archive() {
    let dir = TempDir::new().unwrap();
    init_project(dir.path());
    let keep = create(dir.path(), "keep");

    // A completed record left behind in the active store, written with the
    // legacy field names.
    let active = dir.path().join(".chores/chores.jsonl");
    let mut body = std::fs::read_to_string(&active).unwrap();
    body.push_str(r#"{"id":42,"name":"stray","description":"","status":"work_done"}"#);
    body.push('\n');
    std::fs::write(&active, body).unwrap();

    chore_cmd(dir.path())
        .args(["validate"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("E3002"));

    let report = json_of(dir.path(), &["repair"]);
    assert_eq!(report["cleanup"]["cleaned_count"], 1);
    assert_eq!(report["validation"]["valid"], true);

    let validation = json_of(dir.path(), &["validate"]);
    assert_eq!(validation["completed_count"], 1);
    assert_eq!(validation["active_count"], 1);

    let stray = json_of(dir.path(), &["show", "42"]);
    assert_eq!(stray["archived"], true);
    let kept = json_of(dir.path(), &["show", &keep.to_string()]);
    assert_eq!(kept["archived"], false);
}

#[test]
fn config_reports_effective_values_and_issues() {
    let dir = TempDir::new().unwrap();
    init_project(dir.path());

    let cfg = json_of(dir.path(), &["config"]);
    assert_eq!(cfg["project"]["tmux"]["enabled"], false);
    assert_eq!(cfg["resolved_output"], "json");
    assert_eq!(cfg["issues"].as_array().unwrap().len(), 0);

    std::fs::write(
        dir.path().join(".chores/config.toml"),
        "[ids]\nnode_id = 4096\n",
    )
    .unwrap();
    let cfg = json_of(dir.path(), &["config"]);
    assert_eq!(cfg["issues"].as_array().unwrap().len(), 1);

    chore_cmd(dir.path())
        .args(["list"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("E1002"));
}

#[test]
fn tmux_commands_refuse_when_disabled() {
    let dir = TempDir::new().unwrap();
    init_project(dir.path());

    for cmd in ["windows", "attach"] {
        chore_cmd(dir.path())
            .args([cmd])
            .assert()
            .failure()
            .stderr(predicate::str::contains("E6001"));
    }
}

#[test]
fn no_tmux_flag_keeps_lifecycle_working_with_tmux_enabled() {
    let dir = TempDir::new().unwrap();
    chore_cmd(dir.path()).args(["init"]).assert().success();

    let id = json_of(dir.path(), &["--no-tmux", "create", "quiet"])["id"]
        .as_u64()
        .unwrap();
    let outcome = json_of(dir.path(), &["--no-tmux", "advance", &id.to_string()]);
    assert_eq!(outcome["to"], "design_review");
}

#[test]
fn json_errors_are_structured() {
    let dir = TempDir::new().unwrap();
    init_project(dir.path());

    let output = chore_cmd(dir.path())
        .args(["show", "999", "--json"])
        .output()
        .unwrap();
    assert!(!output.status.success());
    let err: Value = serde_json::from_slice(&output.stderr).unwrap();
    assert_eq!(err["error"]["error_code"], "E2001");
    assert!(err["error"]["message"].as_str().unwrap().contains("999"));
}

#[test]
fn root_flag_works_from_elsewhere() {
    let project = TempDir::new().unwrap();
    let elsewhere = TempDir::new().unwrap();
    init_project(project.path());
    create(project.path(), "remote");

    let root = project.path().to_str().unwrap();
    let listed = json_of(elsewhere.path(), &["--root", root, "list"]);
    assert_eq!(listed[0]["name"], "remote");
}

#[test]
fn nested_directories_find_the_project() {
    let dir = TempDir::new().unwrap();
    init_project(dir.path());
    create(dir.path(), "top");
    let nested = dir.path().join("src/deep");
    std::fs::create_dir_all(&nested).unwrap();

    let listed = json_of(&nested, &["list"]);
    assert_eq!(listed.as_array().unwrap().len(), 1);
}
