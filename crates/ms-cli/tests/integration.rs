#![allow(deprecated)]
use assert_cmd::Command;
use predicates::prelude::*;
use std::path::Path;
use tempfile::TempDir;

fn ms(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("ms-tools").unwrap();
    cmd.current_dir(dir.path()).env("MS_ROOT", dir.path());
    cmd
}

fn write(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, content).unwrap();
}

fn stdout_json(output: std::process::Output) -> serde_json::Value {
    assert!(output.status.success(), "command failed: {output:?}");
    serde_json::from_slice(&output.stdout).unwrap()
}

fn planning_project() -> TempDir {
    let dir = TempDir::new().unwrap();
    let p = dir.path().join(".planning");
    write(
        &p,
        "phases/04-api/04-01-SUMMARY.md",
        "---\nphase: 04-api\nsubsystem: api\naffects: [05-auth]\nrequires: [02-db]\ntech-stack:\n  added: [jose]\nkey-decisions: [Use JWT]\n---\n\n## Next Phase Readiness\n\n- token refresh undecided\n",
    );
    write(
        &p,
        "phases/02-db/02-01-SUMMARY.md",
        "---\nphase: 02-db\nsubsystem: db\ntech-stack:\n  added: [sqlx]\n---\n",
    );
    write(
        &p,
        "phases/01-infra/01-01-SUMMARY.md",
        "---\nphase: 01-infra\nsubsystem: infra\ntech-stack:\n  added: [postgres]\n---\n",
    );
    std::fs::create_dir_all(p.join("phases/05-auth")).unwrap();
    write(&p, "ROADMAP.md", "# Roadmap\n\n### Phase 05: Auth\n");
    write(&p, "config.json", r#"{"subsystems": ["api", "db", "auth"]}"#);
    dir
}

const INIT_PAYLOAD: &str = r#"{
  "source": ["05-01-SUMMARY.md"],
  "tests": [
    {"name": "Login with valid credentials", "expected": "Dashboard shows"},
    {"name": "Login with invalid password", "expected": "Error banner", "mock_required": true, "mock_type": "error_state"},
    {"name": "Premium feature access", "expected": "Upgrade prompt", "mock_required": true, "mock_type": "premium_user"}
  ],
  "batches": [
    {"name": "No Mocks Required", "tests": [1]},
    {"name": "Error States", "mock_type": "error_state", "tests": [2]},
    {"name": "Premium Features", "mock_type": "premium_user", "tests": [3]}
  ]
}"#;

fn init_uat(dir: &TempDir) {
    ms(dir)
        .args(["uat", "init", "5"])
        .write_stdin(INIT_PAYLOAD)
        .assert()
        .success()
        .stdout(predicate::str::contains("with 3 tests in 3 batches"));
}

// ---------------------------------------------------------------------------
// scan-context
// ---------------------------------------------------------------------------

#[test]
fn scan_context_without_planning_prints_message() {
    let dir = TempDir::new().unwrap();
    ms(&dir)
        .args(["scan-context", "--phase", "5"])
        .assert()
        .success()
        .stdout("No .planning/ directory found. No prior context available.\n");
}

#[test]
fn scan_context_without_planning_json_is_empty_result() {
    let dir = TempDir::new().unwrap();
    let out = ms(&dir)
        .args(["--json", "scan-context", "--phase", "5", "--phase-name", "user auth"])
        .output()
        .unwrap();
    let json = stdout_json(out);
    assert_eq!(json["success"], true);
    assert_eq!(json["target"]["phase"], "05");
    assert_eq!(json["target"]["keywords"], serde_json::json!(["user", "auth"]));
    assert_eq!(json["sources"]["summaries"]["skipped"], ".planning/ not found");
    assert_eq!(json["sources"]["summaries"]["dir"], "");
    assert_eq!(json["summaries"], serde_json::json!([]));
    assert_eq!(json["aggregated"]["tech_stack_added"], serde_json::json!([]));
}

#[test]
fn scan_context_json_scores_and_aggregates() {
    let dir = planning_project();
    let out = ms(&dir)
        .args(["-j", "scan-context", "--phase", "05", "--subsystem", "auth"])
        .output()
        .unwrap();
    let json = stdout_json(out);

    let summaries = json["summaries"].as_array().unwrap();
    assert_eq!(summaries.len(), 3);
    let relevance = |phase: &str| {
        summaries
            .iter()
            .find(|s| s["frontmatter"]["phase"] == phase)
            .map(|s| s["relevance"].as_str().unwrap().to_string())
            .unwrap()
    };
    assert_eq!(relevance("04-api"), "HIGH");
    assert_eq!(relevance("02-db"), "HIGH");
    assert_eq!(relevance("01-infra"), "LOW");

    assert_eq!(
        json["aggregated"]["tech_stack_added"],
        serde_json::json!(["jose", "sqlx"])
    );
    assert_eq!(json["sources"]["summaries"]["scanned"], 3);
    assert_eq!(json["sources"]["debug_docs"]["skipped"], "directory not found");
}

#[test]
fn scan_context_markdown_sections() {
    let dir = planning_project();
    ms(&dir)
        .args(["scan-context", "--phase", "5"])
        .assert()
        .success()
        .stdout(predicate::str::contains("### Tech Stack\njose, sqlx"))
        .stdout(predicate::str::contains("### Summaries Needing Full Read"))
        .stdout(predicate::str::contains("- summaries: 3 scanned"));
}

// ---------------------------------------------------------------------------
// uat
// ---------------------------------------------------------------------------

#[test]
fn uat_init_writes_file_in_existing_phase_dir() {
    let dir = planning_project();
    init_uat(&dir);

    let path = dir.path().join(".planning/phases/05-auth/05-auth-UAT.md");
    let text = std::fs::read_to_string(path).unwrap();
    assert!(text.contains("status: testing"));
    assert!(text.contains("## Current Batch\n\nbatch: 1 of 3\nname: \"No Mocks Required\""));
    assert!(text.contains("### 2. Login with invalid password\nexpected: Error banner\nmock_required: true\nmock_type: error_state\nresult: [pending]"));
}

#[test]
fn uat_init_rejects_invalid_json() {
    let dir = planning_project();
    ms(&dir)
        .args(["uat", "init", "5"])
        .write_stdin("{not json")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid JSON input"));
}

#[test]
fn uat_update_test_prints_progress() {
    let dir = planning_project();
    init_uat(&dir);

    ms(&dir)
        .args(["uat", "update", "5", "--test", "1", "result=pass"])
        .assert()
        .success()
        .stdout("Updated test 1: result=pass | Progress: 1/3 (1 pass, 0 issue, 0 fixing, 0 skip)\n");

    ms(&dir)
        .args([
            "uat",
            "update",
            "5",
            "--test",
            "2",
            "result=issue",
            "fix_status=applied",
            "reported=Generic error shown",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("2/3 (1 pass, 0 issue, 1 fixing, 0 skip)"));

    let text =
        std::fs::read_to_string(dir.path().join(".planning/phases/05-auth/05-auth-UAT.md")).unwrap();
    assert!(text.contains("reported: \"Generic error shown\""));
    assert!(text.contains("## Progress\n\ntotal: 3\ntested: 2\npassed: 1\nissues: 0\nfixing: 1\npending: 1\nskipped: 0\n"));
}

#[test]
fn uat_update_unknown_test_fails() {
    let dir = planning_project();
    init_uat(&dir);
    ms(&dir)
        .args(["uat", "update", "5", "--test", "99", "result=pass"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("error: Test 99 not found"));
}

#[test]
fn uat_update_rejects_fields_that_would_not_reload() {
    let dir = planning_project();
    init_uat(&dir);
    let path = dir.path().join(".planning/phases/05-auth/05-auth-UAT.md");
    let before = std::fs::read_to_string(&path).unwrap();

    ms(&dir)
        .args(["uat", "update", "5", "--test", "2", "fix-status=applied"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("error: invalid field 'fix-status'"));
    ms(&dir)
        .args(["uat", "update", "5", "--test", "2", "name="])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid field 'name': cannot be empty"));

    assert_eq!(std::fs::read_to_string(&path).unwrap(), before);
}

#[test]
fn uat_update_requires_a_target() {
    let dir = planning_project();
    init_uat(&dir);
    ms(&dir)
        .args(["uat", "update", "5", "result=pass"])
        .assert()
        .failure();
}

#[test]
fn uat_update_session_syncs_current_batch() {
    let dir = planning_project();
    init_uat(&dir);
    ms(&dir)
        .args(["uat", "update", "5", "--session", "current_batch=3", "mocked_files=a.dart,b.dart"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("Updated session: current_batch=3, mocked_files=a.dart,b.dart | Progress:"));

    let out = ms(&dir).args(["uat", "status", "5"]).output().unwrap();
    let json = stdout_json(out);
    assert_eq!(json["current_batch"], 3);
    assert_eq!(json["mocked_files"], serde_json::json!(["a.dart", "b.dart"]));

    let text =
        std::fs::read_to_string(dir.path().join(".planning/phases/05-auth/05-auth-UAT.md")).unwrap();
    assert!(text.contains("batch: 3 of 3\nname: \"Premium Features\"\nmock_type: premium_user"));
}

#[test]
fn uat_append_fix_replaces_same_test() {
    let dir = planning_project();
    init_uat(&dir);

    for commit in ["abc1234", "def5678"] {
        ms(&dir)
            .args(["uat", "update", "5", "--append-fix"])
            .write_stdin(format!(
                r#"{{"commit": "{commit}", "test": 2, "description": "Specific error", "files": ["auth.dart"]}}"#
            ))
            .assert()
            .success()
            .stdout(predicate::str::starts_with("Appended fix for test 2 | Progress:"));
    }

    let text =
        std::fs::read_to_string(dir.path().join(".planning/phases/05-auth/05-auth-UAT.md")).unwrap();
    assert_eq!(text.matches("- commit:").count(), 1);
    assert!(text.contains("- commit: def5678\n  test: 2\n  description: \"Specific error\"\n  files: [auth.dart]\n"));
}

#[test]
fn uat_append_assumption() {
    let dir = planning_project();
    init_uat(&dir);
    ms(&dir)
        .args(["uat", "update", "5", "--append-assumption"])
        .write_stdin(r#"{"test": 3, "name": "Premium", "expected": "Upgrade prompt", "reason": "No premium account"}"#)
        .assert()
        .success()
        .stdout(predicate::str::starts_with("Appended assumption for test 3"));

    let text =
        std::fs::read_to_string(dir.path().join(".planning/phases/05-auth/05-auth-UAT.md")).unwrap();
    assert!(text.contains("- test: 3\n  name: \"Premium\"\n  expected: \"Upgrade prompt\"\n  reason: \"No premium account\""));
}

#[test]
fn uat_status_reports_pending_and_fixing() {
    let dir = planning_project();
    init_uat(&dir);
    ms(&dir)
        .args(["uat", "update", "5", "--test", "2", "result=issue", "fix_status=investigating", "retry_count=1"])
        .assert()
        .success();
    ms(&dir)
        .args(["uat", "update", "5", "--test", "3", "result=blocked"])
        .assert()
        .success();

    let out = ms(&dir).args(["uat", "status", "05"]).output().unwrap();
    let json = stdout_json(out);
    assert_eq!(json["status"], "testing");
    assert_eq!(json["total_batches"], 3);
    assert_eq!(json["pending_tests"], serde_json::json!([1]));
    assert_eq!(json["blocked_tests"], serde_json::json!([3]));
    assert_eq!(json["fixing_tests"][0]["num"], 2);
    assert_eq!(json["fixing_tests"][0]["retry_count"], 1);
    assert_eq!(json["progress"]["pending"], 2);
    assert_eq!(json["pre_work_stash"], serde_json::Value::Null);
}

#[test]
fn uat_status_missing_file_fails() {
    let dir = planning_project();
    ms(&dir)
        .args(["uat", "status", "5"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("UAT file not found"));
    ms(&dir)
        .args(["uat", "status", "9"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Phase directory not found for 09"));
}

#[test]
fn uat_without_planning_fails() {
    let dir = TempDir::new().unwrap();
    ms(&dir)
        .args(["uat", "status", "5"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("No .planning/ directory found"));
}

// ---------------------------------------------------------------------------
// phase lookups
// ---------------------------------------------------------------------------

#[test]
fn find_phase_reports_roadmap_match() {
    let dir = planning_project();
    let out = ms(&dir).args(["find-phase", "5"]).output().unwrap();
    let json = stdout_json(out);
    assert_eq!(json["phase"], "05");
    assert_eq!(json["dir"], ".planning/phases/05-auth");
    assert_eq!(json["name"], "auth");
    assert_eq!(json["exists_in_roadmap"], true);
}

#[test]
fn find_phase_without_planning_succeeds() {
    let dir = TempDir::new().unwrap();
    let out = ms(&dir).args(["find-phase", "3"]).output().unwrap();
    let json = stdout_json(out);
    assert_eq!(json["dir"], serde_json::Value::Null);
    assert_eq!(json["exists_in_roadmap"], false);
}

#[test]
fn list_and_check_artifacts() {
    let dir = planning_project();
    write(dir.path(), ".planning/phases/04-api/04-01-PLAN.md", "# plan\n");

    let out = ms(&dir).args(["list-artifacts", "4"]).output().unwrap();
    let json = stdout_json(out);
    assert_eq!(json["plans"], 1);
    assert_eq!(json["summaries"], 1);
    assert_eq!(json["has_uat"], false);

    let out = ms(&dir).args(["check-artifact", "4", "summary"]).output().unwrap();
    let json = stdout_json(out);
    assert_eq!(json["exists"], true);
    assert_eq!(json["path"], ".planning/phases/04-api/04-01-SUMMARY.md");

    ms(&dir)
        .args(["check-artifact", "4", "notes"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown artifact type: notes"));
}

#[test]
fn list_phases_in_range() {
    let dir = planning_project();
    std::fs::create_dir_all(dir.path().join(".planning/phases/02.1-hotfix")).unwrap();
    ms(&dir)
        .args(["list-phases", "--from", "2", "--to", "4"])
        .assert()
        .success()
        .stdout(".planning/phases/02-db\n.planning/phases/02.1-hotfix\n.planning/phases/04-api\n");

    ms(&dir)
        .args(["list-phases", "--from", "5", "--to", "2"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Start phase (5) cannot exceed end phase (2)"));
}

#[test]
fn subsystems_values_and_unknowns() {
    let dir = planning_project();
    ms(&dir)
        .args(["subsystems", "--values-only"])
        .assert()
        .success()
        .stdout(predicate::str::contains("=== Phase SUMMARYs ===\ninfra\ndb\napi\n=== Adhoc SUMMARYs ==="))
        .stdout(predicate::str::contains("=== Not in config.json subsystems ===\ninfra\n"));
}
