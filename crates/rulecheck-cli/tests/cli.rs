//! Integration tests for the `rulecheck` binary.
//!
//! Each test builds a small project in a temp directory and runs the binary
//! in line-only mode, so no srcml installation is needed.

use assert_cmd::Command;
use predicates::str::contains;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

const TODO_RULE: &str = r#"pattern = 'TODO'
message = "TODO left in code"
"#;

const CONFIG: &str = r#"{
    "rules": [
        { "name": "team.todo" },
        { "name": "builtin.find_word", "settings": { "word": "goto" } }
    ]
}"#;

fn project() -> TempDir {
    let tmp = TempDir::new().unwrap();
    fs::create_dir_all(tmp.path().join("rules/team")).unwrap();
    fs::create_dir_all(tmp.path().join("src")).unwrap();
    fs::write(tmp.path().join("rules/team/todo.toml"), TODO_RULE).unwrap();
    fs::write(tmp.path().join("rulecheck.json"), CONFIG).unwrap();
    fs::write(tmp.path().join("src/a.c"), "int a;\n// TODO x\n").unwrap();
    tmp
}

fn rulecheck(dir: &Path) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_rulecheck"));
    cmd.current_dir(dir).env("RULECHECK_CONFIG_DIR", dir.join("no-global"));
    cmd
}

fn check(dir: &Path) -> Command {
    let mut cmd = rulecheck(dir);
    cmd.args(["check", "--no-srcml", "-r", "rules"]);
    cmd
}

// ── Reporting and exit codes ──

#[test]
fn warnings_exit_with_three() {
    let tmp = project();
    check(tmp.path())
        .arg("src/*.c")
        .assert()
        .code(3)
        .stdout(contains("src/a.c:2:4: WARNING: team.todo: TODO left in code"));
}

#[test]
fn werror_exits_with_two() {
    let tmp = project();
    check(tmp.path())
        .args(["--Werror", "src/*.c"])
        .assert()
        .code(2)
        .stdout(contains("ERROR: team.todo"));
}

#[test]
fn clean_sources_exit_with_zero() {
    let tmp = project();
    fs::write(tmp.path().join("src/a.c"), "int a;\n").unwrap();
    check(tmp.path()).arg("src/*.c").assert().code(0).stdout("");
}

#[test]
fn builtin_rules_load_from_config() {
    let tmp = project();
    fs::write(tmp.path().join("src/b.c"), "goto out;\n").unwrap();
    check(tmp.path())
        .arg("src/b.c")
        .assert()
        .code(3)
        .stdout(contains("src/b.c:1:1: WARNING: builtin.find_word"));
}

#[test]
fn sources_can_come_from_stdin() {
    let tmp = project();
    check(tmp.path())
        .arg("-")
        .write_stdin("src/a.c\n")
        .assert()
        .code(3)
        .stdout(contains("team.todo"));
}

#[test]
fn hashes_are_appended_on_request() {
    let tmp = project();
    let output = check(tmp.path()).args(["-g", "src/a.c"]).output().unwrap();
    let stdout = String::from_utf8(output.stdout).unwrap();
    let hash = stdout.trim_end().rsplit(": ").next().unwrap();
    assert_eq!(hash.len(), 32);
    assert!(hash.chars().all(|c| c.is_ascii_hexdigit()));
}

#[test]
fn json_output_carries_totals() {
    let tmp = project();
    let output = check(tmp.path())
        .args(["--format", "json", "src/a.c"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(3));
    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["violations"][0]["rule"], "team.todo");
    assert_eq!(report["summary"]["files_checked"], 1);
    assert_eq!(report["exit_code"], 3);
}

// ── Setup failures ──

#[test]
fn missing_srcml_exits_with_one() {
    let tmp = project();
    fs::create_dir_all(tmp.path().join("empty")).unwrap();
    rulecheck(tmp.path())
        .args(["check", "--srcml", "empty", "src/a.c"])
        .assert()
        .code(1)
        .stderr(contains("Could not locate srcml binary!"));
}

#[test]
fn missing_config_exits_with_one() {
    let tmp = project();
    fs::remove_file(tmp.path().join("rulecheck.json")).unwrap();
    check(tmp.path())
        .arg("src/a.c")
        .assert()
        .code(1)
        .stderr(contains("No rule-set config found"));
}

#[test]
fn unreadable_source_is_an_error_finding() {
    let tmp = project();
    check(tmp.path())
        .arg("-")
        .write_stdin("src/missing.c\n")
        .assert()
        .code(2)
        .stdout(contains(
            "src/missing.c: ERROR: rulecheck: Could not open file! See stderr.",
        ));
}

// ── Ignore lists ──

#[test]
fn generated_ignore_list_suppresses_and_follows_patches() {
    let tmp = project();
    check(tmp.path())
        .args(["--generate-ignore-file", "ignore.txt", "src/a.c"])
        .assert()
        .code(3);
    assert!(fs::read_to_string(tmp.path().join("ignore.txt"))
        .unwrap()
        .contains("src/a.c:2:4: WARNING: team.todo: TODO left in code"));

    check(tmp.path())
        .args(["-v", "-i", "ignore.txt", "src/a.c"])
        .assert()
        .code(0)
        .stdout(contains("Total Warnings (ignored): 0(1)"));

    fs::write(tmp.path().join("src/a.c"), "x\ny\nint a;\n// TODO x\n").unwrap();
    fs::write(
        tmp.path().join("change.diff"),
        "--- a/src/a.c\n+++ b/src/a.c\n@@ -1,1 +1,3 @@\n+x\n+y\n int a;\n",
    )
    .unwrap();
    check(tmp.path())
        .args(["-i", "ignore.txt", "src/a.c"])
        .assert()
        .code(3);

    rulecheck(tmp.path())
        .args(["update-ignores", "-i", "ignore.txt", "-p", "change.diff"])
        .assert()
        .success();
    check(tmp.path())
        .args(["-i", "ignore.txt", "src/a.c"])
        .assert()
        .code(0);
}

#[test]
fn patches_can_come_from_stdin_and_globs() {
    let tmp = project();
    check(tmp.path())
        .args(["--generate-ignore-file", "ignore.txt", "src/a.c"])
        .assert()
        .code(3);

    fs::write(tmp.path().join("src/a.c"), "y\nx\nint a;\n// TODO x\n").unwrap();
    fs::create_dir_all(tmp.path().join("diffs")).unwrap();
    fs::write(
        tmp.path().join("diffs/second.diff"),
        "--- a/src/a.c\n+++ b/src/a.c\n@@ -1,1 +1,2 @@\n+y\n x\n",
    )
    .unwrap();

    rulecheck(tmp.path())
        .args(["update-ignores", "-i", "ignore.txt", "-p", "-", "-p", "diffs/*.diff"])
        .write_stdin("--- a/src/a.c\n+++ b/src/a.c\n@@ -1,1 +1,2 @@\n+x\n int a;\n")
        .assert()
        .success();
    assert!(fs::read_to_string(tmp.path().join("ignore.txt"))
        .unwrap()
        .contains("src/a.c:4:4: WARNING: team.todo"));
    check(tmp.path())
        .args(["-i", "ignore.txt", "src/a.c"])
        .assert()
        .code(0);
}

#[test]
fn unmatched_patch_glob_exits_with_one() {
    let tmp = project();
    fs::write(tmp.path().join("ignore.txt"), "").unwrap();
    rulecheck(tmp.path())
        .args(["update-ignores", "-i", "ignore.txt", "-p", "diffs/*.diff"])
        .assert()
        .code(1)
        .stderr(contains("No patch files matched: diffs/*.diff"));
}

#[test]
fn missing_ignore_list_exits_with_one() {
    let tmp = project();
    check(tmp.path())
        .args(["-i", "nope.txt", "src/a.c"])
        .assert()
        .code(1)
        .stderr(contains("nope.txt"));
}

// ── Other commands ──

#[test]
fn list_rules_shows_builtins() {
    let tmp = project();
    rulecheck(tmp.path())
        .arg("list-rules")
        .assert()
        .success()
        .stdout(contains("builtin.find_word"))
        .stdout(contains("builtin.switch_cases"));
}
