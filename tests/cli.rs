use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::tempdir;

fn noteweave() -> Command {
    Command::cargo_bin("noteweave").unwrap()
}

#[test]
fn test_cli_help() {
    noteweave().arg("--help").assert().success();
}

#[test]
fn test_cli_version() {
    noteweave()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("noteweave"));
}

#[test]
fn test_init_creates_category_folders() {
    let dir = tempdir().unwrap();
    let notes_dir = dir.path().join("notes");

    noteweave()
        .args(["--notes-dir"])
        .arg(&notes_dir)
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("initialized"));

    assert!(notes_dir.join("quick-notes").is_dir());
}

#[test]
fn test_add_then_sync_then_stats() {
    let dir = tempdir().unwrap();
    let notes_dir = dir.path().join("notes");

    noteweave()
        .args(["--notes-dir"])
        .arg(&notes_dir)
        .arg("add")
        .args(["My First Note", "Some body text about rust."])
        .assert()
        .success()
        .stdout(predicate::str::contains("created note"));

    noteweave()
        .args(["--notes-dir"])
        .arg(&notes_dir)
        .arg("sync")
        .assert()
        .success()
        .stdout(predicate::str::contains("sync complete"));

    noteweave()
        .args(["--notes-dir"])
        .arg(&notes_dir)
        .arg("stats")
        .assert()
        .success()
        .stdout(predicate::str::contains("1 nodes"));
}

#[test]
fn test_search_semantic_json_output() {
    let dir = tempdir().unwrap();
    let notes_dir = dir.path().join("notes");

    noteweave()
        .args(["--notes-dir"])
        .arg(&notes_dir)
        .arg("add")
        .args(["Rust Ownership", "Ownership and borrowing are core to rust."])
        .assert()
        .success();

    noteweave()
        .args(["--notes-dir"])
        .arg(&notes_dir)
        .arg("sync")
        .assert()
        .success();

    noteweave()
        .args(["--json", "--notes-dir"])
        .arg(&notes_dir)
        .arg("search-semantic")
        .arg("ownership")
        .assert()
        .success()
        .stdout(predicate::str::contains("\"similarity\""));
}

#[test]
fn test_decide_create_for_novel_content() {
    noteweave()
        .arg("decide")
        .arg("Completely novel content about something nobody has written before.")
        .assert()
        .success()
        .stdout(predicate::str::contains("Create"));
}

#[test]
fn test_orphans_on_empty_kb() {
    let dir = tempdir().unwrap();
    let notes_dir = dir.path().join("notes");
    fs::create_dir_all(&notes_dir).unwrap();

    noteweave()
        .args(["--notes-dir"])
        .arg(&notes_dir)
        .arg("orphans")
        .assert()
        .success();
}

#[test]
fn test_update_nonexistent_note_fails() {
    let dir = tempdir().unwrap();
    let notes_dir = dir.path().join("notes");
    fs::create_dir_all(&notes_dir).unwrap();

    noteweave()
        .args(["--notes-dir"])
        .arg(&notes_dir)
        .arg("update")
        .arg(notes_dir.join("missing.md"))
        .arg("some text")
        .assert()
        .failure();
}
