#![allow(deprecated)]

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

fn cmd(temp: &TempDir) -> Command {
    let mut c = Command::cargo_bin("zettel").unwrap();
    c.env("ZETTELTWEET_BACKEND", "file")
        .env("ZETTELTWEET_DATA_PATH", temp.path().join("data"))
        .env_remove("ZETTELTWEET_SEED")
        .env_remove("ZETTELTWEET_LOG_DIR")
        .env_remove("ZETTELTWEET_LOG_LEVEL");
    c
}

fn stdout_of(c: &mut Command) -> String {
    let output = c.assert().success().get_output().stdout.clone();
    String::from_utf8(output).unwrap()
}

/// Second whitespace-separated word of the first line, e.g. the id in
/// `created note-...`.
fn reported_id(text: &str) -> String {
    text.split_whitespace().nth(1).unwrap().to_string()
}

#[test]
fn help_is_printed_without_arguments() {
    let temp = TempDir::new().unwrap();
    cmd(&temp)
        .assert()
        .success()
        .stdout(predicate::str::contains("zettel reply <parent-id>"));
}

#[test]
fn first_run_seeds_and_lists_newest_first() {
    let temp = TempDir::new().unwrap();
    let listing = stdout_of(cmd(&temp).arg("list"));
    let first = listing.lines().next().unwrap();
    assert!(first.starts_with("9  2023-05-21 10:25"), "{first}");
    assert_eq!(listing.lines().count(), 9);
    assert!(temp.path().join("data").join("zetteltweet-notes.json").exists());
}

#[test]
fn seeding_can_be_disabled() {
    let temp = TempDir::new().unwrap();
    cmd(&temp)
        .env("ZETTELTWEET_SEED", "0")
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::diff("no notes\n"));
}

#[test]
fn new_note_is_found_by_tag_and_search() {
    let temp = TempDir::new().unwrap();
    let created = stdout_of(cmd(&temp).args(["new", "hello #x", "-t", "x"]));
    let id = reported_id(&created);
    assert!(id.starts_with("note-"));

    cmd(&temp)
        .args(["tag", "#x"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with(id.clone()));
    cmd(&temp)
        .args(["search", "HELLO"])
        .assert()
        .success()
        .stdout(predicate::str::contains(id));
}

#[test]
fn reply_threads_an_unthreaded_note() {
    let temp = TempDir::new().unwrap();
    let replied = stdout_of(cmd(&temp).args(["reply", "2", "adding to this"]));
    assert!(replied.contains("at position 1"), "{replied}");
    let thread_id = replied.split_whitespace().nth(4).unwrap().to_string();

    cmd(&temp)
        .args(["thread", &thread_id])
        .assert()
        .success()
        .stdout(predicate::str::contains("2 notes"))
        .stdout(predicate::str::contains("[0] 2"));
}

#[test]
fn delete_with_replies_fails_with_error_prefix() {
    let temp = TempDir::new().unwrap();
    cmd(&temp)
        .args(["delete", "8"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::starts_with("error: "));

    cmd(&temp).args(["delete", "9"]).assert().success();
    cmd(&temp)
        .args(["threads"])
        .assert()
        .success()
        .stdout(predicate::str::contains("thread1  3 notes"));
}

#[test]
fn edit_replaces_content() {
    let temp = TempDir::new().unwrap();
    cmd(&temp)
        .args(["edit", "4", "--content", "revised research plan"])
        .assert()
        .success()
        .stdout(predicate::str::diff("updated 4\n"));
    cmd(&temp)
        .args(["show", "4"])
        .assert()
        .success()
        .stdout(predicate::str::contains("revised research plan"));
}

#[test]
fn export_then_import_restores_data() {
    let temp = TempDir::new().unwrap();
    let backups = temp.path().join("backups");
    let exported = stdout_of(cmd(&temp).args(["export", backups.to_str().unwrap()]));
    assert!(exported.contains("zetteltweet-backup-"));

    let file = fs::read_dir(&backups)
        .unwrap()
        .next()
        .unwrap()
        .unwrap()
        .path();

    cmd(&temp).arg("clear").assert().success();
    cmd(&temp)
        .env("ZETTELTWEET_SEED", "false")
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::diff("no notes\n"));

    cmd(&temp)
        .args(["import", file.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::diff("imported 9 notes and 1 threads\n"));
}

#[test]
fn invalid_import_and_unknown_command_fail() {
    let temp = TempDir::new().unwrap();
    let bogus = temp.path().join("bogus.json");
    fs::write(&bogus, "{ nope").unwrap();

    cmd(&temp)
        .args(["import", bogus.to_str().unwrap()])
        .assert()
        .failure()
        .stderr(predicate::str::contains("corrupt data"));
    cmd(&temp)
        .arg("frobnicate")
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown command"));
}

#[test]
fn usage_reports_backend_and_quota() {
    let temp = TempDir::new().unwrap();
    cmd(&temp)
        .arg("usage")
        .assert()
        .success()
        .stdout(predicate::str::contains("backend file:"))
        .stdout(predicate::str::contains("of 5120 KB used"));
}
