//! Corruption recovery tests for the onboard binary.
//!
//! These tests verify the system can handle:
//! - Corrupted progress files
//! - Records from older versions with missing fields
//! - Progress pointing at content that no longer exists
//! - Broken catalog documents

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn cli(data_dir: &Path) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("onboard"));
    cmd.env("XDG_CONFIG_HOME", data_dir.join("config"))
        .arg("--data-dir")
        .arg(data_dir);
    cmd
}

fn setup_test_dir() -> TempDir {
    tempfile::tempdir().expect("Failed to create temp dir")
}

fn write_progress(data_dir: &Path, user_id: &str, contents: &str) {
    let dir = data_dir.join("progress");
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join(format!("{}.json", user_id)), contents)
        .expect("Failed to write progress file");
}

#[test]
fn test_corrupted_progress_file() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path();

    write_progress(data_dir, "default", "{ invalid json }}}}");

    cli(data_dir)
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("Overall progress: 0%"));

    // The bad record is kept aside rather than overwritten
    let backup = data_dir.join("progress/default.json.corrupt");
    assert!(backup.exists());
    assert_eq!(fs::read_to_string(backup).unwrap(), "{ invalid json }}}}");
}

#[test]
fn test_learner_continues_after_corruption() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path();

    write_progress(data_dir, "default", "not json at all");

    cli(data_dir)
        .args(["complete", "mod-1", "lic-1-1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Lesson completed"));

    let contents = fs::read_to_string(data_dir.join("progress/default.json")).unwrap();
    let progress: serde_json::Value = serde_json::from_str(&contents).unwrap();
    assert_eq!(progress["completedLessonIds"][0], "lic-1-1");
}

#[test]
fn test_empty_progress_file() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path();

    write_progress(data_dir, "default", "");

    cli(data_dir)
        .arg("modules")
        .assert()
        .success()
        .stdout(predicate::str::is_match(r"\[mod-1\].*in_progress").unwrap());
}

#[test]
fn test_record_with_missing_fields() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path();

    // Older records carried neither quiz results nor position
    write_progress(
        data_dir,
        "default",
        r#"{"completedLessonIds": ["lic-1-1", "lic-1-2"], "studyMinutes": 25}"#,
    );

    cli(data_dir)
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("Lessons: 2 of 8"))
        .stdout(predicate::str::contains("Next lesson: mod-1 / lic-1-3"));

    assert!(!data_dir.join("progress/default.json.corrupt").exists());
}

#[test]
fn test_stale_content_ids_ignored() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path();

    write_progress(
        data_dir,
        "default",
        r#"{
  "completedLessonIds": ["retired-lesson", "lic-1-1"],
  "completedModuleIds": ["retired-module"],
  "quizResults": {
    "retired-quiz": {
      "quizId": "retired-quiz",
      "moduleId": "retired-module",
      "correctCount": 1,
      "totalCount": 1,
      "percent": 100,
      "completedAt": "2024-03-01T12:00:00Z"
    }
  }
}"#,
    );

    cli(data_dir)
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("Overall progress: 13%"))
        .stdout(predicate::str::contains("Modules: 0 of 3"));

    cli(data_dir)
        .arg("certificate")
        .assert()
        .success()
        .stdout(predicate::str::contains("Lessons: 1/8"))
        .stdout(predicate::str::contains("Quizzes: 0/3"));
}

#[test]
fn test_leftover_temp_files_ignored() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path();
    let progress_dir = data_dir.join("progress");
    fs::create_dir_all(&progress_dir).unwrap();

    // Simulate a crash between temp write and rename
    fs::write(progress_dir.join(".tmpABC123"), "{\"experience\": 999").unwrap();

    cli(data_dir)
        .args(["complete", "mod-1", "lic-1-1"])
        .assert()
        .success();

    cli(data_dir)
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("Experience: 10 xp"));
}

#[test]
fn test_corrupted_catalog_is_fatal() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path();
    let catalog_path = data_dir.join("catalog.json");
    fs::write(&catalog_path, "{ \"modules\": [ broken").unwrap();

    cli(data_dir)
        .arg("--catalog")
        .arg(&catalog_path)
        .arg("status")
        .assert()
        .failure();
}

#[test]
fn test_invalid_catalog_is_fatal() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path();
    let catalog_path = data_dir.join("catalog.json");

    // Orders skip 2, and the quiz points at a module that does not exist
    fs::write(
        &catalog_path,
        r#"{
  "modules": [
    {"id": "a", "order": 1, "title": "A", "lessons": []},
    {"id": "b", "order": 3, "title": "B", "lessons": []}
  ],
  "quizzes": [{"id": "q", "moduleId": "ghost", "questions": []}]
}"#,
    )
    .unwrap();

    cli(data_dir)
        .arg("--catalog")
        .arg(&catalog_path)
        .arg("modules")
        .assert()
        .failure()
        .stderr(predicate::str::contains("CatalogValidation"));
}

#[test]
fn test_missing_catalog_file() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path();

    cli(data_dir)
        .arg("--catalog")
        .arg(data_dir.join("nope.json"))
        .arg("status")
        .assert()
        .failure();
}

#[test]
fn test_invalid_config_is_fatal() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path();
    let config_dir = data_dir.join("config/onboard");
    fs::create_dir_all(&config_dir).unwrap();
    fs::write(config_dir.join("config.toml"), "[quiz]\nmax_attempts = 0\n").unwrap();

    cli(data_dir).arg("status").assert().failure();
}
