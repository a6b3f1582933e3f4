//! Unit tests for validation.rs module

use std::fs::File;

use mail_archive_etl::validation::{InputValidator, MAX_WORKERS};

#[test]
fn test_validate_input_dir_valid() {
    let dir = tempfile::tempdir().unwrap();
    assert!(InputValidator::validate_input_dir(dir.path()).is_ok());
}

#[test]
fn test_validate_input_dir_missing() {
    let dir = tempfile::tempdir().unwrap();
    assert!(InputValidator::validate_input_dir(&dir.path().join("nope")).is_err());
}

#[test]
fn test_validate_input_dir_is_file() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("a.eml");
    File::create(&file).unwrap();
    assert!(InputValidator::validate_input_dir(&file).is_err());
}

#[test]
fn test_validate_input_dir_empty_path() {
    assert!(InputValidator::validate_input_dir(std::path::Path::new("")).is_err());
}

#[test]
fn test_validate_worker_count_bounds() {
    assert!(InputValidator::validate_worker_count(0).is_err());
    assert!(InputValidator::validate_worker_count(1).is_ok());
    assert!(InputValidator::validate_worker_count(MAX_WORKERS).is_ok());
    assert!(InputValidator::validate_worker_count(MAX_WORKERS + 1).is_err());
}

#[test]
fn test_validate_table_name_valid() {
    assert!(InputValidator::validate_table_name("messages").is_ok());
    assert!(InputValidator::validate_table_name("_staging_2025").is_ok());
}

#[test]
fn test_validate_table_name_invalid() {
    assert!(InputValidator::validate_table_name("").is_err());
    assert!(InputValidator::validate_table_name("2025_messages").is_err());
    assert!(InputValidator::validate_table_name("messages; DROP TABLE x").is_err());
    assert!(InputValidator::validate_table_name("batch-control").is_err());
}

#[test]
fn test_validate_table_name_too_long() {
    let name = "t".repeat(65);
    assert!(InputValidator::validate_table_name(&name).is_err());
    assert!(InputValidator::validate_table_name(&name[..64]).is_ok());
}

#[test]
fn test_validate_extension() {
    assert!(InputValidator::validate_extension("eml").is_ok());
    assert!(InputValidator::validate_extension("EML").is_ok());
    assert!(InputValidator::validate_extension("").is_err());
    assert!(InputValidator::validate_extension(".eml").is_err());
    assert!(InputValidator::validate_extension("e ml").is_err());
}
