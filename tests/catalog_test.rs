//! カタログ構築のテスト
//!
//! 2種類の命名規約と解析ポリシー、空ディレクトリの扱いを検証

use cand_triage_rust::catalog::{parse_file_name, scan_directory, ParsePolicy};
use cand_triage_rust::error::TriageError;
use std::fs::File;
use tempfile::tempdir;

/// 新旧の命名規約が混在していても構築できる
#[test]
fn test_mixed_naming_conventions() {
    let dir = tempdir().expect("Failed to create temp dir");
    File::create(dir.path().join("59000.5_beam1_120.0_snr9.png")).unwrap();
    File::create(dir.path().join("mjd_59001.5_beam1_240.0_snr9.png")).unwrap();

    let records = scan_directory(dir.path(), "png", ParsePolicy::Strict).unwrap();
    assert_eq!(records.len(), 2);

    let modern = records.iter().find(|r| r.key.starts_with("59000")).unwrap();
    assert_eq!(modern.mjd, 59000.5);
    assert_eq!(modern.dm, 120.0);

    let legacy = records.iter().find(|r| r.key.starts_with("mjd_")).unwrap();
    assert_eq!(legacy.mjd, 59001.5);
    assert_eq!(legacy.dm, 240.0);
}

/// どちらの規約にも合致しない名前は推測せずエラー
#[test]
fn test_unparseable_name_is_error() {
    assert!(matches!(parse_file_name("mjd_notanumber_x_1.0_y.png"), Err(TriageError::Parse(_))));
    assert!(matches!(parse_file_name("justone.png"), Err(TriageError::Parse(_))));
}

/// strictポリシーは1件の失敗で全体を中断する
#[test]
fn test_strict_policy_aborts_build() {
    let dir = tempdir().expect("Failed to create temp dir");
    File::create(dir.path().join("59000.5_beam1_120.0_snr9.png")).unwrap();
    File::create(dir.path().join("malformed.png")).unwrap();

    assert!(scan_directory(dir.path(), "png", ParsePolicy::Strict).is_err());
}

/// skipポリシーは失敗したファイルだけ除いて続行する
#[test]
fn test_skip_policy_continues() {
    let dir = tempdir().expect("Failed to create temp dir");
    File::create(dir.path().join("59000.5_beam1_120.0_snr9.png")).unwrap();
    File::create(dir.path().join("malformed.png")).unwrap();

    let records = scan_directory(dir.path(), "png", ParsePolicy::SkipAndWarn).unwrap();
    assert_eq!(records.len(), 1);
}

/// 対象拡張子以外のファイルは無視される
#[test]
fn test_extension_filter() {
    let dir = tempdir().expect("Failed to create temp dir");
    File::create(dir.path().join("59000.5_beam1_120.0_snr9.png")).unwrap();
    File::create(dir.path().join("59000.5_beam1_120.0_snr9.jpg")).unwrap();
    File::create(dir.path().join("classification.csv")).unwrap();

    let records = scan_directory(dir.path(), "png", ParsePolicy::Strict).unwrap();
    assert_eq!(records.len(), 1);

    let records = scan_directory(dir.path(), "jpg", ParsePolicy::Strict).unwrap();
    assert_eq!(records.len(), 1);
}

/// 空カタログは正常（エラーではない）
#[test]
fn test_empty_directory_is_valid() {
    let dir = tempdir().expect("Failed to create temp dir");
    let records = scan_directory(dir.path(), "png", ParsePolicy::Strict).unwrap();
    assert!(records.is_empty());
}

/// 存在しないディレクトリはエラー
#[test]
fn test_missing_directory() {
    let result = scan_directory(std::path::Path::new("/nonexistent/dir/12345"), "png", ParsePolicy::Strict);
    assert!(matches!(result, Err(TriageError::DirectoryNotFound(_))));
}
