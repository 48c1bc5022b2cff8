//! 候補カタログ構築モジュール
//!
//! 検出パイプラインが出力したプロット画像のディレクトリを走査し、
//! ファイル名に符号化された物理パラメータ（MJD・DM）を読み取って
//! 時刻順の候補カタログを作る。

use crate::error::{Result, TriageError};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// ファイル名の先頭に付く旧形式マーカー
const LEGACY_PREFIX: &str = "mjd";

/// カタログの1エントリ。構築後は不変。
#[derive(Debug, Clone)]
pub struct CandidateRecord {
    /// プロット画像のフルパス
    pub path: PathBuf,
    /// ベースファイル名。セッション内で一意な分類キー
    pub key: String,
    /// MJD（修正ユリウス日）
    pub mjd: f64,
    /// DM（分散量度）
    pub dm: f64,
    /// カタログ内の位置（パス昇順）
    pub index: usize,
}

/// ファイル名解析に失敗したときの扱い
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParsePolicy {
    /// 1件でも失敗したらカタログ構築を中断
    Strict,
    /// 警告を出してそのファイルをスキップ
    #[default]
    SkipAndWarn,
}

/// ベースファイル名からMJDとDMを取り出す
///
/// 命名規約は `<mjd>_<...>_<dm>_<...>.<ext>`。先頭トークンが `mjd` の
/// 旧形式では各フィールドが1つ右にずれる。どちらの規約にも合致しない
/// 名前は推測せず解析エラーにする。
pub fn parse_file_name(base: &str) -> Result<(f64, f64)> {
    let fields: Vec<&str> = base.split('_').collect();

    let (mjd_pos, dm_pos) = if fields.first() == Some(&LEGACY_PREFIX) {
        (1, 3)
    } else {
        (0, 2)
    };

    if fields.len() <= dm_pos {
        return Err(TriageError::Parse(format!(
            "{}: フィールド数が不足しています（{}個）",
            base,
            fields.len()
        )));
    }

    let mjd: f64 = fields[mjd_pos].parse().map_err(|_| {
        TriageError::Parse(format!("{}: MJDが数値ではありません（{}）", base, fields[mjd_pos]))
    })?;
    let dm: f64 = fields[dm_pos].parse().map_err(|_| {
        TriageError::Parse(format!("{}: DMが数値ではありません（{}）", base, fields[dm_pos]))
    })?;

    Ok((mjd, dm))
}

/// ディレクトリを走査して候補カタログを構築する
///
/// 指定拡張子のファイルをパス昇順（命名規約により時刻順）に並べる。
/// キー重複はデータ異常としてポリシーに関係なくエラー。
pub fn scan_directory(directory: &Path, extension: &str, policy: ParsePolicy) -> Result<Vec<CandidateRecord>> {
    if !directory.is_dir() {
        return Err(TriageError::DirectoryNotFound(directory.display().to_string()));
    }

    let mut paths = Vec::new();

    for entry in WalkDir::new(directory)
        .max_depth(1)  // 直下のみ（再帰しない）
        .into_iter()
        .filter_map(|e| e.ok())
    {
        let path = entry.path();

        if !path.is_file() {
            continue;
        }

        if path.extension().map(|e| e.to_string_lossy() == extension).unwrap_or(false) {
            paths.push(path.to_path_buf());
        }
    }

    // パス順＝時刻順
    paths.sort();

    let mut records = Vec::new();
    let mut seen_keys = HashSet::new();

    for path in paths {
        let key = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();

        let (mjd, dm) = match parse_file_name(&key) {
            Ok(parsed) => parsed,
            Err(e) => match policy {
                ParsePolicy::Strict => return Err(e),
                ParsePolicy::SkipAndWarn => {
                    eprintln!("⚠ スキップ: {}", e);
                    continue;
                }
            },
        };

        if !seen_keys.insert(key.clone()) {
            return Err(TriageError::DuplicateKey(key));
        }

        records.push(CandidateRecord {
            path,
            key,
            mjd,
            dm,
            index: records.len(),
        });
    }

    Ok(records)
}
