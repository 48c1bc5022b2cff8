//! 分類ラベル永続化モジュール
//!
//! 候補キー→ラベルの対応をヘッダなしCSV（`キー,コード`）として保存する。
//! 追記は1行書いてフラッシュ、置換は一時ファイルに全行を書き直してから
//! rename で差し替える。置換中にクラッシュしても元ファイルは壊れない。

use crate::error::{Result, TriageError};
use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

/// 分類ラベル
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Label {
    /// 電波干渉
    Rfi,
    /// 新候補
    Candidate,
    /// 既知天体（2分類時代の旧ファイルには現れない）
    Known,
}

impl Label {
    /// CSVに書くコード値
    pub fn code(&self) -> u8 {
        match self {
            Label::Rfi => 0,
            Label::Candidate => 1,
            Label::Known => 2,
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Label::Rfi),
            1 => Some(Label::Candidate),
            2 => Some(Label::Known),
            _ => None,
        }
    }
}

impl std::fmt::Display for Label {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Label::Rfi => write!(f, "RFI"),
            Label::Candidate => write!(f, "候補"),
            Label::Known => write!(f, "既知"),
        }
    }
}

/// `scan()` の結果。再開時のカーソル決定に行数も使う
#[derive(Debug, Default)]
pub struct ScanResult {
    /// キー→ラベル（重複時は後勝ち）
    pub labels: HashMap<String, Label>,
    /// ファイル上の行数（重複込み）
    pub rows: usize,
    /// 重複していたキー（破損の報告用）
    pub duplicates: Vec<String>,
}

/// 分類ファイルを所有する永続ストア
#[derive(Debug)]
pub struct LabelStore {
    path: PathBuf,
}

impl LabelStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// ファイルを空にして新規セッションを始める
    pub fn truncate(&self) -> Result<()> {
        File::create(&self.path)?;
        Ok(())
    }

    /// 新しい行を追記する。書き込みは返る前にフラッシュ済み
    pub fn append(&self, key: &str, label: Label) -> Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;

        writeln!(file, "{},{}", key, label.code())?;
        file.flush()?;
        Ok(())
    }

    /// `key` の行だけラベルを書き換えて全体を差し替える
    ///
    /// 一時ファイルに全行を書き切ってから rename するため、途中で
    /// 失敗しても元ファイルは無傷のまま残り、そのまま再試行できる。
    pub fn replace(&self, key: &str, new_label: Label) -> Result<()> {
        let tmp_path = self.path.with_extension("csv.tmp");

        let result = self.write_replacement(&tmp_path, key, new_label);
        if result.is_err() {
            // 失敗した一時ファイルは残さない
            let _ = std::fs::remove_file(&tmp_path);
            return result;
        }

        std::fs::rename(&tmp_path, &self.path)?;
        Ok(())
    }

    fn write_replacement(&self, tmp_path: &Path, key: &str, new_label: Label) -> Result<()> {
        let input = File::open(&self.path)?;
        let mut output = BufWriter::new(File::create(tmp_path)?);

        for line in BufReader::new(input).lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            match line.split_once(',') {
                Some((row_key, _)) if row_key == key => {
                    writeln!(output, "{},{}", key, new_label.code())?;
                }
                _ => {
                    writeln!(output, "{}", line)?;
                }
            }
        }

        output.flush()?;
        Ok(())
    }

    /// 全行を読み込んでキー→ラベルを返す
    ///
    /// キー重複は破損として報告しつつ後勝ちで解決する（追記履歴の意味論）。
    /// ファイルが存在しない場合は空の結果。
    pub fn scan(&self) -> Result<ScanResult> {
        let mut result = ScanResult::default();

        if !self.path.exists() {
            return Ok(result);
        }

        let file = File::open(&self.path)?;
        for (line_no, line) in BufReader::new(file).lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }

            let (key, code_str) = line.split_once(',').ok_or_else(|| {
                TriageError::Corruption(format!("{}行目: 区切りがありません", line_no + 1))
            })?;

            let code: u8 = code_str.trim().parse().map_err(|_| {
                TriageError::Corruption(format!("{}行目: ラベルコードが不正です（{}）", line_no + 1, code_str))
            })?;

            let label = Label::from_code(code).ok_or_else(|| {
                TriageError::Corruption(format!("{}行目: 未知のラベルコード（{}）", line_no + 1, code))
            })?;

            if result.labels.insert(key.to_string(), label).is_some() {
                result.duplicates.push(key.to_string());
            }
            result.rows += 1;
        }

        Ok(result)
    }
}
