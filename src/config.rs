use crate::catalog::ParsePolicy;
use crate::error::{Result, TriageError};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// プロットの拡張子
    pub extension: String,
    /// 分類ファイル名
    pub output_file: String,
    /// 自動送りの既定レート（1秒あたり、1〜10）
    pub auto_advance_rate: u32,
    /// スキップ移動（Z/X）の歩幅
    pub skip_step: usize,
    /// ファイル名解析失敗時の扱い
    pub parse_policy: ParsePolicy,
}

impl Config {
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let config: Config = serde_json::from_str(&content)?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path()?;

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(&config_path, content)?;
        Ok(())
    }

    pub fn config_path() -> Result<PathBuf> {
        let home = dirs::home_dir()
            .ok_or_else(|| TriageError::Config("ホームディレクトリが見つかりません".into()))?;
        Ok(home.join(".config").join("cand-triage").join("config.json"))
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            extension: "png".into(),
            output_file: "classification.csv".into(),
            auto_advance_rate: 2,
            skip_step: 5,  // 元ツールのPgUp/PgDownと同じ歩幅
            parse_policy: ParsePolicy::SkipAndWarn,
        }
    }
}
