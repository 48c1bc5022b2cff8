use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "cand-triage")]
#[command(about = "電波トランジェント候補プロットの対話式分類ツール", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// 詳細ログを出力
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// 候補ディレクトリを対話的にレビュー
    Review {
        /// 候補プロットのディレクトリ
        #[arg(required = true)]
        directory: PathBuf,

        /// 分類ファイル名（ディレクトリ内に作成。デフォルト: classification.csv）
        #[arg(short, long)]
        output: Option<String>,

        /// プロットの拡張子（デフォルト: png）
        #[arg(short, long)]
        extension: Option<String>,

        /// ファイル名解析に失敗したら全体を中断（デフォルトは警告してスキップ）
        #[arg(long)]
        strict: bool,

        /// 自動送りレート（1秒あたり、1〜10）
        #[arg(short, long)]
        rate: Option<u32>,

        /// 外部画像ビューアのコマンド（候補の切り替えごとに起動）
        #[arg(long)]
        viewer: Option<String>,

        /// 既存の分類ファイルがあっても確認せず新規に始める
        #[arg(long)]
        fresh: bool,
    },

    /// 分類結果の統計を表示
    Stats {
        /// 候補プロットのディレクトリ
        #[arg(required = true)]
        directory: PathBuf,

        /// 分類ファイル名（デフォルト: classification.csv）
        #[arg(short, long)]
        output: Option<String>,

        /// プロットの拡張子（デフォルト: png）
        #[arg(short, long)]
        extension: Option<String>,
    },

    /// 設定を表示/編集
    Config {
        /// 既定の拡張子を設定
        #[arg(long)]
        set_extension: Option<String>,

        /// 既定の自動送りレートを設定（1〜10）
        #[arg(long)]
        set_rate: Option<u32>,

        /// スキップ移動の歩幅を設定
        #[arg(long)]
        set_skip_step: Option<usize>,

        /// 解析失敗の扱いを設定 (strict/skip)
        #[arg(long)]
        set_parse_policy: Option<ParsePolicyArg>,

        /// 設定を表示
        #[arg(long)]
        show: bool,
    },
}

/// --set-parse-policy の引数
#[derive(Clone, Copy, Debug)]
pub enum ParsePolicyArg {
    Strict,
    Skip,
}

impl std::str::FromStr for ParsePolicyArg {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "strict" => Ok(ParsePolicyArg::Strict),
            "skip" | "skip-and-warn" => Ok(ParsePolicyArg::Skip),
            _ => Err(format!("不明なポリシー: {}（strict / skip）", s)),
        }
    }
}

impl From<ParsePolicyArg> for crate::catalog::ParsePolicy {
    fn from(arg: ParsePolicyArg) -> Self {
        match arg {
            ParsePolicyArg::Strict => crate::catalog::ParsePolicy::Strict,
            ParsePolicyArg::Skip => crate::catalog::ParsePolicy::SkipAndWarn,
        }
    }
}
