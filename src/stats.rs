//! 分類統計レポート
//!
//! 分類ファイルと候補ディレクトリから、区分別の件数とDM分布の
//! テキストヒストグラムを出力する。

use crate::catalog::{self, ParsePolicy};
use crate::error::{Result, TriageError};
use crate::session::LabelCounts;
use crate::store::{Label, LabelStore};
use std::path::Path;

const HISTOGRAM_BINS: usize = 10;
const HISTOGRAM_WIDTH: usize = 40;

/// 区分別の件数を1行で出す（レビューループと共用）
pub fn print_counts(counts: LabelCounts, removed: usize) {
    println!(
        "RFI: {}  候補: {}  既知: {}  （フィルタ除外: {}件）",
        counts.rfi, counts.candidate, counts.known, removed
    );
}

/// `stats` サブコマンド本体
pub fn run_stats(directory: &Path, output: &str, extension: &str) -> Result<()> {
    let store = LabelStore::new(directory.join(output));
    if !store.exists() {
        return Err(TriageError::StoreNotFound(store.path().display().to_string()));
    }

    let scanned = store.scan()?;
    for key in &scanned.duplicates {
        eprintln!("⚠ 分類ファイル内でキーが重複しています（後勝ちで解決）: {}", key);
    }

    println!("📊 分類統計  {}", chrono::Local::now().format("%Y-%m-%d %H:%M:%S"));
    println!("ファイル: {}（{}行）\n", store.path().display(), scanned.rows);

    // 区分別のDM値（キーから再解析。解析できないキーは警告してスキップ）
    let mut dm_rfi = Vec::new();
    let mut dm_candidate = Vec::new();
    let mut dm_known = Vec::new();

    for (key, label) in &scanned.labels {
        let (_, dm) = match catalog::parse_file_name(key) {
            Ok(parsed) => parsed,
            Err(e) => {
                eprintln!("⚠ スキップ: {}", e);
                continue;
            }
        };
        match label {
            Label::Rfi => dm_rfi.push(dm),
            Label::Candidate => dm_candidate.push(dm),
            Label::Known => dm_known.push(dm),
        }
    }

    let counts = LabelCounts {
        rfi: dm_rfi.len(),
        candidate: dm_candidate.len(),
        known: dm_known.len(),
    };
    print_counts(counts, 0);

    for (title, values) in [("RFI", &dm_rfi), ("候補", &dm_candidate), ("既知", &dm_known)] {
        if values.is_empty() {
            continue;
        }
        println!("\n■ {} のDM分布", title);
        for line in render_histogram(values, HISTOGRAM_BINS, HISTOGRAM_WIDTH) {
            println!("{}", line);
        }
    }

    // 全候補の分布（ディレクトリに残っているプロットから）
    let catalog = catalog::scan_directory(directory, extension, ParsePolicy::SkipAndWarn)?;
    if !catalog.is_empty() {
        let all_dm: Vec<f64> = catalog.iter().map(|r| r.dm).collect();
        println!("\n■ 全候補のDM分布（{}件）", all_dm.len());
        for line in render_histogram(&all_dm, HISTOGRAM_BINS, HISTOGRAM_WIDTH) {
            println!("{}", line);
        }
    }

    Ok(())
}

/// 等幅ビンのテキストヒストグラムを組み立てる
pub fn render_histogram(values: &[f64], bins: usize, width: usize) -> Vec<String> {
    if values.is_empty() || bins == 0 {
        return Vec::new();
    }

    let min = values.iter().cloned().fold(f64::INFINITY, f64::min);
    let max = values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);

    // 全部同じ値なら1ビンにまとめる
    if (max - min).abs() < f64::EPSILON {
        return vec![format!("  {:>10.1} 〜 {:<10.1} │{} {}", min, max, "█".repeat(width), values.len())];
    }

    let bin_width = (max - min) / bins as f64;
    let mut counts = vec![0usize; bins];
    for &v in values {
        let mut bin = ((v - min) / bin_width) as usize;
        if bin >= bins {
            bin = bins - 1;  // 最大値は最後のビンへ
        }
        counts[bin] += 1;
    }

    let peak = counts.iter().copied().max().unwrap_or(1).max(1);
    counts
        .iter()
        .enumerate()
        .map(|(i, &count)| {
            let lower = min + bin_width * i as f64;
            let upper = lower + bin_width;
            let bar = "█".repeat(count * width / peak);
            format!("  {:>10.1} 〜 {:<10.1} │{} {}", lower, upper, bar, count)
        })
        .collect()
}
