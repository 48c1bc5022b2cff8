//! 対話式レビューループ
//!
//! 標準入力の1行コマンドと自動送りタイマーを `select!` で多重化し、
//! 単一スレッドの逐次実行でセッションを更新する。タイマーも手動操作と
//! 同じ `advance(1)` を通るため、カーソル不変条件は1か所に集まる。
//!
//! ## 操作
//! - a: RFI / d: 候補 / k: 既知 （分類して次へ）
//! - z / x: 前へ / 次へ、Z / X: まとめて移動
//! - home / end / g <番号>: ジャンプ
//! - f <dm|mjd> <下限> <上限>: 範囲フィルタ（半開区間、未処理分のみ）
//! - t: 自動送り切替、t <n>: レート変更
//! - s: 統計 / h: ヘルプ / q: 終了

use crate::catalog;
use crate::config::Config;
use crate::error::{Result, TriageError};
use crate::session::{Assignment, FilterParam, ReviewSession};
use crate::stats;
use crate::store::{Label, LabelStore};
use crate::ticker::AutoAdvance;
use dialoguer::Confirm;
use std::path::PathBuf;
use tokio::io::{AsyncBufReadExt, BufReader};

/// `review` サブコマンドの実行条件（CLIと設定から解決済み）
#[derive(Debug)]
pub struct ReviewOptions {
    pub directory: PathBuf,
    pub output: String,
    pub extension: String,
    pub policy: catalog::ParsePolicy,
    pub rate: u32,
    pub skip_step: usize,
    pub viewer: Option<String>,
    pub fresh: bool,
    pub verbose: bool,
}

impl ReviewOptions {
    pub fn from_config(directory: PathBuf, config: &Config) -> Self {
        Self {
            directory,
            output: config.output_file.clone(),
            extension: config.extension.clone(),
            policy: config.parse_policy,
            rate: config.auto_advance_rate,
            skip_step: config.skip_step,
            viewer: None,
            fresh: false,
            verbose: false,
        }
    }
}

/// 1行コマンドの解釈結果
#[derive(Debug, PartialEq)]
pub enum ReviewCommand {
    Assign(Label),
    Advance(i64),
    JumpStart,
    JumpEnd,
    /// 1始まりの表示番号
    Jump(usize),
    Filter(FilterParam, f64, f64),
    ToggleAuto,
    SetRate(u32),
    Stats,
    Help,
    Quit,
    Noop,
}

/// 1行をコマンドに解釈する。境界値などの不正入力は状態を変える前に弾く
pub fn parse_command(line: &str, skip_step: usize) -> Result<ReviewCommand> {
    let tokens: Vec<&str> = line.split_whitespace().collect();

    match tokens.as_slice() {
        [] => Ok(ReviewCommand::Noop),
        ["a"] => Ok(ReviewCommand::Assign(Label::Rfi)),
        ["d"] => Ok(ReviewCommand::Assign(Label::Candidate)),
        ["k"] => Ok(ReviewCommand::Assign(Label::Known)),
        ["z"] => Ok(ReviewCommand::Advance(-1)),
        ["x"] => Ok(ReviewCommand::Advance(1)),
        ["Z"] => Ok(ReviewCommand::Advance(-(skip_step as i64))),
        ["X"] => Ok(ReviewCommand::Advance(skip_step as i64)),
        ["home"] => Ok(ReviewCommand::JumpStart),
        ["end"] => Ok(ReviewCommand::JumpEnd),
        ["g", number] => {
            let number: usize = number
                .parse()
                .map_err(|_| TriageError::Input(format!("番号が数値ではありません: {}", number)))?;
            Ok(ReviewCommand::Jump(number))
        }
        ["f", param, lower, upper] => {
            let param: FilterParam = param
                .parse()
                .map_err(TriageError::Input)?;
            let lower = ReviewSession::parse_bound(lower)?;
            let upper = ReviewSession::parse_bound(upper)?;
            Ok(ReviewCommand::Filter(param, lower, upper))
        }
        ["t"] => Ok(ReviewCommand::ToggleAuto),
        ["t", rate] => {
            let rate: u32 = rate
                .parse()
                .map_err(|_| TriageError::Input(format!("レートが数値ではありません: {}", rate)))?;
            Ok(ReviewCommand::SetRate(rate))
        }
        ["s"] => Ok(ReviewCommand::Stats),
        ["h"] | ["?"] => Ok(ReviewCommand::Help),
        ["q"] => Ok(ReviewCommand::Quit),
        _ => Err(TriageError::Input(format!("不明なコマンド: {}（h でヘルプ）", line.trim()))),
    }
}

/// `review` サブコマンド本体
pub async fn run_review(opts: ReviewOptions) -> Result<()> {
    println!("🔭 cand-triage - 候補レビュー\n");

    let catalog = catalog::scan_directory(&opts.directory, &opts.extension, opts.policy)?;
    println!("✔ {}件の候補を検出", catalog.len());
    if opts.verbose {
        println!("  拡張子: {} / 解析ポリシー: {:?}", opts.extension, opts.policy);
    }

    let store = LabelStore::new(opts.directory.join(&opts.output));
    let mut session = ReviewSession::new(catalog, store);

    // 既存ファイルの再開確認
    if session.store().exists() {
        let scanned = session.store().scan()?;
        for key in &scanned.duplicates {
            eprintln!("⚠ 分類ファイル内でキーが重複しています（後勝ちで解決）: {}", key);
        }

        if scanned.rows > 0 {
            let load = if opts.fresh {
                false
            } else {
                Confirm::new()
                    .with_prompt(format!(
                        "分類ファイル {} には既に{}行あります。読み込んで続きから始めますか？",
                        opts.output, scanned.rows
                    ))
                    .default(true)
                    .interact()
                    .map_err(|e| TriageError::Prompt(e.to_string()))?
            };

            if load {
                session.resume_from(scanned);
                println!("✔ {}件の分類を読み込みました", session.counts().rfi + session.counts().candidate + session.counts().known);
            } else {
                session.store().truncate()?;
                println!("✔ 新規セッションとして開始します");
            }
        }
    }

    if session.is_empty() {
        println!("候補がありません");
        return Ok(());
    }

    println!("開始: {}\n", chrono::Local::now().format("%Y-%m-%d %H:%M:%S"));
    print_help(opts.skip_step);

    let mut auto = AutoAdvance::new(opts.rate)?;
    show_current(&session, opts.viewer.as_deref());

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else {
                    break;  // EOF
                };
                match parse_command(&line, opts.skip_step) {
                    Ok(command) => {
                        if !handle_command(command, &mut session, &mut auto, &opts) {
                            break;
                        }
                    }
                    Err(e) => eprintln!("⚠ {}", e),
                }
            }
            _ = auto.tick() => {
                // 末尾ではクランプされるだけ。同じ候補を出し続けない
                let before = session.cursor();
                if session.advance(1) != before {
                    show_current(&session, opts.viewer.as_deref());
                }
            }
        }
    }

    println!("\n📊 セッション結果");
    stats::print_counts(session.counts(), session.removed_total());
    println!("✅ 保存先: {}", session.store().path().display());
    Ok(())
}

/// コマンドを1つ実行する。戻り値はループ継続かどうか
fn handle_command(
    command: ReviewCommand,
    session: &mut ReviewSession,
    auto: &mut AutoAdvance,
    opts: &ReviewOptions,
) -> bool {
    match command {
        ReviewCommand::Assign(label) => match session.assign(label) {
            Ok(Assignment::NoCandidate) => println!("候補がありません"),
            Ok(outcome) => {
                if opts.verbose {
                    match outcome {
                        Assignment::Added => println!("  → {} として記録", label),
                        Assignment::Replaced(previous) => println!("  → {} から {} に変更", previous, label),
                        Assignment::Unchanged => println!("  → 変更なし"),
                        Assignment::NoCandidate => unreachable!(),
                    }
                }
                stats::print_counts(session.counts(), session.removed_total());
                show_current(session, opts.viewer.as_deref());
            }
            // 保存に失敗した候補は未分類のまま。そのまま再試行できる
            Err(e) => eprintln!("⚠ 分類を保存できませんでした（候補は未分類のまま）: {}", e),
        },
        ReviewCommand::Advance(delta) => {
            session.advance(delta);
            show_current(session, opts.viewer.as_deref());
        }
        ReviewCommand::JumpStart => {
            session.jump_to(0);
            show_current(session, opts.viewer.as_deref());
        }
        ReviewCommand::JumpEnd => {
            if !session.is_empty() {
                session.jump_to(session.len() - 1);
            }
            show_current(session, opts.viewer.as_deref());
        }
        ReviewCommand::Jump(number) => {
            // 1始まりの表示番号。範囲外は状態を変えずに拒否
            if number == 0 || number > session.len() {
                eprintln!("⚠ 番号は1〜{}で指定してください（{}）", session.len(), number);
            } else {
                session.jump_to(number - 1);
                show_current(session, opts.viewer.as_deref());
            }
        }
        ReviewCommand::Filter(param, lower, upper) => {
            let removed = session.apply_filter(param, lower, upper);
            println!("✔ {}件を除外（残り{}件）", removed, session.len());
            show_current(session, opts.viewer.as_deref());
        }
        ReviewCommand::ToggleAuto => {
            if auto.toggle() {
                println!("自動送り: 有効（{}/秒）", auto.rate());
            } else {
                println!("自動送り: 無効");
            }
        }
        ReviewCommand::SetRate(rate) => match auto.set_rate(rate) {
            Ok(()) => println!(
                "自動送りレート: {}/秒（{}）",
                auto.rate(),
                if auto.enabled() { "有効" } else { "無効" }
            ),
            Err(e) => eprintln!("⚠ {}", e),
        },
        ReviewCommand::Stats => {
            stats::print_counts(session.counts(), session.removed_total());
            println!(
                "自動送り: {}（{}/秒）",
                if auto.enabled() { "有効" } else { "無効" },
                auto.rate()
            );
        }
        ReviewCommand::Help => print_help(opts.skip_step),
        ReviewCommand::Quit => return false,
        ReviewCommand::Noop => {}
    }
    true
}

/// 表示中の候補を1行で出し、指定があれば外部ビューアを起動する
fn show_current(session: &ReviewSession, viewer: Option<&str>) {
    let Some(record) = session.current() else {
        println!("候補がありません");
        return;
    };

    let label = session
        .label_of(&record.key)
        .map(|l| format!(" [{}]", l))
        .unwrap_or_default();

    println!(
        "[{} / {}] {}{}  (MJD {:.4} / DM {:.2})",
        session.cursor() + 1,
        session.len(),
        record.key,
        label,
        record.mjd,
        record.dm
    );

    if let Some(command) = viewer {
        if let Err(e) = tokio::process::Command::new(command).arg(&record.path).spawn() {
            eprintln!("⚠ ビューア起動に失敗: {}", e);
        }
    }
}

fn print_help(skip_step: usize) {
    println!("操作:");
    println!("  a: RFI / d: 候補 / k: 既知（分類して次へ）");
    println!("  z / x: 前へ / 次へ、Z / X: {}件まとめて移動", skip_step);
    println!("  home / end / g <番号>: ジャンプ");
    println!("  f <dm|mjd> <下限> <上限>: 範囲フィルタ（未処理分のみ、上限は含まない）");
    println!("  t: 自動送り切替 / t <n>: レート変更（1〜10）");
    println!("  s: 統計 / h: ヘルプ / q: 終了\n");
}
