//! 自動送りスケジューラ
//!
//! 有効時は `1000 / レート` ミリ秒周期でtickを返す。レビューループの
//! `select!` から1イベント源として扱われ、手動操作と同じ
//! `advance(1)` を同一スレッド上で順番に実行する。独立スレッドは持たない。

use crate::error::{Result, TriageError};
use std::time::Duration;
use tokio::time::{self, Instant, Interval, MissedTickBehavior};

pub const MIN_RATE: u32 = 1;
pub const MAX_RATE: u32 = 10;

/// 自動送りの状態。interval を持っているときだけ有効
#[derive(Debug)]
pub struct AutoAdvance {
    rate: u32,
    interval: Option<Interval>,
}

impl AutoAdvance {
    /// 無効状態で作る。レートは次の有効化時に使う
    pub fn new(rate: u32) -> Result<Self> {
        validate_rate(rate)?;
        Ok(Self { rate, interval: None })
    }

    pub fn enabled(&self) -> bool {
        self.interval.is_some()
    }

    pub fn rate(&self) -> u32 {
        self.rate
    }

    /// 有効/無効を反転する。無効化は保留中のtickも破棄する
    pub fn toggle(&mut self) -> bool {
        if self.interval.is_some() {
            self.interval = None;
        } else {
            self.interval = Some(make_interval(self.rate));
        }
        self.enabled()
    }

    /// レートを変更する。有効中なら新周期で組み直す（有効のまま）
    pub fn set_rate(&mut self, rate: u32) -> Result<()> {
        validate_rate(rate)?;
        self.rate = rate;
        if self.interval.is_some() {
            self.interval = Some(make_interval(rate));
        }
        Ok(())
    }

    /// 次のtickを待つ。無効なら永遠に完了しない
    ///
    /// `select!` の1分岐として使う前提。キャンセルセーフ。
    pub async fn tick(&mut self) {
        match self.interval.as_mut() {
            Some(interval) => {
                interval.tick().await;
            }
            None => std::future::pending::<()>().await,
        }
    }
}

fn validate_rate(rate: u32) -> Result<()> {
    if !(MIN_RATE..=MAX_RATE).contains(&rate) {
        return Err(TriageError::Input(format!(
            "レートは{}〜{}で指定してください（{}）",
            MIN_RATE, MAX_RATE, rate
        )));
    }
    Ok(())
}

fn make_interval(rate: u32) -> Interval {
    let period = Duration::from_millis(1000 / rate as u64);
    // 最初のtickも1周期後に（即時発火させない）
    let mut interval = time::interval_at(Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    interval
}
