//! レビューセッション状態機械
//!
//! カタログとカーソル、ラベル区分のメモリ上ミラーを1か所で管理する。
//! 区分の更新は必ずストア書き込みの成功後に行う（write-then-update）。
//! 書き込みに失敗した候補は未分類のまま残り、再試行できる。

use crate::catalog::CandidateRecord;
use crate::error::{Result, TriageError};
use crate::store::{Label, LabelStore, ScanResult};
use std::collections::HashMap;

/// 区分ごとの件数。遷移成功のたびにUI層へ返す
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LabelCounts {
    pub rfi: usize,
    pub candidate: usize,
    pub known: usize,
}

impl LabelCounts {
    fn add(&mut self, label: Label) {
        match label {
            Label::Rfi => self.rfi += 1,
            Label::Candidate => self.candidate += 1,
            Label::Known => self.known += 1,
        }
    }

    fn remove(&mut self, label: Label) {
        match label {
            Label::Rfi => self.rfi -= 1,
            Label::Candidate => self.candidate -= 1,
            Label::Known => self.known -= 1,
        }
    }
}

/// `assign` の結果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Assignment {
    /// 未分類だった候補に追記した
    Added,
    /// 既存ラベルを置換した（旧ラベルを保持）
    Replaced(Label),
    /// 同じラベルの再押下。書き込みも件数変化もなし
    Unchanged,
    /// 表示中の候補がない（空カタログ）
    NoCandidate,
}

/// フィルタ対象のパラメータ
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterParam {
    Mjd,
    Dm,
}

impl FilterParam {
    fn value(&self, record: &CandidateRecord) -> f64 {
        match self {
            FilterParam::Mjd => record.mjd,
            FilterParam::Dm => record.dm,
        }
    }
}

impl std::str::FromStr for FilterParam {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "mjd" => Ok(FilterParam::Mjd),
            "dm" => Ok(FilterParam::Dm),
            _ => Err(format!("不明なパラメータ: {}（mjd / dm）", s)),
        }
    }
}

/// 1セッション分のレビュー状態
#[derive(Debug)]
pub struct ReviewSession {
    catalog: Vec<CandidateRecord>,
    cursor: usize,
    labels: HashMap<String, Label>,
    counts: LabelCounts,
    store: LabelStore,
    removed_total: usize,
}

impl ReviewSession {
    pub fn new(catalog: Vec<CandidateRecord>, store: LabelStore) -> Self {
        Self {
            catalog,
            cursor: 0,
            labels: HashMap::new(),
            counts: LabelCounts::default(),
            store,
            removed_total: 0,
        }
    }

    /// 既存の分類ファイルの内容でセッションを再開する
    ///
    /// カーソルは読み込んだ行数の位置（＝次の未処理候補）に置く。
    pub fn resume_from(&mut self, scanned: ScanResult) {
        self.counts = LabelCounts::default();
        for label in scanned.labels.values() {
            self.counts.add(*label);
        }
        self.labels = scanned.labels;

        if !self.catalog.is_empty() {
            self.cursor = scanned.rows.min(self.catalog.len() - 1);
        }
    }

    pub fn len(&self) -> usize {
        self.catalog.len()
    }

    pub fn is_empty(&self) -> bool {
        self.catalog.is_empty()
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// 表示中の候補。空カタログではNone
    pub fn current(&self) -> Option<&CandidateRecord> {
        self.catalog.get(self.cursor)
    }

    pub fn counts(&self) -> LabelCounts {
        self.counts
    }

    /// フィルタで除外した累計件数
    pub fn removed_total(&self) -> usize {
        self.removed_total
    }

    /// キーに付いているラベル（未分類はNone）
    pub fn label_of(&self, key: &str) -> Option<Label> {
        self.labels.get(key).copied()
    }

    pub fn store(&self) -> &LabelStore {
        &self.store
    }

    /// 表示中の候補にラベルを付け、1つ先へ進む
    ///
    /// 遷移規則:
    /// - 同一ラベル: 何も書かない
    /// - 未分類: ストアに追記
    /// - 別ラベル: ストアを原子的に置換
    ///
    /// 区分の更新は書き込みの成功後。失敗はそのまま呼び出し元へ返り、
    /// メモリ上の状態は一切変わらない。
    pub fn assign(&mut self, label: Label) -> Result<Assignment> {
        let Some(record) = self.current() else {
            return Ok(Assignment::NoCandidate);
        };
        let key = record.key.clone();

        let outcome = match self.labels.get(&key).copied() {
            Some(previous) if previous == label => Assignment::Unchanged,
            Some(previous) => {
                self.store.replace(&key, label)?;
                self.labels.insert(key, label);
                self.counts.remove(previous);
                self.counts.add(label);
                Assignment::Replaced(previous)
            }
            None => {
                self.store.append(&key, label)?;
                self.labels.insert(key, label);
                self.counts.add(label);
                Assignment::Added
            }
        };

        // 分類→次へ、のワークフロー
        self.advance(1);
        Ok(outcome)
    }

    /// カーソルを相対移動する。両端はクランプ（折り返さない）
    pub fn advance(&mut self, delta: i64) -> usize {
        if self.catalog.is_empty() {
            return 0;
        }
        let last = (self.catalog.len() - 1) as i64;
        let target = (self.cursor as i64).saturating_add(delta);
        self.cursor = target.clamp(0, last) as usize;
        self.cursor
    }

    /// カーソルを絶対位置へ（範囲外はクランプ）
    pub fn jump_to(&mut self, index: usize) -> usize {
        if self.catalog.is_empty() {
            return 0;
        }
        self.cursor = index.min(self.catalog.len() - 1);
        self.cursor
    }

    /// 未処理の後半 `[cursor, N-1]` に範囲フィルタを適用する
    ///
    /// 半開区間 `[lower, upper)` に入る候補だけが残り、外れた候補は
    /// セッションから恒久的に除外される。処理済みの前半は値に関係なく
    /// 触らない。戻り値は除外件数。レビュー完了後（cursor が末尾以降）
    /// は何もしない。
    pub fn apply_filter(&mut self, param: FilterParam, lower: f64, upper: f64) -> usize {
        let n = self.catalog.len();
        if n == 0 || self.cursor >= n - 1 {
            return 0;
        }

        let tail = self.catalog.split_off(self.cursor);
        let tail_len = tail.len();

        self.catalog.extend(
            tail.into_iter()
                .filter(|record| {
                    let value = param.value(record);
                    value >= lower && value < upper
                }),
        );

        let removed = tail_len - (self.catalog.len() - self.cursor);

        for (index, record) in self.catalog.iter_mut().enumerate() {
            record.index = index;
        }

        if !self.catalog.is_empty() {
            self.cursor = self.cursor.min(self.catalog.len() - 1);
        } else {
            self.cursor = 0;
        }

        self.removed_total += removed;
        removed
    }

    /// フィルタ境界を文字列から解釈する。数値でなければ入力エラー
    pub fn parse_bound(text: &str) -> Result<f64> {
        text.trim()
            .parse()
            .map_err(|_| TriageError::Input(format!("境界値が数値ではありません: {}", text)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn record(key: &str, mjd: f64, dm: f64, index: usize) -> CandidateRecord {
        CandidateRecord {
            path: PathBuf::from(format!("/data/{}", key)),
            key: key.to_string(),
            mjd,
            dm,
            index,
        }
    }

    fn session_with(n: usize) -> (tempfile::TempDir, ReviewSession) {
        let dir = tempfile::tempdir().unwrap();
        let store = LabelStore::new(dir.path().join("classification.csv"));
        let catalog = (0..n)
            .map(|i| record(&format!("{}.0_x_{}.0_y.png", 100 + i, 5 * i + 5), 100.0 + i as f64, (5 * i + 5) as f64, i))
            .collect();
        (dir, ReviewSession::new(catalog, store))
    }

    #[test]
    fn test_advance_clamps_both_ends() {
        let (_dir, mut session) = session_with(10);
        assert_eq!(session.advance(1_000_000), 9);
        assert_eq!(session.advance(-1_000_000), 0);
    }

    #[test]
    fn test_advance_empty_catalog() {
        let (_dir, mut session) = session_with(0);
        assert_eq!(session.advance(1), 0);
        assert!(session.current().is_none());
    }

    #[test]
    fn test_jump_to_clamps() {
        let (_dir, mut session) = session_with(3);
        assert_eq!(session.jump_to(99), 2);
        assert_eq!(session.jump_to(0), 0);
    }

    #[test]
    fn test_assign_advances_cursor() {
        let (_dir, mut session) = session_with(3);
        let outcome = session.assign(Label::Rfi).unwrap();
        assert_eq!(outcome, Assignment::Added);
        assert_eq!(session.cursor(), 1);
        assert_eq!(session.counts().rfi, 1);
    }

    #[test]
    fn test_assign_idempotent() {
        let (_dir, mut session) = session_with(3);
        session.assign(Label::Rfi).unwrap();
        session.jump_to(0);
        let outcome = session.assign(Label::Rfi).unwrap();
        assert_eq!(outcome, Assignment::Unchanged);
        assert_eq!(session.counts().rfi, 1);

        // ストアにも1行だけ
        let scanned = session.store().scan().unwrap();
        assert_eq!(scanned.rows, 1);
    }

    #[test]
    fn test_assign_relabel_replaces() {
        let (_dir, mut session) = session_with(3);
        session.assign(Label::Rfi).unwrap();
        session.jump_to(0);
        let outcome = session.assign(Label::Candidate).unwrap();
        assert_eq!(outcome, Assignment::Replaced(Label::Rfi));
        assert_eq!(session.counts().rfi, 0);
        assert_eq!(session.counts().candidate, 1);

        let scanned = session.store().scan().unwrap();
        assert_eq!(scanned.rows, 1);
        assert_eq!(scanned.labels.values().next(), Some(&Label::Candidate));
    }

    #[test]
    fn test_assign_failure_leaves_state_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        // 存在しないサブディレクトリ→追記はIOエラー
        let store = LabelStore::new(dir.path().join("missing").join("out.csv"));
        let catalog = vec![record("100.0_x_5.0_y.png", 100.0, 5.0, 0)];
        let mut session = ReviewSession::new(catalog, store);

        let result = session.assign(Label::Rfi);
        assert!(result.is_err());
        assert_eq!(session.counts(), LabelCounts::default());
        assert_eq!(session.label_of("100.0_x_5.0_y.png"), None);
        assert_eq!(session.cursor(), 0);
    }

    #[test]
    fn test_filter_keeps_inside_interval() {
        let (_dir, mut session) = session_with(3);
        // dm: 5, 10, 15
        let removed = session.apply_filter(FilterParam::Dm, 0.0, 12.0);
        assert_eq!(removed, 1);
        assert_eq!(session.len(), 2);
        assert_eq!(session.removed_total(), 1);
        assert_eq!(session.current().unwrap().dm, 5.0);
    }

    #[test]
    fn test_filter_half_open_upper_bound() {
        let (_dir, mut session) = session_with(3);
        // 上限ちょうど（dm=15）は除外される
        let removed = session.apply_filter(FilterParam::Dm, 5.0, 15.0);
        assert_eq!(removed, 1);
    }

    #[test]
    fn test_filter_leaves_reviewed_prefix() {
        let (_dir, mut session) = session_with(5);
        session.jump_to(2);
        let removed = session.apply_filter(FilterParam::Dm, 1000.0, 2000.0);
        // 後半3件は全部範囲外
        assert_eq!(removed, 3);
        assert_eq!(session.len(), 2);
        // 前半はDMに関係なく残る
        assert_eq!(session.catalog[0].dm, 5.0);
        assert_eq!(session.catalog[1].dm, 10.0);
        assert_eq!(session.cursor(), 1);
    }

    #[test]
    fn test_filter_noop_when_review_complete() {
        let (_dir, mut session) = session_with(3);
        session.jump_to(2);
        let removed = session.apply_filter(FilterParam::Dm, 0.0, 1.0);
        assert_eq!(removed, 0);
        assert_eq!(session.len(), 3);
    }

    #[test]
    fn test_filter_reassigns_indices() {
        let (_dir, mut session) = session_with(4);
        session.apply_filter(FilterParam::Dm, 10.0, 20.0);
        let indices: Vec<usize> = session.catalog.iter().map(|r| r.index).collect();
        assert_eq!(indices, vec![0, 1]);
    }

    #[test]
    fn test_filter_by_mjd() {
        let (_dir, mut session) = session_with(3);
        // mjd: 100, 101, 102
        let removed = session.apply_filter(FilterParam::Mjd, 100.0, 101.5);
        assert_eq!(removed, 1);
        assert_eq!(session.len(), 2);
    }

    #[test]
    fn test_parse_bound_rejects_non_numeric() {
        assert!(ReviewSession::parse_bound("12.5").is_ok());
        assert!(matches!(
            ReviewSession::parse_bound("abc"),
            Err(TriageError::Input(_))
        ));
    }

    #[test]
    fn test_resume_seeds_counts_and_cursor() {
        let (_dir, mut session) = session_with(5);
        session.assign(Label::Rfi).unwrap();
        session.assign(Label::Candidate).unwrap();

        let scanned = session.store().scan().unwrap();
        let store = LabelStore::new(session.store().path().to_path_buf());
        let catalog = session.catalog.clone();
        let mut resumed = ReviewSession::new(catalog, store);
        resumed.resume_from(scanned);

        assert_eq!(resumed.counts().rfi, 1);
        assert_eq!(resumed.counts().candidate, 1);
        assert_eq!(resumed.cursor(), 2);
    }
}
