use thiserror::Error;

#[derive(Error, Debug)]
pub enum TriageError {
    #[error("設定エラー: {0}")]
    Config(String),

    #[error("ディレクトリが見つかりません: {0}")]
    DirectoryNotFound(String),

    #[error("候補プロットが見つかりません: {0}")]
    NoCandidatesFound(String),

    #[error("分類ファイルが見つかりません: {0}")]
    StoreNotFound(String),

    #[error("ファイル名の解析に失敗: {0}")]
    Parse(String),

    #[error("カタログ内でキーが重複しています: {0}")]
    DuplicateKey(String),

    #[error("分類ファイルが破損しています: {0}")]
    Corruption(String),

    #[error("入力エラー: {0}")]
    Input(String),

    #[error("プロンプト実行エラー: {0}")]
    Prompt(String),

    #[error("JSON解析エラー: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("IOエラー: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, TriageError>;
