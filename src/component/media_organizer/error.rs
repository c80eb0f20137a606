use std::path::PathBuf;
use thiserror::Error;

/// 整理流程中呼叫端需要區分處理的錯誤
///
/// 單一檔案的失敗不會變成 `Err`，而是記錄在 `FileRecord` 的狀態上
#[derive(Error, Debug)]
pub enum OrganizeError {
    #[error("未知的篩選器類型: {0}")]
    UnknownFilter(String),

    #[error("篩選器 {id} 設定錯誤: {message}")]
    InvalidFilterConfig { id: String, message: String },

    #[error("無法產生路徑 {path}: {message}")]
    Render { path: PathBuf, message: String },

    #[error("目的地資料夾無法使用: {0}")]
    DestinationUnavailable(PathBuf),

    #[error("操作已中斷")]
    Cancelled,

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl OrganizeError {
    pub(crate) fn invalid_config(id: &str, message: impl Into<String>) -> Self {
        Self::InvalidFilterConfig {
            id: id.to_string(),
            message: message.into(),
        }
    }
}
