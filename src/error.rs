use thiserror::Error;

/// 链上锚定 / 查询失败
#[derive(Debug, Error, PartialEq, Eq)]
pub enum LedgerError {
    #[error("Service disabled: {0}")]
    Disabled(String),

    #[error("rpc error: {0}")]
    Rpc(String),

    #[error("transaction submission failed: {0}")]
    Submission(String),

    #[error("transaction reverted: tx={0}")]
    Reverted(String),

    #[error("no receipt within {0}s")]
    ReceiptTimeout(u64),

    #[error("missing transaction receipt: tx={0}")]
    MissingReceipt(String),

    #[error("evidence rejected by registry: {0}")]
    Rejected(String),
}

/// 扫描流水线中的预期错误，统一渲染为 `{"error": ...}`
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("Unsupported scan type")]
    UnsupportedType,

    #[error("{0} required")]
    MissingField(&'static str),

    #[error("invalid request body: {0}")]
    InvalidBody(String),

    #[error("{modality} analyzer unavailable: {reason}")]
    AnalyzerUnavailable { modality: String, reason: String },

    #[error("{modality} analyzer returned a malformed result: {reason}")]
    MalformedResult { modality: String, reason: String },
}
