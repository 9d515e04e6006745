use thiserror::Error;

/// Buffer-level rejections. Checked before any sentence is decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum LogError {
    #[error("Empty log file")]
    Empty,
    #[error("Log file too small")]
    TooSmall,
    #[error("Log file too large (>16MB)")]
    TooLarge,
}
