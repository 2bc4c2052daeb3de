//! Error type shared by every controller.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AlError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("point {point} requires its true label but carries none")]
    MissingLabel { point: u64 },
    #[error("distribution error: {0}")]
    Distribution(String),
}
