use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ScreenerError {
    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("API error: {0}")]
    ApiError(String),

    #[error("Export error: {0}")]
    Export(String),

    #[error("cancelled")]
    Cancelled,

    #[error("Unknown error: {0}")]
    Unknown(String),
}
