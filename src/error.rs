use crate::types::DateRange;
use thiserror::Error;

/// Application error types.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Data unavailable for {symbol} in {range}")]
    DataUnavailable { symbol: String, range: DateRange },

    #[error("Data integrity error: {0}")]
    DataIntegrity(String),

    #[error("Insufficient history: need {needed} bars, have {available}")]
    InsufficientHistory { needed: usize, available: usize },

    #[error("Computation error: {0}")]
    Computation(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("External API error: {0}")]
    ExternalApi(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Reqwest(#[from] reqwest::Error),

    #[error(transparent)]
    SerdeJson(#[from] serde_json::Error),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

impl AppError {
    /// Whether a retry (or a fallback to the last good cache) may succeed.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            AppError::DataUnavailable { .. }
                | AppError::ExternalApi(_)
                | AppError::Reqwest(_)
                | AppError::Io(_)
        )
    }

    /// Short machine-friendly kind, used when reporting batch failures.
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::DataUnavailable { .. } => "data_unavailable",
            AppError::DataIntegrity(_) => "data_integrity",
            AppError::InsufficientHistory { .. } => "insufficient_history",
            AppError::Computation(_) => "computation",
            AppError::InvalidInput(_) => "invalid_input",
            AppError::ExternalApi(_) | AppError::Reqwest(_) => "external_api",
            AppError::Io(_) => "io",
            AppError::Csv(_) => "csv",
            AppError::SerdeJson(_) => "serde_json",
            AppError::Anyhow(_) => "internal",
        }
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
