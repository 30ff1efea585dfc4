use rust_decimal::Decimal;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExchangeError {
    /// Malformed user input; the dialog re-prompts the same step.
    #[error("invalid input: {0}")]
    Validation(String),
    #[error("unknown currency: {0}")]
    CurrencyNotFound(String),
    #[error("unknown order: {0}")]
    OrderNotFound(String),
    #[error("unknown user: {0}")]
    UserNotFound(i64),
    /// Buy amount exceeds what the desk holds for that currency.
    #[error("insufficient reserve for {code}: {available} available")]
    InsufficientReserve { code: String, available: Decimal },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("storage error: {0}")]
    Persistence(String),
    #[error("delivery error: {0}")]
    Notification(String),
}

impl ExchangeError {
    /// True for failures of the record store itself. The submit path
    /// surfaces these with an apology instead of treating them as dialog
    /// input errors.
    pub fn is_persistence(&self) -> bool {
        matches!(
            self,
            ExchangeError::Io(_) | ExchangeError::Json(_) | ExchangeError::Persistence(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, ExchangeError>;
