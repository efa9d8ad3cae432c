use chrono::NaiveDate;
use rust_decimal::Decimal;
use thiserror::Error;

/// Fatal errors. Degraded-but-computable conditions (missing index, loss,
/// capped redemption) are reported as warnings instead.
#[derive(Debug, Error)]
pub enum CapGainsError {
    #[error("Invalid input: {field} — {reason}")]
    InvalidInput { field: String, reason: String },

    #[error("{field} {disposed} precedes acquisition on {acquired}")]
    DisposalBeforeAcquisition {
        field: &'static str,
        acquired: NaiveDate,
        disposed: NaiveDate,
    },

    /// A taxable gain was requested for a disposal that produced a loss.
    #[error("Financial impossibility: {0}")]
    FinancialImpossibility(String),

    #[error("Convergence failure: {function} did not converge after {iterations} iterations (delta: {last_delta})")]
    ConvergenceFailure {
        function: String,
        iterations: u32,
        last_delta: Decimal,
    },

    /// Price history or index table does not cover a required date.
    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    #[error("Division by zero in {context}")]
    DivisionByZero { context: String },

    #[error("Date error: {0}")]
    DateError(String),

    #[error("Invalid fiscal year label '{0}', expected e.g. 2024-25")]
    InvalidFiscalYear(String),

    #[error("Rules configuration error: {0}")]
    RulesConfiguration(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl CapGainsError {
    pub(crate) fn invalid_input(field: impl Into<String>, reason: impl Into<String>) -> Self {
        CapGainsError::InvalidInput {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

impl From<serde_json::Error> for CapGainsError {
    fn from(e: serde_json::Error) -> Self {
        CapGainsError::SerializationError(e.to_string())
    }
}
