use thiserror::Error;

#[derive(Debug, Error)]
pub enum EquityVarError {
    #[error("Invalid input: {field} — {reason}")]
    InvalidInput { field: String, reason: String },

    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    #[error("Numerical error: {0}")]
    NumericalError(String),

    #[error("Division by zero in {context}")]
    DivisionByZero { context: String },

    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    #[error("Date error: {0}")]
    DateError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl EquityVarError {
    /// Shorthand for the most common variant.
    pub fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        EquityVarError::InvalidInput {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Whether the error aborts the current run rather than being a
    /// caller-fixable input problem.
    pub fn is_fatal(&self) -> bool {
        matches!(self, EquityVarError::NumericalError(_))
    }
}

impl From<serde_json::Error> for EquityVarError {
    fn from(e: serde_json::Error) -> Self {
        EquityVarError::SerializationError(e.to_string())
    }
}

impl From<serde_yaml::Error> for EquityVarError {
    fn from(e: serde_yaml::Error) -> Self {
        EquityVarError::SerializationError(e.to_string())
    }
}
