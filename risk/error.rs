use thiserror::Error;

/// The single error type surfaced by bundle loading and every calculator.
///
/// Every failure is synchronous and final for the call that produced it: the
/// evaluators are pure functions of (inputs, bundle), so retrying with the same
/// arguments always fails the same way.
#[derive(Error, Debug)]
pub enum RiskError {
    /// Caller input violates a precondition (out-of-range value, missing
    /// conditionally-required field, unknown categorical code).
    #[error("Invalid input: {0}")]
    Validation(String),

    /// The bundle lacks an expected variable, category, or coefficient term, or
    /// does not have the shape the calculator expects.
    #[error("Bundle schema mismatch: {0}")]
    Schema(String),

    #[error("Parameter bundle '{location}' was not found.")]
    NotFound { location: String },

    #[error("Parameter bundle '{location}' is not valid JSON: {source}")]
    Parse {
        location: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to read parameter bundle '{location}': {source}")]
    Io {
        location: String,
        #[source]
        source: std::io::Error,
    },
}

impl RiskError {
    pub(crate) fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub(crate) fn schema(msg: impl Into<String>) -> Self {
        Self::Schema(msg.into())
    }
}
