//! Error types for the step-graph engine
//!
//! Provides error handling for:
//! - Step-level failures (business errors from individual steps)
//! - Panics recovered at the run boundary
//! - Shared-state type mismatches
//! - Ambiguous parallel continuations

use serde_json::Value;

/// Error produced by a single step
#[derive(Debug, thiserror::Error)]
pub enum StepError {
    /// Step-level business failure
    #[error("step failed: {0}")]
    Failed(String),

    /// Panic recovered inside a step
    #[error("step panicked: {0}")]
    Panicked(String),

    /// More than one parallel branch proposed a continuation
    #[error("ambiguous continuation: {0} branches proposed a next step")]
    AmbiguousContinuation(usize),

    /// Shared-state access failure
    #[error("state error: {0}")]
    State(#[from] StateError),

    /// Any other failure a step wants to surface
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Error returned by a whole run
#[derive(Debug, thiserror::Error)]
pub enum DagError {
    /// A step on the main path failed; the run is aborted
    #[error("step '{step}' failed: {source}")]
    Step {
        /// Name of the failing step
        step: String,
        /// The step's own error
        #[source]
        source: StepError,
    },

    /// A step panicked; the panic was recovered and converted
    #[error("step '{step}' panicked: {message}")]
    Panicked {
        /// Name of the panicking step
        step: String,
        /// Recovered panic payload, stringified
        message: String,
    },
}

impl DagError {
    /// Wrap a step error, lifting recovered panics into their own variant
    #[must_use]
    pub fn from_step(step: &str, source: StepError) -> Self {
        match source {
            StepError::Panicked(message) => Self::Panicked {
                step: step.to_string(),
                message,
            },
            other => Self::Step {
                step: step.to_string(),
                source: other,
            },
        }
    }

    /// Name of the step the run stopped at
    #[inline]
    #[must_use]
    pub fn step(&self) -> &str {
        match self {
            Self::Step { step, .. } | Self::Panicked { step, .. } => step,
        }
    }
}

/// Shared-state access errors
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    /// Stored value does not deserialize as the requested type
    #[error("key '{key}' holds {found}, not the requested type: {message}")]
    WrongType {
        /// The key that was read
        key: String,
        /// JSON type of the stored value
        found: &'static str,
        /// Underlying deserialization message
        message: String,
    },

    /// Value could not be serialized for storage
    #[error("key '{key}' rejected value: {message}")]
    Unserializable {
        /// The key that was written
        key: String,
        /// Underlying serialization message
        message: String,
    },
}

/// JSON type name for diagnostics
#[must_use]
pub(crate) fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a bool",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
