//! Error types emitted by attention implementations.

use layers::LayerError;
use thiserror::Error;

/// Attention-specific error category.
#[derive(Debug, Error)]
pub enum AttentionError {
    /// Construction arguments are inconsistent (e.g. `query_dim != key_dim`).
    #[error("invalid attention configuration: {context}")]
    Configuration { context: String },
    /// The supplied tensor shapes do not align with the documented contract.
    #[error("shape mismatch for {context}: expected {expected}, got {actual:?}")]
    ShapeMismatch {
        context: String,
        expected: String,
        actual: Vec<usize>,
    },
    /// The kernel does not support the requested data type.
    #[error("unsupported dtype {requested}")]
    UnsupportedDType { requested: String },
    /// Failure raised by a projection layer that has no attention-level meaning.
    #[error(transparent)]
    Layer(LayerError),
    /// A backend-specific failure propagated to the caller.
    #[error(transparent)]
    Backend(#[from] candle_core::Error),
}

impl AttentionError {
    pub(crate) fn configuration(context: impl Into<String>) -> Self {
        Self::Configuration {
            context: context.into(),
        }
    }

    pub(crate) fn shape(context: impl Into<String>, expected: impl Into<String>, actual: &[usize]) -> Self {
        Self::ShapeMismatch {
            context: context.into(),
            expected: expected.into(),
            actual: actual.to_vec(),
        }
    }
}

impl From<LayerError> for AttentionError {
    fn from(err: LayerError) -> Self {
        match err {
            LayerError::Configuration { context } => Self::Configuration { context },
            LayerError::ShapeMismatch {
                context,
                expected,
                actual,
            } => Self::ShapeMismatch {
                context: context.to_string(),
                expected,
                actual,
            },
            LayerError::UnsupportedDType { context, dtype } => Self::UnsupportedDType {
                requested: format!("{dtype:?} ({context})"),
            },
            LayerError::Backend(err) => Self::Backend(err),
            other => Self::Layer(other),
        }
    }
}
