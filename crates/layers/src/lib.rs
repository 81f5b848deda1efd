//! Building blocks for transformer layers.
//!
//! This crate hosts dense projections and layer normalisation assembled from
//! Candle primitives. Inputs follow the `(batch, seq, hidden)` convention and
//! every learnable parameter is a [`candle_core::Var`], so gradients come from
//! Candle's autograd while updates are written back by an external optimiser.

pub mod checks;
pub mod config;
pub mod linear;
pub mod norm;

use candle_core::DType;
use thiserror::Error;

pub use config::load_config;
pub use linear::{Linear, LinearConfig, LinearInit};
pub use norm::{LayerNorm, NormConfig, DEFAULT_EPSILON};

/// Errors raised while building layers or running their forward passes.
#[derive(Debug, Error)]
pub enum LayerError {
    /// Construction arguments violate a structural requirement.
    #[error("invalid configuration: {context}")]
    Configuration { context: String },
    /// A tensor does not follow the layout the layer was configured for.
    #[error("shape mismatch for {context}: expected {expected}, got {actual:?}")]
    ShapeMismatch {
        context: &'static str,
        expected: String,
        actual: Vec<usize>,
    },
    /// The layer cannot operate on tensors of this dtype.
    #[error("unsupported dtype {dtype:?} for {context}")]
    UnsupportedDType { context: &'static str, dtype: DType },
    /// Reading a configuration file failed.
    #[error("failed to read configuration: {0}")]
    Io(#[from] std::io::Error),
    /// Error propagated from the Candle backend.
    #[error(transparent)]
    Backend(#[from] candle_core::Error),
}

impl LayerError {
    pub(crate) fn configuration(context: impl Into<String>) -> Self {
        Self::Configuration {
            context: context.into(),
        }
    }
}

/// Result alias used throughout the crate.
pub type Result<T, E = LayerError> = std::result::Result<T, E>;
