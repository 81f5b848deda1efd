//! Core traits and types shared across attention implementations.
//!
//! Implementations operate on tensors with layout `[batch, seq_len, dim]`.
//! `q` and `k` share their inner dimension, `k` and `v` share their sequence
//! length, and the output mirrors `q`'s dtype.

pub mod config;
pub mod errors;

use candle_core::Tensor;

pub use config::SelfAttentionConfig;
pub use errors::AttentionError;

/// Aggregated values together with the weights that produced them.
#[derive(Debug, Clone)]
pub struct AttentionOutput {
    /// `[batch, q_len, value_dim]`.
    pub output: Tensor,
    /// `[batch, q_len, k_len]`; each row is a probability distribution.
    pub weights: Tensor,
}

/// Unified interface for attention kernels.
///
/// * `q` is `[batch, q_len, d]`, `k` is `[batch, k_len, d]`, `v` is
///   `[batch, k_len, d_v]`.
/// * Scores are scaled by `1 / sqrt(d)` and normalised over the key axis.
/// * All three tensors must live on the same device and share a float dtype.
pub trait Attention {
    /// Compute unmasked scaled dot-product attention.
    fn attend(&self, q: &Tensor, k: &Tensor, v: &Tensor) -> Result<AttentionOutput, AttentionError>;
}
