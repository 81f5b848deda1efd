//! Scaled dot-product self-attention for the transformer project.
//!
//! The crate offers two levels of API:
//!
//! * [`ExactAttention`] implements the [`Attention`] trait over already
//!   projected tensors shaped `[batch, seq_len, dim]`: scores are
//!   `Q · Kᵀ / sqrt(d_q)`, normalised with a softmax over the key axis, and
//!   used to average `V`.
//! * [`SelfAttention`] owns the query/key/value projections
//!   ([`layers::Linear`]) and maps `(batch, seq, input_dim)` inputs to
//!   `(batch, seq, value_dim)` outputs.
//!
//! There is a single head and no masking; every token attends to every
//! token. Half-precision inputs are promoted to `f32` for the score and
//! softmax computation, and the output matches the input dtype. Parameters
//! are Candle [`Var`](candle_core::Var)s, so gradients come from
//! `Tensor::backward`.

pub mod core;
pub mod reference;
pub mod self_attention;

pub use crate::core::{Attention, AttentionError, AttentionOutput, SelfAttentionConfig};
pub use crate::reference::ExactAttention;
pub use crate::self_attention::SelfAttention;
