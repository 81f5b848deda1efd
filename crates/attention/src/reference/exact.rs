//! Reference attention kernel.
//!
//! The exact path prioritises numerical fidelity and mirrors the semantics
//! described by the [`Attention`](crate::core::Attention) trait.

use std::sync::OnceLock;

use candle_core::{DType, Tensor, D};
use candle_nn::ops::softmax;
use layers::checks::{reduction_dtype, FLOAT_DTYPES};

use crate::core::{Attention, AttentionError, AttentionOutput};

/// Numerically stable, portable scaled dot-product attention.
#[derive(Debug, Default, Clone)]
pub struct ExactAttention {
    first_call: OnceLock<()>,
}

impl ExactAttention {
    pub fn new() -> Self {
        Self::default()
    }

    fn validate(q: &Tensor, k: &Tensor, v: &Tensor) -> Result<(usize, usize, usize), AttentionError> {
        let device = q.device();
        if !device.same_device(k.device()) || !device.same_device(v.device()) {
            return Err(AttentionError::configuration(
                "q, k, v must reside on the same device",
            ));
        }

        let dtype = q.dtype();
        if dtype != k.dtype() || dtype != v.dtype() {
            return Err(AttentionError::UnsupportedDType {
                requested: format!(
                    "q, k, v must share a dtype, got {dtype:?}/{:?}/{:?}",
                    k.dtype(),
                    v.dtype()
                ),
            });
        }
        if !FLOAT_DTYPES.contains(&dtype) {
            return Err(AttentionError::UnsupportedDType {
                requested: format!("{dtype:?}"),
            });
        }

        let (batch, q_len, head_dim) = q
            .dims3()
            .map_err(|_| AttentionError::shape("q", "[batch, q_len, dim]", q.dims()))?;
        let (kb, k_len, kd) = k
            .dims3()
            .map_err(|_| AttentionError::shape("k", "[batch, k_len, dim]", k.dims()))?;
        let (vb, vk, _) = v
            .dims3()
            .map_err(|_| AttentionError::shape("v", "[batch, k_len, value_dim]", v.dims()))?;

        if batch == 0 || q_len == 0 || head_dim == 0 {
            return Err(AttentionError::shape("q", "non-empty [batch, q_len, dim]", q.dims()));
        }
        if kb != batch || kd != head_dim || k_len == 0 {
            return Err(AttentionError::shape(
                "k",
                format!("[{batch}, k_len > 0, {head_dim}]"),
                k.dims(),
            ));
        }
        if vb != batch || vk != k_len {
            return Err(AttentionError::shape(
                "v",
                format!("[{batch}, {k_len}, value_dim]"),
                v.dims(),
            ));
        }
        Ok((q_len, k_len, head_dim))
    }
}

impl Attention for ExactAttention {
    fn attend(&self, q: &Tensor, k: &Tensor, v: &Tensor) -> Result<AttentionOutput, AttentionError> {
        let (q_len, k_len, head_dim) = Self::validate(q, k, v)?;

        let dtype = q.dtype();
        let work_dtype = reduction_dtype(dtype);
        if self.first_call.set(()).is_ok() {
            log::info!(
                "attention::reference init device={:?} dtype={dtype:?} work_dtype={work_dtype:?}",
                q.device().location(),
            );
        }
        log::trace!(
            "attention::reference attend batch={} q_len={q_len} k_len={k_len} dim={head_dim} value_dim={}",
            q.dims()[0],
            v.dims()[2]
        );

        let q_work = q.to_dtype(work_dtype)?.contiguous()?;
        let k_work = k.to_dtype(work_dtype)?.contiguous()?;
        let v_work = v.to_dtype(work_dtype)?.contiguous()?;

        let scale = 1.0 / (head_dim as f64).sqrt();
        let scores = (q_work.matmul(&k_work.transpose(1, 2)?)? * scale)?;

        let weights = softmax(&scores, D::Minus1)?;
        let output = weights.matmul(&v_work)?;

        if work_dtype == dtype {
            Ok(AttentionOutput { output, weights })
        } else {
            Ok(AttentionOutput {
                output: output.to_dtype(dtype)?,
                weights: weights.to_dtype(dtype)?,
            })
        }
    }
}
