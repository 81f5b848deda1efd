//! Single-head self-attention with learned query/key/value projections.
//!
//! Inputs are `(batch, seq, input_dim)`. Each token is projected into query,
//! key and value spaces, scores are `Q · Kᵀ / sqrt(query_dim)` normalised with
//! a softmax over the key axis, and the output `(batch, seq, value_dim)` is the
//! weighted average of the values. Every query attends to every key.

use candle_core::{DType, Device, Tensor, Var};
use layers::{checks, Linear};

use crate::core::{Attention, AttentionError, AttentionOutput, SelfAttentionConfig};
use crate::reference::ExactAttention;

/// Scaled dot-product self-attention block.
#[derive(Debug, Clone)]
pub struct SelfAttention {
    config: SelfAttentionConfig,
    query: Linear,
    key: Linear,
    value: Linear,
    kernel: ExactAttention,
}

impl SelfAttention {
    /// Builds the block with projections initialised by `config.init`.
    pub fn new(config: SelfAttentionConfig, device: &Device, dtype: DType) -> Result<Self, AttentionError> {
        config.validate()?;
        checks::expect_float_dtype("self_attention.dtype", dtype)?;

        let [query_cfg, key_cfg, value_cfg] = config.projection_configs();
        let query = Linear::with_init(query_cfg, &config.init, device, dtype)?;
        let key = Linear::with_init(key_cfg, &config.init, device, dtype)?;
        let value = Linear::with_init(value_cfg, &config.init, device, dtype)?;

        log::debug!(
            "self_attention init input_dim={} query_dim={} value_dim={} dtype={dtype:?} init={:?}",
            config.input_dim,
            config.query_dim,
            config.value_dim,
            config.init
        );
        Ok(Self {
            config,
            query,
            key,
            value,
            kernel: ExactAttention::new(),
        })
    }

    /// Wraps pre-built projections. Their shapes must agree with `config` and
    /// each one must have a bias.
    pub fn from_projections(
        config: SelfAttentionConfig,
        query: Linear,
        key: Linear,
        value: Linear,
    ) -> Result<Self, AttentionError> {
        config.validate()?;
        let expected = config.projection_configs();
        for ((name, layer), wanted) in [("query", &query), ("key", &key), ("value", &value)]
            .into_iter()
            .zip(expected.iter())
        {
            let actual = layer.config();
            if actual.input_dim != wanted.input_dim || actual.output_dim != wanted.output_dim {
                return Err(AttentionError::configuration(format!(
                    "{name} projection is {}x{}, expected {}x{}",
                    actual.input_dim, actual.output_dim, wanted.input_dim, wanted.output_dim
                )));
            }
            if actual.bias != wanted.bias {
                return Err(AttentionError::configuration(format!(
                    "{name} projection must carry a bias"
                )));
            }
        }
        let dtype = query.weight().dtype();
        if key.weight().dtype() != dtype || value.weight().dtype() != dtype {
            return Err(AttentionError::configuration(
                "query, key and value projections must share a dtype",
            ));
        }

        Ok(Self {
            config,
            query,
            key,
            value,
            kernel: ExactAttention::new(),
        })
    }

    pub fn config(&self) -> &SelfAttentionConfig {
        &self.config
    }

    pub fn query(&self) -> &Linear {
        &self.query
    }

    pub fn key(&self) -> &Linear {
        &self.key
    }

    pub fn value(&self) -> &Linear {
        &self.value
    }

    /// Mutable access for writing optimiser updates into the query projection.
    pub fn query_mut(&mut self) -> &mut Linear {
        &mut self.query
    }

    pub fn key_mut(&mut self) -> &mut Linear {
        &mut self.key
    }

    pub fn value_mut(&mut self) -> &mut Linear {
        &mut self.value
    }

    /// Trainable parameters as `(name, var)` pairs, e.g. `"{scope}.query.weight"`.
    pub fn named_parameters(&self, scope: &str) -> Vec<(String, Var)> {
        let prefix = if scope.is_empty() { "self_attention" } else { scope };
        let mut params = self.query.named_parameters(&format!("{prefix}.query"));
        params.extend(self.key.named_parameters(&format!("{prefix}.key")));
        params.extend(self.value.named_parameters(&format!("{prefix}.value")));
        params
    }

    /// Returns `(batch, seq, value_dim)`.
    ///
    /// Fails with [`AttentionError::ShapeMismatch`] when the input is not rank
    /// 3, its last dimension differs from `input_dim`, or its batch or
    /// sequence dimension is empty. An empty sequence has no keys to
    /// normalise the softmax over. [`LayerNorm`](layers::LayerNorm) has no
    /// such restriction and passes empty inputs through.
    pub fn forward(&self, hidden: &Tensor) -> Result<Tensor, AttentionError> {
        Ok(self.forward_with_weights(hidden)?.output)
    }

    /// Like [`forward`](Self::forward) but also returns the `(batch, seq, seq)`
    /// attention weights.
    pub fn forward_with_weights(&self, hidden: &Tensor) -> Result<AttentionOutput, AttentionError> {
        checks::expect_dtype_in("self_attention.input", hidden, checks::FLOAT_DTYPES)?;
        checks::expect_batch_seq_hidden("self_attention.input", hidden, self.config.input_dim)?;

        let q = self.query.forward(hidden)?;
        let k = self.key.forward(hidden)?;
        let v = self.value.forward(hidden)?;

        let attended = self.kernel.attend(&q, &k, &v)?;
        let input_dtype = hidden.dtype();
        if attended.output.dtype() == input_dtype {
            Ok(attended)
        } else {
            Ok(AttentionOutput {
                output: attended.output.to_dtype(input_dtype)?,
                weights: attended.weights.to_dtype(input_dtype)?,
            })
        }
    }
}
