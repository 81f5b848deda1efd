//! Layer normalisation with learnable affine parameters.
//!
//! Inputs follow the `(batch, seq, hidden)` convention, although any leading
//! layout is accepted: normalisation happens along the last axis while the
//! original shape is preserved. Statistics use the unbiased (`N - 1`) variance
//! estimator, so results differ from `candle_nn::ops::layer_norm` for small
//! hidden sizes. Half-precision inputs are promoted to `f32` for the
//! statistics and cast back before returning.

use candle_core::{DType, Device, Tensor, Var, D};
use serde::{Deserialize, Serialize};

use crate::{checks, LayerError, Result};

/// Epsilon used when a configuration does not specify one.
pub const DEFAULT_EPSILON: f64 = 1e-5;

fn default_epsilon() -> f64 {
    DEFAULT_EPSILON
}

/// Configuration for [`LayerNorm`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormConfig {
    /// Size of the hidden dimension being normalised.
    pub hidden_size: usize,
    /// Numeric stabiliser added to the variance.
    #[serde(default = "default_epsilon")]
    pub epsilon: f64,
}

impl NormConfig {
    /// Creates a configuration with the default epsilon.
    pub fn new(hidden_size: usize) -> Self {
        Self {
            hidden_size,
            epsilon: DEFAULT_EPSILON,
        }
    }

    /// Replaces the epsilon.
    pub fn with_epsilon(mut self, epsilon: f64) -> Self {
        self.epsilon = epsilon;
        self
    }

    /// Checks the hidden size supports an unbiased variance and epsilon is usable.
    pub fn validate(&self) -> Result<()> {
        if self.hidden_size < 2 {
            return Err(LayerError::configuration(format!(
                "layer norm needs hidden_size >= 2 for an unbiased variance, got {}",
                self.hidden_size
            )));
        }
        if !(self.epsilon.is_finite() && self.epsilon > 0.0) {
            return Err(LayerError::configuration(format!(
                "layer norm epsilon must be finite and positive, got {}",
                self.epsilon
            )));
        }
        Ok(())
    }
}

/// Standard LayerNorm: `(x - mean) / sqrt(var + eps) * scale + shift`.
#[derive(Debug, Clone)]
pub struct LayerNorm {
    config: NormConfig,
    scale: Var,
    shift: Var,
}

impl LayerNorm {
    /// Builds a layer with scale initialised to ones and shift to zeros.
    pub fn new(config: NormConfig, device: &Device, dtype: DType) -> Result<Self> {
        config.validate()?;
        checks::expect_float_dtype("norm.dtype", dtype)?;
        let scale = Var::ones(config.hidden_size, dtype, device)?;
        let shift = Var::zeros(config.hidden_size, dtype, device)?;
        log::debug!(
            "layer norm hidden_size={} epsilon={} dtype={:?}",
            config.hidden_size,
            config.epsilon,
            dtype
        );
        Ok(Self {
            config,
            scale,
            shift,
        })
    }

    /// Builds a layer from existing scale and shift tensors.
    pub fn from_parameters(config: NormConfig, scale: Tensor, shift: Tensor) -> Result<Self> {
        config.validate()?;
        checks::expect_shape("norm.scale", &scale, &[config.hidden_size])?;
        checks::expect_shape("norm.shift", &shift, &[config.hidden_size])?;
        checks::expect_dtype_in("norm.scale", &scale, checks::FLOAT_DTYPES)?;
        let shift = shift.to_dtype(scale.dtype())?;
        Ok(Self {
            config,
            scale: Var::from_tensor(&scale)?,
            shift: Var::from_tensor(&shift)?,
        })
    }

    /// Returns the configuration so callers can check shape compatibility.
    pub fn config(&self) -> &NormConfig {
        &self.config
    }

    /// Returns a clone of the scale tensor.
    pub fn scale(&self) -> Tensor {
        self.scale.as_tensor().clone()
    }

    /// Returns a clone of the shift tensor.
    pub fn shift(&self) -> Tensor {
        self.shift.as_tensor().clone()
    }

    /// Trainable parameters as `(name, var)` pairs, prefixed with `scope`.
    pub fn named_parameters(&self, scope: &str) -> Vec<(String, Var)> {
        let prefix = if scope.is_empty() { "norm" } else { scope };
        vec![
            (format!("{prefix}.weight"), self.scale.clone()),
            (format!("{prefix}.bias"), self.shift.clone()),
        ]
    }

    /// Overwrites the scale parameter.
    pub fn set_scale(&mut self, value: &Tensor) -> Result<()> {
        checks::expect_shape("norm.scale", value, &[self.config.hidden_size])?;
        self.scale.set(&value.to_dtype(self.scale.dtype())?)?;
        Ok(())
    }

    /// Overwrites the shift parameter.
    pub fn set_shift(&mut self, value: &Tensor) -> Result<()> {
        checks::expect_shape("norm.shift", value, &[self.config.hidden_size])?;
        self.shift.set(&value.to_dtype(self.shift.dtype())?)?;
        Ok(())
    }

    /// Pre-affine stage: zero mean and unit (unbiased) variance per token.
    pub fn normalize(&self, hidden: &Tensor) -> Result<Tensor> {
        let normalized = self.normalize_for_reduction(hidden)?;
        Ok(normalized.to_dtype(hidden.dtype())?)
    }

    /// Applies the normalisation followed by the learned scale and shift.
    pub fn forward(&self, hidden: &Tensor) -> Result<Tensor> {
        let normalized = self.normalize_for_reduction(hidden)?;
        let compute = normalized.dtype();
        let scale = self.scale.as_tensor().to_dtype(compute)?;
        let shift = self.shift.as_tensor().to_dtype(compute)?;
        let output = normalized.broadcast_mul(&scale)?.broadcast_add(&shift)?;
        Ok(output.to_dtype(hidden.dtype())?)
    }

    fn normalize_for_reduction(&self, hidden: &Tensor) -> Result<Tensor> {
        checks::expect_last_dim("norm.input", hidden, self.config.hidden_size)?;
        checks::expect_dtype_in("norm.input", hidden, checks::FLOAT_DTYPES)?;
        log::trace!("layer norm forward dims={:?}", hidden.dims());

        let n = self.config.hidden_size as f64;
        let compute = hidden.to_dtype(checks::reduction_dtype(hidden.dtype()))?;
        let mean = (compute.sum_keepdim(D::Minus1)? / n)?;
        let centered = compute.broadcast_sub(&mean)?;
        let variance = (centered.sqr()?.sum_keepdim(D::Minus1)? / (n - 1.0))?;
        let denom = (variance + self.config.epsilon)?.sqrt()?;
        Ok(centered.broadcast_div(&denom)?)
    }
}
