//! Linear and affine projection helpers.
//!
//! Linear layers expect inputs shaped `(batch, seq, in_dim)` (or `(rows,
//! in_dim)`) and return `(batch, seq, out_dim)`. Weights are stored as
//! `(out_dim, in_dim)` so the forward pass computes `x · Wᵀ + b`. Both
//! parameters are [`Var`]s: gradients flow through Candle's autograd and an
//! external optimiser writes new values with [`Linear::copy_weight_from`] and
//! [`Linear::copy_bias_from`]. Initialisation policies mirror common
//! transformer recipes so downstream crates can share a single implementation.

use candle_core::{DType, Device, Tensor, Var};
use serde::{Deserialize, Serialize};

use crate::{checks, LayerError, Result};

/// Configuration shared by dense projection layers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinearConfig {
    /// Incoming feature dimension.
    pub input_dim: usize,
    /// Output feature dimension.
    pub output_dim: usize,
    /// Whether a learnable bias vector should be applied.
    #[serde(default = "default_bias")]
    pub bias: bool,
}

fn default_bias() -> bool {
    true
}

impl LinearConfig {
    /// Creates a configuration for a projection with bias.
    pub fn new(input_dim: usize, output_dim: usize) -> Self {
        Self {
            input_dim,
            output_dim,
            bias: true,
        }
    }

    /// Rejects degenerate projections.
    pub fn validate(&self) -> Result<()> {
        if self.input_dim == 0 || self.output_dim == 0 {
            return Err(LayerError::configuration(format!(
                "linear dimensions must be non-zero, got {}x{}",
                self.input_dim, self.output_dim
            )));
        }
        Ok(())
    }
}

/// Supported weight initialisation policies for projections.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LinearInit {
    /// Weight and bias uniform in `±1/sqrt(fan_in)` (PyTorch `nn.Linear` default).
    #[default]
    FanInUniform,
    /// Xavier/Glorot uniform initialisation.
    XavierUniform,
    /// Xavier/Glorot normal initialisation.
    XavierNormal,
    /// Kaiming/He uniform initialisation.
    KaimingUniform { negative_slope: f64 },
    /// Kaiming/He normal initialisation.
    KaimingNormal { negative_slope: f64 },
    /// Scales another policy to support deep network stabilisation.
    Scaled { base: Box<LinearInit>, scale: f64 },
}

impl LinearInit {
    /// Convenience helper to scale an existing policy.
    pub fn scaled(base: LinearInit, scale: f64) -> Self {
        Self::Scaled {
            base: Box::new(base),
            scale,
        }
    }

    fn sample_weight(&self, shape: (usize, usize), device: &Device) -> Result<Tensor> {
        let (out_dim, in_dim) = shape;
        let (fan_in, fan_out) = (in_dim as f64, out_dim as f64);
        let weight = match self {
            LinearInit::FanInUniform => {
                let bound = 1.0 / fan_in.sqrt();
                Tensor::rand(-bound as f32, bound as f32, shape, device)?
            }
            LinearInit::XavierUniform => {
                let bound = (6.0f64 / (fan_in + fan_out)).sqrt();
                Tensor::rand(-bound as f32, bound as f32, shape, device)?
            }
            LinearInit::XavierNormal => {
                let std = (2.0f64 / (fan_in + fan_out)).sqrt();
                Tensor::randn(0f32, std as f32, shape, device)?
            }
            LinearInit::KaimingUniform { negative_slope } => {
                let gain = (2.0f64 / (1.0 + negative_slope.powi(2))).sqrt();
                let bound = 3.0f64.sqrt() * gain / fan_in.sqrt();
                Tensor::rand(-bound as f32, bound as f32, shape, device)?
            }
            LinearInit::KaimingNormal { negative_slope } => {
                let gain = (2.0f64 / (1.0 + negative_slope.powi(2))).sqrt();
                let std = gain / fan_in.sqrt();
                Tensor::randn(0f32, std as f32, shape, device)?
            }
            LinearInit::Scaled { base, scale } => (base.sample_weight(shape, device)? * *scale)?,
        };
        Ok(weight)
    }

    fn sample_bias(&self, config: &LinearConfig, device: &Device) -> Result<Tensor> {
        let bias = match self {
            LinearInit::FanInUniform => {
                let bound = 1.0 / (config.input_dim as f64).sqrt();
                Tensor::rand(-bound as f32, bound as f32, config.output_dim, device)?
            }
            _ => Tensor::zeros(config.output_dim, DType::F32, device)?,
        };
        Ok(bias)
    }
}

/// Dense affine projection with optional bias.
#[derive(Debug, Clone)]
pub struct Linear {
    config: LinearConfig,
    weight: Var,
    bias: Option<Var>,
}

impl Linear {
    /// Constructs a linear layer from pre-existing parameters.
    pub fn new(config: LinearConfig, weight: Tensor, bias: Option<Tensor>) -> Result<Self> {
        config.validate()?;
        Self::validate_weight(&config, &weight)?;
        Self::validate_bias(&config, bias.as_ref(), weight.dtype())?;
        Ok(Self {
            config,
            weight: Var::from_tensor(&weight)?,
            bias: bias.as_ref().map(Var::from_tensor).transpose()?,
        })
    }

    /// Builds a linear layer with randomly initialised parameters following `init`.
    pub fn with_init(
        config: LinearConfig,
        init: &LinearInit,
        device: &Device,
        dtype: DType,
    ) -> Result<Self> {
        config.validate()?;
        checks::expect_float_dtype("linear.dtype", dtype)?;
        let weight = init
            .sample_weight((config.output_dim, config.input_dim), device)?
            .to_dtype(dtype)?;
        let bias = if config.bias {
            Some(init.sample_bias(&config, device)?.to_dtype(dtype)?)
        } else {
            None
        };
        Self::new(config, weight, bias)
    }

    /// Returns the static configuration used to validate inputs.
    pub fn config(&self) -> &LinearConfig {
        &self.config
    }

    /// Returns a clone of the underlying weight tensor.
    pub fn weight(&self) -> Tensor {
        self.weight.as_tensor().clone()
    }

    /// Returns a clone of the bias tensor if present.
    pub fn bias(&self) -> Option<Tensor> {
        self.bias.as_ref().map(|bias| bias.as_tensor().clone())
    }

    /// Trainable parameters as `(name, var)` pairs, prefixed with `scope`.
    pub fn named_parameters(&self, scope: &str) -> Vec<(String, Var)> {
        let prefix = if scope.is_empty() { "linear" } else { scope };
        let mut params = vec![(format!("{prefix}.weight"), self.weight.clone())];
        if let Some(bias) = &self.bias {
            params.push((format!("{prefix}.bias"), bias.clone()));
        }
        params
    }

    /// Overwrites the weight with `value`, cast to the parameter dtype.
    pub fn copy_weight_from(&mut self, value: &Tensor) -> Result<()> {
        Self::validate_weight(&self.config, value)?;
        let cast = value.to_dtype(self.weight.dtype())?;
        self.weight.set(&cast)?;
        Ok(())
    }

    /// Overwrites the bias with `value`, cast to the parameter dtype.
    pub fn copy_bias_from(&mut self, value: &Tensor) -> Result<()> {
        match &self.bias {
            Some(bias) => {
                checks::expect_shape("linear.bias", value, &[self.config.output_dim])?;
                let cast = value.to_dtype(bias.dtype())?;
                bias.set(&cast)?;
                Ok(())
            }
            None => Err(LayerError::configuration("layer has no bias to copy into")),
        }
    }

    /// Applies the projection. Inputs are cast to the parameter dtype.
    pub fn forward(&self, hidden: &Tensor) -> Result<Tensor> {
        self.validate_input(hidden)?;

        let weight = self.weight.as_tensor();
        let input = hidden.to_dtype(weight.dtype())?;
        let weight_t = weight.t()?;
        let output = match *input.dims() {
            [batch, seq, _] => input
                .reshape((batch * seq, self.config.input_dim))?
                .matmul(&weight_t)?
                .reshape((batch, seq, self.config.output_dim))?,
            _ => input.matmul(&weight_t)?,
        };

        match &self.bias {
            Some(bias) => Ok(output.broadcast_add(bias.as_tensor())?),
            None => Ok(output),
        }
    }

    fn validate_weight(config: &LinearConfig, weight: &Tensor) -> Result<()> {
        checks::expect_rank("linear.weight", weight, 2)?;
        checks::expect_shape("linear.weight", weight, &[config.output_dim, config.input_dim])?;
        checks::expect_dtype_in("linear.weight", weight, checks::FLOAT_DTYPES)?;
        Ok(())
    }

    fn validate_bias(config: &LinearConfig, bias: Option<&Tensor>, dtype: DType) -> Result<()> {
        match (config.bias, bias) {
            (true, Some(tensor)) => {
                checks::expect_shape("linear.bias", tensor, &[config.output_dim])?;
                if tensor.dtype() != dtype {
                    return Err(LayerError::UnsupportedDType {
                        context: "linear.bias (must match weight dtype)",
                        dtype: tensor.dtype(),
                    });
                }
                Ok(())
            }
            (false, Some(_)) => Err(LayerError::configuration(
                "bias provided but config disables bias",
            )),
            (true, None) => Err(LayerError::configuration(
                "config expects bias but none supplied",
            )),
            (false, None) => Ok(()),
        }
    }

    fn validate_input(&self, hidden: &Tensor) -> Result<()> {
        checks::expect_dtype_in("linear.input", hidden, checks::FLOAT_DTYPES)?;
        match hidden.rank() {
            3 => checks::expect_batch_seq_hidden("linear.input", hidden, self.config.input_dim),
            2 => checks::expect_last_dim("linear.input", hidden, self.config.input_dim),
            _ => Err(LayerError::ShapeMismatch {
                context: "linear.input",
                expected: format!("(batch, seq, {0}) or (rows, {0})", self.config.input_dim),
                actual: hidden.dims().to_vec(),
            }),
        }
    }
}
