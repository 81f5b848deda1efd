//! Runs one post-norm encoder sub-layer, `LayerNorm(x + SelfAttention(x))`,
//! on random data and prints the shapes and attention weights.
//!
//! Run with: `cargo run -p attention --example encoder_sublayer [config.toml]`

use anyhow::Result;
use attention::{SelfAttention, SelfAttentionConfig};
use candle_core::{DType, Device, Tensor, D};
use layers::{LayerNorm, NormConfig};

fn main() -> Result<()> {
    let config = match std::env::args().nth(1) {
        Some(path) => SelfAttentionConfig::load(path)?,
        None => SelfAttentionConfig::new(16, 8, 8, 16),
    };
    anyhow::ensure!(
        config.value_dim == config.input_dim,
        "residual connection needs value_dim == input_dim"
    );

    let device = Device::Cpu;
    let attention = SelfAttention::new(config.clone(), &device, DType::F32)?;
    let norm = LayerNorm::new(NormConfig::new(config.input_dim), &device, DType::F32)?;

    let input = Tensor::randn(0f32, 1.0, (2, 4, config.input_dim), &device)?;
    let attended = attention.forward_with_weights(&input)?;
    let output = norm.forward(&(&input + &attended.output)?)?;

    println!("input   {:?}", input.dims());
    println!("output  {:?}", output.dims());
    println!("weights (batch 0)\n{}", attended.weights.get(0)?);
    println!(
        "row sums {:?}",
        attended.weights.sum(D::Minus1)?.flatten_all()?.to_vec1::<f32>()?
    );
    Ok(())
}
