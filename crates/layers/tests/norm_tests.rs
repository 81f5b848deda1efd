use anyhow::Result;
use candle_core::{DType, Device, Tensor, D};
use layers::{config, LayerError, LayerNorm, NormConfig, DEFAULT_EPSILON};

fn layer(hidden: usize) -> Result<LayerNorm> {
    Ok(LayerNorm::new(NormConfig::new(hidden), &Device::Cpu, DType::F32)?)
}

#[test]
fn output_shape_matches_input_for_any_leading_layout() -> Result<()> {
    let device = Device::Cpu;
    let norm = layer(6)?;
    for dims in [vec![6], vec![4, 6], vec![2, 3, 6], vec![2, 2, 3, 6]] {
        let input = Tensor::randn(0f32, 1.0, dims.as_slice(), &device)?;
        let output = norm.forward(&input)?;
        assert_eq!(output.dims(), input.dims());
    }
    Ok(())
}

#[test]
fn fresh_parameters_are_ones_and_zeros() -> Result<()> {
    let norm = layer(3)?;
    assert_eq!(norm.scale().to_vec1::<f32>()?, vec![1.0; 3]);
    assert_eq!(norm.shift().to_vec1::<f32>()?, vec![0.0; 3]);
    assert_eq!(norm.config().epsilon, DEFAULT_EPSILON);

    let names = norm
        .named_parameters("encoder.ln")
        .into_iter()
        .map(|(name, _)| name)
        .collect::<Vec<_>>();
    assert_eq!(names, ["encoder.ln.weight", "encoder.ln.bias"]);
    Ok(())
}

#[test]
fn identity_affine_gives_zero_mean_unit_variance() -> Result<()> {
    let device = Device::Cpu;
    let hidden = 32;
    let norm = layer(hidden)?;
    let input = (Tensor::randn(0f32, 5.0, (3, 7, hidden), &device)? - 2.0)?;
    let output = norm.forward(&input)?;
    let pre_affine = norm.normalize(&input)?;

    let diff = output.sub(&pre_affine)?.abs()?.max_all()?.to_vec0::<f32>()?;
    assert!(diff < 1e-6);

    let mean = output.mean_keepdim(D::Minus1)?;
    let variance = (output
        .broadcast_sub(&mean)?
        .sqr()?
        .sum_keepdim(D::Minus1)?
        / (hidden as f64 - 1.0))?;
    for value in mean.flatten_all()?.to_vec1::<f32>()? {
        assert!(value.abs() < 1e-5);
    }
    for value in variance.flatten_all()?.to_vec1::<f32>()? {
        assert!((value - 1.0).abs() < 1e-3);
    }
    Ok(())
}

#[test]
fn constant_tokens_map_to_shift() -> Result<()> {
    let device = Device::Cpu;
    let mut norm = layer(4)?;
    norm.set_scale(&Tensor::new(&[5f32, 5.0, 5.0, 5.0], &device)?)?;
    norm.set_shift(&Tensor::new(&[0.5f32, 1.0, 1.5, 2.0], &device)?)?;

    let input = Tensor::full(8f32, (2, 2, 4), &device)?;
    let output = norm.forward(&input)?.reshape((4, 4))?.to_vec2::<f32>()?;
    for row in output {
        assert_eq!(row, vec![0.5, 1.0, 1.5, 2.0]);
    }
    Ok(())
}

#[test]
fn mismatched_last_dimension_is_a_shape_error() -> Result<()> {
    let norm = layer(4)?;
    let input = Tensor::zeros((1, 2, 3), DType::F32, &Device::Cpu)?;
    match norm.forward(&input) {
        Err(LayerError::ShapeMismatch { actual, .. }) => assert_eq!(actual, vec![1, 2, 3]),
        other => panic!("expected shape mismatch, got {other:?}"),
    }
    Ok(())
}

#[test]
fn fractional_hidden_size_in_config_is_rejected() -> Result<()> {
    let parsed: NormConfig = config::from_toml_str("hidden_size = 8")?;
    assert_eq!(parsed, NormConfig::new(8));

    let err = config::from_json_str::<NormConfig>(r#"{ "hidden_size": 4.5, "epsilon": 1e-5 }"#)
        .unwrap_err();
    assert!(matches!(err, LayerError::Configuration { .. }));
    Ok(())
}
