//! Lightweight validation helpers shared across layer components.
//!
//! These routines provide concise shape and dtype assertions that can be wired
//! into constructors or forward paths. They return [`LayerError`] values so
//! call sites can propagate failures without panicking.

use candle_core::{DType, Tensor};

use crate::{LayerError, Result};

/// Floating point dtypes accepted by every layer in this crate.
pub const FLOAT_DTYPES: &[DType] = &[DType::F16, DType::BF16, DType::F32, DType::F64];

/// Ensures a tensor matches the expected dimensions exactly.
pub fn expect_shape(name: &'static str, tensor: &Tensor, expected: &[usize]) -> Result<()> {
    if tensor.dims() == expected {
        Ok(())
    } else {
        Err(LayerError::ShapeMismatch {
            context: name,
            expected: format!("{expected:?}"),
            actual: tensor.dims().to_vec(),
        })
    }
}

/// Ensures a tensor has the expected number of dimensions.
pub fn expect_rank(name: &'static str, tensor: &Tensor, rank: usize) -> Result<()> {
    if tensor.rank() == rank {
        Ok(())
    } else {
        Err(LayerError::ShapeMismatch {
            context: name,
            expected: format!("rank {rank}"),
            actual: tensor.dims().to_vec(),
        })
    }
}

/// Ensures the trailing dimension equals `hidden`, whatever the leading layout.
pub fn expect_last_dim(name: &'static str, tensor: &Tensor, hidden: usize) -> Result<()> {
    match tensor.dims().last() {
        Some(&last) if last == hidden => Ok(()),
        _ => Err(LayerError::ShapeMismatch {
            context: name,
            expected: format!("(..., {hidden})"),
            actual: tensor.dims().to_vec(),
        }),
    }
}

/// Validates the `(batch, seq, hidden)` convention with a known hidden size.
///
/// Empty batch or sequence dimensions are rejected as well.
pub fn expect_batch_seq_hidden(name: &'static str, tensor: &Tensor, hidden: usize) -> Result<()> {
    match tensor.dims() {
        [batch, seq, actual_hidden] if *actual_hidden == hidden && *batch > 0 && *seq > 0 => Ok(()),
        dims => Err(LayerError::ShapeMismatch {
            context: name,
            expected: format!("(batch > 0, seq > 0, {hidden})"),
            actual: dims.to_vec(),
        }),
    }
}

/// Checks the tensor dtype is one of the allowed values.
pub fn expect_dtype_in(name: &'static str, tensor: &Tensor, allowed: &[DType]) -> Result<()> {
    let dtype = tensor.dtype();
    if allowed.contains(&dtype) {
        Ok(())
    } else {
        Err(LayerError::UnsupportedDType {
            context: name,
            dtype,
        })
    }
}

/// Checks a requested parameter dtype before anything is allocated.
pub fn expect_float_dtype(name: &'static str, dtype: DType) -> Result<()> {
    if FLOAT_DTYPES.contains(&dtype) {
        Ok(())
    } else {
        Err(LayerError::UnsupportedDType {
            context: name,
            dtype,
        })
    }
}

/// Dtype used for statistics and softmax. Half formats are promoted to `f32`.
pub fn reduction_dtype(dtype: DType) -> DType {
    match dtype {
        DType::F16 | DType::BF16 => DType::F32,
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use candle_core::Device;

    #[test]
    fn batch_seq_hidden_rejects_wrong_layouts() -> candle_core::Result<()> {
        let device = Device::Cpu;
        let ok = Tensor::zeros((2, 3, 4), DType::F32, &device)?;
        assert!(expect_batch_seq_hidden("t", &ok, 4).is_ok());

        let wrong_hidden = Tensor::zeros((2, 3, 5), DType::F32, &device)?;
        let err = expect_batch_seq_hidden("t", &wrong_hidden, 4).unwrap_err();
        assert!(matches!(err, LayerError::ShapeMismatch { actual, .. } if actual == vec![2, 3, 5]));

        let flat = Tensor::zeros((3, 4), DType::F32, &device)?;
        assert!(expect_batch_seq_hidden("t", &flat, 4).is_err());

        let empty = Tensor::zeros((0, 3, 4), DType::F32, &device)?;
        assert!(expect_batch_seq_hidden("t", &empty, 4).is_err());
        Ok(())
    }

    #[test]
    fn last_dim_accepts_any_leading_layout() -> candle_core::Result<()> {
        let device = Device::Cpu;
        for dims in [vec![4], vec![3, 4], vec![2, 3, 4], vec![1, 2, 3, 4]] {
            let tensor = Tensor::zeros(dims.as_slice(), DType::F32, &device)?;
            assert!(expect_last_dim("t", &tensor, 4).is_ok());
            assert!(expect_last_dim("t", &tensor, 5).is_err());
        }
        let scalar = Tensor::new(1f32, &device)?;
        assert!(expect_last_dim("t", &scalar, 1).is_err());
        Ok(())
    }

    #[test]
    fn dtype_checks_and_promotion() -> candle_core::Result<()> {
        let device = Device::Cpu;
        let ints = Tensor::zeros(3, DType::U32, &device)?;
        let err = expect_dtype_in("t", &ints, FLOAT_DTYPES).unwrap_err();
        assert!(matches!(err, LayerError::UnsupportedDType { dtype: DType::U32, .. }));

        assert_eq!(reduction_dtype(DType::BF16), DType::F32);
        assert_eq!(reduction_dtype(DType::F16), DType::F32);
        assert_eq!(reduction_dtype(DType::F64), DType::F64);
        Ok(())
    }
}
