//! Construction options for [`SelfAttention`](crate::SelfAttention).
//!
//! [`SelfAttentionConfig`] captures the projection sizes and the weight
//! initialisation policy. It can be built in code or deserialised from TOML or
//! JSON through [`SelfAttentionConfig::load`].

use std::path::Path;

use layers::{LinearConfig, LinearInit};
use serde::{Deserialize, Serialize};

use super::AttentionError;

/// Dimensions and initialisation of a single-head self-attention block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelfAttentionConfig {
    /// Feature size of the incoming tokens.
    pub input_dim: usize,
    /// Width of the query projection. Must equal `key_dim`.
    pub query_dim: usize,
    /// Width of the key projection.
    pub key_dim: usize,
    /// Width of the value projection and of the output.
    pub value_dim: usize,
    /// Initialisation applied to all three projections.
    #[serde(default)]
    pub init: LinearInit,
}

impl SelfAttentionConfig {
    pub fn new(input_dim: usize, query_dim: usize, key_dim: usize, value_dim: usize) -> Self {
        Self {
            input_dim,
            query_dim,
            key_dim,
            value_dim,
            init: LinearInit::default(),
        }
    }

    /// Replaces the projection initialisation policy.
    pub fn with_init(mut self, init: LinearInit) -> Self {
        self.init = init;
        self
    }

    /// Rejects zero-sized projections and mismatched query/key widths.
    pub fn validate(&self) -> Result<(), AttentionError> {
        let dims = [
            ("input_dim", self.input_dim),
            ("query_dim", self.query_dim),
            ("key_dim", self.key_dim),
            ("value_dim", self.value_dim),
        ];
        if let Some((name, _)) = dims.iter().find(|(_, value)| *value == 0) {
            return Err(AttentionError::configuration(format!(
                "{name} must be non-zero"
            )));
        }
        if self.query_dim != self.key_dim {
            return Err(AttentionError::configuration(format!(
                "query_dim ({}) must equal key_dim ({}) for dot-product scores",
                self.query_dim, self.key_dim
            )));
        }
        Ok(())
    }

    /// Projection configs in `(query, key, value)` order.
    pub fn projection_configs(&self) -> [LinearConfig; 3] {
        [
            LinearConfig::new(self.input_dim, self.query_dim),
            LinearConfig::new(self.input_dim, self.key_dim),
            LinearConfig::new(self.input_dim, self.value_dim),
        ]
    }

    /// Reads a `.toml` or `.json` file and validates the result.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, AttentionError> {
        let config: Self = layers::load_config(path)?;
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mismatched_query_and_key_is_rejected() {
        let err = SelfAttentionConfig::new(4, 2, 3, 3).validate().unwrap_err();
        match err {
            AttentionError::Configuration { context } => assert!(context.contains("key_dim")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn zero_dimension_is_rejected() {
        let err = SelfAttentionConfig::new(4, 2, 2, 0).validate().unwrap_err();
        assert!(matches!(err, AttentionError::Configuration { ref context } if context.contains("value_dim")));
    }

    #[test]
    fn projection_configs_follow_dimensions() {
        let [query, key, value] = SelfAttentionConfig::new(8, 4, 4, 6).projection_configs();
        assert_eq!((query.input_dim, query.output_dim), (8, 4));
        assert_eq!((key.input_dim, key.output_dim), (8, 4));
        assert_eq!((value.input_dim, value.output_dim), (8, 6));
        assert!(query.bias && key.bias && value.bias);
    }

    #[test]
    fn init_defaults_when_missing_from_file() {
        let parsed: SelfAttentionConfig = layers::config::from_toml_str(
            "input_dim = 4\nquery_dim = 2\nkey_dim = 2\nvalue_dim = 3\n",
        )
        .unwrap();
        assert_eq!(parsed, SelfAttentionConfig::new(4, 2, 2, 3));

        let parsed: SelfAttentionConfig = layers::config::from_json_str(
            r#"{"input_dim": 4, "query_dim": 2, "key_dim": 2, "value_dim": 3,
                "init": {"kind": "kaiming_uniform", "negative_slope": 0.0}}"#,
        )
        .unwrap();
        assert_eq!(
            parsed.init,
            LinearInit::KaimingUniform {
                negative_slope: 0.0
            }
        );
    }
}
