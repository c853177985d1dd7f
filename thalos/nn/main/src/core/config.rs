//! Loading and validation of model and generation settings.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use crate::api::error::{NnError, NnResult};
use crate::api::types::{GenerationConfig, ModelConfig};

impl ModelConfig {
    /// Load a ModelConfig from a JSON file; missing keys take their defaults.
    pub fn load<P: AsRef<Path>>(path: P) -> NnResult<Self> {
        let file = File::open(path)?;
        let config: ModelConfig = serde_json::from_reader(BufReader::new(file))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_str(json: &str) -> NnResult<Self> {
        let config: ModelConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> NnResult<()> {
        for (name, value) in [
            ("vocab_size", self.vocab_size),
            ("d_model", self.d_model),
            ("num_heads", self.num_heads),
            ("num_layers", self.num_layers),
            ("d_ff", self.d_ff),
            ("max_seq_len", self.max_seq_len),
        ] {
            if value == 0 {
                return Err(NnError::InvalidConfig(format!("{} must be > 0", name)));
            }
        }
        if self.d_model % self.num_heads != 0 {
            return Err(NnError::InvalidConfig(format!(
                "d_model ({}) must be divisible by num_heads ({})",
                self.d_model, self.num_heads
            )));
        }
        if !(0.0..1.0).contains(&self.dropout) {
            return Err(NnError::InvalidConfig(format!(
                "dropout must be in [0, 1), got {}",
                self.dropout
            )));
        }
        if self.layer_norm_eps.is_nan() || self.layer_norm_eps <= 0.0 {
            return Err(NnError::InvalidConfig(format!(
                "layer_norm_eps must be > 0, got {}",
                self.layer_norm_eps
            )));
        }
        Ok(())
    }
}

impl GenerationConfig {
    pub fn validate(&self) -> NnResult<()> {
        if !self.temperature.is_finite() || self.temperature < 0.0 {
            return Err(NnError::InvalidConfig(format!(
                "temperature must be finite and >= 0, got {}",
                self.temperature
            )));
        }
        if self.top_k == Some(0) {
            return Err(NnError::InvalidConfig("top_k must be > 0".into()));
        }
        if let Some(p) = self.top_p {
            if p.is_nan() || p <= 0.0 || p > 1.0 {
                return Err(NnError::InvalidConfig(format!(
                    "top_p must be in (0, 1], got {}",
                    p
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = ModelConfig::default();
        config.validate().unwrap();
        assert_eq!(config.head_dim(), 64);
        GenerationConfig::default().validate().unwrap();
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config = ModelConfig::from_json_str(r#"{"d_model": 64, "num_heads": 8}"#).unwrap();
        assert_eq!(config.d_model, 64);
        assert_eq!(config.vocab_size, 5000);
        assert_eq!(config.seed, 42);
    }

    #[test]
    fn test_rejects_bad_values() {
        let bad = [
            ModelConfig { d_model: 10, num_heads: 4, ..ModelConfig::default() },
            ModelConfig { num_layers: 0, ..ModelConfig::default() },
            ModelConfig { dropout: 1.0, ..ModelConfig::default() },
            ModelConfig { layer_norm_eps: 0.0, ..ModelConfig::default() },
        ];
        for config in bad {
            assert!(matches!(config.validate(), Err(NnError::InvalidConfig(_))));
        }
    }

    #[test]
    fn test_generation_validation() {
        let bad_k = GenerationConfig { top_k: Some(0), ..GenerationConfig::default() };
        let bad_t = GenerationConfig { temperature: -1.0, ..GenerationConfig::default() };
        let bad_p = GenerationConfig { top_p: Some(1.5), ..GenerationConfig::default() };
        assert!(bad_k.validate().is_err());
        assert!(bad_t.validate().is_err());
        assert!(bad_p.validate().is_err());
    }

    #[test]
    fn test_malformed_json() {
        assert!(matches!(
            ModelConfig::from_json_str("{not json"),
            Err(NnError::ConfigParse(_))
        ));
        assert!(matches!(
            ModelConfig::from_json_str(r#"{"activation": "swish"}"#),
            Err(NnError::ConfigParse(_))
        ));
    }
}
