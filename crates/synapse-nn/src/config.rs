// TransformerConfig — Hyperparameters of the transformer stack
//
// Loaded from JSON with serde; omitted fields take their defaults:
//
//   { "d_model": 64, "num_heads": 4, "num_layers": 2, "vocab_size": 96 }
//
//   d_ff        4 · d_model
//   max_len     5000
//   vocab_size  none (no embedding, no output projection, no generation)
//   eps         1e-5
//   seed        none (entropy-seeded initialization)

use serde::{Deserialize, Serialize};
use synapse_core::{Error, Result};

fn default_max_len() -> usize {
    5000
}

fn default_eps() -> f64 {
    1e-5
}

/// Hyperparameters of a [`Transformer`](crate::Transformer).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransformerConfig {
    pub d_model: usize,
    pub num_heads: usize,
    pub num_layers: usize,
    /// Hidden width of the position-wise feed-forward sublayer. `None` means
    /// 4 · d_model.
    #[serde(default)]
    pub d_ff: Option<usize>,
    #[serde(default = "default_max_len")]
    pub max_len: usize,
    #[serde(default)]
    pub vocab_size: Option<usize>,
    #[serde(default = "default_eps")]
    pub eps: f64,
    #[serde(default)]
    pub seed: Option<u64>,
}

impl TransformerConfig {
    pub fn new(d_model: usize, num_heads: usize, num_layers: usize) -> Self {
        TransformerConfig {
            d_model,
            num_heads,
            num_layers,
            d_ff: None,
            max_len: default_max_len(),
            vocab_size: None,
            eps: default_eps(),
            seed: None,
        }
    }

    pub fn with_vocab_size(mut self, vocab_size: usize) -> Self {
        self.vocab_size = Some(vocab_size);
        self
    }

    pub fn with_d_ff(mut self, d_ff: usize) -> Self {
        self.d_ff = Some(d_ff);
        self
    }

    pub fn with_max_len(mut self, max_len: usize) -> Self {
        self.max_len = max_len;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Effective feed-forward width.
    pub fn d_ff(&self) -> usize {
        self.d_ff.unwrap_or(4 * self.d_model)
    }

    /// Width of one attention head.
    pub fn d_k(&self) -> usize {
        self.d_model / self.num_heads.max(1)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let config: TransformerConfig = serde_json::from_str(json)
            .map_err(|e| Error::config(format!("invalid transformer config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("d_model", self.d_model),
            ("num_heads", self.num_heads),
            ("num_layers", self.num_layers),
            ("d_ff", self.d_ff()),
            ("max_len", self.max_len),
        ] {
            if value == 0 {
                return Err(Error::config(format!("{name} must be non-zero")));
            }
        }
        if self.d_model % self.num_heads != 0 {
            return Err(Error::config(format!(
                "d_model ({}) must be divisible by num_heads ({})",
                self.d_model, self.num_heads
            )));
        }
        if self.vocab_size == Some(0) {
            return Err(Error::config("vocab_size must be non-zero when set"));
        }
        if !self.eps.is_finite() || self.eps <= 0.0 {
            return Err(Error::config(format!("eps must be positive, got {}", self.eps)));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_json() {
        let cfg = TransformerConfig::from_json(r#"{"d_model": 8, "num_heads": 2, "num_layers": 1}"#)
            .unwrap();
        assert_eq!(cfg.d_ff(), 32);
        assert_eq!(cfg.max_len, 5000);
        assert_eq!(cfg.vocab_size, None);
        assert_eq!(cfg.eps, 1e-5);
        assert_eq!(cfg.d_k(), 4);
    }

    #[test]
    fn test_heads_must_divide_d_model() {
        let err = TransformerConfig::new(10, 3, 1).validate().unwrap_err();
        assert!(matches!(err, Error::Config(_)));
        assert!(err.to_string().contains("divisible"));
    }

    #[test]
    fn test_zero_sizes_rejected() {
        assert!(TransformerConfig::new(0, 1, 1).validate().is_err());
        assert!(TransformerConfig::new(4, 0, 1).validate().is_err());
        assert!(TransformerConfig::new(4, 1, 0).validate().is_err());
        assert!(TransformerConfig::new(4, 1, 1)
            .with_vocab_size(0)
            .validate()
            .is_err());
    }
}
