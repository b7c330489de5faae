//! Configuration types.
//!
//! Loaded from `seqweave.toml` (see [`crate::config_loader`]). Every section
//! has defaults, so an empty file is a valid configuration. CLI flags always
//! override these settings.

use serde::{Deserialize, Serialize};

use crate::components::{FeedForwardEncoder, RnnDecoder};
use crate::embeddings::{EmbeddingSpec, SpecialTokens};
use crate::encoder_decoder::DEFAULT_MAX_STEPS;

/// Top-level seqweave configuration.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Seq2SeqConfig {
    /// Which encoder and decoder to build
    #[serde(default)]
    pub model: ModelConfig,

    /// Vocabulary and embedding construction
    #[serde(default)]
    pub embeddings: EmbeddingConfig,

    /// Greedy decoding and training-time knobs
    #[serde(default)]
    pub generation: GenerationConfig,
}

// =============================================================================
// Model
// =============================================================================

/// A registry name plus the component's own parameters.
///
/// ```toml
/// [model.encoder]
/// name = "feed_forward"
/// params = { hidden_size = 64, state_steps = 1 }
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ComponentConfig {
    pub name: String,
    #[serde(default)]
    pub params: toml::Table,
}

impl ComponentConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            params: toml::Table::new(),
        }
    }

    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<toml::Value>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    /// Sets `key` unless the config already has it.
    pub fn set_default_param(&mut self, key: &str, value: impl Into<toml::Value>) {
        self.params
            .entry(key.to_string())
            .or_insert_with(|| value.into());
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ModelConfig {
    #[serde(default = "default_encoder")]
    pub encoder: ComponentConfig,
    #[serde(default = "default_decoder")]
    pub decoder: ComponentConfig,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            encoder: default_encoder(),
            decoder: default_decoder(),
        }
    }
}

fn default_encoder() -> ComponentConfig {
    ComponentConfig::new(FeedForwardEncoder::NAME).with_param("hidden_size", 64)
}

fn default_decoder() -> ComponentConfig {
    ComponentConfig::new(RnnDecoder::NAME)
        .with_param("hidden_size", 64)
        .with_param("embedding_dim", 32)
}

// =============================================================================
// Embeddings
// =============================================================================

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct EmbeddingConfig {
    #[serde(default = "default_features")]
    pub features: Vec<String>,
    #[serde(default = "default_dims")]
    pub dims: Vec<usize>,
    #[serde(default)]
    pub special_tokens: SpecialTokens,
    #[serde(default)]
    pub seed: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            features: default_features(),
            dims: default_dims(),
            special_tokens: SpecialTokens::default(),
            seed: 0,
        }
    }
}

impl EmbeddingConfig {
    pub fn spec(&self) -> EmbeddingSpec {
        EmbeddingSpec {
            features: self.features.clone(),
            dims: self.dims.clone(),
        }
    }
}

fn default_features() -> Vec<String> {
    vec!["tokens".into()]
}

fn default_dims() -> Vec<usize> {
    vec![300]
}

// =============================================================================
// Generation
// =============================================================================

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct GenerationConfig {
    #[serde(default = "default_max_steps")]
    pub max_steps: usize,
    #[serde(default)]
    pub dropout: f32,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            max_steps: default_max_steps(),
            dropout: 0.0,
        }
    }
}

fn default_max_steps() -> usize {
    DEFAULT_MAX_STEPS
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_toml_is_default() {
        let config: Seq2SeqConfig = toml::from_str("").unwrap();
        assert_eq!(config, Seq2SeqConfig::default());
        assert_eq!(config.generation.max_steps, 300);
        assert_eq!(config.embeddings.features, vec!["tokens".to_string()]);
        assert_eq!(config.embeddings.dims, vec![300]);
    }

    #[test]
    fn test_parse_full_config() {
        let config: Seq2SeqConfig = toml::from_str(
            r#"
            [model.encoder]
            name = "feed_forward"
            params = { hidden_size = 16, state_steps = 2 }

            [model.decoder]
            name = "rnn"

            [model.decoder.params]
            hidden_size = 16
            num_layers = 2
            embedding_dim = 8

            [embeddings]
            features = ["tokens", "pos"]
            dims = [50, 20]
            seed = 9

            [embeddings.special_tokens]
            pad = "[PAD]"

            [generation]
            max_steps = 12
            dropout = 0.1
            "#,
        )
        .unwrap();

        assert_eq!(config.model.encoder.params["state_steps"].as_integer(), Some(2));
        assert_eq!(config.model.decoder.params["num_layers"].as_integer(), Some(2));
        assert_eq!(config.embeddings.dims, vec![50, 20]);
        assert_eq!(config.embeddings.special_tokens.pad.as_deref(), Some("[PAD]"));
        assert_eq!(config.embeddings.special_tokens.stop.as_deref(), Some("</s>"));
        assert_eq!(config.generation.max_steps, 12);
    }

    #[test]
    fn test_set_default_param_keeps_explicit_value() {
        let mut component = ComponentConfig::new("rnn").with_param("vocab_size", 10);
        component.set_default_param("vocab_size", 99);
        component.set_default_param("seed", 4);
        assert_eq!(component.params["vocab_size"].as_integer(), Some(10));
        assert_eq!(component.params["seed"].as_integer(), Some(4));
    }
}
