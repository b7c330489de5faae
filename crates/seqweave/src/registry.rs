//! Name-keyed construction of encoders and decoders.
//!
//! A [`ComponentConfig`] names a variant and carries its parameters as a
//! TOML table; the table is deserialized into the variant's own config type.

use serde::de::DeserializeOwned;

use crate::common::{Seq2SeqError, Seq2SeqResult};
use crate::components::{FeedForwardEncoder, RnnDecoder};
use crate::config::ComponentConfig;
use crate::encoder_decoder::{Decoder, Encoder};

/// Names accepted by [`build_encoder`].
pub fn available_encoders() -> &'static [&'static str] {
    &[FeedForwardEncoder::NAME]
}

/// Names accepted by [`build_decoder`].
pub fn available_decoders() -> &'static [&'static str] {
    &[RnnDecoder::NAME]
}

pub fn build_encoder(config: &ComponentConfig) -> Seq2SeqResult<Box<dyn Encoder>> {
    match config.name.as_str() {
        FeedForwardEncoder::NAME => {
            let encoder = FeedForwardEncoder::new(parse_params(config)?)
                .map_err(|e| invalid_component(config, e))?;
            Ok(Box::new(encoder))
        }
        other => Err(Seq2SeqError::UnknownComponent {
            kind: "encoder",
            name: other.to_string(),
            available: available_encoders().join(", "),
        }),
    }
}

pub fn build_decoder(config: &ComponentConfig) -> Seq2SeqResult<Box<dyn Decoder>> {
    match config.name.as_str() {
        RnnDecoder::NAME => {
            let decoder =
                RnnDecoder::new(parse_params(config)?).map_err(|e| invalid_component(config, e))?;
            Ok(Box::new(decoder))
        }
        other => Err(Seq2SeqError::UnknownComponent {
            kind: "decoder",
            name: other.to_string(),
            available: available_decoders().join(", "),
        }),
    }
}

fn parse_params<T: DeserializeOwned>(config: &ComponentConfig) -> Seq2SeqResult<T> {
    toml::Value::Table(config.params.clone())
        .try_into()
        .map_err(|e| {
            Seq2SeqError::Configuration(format!("invalid params for '{}': {}", config.name, e))
        })
}

fn invalid_component(config: &ComponentConfig, err: anyhow::Error) -> Seq2SeqError {
    Seq2SeqError::Configuration(format!("cannot build '{}': {}", config.name, err))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_known_components() {
        let encoder = build_encoder(
            &ComponentConfig::new("feed_forward")
                .with_param("input_dim", 4)
                .with_param("hidden_size", 8),
        )
        .unwrap();
        assert_eq!(encoder.name(), "feed_forward");
        assert_eq!(encoder.hidden_size(), 8);
        assert_eq!(encoder.state_steps(), 1);

        let decoder = build_decoder(
            &ComponentConfig::new("rnn")
                .with_param("vocab_size", 20)
                .with_param("embedding_dim", 4)
                .with_param("hidden_size", 8),
        )
        .unwrap();
        assert_eq!(decoder.vocab_size(), 20);
        assert_eq!(decoder.stop_token_id(), 3);
    }

    #[test]
    fn test_unknown_name_lists_available() {
        let err = build_encoder(&ComponentConfig::new("transformer"))
            .err()
            .unwrap();
        match err {
            Seq2SeqError::UnknownComponent {
                kind,
                name,
                available,
            } => {
                assert_eq!(kind, "encoder");
                assert_eq!(name, "transformer");
                assert!(available.contains("feed_forward"));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(matches!(
            build_decoder(&ComponentConfig::new("lstm")),
            Err(Seq2SeqError::UnknownComponent { kind: "decoder", .. })
        ));
    }

    #[test]
    fn test_missing_params_is_configuration_error() {
        let err = build_decoder(&ComponentConfig::new("rnn").with_param("hidden_size", 8))
            .err()
            .unwrap();
        assert!(matches!(err, Seq2SeqError::Configuration(_)));
        assert!(err.to_string().contains("'rnn'"));
    }

    #[test]
    fn test_invalid_values_are_configuration_errors() {
        let err = build_encoder(
            &ComponentConfig::new("feed_forward")
                .with_param("input_dim", 4)
                .with_param("hidden_size", 8)
                .with_param("state_steps", 0),
        )
        .err()
        .unwrap();
        assert!(matches!(err, Seq2SeqError::Configuration(_)));
    }
}
