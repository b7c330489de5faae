//! The encoder-decoder orchestrator.

use ndarray::Array3;

use crate::common::{Seq2SeqError, Seq2SeqResult};
use crate::config::ModelConfig;
use crate::encoder_decoder::context::{Context, Seq2SeqInputs};
use crate::encoder_decoder::expand::expand_for_references;
use crate::encoder_decoder::greedy::GreedySearch;
use crate::encoder_decoder::traits::{Decoder, DecoderOutput, Encoder};
use crate::ops::ensure_shape;
use crate::registry;

/// Composes an [`Encoder`] and a [`Decoder`] without knowing their internals.
pub struct EncoderDecoderModel {
    encoder: Box<dyn Encoder>,
    decoder: Box<dyn Decoder>,
}

impl EncoderDecoderModel {
    /// Pairs two components, checking that the summary state fits the decoder.
    pub fn new(encoder: Box<dyn Encoder>, decoder: Box<dyn Decoder>) -> Seq2SeqResult<Self> {
        if encoder.hidden_size() != decoder.hidden_size() {
            return Err(Seq2SeqError::Configuration(format!(
                "encoder '{}' hidden size {} does not match decoder '{}' hidden size {}",
                encoder.name(),
                encoder.hidden_size(),
                decoder.name(),
                decoder.hidden_size()
            )));
        }
        if encoder.state_steps() != decoder.num_layers() {
            return Err(Seq2SeqError::Configuration(format!(
                "encoder '{}' produces {} state steps but decoder '{}' has {} layers",
                encoder.name(),
                encoder.state_steps(),
                decoder.name(),
                decoder.num_layers()
            )));
        }
        Ok(Self { encoder, decoder })
    }

    /// Builds both components through the registry.
    pub fn from_config(config: &ModelConfig) -> Seq2SeqResult<Self> {
        let encoder = registry::build_encoder(&config.encoder)?;
        let decoder = registry::build_decoder(&config.decoder)?;
        log::info!(
            "Built encoder-decoder model: encoder='{}', decoder='{}'",
            encoder.name(),
            decoder.name()
        );
        Self::new(encoder, decoder)
    }

    pub fn encoder(&self) -> &dyn Encoder {
        self.encoder.as_ref()
    }

    pub fn decoder(&self) -> &dyn Decoder {
        self.decoder.as_ref()
    }

    /// Runs the encoder and builds a fresh context bundle.
    ///
    /// Returns `(context, encoder_state)`. The optional source fields are copied
    /// into the context as they are; absent ones stay `None`.
    pub fn encode(&self, inputs: &Seq2SeqInputs) -> Seq2SeqResult<(Context, Array3<f32>)> {
        inputs.validate_source()?;
        let (batch, src_steps, _) = inputs.source_input_features.dim();

        let out = self.encoder.encode(
            inputs.source_input_features.view(),
            inputs.source_lengths.view(),
        )?;

        let hidden = self.encoder.hidden_size();
        ensure_shape(
            "encoder_output",
            &[batch, src_steps, hidden],
            out.encoder_output.shape(),
        )?;
        ensure_shape(
            "encoder_state",
            &[self.encoder.state_steps(), batch, hidden],
            out.encoder_state.shape(),
        )?;

        let context = Context {
            encoder_output: out.encoder_output,
            source_mask: inputs.source_mask.clone(),
            source_vocab_map: inputs.source_vocab_map.clone(),
            controls: inputs.controls.clone(),
        };
        Ok((context, out.encoder_state))
    }

    /// Teacher-forced forward pass over the whole target sequence.
    ///
    /// `encoded_inputs` lets a caller reuse an earlier `encode` result. When
    /// `inputs.max_references` is greater than one the encoding is expanded first,
    /// and the targets are expected in `[batch * max_references, ...]` layout.
    pub fn forward(
        &self,
        inputs: &Seq2SeqInputs,
        encoded_inputs: Option<(Context, Array3<f32>)>,
    ) -> Seq2SeqResult<DecoderOutput> {
        let (context, encoder_state) = match encoded_inputs {
            Some((context, encoder_state)) => {
                context.validate_with_state(&encoder_state)?;
                (context, encoder_state)
            }
            None => self.encode(inputs)?,
        };

        let (context, encoder_state) = match inputs.max_references {
            Some(refs) if refs != 1 => expand_for_references(&encoder_state, &context, refs)?,
            _ => (context, encoder_state),
        };

        let target = inputs
            .target_input_features
            .as_ref()
            .ok_or(Seq2SeqError::MissingInput("target_input_features"))?;
        let (target_batch, target_steps, target_features) = target.dim();
        ensure_shape(
            "target_input_features",
            &[context.batch_size(), target_steps, target_features],
            target.shape(),
        )?;

        let out = self
            .decoder
            .decode(encoder_state.view(), target.view(), &context, None)?;

        ensure_shape(
            "decoder logits",
            &[target_batch, target_steps, self.decoder.vocab_size()],
            out.logits.shape(),
        )?;
        Ok(out)
    }

    /// Encodes `batch` and returns a search bound to this model's decoder.
    ///
    /// Nothing is decoded until the search is stepped.
    pub fn greedy_decode(
        &self,
        batch: &Seq2SeqInputs,
        max_steps: usize,
    ) -> Seq2SeqResult<GreedySearch<'_>> {
        let (context, encoder_state) = self.encode(batch)?;
        log::debug!(
            "Starting greedy search: batch {}, max_steps {}",
            context.batch_size(),
            max_steps
        );
        GreedySearch::new(self.decoder.as_ref(), encoder_state, context, max_steps)
    }

    pub fn initialize_parameters(&mut self) -> Seq2SeqResult<()> {
        self.encoder.initialize_parameters()?;
        self.decoder.initialize_parameters()?;
        Ok(())
    }

    pub fn set_dropout(&mut self, rate: f32) -> Seq2SeqResult<()> {
        if !(0.0..1.0).contains(&rate) {
            return Err(Seq2SeqError::Configuration(format!(
                "dropout rate must be in [0, 1), got {}",
                rate
            )));
        }
        self.encoder.set_dropout(rate);
        self.decoder.set_dropout(rate);
        Ok(())
    }
}

impl std::fmt::Debug for EncoderDecoderModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EncoderDecoderModel")
            .field("encoder", &self.encoder.name())
            .field("decoder", &self.decoder.name())
            .finish()
    }
}
