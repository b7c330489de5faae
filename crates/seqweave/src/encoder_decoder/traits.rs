//! traits for Encoder-Decoder components
use anyhow::Result;
use ndarray::{Array2, Array3, ArrayView1, ArrayView3};

use crate::encoder_decoder::context::Context;

/// The output of an `Encoder::encode` call.
#[derive(Debug, Clone)]
pub struct EncoderOutput {
    /// Per-step representations. Shape: `[batch, source_steps, hidden]`.
    pub encoder_output: Array3<f32>,
    /// Summary state used to seed the decoder. Shape: `[steps, batch, hidden]`.
    pub encoder_state: Array3<f32>,
}

/// The output of a full-sequence, teacher-forced `Decoder::decode` call.
#[derive(Debug, Clone)]
pub struct DecoderOutput {
    /// Shape: `[batch, target_steps, vocab]`.
    pub logits: Array3<f32>,
    /// Final decoder state. Shape: `[layers, batch, hidden]`.
    pub state: Option<Array3<f32>>,
}

/// The output of a single `Decoder::decode_step` call.
#[derive(Debug, Clone)]
pub struct StepOutput {
    /// Shape: `[batch, vocab]`.
    pub logits: Array2<f32>,
    /// Shape: `[layers, batch, hidden]`.
    pub state: Array3<f32>,
}

pub trait Encoder: Send + Sync {
    /// Registry name of this encoder variant.
    fn name(&self) -> &str;

    fn encode(
        &self,
        source_features: ArrayView3<f32>,
        source_lengths: ArrayView1<usize>,
    ) -> Result<EncoderOutput>;

    fn initialize_parameters(&mut self) -> Result<()>;
    fn set_dropout(&mut self, rate: f32);

    fn hidden_size(&self) -> usize;
    /// Size of the leading axis of `encoder_state`.
    fn state_steps(&self) -> usize;
}

pub trait Decoder: Send + Sync {
    /// Registry name of this decoder variant.
    fn name(&self) -> &str;

    /// Teacher-forced decode over a whole target sequence.
    ///
    /// `prior_state` of `None` means "seed from `encoder_state`".
    fn decode(
        &self,
        encoder_state: ArrayView3<f32>,
        target_features: ArrayView3<f32>,
        context: &Context,
        prior_state: Option<ArrayView3<f32>>,
    ) -> Result<DecoderOutput>;

    /// Advances generation by one token for every example in the batch.
    fn decode_step(
        &self,
        encoder_state: ArrayView3<f32>,
        input_tokens: ArrayView1<u32>,
        context: &Context,
        prior_state: Option<ArrayView3<f32>>,
    ) -> Result<StepOutput>;

    fn initialize_parameters(&mut self) -> Result<()>;
    fn set_dropout(&mut self, rate: f32);

    fn hidden_size(&self) -> usize;
    fn num_layers(&self) -> usize;
    fn vocab_size(&self) -> usize;

    /// The token fed as input on the first generation step.
    fn start_token_id(&self) -> u32;
    /// Emitting this token finishes an example.
    fn stop_token_id(&self) -> u32;
    /// Filler written after an example has finished.
    fn pad_token_id(&self) -> u32;
}
