//! seqweave - encoder-decoder orchestration on `ndarray`
//!
//! Pluggable encoders and decoders, a typed context bundle threaded between
//! them, multi-reference batch expansion and a step-by-step greedy search.

pub mod common;
pub mod components;
pub mod config;
pub mod config_loader;
pub mod embeddings;
pub mod encoder_decoder;
pub mod ops;
pub mod registry;

// Re-export main API
pub use common::{CancellationHandle, CancellationToken, Seq2SeqError, Seq2SeqResult};
pub use config::{ComponentConfig, Seq2SeqConfig};
pub use embeddings::{build_embeddings, EmbeddingProducer, EmbeddingSpec, SpecialTokens, Vocab};
pub use encoder_decoder::{
    Context, Decoder, EncoderDecoderModel, Encoder, GreedyOutput, GreedySearch, Seq2SeqInputs,
};

pub mod prelude {
    pub use crate::common::{Seq2SeqError, Seq2SeqResult};
    pub use crate::encoder_decoder::{
        Context, Controls, Decoder, DecoderOutput, Encoder, EncoderDecoderModel, EncoderOutput,
        GreedySearch, SearchState, Seq2SeqInputs, StepOutput,
    };
}

#[cfg(test)]
mod tests;
