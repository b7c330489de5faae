//! Encoder-decoder orchestration.
//!
//! `EncoderDecoderModel` composes two pluggable components behind the
//! [`Encoder`] and [`Decoder`] traits. It builds the [`Context`] bundle on
//! every encode, expands it for multi-reference training batches, and hands
//! it either to a single teacher-forced decoder call (`forward`) or to a
//! [`GreedySearch`] (`greedy_decode`).
//!
//! ```ignore
//! let mut model = EncoderDecoderModel::from_config(&config.model)?;
//! model.initialize_parameters()?;
//!
//! let inputs = Seq2SeqInputs::with_length_mask(features, lengths);
//! let output = model.greedy_decode(&inputs, 50)?.finish()?;
//! ```

pub mod context;
mod expand;
mod greedy;
mod model;
pub mod traits;

pub use context::{length_mask, Context, Controls, Seq2SeqInputs};
pub use expand::expand_for_references;
pub use greedy::{GreedyOutput, GreedySearch, SearchState, SearchStep, DEFAULT_MAX_STEPS};
pub use model::EncoderDecoderModel;
pub use traits::{Decoder, DecoderOutput, Encoder, EncoderOutput, StepOutput};
