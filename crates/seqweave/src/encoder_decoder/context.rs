//! The context bundle handed from the encoder to the decoder, and the typed inputs record.

use std::collections::BTreeMap;

use ndarray::{Array1, Array2, Array3, ArrayD};

use crate::common::{Seq2SeqError, Seq2SeqResult};
use crate::ops::ensure_shape;

/// Opaque auxiliary conditioning data. The orchestrator never looks inside.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Controls {
    values: BTreeMap<String, ArrayD<f32>>,
}

impl Controls {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, value: ArrayD<f32>) -> Self {
        self.values.insert(name.into(), value);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: ArrayD<f32>) {
        self.values.insert(name.into(), value);
    }

    pub fn get(&self, name: &str) -> Option<&ArrayD<f32>> {
        self.values.get(name)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Side-channel data that travels with the summary state into the decoder.
///
/// Optional fields are `None` when the caller did not provide them.
#[derive(Debug, Clone, PartialEq)]
pub struct Context {
    /// Shape: `[batch, source_steps, hidden]`.
    pub encoder_output: Array3<f32>,
    /// Shape: `[batch, source_steps]`, 1.0 marks a valid position.
    pub source_mask: Option<Array2<f32>>,
    /// Shape: `[batch, source_steps, vocab]`.
    pub source_vocab_map: Option<Array3<f32>>,
    pub controls: Option<Controls>,
}

impl Context {
    pub fn new(encoder_output: Array3<f32>) -> Self {
        Self {
            encoder_output,
            source_mask: None,
            source_vocab_map: None,
            controls: None,
        }
    }

    pub fn batch_size(&self) -> usize {
        self.encoder_output.dim().0
    }

    pub fn source_steps(&self) -> usize {
        self.encoder_output.dim().1
    }

    /// Checks the optional tensors against `encoder_output`'s batch and step axes.
    pub fn validate(&self) -> Seq2SeqResult<()> {
        let (batch, steps, _) = self.encoder_output.dim();
        if let Some(mask) = &self.source_mask {
            ensure_shape("source_mask", &[batch, steps], mask.shape())?;
        }
        if let Some(vmap) = &self.source_vocab_map {
            let vocab = vmap.dim().2;
            ensure_shape("source_vocab_map", &[batch, steps, vocab], vmap.shape())?;
        }
        Ok(())
    }

    /// [`validate`](Self::validate) plus the batch axis of a summary state that
    /// will travel with this context. Shape: `[steps, batch, hidden]`.
    pub fn validate_with_state(&self, encoder_state: &Array3<f32>) -> Seq2SeqResult<()> {
        self.validate()?;
        let (steps, batch, hidden) = encoder_state.dim();
        if batch != self.batch_size() {
            return Err(Seq2SeqError::shape_mismatch(
                "encoder_state",
                &[steps, self.batch_size(), hidden],
                encoder_state.shape(),
            ));
        }
        Ok(())
    }
}

/// Everything `encode`, `forward` and `greedy_decode` read from the caller.
#[derive(Debug, Clone)]
pub struct Seq2SeqInputs {
    /// Shape: `[batch, source_steps, features]`.
    pub source_input_features: Array3<f32>,
    /// One valid length per example.
    pub source_lengths: Array1<usize>,
    pub source_mask: Option<Array2<f32>>,
    pub source_vocab_map: Option<Array3<f32>>,
    pub controls: Option<Controls>,
    /// Shape: `[batch * max_references, target_steps, features]`. Needed by `forward` only.
    pub target_input_features: Option<Array3<f32>>,
    pub max_references: Option<usize>,
}

impl Seq2SeqInputs {
    pub fn new(source_input_features: Array3<f32>, source_lengths: Array1<usize>) -> Self {
        Self {
            source_input_features,
            source_lengths,
            source_mask: None,
            source_vocab_map: None,
            controls: None,
            target_input_features: None,
            max_references: None,
        }
    }

    /// Builds inputs with a mask derived from the lengths.
    pub fn with_length_mask(source_input_features: Array3<f32>, source_lengths: Array1<usize>) -> Self {
        let mask = length_mask(&source_lengths, source_input_features.dim().1);
        Self::new(source_input_features, source_lengths).with_source_mask(mask)
    }

    pub fn with_source_mask(mut self, mask: Array2<f32>) -> Self {
        self.source_mask = Some(mask);
        self
    }

    pub fn with_source_vocab_map(mut self, vocab_map: Array3<f32>) -> Self {
        self.source_vocab_map = Some(vocab_map);
        self
    }

    pub fn with_controls(mut self, controls: Controls) -> Self {
        self.controls = Some(controls);
        self
    }

    pub fn with_target_input_features(mut self, features: Array3<f32>) -> Self {
        self.target_input_features = Some(features);
        self
    }

    pub fn with_max_references(mut self, max_references: usize) -> Self {
        self.max_references = Some(max_references);
        self
    }

    pub fn batch_size(&self) -> usize {
        self.source_input_features.dim().0
    }

    /// Checks the source-side fields against each other.
    pub fn validate_source(&self) -> Seq2SeqResult<()> {
        let (batch, steps, _) = self.source_input_features.dim();
        ensure_shape("source_lengths", &[batch], self.source_lengths.shape())?;
        if let Some((i, &len)) = self
            .source_lengths
            .iter()
            .enumerate()
            .find(|&(_, &len)| len > steps)
        {
            return Err(Seq2SeqError::ShapeMismatch {
                field: format!("source_lengths[{}]", i),
                expected: format!("<= {}", steps),
                actual: len.to_string(),
            });
        }
        if let Some(mask) = &self.source_mask {
            ensure_shape("source_mask", &[batch, steps], mask.shape())?;
        }
        if let Some(vmap) = &self.source_vocab_map {
            let vocab = vmap.dim().2;
            ensure_shape("source_vocab_map", &[batch, steps, vocab], vmap.shape())?;
        }
        Ok(())
    }
}

/// `[batch, steps]` mask with 1.0 for positions below each length.
pub fn length_mask(lengths: &Array1<usize>, steps: usize) -> Array2<f32> {
    Array2::from_shape_fn((lengths.len(), steps), |(b, t)| {
        if t < lengths[b] {
            1.0
        } else {
            0.0
        }
    })
}
