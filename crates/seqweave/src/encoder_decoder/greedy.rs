//! Greedy autoregressive search as an explicit state machine.

use anyhow::anyhow;
use ndarray::{Array1, Array2, Array3, Axis};

use crate::common::{CancellationToken, Seq2SeqError, Seq2SeqResult};
use crate::encoder_decoder::context::Context;
use crate::encoder_decoder::traits::Decoder;
use crate::ops::{argmax, ensure_shape, log_softmax_1d};

/// Default step budget for `greedy_decode`.
pub const DEFAULT_MAX_STEPS: usize = 300;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchState {
    Running,
    Done,
}

/// What one call to [`GreedySearch::step`] produced.
#[derive(Debug, Clone)]
pub struct SearchStep {
    /// Zero-based index of this step.
    pub step: usize,
    /// The argmax token of each example. Examples that had already finished get the pad token.
    pub tokens: Array1<u32>,
    /// Finished flags after this step.
    pub finished: Vec<bool>,
}

/// The finalized result of a search driven to exhaustion.
#[derive(Debug, Clone)]
pub struct GreedyOutput {
    /// Shape: `[batch, longest]`. Positions past an example's length hold the pad token;
    /// the stop token itself is not included.
    pub tokens: Array2<u32>,
    pub lengths: Vec<usize>,
    /// Sum of log-probabilities of the emitted tokens, stop token included.
    pub scores: Vec<f32>,
    pub steps_taken: usize,
}

impl GreedyOutput {
    /// Generated ids of one example without padding.
    pub fn sequence(&self, example: usize) -> Vec<u32> {
        self.tokens
            .row(example)
            .iter()
            .take(self.lengths[example])
            .copied()
            .collect()
    }
}

/// Bounded greedy search over a single encoded batch.
///
/// The search owns its encoder state, context and decoder state; it is advanced
/// with [`step`](Self::step) (or as an `Iterator`) and cannot be restarted once `Done`.
pub struct GreedySearch<'a> {
    decoder: &'a dyn Decoder,
    encoder_state: Array3<f32>,
    context: Context,
    max_steps: usize,
    cancellation: CancellationToken,

    state: SearchState,
    step: usize,
    decoder_state: Option<Array3<f32>>,
    current_input: Array1<u32>,
    finished: Vec<bool>,
    lengths: Vec<usize>,
    scores: Vec<f32>,
    outputs: Vec<Array1<u32>>,
}

impl<'a> GreedySearch<'a> {
    /// Fails with `ShapeMismatch` when `encoder_state` or the context's optional
    /// tensors disagree with the context's batch and step axes.
    pub fn new(
        decoder: &'a dyn Decoder,
        encoder_state: Array3<f32>,
        context: Context,
        max_steps: usize,
    ) -> Seq2SeqResult<Self> {
        context.validate_with_state(&encoder_state)?;
        let batch = context.batch_size();
        let state = if max_steps == 0 || batch == 0 {
            SearchState::Done
        } else {
            SearchState::Running
        };
        Ok(Self {
            decoder,
            encoder_state,
            context,
            max_steps,
            cancellation: CancellationToken::never(),
            state,
            step: 0,
            decoder_state: None,
            current_input: Array1::from_elem(batch, decoder.start_token_id()),
            finished: vec![false; batch],
            lengths: vec![0; batch],
            scores: vec![0.0; batch],
            outputs: Vec::new(),
        })
    }

    /// Attaches a cancellation token, checked before every step.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }

    pub fn state(&self) -> SearchState {
        self.state
    }

    pub fn is_done(&self) -> bool {
        self.state == SearchState::Done
    }

    /// Number of steps taken so far.
    pub fn steps_taken(&self) -> usize {
        self.step
    }

    pub fn max_steps(&self) -> usize {
        self.max_steps
    }

    pub fn finished(&self) -> &[bool] {
        &self.finished
    }

    pub fn lengths(&self) -> &[usize] {
        &self.lengths
    }

    /// Runs one decoder step. Returns `Ok(None)` once the search is `Done`.
    ///
    /// Any error (decoder failure, bad shapes, NaN logits, cancellation) also moves
    /// the search to `Done`.
    pub fn step(&mut self) -> Seq2SeqResult<Option<SearchStep>> {
        if self.state == SearchState::Done {
            return Ok(None);
        }
        match self.advance() {
            Ok(step) => Ok(Some(step)),
            Err(e) => {
                self.state = SearchState::Done;
                Err(e)
            }
        }
    }

    fn advance(&mut self) -> Seq2SeqResult<SearchStep> {
        self.cancellation.check()?;

        let batch = self.finished.len();
        let out = self.decoder.decode_step(
            self.encoder_state.view(),
            self.current_input.view(),
            &self.context,
            self.decoder_state.as_ref().map(|s| s.view()),
        )?;

        let vocab = self.decoder.vocab_size();
        ensure_shape("step logits", &[batch, vocab], out.logits.shape())?;
        let state_dim = out.state.dim();
        if state_dim.1 != batch {
            return Err(Seq2SeqError::shape_mismatch(
                "decoder state",
                &[state_dim.0, batch, state_dim.2],
                out.state.shape(),
            ));
        }

        let stop = self.decoder.stop_token_id();
        let pad = self.decoder.pad_token_id();
        let mut emitted = Array1::from_elem(batch, pad);
        let mut next_input = Array1::from_elem(batch, stop);

        for (b, row) in out.logits.axis_iter(Axis(0)).enumerate() {
            if self.finished[b] {
                continue;
            }
            let token = argmax(row).ok_or_else(|| {
                Seq2SeqError::Component(anyhow!(
                    "decoder '{}' produced NaN logits for example {} at step {}",
                    self.decoder.name(),
                    b,
                    self.step
                ))
            })? as u32;
            self.scores[b] += log_softmax_1d(row)[token as usize];
            emitted[b] = token;
            next_input[b] = token;
            if token == stop {
                self.finished[b] = true;
            } else {
                self.lengths[b] += 1;
            }
        }

        let step = self.step;
        self.step += 1;
        self.decoder_state = Some(out.state);
        self.current_input = next_input;
        self.outputs.push(emitted.clone());

        if self.finished.iter().all(|&f| f) {
            log::debug!("All {} examples finished after {} steps", batch, self.step);
            self.state = SearchState::Done;
        } else if self.step >= self.max_steps {
            log::debug!("Reached max steps ({})", self.max_steps);
            self.state = SearchState::Done;
        }

        Ok(SearchStep {
            step,
            tokens: emitted,
            finished: self.finished.clone(),
        })
    }

    /// Drives the search to exhaustion and assembles the generated sequences.
    pub fn finish(mut self) -> Seq2SeqResult<GreedyOutput> {
        while self.step()?.is_some() {}

        let batch = self.finished.len();
        let pad = self.decoder.pad_token_id();
        let longest = self.lengths.iter().copied().max().unwrap_or(0);
        let mut tokens = Array2::from_elem((batch, longest), pad);
        for (t, column) in self.outputs.iter().take(longest).enumerate() {
            for b in 0..batch {
                if t < self.lengths[b] {
                    tokens[[b, t]] = column[b];
                }
            }
        }

        log::info!(
            "Greedy search finished: {} examples, {} steps, longest {}",
            batch,
            self.step,
            longest
        );

        Ok(GreedyOutput {
            tokens,
            lengths: self.lengths,
            scores: self.scores,
            steps_taken: self.step,
        })
    }
}

impl Iterator for GreedySearch<'_> {
    type Item = Seq2SeqResult<SearchStep>;

    fn next(&mut self) -> Option<Self::Item> {
        self.step().transpose()
    }
}

impl std::fmt::Debug for GreedySearch<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GreedySearch")
            .field("decoder", &self.decoder.name())
            .field("state", &self.state)
            .field("step", &self.step)
            .field("max_steps", &self.max_steps)
            .field("finished", &self.finished)
            .finish()
    }
}
