use anyhow::{anyhow, Result};
use ndarray::{concatenate, s, Array1, Array2, Array3, ArrayView1, ArrayView2, ArrayView3, Axis};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use crate::components::{uniform_matrix, uniform_vector, Dropout};
use crate::encoder_decoder::{Context, Decoder, DecoderOutput, StepOutput};
use crate::ops::masked_softmax_inplace;

fn default_num_layers() -> usize {
    1
}

fn default_pad_token_id() -> u32 {
    0
}

fn default_start_token_id() -> u32 {
    2
}

fn default_stop_token_id() -> u32 {
    3
}

/// Token ids default to the vocabulary layout `pad, unk, start, stop`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RnnDecoderConfig {
    pub vocab_size: usize,
    pub embedding_dim: usize,
    pub hidden_size: usize,
    #[serde(default = "default_num_layers")]
    pub num_layers: usize,
    #[serde(default = "default_pad_token_id")]
    pub pad_token_id: u32,
    #[serde(default = "default_start_token_id")]
    pub start_token_id: u32,
    #[serde(default = "default_stop_token_id")]
    pub stop_token_id: u32,
    /// Weight of the attention-driven copy distribution added to the logits.
    /// Only used when the context carries a `source_vocab_map`.
    #[serde(default)]
    pub copy_weight: f32,
    #[serde(default)]
    pub seed: u64,
    #[serde(default)]
    pub dropout: f32,
}

struct RnnLayer {
    w_x: Array2<f32>,
    w_h: Array2<f32>,
    bias: Array1<f32>,
}

/// Stacked Elman decoder with dot-product attention over the encoder output.
pub struct RnnDecoder {
    config: RnnDecoderConfig,
    embeddings: Array2<f32>,
    layers: Vec<RnnLayer>,
    w_out: Array2<f32>,
    b_out: Array1<f32>,
    dropout: Dropout,
}

impl RnnDecoder {
    pub const NAME: &'static str = "rnn";

    pub fn new(config: RnnDecoderConfig) -> Result<Self> {
        if config.vocab_size == 0 || config.embedding_dim == 0 || config.hidden_size == 0 {
            return Err(anyhow!(
                "rnn decoder needs non-zero vocab_size, embedding_dim and hidden_size"
            ));
        }
        if config.num_layers == 0 {
            return Err(anyhow!("rnn decoder needs at least one layer"));
        }
        for (label, id) in [
            ("pad_token_id", config.pad_token_id),
            ("start_token_id", config.start_token_id),
            ("stop_token_id", config.stop_token_id),
        ] {
            if id as usize >= config.vocab_size {
                return Err(anyhow!(
                    "{} {} is outside the vocabulary of {}",
                    label,
                    id,
                    config.vocab_size
                ));
            }
        }
        let dropout = Dropout::new(config.dropout, config.seed.wrapping_add(1));
        let mut decoder = Self {
            embeddings: Array2::zeros((config.vocab_size, config.embedding_dim)),
            layers: Vec::new(),
            w_out: Array2::zeros((2 * config.hidden_size, config.vocab_size)),
            b_out: Array1::zeros(config.vocab_size),
            dropout,
            config,
        };
        decoder.initialize_parameters()?;
        Ok(decoder)
    }

    pub fn config(&self) -> &RnnDecoderConfig {
        &self.config
    }

    fn initial_state(
        &self,
        encoder_state: ArrayView3<f32>,
        prior_state: Option<ArrayView3<f32>>,
        batch: usize,
    ) -> Result<Array3<f32>> {
        let state = match prior_state {
            Some(prior) => prior.to_owned(),
            None => encoder_state.to_owned(),
        };
        let expected = [self.config.num_layers, batch, self.config.hidden_size];
        if state.shape() != &expected[..] {
            return Err(anyhow!(
                "rnn decoder state must be {:?}, got {:?}",
                expected,
                state.shape()
            ));
        }
        Ok(state)
    }

    /// Runs every layer on one step of input, then attends and projects.
    fn step(
        &self,
        input: ArrayView2<f32>,
        state: &Array3<f32>,
        context: &Context,
    ) -> Result<(Array2<f32>, Array3<f32>)> {
        let mut next_state = Array3::zeros(state.raw_dim());
        let mut x = input.to_owned();
        for (l, layer) in self.layers.iter().enumerate() {
            let prev = state.index_axis(Axis(0), l);
            let mut h = x.dot(&layer.w_x) + prev.dot(&layer.w_h) + &layer.bias;
            h.mapv_inplace(f32::tanh);
            next_state.index_axis_mut(Axis(0), l).assign(&h);
            x = h;
        }
        self.dropout.apply(&mut x);

        let (attn, attended) = self.attend(x.view(), context)?;
        let features = concatenate(Axis(1), &[x.view(), attended.view()])?;
        let mut logits = features.dot(&self.w_out) + &self.b_out;

        if self.config.copy_weight != 0.0 {
            if let Some(vmap) = &context.source_vocab_map {
                let vocab = vmap.dim().2;
                if vocab != self.config.vocab_size {
                    return Err(anyhow!(
                        "source_vocab_map covers {} ids but the decoder vocabulary has {}",
                        vocab,
                        self.config.vocab_size
                    ));
                }
                for (b, mut row) in logits.axis_iter_mut(Axis(0)).enumerate() {
                    let copy = attn.row(b).dot(&vmap.index_axis(Axis(0), b));
                    row.scaled_add(self.config.copy_weight, &copy);
                }
            }
        }

        Ok((logits, next_state))
    }

    /// Returns `(weights [batch, source_steps], attended [batch, hidden])`.
    fn attend(&self, query: ArrayView2<f32>, context: &Context) -> Result<(Array2<f32>, Array2<f32>)> {
        let (batch, steps, hidden) = context.encoder_output.dim();
        if hidden != self.config.hidden_size || query.nrows() != batch {
            return Err(anyhow!(
                "cannot attend over encoder output {:?} with query {:?}",
                context.encoder_output.shape(),
                query.shape()
            ));
        }
        let mut weights = Array2::<f32>::zeros((batch, steps));
        let mut attended = Array2::<f32>::zeros((batch, hidden));
        for b in 0..batch {
            let memory = context.encoder_output.index_axis(Axis(0), b);
            let mut scores = memory.dot(&query.row(b));
            let mask = context.source_mask.as_ref().map(|m| m.row(b));
            masked_softmax_inplace(scores.view_mut(), mask);
            attended.row_mut(b).assign(&scores.dot(&memory));
            weights.row_mut(b).assign(&scores);
        }
        Ok((weights, attended))
    }
}

impl Decoder for RnnDecoder {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn decode(
        &self,
        encoder_state: ArrayView3<f32>,
        target_features: ArrayView3<f32>,
        context: &Context,
        prior_state: Option<ArrayView3<f32>>,
    ) -> Result<DecoderOutput> {
        let (batch, steps, features) = target_features.dim();
        if features != self.config.embedding_dim {
            return Err(anyhow!(
                "rnn decoder expects {} target features, got {}",
                self.config.embedding_dim,
                features
            ));
        }
        let mut state = self.initial_state(encoder_state, prior_state, batch)?;
        let mut logits = Array3::<f32>::zeros((batch, steps, self.config.vocab_size));
        for t in 0..steps {
            let (step_logits, next) = self.step(target_features.slice(s![.., t, ..]), &state, context)?;
            logits.slice_mut(s![.., t, ..]).assign(&step_logits);
            state = next;
        }
        Ok(DecoderOutput {
            logits,
            state: Some(state),
        })
    }

    fn decode_step(
        &self,
        encoder_state: ArrayView3<f32>,
        input_tokens: ArrayView1<u32>,
        context: &Context,
        prior_state: Option<ArrayView3<f32>>,
    ) -> Result<StepOutput> {
        let ids: Vec<usize> = input_tokens.iter().map(|&t| t as usize).collect();
        if let Some(&bad) = ids.iter().find(|&&id| id >= self.config.vocab_size) {
            return Err(anyhow!(
                "token id {} is outside the vocabulary of {}",
                bad,
                self.config.vocab_size
            ));
        }
        let state = self.initial_state(encoder_state, prior_state, ids.len())?;
        let input = self.embeddings.select(Axis(0), &ids);
        let (logits, state) = self.step(input.view(), &state, context)?;
        Ok(StepOutput { logits, state })
    }

    fn initialize_parameters(&mut self) -> Result<()> {
        let mut rng = StdRng::seed_from_u64(self.config.seed);
        let hidden = self.config.hidden_size;
        self.embeddings = uniform_matrix(&mut rng, self.config.vocab_size, self.config.embedding_dim);
        self.embeddings
            .row_mut(self.config.pad_token_id as usize)
            .fill(0.0);
        self.layers = (0..self.config.num_layers)
            .map(|l| {
                let input_dim = if l == 0 { self.config.embedding_dim } else { hidden };
                RnnLayer {
                    w_x: uniform_matrix(&mut rng, input_dim, hidden),
                    w_h: uniform_matrix(&mut rng, hidden, hidden),
                    bias: uniform_vector(&mut rng, hidden),
                }
            })
            .collect();
        self.w_out = uniform_matrix(&mut rng, 2 * hidden, self.config.vocab_size);
        self.b_out = uniform_vector(&mut rng, self.config.vocab_size);
        log::debug!(
            "Initialized rnn decoder: {} layers, hidden {}, vocab {}",
            self.config.num_layers,
            hidden,
            self.config.vocab_size
        );
        Ok(())
    }

    fn set_dropout(&mut self, rate: f32) {
        self.dropout.set_rate(rate);
    }

    fn hidden_size(&self) -> usize {
        self.config.hidden_size
    }

    fn num_layers(&self) -> usize {
        self.config.num_layers
    }

    fn vocab_size(&self) -> usize {
        self.config.vocab_size
    }

    fn start_token_id(&self) -> u32 {
        self.config.start_token_id
    }

    fn stop_token_id(&self) -> u32 {
        self.config.stop_token_id
    }

    fn pad_token_id(&self) -> u32 {
        self.config.pad_token_id
    }
}
