use anyhow::{anyhow, Result};
use ndarray::{s, Array1, Array2, Array3, ArrayView1, ArrayView3, Axis};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use crate::components::{uniform_matrix, uniform_vector, Dropout};
use crate::encoder_decoder::{Encoder, EncoderOutput};

fn default_state_steps() -> usize {
    1
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedForwardEncoderConfig {
    pub input_dim: usize,
    pub hidden_size: usize,
    /// One summary vector per decoder layer.
    #[serde(default = "default_state_steps")]
    pub state_steps: usize,
    #[serde(default)]
    pub seed: u64,
    #[serde(default)]
    pub dropout: f32,
}

/// Position-wise `tanh(xW + b)` with a masked mean pooled into the summary state.
pub struct FeedForwardEncoder {
    config: FeedForwardEncoderConfig,
    w_in: Array2<f32>,
    b_in: Array1<f32>,
    /// One `[hidden, hidden]` projection per state step.
    state_proj: Vec<Array2<f32>>,
    dropout: Dropout,
}

impl FeedForwardEncoder {
    pub const NAME: &'static str = "feed_forward";

    pub fn new(config: FeedForwardEncoderConfig) -> Result<Self> {
        if config.input_dim == 0 || config.hidden_size == 0 {
            return Err(anyhow!(
                "feed_forward encoder needs non-zero input_dim and hidden_size, got {} and {}",
                config.input_dim,
                config.hidden_size
            ));
        }
        if config.state_steps == 0 {
            return Err(anyhow!("feed_forward encoder needs at least one state step"));
        }
        let dropout = Dropout::new(config.dropout, config.seed.wrapping_add(1));
        let mut encoder = Self {
            w_in: Array2::zeros((config.input_dim, config.hidden_size)),
            b_in: Array1::zeros(config.hidden_size),
            state_proj: Vec::new(),
            dropout,
            config,
        };
        encoder.initialize_parameters()?;
        Ok(encoder)
    }

    pub fn config(&self) -> &FeedForwardEncoderConfig {
        &self.config
    }
}

impl Encoder for FeedForwardEncoder {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn encode(
        &self,
        source_features: ArrayView3<f32>,
        source_lengths: ArrayView1<usize>,
    ) -> Result<EncoderOutput> {
        let (batch, steps, features) = source_features.dim();
        if features != self.config.input_dim {
            return Err(anyhow!(
                "feed_forward encoder expects {} input features, got {}",
                self.config.input_dim,
                features
            ));
        }
        if source_lengths.len() != batch {
            return Err(anyhow!(
                "expected {} source lengths, got {}",
                batch,
                source_lengths.len()
            ));
        }

        let hidden = self.config.hidden_size;
        let mut output = Array3::<f32>::zeros((batch, steps, hidden));
        let mut pooled = Array2::<f32>::zeros((batch, hidden));

        for b in 0..batch {
            let len = source_lengths[b].min(steps);
            if len == 0 {
                continue;
            }
            let x = source_features.slice(s![b, ..len, ..]);
            let mut h = x.dot(&self.w_in) + &self.b_in;
            h.mapv_inplace(f32::tanh);
            if let Some(mean) = h.mean_axis(Axis(0)) {
                pooled.row_mut(b).assign(&mean);
            }
            output.slice_mut(s![b, ..len, ..]).assign(&h);
        }
        self.dropout.apply(&mut output);

        let mut state = Array3::<f32>::zeros((self.config.state_steps, batch, hidden));
        for (l, proj) in self.state_proj.iter().enumerate() {
            let mut projected = pooled.dot(proj);
            projected.mapv_inplace(f32::tanh);
            state.index_axis_mut(Axis(0), l).assign(&projected);
        }

        Ok(EncoderOutput {
            encoder_output: output,
            encoder_state: state,
        })
    }

    fn initialize_parameters(&mut self) -> Result<()> {
        let mut rng = StdRng::seed_from_u64(self.config.seed);
        let hidden = self.config.hidden_size;
        self.w_in = uniform_matrix(&mut rng, self.config.input_dim, hidden);
        self.b_in = uniform_vector(&mut rng, hidden);
        self.state_proj = (0..self.config.state_steps)
            .map(|_| uniform_matrix(&mut rng, hidden, hidden))
            .collect();
        log::debug!(
            "Initialized feed_forward encoder: {} -> {} ({} state steps)",
            self.config.input_dim,
            hidden,
            self.config.state_steps
        );
        Ok(())
    }

    fn set_dropout(&mut self, rate: f32) {
        self.dropout.set_rate(rate);
    }

    fn hidden_size(&self) -> usize {
        self.config.hidden_size
    }

    fn state_steps(&self) -> usize {
        self.config.state_steps
    }
}
