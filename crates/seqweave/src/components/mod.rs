//! Reference encoder and decoder implementations.
//!
//! These are small, fully CPU, `ndarray`-based components registered under a
//! name in [`crate::registry`]. They exist so that a model can be built from
//! configuration and run end to end; the orchestrator itself only sees the
//! [`Encoder`](crate::encoder_decoder::Encoder) and
//! [`Decoder`](crate::encoder_decoder::Decoder) traits.

mod feed_forward;
mod rnn;

pub use feed_forward::{FeedForwardEncoder, FeedForwardEncoderConfig};
pub use rnn::{RnnDecoder, RnnDecoderConfig};

use std::sync::Mutex;

use ndarray::{Array, Array1, Array2, Dimension};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Uniform init range for weights.
pub(crate) const INIT_SCALE: f32 = 0.1;

pub(crate) fn uniform_matrix(rng: &mut StdRng, rows: usize, cols: usize) -> Array2<f32> {
    Array2::from_shape_fn((rows, cols), |_| rng.gen_range(-INIT_SCALE..INIT_SCALE))
}

pub(crate) fn uniform_vector(rng: &mut StdRng, len: usize) -> Array1<f32> {
    Array1::from_shape_fn(len, |_| rng.gen_range(-INIT_SCALE..INIT_SCALE))
}

/// Inverted dropout with its own seeded RNG.
///
/// The RNG sits behind a `Mutex` so that forward passes can take `&self`.
pub(crate) struct Dropout {
    rate: f32,
    rng: Mutex<StdRng>,
}

impl Dropout {
    pub fn new(rate: f32, seed: u64) -> Self {
        Self {
            rate,
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    pub fn set_rate(&mut self, rate: f32) {
        self.rate = rate;
    }

    pub fn apply<D: Dimension>(&self, x: &mut Array<f32, D>) {
        if self.rate <= 0.0 {
            return;
        }
        let keep = 1.0 - self.rate;
        let mut rng = self.rng.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        x.mapv_inplace(|v| {
            if rng.gen::<f32>() < keep {
                v / keep
            } else {
                0.0
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array3;

    #[test]
    fn test_zero_rate_is_identity() {
        let dropout = Dropout::new(0.0, 1);
        let mut x = Array3::from_elem((2, 3, 4), 2.0);
        dropout.apply(&mut x);
        assert!(x.iter().all(|&v| v == 2.0));
    }

    #[test]
    fn test_dropout_zeroes_and_rescales() {
        let dropout = Dropout::new(0.5, 7);
        let mut x = Array2::from_elem((50, 50), 1.0);
        dropout.apply(&mut x);
        assert!(x.iter().all(|&v| v == 0.0 || (v - 2.0).abs() < 1e-6));
        let dropped = x.iter().filter(|&&v| v == 0.0).count();
        assert!(dropped > 1000 && dropped < 1500, "dropped {}", dropped);
    }

    #[test]
    fn test_uniform_matrix_is_seeded() {
        let a = uniform_matrix(&mut StdRng::seed_from_u64(3), 4, 5);
        let b = uniform_matrix(&mut StdRng::seed_from_u64(3), 4, 5);
        assert_eq!(a, b);
        assert!(a.iter().all(|v| v.abs() <= INIT_SCALE));
    }
}
