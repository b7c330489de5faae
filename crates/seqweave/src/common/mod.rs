mod cancellation;
mod error;

pub use cancellation::{CancellationError, CancellationHandle, CancellationToken};
pub use error::{Seq2SeqError, Seq2SeqResult};
