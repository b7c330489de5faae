//! Multi-reference batch expansion.
//!
//! One encoder pass can serve several target references per source: every
//! batch-indexed tensor is replicated so that reference `r` of example `b`
//! sits at batch position `b * max_refs + r`.

use ndarray::{Array3, Axis};

use crate::common::{Seq2SeqError, Seq2SeqResult};
use crate::encoder_decoder::context::Context;
use crate::ops::{ensure_shape, repeat_interleave};

/// Replicates `encoder_state` and the batch-indexed context tensors `max_refs` times.
///
/// The summary state carries its batch on axis 1 (`[steps, batch, hidden]`), while
/// every context tensor carries it on axis 0. A new bundle is returned; `context`
/// is left untouched.
///
/// Expansion of `controls` is not supported: a context carrying controls fails with
/// `UnsupportedFeature` whenever `max_refs > 1`.
pub fn expand_for_references(
    encoder_state: &Array3<f32>,
    context: &Context,
    max_refs: usize,
) -> Seq2SeqResult<(Context, Array3<f32>)> {
    if max_refs == 0 {
        return Err(Seq2SeqError::Configuration(
            "max_references must be at least 1".to_string(),
        ));
    }
    if max_refs == 1 {
        return Ok((context.clone(), encoder_state.clone()));
    }
    if context.controls.is_some() {
        return Err(Seq2SeqError::UnsupportedFeature(
            "Controls for multi-reference not implemented".to_string(),
        ));
    }

    let (steps, batch, hidden) = encoder_state.dim();
    let (_, src_steps, enc_hidden) = context.encoder_output.dim();
    ensure_shape(
        "encoder_output",
        &[batch, src_steps, enc_hidden],
        context.encoder_output.shape(),
    )?;
    context.validate()?;

    log::debug!(
        "Expanding batch of {} for {} references (state steps {}, hidden {})",
        batch,
        max_refs,
        steps,
        hidden
    );

    let expanded = Context {
        encoder_output: repeat_interleave(&context.encoder_output, Axis(0), max_refs),
        source_mask: context
            .source_mask
            .as_ref()
            .map(|mask| repeat_interleave(mask, Axis(0), max_refs)),
        source_vocab_map: context
            .source_vocab_map
            .as_ref()
            .map(|vmap| repeat_interleave(vmap, Axis(0), max_refs)),
        controls: None,
    };
    let state = repeat_interleave(encoder_state, Axis(1), max_refs);

    Ok((expanded, state))
}
