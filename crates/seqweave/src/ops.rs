//! Small tensor helpers shared by the orchestrator, the search and the reference components.

use ndarray::{Array, Array1, ArrayBase, ArrayView1, ArrayViewMut1, Axis, Data, RemoveAxis};

use crate::common::{Seq2SeqError, Seq2SeqResult};

/// Repeats every slice along `axis` `times` times, keeping the copies of one slice adjacent.
///
/// `[a, b]` repeated twice along axis 0 becomes `[a, a, b, b]`.
pub fn repeat_interleave<A, S, D>(x: &ArrayBase<S, D>, axis: Axis, times: usize) -> Array<A, D>
where
    A: Clone,
    S: Data<Elem = A>,
    D: RemoveAxis,
{
    debug_assert!(times > 0, "repeat_interleave needs at least one copy");
    let len = x.len_of(axis);
    if len == 0 || times == 1 {
        return x.to_owned();
    }
    let indices: Vec<usize> = (0..len)
        .flat_map(|i| std::iter::repeat(i).take(times))
        .collect();
    x.select(axis, &indices)
}

/// Fails with `ShapeMismatch` unless `actual` equals `expected`.
pub fn ensure_shape(field: &str, expected: &[usize], actual: &[usize]) -> Seq2SeqResult<()> {
    if expected != actual {
        return Err(Seq2SeqError::shape_mismatch(field, expected, actual));
    }
    Ok(())
}

/// Index of the largest value; the first one wins on ties.
///
/// `None` when `values` is empty or holds a NaN.
pub fn argmax(values: ArrayView1<f32>) -> Option<usize> {
    let mut best = None;
    let mut best_val = f32::NEG_INFINITY;
    for (i, &v) in values.iter().enumerate() {
        if v.is_nan() {
            return None;
        }
        if best.is_none() || v > best_val {
            best = Some(i);
            best_val = v;
        }
    }
    best
}

pub fn log_softmax_1d(logits: ArrayView1<f32>) -> Array1<f32> {
    let max_val = logits.fold(f32::NEG_INFINITY, |acc, &x| acc.max(x));
    let scaled = logits.mapv(|x| x - max_val);
    let exp_sum = scaled.mapv(f32::exp).sum();
    scaled - exp_sum.ln()
}

/// Softmax over `scores`, ignoring positions where `mask` is zero.
///
/// A row with every position masked comes back all zeros.
pub fn masked_softmax_inplace(mut scores: ArrayViewMut1<f32>, mask: Option<ArrayView1<f32>>) {
    if let Some(mask) = mask {
        scores.zip_mut_with(&mask, |s, &m| {
            if m == 0.0 {
                *s = f32::NEG_INFINITY;
            }
        });
    }
    let max = scores.fold(f32::NEG_INFINITY, |a, &b| a.max(b));
    if max == f32::NEG_INFINITY {
        scores.fill(0.0);
        return;
    }
    scores.mapv_inplace(|x| (x - max).exp());
    let sum = scores.sum();
    if sum > 0.0 {
        scores /= sum;
    }
}
