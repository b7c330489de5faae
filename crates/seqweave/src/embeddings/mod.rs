//! Vocabulary and embedding construction.
//!
//! Builds one [`Vocab`] and one embedding table per requested feature column
//! and wraps them in an [`EmbeddingProducer`]: a single table when one feature
//! is requested, a concatenating composite when there are several.

mod dataset;
mod vocab;

pub use dataset::{Dataset, InMemoryDataset};
pub use vocab::{create_vocab, SpecialTokens, Vocab};

use ndarray::{concatenate, s, Array1, Array2, Array3, ArrayView2, Axis};
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::common::{Seq2SeqError, Seq2SeqResult};
use crate::components::uniform_matrix;

/// Which feature columns to embed and at what size, paired by position.
#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddingSpec {
    pub features: Vec<String>,
    pub dims: Vec<usize>,
}

impl Default for EmbeddingSpec {
    fn default() -> Self {
        Self {
            features: vec!["tokens".into()],
            dims: vec![300],
        }
    }
}

impl EmbeddingSpec {
    pub fn new(features: Vec<String>, dims: Vec<usize>) -> Self {
        Self { features, dims }
    }

    /// Rejects anything a positional zip would silently truncate or accept.
    pub fn validate(&self) -> Seq2SeqResult<()> {
        if self.features.is_empty() {
            return Err(Seq2SeqError::Configuration(
                "at least one feature is required".into(),
            ));
        }
        if self.features.len() != self.dims.len() {
            return Err(Seq2SeqError::Configuration(format!(
                "{} features ({}) but {} dims ({:?})",
                self.features.len(),
                self.features.join(", "),
                self.dims.len(),
                self.dims
            )));
        }
        if let Some((feature, _)) = self.pairs().find(|&(_, dim)| dim == 0) {
            return Err(Seq2SeqError::Configuration(format!(
                "embedding dim for '{}' must be positive",
                feature
            )));
        }
        Ok(())
    }

    pub fn pairs(&self) -> impl Iterator<Item = (&str, usize)> + '_ {
        self.features
            .iter()
            .map(String::as_str)
            .zip(self.dims.iter().copied())
    }
}

/// One feature's vocabulary and its embedding table.
#[derive(Debug, Clone)]
pub struct EmbeddingContext {
    vocab: Vocab,
    table: Array2<f32>,
}

impl EmbeddingContext {
    /// Uniformly initialized table with a zero row for the pad id.
    pub fn new(vocab: Vocab, dim: usize, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut table = uniform_matrix(&mut rng, vocab.len(), dim);
        if let Some(pad) = vocab.pad_id() {
            table.row_mut(pad as usize).fill(0.0);
        }
        Self { vocab, table }
    }

    pub fn vocab(&self) -> &Vocab {
        &self.vocab
    }

    pub fn table(&self) -> ArrayView2<f32> {
        self.table.view()
    }

    pub fn dim(&self) -> usize {
        self.table.ncols()
    }

    /// Shape: `[ids.len(), dim]`.
    pub fn embed_ids(&self, ids: &[u32]) -> Array2<f32> {
        let indices: Vec<usize> = ids.iter().map(|&id| id as usize).collect();
        self.table.select(Axis(0), &indices)
    }

    pub fn embed(&self, tokens: &[String]) -> Seq2SeqResult<Array2<f32>> {
        Ok(self.embed_ids(&self.vocab.encode(tokens)?))
    }
}

/// Several per-feature tables whose vectors are concatenated in order.
#[derive(Debug, Clone)]
pub struct MultiEmbeddingContext {
    parts: Vec<EmbeddingContext>,
}

impl MultiEmbeddingContext {
    pub fn new(parts: Vec<EmbeddingContext>) -> Seq2SeqResult<Self> {
        if parts.is_empty() {
            return Err(Seq2SeqError::Configuration(
                "a composite embedding needs at least one feature".into(),
            ));
        }
        Ok(Self { parts })
    }

    pub fn parts(&self) -> &[EmbeddingContext] {
        &self.parts
    }

    pub fn dim(&self) -> usize {
        self.parts.iter().map(EmbeddingContext::dim).sum()
    }

    /// `columns[i]` holds the tokens of feature `i`; all columns must have the same length.
    pub fn embed(&self, columns: &[&[String]]) -> Seq2SeqResult<Array2<f32>> {
        if columns.len() != self.parts.len() {
            return Err(Seq2SeqError::Configuration(format!(
                "expected {} feature columns, got {}",
                self.parts.len(),
                columns.len()
            )));
        }
        let steps = columns.first().map_or(0, |c| c.len());
        let mut pieces = Vec::with_capacity(self.parts.len());
        for (part, column) in self.parts.iter().zip(columns) {
            if column.len() != steps {
                return Err(Seq2SeqError::ShapeMismatch {
                    field: format!("feature '{}'", part.vocab().feature()),
                    expected: format!("{} tokens", steps),
                    actual: format!("{} tokens", column.len()),
                });
            }
            pieces.push(part.embed(column)?);
        }
        let views: Vec<_> = pieces.iter().map(|p| p.view()).collect();
        concatenate(Axis(1), &views).map_err(|e| Seq2SeqError::Component(e.into()))
    }
}

#[derive(Debug, Clone)]
pub enum EmbeddingProducer {
    Single(EmbeddingContext),
    Multi(MultiEmbeddingContext),
}

impl EmbeddingProducer {
    /// Width of one embedded position.
    pub fn output_dim(&self) -> usize {
        match self {
            EmbeddingProducer::Single(ctx) => ctx.dim(),
            EmbeddingProducer::Multi(multi) => multi.dim(),
        }
    }

    pub fn contexts(&self) -> &[EmbeddingContext] {
        match self {
            EmbeddingProducer::Single(ctx) => std::slice::from_ref(ctx),
            EmbeddingProducer::Multi(multi) => multi.parts(),
        }
    }

    pub fn features(&self) -> Vec<&str> {
        self.contexts().iter().map(|c| c.vocab().feature()).collect()
    }

    pub fn vocab(&self, feature: &str) -> Option<&Vocab> {
        self.contexts()
            .iter()
            .map(EmbeddingContext::vocab)
            .find(|v| v.feature() == feature)
    }

    /// The vocabulary of the first feature, the one generation targets.
    pub fn primary_vocab(&self) -> &Vocab {
        match self {
            EmbeddingProducer::Single(ctx) => ctx.vocab(),
            EmbeddingProducer::Multi(multi) => multi.parts[0].vocab(),
        }
    }

    /// Embeds one dataset row. Shape: `[steps, output_dim]`.
    pub fn embed_row(&self, dataset: &dyn Dataset, index: usize) -> Seq2SeqResult<Array2<f32>> {
        let mut columns = Vec::new();
        for feature in self.features() {
            let tokens = dataset.tokens(index, feature).ok_or_else(|| {
                Seq2SeqError::Configuration(format!("row {} has no '{}' column", index, feature))
            })?;
            columns.push(tokens);
        }
        match self {
            EmbeddingProducer::Single(ctx) => ctx.embed(columns[0]),
            EmbeddingProducer::Multi(multi) => multi.embed(&columns),
        }
    }

    /// Embeds several rows into a zero-padded batch.
    ///
    /// Returns `[rows.len(), longest, output_dim]` features and the per-row lengths.
    pub fn embed_batch(
        &self,
        dataset: &dyn Dataset,
        rows: &[usize],
    ) -> Seq2SeqResult<(Array3<f32>, Array1<usize>)> {
        let embedded = rows
            .iter()
            .map(|&i| self.embed_row(dataset, i))
            .collect::<Seq2SeqResult<Vec<_>>>()?;
        let longest = embedded.iter().map(|e| e.nrows()).max().unwrap_or(0);
        let mut features = Array3::zeros((rows.len(), longest, self.output_dim()));
        for (b, e) in embedded.iter().enumerate() {
            features.slice_mut(s![b, ..e.nrows(), ..]).assign(e);
        }
        let lengths = embedded.iter().map(|e| e.nrows()).collect();
        Ok((features, lengths))
    }
}

/// Builds a vocabulary and an embedding table for every requested feature.
///
/// One feature gives [`EmbeddingProducer::Single`]; several give
/// [`EmbeddingProducer::Multi`] concatenating in the order requested. Table `i`
/// is seeded with `seed + i`.
pub fn build_embeddings(
    dataset: &dyn Dataset,
    spec: &EmbeddingSpec,
    specials: &SpecialTokens,
    seed: u64,
) -> Seq2SeqResult<EmbeddingProducer> {
    spec.validate()?;

    let mut contexts = Vec::with_capacity(spec.features.len());
    for (i, (feature, dim)) in spec.pairs().enumerate() {
        let vocab = create_vocab(dataset, feature, specials)?;
        log::info!(
            "Feature '{}': {} vocabulary entries, {} dims",
            feature,
            vocab.len(),
            dim
        );
        contexts.push(EmbeddingContext::new(vocab, dim, seed.wrapping_add(i as u64)));
    }

    if contexts.len() == 1 {
        Ok(EmbeddingProducer::Single(contexts.remove(0)))
    } else {
        Ok(EmbeddingProducer::Multi(MultiEmbeddingContext::new(contexts)?))
    }
}

#[cfg(test)]
mod tests;
