use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::common::{Seq2SeqError, Seq2SeqResult};
use crate::embeddings::dataset::Dataset;

fn default_pad() -> Option<String> {
    Some("<pad>".into())
}

fn default_unknown() -> Option<String> {
    Some("<unk>".into())
}

fn default_start() -> Option<String> {
    Some("<s>".into())
}

fn default_stop() -> Option<String> {
    Some("</s>".into())
}

/// Reserved symbols. Configured ones take the first ids, in field order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpecialTokens {
    #[serde(default = "default_pad")]
    pub pad: Option<String>,
    #[serde(default = "default_unknown")]
    pub unknown: Option<String>,
    #[serde(default = "default_start")]
    pub start: Option<String>,
    #[serde(default = "default_stop")]
    pub stop: Option<String>,
}

impl Default for SpecialTokens {
    fn default() -> Self {
        Self {
            pad: default_pad(),
            unknown: default_unknown(),
            start: default_start(),
            stop: default_stop(),
        }
    }
}

impl SpecialTokens {
    pub fn none() -> Self {
        Self {
            pad: None,
            unknown: None,
            start: None,
            stop: None,
        }
    }

    fn in_order(&self) -> [Option<&str>; 4] {
        [
            self.pad.as_deref(),
            self.unknown.as_deref(),
            self.start.as_deref(),
            self.stop.as_deref(),
        ]
    }
}

/// A deterministic token <-> id mapping for one feature column.
#[derive(Debug, Clone, PartialEq)]
pub struct Vocab {
    feature: String,
    tokens: Vec<String>,
    index: HashMap<String, u32>,
    pad_id: Option<u32>,
    unknown_id: Option<u32>,
    start_id: Option<u32>,
    stop_id: Option<u32>,
}

impl Vocab {
    /// Builds a vocabulary from token sequences.
    ///
    /// Specials come first, then tokens by descending count with ties in
    /// lexicographic order.
    pub fn build<'a>(
        feature: impl Into<String>,
        sequences: impl IntoIterator<Item = &'a [String]>,
        specials: &SpecialTokens,
    ) -> Self {
        let mut vocab = Self {
            feature: feature.into(),
            tokens: Vec::new(),
            index: HashMap::new(),
            pad_id: None,
            unknown_id: None,
            start_id: None,
            stop_id: None,
        };

        let [pad, unknown, start, stop] = specials.in_order().map(|t| t.map(|t| vocab.insert(t)));
        vocab.pad_id = pad;
        vocab.unknown_id = unknown;
        vocab.start_id = start;
        vocab.stop_id = stop;

        let mut counts: HashMap<&str, usize> = HashMap::new();
        for sequence in sequences {
            for token in sequence {
                *counts.entry(token.as_str()).or_insert(0) += 1;
            }
        }
        let mut ranked: Vec<(&str, usize)> = counts
            .into_iter()
            .filter(|(token, _)| !vocab.index.contains_key(*token))
            .collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        for (token, _) in ranked {
            vocab.insert(token);
        }
        vocab
    }

    fn insert(&mut self, token: &str) -> u32 {
        if let Some(&id) = self.index.get(token) {
            return id;
        }
        let id = self.tokens.len() as u32;
        self.tokens.push(token.to_string());
        self.index.insert(token.to_string(), id);
        id
    }

    pub fn feature(&self) -> &str {
        &self.feature
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn token_to_id(&self, token: &str) -> Option<u32> {
        self.index.get(token).copied()
    }

    pub fn id_to_token(&self, id: u32) -> Option<&str> {
        self.tokens.get(id as usize).map(String::as_str)
    }

    /// Like [`token_to_id`](Self::token_to_id) but falls back to the unknown id.
    pub fn lookup(&self, token: &str) -> Seq2SeqResult<u32> {
        self.token_to_id(token)
            .or(self.unknown_id)
            .ok_or_else(|| {
                Seq2SeqError::Configuration(format!(
                    "token '{}' is not in the '{}' vocabulary and no unknown token is configured",
                    token, self.feature
                ))
            })
    }

    pub fn encode(&self, tokens: &[String]) -> Seq2SeqResult<Vec<u32>> {
        tokens.iter().map(|t| self.lookup(t)).collect()
    }

    /// Maps ids back to tokens; ids outside the vocabulary render as `?`.
    pub fn decode(&self, ids: &[u32]) -> Vec<&str> {
        ids.iter()
            .map(|&id| self.id_to_token(id).unwrap_or("?"))
            .collect()
    }

    pub fn pad_id(&self) -> Option<u32> {
        self.pad_id
    }

    pub fn unknown_id(&self) -> Option<u32> {
        self.unknown_id
    }

    pub fn start_id(&self) -> Option<u32> {
        self.start_id
    }

    pub fn stop_id(&self) -> Option<u32> {
        self.stop_id
    }
}

/// Builds the vocabulary of `feature` over every row of `dataset`.
pub fn create_vocab(
    dataset: &dyn Dataset,
    feature: &str,
    specials: &SpecialTokens,
) -> Seq2SeqResult<Vocab> {
    if !dataset.has_column(feature) {
        return Err(Seq2SeqError::Configuration(format!(
            "feature '{}' is not a column of the dataset",
            feature
        )));
    }
    let sequences = (0..dataset.len()).filter_map(|i| dataset.tokens(i, feature));
    let vocab = Vocab::build(feature, sequences, specials);
    log::debug!("Built '{}' vocabulary with {} entries", feature, vocab.len());
    Ok(vocab)
}
