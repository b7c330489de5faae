//! Vocabulary and embedding construction command.

use std::path::Path;

use anyhow::{anyhow, Result};
use seqweave::embeddings::{build_embeddings, EmbeddingProducer, EmbeddingSpec, InMemoryDataset, SpecialTokens};

/// Reserved symbols given on the command line; unset ones keep their defaults.
#[derive(Debug, Default)]
pub struct SpecialOverrides {
    pub pad: Option<String>,
    pub unknown: Option<String>,
    pub start: Option<String>,
    pub stop: Option<String>,
}

impl SpecialOverrides {
    fn apply(self, mut specials: SpecialTokens) -> SpecialTokens {
        if let Some(pad) = self.pad {
            specials.pad = Some(pad);
        }
        if let Some(unknown) = self.unknown {
            specials.unknown = Some(unknown);
        }
        if let Some(start) = self.start {
            specials.start = Some(start);
        }
        if let Some(stop) = self.stop {
            specials.stop = Some(stop);
        }
        specials
    }
}

pub fn run(
    dataset_path: &Path,
    features: Vec<String>,
    dims: Vec<usize>,
    overrides: SpecialOverrides,
    seed: u64,
    top: usize,
    format: &str,
) -> Result<()> {
    if format != "text" && format != "json" {
        return Err(anyhow!("Unknown format: '{}'. Use: text, json", format));
    }

    let spec = EmbeddingSpec::new(features, dims);
    // fail on a bad pairing before touching the dataset
    spec.validate()?;

    let dataset = InMemoryDataset::from_jsonl(dataset_path)?;
    let specials = overrides.apply(SpecialTokens::default());
    let producer = build_embeddings(&dataset, &spec, &specials, seed)?;

    match format {
        "json" => print_json(&producer, top)?,
        _ => print_text(&producer, top),
    }
    Ok(())
}

fn kind(producer: &EmbeddingProducer) -> &'static str {
    match producer {
        EmbeddingProducer::Single(_) => "single",
        EmbeddingProducer::Multi(_) => "composite",
    }
}

fn top_tokens(producer: &EmbeddingProducer, feature_index: usize, top: usize) -> Vec<String> {
    let vocab = producer.contexts()[feature_index].vocab();
    (0..vocab.len() as u32)
        .filter(|&id| {
            Some(id) != vocab.pad_id()
                && Some(id) != vocab.unknown_id()
                && Some(id) != vocab.start_id()
                && Some(id) != vocab.stop_id()
        })
        .take(top)
        .filter_map(|id| vocab.id_to_token(id).map(str::to_string))
        .collect()
}

fn print_text(producer: &EmbeddingProducer, top: usize) {
    for (i, ctx) in producer.contexts().iter().enumerate() {
        println!(
            "{:<12} {:>8} entries  dim {:>5}  top: {}",
            ctx.vocab().feature(),
            ctx.vocab().len(),
            ctx.dim(),
            top_tokens(producer, i, top).join(" ")
        );
    }
    println!(
        "producer: {} (output dim {})",
        kind(producer),
        producer.output_dim()
    );
}

fn print_json(producer: &EmbeddingProducer, top: usize) -> Result<()> {
    let features: Vec<_> = producer
        .contexts()
        .iter()
        .enumerate()
        .map(|(i, ctx)| {
            serde_json::json!({
                "feature": ctx.vocab().feature(),
                "size": ctx.vocab().len(),
                "dim": ctx.dim(),
                "top": top_tokens(producer, i, top),
            })
        })
        .collect();
    let output = serde_json::json!({
        "producer": kind(producer),
        "output_dim": producer.output_dim(),
        "features": features,
    });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
