//! Greedy decoding over a dataset with a model built from config.

use std::path::Path;

use anyhow::{anyhow, Result};
use seqweave::config_loader::load_config;
use seqweave::embeddings::{build_embeddings, Dataset, InMemoryDataset};
use seqweave::encoder_decoder::{EncoderDecoderModel, Seq2SeqInputs};

pub fn run(
    dataset_path: &Path,
    config_path: Option<&Path>,
    max_steps: Option<usize>,
    batch_size: usize,
    format: &str,
) -> Result<()> {
    if format != "text" && format != "json" {
        return Err(anyhow!("Unknown format: '{}'. Use: text, json", format));
    }
    if batch_size == 0 {
        return Err(anyhow!("--batch-size must be at least 1"));
    }

    let mut config = load_config(config_path)?;
    let dataset = InMemoryDataset::from_jsonl(dataset_path)?;

    let embeddings = &config.embeddings;
    let producer = build_embeddings(
        &dataset,
        &embeddings.spec(),
        &embeddings.special_tokens,
        embeddings.seed,
    )?;

    // generation targets the first feature's vocabulary
    let vocab = producer.primary_vocab();
    let (start, stop) = match (vocab.start_id(), vocab.stop_id()) {
        (Some(start), Some(stop)) => (start, stop),
        _ => {
            return Err(anyhow!(
                "decoding needs start and stop tokens in the '{}' vocabulary",
                vocab.feature()
            ))
        }
    };
    let pad = vocab.pad_id().unwrap_or(stop);

    config
        .model
        .encoder
        .set_default_param("input_dim", producer.output_dim() as i64);
    let decoder = &mut config.model.decoder;
    decoder.set_default_param("vocab_size", vocab.len() as i64);
    decoder.set_default_param("start_token_id", i64::from(start));
    decoder.set_default_param("stop_token_id", i64::from(stop));
    decoder.set_default_param("pad_token_id", i64::from(pad));

    let mut model = EncoderDecoderModel::from_config(&config.model)?;
    model.initialize_parameters()?;
    model.set_dropout(config.generation.dropout)?;

    let max_steps = max_steps.unwrap_or(config.generation.max_steps);
    let rows: Vec<usize> = (0..dataset.len()).collect();
    let mut results = Vec::with_capacity(rows.len());

    for chunk in rows.chunks(batch_size) {
        let (features, lengths) = producer.embed_batch(&dataset, chunk)?;
        let inputs = Seq2SeqInputs::with_length_mask(features, lengths);
        let output = model.greedy_decode(&inputs, max_steps)?.finish()?;
        for (b, &row) in chunk.iter().enumerate() {
            results.push((row, output.sequence(b), output.scores[b]));
        }
    }

    for (row, ids, score) in &results {
        let tokens = vocab.decode(ids);
        match format {
            "json" => {
                let line = serde_json::json!({
                    "row": row,
                    "ids": ids,
                    "tokens": tokens,
                    "score": score,
                });
                println!("{}", serde_json::to_string(&line)?);
            }
            _ => println!("{:>5}  {:>9.3}  {}", row, score, tokens.join(" ")),
        }
    }
    log::info!("Decoded {} rows", results.len());
    Ok(())
}
