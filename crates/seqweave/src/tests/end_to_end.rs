use anyhow::Result;
use ndarray::{Array1, Array3, Axis};
use ndarray_rand::rand_distr::Uniform;
use ndarray_rand::RandomExt;

use crate::config::{ComponentConfig, ModelConfig};
use crate::embeddings::{build_embeddings, EmbeddingProducer, EmbeddingSpec, InMemoryDataset, SpecialTokens};
use crate::encoder_decoder::{EncoderDecoderModel, Seq2SeqInputs};
use crate::ops::repeat_interleave;

const DATA: &str = r#"{"tokens": "the cat sat on the mat", "pos": "DT NN VBD IN DT NN"}
{"tokens": "a dog barked", "pos": "DT NN VBD"}
{"tokens": "the dog sat", "pos": "DT NN VBD"}
"#;

const HIDDEN: usize = 6;
const TARGET_DIM: usize = 5;

fn embeddings() -> Result<(InMemoryDataset, EmbeddingProducer)> {
    let dataset = InMemoryDataset::from_reader(DATA.as_bytes())?;
    let spec = EmbeddingSpec::new(vec!["tokens".into(), "pos".into()], vec![8, 4]);
    let producer = build_embeddings(&dataset, &spec, &SpecialTokens::default(), 7)?;
    Ok((dataset, producer))
}

fn model_config(producer: &EmbeddingProducer) -> ModelConfig {
    let vocab = producer.primary_vocab();
    ModelConfig {
        encoder: ComponentConfig::new("feed_forward")
            .with_param("input_dim", producer.output_dim() as i64)
            .with_param("hidden_size", HIDDEN as i64)
            .with_param("state_steps", 2),
        decoder: ComponentConfig::new("rnn")
            .with_param("vocab_size", vocab.len() as i64)
            .with_param("embedding_dim", TARGET_DIM as i64)
            .with_param("hidden_size", HIDDEN as i64)
            .with_param("num_layers", 2)
            .with_param("copy_weight", 0.5),
    }
}

fn batch(producer: &EmbeddingProducer, dataset: &InMemoryDataset) -> Result<Seq2SeqInputs> {
    let (features, lengths) = producer.embed_batch(dataset, &[0, 1, 2])?;
    Ok(Seq2SeqInputs::with_length_mask(features, lengths))
}

#[test]
fn test_greedy_decode_end_to_end() -> Result<()> {
    let (dataset, producer) = embeddings()?;
    let model = EncoderDecoderModel::from_config(&model_config(&producer))?;
    let inputs = batch(&producer, &dataset)?;

    let output = model.greedy_decode(&inputs, 5)?.finish()?;
    let vocab = producer.primary_vocab();
    let stop = vocab.stop_id().unwrap();

    assert_eq!(output.tokens.nrows(), 3);
    assert!(output.steps_taken <= 5);
    for b in 0..3 {
        let sequence = output.sequence(b);
        assert!(sequence.len() <= 5);
        assert!(!sequence.contains(&stop));
        assert!(sequence.iter().all(|&id| (id as usize) < vocab.len()));
        assert!(output.scores[b] <= 0.0);
    }
    Ok(())
}

#[test]
fn test_greedy_decode_is_reproducible() -> Result<()> {
    let (dataset, producer) = embeddings()?;
    let mut model = EncoderDecoderModel::from_config(&model_config(&producer))?;
    let inputs = batch(&producer, &dataset)?;

    let first = model.greedy_decode(&inputs, 6)?.finish()?;
    model.initialize_parameters()?;
    let second = model.greedy_decode(&inputs, 6)?.finish()?;

    assert_eq!(first.tokens, second.tokens);
    assert_eq!(first.lengths, second.lengths);
    Ok(())
}

#[test]
fn test_forward_with_references_matches_repeated_sources() -> Result<()> {
    let (dataset, producer) = embeddings()?;
    let model = EncoderDecoderModel::from_config(&model_config(&producer))?;
    let inputs = batch(&producer, &dataset)?;
    let target = Array3::random((6, 4, TARGET_DIM), Uniform::new(-1.0, 1.0));

    let expanded = model.forward(
        &inputs
            .clone()
            .with_target_input_features(target.clone())
            .with_max_references(2),
        None,
    )?;

    let lengths: Array1<usize> = repeat_interleave(&inputs.source_lengths, Axis(0), 2);
    let repeated = Seq2SeqInputs::with_length_mask(
        repeat_interleave(&inputs.source_input_features, Axis(0), 2),
        lengths,
    )
    .with_target_input_features(target);
    let direct = model.forward(&repeated, None)?;

    assert_eq!(expanded.logits.shape(), &[6, 4, producer.primary_vocab().len()]);
    for (a, b) in expanded.logits.iter().zip(direct.logits.iter()) {
        assert!((a - b).abs() < 1e-5);
    }
    Ok(())
}

#[test]
fn test_dropout_only_perturbs_when_enabled() -> Result<()> {
    let (dataset, producer) = embeddings()?;
    let mut model = EncoderDecoderModel::from_config(&model_config(&producer))?;
    let inputs = batch(&producer, &dataset)?
        .with_target_input_features(Array3::random((3, 3, TARGET_DIM), Uniform::new(-1.0, 1.0)));

    let clean = model.forward(&inputs, None)?;
    assert_eq!(clean.logits, model.forward(&inputs, None)?.logits);

    model.set_dropout(0.5)?;
    let noisy = model.forward(&inputs, None)?;
    assert_ne!(clean.logits, noisy.logits);

    model.set_dropout(0.0)?;
    assert_eq!(clean.logits, model.forward(&inputs, None)?.logits);
    Ok(())
}
