use super::*;
use std::collections::BTreeMap;

fn row(columns: &[(&str, &str)]) -> BTreeMap<String, Vec<String>> {
    columns
        .iter()
        .map(|(k, v)| {
            (
                k.to_string(),
                v.split_whitespace().map(str::to_string).collect(),
            )
        })
        .collect()
}

fn tagged_dataset() -> InMemoryDataset {
    InMemoryDataset::new(vec![
        row(&[("tokens", "the cat sat"), ("pos", "DT NN VBD")]),
        row(&[("tokens", "the dog"), ("pos", "DT NN")]),
    ])
}

fn spec(features: &[&str], dims: &[usize]) -> EmbeddingSpec {
    EmbeddingSpec::new(features.iter().map(|f| f.to_string()).collect(), dims.to_vec())
}

#[test]
fn test_two_features_give_composite_of_summed_width() {
    let producer = build_embeddings(
        &tagged_dataset(),
        &spec(&["tokens", "pos"], &[50, 20]),
        &SpecialTokens::default(),
        0,
    )
    .unwrap();

    assert!(matches!(producer, EmbeddingProducer::Multi(_)));
    assert_eq!(producer.output_dim(), 70);
    assert_eq!(producer.features(), vec!["tokens", "pos"]);

    let embedded = producer.embed_row(&tagged_dataset(), 0).unwrap();
    assert_eq!(embedded.shape(), &[3, 70]);
}

#[test]
fn test_single_feature_is_not_wrapped() {
    let producer = build_embeddings(
        &tagged_dataset(),
        &EmbeddingSpec::default(),
        &SpecialTokens::default(),
        0,
    )
    .unwrap();

    match &producer {
        EmbeddingProducer::Single(ctx) => assert_eq!(ctx.dim(), 300),
        EmbeddingProducer::Multi(_) => panic!("single feature must not be wrapped"),
    }
    assert_eq!(producer.output_dim(), 300);
}

#[test]
fn test_fewer_dims_than_features_is_rejected() {
    let err = build_embeddings(
        &tagged_dataset(),
        &spec(&["tokens", "pos"], &[50]),
        &SpecialTokens::default(),
        0,
    )
    .unwrap_err();
    assert!(matches!(err, Seq2SeqError::Configuration(_)));
    assert!(err.to_string().contains("2 features"));
}

#[test]
fn test_more_dims_than_features_is_rejected() {
    assert!(matches!(
        spec(&["tokens"], &[50, 20]).validate(),
        Err(Seq2SeqError::Configuration(_))
    ));
}

#[test]
fn test_empty_features_and_zero_dim_are_rejected() {
    assert!(spec(&[], &[]).validate().is_err());
    let err = spec(&["tokens", "pos"], &[50, 0]).validate().unwrap_err();
    assert!(err.to_string().contains("'pos'"));
}

#[test]
fn test_missing_column_is_rejected() {
    let err = build_embeddings(
        &tagged_dataset(),
        &spec(&["tokens", "lemma"], &[8, 8]),
        &SpecialTokens::default(),
        0,
    )
    .unwrap_err();
    assert!(err.to_string().contains("'lemma'"));
}

#[test]
fn test_pad_row_is_zero() {
    let producer = build_embeddings(
        &tagged_dataset(),
        &spec(&["tokens"], &[16]),
        &SpecialTokens::default(),
        3,
    )
    .unwrap();
    let ctx = &producer.contexts()[0];
    let pad = ctx.vocab().pad_id().unwrap() as usize;
    assert!(ctx.table().row(pad).iter().all(|&v| v == 0.0));
    assert!(ctx.table().iter().all(|v| v.abs() <= 0.1));
}

#[test]
fn test_same_seed_same_tables() {
    let build = |seed| {
        build_embeddings(
            &tagged_dataset(),
            &spec(&["tokens"], &[8]),
            &SpecialTokens::default(),
            seed,
        )
        .unwrap()
    };
    let a = build(5);
    let b = build(5);
    let c = build(6);
    assert_eq!(a.contexts()[0].table(), b.contexts()[0].table());
    assert_ne!(a.contexts()[0].table(), c.contexts()[0].table());
}

#[test]
fn test_composite_concatenates_in_order() {
    let dataset = tagged_dataset();
    let producer = build_embeddings(
        &dataset,
        &spec(&["tokens", "pos"], &[4, 3]),
        &SpecialTokens::default(),
        1,
    )
    .unwrap();
    let tokens = producer.contexts()[0].embed(dataset.tokens(1, "tokens").unwrap()).unwrap();
    let pos = producer.contexts()[1].embed(dataset.tokens(1, "pos").unwrap()).unwrap();
    let both = producer.embed_row(&dataset, 1).unwrap();

    assert_eq!(both.slice(s![.., ..4]), tokens);
    assert_eq!(both.slice(s![.., 4..]), pos);
}

#[test]
fn test_ragged_columns_are_rejected() {
    let dataset = InMemoryDataset::new(vec![row(&[("tokens", "a b c"), ("pos", "X Y")])]);
    let producer = build_embeddings(
        &dataset,
        &spec(&["tokens", "pos"], &[4, 4]),
        &SpecialTokens::default(),
        0,
    )
    .unwrap();
    assert!(matches!(
        producer.embed_row(&dataset, 0),
        Err(Seq2SeqError::ShapeMismatch { .. })
    ));
}

#[test]
fn test_embed_batch_pads_with_zeros() {
    let dataset = tagged_dataset();
    let producer = build_embeddings(
        &dataset,
        &spec(&["tokens"], &[6]),
        &SpecialTokens::default(),
        0,
    )
    .unwrap();
    let (features, lengths) = producer.embed_batch(&dataset, &[0, 1]).unwrap();
    assert_eq!(features.shape(), &[2, 3, 6]);
    assert_eq!(lengths.to_vec(), vec![3, 2]);
    assert!(features.slice(s![1, 2, ..]).iter().all(|&v| v == 0.0));
}

#[test]
fn test_primary_vocab_is_first_feature() {
    let producer = build_embeddings(
        &tagged_dataset(),
        &spec(&["pos", "tokens"], &[4, 4]),
        &SpecialTokens::default(),
        0,
    )
    .unwrap();
    assert_eq!(producer.primary_vocab().feature(), "pos");
    assert!(producer.vocab("tokens").is_some());
    assert!(producer.vocab("lemma").is_none());
}
