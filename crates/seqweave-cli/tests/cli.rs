use std::path::PathBuf;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn write_dataset(dir: &TempDir) -> PathBuf {
    let path = dir.path().join("train.jsonl");
    std::fs::write(
        &path,
        concat!(
            "{\"tokens\": \"the cat sat\", \"pos\": \"DT NN VBD\"}\n",
            "{\"tokens\": \"the dog\", \"pos\": \"DT NN\"}\n",
            "{\"tokens\": [\"a\", \"cat\"], \"pos\": [\"DT\", \"NN\"]}\n",
        ),
    )
    .unwrap();
    path
}

fn seqweave() -> Command {
    Command::cargo_bin("seqweave").unwrap()
}

#[test]
fn test_cli_help() {
    seqweave()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Usage:"));
}

#[test]
fn test_invalid_command() {
    seqweave().arg("not-a-command").assert().failure();
}

#[test]
fn test_vocab_single_feature() {
    let dir = TempDir::new().unwrap();
    let dataset = write_dataset(&dir);
    seqweave()
        .args(["vocab", "--dataset"])
        .arg(&dataset)
        .assert()
        .success()
        .stdout(predicate::str::contains("producer: single (output dim 300)"));
}

#[test]
fn test_vocab_composite_json() {
    let dir = TempDir::new().unwrap();
    let dataset = write_dataset(&dir);
    let output = seqweave()
        .args(["vocab", "--features", "tokens", "pos", "--dims", "50", "20", "--format", "json", "--dataset"])
        .arg(&dataset)
        .output()
        .unwrap();
    assert!(output.status.success());

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["producer"], "composite");
    assert_eq!(json["output_dim"], 70);
    assert_eq!(json["features"][0]["feature"], "tokens");
    assert_eq!(json["features"][1]["dim"], 20);
    // "the" and "cat" both appear twice and sort lexicographically
    assert_eq!(json["features"][0]["top"][0], "cat");
}

#[test]
fn test_vocab_rejects_mismatched_dims() {
    let dir = TempDir::new().unwrap();
    let dataset = write_dataset(&dir);
    seqweave()
        .args(["vocab", "--features", "tokens", "pos", "--dims", "50", "--dataset"])
        .arg(&dataset)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid configuration"));
}

#[test]
fn test_decode_prints_one_line_per_row() {
    let dir = TempDir::new().unwrap();
    let dataset = write_dataset(&dir);
    let config = dir.path().join("seqweave.toml");
    std::fs::write(
        &config,
        r#"
[model.encoder]
name = "feed_forward"
params = { hidden_size = 8 }

[model.decoder]
name = "rnn"
params = { hidden_size = 8, embedding_dim = 4 }

[embeddings]
dims = [16]

[generation]
max_steps = 4
"#,
    )
    .unwrap();

    let output = seqweave()
        .args(["decode", "--format", "json", "--dataset"])
        .arg(&dataset)
        .arg("--config")
        .arg(&config)
        .output()
        .unwrap();
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let stdout = String::from_utf8(output.stdout).unwrap();
    let lines: Vec<serde_json::Value> = stdout
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect();
    assert_eq!(lines.len(), 3);
    for (i, line) in lines.iter().enumerate() {
        assert_eq!(line["row"], i);
        assert!(line["ids"].as_array().unwrap().len() <= 4);
    }
}

#[test]
fn test_decode_unknown_encoder_fails() {
    let dir = TempDir::new().unwrap();
    let dataset = write_dataset(&dir);
    let config = dir.path().join("bad.toml");
    std::fs::write(&config, "[model.encoder]\nname = \"transformer\"\n").unwrap();

    seqweave()
        .args(["decode", "--dataset"])
        .arg(&dataset)
        .arg("--config")
        .arg(&config)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown encoder 'transformer'"));
}
