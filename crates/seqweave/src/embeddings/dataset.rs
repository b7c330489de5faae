use std::collections::BTreeMap;
use std::io::BufRead;
use std::path::Path;

use anyhow::{Context as _, Result};
use serde::Deserialize;

/// A table of rows, each mapping a column name to a token sequence.
pub trait Dataset {
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// True if at least one row carries `column`.
    fn has_column(&self, column: &str) -> bool;

    /// Tokens of `column` in row `index`, `None` if the row lacks the column.
    fn tokens(&self, index: usize, column: &str) -> Option<&[String]>;
}

/// A column value in a JSON Lines row: either a token list or whitespace-separated text.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawColumn {
    Tokens(Vec<String>),
    Text(String),
}

impl From<RawColumn> for Vec<String> {
    fn from(raw: RawColumn) -> Self {
        match raw {
            RawColumn::Tokens(tokens) => tokens,
            RawColumn::Text(text) => text.split_whitespace().map(str::to_string).collect(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct InMemoryDataset {
    rows: Vec<BTreeMap<String, Vec<String>>>,
}

impl InMemoryDataset {
    pub fn new(rows: Vec<BTreeMap<String, Vec<String>>>) -> Self {
        Self { rows }
    }

    pub fn from_jsonl(path: &Path) -> Result<Self> {
        let file = std::fs::File::open(path)
            .with_context(|| format!("Failed to open dataset {}", path.display()))?;
        let dataset = Self::from_reader(std::io::BufReader::new(file))
            .with_context(|| format!("Failed to load dataset {}", path.display()))?;
        log::info!("Loaded {} rows from {}", dataset.len(), path.display());
        Ok(dataset)
    }

    /// Parses one JSON object per line. Blank lines are skipped.
    pub fn from_reader(reader: impl BufRead) -> Result<Self> {
        let mut rows = Vec::new();
        for (i, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let raw: BTreeMap<String, RawColumn> = serde_json::from_str(&line)
                .with_context(|| format!("line {}: expected an object of token columns", i + 1))?;
            rows.push(raw.into_iter().map(|(k, v)| (k, v.into())).collect());
        }
        Ok(Self { rows })
    }

    pub fn push(&mut self, row: BTreeMap<String, Vec<String>>) {
        self.rows.push(row);
    }

    pub fn rows(&self) -> &[BTreeMap<String, Vec<String>>] {
        &self.rows
    }
}

impl Dataset for InMemoryDataset {
    fn len(&self) -> usize {
        self.rows.len()
    }

    fn has_column(&self, column: &str) -> bool {
        self.rows.iter().any(|row| row.contains_key(column))
    }

    fn tokens(&self, index: usize, column: &str) -> Option<&[String]> {
        self.rows
            .get(index)
            .and_then(|row| row.get(column))
            .map(Vec::as_slice)
    }
}
