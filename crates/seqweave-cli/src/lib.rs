use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "seqweave")]
#[command(about = "seqweave: encoder-decoder orchestration", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,
}

#[derive(Subcommand, Debug, PartialEq)]
pub enum Commands {
    /// Build vocabularies and embedding tables from a dataset
    Vocab {
        /// JSON Lines dataset, one object of token columns per line
        #[arg(short, long)]
        dataset: PathBuf,

        /// Feature columns to embed
        #[arg(long, num_args = 1.., default_values = ["tokens"])]
        features: Vec<String>,

        /// Embedding size per feature, paired by position with --features
        #[arg(long, num_args = 1.., default_values_t = [300])]
        dims: Vec<usize>,

        #[arg(long)]
        pad_token: Option<String>,

        #[arg(long)]
        unknown_token: Option<String>,

        #[arg(long)]
        start_token: Option<String>,

        #[arg(long)]
        stop_token: Option<String>,

        /// Seed for embedding initialization
        #[arg(long, default_value_t = 0)]
        seed: u64,

        /// Number of most frequent tokens to show per feature
        #[arg(long, default_value_t = 10)]
        top: usize,

        /// Output format: text, json
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Greedy-decode every row of a dataset with a freshly initialized model
    Decode {
        /// JSON Lines dataset, one object of token columns per line
        #[arg(short, long)]
        dataset: PathBuf,

        /// Config file (defaults to ./seqweave.toml, then the user config dir)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Step budget per batch (overrides [generation] max_steps)
        #[arg(long)]
        max_steps: Option<usize>,

        /// Rows decoded together
        #[arg(short, long, default_value_t = 32)]
        batch_size: usize,

        /// Output format: text, json
        #[arg(short, long, default_value = "text")]
        format: String,
    },
}
