mod commands;

use anyhow::Result;
use clap::Parser;

use seqweave_cli::{Cli, Commands};

fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    std::env::set_var("RUST_LOG", log_level);
    env_logger::init();

    match cli.command {
        Commands::Vocab {
            dataset,
            features,
            dims,
            pad_token,
            unknown_token,
            start_token,
            stop_token,
            seed,
            top,
            format,
        } => commands::vocab::run(
            &dataset,
            features,
            dims,
            commands::vocab::SpecialOverrides {
                pad: pad_token,
                unknown: unknown_token,
                start: start_token,
                stop: stop_token,
            },
            seed,
            top,
            &format,
        ),

        Commands::Decode {
            dataset,
            config,
            max_steps,
            batch_size,
            format,
        } => commands::decode::run(&dataset, config.as_deref(), max_steps, batch_size, &format),
    }
}
