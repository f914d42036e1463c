//! CLI entry point for tracegate.

mod cli;
mod commands;
mod output;

use clap::Parser;

use crate::cli::Cli;

/// Load the nearest `.env`, searching from the working directory upwards.
/// Variables already set in the environment win.
fn load_dotenv() {
    let Ok(mut dir) = std::env::current_dir() else {
        return;
    };
    for _ in 0..32 {
        let env_file = dir.join(".env");
        if env_file.exists() {
            let _ = dotenvy::from_path(&env_file);
            return;
        }
        if !dir.pop() {
            return;
        }
    }
}

#[tokio::main]
async fn main() {
    load_dotenv();
    let cli = Cli::parse();
    output::init(cli.output);

    let mut config = tracegate_observability::ObservabilityConfig::from_env();
    if cli.verbose {
        config = config.with_log_level("debug");
    }
    if let Err(e) = tracegate_observability::init(config) {
        output::warning(&format!("Logging disabled: {e}"));
    }

    let result = commands::handle(cli).await;
    tracegate_observability::shutdown();

    if let Err(e) = result {
        output::error(&format!("{e:#}"));
        std::process::exit(1);
    }
}
