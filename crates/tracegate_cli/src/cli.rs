//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

/// Observability gateway for external chat clients
#[derive(Parser)]
#[command(name = "tracegate", about, version, propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output format: text (human-readable) or json (machine-readable)
    #[arg(short, long, global = true, default_value = "text")]
    pub output: OutputFormat,
}

#[derive(Clone, Copy, Debug, Default, ValueEnum)]
pub enum OutputFormat {
    /// Colored terminal output for humans
    #[default]
    Text,
    /// One JSON object per line
    Json,
}

#[derive(Clone, Copy, Debug, Default, ValueEnum)]
pub enum RoleArg {
    #[default]
    User,
    Assistant,
}

#[derive(Subcommand)]
pub enum Command {
    /// Validate the caller and forward one chat interaction
    Submit(SubmitArgs),
    /// Attach a feedback score to an existing trace
    Feedback {
        /// Trace id returned by `submit`
        #[arg(long)]
        trace_id: String,
        /// Score value
        #[arg(long, allow_negative_numbers = true)]
        value: f64,
        #[arg(long)]
        comment: Option<String>,
        /// Score name (default: user-feedback)
        #[arg(long)]
        name: Option<String>,
        /// Record to an in-memory sink and print the calls instead of sending
        #[arg(long)]
        dry_run: bool,
    },
    /// Check whether an identity is registered, using the configured cache
    Validate {
        #[arg(long)]
        identity: String,
        #[arg(long)]
        client_address: String,
        /// File with one registered identity per line
        #[arg(long)]
        directory: PathBuf,
    },
    /// Ping the cache backend and report sink configuration
    Check,
}

#[derive(clap::Args)]
pub struct SubmitArgs {
    /// Caller identity (email)
    #[arg(long, required_unless_present = "json")]
    pub identity: Option<String>,
    #[arg(long, default_value = "")]
    pub message: String,
    #[arg(long, required_unless_present = "json")]
    pub client_address: Option<String>,
    #[arg(long, value_enum, default_value = "user")]
    pub role: RoleArg,
    /// Model output; sets the trace output
    #[arg(long)]
    pub response: Option<String>,
    #[arg(long)]
    pub chat_id: Option<String>,
    #[arg(long)]
    pub session_id: Option<String>,
    #[arg(long)]
    pub task: Option<String>,
    #[arg(long)]
    pub source: Option<String>,
    #[arg(long)]
    pub model: Option<String>,
    /// Extra tag (repeatable)
    #[arg(long = "tag")]
    pub tags: Vec<String>,
    #[arg(long)]
    pub prompt_tokens: Option<u64>,
    #[arg(long)]
    pub completion_tokens: Option<u64>,
    #[arg(long)]
    pub total_tokens: Option<u64>,
    /// Read the whole request from a JSON file instead of flags
    #[arg(long, conflicts_with_all = ["identity", "client_address"])]
    pub json: Option<PathBuf>,
    /// File with one registered identity per line
    #[arg(long)]
    pub directory: PathBuf,
    /// Record to an in-memory sink and print the calls instead of sending
    #[arg(long)]
    pub dry_run: bool,
}
