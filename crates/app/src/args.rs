pub use clap::Parser;

use std::path::PathBuf;

use tracing::level_filters::LevelFilter;

#[derive(Parser, Debug)]
#[command(name = "fingerkey")]
#[command(about = "Derive deterministic keys from fingerprint images")]
pub struct Args {
    /// Path to the fingerkey config directory (defaults to ~/.fingerkey)
    #[arg(long, global = true)]
    pub config_path: Option<PathBuf>,

    /// Log level, overrides the config file. RUST_LOG still takes precedence.
    #[arg(long, global = true)]
    pub log_level: Option<LevelFilter>,

    #[command(subcommand)]
    pub command: crate::Command,
}
