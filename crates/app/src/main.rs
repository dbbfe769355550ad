// CLI modules
mod args;
mod logging;
mod op;
mod ops;
mod state;

use args::Args;
use clap::{Parser, Subcommand};
use op::Op;
use ops::{Batch, Derive, Init, Show, Version};
use tracing::level_filters::LevelFilter;

command_enum! {
    (Batch, Batch),
    (Derive, Derive),
    (Init, Init),
    (Show, Show),
    (Version, Version),
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    // Logging settings come from the config when it exists; init and version work without one
    let state = state::AppState::load(args.config_path.clone()).ok();
    let level = args
        .log_level
        .or_else(|| {
            state
                .as_ref()
                .and_then(|s| s.config.log_level.parse::<LevelFilter>().ok())
        })
        .unwrap_or(LevelFilter::INFO);
    let log_dir = state.as_ref().and_then(|s| s.log_dir());

    let guards = match logging::init_logging(level, log_dir.as_deref()) {
        Ok(guards) => guards,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            std::process::exit(1);
        }
    };

    let ctx = op::OpContext::new(args.config_path);
    let code = match args.command.execute(&ctx).await {
        Ok(output) => {
            println!("{}", output);
            0
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            1
        }
    };

    // flush the non-blocking writers before exiting
    drop(guards);
    std::process::exit(code);
}
