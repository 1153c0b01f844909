//! couch-watch daemon.
//!
//! Operator commands are read from stdin (`/help` lists them), replies are
//! printed to stdout and delivered photos/videos are moved to the outbox.
//!
//! ```bash
//! RUST_LOG=debug couch-watch --device /dev/video0 --mask roi.pgm --detect
//! ```

mod app;
mod cli;
mod config;

use anyhow::Result;
use clap::Parser;

use crate::cli::Cli;
use crate::config::WatchConfig;

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let config = WatchConfig::from_cli(&cli)?;
    app::run(config)
}
