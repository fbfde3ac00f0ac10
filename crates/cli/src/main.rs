use clap::Parser;
use client::Kaizen;

mod cli;
mod commands;
mod config;
mod error;

use crate::error::Result;

#[tokio::main]
async fn main() -> Result<()> {
    let args = cli::Cli::parse();
    let settings = config::load(&args)?;

    tracing_subscriber::fmt()
        .with_env_filter(format!(
            "kaizen_cli={level},client={level}",
            level = settings.level
        ))
        .with_writer(std::io::stderr)
        .init();

    tracing::debug!(base_url = %settings.client.base_url, "starting");
    let kaizen = Kaizen::builder().config(settings.client).build()?;
    commands::run(&kaizen, args.command).await
}
