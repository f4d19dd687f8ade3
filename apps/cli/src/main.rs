//! assetforge CLI — front-end asset pipeline for the course platform.
//!
//! Compiles scripts, styles, course content, the icon sprite, the polyfill
//! bundle, and the sitemap from two layered source trees into one
//! deployable output tree, one-shot or watching.

mod commands;

use clap::Parser;
use color_eyre::eyre::Result;

use commands::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    commands::init_tracing(&cli);
    commands::run(cli).await
}
