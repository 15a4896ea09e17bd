use std::fs;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use tacit_cli::{load_program, translate, Cli};

fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let program = load_program(&cli.input)?;
    let module = translate(&program, cli.codegen_config())?;

    let output = cli.output_path();
    fs::write(&output, module.to_source())
        .with_context(|| format!("Failed to write {}", output.display()))?;

    info!(
        translated = module.procedures.len(),
        skipped = module.skipped_methods.len(),
        stubbed = module.stubbed_methods.len(),
        "translation finished"
    );
    println!("Generated: {}", output.display());
    Ok(())
}
