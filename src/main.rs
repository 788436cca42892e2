use anyhow::Result;
use clap::Parser;
use portatype::cli::{Cli, Commands};
use portatype::config::{resolve_config, resolve_engine_command};
use portatype::diag::TracingSink;
use portatype::engine::CommandEngine;
use portatype::pipeline::{build_schema, instrument_project};
use std::path::Path;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = resolve_config(&cli)?;
    let sink = TracingSink;

    match cli.command.clone() {
        Commands::Instrument { engine } => {
            let engine = CommandEngine::new(resolve_engine_command(engine)?);
            let outcome = instrument_project(&config, &engine, &sink)?;
            println!("{}", serde_json::to_string_pretty(&outcome)?);
        }
        Commands::Schema { output } => {
            let (schema, _worklist) = build_schema(&config, &sink)?;
            write_schema_output(&serde_json::to_string_pretty(&schema)?, output.as_deref())?;
        }
    }

    Ok(())
}

fn write_schema_output(content: &str, output: Option<&Path>) -> Result<()> {
    if let Some(path) = output {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(path, content)?;
    } else {
        print!("{content}");
        if !content.ends_with('\n') {
            println!();
        }
    }

    Ok(())
}
