//! yisp CLI - Main entry point

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

use commands::build::{BuildArgs, OutputFormat};

#[derive(Parser)]
#[command(name = "yisp")]
#[command(version)]
#[command(about = "Evaluate YAML documents with embedded expressions", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate a file and print the rendered documents
    Build {
        /// Input file
        file: PathBuf,

        /// Output format
        #[arg(short = 'o', long, value_enum, default_value_t = OutputFormat::Yaml)]
        output: OutputFormat,

        /// Keep manifests whose schema is missing or not satisfied, with a warning
        #[arg(long)]
        allow_untyped_manifest: bool,

        /// OpenAPI or JSON Schema document with definitions (repeatable)
        #[arg(long = "schema", value_name = "FILE")]
        schemas: Vec<PathBuf>,
    },
}

fn main() -> Result<ExitCode> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "yisp=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Build {
            file,
            output,
            allow_untyped_manifest,
            schemas,
        } => commands::build::execute(BuildArgs {
            file,
            output,
            allow_untyped_manifest,
            schemas,
        }),
    }
}
