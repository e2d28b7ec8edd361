//! The `yisp build` command.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::ValueEnum;
use tracing::{debug, info};
use yisp_core::{Engine, EngineOptions, OpenApiSchemaProvider};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Yaml,
    Json,
}

#[derive(Debug)]
pub struct BuildArgs {
    pub file: PathBuf,
    pub output: OutputFormat,
    pub allow_untyped_manifest: bool,
    pub schemas: Vec<PathBuf>,
}

/// Evaluate `args.file` and print the result to stdout. Evaluation errors
/// are printed to stderr with a source excerpt and traceback, and yield a
/// failing exit code.
pub fn execute(args: BuildArgs) -> Result<ExitCode> {
    let mut provider = OpenApiSchemaProvider::new();
    for schema in &args.schemas {
        provider
            .add_file(schema)
            .with_context(|| format!("failed to load schema {}", schema.display()))?;
        debug!(path = %schema.display(), "loaded schema document");
    }

    let options = EngineOptions {
        allow_untyped_manifest: args.allow_untyped_manifest,
        ..Default::default()
    };
    let mut engine = Engine::new(options).with_provider(provider);
    info!(file = %args.file.display(), "building");

    let rendered = match args.output {
        OutputFormat::Yaml => engine.build_yaml(&args.file).map(Ok),
        OutputFormat::Json => engine.build_json(&args.file).map(|value| {
            serde_json::to_string_pretty(&value)
                .map(|text| text + "\n")
                .context("failed to serialize JSON output")
        }),
    };

    match rendered {
        Ok(text) => {
            print!("{}", text?);
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => {
            eprintln!("{}", err.render(engine.sources()));
            Ok(ExitCode::FAILURE)
        }
    }
}
