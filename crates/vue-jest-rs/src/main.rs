//! vue-jest-rs - Vue single-file component transformer for test runners.

use clap::Parser;
use miette::{IntoDiagnostic, Result, WrapErr};
use sfc_transform::SfcTransformer;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod cli;
mod config;
mod output;

use cli::{Args, Command};

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .context_lines(2)
                .build(),
        )
    }))
    .ok();

    init_logging(args.verbose);

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{:?}", e);
            ExitCode::FAILURE
        }
    }
}

/// Log to stderr; `RUST_LOG` overrides the level chosen by `--verbose`.
fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .init();
}

async fn run(args: Args) -> Result<()> {
    let workspace = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    let pipeline_config = config::load(args.config.as_deref(), &workspace)?;

    match args.command {
        Command::Transform {
            file,
            esm,
            suspending,
            bridge,
            bridge_args,
            bridge_styles,
            output,
        } => {
            let source = read_component(&file)?;
            let mut pipeline_config = pipeline_config;
            pipeline_config.supports_static_esm |= esm;

            let compilers =
                config::compilers(&workspace, bridge.as_deref(), &bridge_args, bridge_styles)?;
            let transformer = SfcTransformer::new(compilers);
            let filename = file.to_string_lossy();

            let result = if suspending {
                transformer
                    .process_async(&source, &filename, &pipeline_config)
                    .await
            } else {
                transformer.process(&source, &filename, &pipeline_config)
            }
            .into_diagnostic()?;

            println!("{}", output::render(&result, output)?);
        }
        Command::CacheKey { file } => {
            let source = read_component(&file)?;
            let transformer = SfcTransformer::default();
            println!(
                "{}",
                transformer.get_cache_key(&source, &file.to_string_lossy(), &pipeline_config)
            );
        }
    }
    Ok(())
}

fn read_component(file: &std::path::Path) -> Result<String> {
    std::fs::read_to_string(file)
        .into_diagnostic()
        .wrap_err_with(|| format!("Failed to read {}", file.display()))
}
