//! Command-line argument parsing.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Vue component transformer for JavaScript test runners
#[derive(Parser, Debug, Clone)]
#[command(name = "vue-jest-rs")]
#[command(author, version, about, long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Path to the transform options (JSON)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Transform one component and print the result
    Transform {
        /// The component file
        file: PathBuf,

        /// Emit ES module syntax instead of CommonJS
        #[arg(long)]
        esm: bool,

        /// Use the suspending pipeline
        #[arg(long = "async")]
        suspending: bool,

        /// Command that compiles templates, script setup and TypeScript
        #[arg(long)]
        bridge: Option<String>,

        /// Extra argument for the bridge command (repeatable)
        #[arg(long = "bridge-arg", requires = "bridge", allow_hyphen_values = true)]
        bridge_args: Vec<String>,

        /// Also send style blocks to the bridge command
        #[arg(long, requires = "bridge")]
        bridge_styles: bool,

        /// Output format
        #[arg(long, default_value = "json")]
        output: OutputFormat,
    },

    /// Print the cache key of one component
    CacheKey {
        /// The component file
        file: PathBuf,
    },
}

/// Output format for transform results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// `{ "code": ..., "map": ... }`
    #[default]
    Json,
    /// Generated code only
    Code,
}
