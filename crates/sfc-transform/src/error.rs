//! Error types for the transform pipeline.

use thiserror::Error;

/// Result type for pipeline operations.
pub type TransformResult<T> = Result<T, TransformError>;

/// Error type returned by external compilers and custom transformers.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Result type for compiler seams.
pub type CompileResult<T> = Result<T, BoxError>;

/// Message used when a compiler reports diagnostics.
pub const COMPILATION_FAILED: &str = "Vue template compilation failed";

/// An error that aborts one transform call.
///
/// Every variant raised by the pipeline itself is displayed inside the
/// `[vue-jest] Error:` banner. Errors thrown by external compilers are
/// passed through with their own message.
#[derive(Debug, Error)]
pub enum TransformError {
    /// A `src` reference could not be read.
    #[error("\n[vue-jest] Error: Failed to load src: \"{src}\" from file: \"{file}\"\n")]
    Load {
        /// The reference as written on the block.
        src: String,
        /// The component file that holds the reference.
        file: String,
        #[source]
        source: std::io::Error,
    },

    /// A template or style compiler reported diagnostics.
    #[error("\n[vue-jest] Error: {message}\n")]
    Compilation {
        message: String,
        diagnostics: Vec<String>,
    },

    /// A transformer or compiler was configured incorrectly.
    #[error("\n[vue-jest] Error: {0}\n")]
    Configuration(String),

    /// An external compiler failed.
    #[error("{0}")]
    Upstream(BoxError),

    /// Compiled output could not be parsed.
    #[error("\n[vue-jest] Error: {0}\n")]
    Parse(String),

    /// A source map from a compiler was unreadable.
    #[error("\n[vue-jest] Error: {0}\n")]
    SourceMap(#[from] source_map::SourceMapError),

    /// Process plumbing failed.
    #[error("\n[vue-jest] Error: {0}\n")]
    Io(#[from] std::io::Error),
}

impl TransformError {
    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    /// Wrap an error raised by an external compiler.
    pub fn upstream(error: BoxError) -> Self {
        Self::Upstream(error)
    }

    /// Log each diagnostic and fail with a compilation error.
    ///
    /// Returns `Ok(())` when there is nothing to report.
    pub fn check_diagnostics(diagnostics: &[String]) -> TransformResult<()> {
        if diagnostics.is_empty() {
            return Ok(());
        }
        for message in diagnostics {
            tracing::error!("\n{}\n", message);
        }
        Err(Self::Compilation {
            message: COMPILATION_FAILED.to_string(),
            diagnostics: diagnostics.to_vec(),
        })
    }
}
