//! CLI error types.

use thiserror::Error;

use crate::config::ConfigError;

/// CLI errors.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new variants
/// in future versions without breaking downstream code.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// Configuration is invalid or missing required fields.
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// A tool declaration was rejected while building the registry.
    #[error("invalid tool declaration: {0}")]
    Schema(#[from] runtime::tools::SchemaError),

    /// The `--args` value of `call` is not valid JSON.
    #[error("invalid --args: {0}")]
    Arguments(#[from] serde_json::Error),

    /// A locally dispatched invocation did not succeed.
    #[error("{0}")]
    Invocation(runtime::tools::InvocationResult),

    /// An error occurred in the runtime layer.
    #[error(transparent)]
    Runtime(#[from] runtime::Error),

    /// An I/O error occurred.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
