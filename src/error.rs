use std::path::PathBuf;

use thiserror::Error;

/// Failures that stop the compiler before or outside a processing round.
///
/// Problems with individual declarations are never reported through this
/// type; they become [`crate::diagnostics::Diagnostic`]s instead.
#[derive(Debug, Error)]
pub enum DaocError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid TOML in {path}: {source}")]
    Toml {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid JSON in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("unsupported declaration format `{0}` (expected .toml or .json)")]
    UnsupportedFormat(String),

    #[error("invalid type `{input}`: {reason}")]
    TypeSyntax { input: String, reason: String },

    #[error("invalid configuration: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, DaocError>;
