//! Error types for the metamodel engine
//!
//! Validation failures are not errors in this sense: they are collected as
//! [`Diagnostics`](crate::diagnostics::Diagnostics). This type covers the
//! plumbing around a run (reading declarations, parsing, configuration).

use std::path::PathBuf;
use thiserror::Error;

/// Result type for metamodel operations
pub type Result<T> = std::result::Result<T, MetamodelError>;

/// Metamodel engine errors
#[derive(Error, Debug)]
pub enum MetamodelError {
    #[error("Declaration file not found: {0}")]
    NotFound(PathBuf),

    #[error("Invalid declaration document {path}: {source}")]
    InvalidDeclarations {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] config_crate::ConfigError),

    #[error("Directory walk error: {0}")]
    Walk(#[from] walkdir::Error),
}
