//! Error types for patch sequencing.

use std::path::PathBuf;

use quarry_orm::{ExecutionError, OrmError};
use quarry_sql_core::BuildError;

/// Errors that can occur while applying patches.
#[derive(Debug, thiserror::Error)]
pub enum MigrateError {
    /// A statement of a patch failed; later statements and patches did not
    /// run.
    #[error("Patch '{patch}' failed at statement {index}: {source}")]
    Patch {
        /// Name of the failing patch.
        patch: String,
        /// Position of the failing statement within the patch.
        index: usize,
        #[source]
        source: StatementError,
    },

    /// Two patches share one name.
    #[error("Patch '{0}' is declared twice")]
    DuplicatePatch(String),

    /// A patch could not produce its statements.
    #[error("Patch '{patch}' cannot be prepared: {source}")]
    Prepare {
        patch: String,
        #[source]
        source: OrmError,
    },

    /// The ledger could not be read or written.
    #[error("Ledger error: {0}")]
    Ledger(#[source] StatementError),

    /// The database URL names no supported backend.
    #[error("Unsupported database URL '{0}': expected mysql:// or postgres://")]
    UnsupportedUrl(String),

    /// Database error while connecting.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// IO error (reading the configuration file).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to parse the configuration file.
    #[error("Failed to parse configuration '{path}': {source}")]
    Config {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Why a single statement failed.
#[derive(Debug, thiserror::Error)]
pub enum StatementError {
    #[error(transparent)]
    Build(#[from] BuildError),

    #[error(transparent)]
    Execution(#[from] ExecutionError),
}

/// Result type for patch operations.
pub type Result<T> = std::result::Result<T, MigrateError>;
