//! Runtime error types.

use thiserror::Error;
use trellis_core::{RegistryError, SourceError};

use crate::config::ConfigError;

/// Errors that can occur while gathering candidates or producing a plan.
#[derive(Error, Debug)]
pub enum RuntimeError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Source(#[from] SourceError),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// The graph snapshot could not be serialized.
    #[error("Failed to export dependency graph: {0}")]
    Export(#[from] serde_json::Error),

    /// The plan carries diagnostics reported at error level.
    #[error("Registration plan rejected with {errors} error(s)")]
    PlanRejected { errors: usize },
}

/// Result type for runtime operations.
pub type RuntimeResult<T> = Result<T, RuntimeError>;
