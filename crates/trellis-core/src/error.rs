//! Error types for candidate collection.
//!
//! Planner findings are [`Diagnostic`](crate::Diagnostic)s, never errors.
//! The types below cover the plumbing around the planner: gathering
//! candidates from sources and merging them into a registry.

use thiserror::Error;

use crate::metadata::TypeRef;

// =============================================================================
// Source Errors
// =============================================================================

/// Errors raised by a [`CandidateSource`](crate::source::CandidateSource).
#[derive(Debug, Clone, Error)]
pub enum SourceError {
    /// The source could not produce its candidate list.
    #[error("candidate source '{source_name}' failed: {reason}")]
    DiscoveryFailed {
        /// Name of the failing source.
        source_name: String,
        /// Reason for failure.
        reason: String,
    },

    /// The source produced the same identity twice.
    #[error("candidate source '{source_name}' produced '{identity}' more than once")]
    DuplicateCandidate {
        /// Name of the offending source.
        source_name: String,
        /// The repeated identity.
        identity: String,
    },
}

impl SourceError {
    /// Creates a discovery failure for `source_name`.
    pub fn discovery(source_name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::DiscoveryFailed {
            source_name: source_name.into(),
            reason: reason.into(),
        }
    }
}

/// Result type for source operations.
pub type SourceResult<T> = Result<T, SourceError>;

// =============================================================================
// Registry Errors
// =============================================================================

/// Errors raised while merging candidates into a
/// [`CandidateRegistry`](crate::registry::CandidateRegistry).
#[derive(Debug, Clone, Error)]
pub enum RegistryError {
    /// Two contributors describe the same identity differently.
    #[error(
        "candidate '{}' from '{second}' conflicts with the one registered by '{first}'",
        .identity.qualified()
    )]
    ConflictingCandidate {
        /// The contested identity.
        identity: TypeRef,
        /// Contributor that registered it first.
        first: String,
        /// Contributor whose version was rejected.
        second: String,
    },

    /// A contributor name was empty.
    #[error("contributor name must not be empty")]
    EmptyContributorName,
}

/// Result type for registry operations.
pub type RegistryResult<T> = Result<T, RegistryError>;

/// A diagnostic kind name that matches no [`DiagnosticKind`](crate::DiagnosticKind).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown diagnostic kind '{0}'")]
pub struct UnknownDiagnosticKind(pub String);
