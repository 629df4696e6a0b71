//! Candidate sources.
//!
//! A [`CandidateSource`] is the seam between the planner and its metadata
//! front ends. Live-type inspection and compile-time symbol inspection both
//! implement it; the planner only ever sees the resulting
//! [`CandidateType`]s.
//!
//! # Example
//!
//! ```rust,ignore
//! use trellis_core::source::{CandidateSource, StaticSource};
//!
//! let source = StaticSource::new("orders", vec![order_service, inventory_service]);
//! let candidates = source.discover().await?;
//! ```

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::{SourceError, SourceResult};
use crate::metadata::CandidateType;

/// A provider of candidate metadata.
///
/// Sources are independent of each other and may be discovered concurrently.
/// The results must be merged before planning: cross-source cycles and
/// captive dependencies are invisible to any single source.
#[async_trait]
pub trait CandidateSource: Send + Sync {
    /// Stable name of this source. Used as the contributor name when the
    /// source's candidates are merged into a registry.
    fn name(&self) -> &str;

    /// Produces this source's candidates, duplicate-free.
    async fn discover(&self) -> SourceResult<Vec<CandidateType>>;
}

/// Type-erased, shareable candidate source.
pub type BoxedSource = Arc<dyn CandidateSource>;

/// A source backed by an in-memory candidate list.
#[derive(Debug, Clone)]
pub struct StaticSource {
    name: String,
    candidates: Vec<CandidateType>,
}

impl StaticSource {
    /// Creates a source that always yields `candidates`.
    pub fn new(name: impl Into<String>, candidates: Vec<CandidateType>) -> Self {
        Self {
            name: name.into(),
            candidates,
        }
    }
}

#[async_trait]
impl CandidateSource for StaticSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn discover(&self) -> SourceResult<Vec<CandidateType>> {
        ensure_unique(&self.name, &self.candidates)?;
        Ok(self.candidates.clone())
    }
}

/// Checks the input contract: no identity appears twice within one source.
pub fn ensure_unique(source_name: &str, candidates: &[CandidateType]) -> SourceResult<()> {
    let mut seen = HashSet::with_capacity(candidates.len());
    for candidate in candidates {
        if !seen.insert(&candidate.identity) {
            return Err(SourceError::DuplicateCandidate {
                source_name: source_name.to_string(),
                identity: candidate.identity.qualified(),
            });
        }
    }
    Ok(())
}
