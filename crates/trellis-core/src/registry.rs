//! Merge-only candidate accumulation.
//!
//! [`CandidateRegistry`] is the caller-owned accumulator the planner reads
//! from. Contributors append to it by name; the registry never forgets or
//! rewrites a candidate, and registering the same contributor twice is a
//! no-op.
//!
//! Crates that need to contribute candidates at link time (without an
//! explicit call from the host) use the [`contributor!`](crate::contributor)
//! macro. Those contributions are only collected when the caller asks for
//! them through [`CandidateRegistry::register_linked`], so nothing is
//! accumulated in ambient global state.
//!
//! ```rust,ignore
//! fn billing_candidates() -> Vec<CandidateType> {
//!     vec![CandidateType::new(TypeRef::new("Billing.InvoiceService", "Billing"))]
//! }
//!
//! trellis_core::contributor! {
//!     static BILLING = "billing" => billing_candidates;
//! }
//!
//! let registry = CandidateRegistry::with_linked_contributors()?;
//! ```

use std::collections::{BTreeMap, BTreeSet};

use linkme::distributed_slice;
use tracing::{debug, trace, warn};

use crate::error::{RegistryError, RegistryResult};
use crate::metadata::{CandidateType, TypeRef};

// =============================================================================
// Link-time contributors
// =============================================================================

/// A named, link-time provider of candidates.
#[derive(Debug, Clone, Copy)]
pub struct Contributor {
    /// Contributor name; also the idempotency key in the registry.
    pub name: &'static str,
    /// Produces the contributor's candidates.
    pub contribute: fn() -> Vec<CandidateType>,
}

/// Every [`Contributor`] linked into the final binary.
///
/// Populated with [`contributor!`](crate::contributor); read only through
/// [`CandidateRegistry::register_linked`].
#[distributed_slice]
pub static CONTRIBUTORS: [Contributor];

/// Declares a link-time [`Contributor`].
///
/// ```rust,ignore
/// trellis_core::contributor! {
///     pub static ORDERS = "orders" => orders::candidates;
/// }
/// ```
#[macro_export]
macro_rules! contributor {
    ($(#[$attr:meta])* $vis:vis static $ident:ident = $name:literal => $contribute:path $(;)?) => {
        $(#[$attr])*
        #[$crate::linkme::distributed_slice($crate::registry::CONTRIBUTORS)]
        #[linkme(crate = $crate::linkme)]
        $vis static $ident: $crate::registry::Contributor = $crate::registry::Contributor {
            name: $name,
            contribute: $contribute,
        };
    };
}

// =============================================================================
// CandidateRegistry
// =============================================================================

/// Outcome of a [`CandidateRegistry::register`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Registration {
    /// The contributor was new; its candidates were merged.
    Merged {
        /// Candidates not previously known.
        added: usize,
        /// Candidates identical to ones already registered.
        unchanged: usize,
    },
    /// The contributor had already been registered; nothing changed.
    AlreadyRegistered,
}

#[derive(Clone)]
struct Entry {
    contributor: String,
    candidate: CandidateType,
}

/// Caller-owned, merge-only accumulator of candidates.
#[derive(Clone, Default)]
pub struct CandidateRegistry {
    contributors: BTreeSet<String>,
    candidates: BTreeMap<TypeRef, Entry>,
}

impl CandidateRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry pre-filled with every linked contributor.
    pub fn with_linked_contributors() -> RegistryResult<Self> {
        let mut registry = Self::new();
        registry.register_linked()?;
        Ok(registry)
    }

    /// Merges every [`Contributor`] in [`CONTRIBUTORS`], in name order.
    ///
    /// Returns the number of contributors that were new to this registry.
    /// On a conflict the registry is left as it was.
    pub fn register_linked(&mut self) -> RegistryResult<usize> {
        let mut linked: Vec<&Contributor> = CONTRIBUTORS.iter().collect();
        linked.sort_by_key(|c| c.name);

        let mut staged = self.clone();
        let mut merged = 0;
        for contributor in linked {
            if staged.contributors.contains(contributor.name) {
                continue;
            }
            staged.register(contributor.name, (contributor.contribute)())?;
            merged += 1;
        }
        *self = staged;
        Ok(merged)
    }

    /// Merges `candidates` under the contributor name `contributor`.
    ///
    /// The merge is all-or-nothing: if any candidate conflicts with an
    /// existing registration from another contributor, nothing is merged.
    /// A candidate identical to an existing one is accepted and ignored.
    pub fn register<I>(&mut self, contributor: &str, candidates: I) -> RegistryResult<Registration>
    where
        I: IntoIterator<Item = CandidateType>,
    {
        if contributor.is_empty() {
            return Err(RegistryError::EmptyContributorName);
        }
        if self.contributors.contains(contributor) {
            trace!(contributor, "Contributor already registered, skipping");
            return Ok(Registration::AlreadyRegistered);
        }

        let mut fresh: BTreeMap<TypeRef, CandidateType> = BTreeMap::new();
        let mut unchanged = 0;
        for candidate in candidates {
            match self.candidates.get(&candidate.identity) {
                Some(existing) if existing.candidate == candidate => unchanged += 1,
                Some(existing) => {
                    warn!(
                        identity = %candidate.identity.qualified(),
                        first = %existing.contributor,
                        second = contributor,
                        "Conflicting candidate, rejecting contributor"
                    );
                    return Err(RegistryError::ConflictingCandidate {
                        identity: candidate.identity,
                        first: existing.contributor.clone(),
                        second: contributor.to_string(),
                    });
                }
                None => {
                    if let Some(previous) = fresh.get(&candidate.identity)
                        && previous != &candidate
                    {
                        return Err(RegistryError::ConflictingCandidate {
                            identity: candidate.identity,
                            first: contributor.to_string(),
                            second: contributor.to_string(),
                        });
                    }
                    fresh.insert(candidate.identity.clone(), candidate);
                }
            }
        }

        let added = fresh.len();
        for (identity, candidate) in fresh {
            self.candidates.insert(
                identity,
                Entry {
                    contributor: contributor.to_string(),
                    candidate,
                },
            );
        }
        self.contributors.insert(contributor.to_string());

        debug!(contributor, added, unchanged, "Contributor merged");
        Ok(Registration::Merged { added, unchanged })
    }

    /// Whether `contributor` has been merged.
    pub fn contains_contributor(&self, contributor: &str) -> bool {
        self.contributors.contains(contributor)
    }

    /// Names of merged contributors, sorted.
    pub fn contributors(&self) -> impl Iterator<Item = &str> {
        self.contributors.iter().map(String::as_str)
    }

    /// Which contributor registered `identity`.
    pub fn origin_of(&self, identity: &TypeRef) -> Option<&str> {
        self.candidates
            .get(identity)
            .map(|entry| entry.contributor.as_str())
    }

    /// Number of distinct candidates.
    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    /// The unified candidate set, in identity order.
    pub fn snapshot(&self) -> Vec<CandidateType> {
        self.candidates
            .values()
            .map(|entry| entry.candidate.clone())
            .collect()
    }
}
