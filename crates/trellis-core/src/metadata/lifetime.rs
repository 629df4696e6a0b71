//! Service lifetimes and parameter resolution kinds.

use std::fmt;

use serde::{Deserialize, Serialize};

// ─── Lifetime ─────────────────────────────────────────────────────────────────

/// How long a container keeps an instance alive.
///
/// Lifetimes are strictly ordered by longevity:
/// `Singleton > Scoped > Transient`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Lifetime {
    /// One instance for the whole container.
    Singleton,
    /// One instance per logical scope.
    Scoped,
    /// A new instance per resolution.
    Transient,
}

impl Lifetime {
    /// All lifetimes, longest-lived first.
    pub const ALL: [Lifetime; 3] = [Lifetime::Singleton, Lifetime::Scoped, Lifetime::Transient];

    /// Longevity rank; larger lives longer.
    pub const fn rank(self) -> u8 {
        match self {
            Self::Singleton => 2,
            Self::Scoped => 1,
            Self::Transient => 0,
        }
    }

    /// Returns `true` if an instance with this lifetime outlives one with `other`.
    pub const fn outlives(self, other: Lifetime) -> bool {
        self.rank() > other.rank()
    }

    /// Lowercase name, as used in configuration and exported documents.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Singleton => "singleton",
            Self::Scoped => "scoped",
            Self::Transient => "transient",
        }
    }
}

impl fmt::Display for Lifetime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Singleton => "Singleton",
            Self::Scoped => "Scoped",
            Self::Transient => "Transient",
        };
        f.write_str(name)
    }
}

// ─── ResolutionKind ───────────────────────────────────────────────────────────

/// How a constructor parameter asks the container for its dependency.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case", tag = "kind", content = "key")]
pub enum ResolutionKind {
    /// Resolve the single registered implementation now.
    #[default]
    Direct,
    /// Resolve the implementation registered under the given key.
    Keyed(String),
    /// Resolve every registered implementation.
    Collection,
    /// Resolve on first access.
    Lazy,
    /// Receive a factory that resolves on demand.
    Factory,
}

impl ResolutionKind {
    /// Soft edges are resolved after construction and never take part in
    /// cycle or captivity analysis.
    pub const fn is_soft(&self) -> bool {
        matches!(self, Self::Collection | Self::Lazy | Self::Factory)
    }

    /// Short lowercase label.
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Direct => "direct",
            Self::Keyed(_) => "keyed",
            Self::Collection => "collection",
            Self::Lazy => "lazy",
            Self::Factory => "factory",
        }
    }

    /// The service key, for keyed resolutions.
    pub fn key(&self) -> Option<&str> {
        match self {
            Self::Keyed(key) => Some(key),
            _ => None,
        }
    }
}
