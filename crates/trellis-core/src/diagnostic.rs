//! Planner diagnostics.
//!
//! Diagnostics are data, not errors: the planner always returns a plan and
//! attaches every finding to it. Severity decides whether the affected part
//! of the plan is withheld ([`Severity::Error`]) or emitted with the finding
//! recorded alongside ([`Severity::Warning`], [`Severity::Info`]).

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::UnknownDiagnosticKind;
use crate::metadata::TypeRef;

// ─── Severity ─────────────────────────────────────────────────────────────────

/// Intrinsic severity of a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Error => "error",
        };
        f.write_str(name)
    }
}

// ─── DiagnosticKind ───────────────────────────────────────────────────────────

/// The closed taxonomy of planner findings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    /// Hard dependency edges form a cycle.
    CircularDependency,
    /// A longer-lived consumer holds a shorter-lived disposable dependency.
    DisposableCaptiveDependency,
    /// A longer-lived consumer holds a shorter-lived, non-disposable dependency.
    LifetimeMismatch,
    /// A decorator has nothing to wrap.
    InertDecorator,
    /// An interceptor has nothing to intercept.
    InertInterceptor,
    /// A keyed dependency matches no discovered implementation.
    UnresolvedKeyedReference,
    /// A collection dependency matches no discovered implementation.
    NoImplementationsForCollection,
    /// Two members of an ordered pipeline share a sequence position.
    DuplicateSequenceOrder,
    /// A qualifying candidate is not reachable from the consuming assembly.
    InaccessibleCandidate,
}

impl DiagnosticKind {
    /// Every kind, in declaration order.
    pub const ALL: [DiagnosticKind; 9] = [
        Self::CircularDependency,
        Self::DisposableCaptiveDependency,
        Self::LifetimeMismatch,
        Self::InertDecorator,
        Self::InertInterceptor,
        Self::UnresolvedKeyedReference,
        Self::NoImplementationsForCollection,
        Self::DuplicateSequenceOrder,
        Self::InaccessibleCandidate,
    ];

    /// The severity the planner assigns to this kind.
    pub const fn severity(self) -> Severity {
        match self {
            Self::CircularDependency
            | Self::DisposableCaptiveDependency
            | Self::DuplicateSequenceOrder
            | Self::InaccessibleCandidate => Severity::Error,
            Self::LifetimeMismatch | Self::InertDecorator | Self::InertInterceptor => {
                Severity::Warning
            }
            // External registration may still supply these.
            Self::UnresolvedKeyedReference | Self::NoImplementationsForCollection => {
                Severity::Info
            }
        }
    }

    /// Stable PascalCase name.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::CircularDependency => "CircularDependency",
            Self::DisposableCaptiveDependency => "DisposableCaptiveDependency",
            Self::LifetimeMismatch => "LifetimeMismatch",
            Self::InertDecorator => "InertDecorator",
            Self::InertInterceptor => "InertInterceptor",
            Self::UnresolvedKeyedReference => "UnresolvedKeyedReference",
            Self::NoImplementationsForCollection => "NoImplementationsForCollection",
            Self::DuplicateSequenceOrder => "DuplicateSequenceOrder",
            Self::InaccessibleCandidate => "InaccessibleCandidate",
        }
    }
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Accepts the PascalCase name or its snake_case spelling.
impl FromStr for DiagnosticKind {
    type Err = UnknownDiagnosticKind;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        let folded = name.replace('_', "");
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(&folded))
            .ok_or_else(|| UnknownDiagnosticKind(name.to_string()))
    }
}

// ─── Diagnostic ───────────────────────────────────────────────────────────────

/// A single planner finding.
///
/// The first entry of `affected` is the diagnostic's subject: the candidate
/// whose registrations are withheld when the diagnostic is an error.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub kind: DiagnosticKind,
    pub message: String,
    pub affected: Vec<TypeRef>,
}

impl Diagnostic {
    /// Creates a diagnostic with the kind's intrinsic severity.
    pub fn new(kind: DiagnosticKind, message: impl Into<String>, affected: Vec<TypeRef>) -> Self {
        Self {
            severity: kind.severity(),
            kind,
            message: message.into(),
            affected,
        }
    }

    /// The identity this diagnostic is about.
    pub fn subject(&self) -> Option<&TypeRef> {
        self.affected.first()
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}]: {}", self.severity, self.kind, self.message)
    }
}

// ─── DiagnosticLog ────────────────────────────────────────────────────────────

/// Ordered collection of diagnostics attached to a plan.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DiagnosticLog {
    entries: Vec<Diagnostic>,
}

impl DiagnosticLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        self.entries.push(diagnostic);
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Diagnostic> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Diagnostics of the given kind.
    pub fn of_kind(&self, kind: DiagnosticKind) -> impl Iterator<Item = &Diagnostic> {
        self.entries.iter().filter(move |d| d.kind == kind)
    }

    /// Error-severity diagnostics.
    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.entries.iter().filter(|d| d.is_error())
    }

    pub fn has_errors(&self) -> bool {
        self.entries.iter().any(Diagnostic::is_error)
    }

    /// Number of diagnostics with the given severity.
    pub fn count(&self, severity: Severity) -> usize {
        self.entries.iter().filter(|d| d.severity == severity).count()
    }

    /// Sorts into canonical order: most severe first, then kind, subject and
    /// message. Exact duplicates are collapsed.
    pub fn canonicalize(&mut self) {
        self.entries.sort_by(|a, b| {
            b.severity
                .cmp(&a.severity)
                .then(a.kind.cmp(&b.kind))
                .then_with(|| a.affected.cmp(&b.affected))
                .then_with(|| a.message.cmp(&b.message))
        });
        self.entries.dedup();
    }
}

impl Extend<Diagnostic> for DiagnosticLog {
    fn extend<I: IntoIterator<Item = Diagnostic>>(&mut self, iter: I) {
        self.entries.extend(iter);
    }
}

impl FromIterator<Diagnostic> for DiagnosticLog {
    fn from_iter<I: IntoIterator<Item = Diagnostic>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a DiagnosticLog {
    type Item = &'a Diagnostic;
    type IntoIter = std::slice::Iter<'a, Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}
