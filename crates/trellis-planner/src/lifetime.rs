//! Effective lifetime resolution.
//!
//! Explicit declarations always win. Otherwise the resolver only ever infers
//! [`Lifetime::Singleton`]: structural inference never guesses `Scoped` or
//! `Transient`. Background services are always kept, even when none of their
//! constructors qualifies.

use trellis_core::{CandidateType, Constructor, Lifetime, Parameter};

/// The outcome of resolving one candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolution {
    /// Effective lifetime.
    pub lifetime: Lifetime,
    /// Index of the selected constructor, or `None` for the implicit
    /// parameterless constructor of a candidate that declares none.
    pub constructor: Option<usize>,
}

impl Resolution {
    /// Parameters of the selected constructor.
    pub fn parameters<'a>(&self, candidate: &'a CandidateType) -> &'a [Parameter] {
        self.constructor
            .and_then(|index| candidate.constructors.get(index))
            .map(|ctor| ctor.parameters.as_slice())
            .unwrap_or(&[])
    }
}

/// Resolves `candidate`'s lifetime and constructor.
///
/// Returns `None` when the candidate cannot be proven safe to construct; the
/// caller drops such candidates without a diagnostic.
pub fn resolve(candidate: &CandidateType) -> Option<Resolution> {
    if declares_not_injectable(candidate) {
        return None;
    }

    let constructor = match select_constructor(candidate) {
        Some(constructor) => constructor,
        None if candidate.is_background_service() => Some(0),
        None => return None,
    };
    let lifetime = candidate.declared_lifetime.unwrap_or(Lifetime::Singleton);

    Some(Resolution {
        lifetime,
        constructor,
    })
}

/// Picks the first qualifying constructor in declaration order.
///
/// `Some(None)` is the implicit parameterless constructor; `None` means no
/// constructor qualifies.
fn select_constructor(candidate: &CandidateType) -> Option<Option<usize>> {
    if candidate.constructors.is_empty() {
        return Some(None);
    }
    candidate
        .constructors
        .iter()
        .position(qualifies)
        .map(Some)
}

fn qualifies(ctor: &Constructor) -> bool {
    ctor.parameters.iter().all(Parameter::is_reference)
}

/// A constructor taking only the candidate's own type marks wrapper base
/// classes that must never be injected.
fn declares_not_injectable(candidate: &CandidateType) -> bool {
    candidate
        .constructors
        .iter()
        .any(|ctor| ctor.parameters.len() == 1 && ctor.parameters[0].ty == candidate.identity)
}
