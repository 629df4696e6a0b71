//! Candidate metadata model.
//!
//! Both discovery front ends normalise to exactly these shapes; nothing
//! downstream may depend on where a candidate came from.

pub mod candidate;
pub mod lifetime;
pub mod type_ref;

pub use candidate::{
    Accessibility, CandidateType, Capability, Constructor, DecoratorDeclaration, ExclusionFlags,
    InterceptorDeclaration, Parameter, ParameterCategory, SourceLocation,
};
pub use lifetime::{Lifetime, ResolutionKind};
pub use type_ref::TypeRef;
