//! # Trellis Core
//!
//! The metadata model shared by every part of the Trellis registration
//! planner.
//!
//! This crate provides:
//! - **Metadata Model**: [`CandidateType`] and its declarations (constructors,
//!   decorators, interceptors, plugin order, service keys, capability tags)
//! - **Diagnostics**: the closed [`DiagnosticKind`] taxonomy and the
//!   [`DiagnosticLog`] attached to every plan
//! - **Sources**: the [`CandidateSource`] seam over discovery front ends
//! - **Registry**: the caller-owned, merge-only [`CandidateRegistry`] and
//!   link-time [`contributor!`] declarations
//!
//! ## Data flow
//!
//! ```text
//! ┌──────────────┐     ┌───────────────────┐     ┌─────────┐     ┌──────────────────┐
//! │ Source (live)│────▶│                   │     │         │     │                  │
//! └──────────────┘     │ CandidateRegistry │────▶│ Planner │────▶│ RegistrationPlan │
//! ┌──────────────┐     │   (merge-only)    │     │         │     │  + DiagnosticLog │
//! │Source (AOT)  │────▶│                   │     │         │     │                  │
//! └──────────────┘     └───────────────────┘     └─────────┘     └──────────────────┘
//! ```

pub mod diagnostic;
pub mod error;
pub mod metadata;
pub mod registry;
pub mod source;

pub use diagnostic::{Diagnostic, DiagnosticKind, DiagnosticLog, Severity};
pub use error::{RegistryError, RegistryResult, SourceError, SourceResult, UnknownDiagnosticKind};
pub use metadata::{
    Accessibility, CandidateType, Capability, Constructor, DecoratorDeclaration, ExclusionFlags,
    InterceptorDeclaration, Lifetime, Parameter, ParameterCategory, ResolutionKind,
    SourceLocation, TypeRef,
};
pub use registry::{CONTRIBUTORS, CandidateRegistry, Contributor, Registration};
pub use source::{BoxedSource, CandidateSource, StaticSource};

#[doc(hidden)]
pub use linkme;

/// Prelude for common imports.
pub mod prelude {
    pub use super::diagnostic::{Diagnostic, DiagnosticKind, Severity};
    pub use super::metadata::*;
    pub use super::registry::CandidateRegistry;
    pub use super::source::{CandidateSource, StaticSource};
}
