//! # Trellis
//!
//! A deterministic registration planner for dependency-injection containers.
//!
//! ## Overview
//!
//! Trellis takes metadata about candidate types (their abstractions,
//! constructors, lifetimes and decorator, interceptor and plugin
//! declarations) and emits a [`RegistrationPlan`](planner::RegistrationPlan):
//! registrations, decorator chains, interceptor chains and the plugin
//! startup order, plus a diagnostic log. Planning is a pure function of its
//! input; the same candidates always produce the same plan.
//!
//! ```text
//! ┌─────────────┐     ┌───────────────────┐     ┌─────────┐     ┌──────────────────┐
//! │   Sources   │────▶│ CandidateRegistry │────▶│ Planner │────▶│ RegistrationPlan │
//! └─────────────┘     └───────────────────┘     └─────────┘     └──────────────────┘
//! ```
//!
//! - **Core**: the candidate metadata model, diagnostics and sources
//! - **Planner**: graph analysis (cycles, captive dependencies, chains) and emission
//! - **Runtime**: configuration, logging, discovery and reporting policy
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use trellis::prelude::*;
//!
//! let candidates = vec![
//!     CandidateType::new(TypeRef::new("Shop.OrderService", "Shop"))
//!         .implements(TypeRef::new("Shop.IOrderService", "Shop")),
//! ];
//! let plan = Planner::default().plan(&candidates);
//! assert!(!plan.has_errors());
//! ```
//!
//! ## Features
//!
//! - `toml-config` *(default)*: `trellis.toml` configuration files
//! - `yaml-config`: `trellis.yaml` configuration files
//! - `json-log`: JSON log output

pub use trellis_core as core;
pub use trellis_planner as planner;
pub use trellis_runtime as runtime;

pub use trellis_core::contributor;

/// Prelude module for convenient imports.
///
/// ```rust,ignore
/// use trellis::prelude::*;
/// ```
pub mod prelude {
    pub use trellis_core::prelude::*;
    pub use trellis_planner::{
        ConstructionExpression, DecoratorChain, GraphSnapshot, InterceptorChain, Planner,
        PlannerOptions, RegistrationPlan, ServiceRegistration,
    };
    pub use trellis_runtime::prelude::*;
    pub use trellis_runtime::{DiagnosticReport, RuntimeError, RuntimeResult};
}
