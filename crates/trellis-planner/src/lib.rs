//! # Trellis Planner
//!
//! Turns a unified set of [`CandidateType`](trellis_core::CandidateType)s
//! into a deterministic [`RegistrationPlan`].
//!
//! ## Pipeline
//!
//! ```text
//! candidates ─▶ lifetime ─▶ graph ─┬─▶ cycle    ─┐
//!                                  ├─▶ captive  ─┤
//!                                  ├─▶ chain    ─┼─▶ emitter ─▶ RegistrationPlan
//!                                  └─▶ plugin   ─┘                 │
//!                                                                  └─▶ export (JSON)
//! ```
//!
//! Every stage is synchronous and side-effect free. Candidates are processed
//! in identity order and every sort uses a total order, so the same input in
//! any order produces the same plan.

pub mod captive;
pub mod chain;
pub mod cycle;
pub mod emitter;
pub mod export;
pub mod graph;
pub mod lifetime;
pub mod plan;
pub mod plugin;

pub use chain::{Assembly, DecoratorChain, DecoratorLink, InterceptorChain, InterceptorLink};
pub use emitter::{Analysis, Planner, PlannerOptions};
pub use export::{GraphSnapshot, SCHEMA_VERSION, ServiceSnapshot, Statistics};
pub use graph::{DependencyEdge, DependencyGraph, EdgeTarget, Node, NodeId};
pub use lifetime::Resolution;
pub use plan::{
    Argument, ConstructionExpression, RegistrationPlan, ServiceRegistration, WithheldService,
};
pub use plugin::{PluginSequence, SequencedPlugin};
