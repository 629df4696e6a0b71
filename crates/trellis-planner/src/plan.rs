//! The emitted registration plan.
//!
//! A [`RegistrationPlan`] is immutable once built and serializes with serde,
//! so code renderers and container builders can consume it out of process.

use serde::Serialize;
use trellis_core::{DiagnosticLog, Lifetime, Parameter, ResolutionKind, TypeRef};

use crate::chain::{DecoratorChain, InterceptorChain};
use crate::graph::Node;
use crate::plugin::PluginSequence;

// ─── Construction ─────────────────────────────────────────────────────────────

/// One constructor argument, in parameter order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Argument {
    Resolve(TypeRef),
    ResolveKeyed { ty: TypeRef, key: String },
    ResolveAll(TypeRef),
    Lazy(TypeRef),
    Factory(TypeRef),
    /// The implementation wrapped by a decorator.
    Inner(TypeRef),
}

impl Argument {
    pub(crate) fn for_parameter(owner: &Node<'_>, parameter: &Parameter) -> Self {
        let ty = parameter.ty.clone();
        if owner.candidate.decorates_target(&ty) {
            return Self::Inner(ty);
        }
        match &parameter.resolution {
            ResolutionKind::Direct => Self::Resolve(ty),
            ResolutionKind::Keyed(key) => Self::ResolveKeyed {
                ty,
                key: key.clone(),
            },
            ResolutionKind::Collection => Self::ResolveAll(ty),
            ResolutionKind::Lazy => Self::Lazy(ty),
            ResolutionKind::Factory => Self::Factory(ty),
        }
    }

    /// Arguments of `node`'s selected constructor.
    pub(crate) fn list(node: &Node<'_>) -> Vec<Self> {
        node.parameters
            .iter()
            .map(|parameter| Self::for_parameter(node, parameter))
            .collect()
    }
}

/// How the container obtains the instance for one registration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConstructionExpression {
    /// Invoke the selected constructor.
    Construct { arguments: Vec<Argument> },
    /// Reuse the instance registered for the given implementation.
    Forward(TypeRef),
}

// ─── Registrations ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServiceRegistration {
    pub abstraction: TypeRef,
    pub implementation: TypeRef,
    pub lifetime: Lifetime,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    pub construction: ConstructionExpression,
}

impl ServiceRegistration {
    /// Returns `true` when the registration is the implementation itself.
    pub fn is_self_registration(&self) -> bool {
        self.abstraction == self.implementation
    }
}

/// A candidate whose registrations were withheld by an error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WithheldService {
    pub implementation: TypeRef,
    /// Subjects of the errors that block it, ascending.
    pub blocked_by: Vec<TypeRef>,
}

// ─── Plan ─────────────────────────────────────────────────────────────────────

/// The planner's output.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegistrationPlan {
    registrations: Vec<ServiceRegistration>,
    decorator_chains: Vec<DecoratorChain>,
    interceptor_chains: Vec<InterceptorChain>,
    plugins: PluginSequence,
    withheld: Vec<WithheldService>,
    diagnostics: DiagnosticLog,
}

impl RegistrationPlan {
    pub(crate) fn new(
        registrations: Vec<ServiceRegistration>,
        decorator_chains: Vec<DecoratorChain>,
        interceptor_chains: Vec<InterceptorChain>,
        plugins: PluginSequence,
        withheld: Vec<WithheldService>,
        diagnostics: DiagnosticLog,
    ) -> Self {
        Self {
            registrations,
            decorator_chains,
            interceptor_chains,
            plugins,
            withheld,
            diagnostics,
        }
    }

    pub fn registrations(&self) -> &[ServiceRegistration] {
        &self.registrations
    }

    /// Registrations under `abstraction`, in plan order.
    pub fn registrations_for(&self, abstraction: &TypeRef) -> Vec<&ServiceRegistration> {
        self.registrations
            .iter()
            .filter(|r| &r.abstraction == abstraction)
            .collect()
    }

    /// Returns `true` if `implementation` has at least one registration.
    pub fn is_registered(&self, implementation: &TypeRef) -> bool {
        self.registrations
            .iter()
            .any(|r| &r.implementation == implementation)
    }

    pub fn decorator_chains(&self) -> &[DecoratorChain] {
        &self.decorator_chains
    }

    pub fn decorator_chain(&self, target: &TypeRef) -> Option<&DecoratorChain> {
        self.decorator_chains.iter().find(|c| &c.target == target)
    }

    pub fn interceptor_chains(&self) -> &[InterceptorChain] {
        &self.interceptor_chains
    }

    pub fn plugins(&self) -> &PluginSequence {
        &self.plugins
    }

    pub fn withheld(&self) -> &[WithheldService] {
        &self.withheld
    }

    pub fn is_withheld(&self, implementation: &TypeRef) -> bool {
        self.withheld
            .iter()
            .any(|w| &w.implementation == implementation)
    }

    pub fn diagnostics(&self) -> &DiagnosticLog {
        &self.diagnostics
    }

    /// Returns `true` if any error-severity diagnostic was raised.
    pub fn has_errors(&self) -> bool {
        self.diagnostics.has_errors()
    }
}
