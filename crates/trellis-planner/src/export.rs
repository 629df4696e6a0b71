//! Schema-versioned graph export.
//!
//! A [`GraphSnapshot`] flattens an [`Analysis`] into a JSON document for
//! tooling: one entry per service with its resolved dependencies and applied
//! decorators and interceptors, plus summary statistics.

use serde::{Deserialize, Serialize};
use trellis_core::{
    DiagnosticLog, Lifetime, ResolutionKind, Severity, SourceLocation, TypeRef,
};

use crate::emitter::Analysis;
use crate::graph::{DependencyGraph, EdgeTarget, Node};
use crate::plan::RegistrationPlan;

/// Version of the exported document layout.
pub const SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DependencySnapshot {
    #[serde(rename = "type")]
    pub ty: TypeRef,
    pub resolution: ResolutionKind,
    /// Implementations the dependency resolves to; empty when unresolved.
    pub resolved: Vec<TypeRef>,
    /// Whether the dependency takes part in cycle and captivity analysis.
    pub hard: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppliedDecorator {
    pub target: TypeRef,
    pub decorator: TypeRef,
    pub order: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppliedInterceptor {
    pub method: String,
    pub interceptor: TypeRef,
    pub order: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceSnapshot {
    pub identity: TypeRef,
    pub abstractions: Vec<TypeRef>,
    pub lifetime: Lifetime,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_location: Option<SourceLocation>,
    pub dependencies: Vec<DependencySnapshot>,
    pub decorators: Vec<AppliedDecorator>,
    pub interceptors: Vec<AppliedInterceptor>,
    pub service_keys: Vec<String>,
    pub withheld: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Statistics {
    pub services: usize,
    pub singleton: usize,
    pub scoped: usize,
    pub transient: usize,
    pub decorators: usize,
    pub interceptors: usize,
    pub plugins: usize,
    pub withheld: usize,
    pub errors: usize,
    pub warnings: usize,
    pub infos: usize,
}

/// The exported document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphSnapshot {
    pub schema_version: u32,
    pub services: Vec<ServiceSnapshot>,
    /// Plugins in startup order.
    pub plugins: Vec<TypeRef>,
    pub statistics: Statistics,
    pub diagnostics: DiagnosticLog,
}

impl GraphSnapshot {
    /// Captures `analysis`.
    pub fn capture(analysis: &Analysis<'_>) -> Self {
        let Analysis { graph, plan } = analysis;
        let services: Vec<ServiceSnapshot> = graph
            .nodes()
            .iter()
            .map(|node| service_snapshot(graph, plan, node))
            .collect();

        let count = |lifetime: Lifetime| services.iter().filter(|s| s.lifetime == lifetime).count();
        let statistics = Statistics {
            services: services.len(),
            singleton: count(Lifetime::Singleton),
            scoped: count(Lifetime::Scoped),
            transient: count(Lifetime::Transient),
            decorators: plan.decorator_chains().iter().map(|c| c.len()).sum(),
            interceptors: plan
                .interceptor_chains()
                .iter()
                .map(|c| c.interceptors.len())
                .sum(),
            plugins: plan.plugins().len(),
            withheld: plan.withheld().len(),
            errors: plan.diagnostics().count(Severity::Error),
            warnings: plan.diagnostics().count(Severity::Warning),
            infos: plan.diagnostics().count(Severity::Info),
        };

        Self {
            schema_version: SCHEMA_VERSION,
            plugins: plan.plugins().identities().cloned().collect(),
            services,
            statistics,
            diagnostics: plan.diagnostics().clone(),
        }
    }

    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}

fn service_snapshot(
    graph: &DependencyGraph<'_>,
    plan: &RegistrationPlan,
    node: &Node<'_>,
) -> ServiceSnapshot {
    let candidate = node.candidate;

    let dependencies = graph
        .edges_from(node.id)
        .map(|edge| DependencySnapshot {
            ty: edge.dependency.clone(),
            resolution: edge.resolution.clone(),
            resolved: match &edge.target {
                EdgeTarget::Node(id) => vec![graph.node(*id).identity().clone()],
                EdgeTarget::Many(ids) => ids
                    .iter()
                    .map(|&id| graph.node(id).identity().clone())
                    .collect(),
                EdgeTarget::Unresolved | EdgeTarget::Decorated => Vec::new(),
            },
            hard: edge.is_hard(),
        })
        .collect();

    let decorators = candidate
        .service_abstractions()
        .filter_map(|abstraction| plan.decorator_chain(abstraction))
        .flat_map(|chain| {
            chain.decorators.iter().map(|link| AppliedDecorator {
                target: chain.target.clone(),
                decorator: link.decorator.clone(),
                order: link.order,
            })
        })
        .collect();

    let interceptors = plan
        .interceptor_chains()
        .iter()
        .filter(|chain| chain.target == candidate.identity)
        .flat_map(|chain| {
            chain.interceptors.iter().map(|link| AppliedInterceptor {
                method: chain.method.clone(),
                interceptor: link.interceptor.clone(),
                order: link.order,
            })
        })
        .collect();

    ServiceSnapshot {
        identity: candidate.identity.clone(),
        abstractions: candidate.abstractions.iter().cloned().collect(),
        lifetime: node.lifetime,
        source_location: candidate.source_location.clone(),
        dependencies,
        decorators,
        interceptors,
        service_keys: candidate.service_keys.iter().cloned().collect(),
        withheld: plan.is_withheld(&candidate.identity),
    }
}
