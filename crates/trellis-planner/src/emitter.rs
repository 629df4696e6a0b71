//! Plan emission.
//!
//! The [`Planner`] runs every analysis over one graph and folds the results
//! into a [`RegistrationPlan`]. Errors withhold their subject and every
//! transitive consumer of it over hard edges; the rest of the graph still
//! emits. Warnings and infos never withhold anything.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};
use trellis_core::{CandidateType, Diagnostic, DiagnosticKind, DiagnosticLog, Lifetime, TypeRef};

use crate::chain::{self, DecoratorChain, InterceptorChain};
use crate::graph::{DependencyGraph, Node, NodeId};
use crate::plan::{
    Argument, ConstructionExpression, RegistrationPlan, ServiceRegistration, WithheldService,
};
use crate::plugin;
use crate::{captive, cycle};

/// Planner settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlannerOptions {
    /// Assembly that will construct the services. When set, candidates it
    /// cannot reach are reported as inaccessible.
    pub consuming_assembly: Option<String>,
    /// Reject plugins sharing an explicitly declared order.
    pub strict_plugin_order: bool,
}

impl PlannerOptions {
    pub fn consuming_assembly(mut self, assembly: impl Into<String>) -> Self {
        self.consuming_assembly = Some(assembly.into());
        self
    }

    pub fn strict_plugin_order(mut self, strict: bool) -> Self {
        self.strict_plugin_order = strict;
        self
    }
}

/// A plan together with the graph it was derived from.
#[derive(Debug)]
pub struct Analysis<'a> {
    pub graph: DependencyGraph<'a>,
    pub plan: RegistrationPlan,
}

/// Turns a unified candidate set into a [`RegistrationPlan`].
///
/// # Example
///
/// ```rust,ignore
/// let plan = Planner::default().plan(&registry.snapshot());
/// for registration in plan.registrations() {
///     println!("{} -> {}", registration.abstraction, registration.implementation);
/// }
/// ```
#[derive(Debug, Clone, Default)]
pub struct Planner {
    options: PlannerOptions,
}

impl Planner {
    pub fn new(options: PlannerOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &PlannerOptions {
        &self.options
    }

    /// Plans `candidates`. Input order does not affect the result.
    pub fn plan(&self, candidates: &[CandidateType]) -> RegistrationPlan {
        self.analyze(candidates).plan
    }

    /// Plans `candidates` and keeps the dependency graph for inspection.
    #[instrument(skip_all, fields(candidates = candidates.len()))]
    pub fn analyze<'a>(&self, candidates: &'a [CandidateType]) -> Analysis<'a> {
        let graph = DependencyGraph::build(candidates);

        let mut diagnostics: Vec<Diagnostic> = graph.diagnostics().to_vec();
        if let Some(consumer) = &self.options.consuming_assembly {
            diagnostics.extend(inaccessible(&graph, consumer));
        }
        diagnostics.extend(cycle::detect(&graph));
        diagnostics.extend(captive::check(&graph));

        let assembly = chain::assemble(&graph);
        diagnostics.extend(assembly.diagnostics);

        let (mut plugins, plugin_diagnostics) =
            plugin::sequence(&graph, self.options.strict_plugin_order);
        diagnostics.extend(plugin_diagnostics);

        let blocked = blocked_nodes(&graph, &diagnostics);

        let registrations: Vec<ServiceRegistration> = graph
            .nodes()
            .iter()
            .filter(|node| !blocked.contains_key(&node.id))
            .flat_map(emit_registrations)
            .collect();

        let blocked_identities: BTreeSet<&TypeRef> = blocked
            .keys()
            .map(|&id| graph.node(id).identity())
            .collect();
        let decorator_chains =
            effective_decorators(&graph, assembly.decorators, &blocked_identities);
        let interceptor_chains: Vec<InterceptorChain> = assembly
            .interceptors
            .into_iter()
            .filter(|chain| !blocked_identities.contains(&chain.target))
            .collect();
        plugins.retain(|p| !blocked_identities.contains(&p.plugin));

        let withheld: Vec<WithheldService> = blocked
            .into_iter()
            .map(|(id, roots)| WithheldService {
                implementation: graph.node(id).identity().clone(),
                blocked_by: roots.into_iter().collect(),
            })
            .collect();

        let mut log: DiagnosticLog = diagnostics.into_iter().collect();
        log.canonicalize();

        info!(
            nodes = graph.len(),
            registrations = registrations.len(),
            decorator_chains = decorator_chains.len(),
            interceptor_chains = interceptor_chains.len(),
            plugins = plugins.len(),
            withheld = withheld.len(),
            errors = log.errors().count(),
            "Registration plan emitted"
        );

        let plan = RegistrationPlan::new(
            registrations,
            decorator_chains,
            interceptor_chains,
            plugins,
            withheld,
            log,
        );
        Analysis { graph, plan }
    }
}

// ─── Accessibility ────────────────────────────────────────────────────────────

fn inaccessible(graph: &DependencyGraph<'_>, consumer: &str) -> Vec<Diagnostic> {
    graph
        .nodes()
        .iter()
        .filter(|node| {
            let candidate = node.candidate;
            !candidate
                .accessibility
                .reachable_from(&candidate.identity.assembly, consumer)
        })
        .map(|node| {
            let candidate = node.candidate;
            let location = candidate
                .source_location
                .as_ref()
                .map(|l| format!(" (declared at {}:{})", l.file, l.line))
                .unwrap_or_default();
            Diagnostic::new(
                DiagnosticKind::InaccessibleCandidate,
                format!(
                    "'{}' is {:?} in assembly '{}' and cannot be constructed from '{}'{}",
                    candidate.identity,
                    candidate.accessibility,
                    candidate.identity.assembly,
                    consumer,
                    location
                ),
                vec![candidate.identity.clone()],
            )
        })
        .collect()
}

// ─── Blocking ─────────────────────────────────────────────────────────────────

/// Maps every withheld node to the error subjects that withhold it.
fn blocked_nodes(
    graph: &DependencyGraph<'_>,
    diagnostics: &[Diagnostic],
) -> BTreeMap<NodeId, BTreeSet<TypeRef>> {
    let mut consumers: Vec<Vec<NodeId>> = vec![Vec::new(); graph.len()];
    for edge in graph.hard_edges() {
        for dependency in edge.hard_targets() {
            consumers[dependency].push(edge.consumer);
        }
    }

    let roots: BTreeSet<NodeId> = diagnostics
        .iter()
        .filter(|d| d.is_error())
        .filter_map(Diagnostic::subject)
        .filter_map(|subject| graph.node_by_identity(subject))
        .map(|node| node.id)
        .collect();

    let mut blocked: BTreeMap<NodeId, BTreeSet<TypeRef>> = BTreeMap::new();
    for root in roots {
        let cause = graph.node(root).identity().clone();
        let mut seen = vec![false; graph.len()];
        let mut queue = VecDeque::from([root]);
        seen[root] = true;
        while let Some(id) = queue.pop_front() {
            blocked.entry(id).or_default().insert(cause.clone());
            for &consumer in &consumers[id] {
                if !seen[consumer] {
                    seen[consumer] = true;
                    queue.push_back(consumer);
                }
            }
        }
    }

    if !blocked.is_empty() {
        debug!(withheld = blocked.len(), "Registrations withheld by errors");
    }
    blocked
}

// ─── Registrations ────────────────────────────────────────────────────────────

/// Every registration of one node: a primary construction first, then each
/// service abstraction, then keyed entries.
fn emit_registrations(node: &Node<'_>) -> Vec<ServiceRegistration> {
    let candidate = node.candidate;
    let identity = &candidate.identity;

    let mut targets: Vec<&TypeRef> = candidate.service_abstractions().collect();
    if candidate.is_self_registered() {
        targets.push(identity);
    }
    if targets.is_empty() {
        return Vec::new();
    }

    let keyed: Vec<(&String, &TypeRef)> = candidate
        .service_keys
        .iter()
        .flat_map(|key| targets.iter().map(move |&target| (key, target)))
        .collect();

    let construct = ConstructionExpression::Construct {
        arguments: Argument::list(node),
    };
    let entry = |abstraction: &TypeRef, key: Option<&String>, construction| ServiceRegistration {
        abstraction: abstraction.clone(),
        implementation: identity.clone(),
        lifetime: node.lifetime,
        key: key.cloned(),
        construction,
    };

    let shared = node.lifetime != Lifetime::Transient && targets.len() + keyed.len() > 1;
    if !shared {
        return targets
            .iter()
            .map(|&target| entry(target, None, construct.clone()))
            .chain(
                keyed
                    .iter()
                    .map(|&(key, target)| entry(target, Some(key), construct.clone())),
            )
            .collect();
    }

    let forward = ConstructionExpression::Forward(identity.clone());
    let mut registrations = vec![entry(identity, None, construct)];
    registrations.extend(
        targets
            .iter()
            .filter(|&&target| target != identity)
            .map(|&target| entry(target, None, forward.clone())),
    );
    registrations.extend(
        keyed
            .iter()
            .map(|&(key, target)| entry(target, Some(key), forward.clone())),
    );
    registrations
}

// ─── Chains ─────────────────────────────────────────────────────────────────

fn effective_decorators(
    graph: &DependencyGraph<'_>,
    chains: Vec<DecoratorChain>,
    blocked: &BTreeSet<&TypeRef>,
) -> Vec<DecoratorChain> {
    chains
        .into_iter()
        .filter_map(|mut chain| {
            chain
                .decorators
                .retain(|link| !blocked.contains(&link.decorator));
            let has_base = graph
                .implementers(&chain.target)
                .iter()
                .any(|&id| !blocked.contains(graph.node(id).identity()));
            (has_base && !chain.is_empty()).then_some(chain)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use trellis_core::{Accessibility, Constructor, Parameter};

    fn ty(name: &str) -> TypeRef {
        TypeRef::new(name, "App")
    }

    fn plan(candidates: &[CandidateType]) -> RegistrationPlan {
        Planner::default().plan(candidates)
    }

    #[test]
    fn test_single_abstraction_constructs_directly() {
        let candidates = vec![
            CandidateType::new(ty("Clock")).implements(ty("IClock")),
            CandidateType::new(ty("Greeter"))
                .implements(ty("IGreeter"))
                .constructor(Constructor::new().param(Parameter::service(ty("IClock")))),
        ];
        let plan = plan(&candidates);

        assert_eq!(plan.registrations().len(), 2);
        let greeter = plan.registrations_for(&ty("IGreeter"))[0];
        assert_eq!(greeter.implementation, ty("Greeter"));
        assert_eq!(greeter.lifetime, Lifetime::Singleton);
        assert_eq!(
            greeter.construction,
            ConstructionExpression::Construct {
                arguments: vec![Argument::Resolve(ty("IClock"))]
            }
        );
    }

    #[test]
    fn test_shared_instance_forwards_extra_abstractions() {
        let candidates = vec![
            CandidateType::new(ty("Cache"))
                .implements(ty("IReader"))
                .implements(ty("IWriter"))
                .keyed("main"),
        ];
        let plan = plan(&candidates);

        let rendered: Vec<(String, Option<String>, bool)> = plan
            .registrations()
            .iter()
            .map(|r| {
                (
                    r.abstraction.to_string(),
                    r.key.clone(),
                    matches!(r.construction, ConstructionExpression::Forward(_)),
                )
            })
            .collect();
        assert_eq!(
            rendered,
            vec![
                ("Cache".to_string(), None, false),
                ("IReader".to_string(), None, true),
                ("IWriter".to_string(), None, true),
                ("IReader".to_string(), Some("main".to_string()), true),
                ("IWriter".to_string(), Some("main".to_string()), true),
            ]
        );
    }

    #[test]
    fn test_transient_registrations_construct_each_time() {
        let candidates = vec![
            CandidateType::new(ty("Token"))
                .implements(ty("IA"))
                .implements(ty("IB"))
                .lifetime(Lifetime::Transient),
        ];
        let plan = plan(&candidates);

        assert_eq!(plan.registrations().len(), 2);
        assert!(
            plan.registrations()
                .iter()
                .all(|r| matches!(r.construction, ConstructionExpression::Construct { .. }))
        );
    }

    #[test]
    fn test_self_registration_and_decorator_only_candidates() {
        let candidates = vec![
            CandidateType::new(ty("Clock")),
            CandidateType::new(ty("OrderService")).implements(ty("IOrderService")),
            CandidateType::new(ty("LoggingDecorator"))
                .implements(ty("IOrderService"))
                .decorates(ty("IOrderService"), 0)
                .constructor(Constructor::new().param(Parameter::service(ty("IOrderService")))),
        ];
        let plan = plan(&candidates);

        let clock = plan.registrations_for(&ty("Clock"))[0];
        assert!(clock.is_self_registration());
        assert!(!plan.is_registered(&ty("LoggingDecorator")));
        assert_eq!(plan.decorator_chains().len(), 1);
    }

    #[test]
    fn test_error_withholds_subject_and_consumers_only() {
        // Api → Cache (Singleton) → Db (Scoped, disposable); Other is untouched.
        let candidates = vec![
            CandidateType::new(ty("Api"))
                .lifetime(Lifetime::Scoped)
                .constructor(Constructor::new().param(Parameter::service(ty("Cache")))),
            CandidateType::new(ty("Cache"))
                .constructor(Constructor::new().param(Parameter::service(ty("Db")))),
            CandidateType::new(ty("Db")).lifetime(Lifetime::Scoped).disposable(),
            CandidateType::new(ty("Other")),
        ];
        let plan = plan(&candidates);

        assert!(plan.has_errors());
        assert!(plan.is_withheld(&ty("Cache")));
        assert!(plan.is_withheld(&ty("Api")));
        assert!(!plan.is_withheld(&ty("Db")));
        assert!(plan.is_registered(&ty("Db")));
        assert!(plan.is_registered(&ty("Other")));
        assert_eq!(plan.withheld()[0].implementation, ty("Api"));
        assert_eq!(plan.withheld()[0].blocked_by, vec![ty("Cache")]);
    }

    #[test]
    fn test_warnings_never_withhold() {
        let candidates = vec![
            CandidateType::new(ty("Cache"))
                .constructor(Constructor::new().param(Parameter::service(ty("Settings")))),
            CandidateType::new(ty("Settings")).lifetime(Lifetime::Transient),
        ];
        let plan = plan(&candidates);

        assert_eq!(plan.diagnostics().len(), 1);
        assert!(!plan.has_errors());
        assert!(plan.withheld().is_empty());
        assert_eq!(plan.registrations().len(), 2);
    }

    #[test]
    fn test_inaccessible_candidates() {
        let candidates = vec![
            CandidateType::new(TypeRef::new("Lib.Hidden", "Lib"))
                .accessibility(Accessibility::Internal)
                .located_at("src/Hidden.cs", 12),
            CandidateType::new(TypeRef::new("App.Local", "App"))
                .accessibility(Accessibility::Internal),
            CandidateType::new(TypeRef::new("App.Secret", "App"))
                .accessibility(Accessibility::Private),
        ];
        let planner = Planner::new(PlannerOptions::default().consuming_assembly("App"));
        let plan = planner.plan(&candidates);

        let subjects: Vec<_> = plan
            .diagnostics()
            .of_kind(DiagnosticKind::InaccessibleCandidate)
            .filter_map(Diagnostic::subject)
            .map(|t| t.name.as_str())
            .collect();
        assert_eq!(subjects, vec!["App.Secret", "Lib.Hidden"]);
        assert!(plan.is_registered(&TypeRef::new("App.Local", "App")));
        assert!(
            plan.diagnostics()
                .iter()
                .any(|d| d.message.contains("src/Hidden.cs:12"))
        );
    }

    #[test]
    fn test_accessibility_unchecked_without_consumer() {
        let candidates =
            vec![CandidateType::new(ty("Secret")).accessibility(Accessibility::Private)];
        let plan = plan(&candidates);
        assert!(plan.diagnostics().is_empty());
        assert!(plan.is_registered(&ty("Secret")));
    }

    #[test]
    fn test_blocked_decorator_leaves_chain() {
        let candidates = vec![
            CandidateType::new(ty("OrderService")).implements(ty("IOrderService")),
            CandidateType::new(ty("Audit"))
                .implements(ty("IOrderService"))
                .decorates(ty("IOrderService"), 0)
                .constructor(
                    Constructor::new()
                        .param(Parameter::service(ty("IOrderService")))
                        .param(Parameter::service(ty("Db"))),
                ),
            CandidateType::new(ty("Db")).lifetime(Lifetime::Scoped).disposable(),
        ];
        let plan = plan(&candidates);

        assert!(plan.is_withheld(&ty("Audit")));
        assert!(plan.decorator_chains().is_empty());
        assert!(plan.is_registered(&ty("OrderService")));
    }
}
