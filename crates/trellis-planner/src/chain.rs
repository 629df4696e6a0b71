//! Decorator and interceptor chain assembly.
//!
//! Decorator chains are stored innermost first: the link at index `i`
//! receives the link at `i - 1` (or the base implementation) as its inner
//! instance.
//!
//! ```text
//! order:        [2, 1, 0]
//! construction:  0 → 1 → 2          (innermost built first)
//! resolution:    2 → 1 → 0 → base   (callers hit the outermost first)
//! ```
//!
//! Interceptor chains are stored outermost first, one chain per intercepted
//! method.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;
use tracing::debug;
use trellis_core::{Diagnostic, DiagnosticKind, TypeRef};

use crate::graph::{DependencyGraph, NodeId};
use crate::plan::Argument;

// ─── Decorators ───────────────────────────────────────────────────────────────

/// One decorator within a chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DecoratorLink {
    pub decorator: TypeRef,
    pub order: i32,
    /// Constructor arguments; the wrapped instance is [`Argument::Inner`].
    pub arguments: Vec<Argument>,
}

/// Every effective decorator of one abstraction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DecoratorChain {
    pub target: TypeRef,
    /// Innermost first.
    pub decorators: Vec<DecoratorLink>,
}

impl DecoratorChain {
    /// Decorators in the order they are constructed (innermost first).
    pub fn construction_order(&self) -> impl Iterator<Item = &TypeRef> {
        self.decorators.iter().map(|link| &link.decorator)
    }

    /// Decorators in the order a call passes through them (outermost first).
    pub fn resolution_order(&self) -> impl Iterator<Item = &TypeRef> {
        self.decorators.iter().rev().map(|link| &link.decorator)
    }

    /// Renders the chain applied to `base`, e.g.
    /// `CachingDecorator(LoggingDecorator(OrderService))`.
    pub fn wrap(&self, base: &TypeRef) -> String {
        self.decorators
            .iter()
            .fold(base.short_name().to_string(), |inner, link| {
                format!("{}({inner})", link.decorator.short_name())
            })
    }

    pub fn len(&self) -> usize {
        self.decorators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.decorators.is_empty()
    }
}

// ─── Interceptors ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InterceptorLink {
    pub interceptor: TypeRef,
    pub order: i32,
}

/// Interceptors applied to one method of one type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InterceptorChain {
    pub target: TypeRef,
    pub method: String,
    /// Outermost first.
    pub interceptors: Vec<InterceptorLink>,
}

// ─── Assembly ─────────────────────────────────────────────────────────────────

/// Output of [`assemble`].
#[derive(Debug, Default)]
pub struct Assembly {
    pub decorators: Vec<DecoratorChain>,
    pub interceptors: Vec<InterceptorChain>,
    pub diagnostics: Vec<Diagnostic>,
}

/// Builds every decorator and interceptor chain of `graph`.
pub fn assemble(graph: &DependencyGraph<'_>) -> Assembly {
    let mut assembly = Assembly::default();
    assemble_decorators(graph, &mut assembly);
    assemble_interceptors(graph, &mut assembly);

    debug!(
        decorator_chains = assembly.decorators.len(),
        interceptor_chains = assembly.interceptors.len(),
        inert = assembly.diagnostics.len(),
        "Chains assembled"
    );
    assembly
}

fn assemble_decorators(graph: &DependencyGraph<'_>, assembly: &mut Assembly) {
    let mut groups: BTreeMap<&TypeRef, Vec<(i32, NodeId)>> = BTreeMap::new();

    for node in graph.nodes() {
        let candidate = node.candidate;
        for declaration in &candidate.decorators {
            let target = &declaration.target;
            if !candidate.abstractions.contains(target) {
                assembly.diagnostics.push(Diagnostic::new(
                    DiagnosticKind::InertDecorator,
                    format!(
                        "'{}' declares itself a decorator of '{}' but does not implement it",
                        candidate.identity, target
                    ),
                    vec![candidate.identity.clone(), target.clone()],
                ));
                continue;
            }
            if graph.implementers(target).is_empty() {
                assembly.diagnostics.push(Diagnostic::new(
                    DiagnosticKind::InertDecorator,
                    format!(
                        "'{}' decorates '{}', which has no implementation to wrap",
                        candidate.identity, target
                    ),
                    vec![candidate.identity.clone(), target.clone()],
                ));
                continue;
            }
            groups
                .entry(target)
                .or_default()
                .push((declaration.order, node.id));
        }
    }

    for (target, mut members) in groups {
        members.sort_by(|a, b| {
            a.0.cmp(&b.0)
                .then_with(|| graph.node(a.1).identity().cmp(graph.node(b.1).identity()))
        });
        let decorators = members
            .iter()
            .map(|&(order, id)| {
                let node = graph.node(id);
                DecoratorLink {
                    decorator: node.identity().clone(),
                    order,
                    arguments: Argument::list(node),
                }
            })
            .collect();
        assembly.decorators.push(DecoratorChain {
            target: target.clone(),
            decorators,
        });
    }
}

fn assemble_interceptors(graph: &DependencyGraph<'_>, assembly: &mut Assembly) {
    for node in graph.nodes() {
        let candidate = node.candidate;
        if candidate.interceptors.is_empty() {
            continue;
        }
        if candidate.abstractions.is_empty() {
            assembly.diagnostics.push(Diagnostic::new(
                DiagnosticKind::InertInterceptor,
                format!(
                    "'{}' declares interceptors but exposes no abstraction to intercept",
                    candidate.identity
                ),
                vec![candidate.identity.clone()],
            ));
            continue;
        }

        let methods: BTreeSet<&str> = candidate
            .methods
            .iter()
            .map(String::as_str)
            .chain(
                candidate
                    .interceptors
                    .iter()
                    .filter_map(|d| d.method.as_deref()),
            )
            .collect();
        if methods.is_empty() {
            assembly.diagnostics.push(Diagnostic::new(
                DiagnosticKind::InertInterceptor,
                format!(
                    "'{}' declares interceptors but has no interceptable method",
                    candidate.identity
                ),
                vec![candidate.identity.clone()],
            ));
            continue;
        }

        for method in methods {
            let mut effective: BTreeMap<&TypeRef, i32> = BTreeMap::new();
            for declaration in candidate.interceptors.iter().filter(|d| d.method.is_none()) {
                effective
                    .entry(&declaration.interceptor)
                    .or_insert(declaration.order);
            }
            for declaration in candidate
                .interceptors
                .iter()
                .filter(|d| d.method.as_deref() == Some(method))
            {
                effective.insert(&declaration.interceptor, declaration.order);
            }
            if effective.is_empty() {
                continue;
            }

            let mut interceptors: Vec<InterceptorLink> = effective
                .into_iter()
                .map(|(interceptor, order)| InterceptorLink {
                    interceptor: interceptor.clone(),
                    order,
                })
                .collect();
            interceptors.sort_by(|a, b| {
                a.order
                    .cmp(&b.order)
                    .then_with(|| a.interceptor.cmp(&b.interceptor))
            });

            assembly.interceptors.push(InterceptorChain {
                target: candidate.identity.clone(),
                method: method.to_string(),
                interceptors,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trellis_core::{CandidateType, Constructor, Parameter, Severity};

    fn ty(name: &str) -> TypeRef {
        TypeRef::new(name, "App")
    }

    fn decorator(name: &str, target: &str, order: i32) -> CandidateType {
        CandidateType::new(ty(name))
            .implements(ty(target))
            .decorates(ty(target), order)
            .constructor(Constructor::new().param(Parameter::service(ty(target))))
    }

    #[test]
    fn test_decorator_order_innermost_first() {
        let candidates = vec![
            CandidateType::new(ty("OrderService")).implements(ty("IOrderService")),
            decorator("Outer", "IOrderService", 2),
            decorator("Middle", "IOrderService", 1),
            decorator("Inner", "IOrderService", 0),
        ];
        let graph = DependencyGraph::build(&candidates);
        let assembly = assemble(&graph);

        let chain = &assembly.decorators[0];
        let construction: Vec<_> = chain.construction_order().map(TypeRef::short_name).collect();
        let resolution: Vec<_> = chain.resolution_order().map(TypeRef::short_name).collect();
        assert_eq!(construction, vec!["Inner", "Middle", "Outer"]);
        assert_eq!(resolution, vec!["Outer", "Middle", "Inner"]);
        assert_eq!(chain.decorators[0].arguments, vec![Argument::Inner(ty("IOrderService"))]);
    }

    #[test]
    fn test_equal_orders_break_ties_by_name() {
        let candidates = vec![
            CandidateType::new(ty("Base")).implements(ty("IService")),
            decorator("Beta", "IService", 1),
            decorator("Alpha", "IService", 1),
        ];
        let graph = DependencyGraph::build(&candidates);
        let chain = &assemble(&graph).decorators[0];
        assert_eq!(chain.wrap(&ty("Base")), "Beta(Alpha(Base))");
    }

    #[test]
    fn test_decorator_without_base_is_inert() {
        let candidates = vec![decorator("Lonely", "IMissing", 0)];
        let graph = DependencyGraph::build(&candidates);
        let assembly = assemble(&graph);

        assert!(assembly.decorators.is_empty());
        assert_eq!(assembly.diagnostics.len(), 1);
        assert_eq!(assembly.diagnostics[0].kind, DiagnosticKind::InertDecorator);
        assert_eq!(assembly.diagnostics[0].severity, Severity::Warning);
    }

    #[test]
    fn test_decorator_not_implementing_target_is_inert() {
        let candidates = vec![
            CandidateType::new(ty("Base")).implements(ty("IService")),
            CandidateType::new(ty("Wrong")).decorates(ty("IService"), 0),
        ];
        let graph = DependencyGraph::build(&candidates);
        let assembly = assemble(&graph);

        assert!(assembly.decorators.is_empty());
        assert_eq!(assembly.diagnostics[0].affected, vec![ty("Wrong"), ty("IService")]);
    }

    #[test]
    fn test_method_level_order_overrides_class_level() {
        let candidates = vec![
            CandidateType::new(ty("Orders"))
                .implements(ty("IOrders"))
                .method("Place")
                .method("Cancel")
                .intercepted_by(ty("Audit"), 5)
                .intercepted_by(ty("Timing"), 1)
                .method_intercepted_by("Place", ty("Audit"), 0)
                .method_intercepted_by("Cancel", ty("Retry"), 3),
        ];
        let graph = DependencyGraph::build(&candidates);
        let assembly = assemble(&graph);

        let render = |chain: &InterceptorChain| {
            chain
                .interceptors
                .iter()
                .map(|l| l.interceptor.short_name().to_string())
                .collect::<Vec<_>>()
        };
        assert_eq!(assembly.interceptors.len(), 2);
        assert_eq!(assembly.interceptors[0].method, "Cancel");
        assert_eq!(render(&assembly.interceptors[0]), vec!["Timing", "Retry", "Audit"]);
        assert_eq!(assembly.interceptors[1].method, "Place");
        assert_eq!(render(&assembly.interceptors[1]), vec!["Audit", "Timing"]);
    }

    #[test]
    fn test_interceptor_without_abstraction_is_inert() {
        let candidates = vec![
            CandidateType::new(ty("Plain"))
                .method("Run")
                .intercepted_by(ty("Audit"), 0),
        ];
        let graph = DependencyGraph::build(&candidates);
        let assembly = assemble(&graph);

        assert!(assembly.interceptors.is_empty());
        assert_eq!(assembly.diagnostics[0].kind, DiagnosticKind::InertInterceptor);
    }

    #[test]
    fn test_interceptor_without_methods_is_inert() {
        let candidates = vec![
            CandidateType::new(ty("Orders"))
                .implements(ty("IOrders"))
                .intercepted_by(ty("Audit"), 0),
        ];
        let graph = DependencyGraph::build(&candidates);
        assert_eq!(assemble(&graph).diagnostics[0].kind, DiagnosticKind::InertInterceptor);
    }
}
