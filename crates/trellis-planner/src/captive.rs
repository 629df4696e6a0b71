//! Captive dependency checks.
//!
//! A consumer that outlives one of its hard dependencies keeps that
//! dependency alive past its intended lifetime. Decorators wrapped around a
//! hard dependency are captured along with it. When the dependency releases
//! resources on disposal this is an error: the captured instance will be
//! disposed underneath its consumer.

use tracing::debug;
use trellis_core::{Diagnostic, DiagnosticKind};

use crate::graph::{DependencyGraph, NodeId};

/// Checks every hard edge for a lifetime inversion.
pub fn check(graph: &DependencyGraph<'_>) -> Vec<Diagnostic> {
    let diagnostics: Vec<Diagnostic> = graph
        .hard_edges()
        .flat_map(|edge| {
            let consumer = edge.consumer;
            edge.hard_targets()
                .into_iter()
                .filter_map(move |dependency| inspect(graph, consumer, dependency))
        })
        .collect();

    debug!(found = diagnostics.len(), "Captive dependency check complete");
    diagnostics
}

fn inspect(
    graph: &DependencyGraph<'_>,
    consumer: NodeId,
    dependency: NodeId,
) -> Option<Diagnostic> {
    let consumer = graph.node(consumer);
    let dependency = graph.node(dependency);

    if !consumer.lifetime.outlives(dependency.lifetime) {
        return None;
    }

    let affected = vec![consumer.identity().clone(), dependency.identity().clone()];
    let diagnostic = if dependency.candidate.is_disposable() {
        Diagnostic::new(
            DiagnosticKind::DisposableCaptiveDependency,
            format!(
                "{} '{}' captures {} disposable dependency '{}'; \
                 it will be disposed while still referenced",
                consumer.lifetime,
                consumer.identity(),
                dependency.lifetime,
                dependency.identity()
            ),
            affected,
        )
    } else {
        Diagnostic::new(
            DiagnosticKind::LifetimeMismatch,
            format!(
                "{} '{}' depends on {} '{}'; the dependency lives as long as its consumer",
                consumer.lifetime,
                consumer.identity(),
                dependency.lifetime,
                dependency.identity()
            ),
            affected,
        )
    };
    Some(diagnostic)
}
