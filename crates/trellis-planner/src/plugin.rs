//! Plugin sequencing.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;
use tracing::debug;
use trellis_core::{Diagnostic, DiagnosticKind, TypeRef};

use crate::graph::DependencyGraph;
use crate::plan::Argument;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SequencedPlugin {
    pub plugin: TypeRef,
    /// Effective order (`0` when none was declared).
    pub order: i32,
    pub arguments: Vec<Argument>,
}

/// Plugins in startup order.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(transparent)]
pub struct PluginSequence {
    plugins: Vec<SequencedPlugin>,
}

impl PluginSequence {
    pub fn iter(&self) -> std::slice::Iter<'_, SequencedPlugin> {
        self.plugins.iter()
    }

    /// Plugin identities in startup order.
    pub fn identities(&self) -> impl Iterator<Item = &TypeRef> {
        self.plugins.iter().map(|p| &p.plugin)
    }

    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }

    pub(crate) fn retain(&mut self, keep: impl FnMut(&SequencedPlugin) -> bool) {
        self.plugins.retain(keep);
    }
}

impl<'a> IntoIterator for &'a PluginSequence {
    type Item = &'a SequencedPlugin;
    type IntoIter = std::slice::Iter<'a, SequencedPlugin>;

    fn into_iter(self) -> Self::IntoIter {
        self.plugins.iter()
    }
}

/// Orders every plugin-role node by `(order, identity)`.
///
/// In `strict` mode, plugins sharing an explicitly declared order are
/// reported and left out of the sequence.
pub fn sequence(graph: &DependencyGraph<'_>, strict: bool) -> (PluginSequence, Vec<Diagnostic>) {
    let mut plugins: Vec<SequencedPlugin> = graph
        .nodes()
        .iter()
        .filter(|node| node.candidate.is_plugin())
        .map(|node| SequencedPlugin {
            plugin: node.identity().clone(),
            order: node.candidate.plugin_order.unwrap_or(0),
            arguments: Argument::list(node),
        })
        .collect();
    plugins.sort_by(|a, b| a.order.cmp(&b.order).then_with(|| a.plugin.cmp(&b.plugin)));

    let mut diagnostics = Vec::new();
    if strict {
        let mut duplicated: BTreeSet<TypeRef> = BTreeSet::new();
        let mut explicit: BTreeMap<i32, Vec<&TypeRef>> = BTreeMap::new();
        for node in graph.nodes() {
            if let Some(order) = node.candidate.plugin_order {
                explicit.entry(order).or_default().push(node.identity());
            }
        }
        for (order, members) in explicit.iter().filter(|(_, m)| m.len() > 1) {
            for &plugin in members {
                duplicated.insert(plugin.clone());
                let mut affected = vec![plugin.clone()];
                affected.extend(members.iter().filter(|&&m| m != plugin).map(|&m| m.clone()));
                let others = affected[1..]
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join("', '");
                diagnostics.push(Diagnostic::new(
                    DiagnosticKind::DuplicateSequenceOrder,
                    format!("plugin '{plugin}' shares order {order} with '{others}'"),
                    affected,
                ));
            }
        }
        plugins.retain(|p| !duplicated.contains(&p.plugin));
    }

    debug!(
        plugins = plugins.len(),
        duplicates = diagnostics.len(),
        "Plugins sequenced"
    );
    (PluginSequence { plugins }, diagnostics)
}

#[cfg(test)]
mod tests {
    use super::*;
    use trellis_core::{CandidateType, Capability, Severity};

    fn ty(name: &str) -> TypeRef {
        TypeRef::new(name, "App")
    }

    fn names(sequence: &PluginSequence) -> Vec<&str> {
        sequence.identities().map(TypeRef::short_name).collect()
    }

    #[test]
    fn test_sorted_by_order_then_name() {
        let candidates = vec![
            CandidateType::new(ty("Late")).plugin_order(100),
            CandidateType::new(ty("Zeta")).plugin_order(0),
            CandidateType::new(ty("Early")).plugin_order(-100),
            CandidateType::new(ty("Alpha")).capability(Capability::Plugin),
            CandidateType::new(ty("NotAPlugin")),
        ];
        let graph = DependencyGraph::build(&candidates);
        let (sequence, diagnostics) = sequence(&graph, false);

        assert_eq!(names(&sequence), vec!["Early", "Alpha", "Zeta", "Late"]);
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn test_duplicates_allowed_when_not_strict() {
        let candidates = vec![
            CandidateType::new(ty("A")).plugin_order(1),
            CandidateType::new(ty("B")).plugin_order(1),
        ];
        let graph = DependencyGraph::build(&candidates);
        let (sequence, diagnostics) = sequence(&graph, false);
        assert_eq!(sequence.len(), 2);
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn test_strict_mode_reports_and_withholds_duplicates() {
        let candidates = vec![
            CandidateType::new(ty("A")).plugin_order(1),
            CandidateType::new(ty("B")).plugin_order(1),
            CandidateType::new(ty("C")).plugin_order(2),
            // Implicit order 0 never counts as a duplicate.
            CandidateType::new(ty("D")).capability(Capability::Plugin),
            CandidateType::new(ty("E")).capability(Capability::Plugin),
        ];
        let graph = DependencyGraph::build(&candidates);
        let (sequence, diagnostics) = sequence(&graph, true);

        assert_eq!(names(&sequence), vec!["D", "E", "C"]);
        assert_eq!(diagnostics.len(), 2);
        assert!(diagnostics.iter().all(|d| d.severity == Severity::Error));
        assert_eq!(diagnostics[0].affected, vec![ty("A"), ty("B")]);
        assert_eq!(diagnostics[0].message, "plugin 'A' shares order 1 with 'B'");
    }
}
