//! Circular dependency detection.
//!
//! A depth-first traversal with an explicit recursion stack (Tarjan's
//! strongly connected components) finds every node that sits on a cycle of
//! hard edges. Each such node is then reported exactly once, with the
//! shortest cycle that passes through it:
//!
//! ```text
//! OrderService → InventoryService → OrderService
//! ```
//!
//! A node depending on itself is a one-node cycle and is reported the same
//! way (`Node → Node`).

use std::collections::VecDeque;

use tracing::debug;
use trellis_core::{Diagnostic, DiagnosticKind, TypeRef};

use crate::graph::{DependencyGraph, NodeId};

const UNVISITED: usize = usize::MAX;

/// Reports one [`DiagnosticKind::CircularDependency`] per node on a cycle.
pub fn detect(graph: &DependencyGraph<'_>) -> Vec<Diagnostic> {
    let successors: Vec<Vec<NodeId>> = (0..graph.len())
        .map(|id| graph.hard_successors(id))
        .collect();

    let mut on_cycle: Vec<NodeId> = Vec::new();
    let mut in_component = vec![false; graph.len()];
    let mut paths: Vec<(NodeId, Vec<NodeId>)> = Vec::new();

    for component in strongly_connected(&successors) {
        let cyclic = component.len() > 1 || successors[component[0]].contains(&component[0]);
        if !cyclic {
            continue;
        }
        for &id in &component {
            in_component[id] = true;
        }
        for &id in &component {
            if let Some(path) = shortest_cycle(id, &successors, &in_component) {
                paths.push((id, path));
            }
        }
        for &id in &component {
            in_component[id] = false;
        }
        on_cycle.extend_from_slice(&component);
    }

    paths.sort_by_key(|(id, _)| *id);
    if !paths.is_empty() {
        debug!(nodes = on_cycle.len(), "Circular dependencies detected");
    }

    paths
        .into_iter()
        .map(|(_, path)| {
            let members: Vec<TypeRef> = path[..path.len() - 1]
                .iter()
                .map(|&id| graph.node(id).identity().clone())
                .collect();
            let rendered = path
                .iter()
                .map(|&id| graph.node(id).identity().to_string())
                .collect::<Vec<_>>()
                .join(" → ");
            Diagnostic::new(
                DiagnosticKind::CircularDependency,
                format!("circular dependency: {rendered}"),
                members,
            )
        })
        .collect()
}

/// Tarjan's algorithm, iterative. Components are returned in completion
/// order; nodes within a component are sorted ascending.
fn strongly_connected(successors: &[Vec<NodeId>]) -> Vec<Vec<NodeId>> {
    let n = successors.len();
    let mut index = vec![UNVISITED; n];
    let mut low = vec![0; n];
    let mut on_stack = vec![false; n];
    let mut stack: Vec<NodeId> = Vec::new();
    let mut next_index = 0;
    let mut components = Vec::new();

    for root in 0..n {
        if index[root] != UNVISITED {
            continue;
        }
        index[root] = next_index;
        low[root] = next_index;
        next_index += 1;
        stack.push(root);
        on_stack[root] = true;

        // (node, next child position)
        let mut frames: Vec<(NodeId, usize)> = vec![(root, 0)];
        while let Some(frame) = frames.last_mut() {
            let v = frame.0;
            if let Some(&w) = successors[v].get(frame.1) {
                frame.1 += 1;
                if index[w] == UNVISITED {
                    index[w] = next_index;
                    low[w] = next_index;
                    next_index += 1;
                    stack.push(w);
                    on_stack[w] = true;
                    frames.push((w, 0));
                } else if on_stack[w] {
                    low[v] = low[v].min(index[w]);
                }
                continue;
            }

            frames.pop();
            if let Some(&(parent, _)) = frames.last() {
                low[parent] = low[parent].min(low[v]);
            }
            if low[v] == index[v] {
                let mut component = Vec::new();
                while let Some(w) = stack.pop() {
                    on_stack[w] = false;
                    component.push(w);
                    if w == v {
                        break;
                    }
                }
                component.sort_unstable();
                components.push(component);
            }
        }
    }

    components
}

/// Breadth-first search for the shortest path `start → … → start` that
/// stays inside `start`'s component. The returned path repeats `start` at
/// both ends.
fn shortest_cycle(
    start: NodeId,
    successors: &[Vec<NodeId>],
    in_component: &[bool],
) -> Option<Vec<NodeId>> {
    if successors[start].contains(&start) {
        return Some(vec![start, start]);
    }

    let mut parent: Vec<Option<NodeId>> = vec![None; successors.len()];
    let mut visited = vec![false; successors.len()];
    let mut queue = VecDeque::from([start]);
    visited[start] = true;

    while let Some(v) = queue.pop_front() {
        for &w in &successors[v] {
            if !in_component[w] {
                continue;
            }
            if w == start {
                let mut path = vec![v];
                let mut current = v;
                while let Some(p) = parent[current] {
                    path.push(p);
                    current = p;
                }
                path.reverse();
                path.push(start);
                return Some(path);
            }
            if !visited[w] {
                visited[w] = true;
                parent[w] = Some(v);
                queue.push_back(w);
            }
        }
    }
    None
}
