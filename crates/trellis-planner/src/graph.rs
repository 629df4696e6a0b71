//! Dependency graph construction.
//!
//! Every surviving candidate becomes a [`Node`]; every parameter of its
//! selected constructor becomes a [`DependencyEdge`]. An edge is **hard**
//! when it must be satisfied at construction time (direct or keyed) and
//! resolves to exactly one node. Only hard edges take part in cycle and
//! captivity analysis; everything else is a fan-out point left to the
//! container.
//!
//! A consumer of a decorated abstraction receives the decorator chain, so a
//! hard edge also reaches every decorator wrapped around its target.
//!
//! ```text
//!  OrderService ──hard──▶ InventoryService
//!       │  │
//!       │  └──hard──▶ AuditDecorator  (decorates IInventory)
//!       └──lazy──▶ IMailer  (soft: resolved after construction)
//! ```

use std::collections::{BTreeMap, HashMap};

use tracing::{debug, trace};
use trellis_core::{
    CandidateType, Diagnostic, DiagnosticKind, Lifetime, Parameter, ResolutionKind, TypeRef,
};

use crate::lifetime;

/// Index of a node within its [`DependencyGraph`].
pub type NodeId = usize;

/// A candidate that survived exclusion and constructor qualification.
#[derive(Debug, Clone)]
pub struct Node<'a> {
    pub id: NodeId,
    pub candidate: &'a CandidateType,
    /// Effective lifetime.
    pub lifetime: Lifetime,
    /// Selected constructor index (`None` for the implicit constructor).
    pub constructor: Option<usize>,
    /// Parameters of the selected constructor.
    pub parameters: &'a [Parameter],
}

impl Node<'_> {
    pub fn identity(&self) -> &TypeRef {
        &self.candidate.identity
    }
}

/// What a dependency edge points at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EdgeTarget {
    /// Exactly one discovered implementation.
    Node(NodeId),
    /// Several discovered implementations.
    Many(Vec<NodeId>),
    /// No discovered implementation; may be supplied externally.
    Unresolved,
    /// The implementation wrapped by this decorator, supplied by the chain.
    Decorated,
}

/// One constructor parameter of one node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyEdge {
    pub consumer: NodeId,
    /// Parameter position in the selected constructor.
    pub position: usize,
    pub dependency: TypeRef,
    pub resolution: ResolutionKind,
    pub target: EdgeTarget,
    /// Decorators the container wraps around the target, in identity order.
    pub decorators: Vec<NodeId>,
}

impl DependencyEdge {
    /// Hard edges are construction-time, single-target edges.
    pub fn is_hard(&self) -> bool {
        !self.resolution.is_soft() && matches!(self.target, EdgeTarget::Node(_))
    }

    /// The single node this edge resolves to, hard or soft.
    pub fn resolved(&self) -> Option<NodeId> {
        match self.target {
            EdgeTarget::Node(id) => Some(id),
            _ => None,
        }
    }

    /// Nodes constructed to satisfy this edge: the resolved implementation
    /// followed by its decorators. Empty unless the edge is hard.
    pub fn hard_targets(&self) -> Vec<NodeId> {
        match self.target {
            EdgeTarget::Node(id) if !self.resolution.is_soft() => std::iter::once(id)
                .chain(self.decorators.iter().copied())
                .collect(),
            _ => Vec::new(),
        }
    }
}

/// The dependency graph over a unified candidate set.
#[derive(Debug)]
pub struct DependencyGraph<'a> {
    nodes: Vec<Node<'a>>,
    edges: Vec<DependencyEdge>,
    outgoing: Vec<Vec<usize>>,
    by_identity: HashMap<&'a TypeRef, NodeId>,
    implementers: BTreeMap<&'a TypeRef, Vec<NodeId>>,
    decorators: BTreeMap<&'a TypeRef, Vec<NodeId>>,
    diagnostics: Vec<Diagnostic>,
}

impl<'a> DependencyGraph<'a> {
    /// Builds the graph.
    ///
    /// Candidates are processed in identity order, so the graph (and every
    /// analysis on it) is independent of input order. Excluded candidates and
    /// candidates without a qualifying constructor are dropped silently.
    pub fn build(candidates: &'a [CandidateType]) -> Self {
        let mut sorted: Vec<&'a CandidateType> = candidates.iter().collect();
        sorted.sort_by(|a, b| a.identity.cmp(&b.identity));
        sorted.dedup_by(|later, earlier| {
            let duplicate = later.identity == earlier.identity;
            if duplicate {
                debug!(identity = %later.identity.qualified(), "Duplicate candidate ignored");
            }
            duplicate
        });

        let mut graph = Self {
            nodes: Vec::with_capacity(sorted.len()),
            edges: Vec::new(),
            outgoing: Vec::new(),
            by_identity: HashMap::with_capacity(sorted.len()),
            implementers: BTreeMap::new(),
            decorators: BTreeMap::new(),
            diagnostics: Vec::new(),
        };

        for candidate in sorted {
            if candidate.exclusion.any() {
                trace!(identity = %candidate.identity, "Candidate excluded");
                continue;
            }
            let Some(resolution) = lifetime::resolve(candidate) else {
                trace!(identity = %candidate.identity, "No injectable constructor, dropped");
                continue;
            };
            let id = graph.nodes.len();
            graph.nodes.push(Node {
                id,
                candidate,
                lifetime: resolution.lifetime,
                constructor: resolution.constructor,
                parameters: resolution.parameters(candidate),
            });
            graph.by_identity.insert(&candidate.identity, id);
            for abstraction in candidate.service_abstractions() {
                graph.implementers.entry(abstraction).or_default().push(id);
            }
            for declaration in &candidate.decorators {
                if candidate.abstractions.contains(&declaration.target) {
                    graph.decorators.entry(&declaration.target).or_default().push(id);
                }
            }
        }

        graph.outgoing = vec![Vec::new(); graph.nodes.len()];
        for id in 0..graph.nodes.len() {
            graph.connect(id);
        }

        debug!(
            nodes = graph.nodes.len(),
            edges = graph.edges.len(),
            hard_edges = graph.hard_edges().count(),
            "Dependency graph built"
        );
        graph
    }

    fn connect(&mut self, id: NodeId) {
        let candidate = self.nodes[id].candidate;
        let parameters = self.nodes[id].parameters;
        let mut edges = Vec::with_capacity(parameters.len());

        for (position, parameter) in parameters.iter().enumerate() {
            let target = if candidate.decorates_target(&parameter.ty) {
                EdgeTarget::Decorated
            } else {
                match self.lookup(&parameter.ty, &parameter.resolution).as_slice() {
                    [] => EdgeTarget::Unresolved,
                    [single] => EdgeTarget::Node(*single),
                    many => EdgeTarget::Many(many.to_vec()),
                }
            };

            if target == EdgeTarget::Unresolved
                && let Some(diagnostic) = unresolved_diagnostic(candidate, parameter)
            {
                self.diagnostics.push(diagnostic);
            }

            let decorators = match target {
                EdgeTarget::Node(_) if self.implementers.contains_key(&parameter.ty) => {
                    self.decorators_of(&parameter.ty).to_vec()
                }
                _ => Vec::new(),
            };

            edges.push(DependencyEdge {
                consumer: id,
                position,
                dependency: parameter.ty.clone(),
                resolution: parameter.resolution.clone(),
                target,
                decorators,
            });
        }

        for edge in edges {
            self.outgoing[id].push(self.edges.len());
            self.edges.push(edge);
        }
    }

    /// Nodes able to satisfy a request for `ty`: its implementers, or the
    /// node whose identity is `ty` when it is requested concretely.
    fn lookup(&self, ty: &TypeRef, resolution: &ResolutionKind) -> Vec<NodeId> {
        let pool: Vec<NodeId> = match self.implementers.get(ty) {
            Some(ids) => ids.clone(),
            None => self.by_identity.get(ty).copied().into_iter().collect(),
        };
        match resolution.key() {
            Some(key) => pool
                .into_iter()
                .filter(|&n| self.nodes[n].candidate.service_keys.contains(key))
                .collect(),
            None => pool,
        }
    }

    // ─── Accessors ───────────────────────────────────────────────────────────

    pub fn nodes(&self) -> &[Node<'a>] {
        &self.nodes
    }

    pub fn node(&self, id: NodeId) -> &Node<'a> {
        &self.nodes[id]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node_by_identity(&self, identity: &TypeRef) -> Option<&Node<'a>> {
        self.by_identity.get(identity).map(|&id| &self.nodes[id])
    }

    /// Nodes registered under `abstraction`, in identity order. Decorators
    /// of `abstraction` are not among them.
    pub fn implementers(&self, abstraction: &TypeRef) -> &[NodeId] {
        self.implementers
            .get(abstraction)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Nodes declaring themselves decorators of `abstraction` that also
    /// implement it, in identity order.
    pub fn decorators_of(&self, abstraction: &TypeRef) -> &[NodeId] {
        self.decorators
            .get(abstraction)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn edges(&self) -> &[DependencyEdge] {
        &self.edges
    }

    /// Edges of `id`, in parameter order.
    pub fn edges_from(&self, id: NodeId) -> impl Iterator<Item = &DependencyEdge> {
        self.outgoing[id].iter().map(|&e| &self.edges[e])
    }

    pub fn hard_edges(&self) -> impl Iterator<Item = &DependencyEdge> {
        self.edges.iter().filter(|e| e.is_hard())
    }

    /// Distinct hard-edge targets of `id`, ascending.
    pub fn hard_successors(&self, id: NodeId) -> Vec<NodeId> {
        let mut successors: Vec<NodeId> = self
            .edges_from(id)
            .flat_map(DependencyEdge::hard_targets)
            .collect();
        successors.sort_unstable();
        successors.dedup();
        successors
    }

    /// Informational diagnostics found while resolving edges.
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }
}

fn unresolved_diagnostic(consumer: &CandidateType, parameter: &Parameter) -> Option<Diagnostic> {
    match &parameter.resolution {
        ResolutionKind::Keyed(key) => Some(Diagnostic::new(
            DiagnosticKind::UnresolvedKeyedReference,
            format!(
                "'{}' requests '{}' under key '{}', \
                 but no discovered implementation carries that key",
                consumer.identity, parameter.ty, key
            ),
            vec![consumer.identity.clone(), parameter.ty.clone()],
        )),
        ResolutionKind::Collection => Some(Diagnostic::new(
            DiagnosticKind::NoImplementationsForCollection,
            format!(
                "'{}' requests every '{}', but no implementation was discovered",
                consumer.identity, parameter.ty
            ),
            vec![consumer.identity.clone(), parameter.ty.clone()],
        )),
        _ => None,
    }
}
