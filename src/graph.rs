//! Container dependency graph
//!
//! Nodes are the scanned containers, edges their declared dependencies (in tuple
//! order) followed by their parent. The graph must be acyclic: a cycle cannot be
//! wired at all, so it aborts the whole run.

use std::collections::HashMap;

use crate::corpus::SymbolLookup;
use crate::diagnostics::{Diagnostic, Site};
use crate::error::WiringError;
use crate::identity::{self, TypeIdentity};
use crate::scan::RawContainer;
use crate::typeref::TypeRef;

#[derive(Debug, Clone)]
pub struct GraphNode {
    pub identity: TypeIdentity,
    pub name: String,
    /// Indices of the dependencies, in declared order
    pub dependencies: Vec<usize>,
    pub parent: Option<usize>,
}

impl GraphNode {
    fn edges(&self) -> impl Iterator<Item = usize> + '_ {
        self.dependencies.iter().copied().chain(self.parent)
    }
}

/// Containers indexed by identity; node `i` describes container `i` of the input
#[derive(Debug, Default)]
pub struct DependencyGraph {
    nodes: Vec<GraphNode>,
    by_identity: HashMap<TypeIdentity, usize>,
}

impl DependencyGraph {
    pub fn node(&self, index: usize) -> &GraphNode {
        &self.nodes[index]
    }

    pub fn nodes(&self) -> &[GraphNode] {
        &self.nodes
    }

    pub fn find(&self, identity: &TypeIdentity) -> Option<usize> {
        self.by_identity.get(identity).copied()
    }
}

/// A graph plus the containers whose references could not be resolved
#[derive(Debug, Default)]
pub struct GraphBuild {
    pub graph: DependencyGraph,
    /// `(container index, error)`
    pub errors: Vec<(usize, Diagnostic)>,
}

/// Identity of a container, as any reference to it would resolve
pub fn container_identity(container: &RawContainer, lookup: &dyn SymbolLookup) -> TypeIdentity {
    identity::resolve(&TypeRef::named(&container.name, vec![]), &container.file, lookup)
}

/// Link every container to its dependencies and parent, then reject cycles.
pub fn build(containers: &[RawContainer], lookup: &dyn SymbolLookup) -> Result<GraphBuild, Diagnostic> {
    let mut build = GraphBuild::default();
    for (index, container) in containers.iter().enumerate() {
        let identity = container_identity(container, lookup);
        build.graph.by_identity.entry(identity.clone()).or_insert(index);
        build.graph.nodes.push(GraphNode {
            identity,
            name: container.name.clone(),
            dependencies: Vec::with_capacity(container.dependencies.len()),
            parent: None,
        });
    }

    for (index, container) in containers.iter().enumerate() {
        let mut link = |reference: &TypeRef| {
            let target = identity::resolve(reference, &container.file, lookup);
            let found = build.graph.find(&target);
            if found.is_none() {
                let error = WiringError::UnresolvableReference {
                    container: container.name.clone(),
                    name: reference.to_string(),
                };
                build.errors.push((
                    index,
                    Diagnostic::at(error, &container.file, reference.span)
                        .with_note(format!("{target} is not an exported container")),
                ));
            }
            found
        };
        let dependencies: Vec<usize> = container.dependencies.iter().filter_map(&mut link).collect();
        let parent = container.parent.as_ref().and_then(&mut link);
        let node = &mut build.graph.nodes[index];
        node.dependencies = dependencies;
        node.parent = parent;
    }

    if let Some(cycle) = find_cycle(&build.graph) {
        let first = &containers[cycle[0]];
        let path: Vec<&str> = cycle.iter().map(|&i| build.graph.nodes[i].name.as_str()).collect();
        return Err(Diagnostic::new(
            WiringError::DependencyCycle {
                path: path.join(" -> "),
            },
            Some(Site::new(&first.file, first.span)),
        ));
    }
    Ok(build)
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    Unvisited,
    OnStack,
    Done,
}

/// Depth-first search from every node in order; returns the first cycle found,
/// closed on its starting node.
fn find_cycle(graph: &DependencyGraph) -> Option<Vec<usize>> {
    let mut marks = vec![Mark::Unvisited; graph.nodes.len()];
    let mut stack = Vec::new();
    (0..graph.nodes.len()).find_map(|start| visit(graph, start, &mut marks, &mut stack))
}

fn visit(graph: &DependencyGraph, node: usize, marks: &mut [Mark], stack: &mut Vec<usize>) -> Option<Vec<usize>> {
    match marks[node] {
        Mark::Done => return None,
        Mark::OnStack => {
            let start = stack.iter().position(|&n| n == node).unwrap_or(0);
            let mut cycle = stack[start..].to_vec();
            cycle.push(node);
            return Some(cycle);
        }
        Mark::Unvisited => {}
    }
    marks[node] = Mark::OnStack;
    stack.push(node);
    for next in graph.nodes[node].edges() {
        if let Some(cycle) = visit(graph, next, marks, stack) {
            return Some(cycle);
        }
    }
    stack.pop();
    marks[node] = Mark::Done;
    None
}
