//! Dependency graph across a batch of specs.
//!
//! This module handles:
//! - Building a vertex per spec and an edge per in-batch dependency
//! - Cycle detection via strongly connected components
//! - A deterministic total build order (dependencies first)
//! - Slicing the order down to what one target needs
//!
//! Dependency names that do not match a spec in the batch are system packages
//! and produce no edge. A spec that names itself is ignored.
//!
//! A [`Graph`] is built once per batch, owns its specs and is never mutated
//! afterwards, so it can be shared freely between readers.

mod tarjan;

use std::borrow::Borrow;
use std::collections::HashMap;
use std::fmt;

use petgraph::Direction;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, trace};

use crate::spec::Spec;

/// Why one spec depends on another.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DepKind {
  Build,
  Runtime,
}

impl DepKind {
  pub fn as_str(&self) -> &'static str {
    match self {
      DepKind::Build => "build",
      DepKind::Runtime => "runtime",
    }
  }
}

impl fmt::Display for DepKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// One or more dependency cycles; each lists its members in stack-pop order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleError {
  pub cycles: Vec<Vec<String>>,
}

impl fmt::Display for CycleError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    for (i, cycle) in self.cycles.iter().enumerate() {
      if i > 0 {
        writeln!(f)?;
      }
      // The first member is repeated to close the loop: { a, b, a }
      let mut members = cycle.clone();
      if let Some(first) = cycle.first() {
        members.push(first.clone());
      }
      write!(f, "dependency cycle: {{ {} }}", members.join(", "))?;
    }
    Ok(())
  }
}

impl std::error::Error for CycleError {}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
  #[error("duplicate spec name in batch: {0:?}")]
  DuplicateSpec(String),

  #[error(transparent)]
  Cycle(#[from] CycleError),

  #[error("spec not found: {0:?}")]
  NotFound(String),

  #[error("target not found: {0:?}")]
  TargetNotFound(String),
}

/// A resolved batch of specs in dependency order.
#[derive(Debug, Clone)]
pub struct Graph {
  graph: DiGraph<String, DepKind>,
  nodes: HashMap<String, NodeIndex>,
  ordered: Vec<Spec>,
  positions: HashMap<String, usize>,
}

/// Build the dependency graph for a batch and compute its build order.
///
/// Vertices are visited in input order and each vertex's dependencies in name
/// order, so the same batch always yields the same order.
///
/// # Errors
///
/// - [`GraphError::DuplicateSpec`] if two specs share a name
/// - [`GraphError::Cycle`] listing every cycle if any exists; no order is produced
pub fn build_graph(specs: Vec<Spec>) -> Result<Graph, GraphError> {
  let mut graph = DiGraph::with_capacity(specs.len(), 0);
  let mut nodes = HashMap::with_capacity(specs.len());

  for spec in &specs {
    let idx = graph.add_node(spec.name.clone());
    if nodes.insert(spec.name.clone(), idx).is_some() {
      return Err(GraphError::DuplicateSpec(spec.name.clone()));
    }
  }

  for (i, spec) in specs.iter().enumerate() {
    let Some(deps) = &spec.dependencies else {
      continue;
    };
    let from = NodeIndex::new(i);

    for (kind, names) in [(DepKind::Build, &deps.build), (DepKind::Runtime, &deps.runtime)] {
      for dep in names.keys() {
        if dep == &spec.name {
          debug!(spec = %spec.name, kind = %kind, "ignoring self dependency");
          continue;
        }
        let Some(&to) = nodes.get(dep) else {
          trace!(spec = %spec.name, dep = %dep, kind = %kind, "external dependency, no edge");
          continue;
        };
        trace!(spec = %spec.name, dep = %dep, kind = %kind, "adding edge");
        graph.add_edge(from, to, kind);
      }
    }
  }

  let order = sort(&graph)?;

  let mut slots: Vec<Option<Spec>> = specs.into_iter().map(Some).collect();
  let ordered: Vec<Spec> = order.into_iter().filter_map(|i| slots[i].take()).collect();
  let positions = ordered
    .iter()
    .enumerate()
    .map(|(i, spec)| (spec.name.clone(), i))
    .collect();

  info!(specs = ordered.len(), edges = graph.edge_count(), "built dependency graph");

  Ok(Graph {
    graph,
    nodes,
    ordered,
    positions,
  })
}

/// Total order of vertex indices, or every cycle found.
fn sort(graph: &DiGraph<String, DepKind>) -> Result<Vec<usize>, CycleError> {
  let adjacency: Vec<Vec<usize>> = graph
    .node_indices()
    .map(|v| {
      let mut targets: Vec<usize> = graph.neighbors(v).map(|w| w.index()).collect();
      targets.sort_by(|a, b| graph[NodeIndex::new(*a)].cmp(&graph[NodeIndex::new(*b)]));
      // A build and a runtime edge to the same spec are one traversal step.
      targets.dedup();
      targets
    })
    .collect();

  let mut order = Vec::with_capacity(adjacency.len());
  let mut cycles = Vec::new();

  for component in tarjan::strong_components(&adjacency) {
    if component.len() > 1 {
      cycles.push(
        component
          .iter()
          .map(|&i| graph[NodeIndex::new(i)].clone())
          .collect(),
      );
    } else {
      order.extend(component);
    }
  }

  if !cycles.is_empty() {
    return Err(CycleError { cycles });
  }
  Ok(order)
}

/// The prefix of `order` that ends with `target`.
///
/// Because `order` places every dependency before its dependents, the prefix
/// holds everything `target` needs.
pub fn target_slice<'a, S: Borrow<Spec>>(order: &'a [S], target: &str) -> Result<&'a [S], GraphError> {
  order
    .iter()
    .position(|spec| spec.borrow().name == target)
    .map(|i| &order[..=i])
    .ok_or_else(|| GraphError::TargetNotFound(target.to_string()))
}

impl Graph {
  /// Every spec in build order.
  pub fn ordered(&self) -> &[Spec] {
    &self.ordered
  }

  /// Specs needed to build `target`, in build order, ending with `target`.
  pub fn target_slice(&self, target: &str) -> Result<&[Spec], GraphError> {
    target_slice(&self.ordered, target)
  }

  pub fn get(&self, name: &str) -> Result<&Spec, GraphError> {
    self
      .positions
      .get(name)
      .map(|&i| &self.ordered[i])
      .ok_or_else(|| GraphError::NotFound(name.to_string()))
  }

  pub fn len(&self) -> usize {
    self.ordered.len()
  }

  pub fn is_empty(&self) -> bool {
    self.ordered.is_empty()
  }

  /// The spec built last.
  pub fn last(&self) -> Option<&Spec> {
    self.ordered.last()
  }

  /// In-batch dependencies of `name`, sorted by name then kind.
  pub fn dependencies(&self, name: &str) -> Result<Vec<(&str, DepKind)>, GraphError> {
    self.edges(name, Direction::Outgoing)
  }

  /// Specs in the batch that depend on `name`, sorted by name then kind.
  pub fn dependents(&self, name: &str) -> Result<Vec<(&str, DepKind)>, GraphError> {
    self.edges(name, Direction::Incoming)
  }

  fn edges(&self, name: &str, direction: Direction) -> Result<Vec<(&str, DepKind)>, GraphError> {
    let idx = *self
      .nodes
      .get(name)
      .ok_or_else(|| GraphError::NotFound(name.to_string()))?;

    let mut edges: Vec<(&str, DepKind)> = self
      .graph
      .edges_directed(idx, direction)
      .map(|edge| {
        let other = match direction {
          Direction::Outgoing => edge.target(),
          Direction::Incoming => edge.source(),
        };
        (self.graph[other].as_str(), *edge.weight())
      })
      .collect();
    edges.sort();
    Ok(edges)
  }
}
