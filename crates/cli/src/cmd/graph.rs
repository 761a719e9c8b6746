//! Graph command implementation.
//!
//! Shows the full batch in build order along with each spec's edges to
//! other specs in the batch.

use std::path::Path;

use anyhow::{Context, Result};
use buildplan_lib::{DepKind, build_graph};
use serde::Serialize;

use super::read_specs;
use crate::output::{OutputFormat, print_dependency, print_json};

#[derive(Serialize)]
struct GraphEntry<'a> {
  name: &'a str,
  dependencies: Vec<EdgeEntry<'a>>,
}

#[derive(Serialize)]
struct EdgeEntry<'a> {
  name: &'a str,
  kind: DepKind,
}

pub fn cmd_graph(file: &Path, format: OutputFormat) -> Result<()> {
  let specs = read_specs(file)?;
  let graph = build_graph(specs).context("Failed to resolve build order")?;

  let mut entries = Vec::with_capacity(graph.len());
  for spec in graph.ordered() {
    let dependencies = graph
      .dependencies(&spec.name)?
      .into_iter()
      .map(|(name, kind)| EdgeEntry { name, kind })
      .collect();
    entries.push(GraphEntry {
      name: &spec.name,
      dependencies,
    });
  }

  if format.is_json() {
    return print_json(&entries);
  }

  for entry in &entries {
    println!("{}", entry.name);
    for dep in &entry.dependencies {
      print_dependency(dep.name, dep.kind.as_str());
    }
  }

  Ok(())
}
