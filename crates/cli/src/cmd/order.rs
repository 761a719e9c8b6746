//! Order command implementation.
//!
//! Prints the specs that must be built, in order, to produce a target.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use buildplan_lib::{KnownArgs, build_graph, substitute_batch};
use tracing::debug;

use super::read_specs;
use crate::output::{OutputFormat, print_json};

pub fn cmd_order(file: &Path, target: &str, args: &[(String, String)], format: OutputFormat) -> Result<()> {
  let mut specs = read_specs(file)?;

  if !args.is_empty() {
    let env: BTreeMap<String, String> = args.iter().cloned().collect();
    substitute_batch(&mut specs, &env, &KnownArgs::default()).context("Failed to substitute args")?;
  }

  let graph = build_graph(specs).context("Failed to resolve build order")?;
  let slice = graph.target_slice(target)?;
  debug!(target = target, count = slice.len(), "resolved build order");

  let names: Vec<&str> = slice.iter().map(|spec| spec.name.as_str()).collect();
  if format.is_json() {
    print_json(&names)?;
  } else {
    for name in names {
      println!("{}", name);
    }
  }

  Ok(())
}
