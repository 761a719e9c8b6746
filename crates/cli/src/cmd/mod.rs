mod graph;
mod order;
mod validate;

use std::path::Path;

use anyhow::{Context, Result};
use buildplan_lib::{Spec, load_specs};

pub use graph::cmd_graph;
pub use order::cmd_order;
pub use validate::cmd_validate;

/// Read a spec file and load every YAML document in it.
fn read_specs(file: &Path) -> Result<Vec<Spec>> {
  let data = std::fs::read(file).with_context(|| format!("Failed to read {}", file.display()))?;
  let specs = load_specs(&data).with_context(|| format!("Failed to load specs from {}", file.display()))?;
  Ok(specs)
}
