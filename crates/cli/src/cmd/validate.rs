use std::path::Path;

use anyhow::Result;

use super::read_specs;
use crate::output::print_success;

pub fn cmd_validate(file: &Path) -> Result<()> {
  let specs = read_specs(file)?;

  for spec in &specs {
    if spec.version.is_empty() {
      print_success(&spec.name);
    } else {
      print_success(&format!("{} {}", spec.name, spec.version));
    }
  }

  Ok(())
}
