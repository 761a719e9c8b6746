//! Structural validation of a single spec.
//!
//! Validation never stops at the first problem: every independent violation is
//! collected into [`ValidationErrors`] so a single run reports them all.

use std::fmt;

use thiserror::Error;

use super::cache::SharingModeError;
use super::source::{SourceError, join_errors};
use super::test::TestSpec;
use super::types::Spec;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
  /// A source failed validation; `errors` holds every problem found in it.
  #[error("invalid source {name:?}: {}", join_errors(.errors))]
  InvalidSource { name: String, errors: Vec<SourceError> },

  #[error("invalid source name {0:?}: source names must not contain path separators")]
  SourceNamePathSeparator(String),

  #[error("invalid sharing mode for test {test:?} with cache mount at path {path:?}: {source}")]
  TestSharingMode {
    test: String,
    path: String,
    source: SharingModeError,
  },

  #[error("invalid signer for target {target:?}: {}", join_errors(.errors))]
  InvalidSigner { target: String, errors: Vec<SourceError> },
}

/// Every violation found in one spec.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationErrors {
  pub spec: String,
  pub errors: Vec<ValidationError>,
}

impl fmt::Display for ValidationErrors {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "spec {:?} is invalid:", self.spec)?;
    for err in &self.errors {
      write!(f, "\n  {err}")?;
    }
    Ok(())
  }
}

impl std::error::Error for ValidationErrors {}

impl ValidationErrors {
  pub fn len(&self) -> usize {
    self.errors.len()
  }

  pub fn is_empty(&self) -> bool {
    self.errors.is_empty()
  }

  pub fn iter(&self) -> impl Iterator<Item = &ValidationError> {
    self.errors.iter()
  }
}

fn has_path_separator(name: &str) -> bool {
  name.contains('/') || name.contains(std::path::MAIN_SEPARATOR)
}

fn validate_tests<'a>(tests: impl IntoIterator<Item = (String, &'a TestSpec)>, errors: &mut Vec<ValidationError>) {
  for (test, spec) in tests {
    for (path, cfg) in &spec.cache_dirs {
      if let Err(source) = cfg.sharing_mode() {
        errors.push(ValidationError::TestSharingMode {
          test: test.clone(),
          path: path.clone(),
          source,
        });
      }
    }
  }
}

impl Spec {
  /// Check the spec's structural invariants.
  ///
  /// Pure: the spec is not modified.
  pub fn validate(&self) -> Result<(), ValidationErrors> {
    let mut errors = Vec::new();

    for (name, src) in &self.sources {
      if has_path_separator(name) {
        errors.push(ValidationError::SourceNamePathSeparator(name.clone()));
      }

      let source_errors = src.validate();
      if !source_errors.is_empty() {
        errors.push(ValidationError::InvalidSource {
          name: name.clone(),
          errors: source_errors,
        });
      }
    }

    validate_tests(self.tests.iter().map(|t| (t.name.clone(), t)), &mut errors);

    for (target_name, target) in &self.targets {
      validate_tests(
        target.tests.iter().map(|t| (format!("{target_name}/{}", t.name), t)),
        &mut errors,
      );

      if let Some(signer) = target.package_config.as_ref().and_then(|cfg| cfg.signer.as_ref()) {
        let signer_errors = signer.validate();
        if !signer_errors.is_empty() {
          errors.push(ValidationError::InvalidSigner {
            target: target_name.clone(),
            errors: signer_errors,
          });
        }
      }
    }

    if errors.is_empty() {
      Ok(())
    } else {
      Err(ValidationErrors {
        spec: self.name.clone(),
        errors,
      })
    }
  }
}
