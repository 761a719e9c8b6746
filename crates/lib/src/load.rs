//! Loading specs from YAML documents.
//!
//! Parsing is strict: a field the model does not know is an error. Every
//! loaded spec has been validated and had its defaults filled. Argument
//! substitution is a separate pass, see [`Spec::substitute_args`].

use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, info};

use crate::spec::{Spec, ValidationErrors};

#[derive(Debug, Error)]
pub enum LoadError {
  #[error("error unmarshalling spec: {0}")]
  Parse(serde_yaml::Error),

  #[error("error unmarshalling spec document {index}: {error}")]
  ParseDocument { index: usize, error: serde_yaml::Error },

  #[error("no specs provided")]
  Empty,

  #[error(transparent)]
  Invalid(#[from] ValidationErrors),
}

/// Load a single spec document.
pub fn load_spec(data: &[u8]) -> Result<Spec, LoadError> {
  let spec: Spec = serde_yaml::from_slice(data).map_err(LoadError::Parse)?;
  finish(spec)
}

/// Load every spec in a stream of `---` separated documents, in document order.
///
/// # Errors
///
/// Fails on the first document that does not parse or validate, and when the
/// stream holds no specs at all. Empty documents are skipped.
pub fn load_specs(data: &[u8]) -> Result<Vec<Spec>, LoadError> {
  let mut specs = Vec::new();

  for (index, document) in serde_yaml::Deserializer::from_slice(data).enumerate() {
    // Empty documents, such as the one after a trailing `---`, carry no spec.
    let Some(spec) =
      Option::<Spec>::deserialize(document).map_err(|error| LoadError::ParseDocument { index, error })?
    else {
      continue;
    };
    specs.push(finish(spec)?);
  }

  if specs.is_empty() {
    return Err(LoadError::Empty);
  }

  info!(count = specs.len(), "loaded specs");
  Ok(specs)
}

fn finish(mut spec: Spec) -> Result<Spec, LoadError> {
  spec.validate()?;
  spec.fill_defaults();
  debug!(name = %spec.name, sources = spec.sources.len(), "loaded spec");
  Ok(spec)
}

#[cfg(test)]
mod tests {
  use super::*;

  const SIMPLE: &str = r#"
name: hello
version: "${VERSION}"
revision: "1"
args:
  VERSION: 1.0.0
sources:
  src:
    git:
      url: https://example.com/hello.git
      commit: v${VERSION}
  local:
    context: {}
patches:
  src:
    - source: fix-build.patch
    - source: other.patch
      strip: 2
dependencies:
  build:
    gcc: []
  runtime:
    libc: [">= 2.30"]
build:
  env:
    CGO_ENABLED: "0"
  steps:
    - command: make
tests:
  - name: version
    steps:
      - command: hello --version
        stdout:
          starts_with: hello
"#;

  #[test]
  fn load_fills_defaults() {
    let spec = load_spec(SIMPLE.as_bytes()).unwrap();
    assert_eq!(spec.name, "hello");
    assert_eq!(spec.patches["src"][0].strip, Some(1));
    assert_eq!(spec.patches["src"][1].strip, Some(2));
    assert_eq!(spec.sources["local"].context.as_ref().unwrap().name, "context");
    assert_eq!(spec.build_deps(""), vec!["gcc"]);
    assert_eq!(spec.dependencies.as_ref().unwrap().runtime["libc"], vec![">= 2.30".to_string()]);
  }

  #[test]
  fn load_does_not_substitute() {
    let spec = load_spec(SIMPLE.as_bytes()).unwrap();
    assert_eq!(spec.version, "${VERSION}");
  }

  #[test]
  fn unknown_fields_are_rejected() {
    let err = load_spec(b"name: x\nnot_a_field: true\n").unwrap_err();
    assert!(matches!(err, LoadError::Parse(_)));
    assert!(err.to_string().contains("not_a_field"), "{err}");
  }

  #[test]
  fn nested_unknown_fields_are_rejected() {
    let doc = "name: x\nsources:\n  s:\n    git:\n      url: u\n      branch: main\n";
    assert!(matches!(load_spec(doc.as_bytes()), Err(LoadError::Parse(_))));
  }

  #[test]
  fn invalid_spec_is_reported() {
    let doc = "name: x\nsources:\n  s: {}\n";
    let err = load_spec(doc.as_bytes()).unwrap_err();
    let LoadError::Invalid(errors) = err else {
      panic!("expected validation error, got {err}");
    };
    assert_eq!(errors.spec, "x");
    assert_eq!(errors.len(), 1);
  }

  #[test]
  fn reload_of_serialized_spec_is_equivalent() {
    let spec = load_spec(SIMPLE.as_bytes()).unwrap();
    let yaml = spec.to_yaml().unwrap();
    let reloaded = load_spec(yaml.as_bytes()).unwrap();
    assert_eq!(reloaded, spec);
  }

  #[test]
  fn multiple_documents_keep_order() {
    let doc = "name: a\n---\nname: b\n---\nname: c\n";
    let specs = load_specs(doc.as_bytes()).unwrap();
    let names: Vec<_> = specs.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, vec!["a", "b", "c"]);
  }

  #[test]
  fn documents_are_validated_and_defaulted() {
    let doc = "name: a\nsources:\n  c:\n    context: {}\n---\nname: b\nsources:\n  bad: {}\n";
    let err = load_specs(doc.as_bytes()).unwrap_err();
    assert!(matches!(err, LoadError::Invalid(ref e) if e.spec == "b"));

    let specs = load_specs(b"name: a\nsources:\n  c:\n    context: {}\n").unwrap();
    assert_eq!(specs[0].sources["c"].context.as_ref().unwrap().name, "context");
  }

  #[test]
  fn empty_stream_is_an_error() {
    assert!(matches!(load_specs(b""), Err(LoadError::Empty)));
    assert!(matches!(load_specs(b"# nothing here\n"), Err(LoadError::Empty)));
    assert!(matches!(load_specs(b"---\n---\n"), Err(LoadError::Empty)));
  }

  #[test]
  fn empty_documents_are_skipped() {
    let specs = load_specs(b"name: a\n---\nname: b\n---\n").unwrap();
    let names: Vec<_> = specs.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, vec!["a", "b"]);

    let specs = load_specs(b"---\nname: a\n---\n---\nname: b\n").unwrap();
    assert_eq!(specs.len(), 2);
  }

  #[test]
  fn malformed_document_is_a_parse_error() {
    let doc = "name: a\n---\nname: [unclosed\n";
    let err = load_specs(doc.as_bytes()).unwrap_err();
    assert!(matches!(err, LoadError::ParseDocument { .. }), "{err}");
  }
}
