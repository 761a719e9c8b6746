//! Source definitions: where a spec's input materials come from.
//!
//! A [`Source`] is a tagged union expressed as a struct of optional variants so
//! that documents with zero or several variants still parse and can be reported
//! precisely by validation.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::cache::{CacheDirConfig, SharingModeError};
use super::types::BuildStep;

/// Build context name used when a `context` source leaves its name unset.
pub const DEFAULT_CONTEXT_NAME: &str = "context";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Source {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub image: Option<SourceDockerImage>,

  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub git: Option<SourceGit>,

  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub http: Option<SourceHttp>,

  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub context: Option<SourceContext>,

  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub build: Option<Box<SourceBuild>>,

  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub inline: Option<SourceInline>,

  /// Sub-path of the fetched source to extract.
  #[serde(default, skip_serializing_if = "String::is_empty")]
  pub path: String,

  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub includes: Vec<String>,

  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub excludes: Vec<String>,
}

/// A container image, optionally with a command run inside it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SourceDockerImage {
  #[serde(rename = "ref", default)]
  pub reference: String,

  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub cmd: Option<Command>,
}

/// Command executed inside a docker image source to produce its content.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Command {
  #[serde(default, skip_serializing_if = "String::is_empty")]
  pub dir: String,

  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub mounts: Vec<SourceMount>,

  #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
  pub cache_dirs: BTreeMap<String, CacheDirConfig>,

  #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
  pub env: BTreeMap<String, String>,

  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub steps: Vec<BuildStep>,
}

/// A source mounted at `dest` while a command runs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SourceMount {
  pub dest: String,
  pub spec: Source,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SourceGit {
  pub url: String,

  #[serde(default)]
  pub commit: String,

  #[serde(default, skip_serializing_if = "std::ops::Not::not")]
  pub keep_git_dir: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SourceHttp {
  pub url: String,
}

/// A named build context supplied by the client.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SourceContext {
  #[serde(default)]
  pub name: String,
}

/// A source produced by running a Dockerfile against another source.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SourceBuild {
  pub source: Source,

  /// Path of the Dockerfile within `source`.
  #[serde(default, skip_serializing_if = "String::is_empty")]
  pub dockerfile: String,

  /// Dockerfile content given directly.
  #[serde(default, skip_serializing_if = "String::is_empty")]
  pub inline: String,

  #[serde(default, skip_serializing_if = "String::is_empty")]
  pub target: String,

  #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
  pub args: BTreeMap<String, String>,
}

/// Literal content embedded in the spec, either a single file or a directory.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SourceInline {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub file: Option<SourceInlineFile>,

  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub dir: Option<SourceInlineDir>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SourceInlineFile {
  #[serde(default)]
  pub contents: String,

  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub permissions: Option<u32>,

  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub uid: Option<u32>,

  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub gid: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SourceInlineDir {
  #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
  pub files: BTreeMap<String, SourceInlineFile>,

  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub permissions: Option<u32>,

  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub uid: Option<u32>,

  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub gid: Option<u32>,
}

/// A single structural problem found in a [`Source`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SourceError {
  #[error("no non-nil source variant")]
  NoVariant,

  #[error("more than one source variant defined")]
  MultipleVariants,

  #[error("docker image source variant must have a ref")]
  MissingImageRef,

  #[error("build sources cannot be recursive")]
  RecursiveBuild,

  #[error("build sources may use either `dockerfile` or `inline`, but not both")]
  DockerfileAndInline,

  #[error("build must use either `dockerfile` or `inline`")]
  MissingDockerfile,

  #[error("inline sources must set exactly one of `file` or `dir`")]
  InlineVariant,

  #[error("inline dir entry {0:?} must not contain a path separator")]
  InlineEntryName(String),

  #[error("inline file sources cannot set `path`")]
  InlineFilePath,

  #[error("invalid sharing mode for cache mount at path {path:?}: {source}")]
  SharingMode { path: String, source: SharingModeError },

  /// Problems found in a source nested inside another one.
  #[error("{context}: {}", join_errors(.errors))]
  Nested { context: String, errors: Vec<SourceError> },
}

pub(crate) fn join_errors<E: fmt::Display>(errors: &[E]) -> String {
  errors.iter().map(|e| e.to_string()).collect::<Vec<_>>().join("; ")
}

impl Source {
  /// Number of populated variant fields.
  pub fn variant_count(&self) -> usize {
    [
      self.image.is_some(),
      self.git.is_some(),
      self.http.is_some(),
      self.context.is_some(),
      self.build.is_some(),
      self.inline.is_some(),
    ]
    .into_iter()
    .filter(|set| *set)
    .count()
  }

  /// Short name of the populated variant, for diagnostics.
  pub fn kind(&self) -> &'static str {
    if self.image.is_some() {
      "image"
    } else if self.git.is_some() {
      "git"
    } else if self.http.is_some() {
      "http"
    } else if self.context.is_some() {
      "context"
    } else if self.build.is_some() {
      "build"
    } else if self.inline.is_some() {
      "inline"
    } else {
      "none"
    }
  }

  /// Check the exactly-one-variant rule and the per-variant invariants.
  ///
  /// Every violation is collected; an empty vector means the source is valid.
  /// Sources mounted into a docker image command are checked recursively.
  pub fn validate(&self) -> Vec<SourceError> {
    let mut errors = Vec::new();

    if let Some(image) = &self.image {
      if image.reference.is_empty() {
        errors.push(SourceError::MissingImageRef);
      }

      if let Some(cmd) = &image.cmd {
        for mnt in &cmd.mounts {
          let nested = mnt.spec.validate();
          if !nested.is_empty() {
            errors.push(SourceError::Nested {
              context: format!("docker image source with ref '{}'", image.reference),
              errors: nested,
            });
          }
        }

        for (path, cfg) in &cmd.cache_dirs {
          if let Err(source) = cfg.sharing_mode() {
            errors.push(SourceError::SharingMode {
              path: path.clone(),
              source,
            });
          }
        }
      }
    }

    if let Some(build) = &self.build {
      let nested = build.validate();
      if !nested.is_empty() {
        let content = if build.inline.is_empty() {
          &build.dockerfile
        } else {
          &build.inline
        };
        errors.push(SourceError::Nested {
          context: format!("build source with dockerfile `{content}`"),
          errors: nested,
        });
      }
    }

    if let Some(inline) = &self.inline {
      errors.extend(inline.validate(&self.path));
    }

    match self.variant_count() {
      0 => errors.push(SourceError::NoVariant),
      1 => {}
      _ => errors.push(SourceError::MultipleVariants),
    }

    errors
  }
}

impl SourceBuild {
  fn validate(&self) -> Vec<SourceError> {
    // The inner source is not descended into when it is itself a build.
    if self.source.build.is_some() {
      return vec![SourceError::RecursiveBuild];
    }

    let mut errors = Vec::new();
    match (self.dockerfile.is_empty(), self.inline.is_empty()) {
      (false, false) => errors.push(SourceError::DockerfileAndInline),
      (true, true) => errors.push(SourceError::MissingDockerfile),
      _ => {}
    }

    let nested = self.source.validate();
    if !nested.is_empty() {
      errors.push(SourceError::Nested {
        context: "build subsource".to_string(),
        errors: nested,
      });
    }

    errors
  }
}

impl SourceInline {
  fn validate(&self, path: &str) -> Vec<SourceError> {
    let mut errors = Vec::new();
    match (&self.file, &self.dir) {
      (Some(_), None) => {
        if !path.is_empty() {
          errors.push(SourceError::InlineFilePath);
        }
      }
      (None, Some(dir)) => {
        for name in dir.files.keys() {
          if name.contains(std::path::MAIN_SEPARATOR) || name.contains('/') {
            errors.push(SourceError::InlineEntryName(name.clone()));
          }
        }
      }
      _ => errors.push(SourceError::InlineVariant),
    }
    errors
  }
}
