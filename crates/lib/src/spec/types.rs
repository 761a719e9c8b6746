use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::source::Source;
use super::test::TestSpec;

/// One buildable package definition.
///
/// Names are only unique within a loaded batch; the graph enforces that, not
/// the spec itself.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Spec {
  pub name: String,

  #[serde(default, skip_serializing_if = "String::is_empty")]
  pub description: String,

  #[serde(default, skip_serializing_if = "String::is_empty")]
  pub website: String,

  #[serde(default, skip_serializing_if = "String::is_empty")]
  pub license: String,

  #[serde(default, skip_serializing_if = "String::is_empty")]
  pub vendor: String,

  #[serde(default, skip_serializing_if = "String::is_empty")]
  pub packager: String,

  #[serde(default, skip_serializing_if = "String::is_empty")]
  pub version: String,

  #[serde(default, skip_serializing_if = "String::is_empty")]
  pub revision: String,

  #[serde(default, skip_serializing_if = "std::ops::Not::not")]
  pub noarch: bool,

  /// Declared build arguments and their default values.
  #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
  pub args: BTreeMap<String, String>,

  #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
  pub sources: BTreeMap<String, Source>,

  /// Patches to apply, keyed by the name of the source they patch.
  #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
  pub patches: BTreeMap<String, Vec<PatchSpec>>,

  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub dependencies: Option<PackageDependencies>,

  #[serde(default, skip_serializing_if = "ArtifactBuild::is_empty")]
  pub build: ArtifactBuild,

  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub tests: Vec<TestSpec>,

  #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
  pub targets: BTreeMap<String, Target>,
}

/// Build and runtime dependencies, each mapping a package name to its version
/// constraints.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PackageDependencies {
  #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
  pub build: BTreeMap<String, Vec<String>>,

  #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
  pub runtime: BTreeMap<String, Vec<String>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ArtifactBuild {
  #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
  pub env: BTreeMap<String, String>,

  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub steps: Vec<BuildStep>,
}

impl ArtifactBuild {
  pub fn is_empty(&self) -> bool {
    self.env.is_empty() && self.steps.is_empty()
  }
}

/// A single command run during the build, in declared order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BuildStep {
  pub command: String,

  #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
  pub env: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PatchSpec {
  /// Name of the source holding the patch file.
  pub source: String,

  /// Leading path components to strip; filled with [`DEFAULT_PATCH_STRIP`] when unset.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub strip: Option<u32>,
}

pub const DEFAULT_PATCH_STRIP: u32 = 1;

/// Overrides for one buildable variant of a spec.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Target {
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub tests: Vec<TestSpec>,

  /// Replaces the spec-level dependencies when building this target.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub dependencies: Option<PackageDependencies>,

  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub package_config: Option<PackageConfig>,
}

impl Target {
  pub fn has_signer(&self) -> bool {
    self
      .package_config
      .as_ref()
      .and_then(|cfg| cfg.signer.as_ref())
      .is_some_and(|signer| signer.image.is_some())
  }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PackageConfig {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub signer: Option<Source>,
}

impl Spec {
  /// Dependencies that apply to `target`: the target's own set if it declares
  /// one, otherwise the spec-level set.
  pub fn dependencies_for(&self, target: &str) -> Option<&PackageDependencies> {
    self
      .targets
      .get(target)
      .and_then(|t| t.dependencies.as_ref())
      .or(self.dependencies.as_ref())
  }

  /// Sorted build dependency names for `target`.
  pub fn build_deps(&self, target: &str) -> Vec<&str> {
    self
      .dependencies_for(target)
      .map(|deps| deps.build.keys().map(String::as_str).collect())
      .unwrap_or_default()
  }

  /// Sorted runtime dependency names for `target`.
  pub fn runtime_deps(&self, target: &str) -> Vec<&str> {
    self
      .dependencies_for(target)
      .map(|deps| deps.runtime.keys().map(String::as_str).collect())
      .unwrap_or_default()
  }

  /// Render the spec back to YAML.
  pub fn to_yaml(&self) -> Result<String, serde_yaml::Error> {
    serde_yaml::to_string(self)
  }
}
