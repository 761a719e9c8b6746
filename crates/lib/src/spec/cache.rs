//! Cache mount configuration shared by source commands and tests.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// How a cache mount may be shared between concurrent builds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum SharingMode {
  /// Any number of builds may use the cache at once.
  #[default]
  Shared,
  /// Each concurrent build gets its own copy.
  Private,
  /// Builds take turns; only one holds the cache at a time.
  Locked,
}

impl SharingMode {
  pub fn as_str(&self) -> &'static str {
    match self {
      SharingMode::Shared => "shared",
      SharingMode::Private => "private",
      SharingMode::Locked => "locked",
    }
  }
}

impl fmt::Display for SharingMode {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid sharing mode {0:?}: expected one of shared, private, locked")]
pub struct SharingModeError(pub String);

impl FromStr for SharingMode {
  type Err = SharingModeError;

  /// An empty mode is the same as `shared`.
  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "" | "shared" => Ok(SharingMode::Shared),
      "private" => Ok(SharingMode::Private),
      "locked" => Ok(SharingMode::Locked),
      other => Err(SharingModeError(other.to_string())),
    }
  }
}

/// A persistent cache directory mounted while a command runs.
///
/// `mode` stays a plain string in the model so that an unrecognized value is
/// reported by validation with the owning entity and path, not by the parser.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CacheDirConfig {
  #[serde(default, skip_serializing_if = "String::is_empty")]
  pub mode: String,

  #[serde(default, skip_serializing_if = "String::is_empty")]
  pub key: String,

  #[serde(default, skip_serializing_if = "std::ops::Not::not")]
  pub include_distro_key: bool,
}

impl CacheDirConfig {
  pub fn sharing_mode(&self) -> Result<SharingMode, SharingModeError> {
    self.mode.parse()
  }
}
