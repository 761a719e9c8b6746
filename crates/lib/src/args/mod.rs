//! Build argument substitution.
//!
//! A spec declares the arguments it accepts in `args`, each with a default.
//! [`Spec::substitute_args`] overlays a caller-supplied environment on those
//! defaults and expands `$NAME` / `${NAME}` references in every templated
//! string field of the spec.
//!
//! Keys in the environment that the spec does not declare must appear in a
//! [`KnownArgs`] allow-list; they are accepted but never injected.

mod expand;

use std::collections::{BTreeMap, BTreeSet};

use thiserror::Error;
use tracing::debug;

pub use expand::{ExpandError, Lookup, expand};

use crate::spec::{CheckFieldsMut, Command, Source, SourceMount, Spec, TestSpec};

/// Platform arguments every build accepts without declaring them.
pub const PLATFORM_ARGS: &[&str] = &[
  "TARGETOS",
  "TARGETARCH",
  "TARGETPLATFORM",
  "TARGETVARIANT",
  "BUILDOS",
  "BUILDARCH",
  "BUILDPLATFORM",
  "BUILDVARIANT",
];

/// Build-system control flags accepted without declaring them.
pub const CONTROL_ARGS: &[&str] = &["BUILDKIT_SYNTAX", "DALEC_DISABLE_DIFF_MERGE"];

/// Allow-list of argument keys a spec accepts without declaring them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KnownArgs {
  platform: BTreeSet<String>,
  other: BTreeSet<String>,
}

impl Default for KnownArgs {
  fn default() -> Self {
    Self {
      platform: PLATFORM_ARGS.iter().map(|s| s.to_string()).collect(),
      other: CONTROL_ARGS.iter().map(|s| s.to_string()).collect(),
    }
  }
}

impl KnownArgs {
  /// An allow-list that accepts nothing beyond declared args.
  pub fn empty() -> Self {
    Self {
      platform: BTreeSet::new(),
      other: BTreeSet::new(),
    }
  }

  pub fn with_arg(mut self, name: impl Into<String>) -> Self {
    self.other.insert(name.into());
    self
  }

  pub fn contains(&self, key: &str) -> bool {
    self.is_platform_arg(key) || self.other.contains(key)
  }

  pub fn is_platform_arg(&self, key: &str) -> bool {
    self.platform.contains(key)
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubstituteError {
  #[error("unknown arg {0:?}")]
  UnknownArg(String),

  #[error("error performing shell expansion on {field}: {error}")]
  Expansion { field: String, error: ExpandError },

  #[error("spec {spec:?}: {error}")]
  InSpec { spec: String, error: Box<SubstituteError> },
}

impl Spec {
  /// Expand build arguments in every templated field using the default
  /// allow-list.
  pub fn substitute_args(&mut self, env: &BTreeMap<String, String>) -> Result<(), SubstituteError> {
    self.substitute_args_with(env, &KnownArgs::default())
  }

  /// Expand build arguments in every templated field.
  ///
  /// Either every field is rewritten or, on error, the spec is left exactly as
  /// it was.
  ///
  /// # Errors
  ///
  /// Returns [`SubstituteError::UnknownArg`] for an environment key that is
  /// neither declared nor in `known`, and [`SubstituteError::Expansion`]
  /// naming the first field that failed to expand.
  pub fn substitute_args_with(
    &mut self,
    env: &BTreeMap<String, String>,
    known: &KnownArgs,
  ) -> Result<(), SubstituteError> {
    let args = resolve_args(&self.args, env, known)?;
    debug!(spec = %self.name, args = args.len(), "substituting build args");

    let mut working = self.clone();
    Substitution { args: &args }.spec(&mut working)?;
    *self = working;

    Ok(())
  }
}

impl Spec {
  /// The entries of `env` this spec takes: keys it declares or `known` allows.
  pub fn accepted_args(&self, env: &BTreeMap<String, String>, known: &KnownArgs) -> BTreeMap<String, String> {
    env
      .iter()
      .filter(|(key, _)| self.args.contains_key(*key) || known.contains(key))
      .map(|(key, value)| (key.clone(), value.clone()))
      .collect()
  }
}

/// Substitute one shared environment into every spec of a batch.
///
/// Each spec only sees the keys it declares plus the allow-listed ones, so an
/// arg declared by a single spec does not break the others. A key that no
/// spec declares and `known` does not allow is rejected. Either every spec is
/// rewritten or, on error, none is.
///
/// # Errors
///
/// Returns [`SubstituteError::UnknownArg`] for a key no spec accepts, and
/// [`SubstituteError::InSpec`] wrapping the first per-spec failure.
pub fn substitute_batch(
  specs: &mut [Spec],
  env: &BTreeMap<String, String>,
  known: &KnownArgs,
) -> Result<(), SubstituteError> {
  if let Some(key) = env
    .keys()
    .find(|key| !known.contains(key) && !specs.iter().any(|spec| spec.args.contains_key(*key)))
  {
    return Err(SubstituteError::UnknownArg(key.clone()));
  }

  let mut working = specs.to_vec();
  for spec in &mut working {
    let accepted = spec.accepted_args(env, known);
    spec
      .substitute_args_with(&accepted, known)
      .map_err(|error| SubstituteError::InSpec {
        spec: spec.name.clone(),
        error: Box::new(error),
      })?;
  }
  specs.clone_from_slice(&working);

  Ok(())
}

/// Seed with declared defaults, then overlay the environment.
fn resolve_args(
  declared: &BTreeMap<String, String>,
  env: &BTreeMap<String, String>,
  known: &KnownArgs,
) -> Result<BTreeMap<String, String>, SubstituteError> {
  let mut args = declared.clone();

  for (key, value) in env {
    match args.get_mut(key) {
      Some(slot) => *slot = value.clone(),
      // Allowed but not declared: the spec did not opt in, so it is not injected.
      None if known.contains(key) => continue,
      None => return Err(SubstituteError::UnknownArg(key.clone())),
    }
  }

  Ok(args)
}

struct Substitution<'a> {
  args: &'a BTreeMap<String, String>,
}

impl Substitution<'_> {
  fn field(&self, value: &mut String, describe: impl FnOnce() -> String) -> Result<(), SubstituteError> {
    *value = expand(value, self.args).map_err(|error| SubstituteError::Expansion {
      field: describe(),
      error,
    })?;
    Ok(())
  }

  fn env(&self, env: &mut BTreeMap<String, String>, owner: &str) -> Result<(), SubstituteError> {
    for (key, value) in env.iter_mut() {
      self.field(value, || format!("env var {key:?} for {owner}"))?;
    }
    Ok(())
  }

  fn spec(&self, spec: &mut Spec) -> Result<(), SubstituteError> {
    for (name, src) in spec.sources.iter_mut() {
      self.source(src, &format!("source {name:?}"))?;
    }

    self.field(&mut spec.version, || "version".to_string())?;
    self.field(&mut spec.revision, || "revision".to_string())?;

    self.env(&mut spec.build.env, "build")?;
    for (i, step) in spec.build.steps.iter_mut().enumerate() {
      self.env(&mut step.env, &format!("build step {i}"))?;
    }

    for test in spec.tests.iter_mut() {
      let owner = format!("test {:?}", test.name);
      self.test(test, &owner)?;
    }

    for (target, t) in spec.targets.iter_mut() {
      for test in t.tests.iter_mut() {
        let owner = format!("test {:?}", format!("{target}/{}", test.name));
        self.test(test, &owner)?;
      }
    }

    Ok(())
  }

  fn source(&self, src: &mut Source, owner: &str) -> Result<(), SubstituteError> {
    if let Some(image) = &mut src.image {
      self.field(&mut image.reference, || format!("{owner} image ref"))?;
      if let Some(cmd) = &mut image.cmd {
        self.command(cmd, owner)?;
      }
    }

    if let Some(git) = &mut src.git {
      self.field(&mut git.url, || format!("{owner} git url"))?;
      self.field(&mut git.commit, || format!("{owner} git commit"))?;
    }

    if let Some(http) = &mut src.http {
      self.field(&mut http.url, || format!("{owner} http url"))?;
    }

    if let Some(context) = &mut src.context {
      self.field(&mut context.name, || format!("{owner} context name"))?;
    }

    if let Some(build) = &mut src.build {
      self.source(&mut build.source, &format!("{owner} build subsource"))?;
      self.field(&mut build.dockerfile, || format!("{owner} dockerfile"))?;
      self.field(&mut build.target, || format!("{owner} build target"))?;
    }

    Ok(())
  }

  fn mounts(&self, mounts: &mut [SourceMount], owner: &str) -> Result<(), SubstituteError> {
    for mnt in mounts {
      self.source(&mut mnt.spec, &format!("{owner} mount {:?}", mnt.dest))?;
    }
    Ok(())
  }

  fn command(&self, cmd: &mut Command, owner: &str) -> Result<(), SubstituteError> {
    self.mounts(&mut cmd.mounts, owner)?;
    self.env(&mut cmd.env, owner)?;
    for (i, step) in cmd.steps.iter_mut().enumerate() {
      self.env(&mut step.env, &format!("{owner} step {i}"))?;
    }
    Ok(())
  }

  fn test(&self, test: &mut TestSpec, owner: &str) -> Result<(), SubstituteError> {
    self.mounts(&mut test.mounts, owner)?;
    self.env(&mut test.env, owner)?;

    for (i, step) in test.steps.iter_mut().enumerate() {
      let step_owner = format!("{owner} step {i}");
      self.env(&mut step.env, &step_owner)?;
      self.check(step.stdout.fields_mut(), &format!("{step_owner} stdout"))?;
      self.check(step.stderr.fields_mut(), &format!("{step_owner} stderr"))?;
    }

    for (path, file) in test.files.iter_mut() {
      self.check(file.fields_mut(), &format!("{owner} file {path:?}"))?;
    }

    Ok(())
  }

  fn check(&self, fields: CheckFieldsMut<'_>, owner: &str) -> Result<(), SubstituteError> {
    let CheckFieldsMut {
      contains,
      equals,
      matches,
      starts_with,
      ends_with,
    } = fields;

    for (i, item) in contains.iter_mut().enumerate() {
      self.field(item, || format!("{owner} contains[{i}]"))?;
    }
    self.field(ends_with, || format!("{owner} ends_with"))?;
    self.field(matches, || format!("{owner} matches"))?;
    self.field(equals, || format!("{owner} equals"))?;
    self.field(starts_with, || format!("{owner} starts_with"))?;
    Ok(())
  }
}
