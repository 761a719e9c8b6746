use super::source::{DEFAULT_CONTEXT_NAME, Source};
use super::types::{DEFAULT_PATCH_STRIP, Spec};

impl Source {
  /// Fill unset defaults in this source and any sources nested inside it.
  pub fn fill_defaults(&mut self) {
    if let Some(image) = &mut self.image
      && let Some(cmd) = &mut image.cmd
    {
      for mnt in &mut cmd.mounts {
        mnt.spec.fill_defaults();
      }
    }

    if let Some(context) = &mut self.context
      && context.name.is_empty()
    {
      context.name = DEFAULT_CONTEXT_NAME.to_string();
    }

    if let Some(build) = &mut self.build {
      build.source.fill_defaults();
    }
  }
}

impl Spec {
  /// Fill every unset default in place. Idempotent.
  pub fn fill_defaults(&mut self) {
    for src in self.sources.values_mut() {
      src.fill_defaults();
    }

    for patches in self.patches.values_mut() {
      for patch in patches.iter_mut() {
        patch.strip.get_or_insert(DEFAULT_PATCH_STRIP);
      }
    }

    for test in self.tests.iter_mut().chain(self.targets.values_mut().flat_map(|t| t.tests.iter_mut())) {
      for mnt in &mut test.mounts {
        mnt.spec.fill_defaults();
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::spec::{Command, PatchSpec, SourceBuild, SourceContext, SourceDockerImage, SourceMount};

  fn context(name: &str) -> Source {
    Source {
      context: Some(SourceContext { name: name.to_string() }),
      ..Default::default()
    }
  }

  #[test]
  fn patch_strip_defaults_to_one() {
    let mut spec = Spec::default();
    spec.patches.insert(
      "src".to_string(),
      vec![
        PatchSpec {
          source: "fix.patch".to_string(),
          strip: None,
        },
        PatchSpec {
          source: "other.patch".to_string(),
          strip: Some(3),
        },
      ],
    );

    spec.fill_defaults();

    let patches = &spec.patches["src"];
    assert_eq!(patches[0].strip, Some(1));
    assert_eq!(patches[1].strip, Some(3));
  }

  #[test]
  fn context_name_is_filled_recursively() {
    let mut spec = Spec::default();
    spec.sources.insert("ctx".to_string(), context(""));
    spec.sources.insert("named".to_string(), context("mine"));
    spec.sources.insert(
      "built".to_string(),
      Source {
        build: Some(Box::new(SourceBuild {
          source: context(""),
          dockerfile: "Dockerfile".to_string(),
          ..Default::default()
        })),
        ..Default::default()
      },
    );
    spec.sources.insert(
      "image".to_string(),
      Source {
        image: Some(SourceDockerImage {
          reference: "busybox".to_string(),
          cmd: Some(Command {
            mounts: vec![SourceMount {
              dest: "/ctx".to_string(),
              spec: context(""),
            }],
            ..Default::default()
          }),
        }),
        ..Default::default()
      },
    );

    spec.fill_defaults();

    let name_of = |src: &Source| src.context.as_ref().map(|c| c.name.clone());
    assert_eq!(name_of(&spec.sources["ctx"]).as_deref(), Some(DEFAULT_CONTEXT_NAME));
    assert_eq!(name_of(&spec.sources["named"]).as_deref(), Some("mine"));
    let built = spec.sources["built"].build.as_ref().unwrap();
    assert_eq!(name_of(&built.source).as_deref(), Some(DEFAULT_CONTEXT_NAME));
    let mounted = &spec.sources["image"].image.as_ref().unwrap().cmd.as_ref().unwrap().mounts[0];
    assert_eq!(name_of(&mounted.spec).as_deref(), Some(DEFAULT_CONTEXT_NAME));
  }

  #[test]
  fn filling_twice_is_idempotent() {
    let mut spec = Spec::default();
    spec.sources.insert("ctx".to_string(), context(""));
    spec.patches.insert(
      "ctx".to_string(),
      vec![PatchSpec {
        source: "p".to_string(),
        strip: None,
      }],
    );

    spec.fill_defaults();
    let once = spec.clone();
    spec.fill_defaults();
    assert_eq!(spec, once);
  }
}
