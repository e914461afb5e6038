//! The ordered build lifecycle.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from stepping through the lifecycle.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BuildStepError {
  /// `next()` was called on the final step.
  #[error("no step follows {0}")]
  PastTerminal(BuildStep),

  #[error("unknown build step '{0}'")]
  Unknown(String),
}

/// One step of the build lifecycle, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BuildStep {
  Initialize,
  Resolve,
  Generate,
  Preprocess,
  Compile,
  Postprocess,
  Verify,
  TestGenerate,
  TestPreprocess,
  TestCompile,
  TestPostprocess,
  TestVerify,
  PackageGenerate,
  PackagePreprocess,
  Package,
  PackageVerify,
  Install,
  Deploy,
}

const ALL_STEPS: [BuildStep; 18] = [
  BuildStep::Initialize,
  BuildStep::Resolve,
  BuildStep::Generate,
  BuildStep::Preprocess,
  BuildStep::Compile,
  BuildStep::Postprocess,
  BuildStep::Verify,
  BuildStep::TestGenerate,
  BuildStep::TestPreprocess,
  BuildStep::TestCompile,
  BuildStep::TestPostprocess,
  BuildStep::TestVerify,
  BuildStep::PackageGenerate,
  BuildStep::PackagePreprocess,
  BuildStep::Package,
  BuildStep::PackageVerify,
  BuildStep::Install,
  BuildStep::Deploy,
];

impl BuildStep {
  /// Every step, first to last.
  pub fn all() -> &'static [BuildStep] {
    &ALL_STEPS
  }

  pub fn is_terminal(self) -> bool {
    self == BuildStep::Deploy
  }

  /// The step after this one.
  ///
  /// Asking for the step after [`BuildStep::Deploy`] is an error.
  pub fn next(self) -> Result<BuildStep, BuildStepError> {
    let index = self as usize;
    ALL_STEPS
      .get(index + 1)
      .copied()
      .ok_or(BuildStepError::PastTerminal(self))
  }

  pub fn name(self) -> &'static str {
    match self {
      BuildStep::Initialize => "initialize",
      BuildStep::Resolve => "resolve",
      BuildStep::Generate => "generate",
      BuildStep::Preprocess => "preprocess",
      BuildStep::Compile => "compile",
      BuildStep::Postprocess => "postprocess",
      BuildStep::Verify => "verify",
      BuildStep::TestGenerate => "test-generate",
      BuildStep::TestPreprocess => "test-preprocess",
      BuildStep::TestCompile => "test-compile",
      BuildStep::TestPostprocess => "test-postprocess",
      BuildStep::TestVerify => "test-verify",
      BuildStep::PackageGenerate => "package-generate",
      BuildStep::PackagePreprocess => "package-preprocess",
      BuildStep::Package => "package",
      BuildStep::PackageVerify => "package-verify",
      BuildStep::Install => "install",
      BuildStep::Deploy => "deploy",
    }
  }
}

impl fmt::Display for BuildStep {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.name())
  }
}

impl FromStr for BuildStep {
  type Err = BuildStepError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    ALL_STEPS
      .iter()
      .copied()
      .find(|step| step.name() == s)
      .ok_or_else(|| BuildStepError::Unknown(s.to_string()))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn next_walks_the_lifecycle_in_order() {
    let mut step = BuildStep::Initialize;
    let mut seen = vec![step];
    while !step.is_terminal() {
      step = step.next().unwrap();
      seen.push(step);
    }
    assert_eq!(seen, BuildStep::all());
  }

  #[test]
  fn next_past_deploy_is_an_error() {
    assert_eq!(BuildStep::Deploy.next(), Err(BuildStepError::PastTerminal(BuildStep::Deploy)));
  }

  #[test]
  fn steps_are_totally_ordered() {
    assert!(BuildStep::Initialize < BuildStep::Resolve);
    assert!(BuildStep::Verify < BuildStep::TestGenerate);
    assert!(BuildStep::TestVerify < BuildStep::PackageGenerate);
    assert!(BuildStep::Install < BuildStep::Deploy);
  }

  #[test]
  fn names_parse_back() {
    for step in BuildStep::all() {
      assert_eq!(step.name().parse::<BuildStep>().unwrap(), *step);
    }
    assert!("link".parse::<BuildStep>().is_err());
  }

  #[test]
  fn serializes_as_kebab_case() {
    assert_eq!(serde_json::to_string(&BuildStep::TestCompile).unwrap(), "\"test-compile\"");
  }
}
