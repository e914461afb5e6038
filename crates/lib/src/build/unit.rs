//! Executor units for dependencies.

use std::sync::Arc;

use async_trait::async_trait;

use super::Builder;
use crate::dependency::Dependency;
use crate::execute::{BuildError, BuildLog, Buildable};
use crate::resolve::ArtifactResolver;

/// Runs one dependency of a plan.
///
/// Artifacts and libraries are resolved, together with everything they need,
/// through the shared resolver. Builds run their phases.
pub struct DependencyUnit {
  dependency: Dependency,
  resolver: Arc<ArtifactResolver>,
  builder: Builder,
}

impl DependencyUnit {
  pub fn new(dependency: Dependency, resolver: Arc<ArtifactResolver>, builder: Builder) -> Self {
    Self {
      dependency,
      resolver,
      builder,
    }
  }

  pub fn dependency(&self) -> &Dependency {
    &self.dependency
  }
}

#[async_trait]
impl Buildable for DependencyUnit {
  fn name(&self) -> String {
    self.dependency.name()
  }

  async fn build(&self, log: &BuildLog) -> Result<(), BuildError> {
    match &self.dependency {
      Dependency::Artifact(_) | Dependency::Library(_) => {
        let resolved = self.resolver.resolve_transitive(&self.dependency).await?;
        for artifact in &resolved {
          log.info(format!("{} from {}", artifact.artifact(), artifact.repository()));
        }
        Ok(())
      }
      Dependency::Build(project) => {
        let ran = self.builder.run(project, log).await?;
        log.info(format!("{} phases run", ran));
        Ok(())
      }
    }
  }
}

/// A unit factory producing [`DependencyUnit`]s that share `resolver`.
pub fn dependency_units(
  resolver: Arc<ArtifactResolver>,
  builder: Builder,
) -> impl Fn(&Dependency) -> Arc<dyn Buildable> {
  move |dependency: &Dependency| {
    Arc::new(DependencyUnit::new(dependency.clone(), resolver.clone(), builder)) as Arc<dyn Buildable>
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::build::{BuildStep, from_fn};
  use crate::dependency::{ArtifactDescriptor, Project};
  use crate::download::Downloader;
  use crate::execute::{BuildResult, ParallelExecutor, Termination};
  use crate::plan::BuildPlan;
  use crate::repository::LocalRepository;
  use std::time::Duration;
  use tempfile::TempDir;

  fn resolver(temp: &TempDir) -> Arc<ArtifactResolver> {
    Arc::new(ArtifactResolver::new(
      LocalRepository::new(temp.path()),
      Downloader::new(1),
    ))
  }

  #[tokio::test]
  async fn build_dependency_runs_its_phases() {
    let temp = TempDir::new().unwrap();
    let project = Project::new("tool").with_phase(
      BuildStep::Compile,
      from_fn(|project, log| {
        log.info(format!("compiling {}", project.name()));
        Ok(())
      }),
    );
    let unit = DependencyUnit::new(Dependency::build(project), resolver(&temp), Builder::default());

    let log = BuildLog::new();
    unit.build(&log).await.unwrap();

    let texts: Vec<String> = log.messages().into_iter().map(|m| m.text).collect();
    assert_eq!(texts, vec!["compiling tool", "1 phases run"]);
  }

  #[tokio::test]
  async fn missing_artifact_terminates_its_unit_only() {
    let temp = TempDir::new().unwrap();
    let missing = ArtifactDescriptor::parse("org.acme:ghost:1.0").unwrap();
    let root = Dependency::build(
      Project::new("app")
        .with_dependency(Dependency::artifact(missing, vec![]).unwrap())
        .unwrap()
        .with_dependency(Dependency::build(Project::new("tool")))
        .unwrap(),
    );

    let factory = dependency_units(resolver(&temp), Builder::default());
    let plan = BuildPlan::for_root(&root, &factory).unwrap();

    let mut results: Vec<BuildResult> = Vec::new();
    let report = plan.build(&ParallelExecutor::new(2), &mut results, Duration::from_secs(5)).await;

    assert_eq!(report.summary.completed, 1);
    assert_eq!(report.summary.terminated, 1);
    let ghost = results.iter().find(|r| r.name == "org.acme:ghost:1.0").unwrap();
    assert_eq!(ghost.termination, Termination::Terminated);
    assert!(matches!(
      ghost.cause,
      Some(BuildError::Resolve(crate::resolve::ResolveError::ArtifactNotFound { .. }))
    ));
  }
}
