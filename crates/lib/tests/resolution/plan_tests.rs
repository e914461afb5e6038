use std::time::Duration;

use kiln_lib::build::{Builder, dependency_units};
use kiln_lib::dependency::Dependency;
use kiln_lib::execute::{BuildResult, ParallelExecutor, Termination};
use kiln_lib::plan::{BuildPlan, leaf_groups};

use super::common::{TestRepos, desc};

fn names(group: &[Dependency]) -> Vec<String> {
  let mut names: Vec<String> = group.iter().map(Dependency::name).collect();
  names.sort();
  names
}

#[tokio::test]
async fn resolved_tree_plans_leaves_first() {
  let repos = TestRepos::new();
  repos.publish_simple("com.acme:core:1.0.0", &[]);
  repos.publish_simple("com.acme:io:1.0.0", &[]);
  repos.publish_simple("com.acme:util:1.0.0", &["com.acme:core:1.0.0"]);
  repos.publish_simple(
    "com.acme:app:1.0.0",
    &["com.acme:util:1.0.0", "com.acme:io:1.0.0", "com.acme:core:1.0.0"],
  );

  let tree = repos.resolver.dependency_tree(&desc("com.acme:app:1.0.0")).await.unwrap();
  let groups = leaf_groups(&tree).unwrap();

  assert_eq!(groups.len(), 2);
  assert_eq!(names(&groups[0]), vec!["com.acme:core:1.0.0", "com.acme:io:1.0.0"]);
  assert_eq!(names(&groups[1]), vec!["com.acme:util:1.0.0"]);
}

#[tokio::test]
async fn plan_fetches_every_dependency() {
  let repos = TestRepos::new();
  repos.publish_simple("com.acme:core:1.0.0", &[]);
  repos.publish_simple("com.acme:util:1.0.0", &["com.acme:core:1.0.0"]);

  let root = Dependency::artifact(
    desc("com.acme:app:1.0.0"),
    vec![
      Dependency::artifact(desc("com.acme:util:1.0.0"), Vec::new()).unwrap(),
      Dependency::artifact(desc("com.acme:core:1.0.0"), Vec::new()).unwrap(),
    ],
  )
  .unwrap();
  let plan = BuildPlan::for_root(&root, &dependency_units(repos.resolver.clone(), Builder::default())).unwrap();

  let executor = ParallelExecutor::new(2);
  let mut results: Vec<BuildResult> = Vec::new();
  let report = plan.build(&executor, &mut results, Duration::from_secs(30)).await;

  assert!(report.is_success());
  assert_eq!(results.len(), 2);
  assert!(results.iter().all(|r| r.termination == Termination::Completed));
  assert_eq!(repos.resolver.installs(), 2);
}

#[tokio::test]
async fn missing_dependency_fails_only_its_unit() {
  let repos = TestRepos::new();
  repos.publish_simple("com.acme:core:1.0.0", &[]);

  let root = Dependency::artifact(
    desc("com.acme:app:1.0.0"),
    vec![
      Dependency::artifact(desc("com.acme:core:1.0.0"), Vec::new()).unwrap(),
      Dependency::artifact(desc("com.acme:absent:1.0.0"), Vec::new()).unwrap(),
    ],
  )
  .unwrap();
  let plan = BuildPlan::for_root(&root, &dependency_units(repos.resolver.clone(), Builder::default())).unwrap();

  let mut results: Vec<BuildResult> = Vec::new();
  let report = plan.build(&ParallelExecutor::new(2), &mut results, Duration::from_secs(30)).await;

  assert!(!report.is_success());
  assert_eq!(report.summary.completed, 1);
  assert_eq!(report.summary.terminated, 1);
  let failed = results.iter().find(|r| !r.is_success()).unwrap();
  assert_eq!(failed.name, "com.acme:absent:1.0.0");
}
