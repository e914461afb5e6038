use std::sync::Arc;

use kiln_lib::dependency::Dependency;
use kiln_lib::resolve::ResolveError;

use super::common::{TestRepos, desc, dependency_xml};

#[tokio::test]
async fn repeated_resolution_is_cached() {
  let repos = TestRepos::new();
  repos.publish_simple("com.acme:core:1.0.0", &[]);

  let first = repos.resolver.resolve(&desc("com.acme:core:1.0.0")).await.unwrap();
  let second = repos.resolver.resolve(&desc("com.acme:core:1.0.0")).await.unwrap();

  assert!(Arc::ptr_eq(&first, &second));
  assert_eq!(repos.resolver.installs(), 1);
  assert_eq!(first.repository(), "mirror");
  assert!(repos.local().join("com/acme/core/1.0.0/core-1.0.0.jar").exists());
}

#[tokio::test]
async fn concurrent_resolution_installs_once() {
  let repos = TestRepos::new();
  repos.publish_simple("com.acme:core:1.0.0", &[]);

  let mut tasks = Vec::new();
  for _ in 0..8 {
    let resolver = repos.resolver.clone();
    tasks.push(tokio::spawn(async move {
      resolver.resolve(&desc("com.acme:core:1.0.0")).await
    }));
  }
  let mut resolved = Vec::new();
  for task in tasks {
    resolved.push(task.await.unwrap().unwrap());
  }

  assert_eq!(repos.resolver.installs(), 1);
  assert!(resolved.iter().all(|r| Arc::ptr_eq(r, &resolved[0])));
}

#[tokio::test]
async fn installed_artifacts_are_not_fetched_again() {
  let repos = TestRepos::new();
  repos.publish_simple("com.acme:core:1.0.0", &[]);
  repos.resolver.resolve(&desc("com.acme:core:1.0.0")).await.unwrap();

  let fresh = kiln_lib::resolve::ArtifactResolver::new(
    kiln_lib::repository::LocalRepository::new(repos.local()),
    kiln_lib::download::Downloader::new(1),
  );
  let resolved = fresh.resolve(&desc("com.acme:core:1.0.0")).await.unwrap();

  assert_eq!(resolved.repository(), "local");
  assert_eq!(fresh.installs(), 0);
}

#[tokio::test]
async fn missing_artifact_names_searched_repositories() {
  let repos = TestRepos::new();

  let err = repos.resolver.resolve(&desc("com.acme:absent:1.0.0")).await.unwrap_err();
  match err {
    ResolveError::ArtifactNotFound { searched, .. } => {
      assert_eq!(searched, vec!["local".to_string(), "mirror".to_string()]);
    }
    other => panic!("unexpected error: {other}"),
  }
}

#[tokio::test]
async fn failed_download_fails_only_its_resolution() {
  let repos = TestRepos::new();
  repos.publish_simple("com.acme:core:1.0.0", &[]);
  repos.publish_simple("com.acme:broken:1.0.0", &[]);
  repos.break_jar("com.acme:broken:1.0.0");

  let broken_desc = desc("com.acme:broken:1.0.0");
  let core_desc = desc("com.acme:core:1.0.0");
  let (broken, core) = tokio::join!(
    repos.resolver.resolve(&broken_desc),
    repos.resolver.resolve(&core_desc),
  );

  match broken {
    Err(ResolveError::Download { artifact, .. }) => assert_eq!(artifact, desc("com.acme:broken:1.0.0")),
    other => panic!("expected a download failure, got {:?}", other.map(|r| r.artifact().clone())),
  }
  assert_eq!(core.unwrap().repository(), "mirror");
  assert!(repos.local().join("com/acme/core/1.0.0/core-1.0.0.jar").exists());
  assert_eq!(repos.resolver.installs(), 1);
}

#[tokio::test]
async fn failed_install_is_not_resolved_later() {
  let repos = TestRepos::new();
  repos.publish_simple("com.acme:broken:1.0.0", &[]);
  repos.break_jar("com.acme:broken:1.0.0");
  let broken = desc("com.acme:broken:1.0.0");

  assert!(matches!(repos.resolver.resolve(&broken).await, Err(ResolveError::Download { .. })));
  assert!(!repos.local().join("com/acme/broken/1.0.0/broken-1.0.0.pom").exists());

  assert!(matches!(repos.resolver.resolve(&broken).await, Err(ResolveError::Download { .. })));
  let offline = kiln_lib::resolve::ArtifactResolver::new(
    kiln_lib::repository::LocalRepository::new(repos.local()),
    kiln_lib::download::Downloader::new(1),
  );
  assert!(matches!(offline.resolve(&broken).await, Err(ResolveError::ArtifactNotFound { .. })));
  assert_eq!(repos.resolver.installs(), 0);
}

#[tokio::test]
async fn managed_versions_come_from_parent() {
  let repos = TestRepos::new();
  repos.publish(
    "com.acme:parent:1.0.0",
    &format!(
      "<dependencyManagement><dependencies>{}</dependencies></dependencyManagement>",
      dependency_xml(&desc("com.acme:core:1.2.3"))
    ),
  );
  repos.publish_simple("com.acme:core:1.2.3", &[]);
  repos.publish(
    "com.acme:app:1.0.0",
    &format!(
      "<parent><groupId>com.acme</groupId><artifactId>parent</artifactId><version>1.0.0</version></parent><dependencies>{}</dependencies>",
      dependency_xml(&desc("com.acme:core"))
    ),
  );

  let app = repos.resolver.resolve(&desc("com.acme:app:1.0.0")).await.unwrap();

  assert_eq!(app.transitive_dependencies(), vec![desc("com.acme:core:1.2.3")]);
  assert_eq!(app.parent().unwrap().artifact(), &desc("com.acme:parent:1.0.0"));
}

#[tokio::test]
async fn properties_expand_in_dependency_versions() {
  let repos = TestRepos::new();
  repos.publish_simple("com.acme:core:2.0.0", &[]);
  repos.publish(
    "com.acme:app:1.0.0",
    "<properties><core.version>2.0.0</core.version></properties><dependencies><dependency><groupId>${project.groupId}</groupId><artifactId>core</artifactId><version>${core.version}</version></dependency></dependencies>",
  );

  let app = repos.resolver.resolve(&desc("com.acme:app:1.0.0")).await.unwrap();

  assert_eq!(app.transitive_dependencies(), vec![desc("com.acme:core:2.0.0")]);
}

#[tokio::test]
async fn transitive_resolution_visits_shared_artifacts_once() {
  let repos = TestRepos::new();
  repos.publish_simple("com.acme:core:1.0.0", &[]);
  repos.publish_simple("com.acme:left:1.0.0", &["com.acme:core:1.0.0"]);
  repos.publish_simple("com.acme:right:1.0.0", &["com.acme:core:1.0.0"]);
  repos.publish_simple("com.acme:app:1.0.0", &["com.acme:left:1.0.0", "com.acme:right:1.0.0"]);

  let root = Dependency::artifact(desc("com.acme:app:1.0.0"), Vec::new()).unwrap();
  let resolved = repos.resolver.resolve_transitive(&root).await.unwrap();

  let names: Vec<String> = resolved.iter().map(|r| r.artifact().to_string()).collect();
  assert_eq!(names.len(), 4);
  assert!(names.contains(&"com.acme:core:1.0.0".to_string()));
  assert_eq!(repos.resolver.installs(), 4);
}

#[tokio::test]
async fn exclusions_reach_manifest_dependencies() {
  let repos = TestRepos::new();
  repos.publish_simple("com.acme:util:1.0.0", &[]);
  repos.publish_simple("com.acme:core:1.0.0", &["com.acme:util:1.0.0"]);
  repos.publish_simple("com.acme:app:1.0.0", &["com.acme:core:1.0.0", "com.acme:util:1.0.0"]);

  let root = Dependency::artifact(desc("com.acme:app:1.0.0"), Vec::new())
    .unwrap()
    .excluding_artifact(desc("com.acme:util"));
  let resolved = repos.resolver.resolve_transitive(&root).await.unwrap();

  let names: Vec<String> = resolved.iter().map(|r| r.artifact().to_string()).collect();
  assert_eq!(names, vec!["com.acme:app:1.0.0", "com.acme:core:1.0.0"]);
  assert_eq!(repos.resolver.installs(), 2);
  assert!(!repos.local().join("com/acme/util").exists());
}
