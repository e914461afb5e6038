//! Crate-wide constants.

/// Application name, used for platform directories.
pub const APP_NAME: &str = "kiln";

/// Environment variable overriding the local repository location.
pub const REPOSITORY_ENV: &str = "KILN_REPOSITORY";

/// Name reported by the local repository.
pub const LOCAL_REPOSITORY_NAME: &str = "local";

/// Default remote repository.
pub const MAVEN_CENTRAL_NAME: &str = "central";
pub const MAVEN_CENTRAL_URL: &str = "https://repo.maven.apache.org/maven2";

/// Manifest extension within the repository layout.
pub const MANIFEST_EXTENSION: &str = "pom";

/// Every file extension an artifact may carry in a repository, manifest last.
pub const ARTIFACT_EXTENSIONS: [&str; 6] = ["jar", "jar.md5", "jar.sha1", "pom.md5", "pom.sha1", "pom"];

/// Default number of concurrent resource copies.
pub const DEFAULT_DOWNLOAD_WORKERS: usize = 8;

/// Default wait applied to each batch member, in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 300;

/// Upper bound on nested `${...}` expansion.
pub const MAX_PROPERTY_DEPTH: usize = 16;
