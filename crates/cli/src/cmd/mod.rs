mod fetch;
mod plan;
mod resolve;

use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing::debug;

use kiln_lib::config::ResolverConfig;
use kiln_lib::dependency::ArtifactDescriptor;
use kiln_lib::platform::paths::config_file;
use kiln_lib::resolve::ArtifactResolver;

pub use fetch::cmd_fetch;
pub use plan::cmd_plan;
pub use resolve::cmd_resolve;

/// Repository options shared by every command.
pub struct Repositories {
  pub config: Option<PathBuf>,
  pub local: Option<PathBuf>,
}

impl Repositories {
  /// Load the configuration and build a resolver from it.
  pub fn resolver(&self) -> Result<ArtifactResolver> {
    let mut config = match &self.config {
      Some(path) => {
        ResolverConfig::load(path).with_context(|| format!("Failed to load config: {}", path.display()))?
      }
      None => {
        let path = config_file();
        ResolverConfig::load_or_default(&path).with_context(|| format!("Failed to load config: {}", path.display()))?
      }
    };
    if let Some(local) = &self.local {
      config.local_repository = local.clone();
    }
    debug!(local = ?config.local_repository, remotes = config.remotes.len(), "resolver configured");
    Ok(ArtifactResolver::from_config(&config))
  }
}

pub fn parse_descriptor(descriptor: &str) -> Result<ArtifactDescriptor> {
  ArtifactDescriptor::parse(descriptor).with_context(|| format!("Invalid descriptor: {}", descriptor))
}

pub fn runtime() -> Result<tokio::runtime::Runtime> {
  tokio::runtime::Runtime::new().context("Failed to create async runtime")
}
