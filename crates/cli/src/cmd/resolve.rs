//! Implementation of the `kiln resolve` command.
//!
//! Resolves an artifact with its transitive dependencies into the local
//! repository and lists where each one came from.

use anyhow::{Context, Result};

use kiln_lib::dependency::Dependency;

use super::{Repositories, parse_descriptor, runtime};
use crate::output::{OutputFormat, print_json, print_stat, print_success};

pub fn cmd_resolve(descriptor: &str, repositories: &Repositories, output: OutputFormat) -> Result<()> {
  let artifact = parse_descriptor(descriptor)?;
  let resolver = repositories.resolver()?;
  let root = Dependency::artifact(artifact.clone(), Vec::new())?;

  let resolved = runtime()?
    .block_on(resolver.resolve_transitive(&root))
    .with_context(|| format!("Failed to resolve {}", artifact))?;

  if output.is_json() {
    let items: Vec<_> = resolved
      .iter()
      .map(|r| serde_json::json!({ "artifact": r.artifact().to_string(), "repository": r.repository() }))
      .collect();
    print_json(&serde_json::json!({ "root": artifact.to_string(), "artifacts": items, "installed": resolver.installs() }))?;
    return Ok(());
  }

  print_success(&format!("Resolved {} ({} artifacts)", artifact, resolved.len()));
  for r in &resolved {
    print_stat(&r.artifact().to_string(), r.repository());
  }
  Ok(())
}
