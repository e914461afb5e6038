//! Implementation of the `kiln plan` command.
//!
//! Resolves an artifact's dependency tree and prints the leaf groups it would
//! be built in, first group first.

use anyhow::{Context, Result};

use kiln_lib::dependency::Dependency;
use kiln_lib::plan::leaf_groups;

use super::{Repositories, parse_descriptor, runtime};
use crate::output::{OutputFormat, print_info, print_json, symbols};

pub fn cmd_plan(descriptor: &str, repositories: &Repositories, output: OutputFormat) -> Result<()> {
  let artifact = parse_descriptor(descriptor)?;
  let resolver = repositories.resolver()?;

  let tree = runtime()?
    .block_on(resolver.dependency_tree(&artifact))
    .with_context(|| format!("Failed to resolve {}", artifact))?;
  let groups = leaf_groups(&tree).context("Failed to plan")?;

  if output.is_json() {
    let groups: Vec<Vec<String>> = groups
      .iter()
      .map(|group| group.iter().map(Dependency::name).collect())
      .collect();
    print_json(&serde_json::json!({ "root": artifact.to_string(), "groups": groups }))?;
    return Ok(());
  }

  if groups.is_empty() {
    print_info(&format!("{} has no dependencies", artifact));
    return Ok(());
  }

  for (index, group) in groups.iter().enumerate() {
    println!("Group {}:", index + 1);
    for dep in group {
      println!("  {} {}", symbols::INFO, dep.name());
    }
  }
  println!("Then: {}", artifact);
  Ok(())
}
