//! Implementation of the `kiln fetch` command.
//!
//! Resolves the root artifact's dependency tree and fetches it leaf group by
//! leaf group, each group concurrently through the parallel executor.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};

use kiln_lib::build::{Builder, dependency_units};
use kiln_lib::execute::{BuildResult, ExecuteConfig, ParallelExecutor};
use kiln_lib::plan::BuildPlan;

use super::{Repositories, parse_descriptor, runtime};
use crate::output::{OutputFormat, format_duration, print_error, print_json, print_success, symbols};

pub fn cmd_fetch(
  descriptor: &str,
  repositories: &Repositories,
  jobs: Option<usize>,
  timeout: Duration,
  output: OutputFormat,
) -> Result<()> {
  let artifact = parse_descriptor(descriptor)?;
  let resolver = Arc::new(repositories.resolver()?);
  let rt = runtime()?;

  let tree = rt
    .block_on(resolver.dependency_tree(&artifact))
    .with_context(|| format!("Failed to resolve {}", artifact))?;

  let plan = BuildPlan::for_root(&tree, &dependency_units(resolver.clone(), Builder::default()))
    .context("Failed to plan")?;
  let executor = ParallelExecutor::new(jobs.unwrap_or_else(|| ExecuteConfig::default().parallelism));

  let mut results: Vec<BuildResult> = Vec::new();
  let report = rt.block_on(plan.build(&executor, &mut results, timeout));

  if output.is_json() {
    let items: Vec<_> = results
      .iter()
      .map(|r| {
        serde_json::json!({
          "name": r.name,
          "termination": r.termination.to_string(),
          "duration_ms": r.duration().as_millis() as u64,
          "cause": r.cause.as_ref().map(ToString::to_string),
        })
      })
      .collect();
    print_json(&serde_json::json!({ "root": artifact.to_string(), "results": items, "installed": resolver.installs() }))?;
  } else {
    for r in &results {
      let symbol = if r.is_success() { symbols::SUCCESS } else { symbols::ERROR };
      println!("  {} {} ({})", symbol, r.name, format_duration(r.duration()));
      if let Some(cause) = &r.cause {
        println!("      {}", cause);
      }
    }
  }

  if !report.is_success() {
    let failed = report.summary.total() - report.summary.completed;
    print_error(&format!("{} of {} dependencies failed", failed, report.summary.total()));
    bail!("fetch of {} incomplete", artifact);
  }

  if !output.is_json() {
    print_success(&format!(
      "Fetched {} ({} dependencies, {} installed)",
      artifact,
      report.summary.completed,
      resolver.installs()
    ));
  }
  Ok(())
}
