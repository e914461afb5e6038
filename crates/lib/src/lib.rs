//! kiln-lib: dependency resolution and parallel build scheduling
//!
//! This crate provides the core of the kiln build orchestrator:
//! - `Dependency`: the dependency model (artifacts, libraries, builds)
//! - `plan`: partitioning a dependency tree into leaf groups
//! - `execute`: running one group on a bounded pool, in completion order
//! - `resolve`: materializing artifacts and their manifests into a local repository
//! - `download`: single-flight concurrent resource copies

pub mod build;
pub mod config;
pub mod consts;
pub mod dependency;
pub mod download;
pub mod execute;
pub mod manifest;
pub mod platform;
pub mod plan;
pub mod repository;
pub mod resolve;
