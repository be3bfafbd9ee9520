//! depshift - Dependency update orchestration library
//!
//! This library drives dependency updates through configured package manager
//! commands:
//! - Resolving declared and installed package versions per rule
//! - Selecting targets within a version scope and grouping them into units
//! - Running update and lock commands with per-unit snapshots
//! - Validating with system tests and restoring on failure
//! - Aggregating results into a verdict and exit code

pub mod aggregate;
pub mod cli;
pub mod command;
pub mod config;
pub mod confirm;
pub mod domain;
pub mod error;
pub mod executor;
pub mod logging;
pub mod orchestrator;
pub mod output;
pub mod preflight;
pub mod progress;
pub mod resolver;
pub mod rollback;
pub mod systemtest;
pub mod update;
