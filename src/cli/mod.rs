//! CLI-specific functionality for the match launcher
//!
//! This module contains argument parsing, settings discovery and
//! match file loading.

pub mod args;
pub mod config;

pub use args::{Args, CommonOptions, ExecutionMode, PlanConfig, PlanFormat, QueryConfig, RunConfig};
pub use config::{
    ConfigDiscovery, LaunchSettings, MatchFile, ReadinessMode, RuntimeSettings, Settings,
};
