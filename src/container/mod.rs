//! Container orchestration for Brood War matches.
//!
//! This module turns launch specifications into container runtime
//! invocations. It checks the host runtime, starts one container per
//! participant on a shared private network, and queries running match
//! containers afterwards.
//!
//! ## Architecture
//!
//! - [`client`]: the [`RuntimeClient`] seam and its CLI implementation
//! - [`environment`]: host pre-flight checks and isolated network setup
//! - [`config`]: the immutable per-participant [`LaunchSpec`]
//! - [`launcher`]: serializes a spec into a `run` invocation
//! - [`query`]: lists and stops the containers of a match
//! - [`orchestrator`]: launches a whole match, host first
//!
//! ## Usage
//!
//! ```rust,no_run
//! use scbw::container::{DockerCli, MatchOrchestrator, OrchestratorConfig};
//! use scbw::game::{HostDirs, MatchContext, Participant, Race};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let dirs = HostDirs {
//!         logs: "/srv/sc/logs".into(),
//!         bots: "/srv/sc/bots".into(),
//!         maps: "/srv/sc/maps".into(),
//!         bwta_cache: "/srv/sc/bwta".into(),
//!         bwta2_cache: "/srv/sc/bwta2".into(),
//!     };
//!     let ctx = MatchContext::new("g1", "(2)BottleneckSc.scx", dirs);
//!     let players = vec![
//!         Participant::bot("A", Race::Terran, "/srv/sc/bots/A", "A.dll"),
//!         Participant::bot("B", Race::Zerg, "/srv/sc/bots/B", "B.dll"),
//!     ];
//!
//!     let orchestrator = MatchOrchestrator::new(DockerCli::new(), OrchestratorConfig::default());
//!     orchestrator.prepare_host().await?;
//!     let handles = orchestrator.launch_match(&ctx, &players).await?;
//!     println!("launched {} containers", handles.len());
//!     Ok(())
//! }
//! ```

mod client;
mod config;
mod environment;
mod launcher;
mod orchestrator;
mod query;

pub use client::{CommandOutput, DockerCli, RuntimeClient, render_command};
pub use config::{AccessMode, LaunchSpec, LaunchSpecBuilder, PortMapping, VolumeMount};
pub use environment::{DEFAULT_NETWORK, DEFAULT_SUBNET, HostEnvironment, HostRequirements};
pub use launcher::{ContainerHandle, ContainerLauncher};
pub use orchestrator::{MatchOrchestrator, OrchestratorConfig, Readiness};
pub use query::{ContainerId, MatchQuery};

use std::path::PathBuf;

/// Match orchestration errors.
#[derive(Debug, thiserror::Error)]
pub enum MatchError {
    /// Runtime missing, wrong version, inoperable, or network setup failed
    #[error("Environment check `{command}` failed: {reason} (output: {output:?})")]
    Environment {
        command: String,
        reason: String,
        output: String,
    },

    /// Bot scratch directory could not be created
    #[error("Could not create scratch directory {path:?} for {participant}: {source}")]
    Filesystem {
        participant: String,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Runtime refused or failed to start a participant container
    #[error("Could not launch {participant} in container {container}: {reason}")]
    Launch {
        participant: String,
        container: String,
        command: String,
        reason: String,
    },

    /// Listing or stopping containers failed
    #[error("Container query `{command}` failed: {reason}")]
    Query { command: String, reason: String },

    /// Match description cannot be launched as given
    #[error("Configuration error: {0}")]
    Config(String),

    /// Host container never passed the readiness gate
    #[error("Container {container} did not become ready: {reason}")]
    NotReady { container: String, reason: String },

    /// A participant failed after others were already started
    #[error("Match aborted with {launched:?} already running: {source}")]
    Aborted {
        launched: Vec<String>,
        #[source]
        source: Box<MatchError>,
    },
}

/// Result type for match operations.
pub type Result<T> = std::result::Result<T, MatchError>;

#[cfg(test)]
pub(crate) mod testing;
