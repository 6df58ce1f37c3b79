//! # scbw
//!
//! Launches StarCraft: Brood War bot matches, one container per
//! participant, on a private bridge network.
//!
//! ## Architecture Overview
//!
//! - **[`game`]**: match-wide context and participant descriptions
//! - **[`layout`]**: fixed paths and entrypoints inside the game image
//! - **[`planner`]**: derives a [`container::LaunchSpec`] per participant
//! - **[`container`]**: runtime checks, launching and querying containers
//! - **[`cli`]**: argument parsing, settings discovery and match files
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use scbw::container::{DockerCli, MatchOrchestrator, OrchestratorConfig};
//! use scbw::cli::MatchFile;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let file = MatchFile::from_toml_file("match.toml")?;
//!     let orchestrator = MatchOrchestrator::new(DockerCli::new(), OrchestratorConfig::default());
//!
//!     orchestrator.prepare_host().await?;
//!     for handle in orchestrator.launch_match(&file.game, &file.players).await? {
//!         println!("{} -> {}", handle.container_name, handle.container_id);
//!     }
//!     Ok(())
//! }
//! ```

/// Match context and participants.
pub mod game;

/// Guest filesystem layout of the game image.
///
/// Centralizes the in-container paths and entrypoint scripts every
/// launch specification refers to.
pub mod layout;

/// Launch planning.
pub mod planner;

/// Container runtime integration.
///
/// Host pre-flight checks, isolated network setup, container launch and
/// running-container queries behind the [`container::RuntimeClient`] seam.
pub mod container;

// CLI module for command-line interface
pub mod cli;

pub use container::{
    ContainerHandle, DockerCli, LaunchSpec, MatchError, MatchOrchestrator, OrchestratorConfig,
    RuntimeClient,
};
pub use game::{BotPlayer, GameType, HostDirs, HumanPlayer, MatchContext, Participant, Race};
pub use planner::LaunchPlanner;
