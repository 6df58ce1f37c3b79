//! Configuration discovery and loading
//!
//! Runtime settings are looked up in this order:
//! 1. Current directory: ./scbw.toml or ./.scbw/config.toml
//! 2. User config: ~/.scbw/config.toml
//! 3. System config: /etc/scbw/config.toml
//! 4. Built-in defaults
//!
//! Match files are separate TOML documents describing one match.

use crate::container::{DockerCli, HostRequirements, OrchestratorConfig, Readiness};
use crate::game::{MatchContext, Participant};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env as std_env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

/// Hidden settings directory name
pub const CONFIG_DIR_NAME: &str = ".scbw";

/// Settings file name inside [`CONFIG_DIR_NAME`]
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Settings file name in the current directory
pub const LOCAL_CONFIG_FILE_NAME: &str = "scbw.toml";

/// How the container runtime is invoked
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeSettings {
    /// Runtime CLI, `docker` or a compatible program
    pub program: String,
    /// Kill any single runtime invocation after this many seconds
    pub command_timeout_secs: Option<u64>,
}

impl Default for RuntimeSettings {
    fn default() -> Self {
        Self {
            program: "docker".to_string(),
            command_timeout_secs: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReadinessMode {
    None,
    Delay,
    ContainerRunning,
}

/// Launch sequencing settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LaunchSettings {
    pub readiness: ReadinessMode,
    /// Fixed wait used by the `delay` mode
    pub delay_ms: u64,
    /// Give up on the host container after this long (`container_running`)
    pub readiness_timeout_secs: u64,
    pub poll_interval_ms: u64,
    pub launch_timeout_secs: Option<u64>,
}

impl Default for LaunchSettings {
    fn default() -> Self {
        Self {
            readiness: ReadinessMode::ContainerRunning,
            delay_ms: 2000,
            readiness_timeout_secs: 30,
            poll_interval_ms: 500,
            launch_timeout_secs: None,
        }
    }
}

impl LaunchSettings {
    pub fn readiness(&self) -> Readiness {
        match self.readiness {
            ReadinessMode::None => Readiness::None,
            ReadinessMode::Delay => Readiness::Delay(Duration::from_millis(self.delay_ms)),
            ReadinessMode::ContainerRunning => Readiness::ContainerRunning {
                timeout: Duration::from_secs(self.readiness_timeout_secs),
                poll_interval: Duration::from_millis(self.poll_interval_ms),
            },
        }
    }
}

/// Host-wide settings, independent of any single match
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub runtime: RuntimeSettings,
    pub requirements: HostRequirements,
    pub launch: LaunchSettings,
}

impl Settings {
    /// Load from TOML file
    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading settings file {:?}", path))?;
        toml::from_str(&content).with_context(|| format!("parsing settings file {:?}", path))
    }

    /// Save to TOML file
    pub fn to_toml_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        fs::write(path.as_ref(), content)
            .with_context(|| format!("writing settings file {:?}", path.as_ref()))?;
        Ok(())
    }

    pub fn docker_cli(&self) -> DockerCli {
        let cli = DockerCli::with_program(self.runtime.program.as_str());
        match self.runtime.command_timeout_secs {
            Some(secs) => cli.with_timeout(Duration::from_secs(secs)),
            None => cli,
        }
    }

    pub fn orchestrator_config(&self) -> OrchestratorConfig {
        OrchestratorConfig {
            requirements: self.requirements.clone(),
            readiness: self.launch.readiness(),
            launch_timeout: self.launch.launch_timeout_secs.map(Duration::from_secs),
        }
    }
}

/// One match: shared context plus the ordered player list.
///
/// ```toml
/// [match]
/// game_name = "g1"
/// map_name = "(2)BottleneckSc.scx"
///
/// [match.host_dirs]
/// logs = "logs"
/// bots = "bots"
/// maps = "maps"
/// bwta_cache = "bwta"
/// bwta2_cache = "bwta2"
///
/// [[players]]
/// kind = "bot"
/// name = "A"
/// race = "T"
/// base_dir = "bots/A"
/// bot_basefilename = "A.dll"
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchFile {
    #[serde(rename = "match")]
    pub game: MatchContext,
    pub players: Vec<Participant>,
}

impl MatchFile {
    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Load a match file; relative host paths resolve against its directory
    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading match file {:?}", path))?;
        let mut file = Self::from_toml_str(&content)
            .with_context(|| format!("parsing match file {:?}", path))?;

        let base = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => std_env::current_dir()?,
        };
        file.resolve_paths(&base);
        Ok(file)
    }

    /// Make every relative host path absolute under `base`
    pub fn resolve_paths(&mut self, base: &Path) {
        let dirs = &mut self.game.host_dirs;
        for dir in [
            &mut dirs.logs,
            &mut dirs.bots,
            &mut dirs.maps,
            &mut dirs.bwta_cache,
            &mut dirs.bwta2_cache,
        ] {
            absolutize(dir, base);
        }

        for player in &mut self.players {
            if let Participant::Bot(bot) = player {
                absolutize(&mut bot.base_dir, base);
            }
        }
    }
}

fn absolutize(path: &mut PathBuf, base: &Path) {
    if path.is_relative() {
        *path = base.join(&*path);
    }
}

/// Configuration discovery system
pub struct ConfigDiscovery;

impl ConfigDiscovery {
    /// Discover and load settings using the hierarchy
    pub fn discover_settings() -> Result<Settings> {
        if let Some(config_path) = Self::find_config_file() {
            info!("Loading settings from: {:?}", config_path);
            return Settings::from_toml_file(config_path);
        }

        info!("No settings file found, using defaults");
        Ok(Settings::default())
    }

    /// Find settings file using discovery hierarchy
    pub fn find_config_file() -> Option<PathBuf> {
        for candidate in Self::get_config_candidates() {
            debug!("Checking for settings file: {:?}", candidate);
            if candidate.is_file() {
                return Some(candidate);
            }
        }

        debug!("No settings file found in discovery hierarchy");
        None
    }

    /// Settings file candidates in priority order
    fn get_config_candidates() -> Vec<PathBuf> {
        let mut candidates = Vec::new();

        if let Ok(current_dir) = std_env::current_dir() {
            candidates.push(current_dir.join(LOCAL_CONFIG_FILE_NAME));
            candidates.push(current_dir.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME));
        }

        if let Some(home_dir) = Self::get_home_dir() {
            candidates.push(home_dir.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME));
        }

        #[cfg(unix)]
        candidates.push(PathBuf::from("/etc/scbw/config.toml"));

        candidates
    }

    fn get_home_dir() -> Option<PathBuf> {
        std_env::var("HOME")
            .ok()
            .or_else(|| std_env::var("USERPROFILE").ok())
            .map(PathBuf::from)
    }

    /// Print the discovery hierarchy and which file is active
    pub fn show_discovery_info() {
        println!("Settings Discovery Hierarchy:");
        println!();

        for (i, candidate) in Self::get_config_candidates().iter().enumerate() {
            let status = if candidate.is_file() {
                "✓ EXISTS"
            } else if candidate.exists() {
                "✗ NOT A FILE"
            } else {
                "✗ NOT FOUND"
            };
            println!("  {}. {:?} - {}", i + 1, candidate, status);
        }

        println!();
        match Self::find_config_file() {
            Some(found) => println!("Active settings: {:?}", found),
            None => println!("Active settings: Built-in defaults"),
        }
    }
}
