//! Launch planning: from a match description to per-participant launch specs.
//!
//! The argument vector produced here is the contract with the in-container
//! entrypoint, which parses positional arguments and trailing flags in exactly
//! this order. Host/joiner flags are only emitted for headless (LAN) matches;
//! headful matches are interactive and configure the lobby by hand.

use crate::container::{AccessMode, DEFAULT_NETWORK, LaunchSpec, MatchError, Result, VolumeMount};
use crate::game::{LanRole, MatchContext, Participant};
use crate::layout::{self, bwapi_data, entrypoint};
use std::fs;
use std::path::Path;
use tracing::{debug, info};

/// Builds launch specifications for the participants of a match.
#[derive(Debug, Clone)]
pub struct LaunchPlanner {
    network: String,
}

impl Default for LaunchPlanner {
    fn default() -> Self {
        Self::new(DEFAULT_NETWORK)
    }
}

impl LaunchPlanner {
    /// Planner attaching every container to `network`
    pub fn new(network: impl Into<String>) -> Self {
        Self {
            network: network.into(),
        }
    }

    pub fn network(&self) -> &str {
        &self.network
    }

    /// Container name, unique within a match thanks to the player index
    pub fn container_name(
        ctx: &MatchContext,
        nth_player: usize,
        participant: &Participant,
    ) -> String {
        format!(
            "{}_{}_{}",
            ctx.game_name,
            nth_player,
            participant.sanitized_name()
        )
    }

    /// Build the launch spec without touching the filesystem.
    ///
    /// A bot's scratch directory is recorded in the spec but not created, so
    /// drafting the same participant twice yields identical specs.
    ///
    /// # Errors
    ///
    /// Returns [`MatchError::Config`] if `nth_player` is out of range or the
    /// VNC port would overflow.
    pub fn draft(
        &self,
        participant: &Participant,
        nth_player: usize,
        num_players: usize,
        ctx: &MatchContext,
    ) -> Result<LaunchSpec> {
        if nth_player >= num_players {
            return Err(MatchError::Config(format!(
                "player index {} out of range for {} players",
                nth_player, num_players
            )));
        }

        let container_name = Self::container_name(ctx, nth_player, participant);
        let dirs = &ctx.host_dirs;

        let mut builder = LaunchSpec::builder()
            .participant(participant.name())
            .container_name(container_name.as_str())
            .volume(VolumeMount::new(&dirs.logs, layout::LOG_DIR, AccessMode::Rw))
            .volume(VolumeMount::new(&dirs.bots, layout::BOT_DIR, AccessMode::Ro))
            .volume(VolumeMount::new(&dirs.maps, layout::MAP_DIR, AccessMode::Rw))
            .volume(VolumeMount::new(
                &dirs.bwta_cache,
                bwapi_data::BWTA,
                AccessMode::Rw,
            ))
            .volume(VolumeMount::new(
                &dirs.bwta2_cache,
                bwapi_data::BWTA2,
                AccessMode::Rw,
            ));

        if let Participant::Bot(bot) = participant {
            let write_dir = layout::bot_write_dir(&bot.base_dir, &ctx.game_name, nth_player);
            builder = builder
                .volume(VolumeMount::new(&write_dir, bwapi_data::WRITE, AccessMode::Rw))
                .scratch_dir(write_dir);
        }

        builder = builder.network(self.network.as_str());

        if !ctx.headless {
            let host_port = u16::try_from(nth_player)
                .ok()
                .and_then(|offset| ctx.vnc_base_port.checked_add(offset))
                .ok_or_else(|| {
                    MatchError::Config(format!(
                        "VNC port {} + {} exceeds the port range",
                        ctx.vnc_base_port, nth_player
                    ))
                })?;
            builder = builder.port_mapping(host_port, layout::GUEST_VNC_PORT);
        }

        let spec = builder
            .image(ctx.image.as_str())
            .runtime_opts(ctx.runtime_opts.iter().cloned())
            .entrypoint(entrypoint_command(participant, nth_player, num_players, ctx))
            .entrypoint_extra_args(entrypoint_extra_args(participant, nth_player, ctx))
            .build()?;

        debug!("Drafted launch spec for {}: {:?}", participant, spec);
        Ok(spec)
    }

    /// Build the launch spec and create the bot scratch directory on the host.
    ///
    /// # Errors
    ///
    /// Returns [`MatchError::Filesystem`] if the scratch directory cannot be
    /// created, including when it already exists from an earlier match.
    pub fn plan(
        &self,
        participant: &Participant,
        nth_player: usize,
        num_players: usize,
        ctx: &MatchContext,
    ) -> Result<LaunchSpec> {
        let spec = self.draft(participant, nth_player, num_players, ctx)?;

        if let Some(dir) = spec.scratch_dir() {
            create_scratch_dir(participant.name(), dir)?;
        }

        Ok(spec)
    }

    /// Draft every participant in launch order
    pub fn draft_match(
        &self,
        participants: &[Participant],
        ctx: &MatchContext,
    ) -> Result<Vec<LaunchSpec>> {
        let num_players = participants.len();
        participants
            .iter()
            .enumerate()
            .map(|(nth, participant)| self.draft(participant, nth, num_players, ctx))
            .collect()
    }
}

/// Entrypoint script and positional arguments
fn entrypoint_command(
    participant: &Participant,
    nth_player: usize,
    num_players: usize,
    ctx: &MatchContext,
) -> Vec<String> {
    let script = match participant {
        Participant::Bot(_) => entrypoint::PLAY_BOT,
        Participant::Human(_) => entrypoint::PLAY_HUMAN,
    };

    let mut command = vec![
        script.to_string(),
        participant.name().to_string(),
        participant.race().to_string(),
        nth_player.to_string(),
        num_players.to_string(),
        ctx.game_name.clone(),
        ctx.guest_map_path(),
        ctx.game_type.to_string(),
        ctx.game_speed.to_string(),
    ];

    if let Participant::Bot(bot) = participant {
        command.push(bot.name.clone());
        command.push(bot.bot_basefilename.clone());
    }

    command
}

/// Trailing flags selecting headful mode or the LAN role
fn entrypoint_extra_args(
    participant: &Participant,
    nth_player: usize,
    ctx: &MatchContext,
) -> Vec<String> {
    if !ctx.headless {
        return vec!["--headful".to_string()];
    }

    let mut args = vec![
        "--game".to_string(),
        ctx.game_name.clone(),
        "--name".to_string(),
        participant.name().to_string(),
        "--race".to_string(),
        participant.race().to_string(),
        "--lan".to_string(),
    ];

    match LanRole::for_index(nth_player) {
        LanRole::Host => {
            args.push("--host".to_string());
            args.push("--map".to_string());
            args.push(ctx.guest_map_path());
        }
        LanRole::Join => args.push("--join".to_string()),
    }

    args
}

/// Create a fresh, world-writable scratch directory.
///
/// Parents are created as needed; the directory itself must not exist yet.
pub fn create_scratch_dir(participant: &str, dir: &Path) -> Result<()> {
    let fs_error = |source| MatchError::Filesystem {
        participant: participant.to_string(),
        path: dir.to_path_buf(),
        source,
    };

    if let Some(parent) = dir.parent() {
        fs::create_dir_all(parent).map_err(fs_error)?;
    }
    fs::create_dir(dir).map_err(fs_error)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(dir, fs::Permissions::from_mode(0o777)).map_err(fs_error)?;
    }

    info!("Created scratch directory {:?} for {}", dir, participant);
    Ok(())
}
