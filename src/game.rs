//! Match description: players, races, game types and host directories.
//!
//! These are plain input values assembled by the caller before a match is
//! launched. Nothing here talks to the container runtime.

use crate::layout;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Image the game containers are started from unless a match overrides it
pub const DEFAULT_IMAGE: &str = "starcraft:game";

/// Player race, rendered with the single-letter code the entrypoint expects
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Race {
    #[serde(rename = "T", alias = "Terran", alias = "terran")]
    Terran,
    #[serde(rename = "P", alias = "Protoss", alias = "protoss")]
    Protoss,
    #[serde(rename = "Z", alias = "Zerg", alias = "zerg")]
    Zerg,
    #[serde(rename = "R", alias = "Random", alias = "random")]
    Random,
}

impl Race {
    pub fn as_str(&self) -> &'static str {
        match self {
            Race::Terran => "T",
            Race::Protoss => "P",
            Race::Zerg => "Z",
            Race::Random => "R",
        }
    }
}

impl fmt::Display for Race {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lobby game type
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GameType {
    TopVsBottom,
    Melee,
    #[default]
    FreeForAll,
    OneOnOne,
    UseMapSettings,
    CaptureTheFlag,
    Greed,
    Slaughter,
    SuddenDeath,
    TeamMelee,
    TeamFreeForAll,
    TeamCaptureTheFlag,
}

impl GameType {
    pub fn as_str(&self) -> &'static str {
        match self {
            GameType::TopVsBottom => "TOP_VS_BOTTOM",
            GameType::Melee => "MELEE",
            GameType::FreeForAll => "FREE_FOR_ALL",
            GameType::OneOnOne => "ONE_ON_ONE",
            GameType::UseMapSettings => "USE_MAP_SETTINGS",
            GameType::CaptureTheFlag => "CAPTURE_THE_FLAG",
            GameType::Greed => "GREED",
            GameType::Slaughter => "SLAUGHTER",
            GameType::SuddenDeath => "SUDDEN_DEATH",
            GameType::TeamMelee => "TEAM_MELEE",
            GameType::TeamFreeForAll => "TEAM_FREE_FOR_ALL",
            GameType::TeamCaptureTheFlag => "TEAM_CAPTURE_THE_FLAG",
        }
    }
}

impl fmt::Display for GameType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Host directories mounted into every container of a match
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct HostDirs {
    pub logs: PathBuf,
    pub bots: PathBuf,
    pub maps: PathBuf,
    pub bwta_cache: PathBuf,
    pub bwta2_cache: PathBuf,
}

/// Everything shared by the participants of one match.
///
/// Assembled once by the caller and treated as immutable while the match is
/// being launched.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct MatchContext {
    pub game_name: String,
    pub map_name: String,
    #[serde(default)]
    pub game_type: GameType,
    #[serde(default)]
    pub game_speed: i32,
    #[serde(default = "default_headless")]
    pub headless: bool,
    #[serde(default = "default_vnc_base_port")]
    pub vnc_base_port: u16,
    pub host_dirs: HostDirs,
    #[serde(default = "default_image")]
    pub image: String,
    /// Extra options handed to the runtime verbatim, before the image
    #[serde(default)]
    pub runtime_opts: Vec<String>,
}

fn default_headless() -> bool {
    true
}

fn default_vnc_base_port() -> u16 {
    layout::DEFAULT_VNC_BASE_PORT
}

fn default_image() -> String {
    DEFAULT_IMAGE.to_string()
}

impl MatchContext {
    /// Create a headless match with default game settings
    pub fn new(
        game_name: impl Into<String>,
        map_name: impl Into<String>,
        host_dirs: HostDirs,
    ) -> Self {
        Self {
            game_name: game_name.into(),
            map_name: map_name.into(),
            game_type: GameType::default(),
            game_speed: 0,
            headless: default_headless(),
            vnc_base_port: default_vnc_base_port(),
            host_dirs,
            image: default_image(),
            runtime_opts: Vec::new(),
        }
    }

    pub fn with_headless(mut self, headless: bool) -> Self {
        self.headless = headless;
        self
    }

    pub fn with_vnc_base_port(mut self, port: u16) -> Self {
        self.vnc_base_port = port;
        self
    }

    pub fn with_game_type(mut self, game_type: GameType) -> Self {
        self.game_type = game_type;
        self
    }

    pub fn with_game_speed(mut self, speed: i32) -> Self {
        self.game_speed = speed;
        self
    }

    pub fn with_image(mut self, image: impl Into<String>) -> Self {
        self.image = image.into();
        self
    }

    pub fn with_runtime_opt(mut self, opt: impl Into<String>) -> Self {
        self.runtime_opts.push(opt.into());
        self
    }

    /// Map path as seen from inside the containers
    pub fn guest_map_path(&self) -> String {
        layout::guest_map_path(&self.map_name)
    }

    /// Prefix shared by the names of every container in this match
    pub fn container_prefix(&self) -> String {
        format!("{}_", self.game_name)
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct HumanPlayer {
    pub name: String,
    pub race: Race,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct BotPlayer {
    pub name: String,
    pub race: Race,
    /// Host root under which per-match scratch directories are created
    pub base_dir: PathBuf,
    /// Bot module the in-container launcher loads
    pub bot_basefilename: String,
}

/// A player taking part in a match
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Participant {
    Human(HumanPlayer),
    Bot(BotPlayer),
}

impl Participant {
    pub fn human(name: impl Into<String>, race: Race) -> Self {
        Participant::Human(HumanPlayer {
            name: name.into(),
            race,
        })
    }

    pub fn bot(
        name: impl Into<String>,
        race: Race,
        base_dir: impl Into<PathBuf>,
        bot_basefilename: impl Into<String>,
    ) -> Self {
        Participant::Bot(BotPlayer {
            name: name.into(),
            race,
            base_dir: base_dir.into(),
            bot_basefilename: bot_basefilename.into(),
        })
    }

    pub fn name(&self) -> &str {
        match self {
            Participant::Human(player) => &player.name,
            Participant::Bot(player) => &player.name,
        }
    }

    pub fn race(&self) -> Race {
        match self {
            Participant::Human(player) => player.race,
            Participant::Bot(player) => player.race,
        }
    }

    pub fn is_bot(&self) -> bool {
        matches!(self, Participant::Bot(_))
    }

    /// Name with whitespace replaced, usable inside a container name
    pub fn sanitized_name(&self) -> String {
        self.name()
            .chars()
            .map(|c| if c.is_whitespace() { '_' } else { c })
            .collect()
    }
}

impl fmt::Display for Participant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = if self.is_bot() { "bot" } else { "human" };
        write!(f, "{} {} ({})", kind, self.name(), self.race())
    }
}

/// Role of a participant in the LAN session
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LanRole {
    /// Creates and advertises the session; always the first participant
    Host,
    Join,
}

impl LanRole {
    pub fn for_index(nth_player: usize) -> Self {
        if nth_player == 0 {
            LanRole::Host
        } else {
            LanRole::Join
        }
    }
}
