//! Guest-side path constants and host path utilities for match containers.
//!
//! Every directory the in-container entrypoint expects lives under a single
//! base directory ([`APP_DIR`]). Host-side paths come from the match
//! description, except for bot scratch directories which are derived here.

use std::path::{Path, PathBuf};

/// Base directory of the game installation inside the container
pub const APP_DIR: &str = "/app";

/// Match logs written by the entrypoint
pub const LOG_DIR: &str = "/app/logs";

/// StarCraft installation root
pub const SC_DIR: &str = "/app/sc";

/// BWTA installation root
pub const BWTA_DIR: &str = "/app/bwta";

/// BWAPI installation root
pub const BWAPI_DIR: &str = "/app/bwapi";

/// Bot binaries, mounted read-only
pub const BOT_DIR: &str = "/app/bots";

/// Map directory inside the StarCraft installation
pub const MAP_DIR: &str = "/app/sc/maps";

/// BWAPI data directories shared between bots and the game.
pub mod bwapi_data {
    /// BWAPI data root
    pub const ROOT: &str = "/app/sc/bwapi-data";

    /// BWTA terrain analysis cache
    pub const BWTA: &str = "/app/sc/bwapi-data/BWTA";

    /// BWTA2 terrain analysis cache
    pub const BWTA2: &str = "/app/sc/bwapi-data/BWTA2";

    /// Bot save directory
    pub const SAVE: &str = "/app/sc/bwapi-data/save";

    /// Bot read directory
    pub const READ: &str = "/app/sc/bwapi-data/read";

    /// Bot write directory, backed by the per-match scratch directory
    pub const WRITE: &str = "/app/sc/bwapi-data/write";

    /// Bot module directory
    pub const AI: &str = "/app/sc/bwapi-data/AI";

    /// BWAPI logs
    pub const LOGS: &str = "/app/sc/bwapi-data/logs";
}

/// Entrypoint scripts shipped in the game image.
pub mod entrypoint {
    /// Launches a bot player
    pub const PLAY_BOT: &str = "/app/play_bot.sh";

    /// Launches a human player behind VNC
    pub const PLAY_HUMAN: &str = "/app/play_human.sh";
}

/// VNC port exposed by every headful container
pub const GUEST_VNC_PORT: u16 = 5900;

/// First host port handed out to headful containers
pub const DEFAULT_VNC_BASE_PORT: u16 = 5900;

/// Fully qualified path of a map inside the container
pub fn guest_map_path(map_name: &str) -> String {
    format!("{}/{}", MAP_DIR, map_name)
}

/// Host scratch directory for one bot in one match.
///
/// Distinct for every `(game_name, nth_player)` pair under the same base
/// directory, so concurrent matches never share bot write state.
pub fn bot_write_dir(base_dir: &Path, game_name: &str, nth_player: usize) -> PathBuf {
    base_dir.join(format!("write_{}_{}", game_name, nth_player))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guest_paths_share_app_root() {
        for path in [LOG_DIR, SC_DIR, BWTA_DIR, BWAPI_DIR, BOT_DIR, MAP_DIR] {
            assert!(path.starts_with(APP_DIR), "{} outside {}", path, APP_DIR);
        }

        for path in [
            bwapi_data::BWTA,
            bwapi_data::BWTA2,
            bwapi_data::SAVE,
            bwapi_data::READ,
            bwapi_data::WRITE,
            bwapi_data::AI,
            bwapi_data::LOGS,
        ] {
            assert!(path.starts_with(bwapi_data::ROOT));
        }
        assert!(bwapi_data::ROOT.starts_with(SC_DIR));
    }

    #[test]
    fn test_guest_map_path() {
        assert_eq!(
            guest_map_path("(2)BottleneckSc.scx"),
            "/app/sc/maps/(2)BottleneckSc.scx"
        );
    }

    #[test]
    fn test_bot_write_dir() {
        let base = Path::new("/home/user/bots/Alpha");

        assert_eq!(
            bot_write_dir(base, "g1", 0),
            Path::new("/home/user/bots/Alpha/write_g1_0")
        );
        assert_ne!(bot_write_dir(base, "g1", 0), bot_write_dir(base, "g1", 1));
        assert_ne!(bot_write_dir(base, "g1", 0), bot_write_dir(base, "g2", 0));
    }
}
