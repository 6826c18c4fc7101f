//! Barnyard Arcade - real-time core of three farmyard mini-games
//!
//! Core modules:
//! - `sim`: Deterministic simulation (spawning, motion, hit resolution, session phases)
//! - `clock`: Frame and audio clock sources
//! - `audio`: Sound cues and the look-ahead beat scheduler
//! - `commentary`: End-of-session commentary with stale-response protection
//! - `highscores`: Per-game best score persistence
//! - `tuning`: Data-driven game balance
//! - `arcade`: Host loop that wires all of the above together

pub mod arcade;
pub mod audio;
pub mod autopilot;
pub mod clock;
pub mod commentary;
pub mod highscores;
pub mod settings;
pub mod sim;
pub mod tuning;

pub use arcade::Arcade;
pub use highscores::{HighScoreStore, JsonFileStore, MemoryStore};
pub use settings::Settings;
pub use tuning::Tuning;

use serde::{Deserialize, Serialize};

/// Game configuration constants
pub mod consts {
    /// Fixed simulation timestep (120 Hz)
    pub const SIM_DT: f32 = 1.0 / 120.0;
    /// Maximum substeps per frame to prevent spiral of death
    pub const MAX_SUBSTEPS: u32 = 8;
    /// Longest frame delta we are willing to simulate (seconds)
    pub const MAX_FRAME_DT: f64 = 0.1;
    /// Display frame rate the per-frame physics constants were tuned at
    pub const REFERENCE_FPS: f32 = 60.0;
}

/// The three mini-games in the arcade
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum GameKind {
    /// Whack the pigs popping out of the holes
    Whack,
    /// Drum along to the farm beat, then beat the boss
    Rhythm,
    /// Flap the calf through the fences
    Flight,
}

impl GameKind {
    pub const ALL: [GameKind; 3] = [GameKind::Whack, GameKind::Rhythm, GameKind::Flight];

    /// Stable key used for persistence
    pub fn as_str(&self) -> &'static str {
        match self {
            GameKind::Whack => "whack",
            GameKind::Rhythm => "rhythm",
            GameKind::Flight => "flight",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "whack" | "whac-a-mole" | "reaction" => Some(GameKind::Whack),
            "rhythm" | "drum" => Some(GameKind::Rhythm),
            "flight" | "flying" | "flappy" => Some(GameKind::Flight),
            _ => None,
        }
    }
}

impl std::fmt::Display for GameKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
