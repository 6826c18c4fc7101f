//! Events emitted by the simulation for the host to react to

use serde::{Deserialize, Serialize};

use super::entity::EntityId;
use crate::audio::SoundCue;

/// Current phase of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    /// Menu / waiting for start
    Idle,
    /// Normal simulation
    Playing,
    /// Time-boxed boss fight
    BonusPhase,
    /// Run ended
    GameOver,
}

/// Why a run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameOverReason {
    TimeUp,
    LivesExhausted,
    Crashed,
    BossDefeated,
    BossEscaped,
}

/// Quality of a successful hit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HitGrade {
    /// Regular pig
    Normal,
    /// Golden pig
    Bonus,
    /// Note inside the tight window
    Perfect,
    /// Note inside the loose window
    Good,
}

/// Cosmetics unlocked by reaching score milestones in the rhythm game
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Unlock {
    CoolCow,
    SpaceCow,
    GoldenDrum,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum GameEvent {
    PhaseChanged { from: Phase, to: Phase },
    Spawned { id: EntityId },
    Hit { id: EntityId, grade: HitGrade, points: u64 },
    Penalty { id: EntityId, points: u64 },
    Missed { id: EntityId },
    /// Playfield should shake briefly
    Shake,
    TierChanged { tier: u32, name: String },
    FeverStarted,
    FeverEnded,
    BossHit { health: u32 },
    Unlocked(Unlock),
    /// Calf cleared a fence
    Passed { id: EntityId },
    Smashed { id: EntityId, points: u64 },
    RushStarted,
    RushEnded,
    Flap,
    Sound(SoundCue),
    GameOver { reason: GameOverReason, score: u64 },
}
