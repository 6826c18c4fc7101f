//! Read-only view of a session for whatever draws it

use serde::{Deserialize, Serialize};

use super::entity::{EntityId, Lifecycle};
use super::events::{GameOverReason, Phase, Unlock};
use super::whack::PigKind;
use crate::GameKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntityKind {
    Pig(PigKind),
    Note,
    Fence { smashed: bool },
}

/// Where an entity is drawn
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Placement {
    /// Whack hole index
    Hole(usize),
    /// Rhythm lane; progress 0 at the top, 1 on the hit line
    Lane { lane: u8, progress: f64, anchor: f64 },
    /// Flight fence: left edge and opening
    Column { x: f32, gap_top: f32, gap: f32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EntityView {
    pub id: EntityId,
    pub state: Lifecycle,
    pub kind: EntityKind,
    pub placement: Placement,
}

/// The flying calf
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ActorView {
    pub x: f32,
    pub y: f32,
    pub size: f32,
    pub vel: f32,
    /// Degrees, positive is nose down
    pub tilt: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BossView {
    pub health: u32,
    pub max_health: u32,
    pub time_left: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub game: GameKind,
    pub phase: Phase,
    pub score: u64,
    pub combo: u32,
    pub best_combo: u32,
    /// Rhythm only
    pub lives: Option<u32>,
    /// Whack only
    pub time_left: Option<f32>,
    pub fever: bool,
    /// Whack difficulty tier (1-based) and its banner name
    pub tier: Option<(u32, String)>,
    pub boss: Option<BossView>,
    pub rush: bool,
    pub actor: Option<ActorView>,
    /// In id order
    pub entities: Vec<EntityView>,
    pub unlocked: Vec<Unlock>,
    pub game_over: Option<GameOverReason>,
    /// Audio time the snapshot was taken at
    pub audio_time: f64,
    pub high_score: u64,
    pub commentary: Option<String>,
    pub commentary_loading: bool,
}

impl Snapshot {
    pub fn is_over(&self) -> bool {
        self.phase == Phase::GameOver
    }
}

/// Anything that can show a snapshot
pub trait RenderSink {
    fn present(&mut self, snapshot: &Snapshot);
}

/// Keeps the most recent snapshot
#[derive(Debug, Default, Clone)]
pub struct LatestFrame {
    pub last: Option<Snapshot>,
    pub frames: u64,
}

impl RenderSink for LatestFrame {
    fn present(&mut self, snapshot: &Snapshot) {
        self.last = Some(snapshot.clone());
        self.frames += 1;
    }
}
