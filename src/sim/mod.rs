//! Deterministic simulation module
//!
//! All gameplay logic lives here. This module must be pure and deterministic:
//! - Time only arrives as arguments (frame delta, sampled audio time)
//! - Seeded RNG only
//! - Stable iteration order (by entity ID)
//! - No rendering, audio output or platform dependencies

pub mod collision;
pub mod entity;
pub mod events;
pub mod flight;
pub mod rhythm;
pub mod score;
pub mod session;
pub mod snapshot;
pub mod timers;
pub mod whack;

pub use collision::{Aabb, Contact, obstacle_contact, obstacle_rects};
pub use entity::{Entity, EntityId, EntityRegistry, Lifecycle, Resolution};
pub use events::{GameEvent, GameOverReason, HitGrade, Phase, Unlock};
pub use flight::{Calf, Fence, FlightGame};
pub use rhythm::{Boss, Note, RhythmGame, UNLOCKS, classify};
pub use score::{FeverChange, ScoreBook};
pub use session::{Action, Session, Variant};
pub use snapshot::{
    ActorView, BossView, EntityKind, EntityView, LatestFrame, Placement, RenderSink, Snapshot,
};
pub use timers::{TimerId, TimerQueue};
pub use whack::{Pig, PigKind, WhackGame};
