//! Demo player
//!
//! Looks at the same snapshot a renderer would and decides what to press.
//! Plays well but not perfectly: `skill` is the chance it reacts on any
//! given frame, so it occasionally lets a pig escape.

use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;

use crate::GameKind;
use crate::sim::{Action, EntityKind, Lifecycle, Phase, PigKind, Placement, Snapshot};

/// Fence width assumed when deciding whether a fence is already behind
const FENCE_WIDTH: f32 = 15.0;

#[derive(Debug, Clone)]
pub struct Autopilot {
    rng: Pcg32,
    /// Probability of reacting on a given frame (0..=1)
    pub skill: f64,
    /// How far (in units) below the gap centre the calf may sink before flapping
    pub flap_slack: f32,
}

impl Autopilot {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: Pcg32::seed_from_u64(seed),
            skill: 0.35,
            flap_slack: 8.0,
        }
    }

    pub fn with_skill(mut self, skill: f64) -> Self {
        self.skill = skill.clamp(0.0, 1.0);
        self
    }

    /// What to press this frame, if anything
    pub fn next_action(&mut self, snap: &Snapshot) -> Option<Action> {
        match snap.phase {
            Phase::Playing | Phase::BonusPhase => {}
            Phase::Idle | Phase::GameOver => return None,
        }
        match snap.game {
            GameKind::Whack => self.whack(snap),
            GameKind::Rhythm => self.drum(snap),
            GameKind::Flight => self.fly(snap),
        }
    }

    fn whack(&mut self, snap: &Snapshot) -> Option<Action> {
        if !self.rng.random_bool(self.skill) {
            return None;
        }
        snap.entities
            .iter()
            .filter(|e| e.state == Lifecycle::Active)
            .find_map(|e| match (e.kind, e.placement) {
                (EntityKind::Pig(kind), Placement::Hole(hole)) if kind != PigKind::Hazard => {
                    Some(Action::Whack(hole))
                }
                _ => None,
            })
    }

    fn drum(&mut self, snap: &Snapshot) -> Option<Action> {
        if snap.phase == Phase::BonusPhase {
            // Mash away at the boss
            return Some(Action::Tap(self.rng.random_range(0..3)));
        }
        // Tap once the note is on the line, give or take half a frame
        snap.entities
            .iter()
            .filter(|e| !e.state.is_resolved())
            .find_map(|e| match e.placement {
                Placement::Lane { lane, anchor, .. } if (anchor - snap.audio_time).abs() <= 0.01 => {
                    Some(Action::Tap(lane))
                }
                _ => None,
            })
    }

    fn fly(&mut self, snap: &Snapshot) -> Option<Action> {
        let actor = snap.actor?;
        let target = snap
            .entities
            .iter()
            .filter_map(|e| match e.placement {
                Placement::Column { x, gap_top, gap } if x + FENCE_WIDTH >= actor.x => {
                    Some((x, gap_top + gap / 2.0))
                }
                _ => None,
            })
            .min_by(|a, b| a.0.total_cmp(&b.0))
            .map_or(50.0, |(_, centre)| centre);

        let calf_centre = actor.y + actor.size / 2.0;
        (calf_centre > target + self.flap_slack && actor.vel >= 0.0).then_some(Action::Flap)
    }
}
