//! Whack game: pigs pop out of holes, the calf bonks them
//!
//! No continuous motion here. A pig is either up or not, and everything that
//! happens on its own (ducking back down, clearing a bonked pig) is a timer.

use std::collections::HashMap;

use rand::Rng;
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::entity::{EntityId, EntityRegistry, Lifecycle, Resolution};
use super::events::{GameEvent, GameOverReason, HitGrade};
use super::score::ScoreBook;
use super::session::Transition;
use super::timers::{TimerId, TimerQueue};
use crate::audio::SoundCue;
use crate::tuning::{KindWeights, WhackTuning};

/// What popped out of the hole
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PigKind {
    /// Regular pig
    Normal,
    /// Golden pig king: big reward, ducks quickly
    Bonus,
    /// Angry bull: hitting it costs points
    Hazard,
}

/// A pig occupying a hole
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pig {
    pub hole: usize,
    pub kind: PigKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WhackTimer {
    /// Pig ducks back down unless it was bonked first
    Expire(EntityId),
    /// Bonked pig leaves the hole
    Clear(EntityId),
}

#[derive(Debug)]
pub struct WhackGame {
    tuning: WhackTuning,
    pigs: EntityRegistry<Pig>,
    timers: TimerQueue<WhackTimer>,
    expiries: HashMap<EntityId, TimerId>,
    /// Seconds since the run started
    elapsed: f64,
    next_spawn_at: f64,
    tier: u32,
}

impl WhackGame {
    pub fn new(tuning: WhackTuning) -> Self {
        let mut game = Self {
            tuning,
            pigs: EntityRegistry::new(),
            timers: TimerQueue::new(),
            expiries: HashMap::new(),
            elapsed: 0.0,
            next_spawn_at: 0.0,
            tier: 1,
        };
        game.reset();
        game
    }

    pub fn reset(&mut self) {
        self.pigs.clear();
        self.timers.clear();
        self.expiries.clear();
        self.elapsed = 0.0;
        self.tier = self.tuning.tier_number(0);
        self.next_spawn_at = self.tuning.tier(0).tick_interval as f64;
    }

    /// Stop everything that would fire on its own
    /// Stop the board: pending timers are dropped and any pig still up is
    /// settled as expired, with no effect on the score.
    pub fn halt(&mut self) {
        self.timers.clear();
        self.expiries.clear();
        for pig in self.pigs.iter_mut() {
            pig.resolve(Resolution::Expired);
        }
    }

    pub fn tuning(&self) -> &WhackTuning {
        &self.tuning
    }

    pub fn pigs(&self) -> &EntityRegistry<Pig> {
        &self.pigs
    }

    pub fn elapsed(&self) -> f64 {
        self.elapsed
    }

    pub fn time_left(&self) -> f32 {
        (self.tuning.duration - self.elapsed as f32).max(0.0)
    }

    pub fn tier(&self) -> u32 {
        self.tier
    }

    /// Lifecycle of whatever is in a hole. An empty hole reads as hidden.
    pub fn hole_state(&self, hole: usize) -> Lifecycle {
        self.pig_in(hole)
            .map(|id| self.pigs.get(id).map_or(Lifecycle::Hidden, |p| p.state()))
            .unwrap_or(Lifecycle::Hidden)
    }

    fn pig_in(&self, hole: usize) -> Option<EntityId> {
        self.pigs.find(|p| p.body.hole == hole).map(|p| p.id)
    }

    fn free_holes(&self) -> Vec<usize> {
        (0..self.tuning.holes)
            .filter(|h| self.pig_in(*h).is_none())
            .collect()
    }

    pub(crate) fn step(
        &mut self,
        book: &mut ScoreBook,
        rng: &mut Pcg32,
        dt: f32,
        events: &mut Vec<GameEvent>,
    ) -> Option<Transition> {
        self.elapsed += dt as f64;

        for timer in self.timers.drain_due(self.elapsed) {
            match timer {
                WhackTimer::Expire(id) => self.expire(id, book, events),
                WhackTimer::Clear(id) => {
                    self.pigs.remove(id);
                }
            }
        }

        // Tier is recomputed from the score every tick, never patched
        let tier = self.tuning.tier_number(book.score);
        if tier != self.tier {
            let name = self.tuning.tier(book.score).name.clone();
            log::info!("Whack tier {} -> {} ({})", self.tier, tier, name);
            self.tier = tier;
            events.push(GameEvent::TierChanged { tier, name });
        }

        while self.elapsed >= self.next_spawn_at {
            let interval = self.tuning.tier(book.score).tick_interval.max(0.05) as f64;
            self.next_spawn_at += interval;
            self.try_spawn(book.score, rng, events);
        }

        if self.elapsed as f32 >= self.tuning.duration {
            return Some(Transition::End(GameOverReason::TimeUp));
        }
        None
    }

    fn try_spawn(&mut self, score: u64, rng: &mut Pcg32, events: &mut Vec<GameEvent>) {
        let tier = self.tuning.tier(score);
        if !rng.random_bool(tier.spawn_chance.clamp(0.0, 1.0)) {
            return;
        }
        let free = self.free_holes();
        if free.is_empty() {
            return;
        }
        let hole = free[rng.random_range(0..free.len())];
        let kind = pick_kind(&tier.weights, rng);
        self.pop(hole, kind, score, events);
    }

    /// Pop a pig out of a free hole. Stay time follows the tier for `score`.
    /// Returns `None` when the hole is taken.
    pub fn pop(
        &mut self,
        hole: usize,
        kind: PigKind,
        score: u64,
        events: &mut Vec<GameEvent>,
    ) -> Option<EntityId> {
        if hole >= self.tuning.holes || self.pig_in(hole).is_some() {
            return None;
        }
        let tier_stay = self.tuning.tier(score).stay;
        let stay = match kind {
            PigKind::Bonus => tier_stay * self.tuning.bonus_stay_factor,
            _ => tier_stay,
        };

        let deadline = self.elapsed + stay as f64;
        let id = self.pigs.spawn(deadline, Pig { hole, kind });
        if let Some(pig) = self.pigs.get_mut(id) {
            pig.activate();
        }
        let timer = self.timers.schedule(deadline, WhackTimer::Expire(id));
        self.expiries.insert(id, timer);
        events.push(GameEvent::Spawned { id });
        Some(id)
    }

    fn expire(&mut self, id: EntityId, book: &mut ScoreBook, events: &mut Vec<GameEvent>) {
        self.expiries.remove(&id);
        let Some(pig) = self.pigs.get_mut(id) else { return };
        if !pig.is_active() {
            return;
        }
        if pig.body.kind == PigKind::Hazard {
            // Leaving the bull alone is the right call
            pig.resolve(Resolution::Expired);
        } else {
            pig.resolve(Resolution::Missed);
            book.miss();
            events.push(GameEvent::Missed { id });
        }
        self.pigs.remove(id);
    }

    pub(crate) fn press(&mut self, hole: usize, book: &mut ScoreBook, events: &mut Vec<GameEvent>) {
        events.push(GameEvent::Sound(SoundCue::Moo));

        let Some(id) = self.pig_in(hole) else { return };
        let Some(pig) = self.pigs.get_mut(id) else { return };
        if !pig.is_active() {
            return;
        }
        pig.resolve(Resolution::Hit);
        let kind = pig.body.kind;

        match kind {
            PigKind::Hazard => {
                let points = book.penalty(self.tuning.hazard_penalty);
                events.push(GameEvent::Penalty { id, points });
                events.push(GameEvent::Shake);
                events.push(GameEvent::Sound(SoundCue::BombHit));
            }
            PigKind::Normal | PigKind::Bonus => {
                let (base, grade, cue) = if kind == PigKind::Bonus {
                    (self.tuning.bonus_reward, HitGrade::Bonus, SoundCue::GoldHit)
                } else {
                    (self.tuning.normal_reward, HitGrade::Normal, SoundCue::Squeal)
                };
                let tuning = &self.tuning;
                let points = book.hit(|combo| base + tuning.combo_bonus_for(combo));
                events.push(GameEvent::Hit { id, grade, points });
                events.push(GameEvent::Sound(cue));
            }
        }

        if let Some(timer) = self.expiries.remove(&id) {
            self.timers.cancel(timer);
        }
        self.timers
            .schedule(self.elapsed + self.tuning.hit_display as f64, WhackTimer::Clear(id));
    }
}

fn pick_kind(weights: &KindWeights, rng: &mut Pcg32) -> PigKind {
    let total = weights.total();
    if total == 0 {
        return PigKind::Normal;
    }
    let roll = rng.random_range(0..total);
    if roll < weights.normal {
        PigKind::Normal
    } else if roll < weights.normal + weights.bonus {
        PigKind::Bonus
    } else {
        PigKind::Hazard
    }
}
