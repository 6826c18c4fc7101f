//! Flight game: a calf flaps through gaps in scrolling fences
//!
//! Units are playfield percent (0..100 on both axes, y down), time is seconds.
//! Physics integrates with the real step length so the feel is the same at
//! any frame rate.

use rand::Rng;
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::collision::{Aabb, obstacle_contact};
use super::entity::{EntityId, EntityRegistry, Resolution};
use super::events::{GameEvent, GameOverReason};
use super::score::ScoreBook;
use super::session::Transition;
use crate::audio::SoundCue;
use crate::consts::REFERENCE_FPS;
use crate::tuning::FlightTuning;

/// The player
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Calf {
    /// Top edge
    pub y: f32,
    /// Vertical velocity (units/s, negative is up)
    pub vel: f32,
}

/// A fence with an opening
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Fence {
    /// Left edge
    pub x: f32,
    pub gap_top: f32,
    pub gap: f32,
    pub passed: bool,
    pub smashed: bool,
}

#[derive(Debug)]
pub struct FlightGame {
    tuning: FlightTuning,
    calf: Calf,
    fences: EntityRegistry<Fence>,
    /// Distance scrolled since the last fence was placed
    since_spawn: f32,
    rush_left: f32,
    passes: u64,
}

impl FlightGame {
    pub fn new(tuning: FlightTuning) -> Self {
        let mut game = Self {
            calf: Calf {
                y: tuning.start_y,
                vel: 0.0,
            },
            tuning,
            fences: EntityRegistry::new(),
            since_spawn: 0.0,
            rush_left: 0.0,
            passes: 0,
        };
        game.reset();
        game
    }

    /// Fresh run. The calf starts with a flap so it does not drop straight away.
    pub fn reset(&mut self) {
        self.calf = Calf {
            y: self.tuning.start_y,
            vel: self.tuning.jump_velocity,
        };
        self.fences.clear();
        self.since_spawn = 0.0;
        self.rush_left = 0.0;
        self.passes = 0;
    }

    pub fn tuning(&self) -> &FlightTuning {
        &self.tuning
    }

    pub fn calf(&self) -> Calf {
        self.calf
    }

    pub fn fences(&self) -> &EntityRegistry<Fence> {
        &self.fences
    }

    pub fn passes(&self) -> u64 {
        self.passes
    }

    pub fn in_rush(&self) -> bool {
        self.rush_left > 0.0
    }

    /// Nose angle in degrees for display
    pub fn tilt(&self) -> f32 {
        (self.calf.vel / REFERENCE_FPS * 5.0).clamp(-20.0, 30.0)
    }

    fn hitbox(&self) -> Aabb {
        let t = &self.tuning;
        Aabb::from_rect(t.actor_x, self.calf.y, t.actor_size, t.actor_size).shrink(t.hitbox_margin)
    }

    /// Place a fence by hand at `x`
    pub fn place_fence(&mut self, x: f32, gap_top: f32, gap: f32) -> EntityId {
        let id = self.fences.spawn(
            0.0,
            Fence {
                x,
                gap_top,
                gap,
                passed: false,
                smashed: false,
            },
        );
        if let Some(fence) = self.fences.get_mut(id) {
            fence.activate();
        }
        id
    }

    pub(crate) fn flap(&mut self, events: &mut Vec<GameEvent>) {
        self.calf.vel = self.tuning.jump_velocity;
        events.push(GameEvent::Flap);
        events.push(GameEvent::Sound(SoundCue::Jump));
    }

    pub(crate) fn step(
        &mut self,
        book: &mut ScoreBook,
        rng: &mut Pcg32,
        dt: f32,
        events: &mut Vec<GameEvent>,
    ) -> Option<Transition> {
        let t = self.tuning.clone();

        self.calf.vel += t.gravity * dt;
        self.calf.y += self.calf.vel * dt;
        if self.calf.y < 0.0 || self.calf.y > 100.0 - t.actor_size {
            return Some(crash(events));
        }

        let shift = t.scroll_speed(book.score) * dt;
        for fence in self.fences.iter_mut() {
            fence.body.x -= shift;
        }
        self.fences.retain(|f| f.body.x > -t.obstacle_width);

        self.since_spawn += shift;
        while self.since_spawn >= t.spacing {
            self.since_spawn -= t.spacing;
            let gap = t.gap(book.score);
            let lo = t.gap_margin;
            let hi = (100.0 - t.gap_margin - gap).max(lo);
            let gap_top = rng.random_range(lo..=hi);
            let id = self.place_fence(100.0 - self.since_spawn, gap_top, gap);
            events.push(GameEvent::Spawned { id });
        }

        if self.rush_left > 0.0 {
            self.rush_left -= dt;
            if self.rush_left <= 0.0 {
                self.rush_left = 0.0;
                events.push(GameEvent::RushEnded);
            }
        }

        let hitbox = self.hitbox();
        let rushing = self.in_rush();
        for fence in self.fences.iter_mut() {
            if fence.body.smashed {
                continue;
            }
            let f = fence.body;
            if !obstacle_contact(&hitbox, f.x, t.obstacle_width, f.gap_top, f.gap).hit() {
                continue;
            }
            if !rushing {
                return Some(crash(events));
            }
            fence.body.smashed = true;
            fence.resolve(Resolution::Hit);
            book.add(t.smash_bonus);
            events.push(GameEvent::Smashed {
                id: fence.id,
                points: t.smash_bonus,
            });
            events.push(GameEvent::Sound(SoundCue::Smash));
        }

        let mut earned_rush = false;
        for fence in self.fences.iter_mut() {
            if fence.body.passed || fence.body.x + t.obstacle_width >= hitbox.min.x {
                continue;
            }
            fence.body.passed = true;
            fence.resolve(Resolution::Hit);
            book.hit(|_| 1);
            self.passes += 1;
            events.push(GameEvent::Passed { id: fence.id });
            events.push(GameEvent::Sound(SoundCue::Score));
            if t.rush_every > 0 && self.passes % t.rush_every == 0 {
                earned_rush = true;
            }
        }
        if earned_rush {
            log::debug!("Rush after {} fences", self.passes);
            self.rush_left = t.rush_duration;
            events.push(GameEvent::RushStarted);
        }
        None
    }
}

fn crash(events: &mut Vec<GameEvent>) -> Transition {
    events.push(GameEvent::Sound(SoundCue::Crash));
    events.push(GameEvent::Shake);
    Transition::End(GameOverReason::Crashed)
}
