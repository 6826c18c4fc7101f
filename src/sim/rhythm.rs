//! Rhythm game: notes fall down three lanes toward a hit line
//!
//! Everything here runs on audio time. Notes sit on a beat grid anchored at
//! the moment the run started, so a hitch in frame delivery can delay when a
//! note is *seen* but never moves where it *lands*. After a fixed stretch of
//! play the notes stop and a boss takes over until it is beaten or the
//! countdown runs out.

use rand::Rng;
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::entity::{Entity, EntityId, EntityRegistry, Resolution};
use super::events::{GameEvent, GameOverReason, HitGrade, Unlock};
use super::score::{FeverChange, ScoreBook};
use super::session::Transition;
use crate::audio::SoundCue;
use crate::tuning::RhythmTuning;

/// Score needed for each cosmetic, in the order they unlock
pub const UNLOCKS: [(u64, Unlock); 3] = [
    (200, Unlock::CoolCow),
    (500, Unlock::SpaceCow),
    (800, Unlock::GoldenDrum),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    pub lane: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Boss {
    pub health: u32,
    pub max_health: u32,
    /// Audio time at which the boss escapes
    pub deadline: f64,
}

/// Grade a timing error against the inclusive windows
pub fn classify(delta: f64, tuning: &RhythmTuning) -> Option<HitGrade> {
    let d = delta.abs();
    if d <= tuning.perfect_window {
        Some(HitGrade::Perfect)
    } else if d <= tuning.good_window {
        Some(HitGrade::Good)
    } else {
        None
    }
}

#[derive(Debug)]
pub struct RhythmGame {
    tuning: RhythmTuning,
    notes: EntityRegistry<Note>,
    /// Audio time of grid step zero
    origin: f64,
    next_step: u64,
    boss: Option<Boss>,
    unlocked: Vec<Unlock>,
    now: f64,
}

impl RhythmGame {
    pub fn new(tuning: RhythmTuning) -> Self {
        Self {
            tuning,
            notes: EntityRegistry::new(),
            origin: 0.0,
            next_step: 1,
            boss: None,
            unlocked: Vec::new(),
            now: 0.0,
        }
    }

    /// Fresh run whose beat grid starts shortly after `audio_now`
    pub fn reset(&mut self, audio_now: f64) {
        self.notes.clear();
        self.origin = audio_now + self.tuning.lead_in;
        self.next_step = 1;
        self.boss = None;
        self.unlocked.clear();
        self.now = audio_now;
    }

    pub fn tuning(&self) -> &RhythmTuning {
        &self.tuning
    }

    pub fn notes(&self) -> &EntityRegistry<Note> {
        &self.notes
    }

    pub fn boss(&self) -> Option<&Boss> {
        self.boss.as_ref()
    }

    pub fn unlocked(&self) -> &[Unlock] {
        &self.unlocked
    }

    /// Audio time where the beat grid (and the background beat) begins
    pub fn origin(&self) -> f64 {
        self.origin
    }

    /// Seconds of boss countdown left
    pub fn boss_time_left(&self) -> Option<f64> {
        self.boss.map(|b| (b.deadline - self.now).max(0.0))
    }

    /// Travel progress of a note: 0 at the top of the lane, 1 on the hit line.
    /// Keeps growing past 1 until the note is dropped.
    pub fn progress(&self, note: &Entity<Note>) -> f64 {
        let spawn = note.anchor - self.tuning.approach_time;
        ((self.now - spawn) / self.tuning.approach_time).max(0.0)
    }

    /// Put a note on the grid by hand
    pub fn place_note(&mut self, lane: u8, anchor: f64) -> EntityId {
        let id = self.notes.spawn(anchor, Note { lane });
        if let Some(note) = self.notes.get_mut(id) {
            note.approach();
        }
        id
    }

    pub(crate) fn step(
        &mut self,
        book: &mut ScoreBook,
        rng: &mut Pcg32,
        audio_now: f64,
        in_bonus: bool,
        events: &mut Vec<GameEvent>,
    ) -> Option<Transition> {
        self.now = audio_now;

        if in_bonus {
            return match self.boss {
                Some(boss) if audio_now >= boss.deadline => {
                    log::info!("Boss escaped with {} health left", boss.health);
                    Some(Transition::End(GameOverReason::BossEscaped))
                }
                _ => None,
            };
        }

        if audio_now - self.origin >= self.tuning.boss_after {
            self.notes.clear();
            self.boss = Some(Boss {
                health: self.tuning.boss_health,
                max_health: self.tuning.boss_health,
                deadline: audio_now + self.tuning.boss_countdown,
            });
            log::info!("Boss phase at score {}", book.score);
            return Some(Transition::EnterBonus);
        }

        self.spawn_due(book.score, rng, events);

        let good = self.tuning.good_window;
        for note in self.notes.iter_mut() {
            if audio_now >= note.anchor - good {
                note.activate();
            }
        }

        let mut missed = Vec::new();
        for note in self.notes.iter_mut() {
            if !note.is_resolved() && audio_now > note.anchor + good {
                note.resolve(Resolution::Missed);
                missed.push(note.id);
            }
        }
        for id in missed {
            book.miss();
            let lives = book.lose_life();
            log::debug!("Note {id} missed, {lives} lives left");
            events.push(GameEvent::Missed { id });
            events.push(GameEvent::Sound(SoundCue::RhythmMiss));
        }
        push_fever(book.update_fever(self.tuning.fever_combo), events);

        let linger = self.tuning.note_linger;
        self.notes.retain(|n| audio_now < n.anchor + linger);

        if book.lives == 0 {
            return Some(Transition::End(GameOverReason::LivesExhausted));
        }
        None
    }

    /// Roll for every grid step whose note should now be entering the lane
    fn spawn_due(&mut self, score: u64, rng: &mut Pcg32, events: &mut Vec<GameEvent>) {
        let step = self.tuning.step_seconds();
        loop {
            let anchor = self.origin + self.next_step as f64 * step;
            if self.now < anchor - self.tuning.approach_time {
                break;
            }
            self.next_step += 1;
            // Steps that slipped by unseen (a long stall) are skipped, not punished
            if self.now > anchor + self.tuning.good_window {
                continue;
            }
            if rng.random_bool(self.tuning.note_density(score).clamp(0.0, 1.0)) {
                let lane = rng.random_range(0..self.tuning.lanes.max(1));
                let id = self.place_note(lane, anchor);
                events.push(GameEvent::Spawned { id });
            }
        }
    }

    pub(crate) fn press(
        &mut self,
        lane: u8,
        at: f64,
        in_bonus: bool,
        book: &mut ScoreBook,
        events: &mut Vec<GameEvent>,
    ) -> Option<Transition> {
        if in_bonus {
            return self.strike_boss(book, events);
        }

        // Nearest unresolved note in the lane; ties go to the earlier one
        let nearest = self
            .notes
            .iter()
            .filter(|n| n.body.lane == lane && !n.is_resolved())
            .min_by(|a, b| (a.anchor - at).abs().total_cmp(&(b.anchor - at).abs()))
            .map(|n| (n.id, n.anchor));
        let (id, anchor) = nearest?;
        let grade = classify(at - anchor, &self.tuning)?;

        // Inside the window, so the note is live even if no step has run yet
        let note = self.notes.get_mut(id)?;
        note.activate();
        if !note.resolve(Resolution::Hit) {
            return None;
        }

        let base = match grade {
            HitGrade::Perfect => self.tuning.perfect_points,
            _ => self.tuning.good_points,
        };
        let multiplier = if book.fever { self.tuning.fever_multiplier } else { 1 };
        let step = self.tuning.combo_step;
        let points = book.hit(|combo| base * multiplier + combo as u64 * step);
        events.push(GameEvent::Hit { id, grade, points });
        events.push(GameEvent::Sound(SoundCue::RhythmHit));
        push_fever(book.update_fever(self.tuning.fever_combo), events);
        self.check_unlocks(book.score, events);
        None
    }

    /// Any tap in any lane hurts the boss
    fn strike_boss(&mut self, book: &mut ScoreBook, events: &mut Vec<GameEvent>) -> Option<Transition> {
        let boss = self.boss.as_mut()?;
        if boss.health == 0 {
            return None;
        }
        boss.health -= 1;
        let health = boss.health;
        events.push(GameEvent::BossHit { health });
        events.push(GameEvent::Sound(SoundCue::BossHit));
        if health > 0 {
            return None;
        }
        book.add(self.tuning.boss_bonus);
        events.push(GameEvent::Sound(SoundCue::BossDefeated));
        log::info!("Boss defeated, final score {}", book.score);
        self.check_unlocks(book.score, events);
        Some(Transition::End(GameOverReason::BossDefeated))
    }

    fn check_unlocks(&mut self, score: u64, events: &mut Vec<GameEvent>) {
        for (threshold, unlock) in UNLOCKS {
            if score >= threshold && !self.unlocked.contains(&unlock) {
                self.unlocked.push(unlock);
                events.push(GameEvent::Unlocked(unlock));
                events.push(GameEvent::Sound(SoundCue::Unlock));
            }
        }
    }
}

fn push_fever(change: Option<FeverChange>, events: &mut Vec<GameEvent>) {
    match change {
        Some(FeverChange::Started) => {
            events.push(GameEvent::FeverStarted);
            events.push(GameEvent::Sound(SoundCue::Unlock));
        }
        Some(FeverChange::Ended) => events.push(GameEvent::FeverEnded),
        None => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::entity::Lifecycle;
    use proptest::prelude::*;
    use rand::SeedableRng;

    struct Rig {
        game: RhythmGame,
        book: ScoreBook,
        rng: Pcg32,
        events: Vec<GameEvent>,
    }

    impl Rig {
        /// Grid at 0.1, no random notes
        fn quiet() -> Self {
            let tuning = RhythmTuning {
                density_base: 0.0,
                density_per_point: 0.0,
                ..RhythmTuning::default()
            };
            let mut game = RhythmGame::new(tuning);
            game.reset(0.0);
            Self {
                book: ScoreBook::new(game.tuning().lives),
                game,
                rng: Pcg32::seed_from_u64(3),
                events: Vec::new(),
            }
        }

        fn step(&mut self, now: f64) -> Option<Transition> {
            self.game
                .step(&mut self.book, &mut self.rng, now, false, &mut self.events)
        }

        fn press(&mut self, lane: u8, at: f64) -> Option<Transition> {
            self.game
                .press(lane, at, false, &mut self.book, &mut self.events)
        }
    }

    #[test]
    fn windows_are_inclusive() {
        let t = RhythmTuning::default();
        assert_eq!(classify(0.0, &t), Some(HitGrade::Perfect));
        assert_eq!(classify(0.15, &t), Some(HitGrade::Perfect));
        assert_eq!(classify(-0.15, &t), Some(HitGrade::Perfect));
        assert_eq!(classify(0.15 + 1e-9, &t), Some(HitGrade::Good));
        assert_eq!(classify(0.3, &t), Some(HitGrade::Good));
        assert_eq!(classify(-0.3, &t), Some(HitGrade::Good));
        assert_eq!(classify(0.3 + 1e-9, &t), None);
    }

    #[test]
    fn perfect_hit_near_the_anchor() {
        let mut rig = Rig::quiet();
        let id = rig.game.place_note(1, 4.0);
        rig.step(3.9);
        assert_eq!(rig.press(1, 4.05), None);

        assert_eq!(rig.book.score, 50);
        assert_eq!(rig.book.combo, 1);
        assert_eq!(
            rig.game.notes().get(id).map(|n| n.state()),
            Some(Lifecycle::Resolved(Resolution::Hit))
        );
        assert!(rig.events.contains(&GameEvent::Hit {
            id,
            grade: HitGrade::Perfect,
            points: 50
        }));
    }

    #[test]
    fn early_press_outside_the_window_is_ignored() {
        let mut rig = Rig::quiet();
        let id = rig.game.place_note(0, 4.0);
        rig.step(3.5);
        rig.press(0, 3.5);
        assert_eq!(rig.book.score, 0);
        assert!(!rig.game.notes().get(id).is_some_and(|n| n.is_resolved()));
    }

    #[test]
    fn wrong_lane_does_nothing() {
        let mut rig = Rig::quiet();
        rig.game.place_note(2, 4.0);
        rig.press(0, 4.0);
        assert_eq!(rig.book.score, 0);
        assert_eq!(rig.book.combo, 0);
    }

    #[test]
    fn combo_and_fever_shape_the_award() {
        let mut rig = Rig::quiet();
        for _ in 0..10 {
            rig.book.hit(|_| 0);
        }
        rig.book.update_fever(10);
        assert!(rig.book.fever);
        rig.game.place_note(0, 4.0);
        rig.press(0, 4.2);
        // good (20) doubled under fever, plus 10 combo steps of 5
        assert_eq!(rig.book.score, 90);
    }

    #[test]
    fn nearest_note_in_the_lane_wins() {
        let mut rig = Rig::quiet();
        let first = rig.game.place_note(0, 4.0);
        let second = rig.game.place_note(0, 4.6);
        rig.press(0, 4.5);
        assert!(rig.events.iter().any(|e| matches!(e, GameEvent::Hit { id, .. } if *id == second)));
        assert!(!rig.game.notes().get(first).is_some_and(|n| n.is_resolved()));
    }

    #[test]
    fn press_between_steps_still_passes_through_active() {
        let mut rig = Rig::quiet();
        let id = rig.game.place_note(0, 4.0);
        rig.step(3.65);
        let state = |rig: &Rig| rig.game.notes().get(id).map(|n| n.state());
        assert_eq!(state(&rig), Some(Lifecycle::Approaching));

        // Stamped after the last frame, inside the good window
        rig.press(0, 3.8);
        assert_eq!(state(&rig), Some(Lifecycle::Resolved(Resolution::Hit)));
        assert_eq!(rig.book.score, 20);
        assert_eq!(rig.book.combo, 1);
    }

    #[test]
    fn second_press_on_a_hit_note_counts_nothing() {
        let mut rig = Rig::quiet();
        let id = rig.game.place_note(1, 4.0);
        rig.step(3.9);
        rig.press(1, 4.0);
        let (score, combo) = (rig.book.score, rig.book.combo);

        rig.events.clear();
        rig.press(1, 4.0);
        rig.press(1, 4.1);
        assert_eq!((rig.book.score, rig.book.combo), (score, combo));
        assert!(rig.events.is_empty());
        assert_eq!(
            rig.game.notes().get(id).map(|n| n.state()),
            Some(Lifecycle::Resolved(Resolution::Hit))
        );

        // Stepping past the window does not turn the hit into a miss
        rig.step(4.5);
        assert_eq!(rig.book.lives, rig.game.tuning().lives);
        assert_eq!(rig.book.combo, combo);
    }

    #[test]
    fn good_window_edges_through_press() {
        let good = RhythmTuning::default().good_window;
        for at in [4.0 - good, 4.0 + good] {
            let mut rig = Rig::quiet();
            rig.game.place_note(2, 4.0);
            rig.press(2, at);
            assert_eq!(rig.book.score, 20, "press at {at}");
        }
        for at in [4.0 - good - 1e-6, 4.0 + good + 1e-6] {
            let mut rig = Rig::quiet();
            let id = rig.game.place_note(2, 4.0);
            rig.press(2, at);
            assert_eq!(rig.book.score, 0, "press at {at}");
            assert!(!rig.game.notes().get(id).is_some_and(|n| n.is_resolved()));
        }
    }

    #[test]
    fn missed_note_costs_a_life_and_the_combo() {
        let mut rig = Rig::quiet();
        rig.book.hit(|_| 0);
        let id = rig.game.place_note(1, 4.0);
        rig.step(4.25);
        assert_eq!(rig.book.lives, 5);
        rig.step(4.35);
        assert_eq!(rig.book.lives, 4);
        assert_eq!(rig.book.combo, 0);
        assert!(rig.events.contains(&GameEvent::Missed { id }));

        // A miss is settled for good, later frames do not charge again
        rig.step(4.5);
        assert_eq!(rig.book.lives, 4);
        rig.press(1, 4.3);
        assert_eq!(rig.book.score, 0);

        // Dropped from the lane a second after its anchor
        rig.step(5.0);
        assert!(rig.game.notes().get(id).is_none());
    }

    #[test]
    fn losing_every_life_ends_the_run() {
        let mut rig = Rig::quiet();
        for k in 0..5 {
            rig.game.place_note(0, 1.0 + k as f64 * 0.01);
        }
        assert_eq!(
            rig.step(2.0),
            Some(Transition::End(GameOverReason::LivesExhausted))
        );
    }

    #[test]
    fn grid_notes_land_on_the_beat() {
        let tuning = RhythmTuning {
            density_base: 1.0,
            ..RhythmTuning::default()
        };
        let mut game = RhythmGame::new(tuning);
        game.reset(0.0);
        let mut book = ScoreBook::new(5);
        let mut rng = Pcg32::seed_from_u64(11);
        let mut events = Vec::new();

        // Irregular frame pacing must not shift anchors
        for now in [0.0, 0.3, 0.31, 0.9, 1.7, 2.2] {
            game.step(&mut book, &mut rng, now, false, &mut events);
        }
        let step = game.tuning().step_seconds();
        let anchors: Vec<f64> = game.notes().iter().map(|n| n.anchor).collect();
        assert!(!anchors.is_empty());
        assert!(anchors.windows(2).all(|w| w[0] < w[1]));
        for anchor in &anchors {
            let k = ((anchor - game.origin()) / step).round();
            assert!((anchor - (game.origin() + k * step)).abs() < 1e-9);
        }
        for note in game.notes().iter() {
            assert!(game.progress(note) >= 0.0);
            assert!(note.body.lane < 3);
        }
    }

    #[test]
    fn boss_arrives_after_the_threshold() {
        let mut rig = Rig::quiet();
        rig.game.place_note(0, 31.0);
        assert_eq!(rig.step(30.0), None);
        assert_eq!(rig.step(30.2), Some(Transition::EnterBonus));
        assert!(rig.game.notes().is_empty());
        assert_eq!(rig.game.boss().map(|b| b.health), Some(50));
    }

    #[test]
    fn boss_falls_to_enough_taps() {
        let mut rig = Rig::quiet();
        rig.step(30.2);
        let mut outcome = None;
        for i in 0..50u8 {
            outcome = rig
                .game
                .press(i % 3, 30.3, true, &mut rig.book, &mut rig.events);
        }
        assert_eq!(outcome, Some(Transition::End(GameOverReason::BossDefeated)));
        assert_eq!(rig.book.score, 1000);
        assert!(rig.events.contains(&GameEvent::Unlocked(Unlock::GoldenDrum)));

        // Extra taps after the kill are inert
        assert_eq!(
            rig.game.press(0, 30.4, true, &mut rig.book, &mut rig.events),
            None
        );
        assert_eq!(rig.book.score, 1000);
    }

    #[test]
    fn boss_escapes_when_the_countdown_ends() {
        let mut rig = Rig::quiet();
        rig.step(30.2);
        for _ in 0..10 {
            rig.game.press(0, 31.0, true, &mut rig.book, &mut rig.events);
        }
        assert_eq!(
            rig.game.step(&mut rig.book, &mut rig.rng, 40.0, true, &mut rig.events),
            None
        );
        assert!(rig.game.boss_time_left().is_some_and(|t| (t - 0.2).abs() < 1e-9));
        assert_eq!(
            rig.game.step(&mut rig.book, &mut rig.rng, 40.3, true, &mut rig.events),
            Some(Transition::End(GameOverReason::BossEscaped))
        );
        assert_eq!(rig.book.score, 0);
    }

    #[test]
    fn unlocks_fire_once_when_crossing_milestones() {
        let mut rig = Rig::quiet();
        rig.book.add(190);
        rig.game.place_note(0, 4.0);
        rig.press(0, 4.0);
        rig.game.place_note(0, 5.0);
        rig.press(0, 5.0);
        let unlocks: Vec<_> = rig
            .events
            .iter()
            .filter_map(|e| match e {
                GameEvent::Unlocked(u) => Some(*u),
                _ => None,
            })
            .collect();
        assert_eq!(unlocks, vec![Unlock::CoolCow]);
        assert_eq!(rig.game.unlocked(), &[Unlock::CoolCow]);
    }

    proptest! {
        #[test]
        fn classification_is_symmetric_and_widens(d in 0.0f64..1.0) {
            let t = RhythmTuning::default();
            prop_assert_eq!(classify(d, &t), classify(-d, &t));
            let grade = classify(d, &t);
            prop_assert_eq!(grade == Some(HitGrade::Perfect), d <= t.perfect_window);
            prop_assert_eq!(grade.is_none(), d > t.good_window);
        }
    }
}
