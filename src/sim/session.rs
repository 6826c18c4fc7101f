//! Session state machine
//!
//! A session is one run of one game: `Idle -> Playing [-> BonusPhase] -> GameOver`.
//! The per-game rules live in the variant modules; this file owns the phase,
//! the score book and the RNG, and makes sure a run ends exactly once.

use rand::SeedableRng;
use rand_pcg::Pcg32;

use super::entity::Lifecycle;
use super::events::{GameEvent, GameOverReason, Phase};
use super::flight::FlightGame;
use super::rhythm::RhythmGame;
use super::score::ScoreBook;
use super::snapshot::{ActorView, BossView, EntityKind, EntityView, Placement, Snapshot};
use super::whack::WhackGame;
use crate::GameKind;
use crate::audio::SoundCue;
use crate::tuning::Tuning;

/// Phase change requested by a variant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Transition {
    EnterBonus,
    End(GameOverReason),
}

/// Player action, already mapped to the current game
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Bonk a hole
    Whack(usize),
    /// Drum a lane
    Tap(u8),
    Flap,
}

#[derive(Debug)]
pub enum Variant {
    Whack(WhackGame),
    Rhythm(RhythmGame),
    Flight(FlightGame),
}

impl Variant {
    pub fn new(kind: GameKind, tuning: &Tuning) -> Self {
        match kind {
            GameKind::Whack => Variant::Whack(WhackGame::new(tuning.whack.clone())),
            GameKind::Rhythm => Variant::Rhythm(RhythmGame::new(tuning.rhythm.clone())),
            GameKind::Flight => Variant::Flight(FlightGame::new(tuning.flight.clone())),
        }
    }

    pub fn kind(&self) -> GameKind {
        match self {
            Variant::Whack(_) => GameKind::Whack,
            Variant::Rhythm(_) => GameKind::Rhythm,
            Variant::Flight(_) => GameKind::Flight,
        }
    }

    fn starting_lives(&self) -> u32 {
        match self {
            Variant::Rhythm(game) => game.tuning().lives,
            _ => 0,
        }
    }

    /// Score that maps to "perfect" for commentary
    pub fn commentary_scale(&self) -> u64 {
        match self {
            Variant::Whack(game) => game.tuning().commentary_scale,
            Variant::Rhythm(game) => game.tuning().commentary_scale,
            Variant::Flight(game) => game.tuning().commentary_scale,
        }
    }
}

#[derive(Debug)]
pub struct Session {
    phase: Phase,
    variant: Variant,
    book: ScoreBook,
    rng: Pcg32,
    seed: u64,
    runs: u64,
    game_over: Option<GameOverReason>,
    audio_time: f64,
}

impl Session {
    pub fn new(kind: GameKind, tuning: &Tuning, seed: u64) -> Self {
        let variant = Variant::new(kind, tuning);
        Self {
            phase: Phase::Idle,
            book: ScoreBook::new(variant.starting_lives()),
            variant,
            rng: Pcg32::seed_from_u64(seed),
            seed,
            runs: 0,
            game_over: None,
            audio_time: 0.0,
        }
    }

    /// Carry the run count over from an earlier session so the next run
    /// does not replay an RNG stream that was already used
    pub fn with_run_count(mut self, runs: u64) -> Self {
        self.runs = runs;
        self
    }

    pub fn kind(&self) -> GameKind {
        self.variant.kind()
    }

    /// Runs started so far
    pub fn runs(&self) -> u64 {
        self.runs
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn book(&self) -> &ScoreBook {
        &self.book
    }

    pub fn variant(&self) -> &Variant {
        &self.variant
    }

    pub fn game_over(&self) -> Option<GameOverReason> {
        self.game_over
    }

    pub fn is_running(&self) -> bool {
        matches!(self.phase, Phase::Playing | Phase::BonusPhase)
    }

    /// Begin a fresh run. Works from any phase, so it doubles as restart.
    pub fn start(&mut self, audio_now: f64, events: &mut Vec<GameEvent>) {
        self.runs += 1;
        self.rng = Pcg32::seed_from_u64(self.seed.wrapping_add(self.runs));
        self.book = ScoreBook::new(self.variant.starting_lives());
        self.game_over = None;
        self.audio_time = audio_now;
        match &mut self.variant {
            Variant::Whack(game) => game.reset(),
            Variant::Rhythm(game) => game.reset(audio_now),
            Variant::Flight(game) => game.reset(),
        }
        log::info!("Starting {} run #{}", self.kind(), self.runs);
        self.set_phase(Phase::Playing, events);
    }

    /// Advance the run by `dt` seconds of frame time. `audio_now` is the audio
    /// clock sampled once for this frame.
    pub fn step(&mut self, dt: f32, audio_now: f64, events: &mut Vec<GameEvent>) {
        if !self.is_running() {
            return;
        }
        self.audio_time = audio_now;
        let in_bonus = self.phase == Phase::BonusPhase;
        let transition = match &mut self.variant {
            Variant::Whack(game) => game.step(&mut self.book, &mut self.rng, dt, events),
            Variant::Rhythm(game) => {
                game.step(&mut self.book, &mut self.rng, audio_now, in_bonus, events)
            }
            Variant::Flight(game) => game.step(&mut self.book, &mut self.rng, dt, events),
        };
        if let Some(t) = transition {
            self.apply(t, events);
        }
    }

    /// Handle a player action. `audio_at` is the audio-clock timestamp of the
    /// input; only the rhythm game reads it. Actions for another game are ignored.
    pub fn press(&mut self, action: Action, audio_at: f64, events: &mut Vec<GameEvent>) {
        if !self.is_running() {
            return;
        }
        let in_bonus = self.phase == Phase::BonusPhase;
        let transition = match (&mut self.variant, action) {
            (Variant::Whack(game), Action::Whack(hole)) => {
                game.press(hole, &mut self.book, events);
                None
            }
            (Variant::Rhythm(game), Action::Tap(lane)) => {
                game.press(lane, audio_at, in_bonus, &mut self.book, events)
            }
            (Variant::Flight(game), Action::Flap) => {
                game.flap(events);
                None
            }
            (variant, action) => {
                log::trace!("{:?} ignored by {}", action, variant.kind());
                None
            }
        };
        if let Some(t) = transition {
            self.apply(t, events);
        }
    }

    fn apply(&mut self, transition: Transition, events: &mut Vec<GameEvent>) {
        match transition {
            Transition::EnterBonus => {
                if self.phase == Phase::Playing {
                    self.set_phase(Phase::BonusPhase, events);
                }
            }
            Transition::End(reason) => self.end(reason, events),
        }
    }

    fn end(&mut self, reason: GameOverReason, events: &mut Vec<GameEvent>) {
        if self.phase == Phase::GameOver {
            return;
        }
        if let Variant::Whack(game) = &mut self.variant {
            game.halt();
        }
        self.game_over = Some(reason);
        log::info!(
            "{} run over ({:?}), score {}, best combo {}",
            self.kind(),
            reason,
            self.book.score,
            self.book.best_combo
        );
        events.push(GameEvent::Sound(SoundCue::GameOver));
        events.push(GameEvent::GameOver {
            reason,
            score: self.book.score,
        });
        self.set_phase(Phase::GameOver, events);
    }

    fn set_phase(&mut self, to: Phase, events: &mut Vec<GameEvent>) {
        let from = self.phase;
        self.phase = to;
        if from != to {
            log::info!("Phase {:?} -> {:?}", from, to);
        }
        events.push(GameEvent::PhaseChanged { from, to });
    }

    /// Render view of the current state. Host-side fields (high score,
    /// commentary) are left empty for the caller to fill.
    pub fn snapshot(&self) -> Snapshot {
        let mut snap = Snapshot {
            game: self.kind(),
            phase: self.phase,
            score: self.book.score,
            combo: self.book.combo,
            best_combo: self.book.best_combo,
            lives: None,
            time_left: None,
            fever: self.book.fever,
            tier: None,
            boss: None,
            rush: false,
            actor: None,
            entities: Vec::new(),
            unlocked: Vec::new(),
            game_over: self.game_over,
            audio_time: self.audio_time,
            high_score: 0,
            commentary: None,
            commentary_loading: false,
        };

        match &self.variant {
            Variant::Whack(game) => {
                snap.time_left = Some(game.time_left());
                let tier = game.tier();
                let name = game.tuning().tier(self.book.score).name.clone();
                snap.tier = Some((tier, name));
                snap.entities = game
                    .pigs()
                    .iter()
                    .map(|p| EntityView {
                        id: p.id,
                        state: p.state(),
                        kind: EntityKind::Pig(p.body.kind),
                        placement: Placement::Hole(p.body.hole),
                    })
                    .collect();
            }
            Variant::Rhythm(game) => {
                snap.lives = Some(self.book.lives);
                snap.unlocked = game.unlocked().to_vec();
                snap.boss = game.boss().map(|b| BossView {
                    health: b.health,
                    max_health: b.max_health,
                    time_left: game.boss_time_left().unwrap_or(0.0),
                });
                snap.entities = game
                    .notes()
                    .iter()
                    .map(|n| EntityView {
                        id: n.id,
                        state: n.state(),
                        kind: EntityKind::Note,
                        placement: Placement::Lane {
                            lane: n.body.lane,
                            progress: game.progress(n),
                            anchor: n.anchor,
                        },
                    })
                    .collect();
            }
            Variant::Flight(game) => {
                let t = game.tuning();
                let calf = game.calf();
                snap.rush = game.in_rush();
                snap.actor = Some(ActorView {
                    x: t.actor_x,
                    y: calf.y,
                    size: t.actor_size,
                    vel: calf.vel,
                    tilt: game.tilt(),
                });
                snap.entities = game
                    .fences()
                    .iter()
                    .filter(|f| f.state() != Lifecycle::Hidden)
                    .map(|f| EntityView {
                        id: f.id,
                        state: f.state(),
                        kind: EntityKind::Fence {
                            smashed: f.body.smashed,
                        },
                        placement: Placement::Column {
                            x: f.body.x,
                            gap_top: f.body.gap_top,
                            gap: f.body.gap,
                        },
                    })
                    .collect();
            }
        }
        snap
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::SIM_DT;

    fn count_game_overs(events: &[GameEvent]) -> usize {
        events
            .iter()
            .filter(|e| matches!(e, GameEvent::GameOver { .. }))
            .count()
    }

    #[test]
    fn idle_session_ignores_steps_and_input() {
        let mut session = Session::new(GameKind::Whack, &Tuning::default(), 1);
        let mut events = Vec::new();
        session.step(1.0, 0.0, &mut events);
        session.press(Action::Whack(0), 0.0, &mut events);
        assert!(events.is_empty());
        assert_eq!(session.phase(), Phase::Idle);
    }

    #[test]
    fn crash_ends_the_flight_exactly_once() {
        let mut session = Session::new(GameKind::Flight, &Tuning::default(), 9);
        let mut events = Vec::new();
        session.start(0.0, &mut events);
        for _ in 0..1_200 {
            session.step(SIM_DT, 0.0, &mut events);
        }
        assert_eq!(count_game_overs(&events), 1);
        assert_eq!(session.phase(), Phase::GameOver);
        assert_eq!(session.game_over(), Some(GameOverReason::Crashed));

        // Input after the crash changes nothing
        session.press(Action::Flap, 0.0, &mut events);
        assert!(!events.contains(&GameEvent::Flap));
    }

    #[test]
    fn restart_resets_the_run() {
        let mut session = Session::new(GameKind::Rhythm, &Tuning::default(), 2);
        let mut events = Vec::new();
        session.start(0.0, &mut events);
        // Every note slips by until the lives run out
        let mut now = 0.0;
        while session.is_running() && now < 29.0 {
            now += SIM_DT as f64;
            session.step(SIM_DT, now, &mut events);
        }
        assert_eq!(session.game_over(), Some(GameOverReason::LivesExhausted));
        assert_eq!(session.book().lives, 0);

        events.clear();
        session.start(now, &mut events);
        assert_eq!(session.phase(), Phase::Playing);
        assert_eq!(session.book().lives, 5);
        assert_eq!(session.book().score, 0);
        assert_eq!(session.game_over(), None);
        assert!(session.snapshot().entities.is_empty());
        assert_eq!(
            events,
            vec![GameEvent::PhaseChanged {
                from: Phase::GameOver,
                to: Phase::Playing
            }]
        );
    }

    #[test]
    fn rhythm_run_reaches_the_boss_and_it_escapes() {
        let mut session = Session::new(GameKind::Rhythm, &Tuning::default(), 4);
        let mut events = Vec::new();
        session.start(0.0, &mut events);

        // Hit every note on its anchor so lives never run out
        let mut now = 0.0;
        while session.phase() == Phase::Playing && now < 40.0 {
            now += SIM_DT as f64;
            let due: Vec<(u8, f64)> = session
                .snapshot()
                .entities
                .iter()
                .filter(|e| e.state == Lifecycle::Active)
                .filter_map(|e| match e.placement {
                    Placement::Lane { lane, anchor, .. } if anchor <= now => Some((lane, anchor)),
                    _ => None,
                })
                .collect();
            for (lane, anchor) in due {
                session.press(Action::Tap(lane), anchor, &mut events);
            }
            session.step(SIM_DT, now, &mut events);
        }
        assert_eq!(session.phase(), Phase::BonusPhase);
        assert_eq!(session.book().lives, 5);
        assert!(session.snapshot().boss.is_some());

        while session.is_running() && now < 60.0 {
            now += SIM_DT as f64;
            session.step(SIM_DT, now, &mut events);
        }
        assert_eq!(session.game_over(), Some(GameOverReason::BossEscaped));
        assert_eq!(count_game_overs(&events), 1);
    }

    #[test]
    fn whack_time_up_after_the_budget() {
        let mut session = Session::new(GameKind::Whack, &Tuning::default(), 3);
        let mut events = Vec::new();
        session.start(0.0, &mut events);
        let steps = (31.0 / SIM_DT) as usize;
        for _ in 0..steps {
            session.step(SIM_DT, 0.0, &mut events);
        }
        assert_eq!(session.game_over(), Some(GameOverReason::TimeUp));
        assert_eq!(count_game_overs(&events), 1);
        let snap = session.snapshot();
        assert_eq!(snap.time_left, Some(0.0));
        assert!(snap.is_over());
        // Nothing is left clickable on the final board
        assert!(snap.entities.iter().all(|e| e.state != Lifecycle::Active));
    }

    #[test]
    fn actions_for_other_games_are_ignored() {
        let mut session = Session::new(GameKind::Flight, &Tuning::default(), 5);
        let mut events = Vec::new();
        session.start(0.0, &mut events);
        events.clear();
        session.press(Action::Tap(0), 0.0, &mut events);
        session.press(Action::Whack(2), 0.0, &mut events);
        assert!(events.is_empty());
        session.press(Action::Flap, 0.0, &mut events);
        assert!(events.contains(&GameEvent::Flap));
    }
}
