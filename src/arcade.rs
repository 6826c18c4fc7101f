//! Host loop
//!
//! Glues the pure simulation to the outside world: clocks in, sound cues,
//! beat scheduling, high scores and commentary out. A front end calls
//! [`Arcade::frame`] once per display frame and [`Arcade::press`] from its
//! input handlers, then draws the returned [`Snapshot`].

use std::sync::Arc;
use std::time::Duration;

use crate::GameKind;
use crate::audio::{AudioManager, AudioSink, LookaheadScheduler, SoundCue};
use crate::clock::{ClockSource, Clocks};
use crate::commentary::{CommentaryDesk, CommentaryProvider, CommentaryState};
use crate::consts::{MAX_FRAME_DT, MAX_SUBSTEPS, SIM_DT};
use crate::highscores::{HighScoreStore, record_if_higher};
use crate::settings::Settings;
use crate::sim::{Action, GameEvent, Session, Snapshot, Variant};
use crate::tuning::Tuning;

pub struct Arcade<A: AudioSink> {
    clocks: Clocks,
    tuning: Tuning,
    settings: Settings,
    session: Session,
    audio: AudioManager<A>,
    beat: LookaheadScheduler,
    desk: CommentaryDesk,
    store: Box<dyn HighScoreStore>,
    seed: u64,
    accumulator: f32,
    last_frame: f64,
    /// Events from the latest frame or press, after routing
    events: Vec<GameEvent>,
    new_record: bool,
}

impl<A: AudioSink> Arcade<A> {
    pub fn new(
        clocks: Clocks,
        sink: A,
        provider: Arc<dyn CommentaryProvider>,
        store: Box<dyn HighScoreStore>,
    ) -> Self {
        if !clocks.has_audio() {
            log::warn!("No audio clock, rhythm timing falls back to the frame clock");
        }
        let tuning = Tuning::default();
        let settings = Settings::default();
        let mut audio = AudioManager::new(sink);
        audio.apply_settings(&settings);
        let last_frame = clocks.frame.now();
        Self {
            session: Session::new(GameKind::Whack, &tuning, 0),
            beat: LookaheadScheduler::new(tuning.rhythm.bpm, tuning.rhythm.schedule_ahead),
            clocks,
            tuning,
            settings,
            audio,
            desk: CommentaryDesk::new(provider),
            store,
            seed: 0,
            accumulator: 0.0,
            last_frame,
            events: Vec::new(),
            new_record: false,
        }
    }

    pub fn with_tuning(mut self, tuning: Tuning) -> Self {
        self.tuning = tuning;
        self.session = Session::new(self.session.kind(), &self.tuning, self.seed);
        self
    }

    pub fn with_settings(mut self, settings: Settings) -> Self {
        self.audio.apply_settings(&settings);
        self.settings = settings;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self.session = Session::new(self.session.kind(), &self.tuning, seed);
        self
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn audio(&self) -> &AudioManager<A> {
        &self.audio
    }

    pub fn commentary(&self) -> &CommentaryState {
        self.desk.state()
    }

    /// Events produced by the latest `frame`, `press` or `start`
    pub fn events(&self) -> &[GameEvent] {
        &self.events
    }

    /// Whether the run that just ended set a new best
    pub fn new_record(&self) -> bool {
        self.new_record
    }

    pub fn best(&self, game: GameKind) -> u64 {
        self.store.best(game)
    }

    /// Start a fresh run of `game`, dropping anything left from the last one
    pub fn start(&mut self, game: GameKind) {
        self.events.clear();
        self.desk.cancel();
        self.beat.reset();
        self.new_record = false;
        if self.session.kind() != game {
            let runs = self.session.runs();
            self.session = Session::new(game, &self.tuning, self.seed).with_run_count(runs);
        }

        // Starting a run is the first audio-producing action
        self.clocks.start_audio();
        let audio_now = self.clocks.audio_now();
        self.session.start(audio_now, &mut self.events);

        if let Variant::Rhythm(rhythm) = self.session.variant() {
            self.beat = LookaheadScheduler::new(self.tuning.rhythm.bpm, self.tuning.rhythm.schedule_ahead);
            self.beat.start(rhythm.origin());
        }
        self.accumulator = 0.0;
        self.last_frame = self.clocks.frame.now();
        self.route(audio_now);
    }

    /// Same game again
    pub fn restart(&mut self) {
        self.start(self.session.kind());
    }

    /// Advance by however much frame time passed since the last call
    pub fn frame(&mut self) -> Snapshot {
        self.events.clear();

        let now = self.clocks.frame.now();
        let dt = (now - self.last_frame).clamp(0.0, MAX_FRAME_DT) as f32;
        self.last_frame = now;
        self.accumulator += dt;

        // One audio sample per frame, shared by every substep
        let audio_now = self.clocks.audio_now();
        let mut substeps = 0;
        while self.accumulator >= SIM_DT && substeps < MAX_SUBSTEPS {
            self.session.step(SIM_DT, audio_now, &mut self.events);
            self.accumulator -= SIM_DT;
            substeps += 1;
        }
        if substeps == MAX_SUBSTEPS && self.accumulator >= SIM_DT {
            log::trace!("Dropping {:.3}s of frame time", self.accumulator);
            self.accumulator = 0.0;
        }

        for cue in self.beat.pump(audio_now) {
            self.audio.play(cue.cue, cue.at);
        }
        self.route(audio_now);
        self.desk.poll();
        self.snapshot()
    }

    /// Player input, stamped with the audio clock at the moment it arrives
    pub fn press(&mut self, action: Action) {
        self.events.clear();
        self.clocks.start_audio();
        let at = self.clocks.audio_now();
        self.session.press(action, at, &mut self.events);
        self.route(at);
    }

    pub fn snapshot(&self) -> Snapshot {
        let mut snap = self.session.snapshot();
        snap.high_score = self.store.best(self.session.kind());
        snap.commentary = self.desk.state().text().map(str::to_string);
        snap.commentary_loading = self.desk.state().is_loading();
        snap
    }

    /// Block until the pending commentary arrives (headless runs)
    pub fn settle_commentary(&mut self, timeout: Duration) -> Option<String> {
        self.desk.wait(timeout).text().map(str::to_string)
    }

    fn route(&mut self, audio_now: f64) {
        for event in &self.events {
            match event {
                GameEvent::Sound(cue) => self.audio.play(*cue, audio_now),
                GameEvent::GameOver { score, .. } => {
                    self.beat.stop();
                    let game = self.session.kind();
                    self.new_record = record_if_higher(self.store.as_mut(), game, *score);
                    if self.new_record {
                        self.audio.play(SoundCue::HighScore, audio_now);
                    }
                    self.desk
                        .request(*score, self.session.variant().commentary_scale());
                }
                _ => {}
            }
        }
        if !self.settings.effective_screen_shake() {
            self.events.retain(|e| *e != GameEvent::Shake);
        }
    }
}
