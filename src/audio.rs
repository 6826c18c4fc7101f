//! Audio cues and beat scheduling
//!
//! The simulation only names sounds ([`SoundCue`]); an [`AudioSink`] turns
//! them into noise. Background beats go through a [`LookaheadScheduler`] that
//! queues events slightly ahead of the audio clock to hide output latency.

use serde::{Deserialize, Serialize};

use crate::settings::Settings;

/// Sound effect types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SoundCue {
    /// Mallet swing
    Moo,
    /// Regular pig bonked
    Squeal,
    /// Golden pig bonked
    GoldHit,
    /// Angry bull bonked
    BombHit,
    /// Note hit in time
    RhythmHit,
    /// Note slipped past the line
    RhythmMiss,
    /// Boss took a hit
    BossHit,
    /// Boss defeated
    BossDefeated,
    /// Skin unlocked or fever lit
    Unlock,
    /// Calf flapped
    Jump,
    /// Calf hit something
    Crash,
    /// Fence passed
    Score,
    /// Fence smashed during a rush
    Smash,
    /// Background beat: downbeat
    Kick,
    /// Background beat: off-beat
    HiHat,
    GameOver,
    HighScore,
}

impl SoundCue {
    /// Part of the background track rather than a reaction to play
    pub fn is_music(&self) -> bool {
        matches!(self, SoundCue::Kick | SoundCue::HiHat)
    }
}

/// Output device. `at` is audio-clock time, `gain` is 0..=1.
pub trait AudioSink {
    fn schedule(&mut self, cue: SoundCue, at: f64, gain: f32);
}

/// Swallows everything (no audio device)
#[derive(Debug, Default, Clone, Copy)]
pub struct NullAudio;

impl AudioSink for NullAudio {
    fn schedule(&mut self, _cue: SoundCue, _at: f64, _gain: f32) {}
}

/// Writes every cue to the debug log
#[derive(Debug, Default, Clone, Copy)]
pub struct LogAudio;

impl AudioSink for LogAudio {
    fn schedule(&mut self, cue: SoundCue, at: f64, gain: f32) {
        log::debug!("♪ {:?} at {:.3}s (gain {:.2})", cue, at, gain);
    }
}

/// Remembers everything it was asked to play
#[derive(Debug, Default, Clone)]
pub struct RecordingAudio {
    pub played: Vec<(SoundCue, f64, f32)>,
}

impl RecordingAudio {
    pub fn count(&self, cue: SoundCue) -> usize {
        self.played.iter().filter(|(c, _, _)| *c == cue).count()
    }
}

impl AudioSink for RecordingAudio {
    fn schedule(&mut self, cue: SoundCue, at: f64, gain: f32) {
        self.played.push((cue, at, gain));
    }
}

/// Volume handling in front of a sink
pub struct AudioManager<S: AudioSink> {
    sink: S,
    master_volume: f32,
    sfx_volume: f32,
    music_volume: f32,
    muted: bool,
}

impl<S: AudioSink> AudioManager<S> {
    pub fn new(sink: S) -> Self {
        Self {
            sink,
            master_volume: 0.8,
            sfx_volume: 1.0,
            music_volume: 0.7,
            muted: false,
        }
    }

    /// Pull volumes and mute state from settings
    pub fn apply_settings(&mut self, settings: &Settings) {
        self.master_volume = settings.master_volume.clamp(0.0, 1.0);
        self.sfx_volume = settings.sfx_volume.clamp(0.0, 1.0);
        self.music_volume = settings.music_volume.clamp(0.0, 1.0);
        self.muted = settings.muted;
    }

    pub fn set_muted(&mut self, muted: bool) {
        self.muted = muted;
    }

    fn effective_volume(&self, cue: SoundCue) -> f32 {
        if self.muted {
            return 0.0;
        }
        let channel = if cue.is_music() {
            self.music_volume
        } else {
            self.sfx_volume
        };
        self.master_volume * channel
    }

    /// Play a cue at the given audio time
    pub fn play(&mut self, cue: SoundCue, at: f64) {
        let vol = self.effective_volume(cue);
        if vol <= 0.0 {
            return;
        }
        self.sink.schedule(cue, at, vol);
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }
}

/// A beat event queued ahead of time
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScheduledCue {
    pub cue: SoundCue,
    pub at: f64,
}

/// Background beat scheduler, one per session.
///
/// Each `pump` queues every event that falls before `now + lookahead`. A
/// stopped scheduler never emits, so a finished session cannot leak beats
/// into the next one.
#[derive(Debug, Clone)]
pub struct LookaheadScheduler {
    /// Seconds between events (eighth notes)
    step: f64,
    lookahead: f64,
    origin: f64,
    next_index: u64,
    running: bool,
}

impl LookaheadScheduler {
    pub fn new(bpm: f64, lookahead: f64) -> Self {
        Self {
            step: 60.0 / bpm / 2.0,
            lookahead,
            origin: 0.0,
            next_index: 0,
            running: false,
        }
    }

    /// Begin the pattern with its first downbeat at `origin` (audio time)
    pub fn start(&mut self, origin: f64) {
        self.origin = origin;
        self.next_index = 0;
        self.running = true;
    }

    pub fn stop(&mut self) {
        self.running = false;
    }

    /// Back to a fresh, stopped scheduler
    pub fn reset(&mut self) {
        self.running = false;
        self.origin = 0.0;
        self.next_index = 0;
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Audio time of the next event that has not been queued yet
    pub fn next_time(&self) -> f64 {
        self.origin + self.next_index as f64 * self.step
    }

    /// Queue everything inside the look-ahead window
    pub fn pump(&mut self, now: f64) -> Vec<ScheduledCue> {
        let mut queued = Vec::new();
        if !self.running {
            return queued;
        }
        if self.next_time() < now {
            // Beats that fell behind the clock (a stall) are dropped, not burst out
            let first_due = ((now - self.origin) / self.step).ceil().max(0.0) as u64;
            log::debug!("Skipping {} late beats", first_due.saturating_sub(self.next_index));
            self.next_index = self.next_index.max(first_due);
        }
        let horizon = now + self.lookahead;
        while self.next_time() < horizon {
            let cue = if self.next_index % 2 == 0 {
                SoundCue::Kick
            } else {
                SoundCue::HiHat
            };
            queued.push(ScheduledCue {
                cue,
                at: self.next_time(),
            });
            self.next_index += 1;
        }
        queued
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scheduler_queues_only_inside_the_window() {
        // 120 bpm -> eighth notes every 0.25 s
        let mut sched = LookaheadScheduler::new(120.0, 0.1);
        sched.start(1.0);

        assert!(sched.pump(0.5).is_empty());
        let first = sched.pump(0.95);
        assert_eq!(
            first,
            vec![ScheduledCue {
                cue: SoundCue::Kick,
                at: 1.0
            }]
        );
        // Nothing is queued twice
        assert!(sched.pump(0.95).is_empty());

        let next = sched.pump(1.2);
        assert_eq!(
            next,
            vec![ScheduledCue {
                cue: SoundCue::HiHat,
                at: 1.25
            }]
        );
        let next = sched.pump(1.45);
        assert_eq!(next.len(), 1);
        assert_eq!(next[0].cue, SoundCue::Kick);
        assert_eq!(next[0].at, 1.5);
    }

    #[test]
    fn stall_drops_beats_behind_the_clock() {
        let mut sched = LookaheadScheduler::new(100.0, 0.1);
        sched.start(0.0);
        assert_eq!(sched.pump(0.0).len(), 1);

        let late = sched.pump(10.0);
        assert!(late.len() <= 1, "{} cues after the stall", late.len());
        assert!(late.iter().all(|c| c.at >= 10.0 && c.at < 10.1));
        // The pattern keeps its place on the grid
        let step = 60.0 / 100.0 / 2.0;
        let next = sched.next_time();
        assert!(next >= 10.0);
        assert!(((next / step).round() * step - next).abs() < 1e-9);
    }

    #[test]
    fn stopped_scheduler_is_silent() {
        let mut sched = LookaheadScheduler::new(100.0, 0.1);
        assert!(sched.pump(10.0).is_empty());
        sched.start(0.0);
        assert!(!sched.pump(0.0).is_empty());
        sched.stop();
        assert!(sched.pump(50.0).is_empty());
        sched.reset();
        assert!(!sched.is_running());
        assert_eq!(sched.next_time(), 0.0);
    }

    #[test]
    fn manager_applies_channel_volumes_and_mute() {
        let mut audio = AudioManager::new(RecordingAudio::default());
        let settings = Settings {
            master_volume: 0.5,
            sfx_volume: 1.0,
            music_volume: 0.0,
            ..Settings::default()
        };
        audio.apply_settings(&settings);

        audio.play(SoundCue::Squeal, 0.0);
        audio.play(SoundCue::Kick, 0.0);
        assert_eq!(audio.sink().played, vec![(SoundCue::Squeal, 0.0, 0.5)]);

        audio.set_muted(true);
        audio.play(SoundCue::Squeal, 1.0);
        assert_eq!(audio.sink().count(SoundCue::Squeal), 1);
    }
}
