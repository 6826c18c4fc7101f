//! Clock sources
//!
//! Two named clocks drive the arcade: the frame clock paces simulation steps,
//! the audio clock is the only authority for rhythm-game timing. Both are
//! injected through [`ClockSource`] so tests and headless runs can drive time
//! by hand.

use std::cell::Cell;
use std::rc::Rc;
use std::time::Instant;

/// Monotonic time provider in seconds
pub trait ClockSource {
    fn now(&self) -> f64;
}

/// Wall clock measured from construction
#[derive(Debug, Clone)]
pub struct WallClock {
    origin: Instant,
}

impl Default for WallClock {
    fn default() -> Self {
        Self::new()
    }
}

impl WallClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl ClockSource for WallClock {
    fn now(&self) -> f64 {
        self.origin.elapsed().as_secs_f64()
    }
}

/// Hand-driven clock. Clones share the same time value.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    time: Rc<Cell<f64>>,
}

impl ManualClock {
    pub fn new(start: f64) -> Self {
        Self {
            time: Rc::new(Cell::new(start)),
        }
    }

    /// Move time forward. Negative deltas are ignored to keep the clock monotonic.
    pub fn advance(&self, dt: f64) {
        if dt > 0.0 {
            self.time.set(self.time.get() + dt);
        }
    }

    pub fn set(&self, t: f64) {
        if t > self.time.get() {
            self.time.set(t);
        }
    }
}

impl ClockSource for ManualClock {
    fn now(&self) -> f64 {
        self.time.get()
    }
}

/// Audio-hardware clock that starts on the first audio-producing action.
///
/// Until [`AudioClock::start`] is called, `now()` reports `0.0`.
pub struct AudioClock {
    source: Box<dyn ClockSource>,
    origin: Cell<Option<f64>>,
}

impl AudioClock {
    pub fn new(source: Box<dyn ClockSource>) -> Self {
        Self {
            source,
            origin: Cell::new(None),
        }
    }

    /// Start counting. Later calls keep the original origin.
    pub fn start(&self) {
        if self.origin.get().is_none() {
            self.origin.set(Some(self.source.now()));
        }
    }

    pub fn is_running(&self) -> bool {
        self.origin.get().is_some()
    }
}

impl ClockSource for AudioClock {
    fn now(&self) -> f64 {
        match self.origin.get() {
            Some(origin) => self.source.now() - origin,
            None => 0.0,
        }
    }
}

/// The two clocks the arcade runs on
pub struct Clocks {
    /// Paces simulation steps
    pub frame: Box<dyn ClockSource>,
    /// Beat alignment for the rhythm game. `None` when no audio device exists.
    pub audio: Option<AudioClock>,
}

impl Clocks {
    pub fn new(frame: Box<dyn ClockSource>, audio: Option<AudioClock>) -> Self {
        Self { frame, audio }
    }

    /// Wall-clock frame timer plus a wall-derived audio clock
    pub fn system() -> Self {
        Self {
            frame: Box::new(WallClock::new()),
            audio: Some(AudioClock::new(Box::new(WallClock::new()))),
        }
    }

    /// Start the audio clock if one exists
    pub fn start_audio(&self) {
        if let Some(audio) = &self.audio {
            audio.start();
        }
    }

    /// Audio time, or frame time when running without an audio clock
    pub fn audio_now(&self) -> f64 {
        match &self.audio {
            Some(audio) => audio.now(),
            None => self.frame.now(),
        }
    }

    pub fn has_audio(&self) -> bool {
        self.audio.is_some()
    }
}
