//! End-of-run commentary
//!
//! A provider turns a final score into a one-line quip. Providers may be slow
//! (a remote model), so the [`CommentaryDesk`] runs them on a worker thread
//! and picks the answer up on a later frame. Every request is tagged with a
//! generation; restarting bumps it, and answers for an older generation are
//! thrown away instead of landing on the new run's screen.

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, Sender, unbounded};

/// Shown when the provider has nothing usable
pub const FALLBACK_LINE: &str = "The commentator wandered off to graze. No comment for now.";
const UNAVAILABLE_LINE: &str = "Couldn't reach the commentator, but you played great!";
const SPEECHLESS_LINE: &str = "The calf is too tired to say a word!";

#[derive(Debug, thiserror::Error)]
pub enum CommentaryError {
    /// No provider configured (missing credentials, offline build)
    #[error("commentary provider unavailable")]
    Unavailable,
    #[error("commentary provider returned no text")]
    Empty,
    #[error("commentary provider failed: {0}")]
    Provider(String),
}

impl CommentaryError {
    /// Line shown to the player instead of the failed commentary
    pub fn fallback_line(&self) -> &'static str {
        match self {
            CommentaryError::Unavailable => UNAVAILABLE_LINE,
            CommentaryError::Empty => SPEECHLESS_LINE,
            CommentaryError::Provider(_) => FALLBACK_LINE,
        }
    }
}

/// Produces a short remark about a finished run
pub trait CommentaryProvider: Send + Sync {
    /// `max_score` is roughly what an excellent run scores in this game
    fn commentate(&self, score: u64, max_score: u64) -> Result<String, CommentaryError>;
}

/// Offline provider with a fixed line per performance bracket
#[derive(Debug, Default, Clone, Copy)]
pub struct CannedCommentary;

impl CommentaryProvider for CannedCommentary {
    fn commentate(&self, score: u64, max_score: u64) -> Result<String, CommentaryError> {
        let ratio = if max_score == 0 {
            0.0
        } else {
            score as f64 / max_score as f64
        };
        let line = if ratio >= 1.0 {
            "Unbelievable! This calf has the strength of a prize bull."
        } else if ratio >= 0.6 {
            "Strong showing. The pigs will be talking about this one for weeks."
        } else if ratio >= 0.3 {
            "Not bad, little one. The barn is mildly impressed."
        } else if score > 0 {
            "The piglets ran faster than the calf today. Ouch."
        } else {
            "Did anyone actually show up? The pigs are laughing."
        };
        Ok(line.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommentaryState {
    Idle,
    Loading,
    Ready(String),
}

impl CommentaryState {
    pub fn text(&self) -> Option<&str> {
        match self {
            CommentaryState::Ready(text) => Some(text),
            _ => None,
        }
    }

    pub fn is_loading(&self) -> bool {
        *self == CommentaryState::Loading
    }
}

struct Reply {
    generation: u64,
    text: String,
}

/// Runs a provider off the game thread and hands back the latest answer
pub struct CommentaryDesk {
    provider: Arc<dyn CommentaryProvider>,
    tx: Sender<Reply>,
    rx: Receiver<Reply>,
    generation: u64,
    state: CommentaryState,
}

impl CommentaryDesk {
    pub fn new(provider: Arc<dyn CommentaryProvider>) -> Self {
        let (tx, rx) = unbounded();
        Self {
            provider,
            tx,
            rx,
            generation: 0,
            state: CommentaryState::Idle,
        }
    }

    pub fn state(&self) -> &CommentaryState {
        &self.state
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Ask for commentary on a finished run. Supersedes any request in flight.
    pub fn request(&mut self, score: u64, max_score: u64) {
        self.generation += 1;
        self.state = CommentaryState::Loading;

        let generation = self.generation;
        let provider = Arc::clone(&self.provider);
        let tx = self.tx.clone();
        let spawned = thread::Builder::new()
            .name("commentary".into())
            .spawn(move || {
                let text = resolve_line(provider.commentate(score, max_score));
                // Receiver gone means the desk was dropped; nobody is waiting
                let _ = tx.send(Reply { generation, text });
            });

        if let Err(e) = spawned {
            log::warn!("Could not start commentary worker: {e}");
            self.state = CommentaryState::Ready(FALLBACK_LINE.to_string());
        }
    }

    /// Forget the current request. Its answer will be dropped on arrival.
    pub fn cancel(&mut self) {
        self.generation += 1;
        self.state = CommentaryState::Idle;
    }

    /// Drain finished answers without blocking
    pub fn poll(&mut self) -> &CommentaryState {
        while let Ok(reply) = self.rx.try_recv() {
            self.accept(reply);
        }
        &self.state
    }

    /// Block until the current request is answered or `timeout` passes
    pub fn wait(&mut self, timeout: Duration) -> &CommentaryState {
        let deadline = Instant::now() + timeout;
        while self.state.is_loading() {
            let left = deadline.saturating_duration_since(Instant::now());
            match self.rx.recv_timeout(left) {
                Ok(reply) => self.accept(reply),
                Err(_) => break,
            }
        }
        &self.state
    }

    fn accept(&mut self, reply: Reply) {
        if reply.generation != self.generation || !self.state.is_loading() {
            log::debug!(
                "Dropping stale commentary (generation {}, current {})",
                reply.generation,
                self.generation
            );
            return;
        }
        self.state = CommentaryState::Ready(reply.text);
    }
}

fn resolve_line(result: Result<String, CommentaryError>) -> String {
    match result {
        Ok(text) if !text.trim().is_empty() => text.trim().to_string(),
        Ok(_) => CommentaryError::Empty.fallback_line().to_string(),
        Err(e) => {
            log::warn!("Commentary failed: {e}");
            e.fallback_line().to_string()
        }
    }
}
