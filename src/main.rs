//! Barnyard Arcade entry point
//!
//! Native headless build: the autopilot plays each requested game on a
//! simulated clock and a text renderer prints the HUD. Usage:
//!
//! ```text
//! barnyard-arcade [whack|rhythm|flight ...] [--seed N]
//! ```
//!
//! `BARNYARD_DATA` points at the directory holding `settings.json`,
//! `tuning.json` and `highscores.json` (defaults to the working directory).

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use barnyard_arcade::audio::LogAudio;
use barnyard_arcade::autopilot::Autopilot;
use barnyard_arcade::clock::{AudioClock, Clocks, ManualClock};
use barnyard_arcade::commentary::CannedCommentary;
use barnyard_arcade::sim::{RenderSink, Snapshot};
use barnyard_arcade::{Arcade, GameKind, JsonFileStore, Settings, Tuning};

/// Simulated display rate
const FPS: f64 = 60.0;
/// Give up on a run after this much simulated time
const MAX_RUN_SECONDS: f64 = 120.0;

/// Prints a HUD line about twice a second
struct TextHud {
    frames: u64,
}

impl RenderSink for TextHud {
    fn present(&mut self, snap: &Snapshot) {
        self.frames += 1;
        if self.frames % 30 != 0 && !snap.is_over() {
            return;
        }
        let mut line = format!(
            "[{:>6}] {:?} score {:>5} combo {:>3}",
            snap.game.as_str(),
            snap.phase,
            snap.score,
            snap.combo
        );
        if let Some(t) = snap.time_left {
            line.push_str(&format!(" time {t:>4.1}"));
        }
        if let Some(lives) = snap.lives {
            line.push_str(&format!(" lives {lives}"));
        }
        if let Some((tier, name)) = &snap.tier {
            line.push_str(&format!(" tier {tier} ({name})"));
        }
        if let Some(boss) = snap.boss {
            line.push_str(&format!(
                " boss {}/{} {:.1}s",
                boss.health, boss.max_health, boss.time_left
            ));
        }
        if snap.fever {
            line.push_str(" FEVER");
        }
        if snap.rush {
            line.push_str(" RUSH");
        }
        println!("{line}");
    }
}

fn parse_args() -> (Vec<GameKind>, u64) {
    let mut games = Vec::new();
    let mut seed = 12345;
    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        if arg == "--seed" {
            match args.next().and_then(|s| s.parse().ok()) {
                Some(s) => seed = s,
                None => log::warn!("--seed needs a number, keeping {seed}"),
            }
        } else if let Some(game) = GameKind::from_str(&arg) {
            games.push(game);
        } else {
            log::warn!("Unknown game '{arg}'");
        }
    }
    if games.is_empty() {
        games = GameKind::ALL.to_vec();
    }
    (games, seed)
}

fn main() {
    env_logger::init();
    log::info!("Barnyard Arcade (headless) starting...");

    let (games, seed) = parse_args();
    let data_dir = std::env::var_os("BARNYARD_DATA")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."));

    let settings = Settings::load(&data_dir.join("settings.json"));
    let tuning = match Tuning::load(&data_dir.join("tuning.json")) {
        Ok(tuning) => tuning,
        Err(e) => {
            log::info!("Using built-in tuning ({e})");
            Tuning::default()
        }
    };
    let store = JsonFileStore::open(data_dir.join("highscores.json"));

    let time = ManualClock::new(0.0);
    let clocks = Clocks::new(
        Box::new(time.clone()),
        Some(AudioClock::new(Box::new(time.clone()))),
    );
    let mut arcade = Arcade::new(clocks, LogAudio, Arc::new(CannedCommentary), Box::new(store))
        .with_tuning(tuning)
        .with_settings(settings)
        .with_seed(seed);
    let mut pilot = Autopilot::new(seed);
    let mut hud = TextHud { frames: 0 };

    for game in games {
        println!("=== {} (best {}) ===", game, arcade.best(game));
        arcade.start(game);

        let mut elapsed = 0.0;
        let mut snap = arcade.snapshot();
        while !snap.is_over() && elapsed < MAX_RUN_SECONDS {
            time.advance(1.0 / FPS);
            elapsed += 1.0 / FPS;
            snap = arcade.frame();
            hud.present(&snap);
            if let Some(action) = pilot.next_action(&snap) {
                arcade.press(action);
            }
        }

        if !snap.is_over() {
            log::warn!("{game} run did not finish within {MAX_RUN_SECONDS}s");
            continue;
        }
        if arcade.new_record() {
            println!("New high score: {}", snap.score);
        }
        match arcade.settle_commentary(Duration::from_secs(2)) {
            Some(line) => println!("Commentator: {line}"),
            None => println!("Commentator: ..."),
        }
    }
}
