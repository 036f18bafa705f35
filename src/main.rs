//! Galactora headless driver
//!
//! Runs the campaign in real time against a scripted pilot thread that
//! taps the screen like a player would, logging progress as it goes.
//! Settings come from the JSON file named by `GALACTORA_SETTINGS` or the
//! first argument.

use std::thread;
use std::time::{Duration, Instant};

use glam::Vec2;

use galactora::consts::{SIM_DT, TICKS_PER_SECOND};
use galactora::sim::{GameEvent, GameState, InputError, InputEvent, InputSender, LevelDescriptor, tick};
use galactora::{FrameClock, Settings, Viewport};

/// Screen the pilot pretends to touch
const SCREEN: Vec2 = Vec2::new(1080.0, 1920.0);
/// Time between pilot touches
const PILOT_STEP: Duration = Duration::from_millis(100);

fn main() {
    env_logger::init();

    let settings = match std::env::var("GALACTORA_SETTINGS")
        .ok()
        .or_else(|| std::env::args().nth(1))
    {
        Some(path) => Settings::load_or_default(path),
        None => Settings::default(),
    };
    let campaign = match LevelDescriptor::campaign() {
        Ok(campaign) => campaign,
        Err(e) => {
            log::error!("Failed to load campaign: {e}");
            std::process::exit(1);
        }
    };

    let mut state = GameState::from_settings(&settings, campaign);
    let pilot = spawn_pilot(state.input_sender(), settings.run_seconds);

    let mut clock = FrameClock::new(settings.max_frame_skips);
    let run_ticks = u64::from(settings.run_seconds) * u64::from(TICKS_PER_SECOND);
    let frame = Duration::from_secs_f32(SIM_DT);
    let mut level_index = state.level_index;
    let mut last_frame = Instant::now();

    while state.time_ticks < run_ticks && !state.game_over {
        let now = Instant::now();
        let ticks = clock.advance((now - last_frame).as_secs_f32());
        last_frame = now;

        for _ in 0..ticks {
            tick(&mut state);
        }

        if state.level_index != level_index {
            level_index = state.level_index;
            log::info!("Reached level {} with score {}", level_index + 1, state.score);
        }
        for event in state.take_events() {
            if let GameEvent::LevelText(text) = event {
                log::debug!("{} {}", text.command, text.parameter.unwrap_or_default());
            }
        }

        thread::sleep(frame.saturating_sub(now.elapsed()));
    }

    if clock.dropped_ticks() > 0 {
        log::warn!("Dropped {} ticks while catching up", clock.dropped_ticks());
    }
    log::info!(
        "Stopped after {} ticks: {} enemies on screen, {} bodies",
        state.time_ticks,
        state.enemies.len(),
        state.world.len()
    );
    println!(
        "seed {} | level {} | score {}{}",
        state.seed,
        state.level_index + 1,
        state.score,
        if state.game_over { " | victory" } else { "" }
    );

    // Dropping the game disconnects the pilot
    drop(state);
    if pilot.join().is_err() {
        log::error!("Pilot thread panicked");
    }
}

/// Touch script: switch on auto-fire, weave across the screen and lob a bomb every few seconds
fn spawn_pilot(sender: InputSender, run_seconds: u32) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        let viewport = Viewport::new(SCREEN.x, SCREEN.y);
        let auto_fire = viewport.to_game(Vec2::new(SCREEN.x / 2.0, SCREEN.y * 0.86));
        let bomb = viewport.to_game(Vec2::new(SCREEN.x * 0.2, SCREEN.y * 0.88));
        let steps = u64::from(run_seconds) * 1000 / PILOT_STEP.as_millis() as u64;

        let send = |event: InputEvent| match sender.try_send(event) {
            Ok(()) | Err(InputError::Full) => true,
            Err(InputError::Disconnected) => false,
        };

        if !send(InputEvent::press(auto_fire)) || !send(InputEvent::release(auto_fire)) {
            return;
        }
        for step in 0..steps {
            thread::sleep(PILOT_STEP);
            let t = step as f32 * PILOT_STEP.as_secs_f32();

            let sent = match step % 40 {
                30 => send(InputEvent::press(bomb)),
                31..=37 => true,
                38 => send(InputEvent::release(bomb)),
                _ => {
                    let x = SCREEN.x * (0.5 + 0.35 * (t * 0.8).sin());
                    let touch = viewport.to_game(Vec2::new(x, SCREEN.y * 0.7));
                    send(InputEvent::press(touch))
                }
            };
            if !sent {
                log::debug!("Game gone, pilot stopping");
                return;
            }
        }
    })
}
