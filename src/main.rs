/// Entry point and game loop.

mod config;
mod domain;
mod sim;
mod ui;

use std::path::Path;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};

use config::GameConfig;
use domain::entity::FrameInput;
use sim::event::GameEvent;
use sim::level::LevelLibrary;
use sim::step;
use sim::world::LevelSession;
use ui::gamepad::GamepadState;
use ui::input::{InputState, QUIT, RESTART};
use ui::renderer::Renderer;
use ui::sound::SoundEngine;

const FRAME_SLEEP: Duration = Duration::from_millis(5);

fn main() {
    let config = GameConfig::load();

    if let Err(e) = init_logging(&config.log_file) {
        eprintln!("Logging disabled: {e:#}");
    }
    log::info!("Vortex Maze {} starting", env!("CARGO_PKG_VERSION"));
    for note in &config.notes {
        log::info!("{note}");
    }

    match run(&config) {
        Ok(score) => {
            log::info!("exited normally, final score {score}");
            println!();
            println!("Thanks for playing Vortex Maze!");
            println!("Final Score: {score}");
        }
        Err(e) => {
            log::error!("{e:#}");
            eprintln!("Error: {e:#}");
            std::process::exit(1);
        }
    }
}

/// Send log output to `path`; stderr would tear up the alternate screen.
/// `RUST_LOG` overrides the default `info` filter.
fn init_logging(path: &Path) -> Result<()> {
    let file = std::fs::File::create(path)
        .with_context(|| format!("Creating log file {}", path.display()))?;
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Pipe(Box::new(file)))
        .format_timestamp_millis()
        .try_init()
        .context("Installing logger")?;
    Ok(())
}

/// Load the first level, then play until the user quits. Returns the
/// final score. The terminal is restored whether or not play fails.
fn run(config: &GameConfig) -> Result<i32> {
    let library = LevelLibrary::from_config(config);
    let mut session = LevelSession::from_config(config);
    session.start(&library).context("Starting the first level")?;

    let mut renderer = Renderer::new();
    if let Err(e) = renderer.init() {
        // Raw mode may already be on.
        let _ = renderer.cleanup();
        return Err(e).context("Terminal init failed");
    }

    let sound = SoundEngine::new();

    let result = game_loop(&mut session, &library, &mut renderer, sound.as_ref(), config);

    if let Err(e) = renderer.cleanup() {
        eprintln!("Terminal cleanup failed: {e}");
    }

    result.map(|()| session.score)
}

fn game_loop(
    session: &mut LevelSession,
    library: &LevelLibrary,
    renderer: &mut Renderer,
    sound: Option<&SoundEngine>,
    config: &GameConfig,
) -> Result<()> {
    let mut kb = InputState::new();
    kb.honor_release = renderer.reports_key_release();
    let mut gp = GamepadState::new();
    gp.load_button_config(&config.gamepad);
    log::info!("gamepad connected: {}", gp.connected);

    let tick_rate = Duration::from_millis(config.timing.tick_rate_ms);
    let dt = tick_rate.as_secs_f32();
    let mut last_tick = Instant::now();

    loop {
        kb.drain_events();
        gp.update();

        if kb.ctrl_c_pressed() || kb.any_pressed(QUIT) || gp.quit_pressed() {
            log::info!("quit requested");
            break;
        }

        if kb.any_pressed(RESTART) || gp.restart_pressed() {
            log::info!("restart requested");
            let events = session.start(library).context("Restarting")?;
            process_sound_events(sound, &events);
            last_tick = Instant::now();
        }

        if last_tick.elapsed() >= tick_rate {
            let frame_input = FrameInput {
                touch: kb.pointer().and_then(|(col, row)| renderer.screen_to_world(col, row)),
                tilt: kb.tilt().or_else(|| gp.tilt()),
            };
            let events = step::step(session, frame_input, dt, library)
                .with_context(|| format!("Advancing from level `{}`", session.level_name))?;
            process_sound_events(sound, &events);
            last_tick = Instant::now();
        }

        renderer.render(session).context("Drawing frame")?;
        std::thread::sleep(FRAME_SLEEP);
    }

    Ok(())
}

fn process_sound_events(sound: Option<&SoundEngine>, events: &[GameEvent]) {
    let sfx = match sound {
        Some(s) => s,
        None => return,
    };
    for event in events {
        match event {
            GameEvent::StarCollected { .. } => sfx.play_star(),
            GameEvent::PlayerSwallowed { .. } => sfx.play_vortex(),
            GameEvent::Teleported { .. } => sfx.play_teleport(),
            GameEvent::GoalReached { .. } => sfx.play_goal(),
            GameEvent::PlayerRespawned => sfx.play_respawn(),
            GameEvent::LevelLoaded { .. } => {}
        }
    }
}
