/// The step function: advances the session by one frame.
///
/// Processing order:
///   1. Timers (tick, HUD message)
///   2. Gravity from input (skipped while game over)
///   3. Running action, then its completion (resume / respawn / next level)
///   4. Physics integration against static bodies
///   5. Begin-contacts, in the order physics reported them
///
/// A level that fails to load while advancing is returned as an error; the
/// session is left without a player and the caller is expected to stop.

use glam::Vec2;

use crate::config::PhysicsConfig;
use crate::domain::entity::{FrameInput, Player, PlayerState};
use crate::domain::physics;
use super::action::{Completion, Progress};
use super::contact::on_contact;
use super::event::GameEvent;
use super::level::{LevelError, LevelLibrary};
use super::world::LevelSession;

// ══════════════════════════════════════════════════════════════
// Main entry point
// ══════════════════════════════════════════════════════════════

pub fn step(
    session: &mut LevelSession,
    input: FrameInput,
    dt: f32,
    library: &LevelLibrary,
) -> Result<Vec<GameEvent>, LevelError> {
    let mut events: Vec<GameEvent> = Vec::new();
    session.tick += 1;

    if session.message_timer > 0 {
        session.message_timer -= 1;
        if session.message_timer == 0 { session.message.clear(); }
    }

    if !session.game_over {
        if let Some(g) = gravity_for(&input, session.player.as_ref(), &session.physics) {
            session.gravity = g;
        }
    }

    resolve_action(session, dt, library, &mut events)?;

    let contacts = physics::step(
        session.player.as_mut(),
        &session.entities,
        session.gravity,
        dt,
        &session.physics,
        &mut session.contacts,
    );
    for c in contacts {
        on_contact(session, c.a, c.b, &mut events);
    }

    Ok(events)
}

/// Gravity requested by this frame's input, if any.
/// A touch wins over tilt; with neither, gravity stays where it was.
pub fn gravity_for(input: &FrameInput, player: Option<&Player>, cfg: &PhysicsConfig) -> Option<Vec2> {
    if let Some(touch) = input.touch {
        let from = player.map_or(cfg.start, |p| p.pos);
        return Some((touch - from) / cfg.touch_divisor);
    }
    input.tilt.map(|t| t * cfg.tilt_scale)
}

// ══════════════════════════════════════════════════════════════
// Actions
// ══════════════════════════════════════════════════════════════

fn resolve_action(
    session: &mut LevelSession,
    dt: f32,
    library: &LevelLibrary,
    events: &mut Vec<GameEvent>,
) -> Result<(), LevelError> {
    let Some(action) = session.action.as_mut() else { return Ok(()) };
    let Progress::Finished(done) = action.advance(dt, &mut session.player) else {
        return Ok(());
    };
    session.action = None;

    match done {
        Completion::Resume => {
            session.player_state = PlayerState::Alive;
        }
        Completion::Respawn => {
            session.create_player();
            session.game_over = false;
            log::info!("player respawned");
            events.push(GameEvent::PlayerRespawned);
        }
        Completion::AdvanceLevel => {
            let next = library.next_after(&session.level_name).to_string();
            session.load(&next, library)?;
            session.create_player();
            events.push(GameEvent::LevelLoaded { name: next });
        }
    }
    Ok(())
}

// ══════════════════════════════════════════════════════════════
// Unit tests
// ══════════════════════════════════════════════════════════════
