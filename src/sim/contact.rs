/// Contact resolver: what happens when the player touches something.
///
/// | Other entity | Effect                                                   |
/// |--------------|----------------------------------------------------------|
/// | Vortex       | freeze, game over, score −1, swallow → respawn           |
/// | Star         | remove star, score +1                                    |
/// | Teleporter   | freeze, disable partner's body, sink → reappear → resume |
/// | Goal         | freeze, sink → next level                                |
/// | anything else| nothing (walls are handled by physics)                   |
///
/// Contacts that do not involve the player are ignored. So are contacts that
/// would start a second staged effect while one is already playing.

use crate::domain::entity::{EntityId, PlayerState};
use crate::domain::tile::Category;
use crate::sim::action::ActionSequence;
use crate::sim::event::GameEvent;
use crate::sim::world::LevelSession;

pub fn on_contact(session: &mut LevelSession, a: EntityId, b: EntityId, events: &mut Vec<GameEvent>) {
    let other = if session.is_player(a) {
        b
    } else if session.is_player(b) {
        a
    } else {
        return;
    };
    player_collided(session, other, events);
}

fn player_collided(session: &mut LevelSession, other: EntityId, events: &mut Vec<GameEvent>) {
    let Some(entity) = session.entity(other) else { return };
    match entity.category {
        Category::Vortex => hit_vortex(session, other, events),
        Category::Star => collect_star(session, other, events),
        Category::Teleporter => enter_teleporter(session, other, events),
        Category::Goal => reach_goal(session, other, events),
        Category::Wall | Category::Player => {}
    }
}

// ══════════════════════════════════════════════════════════════
// Effects
// ══════════════════════════════════════════════════════════════

fn hit_vortex(session: &mut LevelSession, vortex: EntityId, events: &mut Vec<GameEvent>) {
    if session.is_busy() { return; }
    let Some(at) = session.entity(vortex).map(|e| e.pos) else { return };

    freeze_player(session);
    session.game_over = true;
    session.score -= 1;
    session.player_state = PlayerState::Dying;
    session.action = Some(ActionSequence::swallow(at, session.action_secs));
    session.set_message("Swallowed by a vortex!  -1", 90);
    log::info!("player swallowed at {at}, score {}", session.score);
    events.push(GameEvent::PlayerSwallowed { at });
}

fn collect_star(session: &mut LevelSession, star: EntityId, events: &mut Vec<GameEvent>) {
    let Some(removed) = session.remove_entity(star) else { return };
    session.score += 1;
    log::debug!("star collected at {}, score {}", removed.pos, session.score);
    events.push(GameEvent::StarCollected { at: removed.pos });
}

fn enter_teleporter(session: &mut LevelSession, entry: EntityId, events: &mut Vec<GameEvent>) {
    if session.is_busy() { return; }
    let Some(exit) = session.partner_of(entry) else {
        log::debug!("teleporter {:?} has no partner, ignoring", entry);
        return;
    };
    let (Some(from), Some(to)) = (
        session.entity(entry).map(|e| e.pos),
        session.entity(exit).map(|e| e.pos),
    ) else {
        return;
    };

    freeze_player(session);
    // The destination never fires again.
    if let Some(dest) = session.entity_mut(exit) {
        dest.body = None;
    }
    session.player_state = PlayerState::InTransit;
    session.action = Some(ActionSequence::teleport(from, to, session.action_secs));
    log::info!("teleporting {from} -> {to}");
    events.push(GameEvent::Teleported { from, to });
}

fn reach_goal(session: &mut LevelSession, goal: EntityId, events: &mut Vec<GameEvent>) {
    if session.is_busy() { return; }
    let Some(at) = session.entity(goal).map(|e| e.pos) else { return };

    freeze_player(session);
    session.player_state = PlayerState::Advancing;
    session.action = Some(ActionSequence::finish(at, session.action_secs));
    session.set_message("Level complete!", 90);
    log::info!("goal reached in `{}` with score {}", session.level_name, session.score);
    events.push(GameEvent::GoalReached { at });
}

fn freeze_player(session: &mut LevelSession) {
    if let Some(p) = session.player.as_mut() {
        p.freeze();
    }
}

// ══════════════════════════════════════════════════════════════
// Unit tests
// ══════════════════════════════════════════════════════════════
