/// Events emitted during a simulation step.
/// The presentation layer consumes these for sound and HUD messages.

use glam::Vec2;

#[derive(Clone, Debug, PartialEq)]
pub enum GameEvent {
    StarCollected { at: Vec2 },
    PlayerSwallowed { at: Vec2 },
    PlayerRespawned,
    Teleported { from: Vec2, to: Vec2 },
    GoalReached { at: Vec2 },
    LevelLoaded { name: String },
}
