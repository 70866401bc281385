/// LevelSession: the complete state of a running game.
///
/// ## Ownership
///
/// One session per process, owned by the frame loop and passed by `&mut`
/// to the step and the contact resolver. Nothing else holds game state.
///
/// ## Level boundaries
///
/// `load()` discards every level entity, the teleporter registry and the
/// contact memory before installing the next level. Score survives;
/// `start()` resets it.
///
/// ## Player
///
/// At most one player exists. Dying or finishing drops it; a fresh one with
/// a new id is created at `physics.start` afterwards.

use glam::Vec2;

use crate::config::{GameConfig, PhysicsConfig};
use crate::domain::entity::{Entity, EntityId, EntityIds, Player, PlayerState};
use crate::domain::physics::ContactTracker;
use crate::sim::action::ActionSequence;
use crate::sim::event::GameEvent;
use crate::sim::level::{load_level, LevelError, LevelLibrary};

pub struct LevelSession {
    // ── Level ──
    pub level_name: String,
    pub width: usize,
    pub height: usize,
    pub entities: Vec<Entity>,
    /// Teleporters of the current level, in load order.
    pub teleporters: Vec<EntityId>,

    // ── Player ──
    pub player: Option<Player>,
    pub player_state: PlayerState,
    /// Staged effect currently playing on the player.
    pub action: Option<ActionSequence>,

    // ── Game tracking ──
    pub score: i32,
    /// Set while the player is being swallowed; freezes input-driven gravity.
    pub game_over: bool,
    pub gravity: Vec2,
    pub tick: u64,

    // ── Physics ──
    pub physics: PhysicsConfig,
    pub contacts: ContactTracker,
    pub action_secs: f32,
    ids: EntityIds,

    // ── UI ──
    pub message: String,
    pub message_timer: u32,
}

// ── Construction ──

impl LevelSession {
    pub fn new(physics: PhysicsConfig, action_secs: f32) -> Self {
        LevelSession {
            level_name: String::new(),
            width: 0,
            height: 0,
            entities: vec![],
            teleporters: vec![],
            player: None,
            player_state: PlayerState::Alive,
            action: None,
            score: 0,
            game_over: false,
            gravity: Vec2::ZERO,
            tick: 0,
            physics,
            contacts: ContactTracker::new(),
            action_secs,
            ids: EntityIds::new(),
            message: String::new(),
            message_timer: 0,
        }
    }

    pub fn from_config(config: &GameConfig) -> Self {
        Self::new(config.physics.clone(), config.timing.action_secs)
    }

    pub fn set_message(&mut self, msg: &str, duration: u32) {
        self.message = msg.to_string();
        self.message_timer = duration;
    }
}

// ── Lifecycle ──

impl LevelSession {
    /// New game: score 0, first level, fresh player.
    pub fn start(&mut self, library: &LevelLibrary) -> Result<Vec<GameEvent>, LevelError> {
        self.score = 0;
        self.game_over = false;
        self.gravity = Vec2::ZERO;
        self.action = None;
        let first = library.first().to_string();
        self.load(&first, library)?;
        self.create_player();
        Ok(vec![GameEvent::LevelLoaded { name: first }])
    }

    /// Replace the current level with `name`. The player is dropped; call
    /// `create_player` afterwards.
    pub fn load(&mut self, name: &str, library: &LevelLibrary) -> Result<(), LevelError> {
        self.teleporters.clear();
        self.entities.clear();
        self.contacts.clear();
        self.player = None;

        let level = load_level(name, library, &mut self.ids)?;
        self.level_name = level.name;
        self.width = level.width;
        self.height = level.height;
        self.entities = level.entities;
        self.teleporters = level.teleporters;
        self.set_message(&format!("Level: {}", self.level_name), 120);
        Ok(())
    }

    /// Put a brand new player at the start position.
    pub fn create_player(&mut self) -> EntityId {
        let id = self.ids.next();
        self.player = Some(Player::new(id, self.physics.start, self.physics.player_radius));
        self.player_state = PlayerState::Alive;
        log::debug!("player {:?} created at {}", id, self.physics.start);
        id
    }
}

// ── Queries / mutation ──

impl LevelSession {
    pub fn is_player(&self, id: EntityId) -> bool {
        self.player.as_ref().map_or(false, |p| p.id == id)
    }

    pub fn entity(&self, id: EntityId) -> Option<&Entity> {
        self.entities.iter().find(|e| e.id == id)
    }

    pub fn entity_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.entities.iter_mut().find(|e| e.id == id)
    }

    pub fn remove_entity(&mut self, id: EntityId) -> Option<Entity> {
        let idx = self.entities.iter().position(|e| e.id == id)?;
        Some(self.entities.remove(idx))
    }

    /// Destination for a teleporter: its partner, if it still exists.
    pub fn partner_of(&self, id: EntityId) -> Option<EntityId> {
        let partner = self.entity(id)?.partner?;
        self.entity(partner).map(|e| e.id)
    }

    /// Is a contact effect currently playing?
    pub fn is_busy(&self) -> bool {
        self.action.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entity::DEFAULT_START;
    use crate::domain::tile::Category;

    fn library() -> LevelLibrary {
        LevelLibrary::new("/nonexistent-levels-dir", vec!["level1".into(), "level2".into()], 30.0)
    }

    fn session() -> LevelSession {
        LevelSession::new(PhysicsConfig::default(), 0.25)
    }

    #[test]
    fn start_loads_first_level_with_one_player() {
        let mut s = session();
        let events = s.start(&library()).unwrap();
        assert_eq!(events, vec![GameEvent::LevelLoaded { name: "level1".into() }]);
        assert_eq!(s.level_name, "level1");
        assert_eq!(s.width, 16);
        assert_eq!(s.height, 12);
        let p = s.player.as_ref().unwrap();
        assert_eq!(p.pos, DEFAULT_START);
        assert_eq!(s.player_state, PlayerState::Alive);
        assert_eq!(s.score, 0);
    }

    #[test]
    fn load_replaces_entities_and_registry() {
        let mut s = session();
        s.start(&library()).unwrap();
        let old_ids: Vec<EntityId> = s.entities.iter().map(|e| e.id).collect();
        s.score = 7;

        s.load("level2", &library()).unwrap();
        assert_eq!(s.level_name, "level2");
        assert!(s.player.is_none());
        assert_eq!(s.teleporters.len(), 2);
        assert!(s.entities.iter().all(|e| !old_ids.contains(&e.id)));
        assert_eq!(s.score, 7);
    }

    #[test]
    fn respawned_player_is_a_new_entity() {
        let mut s = session();
        s.start(&library()).unwrap();
        let first = s.player.as_ref().unwrap().id;
        let second = s.create_player();
        assert_ne!(first, second);
        assert!(s.is_player(second));
        assert!(!s.is_player(first));
    }

    #[test]
    fn failed_load_is_reported() {
        let mut s = session();
        assert!(matches!(s.load("nope", &library()), Err(LevelError::NotFound { .. })));
    }

    #[test]
    fn partner_lookup_follows_explicit_link() {
        let mut s = session();
        s.start(&library()).unwrap();
        s.load("level2", &library()).unwrap();
        let (a, b) = (s.teleporters[0], s.teleporters[1]);
        assert_eq!(s.partner_of(a), Some(b));
        assert_eq!(s.partner_of(b), Some(a));

        let star = s.entities.iter().find(|e| e.category == Category::Star).unwrap().id;
        assert_eq!(s.partner_of(star), None);
    }

    #[test]
    fn remove_entity_drops_it_once() {
        let mut s = session();
        s.start(&library()).unwrap();
        let id = s.entities[0].id;
        assert!(s.remove_entity(id).is_some());
        assert!(s.remove_entity(id).is_none());
        assert!(s.entity(id).is_none());
    }
}
