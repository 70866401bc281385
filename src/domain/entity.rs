/// Entities: level pieces (walls, stars, vortices, teleporters, goal) and
/// the player ball. Level pieces are static; the player is the only body
/// the physics step moves.

use glam::Vec2;

use super::tile::Category;

/// Side of one square tile, in world units.
pub const TILE_SIZE: f32 = 64.0;
/// Offset from a tile's corner to its centre.
pub const HALF_TILE: f32 = 32.0;
/// Where every fresh player appears unless config overrides it.
pub const DEFAULT_START: Vec2 = Vec2::new(96.0, 672.0);
/// Scale the player shrinks to when it disappears into something.
pub const VANISH_SCALE: f32 = 0.0001;

/// Session-unique handle. Never reused, so a respawned player is a
/// different entity from the one that died.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct EntityId(pub u32);

/// Hands out fresh ids for one session.
#[derive(Clone, Debug, Default)]
pub struct EntityIds {
    next: u32,
}

impl EntityIds {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next(&mut self) -> EntityId {
        let id = EntityId(self.next);
        self.next += 1;
        id
    }
}

#[derive(Clone, Copy, PartialEq, Debug)]
pub enum Shape {
    Circle { radius: f32 },
    /// Axis-aligned rectangle, stored as half extents.
    Rect { half: Vec2 },
}

/// Physics body: shape plus the three bitmasks.
#[derive(Clone, Copy, PartialEq, Debug)]
pub struct Body {
    pub shape: Shape,
    pub category: u32,
    pub contact_test: u32,
    pub collision: u32,
}

impl Body {
    pub fn for_category(category: Category, shape: Shape) -> Self {
        Body {
            shape,
            category: category.bit(),
            contact_test: category.contact_test_mask(),
            collision: category.collision_mask(),
        }
    }

    /// Does either side want to hear about touching the other?
    pub fn reports_contact_with(&self, other: &Body) -> bool {
        self.contact_test & other.category != 0 || other.contact_test & self.category != 0
    }
}

/// A placed level piece.
#[derive(Clone, Debug)]
pub struct Entity {
    pub id: EntityId,
    pub category: Category,
    pub pos: Vec2,
    /// `None` once the body has been cleared (a used teleporter destination).
    pub body: Option<Body>,
    /// Paired teleporter, assigned by the loader.
    pub partner: Option<EntityId>,
}

impl Entity {
    /// Build the level piece for `category` centred on `pos`.
    /// Walls get a full-tile rectangle, everything else a circle.
    pub fn new(id: EntityId, category: Category, pos: Vec2, item_radius: f32) -> Self {
        let shape = match category {
            Category::Wall => Shape::Rect { half: Vec2::splat(HALF_TILE) },
            _ => Shape::Circle { radius: item_radius },
        };
        Entity {
            id,
            category,
            pos,
            body: Some(Body::for_category(category, shape)),
            partner: None,
        }
    }

    #[cfg(test)]
    pub fn is_static(&self) -> bool {
        self.category.is_static()
    }
}

/// Lifecycle of the player ball across contact effects.
/// Only `Alive` lets the physics step move the ball.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum PlayerState {
    Alive,
    Dying,
    Advancing,
    InTransit,
}

#[derive(Clone, Debug)]
pub struct Player {
    pub id: EntityId,
    pub pos: Vec2,
    pub vel: Vec2,
    pub scale: f32,
    pub radius: f32,
    /// Frozen (non-dynamic) bodies neither move nor generate contacts.
    pub dynamic: bool,
    pub body: Body,
}

impl Player {
    pub fn new(id: EntityId, pos: Vec2, radius: f32) -> Self {
        Player {
            id,
            pos,
            vel: Vec2::ZERO,
            scale: 1.0,
            radius,
            dynamic: true,
            body: Body::for_category(Category::Player, Shape::Circle { radius }),
        }
    }

    /// Stop the ball dead and take it out of the simulation.
    pub fn freeze(&mut self) {
        self.dynamic = false;
        self.vel = Vec2::ZERO;
    }
}

/// What the input layer hands the simulation once per frame.
/// `touch` is a world position; `tilt` is a device-tilt style vector
/// with each axis roughly in -1..=1.
#[derive(Clone, Copy, Debug, Default)]
pub struct FrameInput {
    pub touch: Option<Vec2>,
    pub tilt: Option<Vec2>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn walls_are_full_tile_rectangles() {
        let e = Entity::new(EntityId(1), Category::Wall, Vec2::new(32.0, 32.0), 30.0);
        let body = e.body.unwrap();
        assert_eq!(body.shape, Shape::Rect { half: Vec2::splat(32.0) });
        assert_eq!(body.category, Category::Wall.bit());
        assert!(e.is_static());
    }

    #[test]
    fn pickups_are_circles_that_only_sense_the_player() {
        let e = Entity::new(EntityId(2), Category::Star, Vec2::ZERO, 30.0);
        let body = e.body.unwrap();
        assert_eq!(body.shape, Shape::Circle { radius: 30.0 });
        assert_eq!(body.collision, 0);
        assert_eq!(body.contact_test, Category::Player.bit());
    }

    #[test]
    fn wall_and_player_do_not_report_contacts() {
        let p = Player::new(EntityId(0), Vec2::ZERO, 28.0);
        let wall = Entity::new(EntityId(1), Category::Wall, Vec2::ZERO, 30.0);
        let star = Entity::new(EntityId(2), Category::Star, Vec2::ZERO, 30.0);
        assert!(!p.body.reports_contact_with(&wall.body.unwrap()));
        assert!(p.body.reports_contact_with(&star.body.unwrap()));
    }

    #[test]
    fn freeze_kills_velocity() {
        let mut p = Player::new(EntityId(0), Vec2::ZERO, 28.0);
        p.vel = Vec2::new(10.0, -3.0);
        p.freeze();
        assert!(!p.dynamic);
        assert_eq!(p.vel, Vec2::ZERO);
    }
}
