/// Physics layer: one dynamic ball against a field of static bodies.
///
/// ## Architecture
///
/// Two distinct concepts, queried separately:
///   1. COLLISION: bodies in the player's collision mask (walls) push the
///      ball out and absorb its inward velocity.
///   2. CONTACT  : bodies whose masks ask for it produce a begin-contact
///      the first frame they overlap the ball. Contacts never move anything.
///
/// ## Frozen player
///
/// A non-dynamic player is static. Static–static pairs never generate
/// contacts, so while an action animates the player nothing it passes over
/// can re-trigger.
///
/// ## Units
///
/// Positions are world units (a tile is 64). Gravity is expressed in
/// metres/s² like a device accelerometer and converted with
/// `points_per_meter`.

use std::collections::HashSet;

use glam::Vec2;

use super::entity::{Entity, EntityId, Player, Shape};
use crate::config::PhysicsConfig;

/// Ball displacement per substep, as a fraction of its radius.
const SUBSTEP_FRACTION: f32 = 0.25;
const MAX_SUBSTEPS: u32 = 32;
/// Push-out passes per substep (a ball can wedge into a corner).
const SOLVER_PASSES: usize = 3;

/// A begin-contact between two entities. The order carries no meaning;
/// the contact resolver works out which side is the player.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Contact {
    pub a: EntityId,
    pub b: EntityId,
}

/// Remembers which pairs overlapped last frame so each overlap is
/// reported exactly once, when it begins.
#[derive(Clone, Debug, Default)]
pub struct ContactTracker {
    touching: HashSet<(EntityId, EntityId)>,
}

impl ContactTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.touching.clear();
    }

    #[cfg(test)]
    pub fn is_touching(&self, a: EntityId, b: EntityId) -> bool {
        self.touching.contains(&pair_key(a, b))
    }
}

fn pair_key(a: EntityId, b: EntityId) -> (EntityId, EntityId) {
    if a <= b { (a, b) } else { (b, a) }
}

// ══════════════════════════════════════════════════════════════
// Step
// ══════════════════════════════════════════════════════════════

/// Advance the simulation by `dt` seconds and return the contacts that
/// began during it, in entity order.
pub fn step(
    player: Option<&mut Player>,
    entities: &[Entity],
    gravity: Vec2,
    dt: f32,
    cfg: &PhysicsConfig,
    tracker: &mut ContactTracker,
) -> Vec<Contact> {
    let player = match player {
        Some(p) if p.dynamic => p,
        _ => return vec![],
    };

    integrate(player, entities, gravity, dt, cfg);
    detect_contacts(player, entities, tracker)
}

fn integrate(player: &mut Player, entities: &[Entity], gravity: Vec2, dt: f32, cfg: &PhysicsConfig) {
    player.vel += gravity * cfg.points_per_meter * dt;
    player.vel *= 1.0 / (1.0 + cfg.linear_damping * dt);
    player.vel = player.vel.clamp_length_max(cfg.max_speed);

    let travel = player.vel.length() * dt;
    let max_move = (player.radius * SUBSTEP_FRACTION).max(f32::EPSILON);
    let substeps = ((travel / max_move).ceil() as u32).clamp(1, MAX_SUBSTEPS);
    let h = dt / substeps as f32;

    for _ in 0..substeps {
        player.pos += player.vel * h;
        for _ in 0..SOLVER_PASSES {
            if !resolve_walls(player, entities, cfg.restitution) {
                break;
            }
        }
    }
}

/// One push-out pass over every body the player collides with.
/// Returns whether anything was touched.
fn resolve_walls(player: &mut Player, entities: &[Entity], restitution: f32) -> bool {
    let mut hit = false;
    for e in entities {
        let body = match &e.body {
            Some(b) if player.body.collision & b.category != 0 => b,
            _ => continue,
        };
        let Some((normal, depth)) = penetration(player.pos, player.radius, e.pos, body.shape) else {
            continue;
        };
        hit = true;
        player.pos += normal * depth;
        let vn = player.vel.dot(normal);
        if vn < 0.0 {
            player.vel -= (1.0 + restitution) * vn * normal;
        }
    }
    hit
}

fn detect_contacts(player: &Player, entities: &[Entity], tracker: &mut ContactTracker) -> Vec<Contact> {
    let mut now_touching = HashSet::new();
    let mut began = vec![];

    for e in entities {
        let body = match &e.body {
            Some(b) if player.body.reports_contact_with(b) => b,
            _ => continue,
        };
        if !overlaps(player.pos, player.radius, e.pos, body.shape) {
            continue;
        }
        let key = pair_key(player.id, e.id);
        if !tracker.touching.contains(&key) {
            began.push(Contact { a: player.id, b: e.id });
        }
        now_touching.insert(key);
    }

    tracker.touching = now_touching;
    began
}

// ══════════════════════════════════════════════════════════════
// Shape queries
// ══════════════════════════════════════════════════════════════

/// Does a circle at `center` overlap `shape` placed at `at`?
pub fn overlaps(center: Vec2, radius: f32, at: Vec2, shape: Shape) -> bool {
    match shape {
        Shape::Circle { radius: r } => center.distance_squared(at) < (radius + r) * (radius + r),
        Shape::Rect { half } => {
            let closest = center.clamp(at - half, at + half);
            center.distance_squared(closest) < radius * radius
        }
    }
}

/// Push-out normal (pointing from the shape towards the circle) and depth.
/// `None` when the circle is clear of the shape.
pub fn penetration(center: Vec2, radius: f32, at: Vec2, shape: Shape) -> Option<(Vec2, f32)> {
    match shape {
        Shape::Circle { radius: r } => {
            let d = center - at;
            let dist = d.length();
            let reach = radius + r;
            if dist >= reach {
                return None;
            }
            let normal = if dist > f32::EPSILON { d / dist } else { Vec2::Y };
            Some((normal, reach - dist))
        }
        Shape::Rect { half } => {
            let min = at - half;
            let max = at + half;
            let closest = center.clamp(min, max);
            let d = center - closest;
            let dist_sq = d.length_squared();

            if dist_sq > f32::EPSILON {
                if dist_sq >= radius * radius {
                    return None;
                }
                let dist = dist_sq.sqrt();
                return Some((d / dist, radius - dist));
            }

            // Centre inside the rectangle: leave through the nearest face.
            let faces = [
                (center.x - min.x, Vec2::NEG_X),
                (max.x - center.x, Vec2::X),
                (center.y - min.y, Vec2::NEG_Y),
                (max.y - center.y, Vec2::Y),
            ];
            let (gap, normal) = faces
                .into_iter()
                .min_by(|a, b| a.0.total_cmp(&b.0))
                .unwrap_or((0.0, Vec2::Y));
            Some((normal, gap + radius))
        }
    }
}

// ══════════════════════════════════════════════════════════════
// Unit tests
// ══════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entity::EntityId;
    use crate::domain::tile::Category;

    const DT: f32 = 1.0 / 60.0;

    fn cfg() -> PhysicsConfig {
        PhysicsConfig::default()
    }

    fn player_at(x: f32, y: f32) -> Player {
        Player::new(EntityId(0), Vec2::new(x, y), 28.0)
    }

    fn piece(id: u32, cat: Category, x: f32, y: f32) -> Entity {
        Entity::new(EntityId(id), cat, Vec2::new(x, y), 30.0)
    }

    // ── shape queries ──

    #[test]
    fn circle_circle_overlap() {
        let s = Shape::Circle { radius: 10.0 };
        assert!(overlaps(Vec2::ZERO, 10.0, Vec2::new(19.0, 0.0), s));
        assert!(!overlaps(Vec2::ZERO, 10.0, Vec2::new(21.0, 0.0), s));
    }

    #[test]
    fn circle_rect_overlap_uses_closest_point() {
        let s = Shape::Rect { half: Vec2::splat(32.0) };
        // Corner at (32,32); circle centre diagonally away.
        assert!(!overlaps(Vec2::new(55.0, 55.0), 28.0, Vec2::ZERO, s));
        assert!(overlaps(Vec2::new(50.0, 0.0), 28.0, Vec2::ZERO, s));
    }

    #[test]
    fn penetration_points_away_from_wall() {
        let s = Shape::Rect { half: Vec2::splat(32.0) };
        let (n, depth) = penetration(Vec2::new(50.0, 0.0), 28.0, Vec2::ZERO, s).unwrap();
        assert_eq!(n, Vec2::X);
        assert!((depth - 10.0).abs() < 1e-4);
    }

    #[test]
    fn penetration_from_inside_rect_picks_nearest_face() {
        let s = Shape::Rect { half: Vec2::splat(32.0) };
        let (n, depth) = penetration(Vec2::new(0.0, 30.0), 10.0, Vec2::ZERO, s).unwrap();
        assert_eq!(n, Vec2::Y);
        assert!((depth - 12.0).abs() < 1e-4);
    }

    // ── integration ──

    #[test]
    fn gravity_accelerates_the_ball() {
        let mut p = player_at(500.0, 500.0);
        let mut tracker = ContactTracker::new();
        step(Some(&mut p), &[], Vec2::new(1.0, 0.0), DT, &cfg(), &mut tracker);
        assert!(p.vel.x > 0.0);
        assert!(p.pos.x > 500.0);
    }

    #[test]
    fn damping_slows_a_coasting_ball() {
        let mut p = player_at(500.0, 500.0);
        p.vel = Vec2::new(100.0, 0.0);
        let mut tracker = ContactTracker::new();
        step(Some(&mut p), &[], Vec2::ZERO, DT, &cfg(), &mut tracker);
        assert!(p.vel.x < 100.0 && p.vel.x > 90.0);
    }

    #[test]
    fn frozen_player_does_not_move() {
        let mut p = player_at(500.0, 500.0);
        p.freeze();
        let mut tracker = ContactTracker::new();
        let contacts = step(Some(&mut p), &[], Vec2::new(50.0, 0.0), DT, &cfg(), &mut tracker);
        assert!(contacts.is_empty());
        assert_eq!(p.pos, Vec2::new(500.0, 500.0));
    }

    #[test]
    fn ball_never_ends_a_step_inside_a_wall() {
        let wall = piece(1, Category::Wall, 160.0, 96.0);
        let mut p = player_at(96.0, 96.0);
        let mut tracker = ContactTracker::new();
        for _ in 0..240 {
            step(Some(&mut p), std::slice::from_ref(&wall), Vec2::new(50.0, 0.0), DT, &cfg(), &mut tracker);
            let shape = wall.body.unwrap().shape;
            assert!(penetration(p.pos, p.radius, wall.pos, shape).map_or(true, |(_, d)| d < 0.5));
        }
        // Pinned against the left face.
        assert!((p.pos.x - (128.0 - 28.0)).abs() < 1.0);
    }

    #[test]
    fn fast_ball_does_not_tunnel_through_a_wall() {
        let wall = piece(1, Category::Wall, 160.0, 96.0);
        let mut p = player_at(60.0, 96.0);
        p.vel = Vec2::new(3000.0, 0.0);
        let mut tracker = ContactTracker::new();
        step(Some(&mut p), std::slice::from_ref(&wall), Vec2::ZERO, 0.05, &cfg(), &mut tracker);
        assert!(p.pos.x < 128.0);
    }

    #[test]
    fn stars_do_not_block_the_ball() {
        let star = piece(1, Category::Star, 96.0, 96.0);
        let mut p = player_at(96.0, 96.0);
        let mut tracker = ContactTracker::new();
        step(Some(&mut p), std::slice::from_ref(&star), Vec2::ZERO, DT, &cfg(), &mut tracker);
        assert_eq!(p.pos, Vec2::new(96.0, 96.0));
    }

    // ── contacts ──

    #[test]
    fn contact_reported_once_per_overlap() {
        let star = piece(7, Category::Star, 96.0, 96.0);
        let mut p = player_at(96.0, 96.0);
        let mut tracker = ContactTracker::new();
        let entities = std::slice::from_ref(&star);

        let first = step(Some(&mut p), entities, Vec2::ZERO, DT, &cfg(), &mut tracker);
        assert_eq!(first, vec![Contact { a: EntityId(0), b: EntityId(7) }]);
        let second = step(Some(&mut p), entities, Vec2::ZERO, DT, &cfg(), &mut tracker);
        assert!(second.is_empty());
        assert!(tracker.is_touching(EntityId(7), EntityId(0)));

        // Leave and come back: a new begin.
        p.pos = Vec2::new(400.0, 400.0);
        step(Some(&mut p), entities, Vec2::ZERO, DT, &cfg(), &mut tracker);
        p.pos = Vec2::new(96.0, 96.0);
        let again = step(Some(&mut p), entities, Vec2::ZERO, DT, &cfg(), &mut tracker);
        assert_eq!(again.len(), 1);
    }

    #[test]
    fn walls_never_report_contacts() {
        let wall = piece(1, Category::Wall, 96.0, 96.0);
        let mut p = player_at(96.0 + 50.0, 96.0);
        let mut tracker = ContactTracker::new();
        let contacts = step(Some(&mut p), std::slice::from_ref(&wall), Vec2::ZERO, DT, &cfg(), &mut tracker);
        assert!(contacts.is_empty());
    }

    #[test]
    fn bodyless_entity_is_invisible() {
        let mut tele = piece(3, Category::Teleporter, 96.0, 96.0);
        tele.body = None;
        let mut p = player_at(96.0, 96.0);
        let mut tracker = ContactTracker::new();
        let contacts = step(Some(&mut p), std::slice::from_ref(&tele), Vec2::ZERO, DT, &cfg(), &mut tracker);
        assert!(contacts.is_empty());
    }
}
