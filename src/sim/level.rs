/// Level loader.
///
/// ## Sources (priority order):
///   1. `levels/` directory (`<name>.txt`)
///   2. Built-in embedded levels (`level1`, `level2`)
///
/// ## Level format (`.txt`):
///   Rows of single-character tile codes, separated by `\n`.
///   No header, no metadata; the grid size is the row/column count.
///   The LAST text line is the bottom row of the screen.
///
/// ## Tile legend:
///   'x' = Wall        'v' = Vortex
///   's' = Star        'f' = Goal
///   't' = Teleporter  ' ' = Empty
///
/// Any other character is fatal.
///
/// ## Placement:
///   Column `c` of reversed row `r` lands at `(64*c + 32, 64*r + 32)`.
///
/// ## Teleporters:
///   Every teleporter goes into the level's registry in load order and is
///   linked to a partner: 1st↔2nd, 3rd↔4th, … An odd one out stays unpaired.

use std::fmt;
use std::path::{Path, PathBuf};

use glam::Vec2;

use crate::config::GameConfig;
use crate::domain::entity::{Entity, EntityId, EntityIds, HALF_TILE, TILE_SIZE};
use crate::domain::tile::{Category, Tile};

/// A parsed level: every placed piece plus the teleporter registry.
#[derive(Clone, Debug)]
pub struct Level {
    pub name: String,
    pub entities: Vec<Entity>,
    pub teleporters: Vec<EntityId>,
    pub width: usize,
    pub height: usize,
}

// ══════════════════════════════════════════════════════════════
// Errors
// ══════════════════════════════════════════════════════════════

/// Everything that can go wrong turning a level name into entities.
/// None of these are recoverable: the game cannot run without its level.
#[derive(Debug)]
pub enum LevelError {
    NotFound { name: String },
    Io { name: String, source: std::io::Error },
    UnknownTile { level: String, ch: char, row: usize, column: usize },
}

impl fmt::Display for LevelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LevelError::NotFound { name } => write!(f, "could not find level `{name}`"),
            LevelError::Io { name, source } => write!(f, "could not load level `{name}`: {source}"),
            LevelError::UnknownTile { level, ch, row, column } => write!(
                f,
                "unknown level letter {ch:?} in `{level}` at line {row}, column {column}",
            ),
        }
    }
}

impl std::error::Error for LevelError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            LevelError::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}

// ══════════════════════════════════════════════════════════════
// Level library: name → text
// ══════════════════════════════════════════════════════════════

/// Where level text comes from, and in which order levels are played.
#[derive(Clone, Debug)]
pub struct LevelLibrary {
    dir: PathBuf,
    sequence: Vec<String>,
    item_radius: f32,
}

impl LevelLibrary {
    pub fn new(dir: impl Into<PathBuf>, sequence: Vec<String>, item_radius: f32) -> Self {
        LevelLibrary { dir: dir.into(), sequence, item_radius }
    }

    pub fn from_config(config: &GameConfig) -> Self {
        Self::new(&config.levels_dir, config.levels.clone(), config.physics.item_radius)
    }

    /// Name of the level a new game starts on.
    pub fn first(&self) -> &str {
        self.sequence.first().map(String::as_str).unwrap_or(EMBEDDED[0].0)
    }

    /// Name of the level that follows `name`. The last level repeats.
    pub fn next_after(&self, name: &str) -> &str {
        match self.sequence.iter().position(|n| n == name) {
            Some(i) if i + 1 < self.sequence.len() => &self.sequence[i + 1],
            Some(i) => &self.sequence[i],
            None => self.first(),
        }
    }

    #[cfg(test)]
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.sequence.iter().position(|n| n == name)
    }

    /// Read the raw text for `name`: disk first, then the embedded set.
    pub fn read(&self, name: &str) -> Result<String, LevelError> {
        let path = level_path(&self.dir, name);
        if path.is_file() {
            return std::fs::read_to_string(&path).map_err(|source| LevelError::Io {
                name: name.to_string(),
                source,
            });
        }
        EMBEDDED
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, text)| text.to_string())
            .ok_or_else(|| LevelError::NotFound { name: name.to_string() })
    }
}

fn level_path(dir: &Path, name: &str) -> PathBuf {
    dir.join(format!("{name}.txt"))
}

const EMBEDDED: &[(&str, &str)] = &[
    ("level1", include_str!("../../levels/level1.txt")),
    ("level2", include_str!("../../levels/level2.txt")),
];

// ══════════════════════════════════════════════════════════════
// Public API
// ══════════════════════════════════════════════════════════════

/// Locate, read and parse the level called `name`.
pub fn load_level(name: &str, library: &LevelLibrary, ids: &mut EntityIds) -> Result<Level, LevelError> {
    let text = library.read(name)?;
    let level = parse_level(name, &text, library.item_radius, ids)?;
    log::info!(
        "loaded level `{}`: {}x{}, {} entities, {} teleporters",
        level.name,
        level.width,
        level.height,
        level.entities.len(),
        level.teleporters.len(),
    );
    Ok(level)
}

/// Turn level text into placed entities.
///
/// A single trailing newline terminates the last row rather than adding an
/// empty one, and a `\r` before each `\n` is ignored.
pub fn parse_level(
    name: &str,
    text: &str,
    item_radius: f32,
    ids: &mut EntityIds,
) -> Result<Level, LevelError> {
    let text = text.strip_suffix('\n').unwrap_or(text);
    let lines: Vec<&str> = text
        .split('\n')
        .map(|l| l.strip_suffix('\r').unwrap_or(l))
        .collect();
    let height = lines.len();

    let mut entities = vec![];
    let mut teleporters = vec![];
    let mut width = 0;

    for (row, line) in lines.iter().rev().enumerate() {
        for (column, ch) in line.chars().enumerate() {
            width = width.max(column + 1);
            let tile = Tile::from_char(ch).ok_or_else(|| LevelError::UnknownTile {
                level: name.to_string(),
                ch,
                row: height - row,
                column: column + 1,
            })?;
            let Some(category) = tile.category() else { continue };

            let entity = Entity::new(ids.next(), category, tile_center(column, row), item_radius);
            if category == Category::Teleporter {
                teleporters.push(entity.id);
            }
            entities.push(entity);
        }
    }

    link_teleporters(&mut entities, &teleporters);
    if teleporters.len() % 2 != 0 {
        log::warn!("level `{name}` has an unpaired teleporter; it will not teleport");
    }

    Ok(Level { name: name.to_string(), entities, teleporters, width, height })
}

/// World position of the centre of grid cell (`column`, reversed `row`).
pub fn tile_center(column: usize, row: usize) -> Vec2 {
    Vec2::new(
        TILE_SIZE * column as f32 + HALF_TILE,
        TILE_SIZE * row as f32 + HALF_TILE,
    )
}

/// Pair consecutive registry entries with each other.
fn link_teleporters(entities: &mut [Entity], registry: &[EntityId]) {
    for pair in registry.chunks_exact(2) {
        let (a, b) = (pair[0], pair[1]);
        for e in entities.iter_mut() {
            if e.id == a {
                e.partner = Some(b);
            } else if e.id == b {
                e.partner = Some(a);
            }
        }
    }
}

// ══════════════════════════════════════════════════════════════
// Unit tests
// ══════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> Result<Level, LevelError> {
        parse_level("test", text, 30.0, &mut EntityIds::new())
    }

    fn at(level: &Level, x: f32, y: f32) -> Option<Category> {
        level.entities.iter().find(|e| e.pos == Vec2::new(x, y)).map(|e| e.category)
    }

    #[test]
    fn rows_are_read_bottom_up() {
        let level = parse("x x\nf s\nxvx").unwrap();
        assert_eq!(level.height, 3);
        assert_eq!(level.width, 3);
        assert_eq!(level.entities.len(), 7);

        // Last text line is the bottom row.
        assert_eq!(at(&level, 32.0, 32.0), Some(Category::Wall));
        assert_eq!(at(&level, 96.0, 32.0), Some(Category::Vortex));
        assert_eq!(at(&level, 160.0, 32.0), Some(Category::Wall));
        assert_eq!(at(&level, 32.0, 96.0), Some(Category::Goal));
        assert_eq!(at(&level, 96.0, 96.0), None);
        assert_eq!(at(&level, 160.0, 96.0), Some(Category::Star));
        assert_eq!(at(&level, 32.0, 160.0), Some(Category::Wall));
        assert_eq!(at(&level, 160.0, 160.0), Some(Category::Wall));
    }

    #[test]
    fn one_entity_per_non_space_char_at_formula_position() {
        let text = "xsvft \n t  x \n      ";
        let level = parse(text).unwrap();
        let lines: Vec<&str> = text.split('\n').collect();
        let mut expected = vec![];
        for (row, line) in lines.iter().rev().enumerate() {
            for (column, ch) in line.chars().enumerate() {
                if ch != ' ' {
                    expected.push(Vec2::new(64.0 * column as f32 + 32.0, 64.0 * row as f32 + 32.0));
                }
            }
        }
        let got: Vec<Vec2> = level.entities.iter().map(|e| e.pos).collect();
        assert_eq!(got, expected);
    }

    #[test]
    fn every_non_player_entity_is_static() {
        let level = parse("xsvft").unwrap();
        assert!(level.entities.iter().all(|e| e.is_static() && e.body.is_some()));
    }

    #[test]
    fn unknown_letter_is_fatal() {
        for bad in ["x#x", "xX", "p", "x\tx", "s\nx.x"] {
            match parse(bad) {
                Err(LevelError::UnknownTile { .. }) => {}
                other => panic!("{bad:?} should fail, got {other:?}"),
            }
        }
    }

    #[test]
    fn unknown_letter_reports_source_line_and_column() {
        match parse("xxx\nx?x\nxxx") {
            Err(LevelError::UnknownTile { ch, row, column, .. }) => {
                assert_eq!(ch, '?');
                assert_eq!(row, 2);
                assert_eq!(column, 2);
            }
            other => panic!("expected UnknownTile, got {other:?}"),
        }
    }

    #[test]
    fn trailing_newline_and_crlf_do_not_shift_rows() {
        let plain = parse("x \n x").unwrap();
        let with_nl = parse("x \r\n x\r\n").unwrap();
        let a: Vec<Vec2> = plain.entities.iter().map(|e| e.pos).collect();
        let b: Vec<Vec2> = with_nl.entities.iter().map(|e| e.pos).collect();
        assert_eq!(a, b);
        assert_eq!(with_nl.height, 2);
    }

    #[test]
    fn parsing_is_idempotent() {
        let text = "xtx\ns f\nxtx";
        let a = parse(text).unwrap();
        let b = parse(text).unwrap();
        let cats = |l: &Level| l.entities.iter().map(|e| (e.category, e.pos)).collect::<Vec<_>>();
        assert_eq!(cats(&a), cats(&b));
    }

    #[test]
    fn teleporters_are_registered_and_paired() {
        let level = parse("t  \n   \n  t").unwrap();
        assert_eq!(level.teleporters.len(), 2);
        let (a, b) = (level.teleporters[0], level.teleporters[1]);
        let find = |id| level.entities.iter().find(|e| e.id == id).unwrap();
        assert_eq!(find(a).partner, Some(b));
        assert_eq!(find(b).partner, Some(a));
        assert_ne!(find(a).pos, find(b).pos);
    }

    #[test]
    fn single_teleporter_is_unpaired() {
        let level = parse("x t x").unwrap();
        assert_eq!(level.teleporters.len(), 1);
        let t = level.entities.iter().find(|e| e.category == Category::Teleporter).unwrap();
        assert_eq!(t.partner, None);
    }

    #[test]
    fn ids_continue_across_loads() {
        let mut ids = EntityIds::new();
        let a = parse_level("a", "xx", 30.0, &mut ids).unwrap();
        let b = parse_level("b", "xx", 30.0, &mut ids).unwrap();
        assert!(a.entities.iter().all(|ea| b.entities.iter().all(|eb| ea.id != eb.id)));
    }

    #[test]
    fn embedded_levels_load_and_leave_the_start_tile_open() {
        let lib = LevelLibrary::new("/nonexistent-levels-dir", vec!["level1".into(), "level2".into()], 30.0);
        for name in ["level1", "level2"] {
            let level = load_level(name, &lib, &mut EntityIds::new()).unwrap();
            assert!(level.entities.iter().any(|e| e.category == Category::Goal));
            assert!(level.entities.iter().all(|e| e.pos != crate::domain::entity::DEFAULT_START));
        }
        let level2 = load_level("level2", &lib, &mut EntityIds::new()).unwrap();
        assert_eq!(level2.teleporters.len(), 2);
    }

    #[test]
    fn missing_level_is_not_found() {
        let lib = LevelLibrary::new("/nonexistent-levels-dir", vec![], 30.0);
        match load_level("level9", &lib, &mut EntityIds::new()) {
            Err(LevelError::NotFound { name }) => assert_eq!(name, "level9"),
            other => panic!("expected NotFound, got {other:?}"),
        }
    }

    #[test]
    fn disk_level_overrides_embedded() {
        let dir = std::env::temp_dir().join(format!("vortexmaze-test-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("level1.txt"), "s").unwrap();
        let lib = LevelLibrary::new(&dir, vec!["level1".into()], 30.0);
        let level = load_level("level1", &lib, &mut EntityIds::new()).unwrap();
        std::fs::remove_dir_all(&dir).ok();
        assert_eq!(level.entities.len(), 1);
        assert_eq!(level.entities[0].category, Category::Star);
    }

    #[test]
    fn sequence_advances_then_repeats_last() {
        let lib = LevelLibrary::new(".", vec!["level1".into(), "level2".into()], 30.0);
        assert_eq!(lib.first(), "level1");
        assert_eq!(lib.next_after("level1"), "level2");
        assert_eq!(lib.next_after("level2"), "level2");
        assert_eq!(lib.next_after("elsewhere"), "level1");
        assert_eq!(lib.index_of("level2"), Some(1));
    }

    #[test]
    fn error_messages_name_the_level() {
        let e = LevelError::NotFound { name: "level3".into() };
        assert!(e.to_string().contains("level3"));
    }
}
