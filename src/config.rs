/// External configuration loader.
///
/// Reads `config.toml` from the executable's directory (or CWD).
/// Falls back to sensible defaults if the file is missing or incomplete.

use serde::Deserialize;
use std::path::PathBuf;

use glam::Vec2;

use crate::domain::entity::DEFAULT_START;

// ── Public Config Struct ──

#[derive(Clone, Debug)]
pub struct GameConfig {
    pub timing: TimingConfig,
    pub physics: PhysicsConfig,
    pub gamepad: GamepadConfig,
    pub levels_dir: PathBuf,
    /// Level names in play order. The goal of the last one reloads it.
    pub levels: Vec<String>,
    pub log_file: PathBuf,
    /// What happened while locating config.toml. Loading runs before the
    /// logger exists, so `main` logs these once it is up.
    pub notes: Vec<String>,
}

#[derive(Clone, Debug)]
pub struct TimingConfig {
    pub tick_rate_ms: u64,
    /// Length of each move/scale stage of a contact animation.
    pub action_secs: f32,
}

#[derive(Clone, Debug)]
pub struct PhysicsConfig {
    pub points_per_meter: f32,
    pub linear_damping: f32,
    pub restitution: f32,
    pub max_speed: f32,
    pub player_radius: f32,
    pub item_radius: f32,
    /// Touch gravity = (touch - ball) / touch_divisor.
    pub touch_divisor: f32,
    /// Tilt gravity = tilt * tilt_scale.
    pub tilt_scale: f32,
    pub start: Vec2,
}

#[derive(Clone, Debug)]
pub struct GamepadConfig {
    pub restart: Vec<String>,
    pub quit: Vec<String>,
}

impl Default for TimingConfig {
    fn default() -> Self {
        TimingConfig {
            tick_rate_ms: default_tick_rate(),
            action_secs: default_action_secs(),
        }
    }
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        PhysicsConfig {
            points_per_meter: default_points_per_meter(),
            linear_damping: default_linear_damping(),
            restitution: default_restitution(),
            max_speed: default_max_speed(),
            player_radius: default_player_radius(),
            item_radius: default_item_radius(),
            touch_divisor: default_touch_divisor(),
            tilt_scale: default_tilt_scale(),
            start: DEFAULT_START,
        }
    }
}

// ── TOML Schema (with serde defaults) ──

#[derive(Deserialize, Debug, Default)]
struct TomlConfig {
    #[serde(default)]
    timing: TomlTiming,
    #[serde(default)]
    physics: TomlPhysics,
    #[serde(default)]
    gamepad: TomlGamepad,
    #[serde(default)]
    general: TomlGeneral,
}

#[derive(Deserialize, Debug)]
struct TomlTiming {
    #[serde(default = "default_tick_rate")]
    tick_rate_ms: u64,
    #[serde(default = "default_action_secs")]
    action_secs: f32,
}

#[derive(Deserialize, Debug)]
struct TomlPhysics {
    #[serde(default = "default_points_per_meter")]
    points_per_meter: f32,
    #[serde(default = "default_linear_damping")]
    linear_damping: f32,
    #[serde(default = "default_restitution")]
    restitution: f32,
    #[serde(default = "default_max_speed")]
    max_speed: f32,
    #[serde(default = "default_player_radius")]
    player_radius: f32,
    #[serde(default = "default_item_radius")]
    item_radius: f32,
    #[serde(default = "default_touch_divisor")]
    touch_divisor: f32,
    #[serde(default = "default_tilt_scale")]
    tilt_scale: f32,
    #[serde(default = "default_start")]
    start: [f32; 2],
}

#[derive(Deserialize, Debug)]
struct TomlGamepad {
    #[serde(default = "default_restart")]
    restart: Vec<String>,
    #[serde(default = "default_quit")]
    quit: Vec<String>,
}

#[derive(Deserialize, Debug)]
struct TomlGeneral {
    #[serde(default = "default_levels_dir")]
    levels_dir: String,
    #[serde(default = "default_levels")]
    levels: Vec<String>,
    #[serde(default = "default_log_file")]
    log_file: String,
}

// ── Defaults ──

fn default_tick_rate() -> u64 { 16 }
fn default_action_secs() -> f32 { 0.25 }

fn default_points_per_meter() -> f32 { 150.0 }
fn default_linear_damping() -> f32 { 0.5 }
fn default_restitution() -> f32 { 0.2 }
fn default_max_speed() -> f32 { 2400.0 }
fn default_player_radius() -> f32 { 28.0 }
fn default_item_radius() -> f32 { 30.0 }
fn default_touch_divisor() -> f32 { 100.0 }
fn default_tilt_scale() -> f32 { 50.0 }
fn default_start() -> [f32; 2] { DEFAULT_START.to_array() }

fn default_restart() -> Vec<String> { vec!["Start".into()] }
fn default_quit() -> Vec<String> { vec!["Select".into()] }

fn default_levels_dir() -> String { "levels".into() }
fn default_levels() -> Vec<String> { vec!["level1".into(), "level2".into()] }
fn default_log_file() -> String { "vortexmaze.log".into() }

impl Default for TomlTiming {
    fn default() -> Self {
        TomlTiming {
            tick_rate_ms: default_tick_rate(),
            action_secs: default_action_secs(),
        }
    }
}

impl Default for TomlPhysics {
    fn default() -> Self {
        TomlPhysics {
            points_per_meter: default_points_per_meter(),
            linear_damping: default_linear_damping(),
            restitution: default_restitution(),
            max_speed: default_max_speed(),
            player_radius: default_player_radius(),
            item_radius: default_item_radius(),
            touch_divisor: default_touch_divisor(),
            tilt_scale: default_tilt_scale(),
            start: default_start(),
        }
    }
}

impl Default for TomlGamepad {
    fn default() -> Self {
        TomlGamepad {
            restart: default_restart(),
            quit: default_quit(),
        }
    }
}

impl Default for TomlGeneral {
    fn default() -> Self {
        TomlGeneral {
            levels_dir: default_levels_dir(),
            levels: default_levels(),
            log_file: default_log_file(),
        }
    }
}

// ── Loading ──

impl GameConfig {
    /// Load config from `config.toml`.
    /// Search order: (1) exe directory, (2) current working directory.
    /// Missing file or missing keys gracefully fall back to defaults.
    pub fn load() -> Self {
        let search_dirs = candidate_dirs();
        let mut notes = vec![];
        let toml_cfg = load_toml(&search_dirs, &mut notes);
        let mut cfg = Self::from_toml(toml_cfg, &search_dirs);
        cfg.notes = notes;
        cfg
    }

    /// Parse a config document directly (no filesystem search).
    #[cfg(test)]
    pub fn parse(text: &str) -> Result<Self, toml::de::Error> {
        let toml_cfg = toml::from_str::<TomlConfig>(text)?;
        Ok(Self::from_toml(toml_cfg, &[]))
    }

    fn from_toml(toml_cfg: TomlConfig, search_dirs: &[PathBuf]) -> Self {
        // Resolve levels directory
        let levels_dir_str = &toml_cfg.general.levels_dir;
        let levels_dir = if PathBuf::from(levels_dir_str).is_absolute() {
            PathBuf::from(levels_dir_str)
        } else {
            search_dirs.iter()
                .map(|d| d.join(levels_dir_str))
                .find(|p| p.is_dir())
                .unwrap_or_else(|| PathBuf::from(levels_dir_str))
        };

        let mut levels = toml_cfg.general.levels;
        if levels.is_empty() {
            levels = default_levels();
        }

        let p = toml_cfg.physics;
        GameConfig {
            timing: TimingConfig {
                tick_rate_ms: toml_cfg.timing.tick_rate_ms.max(1),
                action_secs: toml_cfg.timing.action_secs.max(0.0),
            },
            physics: PhysicsConfig {
                points_per_meter: p.points_per_meter,
                linear_damping: p.linear_damping.max(0.0),
                restitution: p.restitution.clamp(0.0, 1.0),
                max_speed: p.max_speed,
                player_radius: p.player_radius,
                item_radius: p.item_radius,
                touch_divisor: if p.touch_divisor == 0.0 { default_touch_divisor() } else { p.touch_divisor },
                tilt_scale: p.tilt_scale,
                start: Vec2::from_array(p.start),
            },
            gamepad: GamepadConfig {
                restart: toml_cfg.gamepad.restart,
                quit: toml_cfg.gamepad.quit,
            },
            levels_dir,
            levels,
            log_file: PathBuf::from(toml_cfg.general.log_file),
            notes: vec![],
        }
    }
}

impl Default for GameConfig {
    fn default() -> Self {
        Self::from_toml(TomlConfig::default(), &[])
    }
}

/// Candidate directories to search: exe dir + CWD + data dirs (deduplicated).
fn candidate_dirs() -> Vec<PathBuf> {
    let mut dirs = vec![];

    // 1. Directory of the running executable
    if let Ok(exe) = std::env::current_exe() {
        let resolved = exe.canonicalize().unwrap_or(exe);
        if let Some(parent) = resolved.parent() {
            dirs.push(parent.to_path_buf());
        }
    }

    // 2. Current working directory
    if let Ok(cwd) = std::env::current_dir() {
        if !dirs.iter().any(|d| d == &cwd) {
            dirs.push(cwd);
        }
    }

    // 3. XDG data home (~/.local/share/vortexmaze)
    if let Ok(home) = std::env::var("HOME") {
        let xdg = PathBuf::from(&home).join(".local/share/vortexmaze");
        if xdg.is_dir() && !dirs.iter().any(|d| d == &xdg) {
            dirs.push(xdg);
        }
    }

    // 4. System data directory
    let sys = PathBuf::from("/usr/share/vortexmaze");
    if sys.is_dir() && !dirs.iter().any(|d| d == &sys) {
        dirs.push(sys);
    }

    if dirs.is_empty() {
        dirs.push(PathBuf::from("."));
    }

    dirs
}

/// Search for config.toml in candidate directories.
fn load_toml(search_dirs: &[PathBuf], notes: &mut Vec<String>) -> TomlConfig {
    for dir in search_dirs {
        let path = dir.join("config.toml");
        if !path.exists() {
            continue;
        }
        match std::fs::read_to_string(&path) {
            Ok(text) => match toml::from_str::<TomlConfig>(&text) {
                Ok(cfg) => {
                    notes.push(format!("config loaded from {}", path.display()));
                    return cfg;
                }
                Err(e) => {
                    notes.push(format!("config.toml parse error: {e}; using default settings"));
                    return TomlConfig::default();
                }
            },
            Err(e) => {
                notes.push(format!("could not read {}: {e}", path.display()));
            }
        }
    }
    notes.push("no config.toml found, using defaults".into());
    TomlConfig::default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_gives_defaults() {
        let cfg = GameConfig::parse("").unwrap();
        assert_eq!(cfg.timing.tick_rate_ms, 16);
        assert_eq!(cfg.timing.action_secs, 0.25);
        assert_eq!(cfg.physics.tilt_scale, 50.0);
        assert_eq!(cfg.physics.touch_divisor, 100.0);
        assert_eq!(cfg.physics.start, DEFAULT_START);
        assert_eq!(cfg.levels, vec!["level1".to_string(), "level2".to_string()]);
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let cfg = GameConfig::parse(
            "[physics]\nlinear_damping = 1.5\nstart = [160.0, 96.0]\n\n[general]\nlevels = [\"intro\"]\n",
        )
        .unwrap();
        assert_eq!(cfg.physics.linear_damping, 1.5);
        assert_eq!(cfg.physics.start, Vec2::new(160.0, 96.0));
        assert_eq!(cfg.physics.restitution, 0.2);
        assert_eq!(cfg.levels, vec!["intro".to_string()]);
    }

    #[test]
    fn degenerate_values_are_clamped() {
        let cfg = GameConfig::parse(
            "[timing]\ntick_rate_ms = 0\n[physics]\ntouch_divisor = 0.0\nrestitution = 4.0\n[general]\nlevels = []\n",
        )
        .unwrap();
        assert_eq!(cfg.timing.tick_rate_ms, 1);
        assert_eq!(cfg.physics.touch_divisor, 100.0);
        assert_eq!(cfg.physics.restitution, 1.0);
        assert_eq!(cfg.levels.len(), 2);
    }

    #[test]
    fn malformed_document_is_an_error() {
        assert!(GameConfig::parse("[physics\nbroken").is_err());
    }
}
