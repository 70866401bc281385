/// Gamepad input tracker using gilrs.
///
/// Button mapping is loaded from config.toml via `load_button_config()`.
/// Default mapping:
///   Left Stick            →  Analog tilt
///   D-pad                 →  Full tilt along each axis
///   Start                 →  Restart
///   Select                →  Quit

use std::collections::HashSet;

#[cfg(feature = "gamepad")]
use gilrs::{Axis, Button, EventType, Gilrs};
use glam::Vec2;

use crate::config::GamepadConfig;

const STICK_DEADZONE: f32 = 0.25;

/// Logical button identifiers (one per physical button).
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Btn {
    A,       // South
    B,       // East
    X,       // West
    Y,       // North
    L1,      // LeftTrigger
    R1,      // RightTrigger
    L2,      // LeftTrigger2
    R2,      // RightTrigger2
    Start,
    Select,
}

impl Btn {
    fn from_name(s: &str) -> Option<Btn> {
        match s.to_uppercase().as_str() {
            "A" | "SOUTH"  => Some(Btn::A),
            "B" | "EAST"   => Some(Btn::B),
            "X" | "WEST"   => Some(Btn::X),
            "Y" | "NORTH"  => Some(Btn::Y),
            "L1" | "LB" | "LEFTTRIGGER"  => Some(Btn::L1),
            "R1" | "RB" | "RIGHTTRIGGER" => Some(Btn::R1),
            "L2" | "LT" | "LEFTTRIGGER2"  => Some(Btn::L2),
            "R2" | "RT" | "RIGHTTRIGGER2" => Some(Btn::R2),
            "START" => Some(Btn::Start),
            "SELECT" | "BACK" => Some(Btn::Select),
            _ => None,
        }
    }

    #[cfg(feature = "gamepad")]
    fn from_gilrs(btn: Button) -> Option<Btn> {
        match btn {
            Button::South     => Some(Btn::A),
            Button::East      => Some(Btn::B),
            Button::West      => Some(Btn::X),
            Button::North     => Some(Btn::Y),
            Button::LeftTrigger  => Some(Btn::L1),
            Button::RightTrigger => Some(Btn::R1),
            Button::LeftTrigger2  => Some(Btn::L2),
            Button::RightTrigger2 => Some(Btn::R2),
            Button::Start     => Some(Btn::Start),
            Button::Select    => Some(Btn::Select),
            _ => None,
        }
    }
}

/// Held D-pad directions.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
struct Dpad {
    up: bool,
    down: bool,
    left: bool,
    right: bool,
}

impl Dpad {
    fn any(&self) -> bool {
        self.up || self.down || self.left || self.right
    }

    fn tilt(&self) -> Vec2 {
        let axis = |neg: bool, pos: bool| (pos as i8 - neg as i8) as f32;
        Vec2::new(axis(self.left, self.right), axis(self.down, self.up))
    }
}

/// Action-to-button mapping (loaded from config).
struct ActionMap {
    restart: Vec<Btn>,
    quit: Vec<Btn>,
}

impl Default for ActionMap {
    fn default() -> Self {
        ActionMap {
            restart: vec![Btn::Start],
            quit:    vec![Btn::Select],
        }
    }
}

pub struct GamepadState {
    #[cfg(feature = "gamepad")]
    gilrs: Option<Gilrs>,

    held: HashSet<Btn>,
    /// Buttons that went down since the last `update()`.
    pressed: HashSet<Btn>,
    dpad: Dpad,
    stick: Vec2,

    // Action mapping
    action_map: ActionMap,

    pub connected: bool,
}

fn parse_list(names: &[String]) -> Vec<Btn> {
    names.iter().filter_map(|s| Btn::from_name(s)).collect()
}

impl GamepadState {
    pub fn new() -> Self {
        #[cfg(feature = "gamepad")]
        let (gilrs_opt, connected) = {
            match Gilrs::new() {
                Ok(g) => {
                    let has_pad = g.gamepads().next().is_some();
                    (Some(g), has_pad)
                }
                Err(e) => {
                    log::warn!("gamepad support unavailable: {e}");
                    (None, false)
                }
            }
        };
        #[cfg(not(feature = "gamepad"))]
        let connected = false;

        GamepadState {
            #[cfg(feature = "gamepad")]
            gilrs: gilrs_opt,
            held: HashSet::new(),
            pressed: HashSet::new(),
            dpad: Dpad::default(),
            stick: Vec2::ZERO,
            action_map: ActionMap::default(),
            connected,
        }
    }

    /// Load button mapping from config. Unknown names are skipped; a list
    /// with no usable names keeps the default.
    pub fn load_button_config(&mut self, cfg: &GamepadConfig) {
        let map = &mut self.action_map;
        let rs = parse_list(&cfg.restart);
        if !rs.is_empty() { map.restart = rs; }
        let qt = parse_list(&cfg.quit);
        if !qt.is_empty() { map.quit = qt; }
    }

    pub fn update(&mut self) {
        self.pressed.clear();

        #[cfg(feature = "gamepad")]
        self.poll_gilrs();
    }

    #[cfg(feature = "gamepad")]
    fn poll_gilrs(&mut self) {
        let gilrs = match &mut self.gilrs {
            Some(g) => g,
            None => return,
        };

        let events: Vec<_> = std::iter::from_fn(|| gilrs.next_event()).collect();

        for event in events {
            match event.event {
                EventType::ButtonPressed(btn, _) => {
                    self.connected = true;
                    self.set_button(btn, true);
                }
                EventType::ButtonReleased(btn, _) => {
                    self.connected = true;
                    self.set_button(btn, false);
                }
                EventType::AxisChanged(axis, value, _) => {
                    self.connected = true;
                    self.update_axis(axis, value);
                }
                EventType::Connected => {
                    log::info!("gamepad connected");
                    self.connected = true;
                }
                EventType::Disconnected => {
                    log::info!("gamepad disconnected");
                    self.connected = false;
                    self.release_all();
                }
                _ => {}
            }
        }
    }

    #[cfg(feature = "gamepad")]
    fn set_button(&mut self, gilrs_btn: Button, held: bool) {
        // D-pad handled separately (not in Btn enum)
        match gilrs_btn {
            Button::DPadUp    => { self.dpad.up = held; return; }
            Button::DPadDown  => { self.dpad.down = held; return; }
            Button::DPadLeft  => { self.dpad.left = held; return; }
            Button::DPadRight => { self.dpad.right = held; return; }
            _ => {}
        }

        let Some(btn) = Btn::from_gilrs(gilrs_btn) else { return };
        if !held {
            self.held.remove(&btn);
        } else if self.held.insert(btn) {
            self.pressed.insert(btn);
        }
    }

    #[cfg(feature = "gamepad")]
    fn update_axis(&mut self, axis: Axis, value: f32) {
        match axis {
            Axis::LeftStickX => self.stick.x = value,
            Axis::LeftStickY => self.stick.y = value,
            _ => {}
        }
    }

    // ── Action queries (config-driven) ──

    pub fn restart_pressed(&self) -> bool {
        self.action_map.restart.iter().any(|b| self.pressed.contains(b))
    }

    pub fn quit_pressed(&self) -> bool {
        self.action_map.quit.iter().any(|b| self.pressed.contains(b))
    }

    /// Current tilt: the D-pad if any direction is held, otherwise the
    /// left stick outside its deadzone, otherwise `None`.
    pub fn tilt(&self) -> Option<Vec2> {
        if self.dpad.any() {
            return Some(self.dpad.tilt());
        }
        stick_tilt(self.stick.x, self.stick.y)
    }

    #[cfg_attr(not(feature = "gamepad"), allow(dead_code))]
    fn release_all(&mut self) {
        self.held.clear();
        self.pressed.clear();
        self.dpad = Dpad::default();
        self.stick = Vec2::ZERO;
    }
}

/// Analog stick position as a tilt, with the deadzone cut out and the
/// rest rescaled so tilt starts at zero just past the deadzone edge.
/// gilrs reports stick-up as positive y, same as the world.
pub fn stick_tilt(x: f32, y: f32) -> Option<Vec2> {
    let v = Vec2::new(x, y).clamp_length_max(1.0);
    let len = v.length();
    if len <= STICK_DEADZONE {
        return None;
    }
    let scaled = (len - STICK_DEADZONE) / (1.0 - STICK_DEADZONE);
    Some(v / len * scaled)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A pad with no backend attached.
    fn pad() -> GamepadState {
        GamepadState {
            #[cfg(feature = "gamepad")]
            gilrs: None,
            held: HashSet::new(),
            pressed: HashSet::new(),
            dpad: Dpad::default(),
            stick: Vec2::ZERO,
            action_map: ActionMap::default(),
            connected: false,
        }
    }

    #[test]
    fn button_names_are_case_insensitive_with_aliases() {
        assert_eq!(Btn::from_name("start"), Some(Btn::Start));
        assert_eq!(Btn::from_name("Back"), Some(Btn::Select));
        assert_eq!(Btn::from_name("south"), Some(Btn::A));
        assert_eq!(Btn::from_name("turbo"), None);
    }

    #[test]
    fn config_overrides_mapping_but_ignores_garbage() {
        let mut gp = pad();
        gp.load_button_config(&GamepadConfig {
            restart: vec!["Y".into(), "nonsense".into()],
            quit: vec!["nonsense".into()],
        });
        assert_eq!(gp.action_map.restart, vec![Btn::Y]);
        assert_eq!(gp.action_map.quit, vec![Btn::Select]);
    }

    #[test]
    fn presses_clear_on_update() {
        let mut gp = pad();
        gp.pressed.insert(Btn::Start);
        assert!(gp.restart_pressed());
        assert!(!gp.quit_pressed());
        gp.update();
        assert!(!gp.restart_pressed());
    }

    #[test]
    fn stick_inside_deadzone_is_no_tilt() {
        assert_eq!(stick_tilt(0.1, -0.1), None);
        assert_eq!(stick_tilt(0.0, 0.0), None);
    }

    #[test]
    fn full_stick_is_full_tilt() {
        let t = stick_tilt(0.0, 1.0).unwrap();
        assert!((t - Vec2::new(0.0, 1.0)).length() < 1e-6);
        let t = stick_tilt(-2.0, 0.0).unwrap();
        assert!((t - Vec2::new(-1.0, 0.0)).length() < 1e-6);
    }

    #[test]
    fn dpad_wins_over_stick() {
        let mut gp = pad();
        gp.stick = Vec2::new(1.0, 0.0);
        gp.dpad.left = true;
        assert_eq!(gp.tilt(), Some(Vec2::new(-1.0, 0.0)));
    }

    #[test]
    fn release_all_drops_everything() {
        let mut gp = pad();
        gp.held.insert(Btn::A);
        gp.dpad.up = true;
        gp.stick = Vec2::new(0.9, 0.9);
        gp.release_all();
        assert!(gp.held.is_empty());
        assert_eq!(gp.tilt(), None);
    }
}
