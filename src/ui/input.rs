/// Input state tracker.
///
/// Tracks which keys are currently held down and where the mouse is, enabling:
///   - Continuous tilt while an arrow / WASD key is held
///   - Edge-triggered restart and quit (only fire on initial press)
///   - Mouse-as-touch: left button down/drag is a finger on the screen
///
/// Release events are honored when the renderer managed to push crossterm's
/// keyboard enhancement flags. Other terminals fall back to timeout-based release.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use crossterm::event::{
    self, poll, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers, MouseButton, MouseEventKind,
};
use glam::Vec2;

/// After this duration without a Press/Repeat event, consider the key released.
/// Only used when the terminal doesn't report Release events.
const HOLD_TIMEOUT: Duration = Duration::from_millis(160);

pub const TILT_UP: &[KeyCode] = &[KeyCode::Up, KeyCode::Char('w'), KeyCode::Char('W')];
pub const TILT_DOWN: &[KeyCode] = &[KeyCode::Down, KeyCode::Char('s'), KeyCode::Char('S')];
pub const TILT_LEFT: &[KeyCode] = &[KeyCode::Left, KeyCode::Char('a'), KeyCode::Char('A')];
pub const TILT_RIGHT: &[KeyCode] = &[KeyCode::Right, KeyCode::Char('d'), KeyCode::Char('D')];
pub const RESTART: &[KeyCode] = &[KeyCode::Char('r'), KeyCode::Char('R')];
pub const QUIT: &[KeyCode] = &[KeyCode::Char('q'), KeyCode::Char('Q'), KeyCode::Esc];

pub struct InputState {
    /// Timestamp of last Press/Repeat event for each key.
    last_active: HashMap<KeyCode, Instant>,

    /// Keys that transitioned from "not held" → "held" during the
    /// most recent drain_events() call.
    fresh_presses: Vec<KeyCode>,

    /// Raw key events collected during drain, for Ctrl-C handling.
    pub raw_events: Vec<KeyEvent>,

    /// Terminal cell under a held left button, if any.
    pointer: Option<(u16, u16)>,

    /// Whether to honor Release events. Set from
    /// `Renderer::reports_key_release` once the terminal is up.
    pub honor_release: bool,
}

impl InputState {
    pub fn new() -> Self {
        InputState {
            last_active: HashMap::with_capacity(16),
            fresh_presses: Vec::with_capacity(8),
            raw_events: Vec::with_capacity(8),
            pointer: None,
            honor_release: false,
        }
    }

    /// Drain all pending terminal events and update key and pointer states.
    /// Call this once per frame, before the simulation tick.
    pub fn drain_events(&mut self) {
        self.fresh_presses.clear();
        self.raw_events.clear();

        // Read all available events without blocking
        while poll(Duration::ZERO).unwrap_or(false) {
            match event::read() {
                Ok(Event::Key(key)) => self.on_key(key),
                Ok(Event::Mouse(m)) => match m.kind {
                    MouseEventKind::Down(MouseButton::Left) | MouseEventKind::Drag(MouseButton::Left) => {
                        self.pointer = Some((m.column, m.row));
                    }
                    MouseEventKind::Up(MouseButton::Left) => self.pointer = None,
                    _ => {}
                },
                Ok(Event::FocusLost) => self.pointer = None,
                _ => {}
            }
        }

        // Expire keys that have timed out (fallback for terminals without Release)
        let now = Instant::now();
        self.last_active.retain(|_, t| now.duration_since(*t) < HOLD_TIMEOUT);
    }

    fn on_key(&mut self, key: KeyEvent) {
        self.raw_events.push(key);

        match key.kind {
            KeyEventKind::Release if self.honor_release => {
                self.last_active.remove(&key.code);
            }
            KeyEventKind::Release => {
                // Enhancement not confirmed; rely on timeout-based expiry
            }
            _ => {
                let was_held = self.is_held(key.code);
                self.last_active.insert(key.code, Instant::now());
                if !was_held {
                    self.fresh_presses.push(key.code);
                }
            }
        }
    }

    /// Is this key currently held down?
    pub fn is_held(&self, code: KeyCode) -> bool {
        self.last_active.get(&code)
            .map(|t| t.elapsed() < HOLD_TIMEOUT)
            .unwrap_or(false)
    }

    /// Convenience: is any of these keys held?
    pub fn any_held(&self, codes: &[KeyCode]) -> bool {
        codes.iter().any(|c| self.is_held(*c))
    }

    /// Was this key freshly pressed this frame? (edge trigger)
    pub fn was_pressed(&self, code: KeyCode) -> bool {
        self.fresh_presses.contains(&code)
    }

    /// Convenience: was any of these keys freshly pressed?
    pub fn any_pressed(&self, codes: &[KeyCode]) -> bool {
        codes.iter().any(|c| self.was_pressed(*c))
    }

    /// Check if any raw event this frame has Ctrl+C
    pub fn ctrl_c_pressed(&self) -> bool {
        self.raw_events.iter().any(|k| {
            k.modifiers.contains(KeyModifiers::CONTROL)
                && (k.code == KeyCode::Char('c') || k.code == KeyCode::Char('C'))
        })
    }

    /// Terminal cell the "finger" is on, while the left button is down.
    pub fn pointer(&self) -> Option<(u16, u16)> {
        self.pointer
    }

    /// Tilt from held direction keys, or `None` when none are held.
    pub fn tilt(&self) -> Option<Vec2> {
        tilt_from(
            self.any_held(TILT_UP),
            self.any_held(TILT_DOWN),
            self.any_held(TILT_LEFT),
            self.any_held(TILT_RIGHT),
        )
    }
}

/// Combine held directions into a tilt vector. World y grows upward, so
/// "up" tilts the board toward the top of the screen. Opposing keys cancel.
pub fn tilt_from(up: bool, down: bool, left: bool, right: bool) -> Option<Vec2> {
    if !(up || down || left || right) {
        return None;
    }
    let axis = |neg: bool, pos: bool| (pos as i8 - neg as i8) as f32;
    Some(Vec2::new(axis(left, right), axis(down, up)))
}
