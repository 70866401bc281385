/// Presentation layer: double-buffered, diff-based terminal renderer.
///
/// How it works:
///   1. Build the next frame into `front` buffer (array of Cell)
///   2. Compare each cell with `back` buffer (previous frame)
///   3. Only emit terminal commands for cells that changed
///   4. All commands are batched with `queue!`, flushed once at the end
///   5. Swap front/back
///
/// The board is drawn at an integer zoom `k`: one 64×64 world tile becomes a
/// block of `2k` columns by `k` rows (terminal cells are about twice as tall
/// as wide). World y grows upward; screen rows grow downward.

use std::io::{self, BufWriter, Write};

use crossterm::{
    cursor::{self, MoveTo},
    event::{
        DisableMouseCapture, EnableMouseCapture, KeyboardEnhancementFlags,
        PopKeyboardEnhancementFlags, PushKeyboardEnhancementFlags,
    },
    execute, queue,
    style::{Color, Print, ResetColor, SetBackgroundColor, SetForegroundColor},
    terminal::{self, Clear, ClearType},
};
use glam::Vec2;

use crate::domain::entity::{Shape, TILE_SIZE};
use crate::domain::tile::Category;
use crate::sim::world::LevelSession;

// ── Cell: the unit of the back-buffer ──

#[derive(Clone, Copy, PartialEq, Eq)]
struct Cell {
    ch: [u8; 4],
    ch_len: u8,
    fg: Color,
    bg: Color,
}

impl Cell {
    /// Explicit dark background for all "empty" terminal cells.
    ///
    /// Using the same RGB for `Clear(ClearType::All)` and every cell keeps
    /// the inter-row gap colour identical to the cells on VTE terminals.
    const BASE_BG: Color = Color::Rgb { r: 22, g: 22, b: 35 };
    const WALL_BG: Color = Color::Rgb { r: 70, g: 72, b: 110 };
    const FLOOR_BG: Color = Color::Rgb { r: 32, g: 34, b: 48 };

    const BLANK: Cell = Cell {
        ch: [b' ', 0, 0, 0],
        ch_len: 1,
        fg: Color::White,
        bg: Cell::BASE_BG,
    };

    /// Sentinel cell used to invalidate the back buffer.
    /// Different from any real cell, so every position will be diff'd.
    const INVALID: Cell = Cell {
        ch: [b'?', 0, 0, 0],
        ch_len: 1,
        fg: Color::Magenta,
        bg: Color::Magenta,
    };

    /// Normalize bg: Color::Reset → BASE_BG so that every cell gets an
    /// explicit background color (never terminal-default).
    #[inline]
    fn norm_bg(bg: Color) -> Color {
        match bg {
            Color::Reset => Self::BASE_BG,
            other => other,
        }
    }

    fn from_char(c: char, fg: Color, bg: Color) -> Self {
        let mut cell = Self::BLANK;
        let len = c.encode_utf8(&mut cell.ch).len() as u8;
        cell.ch_len = len;
        cell.fg = fg;
        cell.bg = Self::norm_bg(bg);
        cell
    }

    fn as_str(&self) -> &str {
        std::str::from_utf8(&self.ch[..self.ch_len as usize]).unwrap_or(" ")
    }
}

// ── FrameBuffer: a 2D grid of Cells ──

struct FrameBuffer {
    width: usize,
    height: usize,
    cells: Vec<Cell>,
}

impl FrameBuffer {
    fn new(w: usize, h: usize) -> Self {
        FrameBuffer {
            width: w,
            height: h,
            cells: vec![Cell::BLANK; w * h],
        }
    }

    fn resize(&mut self, w: usize, h: usize) {
        if self.width != w || self.height != h {
            self.width = w;
            self.height = h;
            self.cells = vec![Cell::BLANK; w * h];
        }
    }

    fn clear(&mut self) {
        self.cells.fill(Cell::BLANK);
    }

    fn set(&mut self, x: usize, y: usize, cell: Cell) {
        if x < self.width && y < self.height {
            self.cells[y * self.width + x] = cell;
        }
    }

    fn get(&self, x: usize, y: usize) -> Cell {
        if x < self.width && y < self.height {
            self.cells[y * self.width + x]
        } else {
            Cell::BLANK
        }
    }

    /// Write a string at (x, y) with given colors. Each char occupies 1 column.
    fn put_str(&mut self, x: usize, y: usize, s: &str, fg: Color, bg: Color) {
        let mut cx = x;
        for ch in s.chars() {
            if cx >= self.width { break; }
            self.set(cx, y, Cell::from_char(ch, fg, bg));
            cx += 1;
        }
    }

    /// Keep the glyph, change the background.
    fn tint(&mut self, x: usize, y: usize, bg: Color) {
        if x < self.width && y < self.height {
            self.cells[y * self.width + x].bg = bg;
        }
    }

    /// Keep the background, change the glyph.
    fn put_glyph(&mut self, x: usize, y: usize, ch: char, fg: Color) {
        let bg = self.get(x, y).bg;
        self.set(x, y, Cell::from_char(ch, fg, bg));
    }
}

// ══════════════════════════════════════════════════════════════
// Layout: world ↔ screen mapping
// ══════════════════════════════════════════════════════════════

/// Vertical offsets
const HUD_ROW: usize = 0;
const MSG_ROW: usize = 1;
const MAP_ROW: usize = 2;
/// Rows kept free below the map for the help line.
const FOOTER_ROWS: usize = 1;

/// Where the board sits on the terminal and how big one tile is.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Layout {
    pub origin_x: usize,
    pub origin_y: usize,
    /// Tile height in rows; tile width is `2 * zoom` columns.
    pub zoom: usize,
    pub grid_w: usize,
    pub grid_h: usize,
}

impl Layout {
    /// Largest zoom that fits a `grid_w × grid_h` board, centred
    /// horizontally. `None` when even zoom 1 does not fit.
    pub fn fit(term_w: usize, term_h: usize, grid_w: usize, grid_h: usize) -> Option<Layout> {
        if grid_w == 0 || grid_h == 0 {
            return None;
        }
        let avail_h = term_h.checked_sub(MAP_ROW + FOOTER_ROWS)?;
        let zoom = (term_w / (2 * grid_w)).min(avail_h / grid_h);
        if zoom == 0 {
            return None;
        }
        let board_w = 2 * zoom * grid_w;
        Some(Layout {
            origin_x: (term_w - board_w) / 2,
            origin_y: MAP_ROW,
            zoom,
            grid_w,
            grid_h,
        })
    }

    fn cols_per_unit(&self) -> f32 {
        (2 * self.zoom) as f32 / TILE_SIZE
    }

    fn rows_per_unit(&self) -> f32 {
        self.zoom as f32 / TILE_SIZE
    }

    fn world_top(&self) -> f32 {
        self.grid_h as f32 * TILE_SIZE
    }

    pub fn board_cols(&self) -> usize {
        2 * self.zoom * self.grid_w
    }

    pub fn board_rows(&self) -> usize {
        self.zoom * self.grid_h
    }

    /// Terminal cell containing world point `p`, if it is on the board.
    pub fn world_to_screen(&self, p: Vec2) -> Option<(usize, usize)> {
        let cx = p.x * self.cols_per_unit();
        let cy = (self.world_top() - p.y) * self.rows_per_unit();
        if cx < 0.0 || cy < 0.0 {
            return None;
        }
        let (cx, cy) = (cx as usize, cy as usize);
        if cx >= self.board_cols() || cy >= self.board_rows() {
            return None;
        }
        Some((self.origin_x + cx, self.origin_y + cy))
    }

    /// World point at the centre of terminal cell (`col`, `row`), if that
    /// cell is on the board.
    pub fn screen_to_world(&self, col: usize, row: usize) -> Option<Vec2> {
        let cx = col.checked_sub(self.origin_x)?;
        let cy = row.checked_sub(self.origin_y)?;
        if cx >= self.board_cols() || cy >= self.board_rows() {
            return None;
        }
        Some(Vec2::new(
            (cx as f32 + 0.5) / self.cols_per_unit(),
            self.world_top() - (cy as f32 + 0.5) / self.rows_per_unit(),
        ))
    }

    /// Screen rectangle `(x0, y0, x1, y1)` (exclusive end) covering the
    /// world-space box `min..max`, clipped to the board.
    fn cover(&self, min: Vec2, max: Vec2) -> (usize, usize, usize, usize) {
        let to_col = |x: f32| ((x * self.cols_per_unit()).round().max(0.0) as usize).min(self.board_cols());
        let to_row = |y: f32| (((self.world_top() - y) * self.rows_per_unit()).round().max(0.0) as usize).min(self.board_rows());
        (
            self.origin_x + to_col(min.x),
            self.origin_y + to_row(max.y),
            self.origin_x + to_col(max.x),
            self.origin_y + to_row(min.y),
        )
    }
}

// ── Renderer ──

const SPINNER: [char; 4] = ['|', '/', '-', '\\'];
const SPIN_TICKS: u64 = 6;

pub struct Renderer {
    writer: BufWriter<io::Stdout>,
    front: FrameBuffer,
    back: FrameBuffer,
    term_w: usize,
    term_h: usize,
    layout: Option<Layout>,
    /// Keyboard enhancement was pushed, so the terminal reports releases.
    key_release: bool,
}

impl Renderer {
    pub fn new() -> Self {
        Renderer {
            writer: BufWriter::with_capacity(16384, io::stdout()),
            front: FrameBuffer::new(0, 0),
            back: FrameBuffer::new(0, 0),
            term_w: 0,
            term_h: 0,
            layout: None,
            key_release: false,
        }
    }

    pub fn init(&mut self) -> io::Result<()> {
        terminal::enable_raw_mode()?;
        execute!(
            self.writer,
            terminal::EnterAlternateScreen,
            EnableMouseCapture,
            cursor::Hide,
            SetBackgroundColor(Cell::BASE_BG),
            Clear(ClearType::All)
        )?;

        if terminal::supports_keyboard_enhancement().unwrap_or(false) {
            execute!(
                self.writer,
                PushKeyboardEnhancementFlags(KeyboardEnhancementFlags::REPORT_EVENT_TYPES)
            )?;
            self.key_release = true;
        }
        log::info!("key release events: {}", self.key_release);

        let (tw, th) = terminal::size().unwrap_or((80, 24));
        self.term_w = tw as usize;
        self.term_h = th as usize;
        self.front.resize(self.term_w, self.term_h);
        self.back.resize(self.term_w, self.term_h);
        // Force full repaint on first frame: back ≠ front for every cell.
        self.back.cells.fill(Cell::INVALID);

        Ok(())
    }

    pub fn cleanup(&mut self) -> io::Result<()> {
        if self.key_release {
            execute!(self.writer, PopKeyboardEnhancementFlags)?;
            self.key_release = false;
        }
        execute!(
            self.writer,
            ResetColor,
            DisableMouseCapture,
            cursor::Show,
            terminal::LeaveAlternateScreen
        )?;
        terminal::disable_raw_mode()
    }

    /// Whether the terminal reports key Release events.
    pub fn reports_key_release(&self) -> bool {
        self.key_release
    }

    /// World point under terminal cell (`col`, `row`), for mouse-as-touch.
    pub fn screen_to_world(&self, col: u16, row: u16) -> Option<Vec2> {
        self.layout?.screen_to_world(col as usize, row as usize)
    }

    pub fn render(&mut self, session: &LevelSession) -> io::Result<()> {
        // Detect terminal resize
        let (tw, th) = terminal::size().unwrap_or((80, 24));
        if tw as usize != self.term_w || th as usize != self.term_h {
            self.term_w = tw as usize;
            self.term_h = th as usize;
            self.front.resize(self.term_w, self.term_h);
            self.back.resize(self.term_w, self.term_h);
            // Force full repaint after resize.
            self.back.cells.fill(Cell::INVALID);
            queue!(self.writer, SetBackgroundColor(Cell::BASE_BG), Clear(ClearType::All))?;
        }

        self.layout = Layout::fit(self.term_w, self.term_h, session.width, session.height);

        self.front.clear();
        self.compose_hud(session);
        match self.layout {
            Some(layout) => self.compose_board(session, &layout),
            None => self.compose_too_small(session),
        }

        // Diff and emit
        self.flush_diff()?;

        // Swap: current front becomes next back
        std::mem::swap(&mut self.front, &mut self.back);

        Ok(())
    }

    // ── Diff flush: only write changed cells ──

    fn flush_diff(&mut self) -> io::Result<()> {
        let mut last_fg = Color::White;
        let mut last_bg = Cell::BASE_BG;
        let mut need_move = true;
        let mut last_x: usize = 0;
        let mut last_y: usize = 0;

        // Explicit base colors at start of frame. ResetColor would fall back
        // to the terminal's own default, which may differ from BASE_BG.
        queue!(self.writer,
            SetForegroundColor(Color::White),
            SetBackgroundColor(Cell::BASE_BG),
        )?;

        for y in 0..self.front.height {
            for x in 0..self.front.width {
                let cell = self.front.get(x, y);
                if cell == self.back.get(x, y) {
                    need_move = true;
                    continue;
                }

                if need_move || x != last_x + 1 || y != last_y {
                    queue!(self.writer, MoveTo(x as u16, y as u16))?;
                    need_move = false;
                }

                if cell.fg != last_fg {
                    queue!(self.writer, SetForegroundColor(cell.fg))?;
                    last_fg = cell.fg;
                }
                if cell.bg != last_bg {
                    queue!(self.writer, SetBackgroundColor(cell.bg))?;
                    last_bg = cell.bg;
                }

                queue!(self.writer, Print(cell.as_str()))?;
                last_x = x;
                last_y = y;
            }
        }

        self.writer.flush()
    }

    // ── Compose: build front buffer content ──

    fn compose_hud(&mut self, s: &LevelSession) {
        let hud = format!(" Level: {:<10}  Score: {:<5}", s.level_name, s.score);
        self.front.put_str(0, HUD_ROW, &hud, Color::White, Color::Reset);

        if !s.message.is_empty() {
            let x = self.term_w.saturating_sub(s.message.chars().count()) / 2;
            self.front.put_str(x, MSG_ROW, &s.message, Color::Yellow, Color::Reset);
        }

        let help = " Arrows/WASD tilt  Mouse drag pulls  [R] restart  [Q] quit ";
        let y = self.term_h.saturating_sub(1);
        self.front.put_str(0, y, help, Color::DarkGrey, Color::Reset);
    }

    fn compose_too_small(&mut self, s: &LevelSession) {
        let need_w = 2 * s.width;
        let need_h = s.height + MAP_ROW + FOOTER_ROWS;
        let msg = format!("Terminal too small: need {need_w}x{need_h}");
        let y = self.term_h / 2;
        let x = self.term_w.saturating_sub(msg.len()) / 2;
        self.front.put_str(x, y, &msg, Color::Red, Color::Reset);
    }

    fn compose_board(&mut self, s: &LevelSession, layout: &Layout) {
        for y in layout.origin_y..layout.origin_y + layout.board_rows() {
            for x in layout.origin_x..layout.origin_x + layout.board_cols() {
                self.front.tint(x, y, Cell::FLOOR_BG);
            }
        }

        // Walls first so pickups drawn later are never hidden.
        for e in s.entities.iter().filter(|e| e.category == Category::Wall) {
            let half = match e.body.map(|b| b.shape) {
                Some(Shape::Rect { half }) => half,
                _ => Vec2::splat(TILE_SIZE / 2.0),
            };
            let (x0, y0, x1, y1) = layout.cover(e.pos - half, e.pos + half);
            for y in y0..y1 {
                for x in x0..x1 {
                    self.front.tint(x, y, Cell::WALL_BG);
                }
            }
        }

        let spin = SPINNER[((s.tick / SPIN_TICKS) % SPINNER.len() as u64) as usize];
        for e in s.entities.iter().filter(|e| e.category != Category::Wall) {
            let (glyph, fg) = match e.category {
                Category::Star => ('*', Color::Yellow),
                Category::Vortex => (spin, Color::Magenta),
                Category::Goal => ('#', Color::Green),
                Category::Teleporter if e.body.is_some() => ('O', Color::Cyan),
                Category::Teleporter => ('o', Color::DarkCyan),
                Category::Wall | Category::Player => continue,
            };
            let radius = match e.body.map(|b| b.shape) {
                Some(Shape::Circle { radius }) => radius,
                _ => s.physics.item_radius,
            };
            self.paint_disc(layout, e.pos, radius, glyph, fg);
        }

        if let Some(p) = &s.player {
            let glyph = ball_glyph(p.scale);
            self.paint_disc(layout, p.pos, p.radius * p.scale, glyph, Color::White);
        }
    }

    /// Fill every cell whose centre lies inside the circle; the cell under
    /// the centre is always drawn so tiny discs stay visible.
    fn paint_disc(&mut self, layout: &Layout, center: Vec2, radius: f32, glyph: char, fg: Color) {
        let (x0, y0, x1, y1) = layout.cover(center - Vec2::splat(radius), center + Vec2::splat(radius));
        for y in y0..y1 {
            for x in x0..x1 {
                let inside = layout
                    .screen_to_world(x, y)
                    .map_or(false, |w| w.distance_squared(center) <= radius * radius);
                if inside {
                    self.front.put_glyph(x, y, glyph, fg);
                }
            }
        }
        if let Some((x, y)) = layout.world_to_screen(center) {
            self.front.put_glyph(x, y, glyph, fg);
        }
    }
}

/// Ball glyph shrinks with the ball during vanish animations.
fn ball_glyph(scale: f32) -> char {
    if scale > 0.6 {
        '●'
    } else if scale > 0.2 {
        '•'
    } else {
        '·'
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fit_picks_largest_zoom() {
        // 16×12 board: zoom 2 needs 64 cols and 24 rows (+3 chrome).
        let l = Layout::fit(80, 27, 16, 12).unwrap();
        assert_eq!(l.zoom, 2);
        assert_eq!(l.board_cols(), 64);
        assert_eq!(l.origin_x, 8);
        assert_eq!(l.origin_y, MAP_ROW);

        let l = Layout::fit(80, 26, 16, 12).unwrap();
        assert_eq!(l.zoom, 1);
    }

    #[test]
    fn fit_fails_on_tiny_terminal() {
        assert_eq!(Layout::fit(20, 10, 16, 12), None);
        assert_eq!(Layout::fit(80, 2, 16, 12), None);
        assert_eq!(Layout::fit(80, 24, 0, 0), None);
    }

    #[test]
    fn bottom_left_tile_is_last_board_rows() {
        let l = Layout::fit(32, 15, 16, 12).unwrap();
        assert_eq!(l.zoom, 1);
        // Tile (0, 0) spans columns 0..2 of the bottom board row; its
        // centre sits on the boundary and falls in the right-hand cell.
        assert_eq!(l.world_to_screen(Vec2::new(32.0, 32.0)), Some((1, MAP_ROW + 11)));
        assert_eq!(l.world_to_screen(Vec2::new(10.0, 10.0)), Some((0, MAP_ROW + 11)));
        // Top-right tile.
        assert_eq!(l.world_to_screen(Vec2::new(15.0 * 64.0 + 40.0, 11.0 * 64.0 + 32.0)), Some((31, MAP_ROW)));
        assert_eq!(l.world_to_screen(Vec2::new(-1.0, 32.0)), None);
        assert_eq!(l.world_to_screen(Vec2::new(32.0, 12.0 * 64.0 + 1.0)), None);
    }

    #[test]
    fn screen_to_world_lands_inside_the_clicked_tile() {
        let l = Layout::fit(100, 40, 16, 12).unwrap();
        let (x, y) = l.world_to_screen(Vec2::new(96.0, 672.0)).unwrap();
        let w = l.screen_to_world(x, y).unwrap();
        assert_eq!((w.x / 64.0).floor(), 1.0);
        assert_eq!((w.y / 64.0).floor(), 10.0);
        assert_eq!(l.world_to_screen(w), Some((x, y)));
    }

    #[test]
    fn screen_to_world_rejects_chrome() {
        let l = Layout::fit(100, 40, 16, 12).unwrap();
        assert_eq!(l.screen_to_world(l.origin_x, HUD_ROW), None);
        assert_eq!(l.screen_to_world(0, MAP_ROW), None);
        assert_eq!(l.screen_to_world(l.origin_x + l.board_cols(), MAP_ROW), None);
    }

    #[test]
    fn ball_glyph_tracks_scale() {
        assert_eq!(ball_glyph(1.0), '●');
        assert_eq!(ball_glyph(0.4), '•');
        assert_eq!(ball_glyph(0.0001), '·');
    }

    #[test]
    fn disc_marks_centre_even_when_tiny() {
        let l = Layout::fit(32, 15, 16, 12).unwrap();
        let mut r = Renderer::new();
        r.front.resize(32, 15);
        r.paint_disc(&l, Vec2::new(96.0, 672.0), 0.01, '·', Color::White);
        let (x, y) = l.world_to_screen(Vec2::new(96.0, 672.0)).unwrap();
        assert_eq!(r.front.get(x, y).as_str(), "·");
    }

    #[test]
    fn key_release_is_off_until_init() {
        assert!(!Renderer::new().reports_key_release());
    }
}
