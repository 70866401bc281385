/// Level tile codes and entity categories.
/// Tile semantics are centralized here; the loader and the physics layer
/// query them via methods rather than matching on chars themselves.

/// A single character cell of a level file.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Tile {
    Empty,      // ' '
    Wall,       // 'x'
    Vortex,     // 'v'
    Star,       // 's'
    Goal,       // 'f'
    Teleporter, // 't'
}

impl Tile {
    /// Decode a level character. `None` means the char is not a tile code.
    pub fn from_char(ch: char) -> Option<Tile> {
        match ch {
            ' ' => Some(Tile::Empty),
            'x' => Some(Tile::Wall),
            'v' => Some(Tile::Vortex),
            's' => Some(Tile::Star),
            'f' => Some(Tile::Goal),
            't' => Some(Tile::Teleporter),
            _ => None,
        }
    }

    /// Category of the entity this tile spawns, if any.
    pub fn category(self) -> Option<Category> {
        match self {
            Tile::Empty => None,
            Tile::Wall => Some(Category::Wall),
            Tile::Vortex => Some(Category::Vortex),
            Tile::Star => Some(Category::Star),
            Tile::Goal => Some(Category::Goal),
            Tile::Teleporter => Some(Category::Teleporter),
        }
    }
}

/// Closed set of entity kinds. Each owns one distinct bit of the
/// collision bitfield.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Category {
    Player,
    Wall,
    Star,
    Vortex,
    Goal,
    Teleporter,
}

impl Category {
    pub const fn bit(self) -> u32 {
        match self {
            Category::Player => 1,
            Category::Wall => 2,
            Category::Star => 4,
            Category::Vortex => 8,
            Category::Goal => 16,
            Category::Teleporter => 32,
        }
    }

    /// Categories this one reports begin-contacts with.
    pub const fn contact_test_mask(self) -> u32 {
        match self {
            Category::Player => {
                Category::Star.bit()
                    | Category::Vortex.bit()
                    | Category::Goal.bit()
                    | Category::Teleporter.bit()
            }
            Category::Wall => 0,
            Category::Star | Category::Vortex | Category::Goal | Category::Teleporter => {
                Category::Player.bit()
            }
        }
    }

    /// Categories this one is physically pushed out of.
    pub const fn collision_mask(self) -> u32 {
        match self {
            Category::Player => Category::Wall.bit(),
            _ => 0,
        }
    }

    /// Everything except the player is placed once and never moves.
    #[cfg(test)]
    pub fn is_static(self) -> bool {
        !matches!(self, Category::Player)
    }
}
