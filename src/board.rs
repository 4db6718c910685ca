//! Board coordinates and stone configurations.
//!
//! A [`StoneConfiguration`] is the full occupancy snapshot of an N×N board as
//! seen in one scan. It is built once and never mutated afterwards; the
//! builder-style `with_*` methods consume and return a new value.
//!
//! Coordinates are 1-indexed `(column, row)` pairs with row 1 at the bottom of
//! the board, matching GTP vertices (`A1` is the lower-left corner).

use std::collections::BTreeSet;
use std::fmt;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Color {
    Black,
    White,
}

impl Color {
    pub fn opponent(self) -> Color {
        match self {
            Color::Black => Color::White,
            Color::White => Color::Black,
        }
    }

    /// Single-letter tag used in results and game records.
    pub fn letter(self) -> char {
        match self {
            Color::Black => 'B',
            Color::White => 'W',
        }
    }
}

/// An intersection on the board, `(column, row)`, both starting at 1.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BoardCoordinate {
    pub col: usize,
    pub row: usize,
}

/// A set of coordinates with a stable iteration order.
pub type Stones = BTreeSet<BoardCoordinate>;

impl BoardCoordinate {
    pub const fn new(col: usize, row: usize) -> Self {
        Self { col, row }
    }

    pub fn is_on_board(&self, size: usize) -> bool {
        (1..=size).contains(&self.col) && (1..=size).contains(&self.row)
    }

    /// Parse a GTP vertex such as `"D4"`.
    ///
    /// Columns use letters A-T skipping I. Returns `None` for malformed
    /// input or a vertex outside a `size`×`size` board.
    pub fn parse(s: &str, size: usize) -> Option<Self> {
        let s = s.trim();
        let mut chars = s.chars();
        let letter = chars.next()?.to_ascii_uppercase();
        if !letter.is_ascii_alphabetic() || letter == 'I' {
            return None;
        }
        let mut col = (letter as u8 - b'A' + 1) as usize;
        // Skip 'I' column (Go convention to avoid confusion with 'J')
        if letter > 'I' {
            col -= 1;
        }
        let row: usize = chars.as_str().parse().ok()?;
        let coord = Self::new(col, row);
        coord.is_on_board(size).then_some(coord)
    }

    /// Format as a GTP vertex, e.g. `"D4"`.
    pub fn vertex(&self) -> String {
        let mut c = (b'A' + (self.col as u8).saturating_sub(1)) as char;
        if c >= 'I' {
            c = (c as u8 + 1) as char;
        }
        format!("{c}{}", self.row)
    }
}

impl fmt::Display for BoardCoordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({},{})", self.col, self.row)
    }
}

/// Iterate every coordinate of a `size`×`size` board, row 1 first.
pub fn all_coordinates(size: usize) -> impl Iterator<Item = BoardCoordinate> {
    (1..=size).flat_map(move |row| (1..=size).map(move |col| BoardCoordinate::new(col, row)))
}

/// Occupancy snapshot of every intersection on an N×N board.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoneConfiguration {
    size: usize,
    cells: Vec<Option<Color>>,
}

impl StoneConfiguration {
    /// An empty board.
    pub fn empty(size: usize) -> Self {
        Self {
            size,
            cells: vec![None; size * size],
        }
    }

    /// Build a configuration from explicit black and white stone sets.
    ///
    /// # Panics
    /// If a coordinate lies off the board.
    pub fn from_stones<B, W>(size: usize, blacks: B, whites: W) -> Self
    where
        B: IntoIterator<Item = BoardCoordinate>,
        W: IntoIterator<Item = BoardCoordinate>,
    {
        let mut config = Self::empty(size);
        for c in blacks {
            config = config.with_stone(c, Color::Black);
        }
        for c in whites {
            config = config.with_stone(c, Color::White);
        }
        config
    }

    /// Parse a text diagram, top row first: `X` black, `O` white, `.` or `+` empty.
    /// Whitespace between points is ignored.
    pub fn from_diagram(rows: &[&str]) -> Option<Self> {
        let size = rows.len();
        let mut config = Self::empty(size);
        for (i, line) in rows.iter().enumerate() {
            let points: Vec<char> = line.chars().filter(|c| !c.is_whitespace()).collect();
            if points.len() != size {
                return None;
            }
            let row = size - i;
            for (j, ch) in points.into_iter().enumerate() {
                let c = BoardCoordinate::new(j + 1, row);
                config = match ch {
                    'X' | 'x' | 'B' => config.with_stone(c, Color::Black),
                    'O' | 'o' | 'W' => config.with_stone(c, Color::White),
                    '.' | '+' => config,
                    _ => return None,
                };
            }
        }
        Some(config)
    }

    fn idx(&self, c: BoardCoordinate) -> usize {
        (c.row - 1) * self.size + (c.col - 1)
    }

    /// Return a copy with `c` occupied by `color`.
    ///
    /// # Panics
    /// If `c` lies off the board.
    pub fn with_stone(mut self, c: BoardCoordinate, color: Color) -> Self {
        assert!(c.is_on_board(self.size), "{c} is off a {0}x{0} board", self.size);
        let i = self.idx(c);
        self.cells[i] = Some(color);
        self
    }

    /// Return a copy with `c` empty.
    pub fn without_stone(mut self, c: BoardCoordinate) -> Self {
        if c.is_on_board(self.size) {
            let i = self.idx(c);
            self.cells[i] = None;
        }
        self
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn get(&self, c: BoardCoordinate) -> Option<Color> {
        if !c.is_on_board(self.size) {
            return None;
        }
        self.cells[self.idx(c)]
    }

    /// All coordinates occupied by `color`.
    pub fn stones(&self, color: Color) -> Stones {
        all_coordinates(self.size)
            .filter(|&c| self.get(c) == Some(color))
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.iter().all(Option::is_none)
    }
}

impl fmt::Display for StoneConfiguration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in (1..=self.size).rev() {
            for col in 1..=self.size {
                let ch = match self.get(BoardCoordinate::new(col, row)) {
                    Some(Color::Black) => 'X',
                    Some(Color::White) => 'O',
                    None => '.',
                };
                write!(f, "{ch} ")?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}
