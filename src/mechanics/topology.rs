//! Torus topology: grid dimensions plus neighborhood shape.

use crate::Position;

/// Which of the nine offsets around a cell count as its neighborhood.
/// Coordinates wrap in both axes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Topology {
    width: u32,
    height: u32,
    diagonal: bool,
    self_inclusive: bool,
}

impl Topology {
    pub fn new(width: u32, height: u32, diagonal: bool, self_inclusive: bool) -> Self {
        assert!(width > 0 && height > 0, "torus dimensions must be non-zero");
        Self {
            width,
            height,
            diagonal,
            self_inclusive,
        }
    }

    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }

    #[must_use]
    pub const fn diagonal(&self) -> bool {
        self.diagonal
    }

    #[must_use]
    pub const fn self_inclusive(&self) -> bool {
        self.self_inclusive
    }

    #[must_use]
    pub const fn cell_count(&self) -> usize {
        (self.width as usize) * (self.height as usize)
    }

    /// Adjacency predicate on an offset in `{-1,0,1}²`.
    #[inline]
    pub const fn adjacent(&self, dx: i32, dy: i32) -> bool {
        (self.diagonal || dx == 0 || dy == 0) && (self.self_inclusive || dx != 0 || dy != 0)
    }

    /// Number of neighbor slots per cell (8-torus: 8, or 9 with self).
    pub fn degree(&self) -> u32 {
        let mut n = 0;
        for dx in -1..=1 {
            for dy in -1..=1 {
                if self.adjacent(dx, dy) {
                    n += 1;
                }
            }
        }
        n
    }

    #[inline]
    pub fn contains(&self, pos: Position) -> bool {
        pos.x < self.width && pos.y < self.height
    }

    #[inline]
    pub fn wrap(&self, x: i64, y: i64) -> Position {
        Position::new(
            x.rem_euclid(self.width as i64) as u32,
            y.rem_euclid(self.height as i64) as u32,
        )
    }

    /// Neighbor positions of `pos` in `dx`-major, then `dy` order.
    ///
    /// On tori narrower than three cells the same position can appear more
    /// than once; callers count it with that multiplicity.
    pub fn neighbors(&self, pos: Position) -> impl Iterator<Item = Position> + use<> {
        assert!(self.contains(pos), "position {pos:?} outside {}x{}", self.width, self.height);
        let mut out = [Position::new(0, 0); 9];
        let mut n = 0;
        for dx in -1..=1 {
            for dy in -1..=1 {
                if self.adjacent(dx, dy) {
                    out[n] = self.wrap(pos.x as i64 + dx as i64, pos.y as i64 + dy as i64);
                    n += 1;
                }
            }
        }
        out.into_iter().take(n)
    }

    /// Flat row-major offset of `pos`.
    #[inline]
    pub fn index(&self, pos: Position) -> usize {
        assert!(self.contains(pos), "position {pos:?} outside {}x{}", self.width, self.height);
        (pos.y as usize) * (self.width as usize) + (pos.x as usize)
    }

    /// All positions, `x`-major.
    pub fn positions(&self) -> impl Iterator<Item = Position> + use<> {
        let (w, h) = (self.width, self.height);
        (0..w).flat_map(move |x| (0..h).map(move |y| Position::new(x, y)))
    }
}
