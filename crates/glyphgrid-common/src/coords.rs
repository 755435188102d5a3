//! Coordinate types for cells, sleep blocks, and rectangular areas.

use serde::{Deserialize, Serialize};

/// Absolute cell coordinate in simulation space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CellCoord {
    /// X coordinate in cells
    pub x: i32,
    /// Y coordinate in cells
    pub y: i32,
}

impl CellCoord {
    /// Creates a new cell coordinate.
    #[must_use]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Converts to the coordinate of the sleep block containing this cell.
    #[must_use]
    pub const fn to_block(self, ratio: u32) -> BlockCoord {
        let ratio = ratio as i32;
        BlockCoord {
            x: self.x.div_euclid(ratio),
            y: self.y.div_euclid(ratio),
        }
    }
}

impl From<(i32, i32)> for CellCoord {
    fn from((x, y): (i32, i32)) -> Self {
        Self::new(x, y)
    }
}

/// Coordinate of a coarse `ratio × ratio` sleep block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BlockCoord {
    /// X coordinate in block space
    pub x: i32,
    /// Y coordinate in block space
    pub y: i32,
}

impl BlockCoord {
    /// Creates a new block coordinate.
    #[must_use]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Returns the cells covered by this block (before clipping to any bounds).
    #[must_use]
    pub const fn cell_rect(self, ratio: u32) -> Rect {
        let ratio = ratio as i32;
        Rect::new(self.x * ratio, self.y * ratio, ratio, ratio)
    }
}

/// Integer rectangle in cell space.
///
/// A rectangle with a non-positive width or height is empty and contains
/// no cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Rect {
    /// X coordinate of the left edge.
    pub x: i32,
    /// Y coordinate of the top edge.
    pub y: i32,
    /// Width in cells.
    pub width: i32,
    /// Height in cells.
    pub height: i32,
}

impl Rect {
    /// Creates a new rectangle.
    #[must_use]
    pub const fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Creates a rectangle anchored at the origin.
    #[must_use]
    pub const fn sized(width: i32, height: i32) -> Self {
        Self::new(0, 0, width, height)
    }

    /// Exclusive right edge.
    #[must_use]
    pub const fn right(&self) -> i32 {
        self.x + self.width
    }

    /// Exclusive bottom edge.
    #[must_use]
    pub const fn bottom(&self) -> i32 {
        self.y + self.height
    }

    /// Whether the rectangle contains no cells.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.width <= 0 || self.height <= 0
    }

    /// Number of cells in the rectangle.
    #[must_use]
    pub const fn area(&self) -> usize {
        if self.is_empty() {
            0
        } else {
            self.width as usize * self.height as usize
        }
    }

    /// Checks if the rectangle contains a cell.
    #[must_use]
    pub const fn contains(&self, x: i32, y: i32) -> bool {
        x >= self.x && x < self.right() && y >= self.y && y < self.bottom()
    }

    /// Overlapping area of two rectangles, if any.
    #[must_use]
    pub fn intersection(&self, other: &Rect) -> Option<Rect> {
        let x = self.x.max(other.x);
        let y = self.y.max(other.y);
        let right = self.right().min(other.right());
        let bottom = self.bottom().min(other.bottom());
        let rect = Rect::new(x, y, right - x, bottom - y);
        (!rect.is_empty()).then_some(rect)
    }

    /// Smallest block-space rectangle covering every cell of this one.
    #[must_use]
    pub fn block_cover(&self, ratio: u32) -> Rect {
        if self.is_empty() {
            return Rect::new(self.x.div_euclid(ratio as i32), self.y.div_euclid(ratio as i32), 0, 0);
        }
        let ratio = ratio as i32;
        let x = self.x.div_euclid(ratio);
        let y = self.y.div_euclid(ratio);
        let right = (self.right() - 1).div_euclid(ratio) + 1;
        let bottom = (self.bottom() - 1).div_euclid(ratio) + 1;
        Rect::new(x, y, right - x, bottom - y)
    }

    /// Row-major iterator over every cell coordinate in the rectangle.
    pub fn cells(&self) -> impl Iterator<Item = (i32, i32)> {
        let Rect {
            x,
            y,
            width,
            height,
        } = *self;
        let width = width.max(0);
        (y..y + height.max(0)).flat_map(move |cy| (x..x + width).map(move |cx| (cx, cy)))
    }
}
