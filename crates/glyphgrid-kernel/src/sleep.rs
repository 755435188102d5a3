//! Coarse sleep/wake scheduling.
//!
//! The simulation area is divided into `ratio × ratio` blocks. A block whose
//! cells all reported no further activity is put to sleep and skipped by
//! the tick scheduler until a write, an effect, or an active neighbor wakes
//! it again.

use glyphgrid_common::{BlockCoord, CellCoord, Rect};

use crate::grid::Grid;

/// Default block edge length in cells.
pub const DEFAULT_SLEEP_RATIO: u32 = 8;

/// Largest accepted block edge length. Block math is done in `i32` cell
/// space, so the ratio must stay well inside it.
pub const MAX_SLEEP_RATIO: u32 = 1 << 16;

/// Number of blocks a wake radius (in cells) reaches.
///
/// Rounds up, so any non-zero radius wakes at least the adjacent blocks.
#[must_use]
pub fn wake_radius_blocks(wake_radius: u32, ratio: u32) -> i32 {
    wake_radius.div_ceil(ratio.max(1)) as i32
}

/// Per-block sleep flags over the blocks covering the simulation bounds.
#[derive(Debug, Clone)]
pub struct SleepIndex {
    ratio: u32,
    /// `true` = asleep
    asleep: Grid<bool>,
}

impl SleepIndex {
    /// Creates an index covering `bounds` with every block awake.
    pub fn new(bounds: Rect, ratio: u32) -> Self {
        let ratio = ratio.max(1);
        Self {
            ratio,
            asleep: Grid::filled(bounds.block_cover(ratio), false),
        }
    }

    /// Block edge length in cells.
    #[inline]
    pub fn ratio(&self) -> u32 {
        self.ratio
    }

    /// Block-space rectangle covered by this index.
    #[inline]
    pub fn block_rect(&self) -> Rect {
        self.asleep.rect()
    }

    /// Per-block flags over [`SleepIndex::block_rect`]; `true` = asleep.
    #[inline]
    pub fn flags(&self) -> &Grid<bool> {
        &self.asleep
    }

    /// Block containing a cell.
    #[inline]
    pub fn block_of(&self, x: i32, y: i32) -> BlockCoord {
        CellCoord::new(x, y).to_block(self.ratio)
    }

    /// Cells of `block` that fall inside `bounds`.
    pub fn block_cells(&self, block: BlockCoord, bounds: &Rect) -> Option<Rect> {
        block.cell_rect(self.ratio).intersection(bounds)
    }

    /// Whether a block is asleep. Blocks outside the index are never asleep.
    #[inline]
    pub fn is_block_asleep(&self, block: BlockCoord) -> bool {
        self.asleep.get(block.x, block.y).copied().unwrap_or(false)
    }

    /// Whether the block containing a cell is asleep.
    #[inline]
    pub fn is_cell_asleep(&self, x: i32, y: i32) -> bool {
        self.is_block_asleep(self.block_of(x, y))
    }

    /// Marks a block asleep or awake.
    #[inline]
    pub fn set_asleep(&mut self, block: BlockCoord, asleep: bool) {
        self.asleep.set(block.x, block.y, asleep);
    }

    /// Wakes a block.
    #[inline]
    pub fn wake_block(&mut self, block: BlockCoord) {
        self.set_asleep(block, false);
    }

    /// Wakes the block containing a cell.
    #[inline]
    pub fn wake_cell(&mut self, x: i32, y: i32) {
        self.wake_block(self.block_of(x, y));
    }

    /// Wakes every block within `radius` blocks of `center`, inclusive.
    pub fn wake_around(&mut self, center: BlockCoord, radius: i32) {
        for dy in -radius..=radius {
            for dx in -radius..=radius {
                self.wake_block(BlockCoord::new(center.x + dx, center.y + dy));
            }
        }
    }

    /// Blocks currently awake, in row-major order.
    pub fn awake_blocks(&self) -> Vec<BlockCoord> {
        self.asleep
            .iter()
            .filter(|(_, _, asleep)| !**asleep)
            .map(|(x, y, _)| BlockCoord::new(x, y))
            .collect()
    }

    /// Number of awake blocks.
    pub fn awake_count(&self) -> usize {
        self.asleep.iter().filter(|(_, _, asleep)| !**asleep).count()
    }

    /// Re-covers new bounds. Surviving blocks keep their state; newly
    /// exposed blocks start awake.
    pub fn resize(&mut self, bounds: Rect) {
        let rect = bounds.block_cover(self.ratio);
        self.asleep = Grid::reblit(rect, &self.asleep, &false);
    }
}
