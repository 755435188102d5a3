//! Origin-addressed rectangular cell storage.
//!
//! A `Grid<T>` covers a [`Rect`] in absolute cell coordinates. Reads outside
//! the rectangle return `None` and writes outside it are refused, so callers
//! never have to translate coordinates themselves.
//!
//! Grids never grow in place. Resizing builds a new grid over the new
//! rectangle and re-blits every coordinate from the old one, filling
//! coordinates the old grid did not cover with a fallback.

use glyphgrid_common::Rect;

/// Bounds-checked rectangular array keyed by absolute coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct Grid<T> {
    rect: Rect,
    cells: Vec<T>,
}

impl<T> Grid<T> {
    /// Make a grid by evaluating each absolute coordinate with a closure.
    pub fn from_fn<F>(rect: Rect, mut cell_at: F) -> Self
    where
        F: FnMut(i32, i32) -> T,
    {
        let mut cells = Vec::with_capacity(rect.area());
        cells.extend(rect.cells().map(|(x, y)| cell_at(x, y)));
        Self { rect, cells }
    }

    /// Make a grid by cloning a fill value into every cell.
    pub fn filled(rect: Rect, value: T) -> Self
    where
        T: Clone,
    {
        Self {
            rect,
            cells: vec![value; rect.area()],
        }
    }

    /// Make a grid over `rect` from the contents of `old`, using `fallback`
    /// for coordinates outside `old`'s rectangle.
    pub fn reblit(rect: Rect, old: &Grid<T>, fallback: &T) -> Self
    where
        T: Clone,
    {
        Self::from_fn(rect, |x, y| old.get(x, y).unwrap_or(fallback).clone())
    }

    /// Like [`Grid::reblit`], generating newly exposed cells with a closure.
    pub fn reblit_with<F>(rect: Rect, old: &Grid<T>, mut fallback: F) -> Self
    where
        T: Clone,
        F: FnMut(i32, i32) -> T,
    {
        Self::from_fn(rect, |x, y| match old.get(x, y) {
            Some(value) => value.clone(),
            None => fallback(x, y),
        })
    }

    /// The area this grid covers.
    #[inline]
    pub fn rect(&self) -> Rect {
        self.rect
    }

    #[inline]
    fn index(&self, x: i32, y: i32) -> Option<usize> {
        if !self.rect.contains(x, y) {
            return None;
        }
        let local_x = (x - self.rect.x) as usize;
        let local_y = (y - self.rect.y) as usize;
        Some(local_y * self.rect.width as usize + local_x)
    }

    /// Get a cell, or `None` outside the grid.
    #[inline]
    pub fn get(&self, x: i32, y: i32) -> Option<&T> {
        self.index(x, y).map(|i| &self.cells[i])
    }

    /// Get a cell mutably, or `None` outside the grid.
    #[inline]
    pub fn get_mut(&mut self, x: i32, y: i32) -> Option<&mut T> {
        self.index(x, y).map(move |i| &mut self.cells[i])
    }

    /// Write a cell. Returns `false`, leaving storage untouched, when the
    /// coordinate is outside the grid.
    #[inline]
    pub fn set(&mut self, x: i32, y: i32, value: T) -> bool {
        match self.get_mut(x, y) {
            Some(slot) => {
                *slot = value;
                true
            }
            None => false,
        }
    }

    /// Row-major iterator over `(x, y, &cell)`.
    pub fn iter(&self) -> impl Iterator<Item = (i32, i32, &T)> + '_ {
        self.rect
            .cells()
            .zip(self.cells.iter())
            .map(|((x, y), cell)| (x, y, cell))
    }

    /// Number of cells in the grid.
    #[inline]
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Whether the grid covers no cells.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}
