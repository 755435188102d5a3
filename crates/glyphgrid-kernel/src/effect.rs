//! Time-limited visual effects.
//!
//! An effect tweaks how cells *look* for a number of ticks without touching
//! their state. Effects live in a generational arena; the simulation keeps
//! a global registration-ordered list of live handles and a per-cell list
//! of handles, so one effect can be shared by many cells.
//!
//! Completed effects are dropped from the arena and the global list during
//! `tick()`. Per-cell lists are pruned lazily the next time the cell is
//! visited or drawn, so a stale handle can linger for one tick.

use glyphgrid_common::{CellCoord, Color, EffectId, Rect};
use slotmap::SlotMap;

use crate::grid::Grid;
use crate::sleep::SleepIndex;

/// Rendered look of one cell for one render pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Appearance {
    /// Character drawn in the cell
    pub glyph: char,
    /// Glyph color
    pub fg: Color,
    /// Cell background color
    pub bg: Color,
}

impl Appearance {
    /// Creates an appearance.
    #[must_use]
    pub const fn new(glyph: char, fg: Color, bg: Color) -> Self {
        Self { glyph, fg, bg }
    }
}

/// Read-only view of simulation state handed to effects.
#[derive(Debug)]
pub struct CellView<'a, T> {
    cells: &'a Grid<T>,
    default: &'a T,
    tick: u64,
}

impl<'a, T> CellView<'a, T> {
    pub(crate) fn new(cells: &'a Grid<T>, default: &'a T, tick: u64) -> Self {
        Self {
            cells,
            default,
            tick,
        }
    }

    /// State at a cell, or the default state outside the bounds.
    pub fn get(&self, x: i32, y: i32) -> &'a T {
        self.cells.get(x, y).unwrap_or(self.default)
    }

    /// Current simulation bounds.
    pub fn bounds(&self) -> Rect {
        self.cells.rect()
    }

    /// Current tick counter.
    pub fn tick(&self) -> u64 {
        self.tick
    }
}

/// A time-limited modifier of rendered appearance.
///
/// `tweak_cell` borrows the effect immutably and only sees a read-only view
/// of the simulation, so an effect can change how a cell is drawn but never
/// the cell itself.
pub trait Effect<T> {
    /// Cells this effect may tweak. Read once, at registration.
    fn affected_cells(&self) -> Vec<CellCoord>;

    /// Advance one tick. Not called during the tick the effect was
    /// registered in.
    fn next_tick(&mut self);

    /// Whether the effect has run its course.
    fn done(&self) -> bool;

    /// Adjust one cell's appearance for the current render pass.
    fn tweak_cell(&self, coord: CellCoord, appearance: &mut Appearance, view: &CellView<'_, T>);
}

/// Generational arena owning every registered effect.
pub struct EffectStore<T> {
    effects: SlotMap<EffectId, Box<dyn Effect<T>>>,
    /// Live handles in registration order
    active: Vec<EffectId>,
}

impl<T> Default for EffectStore<T> {
    fn default() -> Self {
        Self {
            effects: SlotMap::with_key(),
            active: Vec::new(),
        }
    }
}

impl<T> EffectStore<T> {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores an effect and appends it to the active list.
    pub fn insert(&mut self, effect: Box<dyn Effect<T>>) -> EffectId {
        let id = self.effects.insert(effect);
        self.active.push(id);
        id
    }

    /// Resolves a handle. Handles to released effects resolve to `None`.
    pub fn get(&self, id: EffectId) -> Option<&dyn Effect<T>> {
        self.effects.get(id).map(|effect| &**effect)
    }

    /// Whether a handle refers to a stored effect that is not yet done.
    pub fn is_live(&self, id: EffectId) -> bool {
        self.get(id).is_some_and(|effect| !effect.done())
    }

    /// Live handles in registration order.
    pub fn active(&self) -> &[EffectId] {
        &self.active
    }

    /// Number of live effects.
    pub fn len(&self) -> usize {
        self.active.len()
    }

    /// Whether no effects are live.
    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }

    /// Advances every active effect once, then releases the ones that are
    /// done. Returns how many were released.
    pub fn advance(&mut self) -> usize {
        for &id in &self.active {
            if let Some(effect) = self.effects.get_mut(id) {
                effect.next_tick();
            }
        }

        let before = self.active.len();
        let effects = &mut self.effects;
        self.active.retain(|&id| {
            let done = effects.get(id).map_or(true, |effect| effect.done());
            if done {
                effects.remove(id);
            }
            !done
        });
        before - self.active.len()
    }
}

impl<T> std::fmt::Debug for EffectStore<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EffectStore")
            .field("effects", &self.effects.len())
            .field("active", &self.active.len())
            .finish()
    }
}

/// Effect arena plus the per-cell handle index.
#[derive(Debug)]
pub struct EffectRegistry<T> {
    store: EffectStore<T>,
    index: Grid<Vec<EffectId>>,
}

impl<T> EffectRegistry<T> {
    /// Creates an empty registry over `bounds`.
    pub fn new(bounds: Rect) -> Self {
        Self {
            store: EffectStore::new(),
            index: Grid::filled(bounds, Vec::new()),
        }
    }

    /// The backing arena.
    pub fn store(&self) -> &EffectStore<T> {
        &self.store
    }

    /// Registers an effect unless it is already done, indexing it under
    /// each of its affected cells and waking their blocks.
    pub fn register(&mut self, effect: Box<dyn Effect<T>>, sleep: &mut SleepIndex) -> Option<EffectId> {
        if effect.done() {
            return None;
        }
        let cells = effect.affected_cells();
        let id = self.store.insert(effect);
        for coord in cells {
            if let Some(list) = self.index.get_mut(coord.x, coord.y) {
                list.push(id);
            }
            sleep.wake_cell(coord.x, coord.y);
        }
        Some(id)
    }

    /// Handles currently indexed at a cell (may include a handle released
    /// during the last tick).
    pub fn at(&self, x: i32, y: i32) -> &[EffectId] {
        self.index.get(x, y).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Whether any handle is indexed at a cell.
    pub fn has_effects(&self, x: i32, y: i32) -> bool {
        !self.at(x, y).is_empty()
    }

    /// Drops every handle at a cell.
    pub fn clear_cell(&mut self, x: i32, y: i32) {
        if let Some(list) = self.index.get_mut(x, y) {
            list.clear();
        }
    }

    /// Removes released or done handles from a cell's list. Returns whether
    /// the list was non-empty beforehand.
    pub fn prune_cell(&mut self, x: i32, y: i32) -> bool {
        let store = &self.store;
        match self.index.get_mut(x, y) {
            Some(list) if !list.is_empty() => {
                list.retain(|id| store.is_live(*id));
                true
            }
            _ => false,
        }
    }

    /// Applies every live effect at a cell in registration order, pruning
    /// done ones as they are met.
    pub fn apply(&mut self, x: i32, y: i32, appearance: &mut Appearance, view: &CellView<'_, T>) {
        let store = &self.store;
        let Some(list) = self.index.get_mut(x, y) else {
            return;
        };
        let coord = CellCoord::new(x, y);
        list.retain(|id| match store.get(*id) {
            Some(effect) if !effect.done() => {
                effect.tweak_cell(coord, appearance, view);
                true
            }
            _ => false,
        });
    }

    /// Advances all effects; see [`EffectStore::advance`].
    pub fn advance(&mut self) -> usize {
        self.store.advance()
    }

    /// Re-covers new bounds, keeping the lists of surviving cells.
    pub fn resize(&mut self, bounds: Rect) {
        self.index = Grid::reblit(bounds, &self.index, &Vec::new());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Countdown {
        cells: Vec<CellCoord>,
        remaining: u32,
        glyph: char,
    }

    impl Effect<u8> for Countdown {
        fn affected_cells(&self) -> Vec<CellCoord> {
            self.cells.clone()
        }

        fn next_tick(&mut self) {
            self.remaining = self.remaining.saturating_sub(1);
        }

        fn done(&self) -> bool {
            self.remaining == 0
        }

        fn tweak_cell(&self, _: CellCoord, appearance: &mut Appearance, _: &CellView<'_, u8>) {
            appearance.glyph = self.glyph;
        }
    }

    fn countdown(remaining: u32, glyph: char, cells: &[(i32, i32)]) -> Box<dyn Effect<u8>> {
        Box::new(Countdown {
            cells: cells.iter().map(|&c| c.into()).collect(),
            remaining,
            glyph,
        })
    }

    fn blank() -> Appearance {
        Appearance::new(' ', Color::WHITE, Color::BLACK)
    }

    #[test]
    fn test_released_handle_stays_stale() {
        let mut store = EffectStore::<u8>::new();
        let first = store.insert(countdown(1, 'a', &[]));
        assert_eq!(store.advance(), 1);
        assert!(store.get(first).is_none());

        // The freed slot is reused; the old handle must not see the newcomer.
        let second = store.insert(countdown(3, 'b', &[]));
        assert_ne!(second, first);
        assert!(store.get(first).is_none());
        assert!(!store.is_live(first));
        assert!(store.is_live(second));
        assert_eq!(store.active(), &[second]);
    }

    #[test]
    fn test_advance_keeps_registration_order() {
        let mut store = EffectStore::<u8>::new();
        let a = store.insert(countdown(3, 'a', &[]));
        let b = store.insert(countdown(1, 'b', &[]));
        let c = store.insert(countdown(2, 'c', &[]));

        assert_eq!(store.advance(), 1);
        assert_eq!(store.active(), &[a, c]);
        assert_eq!(store.advance(), 1);
        assert_eq!(store.active(), &[a]);
        assert!(store.get(b).is_none());
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_register_done_effect_is_noop() {
        let bounds = Rect::sized(4, 4);
        let mut sleep = SleepIndex::new(bounds, 2);
        let mut registry = EffectRegistry::new(bounds);
        assert!(registry.register(countdown(0, 'x', &[(1, 1)]), &mut sleep).is_none());
        assert!(!registry.has_effects(1, 1));
        assert!(registry.store().is_empty());
    }

    #[test]
    fn test_shared_effect_indexed_in_every_cell() {
        let bounds = Rect::sized(4, 4);
        let mut sleep = SleepIndex::new(bounds, 2);
        sleep.set_asleep(glyphgrid_common::BlockCoord::new(1, 1), true);
        let mut registry = EffectRegistry::new(bounds);
        let id = registry
            .register(countdown(2, 'x', &[(0, 0), (3, 3), (9, 9)]), &mut sleep)
            .expect("live effect registers");

        assert_eq!(registry.at(0, 0), &[id]);
        assert_eq!(registry.at(3, 3), &[id]);
        assert!(!sleep.is_cell_asleep(3, 3));

        registry.clear_cell(0, 0);
        assert!(!registry.has_effects(0, 0));
        assert_eq!(registry.at(3, 3), &[id]);
    }

    #[test]
    fn test_apply_in_registration_order_and_prune() {
        let bounds = Rect::sized(2, 2);
        let mut sleep = SleepIndex::new(bounds, 2);
        let mut registry = EffectRegistry::new(bounds);
        registry.register(countdown(1, 'a', &[(0, 0)]), &mut sleep);
        registry.register(countdown(5, 'b', &[(0, 0)]), &mut sleep);

        let cells = Grid::filled(bounds, 0u8);
        let view = CellView::new(&cells, &0, 0);
        let mut look = blank();
        registry.apply(0, 0, &mut look, &view);
        assert_eq!(look.glyph, 'b');

        registry.advance();
        // Released handle lingers until the cell is visited.
        assert_eq!(registry.at(0, 0).len(), 2);
        let mut look = blank();
        registry.apply(0, 0, &mut look, &view);
        assert_eq!(look.glyph, 'b');
        assert_eq!(registry.at(0, 0).len(), 1);
    }

    #[test]
    fn test_prune_reports_previous_contents() {
        let bounds = Rect::sized(2, 2);
        let mut sleep = SleepIndex::new(bounds, 2);
        let mut registry = EffectRegistry::new(bounds);
        registry.register(countdown(1, 'a', &[(1, 0)]), &mut sleep);
        registry.advance();

        assert!(registry.prune_cell(1, 0));
        assert!(!registry.has_effects(1, 0));
        assert!(!registry.prune_cell(1, 0));
    }
}
