//! Simulation engine.
//!
//! A [`Simulation`] owns the cell grid and the bookkeeping around it:
//! - a dirty grid, so `render` only repaints what changed
//! - a sleep index, so `tick` skips blocks with nothing going on
//! - an effect registry for time-limited appearance tweaks
//! - a queue of deferred updates
//!
//! ## Tick consistency
//!
//! Per-cell callbacks run in row-major order, but no callback may observe
//! another cell's result from the same tick. Callbacks therefore only get a
//! [`TickContext`], which can queue updates but not write directly; queued
//! transforms are applied once every awake cell has been visited.
//!
//! ## Scheduling
//!
//! Nothing here runs on its own. The host decides when to call
//! [`Simulation::tick`] and [`Simulation::render`].

use glyphgrid_common::{BlockCoord, Color, EffectId, GlyphGridResult, Rect, TargetId};
use tracing::{debug, trace, warn};

use crate::config::SimulationSettings;
use crate::effect::{Appearance, CellView, Effect, EffectRegistry};
use crate::font::Font;
use crate::grid::Grid;
use crate::raster::{check_capabilities, DrawTarget};
use crate::sleep::{wake_radius_blocks, SleepIndex};

/// Background tint for cells in sleeping blocks when highlighting is on.
const SLEEP_HIGHLIGHT: Color = Color::rgb(0.0, 0.0, 0.35);

/// How far the background is pulled toward [`SLEEP_HIGHLIGHT`].
const SLEEP_HIGHLIGHT_AMOUNT: f32 = 0.5;

/// What a cell reports after its tick callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CellActivity {
    /// Keep this cell's block awake.
    #[default]
    Continue,
    /// Nothing further to do; the block may sleep.
    Sleep,
}

/// Source of the simulation area.
pub enum Bounds {
    /// Fixed area.
    Fixed(Rect),
    /// Area recomputed at the end of every tick.
    Dynamic(Box<dyn FnMut() -> Rect>),
}

impl Bounds {
    fn evaluate(&mut self) -> Rect {
        match self {
            Self::Fixed(rect) => *rect,
            Self::Dynamic(source) => source(),
        }
    }
}

impl std::fmt::Debug for Bounds {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Fixed(rect) => f.debug_tuple("Fixed").field(rect).finish(),
            Self::Dynamic(_) => f.write_str("Dynamic"),
        }
    }
}

type AppearanceFn<T, V> = Box<dyn Fn(&T, i32, i32) -> V>;
type TickFn<T> = Box<dyn FnMut(&T, i32, i32, &mut TickContext<'_, T>) -> CellActivity>;
type InitFn<T> = Box<dyn FnOnce(&mut Simulation<T>)>;
type Transform<T> = Box<dyn FnOnce(&T) -> T>;

struct PendingUpdate<T> {
    x: i32,
    y: i32,
    transform: Transform<T>,
}

/// Counters from the most recent tick and render.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SimulationStats {
    /// Blocks visited by the last tick
    pub blocks_visited: usize,
    /// Cells whose callback ran in the last tick
    pub cells_visited: usize,
    /// Deferred updates applied by the last tick
    pub updates_applied: usize,
    /// Effects released by the last tick
    pub effects_released: usize,
    /// Blocks awake after the last tick
    pub awake_blocks: usize,
    /// Cells drawn by the last render
    pub cells_drawn: usize,
    /// Whether the last render repainted everything
    pub full_repaint: bool,
}

/// Handle given to per-cell tick callbacks.
///
/// Reads see the state as of the start of the tick. Writes can only be
/// queued with [`TickContext::update`].
pub struct TickContext<'a, T> {
    cells: &'a Grid<T>,
    default: &'a T,
    pending: &'a mut Vec<PendingUpdate<T>>,
    effects: &'a mut EffectRegistry<T>,
    sleep: &'a mut SleepIndex,
    tick: u64,
}

impl<'a, T: 'static> TickContext<'a, T> {
    /// State at a cell, or the default state outside the bounds.
    pub fn get(&self, x: i32, y: i32) -> &T {
        self.cells.get(x, y).unwrap_or(self.default)
    }

    /// Queues a transform of a cell's state, applied after this tick's sweep.
    pub fn update<F>(&mut self, x: i32, y: i32, transform: F)
    where
        F: FnOnce(&T) -> T + 'static,
    {
        self.pending.push(PendingUpdate {
            x,
            y,
            transform: Box::new(transform),
        });
    }

    /// Registers an effect; see [`Simulation::add_effect`].
    pub fn add_effect<E>(&mut self, effect: E) -> Option<EffectId>
    where
        E: Effect<T> + 'static,
    {
        self.effects.register(Box::new(effect), self.sleep)
    }

    /// Drops every effect reference at a cell.
    pub fn clear_effects(&mut self, x: i32, y: i32) {
        self.effects.clear_cell(x, y);
    }

    /// Effect references at a cell.
    pub fn get_effects(&self, x: i32, y: i32) -> &[EffectId] {
        self.effects.at(x, y)
    }

    /// Resolves an effect reference.
    pub fn effect(&self, id: EffectId) -> Option<&dyn Effect<T>> {
        self.effects.store().get(id)
    }

    /// Tick counter at the start of this tick.
    pub fn tick(&self) -> u64 {
        self.tick
    }

    /// Current simulation bounds.
    pub fn bounds(&self) -> Rect {
        self.cells.rect()
    }
}

/// Configures and constructs a [`Simulation`].
pub struct SimulationBuilder<T> {
    default: T,
    glyph: AppearanceFn<T, char>,
    fg: AppearanceFn<T, Color>,
    bg: AppearanceFn<T, Color>,
    init_cells: Option<Box<dyn FnMut(i32, i32) -> T>>,
    on_init: Option<InitFn<T>>,
    on_tick: Option<TickFn<T>>,
    bounds: Bounds,
    settings: SimulationSettings,
}

impl<T: Clone + 'static> SimulationBuilder<T> {
    /// Starts a builder with a default cell state and fixed bounds. Cells
    /// render as white-on-black spaces until appearance functions are set.
    pub fn new(default: T, bounds: Rect) -> Self {
        Self {
            default,
            glyph: Box::new(|_: &T, _, _| ' '),
            fg: Box::new(|_: &T, _, _| Color::WHITE),
            bg: Box::new(|_: &T, _, _| Color::BLACK),
            init_cells: None,
            on_init: None,
            on_tick: None,
            bounds: Bounds::Fixed(bounds),
            settings: SimulationSettings::default(),
        }
    }

    /// Glyph for a cell state.
    pub fn glyph(mut self, f: impl Fn(&T, i32, i32) -> char + 'static) -> Self {
        self.glyph = Box::new(f);
        self
    }

    /// Foreground color for a cell state.
    pub fn foreground(mut self, f: impl Fn(&T, i32, i32) -> Color + 'static) -> Self {
        self.fg = Box::new(f);
        self
    }

    /// Background color for a cell state.
    pub fn background(mut self, f: impl Fn(&T, i32, i32) -> Color + 'static) -> Self {
        self.bg = Box::new(f);
        self
    }

    /// Generates each cell's initial state instead of the default.
    pub fn init_cells(mut self, f: impl FnMut(i32, i32) -> T + 'static) -> Self {
        self.init_cells = Some(Box::new(f));
        self
    }

    /// Runs once on the freshly built simulation.
    pub fn on_init(mut self, f: impl FnOnce(&mut Simulation<T>) + 'static) -> Self {
        self.on_init = Some(Box::new(f));
        self
    }

    /// Per-cell callback run for every cell in an awake block each tick.
    pub fn on_tick(
        mut self,
        f: impl FnMut(&T, i32, i32, &mut TickContext<'_, T>) -> CellActivity + 'static,
    ) -> Self {
        self.on_tick = Some(Box::new(f));
        self
    }

    /// Recomputes the bounds at the end of every tick.
    pub fn dynamic_bounds(mut self, f: impl FnMut() -> Rect + 'static) -> Self {
        self.bounds = Bounds::Dynamic(Box::new(f));
        self
    }

    /// Replaces all settings.
    pub fn settings(mut self, settings: SimulationSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Cell distance over which activity keeps neighboring blocks awake.
    pub fn wake_radius(mut self, radius: u32) -> Self {
        self.settings.wake_radius = radius;
        self
    }

    /// Sleep block edge length in cells.
    pub fn sleep_ratio(mut self, ratio: u32) -> Self {
        self.settings.sleep_ratio = ratio;
        self
    }

    /// Debug: repaint every cell on every render.
    pub fn always_render(mut self, enabled: bool) -> Self {
        self.settings.always_render = enabled;
        self
    }

    /// Debug: tint cells in sleeping blocks.
    pub fn highlight_asleep(mut self, enabled: bool) -> Self {
        self.settings.highlight_asleep = enabled;
        self
    }

    /// Builds the simulation and runs the `on_init` hook.
    pub fn build(self) -> GlyphGridResult<Simulation<T>> {
        self.settings.validate()?;

        let mut bounds_source = self.bounds;
        let bounds = bounds_source.evaluate();
        let cells = match self.init_cells {
            Some(init) => Grid::from_fn(bounds, init),
            None => Grid::filled(bounds, self.default.clone()),
        };

        let mut simulation = Simulation {
            default: self.default,
            glyph: self.glyph,
            fg: self.fg,
            bg: self.bg,
            on_tick: self.on_tick,
            bounds_source,
            bounds,
            cells,
            dirty: Grid::filled(bounds, true),
            sleep: SleepIndex::new(bounds, self.settings.sleep_ratio),
            effects: EffectRegistry::new(bounds),
            pending: Vec::new(),
            settings: self.settings,
            tick: 0,
            last_target: None,
            last_render_rect: None,
            rendered_sleep: None,
            stats: SimulationStats::default(),
        };

        if let Some(on_init) = self.on_init {
            on_init(&mut simulation);
        }
        Ok(simulation)
    }
}

/// Cellular automaton over a grid of `T`, rendered as colored glyphs.
pub struct Simulation<T> {
    default: T,
    glyph: AppearanceFn<T, char>,
    fg: AppearanceFn<T, Color>,
    bg: AppearanceFn<T, Color>,
    on_tick: Option<TickFn<T>>,
    bounds_source: Bounds,
    bounds: Rect,
    settings: SimulationSettings,
    cells: Grid<T>,
    dirty: Grid<bool>,
    sleep: SleepIndex,
    effects: EffectRegistry<T>,
    pending: Vec<PendingUpdate<T>>,
    tick: u64,
    last_target: Option<TargetId>,
    last_render_rect: Option<Rect>,
    /// Sleep flags as of the last render, kept while highlighting
    rendered_sleep: Option<Grid<bool>>,
    stats: SimulationStats,
}

impl<T: Clone + 'static> Simulation<T> {
    /// Starts configuring a simulation.
    pub fn builder(default: T, bounds: Rect) -> SimulationBuilder<T> {
        SimulationBuilder::new(default, bounds)
    }

    /// Writes a cell immediately.
    ///
    /// Must not be called from inside a tick callback: the write would be
    /// visible to cells visited later in the same tick. Writes outside the
    /// bounds are logged and ignored.
    pub fn set(&mut self, x: i32, y: i32, state: T) -> bool {
        if !self.cells.set(x, y, state) {
            warn!("Ignoring set({x}, {y}) outside simulation bounds {:?}", self.bounds);
            return false;
        }
        self.dirty.set(x, y, true);
        self.sleep.wake_cell(x, y);
        true
    }

    /// Current state of a cell, or the default state outside the bounds.
    pub fn get(&self, x: i32, y: i32) -> &T {
        self.cells.get(x, y).unwrap_or(&self.default)
    }

    /// Queues a transform of a cell's state for the end of the next tick.
    /// Transforms for the same cell apply in the order they were queued.
    pub fn update<F>(&mut self, x: i32, y: i32, transform: F)
    where
        F: FnOnce(&T) -> T + 'static,
    {
        self.pending.push(PendingUpdate {
            x,
            y,
            transform: Box::new(transform),
        });
    }

    /// Registers an effect, indexing it under each of its affected cells
    /// and waking their blocks. An effect that is already done is dropped
    /// and `None` returned.
    pub fn add_effect<E>(&mut self, effect: E) -> Option<EffectId>
    where
        E: Effect<T> + 'static,
    {
        self.effects.register(Box::new(effect), &mut self.sleep)
    }

    /// Drops every effect reference at a cell. Other cells sharing the same
    /// effects keep theirs.
    pub fn clear_effects(&mut self, x: i32, y: i32) {
        self.effects.clear_cell(x, y);
    }

    /// Effect references at a cell. May include an effect that finished
    /// during the last tick and has not been pruned yet.
    pub fn get_effects(&self, x: i32, y: i32) -> &[EffectId] {
        self.effects.at(x, y)
    }

    /// Resolves an effect reference; `None` once the effect is done.
    pub fn effect(&self, id: EffectId) -> Option<&dyn Effect<T>> {
        self.effects.store().get(id)
    }

    /// Number of live effects.
    pub fn effect_count(&self) -> usize {
        self.effects.store().len()
    }

    /// Number of completed ticks.
    pub fn get_tick(&self) -> u64 {
        self.tick
    }

    /// Current simulation area.
    pub fn bounds(&self) -> Rect {
        self.bounds
    }

    /// Active settings.
    pub fn settings(&self) -> &SimulationSettings {
        &self.settings
    }

    /// Counters from the most recent tick and render.
    pub fn stats(&self) -> SimulationStats {
        self.stats
    }

    /// Whether the block containing a cell is asleep.
    pub fn is_asleep(&self, x: i32, y: i32) -> bool {
        self.sleep.is_cell_asleep(x, y)
    }

    /// Whether a cell is waiting to be redrawn.
    pub fn is_dirty(&self, x: i32, y: i32) -> bool {
        self.dirty.get(x, y).copied().unwrap_or(false)
    }

    /// Advances the simulation one step.
    pub fn tick(&mut self) {
        let effects_released = self.effects.advance();

        let (blocks_visited, cells_visited, stayed_awake) = self.sweep();

        let radius = wake_radius_blocks(self.settings.wake_radius, self.sleep.ratio());
        for block in stayed_awake {
            self.sleep.wake_around(block, radius);
        }

        self.refresh_bounds();
        let updates_applied = self.apply_pending();

        self.tick += 1;
        self.stats.blocks_visited = blocks_visited;
        self.stats.cells_visited = cells_visited;
        self.stats.updates_applied = updates_applied;
        self.stats.effects_released = effects_released;
        self.stats.awake_blocks = self.sleep.awake_count();
        trace!(
            "Tick {}: {} blocks, {} cells, {} updates, {} awake",
            self.tick,
            blocks_visited,
            cells_visited,
            updates_applied,
            self.stats.awake_blocks
        );
    }

    /// Runs the tick callback over every awake block. Blocks are chosen up
    /// front, so a block woken mid-sweep is first visited next tick.
    fn sweep(&mut self) -> (usize, usize, Vec<BlockCoord>) {
        let blocks = self.sleep.awake_blocks();
        let mut stayed_awake = Vec::new();
        let mut cells_visited = 0;

        for &block in &blocks {
            self.sleep.set_asleep(block, true);
            let Some(area) = self.sleep.block_cells(block, &self.bounds) else {
                continue;
            };

            let mut awake = false;
            for (x, y) in area.cells() {
                cells_visited += 1;
                if self.effects.prune_cell(x, y) {
                    self.dirty.set(x, y, true);
                }

                let Some(on_tick) = self.on_tick.as_mut() else {
                    continue;
                };
                let state = self.cells.get(x, y).unwrap_or(&self.default);
                let mut ctx = TickContext {
                    cells: &self.cells,
                    default: &self.default,
                    pending: &mut self.pending,
                    effects: &mut self.effects,
                    sleep: &mut self.sleep,
                    tick: self.tick,
                };
                if on_tick(state, x, y, &mut ctx) == CellActivity::Continue {
                    awake = true;
                }
            }

            if awake {
                self.sleep.wake_block(block);
                stayed_awake.push(block);
            }
        }

        (blocks.len(), cells_visited, stayed_awake)
    }

    /// Re-evaluates dynamic bounds and re-covers every grid on change.
    fn refresh_bounds(&mut self) {
        let next = self.bounds_source.evaluate();
        if next == self.bounds {
            return;
        }
        debug!("Simulation bounds changed from {:?} to {:?}", self.bounds, next);
        self.cells = Grid::reblit(next, &self.cells, &self.default);
        // Cell positions no longer line up with the old pixels.
        self.dirty = Grid::filled(next, true);
        self.effects.resize(next);
        self.sleep.resize(next);
        self.bounds = next;
    }

    fn apply_pending(&mut self) -> usize {
        let pending = std::mem::take(&mut self.pending);
        let mut applied = 0;
        for PendingUpdate { x, y, transform } in pending {
            let Some(current) = self.cells.get(x, y) else {
                warn!("Ignoring update({x}, {y}) outside simulation bounds {:?}", self.bounds);
                continue;
            };
            let next = transform(current);
            self.cells.set(x, y, next);
            self.dirty.set(x, y, true);
            self.sleep.wake_cell(x, y);
            applied += 1;
        }
        applied
    }

    /// Paints the simulation onto `target`.
    ///
    /// `rect` selects the cells to draw (default: the whole bounds); cell
    /// `(rect.x, rect.y)` lands at the target's origin. The whole rect is
    /// repainted on the first render, when the target or rect changes, when
    /// `force_full` is set, or with `always_render`; otherwise only dirty
    /// cells and cells carrying effects are redrawn.
    pub fn render(
        &mut self,
        target: &mut dyn DrawTarget,
        font: &mut Font,
        rect: Option<Rect>,
        force_full: bool,
    ) -> GlyphGridResult<()> {
        let rect = rect.unwrap_or(self.bounds);
        let target_id = target.target_id();
        let new_target = self.last_target != Some(target_id);
        if new_target {
            check_capabilities(&*target)?;
        }

        let full = new_target
            || self.last_render_rect != Some(rect)
            || force_full
            || self.settings.always_render;
        self.last_target = Some(target_id);
        self.last_render_rect = Some(rect);
        if self.settings.highlight_asleep && !full {
            self.mark_sleep_changes_dirty();
        }

        let mut drawn = 0;
        for (x, y) in rect.cells() {
            if full || self.is_dirty(x, y) || self.effects.has_effects(x, y) {
                self.draw_cell(target, font, rect, x, y);
                drawn += 1;
            }
        }

        self.rendered_sleep = self
            .settings
            .highlight_asleep
            .then(|| self.sleep.flags().clone());
        self.stats.cells_drawn = drawn;
        self.stats.full_repaint = full;
        Ok(())
    }

    /// Marks every cell of a block dirty if the block fell asleep or woke
    /// since the last render, so the highlight tint follows it.
    fn mark_sleep_changes_dirty(&mut self) {
        let Some(previous) = &self.rendered_sleep else {
            return;
        };
        for (bx, by, &asleep) in self.sleep.flags().iter() {
            if previous.get(bx, by).copied().unwrap_or(false) == asleep {
                continue;
            }
            let Some(area) = self.sleep.block_cells(BlockCoord::new(bx, by), &self.bounds) else {
                continue;
            };
            for (x, y) in area.cells() {
                self.dirty.set(x, y, true);
            }
        }
    }

    fn draw_cell(&mut self, target: &mut dyn DrawTarget, font: &mut Font, rect: Rect, x: i32, y: i32) {
        let state = self.cells.get(x, y).unwrap_or(&self.default);
        let mut appearance = Appearance::new(
            (self.glyph)(state, x, y),
            (self.fg)(state, x, y),
            (self.bg)(state, x, y),
        );

        let view = CellView::new(&self.cells, &self.default, self.tick);
        self.effects.apply(x, y, &mut appearance, &view);

        if self.settings.highlight_asleep && self.sleep.is_cell_asleep(x, y) {
            appearance.bg = appearance.bg.mix(SLEEP_HIGHLIGHT, SLEEP_HIGHLIGHT_AMOUNT);
        }

        font.draw_char(
            target,
            appearance.glyph,
            x - rect.x,
            y - rect.y,
            appearance.fg,
            appearance.bg,
        );
        self.dirty.set(x, y, false);
    }
}

impl<T> std::fmt::Debug for Simulation<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Simulation")
            .field("bounds", &self.bounds)
            .field("bounds_source", &self.bounds_source)
            .field("tick", &self.tick)
            .field("settings", &self.settings)
            .field("pending", &self.pending.len())
            .field("effects", &self.effects.store().len())
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fade::FadeEffect;
    use crate::font::{HeightMode, FULL_BLOCK};
    use crate::raster::{CompositeOp, GlyphMask, PixelRect, Pixmap};
    use glyphgrid_common::{CellCoord, ConfigError, GlyphGridError, TargetError};
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;

    const RED: Color = Color::rgb(1.0, 0.0, 0.0);

    /// 2x2 font with no bitmaps; spaces and full blocks need none.
    fn block_font() -> Font {
        Font::parse("font\nv1\n\n2:2:2:2:0:0:2\n", HeightMode::Declared).expect("font parses")
    }

    /// Conway's life. Cells that don't change report `Sleep`.
    fn life(bounds: Rect) -> Simulation<bool> {
        Simulation::builder(false, bounds)
            .glyph(|alive, _, _| if *alive { FULL_BLOCK } else { ' ' })
            .on_tick(|alive, x, y, ctx| {
                let mut neighbors = 0;
                for dy in -1..=1 {
                    for dx in -1..=1 {
                        if (dx, dy) != (0, 0) && *ctx.get(x + dx, y + dy) {
                            neighbors += 1;
                        }
                    }
                }
                let next = if *alive {
                    neighbors == 2 || neighbors == 3
                } else {
                    neighbors == 3
                };
                if next == *alive {
                    return CellActivity::Sleep;
                }
                ctx.update(x, y, move |_| next);
                CellActivity::Continue
            })
            .build()
            .expect("valid settings")
    }

    fn alive_cells(sim: &Simulation<bool>) -> Vec<(i32, i32)> {
        sim.bounds().cells().filter(|&(x, y)| *sim.get(x, y)).collect()
    }

    struct Flash {
        coord: CellCoord,
        ticks_left: u32,
    }

    impl<T> Effect<T> for Flash {
        fn affected_cells(&self) -> Vec<CellCoord> {
            vec![self.coord]
        }
        fn next_tick(&mut self) {
            self.ticks_left = self.ticks_left.saturating_sub(1);
        }
        fn done(&self) -> bool {
            self.ticks_left == 0
        }
        fn tweak_cell(&self, _coord: CellCoord, appearance: &mut Appearance, _view: &CellView<'_, T>) {
            appearance.glyph = FULL_BLOCK;
            appearance.fg = RED;
        }
    }

    #[test]
    fn test_blinker_oscillates() {
        let mut sim = life(Rect::sized(5, 5));
        for y in 1..=3 {
            sim.set(2, y, true);
        }

        sim.tick();
        assert_eq!(alive_cells(&sim), vec![(1, 2), (2, 2), (3, 2)]);
        sim.tick();
        assert_eq!(alive_cells(&sim), vec![(2, 1), (2, 2), (2, 3)]);
        assert_eq!(sim.get_tick(), 2);
    }

    #[test]
    fn test_updates_are_deferred_until_sweep_ends() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let log = Rc::clone(&seen);
        let mut sim = Simulation::builder(0u32, Rect::sized(2, 1))
            .on_tick(move |_state, x, _y, ctx| {
                if x == 0 {
                    ctx.update(0, 0, |v| v + 1);
                    ctx.update(0, 0, |v| v * 10);
                } else {
                    log.borrow_mut().push(*ctx.get(0, 0));
                }
                CellActivity::Continue
            })
            .build()
            .expect("valid settings");

        sim.tick();
        assert_eq!(*sim.get(0, 0), 10);
        sim.tick();
        assert_eq!(*sim.get(0, 0), 110);
        assert_eq!(*seen.borrow(), vec![0, 10]);
        assert_eq!(sim.stats().updates_applied, 2);
    }

    #[test]
    fn test_out_of_bounds_access() {
        let mut sim = life(Rect::new(-2, -2, 4, 4));
        assert!(sim.set(-2, -2, true));
        assert!(*sim.get(-2, -2));
        assert!(!sim.set(2, 0, true));
        assert!(!*sim.get(2, 0));
        assert!(!*sim.get(100, 100));

        sim.update(50, 50, |_| true);
        sim.tick();
        // Only the lonely cell dying counts.
        assert_eq!(sim.stats().updates_applied, 1);
        assert!(alive_cells(&sim).is_empty());
    }

    #[test]
    fn test_quiet_blocks_sleep_and_wake() {
        let mut sim = life(Rect::sized(32, 32));
        sim.tick();
        assert_eq!(sim.stats().cells_visited, 32 * 32);
        assert_eq!(sim.stats().awake_blocks, 0);
        assert!(sim.is_asleep(0, 0));

        sim.tick();
        assert_eq!(sim.stats().blocks_visited, 0);
        assert_eq!(sim.stats().cells_visited, 0);

        sim.set(20, 20, true);
        assert!(!sim.is_asleep(20, 20));
        assert!(sim.is_asleep(0, 0));
        sim.tick();
        assert_eq!(sim.stats().blocks_visited, 1);
        assert_eq!(sim.stats().cells_visited, 64);
        assert!(!*sim.get(20, 20));

        // The dying cell kept its block awake, and with it the 3x3 around it.
        sim.tick();
        assert_eq!(sim.stats().blocks_visited, 9);
        assert_eq!(sim.stats().awake_blocks, 0);
    }

    #[test]
    fn test_deferred_update_wakes_block() {
        let mut sim = life(Rect::sized(16, 16));
        sim.tick();
        assert!(sim.is_asleep(3, 3));

        sim.update(3, 3, |_| true);
        sim.tick();
        assert_eq!(sim.stats().cells_visited, 0);
        assert!(*sim.get(3, 3));
        assert!(!sim.is_asleep(3, 3));
        assert!(sim.is_asleep(12, 12));
    }

    #[test]
    fn test_wide_wake_radius() {
        let mut sim = Simulation::builder(false, Rect::sized(32, 8))
            .sleep_ratio(4)
            .wake_radius(5)
            .on_tick(|_, x, y, _| {
                if (x, y) == (0, 0) {
                    CellActivity::Continue
                } else {
                    CellActivity::Sleep
                }
            })
            .build()
            .expect("valid settings");

        sim.tick();
        // ceil(5 / 4) = 2 blocks on each side of block (0, 0).
        assert!(!sim.is_asleep(8, 4));
        assert!(!sim.is_asleep(11, 7));
        assert!(sim.is_asleep(12, 0));
    }

    #[test]
    fn test_done_effect_is_not_registered() {
        let mut sim = life(Rect::sized(4, 4));
        assert_eq!(sim.add_effect(FadeEffect::new(1, 1, 0)), None);
        assert!(sim.get_effects(1, 1).is_empty());
        assert_eq!(sim.effect_count(), 0);
    }

    #[test]
    fn test_finished_effect_lingers_until_pruned() {
        let mut sim = Simulation::builder((), Rect::sized(4, 4)).build().expect("valid settings");
        sim.tick();
        assert!(sim.is_asleep(1, 1));

        let id = sim
            .add_effect(FadeEffect::new(1, 1, 2).with_fg(RED))
            .expect("registered");
        assert!(!sim.is_asleep(1, 1));
        assert_eq!(sim.get_effects(1, 1), &[id]);

        sim.tick();
        assert!(sim.effect(id).is_some());
        assert!(sim.is_asleep(1, 1));

        sim.tick();
        assert!(sim.effect(id).is_none());
        assert_eq!(sim.effect_count(), 0);
        assert_eq!(sim.get_effects(1, 1), &[id]);

        let mut font = block_font();
        let mut pixmap = Pixmap::new(8, 8).expect("pixmap");
        sim.render(&mut pixmap, &mut font, None, false).expect("renders");
        assert!(sim.get_effects(1, 1).is_empty());
    }

    #[test]
    fn test_clear_effects_at_one_cell() {
        let mut sim = life(Rect::sized(4, 4));
        let id = sim
            .add_effect(Flash {
                coord: CellCoord::new(2, 2),
                ticks_left: 3,
            })
            .expect("registered");
        sim.clear_effects(2, 2);
        assert!(sim.get_effects(2, 2).is_empty());
        assert!(sim.effect(id).is_some());
    }

    #[test]
    fn test_effect_tweaks_render_until_done() {
        let mut sim = life(Rect::sized(2, 2));
        let mut font = block_font();
        let mut pixmap = Pixmap::new(4, 4).expect("pixmap");

        sim.add_effect(Flash {
            coord: CellCoord::new(1, 0),
            ticks_left: 1,
        })
        .expect("registered");
        sim.render(&mut pixmap, &mut font, None, false).expect("renders");
        assert_eq!(pixmap.pixel(2, 0), Some(RED));
        assert_eq!(pixmap.pixel(0, 0), Some(Color::BLACK));

        sim.tick();
        sim.render(&mut pixmap, &mut font, None, false).expect("renders");
        assert!(!sim.stats().full_repaint);
        assert_eq!(pixmap.pixel(2, 0), Some(Color::BLACK));
    }

    #[test]
    fn test_effects_added_during_tick() {
        let mut sim = Simulation::builder(0u8, Rect::sized(3, 3))
            .on_tick(|_, x, y, ctx| {
                if (x, y) == (1, 1) && ctx.tick() == 0 {
                    let id = ctx.add_effect(FadeEffect::new(2, 2, 4).with_bg(RED));
                    assert!(id.is_some());
                    assert_eq!(ctx.get_effects(2, 2).len(), 1);
                }
                CellActivity::Sleep
            })
            .build()
            .expect("valid settings");

        sim.tick();
        assert_eq!(sim.get_effects(2, 2).len(), 1);
        assert_eq!(sim.effect_count(), 1);
        assert!(!sim.is_asleep(2, 2));
    }

    #[test]
    fn test_render_redraws_only_dirty_cells() {
        let mut sim = life(Rect::sized(4, 4));
        let mut font = block_font();
        let mut pixmap = Pixmap::new(8, 8).expect("pixmap");

        sim.render(&mut pixmap, &mut font, None, false).expect("renders");
        assert!(sim.stats().full_repaint);
        assert_eq!(sim.stats().cells_drawn, 16);

        sim.render(&mut pixmap, &mut font, None, false).expect("renders");
        assert!(!sim.stats().full_repaint);
        assert_eq!(sim.stats().cells_drawn, 0);

        sim.set(1, 1, true);
        assert!(sim.is_dirty(1, 1));
        sim.render(&mut pixmap, &mut font, None, false).expect("renders");
        assert_eq!(sim.stats().cells_drawn, 1);
        assert_eq!(pixmap.pixel(2, 2), Some(Color::WHITE));
        assert!(!sim.is_dirty(1, 1));

        let corner = Rect::sized(2, 2);
        sim.render(&mut pixmap, &mut font, Some(corner), false).expect("renders");
        assert!(sim.stats().full_repaint);
        assert_eq!(sim.stats().cells_drawn, 4);

        sim.render(&mut pixmap, &mut font, Some(corner), true).expect("renders");
        assert!(sim.stats().full_repaint);

        let mut other = Pixmap::new(8, 8).expect("pixmap");
        sim.render(&mut other, &mut font, None, false).expect("renders");
        assert!(sim.stats().full_repaint);
        assert_eq!(sim.stats().cells_drawn, 16);
    }

    #[test]
    fn test_render_rect_is_offset_to_origin() {
        let mut sim = life(Rect::sized(4, 4));
        sim.set(3, 2, true);
        let mut font = block_font();
        let mut pixmap = Pixmap::new(4, 4).expect("pixmap");

        sim.render(&mut pixmap, &mut font, Some(Rect::new(2, 2, 2, 2)), false)
            .expect("renders");
        assert_eq!(pixmap.pixel(2, 0), Some(Color::WHITE));
        assert_eq!(pixmap.pixel(0, 0), Some(Color::BLACK));
    }

    #[test]
    fn test_always_render_repaints() {
        let mut sim = Simulation::builder((), Rect::sized(3, 3))
            .always_render(true)
            .build()
            .expect("valid settings");
        let mut font = block_font();
        let mut pixmap = Pixmap::new(6, 6).expect("pixmap");

        sim.render(&mut pixmap, &mut font, None, false).expect("renders");
        sim.render(&mut pixmap, &mut font, None, false).expect("renders");
        assert!(sim.stats().full_repaint);
        assert_eq!(sim.stats().cells_drawn, 9);
    }

    #[test]
    fn test_highlight_asleep_follows_sleep_changes() {
        let mut sim = Simulation::builder(false, Rect::sized(2, 1))
            .highlight_asleep(true)
            .build()
            .expect("valid settings");
        let mut font = block_font();
        let mut pixmap = Pixmap::new(4, 2).expect("pixmap");

        sim.render(&mut pixmap, &mut font, None, false).expect("renders");
        assert_eq!(pixmap.pixel(2, 0), Some(Color::BLACK));

        // Falling asleep repaints the whole block without a forced repaint.
        sim.tick();
        sim.render(&mut pixmap, &mut font, None, false).expect("renders");
        assert!(!sim.stats().full_repaint);
        assert_eq!(sim.stats().cells_drawn, 2);
        let tinted = pixmap.pixel(2, 0).expect("in bounds");
        assert!((tinted.b - 0.175).abs() < 1e-5);
        assert_eq!(tinted.r, 0.0);

        sim.render(&mut pixmap, &mut font, None, false).expect("renders");
        assert_eq!(sim.stats().cells_drawn, 0);

        // Waking through one cell clears the tint on its neighbor too.
        sim.set(0, 0, true);
        sim.render(&mut pixmap, &mut font, None, false).expect("renders");
        assert_eq!(sim.stats().cells_drawn, 2);
        assert_eq!(pixmap.pixel(2, 0), Some(Color::BLACK));
    }

    /// Surface that cannot do source-atop compositing.
    struct NoAtop(Pixmap);

    impl DrawTarget for NoAtop {
        fn target_id(&self) -> TargetId {
            self.0.target_id()
        }
        fn size(&self) -> (u32, u32) {
            self.0.size()
        }
        fn clear_rect(&mut self, rect: PixelRect) {
            self.0.clear_rect(rect);
        }
        fn fill_rect(&mut self, rect: PixelRect, color: Color, op: CompositeOp) {
            self.0.fill_rect(rect, color, op);
        }
        fn draw_mask(&mut self, mask: &GlyphMask, x: i32, y: i32, op: CompositeOp) {
            self.0.draw_mask(mask, x, y, op);
        }
        fn supports(&self, op: CompositeOp) -> bool {
            op != CompositeOp::SourceAtop
        }
    }

    #[test]
    fn test_render_skips_undefined_glyph() {
        let mut sim = Simulation::builder(0u8, Rect::sized(3, 1))
            .glyph(|_, x, _| if x == 1 { 'x' } else { FULL_BLOCK })
            .build()
            .expect("valid settings");
        let mut font = block_font();
        let mut pixmap = Pixmap::new(6, 2).expect("pixmap");

        sim.render(&mut pixmap, &mut font, None, false).expect("renders");
        assert_eq!(pixmap.pixel(0, 0), Some(Color::WHITE));
        assert_eq!(pixmap.pixel(2, 0), Some(Color::TRANSPARENT));
        assert_eq!(pixmap.pixel(4, 0), Some(Color::WHITE));
        assert!(!sim.is_dirty(1, 0));

        sim.render(&mut pixmap, &mut font, None, false).expect("renders");
        assert_eq!(sim.stats().cells_drawn, 0);
    }

    #[test]
    fn test_render_rejects_incapable_target() {
        let mut sim = life(Rect::sized(2, 2));
        sim.set(0, 0, true);
        let mut font = block_font();
        let mut target = NoAtop(Pixmap::new(4, 4).expect("pixmap"));

        let result = sim.render(&mut target, &mut font, None, false);
        assert!(matches!(
            result,
            Err(GlyphGridError::Target(TargetError::UnsupportedOperator("source-atop")))
        ));
        assert_eq!(target.0.pixel(0, 0), Some(Color::TRANSPARENT));
        assert!(sim.is_dirty(0, 0));

        let mut pixmap = Pixmap::new(4, 4).expect("pixmap");
        sim.render(&mut pixmap, &mut font, None, false).expect("renders");
        assert!(sim.stats().full_repaint);
        assert_eq!(pixmap.pixel(0, 0), Some(Color::WHITE));
    }

    #[test]
    fn test_dynamic_bounds_reblit() {
        let area = Rc::new(Cell::new(Rect::sized(4, 4)));
        let source = Rc::clone(&area);
        let mut sim = Simulation::builder(0u8, Rect::default())
            .dynamic_bounds(move || source.get())
            .build()
            .expect("valid settings");
        assert_eq!(sim.bounds(), Rect::sized(4, 4));

        sim.set(3, 3, 7);
        sim.set(0, 0, 1);
        let mut font = block_font();
        let mut pixmap = Pixmap::new(8, 8).expect("pixmap");
        sim.render(&mut pixmap, &mut font, None, false).expect("renders");

        area.set(Rect::new(2, 2, 4, 4));
        sim.tick();
        assert_eq!(sim.bounds(), Rect::new(2, 2, 4, 4));
        assert_eq!(*sim.get(3, 3), 7);
        assert_eq!(*sim.get(0, 0), 0);
        assert_eq!(*sim.get(5, 5), 0);
        assert!(sim.is_dirty(5, 5));
        assert!(sim.is_dirty(3, 3));
        assert!(sim.set(5, 5, 2));
        assert!(!sim.set(1, 1, 2));
    }

    #[test]
    fn test_builder_init_hooks() {
        let sim = Simulation::builder(0i32, Rect::sized(3, 2))
            .init_cells(|x, y| x + y * 10)
            .on_init(|sim| {
                sim.set(0, 0, -1);
            })
            .build()
            .expect("valid settings");
        assert_eq!(*sim.get(2, 1), 12);
        assert_eq!(*sim.get(0, 0), -1);
        assert_eq!(*sim.get(9, 9), 0);
    }

    #[test]
    fn test_invalid_settings_rejected() {
        let result = Simulation::builder((), Rect::sized(1, 1)).sleep_ratio(0).build();
        assert!(matches!(
            result,
            Err(GlyphGridError::Config(ConfigError::Invalid(_)))
        ));

        let result = Simulation::builder((), Rect::sized(1, 1)).sleep_ratio(1 << 31).build();
        assert!(matches!(
            result,
            Err(GlyphGridError::Config(ConfigError::Invalid(_)))
        ));
    }
}
