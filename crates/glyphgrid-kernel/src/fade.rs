//! Color fade effect.
//!
//! A fade pulls one cell's colors toward target colors and then eases them
//! back to whatever the cell would normally show over `length` ticks.

use glyphgrid_common::{CellCoord, Color};

use crate::effect::{Appearance, CellView, Effect};

/// Easing curve mapping fade progress to blend amount.
///
/// Every curve starts at 1.0 (fully target color) and ends at 0.0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Easing {
    /// `1 - t`
    #[default]
    Linear,
    /// `(1 - t)²`
    Quadratic,
    /// `(1 - t)³`
    Cubic,
    /// `1 - sin(t·π/2)`, ease-out
    Sine,
}

impl Easing {
    /// Applies the easing function to normalized progress.
    #[must_use]
    pub fn apply(&self, t: f32) -> f32 {
        let t = t.clamp(0.0, 1.0);
        match self {
            Self::Linear => 1.0 - t,
            Self::Quadratic => (1.0 - t).powi(2),
            Self::Cubic => (1.0 - t).powi(3),
            Self::Sine => 1.0 - (t * std::f32::consts::FRAC_PI_2).sin(),
        }
    }
}

/// Fades a single cell's foreground and/or background.
#[derive(Debug, Clone, PartialEq)]
pub struct FadeEffect {
    coord: CellCoord,
    length: u32,
    tick: u32,
    easing: Easing,
    fg: Option<Color>,
    bg: Option<Color>,
}

impl FadeEffect {
    /// Creates a fade at a cell lasting `length` ticks. With no target
    /// colors set it leaves the cell untouched.
    #[must_use]
    pub fn new(x: i32, y: i32, length: u32) -> Self {
        Self {
            coord: CellCoord::new(x, y),
            length,
            tick: 0,
            easing: Easing::default(),
            fg: None,
            bg: None,
        }
    }

    /// Sets the foreground target color.
    #[must_use]
    pub fn with_fg(mut self, color: Color) -> Self {
        self.fg = Some(color);
        self
    }

    /// Sets the background target color.
    #[must_use]
    pub fn with_bg(mut self, color: Color) -> Self {
        self.bg = Some(color);
        self
    }

    /// Sets the easing curve.
    #[must_use]
    pub fn with_easing(mut self, easing: Easing) -> Self {
        self.easing = easing;
        self
    }

    /// Normalized progress: 0 on the first tick, 1 on the last.
    #[must_use]
    pub fn progress(&self) -> f32 {
        if self.tick == 0 {
            return 0.0;
        }
        let span = self.length.saturating_sub(1).max(1);
        (self.tick as f32 / span as f32).min(1.0)
    }

    /// Current blend amount toward the target colors.
    #[must_use]
    pub fn amount(&self) -> f32 {
        self.easing.apply(self.progress())
    }
}

impl<T> Effect<T> for FadeEffect {
    fn affected_cells(&self) -> Vec<CellCoord> {
        vec![self.coord]
    }

    fn next_tick(&mut self) {
        self.tick = self.tick.saturating_add(1);
    }

    fn done(&self) -> bool {
        self.tick >= self.length
    }

    fn tweak_cell(&self, _coord: CellCoord, appearance: &mut Appearance, _view: &CellView<'_, T>) {
        let amount = self.amount();
        if let Some(target) = self.fg {
            appearance.fg = appearance.fg.mix(target, amount);
        }
        if let Some(target) = self.bg {
            appearance.bg = appearance.bg.mix(target, amount);
        }
    }
}
