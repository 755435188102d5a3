//! # GlyphGrid Kernel
//!
//! Cellular-automaton engine rendered as a grid of colored glyphs.
//!
//! This crate provides:
//! - Bounded 2D cell storage that survives bounds changes
//! - Block-level sleep tracking so quiet regions cost nothing per tick
//! - Time-limited visual effects layered over cell appearance
//! - Bitmap font decoding and glyph compositing onto a raster target
//! - The [`Simulation`] tying it together
//!
//! ## Tick / Render Split
//!
//! `tick` advances state; `render` paints it. Rendering never changes cell
//! state, and ticking never draws. Both are driven by the host.
//!
//! ## Deferred Updates
//!
//! During a tick every callback reads the state as it was when the tick
//! began. Writes are queued and applied in order once the sweep finishes.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

pub mod config;
pub mod effect;
pub mod fade;
pub mod font;
pub mod grid;
pub mod raster;
pub mod simulation;
pub mod sleep;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::config::*;
    pub use crate::effect::*;
    pub use crate::fade::*;
    pub use crate::font::*;
    pub use crate::grid::*;
    pub use crate::raster::*;
    pub use crate::simulation::*;
    pub use crate::sleep::*;
    pub use glyphgrid_common::prelude::*;
}

pub use prelude::*;
