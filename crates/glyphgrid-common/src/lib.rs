//! # GlyphGrid Common
//!
//! Common types, utilities, and shared abstractions for GlyphGrid.
//!
//! This crate provides the value types used across all GlyphGrid subsystems:
//! - Coordinate types (cell, block, rectangles)
//! - Linear-light colors with sRGB conversion
//! - ID types (effect handles, drawing surfaces)
//! - Common error types
//! - Prelude for convenient imports

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

pub mod color;
pub mod coords;
pub mod error;
pub mod ids;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::color::*;
    pub use crate::coords::*;
    pub use crate::error::*;
    pub use crate::ids::*;
}

pub use prelude::*;
