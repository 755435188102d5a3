//! Bitmap font decoding and glyph compositing.
//!
//! ## Resource format
//!
//! A font is a text resource. Line 4 holds 7 or 8 colon-separated metrics:
//!
//! ```text
//! width:height:baseline:ascend:descend:spacing:em_size[:extra]
//! ```
//!
//! Every following non-empty line is one glyph, `<decimal codepoint>:<base64>`.
//! The bitmap is row-major, most significant bit first: pixel `(px, py)` is
//! bit `7 - idx % 8` of byte `idx / 8` where `idx = px + (py + y_offset) * width`.
//!
//! ## Compositing
//!
//! Each glyph is rasterized once into an opaque-white [`GlyphMask`] and then
//! colored on the target with composite operators:
//! - opaque background: fill `bg`, punch the glyph out with
//!   destination-out, then fill `fg` behind with destination-over
//! - transparent background: stamp the mask, then tint it with `fg` using
//!   source-atop

use ahash::AHashMap;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use glyphgrid_common::{Color, FontError};
use tracing::{debug, error};

use crate::raster::{CompositeOp, DrawTarget, GlyphMask, PixelRect};

/// Glyph drawn as a solid foreground block.
pub const FULL_BLOCK: char = '\u{2588}';

/// Line (one-based) carrying the metrics.
const METRICS_LINE: usize = 4;

/// How tall a cell is and where the bitmap rows start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HeightMode {
    /// Declared glyph height, no vertical offset.
    #[default]
    Declared,
    /// `ascend - descend` rows starting at `baseline - ascend`, cropping
    /// rows outside the ascender/descender span.
    Tight,
}

/// Metrics parsed from the font header.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FontMetrics {
    /// Glyph width in pixels
    pub glyph_width: u32,
    /// Declared glyph height in pixels
    pub glyph_height: u32,
    /// Baseline row
    pub baseline: i32,
    /// Ascender row
    pub ascend: i32,
    /// Descender row (usually negative)
    pub descend: i32,
    /// Horizontal spacing
    pub spacing: i32,
    /// Em size; not used for rendering
    pub em_size: f32,
}

impl FontMetrics {
    fn parse(line: &str) -> Result<Self, FontError> {
        let fields: Vec<&str> = line.trim().split(':').collect();
        if !(7..=8).contains(&fields.len()) {
            return Err(FontError::MetricCount {
                found: fields.len(),
            });
        }
        let mut values = [0.0f32; 8];
        for (index, field) in fields.iter().enumerate() {
            values[index] = field
                .trim()
                .parse::<f32>()
                .ok()
                .filter(|v| v.is_finite())
                .ok_or_else(|| FontError::InvalidMetric {
                    index,
                    value: (*field).to_string(),
                })?;
        }
        Ok(Self {
            glyph_width: values[0].max(0.0) as u32,
            glyph_height: values[1].max(0.0) as u32,
            baseline: values[2] as i32,
            ascend: values[3] as i32,
            descend: values[4] as i32,
            spacing: values[5] as i32,
            em_size: values[6],
        })
    }
}

/// Decoded bitmap font with a lazily filled glyph-mask cache.
pub struct Font {
    metrics: FontMetrics,
    height_mode: HeightMode,
    cell_height: u32,
    y_offset: i32,
    bitmaps: AHashMap<char, Vec<u8>>,
    masks: AHashMap<char, GlyphMask>,
}

impl Font {
    /// Decodes a font resource.
    pub fn parse(source: &str, height_mode: HeightMode) -> Result<Self, FontError> {
        let lines: Vec<&str> = source.lines().collect();
        let metrics_line = lines.get(METRICS_LINE - 1).ok_or(FontError::MissingMetrics)?;
        let metrics = FontMetrics::parse(metrics_line)?;

        let (cell_height, y_offset) = match height_mode {
            HeightMode::Declared => (metrics.glyph_height as i32, 0),
            HeightMode::Tight => metrics
                .ascend
                .checked_sub(metrics.descend)
                .zip(metrics.baseline.checked_sub(metrics.ascend))
                .ok_or_else(|| FontError::InvalidMetric {
                    index: 3,
                    value: metrics.ascend.to_string(),
                })?,
        };
        if metrics.glyph_width == 0 || cell_height <= 0 {
            return Err(FontError::ZeroSizedGlyph {
                width: metrics.glyph_width,
                height: cell_height.max(0) as u32,
            });
        }

        let mut bitmaps = AHashMap::new();
        for (offset, raw) in lines.iter().enumerate().skip(METRICS_LINE) {
            let line_no = offset + 1;
            let raw = raw.trim();
            if raw.is_empty() {
                continue;
            }
            let (code, data) = raw.split_once(':').ok_or_else(|| FontError::MalformedGlyph {
                line: line_no,
                reason: "missing ':' separator".to_string(),
            })?;
            let glyph = code
                .trim()
                .parse::<u32>()
                .ok()
                .and_then(char::from_u32)
                .ok_or_else(|| FontError::InvalidCodepoint {
                    line: line_no,
                    value: code.to_string(),
                })?;
            let bits = STANDARD
                .decode(data.trim())
                .map_err(|e| FontError::MalformedGlyph {
                    line: line_no,
                    reason: e.to_string(),
                })?;
            bitmaps.insert(glyph, bits);
        }

        debug!(
            "Loaded font: {} glyphs, {}x{} cells",
            bitmaps.len(),
            metrics.glyph_width,
            cell_height
        );

        Ok(Self {
            metrics,
            height_mode,
            cell_height: cell_height as u32,
            y_offset,
            bitmaps,
            masks: AHashMap::new(),
        })
    }

    /// Header metrics.
    pub fn metrics(&self) -> &FontMetrics {
        &self.metrics
    }

    /// Height mode this font was decoded with.
    pub fn height_mode(&self) -> HeightMode {
        self.height_mode
    }

    /// Cell width in pixels.
    pub fn cell_width(&self) -> u32 {
        self.metrics.glyph_width
    }

    /// Cell height in pixels after applying the height mode.
    pub fn cell_height(&self) -> u32 {
        self.cell_height
    }

    /// Whether the font defines a glyph.
    pub fn has_glyph(&self, glyph: char) -> bool {
        self.bitmaps.contains_key(&glyph)
    }

    /// Number of glyphs defined.
    pub fn glyph_count(&self) -> usize {
        self.bitmaps.len()
    }

    /// Mask for a glyph, rasterized on first use.
    pub fn glyph_mask(&mut self, glyph: char) -> Option<&GlyphMask> {
        if !self.masks.contains_key(&glyph) {
            let bits = self.bitmaps.get(&glyph)?;
            let mask = rasterize(bits, self.metrics.glyph_width, self.cell_height, self.y_offset);
            self.masks.insert(glyph, mask);
        }
        self.masks.get(&glyph)
    }

    /// Draws one glyph cell at cell position `(cell_x, cell_y)`.
    ///
    /// Returns `false` (after logging) when the glyph is not in the font; the
    /// cell is left untouched in that case.
    pub fn draw_char(
        &mut self,
        target: &mut dyn DrawTarget,
        glyph: char,
        cell_x: i32,
        cell_y: i32,
        fg: Color,
        bg: Color,
    ) -> bool {
        let rect = PixelRect::new(
            cell_x * self.cell_width() as i32,
            cell_y * self.cell_height as i32,
            self.cell_width(),
            self.cell_height,
        );

        if glyph == ' ' {
            target.clear_rect(rect);
            if !bg.is_transparent() {
                target.fill_rect(rect, bg, CompositeOp::SourceOver);
            }
            return true;
        }
        if glyph == FULL_BLOCK {
            target.clear_rect(rect);
            target.fill_rect(rect, fg, CompositeOp::SourceOver);
            return true;
        }

        let Some(mask) = self.glyph_mask(glyph) else {
            error!("Glyph {:?} (U+{:04X}) is not defined in font", glyph, glyph as u32);
            return false;
        };

        target.clear_rect(rect);
        if bg.is_transparent() {
            target.draw_mask(mask, rect.x, rect.y, CompositeOp::SourceOver);
            target.fill_rect(rect, fg, CompositeOp::SourceAtop);
        } else {
            target.fill_rect(rect, bg, CompositeOp::SourceOver);
            target.draw_mask(mask, rect.x, rect.y, CompositeOp::DestinationOut);
            target.fill_rect(rect, fg, CompositeOp::DestinationOver);
        }
        true
    }
}

impl std::fmt::Debug for Font {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Font")
            .field("metrics", &self.metrics)
            .field("height_mode", &self.height_mode)
            .field("cell_height", &self.cell_height)
            .field("glyphs", &self.bitmaps.len())
            .field("cached_masks", &self.masks.len())
            .finish()
    }
}

/// Expands a packed bitmap into a mask. Bits past the end of the buffer,
/// or rows above it when the offset is negative, are transparent.
fn rasterize(bits: &[u8], width: u32, height: u32, y_offset: i32) -> GlyphMask {
    let mut coverage = vec![0u8; width as usize * height as usize];
    for py in 0..height {
        let row = py as i64 + i64::from(y_offset);
        if row < 0 {
            continue;
        }
        for px in 0..width {
            let idx = px as i64 + row * i64::from(width);
            let byte = bits.get((idx / 8) as usize).copied().unwrap_or(0);
            if byte & (0x80 >> (idx % 8)) != 0 {
                coverage[(py * width + px) as usize] = 255;
            }
        }
    }
    GlyphMask::new(width, height, coverage)
}
