//! Raster drawing targets.
//!
//! Glyph compositing needs only a handful of capabilities from a surface:
//! clearing, solid fills, and stamping a pre-rasterized mask, each under one
//! of four Porter-Duff operators. [`DrawTarget`] captures exactly that, so
//! the font compositor works against any surface that can provide it.
//!
//! [`Pixmap`] is the in-memory implementation. It stores premultiplied
//! linear RGBA and clips every operation to its extent.

use glyphgrid_common::{Color, TargetError, TargetId};

/// Porter-Duff composite operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompositeOp {
    /// Source drawn over destination
    SourceOver,
    /// Destination erased where source is opaque
    DestinationOut,
    /// Source drawn only behind destination
    DestinationOver,
    /// Source drawn only where destination is opaque
    SourceAtop,
}

impl CompositeOp {
    /// Every operator the font compositor relies on.
    pub const ALL: [CompositeOp; 4] = [
        Self::SourceOver,
        Self::DestinationOut,
        Self::DestinationOver,
        Self::SourceAtop,
    ];

    /// Canvas-style operator name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::SourceOver => "source-over",
            Self::DestinationOut => "destination-out",
            Self::DestinationOver => "destination-over",
            Self::SourceAtop => "source-atop",
        }
    }

    /// Composites premultiplied `src` onto premultiplied `dst`.
    #[must_use]
    pub fn blend(self, src: [f32; 4], dst: [f32; 4]) -> [f32; 4] {
        let (sa, da) = (src[3], dst[3]);
        let mut out = [0.0; 4];
        for i in 0..4 {
            out[i] = match self {
                Self::SourceOver => src[i] + dst[i] * (1.0 - sa),
                Self::DestinationOut => dst[i] * (1.0 - sa),
                Self::DestinationOver => src[i] * (1.0 - da) + dst[i],
                Self::SourceAtop => src[i] * da + dst[i] * (1.0 - sa),
            };
        }
        out
    }
}

/// Pixel-space rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelRect {
    /// Left edge
    pub x: i32,
    /// Top edge
    pub y: i32,
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
}

impl PixelRect {
    /// Creates a pixel rectangle.
    #[must_use]
    pub const fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }
}

/// Opaque-white stencil of one glyph; coverage is 0 or 255 per pixel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GlyphMask {
    width: u32,
    height: u32,
    coverage: Vec<u8>,
}

impl GlyphMask {
    /// Creates a mask from row-major coverage bytes. Missing bytes are
    /// treated as transparent and extra bytes are dropped.
    #[must_use]
    pub fn new(width: u32, height: u32, mut coverage: Vec<u8>) -> Self {
        coverage.resize(width as usize * height as usize, 0);
        Self {
            width,
            height,
            coverage,
        }
    }

    /// Mask width in pixels.
    #[must_use]
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Mask height in pixels.
    #[must_use]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Coverage in `[0, 1]` at a mask pixel; 0 outside the mask.
    #[must_use]
    pub fn coverage(&self, x: u32, y: u32) -> f32 {
        if x >= self.width || y >= self.height {
            return 0.0;
        }
        f32::from(self.coverage[(y * self.width + x) as usize]) / 255.0
    }

    /// Whether a mask pixel is opaque.
    #[must_use]
    pub fn is_set(&self, x: u32, y: u32) -> bool {
        self.coverage(x, y) > 0.5
    }
}

/// Minimal raster surface the glyph compositor draws on.
pub trait DrawTarget {
    /// Identity of the surface, stable for its lifetime.
    fn target_id(&self) -> TargetId;

    /// Surface size in pixels.
    fn size(&self) -> (u32, u32);

    /// Resets a rectangle to transparent.
    fn clear_rect(&mut self, rect: PixelRect);

    /// Fills a rectangle with a solid color under `op`.
    fn fill_rect(&mut self, rect: PixelRect, color: Color, op: CompositeOp);

    /// Stamps an opaque-white mask with its top-left at `(x, y)` under `op`.
    fn draw_mask(&mut self, mask: &GlyphMask, x: i32, y: i32, op: CompositeOp);

    /// Whether the surface implements `op`.
    fn supports(&self, _op: CompositeOp) -> bool {
        true
    }
}

/// Fails with the first composite operator the target cannot perform.
pub fn check_capabilities(target: &dyn DrawTarget) -> Result<(), TargetError> {
    match CompositeOp::ALL.into_iter().find(|op| !target.supports(*op)) {
        Some(op) => Err(TargetError::UnsupportedOperator(op.name())),
        None => Ok(()),
    }
}

/// In-memory premultiplied linear RGBA surface.
#[derive(Debug, Clone)]
pub struct Pixmap {
    id: TargetId,
    width: u32,
    height: u32,
    pixels: Vec<[f32; 4]>,
}

impl Pixmap {
    /// Creates a transparent surface.
    pub fn new(width: u32, height: u32) -> Result<Self, TargetError> {
        if width == 0 || height == 0 {
            return Err(TargetError::EmptySurface { width, height });
        }
        Ok(Self {
            id: TargetId::new(),
            width,
            height,
            pixels: vec![[0.0; 4]; width as usize * height as usize],
        })
    }

    /// Surface width in pixels.
    #[must_use]
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Surface height in pixels.
    #[must_use]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Straight-alpha color at a pixel, or `None` outside the surface.
    #[must_use]
    pub fn pixel(&self, x: i32, y: i32) -> Option<Color> {
        self.index(x, y)
            .map(|i| Color::from_premultiplied(self.pixels[i]))
    }

    /// Raw premultiplied pixel data as bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.pixels)
    }

    /// Encodes the surface as 8-bit sRGB RGBA, row-major.
    #[must_use]
    pub fn to_srgba8(&self) -> Vec<u8> {
        self.pixels
            .iter()
            .flat_map(|&p| Color::from_premultiplied(p).to_srgb8())
            .collect()
    }

    fn index(&self, x: i32, y: i32) -> Option<usize> {
        if x < 0 || y < 0 || x >= self.width as i32 || y >= self.height as i32 {
            return None;
        }
        Some(y as usize * self.width as usize + x as usize)
    }

    /// Clips a rectangle to the surface as `(x0, y0, x1, y1)`, exclusive.
    fn clip(&self, rect: PixelRect) -> Option<(i32, i32, i32, i32)> {
        let x0 = rect.x.max(0);
        let y0 = rect.y.max(0);
        let x1 = (rect.x + rect.width as i32).min(self.width as i32);
        let y1 = (rect.y + rect.height as i32).min(self.height as i32);
        (x0 < x1 && y0 < y1).then_some((x0, y0, x1, y1))
    }

    fn composite(&mut self, x: i32, y: i32, src: [f32; 4], op: CompositeOp) {
        if let Some(i) = self.index(x, y) {
            self.pixels[i] = op.blend(src, self.pixels[i]);
        }
    }
}

impl DrawTarget for Pixmap {
    fn target_id(&self) -> TargetId {
        self.id
    }

    fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn clear_rect(&mut self, rect: PixelRect) {
        let Some((x0, y0, x1, y1)) = self.clip(rect) else {
            return;
        };
        for y in y0..y1 {
            let row = y as usize * self.width as usize;
            self.pixels[row + x0 as usize..row + x1 as usize].fill([0.0; 4]);
        }
    }

    fn fill_rect(&mut self, rect: PixelRect, color: Color, op: CompositeOp) {
        let Some((x0, y0, x1, y1)) = self.clip(rect) else {
            return;
        };
        let src = color.premultiplied();
        for y in y0..y1 {
            for x in x0..x1 {
                self.composite(x, y, src, op);
            }
        }
    }

    fn draw_mask(&mut self, mask: &GlyphMask, x: i32, y: i32, op: CompositeOp) {
        let rect = PixelRect::new(x, y, mask.width(), mask.height());
        let Some((x0, y0, x1, y1)) = self.clip(rect) else {
            return;
        };
        for py in y0..y1 {
            for px in x0..x1 {
                let c = mask.coverage((px - x) as u32, (py - y) as u32);
                self.composite(px, py, [c, c, c, c], op);
            }
        }
    }
}
