use std::path::Path;
use ab_glyph::{FontVec, PxScale};
use image::{Rgb, RgbImage, Rgba, RgbaImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_hollow_rect_mut, draw_text_mut, text_size};
use imageproc::rect::Rect;
use crate::common::BoundingBox;
use crate::error::DetectError;

/// Drawing target the overlay renderer paints onto.
///
/// Coordinates are in frame pixels. Implementations clip anything that falls
/// outside the surface.
pub trait OverlaySurface {
    fn resize(&mut self, width: u32, height: u32);

    fn size(&self) -> (u32, u32);

    /// Makes every pixel fully transparent.
    fn clear(&mut self);

    fn stroke_rect(&mut self, bbox: &BoundingBox, color: Rgba<u8>, thickness: u32);

    fn fill_rect(&mut self, x: i32, y: i32, width: u32, height: u32, color: Rgba<u8>);

    fn fill_text(&mut self, text: &str, x: i32, y: i32, size: f32, color: Rgba<u8>);

    /// Rendered width of `text`, used to size label chips.
    fn text_width(&self, text: &str, size: f32) -> u32 {
        (text.chars().count() as f32 * size * 0.55).ceil() as u32
    }

    /// Called once all draw calls of a cycle are issued.
    fn present(&mut self) -> Result<(), DetectError> {
        Ok(())
    }
}

/// Transparent RGBA buffer drawn with imageproc.
pub struct RgbaCanvas {
    image: RgbaImage,
    font: Option<FontVec>,
    warned_no_font: bool,
}

impl std::fmt::Debug for RgbaCanvas {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RgbaCanvas")
            .field("size", &self.image.dimensions())
            .field("font", &self.font.is_some())
            .finish()
    }
}

impl Default for RgbaCanvas {
    fn default() -> Self {
        Self::new(0, 0)
    }
}

impl RgbaCanvas {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            image: RgbaImage::new(width, height),
            font: None,
            warned_no_font: false,
        }
    }

    pub fn with_font(mut self, font: FontVec) -> Self {
        self.font = Some(font);
        self
    }

    /// Loads a TrueType/OpenType font for label text.
    pub fn with_font_file<P: AsRef<Path>>(self, path: P) -> Result<Self, DetectError> {
        let bytes = std::fs::read(path.as_ref())?;
        let font = FontVec::try_from_vec(bytes).map_err(|e| {
            DetectError::Config(format!("invalid font {}: {}", path.as_ref().display(), e))
        })?;
        Ok(self.with_font(font))
    }

    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    /// Alpha-blends the overlay over `frame`. Sizes must match.
    pub fn composite_onto(&self, frame: &RgbImage) -> Result<RgbImage, DetectError> {
        if frame.dimensions() != self.image.dimensions() {
            return Err(DetectError::Frame(format!(
                "overlay {:?} does not match frame {:?}",
                self.image.dimensions(),
                frame.dimensions()
            )));
        }

        let mut out = frame.clone();
        for (dst, src) in out.pixels_mut().zip(self.image.pixels()) {
            let a = src[3] as u32;
            if a == 0 {
                continue;
            }
            let blend = |s: u8, d: u8| ((s as u32 * a + d as u32 * (255 - a)) / 255) as u8;
            *dst = Rgb([blend(src[0], dst[0]), blend(src[1], dst[1]), blend(src[2], dst[2])]);
        }
        Ok(out)
    }
}

impl OverlaySurface for RgbaCanvas {
    fn resize(&mut self, width: u32, height: u32) {
        if self.image.dimensions() != (width, height) {
            self.image = RgbaImage::new(width, height);
        }
    }

    fn size(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    fn clear(&mut self) {
        self.image.pixels_mut().for_each(|p| *p = Rgba([0, 0, 0, 0]));
    }

    fn stroke_rect(&mut self, bbox: &BoundingBox, color: Rgba<u8>, thickness: u32) {
        let (x1, y1, w, h) = bbox.xy1_wh();
        if ![x1, y1, w, h].iter().all(|v| v.is_finite()) {
            return;
        }
        let (x, y, w, h) = bbox.as_xy_wh_i32();
        // imageproc computes the right edge as x + w - 1 in i32
        if i64::from(x) + i64::from(w) > i64::from(i32::MAX)
            || i64::from(y) + i64::from(h) > i64::from(i32::MAX)
        {
            return;
        }
        for t in 0..thickness as i32 {
            let (w, h) = (w - 2 * t, h - 2 * t);
            if w <= 0 || h <= 0 {
                break;
            }
            let rect = Rect::at(x + t, y + t).of_size(w as u32, h as u32);
            draw_hollow_rect_mut(&mut self.image, rect, color);
        }
    }

    fn fill_rect(&mut self, x: i32, y: i32, width: u32, height: u32, color: Rgba<u8>) {
        // intersect with the canvas in i64 so far-off corners cannot overflow
        let (img_w, img_h) = self.image.dimensions();
        let (x0, y0) = (i64::from(x).max(0), i64::from(y).max(0));
        let x1 = (i64::from(x) + i64::from(width)).min(i64::from(img_w));
        let y1 = (i64::from(y) + i64::from(height)).min(i64::from(img_h));
        if x1 <= x0 || y1 <= y0 {
            return;
        }
        let rect = Rect::at(x0 as i32, y0 as i32).of_size((x1 - x0) as u32, (y1 - y0) as u32);
        draw_filled_rect_mut(&mut self.image, rect, color);
    }

    fn fill_text(&mut self, text: &str, x: i32, y: i32, size: f32, color: Rgba<u8>) {
        match &self.font {
            Some(font) => draw_text_mut(&mut self.image, color, x, y, PxScale::from(size), font, text),
            None => {
                if !self.warned_no_font {
                    log::warn!("No font loaded, label text is not drawn");
                    self.warned_no_font = true;
                }
            }
        }
    }

    fn text_width(&self, text: &str, size: f32) -> u32 {
        match &self.font {
            Some(font) => text_size(PxScale::from(size), font, text).0,
            None => (text.chars().count() as f32 * size * 0.55).ceil() as u32,
        }
    }
}
