use image::Rgba;
use crate::common::{BoundingBox, Detection};
use crate::error::DetectError;
use crate::overlay::{class_colour, OverlaySurface};

const STROKE_WIDTH: u32 = 4;
const LABEL_FONT_SIZE: f32 = 18.0;
const LABEL_PADDING: u32 = 3;
/// Boxes at or closer than this to the top edge get their chip drawn inside the box.
const TOP_MARGIN: f32 = 20.0;
/// How far past the surface edges box coordinates may reach before clamping.
const CLIP_MARGIN: f32 = 64.0;
const LABEL_TEXT_COLOR: Rgba<u8> = Rgba([255, 255, 255, 255]);

/// Paints detections onto an [`OverlaySurface`]. Stateless between cycles.
#[derive(Debug, Clone)]
pub struct OverlayRenderer {
    stroke_width: u32,
    font_size: f32,
}

impl Default for OverlayRenderer {
    fn default() -> Self {
        Self {
            stroke_width: STROKE_WIDTH,
            font_size: LABEL_FONT_SIZE,
        }
    }
}

impl OverlayRenderer {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn with_font_size(mut self, x: f32) -> Self {
        self.font_size = x;
        self
    }

    /// Sizes the surface to the frame, clears it, then draws every detection.
    /// An empty slice leaves a cleared surface.
    pub fn render<S: OverlaySurface + ?Sized>(
        &self,
        surface: &mut S,
        frame_size: (u32, u32),
        detections: &[Detection],
    ) -> Result<(), DetectError> {
        surface.resize(frame_size.0, frame_size.1);
        surface.clear();
        for detection in detections {
            self.draw_detection(surface, detection);
        }
        surface.present()
    }

    fn draw_detection<S: OverlaySurface + ?Sized>(&self, surface: &mut S, detection: &Detection) {
        let Some(bbox) = clip_to_surface(&detection.bbox, surface.size()) else {
            log::trace!("Skipping off-surface box {:?}", detection.bbox);
            return;
        };
        let color = class_colour(detection.class_id);
        surface.stroke_rect(&bbox, color, self.stroke_width);

        let text = detection.caption();
        let chip_w = surface
            .text_width(&text, self.font_size)
            .saturating_add(2 * LABEL_PADDING);
        let chip_h = self.font_size.ceil() as u32 + 2 * LABEL_PADDING;

        let x = bbox.x1.round() as i32;
        let y = if bbox.y1 <= TOP_MARGIN {
            bbox.y1.round() as i32
        } else {
            (bbox.y1.round() as i32).saturating_sub(chip_h as i32)
        };

        surface.fill_rect(x, y, chip_w, chip_h, color);
        surface.fill_text(
            &text,
            x.saturating_add(LABEL_PADDING as i32),
            y.saturating_add(LABEL_PADDING as i32),
            self.font_size,
            LABEL_TEXT_COLOR,
        );
    }
}

/// Clamps `bbox` to the surface plus [`CLIP_MARGIN`].
///
/// `None` for non-finite boxes and for boxes that lie entirely outside.
fn clip_to_surface(bbox: &BoundingBox, (width, height): (u32, u32)) -> Option<BoundingBox> {
    let (x1, y1, x2, y2) = bbox.xy1_xy2();
    if ![x1, y1, x2, y2].iter().all(|v| v.is_finite()) {
        return None;
    }
    let max_x = width as f32 + CLIP_MARGIN;
    let max_y = height as f32 + CLIP_MARGIN;
    let (x1, x2) = (x1.clamp(-CLIP_MARGIN, max_x), x2.clamp(-CLIP_MARGIN, max_x));
    let (y1, y2) = (y1.clamp(-CLIP_MARGIN, max_y), y2.clamp(-CLIP_MARGIN, max_y));
    if x2 <= x1 || y2 <= y1 {
        return None;
    }
    Some(BoundingBox::default().with_x1y1_x2y2(x1, y1, x2, y2))
}
