use serde::{Deserialize, Serialize};
use crate::common::BoundingBox;
use crate::detection_runners::ort_detector::nms::Nms;

/// One detected object, expressed in source-frame pixel coordinates.
#[derive(Default, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub bbox: BoundingBox,
    pub confidence: f32,
    pub class_id: usize,
    pub label: String,
}

impl Nms for Detection {
    fn iou(&self, other: &Self) -> f32 {
        self.bbox.iou(&other.bbox)
    }

    fn confidence(&self) -> f32 {
        self.confidence
    }

    fn class_id(&self) -> usize {
        self.class_id
    }
}

impl Detection {
    pub fn new(class_id: usize, bbox: BoundingBox, label: String, confidence: f32) -> Self {
        Self {
            bbox,
            confidence: confidence.clamp(0., 1.),
            class_id,
            label,
        }
    }

    /// Sets the bounding box's coordinates using `(x1, y1, x2, y2)`.
    pub fn with_x1y1_x2y2(mut self, x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        self.bbox = BoundingBox::default().with_x1y1_x2y2(x1, y1, x2, y2);
        self
    }

    /// Sets the bounding box's coordinates and dimensions using `(cx, cy, w, h)`.
    pub fn with_cxcy_wh(mut self, cx: f32, cy: f32, w: f32, h: f32) -> Self {
        self.bbox = BoundingBox::default().with_cxcy_wh(cx, cy, w, h);
        self
    }

    /// Sets the confidence score, clamped into `[0, 1]`.
    pub fn with_confidence(mut self, conf: f32) -> Self {
        self.confidence = conf.clamp(0., 1.);
        self
    }

    pub fn with_class_id(mut self, class_id: usize) -> Self {
        self.class_id = class_id;
        self
    }

    pub fn with_label(mut self, label: &str) -> Self {
        self.label = label.to_string();
        self
    }

    /// Text shown on the overlay chip, e.g. `person 91.3%`.
    pub fn caption(&self) -> String {
        format!("{} {:.1}%", self.label, self.confidence * 100.)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn confidence_is_clamped() {
        let d = Detection::default().with_confidence(1.7);
        assert_eq!(d.confidence, 1.);
        let d = Detection::new(0, BoundingBox::default(), "x".into(), -0.2);
        assert_eq!(d.confidence, 0.);
    }

    #[test]
    fn caption_formats_percentage() {
        let d = Detection::default().with_label("dog").with_confidence(0.9134);
        assert_eq!(d.caption(), "dog 91.3%");
    }
}
