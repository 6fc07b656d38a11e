use ndarray::{ArrayView2, Axis, Ix2};
use rayon::prelude::*;

use crate::common::{Detection, LabelSet};
use crate::data::RawOutput;
use crate::detection_runners::ort_detector::nms::SuppressionPolicy;
use crate::error::DetectError;

/// Values per row of an end-to-end (already suppressed) output.
const PRE_SUPPRESSED_ROW: usize = 6;
/// Geometry values ahead of the class scores in a per-anchor output.
const GEOMETRY_LEN: usize = 4;

/// Output tensor layouts the decoder understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputLayout {
    /// `[1, N, 6]` rows of `(x1, y1, x2, y2, score, class_id)`.
    PreSuppressed { rows: usize },
    /// `[1, 4 + C, A]`: `(cx, cy, w, h)` then `C` class scores, each stored at stride `A`.
    RawAnchors { classes: usize, anchors: usize },
}

impl OutputLayout {
    /// Classifies an output shape once per cycle.
    ///
    /// A trailing dimension of 6 always means the pre-suppressed layout, so a
    /// two-class per-anchor model with exactly 6 anchors cannot be told apart.
    pub fn classify(shape: &[usize]) -> Result<Self, DetectError> {
        match shape {
            [1, rows, PRE_SUPPRESSED_ROW] => Ok(OutputLayout::PreSuppressed { rows: *rows }),
            [1, channels, anchors] if *channels > GEOMETRY_LEN => Ok(OutputLayout::RawAnchors {
                classes: channels - GEOMETRY_LEN,
                anchors: *anchors,
            }),
            _ => Err(DetectError::UnrecognizedShape {
                shape: shape.to_vec(),
            }),
        }
    }

    /// Suppression applied to this layout's candidates.
    ///
    /// Per-anchor output is always deduplicated per class. End-to-end output
    /// already went through suppression inside the model and follows the
    /// configured policy instead.
    pub fn suppression_policy(&self, pre_suppressed: SuppressionPolicy) -> SuppressionPolicy {
        match self {
            OutputLayout::PreSuppressed { .. } => pre_suppressed,
            OutputLayout::RawAnchors { .. } => SuppressionPolicy::ClassAware,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            OutputLayout::PreSuppressed { .. } => "pre-suppressed",
            OutputLayout::RawAnchors { .. } => "raw-anchors",
        }
    }
}

/// Result of decoding one output tensor.
#[derive(Debug, Clone, PartialEq)]
pub struct Decoded {
    pub layout: OutputLayout,
    pub detections: Vec<Detection>,
}

/// Turns raw model output into candidate detections in source-frame coordinates.
#[derive(Debug, Clone)]
pub struct OutputDecoder {
    conf_threshold: f32,
    labels: LabelSet,
}

impl OutputDecoder {
    pub fn new(conf_threshold: f32, labels: LabelSet) -> Self {
        Self {
            conf_threshold,
            labels,
        }
    }

    pub fn conf_threshold(&self) -> f32 {
        self.conf_threshold
    }

    pub fn labels(&self) -> &LabelSet {
        &self.labels
    }

    /// `model_size` and `frame_size` are `(width, height)`.
    pub fn decode(
        &self,
        output: &RawOutput,
        model_size: (u32, u32),
        frame_size: (u32, u32),
    ) -> Result<Decoded, DetectError> {
        let layout = OutputLayout::classify(output.shape())?;
        if model_size.0 == 0 || model_size.1 == 0 {
            return Err(DetectError::Inference(format!(
                "model input size {}x{} is degenerate",
                model_size.0, model_size.1
            )));
        }
        let sx = frame_size.0 as f32 / model_size.0 as f32;
        let sy = frame_size.1 as f32 / model_size.1 as f32;

        let preds = output
            .view()
            .index_axis_move(Axis(0), 0)
            .into_dimensionality::<Ix2>()
            .map_err(|e| DetectError::Inference(format!("cannot view output as 2D: {e}")))?;

        let detections = match layout {
            OutputLayout::PreSuppressed { .. } => self.decode_pre_suppressed(preds, sx, sy),
            OutputLayout::RawAnchors { classes, anchors } => {
                self.decode_raw_anchors(preds, classes, anchors, sx, sy)
            }
        };

        Ok(Decoded { layout, detections })
    }

    fn decode_pre_suppressed(&self, preds: ArrayView2<f32>, sx: f32, sy: f32) -> Vec<Detection> {
        preds
            .outer_iter()
            .filter_map(|row| {
                let score = row[4];
                if !(score >= self.conf_threshold) {
                    return None;
                }
                let class = row[5];
                if !class.is_finite() || class < 0. {
                    return None;
                }
                let class_id = class.round() as usize;

                let mut detection = Detection::default()
                    .with_x1y1_x2y2(row[0], row[1], row[2], row[3])
                    .with_confidence(score)
                    .with_class_id(class_id)
                    .with_label(&self.labels.label(class_id));
                detection.bbox = detection.bbox.scaled(sx, sy);
                Some(detection)
            })
            .collect()
    }

    fn decode_raw_anchors(
        &self,
        preds: ArrayView2<f32>,
        classes: usize,
        anchors: usize,
        sx: f32,
        sy: f32,
    ) -> Vec<Detection> {
        (0..anchors)
            .into_par_iter()
            .filter_map(|i| {
                let mut best_class = 0;
                let mut best_score = f32::NEG_INFINITY;
                for c in 0..classes {
                    let score = preds[[GEOMETRY_LEN + c, i]];
                    if score > best_score {
                        best_score = score;
                        best_class = c;
                    }
                }
                if !(best_score > self.conf_threshold) {
                    return None;
                }

                let (cx, cy, w, h) = (preds[[0, i]], preds[[1, i]], preds[[2, i]], preds[[3, i]]);
                let mut detection = Detection::default()
                    .with_cxcy_wh(cx, cy, w, h)
                    .with_confidence(best_score)
                    .with_class_id(best_class)
                    .with_label(&self.labels.label(best_class));
                detection.bbox = detection.bbox.scaled(sx, sy);
                Some(detection)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::BoundingBox;

    fn decoder() -> OutputDecoder {
        OutputDecoder::new(0.25, LabelSet::coco())
    }

    /// Lays out `(cx, cy, w, h, scores..)` per anchor at stride `anchors`.
    fn anchors_tensor(classes: usize, anchors: &[(f32, f32, f32, f32, Vec<f32>)]) -> RawOutput {
        let a = anchors.len();
        let mut data = vec![0f32; (4 + classes) * a];
        for (i, (cx, cy, w, h, scores)) in anchors.iter().enumerate() {
            data[i] = *cx;
            data[a + i] = *cy;
            data[2 * a + i] = *w;
            data[3 * a + i] = *h;
            for (c, s) in scores.iter().enumerate() {
                data[(4 + c) * a + i] = *s;
            }
        }
        RawOutput::from_shape_vec(&[1, 4 + classes, a], data).unwrap()
    }

    #[test]
    fn classifies_known_layouts() {
        assert_eq!(
            OutputLayout::classify(&[1, 300, 6]).unwrap(),
            OutputLayout::PreSuppressed { rows: 300 }
        );
        assert_eq!(
            OutputLayout::classify(&[1, 84, 8400]).unwrap(),
            OutputLayout::RawAnchors { classes: 80, anchors: 8400 }
        );
        assert!(OutputLayout::classify(&[1, 84]).is_err());
        assert!(OutputLayout::classify(&[2, 84, 8400]).is_err());
        assert!(OutputLayout::classify(&[1, 4, 8400]).is_err());
        assert!(OutputLayout::classify(&[1, 1, 84, 8400]).is_err());
    }

    #[test]
    fn layout_decides_suppression() {
        let pre = OutputLayout::PreSuppressed { rows: 1 };
        let raw = OutputLayout::RawAnchors { classes: 80, anchors: 1 };
        assert_eq!(pre.suppression_policy(SuppressionPolicy::Skip), SuppressionPolicy::Skip);
        assert_eq!(raw.suppression_policy(SuppressionPolicy::Skip), SuppressionPolicy::ClassAware);
    }

    #[test]
    fn pre_suppressed_row_is_rescaled_to_frame() {
        let out = RawOutput::from_shape_vec(&[1, 1, 6], vec![100., 100., 200., 200., 0.9, 0.]).unwrap();
        let decoded = decoder().decode(&out, (640, 640), (1280, 1280)).unwrap();
        assert_eq!(decoded.layout, OutputLayout::PreSuppressed { rows: 1 });
        assert_eq!(decoded.detections.len(), 1);
        let d = &decoded.detections[0];
        assert_eq!(d.bbox, BoundingBox::new(200., 200., 200., 200.));
        assert_eq!(d.confidence, 0.9);
        assert_eq!(d.class_id, 0);
        assert_eq!(d.label, "person");
    }

    #[test]
    fn pre_suppressed_threshold_is_inclusive() {
        let out = RawOutput::from_shape_vec(
            &[1, 3, 6],
            vec![
                0., 0., 10., 10., 0.25, 1.,
                0., 0., 10., 10., 0.2499, 1.,
                0., 0., 10., 10., 0.8, -1.,
            ],
        )
        .unwrap();
        let decoded = decoder().decode(&out, (640, 640), (640, 640)).unwrap();
        assert_eq!(decoded.detections.len(), 1);
        assert_eq!(decoded.detections[0].label, "bicycle");
    }

    #[test]
    fn independent_axis_scaling() {
        let out = RawOutput::from_shape_vec(&[1, 1, 6], vec![64., 64., 128., 128., 0.5, 2.]).unwrap();
        let decoded = decoder().decode(&out, (640, 640), (1280, 320)).unwrap();
        assert_eq!(decoded.detections[0].bbox, BoundingBox::new(128., 32., 128., 32.));
    }

    #[test]
    fn raw_anchor_takes_max_class_and_converts_center_form() {
        let mut scores = vec![0.0; 80];
        scores[3] = 0.4;
        scores[17] = 0.7;
        let out = anchors_tensor(80, &[(320., 320., 64., 32., scores)]);
        let decoded = decoder().decode(&out, (640, 640), (1280, 640)).unwrap();
        assert_eq!(decoded.layout, OutputLayout::RawAnchors { classes: 80, anchors: 1 });
        let d = &decoded.detections[0];
        assert_eq!(d.class_id, 17);
        assert_eq!(d.label, "horse");
        assert!((d.confidence - 0.7).abs() < 1e-6);
        assert_eq!(d.bbox, BoundingBox::new(576., 304., 128., 32.));
    }

    #[test]
    fn raw_anchor_threshold_is_exclusive_and_order_is_stable() {
        let out = anchors_tensor(
            2,
            &[
                (10., 10., 4., 4., vec![0.25, 0.1]),
                (20., 20., 4., 4., vec![0.1, 0.3]),
                (30., 30., 4., 4., vec![0.9, 0.0]),
            ],
        );
        let decoded = decoder().decode(&out, (640, 640), (640, 640)).unwrap();
        let ids: Vec<usize> = decoded.detections.iter().map(|d| d.class_id).collect();
        assert_eq!(ids, vec![1, 0]);
        assert_eq!(decoded.detections[0].bbox.cx(), 20.);
    }

    #[test]
    fn yolov8_sized_output_decodes() {
        let anchors = 8400;
        let mut data = vec![0f32; 84 * anchors];
        let i = 4321;
        data[i] = 100.;
        data[anchors + i] = 200.;
        data[2 * anchors + i] = 50.;
        data[3 * anchors + i] = 60.;
        data[(4 + 56) * anchors + i] = 0.66;
        let out = RawOutput::from_shape_vec(&[1, 84, anchors], data).unwrap();
        let decoded = decoder().decode(&out, (640, 640), (640, 480)).unwrap();
        assert_eq!(decoded.detections.len(), 1);
        assert_eq!(decoded.detections[0].label, "chair");
    }

    #[test]
    fn unknown_class_ids_get_fallback_labels() {
        let out = RawOutput::from_shape_vec(&[1, 1, 6], vec![0., 0., 5., 5., 0.5, 120.]).unwrap();
        let decoded = decoder().decode(&out, (640, 640), (640, 640)).unwrap();
        assert_eq!(decoded.detections[0].label, "class 120");
    }

    #[test]
    fn unrecognized_shape_is_an_error() {
        let out = RawOutput::from_shape_vec(&[1, 10], vec![0.; 10]).unwrap();
        let err = decoder().decode(&out, (640, 640), (640, 640)).unwrap_err();
        assert!(matches!(err, DetectError::UnrecognizedShape { shape } if shape == vec![1, 10]));
    }
}
