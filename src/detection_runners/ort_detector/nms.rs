use serde::{Deserialize, Serialize};

pub trait Nms {
    fn iou(&self, other: &Self) -> f32;
    fn confidence(&self) -> f32;
    fn class_id(&self) -> usize;
}

/// How duplicate candidates of one cycle are removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuppressionPolicy {
    /// Only candidates of the same class suppress each other.
    ClassAware,
    /// Any overlapping candidate is suppressed regardless of class.
    ClassAgnostic,
    /// Candidates are only ordered by confidence; nothing is removed.
    Skip,
}

/// Greedy non-maximum suppression, in place.
///
/// Sorts by confidence descending, then keeps a candidate only if its IoU
/// with every already kept candidate (of the same class, for
/// [`SuppressionPolicy::ClassAware`]) is at most `iou_threshold`.
pub fn suppress<T: Nms>(boxes: &mut Vec<T>, iou_threshold: f32, policy: SuppressionPolicy) {
    boxes.sort_by(|b1, b2| b2.confidence().total_cmp(&b1.confidence()));
    if policy == SuppressionPolicy::Skip {
        return;
    }

    let mut current_index = 0;
    for index in 0..boxes.len() {
        let mut drop = false;
        for prev_index in 0..current_index {
            let kept = &boxes[prev_index];
            let candidate = &boxes[index];
            if policy == SuppressionPolicy::ClassAware && kept.class_id() != candidate.class_id() {
                continue;
            }
            if kept.iou(candidate) > iou_threshold {
                drop = true;
                break;
            }
        }
        if !drop {
            boxes.swap(current_index, index);
            current_index += 1;
        }
    }
    boxes.truncate(current_index);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::{BoundingBox, Detection};

    fn det(x: f32, y: f32, w: f32, h: f32, conf: f32, class_id: usize) -> Detection {
        Detection::new(class_id, BoundingBox::new(x, y, w, h), format!("c{class_id}"), conf)
    }

    #[test]
    fn keeps_highest_of_overlapping_pair() {
        // IoU = 70 / 100 = 0.7
        let mut boxes = vec![
            det(0., 0., 10., 10., 0.6, 0),
            det(0., 0., 10., 7., 0.8, 0),
        ];
        assert!((boxes[0].bbox.iou(&boxes[1].bbox) - 0.7).abs() < 1e-6);
        suppress(&mut boxes, 0.45, SuppressionPolicy::ClassAware);
        assert_eq!(boxes.len(), 1);
        assert_eq!(boxes[0].confidence, 0.8);
    }

    #[test]
    fn class_aware_keeps_other_classes() {
        let mut boxes = vec![
            det(0., 0., 10., 10., 0.9, 0),
            det(0., 0., 10., 10., 0.8, 1),
        ];
        suppress(&mut boxes, 0.45, SuppressionPolicy::ClassAware);
        assert_eq!(boxes.len(), 2);

        suppress(&mut boxes, 0.45, SuppressionPolicy::ClassAgnostic);
        assert_eq!(boxes.len(), 1);
        assert_eq!(boxes[0].class_id, 0);
    }

    #[test]
    fn skip_only_orders() {
        let mut boxes = vec![
            det(0., 0., 10., 10., 0.3, 0),
            det(0., 0., 10., 10., 0.9, 0),
        ];
        suppress(&mut boxes, 0.45, SuppressionPolicy::Skip);
        assert_eq!(boxes.len(), 2);
        assert_eq!(boxes[0].confidence, 0.9);
    }

    #[test]
    fn overlap_at_threshold_survives() {
        // IoU = 50 / 100 = 0.5, not strictly above 0.5
        let mut boxes = vec![
            det(0., 0., 10., 10., 0.9, 3),
            det(0., 0., 10., 5., 0.5, 3),
        ];
        suppress(&mut boxes, 0.5, SuppressionPolicy::ClassAware);
        assert_eq!(boxes.len(), 2);
    }

    #[test]
    fn survivors_never_overlap_above_threshold() {
        let mut boxes = Vec::new();
        for i in 0..40 {
            let offset = (i % 7) as f32 * 3.;
            let conf = 0.3 + (i as f32 * 0.37) % 0.7;
            boxes.push(det(offset, offset * 0.5, 20. + (i % 3) as f32, 20., conf, i % 2));
        }
        suppress(&mut boxes, 0.45, SuppressionPolicy::ClassAware);
        for (i, a) in boxes.iter().enumerate() {
            for b in boxes.iter().skip(i + 1) {
                if a.class_id == b.class_id {
                    assert!(a.bbox.iou(&b.bbox) <= 0.5);
                }
            }
        }
        for pair in boxes.windows(2) {
            assert!(pair[0].confidence >= pair[1].confidence);
        }
    }

    #[test]
    fn policy_serde_names() {
        let p: SuppressionPolicy = serde_json::from_str(r#""class_aware""#).unwrap();
        assert_eq!(p, SuppressionPolicy::ClassAware);
        assert_eq!(serde_json::to_string(&SuppressionPolicy::Skip).unwrap(), r#""skip""#);
    }
}
