use serde::{Deserialize, Serialize};

/// Axis-aligned box in source-frame pixel coordinates.
#[derive(Default, Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x1: f32,
    pub y1: f32,
    pub w: f32,
    pub h: f32,
}

impl BoundingBox {
    pub fn new(x: f32, y: f32, w: f32, h: f32) -> Self {
        Self { x1: x, y1: y, w, h }
    }

    /// Returns the width of the bounding box.
    pub fn width(&self) -> f32 {
        self.w
    }

    /// Returns the height of the bounding box.
    pub fn height(&self) -> f32 {
        self.h
    }

    /// Returns the maximum x-coordinate of the bounding box.
    pub fn x2(&self) -> f32 {
        self.x1 + self.w
    }

    /// Returns the maximum y-coordinate of the bounding box.
    pub fn y2(&self) -> f32 {
        self.y1 + self.h
    }

    pub fn cx(&self) -> f32 {
        self.x1 + self.w / 2.
    }

    pub fn cy(&self) -> f32 {
        self.y1 + self.h / 2.
    }

    /// Returns the bounding box coordinates and size as `(x, y, w, h)`.
    pub fn xy1_wh(&self) -> (f32, f32, f32, f32) {
        (self.x1, self.y1, self.w, self.h)
    }

    /// Returns the bounding box coordinates as `(x1, y1, x2, y2)`.
    pub fn xy1_xy2(&self) -> (f32, f32, f32, f32) {
        (self.x1, self.y1, self.x2(), self.y2())
    }

    /// Computes the area of the bounding box. Degenerate boxes have zero area.
    pub fn area(&self) -> f32 {
        self.w.max(0.) * self.h.max(0.)
    }

    /// Computes the intersection area between this bounding box and another.
    pub fn intersect(&self, other: &BoundingBox) -> f32 {
        let left = self.x1.max(other.x1);
        let right = self.x2().min(other.x2());
        let top = self.y1.max(other.y1);
        let bottom = self.y2().min(other.y2());
        (right - left).max(0.) * (bottom - top).max(0.)
    }

    /// Computes the union area between this bounding box and another.
    pub fn union(&self, other: &BoundingBox) -> f32 {
        self.area() + other.area() - self.intersect(other)
    }

    /// Intersection over union. Disjoint boxes and zero-area pairs yield 0.
    pub fn iou(&self, other: &BoundingBox) -> f32 {
        let inter = self.intersect(other);
        if inter <= 0. {
            return 0.;
        }
        let union = self.union(other);
        if union <= 0. {
            return 0.;
        }
        inter / union
    }

    /// Rounded `(x, y, w, h)` for pixel drawing.
    pub fn as_xy_wh_i32(&self) -> (i32, i32, i32, i32) {
        (
            self.x1.round() as i32,
            self.y1.round() as i32,
            self.w.round() as i32,
            self.h.round() as i32,
        )
    }

    /// Sets the bounding box's coordinates using `(x1, y1, x2, y2)` and calculates width and height.
    pub fn with_x1y1_x2y2(mut self, x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        self.x1 = x1;
        self.y1 = y1;
        self.w = x2 - x1;
        self.h = y2 - y1;
        self
    }

    /// Sets the bounding box's coordinates and dimensions using `(cx, cy, w, h)`.
    ///
    /// # Arguments
    ///
    /// * `cx` - The x-coordinate of the horizontal center.
    /// * `cy` - The y-coordinate of the vertical center.
    /// * `w` - The width of the bounding box.
    /// * `h` - The height of the bounding box.
    pub fn with_cxcy_wh(mut self, cx: f32, cy: f32, w: f32, h: f32) -> Self {
        self.x1 = cx - (w / 2.0);
        self.y1 = cy - (h / 2.0);
        self.w = w;
        self.h = h;
        self
    }

    /// Rescales every coordinate with independent horizontal and vertical factors.
    pub fn scaled(self, sx: f32, sy: f32) -> Self {
        Self {
            x1: self.x1 * sx,
            y1: self.y1 * sy,
            w: self.w * sx,
            h: self.h * sy,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn iou_is_symmetric() {
        let a = BoundingBox::new(0., 0., 10., 10.);
        let b = BoundingBox::new(5., 5., 10., 10.);
        assert_eq!(a.iou(&b), b.iou(&a));
        assert!((a.iou(&b) - 25. / 175.).abs() < 1e-6);
    }

    #[test]
    fn iou_with_self_is_one() {
        let a = BoundingBox::new(3., 4., 20., 8.);
        assert_eq!(a.iou(&a), 1.);
    }

    #[test]
    fn iou_of_disjoint_boxes_is_zero() {
        let a = BoundingBox::new(0., 0., 10., 10.);
        let b = BoundingBox::new(20., 20., 5., 5.);
        assert_eq!(a.iou(&b), 0.);

        // touching edges share no area
        let c = BoundingBox::new(10., 0., 10., 10.);
        assert_eq!(a.iou(&c), 0.);
    }

    #[test]
    fn zero_area_boxes_have_zero_iou() {
        let a = BoundingBox::new(5., 5., 0., 0.);
        assert_eq!(a.iou(&a), 0.);
    }

    #[test]
    fn corner_and_center_constructors_agree() {
        let a = BoundingBox::default().with_x1y1_x2y2(10., 20., 30., 60.);
        let b = BoundingBox::default().with_cxcy_wh(20., 40., 20., 40.);
        assert_eq!(a, b);
        assert_eq!(a.xy1_xy2(), (10., 20., 30., 60.));
    }

    #[test]
    fn scaled_uses_independent_factors() {
        let a = BoundingBox::new(10., 10., 20., 20.).scaled(2., 0.5);
        assert_eq!(a.xy1_wh(), (20., 5., 40., 10.));
    }
}
