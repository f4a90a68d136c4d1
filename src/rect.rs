//! Axis-aligned boxes in frame pixel coordinates and the 4-component vector
//! the crop controller works on.

use crate::constants::{DEFAULT_UPSIZE_B, DEFAULT_UPSIZE_L, DEFAULT_UPSIZE_R, DEFAULT_UPSIZE_T};
use serde::{Deserialize, Serialize};
use std::ops::{Add, AddAssign, Index, IndexMut, Mul, Sub};

/// Half-open box `[x0, x1) × [y0, y1)` with a confidence score.
///
/// A box with zero area is valid and means "nothing found".
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Rect {
    /// Left edge
    pub x0: i32,
    /// Top edge
    pub y0: i32,
    /// Right edge (exclusive)
    pub x1: i32,
    /// Bottom edge (exclusive)
    pub y1: i32,
    /// Non-negative confidence
    pub score: f32,
}

impl Rect {
    /// Create a box from its corners
    #[must_use]
    pub const fn new(x0: i32, y0: i32, x1: i32, y1: i32, score: f32) -> Self {
        Self { x0, y0, x1, y1, score }
    }

    /// Box covering a whole `width × height` frame
    #[must_use]
    #[allow(clippy::cast_possible_wrap)]
    pub const fn full_frame(width: u32, height: u32) -> Self {
        Self::new(0, 0, width as i32, height as i32, 0.0)
    }

    #[must_use]
    pub const fn width(&self) -> i32 {
        self.x1 - self.x0
    }

    #[must_use]
    pub const fn height(&self) -> i32 {
        self.y1 - self.y0
    }

    /// Area in square pixels
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn area(&self) -> f32 {
        self.width() as f32 * self.height() as f32
    }

    /// True when the box covers no pixel
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.x0 >= self.x1 || self.y0 >= self.y1
    }

    /// Centre point
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn center(&self) -> (f32, f32) {
        (
            (self.x0 + self.x1) as f32 * 0.5,
            (self.y0 + self.y1) as f32 * 0.5,
        )
    }

    /// Same box with another score
    #[must_use]
    pub const fn with_score(self, score: f32) -> Self {
        Self { score, ..self }
    }

    /// Grow each side by a fraction of the box's own width or height.
    ///
    /// Negative margins shrink the box. The result may extend past the frame.
    #[must_use]
    #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
    pub fn expand(&self, margins: &Margins) -> Self {
        let w = self.width() as f32;
        let h = self.height() as f32;
        Self {
            x0: (self.x0 as f32 - w * margins.left) as i32,
            x1: (self.x1 as f32 + w * margins.right) as i32,
            y0: (self.y0 as f32 - h * margins.top) as i32,
            y1: (self.y1 as f32 + h * margins.bottom) as i32,
            score: self.score,
        }
    }
}

/// Fractional margins added around a detection before a tracker is seeded
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Margins {
    /// Left margin as a fraction of the box width
    pub left: f32,
    /// Right margin as a fraction of the box width
    pub right: f32,
    /// Top margin as a fraction of the box height
    pub top: f32,
    /// Bottom margin as a fraction of the box height
    pub bottom: f32,
}

impl Default for Margins {
    fn default() -> Self {
        Self::new(DEFAULT_UPSIZE_L, DEFAULT_UPSIZE_R, DEFAULT_UPSIZE_T, DEFAULT_UPSIZE_B)
    }
}

impl Margins {
    #[must_use]
    pub const fn new(left: f32, right: f32, top: f32, bottom: f32) -> Self {
        Self { left, right, top, bottom }
    }
}

/// Length of the overlap of `[a0, a1)` and `[b0, b1)`; zero when disjoint.
#[must_use]
pub fn common_length(a0: f32, a1: f32, b0: f32, b1: f32) -> f32 {
    (a1.min(b1) - a0.max(b0)).max(0.0)
}

/// Area shared by two boxes
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn common_area(a: &Rect, b: &Rect) -> f32 {
    common_length(a.x0 as f32, a.x1 as f32, b.x0 as f32, b.x1 as f32)
        * common_length(a.y0 as f32, a.y1 as f32, b.y0 as f32, b.y1 as f32)
}

/// Box coordinates `[x0, y0, x1, y1]` as floats
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct F4(pub [f32; 4]);

impl F4 {
    pub const ZERO: Self = Self([0.0; 4]);

    #[must_use]
    pub const fn new(x0: f32, y0: f32, x1: f32, y1: f32) -> Self {
        Self([x0, y0, x1, y1])
    }

    #[must_use]
    pub fn is_finite(&self) -> bool {
        self.0.iter().all(|v| v.is_finite())
    }

    /// Move the box inside `[0, width] × [0, height]` keeping its size.
    ///
    /// A box larger than the frame ends up aligned to the right/bottom edge.
    #[must_use]
    pub fn clamp_shift_into(self, width: f32, height: f32) -> Self {
        let [mut x0, mut y0, mut x1, mut y1] = self.0;
        if x0 < 0.0 {
            x1 -= x0;
            x0 = 0.0;
        }
        if x1 > width {
            x0 += width - x1;
            x1 = width;
        }
        if y0 < 0.0 {
            y1 -= y0;
            y0 = 0.0;
        }
        if y1 > height {
            y0 += height - y1;
            y1 = height;
        }
        Self([x0, y0, x1, y1])
    }
}

impl From<Rect> for F4 {
    #[allow(clippy::cast_precision_loss)]
    fn from(r: Rect) -> Self {
        Self::new(r.x0 as f32, r.y0 as f32, r.x1 as f32, r.y1 as f32)
    }
}

impl Add for F4 {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self(std::array::from_fn(|i| self.0[i] + rhs.0[i]))
    }
}

impl AddAssign for F4 {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl Sub for F4 {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self(std::array::from_fn(|i| self.0[i] - rhs.0[i]))
    }
}

impl Mul<f32> for F4 {
    type Output = Self;

    fn mul(self, k: f32) -> Self {
        Self(self.0.map(|v| v * k))
    }
}

impl Index<usize> for F4 {
    type Output = f32;

    fn index(&self, i: usize) -> &f32 {
        &self.0[i]
    }
}

impl IndexMut<usize> for F4 {
    fn index_mut(&mut self, i: usize) -> &mut f32 {
        &mut self.0[i]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_common_length_cases() {
        assert_eq!(common_length(0.0, 10.0, 5.0, 15.0), 5.0);
        assert_eq!(common_length(0.0, 10.0, 2.0, 8.0), 6.0);
        assert_eq!(common_length(2.0, 8.0, 0.0, 10.0), 6.0);
        assert_eq!(common_length(5.0, 15.0, 0.0, 10.0), 5.0);
        assert_eq!(common_length(0.0, 5.0, 5.0, 10.0), 0.0);
        assert_eq!(common_length(20.0, 30.0, 0.0, 10.0), 0.0);
    }

    #[test]
    fn test_expand_asymmetric() {
        let r = Rect::new(500, 200, 700, 500, 1.0);
        let e = r.expand(&Margins::new(0.2, 0.2, 0.3, 0.1));
        assert_eq!(e, Rect::new(460, 110, 740, 530, 1.0));
    }

    #[test]
    fn test_expand_negative_margins_keep_order() {
        let r = Rect::new(100, 100, 200, 200, 0.5);
        let e = r.expand(&Margins::new(-0.4, -0.4, -0.4, -0.4));
        assert_eq!(e, Rect::new(140, 140, 160, 160, 0.5));
        assert!(e.x0 <= e.x1 && e.y0 <= e.y1);
    }

    #[test]
    fn test_zero_area_is_empty() {
        let r = Rect::new(10, 10, 10, 40, 1.0);
        assert!(r.is_empty());
        assert_eq!(r.area(), 0.0);
    }

    #[test]
    fn test_f4_arithmetic() {
        let a = F4::new(1.0, 2.0, 3.0, 4.0);
        let b = F4::from(Rect::new(1, 1, 1, 1, 0.0));
        assert_eq!(a + b, F4::new(2.0, 3.0, 4.0, 5.0));
        assert_eq!(a - b, F4::new(0.0, 1.0, 2.0, 3.0));
        assert_eq!(a * 2.0, F4::new(2.0, 4.0, 6.0, 8.0));
    }

    #[test]
    fn test_clamp_shift_preserves_size() {
        let b = F4::new(-30.0, 650.0, 170.0, 750.0).clamp_shift_into(1280.0, 720.0);
        assert_eq!(b, F4::new(0.0, 620.0, 200.0, 720.0));

        let inside = F4::new(10.0, 10.0, 20.0, 20.0);
        assert_eq!(inside.clamp_shift_into(100.0, 100.0), inside);
    }

    fn arb_rect() -> impl Strategy<Value = Rect> {
        (-500i32..500, -500i32..500, 0i32..400, 0i32..400)
            .prop_map(|(x, y, w, h)| Rect::new(x, y, x + w, y + h, 1.0))
    }

    proptest! {
        #[test]
        fn prop_common_area_symmetric(a in arb_rect(), b in arb_rect()) {
            prop_assert_eq!(common_area(&a, &b), common_area(&b, &a));
        }

        #[test]
        fn prop_common_area_bounded(a in arb_rect(), b in arb_rect()) {
            let c = common_area(&a, &b);
            prop_assert!(c >= 0.0);
            prop_assert!(c <= a.area().min(b.area()));
        }

        #[test]
        fn prop_contained_box_overlap_is_its_area(a in arb_rect(), dx in 0i32..50, dy in 0i32..50) {
            let outer = Rect::new(a.x0 - dx, a.y0 - dy, a.x1 + dx, a.y1 + dy, 1.0);
            prop_assert_eq!(common_area(&outer, &a), a.area());
        }

        #[test]
        fn prop_disjoint_boxes_do_not_overlap(a in arb_rect(), gap in 0i32..100) {
            let b = Rect::new(a.x1 + gap, a.y0, a.x1 + gap + 10, a.y1, 1.0);
            prop_assert_eq!(common_area(&a, &b), 0.0);
        }
    }
}
