use nalgebra::Matrix1x4;
use num::Float;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;

/* ------------------------------------------------------------------------------
 * Size struct
 * ------------------------------------------------------------------------------ */

/// Whole-pixel extent, used for frame dimensions and window-size parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Size {
    pub width: usize,
    pub height: usize,
}

impl Size {
    pub fn new(width: usize, height: usize) -> Self {
        Self { width, height }
    }

    pub fn area(&self) -> usize {
        self.width * self.height
    }
}

/* ------------------------------------------------------------------------------
 * Rect struct
 * ------------------------------------------------------------------------------ */

/// Axis-aligned bounding box in tlwh form (top-left x, top-left y, width, height).
///
/// Boxes are value types: they cross every tracker boundary by copy and are
/// never shared by reference between calls. Sub-pixel coordinates are the
/// internal currency; `to_i32` rounds to whole pixels for caller-facing use.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect<T>
where
    T: Debug + Float + 'static,
{
    tlwh: Matrix1x4<T>,
}

impl<T> Rect<T>
where
    T: Debug + Float + 'static,
{
    pub fn new(x: T, y: T, width: T, height: T) -> Self {
        Self {
            tlwh: Matrix1x4::new(x, y, width, height),
        }
    }

    #[inline(always)]
    pub fn x(&self) -> T {
        self.tlwh[(0, 0)]
    }

    #[inline(always)]
    pub fn set_x(&mut self, x: T) {
        self.tlwh[(0, 0)] = x;
    }

    #[inline(always)]
    pub fn y(&self) -> T {
        self.tlwh[(0, 1)]
    }

    #[inline(always)]
    pub fn set_y(&mut self, y: T) {
        self.tlwh[(0, 1)] = y;
    }

    #[inline(always)]
    pub fn width(&self) -> T {
        self.tlwh[(0, 2)]
    }

    #[inline(always)]
    pub fn set_width(&mut self, width: T) {
        self.tlwh[(0, 2)] = width;
    }

    #[inline(always)]
    pub fn height(&self) -> T {
        self.tlwh[(0, 3)]
    }

    #[inline(always)]
    pub fn set_height(&mut self, height: T) {
        self.tlwh[(0, 3)] = height;
    }

    pub fn area(&self) -> T {
        self.width() * self.height()
    }

    pub fn center(&self) -> (T, T) {
        let two = T::from(2).unwrap();
        (
            self.x() + self.width() / two,
            self.y() + self.height() / two,
        )
    }

    /// A box is degenerate when either extent is non-positive.
    pub fn is_degenerate(&self) -> bool {
        self.width() <= T::zero() || self.height() <= T::zero()
    }

    pub fn contains_point(&self, px: T, py: T) -> bool {
        px >= self.x()
            && py >= self.y()
            && px < self.x() + self.width()
            && py < self.y() + self.height()
    }

    /// Intersection-over-union with another box. Zero when disjoint.
    pub fn iou(&self, other: &Rect<T>) -> T {
        let ix = (self.x() + self.width()).min(other.x() + other.width())
            - self.x().max(other.x());
        if ix <= T::zero() {
            return T::zero();
        }
        let iy = (self.y() + self.height()).min(other.y() + other.height())
            - self.y().max(other.y());
        if iy <= T::zero() {
            return T::zero();
        }
        let inter = ix * iy;
        inter / (self.area() + other.area() - inter)
    }

    /// Clamp the box into a `size`-sized frame, shrinking it where it
    /// overhangs the border.
    pub fn clip_to(&self, size: Size) -> Rect<T> {
        let fw = T::from(size.width).unwrap();
        let fh = T::from(size.height).unwrap();
        let x0 = self.x().max(T::zero());
        let y0 = self.y().max(T::zero());
        let x1 = (self.x() + self.width()).min(fw);
        let y1 = (self.y() + self.height()).min(fh);
        Rect::new(
            x0,
            y0,
            (x1 - x0).max(T::zero()),
            (y1 - y0).max(T::zero()),
        )
    }
}

impl Rect<f32> {
    /// Round to whole-pixel coordinates for caller-facing output.
    pub fn to_i32(&self) -> (i32, i32, i32, i32) {
        (
            self.x().round() as i32,
            self.y().round() as i32,
            self.width().round() as i32,
            self.height().round() as i32,
        )
    }

    pub fn from_i32(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self::new(x as f32, y as f32, width as f32, height as f32)
    }
}
