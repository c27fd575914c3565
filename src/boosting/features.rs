//! Integral image and Haar-like rectangle features for the boosting tracker.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::frame::Frame;

/* ------------------------------------------------------------------------------
 * IntegralImage struct
 * ------------------------------------------------------------------------------ */

/// Summed-area table over a grayscale frame; rectangle sums in O(1).
#[derive(Debug, Clone)]
pub struct IntegralImage {
    width: usize,
    height: usize,
    // (width + 1) x (height + 1), row-major, first row/column zero.
    table: Vec<f64>,
}

impl IntegralImage {
    pub fn new(frame: &Frame) -> Self {
        let width = frame.width();
        let height = frame.height();
        let stride = width + 1;
        let mut table = vec![0.0f64; stride * (height + 1)];
        let data = frame.as_slice();
        for y in 0..height {
            let mut row_sum = 0.0f64;
            for x in 0..width {
                row_sum += data[y * width + x] as f64;
                table[(y + 1) * stride + (x + 1)] =
                    table[y * stride + (x + 1)] + row_sum;
            }
        }
        Self {
            width,
            height,
            table,
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Sum of pixel values inside the rectangle, clamped to the image.
    pub fn rect_sum(&self, x: isize, y: isize, w: usize, h: usize) -> f64 {
        let stride = self.width + 1;
        let x0 = x.clamp(0, self.width as isize) as usize;
        let y0 = y.clamp(0, self.height as isize) as usize;
        let x1 = (x + w as isize).clamp(0, self.width as isize) as usize;
        let y1 = (y + h as isize).clamp(0, self.height as isize) as usize;
        if x1 <= x0 || y1 <= y0 {
            return 0.0;
        }
        self.table[y1 * stride + x1] + self.table[y0 * stride + x0]
            - self.table[y0 * stride + x1]
            - self.table[y1 * stride + x0]
    }

    fn rect_mean(&self, x: isize, y: isize, w: usize, h: usize) -> f64 {
        let area = (w * h) as f64;
        if area == 0.0 {
            return 0.0;
        }
        self.rect_sum(x, y, w, h) / area
    }
}

/* ------------------------------------------------------------------------------
 * Haar-like features
 * ------------------------------------------------------------------------------ */

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HaarKind {
    /// Left half minus right half.
    TwoHorizontal,
    /// Top half minus bottom half.
    TwoVertical,
    /// Outer thirds minus middle third (horizontal bands).
    ThreeHorizontal,
    /// Surround ring minus center.
    CenterSurround,
}

/// One rectangle feature, positioned relative to the unit patch so the same
/// pool applies to any patch size.
#[derive(Debug, Clone, Copy)]
pub struct HaarFeature {
    pub kind: HaarKind,
    pub rx: f32,
    pub ry: f32,
    pub rw: f32,
    pub rh: f32,
}

impl HaarFeature {
    /// Mean-based response over the patch at (px, py) of size (pw, ph).
    /// Mean differences keep responses on a comparable scale across patch
    /// sizes and feature extents.
    pub fn response(
        &self,
        integral: &IntegralImage,
        px: f32,
        py: f32,
        pw: f32,
        ph: f32,
    ) -> f32 {
        let fx = (px + self.rx * pw).round() as isize;
        let fy = (py + self.ry * ph).round() as isize;
        let fw = ((self.rw * pw).round() as usize).max(2);
        let fh = ((self.rh * ph).round() as usize).max(2);

        let out = match self.kind {
            HaarKind::TwoHorizontal => {
                let half = fw / 2;
                integral.rect_mean(fx, fy, half, fh)
                    - integral.rect_mean(fx + half as isize, fy, fw - half, fh)
            }
            HaarKind::TwoVertical => {
                let half = fh / 2;
                integral.rect_mean(fx, fy, fw, half)
                    - integral.rect_mean(fx, fy + half as isize, fw, fh - half)
            }
            HaarKind::ThreeHorizontal => {
                let third = (fh / 3).max(1);
                let whole = integral.rect_mean(fx, fy, fw, fh);
                let middle =
                    integral.rect_mean(fx, fy + third as isize, fw, third);
                whole - middle
            }
            HaarKind::CenterSurround => {
                let cx = fx + (fw / 4) as isize;
                let cy = fy + (fh / 4) as isize;
                let cw = (fw / 2).max(1);
                let ch = (fh / 2).max(1);
                integral.rect_mean(fx, fy, fw, fh)
                    - integral.rect_mean(cx, cy, cw, ch)
            }
        };
        out as f32
    }
}

/// Generate a deterministic pool of `count` features. The fixed seed keeps a
/// tracker's behavior reproducible run to run.
pub fn generate_feature_pool(count: usize, seed: u64) -> Vec<HaarFeature> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut pool = Vec::with_capacity(count);
    for _ in 0..count {
        let kind = match rng.gen_range(0..4) {
            0 => HaarKind::TwoHorizontal,
            1 => HaarKind::TwoVertical,
            2 => HaarKind::ThreeHorizontal,
            _ => HaarKind::CenterSurround,
        };
        let rx = rng.gen_range(0.0f32..0.7);
        let ry = rng.gen_range(0.0f32..0.7);
        let rw = rng.gen_range(0.2f32..(1.0 - rx).max(0.21));
        let rh = rng.gen_range(0.2f32..(1.0 - ry).max(0.21));
        pool.push(HaarFeature {
            kind,
            rx,
            ry,
            rw,
            rh,
        });
    }
    pool
}
