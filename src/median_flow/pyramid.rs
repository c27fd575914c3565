//! Image pyramid and pyramidal Lucas-Kanade point tracking for median flow.

use nalgebra::{Matrix2, Vector2};

use crate::frame::Frame;
use crate::rect::Size;
use crate::term_criteria::TermCriteria;

/* ------------------------------------------------------------------------------
 * Pyramid struct
 * ------------------------------------------------------------------------------ */

#[derive(Debug, Clone)]
pub struct PyramidLevel {
    pub width: usize,
    pub height: usize,
    pub data: Vec<f32>,
}

impl PyramidLevel {
    #[inline(always)]
    fn pixel(&self, x: isize, y: isize) -> f32 {
        let xc = x.clamp(0, self.width as isize - 1) as usize;
        let yc = y.clamp(0, self.height as isize - 1) as usize;
        self.data[yc * self.width + xc]
    }

    pub fn bilinear(&self, x: f32, y: f32) -> f32 {
        let x0 = x.floor();
        let y0 = y.floor();
        let wx = x - x0;
        let wy = y - y0;
        let x0 = x0 as isize;
        let y0 = y0 as isize;
        let p00 = self.pixel(x0, y0);
        let p01 = self.pixel(x0 + 1, y0);
        let p10 = self.pixel(x0, y0 + 1);
        let p11 = self.pixel(x0 + 1, y0 + 1);
        (1.0 - wy) * ((1.0 - wx) * p00 + wx * p01)
            + wy * ((1.0 - wx) * p10 + wx * p11)
    }
}

/// Coarse-to-fine grayscale pyramid, level 0 at full resolution and each
/// further level a 2x2 box-filtered half.
#[derive(Debug, Clone)]
pub struct Pyramid {
    levels: Vec<PyramidLevel>,
}

impl Pyramid {
    /// Build up to `max_level + 1` levels; stops early once a level would
    /// drop under 8 pixels on a side.
    pub fn build(frame: &Frame, max_level: usize) -> Self {
        let base = PyramidLevel {
            width: frame.width(),
            height: frame.height(),
            data: frame.as_slice().iter().map(|&v| v as f32).collect(),
        };
        let mut levels = vec![base];
        for _ in 0..max_level {
            let prev = levels.last().expect("pyramid has a base level");
            let w = prev.width / 2;
            let h = prev.height / 2;
            if w < 8 || h < 8 {
                break;
            }
            let mut data = vec![0.0f32; w * h];
            for y in 0..h {
                for x in 0..w {
                    let i = 2 * y * prev.width + 2 * x;
                    data[y * w + x] = 0.25
                        * (prev.data[i]
                            + prev.data[i + 1]
                            + prev.data[i + prev.width]
                            + prev.data[i + prev.width + 1]);
                }
            }
            levels.push(PyramidLevel {
                width: w,
                height: h,
                data,
            });
        }
        Self { levels }
    }

    pub fn num_levels(&self) -> usize {
        self.levels.len()
    }

    pub fn level(&self, i: usize) -> &PyramidLevel {
        &self.levels[i]
    }
}

/* ------------------------------------------------------------------------------
 * Pyramidal Lucas-Kanade
 * ------------------------------------------------------------------------------ */

#[derive(Debug, Clone, Copy)]
pub struct LkConfig {
    pub win_size: Size,
    pub max_level: usize,
    pub term: TermCriteria,
}

// Hard cap for epsilon-only criteria: on a low-structure patch the
// Gauss-Newton step can stay above epsilon indefinitely.
const MAX_LK_ITERATIONS: usize = 100;

/// Track one point from `prev` to `curr`, coarse to fine. Returns the new
/// position, or `None` when the normal equations go singular (textureless
/// patch) or the point leaves the image.
pub fn track_point(
    prev: &Pyramid,
    curr: &Pyramid,
    cfg: &LkConfig,
    x: f32,
    y: f32,
) -> Option<(f32, f32)> {
    let num_levels = (cfg.max_level + 1)
        .min(prev.num_levels())
        .min(curr.num_levels());
    let max_iterations = cfg.term.max_count.unwrap_or(MAX_LK_ITERATIONS);
    let half_x = (cfg.win_size.width / 2).max(1) as isize;
    let half_y = (cfg.win_size.height / 2).max(1) as isize;

    let mut dx = 0.0f32;
    let mut dy = 0.0f32;

    for level in (0..num_levels).rev() {
        let prev_img = prev.level(level);
        let curr_img = curr.level(level);
        let scale = 1.0 / (1u32 << level) as f32;
        let px = x * scale;
        let py = y * scale;

        let mut iteration = 0usize;
        loop {
            let mut h: Matrix2<f32> = Matrix2::zeros();
            let mut b: Vector2<f32> = Vector2::zeros();
            for wy in -half_y..=half_y {
                for wx in -half_x..=half_x {
                    let tx = px + wx as f32;
                    let ty = py + wy as f32;
                    let t_val = prev_img.bilinear(tx, ty);

                    let cx = tx + dx;
                    let cy = ty + dy;
                    let i_val = curr_img.bilinear(cx, cy);
                    let e = t_val - i_val;

                    let gx = 0.5
                        * (curr_img.bilinear(cx + 1.0, cy)
                            - curr_img.bilinear(cx - 1.0, cy));
                    let gy = 0.5
                        * (curr_img.bilinear(cx, cy + 1.0)
                            - curr_img.bilinear(cx, cy - 1.0));

                    h[(0, 0)] += gx * gx;
                    h[(0, 1)] += gx * gy;
                    h[(1, 0)] += gx * gy;
                    h[(1, 1)] += gy * gy;
                    b[0] += gx * e;
                    b[1] += gy * e;
                }
            }

            let h_inv = h.try_inverse()?;
            let delta = h_inv * b;
            if !delta[0].is_finite() || !delta[1].is_finite() {
                return None;
            }
            dx += delta[0];
            dy += delta[1];

            iteration += 1;
            let step = (delta[0] * delta[0] + delta[1] * delta[1]).sqrt();
            if cfg.term.is_met(iteration, step) || iteration >= max_iterations {
                break;
            }
        }

        if level > 0 {
            dx *= 2.0;
            dy *= 2.0;
        }
    }

    let nx = x + dx;
    let ny = y + dy;
    let level0 = prev.level(0);
    if nx < 0.0
        || ny < 0.0
        || nx >= level0.width as f32
        || ny >= level0.height as f32
    {
        return None;
    }
    Some((nx, ny))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blob_frame(w: usize, h: usize, cx: f32, cy: f32) -> Frame {
        Frame::from_fn(w, h, |x, y| {
            let dx = x as f32 - cx;
            let dy = y as f32 - cy;
            (255.0 * (-0.01 * (dx * dx + dy * dy)).exp()) as u8
        })
    }

    fn lk_config() -> LkConfig {
        LkConfig {
            win_size: Size::new(11, 11),
            max_level: 3,
            term: TermCriteria::count_eps(30, 0.01),
        }
    }

    #[test]
    fn test_pyramid_levels_halve() {
        let frame = Frame::from_fn(64, 48, |x, _| x as u8);
        let pyr = Pyramid::build(&frame, 2);
        assert_eq!(pyr.num_levels(), 3);
        assert_eq!(pyr.level(1).width, 32);
        assert_eq!(pyr.level(2).height, 12);
    }

    #[test]
    fn test_pyramid_stops_at_tiny_levels() {
        let frame = Frame::from_fn(20, 20, |_, _| 0);
        let pyr = Pyramid::build(&frame, 5);
        // 20 -> 10 -> 5 would be under the 8 px floor.
        assert_eq!(pyr.num_levels(), 2);
    }

    #[test]
    fn test_zero_motion() {
        let frame = blob_frame(80, 80, 40.0, 40.0);
        let pyr = Pyramid::build(&frame, 3);
        let (nx, ny) =
            track_point(&pyr, &pyr, &lk_config(), 40.0, 40.0).unwrap();
        assert!((nx - 40.0).abs() < 0.5);
        assert!((ny - 40.0).abs() < 0.5);
    }

    #[test]
    fn test_recovers_translation() {
        let a = blob_frame(80, 80, 40.0, 40.0);
        let b = blob_frame(80, 80, 43.0, 41.0);
        let pa = Pyramid::build(&a, 3);
        let pb = Pyramid::build(&b, 3);
        let (nx, ny) =
            track_point(&pa, &pb, &lk_config(), 40.0, 40.0).unwrap();
        assert!((nx - 43.0).abs() < 0.7, "nx = {nx}");
        assert!((ny - 41.0).abs() < 0.7, "ny = {ny}");
    }

    #[test]
    fn test_eps_only_criteria_terminates_on_noise() {
        // A noise patch never converges below a tiny epsilon; the solver
        // must still return.
        let noise = |seed: usize| {
            Frame::from_fn(64, 64, move |x, y| {
                ((x * 31 + y * 57 + seed * 11) % 256) as u8
            })
        };
        let pa = Pyramid::build(&noise(1), 0);
        let pb = Pyramid::build(&noise(2), 0);
        let cfg = LkConfig {
            win_size: Size::new(5, 5),
            max_level: 0,
            term: TermCriteria::eps(1e-12),
        };
        for (x, y) in [(10.0, 10.0), (32.0, 32.0), (50.0, 20.0)] {
            let _ = track_point(&pa, &pb, &cfg, x, y);
        }
    }

    #[test]
    fn test_eps_only_criteria_still_converges() {
        let a = blob_frame(80, 80, 40.0, 40.0);
        let b = blob_frame(80, 80, 42.0, 41.0);
        let pa = Pyramid::build(&a, 3);
        let pb = Pyramid::build(&b, 3);
        let cfg = LkConfig {
            win_size: Size::new(11, 11),
            max_level: 3,
            term: TermCriteria::eps(0.01),
        };
        let (nx, ny) = track_point(&pa, &pb, &cfg, 40.0, 40.0).unwrap();
        assert!((nx - 42.0).abs() < 0.7, "nx = {nx}");
        assert!((ny - 41.0).abs() < 0.7, "ny = {ny}");
    }

    #[test]
    fn test_flat_patch_is_singular() {
        let frame = Frame::from_fn(64, 64, |_, _| 128);
        let pyr = Pyramid::build(&frame, 2);
        assert!(track_point(&pyr, &pyr, &lk_config(), 32.0, 32.0).is_none());
    }
}
