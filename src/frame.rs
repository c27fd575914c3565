use crate::error::TrackError;
use crate::rect::Size;

/* ------------------------------------------------------------------------------
 * Frame struct
 * ------------------------------------------------------------------------------ */

/// Owned 8-bit grayscale frame, row-major.
///
/// Trackers read a frame for the duration of a call and never keep a
/// reference to it afterwards; where an algorithm needs the previous frame
/// (median flow) it clones the pixel data into its own state.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    width: usize,
    height: usize,
    data: Vec<u8>,
}

impl Frame {
    /// Wrap a row-major grayscale buffer. The buffer length must be exactly
    /// `width * height`.
    pub fn from_vec(
        width: usize,
        height: usize,
        data: Vec<u8>,
    ) -> Result<Self, TrackError> {
        if data.len() != width * height {
            return Err(TrackError::FrameSizeMismatch {
                len: data.len(),
                width,
                height,
            });
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    /// Build a frame by evaluating `f(x, y)` for every pixel.
    pub fn from_fn<F>(width: usize, height: usize, mut f: F) -> Self
    where
        F: FnMut(usize, usize) -> u8,
    {
        let mut data = Vec::with_capacity(width * height);
        for y in 0..height {
            for x in 0..width {
                data.push(f(x, y));
            }
        }
        Self {
            width,
            height,
            data,
        }
    }

    #[inline(always)]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline(always)]
    pub fn height(&self) -> usize {
        self.height
    }

    pub fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    /// Pixel value at integer coordinates. Coordinates are clamped to the
    /// border, so out-of-range reads repeat the edge pixel.
    #[inline(always)]
    pub fn pixel(&self, x: isize, y: isize) -> u8 {
        let xc = x.clamp(0, self.width as isize - 1) as usize;
        let yc = y.clamp(0, self.height as isize - 1) as usize;
        self.data[yc * self.width + xc]
    }

    /// Bilinear sub-pixel sample, border-clamped.
    pub fn bilinear(&self, x: f32, y: f32) -> f32 {
        let x0 = x.floor();
        let y0 = y.floor();
        let wx = x - x0;
        let wy = y - y0;
        let x0 = x0 as isize;
        let y0 = y0 as isize;
        let p00 = self.pixel(x0, y0) as f32;
        let p01 = self.pixel(x0 + 1, y0) as f32;
        let p10 = self.pixel(x0, y0 + 1) as f32;
        let p11 = self.pixel(x0 + 1, y0 + 1) as f32;
        (1.0 - wy) * ((1.0 - wx) * p00 + wx * p01)
            + wy * ((1.0 - wx) * p10 + wx * p11)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_vec_checks_length() {
        assert!(Frame::from_vec(4, 4, vec![0u8; 16]).is_ok());
        let err = Frame::from_vec(4, 4, vec![0u8; 15]).unwrap_err();
        assert!(matches!(err, TrackError::FrameSizeMismatch { len: 15, .. }));
    }

    #[test]
    fn test_pixel_clamps_at_border() {
        let f = Frame::from_fn(3, 2, |x, y| (y * 3 + x) as u8);
        assert_eq!(f.pixel(0, 0), 0);
        assert_eq!(f.pixel(2, 1), 5);
        assert_eq!(f.pixel(-5, 0), 0);
        assert_eq!(f.pixel(10, 10), 5);
    }

    #[test]
    fn test_bilinear_midpoint() {
        let f = Frame::from_vec(2, 1, vec![0, 100]).unwrap();
        assert!((f.bilinear(0.5, 0.0) - 50.0).abs() < 1e-4);
        assert!((f.bilinear(0.0, 0.0) - 0.0).abs() < 1e-4);
    }
}
