//! Forward-backward median-flow tracker.
//!
//! A grid of points inside the box is tracked with pyramidal Lucas-Kanade,
//! then tracked back again; points whose forward-backward error or NCC score
//! is worse than the median are discarded, and the box follows the median
//! displacement and the median pairwise-distance ratio of the survivors.

use log::{debug, trace};
use serde::{Deserialize, Serialize};

use super::pyramid::{track_point, LkConfig, Pyramid, PyramidLevel};
use crate::error::TrackError;
use crate::frame::Frame;
use crate::rect::{Rect, Size};
use crate::term_criteria::TermCriteria;
use crate::tracker::{
    check_frame_dims, check_init_box, TrackStatus, TrackUpdate, Tracker,
};

/* ------------------------------------------------------------------------------
 * MedianFlowParams
 * ------------------------------------------------------------------------------ */

/// Tuning knobs of the median-flow tracker.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MedianFlowParams {
    /// Seed points per box side; the grid is `points_in_grid` squared.
    pub points_in_grid: usize,
    /// Lucas-Kanade integration window.
    pub win_size: Size,
    /// Highest pyramid level used by Lucas-Kanade.
    pub max_level: usize,
    /// Bound on the per-level Lucas-Kanade iteration.
    pub term_criteria: TermCriteria,
    /// Patch size for the NCC appearance check.
    pub win_size_ncc: Size,
    /// Loss threshold on the median deviation of point displacements.
    pub max_median_length_of_displacement_difference: f32,
}

impl Default for MedianFlowParams {
    fn default() -> Self {
        Self {
            points_in_grid: 10,
            win_size: Size::new(3, 3),
            max_level: 5,
            term_criteria: TermCriteria::count_eps(20, 0.3),
            win_size_ncc: Size::new(30, 30),
            max_median_length_of_displacement_difference: 10.0,
        }
    }
}

impl MedianFlowParams {
    pub fn validate(&self) -> Result<(), TrackError> {
        if self.points_in_grid < 2 {
            return Err(TrackError::InvalidParams {
                name: "points_in_grid",
                reason: format!(
                    "need at least a 2x2 grid, got {}",
                    self.points_in_grid
                ),
            });
        }
        if self.win_size.width < 3 || self.win_size.height < 3 {
            return Err(TrackError::InvalidParams {
                name: "win_size",
                reason: format!(
                    "window must be at least 3x3, got {}x{}",
                    self.win_size.width, self.win_size.height
                ),
            });
        }
        if self.win_size_ncc.width < 3 || self.win_size_ncc.height < 3 {
            return Err(TrackError::InvalidParams {
                name: "win_size_ncc",
                reason: format!(
                    "NCC window must be at least 3x3, got {}x{}",
                    self.win_size_ncc.width, self.win_size_ncc.height
                ),
            });
        }
        if !(self.max_median_length_of_displacement_difference > 0.0) {
            return Err(TrackError::InvalidParams {
                name: "max_median_length_of_displacement_difference",
                reason: format!(
                    "must be positive, got {}",
                    self.max_median_length_of_displacement_difference
                ),
            });
        }
        self.term_criteria.validate()
    }
}

/* ------------------------------------------------------------------------------
 * MedianFlowTracker
 * ------------------------------------------------------------------------------ */

#[derive(Debug)]
struct MedianFlowState {
    rect: Rect<f32>,
    prev_pyramid: Pyramid,
    frame_width: usize,
    frame_height: usize,
}

#[derive(Debug)]
pub struct MedianFlowTracker {
    params: MedianFlowParams,
    state: Option<MedianFlowState>,
}

impl MedianFlowTracker {
    /// Create a tracker from a validated parameter record.
    pub fn new(params: MedianFlowParams) -> Result<Self, TrackError> {
        params.validate()?;
        Ok(Self {
            params,
            state: None,
        })
    }

    fn lk_config(&self) -> LkConfig {
        LkConfig {
            win_size: self.params.win_size,
            max_level: self.params.max_level,
            term: self.params.term_criteria,
        }
    }

    fn grid_points(&self, rect: &Rect<f32>) -> Vec<(f32, f32)> {
        let n = self.params.points_in_grid;
        let mut points = Vec::with_capacity(n * n);
        for j in 0..n {
            for i in 0..n {
                points.push((
                    rect.x() + (i as f32 + 0.5) * rect.width() / n as f32,
                    rect.y() + (j as f32 + 0.5) * rect.height() / n as f32,
                ));
            }
        }
        points
    }
}

fn median(values: &mut Vec<f32>) -> f32 {
    debug_assert!(!values.is_empty(), "median of empty slice");
    values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        0.5 * (values[mid - 1] + values[mid])
    } else {
        values[mid]
    }
}

/// Normalized cross-correlation of two patches centered on `a` and `b`.
fn ncc(
    prev: &PyramidLevel,
    curr: &PyramidLevel,
    a: (f32, f32),
    b: (f32, f32),
    win: Size,
) -> f32 {
    let half_x = (win.width / 2) as isize;
    let half_y = (win.height / 2) as isize;
    let n = ((2 * half_x + 1) * (2 * half_y + 1)) as f32;

    let mut sum_a = 0.0f32;
    let mut sum_b = 0.0f32;
    for wy in -half_y..=half_y {
        for wx in -half_x..=half_x {
            sum_a += prev.bilinear(a.0 + wx as f32, a.1 + wy as f32);
            sum_b += curr.bilinear(b.0 + wx as f32, b.1 + wy as f32);
        }
    }
    let mean_a = sum_a / n;
    let mean_b = sum_b / n;

    let mut corr = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    for wy in -half_y..=half_y {
        for wx in -half_x..=half_x {
            let va = prev.bilinear(a.0 + wx as f32, a.1 + wy as f32) - mean_a;
            let vb = curr.bilinear(b.0 + wx as f32, b.1 + wy as f32) - mean_b;
            corr += va * vb;
            norm_a += va * va;
            norm_b += vb * vb;
        }
    }
    let denom = (norm_a * norm_b).sqrt();
    if denom <= 1e-6 {
        return 0.0;
    }
    corr / denom
}

impl Tracker for MedianFlowTracker {
    fn init(&mut self, frame: &Frame, rect: Rect<f32>) -> Result<(), TrackError> {
        check_init_box(frame, &rect)?;
        self.state = Some(MedianFlowState {
            rect,
            prev_pyramid: Pyramid::build(frame, self.params.max_level),
            frame_width: frame.width(),
            frame_height: frame.height(),
        });
        Ok(())
    }

    fn update(&mut self, frame: &Frame) -> Result<TrackUpdate, TrackError> {
        let state = self.state.as_ref().ok_or(TrackError::NotInitialized)?;
        check_frame_dims(frame, state.frame_width, state.frame_height)?;

        let prev_rect = state.rect;
        let curr_pyramid = Pyramid::build(frame, self.params.max_level);
        let cfg = self.lk_config();

        // Forward pass, backward pass, and NCC score per surviving point.
        let mut origins = Vec::new();
        let mut tracked = Vec::new();
        let mut fb_errors = Vec::new();
        let mut ncc_scores = Vec::new();
        for (x, y) in self.grid_points(&prev_rect) {
            let Some((fx, fy)) =
                track_point(&state.prev_pyramid, &curr_pyramid, &cfg, x, y)
            else {
                continue;
            };
            let Some((bx, by)) =
                track_point(&curr_pyramid, &state.prev_pyramid, &cfg, fx, fy)
            else {
                continue;
            };
            let fb = ((bx - x).powi(2) + (by - y).powi(2)).sqrt();
            let score = ncc(
                state.prev_pyramid.level(0),
                curr_pyramid.level(0),
                (x, y),
                (fx, fy),
                self.params.win_size_ncc,
            );
            origins.push((x, y));
            tracked.push((fx, fy));
            fb_errors.push(fb);
            ncc_scores.push(score);
        }
        trace!(
            "median flow: {} of {} grid points tracked both ways",
            origins.len(),
            self.params.points_in_grid * self.params.points_in_grid
        );

        let lost = |rect: Rect<f32>, state: &mut Option<MedianFlowState>| {
            let state = state.as_mut().expect("state checked above");
            state.prev_pyramid = curr_pyramid.clone();
            state.rect = rect;
            Ok(TrackUpdate {
                rect,
                status: TrackStatus::Lost,
            })
        };

        if origins.len() < 2 {
            debug!("median flow: lost object ({} points survive)", origins.len());
            return lost(prev_rect, &mut self.state);
        }

        // Keep points at or better than the median FB error and NCC score.
        let median_fb = median(&mut fb_errors.clone());
        let median_ncc = median(&mut ncc_scores.clone());
        let mut kept_origins = Vec::new();
        let mut kept_tracked = Vec::new();
        for i in 0..origins.len() {
            if fb_errors[i] <= median_fb && ncc_scores[i] >= median_ncc {
                kept_origins.push(origins[i]);
                kept_tracked.push(tracked[i]);
            }
        }
        if kept_origins.len() < 2 {
            debug!(
                "median flow: lost object ({} points after filtering)",
                kept_origins.len()
            );
            return lost(prev_rect, &mut self.state);
        }

        // Median displacement.
        let mut dxs: Vec<f32> = kept_origins
            .iter()
            .zip(&kept_tracked)
            .map(|(o, t)| t.0 - o.0)
            .collect();
        let mut dys: Vec<f32> = kept_origins
            .iter()
            .zip(&kept_tracked)
            .map(|(o, t)| t.1 - o.1)
            .collect();
        let dx = median(&mut dxs);
        let dy = median(&mut dys);

        // Median deviation of displacements from the consensus; large spread
        // means the point cloud disagrees and the estimate is untrustworthy.
        let mut deviations: Vec<f32> = kept_origins
            .iter()
            .zip(&kept_tracked)
            .map(|(o, t)| {
                ((t.0 - o.0 - dx).powi(2) + (t.1 - o.1 - dy).powi(2)).sqrt()
            })
            .collect();
        let median_deviation = median(&mut deviations);
        if median_deviation
            > self.params.max_median_length_of_displacement_difference
        {
            debug!(
                "median flow: lost object (displacement deviation {median_deviation:.2})"
            );
            let provisional = Rect::new(
                prev_rect.x() + dx,
                prev_rect.y() + dy,
                prev_rect.width(),
                prev_rect.height(),
            );
            return lost(provisional, &mut self.state);
        }

        // Median pairwise-distance ratio gives the scale change.
        let mut ratios = Vec::new();
        for i in 0..kept_origins.len() {
            for j in (i + 1)..kept_origins.len() {
                let d_orig = ((kept_origins[i].0 - kept_origins[j].0).powi(2)
                    + (kept_origins[i].1 - kept_origins[j].1).powi(2))
                .sqrt();
                let d_curr = ((kept_tracked[i].0 - kept_tracked[j].0).powi(2)
                    + (kept_tracked[i].1 - kept_tracked[j].1).powi(2))
                .sqrt();
                if d_orig > 1e-3 {
                    ratios.push(d_curr / d_orig);
                }
            }
        }
        let scale = if ratios.is_empty() {
            1.0
        } else {
            median(&mut ratios)
        };

        let (cx, cy) = prev_rect.center();
        let new_w = prev_rect.width() * scale;
        let new_h = prev_rect.height() * scale;
        let new_rect = Rect::new(
            cx + dx - new_w / 2.0,
            cy + dy - new_h / 2.0,
            new_w,
            new_h,
        );
        if !new_rect.x().is_finite()
            || !new_rect.y().is_finite()
            || new_rect.is_degenerate()
        {
            debug!("median flow: lost object (non-finite or degenerate estimate)");
            return lost(prev_rect, &mut self.state);
        }

        let state = self.state.as_mut().expect("state checked above");
        state.prev_pyramid = curr_pyramid;
        state.rect = new_rect;
        Ok(TrackUpdate {
            rect: new_rect,
            status: TrackStatus::Tracked,
        })
    }
}
