//! Online-boosting appearance tracker.
//!
//! The tracker learns a discriminative appearance model of the seed box with
//! online AdaBoost over Haar-like rectangle features: every weak learner keeps
//! running Gaussian models of its feature response on positive and negative
//! samples, and the strong classifier sums the confidence-weighted votes of
//! the lowest-error learners. Each update scans candidate windows around the
//! previous location and moves to the most confident one.

use log::{debug, trace};
use serde::{Deserialize, Serialize};

use super::features::{generate_feature_pool, HaarFeature, IntegralImage};
use crate::error::TrackError;
use crate::frame::Frame;
use crate::rect::Rect;
use crate::tracker::{
    check_frame_dims, check_init_box, TrackStatus, TrackUpdate, Tracker,
};

const FEATURE_POOL_SEED: u64 = 0x00b0_05f1;
const LEARNING_RATE: f32 = 0.85;
const VARIANCE_FLOOR: f32 = 1e-2;

/* ------------------------------------------------------------------------------
 * BoostingParams
 * ------------------------------------------------------------------------------ */

/// Tuning knobs of the boosting tracker.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoostingParams {
    /// Number of weak learners the strong classifier votes with.
    pub num_classifiers: usize,
    /// Minimum IoU a jittered sample must keep with the seed box to count as
    /// positive.
    pub sampler_overlap: f32,
    /// The search region is the previous box scaled by this factor.
    pub sampler_search_factor: f32,
    /// Training rounds run over the seed frame during `init`.
    pub iteration_init: usize,
    /// Size of the Haar feature pool the classifier selects from.
    pub feature_set_num_features: usize,
}

impl Default for BoostingParams {
    fn default() -> Self {
        Self {
            num_classifiers: 100,
            sampler_overlap: 0.99,
            sampler_search_factor: 1.8,
            iteration_init: 50,
            feature_set_num_features: 1000,
        }
    }
}

impl BoostingParams {
    pub fn validate(&self) -> Result<(), TrackError> {
        if self.num_classifiers == 0 {
            return Err(TrackError::InvalidParams {
                name: "num_classifiers",
                reason: "must be at least 1".into(),
            });
        }
        if self.feature_set_num_features < self.num_classifiers {
            return Err(TrackError::InvalidParams {
                name: "feature_set_num_features",
                reason: format!(
                    "pool of {} cannot supply {} classifiers",
                    self.feature_set_num_features, self.num_classifiers
                ),
            });
        }
        if !(self.sampler_overlap > 0.0 && self.sampler_overlap <= 1.0) {
            return Err(TrackError::InvalidParams {
                name: "sampler_overlap",
                reason: format!(
                    "must be in (0, 1], got {}",
                    self.sampler_overlap
                ),
            });
        }
        if !(self.sampler_search_factor >= 1.0) {
            return Err(TrackError::InvalidParams {
                name: "sampler_search_factor",
                reason: format!(
                    "must be at least 1.0, got {}",
                    self.sampler_search_factor
                ),
            });
        }
        if self.iteration_init == 0 {
            return Err(TrackError::InvalidParams {
                name: "iteration_init",
                reason: "must be at least 1".into(),
            });
        }
        Ok(())
    }
}

/* ------------------------------------------------------------------------------
 * Weak learner
 * ------------------------------------------------------------------------------ */

#[derive(Debug, Clone, Copy)]
struct GaussModel {
    mean: f32,
    var: f32,
    trained: bool,
}

impl GaussModel {
    fn new() -> Self {
        Self {
            mean: 0.0,
            var: 1.0,
            trained: false,
        }
    }

    fn update(&mut self, x: f32) {
        if !self.trained {
            self.mean = x;
            self.var = 1.0;
            self.trained = true;
            return;
        }
        self.mean = LEARNING_RATE * self.mean + (1.0 - LEARNING_RATE) * x;
        let d = x - self.mean;
        self.var =
            (LEARNING_RATE * self.var + (1.0 - LEARNING_RATE) * d * d)
                .max(VARIANCE_FLOOR);
    }

    fn log_density(&self, x: f32) -> f32 {
        let d = x - self.mean;
        -0.5 * (self.var.ln() + d * d / self.var)
    }
}

#[derive(Debug, Clone, Copy)]
struct WeakLearner {
    pos: GaussModel,
    neg: GaussModel,
    error: f32,
}

impl WeakLearner {
    fn new() -> Self {
        Self {
            pos: GaussModel::new(),
            neg: GaussModel::new(),
            error: 0.5,
        }
    }

    /// Log-likelihood ratio of the positive model over the negative one.
    fn ratio(&self, response: f32) -> f32 {
        if !self.pos.trained || !self.neg.trained {
            return 0.0;
        }
        self.pos.log_density(response) - self.neg.log_density(response)
    }

    fn train(&mut self, response: f32, positive: bool) {
        let predicted_positive = self.ratio(response) > 0.0;
        let miss = if self.pos.trained && self.neg.trained {
            (predicted_positive != positive) as u8 as f32
        } else {
            0.5
        };
        self.error =
            LEARNING_RATE * self.error + (1.0 - LEARNING_RATE) * miss;
        if positive {
            self.pos.update(response);
        } else {
            self.neg.update(response);
        }
    }

    fn alpha(&self) -> f32 {
        let e = self.error.clamp(0.01, 0.99);
        0.5 * ((1.0 - e) / e).ln()
    }
}

/* ------------------------------------------------------------------------------
 * BoostingTracker
 * ------------------------------------------------------------------------------ */

#[derive(Debug, Clone)]
struct BoostingState {
    rect: Rect<f32>,
    frame_width: usize,
    frame_height: usize,
}

#[derive(Debug)]
pub struct BoostingTracker {
    params: BoostingParams,
    pool: Vec<HaarFeature>,
    learners: Vec<WeakLearner>,
    selected: Vec<usize>,
    state: Option<BoostingState>,
}

impl BoostingTracker {
    /// Create a tracker from a validated parameter record. Fails fast on any
    /// out-of-range parameter, `num_classifiers = 0` included.
    pub fn new(params: BoostingParams) -> Result<Self, TrackError> {
        params.validate()?;
        let pool = generate_feature_pool(
            params.feature_set_num_features,
            FEATURE_POOL_SEED,
        );
        let learners = vec![WeakLearner::new(); pool.len()];
        Ok(Self {
            params,
            pool,
            learners,
            selected: Vec::new(),
            state: None,
        })
    }

    fn evaluate(&self, integral: &IntegralImage, rect: &Rect<f32>) -> f32 {
        let mut conf = 0.0f32;
        for &idx in &self.selected {
            let learner = &self.learners[idx];
            let response = self.pool[idx].response(
                integral,
                rect.x(),
                rect.y(),
                rect.width(),
                rect.height(),
            );
            let vote = if learner.ratio(response) > 0.0 { 1.0 } else { -1.0 };
            conf += learner.alpha() * vote;
        }
        conf
    }

    fn train_sample(
        &mut self,
        integral: &IntegralImage,
        rect: &Rect<f32>,
        positive: bool,
    ) {
        for (feature, learner) in
            self.pool.iter().zip(self.learners.iter_mut())
        {
            let response = feature.response(
                integral,
                rect.x(),
                rect.y(),
                rect.width(),
                rect.height(),
            );
            learner.train(response, positive);
        }
    }

    /// Re-rank the pool and keep the `num_classifiers` lowest-error learners.
    fn select_learners(&mut self) {
        let mut order: Vec<usize> = (0..self.learners.len()).collect();
        order.sort_by(|&a, &b| {
            self.learners[a]
                .error
                .partial_cmp(&self.learners[b].error)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        order.truncate(self.params.num_classifiers);
        self.selected = order;
    }

    /// Seed box plus jitters that keep at least `sampler_overlap` IoU.
    ///
    /// A pure x-shift of `d` on a box of width `w` has IoU `(w - d) / (w + d)`,
    /// so the largest admissible shift per axis is `w (1 - o) / (1 + o)`. The
    /// jitters are scaled to that bound rather than fixed at one pixel, which
    /// would be rejected outright for tight overlaps on typical box sizes.
    fn positive_samples(&self, rect: &Rect<f32>, frame: &Frame) -> Vec<Rect<f32>> {
        let o = self.params.sampler_overlap;
        let dx = 0.9 * rect.width() * (1.0 - o) / (1.0 + o);
        let dy = 0.9 * rect.height() * (1.0 - o) / (1.0 + o);
        let mut out = vec![*rect];
        let jitter = [
            (dx, 0.0),
            (-dx, 0.0),
            (0.0, dy),
            (0.0, -dy),
            (0.5 * dx, 0.5 * dy),
            (-0.5 * dx, -0.5 * dy),
        ];
        for (jx, jy) in jitter {
            let candidate =
                Rect::new(rect.x() + jx, rect.y() + jy, rect.width(), rect.height());
            if candidate.iou(rect) >= o {
                out.push(candidate);
            }
        }
        out.retain(|r| {
            r.x() >= 0.0
                && r.y() >= 0.0
                && r.x() + r.width() <= frame.width() as f32
                && r.y() + r.height() <= frame.height() as f32
        });
        out
    }

    /// Ring of background patches around the box, clipped to the frame.
    fn negative_samples(&self, rect: &Rect<f32>, frame: &Frame) -> Vec<Rect<f32>> {
        let mut out = Vec::new();
        let (cx, cy) = rect.center();
        let rx = rect.width();
        let ry = rect.height();
        let directions = [
            (1.0f32, 0.0f32),
            (-1.0, 0.0),
            (0.0, 1.0),
            (0.0, -1.0),
            (0.7, 0.7),
            (-0.7, 0.7),
            (0.7, -0.7),
            (-0.7, -0.7),
        ];
        for (dx, dy) in directions {
            let x = cx + dx * rx - rect.width() / 2.0;
            let y = cy + dy * ry - rect.height() / 2.0;
            let candidate = Rect::new(x, y, rect.width(), rect.height());
            let clipped = candidate.clip_to(frame.size());
            if clipped.width() >= rect.width() * 0.5
                && clipped.height() >= rect.height() * 0.5
            {
                out.push(clipped);
            }
        }
        out
    }
}

impl Tracker for BoostingTracker {
    fn init(&mut self, frame: &Frame, rect: Rect<f32>) -> Result<(), TrackError> {
        check_init_box(frame, &rect)?;

        // Re-init fully resets the appearance model.
        for learner in &mut self.learners {
            *learner = WeakLearner::new();
        }
        self.selected.clear();

        let integral = IntegralImage::new(frame);
        let positives = self.positive_samples(&rect, frame);
        let negatives = self.negative_samples(&rect, frame);
        for round in 0..self.params.iteration_init {
            let pos = positives[round % positives.len()];
            self.train_sample(&integral, &pos, true);
            if !negatives.is_empty() {
                let neg = negatives[round % negatives.len()];
                self.train_sample(&integral, &neg, false);
            }
        }
        self.select_learners();

        self.state = Some(BoostingState {
            rect,
            frame_width: frame.width(),
            frame_height: frame.height(),
        });
        Ok(())
    }

    fn update(&mut self, frame: &Frame) -> Result<TrackUpdate, TrackError> {
        let state = self.state.as_ref().ok_or(TrackError::NotInitialized)?;
        check_frame_dims(frame, state.frame_width, state.frame_height)?;

        let prev = state.rect;
        let integral = IntegralImage::new(frame);

        // Search window offsets inside the previous box scaled by the
        // sampler search factor. The zero offset is evaluated first so a
        // stationary object keeps its box unless a rival wins strictly.
        let radius_x = (((self.params.sampler_search_factor - 1.0)
            * prev.width()
            * 0.5)
            .ceil() as isize)
            .max(3);
        let radius_y = (((self.params.sampler_search_factor - 1.0)
            * prev.height()
            * 0.5)
            .ceil() as isize)
            .max(3);
        let step = ((prev.width().min(prev.height()) * 0.05) as isize).max(1);

        let mut best_rect = prev;
        let mut best_conf = self.evaluate(&integral, &prev);
        let mut candidates = 1usize;
        let mut dy = -radius_y;
        while dy <= radius_y {
            let mut dx = -radius_x;
            while dx <= radius_x {
                if dx != 0 || dy != 0 {
                    let candidate = Rect::new(
                        prev.x() + dx as f32,
                        prev.y() + dy as f32,
                        prev.width(),
                        prev.height(),
                    );
                    let clipped = candidate.clip_to(frame.size());
                    if clipped.width() >= prev.width() * 0.5
                        && clipped.height() >= prev.height() * 0.5
                    {
                        let conf = self.evaluate(&integral, &candidate);
                        candidates += 1;
                        if conf > best_conf {
                            best_conf = conf;
                            best_rect = candidate;
                        }
                    }
                }
                dx += step;
            }
            dy += step;
        }
        trace!(
            "boosting: scanned {candidates} windows, best confidence {best_conf:.3}"
        );

        let status = if best_conf > 0.0 {
            TrackStatus::Tracked
        } else {
            debug!("boosting: lost object (confidence {best_conf:.3})");
            TrackStatus::Lost
        };

        if status == TrackStatus::Tracked {
            // Online refinement at the new location.
            let positives = self.positive_samples(&best_rect, frame);
            let negatives = self.negative_samples(&best_rect, frame);
            for pos in positives {
                self.train_sample(&integral, &pos, true);
            }
            for neg in negatives {
                self.train_sample(&integral, &neg, false);
            }
            self.select_learners();
        }

        // State advances regardless of status; the provisional box is the
        // best estimate either way.
        if let Some(state) = self.state.as_mut() {
            state.rect = best_rect;
        }
        Ok(TrackUpdate {
            rect: best_rect,
            status,
        })
    }
}
