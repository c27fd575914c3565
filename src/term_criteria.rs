use serde::{Deserialize, Serialize};

use crate::error::TrackError;

/* ------------------------------------------------------------------------------
 * TermCriteria struct
 * ------------------------------------------------------------------------------ */

/// Bound on an iterative estimation loop: a maximum iteration count, a
/// convergence epsilon, or both. At least one bound must be present.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TermCriteria {
    pub max_count: Option<usize>,
    pub epsilon: Option<f32>,
}

impl TermCriteria {
    pub fn count(max_count: usize) -> Self {
        Self {
            max_count: Some(max_count),
            epsilon: None,
        }
    }

    pub fn eps(epsilon: f32) -> Self {
        Self {
            max_count: None,
            epsilon: Some(epsilon),
        }
    }

    pub fn count_eps(max_count: usize, epsilon: f32) -> Self {
        Self {
            max_count: Some(max_count),
            epsilon: Some(epsilon),
        }
    }

    pub fn validate(&self) -> Result<(), TrackError> {
        if self.max_count.is_none() && self.epsilon.is_none() {
            return Err(TrackError::InvalidParams {
                name: "term_criteria",
                reason: "neither max_count nor epsilon is set".into(),
            });
        }
        if let Some(count) = self.max_count {
            if count == 0 {
                return Err(TrackError::InvalidParams {
                    name: "term_criteria",
                    reason: "max_count must be at least 1".into(),
                });
            }
        }
        if let Some(eps) = self.epsilon {
            if !(eps > 0.0) {
                return Err(TrackError::InvalidParams {
                    name: "term_criteria",
                    reason: format!("epsilon must be positive, got {eps}"),
                });
            }
        }
        Ok(())
    }

    /// True when the loop should stop after `iteration` steps with the most
    /// recent update of magnitude `delta`.
    pub fn is_met(&self, iteration: usize, delta: f32) -> bool {
        if let Some(count) = self.max_count {
            if iteration >= count {
                return true;
            }
        }
        if let Some(eps) = self.epsilon {
            if delta < eps {
                return true;
            }
        }
        false
    }
}

impl Default for TermCriteria {
    fn default() -> Self {
        Self::count_eps(20, 0.3)
    }
}
