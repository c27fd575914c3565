//! Multi-object aggregator: owns a set of trackers and steps them against a
//! shared frame, one result per member in registration order.

use log::debug;
use rayon::prelude::*;

use crate::error::TrackError;
use crate::frame::Frame;
use crate::rect::Rect;
use crate::tracker::{TrackUpdate, Tracker};

/* ------------------------------------------------------------------------------
 * BatchUpdate
 * ------------------------------------------------------------------------------ */

/// One aggregator step: exactly one entry per registered tracker, in
/// registration order. Lost members still contribute their provisional box;
/// the per-member status says which boxes to trust.
#[derive(Debug, Clone)]
pub struct BatchUpdate {
    pub updates: Vec<TrackUpdate>,
}

impl BatchUpdate {
    /// The aggregate success flag: true iff every member tracked.
    pub fn all_tracked(&self) -> bool {
        self.updates.iter().all(|u| u.is_tracked())
    }

    /// The ordered box sequence, one per member.
    pub fn rects(&self) -> Vec<Rect<f32>> {
        self.updates.iter().map(|u| u.rect).collect()
    }

    pub fn len(&self) -> usize {
        self.updates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.updates.is_empty()
    }
}

/* ------------------------------------------------------------------------------
 * MultiTracker
 * ------------------------------------------------------------------------------ */

/// Owns its member trackers: `add` takes each tracker by value and the
/// aggregator drops them all when it is dropped.
#[derive(Default)]
pub struct MultiTracker {
    trackers: Vec<Box<dyn Tracker>>,
    rects: Vec<Rect<f32>>,
}

impl MultiTracker {
    pub fn new() -> Self {
        Self {
            trackers: Vec::new(),
            rects: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.trackers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trackers.is_empty()
    }

    /// Latest box per member, updated after every `update` call (provisional
    /// boxes of lost members included). When `update` errors, the boxes of
    /// members that did produce a result still advance; the failing member's
    /// box stays where it was.
    pub fn rects(&self) -> &[Rect<f32>] {
        &self.rects
    }

    /// Initialize `tracker` on `frame`/`rect` and register it at the next
    /// index. On error nothing is registered and the tracker is dropped.
    pub fn add(
        &mut self,
        mut tracker: Box<dyn Tracker>,
        frame: &Frame,
        rect: Rect<f32>,
    ) -> Result<(), TrackError> {
        tracker.init(frame, rect)?;
        self.trackers.push(tracker);
        self.rects.push(rect);
        debug!("multi tracker: {} members registered", self.trackers.len());
        Ok(())
    }

    /// Step every member against the shared read-only frame. Members run in
    /// parallel and the results are joined back in registration order. An
    /// empty aggregator yields an empty batch.
    pub fn update(&mut self, frame: &Frame) -> Result<BatchUpdate, TrackError> {
        let results: Vec<Result<TrackUpdate, TrackError>> = self
            .trackers
            .par_iter_mut()
            .map(|tracker| tracker.update(frame))
            .collect();

        // Members that produced a result have already advanced their internal
        // state, so their cached boxes advance with them even when a sibling
        // errors out.
        let mut updates = Vec::with_capacity(results.len());
        let mut first_error = None;
        for (rect, result) in self.rects.iter_mut().zip(results) {
            match result {
                Ok(update) => {
                    *rect = update.rect;
                    updates.push(update);
                }
                Err(err) => {
                    if first_error.is_none() {
                        first_error = Some(err);
                    }
                }
            }
        }
        match first_error {
            Some(err) => Err(err),
            None => Ok(BatchUpdate { updates }),
        }
    }
}
