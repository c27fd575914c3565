use crate::error::TrackError;
use crate::frame::Frame;
use crate::rect::Rect;

/* ------------------------------------------------------------------------------
 * Tracker trait
 * ------------------------------------------------------------------------------ */

/// Outcome of one update step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackStatus {
    /// The estimate is trusted.
    Tracked,
    /// The tracker lost the object; the reported box is its provisional best
    /// estimate and should not be trusted without re-initialization.
    Lost,
}

/// Result of [`Tracker::update`]: the estimated box plus its reliability.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackUpdate {
    pub rect: Rect<f32>,
    pub status: TrackStatus,
}

impl TrackUpdate {
    pub fn is_tracked(&self) -> bool {
        self.status == TrackStatus::Tracked
    }
}

/// A stateful single-object location estimator.
///
/// Lifecycle: `init` once on a seed frame/box, then `update` per frame.
/// Calling `init` again is allowed and fully resets the tracker state.
/// A lost object does not revert the tracker to uninitialized; only the
/// reported box's reliability changes.
pub trait Tracker: Send {
    /// Seed tracking state from one frame and one bounding box.
    ///
    /// Fails if the box is degenerate or extends outside the frame.
    fn init(&mut self, frame: &Frame, rect: Rect<f32>) -> Result<(), TrackError>;

    /// Estimate the object's location in `frame`.
    ///
    /// Errors signal contract misuse (update before init, frame dimensions
    /// changed since init); tracking loss is reported through
    /// [`TrackStatus::Lost`] with the provisional box attached.
    fn update(&mut self, frame: &Frame) -> Result<TrackUpdate, TrackError>;
}

/// Shared init-box validation: the seed box must be non-degenerate and lie
/// fully inside the frame.
pub(crate) fn check_init_box(
    frame: &Frame,
    rect: &Rect<f32>,
) -> Result<(), TrackError> {
    if rect.is_degenerate() {
        return Err(TrackError::DegenerateBox {
            width: rect.width(),
            height: rect.height(),
        });
    }
    let fw = frame.width() as f32;
    let fh = frame.height() as f32;
    if rect.x() < 0.0
        || rect.y() < 0.0
        || rect.x() + rect.width() > fw
        || rect.y() + rect.height() > fh
    {
        return Err(TrackError::BoxOutOfFrame {
            x: rect.x(),
            y: rect.y(),
            width: rect.width(),
            height: rect.height(),
            frame_width: frame.width(),
            frame_height: frame.height(),
        });
    }
    Ok(())
}

/// Shared update-frame validation against the init-time dimensions.
pub(crate) fn check_frame_dims(
    frame: &Frame,
    want_width: usize,
    want_height: usize,
) -> Result<(), TrackError> {
    if frame.width() != want_width || frame.height() != want_height {
        return Err(TrackError::FrameDimensionChanged {
            got_width: frame.width(),
            got_height: frame.height(),
            want_width,
            want_height,
        });
    }
    Ok(())
}
