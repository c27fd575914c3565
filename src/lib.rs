//! # boxtrack-rs: bounding-box object tracking
//!
//! Single-object bounding-box trackers plus a multi-object aggregator:
//!
//! - [`BoostingTracker`]: online-boosting appearance model over Haar-like
//!   rectangle features.
//! - [`MedianFlowTracker`]: forward-backward pyramidal Lucas-Kanade with
//!   median-consensus motion estimation.
//! - [`MultiTracker`]: owns several trackers and steps them against one
//!   shared frame per update, reporting one box and status per member.
//!
//! ## Example
//!
//! ```rust,ignore
//! use boxtrack_rs::{
//!     BoostingParams, BoostingTracker, Frame, MultiTracker, Rect, Tracker,
//! };
//!
//! let frame = Frame::from_vec(640, 480, pixels)?;
//! let mut tracker = BoostingTracker::new(BoostingParams::default())?;
//! tracker.init(&frame, Rect::new(10.0, 10.0, 50.0, 50.0))?;
//! let update = tracker.update(&next_frame)?;
//! if update.is_tracked() {
//!     println!("object at {:?}", update.rect.to_i32());
//! }
//! ```

pub mod boosting;
pub mod error;
pub mod frame;
pub mod median_flow;
pub mod multi_tracker;
pub mod rect;
pub mod term_criteria;
pub mod tracker;

pub use boosting::{BoostingParams, BoostingTracker};
pub use error::TrackError;
pub use frame::Frame;
pub use median_flow::{MedianFlowParams, MedianFlowTracker};
pub use multi_tracker::{BatchUpdate, MultiTracker};
pub use rect::{Rect, Size};
pub use term_criteria::TermCriteria;
pub use tracker::{TrackStatus, TrackUpdate, Tracker};
