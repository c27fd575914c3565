pub mod features;
mod boosting_tracker;

pub use boosting_tracker::{BoostingParams, BoostingTracker};
