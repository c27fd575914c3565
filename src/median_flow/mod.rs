pub mod pyramid;
mod median_flow_tracker;

pub use median_flow_tracker::{MedianFlowParams, MedianFlowTracker};
