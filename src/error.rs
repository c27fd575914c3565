use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum TrackError {
    #[error("invalid parameter `{name}`: {reason}")]
    InvalidParams { name: &'static str, reason: String },

    #[error("degenerate bounding box ({width} x {height})")]
    DegenerateBox { width: f32, height: f32 },

    #[error(
        "bounding box ({x}, {y}, {width}, {height}) lies outside a {frame_width} x {frame_height} frame"
    )]
    BoxOutOfFrame {
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        frame_width: usize,
        frame_height: usize,
    },

    #[error("frame buffer length {len} does not match {width} x {height}")]
    FrameSizeMismatch {
        len: usize,
        width: usize,
        height: usize,
    },

    #[error(
        "frame is {got_width} x {got_height}, tracker was initialized on {want_width} x {want_height}"
    )]
    FrameDimensionChanged {
        got_width: usize,
        got_height: usize,
        want_width: usize,
        want_height: usize,
    },

    #[error("update called before init")]
    NotInitialized,
}
