//! Track a synthetic moving square with both tracker variants and print the
//! per-frame estimates next to the ground truth.
//!
//! Run with: `cargo run --example track_square [num_frames]`

use std::env;
use std::error::Error;

use boxtrack_rs::{
    BoostingParams, BoostingTracker, Frame, MedianFlowParams,
    MedianFlowTracker, MultiTracker, Rect, Size,
};

const WIDTH: usize = 320;
const HEIGHT: usize = 240;
const SQUARE: usize = 40;

fn frame_at(step: usize) -> (Frame, Rect<f32>) {
    let ox = 30 + 3 * step;
    let oy = 30 + 2 * step;
    let frame = Frame::from_fn(WIDTH, HEIGHT, |x, y| {
        if x >= ox && x < ox + SQUARE && y >= oy && y < oy + SQUARE {
            let lx = x - ox;
            let ly = y - oy;
            (90 + ((lx * 73 + ly * 41 + lx * ly) % 140)) as u8
        } else {
            (10 + (x * 3 + y * 5) % 25) as u8
        }
    });
    let truth = Rect::new(ox as f32, oy as f32, SQUARE as f32, SQUARE as f32);
    (frame, truth)
}

fn main() -> Result<(), Box<dyn Error>> {
    let num_frames = env::args()
        .nth(1)
        .and_then(|v| v.parse::<usize>().ok())
        .unwrap_or(20);

    let (first, seed) = frame_at(0);

    let boosting = BoostingTracker::new(BoostingParams {
        iteration_init: 25,
        feature_set_num_features: 250,
        num_classifiers: 50,
        ..Default::default()
    })?;
    let median_flow = MedianFlowTracker::new(MedianFlowParams {
        points_in_grid: 8,
        win_size: Size::new(7, 7),
        max_level: 3,
        win_size_ncc: Size::new(15, 15),
        ..Default::default()
    })?;

    let mut multi = MultiTracker::new();
    multi.add(Box::new(boosting), &first, seed)?;
    multi.add(Box::new(median_flow), &first, seed)?;

    println!("frame  truth              boosting            median_flow");
    for step in 1..num_frames {
        let (frame, truth) = frame_at(step);
        let batch = multi.update(&frame)?;

        let fmt = |u: &boxtrack_rs::TrackUpdate| {
            let (x, y, w, h) = u.rect.to_i32();
            let mark = if u.is_tracked() { ' ' } else { '!' };
            format!("({x:3},{y:3},{w:2},{h:2}){mark}")
        };
        println!(
            "{step:5}  ({:3},{:3},{SQUARE:2},{SQUARE:2})   {}  {}",
            truth.x() as i32,
            truth.y() as i32,
            fmt(&batch.updates[0]),
            fmt(&batch.updates[1]),
        );
    }

    Ok(())
}
