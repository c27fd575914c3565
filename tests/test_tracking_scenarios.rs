use boxtrack_rs::{
    BoostingParams, BoostingTracker, Frame, MedianFlowParams,
    MedianFlowTracker, MultiTracker, Rect, Size, TrackError, TrackStatus,
    Tracker,
};
use nearly_eq::assert_nearly_eq;

/* ----------------------------------------------------------------------------
 * Synthetic frames
 * ---------------------------------------------------------------------------- */

/// A textured square over a mildly textured background, so both the
/// classifier and the optical-flow grid have structure to work with.
fn frame_with_square(
    width: usize,
    height: usize,
    rect: (usize, usize, usize, usize),
) -> Frame {
    Frame::from_fn(width, height, |x, y| {
        let inside = x >= rect.0
            && x < rect.0 + rect.2
            && y >= rect.1
            && y < rect.1 + rect.3;
        if inside {
            let lx = x - rect.0;
            let ly = y - rect.1;
            (90 + ((lx * 73 + ly * 41 + lx * ly) % 140)) as u8
        } else {
            (10 + (x * 3 + y * 5) % 25) as u8
        }
    })
}

fn fast_median_flow() -> MedianFlowTracker {
    MedianFlowTracker::new(MedianFlowParams {
        points_in_grid: 6,
        win_size: Size::new(7, 7),
        max_level: 2,
        win_size_ncc: Size::new(11, 11),
        ..Default::default()
    })
    .unwrap()
}

/* ----------------------------------------------------------------------------
 * Single-tracker scenarios
 * ---------------------------------------------------------------------------- */

#[test]
fn test_boosting_init_update_identity() {
    // The concrete reference scenario: parameters (100, 0.99, 1.8, 50, 250),
    // seed box (10, 10, 50, 50), update on the identical frame.
    let params = BoostingParams {
        num_classifiers: 100,
        sampler_overlap: 0.99,
        sampler_search_factor: 1.8,
        iteration_init: 50,
        feature_set_num_features: 250,
    };
    let mut tracker = BoostingTracker::new(params).unwrap();
    let frame = frame_with_square(128, 128, (10, 10, 50, 50));
    tracker.init(&frame, Rect::new(10.0, 10.0, 50.0, 50.0)).unwrap();

    let update = tracker.update(&frame).unwrap();
    assert_eq!(update.status, TrackStatus::Tracked);
    assert_nearly_eq!(update.rect.x(), 10.0, 2.0);
    assert_nearly_eq!(update.rect.y(), 10.0, 2.0);
    assert_nearly_eq!(update.rect.width(), 50.0, 2.0);
    assert_nearly_eq!(update.rect.height(), 50.0, 2.0);
}

#[test]
fn test_median_flow_init_update_identity() {
    let mut tracker = fast_median_flow();
    let frame = frame_with_square(128, 128, (10, 10, 50, 50));
    tracker.init(&frame, Rect::new(10.0, 10.0, 50.0, 50.0)).unwrap();

    let update = tracker.update(&frame).unwrap();
    assert_eq!(update.status, TrackStatus::Tracked);
    assert_nearly_eq!(update.rect.x(), 10.0, 1.0);
    assert_nearly_eq!(update.rect.y(), 10.0, 1.0);
    assert_nearly_eq!(update.rect.width(), 50.0, 1.5);
    assert_nearly_eq!(update.rect.height(), 50.0, 1.5);
}

#[test]
fn test_median_flow_follows_motion_over_frames() {
    let mut tracker = fast_median_flow();
    let first = frame_with_square(128, 128, (20, 20, 32, 32));
    tracker.init(&first, Rect::new(20.0, 20.0, 32.0, 32.0)).unwrap();

    // Three frames of steady rightward-and-down motion.
    let mut expected = (20.0f32, 20.0f32);
    for step in 1..=3usize {
        let ox = 20 + step * 3;
        let oy = 20 + step * 2;
        expected = (ox as f32, oy as f32);
        let frame = frame_with_square(128, 128, (ox, oy, 32, 32));
        let update = tracker.update(&frame).unwrap();
        assert_eq!(update.status, TrackStatus::Tracked, "step {step}");
    }

    let frame = frame_with_square(
        128,
        128,
        (expected.0 as usize, expected.1 as usize, 32, 32),
    );
    let update = tracker.update(&frame).unwrap();
    assert_nearly_eq!(update.rect.x(), expected.0, 2.0);
    assert_nearly_eq!(update.rect.y(), expected.1, 2.0);
}

#[test]
fn test_params_load_from_json_config() {
    let raw = r#"{
        "points_in_grid": 8,
        "win_size": { "width": 7, "height": 7 },
        "max_level": 3,
        "term_criteria": { "max_count": 20, "epsilon": 0.3 },
        "win_size_ncc": { "width": 15, "height": 15 },
        "max_median_length_of_displacement_difference": 10.0
    }"#;
    let params: MedianFlowParams = serde_json::from_str(raw).unwrap();
    assert_eq!(params.points_in_grid, 8);
    assert_eq!(params.win_size, Size::new(7, 7));
    assert!(MedianFlowTracker::new(params).is_ok());

    let raw = r#"{
        "num_classifiers": 100,
        "sampler_overlap": 0.99,
        "sampler_search_factor": 1.8,
        "iteration_init": 50,
        "feature_set_num_features": 1000
    }"#;
    let params: BoostingParams = serde_json::from_str(raw).unwrap();
    assert_eq!(params, BoostingParams::default());
}

#[test]
fn test_zero_classifiers_is_a_construction_error() {
    let params = BoostingParams {
        num_classifiers: 0,
        ..Default::default()
    };
    match BoostingTracker::new(params) {
        Err(TrackError::InvalidParams { name, .. }) => {
            assert_eq!(name, "num_classifiers")
        }
        other => panic!("expected InvalidParams, got {other:?}"),
    }
}

#[test]
fn test_dropping_trackers_is_release() {
    // Release is Drop: constructing and dropping trackers (and an aggregator
    // holding them) must not require any explicit release call.
    let frame = frame_with_square(96, 96, (20, 20, 24, 24));
    for _ in 0..16 {
        let mut tracker = fast_median_flow();
        tracker.init(&frame, Rect::new(20.0, 20.0, 24.0, 24.0)).unwrap();
        let _ = tracker.update(&frame).unwrap();

        let mut multi = MultiTracker::new();
        multi
            .add(
                Box::new(fast_median_flow()),
                &frame,
                Rect::new(20.0, 20.0, 24.0, 24.0),
            )
            .unwrap();
        let _ = multi.update(&frame).unwrap();
    }
}

/* ----------------------------------------------------------------------------
 * MultiTracker scenarios
 * ---------------------------------------------------------------------------- */

#[test]
fn test_empty_multi_tracker_update() {
    let mut multi = MultiTracker::new();
    let frame = frame_with_square(96, 96, (20, 20, 24, 24));
    let batch = multi.update(&frame).unwrap();
    assert!(batch.all_tracked());
    assert!(batch.rects().is_empty());
}

#[test]
fn test_multi_tracker_returns_n_boxes_in_order() {
    let frame = Frame::from_fn(160, 96, |x, y| {
        let squares = [(10usize, 10usize), (60, 40), (110, 20)];
        for (ox, oy) in squares {
            if x >= ox && x < ox + 20 && y >= oy && y < oy + 20 {
                return (80 + ((x - ox) * 67 + (y - oy) * 29 + x * y) % 150) as u8;
            }
        }
        12
    });

    let seeds = [
        Rect::new(10.0, 10.0, 20.0, 20.0),
        Rect::new(60.0, 40.0, 20.0, 20.0),
        Rect::new(110.0, 20.0, 20.0, 20.0),
    ];
    let mut multi = MultiTracker::new();
    for seed in seeds {
        multi
            .add(Box::new(fast_median_flow()), &frame, seed)
            .unwrap();
    }
    assert_eq!(multi.len(), 3);

    for _ in 0..3 {
        let batch = multi.update(&frame).unwrap();
        assert_eq!(batch.len(), 3);
        for (update, seed) in batch.updates.iter().zip(&seeds) {
            assert_nearly_eq!(update.rect.x(), seed.x(), 2.0);
            assert_nearly_eq!(update.rect.y(), seed.y(), 2.0);
        }
    }
}

#[test]
fn test_multi_tracker_mixed_variants() {
    let frame = frame_with_square(128, 128, (30, 30, 30, 30));
    let seed = Rect::new(30.0, 30.0, 30.0, 30.0);

    let boosting = BoostingTracker::new(BoostingParams {
        iteration_init: 15,
        feature_set_num_features: 150,
        num_classifiers: 30,
        ..Default::default()
    })
    .unwrap();

    let mut multi = MultiTracker::new();
    multi.add(Box::new(boosting), &frame, seed).unwrap();
    multi
        .add(Box::new(fast_median_flow()), &frame, seed)
        .unwrap();

    let batch = multi.update(&frame).unwrap();
    assert!(batch.all_tracked());
    for rect in batch.rects() {
        assert_nearly_eq!(rect.x(), 30.0, 2.0);
        assert_nearly_eq!(rect.y(), 30.0, 2.0);
    }
}
