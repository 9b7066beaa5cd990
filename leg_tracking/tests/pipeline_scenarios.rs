//! End-to-end scenarios: landmarks in, limb control records out.

use std::time::Duration;

use approx::assert_abs_diff_eq;
use leg_tracking::geometry::DISTANCE_SCALE;
use leg_tracking::recording::parse_recording;
use leg_tracking::source::ScriptedSource;
use leg_tracking::{
    FrameOutcome, Joint, Landmark, PoseLandmarks, ReplayDetector, Tracker, TrackerConfig,
};

fn ms(v: u64) -> Duration {
    Duration::from_millis(v)
}

fn pose(left: (f32, f32, f32), right: (f32, f32, f32)) -> PoseLandmarks {
    let mut p = PoseLandmarks::empty();
    p.set(Joint::LeftAnkle, Landmark::new(left.0, left.1, left.2));
    p.set(Joint::RightAnkle, Landmark::new(right.0, right.1, right.2));
    p
}

/// Calibrate on a pose whose ankles average to (0.5, 0.5).
fn calibrated(source: ScriptedSource) -> Tracker<ScriptedSource> {
    let mut t = Tracker::new(source, TrackerConfig::default()).unwrap();
    let ticket = t.request_calibration(ms(0));
    t.process(&(), ms(1000), ms(1000));
    let out = ticket.try_outcome().expect("resolved").expect("completed");
    assert_eq!(out.contributors, 2);
    t
}

#[test]
fn ankle_right_of_center_selects_first_slice() {
    let mut src = ScriptedSource::new(vec![Ok(Some(pose((0.4, 0.5, 0.9), (0.6, 0.5, 0.9))))]);
    src.push(Ok(Some(pose((0.58, 0.5, 0.9), (0.5, 0.5, 0.9)))));
    let mut t = calibrated(src);
    assert_abs_diff_eq!(t.offset().center_x, 0.5, epsilon = 1e-6);

    assert_eq!(t.process(&(), ms(1033), ms(1033)), FrameOutcome::Tracked);
    let left = t.legs().left;
    assert_abs_diff_eq!(left.x, 0.08, epsilon = 1e-5);
    assert_abs_diff_eq!(left.y, 0.0, epsilon = 1e-6);
    assert_eq!(left.slice, 0);
    assert_abs_diff_eq!(left.distance, 0.08 * DISTANCE_SCALE, epsilon = 1e-2);
    assert!(left.is_active);
}

#[test]
fn five_percent_reach_clears_default_deadzone() {
    let mut src = ScriptedSource::new(vec![Ok(Some(pose((0.4, 0.5, 0.9), (0.6, 0.5, 0.9))))]);
    src.push(Ok(Some(pose((0.55, 0.5, 0.9), (0.5, 0.5, 0.9)))));
    let mut t = calibrated(src);
    assert_eq!(t.config().slice_count, 8);
    assert_eq!(t.config().activation_deadzone, 40.0);

    t.process(&(), ms(1033), ms(1033));
    let left = t.legs().left;
    assert_abs_diff_eq!(left.x, 0.05, epsilon = 1e-5);
    assert_abs_diff_eq!(left.y, 0.0, epsilon = 1e-6);
    assert_eq!(left.slice, 0);
    assert_abs_diff_eq!(left.distance, 50.0, epsilon = 1e-2);
    // Ten per-mille clear of the gate, so rounding cannot decide it.
    assert!(left.is_active);
}

#[test]
fn small_displacement_stays_inside_deadzone() {
    let mut src = ScriptedSource::new(vec![Ok(Some(pose((0.4, 0.5, 0.9), (0.6, 0.5, 0.9))))]);
    src.push(Ok(Some(pose((0.53, 0.5, 0.9), (0.5, 0.47, 0.9)))));
    let mut t = calibrated(src);
    t.process(&(), ms(1033), ms(1033));
    let legs = *t.legs();
    assert_eq!(legs.left.slice, 0);
    assert!(!legs.left.is_active);
    assert!(!legs.right.is_active);
}

#[test]
fn standing_at_center_reads_zero() {
    let mut src = ScriptedSource::new(vec![Ok(Some(pose((0.4, 0.5, 0.9), (0.6, 0.5, 0.9))))]);
    src.push(Ok(Some(pose((0.5, 0.5, 0.9), (0.5, 0.5, 0.9)))));
    let mut t = calibrated(src);
    t.process(&(), ms(1033), ms(1033));
    let left = t.legs().left;
    assert_abs_diff_eq!(left.x, 0.0, epsilon = 1e-6);
    assert_abs_diff_eq!(left.y, 0.0, epsilon = 1e-6);
    assert_abs_diff_eq!(left.distance, 0.0, epsilon = 1e-3);
    assert!(!left.is_active);
}

#[test]
fn each_direction_maps_to_its_own_slice() {
    let mut src = ScriptedSource::new(vec![Ok(Some(pose((0.4, 0.5, 0.9), (0.6, 0.5, 0.9))))]);
    // Angles measured with y growing downward: 90° is straight below.
    let cases = [
        ((0.70, 0.55), 0),
        ((0.55, 0.70), 1),
        ((0.45, 0.70), 2),
        ((0.30, 0.55), 3),
        ((0.30, 0.45), 4),
        ((0.45, 0.30), 5),
        ((0.55, 0.30), 6),
        ((0.70, 0.45), 7),
    ];
    for ((x, y), _) in cases {
        src.push(Ok(Some(pose((x, y, 0.9), (0.5, 0.5, 0.0)))));
    }
    let mut t = calibrated(src);
    for (i, (_, expected)) in cases.iter().enumerate() {
        let at = 1100 + i as u64 * 33;
        t.process(&(), ms(at), ms(at));
        assert_eq!(t.legs().left.slice, *expected, "case {}", i);
        assert!(t.legs().left.is_active);
    }
}

#[test]
fn calibration_with_nobody_in_view_uses_frame_center() {
    let mut t = Tracker::new(ScriptedSource::repeating(None), TrackerConfig::default()).unwrap();
    let ticket = t.request_calibration(ms(0));
    t.process(&(), ms(500), ms(500));
    t.process(&(), ms(1000), ms(1000));
    let out = ticket.try_outcome().unwrap().unwrap();
    assert!(out.fell_back);
    assert_eq!((t.offset().center_x, t.offset().center_y), (0.5, 0.5));
    assert!(t.is_calibrated());
}

#[test]
fn replayed_session_drives_tracker() {
    let session = r#"
{"video_ms":0.0,"pose":null}
{"video_ms":33.0,"pose":null,"error":"timeout"}
{"video_ms":33.0,"pose":null}
{"video_ms":66.0,"pose":null}
"#;
    let frames = parse_recording(session.as_bytes()).unwrap();
    let mut t = Tracker::new(ReplayDetector, TrackerConfig::default()).unwrap();
    let outcomes: Vec<FrameOutcome> = frames
        .iter()
        .enumerate()
        .map(|(i, f)| t.process(f, f.video_time(), ms(i as u64 * 20)))
        .collect();
    assert_eq!(outcomes[0], FrameOutcome::NoPose);
    assert!(matches!(outcomes[1], FrameOutcome::Skipped(_)));
    assert_eq!(outcomes[2], FrameOutcome::Stale);
    assert_eq!(outcomes[3], FrameOutcome::NoPose);
    assert_eq!(t.frames_processed(), 3);
}
