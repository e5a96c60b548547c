//! Keyframe Track Tests
//!
//! Tests for:
//! - KeyframeTrack Step/Linear/Next segment evaluation
//! - Holding the first value before and the last value after the track
//! - Left/right interval ownership of a query exactly on a keyframe
//! - KeyframeCursor agreement with the plain binary search
//! - Trailing-duplicate pruning
//! - Option<T> "original value" sentinel blending

use glam::Vec3;

use timeline4d::animation::{
    ColorValue, EntryTimeBehavior, Interpolatable, Interpolation, Keyframe, KeyframeCursor,
    KeyframeTrack,
};

const EPSILON: f32 = 1e-5;

const RIGHT: EntryTimeBehavior = EntryTimeBehavior::UseRightInterval;
const LEFT: EntryTimeBehavior = EntryTimeBehavior::UseLeftInterval;

fn approx(a: f32, b: f32) -> bool {
    (a - b).abs() < EPSILON
}

fn ramp() -> KeyframeTrack<f32> {
    let mut track = KeyframeTrack::new();
    track.set(0.0, 0.0, Interpolation::Linear);
    track.set(10.0, 1.0, Interpolation::Step);
    track
}

// ============================================================================
// Segment evaluation
// ============================================================================

#[test]
fn track_linear_midpoint() {
    let val = ramp().evaluate(5.0, RIGHT).unwrap();
    assert!(approx(val, 0.5), "Expected 0.5, got {val}");
}

#[test]
fn track_step_holds_until_next_keyframe() {
    let mut track = KeyframeTrack::new();
    track.set(0.0, 2.0_f32, Interpolation::Step);
    track.set(10.0, 8.0, Interpolation::Step);

    assert_eq!(track.evaluate(0.0, RIGHT), Some(2.0));
    assert_eq!(track.evaluate(9.999, RIGHT), Some(2.0));
    assert_eq!(track.evaluate(10.0, RIGHT), Some(8.0));
}

#[test]
fn track_next_uses_following_value() {
    let mut track = KeyframeTrack::new();
    track.set(0.0, 1.0_f32, Interpolation::Next);
    track.set(5.0, 3.0, Interpolation::Step);
    track.set(10.0, 7.0, Interpolation::Step);

    assert_eq!(track.evaluate(2.5, RIGHT), Some(3.0));
    assert_eq!(track.evaluate(7.5, RIGHT), Some(3.0));
}

#[test]
fn track_empty_evaluates_to_none() {
    let track = KeyframeTrack::<f32>::new();
    assert!(track.is_empty());
    assert_eq!(track.evaluate(0.0, RIGHT), None);
    assert_eq!(track.time_range(), None);
}

// ============================================================================
// Boundaries
// ============================================================================

#[test]
fn track_holds_first_value_before_start() {
    let val = ramp().evaluate(-100.0, RIGHT).unwrap();
    assert!(approx(val, 0.0), "Expected 0.0, got {val}");
}

#[test]
fn track_holds_last_value_after_end() {
    for t in [10.0, 10.5, 1e9] {
        let val = ramp().evaluate(t, RIGHT).unwrap();
        assert!(approx(val, 1.0), "Expected 1.0 at {t}, got {val}");
    }
}

#[test]
fn track_single_keyframe_is_constant() {
    let mut track = KeyframeTrack::new();
    track.set(3.0, 0.25_f32, Interpolation::Linear);
    assert_eq!(track.evaluate(-1.0, RIGHT), Some(0.25));
    assert_eq!(track.evaluate(3.0, LEFT), Some(0.25));
    assert_eq!(track.evaluate(99.0, RIGHT), Some(0.25));
}

#[test]
fn track_entry_time_behavior_on_exact_keyframe() {
    let mut track = KeyframeTrack::new();
    track.set(0.0, 0.0_f32, Interpolation::Step);
    track.set(5.0, 1.0, Interpolation::Step);
    track.set(10.0, 2.0, Interpolation::Step);

    // Right interval: the keyframe applies from its own instant.
    assert_eq!(track.evaluate(5.0, RIGHT), Some(1.0));
    // Left interval: the previous segment still owns that instant.
    assert_eq!(track.evaluate(5.0, LEFT), Some(0.0));
    // The last keyframe always wins at its own time.
    assert_eq!(track.evaluate(10.0, LEFT), Some(2.0));
}

// ============================================================================
// Construction
// ============================================================================

#[test]
fn track_set_keeps_order_and_replaces_same_time() {
    let mut track = KeyframeTrack::new();
    track.set(5.0, 1.0_f32, Interpolation::Step);
    track.set(1.0, 0.0, Interpolation::Step);
    track.set(5.0, 2.0, Interpolation::Linear);

    let times: Vec<f64> = track.keyframes().iter().map(|k| k.time).collect();
    assert_eq!(times, vec![1.0, 5.0]);
    assert_eq!(track.keyframes()[1].value, 2.0);
    assert_eq!(track.keyframes()[1].interpolation, Interpolation::Linear);
}

#[test]
fn track_from_unordered_keyframes() {
    let track = KeyframeTrack::from_keyframes([
        Keyframe { time: 2.0, value: 20.0_f32, interpolation: Interpolation::Step },
        Keyframe { time: 0.0, value: 0.0, interpolation: Interpolation::Linear },
    ]);
    assert_eq!(track.time_range(), Some((0.0, 2.0)));
    let val = track.evaluate(1.0, RIGHT).unwrap();
    assert!(approx(val, 10.0), "Expected 10.0, got {val}");
}

#[test]
fn track_prune_keeps_time_range() {
    let mut track = KeyframeTrack::new();
    track.set(0.0, 0.0_f32, Interpolation::Step);
    track.set(1.0, 1.0, Interpolation::Step);
    track.set(2.0, 1.0, Interpolation::Step);
    track.set(3.0, 1.0, Interpolation::Step);

    track.prune();

    assert_eq!(track.len(), 3);
    assert_eq!(track.time_range(), Some((0.0, 3.0)));
    assert_eq!(track.evaluate(2.5, RIGHT), Some(1.0));
}

// ============================================================================
// Cursor
// ============================================================================

#[test]
fn cursor_matches_binary_search_forward_and_backward() {
    let mut track = KeyframeTrack::new();
    for i in 0..20 {
        let interp = if i % 2 == 0 { Interpolation::Linear } else { Interpolation::Step };
        track.set(f64::from(i), i as f32 * 3.0, interp);
    }

    let mut cursor = KeyframeCursor::default();
    let forward: Vec<f64> = (0..200).map(|i| f64::from(i) * 0.1 - 1.0).collect();
    for &t in forward.iter().chain(forward.iter().rev()) {
        let plain = track.evaluate(t, RIGHT).unwrap();
        let cursored = track.evaluate_with_cursor(t, RIGHT, &mut cursor).unwrap();
        assert!(approx(plain, cursored), "Mismatch at {t}: {plain} vs {cursored}");
    }
}

#[test]
fn cursor_survives_large_jumps() {
    let mut track = KeyframeTrack::new();
    for i in 0..100 {
        track.set(f64::from(i), i as f32, Interpolation::Step);
    }
    let mut cursor = KeyframeCursor::default();
    assert_eq!(track.evaluate_with_cursor(90.5, LEFT, &mut cursor), Some(90.0));
    assert_eq!(track.evaluate_with_cursor(3.0, LEFT, &mut cursor), Some(2.0));
    assert_eq!(track.evaluate_with_cursor(3.0, RIGHT, &mut cursor), Some(3.0));
}

// ============================================================================
// Values
// ============================================================================

#[test]
fn color_blending_with_original_is_a_step() {
    let red: ColorValue = Some(Vec3::X);
    assert_eq!(ColorValue::interpolate_linear(None, red, 0.9), None);
    assert_eq!(ColorValue::interpolate_linear(red, None, 0.9), red);

    let mid = ColorValue::interpolate_linear(red, Some(Vec3::Y), 0.5).unwrap();
    assert!(mid.abs_diff_eq(Vec3::new(0.5, 0.5, 0.0), EPSILON));
}
