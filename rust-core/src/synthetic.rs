//! Synthetic pose frames for demos, replays and tests.
//!
//! Each builder places the joints an analyzer looks at so that the primary
//! angle is exactly the requested value, with every landmark at a healthy
//! visibility. Everything else sits at a neutral, non-degenerate position.

use crate::types::{Frame, Landmark, PoseLandmark, LANDMARK_COUNT};

/// Visibility given to every synthetic landmark.
pub const SYNTHETIC_VISIBILITY: f32 = 0.9;

/// Depth offset separating the left and right side of a profile view.
const SIDE_DEPTH: f32 = 0.05;

fn base_frame(timestamp_ms: u64) -> Frame {
    let mut landmarks = [Landmark::new(0.5, 0.5, 0.0, SYNTHETIC_VISIBILITY); LANDMARK_COUNT];
    // Spread the unused joints so no accidental geometry is degenerate.
    for (i, landmark) in landmarks.iter_mut().enumerate() {
        landmark.x = 0.1 + 0.02 * i as f32;
    }
    Frame::new(landmarks, landmarks, timestamp_ms)
}

fn set(frame: &mut Frame, joint: PoseLandmark, x: f32, y: f32, z: f32) {
    frame.landmarks[joint.index()] = Landmark::new(x, y, z, SYNTHETIC_VISIBILITY);
}

/// Push-up seen from the side with the given elbow angle and straight body.
pub fn pushup_frame(elbow_angle: f32, timestamp_ms: u64) -> Frame {
    pushup_frame_with(elbow_angle, 0.0, 0.0, timestamp_ms)
}

/// Push-up with the hips dropped by `hip_drop` below the body line (negative
/// raises them) and the right shoulder lowered by `shoulder_tilt`.
pub fn pushup_frame_with(elbow_angle: f32, hip_drop: f32, shoulder_tilt: f32, timestamp_ms: u64) -> Frame {
    use PoseLandmark::*;

    let mut frame = base_frame(timestamp_ms);
    let theta = elbow_angle.to_radians();
    let sides = [
        (LeftShoulder, LeftElbow, LeftWrist, LeftHip, LeftKnee, LeftAnkle, -SIDE_DEPTH, 0.0),
        (RightShoulder, RightElbow, RightWrist, RightHip, RightKnee, RightAnkle, SIDE_DEPTH, shoulder_tilt),
    ];

    for (shoulder, elbow, wrist, hip, knee, ankle, z, tilt) in sides {
        let (sx, sy) = (0.30, 0.40 + tilt);
        let (ex, ey) = (sx, sy + 0.15);
        set(&mut frame, shoulder, sx, sy, z);
        set(&mut frame, elbow, ex, ey, z);
        set(&mut frame, wrist, ex + 0.15 * theta.sin(), ey - 0.15 * theta.cos(), z);
        set(&mut frame, hip, 0.55, 0.42 + hip_drop, z);
        set(&mut frame, knee, 0.68, 0.43, z);
        set(&mut frame, ankle, 0.80, 0.44, z);
    }
    set(&mut frame, Nose, 0.22, 0.38, 0.0);
    frame
}

/// Pull-up seen from the front with the given elbow angle.
pub fn pullup_frame(elbow_angle: f32, chin_over_bar: bool, timestamp_ms: u64) -> Frame {
    pullup_frame_with(elbow_angle, chin_over_bar, 0.0, timestamp_ms)
}

/// Pull-up with the hips shifted sideways by `hip_sway`.
pub fn pullup_frame_with(elbow_angle: f32, chin_over_bar: bool, hip_sway: f32, timestamp_ms: u64) -> Frame {
    use PoseLandmark::*;

    let mut frame = base_frame(timestamp_ms);
    let theta = elbow_angle.to_radians();
    let sides = [
        (LeftShoulder, LeftElbow, LeftWrist, 0.40, -1.0),
        (RightShoulder, RightElbow, RightWrist, 0.60, 1.0),
    ];

    let mut wrist_y_sum = 0.0;
    for (shoulder, elbow, wrist, sx, outward) in sides {
        let sy = 0.40;
        let (ex, ey) = (sx, sy - 0.12);
        let (wx, wy) = (ex + outward * 0.12 * theta.sin(), ey + 0.12 * theta.cos());
        set(&mut frame, shoulder, sx, sy, 0.0);
        set(&mut frame, elbow, ex, ey, 0.0);
        set(&mut frame, wrist, wx, wy, 0.0);
        wrist_y_sum += wy;
    }

    let wrist_y = wrist_y_sum / 2.0;
    let nose_y = if chin_over_bar { wrist_y - 0.10 } else { wrist_y + 0.10 };
    set(&mut frame, Nose, 0.50, nose_y, 0.0);
    set(&mut frame, LeftHip, 0.45 + hip_sway, 0.80, 0.0);
    set(&mut frame, RightHip, 0.55 + hip_sway, 0.80, 0.0);
    set(&mut frame, LeftKnee, 0.45 + hip_sway, 0.95, 0.0);
    set(&mut frame, RightKnee, 0.55 + hip_sway, 0.95, 0.0);
    frame
}

/// Sit-up seen from the side with the given hip angle and arms crossed.
pub fn situp_frame(hip_angle: f32, timestamp_ms: u64) -> Frame {
    situp_frame_with(hip_angle, true, 0.0, timestamp_ms)
}

/// Sit-up pose with arm placement and shoulder tilt. `shoulder_tilt` raises
/// the right shoulder (image units); each elbow and the wrist resting on a
/// shoulder follow that shoulder.
pub fn situp_frame_with(hip_angle: f32, arms_crossed: bool, shoulder_tilt: f32, timestamp_ms: u64) -> Frame {
    use PoseLandmark::*;

    let mut frame = base_frame(timestamp_ms);
    let theta = hip_angle.to_radians();
    let (hx, hy) = (0.50, 0.70);
    let (sx, sy) = (hx + 0.25 * theta.cos(), hy - 0.25 * theta.sin());

    let sides = [
        (LeftShoulder, LeftElbow, LeftHip, LeftKnee, LeftAnkle, sy, -SIDE_DEPTH),
        (RightShoulder, RightElbow, RightHip, RightKnee, RightAnkle, sy - shoulder_tilt, SIDE_DEPTH),
    ];
    for (shoulder, elbow, hip, knee, ankle, shoulder_y, z) in sides {
        set(&mut frame, shoulder, sx, shoulder_y, z);
        set(&mut frame, elbow, sx + 0.05, shoulder_y + 0.05, z);
        set(&mut frame, hip, hx, hy, z);
        set(&mut frame, knee, hx + 0.20, hy, z);
        set(&mut frame, ankle, hx + 0.40, hy + 0.05, z);
    }

    // Each wrist rests on the opposite shoulder, or by the hip.
    let wrists = [
        (LeftWrist, sy - shoulder_tilt, -SIDE_DEPTH),
        (RightWrist, sy, SIDE_DEPTH),
    ];
    for (wrist, opposite_shoulder_y, z) in wrists {
        if arms_crossed {
            set(&mut frame, wrist, sx + 0.02, opposite_shoulder_y + 0.02, -z);
        } else {
            set(&mut frame, wrist, hx, hy + 0.10, z);
        }
    }
    set(&mut frame, Nose, sx - 0.03, sy - 0.08, 0.0);
    frame
}

/// Copy of `frame` with the given joints at `visibility`.
pub fn with_visibility(frame: &Frame, joints: &[PoseLandmark], visibility: f32) -> Frame {
    let mut frame = frame.clone();
    for &joint in joints {
        frame.landmarks[joint.index()].visibility = visibility;
    }
    frame
}

/// Angles from `from` to `to` inclusive in steps of `step` degrees.
pub fn angle_sweep(from: f32, to: f32, step: f32) -> Vec<f32> {
    let step = step.abs().max(f32::EPSILON);
    let count = ((to - from).abs() / step).round() as usize;
    let direction = if to >= from { 1.0 } else { -1.0 };
    let mut angles: Vec<f32> = (0..count).map(|i| from + direction * step * i as f32).collect();
    angles.push(to);
    angles
}
