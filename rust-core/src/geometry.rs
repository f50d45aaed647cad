//! Landmark geometry utilities.
//!
//! Pure, deterministic functions over landmark coordinates. Visibility is
//! never consulted here; gating on confidence is the analyzers' job.
//!
//! Conventions follow the landmark space: `y` grows downward, so a positive
//! vertical alignment means the first point is lower in the image.

use crate::types::Landmark;

/// Angle reported when the joint vectors are too short to define one.
pub const DEGENERATE_ANGLE: f32 = 180.0;

/// Shortest joint vector considered non-degenerate (normalized units).
const MIN_VECTOR_LENGTH: f32 = 1e-4;

/// Interior angle at `middle`, in degrees within `[0, 180]`.
///
/// Computed in 3D from the vectors `middle → first` and `middle → last`.
/// Returns [`DEGENERATE_ANGLE`] when either vector has (near) zero length or
/// the coordinates are not finite.
pub fn angle(first: &Landmark, middle: &Landmark, last: &Landmark) -> f32 {
    try_angle(first, middle, last).unwrap_or(DEGENERATE_ANGLE)
}

/// Like [`angle`], but reports degeneracy as `None` so callers can tell a
/// straight joint from a missing signal.
pub fn try_angle(first: &Landmark, middle: &Landmark, last: &Landmark) -> Option<f32> {
    let v1 = [first.x - middle.x, first.y - middle.y, first.z - middle.z];
    let v2 = [last.x - middle.x, last.y - middle.y, last.z - middle.z];

    let dot = v1[0] * v2[0] + v1[1] * v2[1] + v1[2] * v2[2];
    let mag1 = (v1[0] * v1[0] + v1[1] * v1[1] + v1[2] * v1[2]).sqrt();
    let mag2 = (v2[0] * v2[0] + v2[1] * v2[1] + v2[2] * v2[2]).sqrt();

    if !(mag1.is_finite() && mag2.is_finite() && dot.is_finite()) {
        return None;
    }
    if mag1 < MIN_VECTOR_LENGTH || mag2 < MIN_VECTOR_LENGTH {
        return None;
    }

    // Rounding can push the ratio just outside [-1, 1]; acos would give NaN.
    let cos_theta = (dot / (mag1 * mag2)).clamp(-1.0, 1.0);
    Some(cos_theta.acos().to_degrees())
}

/// `p1.y - p2.y`. Positive when `p1` is below `p2`.
pub fn vertical_alignment(p1: &Landmark, p2: &Landmark) -> f32 {
    p1.y - p2.y
}

/// `p1.x - p2.x`. Positive when `p1` is right of `p2`.
pub fn horizontal_alignment(p1: &Landmark, p2: &Landmark) -> f32 {
    p1.x - p2.x
}

/// Symmetric tolerance check: `|value - target| <= tolerance`.
pub fn is_close_to(value: f32, target: f32, tolerance: f32) -> bool {
    (value - target).abs() <= tolerance
}

/// Distance in the image plane, ignoring depth.
pub fn distance_2d(a: &Landmark, b: &Landmark) -> f32 {
    let dx = a.x - b.x;
    let dy = a.y - b.y;
    (dx * dx + dy * dy).sqrt()
}

/// Coordinate midpoint. The visibility of the result is the weaker of the two.
pub fn midpoint(a: &Landmark, b: &Landmark) -> Landmark {
    Landmark {
        x: (a.x + b.x) / 2.0,
        y: (a.y + b.y) / 2.0,
        z: (a.z + b.z) / 2.0,
        visibility: a.visibility.min(b.visibility),
    }
}
