//! Intersection volume of two balls.
//!
//! For balls of radii `r` and `s` whose centers are `d` apart:
//!
//! ```text
//! V = 0                                   d ≥ r + s
//! V = 4/3 π min(r, s)³                    d ≤ |r − s|
//! V = π A² B / (12 d)                     otherwise
//!     A = r + s − d
//!     B = d² + 2d(r + s) − 3(r − s)²
//! ```
//!
//! `V` is continuously differentiable in `d` and `r` across both branch
//! boundaries, which is what makes the projection smooth.

use std::f64::consts::PI;

use packing_types::ball_volume;

/// Lens volume and its partial derivatives.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LensVolume {
    /// Intersection volume.
    pub volume: f64,
    /// `∂V/∂d`.
    pub d_distance: f64,
    /// `∂V/∂r`, the first ball's radius.
    pub d_radius: f64,
}

impl LensVolume {
    const ZERO: Self = Self {
        volume: 0.0,
        d_distance: 0.0,
        d_radius: 0.0,
    };
}

/// Intersection volume of a ball of radius `r` and a ball of radius `s`
/// whose centers are `d` apart.
#[must_use]
pub fn lens_volume(d: f64, r: f64, s: f64) -> LensVolume {
    let sum = r + s;
    if d >= sum {
        return LensVolume::ZERO;
    }
    let diff = r - s;
    if d <= diff.abs() {
        return if r < s {
            LensVolume {
                volume: ball_volume(r),
                d_distance: 0.0,
                d_radius: 4.0 * PI * r * r,
            }
        } else {
            LensVolume {
                volume: ball_volume(s),
                ..LensVolume::ZERO
            }
        };
    }

    // Here d > |r - s|, so ratio lies in (-1, 1) and B / d stays bounded
    // as d shrinks.
    let a = sum - d;
    let ratio = diff / d;
    let b_over_d = d + 2.0 * sum - 3.0 * diff * ratio;
    let volume = PI / 12.0 * a * a * b_over_d;
    let d_distance = PI / 12.0 * (-2.0 * a * b_over_d + a * a * (1.0 + 3.0 * ratio * ratio));
    let d_radius = PI / 12.0 * (2.0 * a * b_over_d + a * a * (2.0 - 6.0 * ratio));
    LensVolume {
        volume,
        d_distance,
        d_radius,
    }
}
