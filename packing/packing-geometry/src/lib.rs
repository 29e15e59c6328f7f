//! Distance kernels and smooth aggregation for spatial packing.
//!
//! This crate provides the collision side of the packing workspace:
//!
//! - **Distances**: signed gaps between spheres and capsules with analytic
//!   gradients ([`capsule_capsule_gap`], [`sphere_sphere_min_distance`],
//!   [`sphere_sphere_interference`])
//! - **Aggregation**: Kreisselmeier–Steinhauser smooth max/min
//!   ([`ks_max`], [`ks_min`], [`ks_max_with_gradient`])
//! - **Derivatives**: the [`Differentiable`] abstraction implemented by every
//!   evaluation entry point, with finite-difference validation
//!   ([`max_relative_error`], [`validate_jacobian`])
//!
//! # Sign convention
//!
//! Gaps are positive when separated, zero when tangent and negative when
//! overlapping. Interference (penetration depth) is the negated gap, so a
//! constraint `g ≤ 0` is satisfied when nothing collides.
//!
//! # Example
//!
//! ```
//! use packing_geometry::{Capsule, capsule_capsule_gap, ks_max};
//! use nalgebra::Point3;
//!
//! let a = Capsule::new(Point3::new(0.0, 0.0, 0.0), Point3::new(1.0, 0.0, 0.0), 0.5);
//! let b = Capsule::new(Point3::new(0.0, 1.0, 0.0), Point3::new(1.0, 1.0, 0.0), 0.5);
//! let c = Capsule::sphere(Point3::new(0.5, -0.8, 0.0), 0.5);
//!
//! let penetrations: Vec<f64> = [(&a, &b), (&a, &c), (&b, &c)]
//!     .iter()
//!     .map(|(p, q)| -capsule_capsule_gap(p, q).gap)
//!     .collect();
//! let worst = ks_max(&penetrations, 200.0).unwrap();
//! assert!(worst > 0.19);
//! ```
//!
//! # Feature Flags
//!
//! - `serde`: Enables serialization/deserialization for [`DerivativeConfig`]

#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions, clippy::many_single_char_names)]

mod aggregate;
mod derivative;
mod distance;

pub use aggregate::{DEFAULT_RHO, ks_max, ks_max_with_gradient, ks_min, ks_min_with_gradient};
pub use derivative::{
    DerivativeConfig, Differentiable, check_input, max_relative_error, validate_jacobian,
};
pub use distance::{
    Capsule, CapsuleGap, CapsuleGradient, GEOM_EPSILON, SegmentClosestPoints, SphereInterference,
    capsule_capsule_distance, capsule_capsule_gap, closest_point_on_segment,
    closest_points_segments, point_segment_distance, sphere_sphere_gaps,
    sphere_sphere_interference, sphere_sphere_min_distance,
};
