//! Differentiable transforms of sphere sets.
//!
//! Turns the slice of the design vector owned by an object into new sphere
//! positions and radii, together with the analytic Jacobian of that map.
//!
//! A point `p` of the reference sphere set moves to
//!
//! ```text
//! p' = anchor + S · R · (p − anchor) + t
//! R  = Rx(rx) · Ry(ry) · Rz(rz)
//! ```
//!
//! where `anchor` is the object's reference position, `S = diag(sx, sy, sz)`
//! and `t = (x, y, z)`. DOFs that are not enabled keep their default value
//! (`0` for translation and rotation, `1` for scale). Radii follow the
//! configured [`RadiusScaling`] policy.
//!
//! # Example
//!
//! ```
//! use packing_transform::transform;
//! use packing_types::{DofSet, SphereSet};
//!
//! let reference = SphereSet::from_rows(&[[0.0, 0.0, 0.0, 0.5], [2.0, 0.0, 0.0, 0.5]]).unwrap();
//! let dofs = DofSet::parse(&["x", "y", "z"]).unwrap();
//!
//! let moved = transform(&reference, &[1.0, 0.0, 0.0], &dofs).unwrap();
//! assert!((moved.centers()[1].x - 3.0).abs() < 1e-12);
//! ```

#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions, clippy::float_cmp)]

mod function;
pub mod rotation;
mod transform;

pub use function::TransformFunction;
pub use transform::{RadiusScaling, RigidTransform, TransformJacobian, transform};
