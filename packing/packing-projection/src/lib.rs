//! Pseudo-density projection of sphere-packed geometry onto a voxel mesh.
//!
//! This crate turns the placed spheres of each object into a smooth,
//! differentiable per-element density and combines the per-object fields so
//! overlaps show up as densities above one.
//!
//! # Overview
//!
//! - **Kernels**: sphere packings of the unit element that sample density
//!   ([`MeshKernel`], [`KernelChoice`])
//! - **Mesh**: the regular grid over the layout bounds ([`Mesh`])
//! - **Projection**: sphere sets and capsules to density, with analytic
//!   derivatives ([`project`], [`project_with_jacobian`], [`project_capsules`])
//! - **Aggregation**: sum, floor and smooth maximum of density fields
//!   ([`aggregate`])
//!
//! # Example
//!
//! ```
//! use packing_projection::{DEFAULT_RHO_MIN, Mesh, MeshKernel, aggregate, project};
//! use packing_types::{Aabb, SphereSet};
//! use nalgebra::Point3;
//!
//! let bounds = Aabb::from_bounds([0.0, 2.0, 0.0, 1.0, 0.0, 1.0]).unwrap();
//! let mesh = Mesh::build(bounds, 4.0, MeshKernel::default()).unwrap();
//!
//! let a = project(&mesh, &SphereSet::single(Point3::new(0.5, 0.5, 0.5), 0.4).unwrap());
//! let b = project(&mesh, &SphereSet::single(Point3::new(0.9, 0.5, 0.5), 0.4).unwrap());
//! let out = aggregate(&[a, b], DEFAULT_RHO_MIN, 100.0).unwrap();
//!
//! // The two balls overlap, so some element is claimed twice.
//! assert!(out.max_density > 1.0);
//! ```
//!
//! # Feature Flags
//!
//! - `serde`: Enables serialization/deserialization for kernels and density
//!   fields

#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions, clippy::many_single_char_names)]

mod aggregate;
mod function;
mod kernel;
mod lens;
mod mesh;
mod project;

pub use aggregate::{AggregateOutput, DEFAULT_RHO_MIN, aggregate};
pub use function::ProjectionFunction;
pub use kernel::{KernelChoice, MeshKernel};
pub use lens::{LensVolume, lens_volume};
pub use mesh::{Mesh, SAMPLE_BUDGET_WARNING};
pub use project::{
    DensityField, DensityJacobian, VOLUME_ERROR_WARNING, project, project_capsules,
    project_with_jacobian, volume_estimation_error,
};
