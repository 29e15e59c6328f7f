//! Layout evaluation for differentiable spatial packing.
//!
//! A [`Layout`] ties a list of spatial objects to one design vector and
//! evaluates everything an optimizer needs from it:
//!
//! - **Placement**: components moved by their DOFs, interconnects routed
//!   from the moved ports through their waypoints ([`Layout::place`])
//! - **Interference**: one KS-aggregated penetration per pair category, with
//!   its Jacobian ([`Layout::interference`])
//! - **Bounding box**: enclosing box and volume, with subgradients
//!   ([`Layout::bounding_box`])
//! - **Density**: per-object projection onto a mesh and the aggregate
//!   ([`Layout::project`])
//!
//! The same quantities are available as [`Differentiable`] maps
//! ([`InterferenceFunction`], [`BoundingBoxVolume`], [`PlacementFunction`])
//! for optimizers that consume vector functions.
//!
//! # Sign Convention
//!
//! Gaps are positive when objects are separated. Interference constraints are
//! negated gaps, so a layout is feasible when every constraint is `≤ 0`.
//!
//! # Example
//!
//! ```
//! use packing_layout::{Layout, PackingConfig};
//! use packing_types::{Component, DofSet, Interconnect, Port, PortRef, SpatialObject, SphereSet};
//! use nalgebra::{DVector, Point3};
//!
//! let pump = Component::new(SphereSet::single(Point3::origin(), 0.5).unwrap())
//!     .with_dofs(DofSet::parse(&["x", "y", "z"]).unwrap())
//!     .with_port(Port::new("out", Point3::new(0.5, 0.0, 0.0), 0.05).unwrap());
//! let tank = Component::new(SphereSet::single(Point3::new(3.0, 0.0, 0.0), 0.5).unwrap())
//!     .with_port(Port::new("in", Point3::new(2.5, 0.0, 0.0), 0.05).unwrap());
//! let hose = Interconnect::new(PortRef::named("pump", "out"), PortRef::named("tank", "in"), 0.1)
//!     .with_waypoints(1);
//!
//! let layout = Layout::new(
//!     vec![
//!         SpatialObject::component("pump", pump).unwrap(),
//!         SpatialObject::component("tank", tank).unwrap(),
//!         SpatialObject::interconnect("hose", hose).unwrap(),
//!     ],
//!     PackingConfig::default(),
//! )
//! .unwrap();
//!
//! // Pump translation, then the hose waypoint.
//! assert_eq!(layout.design_len(), 6);
//! let x = DVector::from_vec(vec![0.0, 0.0, 0.0, 1.5, 1.0, 0.0]);
//!
//! let state = layout.place(&x).unwrap();
//! assert_eq!(state.object(2).unwrap().capsules.len(), 2);
//! assert!(layout.interference(&x).unwrap().is_feasible());
//! ```
//!
//! # Feature Flags
//!
//! - `serde`: Enables serialization/deserialization for [`PackingConfig`] and
//!   evaluation results

#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

mod config;
mod function;
mod layout;
mod pairs;
mod route;

pub use config::{DEFAULT_SPHERES_PER_SEGMENT, PackingConfig};
pub use function::{BoundingBoxVolume, InterferenceFunction, PlacementFunction};
pub use layout::{
    BoundingBox, BoundingBoxJacobian, InterferenceConstraints, Layout, LayoutProjection,
    LayoutState, PlacedObject, PositionJacobian,
};
pub use pairs::{PairCategory, PairSets};
pub use route::{route, route_capsules, route_jacobian, route_nodes};

pub use packing_geometry::Differentiable;
