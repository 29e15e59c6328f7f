//! Core types for differentiable spatial packing.
//!
//! This crate provides the data model shared by the packing workspace:
//! sphere decompositions, degrees of freedom, ports and the objects that
//! take part in a layout.
//!
//! # Overview
//!
//! - **Bounds**: axis-aligned boxes for meshes and layouts ([`Aabb`])
//! - **Sphere sets**: the occupied volume of an object as an ordered union of
//!   balls ([`SphereSet`])
//! - **Degrees of freedom**: the `x y z rx ry rz sx sy sz` tokens and the
//!   canonical design-vector layout ([`Dof`], [`DofSet`])
//! - **Objects**: components, interconnects and fixed structures as a single
//!   tagged type with capability flags ([`SpatialObject`], [`ObjectRole`])
//! - **Ports**: named attachment points on components ([`Port`], [`PortRef`])
//! - **I/O**: `xyzr` sphere decomposition files ([`read_xyzr`], [`parse_xyzr`])
//!
//! # Example
//!
//! ```
//! use packing_types::{Component, DofSet, Interconnect, Port, PortRef, SpatialObject, SphereSet};
//! use nalgebra::Point3;
//!
//! let pump = Component::new(SphereSet::single(Point3::origin(), 0.5).unwrap())
//!     .with_dofs(DofSet::rigid())
//!     .with_port(Port::new("out", Point3::new(0.5, 0.0, 0.0), 0.05).unwrap());
//! let tank = Component::new(SphereSet::single(Point3::new(3.0, 0.0, 0.0), 0.8).unwrap())
//!     .with_dofs(DofSet::parse(&["x", "y", "z"]).unwrap())
//!     .with_port(Port::new("in", Point3::new(2.2, 0.0, 0.0), 0.05).unwrap());
//! let hose = Interconnect::new(PortRef::named("pump", "out"), PortRef::named("tank", "in"), 0.05)
//!     .with_waypoints(1);
//!
//! let objects = vec![
//!     SpatialObject::component("pump", pump).unwrap(),
//!     SpatialObject::component("tank", tank).unwrap(),
//!     SpatialObject::interconnect("hose", hose).unwrap(),
//! ];
//! let design_len: usize = objects.iter().map(SpatialObject::design_len).sum();
//! assert_eq!(design_len, 6 + 3 + 3);
//! ```
//!
//! # Feature Flags
//!
//! - `serde`: Enables serialization/deserialization for all types

#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

mod bounds;
mod color;
mod dof;
mod error;
mod io;
mod object;
mod sphere;

pub use bounds::Aabb;
pub use color::Color;
pub use dof::{Dof, DofSet};
pub use error::{PackingError, PackingResult, ensure_finite};
pub use io::{parse_xyzr, read_xyzr, write_xyzr};
pub use object::{
    Anchor, Component, Interconnect, ObjectKind, ObjectRole, Port, PortKey, PortRef,
    SpatialObject,
};
pub use sphere::{SphereSet, ball_volume};

// Re-export nalgebra types for convenience
pub use nalgebra::{DMatrix, DVector, Point3, Vector3};
