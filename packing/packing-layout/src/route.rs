//! Sphere chains along interconnect paths.
//!
//! An interconnect runs through the nodes `[start] + waypoints + [end]`.
//! Each segment contributes `n` spheres at `t = k / n` for `k = 0..n`, and
//! the end node closes the chain, giving `n · segments + 1` spheres of the
//! tube radius.

use nalgebra::{DMatrix, Point3};
use packing_geometry::Capsule;
use packing_types::{PackingError, PackingResult, SphereSet};

/// The route nodes `[start] + waypoints + [end]`.
#[must_use]
pub fn route_nodes(waypoints: &[Point3<f64>], start: &Point3<f64>, end: &Point3<f64>) -> Vec<Point3<f64>> {
    let mut nodes = Vec::with_capacity(waypoints.len() + 2);
    nodes.push(*start);
    nodes.extend_from_slice(waypoints);
    nodes.push(*end);
    nodes
}

/// Samples the chain of spheres through `start`, the waypoints and `end`.
///
/// Zero-length segments yield coincident spheres.
///
/// # Errors
///
/// Returns [`PackingError::Validation`] if `spheres_per_segment` is zero or
/// the radius or a node is not finite.
///
/// # Example
///
/// ```
/// use packing_layout::route;
/// use nalgebra::Point3;
///
/// let spheres = route(&[Point3::new(1.0, 0.0, 0.0)], &Point3::origin(), &Point3::new(1.0, 1.0, 0.0), 2, 0.1)
///     .unwrap();
/// assert_eq!(spheres.len(), 5);
/// assert_eq!(spheres.centers()[1], Point3::new(0.5, 0.0, 0.0));
/// ```
#[allow(clippy::cast_precision_loss)]
pub fn route(
    waypoints: &[Point3<f64>],
    start: &Point3<f64>,
    end: &Point3<f64>,
    spheres_per_segment: usize,
    radius: f64,
) -> PackingResult<SphereSet> {
    if spheres_per_segment == 0 {
        return Err(PackingError::validation("spheres per segment must be at least 1"));
    }
    let nodes = route_nodes(waypoints, start, end);
    let mut centers = Vec::with_capacity(spheres_per_segment * (nodes.len() - 1) + 1);
    for pair in nodes.windows(2) {
        let step = (pair[1] - pair[0]) / spheres_per_segment as f64;
        for k in 0..spheres_per_segment {
            centers.push(pair[0] + step * k as f64);
        }
    }
    centers.push(*end);
    let radii = vec![radius; centers.len()];
    SphereSet::new(centers, radii)
}

/// `∂(flattened sphere centers)/∂(flattened nodes)` for a route through
/// `node_count` nodes.
///
/// The chain is linear in the nodes, so the matrix is constant:
/// `3 (n · (node_count − 1) + 1) × 3 node_count`.
///
/// # Errors
///
/// Returns [`PackingError::Validation`] if `spheres_per_segment` is zero or
/// there are fewer than two nodes.
#[allow(clippy::cast_precision_loss)]
pub fn route_jacobian(node_count: usize, spheres_per_segment: usize) -> PackingResult<DMatrix<f64>> {
    if spheres_per_segment == 0 {
        return Err(PackingError::validation("spheres per segment must be at least 1"));
    }
    if node_count < 2 {
        return Err(PackingError::validation(format!(
            "a route needs at least two nodes, got {node_count}"
        )));
    }
    let n = spheres_per_segment;
    let spheres = n * (node_count - 1) + 1;
    let mut jacobian = DMatrix::zeros(3 * spheres, 3 * node_count);
    for segment in 0..node_count - 1 {
        for k in 0..n {
            let t = k as f64 / n as f64;
            let row = 3 * (segment * n + k);
            for axis in 0..3 {
                jacobian[(row + axis, 3 * segment + axis)] = 1.0 - t;
                jacobian[(row + axis, 3 * (segment + 1) + axis)] = t;
            }
        }
    }
    for axis in 0..3 {
        jacobian[(3 * (spheres - 1) + axis, 3 * (node_count - 1) + axis)] = 1.0;
    }
    Ok(jacobian)
}

/// The route as one capsule per segment.
#[must_use]
pub fn route_capsules(
    waypoints: &[Point3<f64>],
    start: &Point3<f64>,
    end: &Point3<f64>,
    radius: f64,
) -> Vec<Capsule> {
    route_nodes(waypoints, start, end)
        .windows(2)
        .map(|pair| Capsule::new(pair[0], pair[1], radius))
        .collect()
}
