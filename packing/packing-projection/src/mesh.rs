//! Regular voxel mesh over the layout bounds.

use nalgebra::{Point3, Vector3};
use packing_types::{Aabb, PackingError, PackingResult, ball_volume};
use tracing::{info, warn};

use crate::kernel::MeshKernel;

/// Relative slack when turning `elements_per_unit_length · extent` into an
/// element count, so exact products are not lost to rounding.
const COUNT_TOLERANCE: f64 = 1e-9;

/// Element × kernel sample count above which a mesh is considered expensive.
pub const SAMPLE_BUDGET_WARNING: usize = 5_000_000;

/// An immutable regular grid of cubic elements with a broadcast kernel.
///
/// Elements are indexed in `ij` order: `index = (ix * ny + iy) * nz + iz`.
/// Element `(ix, iy, iz)` is centered at `min + (i + ½) · L` on each axis,
/// where `min` is the minimum corner of the bounds. When an extent is not a
/// multiple of the element length the grid stops short of the maximum bound.
///
/// # Example
///
/// ```
/// use packing_projection::{Mesh, MeshKernel};
/// use packing_types::Aabb;
///
/// let bounds = Aabb::from_bounds([0.0, 2.0, 0.0, 1.0, 0.0, 1.0]).unwrap();
/// let mesh = Mesh::build(bounds, 2.0, MeshKernel::mdbd_1()).unwrap();
///
/// assert_eq!(mesh.counts(), [4, 2, 2]);
/// assert_eq!(mesh.element_count(), 16);
/// assert!((mesh.element_length() - 0.5).abs() < 1e-12);
/// ```
#[derive(Debug, Clone)]
pub struct Mesh {
    bounds: Aabb,
    element_length: f64,
    counts: [usize; 3],
    kernel: MeshKernel,
    sample_offsets: Vec<Vector3<f64>>,
    sample_radii: Vec<f64>,
    sample_weights: Vec<f64>,
}

impl Mesh {
    /// Builds the mesh.
    ///
    /// # Errors
    ///
    /// Returns [`PackingError::Configuration`] if `elements_per_unit_length`
    /// is not positive and finite, any axis would get zero elements, or the
    /// element or sample count does not fit in `usize`.
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    pub fn build(bounds: Aabb, elements_per_unit_length: f64, kernel: MeshKernel) -> PackingResult<Self> {
        if !elements_per_unit_length.is_finite() || elements_per_unit_length <= 0.0 {
            return Err(PackingError::configuration(format!(
                "elements per unit length must be positive and finite, got {elements_per_unit_length}"
            )));
        }
        let size = bounds.size();
        if size.iter().any(|s| !s.is_finite() || *s <= 0.0) {
            return Err(PackingError::configuration(format!(
                "mesh bounds must have positive finite extent, got {size}"
            )));
        }

        let mut counts = [0usize; 3];
        for (axis, count) in counts.iter_mut().enumerate() {
            let exact = elements_per_unit_length * size[axis];
            let n = (exact + COUNT_TOLERANCE * exact.max(1.0)).floor();
            if n < 1.0 {
                return Err(PackingError::configuration(format!(
                    "axis {axis} of extent {} gets no elements at {elements_per_unit_length} elements per unit length",
                    size[axis]
                )));
            }
            *count = n as usize;
        }
        let samples = counts[0]
            .checked_mul(counts[1])
            .and_then(|n| n.checked_mul(counts[2]))
            .and_then(|n| n.checked_mul(kernel.len()));
        if samples.is_none() {
            return Err(PackingError::configuration(format!(
                "mesh of {counts:?} elements with {} kernel spheres is too large to index",
                kernel.len()
            )));
        }

        let element_length = 1.0 / elements_per_unit_length;
        let sample_offsets: Vec<Vector3<f64>> = kernel
            .spheres()
            .centers()
            .iter()
            .map(|c| c.coords * element_length)
            .collect();
        let sample_radii: Vec<f64> = kernel
            .spheres()
            .radii()
            .iter()
            .map(|r| r * element_length)
            .collect();
        let kernel_volume: f64 = sample_radii.iter().map(|r| ball_volume(*r)).sum();
        let sample_weights = sample_radii
            .iter()
            .map(|r| ball_volume(*r) / kernel_volume)
            .collect();

        let mesh = Self {
            bounds,
            element_length,
            counts,
            kernel,
            sample_offsets,
            sample_radii,
            sample_weights,
        };

        info!(
            nx = counts[0],
            ny = counts[1],
            nz = counts[2],
            element_length,
            kernel_spheres = mesh.kernel.len(),
            "Built projection mesh"
        );
        if mesh.sample_count() > SAMPLE_BUDGET_WARNING {
            warn!(
                samples = mesh.sample_count(),
                budget = SAMPLE_BUDGET_WARNING,
                "Mesh resolution times kernel size exceeds the sample budget; projection will be slow"
            );
        }
        Ok(mesh)
    }

    /// The requested bounds.
    #[must_use]
    pub const fn bounds(&self) -> &Aabb {
        &self.bounds
    }

    /// Edge length of one element.
    #[must_use]
    pub const fn element_length(&self) -> f64 {
        self.element_length
    }

    /// Volume of one element.
    #[must_use]
    pub fn element_volume(&self) -> f64 {
        self.element_length.powi(3)
    }

    /// Element counts `[nx, ny, nz]`.
    #[must_use]
    pub const fn counts(&self) -> [usize; 3] {
        self.counts
    }

    /// Total number of elements.
    #[must_use]
    pub const fn element_count(&self) -> usize {
        self.counts[0] * self.counts[1] * self.counts[2]
    }

    /// Total number of kernel samples over all elements.
    #[must_use]
    pub fn sample_count(&self) -> usize {
        self.element_count() * self.kernel.len()
    }

    /// Volume covered by the elements.
    #[allow(clippy::cast_precision_loss)]
    #[must_use]
    pub fn meshed_volume(&self) -> f64 {
        self.element_count() as f64 * self.element_volume()
    }

    /// The unit-element kernel.
    #[must_use]
    pub const fn kernel(&self) -> &MeshKernel {
        &self.kernel
    }

    /// Fraction of each element covered by kernel spheres.
    #[must_use]
    pub fn kernel_volume_fraction(&self) -> f64 {
        self.kernel.volume_fraction()
    }

    /// Flattened index of element `(ix, iy, iz)`.
    #[must_use]
    pub const fn element_index(&self, ix: usize, iy: usize, iz: usize) -> usize {
        (ix * self.counts[1] + iy) * self.counts[2] + iz
    }

    /// Inverse of [`Mesh::element_index`].
    #[must_use]
    pub const fn element_coords(&self, index: usize) -> [usize; 3] {
        let iz = index % self.counts[2];
        let rest = index / self.counts[2];
        [rest / self.counts[1], rest % self.counts[1], iz]
    }

    /// Center of the element at `index`.
    #[allow(clippy::cast_precision_loss)]
    #[must_use]
    pub fn element_center(&self, index: usize) -> Point3<f64> {
        let [ix, iy, iz] = self.element_coords(index);
        let offset = Vector3::new(ix as f64 + 0.5, iy as f64 + 0.5, iz as f64 + 0.5);
        self.bounds.min + offset * self.element_length
    }

    /// Bounds of the element at `index`.
    #[must_use]
    pub fn element_bounds(&self, index: usize) -> Aabb {
        Aabb::from_center(
            self.element_center(index),
            Vector3::repeat(0.5 * self.element_length),
        )
    }

    /// All element centers in index order.
    #[must_use]
    pub fn centers(&self) -> Vec<Point3<f64>> {
        (0..self.element_count()).map(|e| self.element_center(e)).collect()
    }

    /// Lattice vertices `(nx + 1) × (ny + 1) × (nz + 1)` in `ij` order.
    #[allow(clippy::cast_precision_loss)]
    #[must_use]
    pub fn grid_points(&self) -> Vec<Point3<f64>> {
        let [nx, ny, nz] = self.counts;
        let mut points = Vec::with_capacity((nx + 1) * (ny + 1) * (nz + 1));
        for ix in 0..=nx {
            for iy in 0..=ny {
                for iz in 0..=nz {
                    let offset = Vector3::new(ix as f64, iy as f64, iz as f64);
                    points.push(self.bounds.min + offset * self.element_length);
                }
            }
        }
        points
    }

    /// Kernel samples `(center, radius, weight)` of the element at `index`.
    ///
    /// Weights are the sample volumes normalized to sum to one.
    pub fn samples(&self, index: usize) -> impl Iterator<Item = (Point3<f64>, f64, f64)> + '_ {
        let center = self.element_center(index);
        self.sample_offsets
            .iter()
            .zip(&self.sample_radii)
            .zip(&self.sample_weights)
            .map(move |((offset, radius), weight)| (center + offset, *radius, *weight))
    }

    /// Every kernel sample of every element, broadcast as `(centers, radii)`.
    #[must_use]
    pub fn broadcast_samples(&self) -> (Vec<Point3<f64>>, Vec<f64>) {
        let mut centers = Vec::with_capacity(self.sample_count());
        let mut radii = Vec::with_capacity(self.sample_count());
        for e in 0..self.element_count() {
            for (c, r, _) in self.samples(e) {
                centers.push(c);
                radii.push(r);
            }
        }
        (centers, radii)
    }

    /// Indices of the elements whose bounds intersect the given ball.
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_possible_wrap
    )]
    #[must_use]
    pub fn elements_touching(&self, center: &Point3<f64>, radius: f64) -> Vec<usize> {
        let mut ranges = [(0usize, 0usize); 3];
        for (axis, range) in ranges.iter_mut().enumerate() {
            let lo = ((center[axis] - radius - self.bounds.min[axis]) / self.element_length).floor();
            let hi = ((center[axis] + radius - self.bounds.min[axis]) / self.element_length).floor();
            let last = self.counts[axis] as f64 - 1.0;
            if hi < 0.0 || lo > last {
                return Vec::new();
            }
            *range = (lo.max(0.0) as usize, hi.min(last) as usize);
        }

        let mut touched = Vec::new();
        for ix in ranges[0].0..=ranges[0].1 {
            for iy in ranges[1].0..=ranges[1].1 {
                for iz in ranges[2].0..=ranges[2].1 {
                    let index = self.element_index(ix, iy, iz);
                    if self.element_bounds(index).intersects_sphere(center, radius) {
                        touched.push(index);
                    }
                }
            }
        }
        touched
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn unit_mesh(epul: f64) -> Mesh {
        let bounds = Aabb::from_bounds([0.0, 1.0, 0.0, 1.0, 0.0, 1.0]).unwrap();
        Mesh::build(bounds, epul, MeshKernel::mdbd_1()).unwrap()
    }

    #[test]
    fn test_counts_tolerate_rounding() {
        let bounds = Aabb::from_bounds([0.0, 0.3, 0.0, 1.0, 0.0, 1.0]).unwrap();
        let mesh = Mesh::build(bounds, 10.0, MeshKernel::mdbd_1()).unwrap();
        assert_eq!(mesh.counts(), [3, 10, 10]);
    }

    #[test]
    fn test_partial_extent_is_floored() {
        let bounds = Aabb::from_bounds([0.0, 1.7, 0.0, 1.0, 0.0, 1.0]).unwrap();
        let mesh = Mesh::build(bounds, 1.0, MeshKernel::mdbd_1()).unwrap();
        assert_eq!(mesh.counts(), [1, 1, 1]);
    }

    #[test]
    fn test_centers_start_at_bounds_minimum() {
        let bounds = Aabb::from_bounds([2.0, 4.0, -1.0, 0.0, 10.0, 11.0]).unwrap();
        let mesh = Mesh::build(bounds, 2.0, MeshKernel::mdbd_1()).unwrap();
        assert_eq!(mesh.counts(), [4, 2, 2]);
        assert_relative_eq!(mesh.element_center(0), Point3::new(2.25, -0.75, 10.25));
        let last = mesh.element_count() - 1;
        assert_relative_eq!(mesh.element_center(last), Point3::new(3.75, -0.25, 10.75));
    }

    #[test]
    fn test_index_order_is_z_fastest() {
        let bounds = Aabb::from_bounds([0.0, 2.0, 0.0, 3.0, 0.0, 4.0]).unwrap();
        let mesh = Mesh::build(bounds, 1.0, MeshKernel::mdbd_1()).unwrap();
        assert_eq!(mesh.element_index(0, 0, 1), 1);
        assert_eq!(mesh.element_index(0, 1, 0), 4);
        assert_eq!(mesh.element_index(1, 0, 0), 12);
        for index in 0..mesh.element_count() {
            let [ix, iy, iz] = mesh.element_coords(index);
            assert_eq!(mesh.element_index(ix, iy, iz), index);
        }
    }

    #[test]
    fn test_invalid_configuration() {
        let bounds = Aabb::from_bounds([0.0, 1.0, 0.0, 1.0, 0.0, 1.0]).unwrap();
        for epul in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            assert!(Mesh::build(bounds, epul, MeshKernel::mdbd_1()).unwrap_err().is_configuration());
        }
        let thin = Aabb::from_bounds([0.0, 1.0, 0.0, 1.0, 0.0, 0.1]).unwrap();
        assert!(Mesh::build(thin, 2.0, MeshKernel::mdbd_1()).unwrap_err().is_configuration());
    }

    #[test]
    fn test_oversized_mesh_is_rejected() {
        let bounds = Aabb::from_bounds([0.0, 1e4, 0.0, 1e4, 0.0, 1e4]).unwrap();
        let err = Mesh::build(bounds, 1e3, MeshKernel::mdbd_9()).unwrap_err();
        assert!(err.is_configuration());
        assert!(err.to_string().contains("too large"));
    }

    #[test]
    fn test_samples_scaled_and_broadcast() {
        let bounds = Aabb::from_bounds([0.0, 1.0, 0.0, 1.0, 0.0, 1.0]).unwrap();
        let mesh = Mesh::build(bounds, 2.0, MeshKernel::uniform(2).unwrap()).unwrap();
        let samples: Vec<_> = mesh.samples(0).collect();
        assert_eq!(samples.len(), 8);
        assert_relative_eq!(samples[0].0, Point3::new(0.125, 0.125, 0.125));
        assert_relative_eq!(samples[0].1, 0.125);
        assert_relative_eq!(samples.iter().map(|s| s.2).sum::<f64>(), 1.0, epsilon = 1e-12);

        let (centers, radii) = mesh.broadcast_samples();
        assert_eq!(centers.len(), 64);
        assert_eq!(radii.len(), mesh.sample_count());
    }

    #[test]
    fn test_grid_points() {
        let mesh = unit_mesh(2.0);
        let points = mesh.grid_points();
        assert_eq!(points.len(), 27);
        assert_relative_eq!(points[26], Point3::new(1.0, 1.0, 1.0));
    }

    #[test]
    fn test_volumes() {
        let mesh = unit_mesh(4.0);
        assert_relative_eq!(mesh.element_volume(), 1.0 / 64.0);
        assert_relative_eq!(mesh.meshed_volume(), 1.0, epsilon = 1e-12);
        assert_relative_eq!(mesh.kernel_volume_fraction(), std::f64::consts::PI / 6.0, epsilon = 1e-12);
    }

    #[test]
    fn test_elements_touching() {
        let mesh = unit_mesh(4.0);
        let touched = mesh.elements_touching(&Point3::new(0.125, 0.125, 0.125), 0.05);
        assert_eq!(touched, vec![0]);
        let corner = mesh.elements_touching(&Point3::new(0.5, 0.5, 0.5), 0.01);
        assert_eq!(corner.len(), 8);
        assert!(mesh.elements_touching(&Point3::new(5.0, 5.0, 5.0), 1.0).is_empty());
        assert_eq!(mesh.elements_touching(&Point3::new(0.5, 0.5, 0.5), 2.0).len(), 64);
    }
}
