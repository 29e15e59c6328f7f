//! Pseudo-density projection of sphere sets onto a mesh.
//!
//! Each kernel sample `k` of an element sees every object sphere `i` that
//! touches the element. The sample's smoothed occupancy by one sphere is
//! `f_ik = V_lens(d_ik, r_i, s_k) / V(s_k)`, spheres combine as a union
//! `occ_k = 1 − Π_i (1 − f_ik)`, and the element density is the
//! volume-weighted mean of the sample occupancies.

use nalgebra::{DMatrix, DVector, Vector3};
use packing_geometry::{Capsule, point_segment_distance};
use packing_types::{PackingError, PackingResult, SphereSet, ball_volume};
use tracing::{debug, warn};

use crate::lens::lens_volume;
use crate::mesh::Mesh;

/// Relative volume error above which a projection is reported as coarse.
pub const VOLUME_ERROR_WARNING: f64 = 0.1;

/// Per-element density of one object, in `[0, 1]`, flattened in `ij` order.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DensityField {
    counts: [usize; 3],
    values: DVector<f64>,
}

impl DensityField {
    /// A field of zeros shaped like `mesh`.
    #[must_use]
    pub fn zeros(mesh: &Mesh) -> Self {
        Self {
            counts: mesh.counts(),
            values: DVector::zeros(mesh.element_count()),
        }
    }

    /// Wraps raw element values.
    ///
    /// # Errors
    ///
    /// Returns [`PackingError::Validation`] if the value count does not match
    /// `counts`.
    pub fn from_values(counts: [usize; 3], values: DVector<f64>) -> PackingResult<Self> {
        let expected = counts[0] * counts[1] * counts[2];
        if values.len() != expected {
            return Err(PackingError::validation(format!(
                "density field has {} values, expected {expected} for counts {counts:?}",
                values.len()
            )));
        }
        Ok(Self { counts, values })
    }

    /// Element counts `[nx, ny, nz]`.
    #[must_use]
    pub const fn counts(&self) -> [usize; 3] {
        self.counts
    }

    /// Element values in `ij` order.
    #[must_use]
    pub const fn values(&self) -> &DVector<f64> {
        &self.values
    }

    /// Number of elements.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns `true` if the field has no elements.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Value of element `(ix, iy, iz)`, if in range.
    #[must_use]
    pub fn get(&self, ix: usize, iy: usize, iz: usize) -> Option<f64> {
        let [nx, ny, nz] = self.counts;
        (ix < nx && iy < ny && iz < nz).then(|| self.values[(ix * ny + iy) * nz + iz])
    }

    /// Largest element value.
    #[must_use]
    pub fn max(&self) -> f64 {
        self.values.max()
    }

    /// Projected volume: `Σ density · element_volume`.
    #[must_use]
    pub fn volume(&self, mesh: &Mesh) -> f64 {
        self.values.sum() * mesh.element_volume()
    }
}

/// Derivatives of a density field with respect to the projected spheres.
#[derive(Debug, Clone, PartialEq)]
pub struct DensityJacobian {
    /// `∂density/∂centers`, `n_elements × 3N`, columns `x0 y0 z0 x1 ...`.
    pub positions: DMatrix<f64>,
    /// `∂density/∂radii`, `n_elements × N`.
    pub radii: DMatrix<f64>,
}

/// Spheres touching each element, bucketed by element index.
fn bucket_spheres(mesh: &Mesh, spheres: &SphereSet) -> Vec<Vec<usize>> {
    let mut buckets = vec![Vec::new(); mesh.element_count()];
    for (i, (center, radius)) in spheres.iter().enumerate() {
        for e in mesh.elements_touching(center, radius) {
            buckets[e].push(i);
        }
    }
    buckets
}

/// Projects a sphere set onto the mesh.
///
/// Spheres that do not touch an element's bounds contribute nothing to it,
/// since kernel samples lie inside their element.
///
/// # Example
///
/// ```
/// use packing_projection::{Mesh, MeshKernel, project};
/// use packing_types::{Aabb, SphereSet};
/// use nalgebra::Point3;
///
/// let bounds = Aabb::from_bounds([0.0, 2.0, 0.0, 2.0, 0.0, 2.0]).unwrap();
/// let mesh = Mesh::build(bounds, 2.0, MeshKernel::uniform(2).unwrap()).unwrap();
/// let spheres = SphereSet::single(Point3::new(0.25, 0.25, 0.25), 0.3).unwrap();
///
/// let field = project(&mesh, &spheres);
/// assert_eq!(field.len(), 64);
/// assert!(field.values()[0] > 0.0);
/// assert_eq!(field.values()[63], 0.0);
/// ```
#[must_use]
pub fn project(mesh: &Mesh, spheres: &SphereSet) -> DensityField {
    let buckets = bucket_spheres(mesh, spheres);
    let mut field = DensityField::zeros(mesh);
    for (e, bucket) in buckets.iter().enumerate() {
        if bucket.is_empty() {
            continue;
        }
        let mut density = 0.0;
        for (sample, s, weight) in mesh.samples(e) {
            let sample_volume = ball_volume(s);
            let mut empty = 1.0;
            for &i in bucket {
                let d = (spheres.centers()[i] - sample).norm();
                let f = lens_volume(d, spheres.radii()[i], s).volume / sample_volume;
                empty *= 1.0 - f;
            }
            density += weight * (1.0 - empty);
        }
        field.values[e] = density;
    }
    debug!(
        spheres = spheres.len(),
        touched = buckets.iter().filter(|b| !b.is_empty()).count(),
        max_density = field.max(),
        "Projected sphere set"
    );
    field
}

/// Projects a sphere set and differentiates the densities with respect to
/// the sphere centers and radii.
#[must_use]
pub fn project_with_jacobian(mesh: &Mesh, spheres: &SphereSet) -> (DensityField, DensityJacobian) {
    let n = spheres.len();
    let buckets = bucket_spheres(mesh, spheres);
    let mut field = DensityField::zeros(mesh);
    let mut jacobian = DensityJacobian {
        positions: DMatrix::zeros(mesh.element_count(), 3 * n),
        radii: DMatrix::zeros(mesh.element_count(), n),
    };

    let mut fractions = Vec::new();
    let mut prefix = Vec::new();
    for (e, bucket) in buckets.iter().enumerate() {
        if bucket.is_empty() {
            continue;
        }
        let mut density = 0.0;
        for (sample, s, weight) in mesh.samples(e) {
            let sample_volume = ball_volume(s);
            fractions.clear();
            for &i in bucket {
                let offset = spheres.centers()[i] - sample;
                let d = offset.norm();
                let lens = lens_volume(d, spheres.radii()[i], s);
                let direction = if d > f64::EPSILON { offset / d } else { Vector3::zeros() };
                fractions.push((
                    lens.volume / sample_volume,
                    direction * (lens.d_distance / sample_volume),
                    lens.d_radius / sample_volume,
                ));
            }

            // prefix[j] = Π_{m<j} (1 − f_m)
            prefix.clear();
            prefix.push(1.0);
            for (f, _, _) in &fractions {
                let last = prefix[prefix.len() - 1];
                prefix.push(last * (1.0 - f));
            }
            density += weight * (1.0 - prefix[fractions.len()]);

            let mut suffix = 1.0;
            for (j, (f, d_center, d_radius)) in fractions.iter().enumerate().rev() {
                let others = prefix[j] * suffix;
                let i = bucket[j];
                let scale = weight * others;
                for axis in 0..3 {
                    jacobian.positions[(e, 3 * i + axis)] += scale * d_center[axis];
                }
                jacobian.radii[(e, i)] += scale * d_radius;
                suffix *= 1.0 - f;
            }
        }
        field.values[e] = density;
    }
    debug!(
        spheres = n,
        elements = mesh.element_count(),
        "Projected sphere set with jacobian"
    );
    (field, jacobian)
}

/// Projects capsules (interconnect segments) onto the mesh.
///
/// A sample's occupancy by a capsule is the lens occupancy of the ball of the
/// capsule's radius centered at the segment point closest to the sample.
#[must_use]
pub fn project_capsules(mesh: &Mesh, capsules: &[Capsule]) -> DensityField {
    let mut buckets = vec![Vec::new(); mesh.element_count()];
    for (i, capsule) in capsules.iter().enumerate() {
        let center = nalgebra::center(&capsule.start, &capsule.end);
        let reach = 0.5 * capsule.length() + capsule.radius;
        for e in mesh.elements_touching(&center, reach) {
            buckets[e].push(i);
        }
    }

    let mut field = DensityField::zeros(mesh);
    for (e, bucket) in buckets.iter().enumerate() {
        if bucket.is_empty() {
            continue;
        }
        let mut density = 0.0;
        for (sample, s, weight) in mesh.samples(e) {
            let sample_volume = ball_volume(s);
            let empty = bucket.iter().fold(1.0, |empty, &i| {
                let capsule = &capsules[i];
                let d = point_segment_distance(&sample, &capsule.start, &capsule.end);
                empty * (1.0 - lens_volume(d, capsule.radius, s).volume / sample_volume)
            });
            density += weight * (1.0 - empty);
        }
        field.values[e] = density;
    }
    debug!(
        capsules = capsules.len(),
        max_density = field.max(),
        "Projected capsules"
    );
    field
}

/// Relative error between a requested volume and the projected volume:
/// `|requested − Σ density · V_element| / requested`.
///
/// The projection measures the union of the spheres, so `requested` should
/// be the union volume too. [`SphereSet::volume`] is only that for pairwise
/// disjoint spheres; overlaps make it too large and inflate the error.
///
/// # Errors
///
/// Returns [`PackingError::Validation`] if `requested` is not positive and
/// finite or the field does not match the mesh.
pub fn volume_estimation_error(mesh: &Mesh, field: &DensityField, requested: f64) -> PackingResult<f64> {
    if !requested.is_finite() || requested <= 0.0 {
        return Err(PackingError::validation(format!(
            "requested volume must be positive and finite, got {requested}"
        )));
    }
    if field.counts() != mesh.counts() {
        return Err(PackingError::validation(format!(
            "density field counts {:?} do not match mesh counts {:?}",
            field.counts(),
            mesh.counts()
        )));
    }
    let error = (requested - field.volume(mesh)).abs() / requested;
    if error > VOLUME_ERROR_WARNING {
        warn!(
            error,
            requested,
            projected = field.volume(mesh),
            "Projected volume differs from the requested volume; consider a finer mesh or kernel"
        );
    }
    Ok(error)
}
