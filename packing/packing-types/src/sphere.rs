//! Sphere sets: the occupied volume of an object as a union of balls.

use std::f64::consts::PI;

use nalgebra::{DVector, Point3, Vector3};

use crate::bounds::Aabb;
use crate::error::{PackingError, PackingResult};

/// Volume of a ball of the given radius.
#[inline]
#[must_use]
pub fn ball_volume(radius: f64) -> f64 {
    4.0 / 3.0 * PI * radius * radius * radius
}

/// An ordered set of spheres.
///
/// Centers and radii are stored as parallel arrays. Construction validates
/// that both have the same length, that every coordinate is finite and that
/// every radius is finite and non-negative.
///
/// # Example
///
/// ```
/// use packing_types::SphereSet;
/// use nalgebra::Point3;
///
/// let spheres = SphereSet::new(
///     vec![Point3::new(0.0, 0.0, 0.0), Point3::new(2.0, 0.0, 0.0)],
///     vec![0.5, 0.5],
/// ).unwrap();
///
/// assert_eq!(spheres.len(), 2);
/// assert_eq!(spheres.centroid(), Some(Point3::new(1.0, 0.0, 0.0)));
/// ```
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SphereSet {
    centers: Vec<Point3<f64>>,
    radii: Vec<f64>,
}

impl SphereSet {
    /// Creates a sphere set from parallel center and radius arrays.
    ///
    /// # Errors
    ///
    /// Returns [`PackingError::Validation`] if the lengths differ, a
    /// coordinate is not finite, or a radius is negative or not finite.
    pub fn new(centers: Vec<Point3<f64>>, radii: Vec<f64>) -> PackingResult<Self> {
        if centers.len() != radii.len() {
            return Err(PackingError::validation(format!(
                "sphere set has {} centers but {} radii",
                centers.len(),
                radii.len()
            )));
        }
        if let Some(i) = centers
            .iter()
            .position(|c| !(c.x.is_finite() && c.y.is_finite() && c.z.is_finite()))
        {
            return Err(PackingError::validation(format!(
                "sphere {i} has a non-finite center"
            )));
        }
        if let Some(i) = radii.iter().position(|r| !r.is_finite() || *r < 0.0) {
            return Err(PackingError::validation(format!(
                "sphere {i} has invalid radius {}",
                radii[i]
            )));
        }
        Ok(Self { centers, radii })
    }

    /// Creates a sphere set from arrays already known to be valid.
    ///
    /// The caller guarantees what [`SphereSet::new`] checks: equal lengths,
    /// finite coordinates and finite non-negative radii.
    ///
    /// # Panics
    ///
    /// In debug builds, if the arrays fail those checks.
    #[must_use]
    pub fn new_unchecked(centers: Vec<Point3<f64>>, radii: Vec<f64>) -> Self {
        debug_assert_eq!(centers.len(), radii.len());
        debug_assert!(
            centers
                .iter()
                .all(|c| c.x.is_finite() && c.y.is_finite() && c.z.is_finite())
        );
        debug_assert!(radii.iter().all(|r| r.is_finite() && *r >= 0.0));
        Self { centers, radii }
    }

    /// Creates an empty sphere set.
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            centers: Vec::new(),
            radii: Vec::new(),
        }
    }

    /// Creates a set holding a single sphere.
    ///
    /// # Errors
    ///
    /// Returns [`PackingError::Validation`] for a non-finite center or an
    /// invalid radius.
    pub fn single(center: Point3<f64>, radius: f64) -> PackingResult<Self> {
        Self::new(vec![center], vec![radius])
    }

    /// Creates a sphere set from `[x, y, z, r]` rows.
    ///
    /// # Errors
    ///
    /// Same as [`SphereSet::new`].
    pub fn from_rows(rows: &[[f64; 4]]) -> PackingResult<Self> {
        let centers = rows.iter().map(|r| Point3::new(r[0], r[1], r[2])).collect();
        let radii = rows.iter().map(|r| r[3]).collect();
        Self::new(centers, radii)
    }

    /// Creates a sphere set from a flat `[x0, y0, z0, x1, ...]` position vector.
    ///
    /// # Errors
    ///
    /// Returns [`PackingError::Validation`] if `positions.len() != 3 * radii.len()`
    /// or the values are invalid.
    pub fn from_flat(positions: &DVector<f64>, radii: Vec<f64>) -> PackingResult<Self> {
        if positions.len() != 3 * radii.len() {
            return Err(PackingError::validation(format!(
                "flat position vector has {} entries, expected {}",
                positions.len(),
                3 * radii.len()
            )));
        }
        let centers = positions
            .as_slice()
            .chunks_exact(3)
            .map(|c| Point3::new(c[0], c[1], c[2]))
            .collect();
        Self::new(centers, radii)
    }

    /// Concatenates several sphere sets in order.
    #[must_use]
    pub fn concat<'a>(sets: impl IntoIterator<Item = &'a Self>) -> Self {
        let mut centers = Vec::new();
        let mut radii = Vec::new();
        for set in sets {
            centers.extend_from_slice(&set.centers);
            radii.extend_from_slice(&set.radii);
        }
        Self { centers, radii }
    }

    /// Number of spheres.
    #[must_use]
    pub fn len(&self) -> usize {
        self.centers.len()
    }

    /// Returns `true` if the set has no spheres.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.centers.is_empty()
    }

    /// Sphere centers.
    #[must_use]
    pub fn centers(&self) -> &[Point3<f64>] {
        &self.centers
    }

    /// Sphere radii.
    #[must_use]
    pub fn radii(&self) -> &[f64] {
        &self.radii
    }

    /// Iterates over `(center, radius)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&Point3<f64>, f64)> {
        self.centers.iter().zip(self.radii.iter().copied())
    }

    /// Mean of the sphere centers, or `None` for an empty set.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn centroid(&self) -> Option<Point3<f64>> {
        if self.centers.is_empty() {
            return None;
        }
        let sum = self
            .centers
            .iter()
            .fold(Vector3::zeros(), |acc, c| acc + c.coords);
        Some(Point3::from(sum / self.centers.len() as f64))
    }

    /// Sum of the ball volumes.
    ///
    /// Equals the volume of the union only when the balls are pairwise
    /// disjoint. Overlapping balls are counted once each, so for an
    /// overlapping decomposition this overestimates the occupied volume.
    #[must_use]
    pub fn volume(&self) -> f64 {
        self.radii.iter().map(|r| ball_volume(*r)).sum()
    }

    /// Axis-aligned bounds of the union, or `None` if empty.
    #[must_use]
    pub fn bounds(&self) -> Option<Aabb> {
        let mut iter = self.iter();
        let (c0, r0) = iter.next()?;
        let half = Vector3::repeat(r0);
        let mut aabb = Aabb::from_center(*c0, half);
        for (c, r) in iter {
            aabb = aabb.union(&Aabb::from_center(*c, Vector3::repeat(r)));
        }
        Some(aabb)
    }

    /// Largest radius, or `0.0` for an empty set.
    #[must_use]
    pub fn max_radius(&self) -> f64 {
        self.radii.iter().copied().fold(0.0, f64::max)
    }

    /// Flattens the centers to `[x0, y0, z0, x1, ...]`.
    #[must_use]
    pub fn flat_positions(&self) -> DVector<f64> {
        DVector::from_iterator(
            3 * self.centers.len(),
            self.centers.iter().flat_map(|c| [c.x, c.y, c.z]),
        )
    }

    /// Returns `true` if every center and radius is within `epsilon` of `other`.
    #[must_use]
    pub fn approx_eq(&self, other: &Self, epsilon: f64) -> bool {
        self.len() == other.len()
            && self
                .iter()
                .zip(other.iter())
                .all(|((ca, ra), (cb, rb))| (ca - cb).norm() <= epsilon && (ra - rb).abs() <= epsilon)
    }
}
