//! Axis-aligned bounding boxes.

use nalgebra::{Point3, Vector3};

use crate::error::{PackingError, PackingResult};

/// An axis-aligned bounding box in world coordinates.
///
/// # Example
///
/// ```
/// use packing_types::Aabb;
/// use nalgebra::Point3;
///
/// let aabb = Aabb::new(Point3::new(0.0, 0.0, 0.0), Point3::new(2.0, 1.0, 1.0));
///
/// assert!(aabb.contains(&Point3::new(1.5, 0.5, 0.5)));
/// assert!(aabb.intersects_sphere(&Point3::new(3.0, 0.5, 0.5), 1.0));
/// assert!((aabb.volume() - 2.0).abs() < 1e-12);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Aabb {
    /// Minimum corner of the bounding box.
    pub min: Point3<f64>,
    /// Maximum corner of the bounding box.
    pub max: Point3<f64>,
}

impl Aabb {
    /// Creates an AABB from two corners given in any order.
    #[must_use]
    pub fn new(a: Point3<f64>, b: Point3<f64>) -> Self {
        Self {
            min: Point3::new(a.x.min(b.x), a.y.min(b.y), a.z.min(b.z)),
            max: Point3::new(a.x.max(b.x), a.y.max(b.y), a.z.max(b.z)),
        }
    }

    /// Creates an AABB from `(x_min, x_max, y_min, y_max, z_min, z_max)`.
    ///
    /// # Errors
    ///
    /// Returns [`PackingError::Configuration`] if a bound is not finite or a
    /// minimum is not strictly below its maximum.
    pub fn from_bounds(bounds: [f64; 6]) -> PackingResult<Self> {
        let [x_min, x_max, y_min, y_max, z_min, z_max] = bounds;
        if bounds.iter().any(|b| !b.is_finite()) {
            return Err(PackingError::configuration(format!(
                "bounds must be finite, got {bounds:?}"
            )));
        }
        for (axis, (lo, hi)) in ["x", "y", "z"]
            .iter()
            .zip([(x_min, x_max), (y_min, y_max), (z_min, z_max)])
        {
            if lo >= hi {
                return Err(PackingError::configuration(format!(
                    "{axis} bounds are inverted or empty: [{lo}, {hi}]"
                )));
            }
        }
        Ok(Self {
            min: Point3::new(x_min, y_min, z_min),
            max: Point3::new(x_max, y_max, z_max),
        })
    }

    /// Creates an AABB centered at a point with the given half-extents.
    #[must_use]
    pub fn from_center(center: Point3<f64>, half_extents: Vector3<f64>) -> Self {
        Self {
            min: center - half_extents,
            max: center + half_extents,
        }
    }

    /// The bounds as `(x_min, x_max, y_min, y_max, z_min, z_max)`.
    #[must_use]
    pub fn to_bounds(&self) -> [f64; 6] {
        [
            self.min.x, self.max.x, self.min.y, self.max.y, self.min.z, self.max.z,
        ]
    }

    /// Returns the center point of the AABB.
    #[must_use]
    pub fn center(&self) -> Point3<f64> {
        nalgebra::center(&self.min, &self.max)
    }

    /// Returns the full size (dimensions) of the AABB.
    #[must_use]
    pub fn size(&self) -> Vector3<f64> {
        self.max - self.min
    }

    /// Volume of the box.
    #[must_use]
    pub fn volume(&self) -> f64 {
        let size = self.size();
        size.x * size.y * size.z
    }

    /// Checks if a point is inside the AABB.
    ///
    /// Points on the boundary are considered inside.
    #[must_use]
    pub fn contains(&self, point: &Point3<f64>) -> bool {
        (0..3).all(|i| point[i] >= self.min[i] && point[i] <= self.max[i])
    }

    /// Checks if this AABB intersects a ball.
    ///
    /// Uses the closest point on the AABB to the ball center. Touching counts
    /// as intersecting.
    #[must_use]
    pub fn intersects_sphere(&self, center: &Point3<f64>, radius: f64) -> bool {
        let closest = Point3::new(
            center.x.clamp(self.min.x, self.max.x),
            center.y.clamp(self.min.y, self.max.y),
            center.z.clamp(self.min.z, self.max.z),
        );
        (closest - center).norm_squared() <= radius * radius
    }

    /// Returns the union of this AABB and another.
    #[must_use]
    pub fn union(&self, other: &Self) -> Self {
        Self {
            min: self.min.inf(&other.min),
            max: self.max.sup(&other.max),
        }
    }
}
