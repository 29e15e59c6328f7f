//! Signed distances between spheres and capsules.
//!
//! All *gap* quantities are positive when the shapes are separated, zero when
//! tangent and negative when they overlap. *Interference* is the negated gap
//! (penetration depth) and is what the constraint layer aggregates.
//!
//! A sphere is treated as a capsule whose two endpoints coincide, so one
//! segment-segment routine serves sphere-sphere, sphere-capsule and
//! capsule-capsule queries.

use nalgebra::{DMatrix, DVector, Point3, Vector3};
use packing_types::{PackingError, PackingResult, SphereSet, ensure_finite};

use crate::aggregate::ks_max_with_gradient;

/// Squared-length threshold below which a segment is treated as a point.
pub const GEOM_EPSILON: f64 = 1e-10;

/// A line segment swept by a ball.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Capsule {
    /// First endpoint of the core segment.
    pub start: Point3<f64>,
    /// Second endpoint of the core segment.
    pub end: Point3<f64>,
    /// Radius of the swept ball.
    pub radius: f64,
}

impl Capsule {
    /// Creates a capsule.
    #[must_use]
    pub const fn new(start: Point3<f64>, end: Point3<f64>, radius: f64) -> Self {
        Self { start, end, radius }
    }

    /// A sphere as a zero-length capsule.
    #[must_use]
    pub const fn sphere(center: Point3<f64>, radius: f64) -> Self {
        Self {
            start: center,
            end: center,
            radius,
        }
    }

    /// Length of the core segment.
    #[must_use]
    pub fn length(&self) -> f64 {
        (self.end - self.start).norm()
    }
}

/// Closest points between two segments and their segment parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SegmentClosestPoints {
    /// Closest point on the first segment.
    pub first: Point3<f64>,
    /// Closest point on the second segment.
    pub second: Point3<f64>,
    /// Parameter of `first` along the first segment, in `[0, 1]`.
    pub s: f64,
    /// Parameter of `second` along the second segment, in `[0, 1]`.
    pub t: f64,
}

/// Gradient of a gap with respect to one capsule's parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CapsuleGradient {
    /// Derivative with respect to the start point.
    pub start: Vector3<f64>,
    /// Derivative with respect to the end point.
    pub end: Vector3<f64>,
    /// Derivative with respect to the radius.
    pub radius: f64,
}

/// A capsule-capsule gap with its analytic gradient.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CapsuleGap {
    /// Surface gap: core-segment distance minus both radii.
    pub gap: f64,
    /// Gradient with respect to the first capsule.
    pub first: CapsuleGradient,
    /// Gradient with respect to the second capsule.
    pub second: CapsuleGradient,
}

/// Closest point to `p` on segment `a`–`b` and its parameter.
///
/// A zero-length segment returns `a` with parameter `0`.
#[must_use]
pub fn closest_point_on_segment(
    p: &Point3<f64>,
    a: &Point3<f64>,
    b: &Point3<f64>,
) -> (Point3<f64>, f64) {
    let ab = b - a;
    let len_sq = ab.norm_squared();
    if len_sq < GEOM_EPSILON {
        return (*a, 0.0);
    }
    let t = ((p - a).dot(&ab) / len_sq).clamp(0.0, 1.0);
    (a + ab * t, t)
}

/// Distance from `p` to segment `a`–`b`.
#[must_use]
pub fn point_segment_distance(p: &Point3<f64>, a: &Point3<f64>, b: &Point3<f64>) -> f64 {
    let (closest, _) = closest_point_on_segment(p, a, b);
    (p - closest).norm()
}

/// Closest points between segments `p1`–`q1` and `p2`–`q2`.
///
/// Handles zero-length and parallel segments without dividing by zero.
#[must_use]
pub fn closest_points_segments(
    p1: &Point3<f64>,
    q1: &Point3<f64>,
    p2: &Point3<f64>,
    q2: &Point3<f64>,
) -> SegmentClosestPoints {
    let d1 = q1 - p1;
    let d2 = q2 - p2;
    let r = p1 - p2;

    let a = d1.dot(&d1);
    let e = d2.dot(&d2);
    let f = d2.dot(&r);

    let (s, t) = if a < GEOM_EPSILON && e < GEOM_EPSILON {
        (0.0, 0.0)
    } else if a < GEOM_EPSILON {
        (0.0, (f / e).clamp(0.0, 1.0))
    } else if e < GEOM_EPSILON {
        ((-d1.dot(&r) / a).clamp(0.0, 1.0), 0.0)
    } else {
        let b = d1.dot(&d2);
        let c = d1.dot(&r);
        // Determinant of the 2x2 system: a*e - b²
        #[allow(clippy::suspicious_operation_groupings)]
        let denom = a * e - b * b;

        let (mut s, mut t) = if denom.abs() < GEOM_EPSILON {
            (0.0, f / e)
        } else {
            let s = (b * f - c * e) / denom;
            (s, (b * s + f) / e)
        };

        if s < 0.0 {
            s = 0.0;
            t = (f / e).clamp(0.0, 1.0);
        } else if s > 1.0 {
            s = 1.0;
            t = ((b + f) / e).clamp(0.0, 1.0);
        }

        if t < 0.0 {
            t = 0.0;
            s = (-c / a).clamp(0.0, 1.0);
        } else if t > 1.0 {
            t = 1.0;
            s = ((b - c) / a).clamp(0.0, 1.0);
        }
        (s, t)
    };

    SegmentClosestPoints {
        first: p1 + d1 * s,
        second: p2 + d2 * t,
        s,
        t,
    }
}

/// Surface gap between capsule `a`–`b` (radius `r_ab`) and capsule `c`–`d`
/// (radius `r_cd`).
///
/// Positive when separated, zero when tangent, negative when overlapping.
///
/// # Example
///
/// ```
/// use packing_geometry::capsule_capsule_distance;
/// use nalgebra::Point3;
///
/// let gap = capsule_capsule_distance(
///     &Point3::new(0.0, 0.0, 0.0), &Point3::new(1.0, 0.0, 0.0), 0.5,
///     &Point3::new(0.0, 2.0, 0.0), &Point3::new(1.0, 2.0, 0.0), 0.5,
/// );
/// assert!((gap - 1.0).abs() < 1e-12);
/// ```
#[must_use]
pub fn capsule_capsule_distance(
    a: &Point3<f64>,
    b: &Point3<f64>,
    r_ab: f64,
    c: &Point3<f64>,
    d: &Point3<f64>,
    r_cd: f64,
) -> f64 {
    let closest = closest_points_segments(a, b, c, d);
    (closest.first - closest.second).norm() - (r_ab + r_cd)
}

/// Surface gap between two capsules with its gradient.
///
/// The gradient follows from the closest-point parameters: moving an
/// endpoint shifts the closest point by the matching barycentric weight.
/// When the core segments intersect the gap is not differentiable and a zero
/// endpoint gradient is returned.
#[must_use]
pub fn capsule_capsule_gap(first: &Capsule, second: &Capsule) -> CapsuleGap {
    let closest = closest_points_segments(&first.start, &first.end, &second.start, &second.end);
    let delta = closest.first - closest.second;
    let distance = delta.norm();
    let normal = if distance > GEOM_EPSILON {
        delta / distance
    } else {
        Vector3::zeros()
    };
    CapsuleGap {
        gap: distance - first.radius - second.radius,
        first: CapsuleGradient {
            start: normal * (1.0 - closest.s),
            end: normal * closest.s,
            radius: -1.0,
        },
        second: CapsuleGradient {
            start: -normal * (1.0 - closest.t),
            end: -normal * closest.t,
            radius: -1.0,
        },
    }
}

/// Full matrix of sphere-sphere gaps, `gaps[(i, j)] = |aᵢ − bⱼ| − (rᵢ + rⱼ)`.
#[must_use]
pub fn sphere_sphere_gaps(a: &SphereSet, b: &SphereSet) -> DMatrix<f64> {
    DMatrix::from_fn(a.len(), b.len(), |i, j| {
        (a.centers()[i] - b.centers()[j]).norm() - (a.radii()[i] + b.radii()[j])
    })
}

/// Minimum surface gap between any sphere of `a` and any sphere of `b`.
///
/// # Errors
///
/// Returns [`PackingError::Validation`] if either set is empty and
/// [`PackingError::GeometryDegeneracy`] if the result is not finite.
///
/// # Example
///
/// ```
/// use packing_geometry::sphere_sphere_min_distance;
/// use packing_types::SphereSet;
///
/// let a = SphereSet::from_rows(&[[0.0, 0.0, 0.0, 1.0]]).unwrap();
/// let b = SphereSet::from_rows(&[[3.0, 0.0, 0.0, 1.0], [1.5, 0.0, 0.0, 1.0]]).unwrap();
/// let gap = sphere_sphere_min_distance(&a, &b).unwrap();
/// assert!((gap + 0.5).abs() < 1e-12);
/// ```
pub fn sphere_sphere_min_distance(a: &SphereSet, b: &SphereSet) -> PackingResult<f64> {
    if a.is_empty() || b.is_empty() {
        return Err(PackingError::validation(
            "minimum distance requires two non-empty sphere sets",
        ));
    }
    let min = sphere_sphere_gaps(a, b).min();
    ensure_finite(min, "sphere-sphere minimum distance")
}

/// KS-aggregated interference between two sphere sets with its gradient.
#[derive(Debug, Clone, PartialEq)]
pub struct SphereInterference {
    /// Smooth maximum of the pairwise penetration depths.
    pub value: f64,
    /// Derivative with respect to the flattened centers of the first set.
    pub d_positions_a: DVector<f64>,
    /// Derivative with respect to the radii of the first set.
    pub d_radii_a: DVector<f64>,
    /// Derivative with respect to the flattened centers of the second set.
    pub d_positions_b: DVector<f64>,
    /// Derivative with respect to the radii of the second set.
    pub d_radii_b: DVector<f64>,
}

/// Smooth maximum penetration between two sphere sets.
///
/// Positive when the sets collide. Coincident centers contribute no position
/// gradient.
///
/// # Errors
///
/// Returns [`PackingError::Validation`] for an empty set or invalid `rho` and
/// [`PackingError::GeometryDegeneracy`] for a non-finite result.
pub fn sphere_sphere_interference(
    a: &SphereSet,
    b: &SphereSet,
    rho: f64,
) -> PackingResult<SphereInterference> {
    if a.is_empty() || b.is_empty() {
        return Err(PackingError::validation(
            "interference requires two non-empty sphere sets",
        ));
    }
    let (na, nb) = (a.len(), b.len());
    let mut penetrations = Vec::with_capacity(na * nb);
    let mut normals = Vec::with_capacity(na * nb);
    for (ca, ra) in a.iter() {
        for (cb, rb) in b.iter() {
            let delta = ca - cb;
            let distance = delta.norm();
            penetrations.push(ra + rb - distance);
            normals.push(if distance > GEOM_EPSILON {
                delta / distance
            } else {
                Vector3::zeros()
            });
        }
    }

    let (value, weights) = ks_max_with_gradient(&penetrations, rho)?;
    let value = ensure_finite(value, "sphere-sphere interference")?;

    let mut d_positions_a = DVector::zeros(3 * na);
    let mut d_radii_a = DVector::zeros(na);
    let mut d_positions_b = DVector::zeros(3 * nb);
    let mut d_radii_b = DVector::zeros(nb);
    for i in 0..na {
        for j in 0..nb {
            let k = i * nb + j;
            let w = weights[k];
            let n = normals[k] * w;
            for axis in 0..3 {
                d_positions_a[3 * i + axis] -= n[axis];
                d_positions_b[3 * j + axis] += n[axis];
            }
            d_radii_a[i] += w;
            d_radii_b[j] += w;
        }
    }

    Ok(SphereInterference {
        value,
        d_positions_a,
        d_radii_a,
        d_positions_b,
        d_radii_b,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn p(x: f64, y: f64, z: f64) -> Point3<f64> {
        Point3::new(x, y, z)
    }

    #[test]
    fn test_capsules_tangent() {
        let gap = capsule_capsule_distance(
            &p(0.0, 0.0, 0.0),
            &p(1.0, 0.0, 0.0),
            0.5,
            &p(0.0, 1.0, 0.0),
            &p(1.0, 1.0, 0.0),
            0.5,
        );
        assert_relative_eq!(gap, 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_capsules_separated_by_one() {
        let gap = capsule_capsule_distance(
            &p(0.0, 0.0, 0.0),
            &p(1.0, 0.0, 0.0),
            0.5,
            &p(0.0, 2.0, 0.0),
            &p(1.0, 2.0, 0.0),
            0.5,
        );
        assert_relative_eq!(gap, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_capsules_offset_along_z() {
        let lower = Capsule::new(p(0.0, 0.0, 0.0), p(1.0, 0.0, 0.0), 0.5);
        for (z, expected) in [(1.0, 0.0), (2.0, 1.0)] {
            let upper = Capsule::new(p(0.0, 0.0, z), p(1.0, 0.0, z), 0.5);
            let gap = capsule_capsule_distance(
                &lower.start,
                &lower.end,
                lower.radius,
                &upper.start,
                &upper.end,
                upper.radius,
            );
            assert_relative_eq!(gap, expected, epsilon = 1e-12);

            let with_gradient = capsule_capsule_gap(&lower, &upper);
            assert_relative_eq!(with_gradient.gap, expected, epsilon = 1e-12);
            // Lifting either end of the lower capsule closes the gap.
            let lift = with_gradient.first.start + with_gradient.first.end;
            assert_relative_eq!(lift, Vector3::new(0.0, 0.0, -1.0), epsilon = 1e-12);
        }
    }

    #[test]
    fn test_identical_capsules_overlap() {
        let gap = capsule_capsule_distance(
            &p(0.0, 0.0, 0.0),
            &p(1.0, 0.0, 0.0),
            0.5,
            &p(0.0, 0.0, 0.0),
            &p(1.0, 0.0, 0.0),
            0.5,
        );
        assert_relative_eq!(gap, -1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_crossing_segments() {
        let closest =
            closest_points_segments(&p(-1.0, 0.0, 0.0), &p(1.0, 0.0, 0.0), &p(0.0, -1.0, 1.0), &p(0.0, 1.0, 1.0));
        assert_relative_eq!(closest.s, 0.5, epsilon = 1e-12);
        assert_relative_eq!(closest.t, 0.5, epsilon = 1e-12);
        assert_relative_eq!((closest.first - closest.second).norm(), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_degenerate_segments() {
        let both = closest_points_segments(&p(0.0, 0.0, 0.0), &p(0.0, 0.0, 0.0), &p(3.0, 4.0, 0.0), &p(3.0, 4.0, 0.0));
        assert_relative_eq!((both.first - both.second).norm(), 5.0);

        let first_point =
            closest_points_segments(&p(0.5, 1.0, 0.0), &p(0.5, 1.0, 0.0), &p(0.0, 0.0, 0.0), &p(1.0, 0.0, 0.0));
        assert_relative_eq!(first_point.t, 0.5);
        assert_relative_eq!((first_point.first - first_point.second).norm(), 1.0);

        let second_point =
            closest_points_segments(&p(0.0, 0.0, 0.0), &p(2.0, 0.0, 0.0), &p(5.0, 0.0, 0.0), &p(5.0, 0.0, 0.0));
        assert_relative_eq!(second_point.s, 1.0);
    }

    #[test]
    fn test_parallel_offset_segments() {
        let closest =
            closest_points_segments(&p(0.0, 0.0, 0.0), &p(1.0, 0.0, 0.0), &p(2.0, 1.0, 0.0), &p(3.0, 1.0, 0.0));
        assert_relative_eq!((closest.first - closest.second).norm(), 2.0_f64.sqrt(), epsilon = 1e-12);
    }

    #[test]
    fn test_point_segment_distance() {
        assert_relative_eq!(point_segment_distance(&p(0.5, 2.0, 0.0), &p(0.0, 0.0, 0.0), &p(1.0, 0.0, 0.0)), 2.0);
        assert_relative_eq!(point_segment_distance(&p(-3.0, 4.0, 0.0), &p(0.0, 0.0, 0.0), &p(1.0, 0.0, 0.0)), 5.0);
        assert_relative_eq!(point_segment_distance(&p(0.0, 1.0, 0.0), &p(0.0, 0.0, 0.0), &p(0.0, 0.0, 0.0)), 1.0);
    }

    #[test]
    fn test_capsule_gap_gradient_matches_fd() {
        let first = Capsule::new(p(0.0, 0.0, 0.0), p(1.0, 0.2, 0.0), 0.3);
        let second = Capsule::new(p(0.3, 1.5, -0.4), p(0.6, 1.2, 0.7), 0.2);
        let gap = capsule_capsule_gap(&first, &second);
        let h = 1e-6;
        for axis in 0..3 {
            let mut moved = first;
            moved.end[axis] += h;
            let plus = capsule_capsule_gap(&moved, &second).gap;
            moved.end[axis] -= 2.0 * h;
            let minus = capsule_capsule_gap(&moved, &second).gap;
            assert_relative_eq!((plus - minus) / (2.0 * h), gap.first.end[axis], epsilon = 1e-6);

            let mut moved = second;
            moved.start[axis] += h;
            let plus = capsule_capsule_gap(&first, &moved).gap;
            moved.start[axis] -= 2.0 * h;
            let minus = capsule_capsule_gap(&first, &moved).gap;
            assert_relative_eq!((plus - minus) / (2.0 * h), gap.second.start[axis], epsilon = 1e-6);
        }
        assert_relative_eq!(gap.first.radius, -1.0);
    }

    #[test]
    fn test_sphere_as_capsule() {
        let gap = capsule_capsule_gap(&Capsule::sphere(p(0.0, 0.0, 0.0), 1.0), &Capsule::sphere(p(3.0, 0.0, 0.0), 0.5));
        assert_relative_eq!(gap.gap, 1.5);
        assert_relative_eq!(gap.first.start.x, -1.0);
        assert_relative_eq!(gap.second.start.x, 1.0);
    }

    #[test]
    fn test_gap_matrix_and_min() {
        let a = SphereSet::from_rows(&[[0.0, 0.0, 0.0, 0.5], [0.0, 0.0, 10.0, 0.5]]).unwrap();
        let b = SphereSet::from_rows(&[[2.0, 0.0, 0.0, 0.5]]).unwrap();
        let gaps = sphere_sphere_gaps(&a, &b);
        assert_eq!(gaps.shape(), (2, 1));
        assert_relative_eq!(gaps[(0, 0)], 1.0);
        assert_relative_eq!(sphere_sphere_min_distance(&a, &b).unwrap(), 1.0);
        assert_relative_eq!(
            sphere_sphere_min_distance(&a, &b).unwrap(),
            sphere_sphere_min_distance(&b, &a).unwrap()
        );
    }

    #[test]
    fn test_min_distance_empty() {
        let a = SphereSet::from_rows(&[[0.0, 0.0, 0.0, 0.5]]).unwrap();
        assert!(sphere_sphere_min_distance(&a, &SphereSet::empty()).unwrap_err().is_validation());
    }

    #[test]
    fn test_interference_sign_and_gradient() {
        let a = SphereSet::from_rows(&[[0.0, 0.0, 0.0, 1.0]]).unwrap();
        let b = SphereSet::from_rows(&[[1.5, 0.0, 0.0, 1.0]]).unwrap();
        let result = sphere_sphere_interference(&a, &b, 100.0).unwrap();
        assert_relative_eq!(result.value, 0.5, epsilon = 1e-12);
        assert_relative_eq!(result.d_positions_a[0], 1.0, epsilon = 1e-12);
        assert_relative_eq!(result.d_positions_b[0], -1.0, epsilon = 1e-12);
        assert_relative_eq!(result.d_radii_a[0], 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_interference_coincident_centers() {
        let a = SphereSet::from_rows(&[[1.0, 1.0, 1.0, 0.5]]).unwrap();
        let result = sphere_sphere_interference(&a, &a, 10.0).unwrap();
        assert_relative_eq!(result.value, 1.0, epsilon = 1e-12);
        assert!(result.d_positions_a.iter().all(|g| g.abs() < 1e-12));
    }
}
