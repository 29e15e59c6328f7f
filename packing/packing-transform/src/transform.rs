//! Decoding design vectors into transforms and applying them to sphere sets.

use nalgebra::{DMatrix, Matrix3, Point3, Vector3};
use packing_types::{Dof, DofSet, PackingError, PackingResult, SphereSet};

use crate::rotation::{rotation_xyz, rotation_xyz_derivatives};

/// How scale DOFs affect sphere radii.
///
/// Rotation and translation never change radii. Non-uniform scale turns a
/// sphere into an ellipsoid, so any choice of scalar radius is an
/// approximation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum RadiusScaling {
    /// Radii are left unchanged.
    Fixed,
    /// Radii are multiplied by `|sx · sy · sz|^(1/3)`, preserving volume.
    #[default]
    GeometricMean,
    /// Radii are multiplied by `max(|sx|, |sy|, |sz|)`, which over-covers.
    Largest,
}

impl RadiusScaling {
    /// Radius multiplier for the given per-axis scale.
    #[must_use]
    pub fn factor(self, scale: &Vector3<f64>) -> f64 {
        match self {
            Self::Fixed => 1.0,
            Self::GeometricMean => (scale.x * scale.y * scale.z).abs().cbrt(),
            Self::Largest => scale.abs().max(),
        }
    }

    /// Gradient of [`RadiusScaling::factor`] with respect to `(sx, sy, sz)`.
    ///
    /// A zero scale component yields a zero gradient for the geometric mean.
    #[must_use]
    pub fn factor_gradient(self, scale: &Vector3<f64>) -> Vector3<f64> {
        match self {
            Self::Fixed => Vector3::zeros(),
            Self::GeometricMean => {
                let g = self.factor(scale);
                scale.map(|s| if s == 0.0 { 0.0 } else { g / (3.0 * s) })
            }
            Self::Largest => {
                let axis = scale.iamax();
                let mut gradient = Vector3::zeros();
                gradient[axis] = scale[axis].signum();
                gradient
            }
        }
    }
}

/// Derivatives of transformed sphere centers and radii.
#[derive(Debug, Clone, PartialEq)]
pub struct TransformJacobian {
    /// `∂(flattened centers)/∂x`, `3N × n_dof`.
    pub positions: DMatrix<f64>,
    /// `∂radii/∂x`, `N × n_dof`.
    pub radii: DMatrix<f64>,
}

/// A decoded design vector: translation, intrinsic x→y→z rotation and
/// per-axis scale.
///
/// A point `p` maps to `anchor + S · R · (p − anchor) + t`.
///
/// # Example
///
/// ```
/// use packing_transform::RigidTransform;
/// use packing_types::DofSet;
/// use nalgebra::Point3;
///
/// let dofs = DofSet::parse(&["x", "rz"]).unwrap();
/// let t = RigidTransform::decode(&dofs, &[1.0, std::f64::consts::FRAC_PI_2]).unwrap();
///
/// let p = t.apply_point(&Point3::new(1.0, 0.0, 0.0), &Point3::origin());
/// assert!((p - Point3::new(1.0, 1.0, 0.0)).norm() < 1e-12);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RigidTransform {
    /// Translation `(x, y, z)`.
    pub translation: Vector3<f64>,
    /// Rotation angles `(rx, ry, rz)` in radians.
    pub angles: [f64; 3],
    /// Scale `(sx, sy, sz)`.
    pub scale: Vector3<f64>,
}

impl Default for RigidTransform {
    fn default() -> Self {
        Self::identity()
    }
}

impl RigidTransform {
    /// The identity transform.
    #[must_use]
    pub fn identity() -> Self {
        Self {
            translation: Vector3::zeros(),
            angles: [0.0; 3],
            scale: Vector3::new(1.0, 1.0, 1.0),
        }
    }

    /// Decodes a design vector laid out by `dofs`.
    ///
    /// Absent translations and rotations default to `0`, absent scales to `1`.
    ///
    /// # Errors
    ///
    /// Returns [`PackingError::Validation`] if `values.len() != dofs.len()` or a
    /// value is not finite.
    pub fn decode(dofs: &DofSet, values: &[f64]) -> PackingResult<Self> {
        let full = dofs.expand(values)?;
        if let Some(v) = values.iter().find(|v| !v.is_finite()) {
            return Err(PackingError::validation(format!(
                "design vector contains non-finite value {v}"
            )));
        }
        Ok(Self {
            translation: Vector3::new(full[0], full[1], full[2]),
            angles: [full[3], full[4], full[5]],
            scale: Vector3::new(full[6], full[7], full[8]),
        })
    }

    /// Returns `true` if this transform maps every point to itself.
    #[must_use]
    pub fn is_identity(&self) -> bool {
        *self == Self::identity()
    }

    /// Rotation matrix `Rx · Ry · Rz`.
    #[must_use]
    pub fn rotation(&self) -> Matrix3<f64> {
        rotation_xyz(self.angles)
    }

    /// Linear part `S · R`.
    #[must_use]
    pub fn linear(&self) -> Matrix3<f64> {
        Matrix3::from_diagonal(&self.scale) * self.rotation()
    }

    /// Transforms a single point about `anchor`.
    #[must_use]
    pub fn apply_point(&self, p: &Point3<f64>, anchor: &Point3<f64>) -> Point3<f64> {
        anchor + self.linear() * (p - anchor) + self.translation
    }

    /// Transforms a sphere set about `anchor`.
    ///
    /// The identity transform returns an exact copy of `reference`.
    ///
    /// # Errors
    ///
    /// Returns [`PackingError::Validation`] if the result is not a valid
    /// sphere set (non-finite coordinates).
    pub fn apply(
        &self,
        reference: &SphereSet,
        anchor: &Point3<f64>,
        scaling: RadiusScaling,
    ) -> PackingResult<SphereSet> {
        if self.is_identity() {
            return Ok(reference.clone());
        }
        let linear = self.linear();
        let centers = reference
            .centers()
            .iter()
            .map(|p| anchor + linear * (p - anchor) + self.translation)
            .collect();
        let factor = scaling.factor(&self.scale);
        let radii = reference.radii().iter().map(|r| r * factor).collect();
        SphereSet::new(centers, radii)
    }

    /// `∂p'/∂x` for a single point, `3 × n_dof`.
    #[must_use]
    pub fn point_jacobian(&self, p: &Point3<f64>, anchor: &Point3<f64>, dofs: &DofSet) -> DMatrix<f64> {
        let mut jacobian = DMatrix::zeros(3, dofs.len());
        let q = p - anchor;
        let rotation = self.rotation();
        let scale = Matrix3::from_diagonal(&self.scale);
        let derivatives = if dofs.iter().any(Dof::is_rotation) {
            Some(rotation_xyz_derivatives(self.angles))
        } else {
            None
        };
        let rotated = rotation * q;

        for (col, dof) in dofs.iter().enumerate() {
            let axis = dof.axis();
            let column = if dof.is_translation() {
                Vector3::ith(axis, 1.0)
            } else if dof.is_rotation() {
                derivatives.map_or_else(Vector3::zeros, |d| scale * (d[axis] * q))
            } else {
                Vector3::ith(axis, rotated[axis])
            };
            jacobian.fixed_view_mut::<3, 1>(0, col).copy_from(&column);
        }
        jacobian
    }

    /// Derivatives of [`RigidTransform::apply`] with respect to the design
    /// vector laid out by `dofs`.
    #[must_use]
    pub fn jacobian(
        &self,
        reference: &SphereSet,
        anchor: &Point3<f64>,
        dofs: &DofSet,
        scaling: RadiusScaling,
    ) -> TransformJacobian {
        let n = reference.len();
        let mut positions = DMatrix::zeros(3 * n, dofs.len());
        for (i, p) in reference.centers().iter().enumerate() {
            positions
                .view_mut((3 * i, 0), (3, dofs.len()))
                .copy_from(&self.point_jacobian(p, anchor, dofs));
        }

        let mut radii = DMatrix::zeros(n, dofs.len());
        let factor_gradient = scaling.factor_gradient(&self.scale);
        for (col, dof) in dofs.iter().enumerate() {
            if dof.is_scale() {
                let g = factor_gradient[dof.axis()];
                for (i, r) in reference.radii().iter().enumerate() {
                    radii[(i, col)] = r * g;
                }
            }
        }
        TransformJacobian { positions, radii }
    }
}

/// Transforms `reference` by the design vector `x`, anchored at its centroid
/// with the default [`RadiusScaling`].
///
/// An empty `dofs` returns `reference` unchanged.
///
/// # Errors
///
/// Returns [`PackingError::Validation`] if `x.len() != dofs.len()`.
pub fn transform(reference: &SphereSet, x: &[f64], dofs: &DofSet) -> PackingResult<SphereSet> {
    let t = RigidTransform::decode(dofs, x)?;
    if t.is_identity() || reference.is_empty() {
        return Ok(reference.clone());
    }
    let anchor = reference.centroid().unwrap_or_else(Point3::origin);
    t.apply(reference, &anchor, RadiusScaling::default())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f64::consts::FRAC_PI_2;

    /// Three points used by the rotation examples, rotated about the first.
    fn triangle() -> SphereSet {
        SphereSet::from_rows(&[
            [2.0, 2.0, 0.0, 0.1],
            [4.0, 2.0, 0.0, 0.1],
            [4.0, 0.0, 0.0, 0.1],
        ])
        .unwrap()
    }

    fn rotate_about_first(angles: [f64; 3]) -> SphereSet {
        let set = triangle();
        let t = RigidTransform {
            angles,
            ..RigidTransform::identity()
        };
        t.apply(&set, &set.centers()[0], RadiusScaling::Fixed).unwrap()
    }

    fn assert_centers(set: &SphereSet, expected: &[[f64; 3]]) {
        for (c, e) in set.centers().iter().zip(expected) {
            assert_relative_eq!(*c, Point3::new(e[0], e[1], e[2]), epsilon = 1e-12);
        }
    }

    #[test]
    fn test_rotate_x_quarter_turn() {
        let rotated = rotate_about_first([FRAC_PI_2, 0.0, 0.0]);
        assert_centers(&rotated, &[[2.0, 2.0, 0.0], [4.0, 2.0, 0.0], [4.0, 2.0, -2.0]]);
    }

    #[test]
    fn test_rotate_y_quarter_turn() {
        let rotated = rotate_about_first([0.0, FRAC_PI_2, 0.0]);
        assert_centers(&rotated, &[[2.0, 2.0, 0.0], [2.0, 2.0, -2.0], [2.0, 0.0, -2.0]]);
    }

    #[test]
    fn test_rotate_z_quarter_turn() {
        let rotated = rotate_about_first([0.0, 0.0, FRAC_PI_2]);
        assert_centers(&rotated, &[[2.0, 2.0, 0.0], [2.0, 4.0, 0.0], [4.0, 4.0, 0.0]]);
    }

    #[test]
    fn test_rotation_preserves_radii() {
        let rotated = rotate_about_first([0.3, 0.2, 0.1]);
        assert_eq!(rotated.radii(), triangle().radii());
    }

    #[test]
    fn test_zero_vector_is_identity() {
        let set = triangle();
        let out = transform(&set, &[0.0; 6], &DofSet::rigid()).unwrap();
        assert_eq!(out, set);
        let again = transform(&out, &[0.0; 6], &DofSet::rigid()).unwrap();
        assert_eq!(again, set);
    }

    #[test]
    fn test_empty_dofs_unchanged() {
        let set = triangle();
        assert_eq!(transform(&set, &[], &DofSet::none()).unwrap(), set);
    }

    #[test]
    fn test_length_mismatch() {
        let err = transform(&triangle(), &[1.0, 2.0], &DofSet::rigid()).unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn test_translation_only() {
        let dofs = DofSet::parse(&["x", "y", "z"]).unwrap();
        let out = transform(&triangle(), &[1.0, -1.0, 0.5], &dofs).unwrap();
        assert_relative_eq!(out.centers()[2], Point3::new(5.0, -1.0, 0.5), epsilon = 1e-12);
    }

    #[test]
    fn test_scale_about_anchor() {
        let dofs = DofSet::parse(&["sx", "sy", "sz"]).unwrap();
        let t = RigidTransform::decode(&dofs, &[2.0, 2.0, 2.0]).unwrap();
        let set = triangle();
        let anchor = set.centers()[0];
        let out = t.apply(&set, &anchor, RadiusScaling::GeometricMean).unwrap();
        assert_relative_eq!(out.centers()[0], anchor, epsilon = 1e-12);
        assert_relative_eq!(out.centers()[1], Point3::new(6.0, 2.0, 0.0), epsilon = 1e-12);
        assert_relative_eq!(out.radii()[0], 0.2, epsilon = 1e-12);
    }

    #[test]
    fn test_radius_scaling_policies() {
        let scale = Vector3::new(8.0, 1.0, 1.0);
        assert_relative_eq!(RadiusScaling::Fixed.factor(&scale), 1.0);
        assert_relative_eq!(RadiusScaling::GeometricMean.factor(&scale), 2.0, epsilon = 1e-12);
        assert_relative_eq!(RadiusScaling::Largest.factor(&scale), 8.0);
        assert_relative_eq!(RadiusScaling::Largest.factor(&Vector3::new(1.0, -3.0, 2.0)), 3.0);
    }

    #[test]
    fn test_factor_gradients_match_fd() {
        let scale = Vector3::new(1.5, -0.8, 2.2);
        let h = 1e-6;
        for policy in [RadiusScaling::Fixed, RadiusScaling::GeometricMean, RadiusScaling::Largest] {
            let gradient = policy.factor_gradient(&scale);
            for axis in 0..3 {
                let mut plus = scale;
                plus[axis] += h;
                let mut minus = scale;
                minus[axis] -= h;
                let fd = (policy.factor(&plus) - policy.factor(&minus)) / (2.0 * h);
                assert_relative_eq!(fd, gradient[axis], epsilon = 1e-6);
            }
        }
    }

    #[test]
    fn test_jacobian_matches_fd() {
        let set = triangle();
        let anchor = set.centroid().unwrap();
        let dofs = DofSet::all();
        let x = [0.1, -0.2, 0.3, 0.4, -0.5, 0.6, 1.1, 0.9, 1.3];
        let t = RigidTransform::decode(&dofs, &x).unwrap();
        let jac = t.jacobian(&set, &anchor, &dofs, RadiusScaling::GeometricMean);

        let h = 1e-6;
        for col in 0..x.len() {
            let mut plus = x;
            plus[col] += h;
            let mut minus = x;
            minus[col] -= h;
            let up = RigidTransform::decode(&dofs, &plus)
                .unwrap()
                .apply(&set, &anchor, RadiusScaling::GeometricMean)
                .unwrap();
            let down = RigidTransform::decode(&dofs, &minus)
                .unwrap()
                .apply(&set, &anchor, RadiusScaling::GeometricMean)
                .unwrap();
            let fd_pos = (up.flat_positions() - down.flat_positions()) / (2.0 * h);
            for row in 0..fd_pos.len() {
                assert_relative_eq!(fd_pos[row], jac.positions[(row, col)], epsilon = 1e-6);
            }
            for i in 0..set.len() {
                let fd_r = (up.radii()[i] - down.radii()[i]) / (2.0 * h);
                assert_relative_eq!(fd_r, jac.radii[(i, col)], epsilon = 1e-6);
            }
        }
    }
}
