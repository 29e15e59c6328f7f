use nalgebra::{DMatrix, DVector, Point3};
use packing_geometry::{Differentiable, check_input};
use packing_types::{Anchor, DofSet, PackingResult, SphereSet};

use crate::transform::{RadiusScaling, RigidTransform};

/// The transform of one sphere set as a [`Differentiable`] map.
///
/// The output is the flattened transformed centers followed by the radii,
/// `4N` values in total.
#[derive(Debug, Clone)]
pub struct TransformFunction {
    reference: SphereSet,
    anchor: Point3<f64>,
    dofs: DofSet,
    scaling: RadiusScaling,
}

impl TransformFunction {
    /// Creates the map for `reference` with the given anchor, DOFs and policy.
    ///
    /// # Errors
    ///
    /// Returns an error if the anchor cannot be resolved.
    pub fn new(
        reference: SphereSet,
        anchor: &Anchor,
        dofs: DofSet,
        scaling: RadiusScaling,
    ) -> PackingResult<Self> {
        let anchor = anchor.resolve(&reference)?;
        Ok(Self {
            reference,
            anchor,
            dofs,
            scaling,
        })
    }

    /// Transformed sphere set at `x`.
    ///
    /// # Errors
    ///
    /// Returns a validation error on a length mismatch.
    pub fn spheres(&self, x: &DVector<f64>) -> PackingResult<SphereSet> {
        RigidTransform::decode(&self.dofs, x.as_slice())?.apply(
            &self.reference,
            &self.anchor,
            self.scaling,
        )
    }
}

impl Differentiable for TransformFunction {
    fn input_dim(&self) -> usize {
        self.dofs.len()
    }

    fn output_dim(&self) -> usize {
        4 * self.reference.len()
    }

    fn evaluate(&self, x: &DVector<f64>) -> PackingResult<DVector<f64>> {
        check_input(x, self.input_dim())?;
        let spheres = self.spheres(x)?;
        let positions = spheres.flat_positions();
        Ok(DVector::from_iterator(
            self.output_dim(),
            positions.iter().chain(spheres.radii()).copied(),
        ))
    }

    fn jacobian(&self, x: &DVector<f64>) -> PackingResult<DMatrix<f64>> {
        check_input(x, self.input_dim())?;
        let t = RigidTransform::decode(&self.dofs, x.as_slice())?;
        let parts = t.jacobian(&self.reference, &self.anchor, &self.dofs, self.scaling);
        let n = self.reference.len();
        let mut jacobian = DMatrix::zeros(4 * n, self.dofs.len());
        jacobian.rows_mut(0, 3 * n).copy_from(&parts.positions);
        jacobian.rows_mut(3 * n, n).copy_from(&parts.radii);
        Ok(jacobian)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use packing_geometry::{DerivativeConfig, validate_jacobian};

    #[test]
    fn test_analytic_matches_fd_for_every_policy() {
        let reference = SphereSet::from_rows(&[
            [0.0, 0.0, 0.0, 0.5],
            [1.0, 0.5, -0.2, 0.25],
            [0.3, -1.0, 0.7, 0.4],
        ])
        .unwrap();
        let x = DVector::from_vec(vec![0.2, 0.1, -0.3, 0.5, -0.4, 0.9, 1.2, 0.7, 1.6]);
        for scaling in [RadiusScaling::Fixed, RadiusScaling::GeometricMean, RadiusScaling::Largest] {
            let f = TransformFunction::new(reference.clone(), &Anchor::Centroid, DofSet::all(), scaling)
                .unwrap();
            let (err, loc) = validate_jacobian(&f, &x, &DerivativeConfig::default(), 1e-3).unwrap();
            assert!(err < 1e-5, "{scaling:?}: err {err} at {loc:?}");
        }
    }

    #[test]
    fn test_output_layout() {
        let reference = SphereSet::from_rows(&[[1.0, 2.0, 3.0, 0.5]]).unwrap();
        let dofs = DofSet::parse(&["x"]).unwrap();
        let f = TransformFunction::new(reference, &Anchor::FirstSphere, dofs, RadiusScaling::Fixed).unwrap();
        let out = f.evaluate(&DVector::from_vec(vec![1.0])).unwrap();
        assert_eq!(out.as_slice(), &[2.0, 2.0, 3.0, 0.5]);
    }
}
