use nalgebra::{DMatrix, DVector, Point3};
use packing_geometry::{Differentiable, check_input};
use packing_types::{PackingResult, SphereSet};

use crate::mesh::Mesh;
use crate::project::{project, project_with_jacobian};

/// Projection of a fixed number of spheres as a [`Differentiable`] map.
///
/// The input is the flattened centers followed by the radii (`4N` values,
/// the layout produced by `TransformFunction`); the output is one density
/// per mesh element.
#[derive(Debug, Clone, Copy)]
pub struct ProjectionFunction<'a> {
    mesh: &'a Mesh,
    sphere_count: usize,
}

impl<'a> ProjectionFunction<'a> {
    /// Creates the map for `sphere_count` spheres on `mesh`.
    #[must_use]
    pub const fn new(mesh: &'a Mesh, sphere_count: usize) -> Self {
        Self { mesh, sphere_count }
    }

    fn spheres(&self, x: &DVector<f64>) -> PackingResult<SphereSet> {
        check_input(x, self.input_dim())?;
        let n = self.sphere_count;
        let centers = (0..n)
            .map(|i| Point3::new(x[3 * i], x[3 * i + 1], x[3 * i + 2]))
            .collect();
        let radii = x.rows(3 * n, n).iter().copied().collect();
        SphereSet::new(centers, radii)
    }
}

impl Differentiable for ProjectionFunction<'_> {
    fn input_dim(&self) -> usize {
        4 * self.sphere_count
    }

    fn output_dim(&self) -> usize {
        self.mesh.element_count()
    }

    fn evaluate(&self, x: &DVector<f64>) -> PackingResult<DVector<f64>> {
        let spheres = self.spheres(x)?;
        Ok(project(self.mesh, &spheres).values().clone())
    }

    fn jacobian(&self, x: &DVector<f64>) -> PackingResult<DMatrix<f64>> {
        let spheres = self.spheres(x)?;
        let (_, parts) = project_with_jacobian(self.mesh, &spheres);
        let n = self.sphere_count;
        let mut jacobian = DMatrix::zeros(self.output_dim(), 4 * n);
        jacobian.columns_mut(0, 3 * n).copy_from(&parts.positions);
        jacobian.columns_mut(3 * n, n).copy_from(&parts.radii);
        Ok(jacobian)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::kernel::MeshKernel;
    use packing_geometry::{DerivativeConfig, validate_jacobian};
    use packing_types::Aabb;

    #[test]
    fn test_analytic_matches_fd() {
        let bounds = Aabb::from_bounds([0.0, 1.0, 0.0, 1.0, 0.0, 1.5]).unwrap();
        let mesh = Mesh::build(bounds, 2.0, MeshKernel::mdbd_9()).unwrap();
        let spheres = SphereSet::from_rows(&[
            [0.41, 0.47, 0.52, 0.3],
            [0.63, 0.52, 0.58, 0.22],
            [0.3, 0.7, 1.1, 0.18],
        ])
        .unwrap();
        let x = DVector::from_iterator(
            12,
            spheres
                .flat_positions()
                .iter()
                .chain(spheres.radii())
                .copied(),
        );
        let f = ProjectionFunction::new(&mesh, 3);
        assert_eq!(f.output_dim(), 12);
        let (err, loc) = validate_jacobian(&f, &x, &DerivativeConfig::default(), 1e-3).unwrap();
        assert!(err < 1e-5, "err {err} at {loc:?}");
    }

    #[test]
    fn test_rejects_wrong_length() {
        let bounds = Aabb::from_bounds([0.0, 1.0, 0.0, 1.0, 0.0, 1.0]).unwrap();
        let mesh = Mesh::build(bounds, 1.0, MeshKernel::mdbd_1()).unwrap();
        let f = ProjectionFunction::new(&mesh, 2);
        assert!(f.evaluate(&DVector::zeros(7)).unwrap_err().is_validation());
    }
}
