//! [`Differentiable`] views of a [`Layout`] for gradient-based optimizers.

use nalgebra::{DMatrix, DVector};
use packing_geometry::{Differentiable, check_input};
use packing_types::PackingResult;

use crate::layout::Layout;

/// Interference constraints as a vector function, one entry per non-empty
/// pair category.
#[derive(Debug, Clone, Copy)]
pub struct InterferenceFunction<'a> {
    layout: &'a Layout,
}

impl<'a> InterferenceFunction<'a> {
    /// Wraps `layout`.
    #[must_use]
    pub const fn new(layout: &'a Layout) -> Self {
        Self { layout }
    }
}

impl Differentiable for InterferenceFunction<'_> {
    fn input_dim(&self) -> usize {
        self.layout.design_len()
    }

    fn output_dim(&self) -> usize {
        self.layout.pairs().active_categories().len()
    }

    fn evaluate(&self, x: &DVector<f64>) -> PackingResult<DVector<f64>> {
        Ok(DVector::from_vec(self.layout.interference(x)?.values()))
    }

    fn jacobian(&self, x: &DVector<f64>) -> PackingResult<DMatrix<f64>> {
        self.layout.interference_jacobian(x)
    }
}

/// Bounding-box volume as a scalar objective.
#[derive(Debug, Clone, Copy)]
pub struct BoundingBoxVolume<'a> {
    layout: &'a Layout,
}

impl<'a> BoundingBoxVolume<'a> {
    /// Wraps `layout`.
    #[must_use]
    pub const fn new(layout: &'a Layout) -> Self {
        Self { layout }
    }
}

impl Differentiable for BoundingBoxVolume<'_> {
    fn input_dim(&self) -> usize {
        self.layout.design_len()
    }

    fn output_dim(&self) -> usize {
        1
    }

    fn evaluate(&self, x: &DVector<f64>) -> PackingResult<DVector<f64>> {
        Ok(DVector::from_element(1, self.layout.bounding_box(x)?.volume))
    }

    fn jacobian(&self, x: &DVector<f64>) -> PackingResult<DMatrix<f64>> {
        let gradient = self.layout.bounding_box_jacobian(x)?.volume;
        Ok(DMatrix::from_row_slice(1, gradient.len(), gradient.as_slice()))
    }
}

/// Every sphere center followed by every radius, in
/// [`LayoutState::spheres`](crate::LayoutState::spheres) order.
///
/// Composes with `ProjectionFunction` to differentiate density through the
/// whole layout.
#[derive(Debug, Clone, Copy)]
pub struct PlacementFunction<'a> {
    layout: &'a Layout,
    sphere_count: usize,
}

impl<'a> PlacementFunction<'a> {
    /// Wraps `layout`.
    ///
    /// # Errors
    ///
    /// Propagates placement errors at the zero design vector, used to count
    /// spheres.
    pub fn new(layout: &'a Layout) -> PackingResult<Self> {
        let zero = DVector::zeros(layout.design_len());
        let sphere_count = layout.place(&zero)?.spheres().len();
        Ok(Self {
            layout,
            sphere_count,
        })
    }

    /// Number of spheres in the placed layout.
    #[must_use]
    pub const fn sphere_count(&self) -> usize {
        self.sphere_count
    }
}

impl Differentiable for PlacementFunction<'_> {
    fn input_dim(&self) -> usize {
        self.layout.design_len()
    }

    fn output_dim(&self) -> usize {
        4 * self.sphere_count
    }

    fn evaluate(&self, x: &DVector<f64>) -> PackingResult<DVector<f64>> {
        check_input(x, self.input_dim())?;
        let spheres = self.layout.place(x)?.spheres();
        let positions = spheres.flat_positions();
        Ok(DVector::from_iterator(
            self.output_dim(),
            positions.iter().chain(spheres.radii()).copied(),
        ))
    }

    fn jacobian(&self, x: &DVector<f64>) -> PackingResult<DMatrix<f64>> {
        let parts = self.layout.position_jacobian(x)?;
        let n = self.sphere_count;
        let mut jacobian = DMatrix::zeros(4 * n, self.input_dim());
        jacobian.rows_mut(0, 3 * n).copy_from(&parts.positions);
        jacobian.rows_mut(3 * n, n).copy_from(&parts.radii);
        Ok(jacobian)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::config::PackingConfig;
    use nalgebra::Point3;
    use packing_geometry::{DerivativeConfig, validate_jacobian};
    use packing_transform::RadiusScaling;
    use packing_types::{
        Component, DofSet, Interconnect, Port, PortRef, SpatialObject, SphereSet,
    };

    /// Two components close enough to interfere, a crossing pair of hoses
    /// and a fixed block, so every pair category is present.
    fn crowded() -> Layout {
        let a = Component::new(
            SphereSet::from_rows(&[[0.0, 0.0, 0.0, 0.4], [0.5, 0.1, 0.0, 0.3]]).unwrap(),
        )
        .with_dofs(DofSet::all())
        .with_port(Port::new("p", Point3::new(0.4, 0.3, 0.1), 0.05).unwrap())
        .with_port(Port::new("q", Point3::new(-0.2, -0.3, 0.1), 0.05).unwrap());
        let b = Component::new(
            SphereSet::from_rows(&[[1.0, 0.2, 0.1, 0.35], [1.3, -0.1, 0.05, 0.25]]).unwrap(),
        )
        .with_dofs(DofSet::rigid())
        .with_port(Port::new("p", Point3::new(1.1, 0.5, 0.2), 0.05).unwrap())
        .with_port(Port::new("q", Point3::new(1.2, -0.4, -0.1), 0.05).unwrap());
        let c = Component::new(SphereSet::single(Point3::new(0.7, 0.9, -0.3), 0.3).unwrap())
            .with_dofs(DofSet::parse(&["x", "y", "z"]).unwrap());
        let upper = Interconnect::new(PortRef::named("a", "p"), PortRef::named("b", "q"), 0.08)
            .with_waypoints(1)
            .with_spheres_per_segment(2);
        let lower = Interconnect::new(PortRef::named("a", "q"), PortRef::named("b", "p"), 0.07)
            .with_waypoints(2)
            .with_spheres_per_segment(2);
        let block =
            SphereSet::from_rows(&[[0.6, -0.6, 0.2, 0.3], [0.2, 0.7, 0.4, 0.25]]).unwrap();
        let objects = vec![
            SpatialObject::component("a", a).unwrap(),
            SpatialObject::component("b", b).unwrap(),
            SpatialObject::component("c", c).unwrap(),
            SpatialObject::interconnect("upper", upper).unwrap(),
            SpatialObject::interconnect("lower", lower).unwrap(),
            SpatialObject::structure("block", block).unwrap(),
        ];
        let config = PackingConfig::default()
            .with_rho(20.0)
            .with_radius_scaling(RadiusScaling::GeometricMean);
        Layout::new(objects, config).unwrap()
    }

    fn design() -> DVector<f64> {
        DVector::from_vec(vec![
            // a: x y z rx ry rz sx sy sz
            0.03, -0.02, 0.05, 0.11, -0.07, 0.13, 1.05, 0.97, 1.02,
            // b: x y z rx ry rz
            -0.04, 0.06, -0.03, 0.09, 0.05, -0.12,
            // c: x y z
            0.05, -0.08, 0.12,
            // upper waypoint
            0.83, -0.21, 0.37,
            // lower waypoints
            0.31, 0.24, -0.18, 0.94, 0.41, 0.09,
        ])
    }

    #[test]
    fn test_every_category_present() {
        let layout = crowded();
        assert_eq!(layout.design_len(), 24);
        assert_eq!(InterferenceFunction::new(&layout).output_dim(), 4);
    }

    #[test]
    fn test_interference_jacobian_matches_fd() {
        let layout = crowded();
        let f = InterferenceFunction::new(&layout);
        let (err, loc) = validate_jacobian(&f, &design(), &DerivativeConfig::default(), 1e-3).unwrap();
        assert!(err < 1e-4, "err {err} at {loc:?}");
    }

    #[test]
    fn test_placement_jacobian_matches_fd() {
        let layout = crowded();
        let f = PlacementFunction::new(&layout).unwrap();
        assert_eq!(f.sphere_count(), 2 + 2 + 1 + 5 + 7 + 2);
        let (err, loc) = validate_jacobian(&f, &design(), &DerivativeConfig::default(), 1e-3).unwrap();
        assert!(err < 1e-5, "err {err} at {loc:?}");
    }

    #[test]
    fn test_bounding_box_gradient_matches_fd() {
        let layout = crowded();
        let f = BoundingBoxVolume::new(&layout);
        let (err, loc) = validate_jacobian(&f, &design(), &DerivativeConfig::default(), 1e-3).unwrap();
        assert!(err < 1e-5, "err {err} at {loc:?}");
    }

    #[test]
    fn test_rejects_wrong_length() {
        let layout = crowded();
        let x = DVector::zeros(23);
        assert!(InterferenceFunction::new(&layout).evaluate(&x).unwrap_err().is_validation());
        assert!(BoundingBoxVolume::new(&layout).jacobian(&x).unwrap_err().is_validation());
        let placement = PlacementFunction::new(&layout).unwrap();
        assert!(placement.evaluate(&x).unwrap_err().is_validation());
    }
}
