//! Property-based tests for density projection and aggregation.
//!
//! Run with: cargo test -p packing-projection -- proptest

#![allow(clippy::unwrap_used)]

use nalgebra::{DVector, Point3};
use packing_projection::{DensityField, Mesh, MeshKernel, aggregate, project};
use packing_types::{Aabb, SphereSet};
use proptest::prelude::*;

// =============================================================================
// Strategies
// =============================================================================

fn mesh() -> Mesh {
    let bounds = Aabb::from_bounds([0.0, 2.0, 0.0, 2.0, 0.0, 1.0]).unwrap();
    Mesh::build(bounds, 3.0, MeshKernel::mdbd_9()).unwrap()
}

fn arb_point() -> impl Strategy<Value = Point3<f64>> {
    (-0.5..2.5f64, -0.5..2.5f64, -0.5..1.5f64).prop_map(|(x, y, z)| Point3::new(x, y, z))
}

fn arb_spheres(max: usize) -> impl Strategy<Value = Vec<(Point3<f64>, f64)>> {
    prop::collection::vec((arb_point(), 0.0..0.8f64), 1..=max)
}

fn to_set(spheres: &[(Point3<f64>, f64)]) -> SphereSet {
    let (centers, radii) = spheres.iter().copied().unzip();
    SphereSet::new(centers, radii).unwrap()
}

// =============================================================================
// Projection
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Densities are occupancy fractions.
    #[test]
    fn densities_in_unit_interval(spheres in arb_spheres(6)) {
        let field = project(&mesh(), &to_set(&spheres));
        for v in field.values().iter() {
            prop_assert!((0.0..=1.0 + 1e-12).contains(v), "density {}", v);
        }
    }

    /// Adding a sphere never lowers any density.
    #[test]
    fn union_is_monotone(spheres in arb_spheres(5), extra in (arb_point(), 0.0..0.8f64)) {
        let mesh = mesh();
        let before = project(&mesh, &to_set(&spheres));
        let mut grown = spheres.clone();
        grown.push(extra);
        let after = project(&mesh, &to_set(&grown));
        for (a, b) in after.values().iter().zip(before.values().iter()) {
            prop_assert!(*a >= *b - 1e-12);
        }
    }

    /// Growing a radius never lowers any density.
    #[test]
    fn radius_is_monotone(spheres in arb_spheres(4), grow in 0.0..0.3f64) {
        let mesh = mesh();
        let before = project(&mesh, &to_set(&spheres));
        let grown: Vec<_> = spheres.iter().map(|(c, r)| (*c, r + grow)).collect();
        let after = project(&mesh, &to_set(&grown));
        for (a, b) in after.values().iter().zip(before.values().iter()) {
            prop_assert!(*a >= *b - 1e-12);
        }
    }

    /// The order of spheres does not matter.
    #[test]
    fn order_independent(spheres in arb_spheres(5)) {
        let mesh = mesh();
        let forward = project(&mesh, &to_set(&spheres));
        let reversed: Vec<_> = spheres.iter().rev().copied().collect();
        let backward = project(&mesh, &to_set(&reversed));
        for (a, b) in forward.values().iter().zip(backward.values().iter()) {
            prop_assert!((a - b).abs() < 1e-12);
        }
    }
}

// =============================================================================
// Aggregation
// =============================================================================

proptest! {
    /// The combined field respects the floor and the smooth maximum bounds it.
    #[test]
    fn aggregate_floor_and_bound(
        a in prop::collection::vec(0.0..1.0f64, 8),
        b in prop::collection::vec(0.0..1.0f64, 8),
        rho_min in 0.0..0.1f64,
    ) {
        let fa = DensityField::from_values([2, 2, 2], DVector::from_vec(a.clone())).unwrap();
        let fb = DensityField::from_values([2, 2, 2], DVector::from_vec(b.clone())).unwrap();
        let out = aggregate(&[fa, fb], rho_min, 100.0).unwrap();
        let combined = out.combined.values();
        for i in 0..8 {
            prop_assert!(combined[i] >= rho_min);
            prop_assert!((combined[i] - (a[i] + b[i]).max(rho_min)).abs() < 1e-15);
        }
        prop_assert!(out.max_density >= combined.max());
    }
}
