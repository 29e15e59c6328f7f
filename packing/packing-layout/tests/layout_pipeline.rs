//! End-to-end evaluation of a small layout: sphere files in, constraints,
//! objective and density out.

#![allow(clippy::unwrap_used)]

use approx::assert_relative_eq;
use nalgebra::{DVector, Point3};
use packing_layout::{
    BoundingBoxVolume, Differentiable, InterferenceFunction, Layout, PackingConfig, PairCategory,
};
use packing_projection::volume_estimation_error;
use packing_types::{
    Aabb, Component, DofSet, Interconnect, Port, PortRef, SpatialObject, SphereSet, parse_xyzr,
    read_xyzr, write_xyzr,
};

const PUMP: &str = "\
# pump body
0.0 0.0 0.0 0.30
0.35, 0.0, 0.0, 0.25
";

fn objects(pump: SphereSet) -> Vec<SpatialObject> {
    let pump = Component::new(pump)
        .with_dofs(DofSet::parse(&["x", "y", "z", "rz"]).unwrap())
        .with_port(Port::new("out", Point3::new(0.6, 0.0, 0.0), 0.05).unwrap());
    let tank = Component::new(SphereSet::single(Point3::new(2.5, 1.0, 1.0), 0.4).unwrap())
        .with_dofs(DofSet::parse(&["x", "y", "z"]).unwrap())
        .with_port(Port::new("in", Point3::new(2.1, 1.0, 1.0), 0.05).unwrap());
    let fan = Component::new(SphereSet::single(Point3::new(1.0, 1.6, 1.0), 0.3).unwrap())
        .with_dofs(DofSet::parse(&["x", "y", "z"]).unwrap());
    let hose = Interconnect::new(PortRef::named("pump", "out"), PortRef::named("tank", "in"), 0.06)
        .with_waypoints(1);
    vec![
        SpatialObject::component("pump", pump).unwrap(),
        SpatialObject::component("tank", tank).unwrap(),
        SpatialObject::component("fan", fan)
            .unwrap()
            .with_color_name("blue")
            .unwrap(),
        SpatialObject::interconnect("hose", hose).unwrap(),
    ]
}

fn config() -> PackingConfig {
    PackingConfig::default()
        .with_bounds(Aabb::from_bounds([-0.5, 3.5, -0.5, 2.5, 0.0, 2.0]).unwrap())
        .with_elements_per_unit_length(4.0)
}

fn layout() -> Layout {
    Layout::new(objects(parse_xyzr(PUMP).unwrap()), config()).unwrap()
}

/// Pump lifted to `z = 1`, everything else at rest, hose bent upward.
fn design() -> DVector<f64> {
    DVector::from_vec(vec![
        0.5, 0.8, 1.0, 0.1, // pump
        0.0, 0.0, 0.0, // tank
        0.0, 0.0, 0.0, // fan
        1.5, 0.4, 1.3, // hose waypoint
    ])
}

#[test]
fn test_pump_read_from_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("pump.xyzr");
    write_xyzr(&parse_xyzr(PUMP).unwrap(), &path).unwrap();
    let from_file = Layout::new(objects(read_xyzr(&path).unwrap()), config()).unwrap();

    let x = design();
    assert_eq!(
        from_file.interference(&x).unwrap(),
        layout().interference(&x).unwrap()
    );
}

#[test]
fn test_constraint_layout() {
    let layout = layout();
    assert_eq!(layout.design_len(), 13);
    assert_eq!(layout.object_index("hose"), Some(3));
    assert_eq!(layout.design_range(3), 10..13);
    assert_eq!(
        layout.pairs().active_categories(),
        vec![
            PairCategory::ComponentComponent,
            PairCategory::ComponentInterconnect
        ]
    );
    assert_eq!(layout.pairs().get(PairCategory::ComponentInterconnect), &[(2, 3)]);
}

#[test]
fn test_collision_violates_and_separation_satisfies() {
    let layout = layout();
    let x = design();
    assert!(layout.interference(&x).unwrap().is_feasible());

    // Drop the fan onto the pump.
    let mut crash = x.clone();
    crash[7] = 0.5 - 1.0;
    crash[8] = 0.8 - 1.6;
    let constraints = layout.interference(&crash).unwrap();
    assert!(constraints.component_component().unwrap() > 0.0);
    assert!(!constraints.is_feasible());
}

#[test]
fn test_gradient_step_reduces_interference() {
    let layout = layout();
    let mut x = design();
    x[7] = 0.5 - 1.0 + 0.3;
    x[8] = 0.8 - 1.6;
    let f = InterferenceFunction::new(&layout);
    let before = f.evaluate(&x).unwrap();
    let jacobian = f.jacobian(&x).unwrap();

    let gradient = jacobian.row(0).transpose();
    assert!(gradient.norm() > 0.0);
    let step = x.clone() - gradient.normalize() * 1e-3;
    let after = f.evaluate(&step).unwrap();
    assert!(after[0] < before[0]);
}

#[test]
fn test_bounding_box_objective() {
    let layout = layout();
    let x = design();
    let bb = layout.bounding_box(&x).unwrap();
    // The tank bounds +x and the pump body bounds -x.
    assert_relative_eq!(bb.bounds.max.x, 2.9, epsilon = 1e-12);
    assert_relative_eq!(bb.bounds.min.z, 0.6, epsilon = 1e-12);

    let gradient = BoundingBoxVolume::new(&layout).jacobian(&x).unwrap();
    // Moving the tank further out in +x grows the box.
    assert!(gradient[(0, 4)] > 0.0);
    // The fan is strictly inside in x, so its x DOF does not matter.
    assert_relative_eq!(gradient[(0, 7)], 0.0);
}

#[test]
fn test_projection_of_whole_layout() {
    let layout = layout();
    let mesh = layout.build_mesh().unwrap();
    assert_eq!(mesh.counts(), [16, 12, 8]);

    let projection = layout.project(&mesh, &design()).unwrap();
    assert_eq!(projection.fields.len(), 4);
    for field in &projection.fields {
        assert_eq!(field.len(), mesh.element_count());
        assert!(field.values().iter().all(|v| (0.0..=1.0).contains(v)));
    }
    assert_eq!(projection.aggregate.combined.len(), mesh.element_count());
    // Nothing overlaps, so the combined density stays near one.
    assert!(projection.aggregate.max_density < 1.2);

    let tank_volume = SphereSet::single(Point3::origin(), 0.4).unwrap().volume();
    let error = volume_estimation_error(&mesh, &projection.fields[1], tank_volume).unwrap();
    assert!(error < 0.5);
}
