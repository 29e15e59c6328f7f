//! Placing a set of spatial objects from one design vector and evaluating
//! the layout: interference constraints, bounding box and density.
//!
//! The design vector concatenates, in object order, each component's DOF
//! values, each interconnect's waypoint coordinates and nothing for fixed
//! structures. Interconnects are routed from the ports of the placed
//! components, so their geometry depends on both their own waypoints and the
//! DOFs of the components they connect.

use std::ops::Range;

use hashbrown::HashMap;
use nalgebra::{DMatrix, DVector, Point3};
use packing_geometry::{
    Capsule, CapsuleGap, CapsuleGradient, capsule_capsule_gap, check_input, ks_max,
    ks_max_with_gradient,
};
use packing_projection::{AggregateOutput, DensityField, Mesh, aggregate, project, project_capsules};
use packing_transform::RigidTransform;
use packing_types::{
    Aabb, Component, ObjectRole, PackingError, PackingResult, PortRef, SpatialObject, SphereSet,
    ensure_finite,
};
use tracing::{debug, info};

use crate::config::PackingConfig;
use crate::pairs::{PairCategory, PairSets};
use crate::route::{route, route_capsules, route_jacobian};

#[derive(Debug, Clone, Copy)]
struct PortEnd {
    object: usize,
    port: usize,
}

/// Per-object data resolved once at construction.
#[derive(Debug, Clone)]
enum Slot {
    Component {
        anchor: Point3<f64>,
    },
    Interconnect {
        start: PortEnd,
        end: PortEnd,
        spheres_per_segment: usize,
    },
    Structure,
}

/// Geometry of one object at a design point.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlacedObject {
    /// Occupied volume as spheres.
    pub spheres: SphereSet,
    /// Port positions and radii, for components.
    pub ports: SphereSet,
    /// Collision primitives: one point capsule per sphere, or one capsule per
    /// route segment for interconnects.
    pub capsules: Vec<Capsule>,
}

/// Geometry of every object at a design point, in object order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LayoutState {
    objects: Vec<PlacedObject>,
}

impl LayoutState {
    /// Placed objects in layout order.
    #[must_use]
    pub fn objects(&self) -> &[PlacedObject] {
        &self.objects
    }

    /// The placed object at `index`.
    #[must_use]
    pub fn object(&self, index: usize) -> Option<&PlacedObject> {
        self.objects.get(index)
    }

    /// All spheres of all objects, concatenated in object order.
    #[must_use]
    pub fn spheres(&self) -> SphereSet {
        SphereSet::concat(self.objects.iter().map(|o| &o.spheres))
    }
}

/// `∂(all sphere centers, radii)/∂x` in [`LayoutState::spheres`] order.
#[derive(Debug, Clone, PartialEq)]
pub struct PositionJacobian {
    /// `3M × n`.
    pub positions: DMatrix<f64>,
    /// `M × n`.
    pub radii: DMatrix<f64>,
}

/// One KS-aggregated penetration per pair category.
///
/// A category with no pairs has no constraint. Values are positive when
/// objects collide; the layout is feasible when every value is `≤ 0`.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct InterferenceConstraints {
    values: [Option<f64>; 4],
}

impl InterferenceConstraints {
    /// The constraint of one category.
    #[must_use]
    pub const fn get(&self, category: PairCategory) -> Option<f64> {
        self.values[category as usize]
    }

    /// Component-component interference.
    #[must_use]
    pub const fn component_component(&self) -> Option<f64> {
        self.get(PairCategory::ComponentComponent)
    }

    /// Component-interconnect interference.
    #[must_use]
    pub const fn component_interconnect(&self) -> Option<f64> {
        self.get(PairCategory::ComponentInterconnect)
    }

    /// Interconnect-interconnect interference.
    #[must_use]
    pub const fn interconnect_interconnect(&self) -> Option<f64> {
        self.get(PairCategory::InterconnectInterconnect)
    }

    /// Structure interference.
    #[must_use]
    pub const fn structure(&self) -> Option<f64> {
        self.get(PairCategory::Structure)
    }

    /// Present constraint values in category order.
    #[must_use]
    pub fn values(&self) -> Vec<f64> {
        self.values.iter().flatten().copied().collect()
    }

    /// Returns `true` if no constraint is violated.
    #[must_use]
    pub fn is_feasible(&self) -> bool {
        self.values.iter().flatten().all(|v| *v <= 0.0)
    }
}

/// Axis-aligned box enclosing every sphere, and its volume.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BoundingBox {
    /// The enclosing box.
    pub bounds: Aabb,
    /// Its volume.
    pub volume: f64,
}

/// Subgradients of [`BoundingBox`].
#[derive(Debug, Clone, PartialEq)]
pub struct BoundingBoxJacobian {
    /// `∂(x_min, x_max, y_min, y_max, z_min, z_max)/∂x`, `6 × n`.
    pub bounds: DMatrix<f64>,
    /// `∂volume/∂x`.
    pub volume: DVector<f64>,
}

/// Per-object density fields and their aggregate.
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutProjection {
    /// One field per object, in object order.
    pub fields: Vec<DensityField>,
    /// Combined density and its smooth maximum.
    pub aggregate: AggregateOutput,
}

/// Derivatives of one object's geometry with respect to the full design
/// vector.
struct ObjectJacobian {
    /// `3N × n`.
    centers: DMatrix<f64>,
    /// `N × n`.
    radii: DMatrix<f64>,
    /// `3P × n`, component ports.
    ports: DMatrix<f64>,
    /// `3K × n`, interconnect route nodes.
    nodes: DMatrix<f64>,
}

/// A capsule pair from one object pair.
struct Contact {
    first: (usize, usize),
    second: (usize, usize),
    gap: CapsuleGap,
}

/// A validated set of spatial objects with its configuration.
///
/// Construction resolves names, port references and anchors and builds the
/// pair sets once; every evaluation afterwards is a pure function of the
/// design vector.
///
/// # Example
///
/// ```
/// use packing_layout::{Layout, PackingConfig};
/// use packing_types::{Component, DofSet, SpatialObject, SphereSet};
/// use nalgebra::{DVector, Point3};
///
/// let a = Component::new(SphereSet::single(Point3::new(0.3, 0.5, 0.5), 0.2).unwrap())
///     .with_dofs(DofSet::parse(&["x", "y", "z"]).unwrap());
/// let b = Component::new(SphereSet::single(Point3::new(0.7, 0.5, 0.5), 0.2).unwrap());
/// let layout = Layout::new(
///     vec![SpatialObject::component("a", a).unwrap(), SpatialObject::component("b", b).unwrap()],
///     PackingConfig::default(),
/// )
/// .unwrap();
///
/// // Start 0.4 apart with radii 0.2: touching. Moving `a` left separates them.
/// let apart = layout.interference(&DVector::from_vec(vec![-0.2, 0.0, 0.0])).unwrap();
/// assert!(apart.component_component().unwrap() < 0.0);
/// let overlap = layout.interference(&DVector::from_vec(vec![0.2, 0.0, 0.0])).unwrap();
/// assert!(!overlap.is_feasible());
/// ```
#[derive(Debug, Clone)]
pub struct Layout {
    objects: Vec<SpatialObject>,
    config: PackingConfig,
    pairs: PairSets,
    slots: Vec<Slot>,
    offsets: Vec<usize>,
}

fn resolve_port(
    name: &str,
    reference: &PortRef,
    index: &HashMap<&str, usize>,
    objects: &[SpatialObject],
) -> PackingResult<PortEnd> {
    let Some(&object) = index.get(reference.object.as_str()) else {
        return Err(PackingError::validation(format!(
            "interconnect '{name}' references unknown object '{}'",
            reference.object
        )));
    };
    let Some(component) = objects[object].as_component() else {
        return Err(PackingError::validation(format!(
            "interconnect '{name}' attaches to '{}', which is a {} and has no ports",
            reference.object,
            objects[object].kind()
        )));
    };
    let Some(port) = component.port_index(&reference.port) else {
        return Err(PackingError::validation(format!(
            "interconnect '{name}' references missing port {reference}"
        )));
    };
    Ok(PortEnd { object, port })
}

impl Layout {
    /// Validates the objects and configuration and builds the pair sets.
    ///
    /// # Errors
    ///
    /// Returns [`PackingError::Configuration`] for an invalid configuration
    /// and [`PackingError::Validation`] for an empty object list, duplicate
    /// names or interconnect endpoints that do not name a component port.
    pub fn new(objects: Vec<SpatialObject>, config: PackingConfig) -> PackingResult<Self> {
        config.check()?;
        if objects.is_empty() {
            return Err(PackingError::validation("a layout needs at least one object"));
        }

        let slots = {
            let mut index: HashMap<&str, usize> = HashMap::with_capacity(objects.len());
            for (i, object) in objects.iter().enumerate() {
                if index.insert(object.name(), i).is_some() {
                    return Err(PackingError::validation(format!(
                        "object name '{}' is used more than once",
                        object.name()
                    )));
                }
            }

            let mut slots = Vec::with_capacity(objects.len());
            for object in &objects {
                let slot = match object.role() {
                    ObjectRole::Component(component) => Slot::Component {
                        anchor: component.anchor().resolve(component.spheres())?,
                    },
                    ObjectRole::Interconnect(interconnect) => Slot::Interconnect {
                        start: resolve_port(object.name(), interconnect.start(), &index, &objects)?,
                        end: resolve_port(object.name(), interconnect.end(), &index, &objects)?,
                        spheres_per_segment: interconnect
                            .spheres_per_segment()
                            .unwrap_or(config.spheres_per_segment()),
                    },
                    ObjectRole::Structure(_) => Slot::Structure,
                };
                slots.push(slot);
            }
            slots
        };

        let mut offsets = Vec::with_capacity(objects.len() + 1);
        offsets.push(0);
        for object in &objects {
            offsets.push(offsets[offsets.len() - 1] + object.design_len());
        }

        let pairs = PairSets::build(&objects);
        let layout = Self {
            objects,
            config,
            pairs,
            slots,
            offsets,
        };
        info!(
            objects = layout.objects.len(),
            design_len = layout.design_len(),
            pairs = layout.pairs.len(),
            constraints = layout.pairs.active_categories().len(),
            "Assembled layout"
        );
        Ok(layout)
    }

    /// Objects in layout order.
    #[must_use]
    pub fn objects(&self) -> &[SpatialObject] {
        &self.objects
    }

    /// Position of the object named `name`.
    #[must_use]
    pub fn object_index(&self, name: &str) -> Option<usize> {
        self.objects.iter().position(|o| o.name() == name)
    }

    /// The evaluation settings.
    #[must_use]
    pub const fn config(&self) -> &PackingConfig {
        &self.config
    }

    /// The interference pairs.
    #[must_use]
    pub const fn pairs(&self) -> &PairSets {
        &self.pairs
    }

    /// Length of the design vector.
    #[must_use]
    pub fn design_len(&self) -> usize {
        self.offsets[self.objects.len()]
    }

    /// The design-vector entries owned by the object at `index`.
    #[must_use]
    pub fn design_range(&self, index: usize) -> Range<usize> {
        self.offsets[index]..self.offsets[index + 1]
    }

    /// The projection mesh for this layout's configuration.
    ///
    /// # Errors
    ///
    /// Propagates mesh configuration errors.
    pub fn build_mesh(&self) -> PackingResult<Mesh> {
        self.config.build_mesh()
    }

    /// Splits the design vector per object.
    ///
    /// # Errors
    ///
    /// Returns [`PackingError::Validation`] on a length mismatch.
    pub fn decompose<'x>(&self, x: &'x DVector<f64>) -> PackingResult<Vec<&'x [f64]>> {
        check_input(x, self.design_len())?;
        Ok((0..self.objects.len())
            .map(|i| &x.as_slice()[self.design_range(i)])
            .collect())
    }

    fn place_component(
        component: &Component,
        anchor: &Point3<f64>,
        values: &[f64],
        config: &PackingConfig,
    ) -> PackingResult<PlacedObject> {
        let t = RigidTransform::decode(component.dofs(), values)?;
        let spheres = t.apply(component.spheres(), anchor, config.radius_scaling())?;
        let ports = t.apply(&component.port_spheres(), anchor, config.radius_scaling())?;
        let capsules = spheres.iter().map(|(c, r)| Capsule::sphere(*c, r)).collect();
        Ok(PlacedObject {
            spheres,
            ports,
            capsules,
        })
    }

    /// Places every object at design point `x`.
    ///
    /// # Errors
    ///
    /// Returns [`PackingError::Validation`] on a length mismatch or
    /// non-finite design values.
    pub fn place(&self, x: &DVector<f64>) -> PackingResult<LayoutState> {
        let parts = self.decompose(x)?;
        let mut placed = Vec::with_capacity(self.objects.len());
        for ((object, slot), values) in self.objects.iter().zip(&self.slots).zip(&parts) {
            let object = match (object.role(), slot) {
                (ObjectRole::Component(component), Slot::Component { anchor }) => {
                    Self::place_component(component, anchor, values, &self.config)?
                }
                (ObjectRole::Structure(spheres), _) => PlacedObject {
                    spheres: spheres.clone(),
                    ports: SphereSet::empty(),
                    capsules: spheres.iter().map(|(c, r)| Capsule::sphere(*c, r)).collect(),
                },
                _ => PlacedObject::default(),
            };
            placed.push(object);
        }

        for (i, (object, slot)) in self.objects.iter().zip(&self.slots).enumerate() {
            let (Some(interconnect), Slot::Interconnect { start, end, spheres_per_segment }) =
                (object.as_interconnect(), slot)
            else {
                continue;
            };
            let from = placed[start.object].ports.centers()[start.port];
            let to = placed[end.object].ports.centers()[end.port];
            let waypoints: Vec<Point3<f64>> = parts[i]
                .chunks_exact(3)
                .map(|w| Point3::new(w[0], w[1], w[2]))
                .collect();
            placed[i] = PlacedObject {
                spheres: route(&waypoints, &from, &to, *spheres_per_segment, interconnect.radius())?,
                ports: SphereSet::empty(),
                capsules: route_capsules(&waypoints, &from, &to, interconnect.radius()),
            };
        }

        Ok(LayoutState { objects: placed })
    }

    fn object_jacobians(&self, x: &DVector<f64>) -> PackingResult<Vec<ObjectJacobian>> {
        let parts = self.decompose(x)?;
        let n = self.design_len();
        let scaling = self.config.radius_scaling();

        let mut jacobians = Vec::with_capacity(self.objects.len());
        for (i, (object, slot)) in self.objects.iter().zip(&self.slots).enumerate() {
            let jacobian = match (object.role(), slot) {
                (ObjectRole::Component(component), Slot::Component { anchor }) => {
                    let t = RigidTransform::decode(component.dofs(), parts[i])?;
                    let body = t.jacobian(component.spheres(), anchor, component.dofs(), scaling);
                    let ports = t.jacobian(&component.port_spheres(), anchor, component.dofs(), scaling);
                    let range = self.design_range(i);
                    let embed = |local: &DMatrix<f64>| {
                        let mut full = DMatrix::zeros(local.nrows(), n);
                        full.columns_mut(range.start, range.len()).copy_from(local);
                        full
                    };
                    ObjectJacobian {
                        centers: embed(&body.positions),
                        radii: embed(&body.radii),
                        ports: embed(&ports.positions),
                        nodes: DMatrix::zeros(0, n),
                    }
                }
                (ObjectRole::Structure(spheres), _) => ObjectJacobian {
                    centers: DMatrix::zeros(3 * spheres.len(), n),
                    radii: DMatrix::zeros(spheres.len(), n),
                    ports: DMatrix::zeros(0, n),
                    nodes: DMatrix::zeros(0, n),
                },
                _ => ObjectJacobian {
                    centers: DMatrix::zeros(0, n),
                    radii: DMatrix::zeros(0, n),
                    ports: DMatrix::zeros(0, n),
                    nodes: DMatrix::zeros(0, n),
                },
            };
            jacobians.push(jacobian);
        }

        for (i, (object, slot)) in self.objects.iter().zip(&self.slots).enumerate() {
            let (Some(interconnect), Slot::Interconnect { start, end, spheres_per_segment }) =
                (object.as_interconnect(), slot)
            else {
                continue;
            };
            let node_count = interconnect.waypoint_count() + 2;
            let mut nodes = DMatrix::zeros(3 * node_count, n);
            nodes
                .rows_mut(0, 3)
                .copy_from(&jacobians[start.object].ports.rows(3 * start.port, 3));
            let offset = self.offsets[i];
            for w in 0..interconnect.waypoint_count() {
                for axis in 0..3 {
                    nodes[(3 * (w + 1) + axis, offset + 3 * w + axis)] = 1.0;
                }
            }
            nodes
                .rows_mut(3 * (node_count - 1), 3)
                .copy_from(&jacobians[end.object].ports.rows(3 * end.port, 3));

            let centers = route_jacobian(node_count, *spheres_per_segment)? * &nodes;
            let spheres = centers.nrows() / 3;
            jacobians[i] = ObjectJacobian {
                centers,
                radii: DMatrix::zeros(spheres, n),
                ports: DMatrix::zeros(0, n),
                nodes,
            };
        }
        Ok(jacobians)
    }

    /// Derivatives of every sphere center and radius with respect to `x`,
    /// including the chain from component DOFs through ports into the
    /// interconnects routed from them.
    ///
    /// # Errors
    ///
    /// Returns [`PackingError::Validation`] on a length mismatch.
    pub fn position_jacobian(&self, x: &DVector<f64>) -> PackingResult<PositionJacobian> {
        let jacobians = self.object_jacobians(x)?;
        let spheres: usize = jacobians.iter().map(|j| j.radii.nrows()).sum();
        let n = self.design_len();
        let mut positions = DMatrix::zeros(3 * spheres, n);
        let mut radii = DMatrix::zeros(spheres, n);
        let mut row = 0;
        for jacobian in &jacobians {
            let count = jacobian.radii.nrows();
            positions.rows_mut(3 * row, 3 * count).copy_from(&jacobian.centers);
            radii.rows_mut(row, count).copy_from(&jacobian.radii);
            row += count;
        }
        Ok(PositionJacobian { positions, radii })
    }

    fn contacts(&self, state: &LayoutState, category: PairCategory) -> Vec<Contact> {
        let mut contacts = Vec::new();
        for &(a, b) in self.pairs.get(category) {
            for (ea, first) in state.objects[a].capsules.iter().enumerate() {
                for (eb, second) in state.objects[b].capsules.iter().enumerate() {
                    contacts.push(Contact {
                        first: (a, ea),
                        second: (b, eb),
                        gap: capsule_capsule_gap(first, second),
                    });
                }
            }
        }
        contacts
    }

    /// KS-aggregated penetration per non-empty pair category.
    ///
    /// Interconnects are not checked against the components they attach to.
    ///
    /// # Errors
    ///
    /// Returns [`PackingError::Validation`] for a bad design vector and
    /// [`PackingError::GeometryDegeneracy`] for a non-finite result.
    pub fn interference(&self, x: &DVector<f64>) -> PackingResult<InterferenceConstraints> {
        let state = self.place(x)?;
        let mut constraints = InterferenceConstraints::default();
        for category in self.pairs.active_categories() {
            let penetrations: Vec<f64> = self
                .contacts(&state, category)
                .iter()
                .map(|c| -c.gap.gap)
                .collect();
            let value = ks_max(&penetrations, self.config.rho())?;
            constraints.values[category as usize] =
                Some(ensure_finite(value, &format!("{category} interference"))?);
        }
        debug!(values = ?constraints.values(), "Evaluated interference");
        Ok(constraints)
    }

    fn accumulate(
        &self,
        gradient: &mut DVector<f64>,
        jacobian: &ObjectJacobian,
        object: usize,
        element: usize,
        g: &CapsuleGradient,
        weight: f64,
    ) {
        if matches!(self.slots[object], Slot::Interconnect { .. }) {
            gradient.axpy(weight, &jacobian.nodes.rows(3 * element, 3).tr_mul(&g.start), 1.0);
            gradient.axpy(weight, &jacobian.nodes.rows(3 * (element + 1), 3).tr_mul(&g.end), 1.0);
        } else {
            let center = g.start + g.end;
            gradient.axpy(weight, &jacobian.centers.rows(3 * element, 3).tr_mul(&center), 1.0);
            gradient.axpy(weight * g.radius, &jacobian.radii.row(element).transpose(), 1.0);
        }
    }

    /// Jacobian of [`Layout::interference`]: one row per present constraint
    /// in category order.
    ///
    /// # Errors
    ///
    /// Same as [`Layout::interference`].
    pub fn interference_jacobian(&self, x: &DVector<f64>) -> PackingResult<DMatrix<f64>> {
        let state = self.place(x)?;
        let jacobians = self.object_jacobians(x)?;
        let categories = self.pairs.active_categories();
        let mut result = DMatrix::zeros(categories.len(), self.design_len());
        for (row, category) in categories.into_iter().enumerate() {
            let contacts = self.contacts(&state, category);
            let penetrations: Vec<f64> = contacts.iter().map(|c| -c.gap.gap).collect();
            let (value, weights) = ks_max_with_gradient(&penetrations, self.config.rho())?;
            ensure_finite(value, &format!("{category} interference"))?;

            let mut gradient = DVector::zeros(self.design_len());
            for (contact, w) in contacts.iter().zip(weights.iter()) {
                let (a, ea) = contact.first;
                let (b, eb) = contact.second;
                self.accumulate(&mut gradient, &jacobians[a], a, ea, &contact.gap.first, -w);
                self.accumulate(&mut gradient, &jacobians[b], b, eb, &contact.gap.second, -w);
            }
            result.set_row(row, &gradient.transpose());
        }
        Ok(result)
    }

    /// The box `[min(c − r), max(c + r)]` over every sphere and its volume.
    ///
    /// # Errors
    ///
    /// Returns [`PackingError::Validation`] for a bad design vector and
    /// [`PackingError::GeometryDegeneracy`] for a non-finite volume.
    pub fn bounding_box(&self, x: &DVector<f64>) -> PackingResult<BoundingBox> {
        let spheres = self.place(x)?.spheres();
        let bounds = spheres
            .bounds()
            .ok_or_else(|| PackingError::validation("layout has no spheres to bound"))?;
        let volume = ensure_finite(bounds.volume(), "bounding box volume")?;
        Ok(BoundingBox { bounds, volume })
    }

    /// Subgradients of [`Layout::bounding_box`].
    ///
    /// Each bound follows the first sphere attaining it.
    ///
    /// # Errors
    ///
    /// Same as [`Layout::bounding_box`].
    pub fn bounding_box_jacobian(&self, x: &DVector<f64>) -> PackingResult<BoundingBoxJacobian> {
        let spheres = self.place(x)?.spheres();
        let bounds = spheres
            .bounds()
            .ok_or_else(|| PackingError::validation("layout has no spheres to bound"))?;
        let position = self.position_jacobian(x)?;
        let n = self.design_len();

        let mut rows = DMatrix::zeros(6, n);
        for axis in 0..3 {
            let mut lo = (0, f64::INFINITY);
            let mut hi = (0, f64::NEG_INFINITY);
            for (i, (c, r)) in spheres.iter().enumerate() {
                if c[axis] - r < lo.1 {
                    lo = (i, c[axis] - r);
                }
                if c[axis] + r > hi.1 {
                    hi = (i, c[axis] + r);
                }
            }
            let d_lo = position.positions.row(3 * lo.0 + axis) - position.radii.row(lo.0);
            let d_hi = position.positions.row(3 * hi.0 + axis) + position.radii.row(hi.0);
            rows.set_row(2 * axis, &d_lo);
            rows.set_row(2 * axis + 1, &d_hi);
        }

        let size = bounds.size();
        let mut volume = DVector::zeros(n);
        for axis in 0..3 {
            let others = size[(axis + 1) % 3] * size[(axis + 2) % 3];
            let d_extent = rows.row(2 * axis + 1) - rows.row(2 * axis);
            volume.axpy(others, &d_extent.transpose(), 1.0);
        }
        Ok(BoundingBoxJacobian {
            bounds: rows,
            volume,
        })
    }

    /// Projects every object onto `mesh` and aggregates the fields.
    ///
    /// Components and structures are projected as spheres; interconnects as
    /// capsules along their route.
    ///
    /// # Errors
    ///
    /// Returns [`PackingError::Validation`] for a bad design vector and
    /// [`PackingError::GeometryDegeneracy`] for a non-finite maximum density.
    pub fn project(&self, mesh: &Mesh, x: &DVector<f64>) -> PackingResult<LayoutProjection> {
        let state = self.place(x)?;
        let fields: Vec<DensityField> = state
            .objects
            .iter()
            .zip(&self.slots)
            .map(|(placed, slot)| match slot {
                Slot::Interconnect { .. } => project_capsules(mesh, &placed.capsules),
                _ => project(mesh, &placed.spheres),
            })
            .collect();
        let aggregate = aggregate(&fields, self.config.rho_min(), self.config.rho())?;
        ensure_finite(aggregate.max_density, "maximum density")?;
        debug!(
            objects = fields.len(),
            max_density = aggregate.max_density,
            "Projected layout"
        );
        Ok(LayoutProjection { fields, aggregate })
    }
}
