//! Spatial objects: components, interconnects and fixed structures.
//!
//! Every object in a layout is a [`SpatialObject`]: a name, an optional
//! display color and an [`ObjectRole`] carrying the role-specific data.
//! Capability queries ([`SpatialObject::has_ports`],
//! [`SpatialObject::has_waypoints`], [`SpatialObject::is_rigid`]) replace
//! branching on concrete object types.

use std::fmt;

use nalgebra::Point3;

use crate::color::Color;
use crate::dof::DofSet;
use crate::error::{PackingError, PackingResult};
use crate::sphere::SphereSet;

/// Reference point that rotation and scaling act about.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Anchor {
    /// Mean of the reference sphere centers.
    #[default]
    Centroid,
    /// Center of the first reference sphere.
    FirstSphere,
    /// An explicit point in the reference frame.
    Point(Point3<f64>),
}

impl Anchor {
    /// Resolves the anchor against a reference sphere set.
    ///
    /// # Errors
    ///
    /// Returns [`PackingError::Validation`] if the anchor depends on the
    /// spheres and the set is empty.
    pub fn resolve(&self, spheres: &SphereSet) -> PackingResult<Point3<f64>> {
        match self {
            Self::Centroid => spheres
                .centroid()
                .ok_or_else(|| PackingError::validation("centroid anchor of an empty sphere set")),
            Self::FirstSphere => spheres
                .centers()
                .first()
                .copied()
                .ok_or_else(|| PackingError::validation("first-sphere anchor of an empty sphere set")),
            Self::Point(p) => Ok(*p),
        }
    }
}

/// A named attachment point on a component.
///
/// The position is expressed in the component's reference frame and moves
/// with the component's transform.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Port {
    name: String,
    position: Point3<f64>,
    radius: f64,
}

impl Port {
    /// Creates a port.
    ///
    /// # Errors
    ///
    /// Returns [`PackingError::Validation`] for an empty name, a non-finite
    /// position, or a negative or non-finite radius.
    pub fn new(name: impl Into<String>, position: Point3<f64>, radius: f64) -> PackingResult<Self> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(PackingError::validation("port name must not be empty"));
        }
        if !(position.x.is_finite() && position.y.is_finite() && position.z.is_finite()) {
            return Err(PackingError::validation(format!(
                "port '{name}' has a non-finite position"
            )));
        }
        if !radius.is_finite() || radius < 0.0 {
            return Err(PackingError::validation(format!(
                "port '{name}' has invalid radius {radius}"
            )));
        }
        Ok(Self {
            name,
            position,
            radius,
        })
    }

    /// Port name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Position in the component's reference frame.
    #[must_use]
    pub const fn position(&self) -> Point3<f64> {
        self.position
    }

    /// Port radius.
    #[must_use]
    pub const fn radius(&self) -> f64 {
        self.radius
    }
}

/// Selects a port on a component, by index or by name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PortKey {
    /// Position in the component's port list.
    Index(usize),
    /// Port name.
    Name(String),
}

impl fmt::Display for PortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Index(i) => write!(f, "#{i}"),
            Self::Name(name) => f.write_str(name),
        }
    }
}

/// A reference to a port on a named component.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PortRef {
    /// Name of the component owning the port.
    pub object: String,
    /// Which port on that component.
    pub port: PortKey,
}

impl PortRef {
    /// References a port by index.
    #[must_use]
    pub fn index(object: impl Into<String>, port: usize) -> Self {
        Self {
            object: object.into(),
            port: PortKey::Index(port),
        }
    }

    /// References a port by name.
    #[must_use]
    pub fn named(object: impl Into<String>, port: impl Into<String>) -> Self {
        Self {
            object: object.into(),
            port: PortKey::Name(port.into()),
        }
    }
}

impl fmt::Display for PortRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.object, self.port)
    }
}

/// A rigid (optionally scalable) body with a sphere decomposition.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Component {
    spheres: SphereSet,
    anchor: Anchor,
    dofs: DofSet,
    ports: Vec<Port>,
}

impl Component {
    /// Creates a fixed component with no ports, anchored at its centroid.
    #[must_use]
    pub fn new(spheres: SphereSet) -> Self {
        Self {
            spheres,
            anchor: Anchor::Centroid,
            dofs: DofSet::none(),
            ports: Vec::new(),
        }
    }

    /// Sets the enabled degrees of freedom.
    #[must_use]
    pub fn with_dofs(mut self, dofs: DofSet) -> Self {
        self.dofs = dofs;
        self
    }

    /// Sets the rotation and scale anchor.
    #[must_use]
    pub const fn with_anchor(mut self, anchor: Anchor) -> Self {
        self.anchor = anchor;
        self
    }

    /// Adds a port.
    #[must_use]
    pub fn with_port(mut self, port: Port) -> Self {
        self.ports.push(port);
        self
    }

    /// Reference sphere set, before any transform.
    #[must_use]
    pub const fn spheres(&self) -> &SphereSet {
        &self.spheres
    }

    /// Rotation and scale anchor.
    #[must_use]
    pub const fn anchor(&self) -> &Anchor {
        &self.anchor
    }

    /// Enabled degrees of freedom.
    #[must_use]
    pub const fn dofs(&self) -> &DofSet {
        &self.dofs
    }

    /// Declared ports.
    #[must_use]
    pub fn ports(&self) -> &[Port] {
        &self.ports
    }

    /// Resolves a port key to an index into [`Component::ports`].
    #[must_use]
    pub fn port_index(&self, key: &PortKey) -> Option<usize> {
        match key {
            PortKey::Index(i) => (*i < self.ports.len()).then_some(*i),
            PortKey::Name(name) => self.ports.iter().position(|p| p.name == *name),
        }
    }

    /// Resolves a port key.
    #[must_use]
    pub fn port(&self, key: &PortKey) -> Option<&Port> {
        self.port_index(key).map(|i| &self.ports[i])
    }

    /// Ports as a sphere set, in declaration order.
    #[must_use]
    pub fn port_spheres(&self) -> SphereSet {
        // Port::new already validated every position and radius.
        SphereSet::new_unchecked(
            self.ports.iter().map(|p| p.position).collect(),
            self.ports.iter().map(|p| p.radius).collect(),
        )
    }

    fn validate(&self, name: &str) -> PackingResult<()> {
        if self.spheres.is_empty() {
            return Err(PackingError::validation(format!(
                "component '{name}' has no spheres"
            )));
        }
        self.anchor.resolve(&self.spheres)?;
        for (i, port) in self.ports.iter().enumerate() {
            if self.ports[..i].iter().any(|p| p.name == port.name) {
                return Err(PackingError::validation(format!(
                    "component '{name}' declares port '{}' more than once",
                    port.name
                )));
            }
        }
        Ok(())
    }
}

/// A flexible tube routed between two component ports.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Interconnect {
    start: PortRef,
    end: PortRef,
    radius: f64,
    waypoint_count: usize,
    spheres_per_segment: Option<usize>,
}

impl Interconnect {
    /// Creates a straight interconnect (no waypoints) of the given tube radius.
    #[must_use]
    pub const fn new(start: PortRef, end: PortRef, radius: f64) -> Self {
        Self {
            start,
            end,
            radius,
            waypoint_count: 0,
            spheres_per_segment: None,
        }
    }

    /// Sets the number of free waypoints.
    #[must_use]
    pub const fn with_waypoints(mut self, count: usize) -> Self {
        self.waypoint_count = count;
        self
    }

    /// Overrides the layout-wide sampling density for this interconnect.
    #[must_use]
    pub const fn with_spheres_per_segment(mut self, count: usize) -> Self {
        self.spheres_per_segment = Some(count);
        self
    }

    /// Start port.
    #[must_use]
    pub const fn start(&self) -> &PortRef {
        &self.start
    }

    /// End port.
    #[must_use]
    pub const fn end(&self) -> &PortRef {
        &self.end
    }

    /// Tube radius.
    #[must_use]
    pub const fn radius(&self) -> f64 {
        self.radius
    }

    /// Number of free waypoints.
    #[must_use]
    pub const fn waypoint_count(&self) -> usize {
        self.waypoint_count
    }

    /// Number of segments between the two ports.
    #[must_use]
    pub const fn segment_count(&self) -> usize {
        self.waypoint_count + 1
    }

    /// Per-interconnect sampling override, if any.
    #[must_use]
    pub const fn spheres_per_segment(&self) -> Option<usize> {
        self.spheres_per_segment
    }

    fn validate(&self, name: &str) -> PackingResult<()> {
        if !self.radius.is_finite() || self.radius <= 0.0 {
            return Err(PackingError::validation(format!(
                "interconnect '{name}' has invalid radius {}",
                self.radius
            )));
        }
        if self.spheres_per_segment == Some(0) {
            return Err(PackingError::validation(format!(
                "interconnect '{name}' has zero spheres per segment"
            )));
        }
        if self.start == self.end {
            return Err(PackingError::validation(format!(
                "interconnect '{name}' starts and ends at {}",
                self.start
            )));
        }
        Ok(())
    }
}

/// Role-specific data of a [`SpatialObject`].
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ObjectRole {
    /// A movable body with ports.
    Component(Component),
    /// A tube between two ports.
    Interconnect(Interconnect),
    /// A fixed obstacle such as a housing wall.
    Structure(SphereSet),
}

/// The role of an object without its data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ObjectKind {
    /// See [`ObjectRole::Component`].
    Component,
    /// See [`ObjectRole::Interconnect`].
    Interconnect,
    /// See [`ObjectRole::Structure`].
    Structure,
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Component => "component",
            Self::Interconnect => "interconnect",
            Self::Structure => "structure",
        })
    }
}

/// A named object taking part in a layout.
///
/// # Example
///
/// ```
/// use packing_types::{Component, DofSet, Port, SpatialObject, SphereSet};
/// use nalgebra::Point3;
///
/// let body = Component::new(SphereSet::single(Point3::origin(), 1.0).unwrap())
///     .with_dofs(DofSet::parse(&["x", "y", "z"]).unwrap())
///     .with_port(Port::new("out", Point3::new(1.0, 0.0, 0.0), 0.1).unwrap());
/// let object = SpatialObject::component("pump", body).unwrap();
///
/// assert!(object.has_ports());
/// assert!(object.is_rigid());
/// assert_eq!(object.design_len(), 3);
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SpatialObject {
    name: String,
    color: Option<Color>,
    role: ObjectRole,
}

impl SpatialObject {
    /// Creates a component object.
    ///
    /// # Errors
    ///
    /// Returns [`PackingError::Validation`] for an empty name, an empty
    /// sphere set, an unresolvable anchor or duplicate port names.
    pub fn component(name: impl Into<String>, component: Component) -> PackingResult<Self> {
        let name = checked_name(name.into())?;
        component.validate(&name)?;
        Ok(Self {
            name,
            color: None,
            role: ObjectRole::Component(component),
        })
    }

    /// Creates an interconnect object.
    ///
    /// # Errors
    ///
    /// Returns [`PackingError::Validation`] for an empty name, a non-positive
    /// radius, a zero sampling override or identical endpoints.
    pub fn interconnect(name: impl Into<String>, interconnect: Interconnect) -> PackingResult<Self> {
        let name = checked_name(name.into())?;
        interconnect.validate(&name)?;
        Ok(Self {
            name,
            color: None,
            role: ObjectRole::Interconnect(interconnect),
        })
    }

    /// Creates a fixed structure object.
    ///
    /// # Errors
    ///
    /// Returns [`PackingError::Validation`] for an empty name or sphere set.
    pub fn structure(name: impl Into<String>, spheres: SphereSet) -> PackingResult<Self> {
        let name = checked_name(name.into())?;
        if spheres.is_empty() {
            return Err(PackingError::validation(format!(
                "structure '{name}' has no spheres"
            )));
        }
        Ok(Self {
            name,
            color: None,
            role: ObjectRole::Structure(spheres),
        })
    }

    /// Sets the display color.
    #[must_use]
    pub const fn with_color(mut self, color: Color) -> Self {
        self.color = Some(color);
        self
    }

    /// Parses and sets the display color.
    ///
    /// # Errors
    ///
    /// Returns [`PackingError::Validation`] for an unrecognized color.
    pub fn with_color_name(self, color: &str) -> PackingResult<Self> {
        Ok(self.with_color(color.parse()?))
    }

    /// Object name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Display color, if set.
    #[must_use]
    pub const fn color(&self) -> Option<Color> {
        self.color
    }

    /// Role-specific data.
    #[must_use]
    pub const fn role(&self) -> &ObjectRole {
        &self.role
    }

    /// The role without its data.
    #[must_use]
    pub const fn kind(&self) -> ObjectKind {
        match self.role {
            ObjectRole::Component(_) => ObjectKind::Component,
            ObjectRole::Interconnect(_) => ObjectKind::Interconnect,
            ObjectRole::Structure(_) => ObjectKind::Structure,
        }
    }

    /// Component data, if this is a component.
    #[must_use]
    pub const fn as_component(&self) -> Option<&Component> {
        match &self.role {
            ObjectRole::Component(c) => Some(c),
            _ => None,
        }
    }

    /// Interconnect data, if this is an interconnect.
    #[must_use]
    pub const fn as_interconnect(&self) -> Option<&Interconnect> {
        match &self.role {
            ObjectRole::Interconnect(i) => Some(i),
            _ => None,
        }
    }

    /// Returns `true` if other objects may attach to this one.
    #[must_use]
    pub fn has_ports(&self) -> bool {
        self.as_component().is_some_and(|c| !c.ports.is_empty())
    }

    /// Returns `true` if the object's shape is driven by waypoints.
    #[must_use]
    pub const fn has_waypoints(&self) -> bool {
        matches!(self.role, ObjectRole::Interconnect(_))
    }

    /// Returns `true` if the object moves as a single body.
    #[must_use]
    pub const fn is_rigid(&self) -> bool {
        !self.has_waypoints()
    }

    /// Number of design variables owned by this object.
    #[must_use]
    pub fn design_len(&self) -> usize {
        match &self.role {
            ObjectRole::Component(c) => c.dofs.len(),
            ObjectRole::Interconnect(i) => 3 * i.waypoint_count,
            ObjectRole::Structure(_) => 0,
        }
    }
}

fn checked_name(name: String) -> PackingResult<String> {
    if name.trim().is_empty() {
        Err(PackingError::validation("object name must not be empty"))
    } else {
        Ok(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn body() -> Component {
        Component::new(
            SphereSet::new(
                vec![Point3::new(0.0, 0.0, 0.0), Point3::new(2.0, 0.0, 0.0)],
                vec![0.5, 0.5],
            )
            .unwrap(),
        )
    }

    #[test]
    fn test_anchor_resolve() {
        let spheres = body().spheres().clone();
        assert_eq!(Anchor::Centroid.resolve(&spheres).unwrap(), Point3::new(1.0, 0.0, 0.0));
        assert_eq!(Anchor::FirstSphere.resolve(&spheres).unwrap(), Point3::origin());
        let p = Point3::new(3.0, 2.0, 1.0);
        assert_eq!(Anchor::Point(p).resolve(&SphereSet::empty()).unwrap(), p);
        assert!(Anchor::Centroid.resolve(&SphereSet::empty()).is_err());
    }

    #[test]
    fn test_port_lookup() {
        let c = body()
            .with_port(Port::new("in", Point3::new(-0.5, 0.0, 0.0), 0.1).unwrap())
            .with_port(Port::new("out", Point3::new(2.5, 0.0, 0.0), 0.1).unwrap());
        assert_eq!(c.port_index(&PortKey::Name("out".into())), Some(1));
        assert_eq!(c.port_index(&PortKey::Index(0)), Some(0));
        assert_eq!(c.port_index(&PortKey::Index(2)), None);
        assert!(c.port(&PortKey::Name("missing".into())).is_none());
        let ports = c.port_spheres();
        assert_eq!(ports.len(), 2);
        assert_eq!(ports.centers()[1], Point3::new(2.5, 0.0, 0.0));
        assert_relative_eq!(ports.radii()[0], 0.1);
    }

    #[test]
    fn test_duplicate_port_rejected() {
        let c = body()
            .with_port(Port::new("a", Point3::origin(), 0.1).unwrap())
            .with_port(Port::new("a", Point3::origin(), 0.1).unwrap());
        assert!(SpatialObject::component("c", c).is_err());
    }

    #[test]
    fn test_port_validation() {
        assert!(Port::new("", Point3::origin(), 0.1).is_err());
        assert!(Port::new("p", Point3::origin(), -1.0).is_err());
    }

    #[test]
    fn test_empty_component_rejected() {
        let err = SpatialObject::component("c", Component::new(SphereSet::empty())).unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn test_interconnect_validation() {
        let ok = Interconnect::new(PortRef::index("a", 0), PortRef::index("b", 0), 0.2);
        assert!(SpatialObject::interconnect("ic", ok.clone()).is_ok());
        let zero_radius = Interconnect::new(PortRef::index("a", 0), PortRef::index("b", 0), 0.0);
        assert!(SpatialObject::interconnect("ic", zero_radius).is_err());
        let looped = Interconnect::new(PortRef::index("a", 0), PortRef::index("a", 0), 0.2);
        assert!(SpatialObject::interconnect("ic", looped).is_err());
        assert!(SpatialObject::interconnect("ic", ok.with_spheres_per_segment(0)).is_err());
    }

    #[test]
    fn test_capability_flags() {
        let comp = SpatialObject::component("c", body()).unwrap();
        assert!(!comp.has_ports());
        assert!(comp.is_rigid());
        assert!(!comp.has_waypoints());

        let ic = Interconnect::new(PortRef::index("a", 0), PortRef::named("b", "in"), 0.2)
            .with_waypoints(2);
        let ic = SpatialObject::interconnect("ic", ic).unwrap();
        assert!(ic.has_waypoints());
        assert!(!ic.is_rigid());
        assert_eq!(ic.design_len(), 6);
        assert_eq!(ic.kind(), ObjectKind::Interconnect);

        let wall = SpatialObject::structure("wall", body().spheres().clone()).unwrap();
        assert_eq!(wall.design_len(), 0);
        assert!(wall.is_rigid());
    }

    #[test]
    fn test_color() {
        let obj = SpatialObject::component("c", body())
            .unwrap()
            .with_color_name("teal")
            .unwrap();
        assert_eq!(obj.color(), Some(Color::new(0, 128, 128)));
        let err = SpatialObject::component("c", body())
            .unwrap()
            .with_color_name("not-a-color")
            .unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn test_empty_name_rejected() {
        assert!(SpatialObject::component("  ", body()).is_err());
    }

    #[test]
    fn test_port_ref_display() {
        assert_eq!(PortRef::index("pump", 1).to_string(), "pump.#1");
        assert_eq!(PortRef::named("pump", "out").to_string(), "pump.out");
    }
}
