//! Evaluation settings shared by every call on a layout.
//!
//! # Example
//!
//! ```
//! use packing_layout::PackingConfig;
//! use packing_projection::KernelChoice;
//! use packing_types::Aabb;
//!
//! let config = PackingConfig::default()
//!     .with_bounds(Aabb::from_bounds([0.0, 4.0, 0.0, 2.0, 0.0, 2.0]).unwrap())
//!     .with_elements_per_unit_length(5.0)
//!     .with_kernel(KernelChoice::Uniform8);
//!
//! assert!(config.validate().is_empty());
//! let mesh = config.build_mesh().unwrap();
//! assert_eq!(mesh.counts(), [20, 10, 10]);
//! ```

use nalgebra::Point3;
use packing_geometry::DEFAULT_RHO;
use packing_projection::{DEFAULT_RHO_MIN, KernelChoice, Mesh, MeshKernel};
use packing_transform::RadiusScaling;
use packing_types::{Aabb, PackingError, PackingResult};

/// Default number of interconnect spheres per route segment.
pub const DEFAULT_SPHERES_PER_SEGMENT: usize = 5;

/// Configuration for evaluating a layout.
///
/// Populated once by the caller and passed into [`crate::Layout::new`]; there
/// is no global state.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PackingConfig {
    /// Region meshed for projection.
    bounds: Aabb,
    /// Mesh resolution.
    elements_per_unit_length: f64,
    /// KS sharpness for interference and maximum density.
    rho: f64,
    /// Floor of the combined density.
    rho_min: f64,
    /// Interconnect spheres per segment unless an interconnect overrides it.
    spheres_per_segment: usize,
    /// Kernel used to sample element density.
    kernel: KernelChoice,
    /// How scale DOFs change radii.
    radius_scaling: RadiusScaling,
}

impl PackingConfig {
    /// Creates a configuration with default settings.
    ///
    /// Defaults:
    /// - Bounds: the unit cube at the origin
    /// - Elements per unit length: 4
    /// - `rho`: 100
    /// - `rho_min`: 3e-3
    /// - Spheres per segment: 5
    /// - Kernel: `Mdbd9`
    /// - Radius scaling: geometric mean
    #[must_use]
    pub fn new() -> Self {
        Self {
            bounds: Aabb::new(Point3::origin(), Point3::new(1.0, 1.0, 1.0)),
            elements_per_unit_length: 4.0,
            rho: DEFAULT_RHO,
            rho_min: DEFAULT_RHO_MIN,
            spheres_per_segment: DEFAULT_SPHERES_PER_SEGMENT,
            kernel: KernelChoice::default(),
            radius_scaling: RadiusScaling::default(),
        }
    }

    /// Sets the meshed region.
    #[must_use]
    pub const fn with_bounds(mut self, bounds: Aabb) -> Self {
        self.bounds = bounds;
        self
    }

    /// Sets the mesh resolution.
    #[must_use]
    pub const fn with_elements_per_unit_length(mut self, elements: f64) -> Self {
        self.elements_per_unit_length = elements;
        self
    }

    /// Sets the KS sharpness.
    #[must_use]
    pub const fn with_rho(mut self, rho: f64) -> Self {
        self.rho = rho;
        self
    }

    /// Sets the density floor.
    #[must_use]
    pub const fn with_rho_min(mut self, rho_min: f64) -> Self {
        self.rho_min = rho_min;
        self
    }

    /// Sets the default spheres per interconnect segment.
    #[must_use]
    pub const fn with_spheres_per_segment(mut self, count: usize) -> Self {
        self.spheres_per_segment = count;
        self
    }

    /// Sets the mesh kernel.
    #[must_use]
    pub const fn with_kernel(mut self, kernel: KernelChoice) -> Self {
        self.kernel = kernel;
        self
    }

    /// Sets the radius scaling policy.
    #[must_use]
    pub const fn with_radius_scaling(mut self, scaling: RadiusScaling) -> Self {
        self.radius_scaling = scaling;
        self
    }

    /// Returns the meshed region.
    #[must_use]
    pub const fn bounds(&self) -> &Aabb {
        &self.bounds
    }

    /// Returns the mesh resolution.
    #[must_use]
    pub const fn elements_per_unit_length(&self) -> f64 {
        self.elements_per_unit_length
    }

    /// Returns the KS sharpness.
    #[must_use]
    pub const fn rho(&self) -> f64 {
        self.rho
    }

    /// Returns the density floor.
    #[must_use]
    pub const fn rho_min(&self) -> f64 {
        self.rho_min
    }

    /// Returns the default spheres per interconnect segment.
    #[must_use]
    pub const fn spheres_per_segment(&self) -> usize {
        self.spheres_per_segment
    }

    /// Returns the mesh kernel.
    #[must_use]
    pub const fn kernel(&self) -> KernelChoice {
        self.kernel
    }

    /// Returns the radius scaling policy.
    #[must_use]
    pub const fn radius_scaling(&self) -> RadiusScaling {
        self.radius_scaling
    }

    /// Validates the configuration and returns any issues.
    #[must_use]
    pub fn validate(&self) -> Vec<String> {
        let mut issues = Vec::new();

        let size = self.bounds.size();
        if !size.iter().all(|s| s.is_finite() && *s > 0.0) {
            issues.push(format!("Bounds must have positive finite extent, got {size}"));
        }
        if !self.elements_per_unit_length.is_finite() || self.elements_per_unit_length <= 0.0 {
            issues.push(format!(
                "Elements per unit length must be positive, got {}",
                self.elements_per_unit_length
            ));
        } else if size.iter().any(|s| s * self.elements_per_unit_length < 1.0) {
            issues.push(format!(
                "Resolution {} leaves an axis of {size} without elements",
                self.elements_per_unit_length
            ));
        }
        if !self.rho.is_finite() || self.rho <= 0.0 {
            issues.push(format!("rho must be positive, got {}", self.rho));
        }
        if !self.rho_min.is_finite() || !(0.0..1.0).contains(&self.rho_min) {
            issues.push(format!("rho_min must be in [0, 1), got {}", self.rho_min));
        }
        if self.spheres_per_segment == 0 {
            issues.push("Spheres per segment must be at least 1".to_string());
        }
        if self.kernel == KernelChoice::Uniform(0) {
            issues.push("Uniform kernel needs at least one sphere per axis".to_string());
        }

        issues
    }

    /// Fails with every issue found by [`PackingConfig::validate`].
    ///
    /// # Errors
    ///
    /// Returns [`PackingError::Configuration`] listing the issues.
    pub fn check(&self) -> PackingResult<()> {
        let issues = self.validate();
        if issues.is_empty() {
            Ok(())
        } else {
            Err(PackingError::configuration(issues.join("; ")))
        }
    }

    /// Builds the projection mesh for these settings.
    ///
    /// # Errors
    ///
    /// Returns [`PackingError::Configuration`] for an invalid configuration.
    pub fn build_mesh(&self) -> PackingResult<Mesh> {
        self.check()?;
        Mesh::build(
            self.bounds,
            self.elements_per_unit_length,
            MeshKernel::from_choice(self.kernel)?,
        )
    }
}

impl Default for PackingConfig {
    fn default() -> Self {
        Self::new()
    }
}
