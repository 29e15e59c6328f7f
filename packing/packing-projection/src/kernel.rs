//! Mesh kernels: sphere packings of the unit element used to sample density.
//!
//! Kernel spheres are expressed in unit-element coordinates: the element is
//! the cube `[-0.5, 0.5]³` centered at the origin. The mesh builder scales
//! them by the element length and translates them to each element center.

use std::path::Path;

use nalgebra::Point3;
use packing_types::{PackingError, PackingResult, SphereSet, read_xyzr};

/// Tolerance for kernel spheres poking out of the unit element.
const CONTAINMENT_TOLERANCE: f64 = 1e-9;

/// Named kernel presets.
///
/// More kernel spheres give a more accurate projection at proportionally
/// higher cost.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum KernelChoice {
    /// One inscribed sphere.
    Mdbd1,
    /// A 2×2×2 lattice of spheres.
    Uniform8,
    /// The inscribed sphere plus eight corner spheres.
    #[default]
    Mdbd9,
    /// A 4×4×4 lattice of spheres.
    Uniform64,
    /// An n×n×n lattice of spheres.
    Uniform(usize),
}

/// A sphere packing of the unit element.
///
/// # Example
///
/// ```
/// use packing_projection::MeshKernel;
///
/// let kernel = MeshKernel::uniform(2).unwrap();
/// assert_eq!(kernel.len(), 8);
/// assert!((kernel.volume_fraction() - std::f64::consts::PI / 6.0).abs() < 1e-12);
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MeshKernel {
    spheres: SphereSet,
}

impl MeshKernel {
    /// An n×n×n lattice of spheres inscribed in the sub-cells.
    ///
    /// # Errors
    ///
    /// Returns [`PackingError::Configuration`] if `n == 0`.
    #[allow(clippy::cast_precision_loss)]
    pub fn uniform(n: usize) -> PackingResult<Self> {
        if n == 0 {
            return Err(PackingError::configuration(
                "uniform kernel needs at least one sphere per axis",
            ));
        }
        let step = 1.0 / n as f64;
        let coord = |i: usize| -0.5 + (i as f64 + 0.5) * step;
        let mut centers = Vec::with_capacity(n * n * n);
        for i in 0..n {
            for j in 0..n {
                for k in 0..n {
                    centers.push(Point3::new(coord(i), coord(j), coord(k)));
                }
            }
        }
        let radii = vec![0.5 * step; centers.len()];
        Ok(Self {
            spheres: SphereSet::new(centers, radii)?,
        })
    }

    /// One sphere inscribed in the element.
    #[must_use]
    pub fn mdbd_1() -> Self {
        Self {
            spheres: SphereSet::new_unchecked(vec![Point3::origin()], vec![0.5]),
        }
    }

    /// The inscribed sphere plus eight corner spheres, each tangent to the
    /// inscribed sphere and to three faces.
    #[must_use]
    pub fn mdbd_9() -> Self {
        let sqrt3 = 3.0_f64.sqrt();
        let corner_radius = 0.5 * (sqrt3 - 1.0) / (sqrt3 + 1.0);
        let offset = 0.5 - corner_radius;
        let mut centers = vec![Point3::origin()];
        let mut radii = vec![0.5];
        for sx in [-1.0, 1.0] {
            for sy in [-1.0, 1.0] {
                for sz in [-1.0, 1.0] {
                    centers.push(Point3::new(sx * offset, sy * offset, sz * offset));
                    radii.push(corner_radius);
                }
            }
        }
        Self {
            spheres: SphereSet::new_unchecked(centers, radii),
        }
    }

    /// Builds the kernel for a preset.
    ///
    /// # Errors
    ///
    /// Returns [`PackingError::Configuration`] for `Uniform(0)`.
    pub fn from_choice(choice: KernelChoice) -> PackingResult<Self> {
        match choice {
            KernelChoice::Mdbd1 => Ok(Self::mdbd_1()),
            KernelChoice::Uniform8 => Self::uniform(2),
            KernelChoice::Mdbd9 => Ok(Self::mdbd_9()),
            KernelChoice::Uniform64 => Self::uniform(4),
            KernelChoice::Uniform(n) => Self::uniform(n),
        }
    }

    /// A user-supplied packing in unit-element coordinates.
    ///
    /// # Errors
    ///
    /// Returns [`PackingError::Validation`] for an empty set, a zero radius or
    /// a sphere extending outside `[-0.5, 0.5]³`.
    pub fn custom(spheres: SphereSet) -> PackingResult<Self> {
        if spheres.is_empty() {
            return Err(PackingError::validation("kernel must contain at least one sphere"));
        }
        for (i, (c, r)) in spheres.iter().enumerate() {
            if r <= 0.0 {
                return Err(PackingError::validation(format!(
                    "kernel sphere {i} has non-positive radius {r}"
                )));
            }
            if c.iter().any(|x| x.abs() + r > 0.5 + CONTAINMENT_TOLERANCE) {
                return Err(PackingError::validation(format!(
                    "kernel sphere {i} at {c} with radius {r} leaves the unit element"
                )));
            }
        }
        Ok(Self { spheres })
    }

    /// Loads a packing from an `xyzr` file.
    ///
    /// # Errors
    ///
    /// Returns I/O and parse errors from [`read_xyzr`] and validation errors
    /// from [`MeshKernel::custom`].
    pub fn from_xyzr<P: AsRef<Path>>(path: P) -> PackingResult<Self> {
        Self::custom(read_xyzr(path)?)
    }

    /// Kernel spheres in unit-element coordinates.
    #[must_use]
    pub const fn spheres(&self) -> &SphereSet {
        &self.spheres
    }

    /// Number of kernel spheres.
    #[must_use]
    pub fn len(&self) -> usize {
        self.spheres.len()
    }

    /// Always `false`; kernels hold at least one sphere.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.spheres.is_empty()
    }

    /// Fraction of the unit element covered by the kernel spheres.
    #[must_use]
    pub fn volume_fraction(&self) -> f64 {
        self.spheres.volume()
    }
}

impl Default for MeshKernel {
    fn default() -> Self {
        Self::mdbd_9()
    }
}
