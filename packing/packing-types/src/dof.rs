//! Degrees of freedom and design-vector layout.

use std::fmt;
use std::str::FromStr;

use crate::error::{PackingError, PackingResult};

/// A single degree of freedom of a rigid or scalable object.
///
/// The declaration order of the variants is the canonical design-vector order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Dof {
    /// Translation along x.
    X,
    /// Translation along y.
    Y,
    /// Translation along z.
    Z,
    /// Rotation about x, in radians.
    Rx,
    /// Rotation about y, in radians.
    Ry,
    /// Rotation about z, in radians.
    Rz,
    /// Scale along x.
    Sx,
    /// Scale along y.
    Sy,
    /// Scale along z.
    Sz,
}

impl Dof {
    /// All degrees of freedom in canonical order.
    pub const ALL: [Self; 9] = [
        Self::X,
        Self::Y,
        Self::Z,
        Self::Rx,
        Self::Ry,
        Self::Rz,
        Self::Sx,
        Self::Sy,
        Self::Sz,
    ];

    /// The token used in object definitions.
    #[must_use]
    pub const fn token(self) -> &'static str {
        match self {
            Self::X => "x",
            Self::Y => "y",
            Self::Z => "z",
            Self::Rx => "rx",
            Self::Ry => "ry",
            Self::Rz => "rz",
            Self::Sx => "sx",
            Self::Sy => "sy",
            Self::Sz => "sz",
        }
    }

    /// Value of this DOF when it is not part of the design vector.
    #[must_use]
    pub const fn default_value(self) -> f64 {
        match self {
            Self::Sx | Self::Sy | Self::Sz => 1.0,
            _ => 0.0,
        }
    }

    /// Returns `true` for the translation DOFs.
    #[must_use]
    pub const fn is_translation(self) -> bool {
        matches!(self, Self::X | Self::Y | Self::Z)
    }

    /// Returns `true` for the rotation DOFs.
    #[must_use]
    pub const fn is_rotation(self) -> bool {
        matches!(self, Self::Rx | Self::Ry | Self::Rz)
    }

    /// Returns `true` for the scale DOFs.
    #[must_use]
    pub const fn is_scale(self) -> bool {
        matches!(self, Self::Sx | Self::Sy | Self::Sz)
    }

    /// Axis index (0, 1 or 2) this DOF acts on.
    #[must_use]
    pub const fn axis(self) -> usize {
        match self {
            Self::X | Self::Rx | Self::Sx => 0,
            Self::Y | Self::Ry | Self::Sy => 1,
            Self::Z | Self::Rz | Self::Sz => 2,
        }
    }
}

impl fmt::Display for Dof {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

impl FromStr for Dof {
    type Err = PackingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|dof| dof.token() == s)
            .ok_or_else(|| PackingError::validation(format!("unknown degree of freedom '{s}'")))
    }
}

/// An ordered, duplicate-free set of degrees of freedom.
///
/// The set is always held in canonical order regardless of the order it was
/// declared in, so the design-vector layout depends only on membership.
///
/// # Example
///
/// ```
/// use packing_types::{Dof, DofSet};
///
/// let dofs = DofSet::parse(&["rz", "x", "y"]).unwrap();
/// assert_eq!(dofs.as_slice(), &[Dof::X, Dof::Y, Dof::Rz]);
/// assert_eq!(dofs.index_of(Dof::Rz), Some(2));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DofSet {
    dofs: Vec<Dof>,
}

impl DofSet {
    /// Creates a set from DOFs in any order.
    ///
    /// # Errors
    ///
    /// Returns [`PackingError::Validation`] if a DOF appears twice.
    pub fn new(dofs: impl IntoIterator<Item = Dof>) -> PackingResult<Self> {
        let mut dofs: Vec<Dof> = dofs.into_iter().collect();
        dofs.sort_unstable();
        if let Some(pair) = dofs.windows(2).find(|w| w[0] == w[1]) {
            return Err(PackingError::validation(format!(
                "degree of freedom '{}' declared more than once",
                pair[0]
            )));
        }
        Ok(Self { dofs })
    }

    /// Parses a set from tokens such as `["x", "y", "rz"]`.
    ///
    /// # Errors
    ///
    /// Returns [`PackingError::Validation`] for unknown or duplicated tokens.
    pub fn parse<S: AsRef<str>>(tokens: &[S]) -> PackingResult<Self> {
        let dofs = tokens
            .iter()
            .map(|t| t.as_ref().trim().parse())
            .collect::<PackingResult<Vec<Dof>>>()?;
        Self::new(dofs)
    }

    /// The empty set: a fixed object.
    #[must_use]
    pub const fn none() -> Self {
        Self { dofs: Vec::new() }
    }

    /// All nine DOFs.
    #[must_use]
    pub fn all() -> Self {
        Self {
            dofs: Dof::ALL.to_vec(),
        }
    }

    /// Translation and rotation: `x y z rx ry rz`.
    #[must_use]
    pub fn rigid() -> Self {
        Self {
            dofs: Dof::ALL[..6].to_vec(),
        }
    }

    /// Number of design variables.
    #[must_use]
    pub fn len(&self) -> usize {
        self.dofs.len()
    }

    /// Returns `true` if no DOF is enabled.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.dofs.is_empty()
    }

    /// Returns `true` if `dof` is enabled.
    #[must_use]
    pub fn contains(&self, dof: Dof) -> bool {
        self.dofs.binary_search(&dof).is_ok()
    }

    /// Position of `dof` in the design vector.
    #[must_use]
    pub fn index_of(&self, dof: Dof) -> Option<usize> {
        self.dofs.binary_search(&dof).ok()
    }

    /// Enabled DOFs in canonical order.
    #[must_use]
    pub fn as_slice(&self) -> &[Dof] {
        &self.dofs
    }

    /// Iterates over the enabled DOFs in canonical order.
    pub fn iter(&self) -> impl Iterator<Item = Dof> + '_ {
        self.dofs.iter().copied()
    }

    /// Returns `true` if any scale DOF is enabled.
    #[must_use]
    pub fn has_scale(&self) -> bool {
        self.dofs.iter().any(|d| d.is_scale())
    }

    /// Expands a design vector into all nine values, filling defaults.
    ///
    /// The result is ordered as [`Dof::ALL`].
    ///
    /// # Errors
    ///
    /// Returns [`PackingError::Validation`] if `values.len() != self.len()`.
    pub fn expand(&self, values: &[f64]) -> PackingResult<[f64; 9]> {
        if values.len() != self.dofs.len() {
            return Err(PackingError::validation(format!(
                "design vector has {} entries, expected {} for dofs [{}]",
                values.len(),
                self.dofs.len(),
                self
            )));
        }
        let mut full = Dof::ALL.map(Dof::default_value);
        for (dof, value) in self.dofs.iter().zip(values) {
            full[*dof as usize] = *value;
        }
        Ok(full)
    }
}

impl fmt::Display for DofSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, dof) in self.dofs.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{dof}")?;
        }
        Ok(())
    }
}
