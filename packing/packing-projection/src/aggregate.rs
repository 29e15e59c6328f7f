//! Combines per-object density fields into one layout density.

use nalgebra::DVector;
use packing_geometry::ks_max_with_gradient;
use packing_types::{PackingError, PackingResult};
use tracing::debug;

use crate::project::DensityField;

/// Default density floor.
pub const DEFAULT_RHO_MIN: f64 = 3e-3;

/// Result of [`aggregate`].
#[derive(Debug, Clone, PartialEq)]
pub struct AggregateOutput {
    /// Elementwise sum of the input fields, clipped below at `rho_min`.
    pub combined: DensityField,
    /// Smooth maximum of `combined`.
    pub max_density: f64,
    /// `∂max_density/∂field_e`, shared by every input field.
    pub max_density_gradient: DVector<f64>,
    /// `1` where the sum is at or above `rho_min` (so `combined` passes the
    /// field values through), `0` where it was clipped.
    pub active: DVector<f64>,
}

/// Sums density fields elementwise, clips the sum below at `rho_min` and
/// takes its KS maximum with sharpness `rho`.
///
/// Densities above one flag overlapping objects.
///
/// # Errors
///
/// Returns [`PackingError::Validation`] for an empty list, fields of
/// different shapes or a negative or non-finite `rho_min`, and propagates
/// aggregation errors for a bad `rho`.
///
/// # Example
///
/// ```
/// use packing_projection::{DensityField, aggregate};
/// use nalgebra::DVector;
///
/// let a = DensityField::from_values([2, 1, 1], DVector::from_vec(vec![1.0, 0.0])).unwrap();
/// let b = DensityField::from_values([2, 1, 1], DVector::from_vec(vec![0.5, 0.0])).unwrap();
/// let out = aggregate(&[a, b], 3e-3, 100.0).unwrap();
///
/// assert_eq!(out.combined.values().as_slice(), &[1.5, 3e-3]);
/// assert!(out.max_density >= 1.5);
/// ```
pub fn aggregate(fields: &[DensityField], rho_min: f64, rho: f64) -> PackingResult<AggregateOutput> {
    let Some(first) = fields.first() else {
        return Err(PackingError::validation("cannot aggregate an empty list of density fields"));
    };
    if !rho_min.is_finite() || rho_min < 0.0 {
        return Err(PackingError::validation(format!(
            "rho_min must be non-negative and finite, got {rho_min}"
        )));
    }
    if let Some(bad) = fields.iter().find(|f| f.counts() != first.counts()) {
        return Err(PackingError::validation(format!(
            "density field counts {:?} do not match {:?}",
            bad.counts(),
            first.counts()
        )));
    }

    let mut sum = DVector::zeros(first.len());
    for field in fields {
        sum += field.values();
    }
    let active = sum.map(|v| if v >= rho_min { 1.0 } else { 0.0 });
    let clipped = sum.map(|v| v.max(rho_min));
    let (max_density, weights) = ks_max_with_gradient(clipped.as_slice(), rho)?;
    let max_density_gradient = weights.component_mul(&active);

    debug!(
        fields = fields.len(),
        elements = first.len(),
        max_density,
        "Aggregated density fields"
    );
    Ok(AggregateOutput {
        combined: DensityField::from_values(first.counts(), clipped)?,
        max_density,
        max_density_gradient,
        active,
    })
}
