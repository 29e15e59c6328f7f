//! Kreisselmeier–Steinhauser smooth extrema.
//!
//! `KS_max(v) = m + ln(Σ exp(ρ (vᵢ − m))) / ρ` with `m = max(v)`, which keeps
//! every exponent non-positive. The result satisfies
//! `max(v) ≤ KS_max(v) ≤ max(v) + ln(n) / ρ`.

use nalgebra::DVector;
use packing_types::{PackingError, PackingResult};

/// Default aggregation sharpness.
pub const DEFAULT_RHO: f64 = 100.0;

fn check_inputs(values: &[f64], rho: f64) -> PackingResult<f64> {
    if values.is_empty() {
        return Err(PackingError::validation("cannot aggregate an empty set of values"));
    }
    if !rho.is_finite() || rho <= 0.0 {
        return Err(PackingError::validation(format!(
            "aggregation parameter rho must be positive and finite, got {rho}"
        )));
    }
    if let Some(v) = values.iter().find(|v| !v.is_finite()) {
        return Err(PackingError::degeneracy(format!(
            "cannot aggregate non-finite value {v}"
        )));
    }
    Ok(values.iter().copied().fold(f64::NEG_INFINITY, f64::max))
}

/// Smooth maximum of `values`.
///
/// # Errors
///
/// Returns [`PackingError::Validation`] for an empty slice or a non-positive
/// `rho`, and [`PackingError::GeometryDegeneracy`] if a value is not finite.
///
/// # Example
///
/// ```
/// use packing_geometry::ks_max;
///
/// let smooth = ks_max(&[1.0, 3.0, 2.0], 50.0).unwrap();
/// assert!(smooth >= 3.0 && smooth < 3.01);
/// ```
pub fn ks_max(values: &[f64], rho: f64) -> PackingResult<f64> {
    let max = check_inputs(values, rho)?;
    let sum: f64 = values.iter().map(|v| (rho * (v - max)).exp()).sum();
    Ok(max + sum.ln() / rho)
}

/// Smooth minimum of `values`: `-ks_max(-values)`.
///
/// # Errors
///
/// Same as [`ks_max`].
pub fn ks_min(values: &[f64], rho: f64) -> PackingResult<f64> {
    let negated: Vec<f64> = values.iter().map(|v| -v).collect();
    Ok(-ks_max(&negated, rho)?)
}

/// Smooth maximum together with its gradient.
///
/// The gradient entries are the softmax weights `exp(ρ (vᵢ − m)) / Σ`, which
/// are non-negative and sum to one.
///
/// # Errors
///
/// Same as [`ks_max`].
pub fn ks_max_with_gradient(values: &[f64], rho: f64) -> PackingResult<(f64, DVector<f64>)> {
    let max = check_inputs(values, rho)?;
    let weights: Vec<f64> = values.iter().map(|v| (rho * (v - max)).exp()).collect();
    let sum: f64 = weights.iter().sum();
    let gradient = DVector::from_iterator(weights.len(), weights.iter().map(|w| w / sum));
    Ok((max + sum.ln() / rho, gradient))
}

/// Smooth minimum together with its gradient.
///
/// # Errors
///
/// Same as [`ks_max`].
pub fn ks_min_with_gradient(values: &[f64], rho: f64) -> PackingResult<(f64, DVector<f64>)> {
    let negated: Vec<f64> = values.iter().map(|v| -v).collect();
    let (value, gradient) = ks_max_with_gradient(&negated, rho)?;
    Ok((-value, gradient))
}
