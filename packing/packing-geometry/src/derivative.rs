//! Differentiable functions and finite-difference validation.
//!
//! Every evaluation entry point of the packing workspace is exposed through
//! [`Differentiable`]: a pure map from a design vector to an output vector
//! with an analytic Jacobian. The default [`Differentiable::jacobian_fd`]
//! perturbs each input and is used to validate the analytic Jacobians.

use nalgebra::{DMatrix, DVector};
use packing_types::{PackingError, PackingResult};

/// Configuration for finite-difference Jacobians.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DerivativeConfig {
    /// Perturbation magnitude.
    /// Default: `1e-6`. Must be in `(0, 1e-2]`.
    pub eps: f64,

    /// Use centered differences (O(ε²) error, 2x cost) instead of forward
    /// differences (O(ε) error).
    /// Default: `true`.
    pub centered: bool,
}

impl Default for DerivativeConfig {
    fn default() -> Self {
        Self {
            eps: 1e-6,
            centered: true,
        }
    }
}

impl DerivativeConfig {
    /// Sets the perturbation magnitude.
    #[must_use]
    pub const fn with_eps(mut self, eps: f64) -> Self {
        self.eps = eps;
        self
    }

    /// Enables or disables centered differences.
    #[must_use]
    pub const fn with_centered(mut self, centered: bool) -> Self {
        self.centered = centered;
        self
    }

    /// Checks that `eps` is usable.
    ///
    /// # Errors
    ///
    /// Returns [`PackingError::Configuration`] if `eps` is non-positive,
    /// non-finite or larger than `1e-2`.
    pub fn check(&self) -> PackingResult<()> {
        if self.eps.is_finite() && self.eps > 0.0 && self.eps <= 1e-2 {
            Ok(())
        } else {
            Err(PackingError::configuration(format!(
                "finite-difference eps must be in (0, 1e-2], got {}",
                self.eps
            )))
        }
    }
}

/// A vector function of the design vector with a Jacobian.
pub trait Differentiable {
    /// Length of the input vector.
    fn input_dim(&self) -> usize;

    /// Length of the output vector.
    fn output_dim(&self) -> usize;

    /// Evaluates the function.
    ///
    /// # Errors
    ///
    /// Returns an error for a wrongly sized input or a degenerate result.
    fn evaluate(&self, x: &DVector<f64>) -> PackingResult<DVector<f64>>;

    /// Jacobian `∂output/∂x` as an `output_dim × input_dim` matrix.
    ///
    /// Defaults to [`Differentiable::jacobian_fd`] with the default
    /// configuration.
    ///
    /// # Errors
    ///
    /// Same as [`Differentiable::evaluate`].
    fn jacobian(&self, x: &DVector<f64>) -> PackingResult<DMatrix<f64>> {
        self.jacobian_fd(x, &DerivativeConfig::default())
    }

    /// Finite-difference Jacobian.
    ///
    /// # Errors
    ///
    /// Returns [`PackingError::Configuration`] for an invalid `config` and
    /// propagates evaluation errors.
    fn jacobian_fd(&self, x: &DVector<f64>, config: &DerivativeConfig) -> PackingResult<DMatrix<f64>> {
        config.check()?;
        check_input(x, self.input_dim())?;
        let base = if config.centered {
            None
        } else {
            Some(self.evaluate(x)?)
        };
        let mut jacobian = DMatrix::zeros(self.output_dim(), x.len());
        let mut shifted = x.clone();
        for j in 0..x.len() {
            shifted[j] = x[j] + config.eps;
            let plus = self.evaluate(&shifted)?;
            let column = if let Some(base) = &base {
                (plus - base) / config.eps
            } else {
                shifted[j] = x[j] - config.eps;
                let minus = self.evaluate(&shifted)?;
                (plus - minus) / (2.0 * config.eps)
            };
            shifted[j] = x[j];
            jacobian.set_column(j, &column);
        }
        Ok(jacobian)
    }
}

/// Checks a design vector's length.
///
/// # Errors
///
/// Returns [`PackingError::Validation`] on a length mismatch.
pub fn check_input(x: &DVector<f64>, expected: usize) -> PackingResult<()> {
    if x.len() == expected {
        Ok(())
    } else {
        Err(PackingError::validation(format!(
            "design vector has {} entries, expected {expected}",
            x.len()
        )))
    }
}

/// Compare matrices element-wise, returning max relative error and location.
///
/// Uses `floor` to prevent division-by-zero for near-zero entries:
/// `rel_error(i,j) = |a(i,j) − b(i,j)| / max(|a(i,j)|, |b(i,j)|, floor)`
///
/// # Panics
///
/// Panics if `a` and `b` have different dimensions.
#[must_use]
pub fn max_relative_error(a: &DMatrix<f64>, b: &DMatrix<f64>, floor: f64) -> (f64, (usize, usize)) {
    assert_eq!(a.shape(), b.shape(), "matrix shapes differ");
    let mut max_err = 0.0_f64;
    let mut max_loc = (0, 0);
    for r in 0..a.nrows() {
        for c in 0..a.ncols() {
            let va = a[(r, c)];
            let vb = b[(r, c)];
            let denom = va.abs().max(vb.abs()).max(floor);
            let err = (va - vb).abs() / denom;
            if err > max_err {
                max_err = err;
                max_loc = (r, c);
            }
        }
    }
    (max_err, max_loc)
}

/// Compares a function's analytic Jacobian against finite differences.
///
/// Returns the maximum relative error and its location.
///
/// # Errors
///
/// Propagates evaluation and configuration errors.
pub fn validate_jacobian<F: Differentiable + ?Sized>(
    function: &F,
    x: &DVector<f64>,
    config: &DerivativeConfig,
    floor: f64,
) -> PackingResult<(f64, (usize, usize))> {
    let analytic = function.jacobian(x)?;
    let numeric = function.jacobian_fd(x, config)?;
    if analytic.shape() != numeric.shape() {
        return Err(PackingError::validation(format!(
            "analytic jacobian is {:?}, expected {:?}",
            analytic.shape(),
            numeric.shape()
        )));
    }
    Ok(max_relative_error(&analytic, &numeric, floor))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    /// `f(x, y) = (x²y, sin x)`.
    struct Toy;

    impl Differentiable for Toy {
        fn input_dim(&self) -> usize {
            2
        }

        fn output_dim(&self) -> usize {
            2
        }

        fn evaluate(&self, x: &DVector<f64>) -> PackingResult<DVector<f64>> {
            check_input(x, 2)?;
            Ok(DVector::from_vec(vec![x[0] * x[0] * x[1], x[0].sin()]))
        }

        fn jacobian(&self, x: &DVector<f64>) -> PackingResult<DMatrix<f64>> {
            Ok(DMatrix::from_row_slice(
                2,
                2,
                &[2.0 * x[0] * x[1], x[0] * x[0], x[0].cos(), 0.0],
            ))
        }
    }

    #[test]
    fn test_centered_fd() {
        let x = DVector::from_vec(vec![0.7, -1.3]);
        let fd = Toy.jacobian_fd(&x, &DerivativeConfig::default()).unwrap();
        let exact = Toy.jacobian(&x).unwrap();
        let (err, _) = max_relative_error(&fd, &exact, 1e-6);
        assert!(err < 1e-7, "err = {err}");
    }

    #[test]
    fn test_forward_fd_is_less_accurate() {
        let x = DVector::from_vec(vec![0.7, -1.3]);
        let config = DerivativeConfig::default().with_centered(false).with_eps(1e-4);
        let fd = Toy.jacobian_fd(&x, &config).unwrap();
        let exact = Toy.jacobian(&x).unwrap();
        let (err, _) = max_relative_error(&fd, &exact, 1e-6);
        assert!(err < 1e-3);
    }

    #[test]
    fn test_validate_jacobian() {
        let x = DVector::from_vec(vec![1.1, 0.4]);
        let (err, _) = validate_jacobian(&Toy, &x, &DerivativeConfig::default(), 1e-6).unwrap();
        assert!(err < 1e-6);
    }

    #[test]
    fn test_invalid_eps() {
        let x = DVector::from_vec(vec![0.0, 0.0]);
        let err = Toy
            .jacobian_fd(&x, &DerivativeConfig::default().with_eps(0.5))
            .unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn test_wrong_input_length() {
        let x = DVector::from_vec(vec![0.0; 3]);
        assert!(Toy.evaluate(&x).unwrap_err().is_validation());
    }

    #[test]
    fn test_max_relative_error_location() {
        let a = DMatrix::from_row_slice(2, 2, &[1.0, 2.0, 3.0, 4.0]);
        let b = DMatrix::from_row_slice(2, 2, &[1.0, 2.0, 3.3, 4.0]);
        let (err, loc) = max_relative_error(&a, &b, 1e-10);
        assert_eq!(loc, (1, 0));
        assert_relative_eq!(err, 0.3 / 3.3, epsilon = 1e-12);
    }
}
