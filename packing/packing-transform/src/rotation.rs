//! Elementary rotations and their angle derivatives.
//!
//! Rotations follow the right-hand rule. The composed rotation is
//! `R = Rx(rx) · Ry(ry) · Rz(rz)`.

use nalgebra::Matrix3;

/// Rotation about the X axis.
#[must_use]
pub fn rotation_x(angle: f64) -> Matrix3<f64> {
    let (sin_a, cos_a) = angle.sin_cos();
    #[rustfmt::skip]
    let matrix = Matrix3::new(
        1.0,   0.0,    0.0,
        0.0, cos_a, -sin_a,
        0.0, sin_a,  cos_a,
    );
    matrix
}

/// Rotation about the Y axis.
#[must_use]
pub fn rotation_y(angle: f64) -> Matrix3<f64> {
    let (sin_a, cos_a) = angle.sin_cos();
    #[rustfmt::skip]
    let matrix = Matrix3::new(
         cos_a, 0.0, sin_a,
           0.0, 1.0,   0.0,
        -sin_a, 0.0, cos_a,
    );
    matrix
}

/// Rotation about the Z axis.
#[must_use]
pub fn rotation_z(angle: f64) -> Matrix3<f64> {
    let (sin_a, cos_a) = angle.sin_cos();
    #[rustfmt::skip]
    let matrix = Matrix3::new(
        cos_a, -sin_a, 0.0,
        sin_a,  cos_a, 0.0,
          0.0,    0.0, 1.0,
    );
    matrix
}

fn d_rotation_x(angle: f64) -> Matrix3<f64> {
    let (sin_a, cos_a) = angle.sin_cos();
    #[rustfmt::skip]
    let matrix = Matrix3::new(
        0.0,    0.0,    0.0,
        0.0, -sin_a, -cos_a,
        0.0,  cos_a, -sin_a,
    );
    matrix
}

fn d_rotation_y(angle: f64) -> Matrix3<f64> {
    let (sin_a, cos_a) = angle.sin_cos();
    #[rustfmt::skip]
    let matrix = Matrix3::new(
        -sin_a, 0.0,  cos_a,
           0.0, 0.0,    0.0,
        -cos_a, 0.0, -sin_a,
    );
    matrix
}

fn d_rotation_z(angle: f64) -> Matrix3<f64> {
    let (sin_a, cos_a) = angle.sin_cos();
    #[rustfmt::skip]
    let matrix = Matrix3::new(
        -sin_a, -cos_a, 0.0,
         cos_a, -sin_a, 0.0,
           0.0,    0.0, 0.0,
    );
    matrix
}

/// Composed rotation `Rx(rx) · Ry(ry) · Rz(rz)`.
#[must_use]
pub fn rotation_xyz(angles: [f64; 3]) -> Matrix3<f64> {
    rotation_x(angles[0]) * rotation_y(angles[1]) * rotation_z(angles[2])
}

/// Partial derivatives of [`rotation_xyz`] with respect to `rx`, `ry`, `rz`.
#[must_use]
pub fn rotation_xyz_derivatives(angles: [f64; 3]) -> [Matrix3<f64>; 3] {
    let (rx, ry, rz) = (
        rotation_x(angles[0]),
        rotation_y(angles[1]),
        rotation_z(angles[2]),
    );
    [
        d_rotation_x(angles[0]) * ry * rz,
        rx * d_rotation_y(angles[1]) * rz,
        rx * ry * d_rotation_z(angles[2]),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::Vector3;
    use std::f64::consts::FRAC_PI_2;

    #[test]
    fn test_right_hand_rule() {
        let y = rotation_z(FRAC_PI_2) * Vector3::x();
        assert_relative_eq!(y, Vector3::y(), epsilon = 1e-12);
        let z = rotation_x(FRAC_PI_2) * Vector3::y();
        assert_relative_eq!(z, Vector3::z(), epsilon = 1e-12);
        let x = rotation_y(FRAC_PI_2) * Vector3::z();
        assert_relative_eq!(x, Vector3::x(), epsilon = 1e-12);
    }

    #[test]
    fn test_orthonormal() {
        let r = rotation_xyz([0.3, -1.2, 2.5]);
        assert_relative_eq!(r * r.transpose(), Matrix3::identity(), epsilon = 1e-12);
        assert_relative_eq!(r.determinant(), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_zero_is_identity() {
        assert_eq!(rotation_xyz([0.0; 3]), Matrix3::identity());
    }

    #[test]
    fn test_derivatives_match_fd() {
        let angles = [0.4, -0.7, 1.9];
        let derivatives = rotation_xyz_derivatives(angles);
        let h = 1e-6;
        for (axis, derivative) in derivatives.iter().enumerate() {
            let mut plus = angles;
            plus[axis] += h;
            let mut minus = angles;
            minus[axis] -= h;
            let fd = (rotation_xyz(plus) - rotation_xyz(minus)) / (2.0 * h);
            assert_relative_eq!(fd, *derivative, epsilon = 1e-8);
        }
    }
}
