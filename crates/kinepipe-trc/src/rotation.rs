//! Rigid 3-D rotation of trajectory coordinates.
//!
//! A [`RotationSpec`] (three Euler angles in degrees) is turned into a single
//! [`Rotation`] matrix, which is then applied independently to every
//! coordinate triple.
//!
//! # Composition order
//!
//! Per-axis unit quaternions `qx`, `qy`, `qz` are built from the half-angles
//! and multiplied with the Hamilton product, always left to right:
//!
//! | Convention | Quaternion | Matrix |
//! |---|---|---|
//! | intrinsic | `(qx * qy) * qz` | `Rx · Ry · Rz` |
//! | extrinsic | `(qz * qy) * qx` | `Rz · Ry · Rx` |
//!
//! The combined quaternion is converted once to a row-major 3×3 matrix.  A
//! point is transformed as `m[i][0]*x + m[i][1]*y + m[i][2]*z`, summed left to
//! right, so identical inputs always give bit-identical outputs.
//!
//! # Example
//!
//! ```rust
//! use kinepipe_trc::rotation::{rotate, Vec3};
//! use kinepipe_types::RotationSpec;
//!
//! // 90° about X carries +Y onto +Z.
//! let spec = RotationSpec::new(90.0, 0.0, 0.0).unwrap();
//! let out = rotate(&[Vec3::new(0.0, 1.0, 0.0)], &spec);
//! assert!(out[0].y.abs() < 1e-12);
//! assert!((out[0].z - 1.0).abs() < 1e-12);
//! ```

use kinepipe_types::{EulerConvention, RotationSpec};

// ────────────────────────────────────────────────────────────────────────────
// Primitive types
// ────────────────────────────────────────────────────────────────────────────

/// A 3-D coordinate triple.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vec3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vec3 {
    /// Create a new vector.
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }

    /// Euclidean length.
    pub fn norm(self) -> f64 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }

    /// `true` when all three components are finite.  Untracked markers are
    /// stored as NaN and must not be rotated.
    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

/// A unit quaternion representing a 3-D rotation (w, x, y, z convention).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quaternion {
    pub w: f64,
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Quaternion {
    /// Create a quaternion.  The caller is responsible for providing a unit
    /// quaternion (|q| = 1).
    pub fn new(w: f64, x: f64, y: f64, z: f64) -> Self {
        Self { w, x, y, z }
    }

    /// The identity rotation (no rotation).
    pub fn identity() -> Self {
        Self::new(1.0, 0.0, 0.0, 0.0)
    }

    /// Rotation of `degrees` about the unit axis `(ax, ay, az)`.
    pub fn from_axis_angle(ax: f64, ay: f64, az: f64, degrees: f64) -> Self {
        let half = degrees.to_radians() / 2.0;
        let (s, c) = half.sin_cos();
        Self::new(c, ax * s, ay * s, az * s)
    }

    /// Hamilton product: compose two rotations.
    pub fn mul(self, rhs: Self) -> Self {
        Self::new(
            self.w * rhs.w - self.x * rhs.x - self.y * rhs.y - self.z * rhs.z,
            self.w * rhs.x + self.x * rhs.w + self.y * rhs.z - self.z * rhs.y,
            self.w * rhs.y - self.x * rhs.z + self.y * rhs.w + self.z * rhs.x,
            self.w * rhs.z + self.x * rhs.y - self.y * rhs.x + self.z * rhs.w,
        )
    }

    /// Rescale to unit length, removing drift accumulated by products.
    pub fn normalize(self) -> Self {
        let n = (self.w * self.w + self.x * self.x + self.y * self.y + self.z * self.z).sqrt();
        Self::new(self.w / n, self.x / n, self.y / n, self.z / n)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Rotation
// ────────────────────────────────────────────────────────────────────────────

/// A proper rotation stored as a row-major 3×3 matrix.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rotation {
    m: [[f64; 3]; 3],
}

impl Rotation {
    /// Build the combined rotation for `spec` (see the module docs for the
    /// exact composition order).
    pub fn from_spec(spec: &RotationSpec) -> Self {
        let qx = Quaternion::from_axis_angle(1.0, 0.0, 0.0, spec.x);
        let qy = Quaternion::from_axis_angle(0.0, 1.0, 0.0, spec.y);
        let qz = Quaternion::from_axis_angle(0.0, 0.0, 1.0, spec.z);
        let q = match spec.convention {
            EulerConvention::Intrinsic => qx.mul(qy).mul(qz),
            EulerConvention::Extrinsic => qz.mul(qy).mul(qx),
        };
        Self::from_quaternion(q.normalize())
    }

    /// Convert a unit quaternion to its rotation matrix.
    pub fn from_quaternion(q: Quaternion) -> Self {
        let Quaternion { w, x, y, z } = q;
        Self {
            m: [
                [
                    1.0 - 2.0 * (y * y + z * z),
                    2.0 * (x * y - w * z),
                    2.0 * (x * z + w * y),
                ],
                [
                    2.0 * (x * y + w * z),
                    1.0 - 2.0 * (x * x + z * z),
                    2.0 * (y * z - w * x),
                ],
                [
                    2.0 * (x * z - w * y),
                    2.0 * (y * z + w * x),
                    1.0 - 2.0 * (x * x + y * y),
                ],
            ],
        }
    }

    /// The row-major matrix.
    pub fn matrix(&self) -> [[f64; 3]; 3] {
        self.m
    }

    /// The inverse rotation (the transpose of an orthonormal matrix).
    pub fn inverse(&self) -> Self {
        let m = self.m;
        Self {
            m: [
                [m[0][0], m[1][0], m[2][0]],
                [m[0][1], m[1][1], m[2][1]],
                [m[0][2], m[1][2], m[2][2]],
            ],
        }
    }

    /// Rotate a single point.
    pub fn apply(&self, p: Vec3) -> Vec3 {
        let m = &self.m;
        Vec3::new(
            m[0][0] * p.x + m[0][1] * p.y + m[0][2] * p.z,
            m[1][0] * p.x + m[1][1] * p.y + m[1][2] * p.z,
            m[2][0] * p.x + m[2][1] * p.y + m[2][2] * p.z,
        )
    }

    /// Rotate every finite point in place; points with a missing component
    /// are left untouched.
    pub fn apply_in_place(&self, points: &mut [Vec3]) {
        for p in points.iter_mut().filter(|p| p.is_finite()) {
            *p = self.apply(*p);
        }
    }
}

/// Rotate `points` by `spec`, returning a new sequence of the same length and
/// order.  An empty input yields an empty output.
pub fn rotate(points: &[Vec3], spec: &RotationSpec) -> Vec<Vec3> {
    let mut out = points.to_vec();
    Rotation::from_spec(spec).apply_in_place(&mut out);
    out
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    const TOL: f64 = 1e-9;

    fn assert_close(a: Vec3, b: Vec3) {
        assert!(
            a.sub(b).norm() < TOL,
            "expected {b:?}, got {a:?}"
        );
    }

    fn sample_points() -> Vec<Vec3> {
        vec![
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(0.25, -1.5, 2.0),
            Vec3::new(-3.2, 0.7, 0.01),
            Vec3::new(120.5, 88.0, -40.25),
        ]
    }

    fn sample_specs() -> Vec<RotationSpec> {
        vec![
            RotationSpec::new(180.0, 180.0, 0.0).unwrap(),
            RotationSpec::new(-90.0, 0.0, 0.0).unwrap(),
            RotationSpec::new(33.0, -71.5, 140.0).unwrap(),
            RotationSpec::with_convention(12.0, 45.0, -200.0, EulerConvention::Extrinsic)
                .unwrap(),
        ]
    }

    // ── Quaternion ──────────────────────────────────────────────────────────

    #[test]
    fn quaternion_identity_mul_is_noop() {
        let q = Quaternion::from_axis_angle(0.0, 0.0, 1.0, 30.0);
        let r = Quaternion::identity().mul(q);
        assert!((r.w - q.w).abs() < TOL);
        assert!((r.z - q.z).abs() < TOL);
    }

    #[test]
    fn quaternion_90deg_about_z_rotates_x_to_y() {
        let rot = Rotation::from_quaternion(Quaternion::from_axis_angle(0.0, 0.0, 1.0, 90.0));
        assert_close(rot.apply(Vec3::new(1.0, 0.0, 0.0)), Vec3::new(0.0, 1.0, 0.0));
    }

    // ── rotate ──────────────────────────────────────────────────────────────

    #[test]
    fn zero_angles_are_identity() {
        let points = sample_points();
        let out = rotate(&points, &RotationSpec::identity());
        for (a, b) in out.iter().zip(&points) {
            assert_close(*a, *b);
        }
    }

    #[test]
    fn empty_input_returns_empty_output() {
        let spec = RotationSpec::new(10.0, 20.0, 30.0).unwrap();
        assert!(rotate(&[], &spec).is_empty());
    }

    #[test]
    fn half_turns_about_x_then_y_compose_to_half_turn_about_z() {
        let spec = RotationSpec::new(180.0, 180.0, 0.0).unwrap();
        let out = rotate(
            &[Vec3::new(1.0, 0.0, 0.0), Vec3::new(0.0, 0.0, 1.0)],
            &spec,
        );
        // Rx(180)·Ry(180) == Rz(180): x flips, z is a fixed point.
        assert_close(out[0], Vec3::new(-1.0, 0.0, 0.0));
        assert_close(out[1], Vec3::new(0.0, 0.0, 1.0));
    }

    #[test]
    fn intrinsic_and_extrinsic_differ_for_non_commuting_angles() {
        let p = [Vec3::new(1.0, 0.0, 0.0)];
        let intrinsic = RotationSpec::new(90.0, 90.0, 0.0).unwrap();
        let extrinsic =
            RotationSpec::with_convention(90.0, 90.0, 0.0, EulerConvention::Extrinsic).unwrap();

        assert_close(rotate(&p, &intrinsic)[0], Vec3::new(0.0, 1.0, 0.0));
        assert_close(rotate(&p, &extrinsic)[0], Vec3::new(0.0, 0.0, -1.0));
    }

    #[test]
    fn rotate_then_inverse_restores_points() {
        let points = sample_points();
        for spec in sample_specs() {
            let rot = Rotation::from_spec(&spec);
            let inv = rot.inverse();
            for p in &points {
                assert_close(inv.apply(rot.apply(*p)), *p);
            }
        }
    }

    #[test]
    fn rotating_twice_then_inverting_twice_restores_points() {
        let points = sample_points();
        for spec in sample_specs() {
            let rot = Rotation::from_spec(&spec);
            let inv = rot.inverse();
            for p in &points {
                let there = rot.apply(rot.apply(*p));
                assert_close(inv.apply(inv.apply(there)), *p);
            }
        }
    }

    #[test]
    fn rotation_preserves_pairwise_distances() {
        let points = sample_points();
        for spec in sample_specs() {
            let out = rotate(&points, &spec);
            for i in 0..points.len() {
                for j in (i + 1)..points.len() {
                    let before = points[i].sub(points[j]).norm();
                    let after = out[i].sub(out[j]).norm();
                    assert!((before - after).abs() < 1e-9, "{spec}: {before} vs {after}");
                }
            }
        }
    }

    #[test]
    fn rotation_is_deterministic() {
        let spec = RotationSpec::new(33.0, -71.5, 140.0).unwrap();
        let a = rotate(&sample_points(), &spec);
        let b = rotate(&sample_points(), &spec);
        for (p, q) in a.iter().zip(&b) {
            assert_eq!(p.x.to_bits(), q.x.to_bits());
            assert_eq!(p.y.to_bits(), q.y.to_bits());
            assert_eq!(p.z.to_bits(), q.z.to_bits());
        }
    }

    #[test]
    fn missing_points_pass_through_untouched() {
        let spec = RotationSpec::new(180.0, 0.0, 0.0).unwrap();
        let out = rotate(
            &[Vec3::new(f64::NAN, 2.0, 3.0), Vec3::new(0.0, 1.0, 0.0)],
            &spec,
        );
        assert!(out[0].x.is_nan());
        assert_eq!(out[0].y, 2.0);
        assert_eq!(out[0].z, 3.0);
        assert_close(out[1], Vec3::new(0.0, -1.0, 0.0));
    }

    #[test]
    fn matrix_is_orthonormal() {
        for spec in sample_specs() {
            let m = Rotation::from_spec(&spec).matrix();
            for i in 0..3 {
                for j in 0..3 {
                    let dot: f64 = (0..3).map(|k| m[i][k] * m[j][k]).sum();
                    let expected = if i == j { 1.0 } else { 0.0 };
                    assert!((dot - expected).abs() < 1e-12);
                }
            }
        }
    }
}
