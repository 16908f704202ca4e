//! Rigid 3D transform (rotation and translation) composed along the kinematic tree.
//!
//! The rotation is stored as a unit quaternion, the translation as a vector. Composition
//! `a * b` applies `b` in the frame of `a`:
//! ```
//! use nalgebra::Vector3;
//! use rs_chain_kinematics::transform::Transform;
//!
//! let shoulder = Transform::from_rpy(0.0, 0.0, std::f64::consts::FRAC_PI_2, Vector3::zeros());
//! let upper_arm = Transform::from_translation(Vector3::new(1.0, 0.0, 0.0));
//! let elbow = shoulder * upper_arm;
//! assert!((elbow.pos - Vector3::new(0.0, 1.0, 0.0)).norm() < 1e-12);
//! ```

use std::fmt;
use std::ops::Mul;

use nalgebra::{Isometry3, Matrix3, Matrix4, Point3, Quaternion, Translation3, UnitQuaternion, Vector3};

use crate::kinematics_error::KinematicsError;

/// Rigid pose: unit quaternion rotation plus translation.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Transform {
    pub rot: UnitQuaternion<f64>,
    pub pos: Vector3<f64>,
}

impl Default for Transform {
    fn default() -> Self {
        Self::identity()
    }
}

impl Transform {
    pub fn new(rot: UnitQuaternion<f64>, pos: Vector3<f64>) -> Self {
        Self { rot, pos }
    }

    pub fn identity() -> Self {
        Self { rot: UnitQuaternion::identity(), pos: Vector3::zeros() }
    }

    pub fn from_translation(pos: Vector3<f64>) -> Self {
        Self { rot: UnitQuaternion::identity(), pos }
    }

    /// Rotation from roll, pitch and yaw about the static X, Y and Z axes.
    pub fn from_rpy(roll: f64, pitch: f64, yaw: f64, pos: Vector3<f64>) -> Self {
        Self { rot: UnitQuaternion::from_euler_angles(roll, pitch, yaw), pos }
    }

    /// Builds the transform from a rotation given either as roll-pitch-yaw (3 values)
    /// or as a quaternion in `(w, x, y, z)` order (4 values). The quaternion is
    /// normalized, so slightly denormalized input from description files is accepted.
    ///
    /// # Errors
    /// [`KinematicsError::InvalidRotationSize`] for any other length.
    pub fn from_rotation_slice(rot: &[f64], pos: Vector3<f64>) -> Result<Self, KinematicsError> {
        match *rot {
            [roll, pitch, yaw] => Ok(Self::from_rpy(roll, pitch, yaw, pos)),
            [w, x, y, z] => Ok(Self {
                rot: UnitQuaternion::from_quaternion(Quaternion::new(w, x, y, z)),
                pos,
            }),
            _ => Err(KinematicsError::InvalidRotationSize(rot.len())),
        }
    }

    /// Composition `self ∘ other`: rotation `qA·qB`, translation `rotate(qA, posB) + posA`.
    pub fn compose(&self, other: &Transform) -> Transform {
        Transform {
            rot: self.rot * other.rot,
            pos: self.rot * other.pos + self.pos,
        }
    }

    /// Inverse such that `t * t.inverse()` is the identity.
    pub fn inverse(&self) -> Transform {
        let rot = self.rot.conjugate();
        Transform { rot, pos: -(rot * self.pos) }
    }

    pub fn transform_point(&self, p: &Point3<f64>) -> Point3<f64> {
        Point3::from(self.rot * p.coords + self.pos)
    }

    /// 4x4 homogeneous matrix.
    pub fn matrix(&self) -> Matrix4<f64> {
        self.isometry().to_homogeneous()
    }

    pub fn rot_mat(&self) -> Matrix3<f64> {
        self.rot.to_rotation_matrix().into_inner()
    }

    /// Roll, pitch, yaw (static XYZ), the inverse of [`Transform::from_rpy`].
    pub fn rot_euler(&self) -> (f64, f64, f64) {
        self.rot.euler_angles()
    }

    /// Rotation as `[w, x, y, z]`.
    pub fn quaternion_wxyz(&self) -> [f64; 4] {
        let q = self.rot.quaternion();
        [q.w, q.i, q.j, q.k]
    }

    pub fn isometry(&self) -> Isometry3<f64> {
        Isometry3::from_parts(Translation3::from(self.pos), self.rot)
    }
}

impl Mul for Transform {
    type Output = Transform;

    fn mul(self, rhs: Transform) -> Transform {
        self.compose(&rhs)
    }
}

impl Mul<&Transform> for &Transform {
    type Output = Transform;

    fn mul(self, rhs: &Transform) -> Transform {
        self.compose(rhs)
    }
}

impl From<Isometry3<f64>> for Transform {
    fn from(iso: Isometry3<f64>) -> Self {
        Transform { rot: iso.rotation, pos: iso.translation.vector }
    }
}

impl From<Transform> for Isometry3<f64> {
    fn from(t: Transform) -> Self {
        t.isometry()
    }
}

impl fmt::Display for Transform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [w, x, y, z] = self.quaternion_wxyz();
        write!(
            f,
            "Transform(rot=[{:.6}, {:.6}, {:.6}, {:.6}], pos=[{:.6}, {:.6}, {:.6}])",
            w, x, y, z, self.pos.x, self.pos.y, self.pos.z
        )
    }
}
