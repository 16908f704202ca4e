//! Shared vocabulary of the kinematic core: joint value input and the serial-kinematics seam.

use std::collections::HashMap;

use crate::jacobian::Jacobian;
use crate::kinematics_error::KinematicsError;
use crate::transform::Transform;

/// Pose is used as a pose of the link or tool center point, position plus rotation.
pub type Pose = Transform;

/// Joint values given either by joint name or by position.
///
/// Positional values follow the order of `joint_parameter_names(true)` of whatever
/// they are passed to. Named values may be partial: joints that are not mentioned
/// stay at zero.
/// ```
/// use std::collections::HashMap;
/// use rs_chain_kinematics::kinematic_traits::JointValues;
///
/// let positional = JointValues::from(&[0.1, 0.2][..]);
/// let named_map = HashMap::from([("elbow".to_string(), 0.3)]);
/// let named = JointValues::from(&named_map);
/// assert!(matches!(positional, JointValues::Positional(_)));
/// assert!(matches!(named, JointValues::Named(_)));
/// ```
#[derive(Clone, Copy, Debug)]
pub enum JointValues<'a> {
    Named(&'a HashMap<String, f64>),
    Positional(&'a [f64]),
}

impl<'a> From<&'a HashMap<String, f64>> for JointValues<'a> {
    fn from(values: &'a HashMap<String, f64>) -> Self {
        JointValues::Named(values)
    }
}

impl<'a> From<&'a [f64]> for JointValues<'a> {
    fn from(values: &'a [f64]) -> Self {
        JointValues::Positional(values)
    }
}

impl<'a> From<&'a Vec<f64>> for JointValues<'a> {
    fn from(values: &'a Vec<f64>) -> Self {
        JointValues::Positional(values.as_slice())
    }
}

impl<'a, const N: usize> From<&'a [f64; N]> for JointValues<'a> {
    fn from(values: &'a [f64; N]) -> Self {
        JointValues::Positional(values.as_slice())
    }
}

/// Single-path mechanism driven by a positional joint vector. Implemented by
/// [`crate::serial_chain::SerialChain`] and by the [`crate::tool::Tool`] and
/// [`crate::tool::Base`] wrappers, so they can be cascaded and passed to the
/// inverse kinematics solver interchangeably.
pub trait SerialKinematics: Send + Sync {
    /// Number of movable joints, the expected length of `qs`.
    fn dof(&self) -> usize;

    /// Names of the movable joints, in the order positional values are consumed.
    fn joint_names(&self) -> Vec<String>;

    /// Pose of the end of the chain.
    fn forward(&self, qs: &[f64]) -> Result<Pose, KinematicsError>;

    /// Geometric Jacobian of [`SerialKinematics::forward`] at `qs`.
    fn jacobian(&self, qs: &[f64]) -> Result<Jacobian, KinematicsError>;
}

/// Checks the length of a positional joint vector.
pub(crate) fn check_joint_count(expected: usize, qs: &[f64]) -> Result<(), KinematicsError> {
    if qs.len() != expected {
        return Err(KinematicsError::JointCountMismatch { expected, found: qs.len() });
    }
    Ok(())
}
