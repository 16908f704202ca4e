//! Provides tool and base for the chain.
//! Both Tool and Base take arbitrary implementation of SerialKinematics and are such
//! implementations themselves. Hence, they can be cascaded, like base, having the arm,
//! that arm having a tool:
//! ```
//! use std::sync::Arc;
//! use nalgebra::Vector3;
//! use rs_chain_kinematics::chain::Chain;
//! use rs_chain_kinematics::frame::{Frame, Joint, Link};
//! use rs_chain_kinematics::kinematic_traits::{Pose, SerialKinematics};
//! use rs_chain_kinematics::serial_chain::SerialChain;
//! use rs_chain_kinematics::transform::Transform;
//!
//! let mut root = Frame::new("base_frame", Link::new("base"), Joint::default());
//! root.add_child(Frame::new("arm_frame", Link::new("arm"),
//!     Joint::revolute("shoulder", Transform::identity(), Vector3::z())));
//! let arm = SerialChain::new(Arc::new(Chain::new(root)), "arm_frame").unwrap();
//!
//! // Half meter high pedestal
//! let arm_on_base = rs_chain_kinematics::tool::Base {
//!   robot: Arc::new(arm),
//!   base: Transform::from_translation(Vector3::new(0.0, 0.0, 0.5)),
//! };
//!
//! // Tool extends 1 meter in the X direction, envisioning something like sword
//! let arm_complete = rs_chain_kinematics::tool::Tool {
//!   robot: Arc::new(arm_on_base),
//!   tool: Transform::from_translation(Vector3::new(1.0, 0.0, 0.0)),
//! };
//!
//! let tcp_pose: Pose = arm_complete.forward(&[0.0]).unwrap();
//! assert!((tcp_pose.pos - Vector3::new(1.0, 0.0, 0.5)).norm() < 1e-9);
//! ```

use std::sync::Arc;

use nalgebra::{Matrix3, Vector3};

use crate::jacobian::Jacobian;
use crate::kinematic_traits::{Pose, SerialKinematics};
use crate::kinematics_error::KinematicsError;
use crate::transform::Transform;

/// Defines the fixed tool that can be attached to the end frame of the chain.
/// The tool moves with the chain, providing additional translation and, if needed,
/// rotation. The tool itself implements SerialKinematics, with "pose" being the
/// position and rotation of the tip of the tool (tool center point).
#[derive(Clone)]
pub struct Tool {
    pub robot: Arc<dyn SerialKinematics>,

    /// Transformation from the end frame to the tool's TCP.
    pub tool: Transform,
}

/// Defines the fixed base that holds the chain.
/// The base moves the chain to its installed location, providing also rotation if
/// required (an arm may be installed upside down, or at some angle like 45 degrees).
#[derive(Clone)]
pub struct Base {
    pub robot: Arc<dyn SerialKinematics>,

    /// Transformation from the world origin to the chain's root.
    pub base: Transform,
}

impl SerialKinematics for Tool {
    fn dof(&self) -> usize {
        self.robot.dof()
    }

    fn joint_names(&self) -> Vec<String> {
        self.robot.joint_names()
    }

    fn forward(&self, qs: &[f64]) -> Result<Pose, KinematicsError> {
        let flange = self.robot.forward(qs)?;
        Ok(flange * self.tool)
    }

    /// The angular part is unchanged; the linear part gains `ω × r`, `r` being the
    /// flange to TCP offset in the world frame.
    fn jacobian(&self, qs: &[f64]) -> Result<Jacobian, KinematicsError> {
        let flange = self.robot.forward(qs)?;
        let mut matrix = self.robot.jacobian(qs)?.into_matrix();
        let r: Vector3<f64> = flange.rot * self.tool.pos;
        for mut column in matrix.column_iter_mut() {
            let angular = Vector3::new(column[3], column[4], column[5]);
            let extra = angular.cross(&r);
            column[0] += extra.x;
            column[1] += extra.y;
            column[2] += extra.z;
        }
        Ok(Jacobian::from_matrix(matrix))
    }
}

impl SerialKinematics for Base {
    fn dof(&self) -> usize {
        self.robot.dof()
    }

    fn joint_names(&self) -> Vec<String> {
        self.robot.joint_names()
    }

    fn forward(&self, qs: &[f64]) -> Result<Pose, KinematicsError> {
        Ok(self.base * self.robot.forward(qs)?)
    }

    /// Both 3-row blocks are rotated into the world frame.
    fn jacobian(&self, qs: &[f64]) -> Result<Jacobian, KinematicsError> {
        let rotation: Matrix3<f64> = self.base.rot_mat();
        let mut matrix = self.robot.jacobian(qs)?.into_matrix();
        let columns = matrix.ncols();
        let linear = rotation * matrix.rows(0, 3);
        let angular = rotation * matrix.rows(3, 3);
        matrix.view_mut((0, 0), (3, columns)).copy_from(&linear);
        matrix.view_mut((3, 0), (3, columns)).copy_from(&angular);
        Ok(Jacobian::from_matrix(matrix))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::Chain;
    use crate::frame::{Frame, Joint, Link};
    use crate::ik::{inverse_kinematics, IkConfig};
    use crate::serial_chain::SerialChain;
    use std::f64::consts::PI;

    /// Asserts that two translations differ by the expected amount.
    pub(crate) fn assert_diff(a: &Vector3<f64>, b: &Vector3<f64>, expected_diff: [f64; 3], epsilon: f64) {
        let actual_diff = a - b;
        for (axis, (actual, expected)) in ["X", "Y", "Z"].iter().zip(actual_diff.iter().zip(expected_diff)) {
            assert!(
                (actual - expected).abs() <= epsilon,
                "{} difference is not as expected: actual difference = {}, expected difference = {}",
                axis, actual, expected
            );
        }
    }

    /// Two revolute joints: a turntable about z, then a tilt about y 0.5 m above it,
    /// with a 1 m arm along x.
    fn arm() -> SerialChain {
        let mut root = Frame::new("base_frame", Link::new("base"), Joint::default());
        let turntable = root.add_child(Frame::new("turntable_frame", Link::new("turntable"),
            Joint::revolute("j1", Transform::identity(), Vector3::z())));
        let tilt = turntable.add_child(Frame::new("tilt_frame", Link::new("tilt"),
            Joint::revolute("j2", Transform::from_translation(Vector3::new(0.0, 0.0, 0.5)), Vector3::y())));
        tilt.add_child(Frame::new("flange_frame", Link::new("flange"),
            Joint::fixed("mount", Transform::from_translation(Vector3::new(1.0, 0.0, 0.0)))));
        SerialChain::new(Arc::new(Chain::new(root)), "flange_frame").unwrap()
    }

    fn diff(without: &dyn SerialKinematics, with: &dyn SerialKinematics, joints: &[f64]) -> (Pose, Pose) {
        (without.forward(joints).unwrap(), with.forward(joints).unwrap())
    }

    #[test]
    fn test_tool() {
        let robot_without_tool = Arc::new(arm());
        // Tool extends 1 meter in the Z direction of the flange
        let robot_with_tool = Tool {
            robot: robot_without_tool.clone(),
            tool: Transform::from_translation(Vector3::new(0.0, 0.0, 1.0)),
        };

        let (without, with) = diff(robot_without_tool.as_ref(), &robot_with_tool, &[0.0, 0.0]);
        assert_diff(&with.pos, &without.pos, [0.0, 0.0, 1.0], 1e-6);

        // Tilting by 90 degrees about y turns flange z into world x
        let (without, with) = diff(robot_without_tool.as_ref(), &robot_with_tool, &[0.0, PI / 2.0]);
        assert_diff(&with.pos, &without.pos, [1.0, 0.0, 0.0], 1e-6);

        // Then rotating the turntable 90 degrees moves the tool offset to y
        let (without, with) = diff(robot_without_tool.as_ref(), &robot_with_tool, &[PI / 2.0, PI / 2.0]);
        assert_diff(&with.pos, &without.pos, [0.0, 1.0, 0.0], 1e-6);
    }

    #[test]
    fn test_base() {
        let robot_without_base = Arc::new(arm());
        // 1 meter high pedestal
        let robot_with_base = Base {
            robot: robot_without_base.clone(),
            base: Transform::from_translation(Vector3::new(0.0, 0.0, 1.0)),
        };

        let (without, with) = diff(robot_without_base.as_ref(), &robot_with_base, &[0.0, 0.0]);
        assert_diff(&with.pos, &without.pos, [0.0, 0.0, 1.0], 1e-6);

        // Rotating the turntable does not change the pedestal offset
        let (without, with) = diff(robot_without_base.as_ref(), &robot_with_base, &[PI / 3.0, 0.2]);
        assert_diff(&with.pos, &without.pos, [0.0, 0.0, 1.0], 1e-6);
        assert_eq!(robot_with_base.dof(), 2);
        assert_eq!(robot_with_base.joint_names(), vec!["j1", "j2"]);
    }

    /// Both wrappers must keep their Jacobians consistent with their forward kinematics.
    #[test]
    fn test_jacobians_match_finite_differences() {
        let robot_with_base = Arc::new(Base {
            robot: Arc::new(arm()),
            base: Transform::from_rpy(0.0, 0.3, 0.5, Vector3::new(0.2, 0.0, 1.0)),
        });
        let complete = Tool {
            robot: robot_with_base,
            tool: Transform::from_rpy(0.1, 0.0, 0.0, Vector3::new(0.1, 0.2, 0.3)),
        };

        let qs = [0.4, -0.3];
        let jacobian = complete.jacobian(&qs).unwrap();
        let h = 1e-6;
        for i in 0..2 {
            let mut plus = qs;
            let mut minus = qs;
            plus[i] += h;
            minus[i] -= h;
            let p = complete.forward(&plus).unwrap();
            let m = complete.forward(&minus).unwrap();
            let linear = (p.pos - m.pos) / (2.0 * h);
            let angular = (p.rot * m.rot.inverse()).scaled_axis() / (2.0 * h);
            for r in 0..3 {
                assert!((jacobian.matrix()[(r, i)] - linear[r]).abs() < 1e-5,
                        "linear row {r} column {i}: {} vs {}", jacobian.matrix()[(r, i)], linear[r]);
                assert!((jacobian.matrix()[(r + 3, i)] - angular[r]).abs() < 1e-5,
                        "angular row {r} column {i}: {} vs {}", jacobian.matrix()[(r + 3, i)], angular[r]);
            }
        }
    }

    #[test]
    fn test_inverse_kinematics_through_wrappers() {
        let complete = Tool {
            robot: Arc::new(Base {
                robot: Arc::new(arm()),
                base: Transform::from_translation(Vector3::new(0.0, 0.0, 0.5)),
            }),
            tool: Transform::from_translation(Vector3::new(0.0, 0.0, 0.2)),
        };
        let expected = [0.3, 0.2];
        let target = complete.forward(&expected).unwrap();
        let found = inverse_kinematics(&complete, &target, None, &IkConfig::default()).unwrap();
        for (f, e) in found.iter().zip(expected) {
            assert!((f - e).abs() < 1e-6, "{f} vs {e}");
        }
    }
}
