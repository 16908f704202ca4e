extern crate nalgebra as na;

use na::linalg::SVD;
use na::{DMatrix, DVector, Isometry3, Unit, Vector6};

use crate::chain::FrameNode;
use crate::frame::JointType;
use crate::kinematic_traits::check_joint_count;
use crate::kinematics_error::KinematicsError;
use crate::transform::Transform;

/// Tolerance below which singular values are treated as zero when the pseudo-inverse is needed.
const PSEUDO_INVERSE_EPSILON: f64 = 1e-9;

/// Struct representing the geometric Jacobian of a serial chain
pub struct Jacobian {
    /// A 6xN matrix, N being the number of movable joints.
    ///
    /// The Jacobian matrix maps the joint velocities to the end-effector velocities.
    /// Each column corresponds to a joint, the first three rows are the linear and the
    /// last three the angular velocity of the end-effector, both in the world frame.
    matrix: DMatrix<f64>,
}

impl Jacobian {
    pub fn from_matrix(matrix: DMatrix<f64>) -> Self {
        Self { matrix }
    }

    pub fn matrix(&self) -> &DMatrix<f64> {
        &self.matrix
    }

    pub fn into_matrix(self) -> DMatrix<f64> {
        self.matrix
    }

    /// Number of joint columns.
    pub fn dof(&self) -> usize {
        self.matrix.ncols()
    }

    /// Computes the joint velocities required to achieve a desired end-effector velocity
    ///
    /// # Arguments
    ///
    /// * `desired_end_effector_velocity` - An Isometry3 representing the desired linear and angular velocity of the end-effector
    ///
    /// # Returns
    ///
    /// Joint velocities, one per column, or an error message if the computation fails.
    pub fn velocities(&self, desired_end_effector_velocity: &Isometry3<f64>) -> Result<Vec<f64>, &'static str> {
        self.velocities_from_vector(&to_vector6(desired_end_effector_velocity))
    }

    /// Computes the joint velocities required to achieve a desired end-effector velocity
    /// given as a 6D vector (linear, then angular).
    ///
    /// The inverse of the Jacobian is used when the matrix is square and invertible,
    /// the SVD pseudo-inverse otherwise. For redundant or under-actuated chains this
    /// gives the least-squares, minimum-norm joint velocities.
    pub fn velocities_from_vector(&self, desired_end_effector_velocity: &Vector6<f64>) -> Result<Vec<f64>, &'static str> {
        let desired = DVector::from_column_slice(desired_end_effector_velocity.as_slice());

        if self.matrix.is_square() {
            if let Some(jacobian_inverse) = self.matrix.clone().try_inverse() {
                return Ok((jacobian_inverse * desired).as_slice().to_vec());
            }
        }

        let svd = SVD::new(self.matrix.clone(), true, true);
        let jacobian_pseudoinverse = svd
            .pseudo_inverse(PSEUDO_INVERSE_EPSILON)
            .map_err(|_| "Unable to compute the pseudoinverse of the Jacobian matrix")?;
        Ok((jacobian_pseudoinverse * desired).as_slice().to_vec())
    }

    /// Computes the joint torques required to achieve a desired end-effector force/torque
    ///
    /// # Arguments
    ///
    /// * `desired_force_torque` - isometry structure representing forces and torques
    ///                            rather than dimensions and angles.
    pub fn torques(&self, desired_force_torque: &Isometry3<f64>) -> Vec<f64> {
        self.torques_from_vector(&to_vector6(desired_force_torque))
    }

    /// Joint torques `Jᵀ·w` for the wrench `w` (force, then torque) at the end-effector.
    pub fn torques_from_vector(&self, desired_force_torque: &Vector6<f64>) -> Vec<f64> {
        let wrench = DVector::from_column_slice(desired_force_torque.as_slice());
        (self.matrix.transpose() * wrench).as_slice().to_vec()
    }
}

fn to_vector6(iso: &Isometry3<f64>) -> Vector6<f64> {
    let linear = iso.translation.vector;
    let angular = iso.rotation.scaled_axis();
    Vector6::new(linear.x, linear.y, linear.z, angular.x, angular.y, angular.z)
}

/// Geometric Jacobian of the last frame in `frames`, the path of a serial chain from
/// its start to its end, at joint values `thetas` (one per movable joint on the path).
/// `tool` is an optional fixed offset from the end frame to the tool center point.
pub fn calc_jacobian(frames: &[&FrameNode], thetas: &[f64], tool: Option<&Transform>)
                     -> Result<Jacobian, KinematicsError> {
    check_joint_count(movable_count(frames), thetas)?;
    Ok(backward_pass(frames, thetas, thetas.len(), tool))
}

/// Geometric Jacobian of an intermediate link of the path. The matrix still has one
/// column per movable joint of the whole path; columns of joints past the link are zero.
///
/// # Errors
/// [`KinematicsError::FrameNotFound`] if no frame on the path carries `link_name`.
pub fn calc_jacobian_frames(frames: &[&FrameNode], thetas: &[f64], link_name: &str, tool: Option<&Transform>)
                            -> Result<Jacobian, KinematicsError> {
    check_joint_count(movable_count(frames), thetas)?;
    let end = frames
        .iter()
        .position(|f| f.link().name == link_name)
        .ok_or_else(|| KinematicsError::FrameNotFound(link_name.to_string()))?;
    let prefix = &frames[..=end];
    let k = movable_count(prefix);
    Ok(backward_pass(prefix, &thetas[..k], thetas.len(), tool))
}

fn movable_count(frames: &[&FrameNode]) -> usize {
    frames.iter().filter(|f| f.joint().joint_type.is_movable()).count()
}

/// Walks `frames` from the last to the first, unwinding the transform towards the start
/// and writing one column per movable joint, back to front. `thetas` holds exactly the
/// values of the movable joints in `frames`; the matrix gets `columns` columns.
fn backward_pass(frames: &[&FrameNode], thetas: &[f64], columns: usize, tool: Option<&Transform>) -> Jacobian {
    let mut flange = DMatrix::<f64>::zeros(6, columns);
    let mut current = tool.copied().unwrap_or_default();
    let mut col = thetas.len();

    for frame in frames.iter().rev() {
        let joint = frame.joint();
        let rot_t = current.rot_mat().transpose();
        let theta = match joint.joint_type {
            JointType::Revolute => {
                col -= 1;
                // Rotation is about the unit axis; a degenerate axis leaves a zero column
                if let Some(axis) = Unit::try_new(joint.axis, f64::EPSILON) {
                    let linear = rot_t * axis.cross(&current.pos);
                    let angular = rot_t * axis.into_inner();
                    flange.fixed_view_mut::<3, 1>(0, col).copy_from(&linear);
                    flange.fixed_view_mut::<3, 1>(3, col).copy_from(&angular);
                }
                thetas[col]
            }
            JointType::Prismatic => {
                col -= 1;
                flange.fixed_view_mut::<3, 1>(0, col).copy_from(&(rot_t * joint.axis));
                thetas[col]
            }
            JointType::Fixed => 0.0,
        };
        current = frame.transform(theta) * current;
    }

    // From the end frame to the world frame
    let rotation = end_pose(frames, thetas).rot_mat();
    let mut world = DMatrix::<f64>::zeros(6, columns);
    world.view_mut((0, 0), (3, columns)).copy_from(&(rotation * flange.rows(0, 3)));
    world.view_mut((3, 0), (3, columns)).copy_from(&(rotation * flange.rows(3, 3)));
    Jacobian { matrix: world }
}

/// Pose of the last link of `frames` relative to the parent of the first frame.
fn end_pose(frames: &[&FrameNode], thetas: &[f64]) -> Transform {
    let mut values = thetas.iter();
    let mut pose = Transform::identity();
    for frame in frames {
        let theta = if frame.joint().joint_type.is_movable() {
            values.next().copied().unwrap_or(0.0)
        } else {
            0.0
        };
        pose = pose * frame.transform(theta);
    }
    match frames.last() {
        Some(last) => pose * last.link().offset,
        None => pose,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::Chain;
    use crate::frame::{Frame, Joint, Link};
    use na::{UnitQuaternion, Vector3};
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    const EPSILON: f64 = 1e-6;

    /// link1 ─ j1 (revolute, origin) ─ link2 ─ j2 (offset (1, 0, 0)) ─ link3
    fn two_joint_chain(second: JointType) -> Chain {
        let mut root = Frame::new("link1_frame", Link::new("link1"), Joint::default());
        let link2 = root.add_child(Frame::new(
            "link2_frame",
            Link::new("link2"),
            Joint::new("j1", Transform::identity(), JointType::Revolute, None),
        ));
        link2.add_child(Frame::new(
            "link3_frame",
            Link::new("link3"),
            Joint::new("j2", Transform::from_translation(Vector3::new(1.0, 0.0, 0.0)), second, None),
        ));
        Chain::new(root)
    }

    fn path(chain: &Chain) -> Vec<&FrameNode> {
        chain.walk().collect()
    }

    fn assert_matrix_approx_eq(left: &DMatrix<f64>, right: &DMatrix<f64>, epsilon: f64) {
        assert_eq!(left.shape(), right.shape());
        for i in 0..left.nrows() {
            for j in 0..left.ncols() {
                assert!((left[(i, j)] - right[(i, j)]).abs() < epsilon,
                        "left[{0},{1}] = {2} is not approximately equal to right[{0},{1}] = {3}",
                        i, j, left[(i, j)], right[(i, j)]);
            }
        }
    }

    #[test]
    fn test_jacobian_two_revolute() {
        let chain = two_joint_chain(JointType::Revolute);
        let jacobian = calc_jacobian(&path(&chain), &[0.0, 0.0], None).unwrap();
        let expected = DMatrix::from_row_slice(6, 2, &[
            0.0, 0.0,
            1.0, 0.0,
            0.0, 0.0,
            0.0, 0.0,
            0.0, 0.0,
            1.0, 1.0,
        ]);
        assert_matrix_approx_eq(jacobian.matrix(), &expected, EPSILON);
    }

    #[test]
    fn test_jacobian_revolute_prismatic() {
        let chain = two_joint_chain(JointType::Prismatic);
        let jacobian = calc_jacobian(&path(&chain), &[0.0, 0.0], None).unwrap();
        let expected = DMatrix::from_row_slice(6, 2, &[
            0.0, 0.0,
            1.0, 0.0,
            0.0, 1.0,
            0.0, 0.0,
            0.0, 0.0,
            1.0, 0.0,
        ]);
        assert_matrix_approx_eq(jacobian.matrix(), &expected, EPSILON);
    }

    #[test]
    fn test_jacobian_intermediate_link() {
        let chain = two_joint_chain(JointType::Revolute);
        let jacobian = calc_jacobian_frames(&path(&chain), &[0.3, 0.0], "link2", None).unwrap();
        let expected = DMatrix::from_row_slice(6, 2, &[
            0.0, 0.0,
            0.0, 0.0,
            0.0, 0.0,
            0.0, 0.0,
            0.0, 0.0,
            1.0, 0.0,
        ]);
        assert_matrix_approx_eq(jacobian.matrix(), &expected, EPSILON);

        let err = calc_jacobian_frames(&path(&chain), &[0.0, 0.0], "nowhere", None).err();
        assert_eq!(err, Some(KinematicsError::FrameNotFound("nowhere".into())));
    }

    #[test]
    fn test_jacobian_with_tool() {
        let chain = two_joint_chain(JointType::Revolute);
        let tool = Transform::from_translation(Vector3::new(0.5, 0.0, 0.0));
        let jacobian = calc_jacobian(&path(&chain), &[0.0, 0.0], Some(&tool)).unwrap();
        // The tool tip is 1.5 m from the first axis and 0.5 m from the second
        assert!((jacobian.matrix()[(1, 0)] - 1.5).abs() < EPSILON);
        assert!((jacobian.matrix()[(1, 1)] - 0.5).abs() < EPSILON);
    }

    #[test]
    fn test_jacobian_count_mismatch() {
        let chain = two_joint_chain(JointType::Revolute);
        let err = calc_jacobian(&path(&chain), &[0.0], None).err();
        assert_eq!(err, Some(KinematicsError::JointCountMismatch { expected: 2, found: 1 }));
    }

    /// Three joints on tilted axes, checked against central differences of forward kinematics.
    #[test]
    fn test_jacobian_matches_finite_differences() {
        let mut root = Frame::new("base_frame", Link::new("base"), Joint::default());
        let a = root.add_child(Frame::new("a_frame", Link::new("a"), Joint::revolute(
            "j1", Transform::from_translation(Vector3::new(0.0, 0.0, 0.4)), Vector3::new(0.0, 0.0, 1.0))));
        let b = a.add_child(Frame::new("b_frame", Link::new("b"), Joint::revolute(
            "j2", Transform::from_rpy(0.2, 0.0, 0.1, Vector3::new(0.3, 0.0, 0.2)), Vector3::new(0.0, 1.0, 0.0))));
        let c = b.add_child(Frame::new("c_frame", Link::new("c"), Joint::prismatic(
            "j3", Transform::from_translation(Vector3::new(0.5, 0.1, 0.0)), Vector3::new(1.0, 0.0, 1.0))));
        c.add_child(Frame::new("tip_frame", Link::new("tip"), Joint::fixed(
            "weld", Transform::from_translation(Vector3::new(0.0, 0.0, 0.2)))));
        let chain = Chain::new(root);
        let frames = path(&chain);

        let mut rng = StdRng::seed_from_u64(42);
        let h = 1e-6;
        for _ in 0..20 {
            let qs: Vec<f64> = (0..3).map(|_| rng.gen_range(-1.0..1.0)).collect();
            let jacobian = calc_jacobian(&frames, &qs, None).unwrap();
            for i in 0..3 {
                let mut plus = qs.clone();
                let mut minus = qs.clone();
                plus[i] += h;
                minus[i] -= h;
                let p = end_pose(&frames, &plus);
                let m = end_pose(&frames, &minus);
                let linear = (p.pos - m.pos) / (2.0 * h);
                let angular: Vector3<f64> = (p.rot * m.rot.inverse()).scaled_axis() / (2.0 * h);
                for r in 0..3 {
                    assert!((jacobian.matrix()[(r, i)] - linear[r]).abs() < 1e-5,
                            "linear row {r} column {i}: {} vs {}", jacobian.matrix()[(r, i)], linear[r]);
                    assert!((jacobian.matrix()[(r + 3, i)] - angular[r]).abs() < 1e-5,
                            "angular row {r} column {i}: {} vs {}", jacobian.matrix()[(r + 3, i)], angular[r]);
                }
            }
        }
    }

    #[test]
    fn test_jacobian_with_unnormalized_axis() {
        let mut root = Frame::new("base_frame", Link::new("base"), Joint::default());
        root.add_child(Frame::new("arm_frame", Link::new("arm"), Joint::revolute(
            "j1", Transform::identity(), Vector3::new(0.0, 0.0, 2.0))))
            .add_child(Frame::new("tip_frame", Link::new("tip"), Joint::fixed(
                "weld", Transform::from_translation(Vector3::new(1.0, 0.0, 0.0)))));
        let chain = Chain::new(root);
        let frames = path(&chain);

        let h = 1e-6;
        for q in [0.0, 0.7, -1.3] {
            let jacobian = calc_jacobian(&frames, &[q], None).unwrap();
            let p = end_pose(&frames, &[q + h]);
            let m = end_pose(&frames, &[q - h]);
            let linear = (p.pos - m.pos) / (2.0 * h);
            let angular: Vector3<f64> = (p.rot * m.rot.inverse()).scaled_axis() / (2.0 * h);
            for r in 0..3 {
                assert!((jacobian.matrix()[(r, 0)] - linear[r]).abs() < 1e-5,
                        "linear row {r} at {q}: {} vs {}", jacobian.matrix()[(r, 0)], linear[r]);
                assert!((jacobian.matrix()[(r + 3, 0)] - angular[r]).abs() < 1e-5,
                        "angular row {r} at {q}: {} vs {}", jacobian.matrix()[(r + 3, 0)], angular[r]);
            }
        }
        let at_zero = calc_jacobian(&frames, &[0.0], None).unwrap();
        assert!((at_zero.matrix()[(1, 0)] - 1.0).abs() < EPSILON);
        assert!((at_zero.matrix()[(5, 0)] - 1.0).abs() < EPSILON);
    }

    #[test]
    fn test_velocities_from_iso() {
        let chain = two_joint_chain(JointType::Revolute);
        let jacobian = calc_jacobian(&path(&chain), &[0.0, 0.0], None).unwrap();

        // The tip is 1 m from the first axis, rotating it at 1 rad/s moves the tip along y
        // at 1 m/s. The matrix is not square, so this goes through the pseudo-inverse.
        let desired = Isometry3::from_parts(
            Vector3::new(0.0, 1.0, 0.0).into(),
            UnitQuaternion::from_scaled_axis(Vector3::new(0.0, 0.0, 1.0)),
        );
        let joint_velocities = jacobian.velocities(&desired).unwrap();
        println!("Computed joint velocities: {:?}", joint_velocities);
        assert_eq!(joint_velocities.len(), 2);
        assert!((joint_velocities[0] - 1.0).abs() < EPSILON);
        assert!(joint_velocities[1].abs() < EPSILON);
    }

    #[test]
    fn test_velocities_least_squares() {
        let chain = two_joint_chain(JointType::Revolute);
        let jacobian = calc_jacobian(&path(&chain), &[0.0, 0.0], None).unwrap();

        // Linear x is out of reach at this configuration, only the rest can be matched
        let desired = Vector6::new(1.0, 0.0, 0.0, 0.0, 0.0, 2.0);
        let joint_velocities = jacobian.velocities_from_vector(&desired).unwrap();
        let achieved = jacobian.matrix() * DVector::from_vec(joint_velocities);
        assert!(achieved[0].abs() < EPSILON);
        assert!((achieved[5] - 2.0).abs() < EPSILON);
    }

    #[test]
    fn test_compute_joint_torques() {
        let chain = two_joint_chain(JointType::Revolute);
        let jacobian = calc_jacobian(&path(&chain), &[0.0, 0.0], None).unwrap();

        // A pure torque about z is felt fully by both joints
        let desired_force_torque = Vector6::new(0.0, 0.0, 0.0, 0.0, 0.0, 1.234);
        let joint_torques = jacobian.torques_from_vector(&desired_force_torque);
        println!("Computed joint torques: {:?}", joint_torques);
        assert!((joint_torques[0] - 1.234).abs() < EPSILON);
        assert!((joint_torques[1] - 1.234).abs() < EPSILON);

        // A force along y at the tip acts through the 1 m lever of the first joint only
        let force = Isometry3::from_parts(Vector3::new(0.0, 1.0, 0.0).into(), UnitQuaternion::identity());
        let joint_torques = jacobian.torques(&force);
        assert!((joint_torques[0] - 1.0).abs() < EPSILON);
        assert!(joint_torques[1].abs() < EPSILON);
    }
}
