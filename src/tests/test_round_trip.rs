#[cfg(test)]
mod tests {
    use nalgebra::Vector3;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use crate::ik::{self, IkConfig};
    use crate::kinematic_traits::SerialKinematics;
    use crate::serial_chain::SerialChain;
    use crate::tests::test_utils::{assert_pose_close, random_joints, two_revolute_chain};
    use crate::tool::{Base, Tool};
    use crate::transform::Transform;
    use std::sync::Arc;

    const JOINT_TOLERANCE: f64 = 1e-6;

    #[test]
    fn test_fk_ik_round_trip() {
        let serial = SerialChain::new(two_revolute_chain(), "link3_frame").unwrap();
        assert_eq!(serial.dof(), 2);
        let mut rng = StdRng::seed_from_u64(42);

        for case in 0..50 {
            let joints = random_joints(&mut rng, 2);
            let target = serial.forward_kinematics(&joints).unwrap();
            let solved = serial.inverse_kinematics(&target, Some(&[0.0, 0.0][..])).unwrap();
            for (j, (a, b)) in solved.iter().zip(joints.iter()).enumerate() {
                assert!((a - b).abs() < JOINT_TOLERANCE,
                        "case {}: joint {} solved as {}, expected {}", case, j, a, b);
            }
        }
    }

    #[test]
    fn test_round_trip_reports_convergence() {
        let serial = SerialChain::new(two_revolute_chain(), "link3_frame").unwrap();
        let target = serial.forward_kinematics(&[0.4, 0.7]).unwrap();
        let outcome = ik::solve(&serial, &target, None, &IkConfig::default()).unwrap();
        assert!(outcome.objective < 1e-12, "objective {}", outcome.objective);
        assert!(outcome.iterations <= IkConfig::default().max_iterations);
        assert_pose_close(&serial.forward_kinematics(&outcome.joints).unwrap(), &target, 1e-6, "solved pose");
    }

    #[test]
    fn test_round_trip_with_tool_and_base() {
        let serial = SerialChain::new(two_revolute_chain(), "link3_frame").unwrap();
        let robot = Tool {
            robot: Arc::new(Base {
                robot: Arc::new(serial),
                base: Transform::from_rpy(0.0, 0.0, 0.3, Vector3::new(0.5, -0.5, 1.0)),
            }),
            tool: Transform::from_translation(Vector3::new(0.25, 0.0, 0.1)),
        };
        let mut rng = StdRng::seed_from_u64(7);
        for case in 0..10 {
            let joints = random_joints(&mut rng, robot.dof());
            let target = robot.forward(&joints).unwrap();
            let solved = ik::inverse_kinematics(&robot, &target, None, &IkConfig::default()).unwrap();
            let reached = robot.forward(&solved).unwrap();
            assert_pose_close(&reached, &target, 1e-6, &format!("case {}", case));
        }
    }
}
