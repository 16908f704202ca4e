use nalgebra::{Isometry3, Vector3};
use rs_chain_kinematics::urdf::serial_chain_from_urdf;
use rs_chain_kinematics::transform::Transform;
use rs_chain_kinematics::utils::as_radians;

/// Calculating Jacobian matrices for kinematic analysis.
fn main() {
    let urdf = std::fs::read_to_string("src/tests/data/simple_arm.urdf").unwrap();
    let robot = serial_chain_from_urdf(&urdf, "tool", None).unwrap();

    let joints = as_radians(&[17.0, 40.0]);
    let jacobian = robot.jacobian(&joints).unwrap();
    println!("Jacobian: {}", jacobian.matrix());

    // Two joints cannot follow an arbitrary velocity, the least squares solution is returned
    let desired_velocity_isometry =
        Isometry3::new(Vector3::new(0.0, 1.0, 0.0),
                       Vector3::new(0.0, 0.0, 1.0));
    let joint_velocities = jacobian.velocities(&desired_velocity_isometry);
    println!("Computed joint velocities: {:?}", joint_velocities.unwrap());

    let desired_force_torque =
        Isometry3::new(Vector3::new(0.0, 0.0, 0.0),
                       Vector3::new(0.0, 0.0, 1.234));
    let joint_torques = jacobian.torques(&desired_force_torque);
    println!("Computed joint torques: {:?}", joint_torques);

    // Jacobian of a point 10 cm beyond the tool link
    let tip = Transform::from_translation(Vector3::new(0.1, 0.0, 0.0));
    println!("Jacobian of the tip: {}", robot.jacobian_with_tool(&joints, &tip).unwrap().matrix());

    // Jacobians of every link along the path, zero columns for joints past the link
    for (link, jacobian) in robot.jacobians(&joints).unwrap() {
        println!("{}: {}", link, jacobian.matrix());
    }
}
