use std::collections::HashMap;
use std::sync::Arc;

use nalgebra::Vector3;
use rs_chain_kinematics::chain::Chain;
use rs_chain_kinematics::frame::{Frame, Geometry, Joint, Link, Visual};
use rs_chain_kinematics::serial_chain::SerialChain;
use rs_chain_kinematics::transform::Transform;
use rs_chain_kinematics::utils::{dump_joints, dump_pose};

/// Building a chain in code, forward and inverse kinematics.
fn main() {
    let along_x = |x: f64| Transform::from_translation(Vector3::new(x, 0.0, 0.0));

    // Two arm segments turning about z, a gripper on the second one and a camera on the first
    let mut root = Frame::new("base_frame", Link::new("base"), Joint::default());
    let upper = root.add_child(Frame::new("upper_frame", Link::new("upper"),
                                          Joint::revolute("shoulder", Transform::identity(), Vector3::z())));
    let mut gripper = Frame::new("gripper_frame", Link::new("gripper"), Joint::fixed("wrist", along_x(1.0)));
    gripper.link.visuals.push(Visual::new(Transform::identity(), Geometry::Sphere { radius: 0.05 }));
    upper
        .add_child(Frame::new("lower_frame", Link::new("lower"),
                              Joint::revolute("elbow", along_x(1.0), Vector3::z())))
        .add_child(gripper);
    upper.add_child(Frame::new("camera_frame", Link::new("camera"), Joint::fixed("camera_mount", along_x(0.3))));

    let chain = Arc::new(Chain::new(root));
    println!("{}", chain);
    println!("Joints: {:?}", chain.joint_parameter_names(true));

    // Joint values by name, missing ones stay at zero
    let values = HashMap::from([("elbow".to_string(), 0.5)]);
    for (link, pose) in chain.forward_kinematics(&values).unwrap() {
        println!("{:>8}: {}", link, pose);
    }

    let arm = SerialChain::new(chain.clone(), "gripper_frame").unwrap();
    let joints = [0.3, 0.6];
    print!("Joints: ");
    dump_joints(&joints);
    let pose = arm.forward_kinematics(&joints).unwrap();
    print!("Gripper: ");
    dump_pose(&pose);

    let solved = arm.inverse_kinematics(&pose, None).unwrap();
    print!("Inverse kinematics from zero: ");
    dump_joints(&solved);
}
