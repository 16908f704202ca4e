use std::sync::Arc;

use nalgebra::Vector3;
use rs_chain_kinematics::chain::Chain;
use rs_chain_kinematics::frame::{Frame, Joint, Link};
use rs_chain_kinematics::ik::{inverse_kinematics, IkConfig};
use rs_chain_kinematics::kinematic_traits::{Pose, SerialKinematics};
use rs_chain_kinematics::serial_chain::SerialChain;
use rs_chain_kinematics::transform::Transform;
use rs_chain_kinematics::utils::dump_joints;

fn main() {
    let along_x = Transform::from_translation(Vector3::new(1.0, 0.0, 0.0));
    let mut root = Frame::new("link1_frame", Link::new("link1"), Joint::default());
    root.add_child(Frame::new("link2_frame", Link::new("link2"), Joint::revolute("joint1", along_x, Vector3::z())))
        .add_child(Frame::new("link3_frame", Link::new("link3"), Joint::revolute("joint2", along_x, Vector3::y())));
    let robot_alone = SerialChain::new(Arc::new(Chain::new(root)), "link3_frame").unwrap();

    let joints = [0.3, 0.4];
    dump_joints(&joints);

    // Half meter high pedestal
    let pedestal = 0.5;
    let robot_with_base = rs_chain_kinematics::tool::Base {
        robot: Arc::new(robot_alone),
        base: Transform::from_translation(Vector3::new(0.0, 0.0, pedestal)),
    };

    // Tool extends 1 meter in the Z direction, envisioning something like sword
    let sword = 1.0;
    let robot_on_base_with_tool = rs_chain_kinematics::tool::Tool {
        robot: Arc::new(robot_with_base),
        tool: Transform::from_translation(Vector3::new(0.0, 0.0, sword)),
    };

    let tcp_pose: Pose = robot_on_base_with_tool.forward(&joints).unwrap();
    println!("The sword tip is at: {}", tcp_pose);

    // The wrapped robot is SerialKinematics as well, so inverse kinematics works unchanged
    let inverse = inverse_kinematics(&robot_on_base_with_tool, &tcp_pose, None, &IkConfig::default()).unwrap();
    dump_joints(&inverse);
}
