//! Helper functions

use crate::kinematic_traits::Pose;

/// Print joint values, converting radians to degrees.
pub fn dump_joints(joints: &[f64]) {
    println!("{}", format_joints(joints));
}

/// Print the pose: translation, then rotation as roll, pitch, yaw in degrees.
pub fn dump_pose(pose: &Pose) {
    println!("{}", format_pose(pose));
}

pub fn format_joints(joints: &[f64]) -> String {
    let row: Vec<String> = joints.iter().map(|q| format!("{:5.2}", q.to_degrees())).collect();
    format!("[{}]", row.join(" "))
}

pub fn format_pose(pose: &Pose) -> String {
    let (roll, pitch, yaw) = pose.rot_euler();
    format!(
        "x: {:.5}, y: {:.5}, z: {:.5}, roll: {:.2}, pitch: {:.2}, yaw: {:.2}",
        pose.pos.x, pose.pos.y, pose.pos.z,
        roll.to_degrees(), pitch.to_degrees(), yaw.to_degrees()
    )
}

/// Allows to specify joint values in degrees (converts to radians)
pub fn as_radians(degrees: &[f64]) -> Vec<f64> {
    degrees.iter().map(|d| d.to_radians()).collect()
}

/// Checks if all joint values are finite
pub fn is_valid(qs: &[f64]) -> bool {
    qs.iter().all(|q| q.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transform::Transform;
    use nalgebra::Vector3;
    use std::f64::consts::PI;

    #[test]
    fn test_format_joints() {
        assert_eq!(format_joints(&[0.0, PI / 2.0, -PI]), "[ 0.00 90.00 -180.00]");
        assert_eq!(format_joints(&[]), "[]");
    }

    #[test]
    fn test_format_pose() {
        let pose = Transform::from_rpy(0.0, 0.0, PI / 2.0, Vector3::new(1.0, 2.0, 3.0));
        let text = format_pose(&pose);
        assert!(text.starts_with("x: 1.00000, y: 2.00000, z: 3.00000"), "{text}");
        assert!(text.ends_with("yaw: 90.00"), "{text}");
    }

    #[test]
    fn test_as_radians() {
        let r = as_radians(&[180.0, -90.0]);
        assert!((r[0] - PI).abs() < 1e-12);
        assert!((r[1] + PI / 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_is_valid() {
        assert!(is_valid(&[0.0, 1.0, -1.0, PI]));
        assert!(!is_valid(&[0.0, f64::NAN]));
        assert!(!is_valid(&[f64::INFINITY]));
    }
}
