//! Builds a kinematic [`Chain`] from MuJoCo MJCF (optional)
//!
//! The first body under `<worldbody>` is the root. Every body becomes a frame named
//! `<body>_frame` whose link carries the body pose. The joints of a body are placed on
//! a run of child frames, `<body>_child`, `<body>_child_child` and so on, one per joint;
//! geoms and child bodies hang below the last of them.
//! `hinge` joints are revolute, `slide` joints prismatic. Free joints are skipped, the
//! floating base being what the `world` transform of forward kinematics is for.

use std::collections::HashMap;
use std::fs::read_to_string;
use std::path::Path;
use std::sync::Arc;

use nalgebra::{Quaternion, Rotation3, Unit, UnitQuaternion, Vector3};
use sxd_document::{dom, parser};
use tracing::warn;

use crate::chain::Chain;
use crate::frame::{Frame, Geometry, Joint, JointType, Link, Visual};
use crate::kinematics_error::KinematicsError;
use crate::model_error::ModelError;
use crate::serial_chain::SerialChain;
use crate::transform::Transform;
use crate::xml::{attribute, child, children, parse_floats, required_attribute, root_element, vector3_attribute};

/// Reads the MJCF file and builds the chain.
pub fn chain_from_mjcf_file<P: AsRef<Path>>(path: P) -> Result<Chain, ModelError> {
    let path = path.as_ref();
    let xml_content = read_to_string(path).map_err(|e| ModelError::io(path, e))?;
    chain_from_mjcf(&xml_content)
}

/// Builds the chain from MJCF content.
///
/// # Errors
/// - [`ModelError::Xml`] if the content is not XML or the root element is not `mujoco`.
/// - [`ModelError::InvalidModel`] if there is no body under `<worldbody>`.
/// - [`ModelError::Kinematics`] for `ball` joints and other unsupported joint types.
pub fn chain_from_mjcf(xml_content: &str) -> Result<Chain, ModelError> {
    let package = parser::parse(xml_content).map_err(|e| ModelError::Xml(e.to_string()))?;
    let document = package.as_document();
    let mujoco = root_element(&document)?;
    if mujoco.name().local_part() != "mujoco" {
        return Err(ModelError::Xml(format!(
            "root element must be 'mujoco', found '{}'", mujoco.name().local_part()
        )));
    }

    let context = Context::read(mujoco)?;
    let worldbody = child(mujoco, "worldbody")
        .ok_or_else(|| ModelError::InvalidModel("no worldbody".into()))?;
    let mut bodies = children(worldbody, "body");
    let root_body = bodies
        .next()
        .ok_or_else(|| ModelError::InvalidModel("no body under worldbody".into()))?;
    for ignored in bodies {
        warn!(body = attribute(ignored, "name").unwrap_or(""), "only the first body of worldbody is used");
    }

    let name = body_name(root_body);
    let link = Link::with_offset(name.clone(), context.pose(root_body)?);
    let mut root_frame = Frame::new(format!("{}_frame", name), link, Joint::default());
    context.build(&mut root_frame, root_body)?;
    Ok(Chain::new(root_frame))
}

/// Serial chain from MJCF content, from `root_body` (the root if not given) to `end_body`.
pub fn serial_chain_from_mjcf(xml_content: &str, end_body: &str, root_body: Option<&str>)
                              -> Result<SerialChain, ModelError> {
    let chain = Arc::new(chain_from_mjcf(xml_content)?);
    let end_frame = format!("{}_frame", end_body);
    let serial = match root_body {
        Some(root) => SerialChain::with_root(chain, &end_frame, &format!("{}_frame", root))?,
        None => SerialChain::new(chain, &end_frame)?,
    };
    Ok(serial)
}

/// Model-wide settings needed while walking the bodies.
struct Context {
    /// `<compiler angle="degree">`, the MuJoCo default.
    degrees: bool,
    /// Mesh asset name to file.
    meshes: HashMap<String, String>,
}

impl Context {
    fn read(mujoco: dom::Element) -> Result<Self, ModelError> {
        let degrees = match child(mujoco, "compiler").and_then(|c| attribute(c, "angle")) {
            None | Some("degree") => true,
            Some("radian") => false,
            Some(other) => return Err(ModelError::WrongAngle(format!("compiler angle '{}'", other))),
        };

        let mut meshes = HashMap::new();
        for asset in children(mujoco, "asset") {
            for mesh in children(asset, "mesh") {
                let file = required_attribute(mesh, "file", "mesh asset")?;
                // Without a name, MuJoCo names the mesh after the file stem
                let name = match attribute(mesh, "name") {
                    Some(name) => name.to_string(),
                    None => Path::new(file).file_stem().and_then(|s| s.to_str()).unwrap_or(file).to_string(),
                };
                meshes.insert(name, file.to_string());
            }
        }
        Ok(Context { degrees, meshes })
    }

    /// Pose given by `pos` and one of the orientation attributes `quat` (wxyz), `axisangle`,
    /// `euler` (intrinsic xyz), `xyaxes` or `zaxis`. Identity rotation if none is given.
    fn pose(&self, element: dom::Element) -> Result<Transform, ModelError> {
        let pos = vector3_attribute(element, "pos")?.unwrap_or_else(Vector3::zeros);
        Ok(Transform::new(self.orientation(element)?, pos))
    }

    fn orientation(&self, element: dom::Element) -> Result<UnitQuaternion<f64>, ModelError> {
        if let Some(quat) = attribute(element, "quat") {
            return match parse_floats(quat)?.as_slice() {
                &[w, x, y, z] => Ok(UnitQuaternion::from_quaternion(Quaternion::new(w, x, y, z))),
                _ => Err(ModelError::Parse(format!("quat '{}' must have four values", quat))),
            };
        }
        if let Some(value) = attribute(element, "axisangle") {
            let &[x, y, z, angle] = parse_floats(value)?.as_slice() else {
                return Err(ModelError::Parse(format!("axisangle '{}' must have four values", value)));
            };
            let axis = Unit::try_new(Vector3::new(x, y, z), f64::EPSILON)
                .ok_or_else(|| ModelError::Parse(format!("axisangle '{}' has a zero axis", value)))?;
            return Ok(UnitQuaternion::from_axis_angle(&axis, self.angle(angle)));
        }
        if let Some(euler) = vector3_attribute(element, "euler")? {
            let euler = euler.map(|a| self.angle(a));
            return Ok(UnitQuaternion::from_axis_angle(&Vector3::x_axis(), euler.x)
                * UnitQuaternion::from_axis_angle(&Vector3::y_axis(), euler.y)
                * UnitQuaternion::from_axis_angle(&Vector3::z_axis(), euler.z));
        }
        if let Some(value) = attribute(element, "xyaxes") {
            let &[x0, x1, x2, y0, y1, y2] = parse_floats(value)?.as_slice() else {
                return Err(ModelError::Parse(format!("xyaxes '{}' must have six values", value)));
            };
            let bad = || ModelError::Parse(format!("xyaxes '{}' are degenerate", value));
            let x = Unit::try_new(Vector3::new(x0, x1, x2), f64::EPSILON).ok_or_else(bad)?;
            // y is made orthogonal to x
            let y = Vector3::new(y0, y1, y2);
            let y = Unit::try_new(y - x.into_inner() * x.dot(&y), f64::EPSILON).ok_or_else(bad)?;
            let z = x.cross(&y.into_inner());
            let basis = Rotation3::from_basis_unchecked(&[x.into_inner(), y.into_inner(), z]);
            return Ok(UnitQuaternion::from_rotation_matrix(&basis));
        }
        if let Some(z) = vector3_attribute(element, "zaxis")? {
            // Smallest rotation taking (0, 0, 1) to the given axis
            if z.norm() < f64::EPSILON {
                return Err(ModelError::Parse("zaxis must not be zero".to_string()));
            }
            return Ok(UnitQuaternion::rotation_between(&Vector3::z(), &z)
                .unwrap_or_else(|| UnitQuaternion::from_axis_angle(&Vector3::x_axis(), std::f64::consts::PI)));
        }
        Ok(UnitQuaternion::identity())
    }

    fn angle(&self, value: f64) -> f64 {
        if self.degrees { value.to_radians() } else { value }
    }

    /// Adds the joint frames, visuals and child bodies of `body` below `frame`, the frame
    /// of the body itself.
    fn build(&self, frame: &mut Frame, body: dom::Element) -> Result<(), ModelError> {
        let base = frame.link.offset;
        let joints = read_joints(body)?;
        let has_joints = !joints.is_empty();

        // Joint frames hang one below the other, the first one carrying the body pose
        let mut current = frame;
        let mut joint_base = Transform::identity();
        for (i, joint) in joints.into_iter().enumerate() {
            let offset = if i == 0 { base * joint.offset } else { joint.offset };
            joint_base = joint_base * offset;
            let name = format!("{}_child", current.link.name);
            current = current.add_child(Frame::new(name.clone(), Link::new(name), Joint { offset, ..joint }));
        }

        // Body pose relative to the last joint frame
        let body_in_joint = joint_base.inverse() * base;
        let visual_base = if has_joints { body_in_joint } else { Transform::identity() };
        for geom in children(body, "geom") {
            if let Some(visual) = self.visual(geom, &visual_base)? {
                current.link.visuals.push(visual);
            }
        }

        for child_body in children(body, "body") {
            let child_name = body_name(child_body);
            let link = Link::with_offset(child_name.clone(), body_in_joint * self.pose(child_body)?);
            let next = current.add_child(Frame::new(format!("{}_frame", child_name), link, Joint::default()));
            self.build(next, child_body)?;
        }
        Ok(())
    }

    fn visual(&self, geom: dom::Element, base: &Transform) -> Result<Option<Visual>, ModelError> {
        let geom_type = attribute(geom, "type").unwrap_or("sphere");
        let size = match attribute(geom, "size") {
            Some(size) => parse_floats(size)?,
            None => Vec::new(),
        };
        let size_at = |i: usize| -> Result<f64, ModelError> {
            size.get(i).copied().ok_or_else(|| ModelError::MissingField(format!("size of {} geom", geom_type)))
        };

        // A segment given by `fromto` replaces pos and quat: centered, z along the segment
        let fromto = match attribute(geom, "fromto") {
            Some(value) => match parse_floats(value)?.as_slice() {
                [x0, y0, z0, x1, y1, z1] => Some((Vector3::new(*x0, *y0, *z0), Vector3::new(*x1, *y1, *z1))),
                _ => return Err(ModelError::Parse(format!("fromto '{}' must have six values", value))),
            },
            None => None,
        };
        let (offset, segment_length) = match fromto {
            Some((from, to)) => {
                let direction = to - from;
                let rot = match Unit::try_new(direction, f64::EPSILON) {
                    // Only fails for a segment pointing down -z
                    Some(d) => UnitQuaternion::rotation_between_axis(&Vector3::z_axis(), &d)
                        .unwrap_or_else(|| UnitQuaternion::from_axis_angle(&Vector3::x_axis(), std::f64::consts::PI)),
                    None => UnitQuaternion::identity(),
                };
                (Transform::new(rot, (from + to) / 2.0), Some(direction.norm()))
            }
            None => (self.pose(geom)?, None),
        };

        let geometry = match geom_type {
            "sphere" => Geometry::Sphere { radius: size_at(0)? },
            "capsule" => Geometry::Capsule {
                radius: size_at(0)?,
                length: match segment_length {
                    Some(length) => length,
                    None => 2.0 * size_at(1)?,
                },
            },
            "cylinder" => Geometry::Cylinder {
                radius: size_at(0)?,
                length: match segment_length {
                    Some(length) => length,
                    None => 2.0 * size_at(1)?,
                },
            },
            "box" => Geometry::Box { size: Vector3::new(2.0 * size_at(0)?, 2.0 * size_at(1)?, 2.0 * size_at(2)?) },
            "mesh" => {
                let mesh = required_attribute(geom, "mesh", "mesh geom")?;
                let filename = self.meshes.get(mesh).cloned().ok_or_else(|| {
                    ModelError::InvalidModel(format!("geom references undeclared mesh {}", mesh))
                })?;
                Geometry::Mesh { filename }
            }
            other => {
                warn!(geom_type = other, "geom type has no visual and is skipped");
                return Ok(None);
            }
        };
        Ok(Some(Visual::new(*base * offset, geometry)))
    }
}

fn body_name(body: dom::Element) -> String {
    attribute(body, "name").unwrap_or("body").to_string()
}

/// Joints of a body, in document order. The offset holds only the joint position.
fn read_joints(body: dom::Element) -> Result<Vec<Joint>, ModelError> {
    let mut joints = Vec::new();
    for element in children(body, "joint") {
        let name = attribute(element, "name").unwrap_or("joint");
        let joint_type = match attribute(element, "type").unwrap_or("hinge") {
            "hinge" => JointType::Revolute,
            "slide" => JointType::Prismatic,
            "free" => {
                warn!(joint = name, "free joint skipped");
                continue;
            }
            other => return Err(KinematicsError::UnsupportedJointType(other.to_string()).into()),
        };
        let pos = vector3_attribute(element, "pos")?.unwrap_or_else(Vector3::zeros);
        let axis = vector3_attribute(element, "axis")?;
        joints.push(Joint::new(name, Transform::from_translation(pos), joint_type, axis));
    }
    Ok(joints)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::FRAC_PI_2;

    const EPSILON: f64 = 1e-9;

    const ARM: &str = r#"<mujoco model="arm">
    <compiler angle="radian"/>
    <asset>
        <mesh name="gripper_mesh" file="gripper.stl"/>
    </asset>
    <worldbody>
        <geom name="floor" type="plane" size="1 1 0.1"/>
        <body name="base" pos="0 0 0.1">
            <geom type="cylinder" size="0.1 0.05"/>
            <body name="upper" pos="0 0 0.1">
                <joint name="shoulder" type="hinge" axis="0 0 1"/>
                <geom type="capsule" fromto="0 0 0 1 0 0" size="0.05"/>
                <body name="lower" pos="1 0 0">
                    <joint name="elbow_pan" axis="0 0 1"/>
                    <joint name="elbow_tilt" axis="0 1 0"/>
                    <body name="gripper" pos="0.5 0 0">
                        <joint name="slide" type="slide" axis="1 0 0"/>
                        <geom type="mesh" mesh="gripper_mesh"/>
                    </body>
                </body>
            </body>
        </body>
    </worldbody>
</mujoco>"#;

    #[test]
    fn test_tree_structure() {
        let chain = chain_from_mjcf(ARM).unwrap();
        let names: Vec<&str> = chain.walk().map(|f| f.name()).collect();
        assert_eq!(names, vec![
            "base_frame", "upper_frame", "upper_child", "lower_frame", "lower_child", "lower_child_child",
            "gripper_frame", "gripper_child",
        ]);
        assert_eq!(chain.joint_parameter_names(true), vec!["shoulder", "elbow_pan", "elbow_tilt", "slide"]);
        let types: Vec<JointType> = chain.walk().map(|f| f.joint().joint_type).collect();
        assert_eq!(types[7], JointType::Prismatic);
    }

    #[test]
    fn test_forward_kinematics() {
        let chain = chain_from_mjcf(ARM).unwrap();
        let poses = chain.forward_kinematics(&[FRAC_PI_2, 0.0, 0.0, 0.25]).unwrap();
        assert!((poses["base"].pos - Vector3::new(0.0, 0.0, 0.1)).norm() < EPSILON);
        assert!((poses["upper"].pos - Vector3::new(0.0, 0.0, 0.2)).norm() < EPSILON);
        // The shoulder turns everything below it by 90 degrees
        assert!((poses["lower"].pos - Vector3::new(0.0, 1.0, 0.2)).norm() < EPSILON);
        assert!((poses["gripper_child"].pos - Vector3::new(0.0, 1.75, 0.2)).norm() < EPSILON);
    }

    #[test]
    fn test_visuals() {
        let chain = chain_from_mjcf(ARM).unwrap();
        let visuals = chain.visuals_map();
        assert_eq!(visuals["base"][0].geometry, Geometry::Cylinder { radius: 0.1, length: 0.1 });

        let capsule = &visuals["upper_child"][0];
        assert_eq!(capsule.geometry, Geometry::Capsule { radius: 0.05, length: 1.0 });
        // Centered on the segment, its z axis along x
        assert!((capsule.offset.pos - Vector3::new(0.5, 0.0, 0.0)).norm() < EPSILON);
        assert!((capsule.offset.rot * Vector3::z() - Vector3::x()).norm() < EPSILON);

        assert_eq!(visuals["gripper_child"][0].geometry, Geometry::Mesh { filename: "gripper.stl".into() });
        // The floor is not part of any body
        assert_eq!(visuals.values().map(|v| v.len()).sum::<usize>(), 3);
    }

    #[test]
    fn test_serial_chain() {
        let serial = serial_chain_from_mjcf(ARM, "gripper", None).unwrap();
        assert_eq!(serial.joint_parameter_names(true), vec!["shoulder", "elbow_pan", "elbow_tilt"]);
        let pose = serial.forward_kinematics(&[0.0, 0.0, 0.0]).unwrap();
        assert!((pose.pos - Vector3::new(1.5, 0.0, 0.2)).norm() < EPSILON);
    }

    #[test]
    fn test_euler_in_degrees() {
        let xml = r#"<mujoco><worldbody>
            <body name="tilted" euler="0 0 90"><joint name="j"/></body>
        </worldbody></mujoco>"#;
        let chain = chain_from_mjcf(xml).unwrap();
        let link = chain.find_link("tilted").unwrap();
        assert!((link.offset.rot * Vector3::x() - Vector3::y()).norm() < EPSILON);
    }

    #[test]
    fn test_orientation_attributes() {
        let half = std::f64::consts::FRAC_1_SQRT_2;
        for orientation in [
            format!(r#"quat="{half} 0 0 {half}""#),
            r#"axisangle="0 0 2 90""#.to_string(),
            r#"euler="0 0 90""#.to_string(),
            r#"xyaxes="0 1 0 -1 0.5 0""#.to_string(),
        ] {
            let xml = format!(r#"<mujoco><worldbody><body name="b" {orientation}/></worldbody></mujoco>"#);
            let link = chain_from_mjcf(&xml).unwrap().find_link("b").unwrap().clone();
            assert!((link.offset.rot * Vector3::x() - Vector3::y()).norm() < EPSILON, "{}", orientation);
            assert!((link.offset.rot * Vector3::z() - Vector3::z()).norm() < EPSILON, "{}", orientation);
        }

        let xml = r#"<mujoco><worldbody><body name="b" zaxis="1 0 0"/></worldbody></mujoco>"#;
        let link = chain_from_mjcf(xml).unwrap().find_link("b").unwrap().clone();
        assert!((link.offset.rot * Vector3::z() - Vector3::x()).norm() < EPSILON);

        let xml = r#"<mujoco><worldbody><body name="b" zaxis="0 0 -1"/></worldbody></mujoco>"#;
        let link = chain_from_mjcf(xml).unwrap().find_link("b").unwrap().clone();
        assert!((link.offset.rot * Vector3::z() + Vector3::z()).norm() < EPSILON);
    }

    #[test]
    fn test_wrong_number_of_rotation_values() {
        for orientation in [r#"quat="0 0 1.5""#, r#"axisangle="0 0 1""#, r#"xyaxes="1 0 0 0 1""#,
                            r#"axisangle="0 0 0 90""#] {
            let xml = format!(r#"<mujoco><worldbody><body name="b" {orientation}/></worldbody></mujoco>"#);
            assert!(matches!(chain_from_mjcf(&xml), Err(ModelError::Parse(_))), "{}", orientation);
        }
    }

    #[test]
    fn test_unsupported_and_invalid() {
        let ball = r#"<mujoco><worldbody><body name="b"><joint name="j" type="ball"/></body></worldbody></mujoco>"#;
        assert!(matches!(chain_from_mjcf(ball),
            Err(ModelError::Kinematics(KinematicsError::UnsupportedJointType(_)))));

        let free = r#"<mujoco><worldbody><body name="b"><joint name="j" type="free"/></body></worldbody></mujoco>"#;
        assert_eq!(chain_from_mjcf(free).unwrap().dof(), 0);

        assert!(matches!(chain_from_mjcf("<mujoco><worldbody/></mujoco>"), Err(ModelError::InvalidModel(_))));
        assert!(matches!(chain_from_mjcf("<robot/>"), Err(ModelError::Xml(_))));
    }
}
