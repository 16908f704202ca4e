//! Builds a kinematic [`Chain`] from URDF (optional)

extern crate sxd_document;

use std::collections::{HashMap, HashSet};
use std::fs::read_to_string;
use std::path::Path;
use std::sync::Arc;

use nalgebra::Vector3;
use regex::Regex;
use sxd_document::{dom, parser};
use tracing::warn;

use crate::chain::Chain;
use crate::frame::{Frame, Geometry, Joint, JointType, Link, Visual};
use crate::model_error::ModelError;
use crate::serial_chain::SerialChain;
use crate::transform::Transform;
use crate::xml::{attribute, child, children, parse_floats, required_attribute, root_element, vector3_attribute};

/// Reads the URDF file and builds the chain.
///
/// # Example
/// ```
/// let chain = rs_chain_kinematics::urdf::chain_from_urdf_file("src/tests/data/simple_arm.urdf").unwrap();
/// println!("{}", chain);
/// ```
pub fn chain_from_urdf_file<P: AsRef<Path>>(path: P) -> Result<Chain, ModelError> {
    let path = path.as_ref();
    let xml_content = read_to_string(path).map_err(|e| ModelError::io(path, e))?;
    chain_from_urdf(&xml_content)
}

/// Builds the chain from URDF content. Every link becomes a frame named `<link>_frame`,
/// joined to its parent by the joint that has it as the child. The root is the link
/// that is a parent but never a child.
///
/// ```
/// use rs_chain_kinematics::urdf::chain_from_urdf;
/// let chain = chain_from_urdf(r#"<robot name="test_robot">
///     <link name="link1"/>
///     <link name="link2"/>
///     <joint name="joint1" type="revolute">
///         <parent link="link1"/>
///         <child link="link2"/>
///     </joint>
/// </robot>"#).unwrap();
/// assert_eq!(chain.to_string(), "link1_frame\n└──── link2_frame\n");
/// ```
///
/// # Errors
/// - [`ModelError::Xml`] if the content is not XML or the root element is not `robot`.
/// - [`ModelError::InvalidModel`] for topology problems: a joint naming an undeclared
///   link, a link with two parents, or no root.
/// - [`ModelError::Kinematics`] for joint types other than revolute, continuous,
///   prismatic and fixed.
pub fn chain_from_urdf(xml_content: &str) -> Result<Chain, ModelError> {
    let package = parser::parse(xml_content).map_err(|e| ModelError::Xml(e.to_string()))?;
    let document = package.as_document();
    let robot = root_element(&document)?;
    if robot.name().local_part() != "robot" {
        return Err(ModelError::Xml(format!(
            "root element must be 'robot', found '{}'", robot.name().local_part()
        )));
    }

    let mut links = Vec::new();
    for element in children(robot, "link") {
        links.push(read_link(element)?);
    }
    let mut joints = Vec::new();
    for element in children(robot, "joint") {
        joints.push(read_joint(element)?);
    }

    let root = find_root(&links, &joints)?;
    let chain = Chain::new(assemble(root, links, joints)?);
    Ok(chain)
}

/// Serial chain from URDF content, from `root_link` (the root of the model if not given)
/// to `end_link`. Names are link names; `_frame` is appended to find the frames.
pub fn serial_chain_from_urdf(xml_content: &str, end_link: &str, root_link: Option<&str>)
                              -> Result<SerialChain, ModelError> {
    let chain = Arc::new(chain_from_urdf(xml_content)?);
    let end_frame = format!("{}_frame", end_link);
    let serial = match root_link {
        Some(root) => SerialChain::with_root(chain, &end_frame, &format!("{}_frame", root))?,
        None => SerialChain::new(chain, &end_frame)?,
    };
    Ok(serial)
}

struct JointData {
    joint: Joint,
    parent: String,
    child: String,
}

fn read_link(element: dom::Element) -> Result<Link, ModelError> {
    let name = required_attribute(element, "name", "link")?;
    let mut link = Link::new(name);
    for visual in children(element, "visual") {
        match read_visual(visual, name)? {
            Some(v) => link.visuals.push(v),
            None => warn!(link = name, "visual without supported geometry skipped"),
        }
    }
    Ok(link)
}

fn read_visual(element: dom::Element, link: &str) -> Result<Option<Visual>, ModelError> {
    let offset = read_origin(child(element, "origin"))?;
    let Some(geometry) = child(element, "geometry") else {
        return Ok(None);
    };
    let Some(shape) = geometry.children().into_iter().find_map(|c| c.element()) else {
        return Ok(None);
    };

    let context = format!("{} visual of {}", shape.name().local_part(), link);
    let number = |name: &str| -> Result<f64, ModelError> {
        required_attribute(shape, name, &context)?
            .trim()
            .parse::<f64>()
            .map_err(|_| ModelError::Parse(format!("{} of {} is not a number", name, context)))
    };

    let geometry = match shape.name().local_part() {
        "box" => Geometry::Box {
            size: vector3_attribute(shape, "size")?
                .ok_or_else(|| ModelError::MissingField(format!("size of {}", context)))?,
        },
        "cylinder" => Geometry::Cylinder { radius: number("radius")?, length: number("length")? },
        "sphere" => Geometry::Sphere { radius: number("radius")? },
        "mesh" => Geometry::Mesh { filename: required_attribute(shape, "filename", &context)?.to_string() },
        _ => return Ok(None),
    };
    Ok(Some(Visual::new(offset, geometry)))
}

fn read_joint(element: dom::Element) -> Result<JointData, ModelError> {
    let name = required_attribute(element, "name", "joint")?;
    let context = format!("joint {}", name);
    let joint_type = match required_attribute(element, "type", &context)? {
        "continuous" => JointType::Revolute,
        other => other.parse::<JointType>()?,
    };
    let parent = child(element, "parent")
        .ok_or_else(|| ModelError::MissingField(format!("parent of {}", context)))?;
    let child_link = child(element, "child")
        .ok_or_else(|| ModelError::MissingField(format!("child of {}", context)))?;
    let axis = match child(element, "axis") {
        Some(axis) => vector3_attribute(axis, "xyz")?,
        None => None,
    };

    Ok(JointData {
        joint: Joint::new(name, read_origin(child(element, "origin"))?, joint_type, axis),
        parent: required_attribute(parent, "link", &context)?.to_string(),
        child: required_attribute(child_link, "link", &context)?.to_string(),
    })
}

/// `<origin xyz=".." rpy=".."/>`, identity if absent. Angles may be written as `${radians(deg)}`.
fn read_origin(origin: Option<dom::Element>) -> Result<Transform, ModelError> {
    let Some(origin) = origin else {
        return Ok(Transform::identity());
    };
    let xyz = vector3_attribute(origin, "xyz")?.unwrap_or_else(Vector3::zeros);
    let Some(value) = attribute(origin, "rpy") else {
        return Ok(Transform::from_translation(xyz));
    };
    let rpy = value.split_whitespace().map(parse_angle).collect::<Result<Vec<f64>, _>>()?;
    match *rpy.as_slice() {
        [roll, pitch, yaw] => Ok(Transform::from_rpy(roll, pitch, yaw, xyz)),
        _ => Err(ModelError::Parse(format!("rpy '{}' must have three values", value))),
    }
}

fn parse_angle(attr_value: &str) -> Result<f64, ModelError> {
    // Regular expression to match the ${radians(<number>)} format that is common in xacro
    let re = Regex::new(r"^\$\{radians\((-?\d+(\.\d+)?)\)\}$")
        .map_err(|_| ModelError::Parse("Invalid regex pattern".to_string()))?;

    if let Some(caps) = re.captures(attr_value) {
        let degrees_str = caps.get(1)
            .ok_or_else(|| ModelError::WrongAngle(format!("Bad representation: {}", attr_value)))?
            .as_str();
        let degrees: f64 = degrees_str.parse()
            .map_err(|_| ModelError::WrongAngle(attr_value.to_string()))?;
        Ok(degrees.to_radians())
    } else {
        // Otherwise a plain number in radians
        let radians = parse_floats(attr_value)
            .map_err(|_| ModelError::WrongAngle(attr_value.to_string()))?;
        match radians.as_slice() {
            [value] => Ok(*value),
            _ => Err(ModelError::WrongAngle(attr_value.to_string())),
        }
    }
}

/// The parent link of the first joint whose parent is never a child. Without joints,
/// the first declared link.
fn find_root(links: &[Link], joints: &[JointData]) -> Result<String, ModelError> {
    let root = if joints.is_empty() {
        links.first().map(|l| l.name.clone())
    } else {
        let children: HashSet<&str> = joints.iter().map(|j| j.child.as_str()).collect();
        joints
            .iter()
            .map(|j| j.parent.as_str())
            .find(|parent| !children.contains(parent))
            .and_then(|parent| links.iter().find(|l| l.name == parent).map(|l| l.name.clone()))
    };
    root.ok_or_else(|| ModelError::InvalidModel("cannot determine the root link".into()))
}

fn assemble(root: String, links: Vec<Link>, joints: Vec<JointData>) -> Result<Frame, ModelError> {
    let mut link_map: HashMap<String, Link> = HashMap::new();
    for link in links {
        if link_map.contains_key(&link.name) {
            return Err(ModelError::InvalidModel(format!("link {} declared twice", link.name)));
        }
        link_map.insert(link.name.clone(), link);
    }

    let mut seen_children = HashSet::new();
    for j in &joints {
        for link in [&j.parent, &j.child] {
            if !link_map.contains_key(link) {
                return Err(ModelError::InvalidModel(format!(
                    "joint {} references undeclared link {}", j.joint.name, link
                )));
            }
        }
        if !seen_children.insert(j.child.as_str()) || j.child == root {
            return Err(ModelError::InvalidModel(format!("link {} has more than one parent", j.child)));
        }
    }

    // Joints by parent link, keeping document order
    let mut by_parent: HashMap<String, Vec<JointData>> = HashMap::new();
    for j in joints {
        by_parent.entry(j.parent.clone()).or_default().push(j);
    }

    let root_link = link_map
        .remove(&root)
        .ok_or_else(|| ModelError::InvalidModel(format!("root link {} is not declared", root)))?;
    let mut root_frame = Frame::new(format!("{}_frame", root), root_link, Joint::default());
    attach_children(&mut root_frame, &mut by_parent, &mut link_map)?;

    for name in link_map.keys() {
        warn!(link = name.as_str(), "link is not connected to the root and is ignored");
    }
    Ok(root_frame)
}

/// Every link has at most one parent, so this terminates and each link is used once.
fn attach_children(frame: &mut Frame, by_parent: &mut HashMap<String, Vec<JointData>>,
                   link_map: &mut HashMap<String, Link>) -> Result<(), ModelError> {
    let Some(joints) = by_parent.remove(&frame.link.name) else {
        return Ok(());
    };
    for j in joints {
        let link = link_map
            .remove(&j.child)
            .ok_or_else(|| ModelError::InvalidModel(format!("link {} has more than one parent", j.child)))?;
        let child = frame.add_child(Frame::new(format!("{}_frame", j.child), link, j.joint));
        attach_children(child, by_parent, link_map)?;
    }
    Ok(())
}
