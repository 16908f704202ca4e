//! The tree node types: a [`Link`] (rigid body) attached to its parent through a
//! parameterized [`Joint`], paired into a [`Frame`] with ordered child frames.
//!
//! `Frame` is the assembly form of the tree. Parsers (or user code) build it by
//! appending children, then hand the root to [`crate::chain::Chain::new`], which
//! freezes it. Kinematic queries only ever see the frozen chain.

use std::fmt;
use std::str::FromStr;

use nalgebra::{Unit, UnitQuaternion, Vector3};

use crate::kinematics_error::KinematicsError;
use crate::transform::Transform;

/// Kind of motion a joint allows.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum JointType {
    #[default]
    Fixed,
    /// Rotation of `θ` radians about the joint axis.
    Revolute,
    /// Translation of `θ·axis`.
    Prismatic,
}

impl JointType {
    pub fn as_str(&self) -> &'static str {
        match self {
            JointType::Fixed => "fixed",
            JointType::Revolute => "revolute",
            JointType::Prismatic => "prismatic",
        }
    }

    pub fn is_movable(&self) -> bool {
        *self != JointType::Fixed
    }
}

impl FromStr for JointType {
    type Err = KinematicsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "fixed" => Ok(JointType::Fixed),
            "revolute" => Ok(JointType::Revolute),
            "prismatic" => Ok(JointType::Prismatic),
            other => Err(KinematicsError::UnsupportedJointType(other.to_string())),
        }
    }
}

impl fmt::Display for JointType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Connection of a link to its parent.
#[derive(Clone, Debug, PartialEq)]
pub struct Joint {
    pub name: String,
    /// Mounting pose relative to the parent link.
    pub offset: Transform,
    pub joint_type: JointType,
    /// Rotation or translation axis in the joint frame. Need not be normalized.
    pub axis: Vector3<f64>,
}

impl Default for Joint {
    fn default() -> Self {
        Joint {
            name: "none".to_string(),
            offset: Transform::identity(),
            joint_type: JointType::Fixed,
            axis: Vector3::z(),
        }
    }
}

impl Joint {
    /// Creates a joint. Without an explicit axis, `(0, 0, 1)` is used.
    pub fn new(name: impl Into<String>, offset: Transform, joint_type: JointType, axis: Option<Vector3<f64>>) -> Self {
        Joint {
            name: name.into(),
            offset,
            joint_type,
            axis: axis.unwrap_or_else(Vector3::z),
        }
    }

    pub fn fixed(name: impl Into<String>, offset: Transform) -> Self {
        Self::new(name, offset, JointType::Fixed, None)
    }

    pub fn revolute(name: impl Into<String>, offset: Transform, axis: Vector3<f64>) -> Self {
        Self::new(name, offset, JointType::Revolute, Some(axis))
    }

    pub fn prismatic(name: impl Into<String>, offset: Transform, axis: Vector3<f64>) -> Self {
        Self::new(name, offset, JointType::Prismatic, Some(axis))
    }

    /// The motion produced by the joint value alone, before the mounting offset.
    pub fn variable_transform(&self, theta: f64) -> Transform {
        match self.joint_type {
            JointType::Fixed => Transform::identity(),
            JointType::Revolute => {
                // A degenerate axis cannot rotate anything
                let rot = Unit::try_new(self.axis, f64::EPSILON)
                    .map(|axis| UnitQuaternion::from_axis_angle(&axis, theta))
                    .unwrap_or_else(UnitQuaternion::identity);
                Transform::new(rot, Vector3::zeros())
            }
            JointType::Prismatic => Transform::from_translation(self.axis * theta),
        }
    }

    /// Total contribution of this joint to the chain: `offset ∘ variable_transform(θ)`.
    pub fn transform(&self, theta: f64) -> Transform {
        self.offset * self.variable_transform(theta)
    }
}

/// Geometry of a visual primitive. Dimensions are in meters.
#[derive(Clone, Debug, PartialEq)]
pub enum Geometry {
    /// Full extents along x, y and z.
    Box { size: Vector3<f64> },
    /// Cylinder along the local z axis.
    Cylinder { radius: f64, length: f64 },
    Sphere { radius: f64 },
    /// Capsule along the local z axis; `length` is the cylindrical part between the caps.
    Capsule { radius: f64, length: f64 },
    Mesh { filename: String },
}

impl Geometry {
    pub fn geom_type(&self) -> &'static str {
        match self {
            Geometry::Box { .. } => "box",
            Geometry::Cylinder { .. } => "cylinder",
            Geometry::Sphere { .. } => "sphere",
            Geometry::Capsule { .. } => "capsule",
            Geometry::Mesh { .. } => "mesh",
        }
    }
}

/// Visual primitive attached to a link. Only the rendering side consumes it.
#[derive(Clone, Debug, PartialEq)]
pub struct Visual {
    pub offset: Transform,
    pub geometry: Geometry,
}

impl Visual {
    pub fn new(offset: Transform, geometry: Geometry) -> Self {
        Visual { offset, geometry }
    }
}

/// Named rigid body.
#[derive(Clone, Debug, PartialEq)]
pub struct Link {
    pub name: String,
    /// Pose of the link origin relative to the frame it is attached through.
    pub offset: Transform,
    pub visuals: Vec<Visual>,
}

impl Default for Link {
    fn default() -> Self {
        Link::new("none")
    }
}

impl Link {
    pub fn new(name: impl Into<String>) -> Self {
        Link { name: name.into(), offset: Transform::identity(), visuals: Vec::new() }
    }

    pub fn with_offset(name: impl Into<String>, offset: Transform) -> Self {
        Link { name: name.into(), offset, visuals: Vec::new() }
    }
}

/// Edge plus node of the tree: the joint connecting a link to its parent, and the link itself.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Frame {
    pub name: String,
    pub link: Link,
    pub joint: Joint,
    pub children: Vec<Frame>,
}

impl Frame {
    pub fn new(name: impl Into<String>, link: Link, joint: Joint) -> Self {
        Frame { name: name.into(), link, joint, children: Vec::new() }
    }

    /// Appends a child frame. There is no cycle check: ownership already makes a cycle
    /// unrepresentable, but a frame appended twice becomes two independent subtrees.
    pub fn add_child(&mut self, child: Frame) -> &mut Frame {
        self.children.push(child);
        let last = self.children.len() - 1;
        &mut self.children[last]
    }

    pub fn is_end(&self) -> bool {
        self.children.is_empty()
    }

    /// `joint.offset ∘ variable_transform(θ)`.
    pub fn transform(&self, theta: f64) -> Transform {
        self.joint.transform(theta)
    }

    /// Pre-order traversal (self, then each child subtree, first child first).
    pub fn walk(&self) -> FrameWalk<'_> {
        FrameWalk { stack: vec![self] }
    }

    /// Depth-first search by frame name; the frame itself is checked first.
    pub fn find(&self, name: &str) -> Option<&Frame> {
        self.walk().find(|f| f.name == name)
    }
}

/// Lazy pre-order iterator over an assembly tree.
pub struct FrameWalk<'a> {
    stack: Vec<&'a Frame>,
}

impl<'a> Iterator for FrameWalk<'a> {
    type Item = &'a Frame;

    fn next(&mut self) -> Option<Self::Item> {
        let frame = self.stack.pop()?;
        self.stack.extend(frame.children.iter().rev());
        Some(frame)
    }
}
