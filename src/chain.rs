//! Kinematic tree frozen for queries.
//!
//! [`Chain::new`] takes ownership of an assembled [`Frame`] tree and flattens it into
//! an arena of [`FrameNode`]s addressed by [`FrameId`]. Nodes are stored in pre-order
//! (a parent always precedes its children, the first child subtree precedes the
//! second), so whole-tree forward kinematics is a single forward pass without
//! recursion. Once built, the chain is immutable and can be shared between threads.

use std::collections::{HashMap, HashSet};
use std::fmt;

use crate::frame::{Frame, Joint, Link, Visual};
use crate::kinematic_traits::{check_joint_count, JointValues};
use crate::kinematics_error::KinematicsError;
use crate::transform::Transform;

/// Index of a frame inside its [`Chain`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FrameId(usize);

impl FrameId {
    pub fn index(&self) -> usize {
        self.0
    }
}

/// Frame stored in the chain: the joint and link plus tree links by index.
#[derive(Clone, Debug)]
pub struct FrameNode {
    name: String,
    link: Link,
    joint: Joint,
    parent: Option<FrameId>,
    children: Vec<FrameId>,
}

impl FrameNode {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn link(&self) -> &Link {
        &self.link
    }

    pub fn joint(&self) -> &Joint {
        &self.joint
    }

    pub fn parent(&self) -> Option<FrameId> {
        self.parent
    }

    pub fn children(&self) -> &[FrameId] {
        &self.children
    }

    pub fn is_end(&self) -> bool {
        self.children.is_empty()
    }

    /// `joint.offset ∘ variable_transform(θ)`.
    pub fn transform(&self, theta: f64) -> Transform {
        self.joint.transform(theta)
    }
}

/// A kinematic tree with traversal, lookup and whole-tree forward kinematics.
#[derive(Clone, Debug)]
pub struct Chain {
    frames: Vec<FrameNode>,
    dof: usize,
}

impl Chain {
    /// Freezes an assembled tree.
    pub fn new(root: Frame) -> Self {
        let mut frames: Vec<FrameNode> = Vec::new();
        let mut stack: Vec<(Frame, Option<FrameId>)> = vec![(root, None)];

        while let Some((frame, parent)) = stack.pop() {
            let id = FrameId(frames.len());
            if let Some(parent) = parent {
                frames[parent.0].children.push(id);
            }
            let Frame { name, link, joint, children } = frame;
            frames.push(FrameNode { name, link, joint, parent, children: Vec::new() });
            stack.extend(children.into_iter().rev().map(|child| (child, Some(id))));
        }

        let mut chain = Chain { frames, dof: 0 };
        chain.dof = chain.joint_parameter_names(true).len();
        chain
    }

    pub fn root(&self) -> &FrameNode {
        &self.frames[0]
    }

    pub fn root_id(&self) -> FrameId {
        FrameId(0)
    }

    pub fn frame(&self, id: FrameId) -> &FrameNode {
        &self.frames[id.0]
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Number of movable joints (duplicate names counted once).
    pub fn dof(&self) -> usize {
        self.dof
    }

    /// All frames in pre-order.
    pub fn walk(&self) -> ChainWalk<'_> {
        self.walk_from(self.root_id())
    }

    /// Frames of the subtree starting at `start`, in pre-order.
    pub fn walk_from(&self, start: FrameId) -> ChainWalk<'_> {
        ChainWalk { chain: self, stack: vec![start] }
    }

    /// First frame with this name in pre-order, the root being checked first.
    pub fn find_frame_id(&self, name: &str) -> Option<FrameId> {
        self.walk_ids(self.root_id()).find(|id| self.frame(*id).name == name)
    }

    pub fn find_frame(&self, name: &str) -> Option<&FrameNode> {
        self.find_frame_id(name).map(|id| self.frame(id))
    }

    /// First link with this name in pre-order, the root link being checked first.
    pub fn find_link(&self, name: &str) -> Option<&Link> {
        self.walk().map(|f| &f.link).find(|link| link.name == name)
    }

    /// Joint names in pre-order, fixed joints skipped when `exclude_fixed`.
    /// Duplicates are dropped, keeping the first occurrence.
    pub fn joint_parameter_names(&self, exclude_fixed: bool) -> Vec<String> {
        joint_names(self.walk(), exclude_fixed)
    }

    /// Pose of every link in the tree, keyed by link name.
    ///
    /// # Errors
    /// [`KinematicsError::JointCountMismatch`] if positional values do not match
    /// `joint_parameter_names(true)`.
    pub fn forward_kinematics<'a>(&self, values: impl Into<JointValues<'a>>)
                                  -> Result<HashMap<String, Transform>, KinematicsError> {
        self.forward_kinematics_in_world(values, &Transform::identity())
    }

    /// Same as [`Chain::forward_kinematics`], with the root placed at `world`.
    pub fn forward_kinematics_in_world<'a>(&self, values: impl Into<JointValues<'a>>, world: &Transform)
                                           -> Result<HashMap<String, Transform>, KinematicsError> {
        match values.into() {
            JointValues::Named(named) => {
                Ok(self.link_poses_from(self.root_id(), world, |name| named.get(name).copied()))
            }
            JointValues::Positional(qs) => {
                let names = self.joint_parameter_names(true);
                check_joint_count(names.len(), qs)?;
                let named: HashMap<String, f64> = names.into_iter().zip(qs.iter().copied()).collect();
                Ok(self.link_poses_from(self.root_id(), world, |name| named.get(name).copied()))
            }
        }
    }

    /// Link name to visuals, a structural projection without kinematics.
    pub fn visuals_map(&self) -> HashMap<&str, &[Visual]> {
        self.walk()
            .map(|f| (f.link.name.as_str(), f.link.visuals.as_slice()))
            .collect()
    }

    /// Forward kinematics over the subtree at `start`, whose parent is placed at `world`.
    /// Joints missing from `value_of` stay at zero.
    pub(crate) fn link_poses_from<F>(&self, start: FrameId, world: &Transform, value_of: F)
                                     -> HashMap<String, Transform>
    where
        F: Fn(&str) -> Option<f64>,
    {
        let mut frame_poses: HashMap<FrameId, Transform> = HashMap::new();
        let mut link_poses = HashMap::new();

        for id in self.walk_ids(start) {
            let node = self.frame(id);
            let parent_pose = match node.parent {
                Some(parent) if id != start => frame_poses[&parent],
                _ => *world,
            };
            let theta = value_of(&node.joint.name).unwrap_or(0.0);
            let pose = parent_pose * node.transform(theta);
            link_poses.insert(node.link.name.clone(), pose * node.link.offset);
            frame_poses.insert(id, pose);
        }
        link_poses
    }

    /// Frames from `start` (exclusive) down to the first descendant named `end_name`,
    /// found by depth-first search in pre-order.
    pub(crate) fn path_to(&self, start: FrameId, end_name: &str) -> Option<Vec<FrameId>> {
        let end = self.walk_ids(start).skip(1).find(|id| self.frame(*id).name == end_name)?;

        let mut path = Vec::new();
        let mut current = end;
        while current != start {
            path.push(current);
            current = self.frame(current).parent?;
        }
        path.reverse();
        Some(path)
    }

    pub(crate) fn walk_ids(&self, start: FrameId) -> impl Iterator<Item = FrameId> + '_ {
        let mut stack = vec![start];
        std::iter::from_fn(move || {
            let id = stack.pop()?;
            stack.extend(self.frame(id).children.iter().rev().copied());
            Some(id)
        })
    }
}

/// Joint names of the given frames, in order, de-duplicated.
pub(crate) fn joint_names<'a>(frames: impl Iterator<Item = &'a FrameNode>, exclude_fixed: bool) -> Vec<String> {
    let mut seen = HashSet::new();
    frames
        .map(|f| &f.joint)
        .filter(|j| !(exclude_fixed && !j.joint_type.is_movable()))
        .filter(|j| seen.insert(j.name.as_str()))
        .map(|j| j.name.clone())
        .collect()
}

/// Lazy pre-order iterator over the frames of a chain. Independent walks do not interfere.
pub struct ChainWalk<'a> {
    chain: &'a Chain,
    stack: Vec<FrameId>,
}

impl<'a> Iterator for ChainWalk<'a> {
    type Item = &'a FrameNode;

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.stack.pop()?;
        let node = self.chain.frame(id);
        self.stack.extend(node.children.iter().rev().copied());
        Some(node)
    }
}

impl<'a> IntoIterator for &'a Chain {
    type Item = &'a FrameNode;
    type IntoIter = ChainWalk<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.walk()
    }
}

const INDENT_WIDTH: usize = 4;

/// Prints the frame tree:
/// ```text
/// link1_frame
/// ├──── link2_frame
/// │     └──── link3_frame
/// └──── link4_frame
/// ```
impl fmt::Display for Chain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.root().name)?;

        let branch = "─".repeat(INDENT_WIDTH);
        let push_children = |stack: &mut Vec<(FrameId, String, bool)>, id: FrameId, prefix: &str| {
            let children = self.frame(id).children();
            for (i, child) in children.iter().enumerate().rev() {
                stack.push((*child, prefix.to_string(), i + 1 == children.len()));
            }
        };

        let mut stack = Vec::new();
        push_children(&mut stack, self.root_id(), "");
        while let Some((id, prefix, last)) = stack.pop() {
            let connector = if last { "└" } else { "├" };
            writeln!(f, "{prefix}{connector}{branch} {}", self.frame(id).name)?;
            let continuation = if last {
                " ".repeat(INDENT_WIDTH + 2)
            } else {
                format!("│{}", " ".repeat(INDENT_WIDTH + 1))
            };
            push_children(&mut stack, id, &format!("{prefix}{continuation}"));
        }
        Ok(())
    }
}
