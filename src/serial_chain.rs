//! Single path through a [`Chain`], from a start frame (the root by default) to an
//! end-effector frame, with path forward kinematics, Jacobian and inverse kinematics.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tracing::debug;

use crate::chain::{Chain, FrameId, FrameNode};
use crate::frame::Visual;
use crate::ik::{self, IkConfig};
use crate::jacobian::{calc_jacobian, calc_jacobian_frames, Jacobian};
use crate::kinematic_traits::{check_joint_count, JointValues, Pose, SerialKinematics};
use crate::kinematics_error::KinematicsError;
use crate::transform::Transform;

/// Root to end-effector path of a chain. The path is fixed at construction.
#[derive(Clone, Debug)]
pub struct SerialChain {
    chain: Arc<Chain>,
    /// Start frame first, end frame last.
    path: Vec<FrameId>,
    dof: usize,
}

impl SerialChain {
    /// Path from the root of `chain` to the frame named `end_frame`.
    ///
    /// # Errors
    /// [`KinematicsError::InvalidPathEndpoint`] if no descendant of the root has this name.
    pub fn new(chain: Arc<Chain>, end_frame: &str) -> Result<Self, KinematicsError> {
        let root = chain.root_id();
        Self::build(chain, root, end_frame)
    }

    /// Path from the frame named `root_frame` to its descendant `end_frame`.
    ///
    /// # Errors
    /// [`KinematicsError::InvalidPathEndpoint`] if either frame cannot be found, or the
    /// end frame is not below the start frame.
    pub fn with_root(chain: Arc<Chain>, end_frame: &str, root_frame: &str) -> Result<Self, KinematicsError> {
        let root = chain
            .find_frame_id(root_frame)
            .ok_or_else(|| KinematicsError::InvalidPathEndpoint(root_frame.to_string()))?;
        Self::build(chain, root, end_frame)
    }

    fn build(chain: Arc<Chain>, start: FrameId, end_frame: &str) -> Result<Self, KinematicsError> {
        let tail = chain
            .path_to(start, end_frame)
            .ok_or_else(|| KinematicsError::InvalidPathEndpoint(end_frame.to_string()))?;
        let mut path = Vec::with_capacity(tail.len() + 1);
        path.push(start);
        path.extend(tail);

        let dof = path.iter().filter(|id| chain.frame(**id).joint().joint_type.is_movable()).count();
        debug!(
            start = chain.frame(start).name(),
            end = end_frame,
            frames = path.len(),
            dof,
            "serial chain created"
        );
        Ok(SerialChain { chain, path, dof })
    }

    /// The whole tree this path belongs to.
    pub fn chain(&self) -> &Arc<Chain> {
        &self.chain
    }

    /// Frames of the path, start first.
    pub fn frames(&self) -> Vec<&FrameNode> {
        self.path.iter().map(|id| self.chain.frame(*id)).collect()
    }

    pub fn start_frame(&self) -> &FrameNode {
        self.chain.frame(self.path[0])
    }

    pub fn end_frame(&self) -> &FrameNode {
        self.chain.frame(self.path[self.path.len() - 1])
    }

    /// Number of movable joints on the path.
    pub fn dof(&self) -> usize {
        self.dof
    }

    /// Joint names along the path, start to end. Positional joint values follow the
    /// order of `joint_parameter_names(true)`, one value per movable joint.
    pub fn joint_parameter_names(&self, exclude_fixed: bool) -> Vec<String> {
        self.frames()
            .into_iter()
            .map(|f| f.joint())
            .filter(|j| !exclude_fixed || j.joint_type.is_movable())
            .map(|j| j.name.clone())
            .collect()
    }

    /// Pose of the end link.
    pub fn forward_kinematics<'a>(&self, values: impl Into<JointValues<'a>>) -> Result<Pose, KinematicsError> {
        self.forward_kinematics_in_world(values, &Transform::identity())
    }

    /// Pose of the end link with the parent of the start frame placed at `world`.
    pub fn forward_kinematics_in_world<'a>(&self, values: impl Into<JointValues<'a>>, world: &Transform)
                                           -> Result<Pose, KinematicsError> {
        let end = &self.end_frame().link().name;
        let mut poses = self.link_poses_in_world(values, world)?;
        poses
            .remove(end)
            .ok_or_else(|| KinematicsError::FrameNotFound(end.clone()))
    }

    /// Poses of every link on the path, keyed by link name.
    pub fn link_poses<'a>(&self, values: impl Into<JointValues<'a>>)
                          -> Result<HashMap<String, Transform>, KinematicsError> {
        self.link_poses_in_world(values, &Transform::identity())
    }

    pub fn link_poses_in_world<'a>(&self, values: impl Into<JointValues<'a>>, world: &Transform)
                                   -> Result<HashMap<String, Transform>, KinematicsError> {
        match values.into() {
            JointValues::Named(named) => {
                // Whole subtree below the start frame, narrowed down to the path
                let mut poses = self.chain.link_poses_from(self.path[0], world, |name| named.get(name).copied());
                let on_path: HashSet<&str> = self.frames().iter().map(|f| f.link().name.as_str()).collect();
                poses.retain(|name, _| on_path.contains(name.as_str()));
                Ok(poses)
            }
            JointValues::Positional(qs) => {
                check_joint_count(self.dof, qs)?;
                let mut values = qs.iter();
                let mut pose = *world;
                let mut poses = HashMap::with_capacity(self.path.len());
                for frame in self.frames() {
                    let theta = if frame.joint().joint_type.is_movable() {
                        values.next().copied().unwrap_or(0.0)
                    } else {
                        0.0
                    };
                    pose = pose * frame.transform(theta);
                    poses.insert(frame.link().name.clone(), pose * frame.link().offset);
                }
                Ok(poses)
            }
        }
    }

    /// Geometric Jacobian of the end link, in the world frame.
    pub fn jacobian(&self, qs: &[f64]) -> Result<Jacobian, KinematicsError> {
        calc_jacobian(&self.frames(), qs, None)
    }

    /// Jacobian of the tool center point, `tool` being fixed to the end frame.
    pub fn jacobian_with_tool(&self, qs: &[f64], tool: &Transform) -> Result<Jacobian, KinematicsError> {
        calc_jacobian(&self.frames(), qs, Some(tool))
    }

    /// One Jacobian per link on the path, keyed by link name. Each has a column per
    /// movable joint of the path; columns of joints beyond the link are zero.
    pub fn jacobians(&self, qs: &[f64]) -> Result<HashMap<String, Jacobian>, KinematicsError> {
        let frames = self.frames();
        frames
            .iter()
            .map(|f| {
                let name = f.link().name.clone();
                calc_jacobian_frames(&frames, qs, &name, None).map(|j| (name, j))
            })
            .collect()
    }

    /// Joint values bringing the end link to `target`, starting from `initial` or zeros.
    /// The last optimizer iterate is returned even if the target was not reached.
    pub fn inverse_kinematics(&self, target: &Pose, initial: Option<&[f64]>) -> Result<Vec<f64>, KinematicsError> {
        self.inverse_kinematics_with_config(target, initial, &IkConfig::default())
    }

    pub fn inverse_kinematics_with_config(&self, target: &Pose, initial: Option<&[f64]>, config: &IkConfig)
                                          -> Result<Vec<f64>, KinematicsError> {
        ik::inverse_kinematics(self, target, initial, config)
    }

    /// Link name to visuals, for the links on the path only.
    pub fn visuals_map(&self) -> HashMap<&str, &[Visual]> {
        self.path
            .iter()
            .map(|id| self.chain.frame(*id).link())
            .map(|link| (link.name.as_str(), link.visuals.as_slice()))
            .collect()
    }
}

impl SerialKinematics for SerialChain {
    fn dof(&self) -> usize {
        self.dof
    }

    fn joint_names(&self) -> Vec<String> {
        self.joint_parameter_names(true)
    }

    fn forward(&self, qs: &[f64]) -> Result<Pose, KinematicsError> {
        self.forward_kinematics(qs)
    }

    fn jacobian(&self, qs: &[f64]) -> Result<Jacobian, KinematicsError> {
        SerialChain::jacobian(self, qs)
    }
}
