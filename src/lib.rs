//! Rust implementation of forward kinematics, geometric Jacobian and numerical inverse kinematics
//! for articulated robots described as trees of links and joints.
//!
//! A robot is a tree of [`frame::Frame`]s. Each frame owns a [`frame::Link`] (a rigid body with
//! optional visual shapes) and the [`frame::Joint`] connecting it to its parent. The tree is
//! frozen into a [`chain::Chain`], which computes the pose of every link for given joint values.
//! A [`serial_chain::SerialChain`] selects a single path through the tree and adds the Jacobian
//! and inverse kinematics.
//!
//! # Features
//!
//! - Forward kinematics for the whole tree, with joint values given by name or by position.
//! - Geometric Jacobian of a serial path, for the end link, an intermediate link, or a tool
//!   center point. Joint velocities and torques can be derived from it.
//! - Inverse kinematics by BFGS minimization of the pose discrepancy. The solver is fully
//!   deterministic: given the same initial guess, it returns the same joint values.
//! - The robot can be equipped with the tool and placed on the base, planning for the desired
//!   location and orientation of the tool center point (TCP) rather than any part of the robot.
//! - Reading models from URDF and MJCF files (feature `allow_filesystem`, on by default).
//! - Visualization window with joint sliders (feature `visualization`).
//!
//! ## Examples
//!
//! The following examples demonstrate various functionalities provided by this crate:
//!
//! - **basic.rs**: Building a chain in code, forward and inverse kinematics.
//! - **jacobian.rs**: Calculating Jacobian matrices, joint velocities and torques for a URDF robot.
//! - **tool_and_base.rs**: Configuring robots with a tool attachment and positioning on a specified base.
//! - **visualize.rs**: Showing a robot read from a file, with sliders for the joints.

pub mod transform;
pub mod frame;
pub mod chain;
pub mod serial_chain;

pub mod kinematic_traits;
pub mod kinematics_error;
pub mod model_error;

pub mod jacobian;
pub mod ik;

pub mod tool;

pub mod scene;

pub mod utils;

#[cfg(feature = "allow_filesystem")]
mod xml;

#[cfg(feature = "allow_filesystem")]
pub mod urdf;

#[cfg(feature = "allow_filesystem")]
pub mod mjcf;

#[cfg(feature = "allow_filesystem")]
pub mod model_file;

#[cfg(feature = "allow_filesystem")]
pub mod ik_config_from_file;

#[path = "visualize/visualization.rs"]
#[cfg(feature = "visualization")]
pub mod visualization;

#[path = "visualize/camera_controller.rs"]
#[cfg(feature = "visualization")]
mod camera_controller;

#[path = "visualize/stl_mesh.rs"]
#[cfg(feature = "visualization")]
pub mod stl_mesh;

#[cfg(test)]
#[cfg(feature = "allow_filesystem")]
mod tests;
