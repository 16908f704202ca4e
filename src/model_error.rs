//! Error handling for model readers (URDF, MJCF) and configuration files

use std::io;
use std::path::PathBuf;

use crate::kinematics_error::KinematicsError;

/// Unified error to report failures while turning a description file into a chain.
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("IO Error reading {path}: {source}")]
    Io { path: PathBuf, source: io::Error },

    #[error("XML Processing Error: {0}")]
    Xml(String),

    /// Topology cannot be assembled (no root, joint referencing an undeclared link, ...).
    #[error("Invalid model: {0}")]
    InvalidModel(String),

    #[error("Parse Error: {0}")]
    Parse(String),

    #[error("Wrong angle representation: {0}")]
    WrongAngle(String),

    #[error("Missing Field: {0}")]
    MissingField(String),

    #[error(transparent)]
    Kinematics(#[from] KinematicsError),
}

impl ModelError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        ModelError::Io { path: path.into(), source }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_error_includes_path() {
        let e = ModelError::io(
            "/tmp/robot.urdf",
            io::Error::new(io::ErrorKind::NotFound, "not found"),
        );
        let msg = e.to_string();
        assert!(msg.contains("/tmp/robot.urdf"));
        assert!(msg.contains("not found"));
    }

    #[test]
    fn kinematics_error_is_transparent() {
        let e: ModelError = KinematicsError::UnsupportedJointType("planar".into()).into();
        assert_eq!(e.to_string(), "unsupported joint type: planar");
    }
}
