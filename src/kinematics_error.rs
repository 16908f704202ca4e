//! Errors reported by the kinematic core.

/// Failure of a kinematic query or of building a kinematic structure.
///
/// All of these are local and synchronous: they are returned to the immediate caller
/// and never retried internally.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum KinematicsError {
    /// Joint type outside fixed, revolute and prismatic.
    #[error("unsupported joint type: {0}")]
    UnsupportedJointType(String),

    /// Lookup by name failed.
    #[error("frame not found: {0}")]
    FrameNotFound(String),

    /// A serial chain cannot reach the named root or end frame.
    #[error("invalid path endpoint: {0}")]
    InvalidPathEndpoint(String),

    /// Positional joint values do not match the number of movable joints.
    #[error("joint count mismatch: expected {expected}, found {found}")]
    JointCountMismatch { expected: usize, found: usize },

    /// Rotation given as neither roll-pitch-yaw (3 values) nor a quaternion (4 values).
    #[error("size of rotation must be 3 or 4, found {0}")]
    InvalidRotationSize(usize),

    /// Visual geometry that the rendering side cannot place (for instance, unknown mesh format).
    #[error("unsupported geometry: {0}")]
    UnsupportedGeometry(String),
}
