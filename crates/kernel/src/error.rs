//! Error types for solver construction.
//!
//! Only setup can fail. Numeric degeneracies inside a substep (near-zero
//! separations, under-dense particles, particles at the crater center) are
//! absorbed where they occur and never reach the caller.

/// Errors raised while building a solver or validating a scene.
#[derive(Debug, thiserror::Error)]
pub enum KernelError {
    /// A required configuration key was absent.
    #[error("missing required solver parameter `{0}`")]
    MissingParameter(&'static str),

    /// A configuration value is out of its admissible range.
    #[error("invalid solver parameter `{name}`: {reason}")]
    InvalidParameter {
        /// Parameter name as it appears in configuration.
        name: &'static str,
        /// Human-readable explanation.
        reason: String,
    },

    /// A rigid particle references a body id that has no metadata entry.
    #[error("particle {particle} references unknown rigid body {object_id}")]
    UnknownRigidBody {
        /// Offending particle index.
        particle: usize,
        /// Referenced body id.
        object_id: u32,
    },

    /// A rigid particle's static/dynamic material disagrees with its body.
    #[error("particle {particle} material does not match rigid body {object_id}")]
    RigidMaterialMismatch {
        /// Offending particle index.
        particle: usize,
        /// Referenced body id.
        object_id: u32,
    },
}

/// Convenience alias for kernel results.
pub type KernelResult<T> = Result<T, KernelError>;
