//! Error types for the retargeting pipeline.

use thiserror::Error;

/// Errors raised by the core pipeline.
///
/// `NoHipBone` is fatal for the current clip only: batch drivers are
/// expected to log it, skip the file and carry on. Everything else aborts
/// the operation it came from.
#[derive(Debug, Error)]
pub enum RetargetError {
    /// The operand is not (or does not contain) an armature.
    #[error("no armature found among the imported objects")]
    NoArmature,

    /// Bone list violates the parents-first ordering invariant.
    #[error("bone '{bone}' appears before its parent")]
    InvalidHierarchy { bone: String },

    /// The source armature carries no usable animation data.
    #[error("armature '{armature}' has no animation data to retarget")]
    MissingAction { armature: String },

    /// None of the candidate hip names exist on the source skeleton.
    #[error("no hip bone found on '{armature}' (tried {tried:?})")]
    NoHipBone {
        armature: String,
        tried: Vec<String>,
    },
}
