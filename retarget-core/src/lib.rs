//! retarget-core
//!
//! Retargets skeletal animation clips authored against a mocap vendor's
//! bone-naming convention onto a differently-named target skeleton and
//! bakes the result into explicit keyframe curves.
//!
//! The pipeline, left to right: [`namemap`] translates source bone names,
//! [`bake`] extracts root motion from the hips and transfers every matched
//! bone through transient copy constraints, [`continuity`] repairs
//! quaternion sign discontinuities in the baked rotation curves, and
//! [`reduce`] drops redundant keys. [`scene`] owns per-clip document state
//! and its mandatory reset.

pub mod action;
pub mod bake;
pub mod constraint;
pub mod continuity;
pub mod error;
pub mod namemap;
pub mod pose;
pub mod reduce;
pub mod scene;
pub mod skeleton;
pub mod transform;

pub use action::{Action, ChannelProperty, ChannelTarget, FCurve, Interpolation, Keyframe};
pub use bake::{bake_bones, bake_root, RetargetOptions, HIP_CANDIDATES};
pub use constraint::Constraint;
pub use continuity::{quaternion_cleanup, FLIP_WINDOW, INVERT_THRESHOLD};
pub use error::RetargetError;
pub use namemap::{rename_to_source, rename_to_target, strip_namespace, strip_namespaces, BONE_MAP};
pub use reduce::{simplify, simplify_with_threshold, CLEAN_THRESHOLD};
pub use scene::Scene;
pub use skeleton::{Armature, Bone, Skeleton};
pub use transform::Transform;
