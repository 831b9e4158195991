//! Pose sampling: action curves -> local transforms -> world matrices.

use glam::{Mat4, Quat};

use crate::action::{Action, ChannelProperty, ChannelTarget};
use crate::skeleton::Armature;
use crate::transform::Transform;

/// Sampled pose of an armature at one frame: the object-level transform and
/// one local transform per bone, rest values where nothing is keyed.
#[derive(Clone, Debug)]
pub struct Pose {
    pub object: Transform,
    pub locals: Vec<Transform>,
}

/// Evaluate `action` on `armature` at `frame`.
///
/// Curves set absolute local components; bones and components without
/// curves keep their rest values. Quaternions are rebuilt from the four
/// component curves and renormalized.
pub fn sample_pose(armature: &Armature, action: Option<&Action>, frame: f32) -> Pose {
    let skeleton = &armature.skeleton;
    let mut object = armature.transform;
    let mut locals: Vec<Transform> = skeleton.bones().iter().map(|b| b.rest_local).collect();

    let Some(action) = action else {
        return Pose { object, locals };
    };

    // Rotation components accumulate per target, then rebuild as one
    // quaternion so partial tracks still normalize sanely.
    let mut object_rot = quat_components(object.rotation);
    let mut object_rot_keyed = false;
    let mut bone_rots: Vec<[f32; 4]> = locals.iter().map(|l| quat_components(l.rotation)).collect();
    let mut bone_rot_keyed = vec![false; locals.len()];

    for curve in action.curves() {
        let value = curve.evaluate(frame);
        match (&curve.target, curve.property) {
            (ChannelTarget::Object, ChannelProperty::Location) => {
                if curve.index < 3 {
                    object.translation[curve.index] = value;
                }
            }
            (ChannelTarget::Object, ChannelProperty::RotationQuaternion) => {
                if curve.index < 4 {
                    object_rot[curve.index] = value;
                    object_rot_keyed = true;
                }
            }
            (ChannelTarget::Bone(name), property) => {
                let Some(bone) = skeleton.index_of(name) else {
                    continue;
                };
                match property {
                    ChannelProperty::Location => {
                        if curve.index < 3 {
                            locals[bone].translation[curve.index] = value;
                        }
                    }
                    ChannelProperty::RotationQuaternion => {
                        if curve.index < 4 {
                            bone_rots[bone][curve.index] = value;
                            bone_rot_keyed[bone] = true;
                        }
                    }
                }
            }
        }
    }

    if object_rot_keyed {
        object.rotation = quat_from_components(object_rot);
    }
    for (i, keyed) in bone_rot_keyed.iter().enumerate() {
        if *keyed {
            locals[i].rotation = quat_from_components(bone_rots[i]);
        }
    }

    Pose { object, locals }
}

/// World matrices for a sampled pose: the object matrix and one matrix per
/// bone (object transform applied on top of the FK chain).
pub fn world_matrices(armature: &Armature, pose: &Pose) -> (Mat4, Vec<Mat4>) {
    let object = pose.object.to_matrix();
    let mut worlds = Vec::with_capacity(pose.locals.len());
    for (i, bone) in armature.skeleton.bones().iter().enumerate() {
        let local = pose.locals[i].to_matrix();
        let world = match bone.parent {
            Some(parent) => worlds[parent] * local,
            None => object * local,
        };
        worlds.push(world);
    }
    (object, worlds)
}

fn quat_components(q: Quat) -> [f32; 4] {
    [q.x, q.y, q.z, q.w]
}

fn quat_from_components(c: [f32; 4]) -> Quat {
    Quat::from_xyzw(c[0], c[1], c[2], c[3]).normalize()
}
