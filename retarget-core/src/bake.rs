//! Constraint-driven baking: root motion extraction and per-bone transfer.
//!
//! The bake primitive samples a driven transform once per integer frame,
//! converts it to the owner's local space against the target's already-baked
//! channels and writes explicit keyframes. Constraint stacks live on the
//! stack of the baking function and are dropped when it returns, which is
//! the "bake with constraint clearing" contract.

use glam::Mat4;

use crate::action::{Action, ChannelProperty, ChannelTarget, Interpolation};
use crate::constraint::{apply_stack, Constraint};
use crate::continuity::quaternion_cleanup;
use crate::error::RetargetError;
use crate::pose::{sample_pose, world_matrices};
use crate::skeleton::Armature;
use crate::transform::Transform;

/// Hip bone spellings tried in order on the source skeleton. Tolerates
/// un-translated and partially-translated sources.
pub const HIP_CANDIDATES: &[&str] = &["Hips", "mixamorig:Hips", "mixamorig_Hips", "pelvis"];

/// Root-motion transfer options.
#[derive(Clone, Copy, Debug)]
pub struct RetargetOptions {
    /// Transfer hip motion onto the target root channel at all.
    pub hips_to_root: bool,
    pub use_x: bool,
    pub use_y: bool,
    /// Transfer vertical hip motion (offset-relative to the root's own
    /// rest height).
    pub use_z: bool,
    /// Transfer hip yaw onto the root. Wanted for curve-walking clips,
    /// unwanted for straight walks with strong hip sway.
    pub use_rotation: bool,
    /// Keep the root clamped to the ground plane: the root never sinks
    /// below zero and only rises during jumps.
    pub on_ground: bool,
}

impl Default for RetargetOptions {
    fn default() -> Self {
        Self {
            hips_to_root: true,
            use_x: true,
            use_y: true,
            use_z: true,
            use_rotation: true,
            on_ground: true,
        }
    }
}

/// Locate the source hip bone, trying each candidate name in order.
fn find_hip(source: &Armature, candidates: &[&str]) -> Result<usize, RetargetError> {
    candidates
        .iter()
        .find_map(|name| source.skeleton.index_of(name))
        .ok_or_else(|| RetargetError::NoHipBone {
            armature: source.name.clone(),
            tried: candidates.iter().map(|s| s.to_string()).collect(),
        })
}

/// Extract root motion from the source hip bone onto the target's object
/// channel, baking explicit keyframes into `action`.
///
/// With `hips_to_root` disabled the root keeps its template rest transform
/// and no keys are written; locating the hip still happens first so a
/// hipless clip fails the same way in both configurations.
pub fn bake_root(
    source: &Armature,
    target: &mut Armature,
    action: &mut Action,
    hip_candidates: &[&str],
    options: RetargetOptions,
    frame_range: (i32, i32),
) -> Result<(), RetargetError> {
    let hip = find_hip(source, hip_candidates)?;
    let ground_offset = source.bone_rest_world_head(hip).z;

    if !options.hips_to_root {
        return Ok(());
    }

    let mut stack = Vec::new();
    if options.use_z {
        stack.push(Constraint::CopyLocation {
            use_x: false,
            use_y: false,
            use_z: true,
            use_offset: true,
        });
        if options.on_ground {
            // Static baseline cancels the rest-pose hip height; the limit
            // keeps the root from ever sinking below the ground plane.
            target.transform.translation.z = -ground_offset;
            stack.push(Constraint::LimitLocation { min_z: 0.0 });
        }
    }
    stack.push(Constraint::CopyLocation {
        use_x: options.use_x,
        use_y: options.use_y,
        use_z: false,
        use_offset: false,
    });
    stack.push(Constraint::CopyRotation {
        use_x: false,
        use_y: false,
        use_z: options.use_rotation,
    });

    tracing::debug!(
        hip = %source.skeleton.bone(hip).name,
        ground_offset,
        "baking root motion"
    );

    let src_action = source.action.as_ref();
    for frame in frame_range.0..=frame_range.1 {
        let f = frame as f32;
        let src_pose = sample_pose(source, src_action, f);
        let (_, src_worlds) = world_matrices(source, &src_pose);
        let hip_world = Transform::from_matrix(&src_worlds[hip]);

        let driven = apply_stack(&stack, target.transform, &hip_world);

        for i in 0..3 {
            action
                .curve_ensure(&ChannelTarget::Object, ChannelProperty::Location, i)
                .insert(f, driven.translation[i], Interpolation::Linear);
        }
        let rot = driven.rotation;
        for (i, value) in [rot.x, rot.y, rot.z, rot.w].into_iter().enumerate() {
            action
                .curve_ensure(&ChannelTarget::Object, ChannelProperty::RotationQuaternion, i)
                .insert(f, value, Interpolation::Linear);
        }
    }
    // stack dropped here: constraints cleared by the bake

    Ok(())
}

/// Retarget and bake every target bone from the identically-named source
/// bone, then repair quaternion continuity and attach the finished action.
///
/// The root channel is extracted first. Matched bones get a full
/// location+rotation copy baked one bone at a time, parents before
/// children. Deforming bones without a source counterpart are deferred and
/// baked driver-less afterwards so they still carry explicit rest keys;
/// non-deforming unmatched bones are left untouched.
pub fn bake_bones(
    source: &Armature,
    target: &mut Armature,
    action_name: &str,
    options: RetargetOptions,
) -> Result<(), RetargetError> {
    let src_action = source.action.as_ref().ok_or_else(|| RetargetError::MissingAction {
        armature: source.name.clone(),
    })?;
    let (range_start, range_end) =
        src_action
            .frame_range()
            .ok_or_else(|| RetargetError::MissingAction {
                armature: source.name.clone(),
            })?;
    // Round, don't floor/ceil: clip times that went through a
    // seconds-per-frame conversion carry float noise around integer frames.
    let frame_range = (range_start.round() as i32, range_end.round() as i32);
    let frame_count = (frame_range.1 - frame_range.0 + 1) as usize;

    let mut action = Action::new(action_name);
    bake_root(source, target, &mut action, HIP_CANDIDATES, options, frame_range)?;

    // Source world transforms per frame, shared by every per-bone bake.
    let mut src_worlds: Vec<Vec<Transform>> = Vec::with_capacity(frame_count);
    for frame in frame_range.0..=frame_range.1 {
        let pose = sample_pose(source, Some(src_action), frame as f32);
        let (_, worlds) = world_matrices(source, &pose);
        src_worlds.push(worlds.iter().map(Transform::from_matrix).collect());
    }

    // Target object matrix per frame, from the freshly-baked root channel.
    let obj_worlds: Vec<Mat4> = (frame_range.0..=frame_range.1)
        .map(|frame| {
            sample_pose(target, Some(&action), frame as f32)
                .object
                .to_matrix()
        })
        .collect();

    // Baked local pose per frame, updated as bones bake so children convert
    // against their parent's baked world transform.
    let rest_locals: Vec<Transform> = target
        .skeleton
        .bones()
        .iter()
        .map(|b| b.rest_local)
        .collect();
    let mut tgt_locals: Vec<Vec<Transform>> = vec![rest_locals; frame_count];

    let mut deferred = Vec::new();
    for ti in 0..target.skeleton.len() {
        let bone = target.skeleton.bone(ti);
        match source.skeleton.index_of(&bone.name) {
            Some(si) => {
                bake_one_bone(
                    target,
                    &mut action,
                    &mut tgt_locals,
                    &obj_worlds,
                    ti,
                    Some((si, &src_worlds)),
                    frame_range,
                );
            }
            None if bone.deform => deferred.push(ti),
            None => {}
        }
    }

    // Driver-less pass: every deforming bone ends up keyed, even when no
    // motion was retargeted onto it.
    for ti in deferred {
        bake_one_bone(
            target,
            &mut action,
            &mut tgt_locals,
            &obj_worlds,
            ti,
            None,
            frame_range,
        );
    }

    quaternion_cleanup(&mut action, true, true);
    target.action = Some(action);

    tracing::debug!(action = action_name, "bake finished");
    Ok(())
}

/// Bake a single target bone over the frame range, only ever writing keys
/// for this bone. `driver` is the matching source bone and its per-frame
/// world transforms; `None` bakes the bone's current (rest) pose.
fn bake_one_bone(
    target: &Armature,
    action: &mut Action,
    tgt_locals: &mut [Vec<Transform>],
    obj_worlds: &[Mat4],
    ti: usize,
    driver: Option<(usize, &[Vec<Transform>])>,
    frame_range: (i32, i32),
) {
    let bone = target.skeleton.bone(ti);
    let channel = ChannelTarget::Bone(bone.name.clone());
    let parent = bone.parent;
    let stack = [
        Constraint::copy_location_full(),
        Constraint::copy_rotation_full(),
    ];

    for frame in frame_range.0..=frame_range.1 {
        let fi = (frame - frame_range.0) as usize;
        let local = match driver {
            Some((si, src_worlds)) => {
                let owner_world =
                    Transform::from_matrix(&world_of(target, tgt_locals, obj_worlds, fi, ti));
                let driven = apply_stack(&stack, owner_world, &src_worlds[fi][si]);
                let parent_world = match parent {
                    Some(p) => world_of(target, tgt_locals, obj_worlds, fi, p),
                    None => obj_worlds[fi],
                };
                let local = Transform::from_matrix(&(parent_world.inverse() * driven.to_matrix()));
                tgt_locals[fi][ti] = local;
                local
            }
            None => tgt_locals[fi][ti],
        };

        let f = frame as f32;
        for i in 0..3 {
            action
                .curve_ensure(&channel, ChannelProperty::Location, i)
                .insert(f, local.translation[i], Interpolation::Linear);
        }
        let rot = local.rotation;
        for (i, value) in [rot.x, rot.y, rot.z, rot.w].into_iter().enumerate() {
            action
                .curve_ensure(&channel, ChannelProperty::RotationQuaternion, i)
                .insert(f, value, Interpolation::Linear);
        }
    }
}

/// World matrix of one target bone at one frame, from the baked-so-far
/// local pose.
fn world_of(
    target: &Armature,
    tgt_locals: &[Vec<Transform>],
    obj_worlds: &[Mat4],
    fi: usize,
    bone: usize,
) -> Mat4 {
    let mut chain = Vec::new();
    let mut cursor = Some(bone);
    while let Some(i) = cursor {
        chain.push(i);
        cursor = target.skeleton.bone(i).parent;
    }
    let mut world = obj_worlds[fi];
    for &i in chain.iter().rev() {
        world *= tgt_locals[fi][i].to_matrix();
    }
    world
}
