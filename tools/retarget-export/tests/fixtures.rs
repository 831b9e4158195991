//! Programmatic GLB fixtures for integration tests.
//!
//! Armatures are built in memory and written through the exporter, so the
//! fixtures exercise the same GLB path the tool ships.

use std::path::Path;

use glam::{Quat, Vec3};
use retarget_core::{
    Action, Armature, Bone, ChannelProperty, ChannelTarget, Interpolation, Skeleton, Transform,
};
use retarget_export::export_clip;

/// Rest-pose hip height shared by the source rig and the template.
pub const HIP_HEIGHT: f32 = 0.95;
/// Last keyed frame of the generated clip.
pub const CLIP_FRAMES: i32 = 20;

fn offset(x: f32, y: f32, z: f32) -> Transform {
    Transform::new(Vec3::new(x, y, z), Quat::IDENTITY, Vec3::ONE)
}

/// Mocap-style source rig: namespaced vendor bone names, hips travelling
/// forward with a vertical bob, one arm waving.
pub fn mocap_source() -> Armature {
    let bones = vec![
        Bone::new("mixamorig:Hips", None, offset(0.0, 0.0, HIP_HEIGHT)),
        Bone::new("mixamorig:Spine", Some(0), offset(0.0, 0.0, 0.15)),
        Bone::new("mixamorig:LeftArm", Some(1), offset(0.2, 0.0, 0.3)),
        Bone::new("mixamorig:RightArm", Some(1), offset(-0.2, 0.0, 0.3)),
        Bone::new("mixamorig:LeftUpLeg", Some(0), offset(0.1, 0.0, -0.05)),
    ];
    let mut armature = Armature::new("Armature", Skeleton::from_bones(bones).unwrap());

    let mut action = Action::new("clip");
    let hips = ChannelTarget::Bone("mixamorig:Hips".into());
    let arm = ChannelTarget::Bone("mixamorig:LeftArm".into());
    for frame in 0..=CLIP_FRAMES {
        let f = frame as f32;
        action
            .curve_ensure(&hips, ChannelProperty::Location, 1)
            .insert(f, f * 0.05, Interpolation::Linear);
        action
            .curve_ensure(&hips, ChannelProperty::Location, 2)
            .insert(
                f,
                HIP_HEIGHT + 0.05 * (f * 0.7).sin(),
                Interpolation::Linear,
            );
        let wave = Quat::from_rotation_x(0.4 * (f * 0.5).sin());
        for (i, v) in [wave.x, wave.y, wave.z, wave.w].into_iter().enumerate() {
            action
                .curve_ensure(&arm, ChannelProperty::RotationQuaternion, i)
                .insert(f, v, Interpolation::Linear);
        }
    }
    armature.action = Some(action);
    armature
}

/// A rig with an animation but none of the hip candidate bones.
pub fn hipless_source() -> Armature {
    let bones = vec![
        Bone::new("Prop", None, Transform::IDENTITY),
        Bone::new("PropTip", Some(0), offset(0.0, 0.0, 0.4)),
    ];
    let mut armature = Armature::new("Prop", Skeleton::from_bones(bones).unwrap());
    let mut action = Action::new("spin");
    let prop = ChannelTarget::Bone("Prop".into());
    for frame in 0..=CLIP_FRAMES {
        action
            .curve_ensure(&prop, ChannelProperty::Location, 0)
            .insert(frame as f32, frame as f32 * 0.01, Interpolation::Linear);
    }
    armature.action = Some(action);
    armature
}

/// Target skeleton template: engine-style names, one non-deforming helper
/// bone, no animation.
pub fn target_template() -> Armature {
    let bones = vec![
        Bone::new("pelvis", None, offset(0.0, 0.0, HIP_HEIGHT)),
        Bone::new("spine_01", Some(0), offset(0.0, 0.0, 0.15)),
        Bone::new("upperarm_l", Some(1), offset(0.2, 0.0, 0.3)),
        Bone::new("upperarm_r", Some(1), offset(-0.2, 0.0, 0.3)),
        Bone::new("thigh_l", Some(0), offset(0.1, 0.0, -0.05)),
        Bone::new("ik_foot_root", Some(0), Transform::IDENTITY).with_deform(false),
    ];
    Armature::new("SK_Template", Skeleton::from_bones(bones).unwrap())
}

/// Write a fixture armature to `path` as GLB.
pub fn write_fixture(path: &Path, armature: &Armature) {
    export_clip(path, armature).expect("failed to write fixture GLB");
}
