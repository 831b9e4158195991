//! Clip and template import (glTF/GLB -> armature + action).
//!
//! The first skin of the document is the armature: its joints become bones
//! (hierarchy from the node tree, rest pose from node transforms), non-joint
//! descendants of the root joint come along as non-deforming bones. The
//! first animation becomes the attached action, sampler times converted to
//! frames at a fixed rate.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use anyhow::{bail, Context, Result};

use retarget_core::{
    Action, Armature, Bone, ChannelProperty, ChannelTarget, Interpolation, RetargetError,
    Skeleton, Transform,
};

/// Sample rate used to convert glTF sampler times (seconds) to frames.
pub const FRAME_RATE: f32 = 30.0;

/// Recognized clip file extensions. Anything else is silently skipped by
/// the batch driver.
pub const CLIP_EXTENSIONS: &[&str] = &["glb", "gltf"];

/// Whether a path looks like a supported clip file.
pub fn is_clip_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| {
            let e = e.to_lowercase();
            CLIP_EXTENSIONS.iter().any(|known| *known == e)
        })
        .unwrap_or(false)
}

/// Import a clip file: armature plus its animation. Fails when the document
/// has no skin or no animation.
pub fn import_clip(path: &Path) -> Result<Armature> {
    let (document, buffers, _images) =
        gltf::import(path).with_context(|| format!("Failed to load glTF: {:?}", path))?;
    let stem = file_stem(path);

    let (mut armature, channel_map) = build_armature(&document, &stem)?;
    let action = build_action(&document, &buffers, &channel_map, &stem)?
        .with_context(|| format!("No animations found in glTF: {:?}", path))?;
    armature.action = Some(action);
    Ok(armature)
}

/// Import the target skeleton template. Animation data in the template is
/// ignored; the caller re-imports a fresh copy for every clip.
pub fn import_template(path: &Path) -> Result<Armature> {
    let (document, _buffers, _images) =
        gltf::import(path).with_context(|| format!("Failed to load template: {:?}", path))?;
    let (armature, _) = build_armature(&document, &file_stem(path))?;
    Ok(armature)
}

/// List the animations in a clip file: name, channel count, duration.
pub fn list_animations(path: &Path) -> Result<()> {
    let (document, buffers, _images) =
        gltf::import(path).with_context(|| format!("Failed to load glTF: {:?}", path))?;

    let animations: Vec<_> = document.animations().collect();
    if animations.is_empty() {
        tracing::info!("No animations found in {:?}", path);
        return Ok(());
    }

    tracing::info!("Animations in {:?}:", path);
    for (i, animation) in animations.iter().enumerate() {
        let name = animation.name().unwrap_or("unnamed");
        let channel_count = animation.channels().count();
        let mut max_time = 0.0f32;
        for channel in animation.channels() {
            if let Ok(times) = read_elements::<1>(&channel.sampler().input(), &buffers) {
                if let Some(t) = times.last() {
                    max_time = max_time.max(t[0]);
                }
            }
        }
        tracing::info!("  [{}] '{}': {} channels, {:.2}s", i, name, channel_count, max_time);
    }
    Ok(())
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("clip")
        .to_string()
}

/// How an animation channel's target node maps into the armature.
enum ChannelSlot {
    Object,
    Bone(String),
}

/// Build the armature from the document's first skin, returning it together
/// with a node-index -> channel-target map for animation resolution.
fn build_armature(
    document: &gltf::Document,
    fallback_name: &str,
) -> Result<(Armature, HashMap<usize, ChannelSlot>)> {
    let skin = document.skins().next().ok_or(RetargetError::NoArmature)?;
    let joint_set: HashSet<usize> = skin.joints().map(|j| j.index()).collect();
    if joint_set.is_empty() {
        bail!("No bones found in skin");
    }

    // child node -> parent node over the whole document
    let mut node_parent: HashMap<usize, usize> = HashMap::new();
    for node in document.nodes() {
        for child in node.children() {
            node_parent.insert(child.index(), node.index());
        }
    }
    let nodes: Vec<_> = document.nodes().collect();

    // Root joints: joints whose parent node is not itself a joint.
    let root_joints: Vec<usize> = skin
        .joints()
        .map(|j| j.index())
        .filter(|i| {
            node_parent
                .get(i)
                .map(|p| !joint_set.contains(p))
                .unwrap_or(true)
        })
        .collect();

    let mut armature_name = skin
        .name()
        .map(str::to_string)
        .unwrap_or_else(|| fallback_name.to_string());
    let mut object_transform = Transform::IDENTITY;
    let mut channel_map: HashMap<usize, ChannelSlot> = HashMap::new();

    // A shared non-joint parent of the root joints is the armature object
    // node: its transform and name carry over, and channels targeting it
    // drive the object.
    if let Some(&first_root) = root_joints.first() {
        if let Some(&object_node) = node_parent.get(&first_root) {
            let node = &nodes[object_node];
            object_transform = node_trs(node);
            if let Some(name) = node.name() {
                armature_name = name.to_string();
            }
            channel_map.insert(object_node, ChannelSlot::Object);
        }
    }

    // Depth-first from each root joint so parents always precede children;
    // non-joint descendants come along as non-deforming bones.
    let mut bones: Vec<Bone> = Vec::new();
    let mut stack: Vec<(usize, Option<usize>)> = Vec::new();
    for root in root_joints.iter().rev() {
        stack.push((*root, None));
    }
    while let Some((node_index, parent_bone)) = stack.pop() {
        let node = &nodes[node_index];
        let name = node
            .name()
            .map(str::to_string)
            .unwrap_or_else(|| format!("bone_{node_index}"));
        let bone_index = bones.len();
        bones.push(
            Bone::new(name.clone(), parent_bone, node_trs(node))
                .with_deform(joint_set.contains(&node_index)),
        );
        channel_map.insert(node_index, ChannelSlot::Bone(name));
        let children: Vec<_> = node.children().collect();
        for child in children.into_iter().rev() {
            stack.push((child.index(), Some(bone_index)));
        }
    }

    let skeleton = Skeleton::from_bones(bones)?;
    let mut armature = Armature::new(armature_name, skeleton);
    armature.transform = object_transform;
    Ok((armature, channel_map))
}

fn node_trs(node: &gltf::Node) -> Transform {
    let (translation, rotation, scale) = node.transform().decomposed();
    Transform::new(
        glam::Vec3::from_array(translation),
        glam::Quat::from_array(rotation),
        glam::Vec3::from_array(scale),
    )
}

/// Build the action from the document's first animation, or None when the
/// document has none.
fn build_action(
    document: &gltf::Document,
    buffers: &[gltf::buffer::Data],
    channel_map: &HashMap<usize, ChannelSlot>,
    fallback_name: &str,
) -> Result<Option<Action>> {
    let Some(animation) = document.animations().next() else {
        return Ok(None);
    };
    let mut action = Action::new(animation.name().unwrap_or(fallback_name));

    for channel in animation.channels() {
        let node_index = channel.target().node().index();
        let Some(slot) = channel_map.get(&node_index) else {
            continue;
        };
        let target = match slot {
            ChannelSlot::Object => ChannelTarget::Object,
            ChannelSlot::Bone(name) => ChannelTarget::Bone(name.clone()),
        };

        let sampler = channel.sampler();
        let times = read_elements::<1>(&sampler.input(), buffers)?;
        let cubic = sampler.interpolation() == gltf::animation::Interpolation::CubicSpline;
        let interpolation = match sampler.interpolation() {
            gltf::animation::Interpolation::Step => Interpolation::Constant,
            _ => Interpolation::Linear,
        };
        // Cubic spline output packs [in-tangent, value, out-tangent]; only
        // the value matters here.
        let stride = if cubic { 3 } else { 1 };
        let pick = if cubic { 1 } else { 0 };

        match channel.target().property() {
            gltf::animation::Property::Translation => {
                let values = read_elements::<3>(&sampler.output(), buffers)?;
                for (k, t) in times.iter().enumerate() {
                    let frame = t[0] * FRAME_RATE;
                    let value = values[k * stride + pick];
                    for i in 0..3 {
                        action
                            .curve_ensure(&target, ChannelProperty::Location, i)
                            .insert(frame, value[i], interpolation);
                    }
                }
            }
            gltf::animation::Property::Rotation => {
                let values = read_elements::<4>(&sampler.output(), buffers)?;
                for (k, t) in times.iter().enumerate() {
                    let frame = t[0] * FRAME_RATE;
                    let value = values[k * stride + pick];
                    for i in 0..4 {
                        action
                            .curve_ensure(&target, ChannelProperty::RotationQuaternion, i)
                            .insert(frame, value[i], interpolation);
                    }
                }
            }
            _ => {} // Scale and morph weights are not retargeted
        }
    }

    Ok(Some(action))
}

/// Read an accessor of f32 elements with N components each.
fn read_elements<const N: usize>(
    accessor: &gltf::Accessor,
    buffers: &[gltf::buffer::Data],
) -> Result<Vec<[f32; N]>> {
    if accessor.data_type() != gltf::accessor::DataType::F32 {
        bail!("Accessor has unsupported component type {:?}", accessor.data_type());
    }
    let view = accessor.view().context("Accessor has no buffer view")?;
    let buffer = &buffers[view.buffer().index()];
    let offset = view.offset() + accessor.offset();
    let count = accessor.count();
    let stride = view.stride().unwrap_or(N * 4);

    let mut values = Vec::with_capacity(count);
    for i in 0..count {
        let base = offset + i * stride;
        let mut element = [0.0f32; N];
        for (j, component) in element.iter_mut().enumerate() {
            let at = base + j * 4;
            let bytes: [u8; 4] = buffer[at..at + 4]
                .try_into()
                .context("Accessor data out of bounds")?;
            *component = f32::from_le_bytes(bytes);
        }
        values.push(element);
    }
    Ok(values)
}
