//! GLB export of a retargeted armature and its baked action.
//!
//! One glTF node per bone under an object root node, a skin over the
//! deforming bones, and one animation built from the action's curves.
//! Curve values are read through normal evaluation so reduced curves export
//! the same motion they describe.

use std::path::Path;

use anyhow::{Context, Result};
use glam::Mat4;
use gltf_json as json;
use json::validation::Checked::Valid;

use retarget_core::{Action, Armature, ChannelProperty, ChannelTarget};

use crate::import::FRAME_RATE;

/// Write `armature` (and its attached action, when present) to a GLB file.
pub fn export_clip(path: &Path, armature: &Armature) -> Result<()> {
    let mut bin = BinChunk::new();
    let nodes = build_nodes(armature);
    let animations = match armature.action.as_ref() {
        Some(action) => build_animation(armature, action, &mut bin),
        None => Vec::new(),
    };
    let skins = build_skin(armature, &mut bin);

    let root = assemble_root(armature, nodes, animations, skins, &bin);
    let glb = assemble_glb(&root, &bin.data);
    std::fs::write(path, glb).with_context(|| format!("Failed to write GLB: {:?}", path))?;

    tracing::info!(
        "Exported '{}': {} bones, {} curves -> {:?}",
        armature.name,
        armature.skeleton.len(),
        armature.action.as_ref().map(|a| a.curves().len()).unwrap_or(0),
        path
    );
    Ok(())
}

/// Node layout: index 0 is the armature object node, bone `i` maps to node
/// `i + 1`.
fn node_index_of_bone(bone: usize) -> u32 {
    bone as u32 + 1
}

fn build_nodes(armature: &Armature) -> Vec<json::Node> {
    let skeleton = &armature.skeleton;
    let mut children: Vec<Vec<json::Index<json::Node>>> = vec![Vec::new(); skeleton.len() + 1];
    for (i, bone) in skeleton.bones().iter().enumerate() {
        let parent_node = match bone.parent {
            Some(p) => node_index_of_bone(p) as usize,
            None => 0,
        };
        children[parent_node].push(json::Index::new(node_index_of_bone(i)));
    }

    let mut nodes = Vec::with_capacity(skeleton.len() + 1);
    nodes.push(make_node(
        &armature.name,
        &armature.transform,
        std::mem::take(&mut children[0]),
    ));
    for (i, bone) in skeleton.bones().iter().enumerate() {
        nodes.push(make_node(
            &bone.name,
            &bone.rest_local,
            std::mem::take(&mut children[i + 1]),
        ));
    }
    nodes
}

fn make_node(
    name: &str,
    transform: &retarget_core::Transform,
    children: Vec<json::Index<json::Node>>,
) -> json::Node {
    let rotation = transform.rotation;
    json::Node {
        camera: None,
        children: if children.is_empty() {
            None
        } else {
            Some(children)
        },
        extensions: Default::default(),
        extras: Default::default(),
        matrix: None,
        mesh: None,
        name: Some(name.to_string()),
        rotation: Some(json::scene::UnitQuaternion([
            rotation.x, rotation.y, rotation.z, rotation.w,
        ])),
        scale: Some(transform.scale.to_array()),
        translation: Some(transform.translation.to_array()),
        skin: None,
        weights: None,
    }
}

fn build_skin(armature: &Armature, bin: &mut BinChunk) -> Vec<json::Skin> {
    let deform: Vec<usize> = (0..armature.skeleton.len())
        .filter(|&i| armature.skeleton.bone(i).deform)
        .collect();
    if deform.is_empty() {
        return Vec::new();
    }

    let object = armature.transform.to_matrix();
    let matrices: Vec<[f32; 16]> = deform
        .iter()
        .map(|&i| {
            let world: Mat4 = object * armature.skeleton.rest_world(i);
            world.inverse().to_cols_array()
        })
        .collect();
    let ibm = bin.push_mat4(&matrices);

    vec![json::Skin {
        extensions: Default::default(),
        extras: Default::default(),
        inverse_bind_matrices: Some(ibm),
        joints: deform
            .iter()
            .map(|&i| json::Index::new(node_index_of_bone(i)))
            .collect(),
        name: Some(armature.name.clone()),
        skeleton: deform.first().map(|&i| json::Index::new(node_index_of_bone(i))),
    }]
}

fn build_animation(
    armature: &Armature,
    action: &Action,
    bin: &mut BinChunk,
) -> Vec<json::Animation> {
    let mut samplers = Vec::new();
    let mut channels = Vec::new();

    // Object channel, then every bone with curves, in skeleton order.
    let mut slots: Vec<(ChannelTarget, u32, retarget_core::Transform)> = Vec::new();
    slots.push((ChannelTarget::Object, 0, armature.transform));
    for (i, bone) in armature.skeleton.bones().iter().enumerate() {
        slots.push((
            ChannelTarget::Bone(bone.name.clone()),
            node_index_of_bone(i),
            bone.rest_local,
        ));
    }

    for (target, node, base) in slots {
        emit_translation(action, &target, node, &base, bin, &mut samplers, &mut channels);
        emit_rotation(action, &target, node, &base, bin, &mut samplers, &mut channels);
    }

    if channels.is_empty() {
        return Vec::new();
    }

    vec![json::Animation {
        channels,
        extensions: Default::default(),
        extras: Default::default(),
        name: Some(action.name.clone()),
        samplers,
    }]
}

/// Sorted union of keyed frames over a property's component curves.
fn keyed_frames(
    action: &Action,
    target: &ChannelTarget,
    property: ChannelProperty,
    components: usize,
) -> Vec<f32> {
    let mut frames: Vec<f32> = Vec::new();
    for i in 0..components {
        if let Some(curve) = action.find(target, property, i) {
            frames.extend(curve.keyframes().iter().map(|k| k.frame));
        }
    }
    frames.sort_by(f32::total_cmp);
    frames.dedup();
    frames
}

fn emit_translation(
    action: &Action,
    target: &ChannelTarget,
    node: u32,
    base: &retarget_core::Transform,
    bin: &mut BinChunk,
    samplers: &mut Vec<json::animation::Sampler>,
    channels: &mut Vec<json::animation::Channel>,
) {
    let frames = keyed_frames(action, target, ChannelProperty::Location, 3);
    if frames.is_empty() {
        return;
    }
    let times: Vec<f32> = frames.iter().map(|f| f / FRAME_RATE).collect();
    let values: Vec<[f32; 3]> = frames
        .iter()
        .map(|&frame| {
            let mut v = base.translation.to_array();
            for (i, component) in v.iter_mut().enumerate() {
                if let Some(curve) = action.find(target, ChannelProperty::Location, i) {
                    *component = curve.evaluate(frame);
                }
            }
            v
        })
        .collect();

    let input = bin.push_times(&times);
    let output = bin.push_vec3(&values);
    push_channel(
        node,
        json::animation::Property::Translation,
        input,
        output,
        samplers,
        channels,
    );
}

fn emit_rotation(
    action: &Action,
    target: &ChannelTarget,
    node: u32,
    base: &retarget_core::Transform,
    bin: &mut BinChunk,
    samplers: &mut Vec<json::animation::Sampler>,
    channels: &mut Vec<json::animation::Channel>,
) {
    let frames = keyed_frames(action, target, ChannelProperty::RotationQuaternion, 4);
    if frames.is_empty() {
        return;
    }
    let times: Vec<f32> = frames.iter().map(|f| f / FRAME_RATE).collect();
    let rest = base.rotation;
    let values: Vec<[f32; 4]> = frames
        .iter()
        .map(|&frame| {
            let mut q = [rest.x, rest.y, rest.z, rest.w];
            for (i, component) in q.iter_mut().enumerate() {
                if let Some(curve) = action.find(target, ChannelProperty::RotationQuaternion, i) {
                    *component = curve.evaluate(frame);
                }
            }
            let normalized = glam::Quat::from_xyzw(q[0], q[1], q[2], q[3]).normalize();
            [normalized.x, normalized.y, normalized.z, normalized.w]
        })
        .collect();

    let input = bin.push_times(&times);
    let output = bin.push_vec4(&values);
    push_channel(
        node,
        json::animation::Property::Rotation,
        input,
        output,
        samplers,
        channels,
    );
}

fn push_channel(
    node: u32,
    property: json::animation::Property,
    input: json::Index<json::Accessor>,
    output: json::Index<json::Accessor>,
    samplers: &mut Vec<json::animation::Sampler>,
    channels: &mut Vec<json::animation::Channel>,
) {
    samplers.push(json::animation::Sampler {
        input,
        interpolation: Valid(json::animation::Interpolation::Linear),
        output,
        extensions: Default::default(),
        extras: Default::default(),
    });
    channels.push(json::animation::Channel {
        sampler: json::Index::new(samplers.len() as u32 - 1),
        target: json::animation::Target {
            node: json::Index::new(node),
            path: Valid(property),
            extensions: Default::default(),
            extras: Default::default(),
        },
        extensions: Default::default(),
        extras: Default::default(),
    });
}

fn assemble_root(
    armature: &Armature,
    nodes: Vec<json::Node>,
    animations: Vec<json::Animation>,
    skins: Vec<json::Skin>,
    bin: &BinChunk,
) -> json::Root {
    let buffers = vec![json::Buffer {
        byte_length: (bin.data.len() as u64).into(),
        extensions: Default::default(),
        extras: Default::default(),
        name: None,
        uri: None,
    }];
    let scenes = vec![json::Scene {
        extensions: Default::default(),
        extras: Default::default(),
        name: Some(armature.name.clone()),
        nodes: vec![json::Index::new(0)],
    }];

    json::Root {
        accessors: bin.accessors.clone(),
        animations,
        asset: json::Asset {
            copyright: None,
            extensions: Default::default(),
            extras: Default::default(),
            generator: Some("retarget-export".to_string()),
            min_version: None,
            version: "2.0".to_string(),
        },
        buffers,
        buffer_views: bin.views.clone(),
        cameras: Vec::new(),
        extensions: Default::default(),
        extensions_required: Vec::new(),
        extensions_used: Vec::new(),
        extras: Default::default(),
        images: Vec::new(),
        materials: Vec::new(),
        meshes: Vec::new(),
        nodes,
        samplers: Vec::new(),
        scene: Some(json::Index::new(0)),
        scenes,
        skins,
        textures: Vec::new(),
    }
}

/// Binary chunk under construction: packed data plus the buffer views and
/// accessors describing it.
struct BinChunk {
    data: Vec<u8>,
    views: Vec<json::buffer::View>,
    accessors: Vec<json::Accessor>,
}

impl BinChunk {
    fn new() -> Self {
        Self {
            data: Vec::new(),
            views: Vec::new(),
            accessors: Vec::new(),
        }
    }

    /// Pack animation input times; min/max bounds are mandatory here.
    fn push_times(&mut self, times: &[f32]) -> json::Index<json::Accessor> {
        let min = times.iter().copied().fold(f32::MAX, f32::min);
        let max = times.iter().copied().fold(f32::MIN, f32::max);
        self.push_f32(
            bytemuck::cast_slice(times),
            times.len(),
            json::accessor::Type::Scalar,
            Some((vec![min], vec![max])),
        )
    }

    fn push_vec3(&mut self, values: &[[f32; 3]]) -> json::Index<json::Accessor> {
        self.push_f32(
            bytemuck::cast_slice(values),
            values.len(),
            json::accessor::Type::Vec3,
            None,
        )
    }

    fn push_vec4(&mut self, values: &[[f32; 4]]) -> json::Index<json::Accessor> {
        self.push_f32(
            bytemuck::cast_slice(values),
            values.len(),
            json::accessor::Type::Vec4,
            None,
        )
    }

    fn push_mat4(&mut self, values: &[[f32; 16]]) -> json::Index<json::Accessor> {
        self.push_f32(
            bytemuck::cast_slice(values),
            values.len(),
            json::accessor::Type::Mat4,
            None,
        )
    }

    fn push_f32(
        &mut self,
        bytes: &[u8],
        count: usize,
        type_: json::accessor::Type,
        bounds: Option<(Vec<f32>, Vec<f32>)>,
    ) -> json::Index<json::Accessor> {
        let offset = self.data.len();
        self.data.extend_from_slice(bytes);

        self.views.push(json::buffer::View {
            buffer: json::Index::new(0),
            byte_length: (bytes.len() as u64).into(),
            byte_offset: Some((offset as u64).into()),
            byte_stride: None,
            extensions: Default::default(),
            extras: Default::default(),
            name: None,
            target: None,
        });

        let (min, max) = match bounds {
            Some((min, max)) => (
                Some(json::Value::Array(
                    min.into_iter().map(|v| json::Value::from(v as f64)).collect(),
                )),
                Some(json::Value::Array(
                    max.into_iter().map(|v| json::Value::from(v as f64)).collect(),
                )),
            ),
            None => (None, None),
        };

        let index = json::Index::new(self.accessors.len() as u32);
        self.accessors.push(json::Accessor {
            buffer_view: Some(json::Index::new(self.views.len() as u32 - 1)),
            byte_offset: Some(0u64.into()),
            count: count.into(),
            component_type: Valid(json::accessor::GenericComponentType(
                json::accessor::ComponentType::F32,
            )),
            extensions: Default::default(),
            extras: Default::default(),
            type_: Valid(type_),
            min,
            max,
            name: None,
            normalized: false,
            sparse: None,
        });

        // keep following views 4-byte aligned
        while self.data.len() % 4 != 0 {
            self.data.push(0);
        }
        index
    }
}

/// Assemble a GLB container: 12-byte header, padded JSON chunk, padded BIN
/// chunk.
fn assemble_glb(root: &json::Root, buffer_data: &[u8]) -> Vec<u8> {
    let json_string = json::serialize::to_string(root).expect("Failed to serialize GLTF JSON");
    let json_bytes = json_string.as_bytes();

    let json_padding = (4 - (json_bytes.len() % 4)) % 4;
    let json_chunk_length = json_bytes.len() + json_padding;
    let buffer_padding = (4 - (buffer_data.len() % 4)) % 4;
    let buffer_chunk_length = buffer_data.len() + buffer_padding;
    let total_length = 12 + 8 + json_chunk_length + 8 + buffer_chunk_length;

    let mut glb = Vec::with_capacity(total_length);
    glb.extend_from_slice(b"glTF");
    glb.extend_from_slice(&2u32.to_le_bytes());
    glb.extend_from_slice(&(total_length as u32).to_le_bytes());

    glb.extend_from_slice(&(json_chunk_length as u32).to_le_bytes());
    glb.extend_from_slice(&0x4E4F534Au32.to_le_bytes()); // "JSON"
    glb.extend_from_slice(json_bytes);
    glb.extend(std::iter::repeat(0x20u8).take(json_padding));

    glb.extend_from_slice(&(buffer_chunk_length as u32).to_le_bytes());
    glb.extend_from_slice(&0x004E4942u32.to_le_bytes()); // "BIN\0"
    glb.extend_from_slice(buffer_data);
    glb.extend(std::iter::repeat(0u8).take(buffer_padding));

    glb
}

#[cfg(test)]
mod tests {
    use super::*;
    use retarget_core::{Bone, Skeleton, Transform};

    fn tiny_armature() -> Armature {
        let bones = vec![Bone::new("pelvis", None, Transform::IDENTITY)];
        Armature::new("rig", Skeleton::from_bones(bones).unwrap())
    }

    #[test]
    fn test_glb_container_layout() {
        let armature = tiny_armature();
        let root = assemble_root(
            &armature,
            build_nodes(&armature),
            Vec::new(),
            Vec::new(),
            &BinChunk::new(),
        );
        let glb = assemble_glb(&root, &[1, 2, 3]);
        assert_eq!(&glb[0..4], b"glTF");
        assert_eq!(u32::from_le_bytes(glb[4..8].try_into().unwrap()), 2);
        assert_eq!(
            u32::from_le_bytes(glb[8..12].try_into().unwrap()) as usize,
            glb.len()
        );
    }

    #[test]
    fn test_bin_chunk_alignment() {
        let mut bin = BinChunk::new();
        bin.push_times(&[0.0, 0.5, 1.0]);
        assert_eq!(bin.data.len() % 4, 0);
        bin.push_vec3(&[[1.0, 2.0, 3.0]]);
        assert_eq!(bin.accessors.len(), 2);
        assert_eq!(bin.views.len(), 2);
    }
}
