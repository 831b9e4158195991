//! Bone hierarchies and armature objects.
//!
//! A [`Skeleton`] owns its bones in parents-first order; bones refer to their
//! parent by index and never own it. An [`Armature`] is the object-level
//! wrapper: it carries the skeleton, an object transform (the channel root
//! motion is baked onto) and optionally one attached [`Action`].

use glam::{Mat4, Vec3};
use hashbrown::HashMap;

use crate::action::Action;
use crate::error::RetargetError;
use crate::transform::Transform;

/// A named node in a skeleton.
#[derive(Clone, Debug)]
pub struct Bone {
    pub name: String,
    /// Index of the parent bone; parents always precede children.
    pub parent: Option<usize>,
    /// Rest-pose transform relative to the parent bone (or the armature
    /// object for root bones).
    pub rest_local: Transform,
    /// Whether this bone deforms a mesh. Deforming bones must always end up
    /// with keyframe data after a bake.
    pub deform: bool,
}

impl Bone {
    pub fn new(name: impl Into<String>, parent: Option<usize>, rest_local: Transform) -> Self {
        Self {
            name: name.into(),
            parent,
            rest_local,
            deform: true,
        }
    }

    pub fn with_deform(mut self, deform: bool) -> Self {
        self.deform = deform;
        self
    }
}

/// Ordered, named bone hierarchy.
#[derive(Clone, Debug, Default)]
pub struct Skeleton {
    bones: Vec<Bone>,
    by_name: HashMap<String, usize>,
}

impl Skeleton {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a skeleton from a parents-first bone list.
    pub fn from_bones(bones: Vec<Bone>) -> Result<Self, RetargetError> {
        for (i, bone) in bones.iter().enumerate() {
            if let Some(parent) = bone.parent {
                if parent >= i {
                    return Err(RetargetError::InvalidHierarchy {
                        bone: bone.name.clone(),
                    });
                }
            }
        }
        let by_name = bones
            .iter()
            .enumerate()
            .map(|(i, b)| (b.name.clone(), i))
            .collect();
        Ok(Self { bones, by_name })
    }

    pub fn bones(&self) -> &[Bone] {
        &self.bones
    }

    pub fn len(&self) -> usize {
        self.bones.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bones.is_empty()
    }

    pub fn bone(&self, index: usize) -> &Bone {
        &self.bones[index]
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.by_name.get(name).copied()
    }

    pub fn bone_by_name(&self, name: &str) -> Option<&Bone> {
        self.index_of(name).map(|i| &self.bones[i])
    }

    /// Rename a bone, keeping the name index in sync.
    ///
    /// Returns false (and leaves the bone untouched) when another bone
    /// already holds the requested name.
    pub fn rename(&mut self, index: usize, new_name: &str) -> bool {
        if self.bones[index].name == new_name {
            return true;
        }
        if self.by_name.contains_key(new_name) {
            return false;
        }
        let old = std::mem::replace(&mut self.bones[index].name, new_name.to_string());
        self.by_name.remove(&old);
        self.by_name.insert(new_name.to_string(), index);
        true
    }

    /// Rest-pose matrix of a bone in armature space.
    pub fn rest_world(&self, index: usize) -> Mat4 {
        let bone = &self.bones[index];
        let local = bone.rest_local.to_matrix();
        match bone.parent {
            Some(parent) => self.rest_world(parent) * local,
            None => local,
        }
    }
}

/// A skeleton object: the unit the pipeline imports, retargets and exports.
#[derive(Clone, Debug)]
pub struct Armature {
    pub name: String,
    /// Object-level transform. Root motion extraction bakes onto this
    /// channel; the on-ground option pre-sets its vertical offset.
    pub transform: Transform,
    pub skeleton: Skeleton,
    pub action: Option<Action>,
}

impl Armature {
    pub fn new(name: impl Into<String>, skeleton: Skeleton) -> Self {
        Self {
            name: name.into(),
            transform: Transform::IDENTITY,
            skeleton,
            action: None,
        }
    }

    /// Rename a bone, rewriting any attached action curves that address it.
    pub fn rename_bone(&mut self, index: usize, new_name: &str) -> bool {
        let old = self.skeleton.bone(index).name.clone();
        if !self.skeleton.rename(index, new_name) {
            return false;
        }
        if let Some(action) = self.action.as_mut() {
            action.rename_bone_target(&old, new_name);
        }
        true
    }

    /// Rest-pose head position of a bone in world space (object transform
    /// applied on top of the rest FK chain).
    pub fn bone_rest_world_head(&self, index: usize) -> Vec3 {
        let world = self.transform.to_matrix() * self.skeleton.rest_world(index);
        world.to_scale_rotation_translation().2
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Quat;

    fn two_bone_skeleton() -> Skeleton {
        let root = Bone::new("root", None, Transform::IDENTITY);
        let child = Bone::new(
            "child",
            Some(0),
            Transform::new(Vec3::new(0.0, 1.0, 0.0), Quat::IDENTITY, Vec3::ONE),
        );
        Skeleton::from_bones(vec![root, child]).unwrap()
    }

    #[test]
    fn test_lookup_and_rename() {
        let mut skel = two_bone_skeleton();
        assert_eq!(skel.index_of("child"), Some(1));
        assert!(skel.rename(1, "spine"));
        assert_eq!(skel.index_of("child"), None);
        assert_eq!(skel.index_of("spine"), Some(1));
        // renaming onto an existing name is refused
        assert!(!skel.rename(1, "root"));
        assert_eq!(skel.index_of("spine"), Some(1));
    }

    #[test]
    fn test_child_before_parent_rejected() {
        let a = Bone::new("a", Some(1), Transform::IDENTITY);
        let b = Bone::new("b", None, Transform::IDENTITY);
        assert!(Skeleton::from_bones(vec![a, b]).is_err());
    }

    #[test]
    fn test_rest_world_head_applies_object_transform() {
        let mut armature = Armature::new("rig", two_bone_skeleton());
        armature.transform.translation = Vec3::new(0.0, 0.0, 2.0);
        let head = armature.bone_rest_world_head(1);
        assert!((head - Vec3::new(0.0, 1.0, 2.0)).length() < 1e-6);
    }
}
