//! Explicit workspace for per-clip document state.
//!
//! The pipeline processes one clip at a time against a set of loaded
//! datablocks. The scene owns those datablocks and `reset` drops them all;
//! batch drivers must reset before and after every file, because leftovers
//! from a previous clip would corrupt name-based lookups and accumulate
//! memory over a long run. Each file is effectively a transaction over this
//! state and the reset is its commit.

use crate::error::RetargetError;
use crate::skeleton::Armature;

/// Owner of every armature (and through them, every action) loaded for the
/// clip currently being processed.
#[derive(Debug, Default)]
pub struct Scene {
    armatures: Vec<Armature>,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop every datablock. Required before and after each clip.
    pub fn reset(&mut self) {
        if !self.armatures.is_empty() {
            tracing::debug!(count = self.armatures.len(), "scene reset, dropping armatures");
        }
        self.armatures.clear();
    }

    pub fn add_armature(&mut self, armature: Armature) -> usize {
        self.armatures.push(armature);
        self.armatures.len() - 1
    }

    pub fn armature(&self, index: usize) -> &Armature {
        &self.armatures[index]
    }

    pub fn armature_mut(&mut self, index: usize) -> &mut Armature {
        &mut self.armatures[index]
    }

    pub fn armature_count(&self) -> usize {
        self.armatures.len()
    }

    pub fn find_armature(&self, name: &str) -> Option<usize> {
        self.armatures.iter().position(|a| a.name == name)
    }

    /// Remove one armature from the scene, returning it.
    pub fn remove_armature(&mut self, index: usize) -> Armature {
        self.armatures.remove(index)
    }

    /// Borrow two distinct armatures at once, the first shared and the
    /// second mutable — the (source, target) pair a bake needs.
    pub fn pair_mut(
        &mut self,
        shared: usize,
        mutable: usize,
    ) -> Result<(&Armature, &mut Armature), RetargetError> {
        if shared == mutable
            || shared >= self.armatures.len()
            || mutable >= self.armatures.len()
        {
            return Err(RetargetError::NoArmature);
        }
        if shared < mutable {
            let (head, tail) = self.armatures.split_at_mut(mutable);
            Ok((&head[shared], &mut tail[0]))
        } else {
            let (head, tail) = self.armatures.split_at_mut(shared);
            Ok((&tail[0], &mut head[mutable]))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::skeleton::Skeleton;

    fn armature(name: &str) -> Armature {
        Armature::new(name, Skeleton::new())
    }

    #[test]
    fn test_reset_drops_everything() {
        let mut scene = Scene::new();
        scene.add_armature(armature("a"));
        scene.add_armature(armature("b"));
        scene.reset();
        assert_eq!(scene.armature_count(), 0);
        assert_eq!(scene.find_armature("a"), None);
    }

    #[test]
    fn test_pair_mut_split_borrow() {
        let mut scene = Scene::new();
        let target = scene.add_armature(armature("template"));
        let source = scene.add_armature(armature("mocap"));
        let (src, tgt) = scene.pair_mut(source, target).unwrap();
        assert_eq!(src.name, "mocap");
        tgt.name = "baked".to_string();
        assert_eq!(scene.armature(0).name, "baked");
    }

    #[test]
    fn test_pair_mut_same_index_rejected() {
        let mut scene = Scene::new();
        scene.add_armature(armature("a"));
        assert!(scene.pair_mut(0, 0).is_err());
    }
}
