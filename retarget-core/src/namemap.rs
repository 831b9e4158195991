//! Bone-name translation between the mocap vendor skeleton and the target
//! skeleton convention.
//!
//! The table is a pure, order-independent lookup. `~` is the lateral
//! placeholder: on the mocap side it expands to the words `Left`/`Right`
//! (and the `.L`/`.R` suffix spellings), on the target side to the `l`/`r`
//! suffix. Several candidate spellings may resolve to one destination name;
//! the first bone present on the skeleton wins and unmatched candidates are
//! skipped silently.

use crate::skeleton::Armature;

/// Lateral placeholder marker in table entries.
const SIDE_MARK: char = '~';

/// Mocap-side pattern ↔ target-side pattern.
pub const BONE_MAP: &[(&str, &str)] = &[
    ("Root", "root"),
    ("Hips", "pelvis"),
    ("Spine", "spine_01"),
    ("Spine1", "spine_02"),
    ("Spine2", "spine_03"),
    ("~Shoulder", "clavicle_~"),
    ("~Arm", "upperarm_~"),
    ("~ForeArm", "lowerarm_~"),
    ("~Hand", "hand_~"),
    ("Neck1", "neck_01"),
    ("Neck", "neck_01"),
    ("Head", "head"),
    ("~UpLeg", "thigh_~"),
    ("~Leg", "calf_~"),
    ("~Foot", "foot_~"),
    ("~HandIndex1", "index_01_~"),
    ("~HandIndex2", "index_02_~"),
    ("~HandIndex3", "index_03_~"),
    ("~HandMiddle1", "middle_01_~"),
    ("~HandMiddle2", "middle_02_~"),
    ("~HandMiddle3", "middle_03_~"),
    ("~HandPinky1", "pinky_01_~"),
    ("~HandPinky2", "pinky_02_~"),
    ("~HandPinky3", "pinky_03_~"),
    ("~HandRing1", "ring_01_~"),
    ("~HandRing2", "ring_02_~"),
    ("~HandRing3", "ring_03_~"),
    ("~HandThumb1", "thumb_01_~"),
    ("~HandThumb2", "thumb_02_~"),
    ("~HandThumb3", "thumb_03_~"),
    ("~ToeBase", "ball_~"),
    ("~Wrist", "wrist_~"),
];

/// Strip a namespace prefix from a name: keep only the suffix after the
/// last `:` or `_` separator. Names without a separator pass through
/// unchanged. Idempotent.
pub fn strip_namespace(name: &str) -> &str {
    match name.rfind([':', '_']) {
        Some(i) => &name[i + 1..],
        None => name,
    }
}

/// Strip namespaces from every bone of an armature and from the armature
/// name itself.
pub fn strip_namespaces(armature: &mut Armature) {
    for i in 0..armature.skeleton.len() {
        let stripped = strip_namespace(&armature.skeleton.bone(i).name).to_string();
        armature.rename_bone(i, &stripped);
    }
    armature.name = strip_namespace(&armature.name).to_string();
}

/// Rename the first bone found among `candidates` to `dst`.
fn rename_first(armature: &mut Armature, candidates: &[&str], dst: &str) {
    for candidate in candidates {
        if let Some(index) = armature.skeleton.index_of(candidate) {
            if !armature.rename_bone(index, dst) {
                tracing::debug!("skipping rename {candidate} -> {dst}: name already taken");
            }
            return;
        }
    }
}

/// Rename an armature's bones from mocap-vendor names to target names.
///
/// Lateralized entries try the bare stem, the `.L`/`.R` suffix spelling and
/// the full `Left`/`Right` word, in that order (left side first).
pub fn rename_to_target(armature: &mut Armature) {
    strip_namespaces(armature);
    for (mocap, target) in BONE_MAP {
        if mocap.contains(SIDE_MARK) {
            let stem = mocap.trim_start_matches(SIDE_MARK);
            let src = mocap.replace(SIDE_MARK, "Left");
            let dst = target.replace(SIDE_MARK, "l");
            rename_first(armature, &[stem, &format!("{stem}.L"), &src], &dst);
            let src = mocap.replace(SIDE_MARK, "Right");
            let dst = target.replace(SIDE_MARK, "r");
            rename_first(armature, &[stem, &format!("{stem}.R"), &src], &dst);
        } else {
            rename_first(armature, &[mocap], target);
        }
    }
}

/// Rename an armature's bones from target names back to mocap-vendor names.
///
/// No namespace stripping here: target-style names embed `_l`/`_01`
/// suffixes that the separator scan would eat.
pub fn rename_to_source(armature: &mut Armature) {
    for (mocap, target) in BONE_MAP {
        if target.contains(SIDE_MARK) {
            let src = target.replace(SIDE_MARK, "l");
            let dst = mocap.replace(SIDE_MARK, "Left");
            rename_first(armature, &[&src], &dst);
            let src = target.replace(SIDE_MARK, "r");
            let dst = mocap.replace(SIDE_MARK, "Right");
            rename_first(armature, &[&src], &dst);
        } else {
            rename_first(armature, &[target], mocap);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::skeleton::{Bone, Skeleton};
    use crate::transform::Transform;

    fn armature_with_bones(names: &[&str]) -> Armature {
        let bones = names
            .iter()
            .map(|n| Bone::new(*n, None, Transform::IDENTITY))
            .collect();
        Armature::new("Armature", Skeleton::from_bones(bones).unwrap())
    }

    #[test]
    fn test_strip_namespace() {
        assert_eq!(strip_namespace("mixamorig:Hips"), "Hips");
        assert_eq!(strip_namespace("mixamorig_Hips"), "Hips");
        assert_eq!(strip_namespace("NoNamespace"), "NoNamespace");
    }

    #[test]
    fn test_strip_namespace_idempotent() {
        for name in ["mixamorig:Hips", "a_b_c", "Hips", ""] {
            let once = strip_namespace(name);
            assert_eq!(strip_namespace(once), once);
        }
    }

    #[test]
    fn test_literal_rename() {
        let mut armature = armature_with_bones(&["Hips", "Spine", "Head"]);
        rename_to_target(&mut armature);
        assert!(armature.skeleton.index_of("pelvis").is_some());
        assert!(armature.skeleton.index_of("spine_01").is_some());
        assert!(armature.skeleton.index_of("head").is_some());
        assert!(armature.skeleton.index_of("Hips").is_none());
    }

    #[test]
    fn test_lateral_word_marker() {
        let mut armature = armature_with_bones(&["LeftArm", "RightArm"]);
        rename_to_target(&mut armature);
        assert!(armature.skeleton.index_of("upperarm_l").is_some());
        assert!(armature.skeleton.index_of("upperarm_r").is_some());
    }

    #[test]
    fn test_lateral_suffix_marker() {
        let mut armature = armature_with_bones(&["Arm.L", "Arm.R"]);
        rename_to_target(&mut armature);
        assert!(armature.skeleton.index_of("upperarm_l").is_some());
        assert!(armature.skeleton.index_of("upperarm_r").is_some());
    }

    #[test]
    fn test_namespaced_lateral_bone() {
        let mut armature = armature_with_bones(&["mixamorig:LeftForeArm"]);
        rename_to_target(&mut armature);
        assert!(armature.skeleton.index_of("lowerarm_l").is_some());
    }

    #[test]
    fn test_first_candidate_present_wins() {
        // the bare stem outranks the explicit left spelling
        let mut armature = armature_with_bones(&["Arm", "LeftArm"]);
        rename_to_target(&mut armature);
        assert_eq!(armature.skeleton.bone(0).name, "upperarm_l");
        assert_eq!(armature.skeleton.bone(1).name, "LeftArm");
    }

    #[test]
    fn test_unmatched_candidates_skipped() {
        let mut armature = armature_with_bones(&["SomethingElse"]);
        rename_to_target(&mut armature);
        assert!(armature.skeleton.index_of("SomethingElse").is_some());
    }

    #[test]
    fn test_literal_roundtrip() {
        for (src, _dst) in BONE_MAP {
            if src.contains('~') {
                continue;
            }
            let mut armature = armature_with_bones(&[src]);
            rename_to_target(&mut armature);
            rename_to_source(&mut armature);
            // Neck1 and Neck both map to neck_01; the reverse direction
            // restores the first table entry, which normalizes to a valid
            // source spelling.
            let restored = &armature.skeleton.bone(0).name;
            let normalized = strip_namespace(restored);
            assert!(
                BONE_MAP.iter().any(|(s, _)| s.trim_start_matches('~') == normalized
                    || *s == normalized),
                "round-trip of {src} produced {restored}"
            );
        }
    }
}
