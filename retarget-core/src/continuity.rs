//! Quaternion continuity repair for baked rotation curves.
//!
//! A rigid rotation has two quaternion spellings (q and -q) that look
//! identical but interpolate through garbage when adjacent samples disagree
//! on the sign, and naive per-channel baking can also alias a pose by a
//! near-180° axis flip. This pass densifies every quaternion track to one
//! key per integer frame and walks consecutive frames fixing both artifacts
//! in place.

use std::f32::consts::PI;

use glam::Quat;

use crate::action::{Action, ChannelProperty, ChannelTarget, Interpolation};

/// Flip detection window: a frame-to-frame rotation difference whose angle
/// lands within this many radians of π is treated as an axis-flip artifact.
/// Empirically tuned for baked mocap noise, not an exact detector.
pub const FLIP_WINDOW: f32 = 0.5;

/// Invert detection threshold: when the summed absolute component delta
/// between two consecutive keys exceeds this, the pair is judged a pure
/// sign inversion rather than a real rotation change.
pub const INVERT_THRESHOLD: f32 = 1.0;

/// Repair sign flips and 180°-aliasing in every quaternion rotation track
/// of `action` (the object channel and every bone carrying all four
/// component curves).
pub fn quaternion_cleanup(action: &mut Action, prevent_flips: bool, prevent_inverts: bool) {
    for target in action.quaternion_targets() {
        cleanup_track(action, &target, prevent_flips, prevent_inverts);
    }
}

fn cleanup_track(
    action: &mut Action,
    target: &ChannelTarget,
    prevent_flips: bool,
    prevent_inverts: bool,
) {
    // Union of the four component curves' keyed spans, as integer frames.
    let mut start = i32::MAX;
    let mut end = i32::MIN;
    for i in 0..4 {
        if let Some((s, e)) = action
            .find(target, ChannelProperty::RotationQuaternion, i)
            .and_then(|c| c.frame_range())
        {
            start = start.min(s.floor() as i32);
            end = end.max(e.ceil() as i32);
        }
    }
    if start >= end {
        return;
    }

    // Densify: one key per integer frame on all four curves, sampled from
    // the curve's current value, so frame-to-frame quaternion comparisons
    // are well defined.
    for i in 0..4 {
        let curve = action
            .find_mut(target, ChannelProperty::RotationQuaternion, i)
            .expect("quaternion_targets guarantees all four curves");
        for frame in start..=end {
            let f = frame as f32;
            if !curve.has_key_at(f) {
                let value = curve.evaluate(f);
                curve.insert(f, value, Interpolation::Linear);
            }
        }
    }

    for frame in (start + 1)..=end {
        let prev = track_values(action, target, (frame - 1) as f32);
        let cur = track_values(action, target, frame as f32);
        let mut fixed = cur;

        if prevent_flips {
            let rot_prev = Quat::from_xyzw(prev[0], prev[1], prev[2], prev[3]);
            let rot_cur = Quat::from_xyzw(fixed[0], fixed[1], fixed[2], fixed[3]);
            let diff = (rot_prev.conjugate() * rot_cur).normalize();
            let (axis, angle) = diff.to_axis_angle();
            if (angle - PI).abs() < FLIP_WINDOW {
                let corrected = Quat::from_axis_angle(axis, PI) * rot_cur;
                fixed = [corrected.x, corrected.y, corrected.z, corrected.w];
            }
        }

        if prevent_inverts {
            let change: f32 = (0..4).map(|j| (prev[j] - fixed[j]).abs()).sum();
            if change > INVERT_THRESHOLD {
                for value in &mut fixed {
                    *value = -*value;
                }
            }
        }

        if fixed != cur {
            for (i, value) in fixed.into_iter().enumerate() {
                action
                    .find_mut(target, ChannelProperty::RotationQuaternion, i)
                    .expect("densified curve")
                    .set_value(frame as f32, value);
            }
        }
    }
}

/// The four stored component values of a quaternion track at a keyed frame.
fn track_values(action: &Action, target: &ChannelTarget, frame: f32) -> [f32; 4] {
    let mut values = [0.0; 4];
    for (i, value) in values.iter_mut().enumerate() {
        *value = action
            .find(target, ChannelProperty::RotationQuaternion, i)
            .and_then(|c| c.value_at(frame))
            .unwrap_or_default();
    }
    values
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;
    use std::f32::consts::FRAC_PI_4;

    fn track_with(keys: &[(f32, Quat)]) -> Action {
        let mut action = Action::new("clip");
        let target = ChannelTarget::Bone("pelvis".into());
        for (frame, q) in keys {
            for (i, v) in [q.x, q.y, q.z, q.w].into_iter().enumerate() {
                action
                    .curve_ensure(&target, ChannelProperty::RotationQuaternion, i)
                    .insert(*frame, v, Interpolation::Linear);
            }
        }
        action
    }

    fn quat_at(action: &Action, frame: f32) -> Quat {
        let v = track_values(action, &ChannelTarget::Bone("pelvis".into()), frame);
        Quat::from_xyzw(v[0], v[1], v[2], v[3])
    }

    #[test]
    fn test_pure_inversion_removed() {
        let q = Quat::from_rotation_z(FRAC_PI_4);
        let mut action = track_with(&[(0.0, q), (1.0, -q)]);
        quaternion_cleanup(&mut action, false, true);
        let repaired = quat_at(&action, 1.0);
        assert!(repaired.dot(q) > 1.0 - 1e-5, "inversion survived: {repaired:?}");
    }

    #[test]
    fn test_axis_flip_brought_back_under_window() {
        // Same physical pose family, ~180° apart in axis-angle difference.
        let q0 = Quat::from_rotation_z(0.1);
        let q1 = Quat::from_axis_angle(Vec3::Z, 0.2) * Quat::from_axis_angle(Vec3::X, PI - 0.1);
        let before = ((q0.conjugate() * q1).normalize().to_axis_angle().1 - PI).abs();
        assert!(before < FLIP_WINDOW, "fixture must sit inside the window");

        let mut action = track_with(&[(0.0, q0), (1.0, q1)]);
        quaternion_cleanup(&mut action, true, true);
        let repaired = quat_at(&action, 1.0).normalize();
        let after = (q0.conjugate() * repaired).normalize().to_axis_angle().1;
        let after = after.min(2.0 * PI - after);
        assert!(
            after < PI - FLIP_WINDOW,
            "discontinuity not reduced: {after}"
        );
    }

    #[test]
    fn test_densify_cosamples_all_components() {
        // all components keyed at the span ends, one keyed mid-span too
        let q = Quat::IDENTITY;
        let mut action = track_with(&[(0.0, q), (4.0, q)]);
        let target = ChannelTarget::Bone("pelvis".into());
        action
            .curve_ensure(&target, ChannelProperty::RotationQuaternion, 0)
            .insert(2.0, 0.0, Interpolation::Linear);
        quaternion_cleanup(&mut action, true, true);
        for i in 0..4 {
            let curve = action
                .find(&target, ChannelProperty::RotationQuaternion, i)
                .unwrap();
            assert_eq!(curve.keyframes().len(), 5, "component {i} not densified");
        }
    }

    #[test]
    fn test_continuous_track_untouched() {
        let keys: Vec<(f32, Quat)> = (0..5)
            .map(|f| (f as f32, Quat::from_rotation_z(0.05 * f as f32)))
            .collect();
        let mut action = track_with(&keys);
        quaternion_cleanup(&mut action, true, true);
        for (frame, q) in &keys {
            assert!(quat_at(&action, *frame).dot(*q) > 1.0 - 1e-5);
        }
    }
}
