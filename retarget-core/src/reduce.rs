//! Keyframe reduction after baking.
//!
//! Baking writes one key per integer frame; most of them are redundant.
//! This pass drops interior keys whose value sits on the linear ramp
//! between their kept neighbors, within a tolerance. Curves with a single
//! key are left alone (decimating one point is meaningless).

use crate::action::{Action, FCurve, Keyframe};

/// Default decimation tolerance, in curve value units.
pub const CLEAN_THRESHOLD: f32 = 0.001;

/// Reduce every curve of an action with the default tolerance.
pub fn simplify(action: &mut Action) {
    simplify_with_threshold(action, CLEAN_THRESHOLD);
}

/// Reduce every curve of an action, dropping keys that deviate from the
/// surrounding linear ramp by at most `threshold`.
pub fn simplify_with_threshold(action: &mut Action, threshold: f32) {
    let mut removed = 0usize;
    let mut total = 0usize;
    for curve in action.curves_mut() {
        total += curve.keyframes().len();
        if curve.keyframes().len() > 1 {
            removed += clean_curve(curve, threshold);
        }
    }
    tracing::debug!(action = %action.name, removed, total, "keyframes reduced");
}

/// Single pass over interior keys; endpoints are always kept. Returns the
/// number of removed keys.
fn clean_curve(curve: &mut FCurve, threshold: f32) -> usize {
    let keys = curve.keyframes();
    let before = keys.len();
    let mut kept: Vec<Keyframe> = Vec::with_capacity(before);
    kept.push(keys[0]);
    for i in 1..before - 1 {
        let prev = *kept.last().expect("seeded with the first key");
        let next = keys[i + 1];
        let span = next.frame - prev.frame;
        let t = (keys[i].frame - prev.frame) / span;
        let ramp = prev.value + (next.value - prev.value) * t;
        if (keys[i].value - ramp).abs() > threshold {
            kept.push(keys[i]);
        }
    }
    if before > 1 {
        kept.push(keys[before - 1]);
    }
    let after = kept.len();
    curve.replace_keyframes(kept);
    before - after
}
