//! Actions and f-curves: keyframed animation channels.
//!
//! An [`Action`] is a named bundle of [`FCurve`]s. A curve is addressed by
//! (channel target, property, component index) and holds keyframes sorted by
//! frame. Evaluation is linear between keys and constant outside the keyed
//! span; quaternion rotation is stored as four scalar curves with component
//! order [x, y, z, w].

/// Keyframe interpolation mode towards the next key.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Interpolation {
    /// Hold the value until the next key.
    Constant,
    #[default]
    Linear,
}

/// One keyframe point: (frame, value, interpolation).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Keyframe {
    pub frame: f32,
    pub value: f32,
    pub interpolation: Interpolation,
}

/// What a curve animates: the armature object itself, or one pose bone.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum ChannelTarget {
    Object,
    Bone(String),
}

/// Which transform property a curve animates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ChannelProperty {
    /// Local translation, components 0..=2.
    Location,
    /// Local rotation quaternion, components 0..=3 as [x, y, z, w].
    RotationQuaternion,
}

/// One scalar animated channel.
#[derive(Clone, Debug)]
pub struct FCurve {
    pub target: ChannelTarget,
    pub property: ChannelProperty,
    pub index: usize,
    keyframes: Vec<Keyframe>,
}

impl FCurve {
    pub fn new(target: ChannelTarget, property: ChannelProperty, index: usize) -> Self {
        Self {
            target,
            property,
            index,
            keyframes: Vec::new(),
        }
    }

    pub fn keyframes(&self) -> &[Keyframe] {
        &self.keyframes
    }

    /// Insert a keyframe, replacing any existing key at the same frame.
    pub fn insert(&mut self, frame: f32, value: f32, interpolation: Interpolation) {
        let key = Keyframe {
            frame,
            value,
            interpolation,
        };
        match self
            .keyframes
            .binary_search_by(|k| k.frame.total_cmp(&frame))
        {
            Ok(i) => self.keyframes[i] = key,
            Err(i) => self.keyframes.insert(i, key),
        }
    }

    /// Overwrite the value of an existing key, keeping its interpolation.
    /// Returns false when no key exists at the frame.
    pub fn set_value(&mut self, frame: f32, value: f32) -> bool {
        match self
            .keyframes
            .binary_search_by(|k| k.frame.total_cmp(&frame))
        {
            Ok(i) => {
                self.keyframes[i].value = value;
                true
            }
            Err(_) => false,
        }
    }

    pub fn has_key_at(&self, frame: f32) -> bool {
        self.keyframes
            .binary_search_by(|k| k.frame.total_cmp(&frame))
            .is_ok()
    }

    pub fn value_at(&self, frame: f32) -> Option<f32> {
        self.keyframes
            .binary_search_by(|k| k.frame.total_cmp(&frame))
            .ok()
            .map(|i| self.keyframes[i].value)
    }

    /// Evaluate the curve at an arbitrary frame.
    ///
    /// Linear between keys (constant when the left key says so), constant
    /// extrapolation outside the keyed span. Returns 0.0 for an empty curve.
    pub fn evaluate(&self, frame: f32) -> f32 {
        if self.keyframes.is_empty() {
            return 0.0;
        }
        let i = match self
            .keyframes
            .binary_search_by(|k| k.frame.total_cmp(&frame))
        {
            Ok(i) => return self.keyframes[i].value,
            Err(i) => i,
        };
        if i == 0 {
            return self.keyframes[0].value;
        }
        if i == self.keyframes.len() {
            return self.keyframes[i - 1].value;
        }
        let left = self.keyframes[i - 1];
        let right = self.keyframes[i];
        match left.interpolation {
            Interpolation::Constant => left.value,
            Interpolation::Linear => {
                let span = right.frame - left.frame;
                if span <= 0.0 {
                    return left.value;
                }
                let t = (frame - left.frame) / span;
                left.value + (right.value - left.value) * t
            }
        }
    }

    /// First and last keyed frame, when any key exists.
    pub fn frame_range(&self) -> Option<(f32, f32)> {
        match (self.keyframes.first(), self.keyframes.last()) {
            (Some(first), Some(last)) => Some((first.frame, last.frame)),
            _ => None,
        }
    }

    /// Replace the whole keyframe list (must stay sorted by frame).
    pub(crate) fn replace_keyframes(&mut self, keyframes: Vec<Keyframe>) {
        debug_assert!(keyframes.windows(2).all(|w| w[0].frame < w[1].frame));
        self.keyframes = keyframes;
    }
}

/// Named container of f-curves.
#[derive(Clone, Debug, Default)]
pub struct Action {
    pub name: String,
    curves: Vec<FCurve>,
}

impl Action {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            curves: Vec::new(),
        }
    }

    pub fn curves(&self) -> &[FCurve] {
        &self.curves
    }

    pub fn curves_mut(&mut self) -> &mut [FCurve] {
        &mut self.curves
    }

    pub fn find(
        &self,
        target: &ChannelTarget,
        property: ChannelProperty,
        index: usize,
    ) -> Option<&FCurve> {
        self.curves
            .iter()
            .find(|c| c.property == property && c.index == index && &c.target == target)
    }

    pub fn find_mut(
        &mut self,
        target: &ChannelTarget,
        property: ChannelProperty,
        index: usize,
    ) -> Option<&mut FCurve> {
        self.curves
            .iter_mut()
            .find(|c| c.property == property && c.index == index && &c.target == target)
    }

    /// Fetch a curve, creating it when absent.
    pub fn curve_ensure(
        &mut self,
        target: &ChannelTarget,
        property: ChannelProperty,
        index: usize,
    ) -> &mut FCurve {
        let pos = self
            .curves
            .iter()
            .position(|c| c.property == property && c.index == index && &c.target == target);
        match pos {
            Some(i) => &mut self.curves[i],
            None => {
                self.curves
                    .push(FCurve::new(target.clone(), property, index));
                self.curves.last_mut().unwrap()
            }
        }
    }

    /// Repoint every curve addressing bone `old` at bone `new`. Called when
    /// a bone is renamed so curves keep following it.
    pub fn rename_bone_target(&mut self, old: &str, new: &str) {
        for curve in &mut self.curves {
            if matches!(&curve.target, ChannelTarget::Bone(name) if name == old) {
                curve.target = ChannelTarget::Bone(new.to_string());
            }
        }
    }

    /// Union frame extent over all curves.
    pub fn frame_range(&self) -> Option<(f32, f32)> {
        let mut range: Option<(f32, f32)> = None;
        for curve in &self.curves {
            if let Some((start, end)) = curve.frame_range() {
                range = Some(match range {
                    Some((s, e)) => (s.min(start), e.max(end)),
                    None => (start, end),
                });
            }
        }
        range
    }

    /// Channel targets that carry a complete quaternion rotation track
    /// (all four component curves present), in first-seen curve order.
    pub fn quaternion_targets(&self) -> Vec<ChannelTarget> {
        let mut targets = Vec::new();
        for curve in &self.curves {
            if curve.property != ChannelProperty::RotationQuaternion {
                continue;
            }
            if targets.contains(&curve.target) {
                continue;
            }
            if (0..4).all(|i| {
                self.find(&curve.target, ChannelProperty::RotationQuaternion, i)
                    .is_some()
            }) {
                targets.push(curve.target.clone());
            }
        }
        targets
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_keeps_sorted_and_replaces() {
        let mut curve = FCurve::new(ChannelTarget::Object, ChannelProperty::Location, 0);
        curve.insert(10.0, 1.0, Interpolation::Linear);
        curve.insert(1.0, 0.0, Interpolation::Linear);
        curve.insert(5.0, 0.5, Interpolation::Linear);
        let frames: Vec<f32> = curve.keyframes().iter().map(|k| k.frame).collect();
        assert_eq!(frames, vec![1.0, 5.0, 10.0]);

        curve.insert(5.0, 2.0, Interpolation::Linear);
        assert_eq!(curve.keyframes().len(), 3);
        assert_eq!(curve.value_at(5.0), Some(2.0));
    }

    #[test]
    fn test_evaluate_linear_and_extrapolation() {
        let mut curve = FCurve::new(ChannelTarget::Object, ChannelProperty::Location, 0);
        curve.insert(0.0, 0.0, Interpolation::Linear);
        curve.insert(10.0, 10.0, Interpolation::Linear);
        assert_eq!(curve.evaluate(5.0), 5.0);
        assert_eq!(curve.evaluate(-3.0), 0.0);
        assert_eq!(curve.evaluate(20.0), 10.0);
    }

    #[test]
    fn test_evaluate_constant_segment() {
        let mut curve = FCurve::new(ChannelTarget::Object, ChannelProperty::Location, 0);
        curve.insert(0.0, 1.0, Interpolation::Constant);
        curve.insert(10.0, 2.0, Interpolation::Linear);
        assert_eq!(curve.evaluate(9.0), 1.0);
    }

    #[test]
    fn test_action_frame_range_is_union() {
        let mut action = Action::new("clip");
        let bone = ChannelTarget::Bone("pelvis".into());
        action
            .curve_ensure(&bone, ChannelProperty::Location, 0)
            .insert(2.0, 0.0, Interpolation::Linear);
        action
            .curve_ensure(&bone, ChannelProperty::Location, 1)
            .insert(8.0, 0.0, Interpolation::Linear);
        assert_eq!(action.frame_range(), Some((2.0, 8.0)));
    }

    #[test]
    fn test_quaternion_targets_requires_all_components() {
        let mut action = Action::new("clip");
        let full = ChannelTarget::Bone("pelvis".into());
        let partial = ChannelTarget::Bone("spine_01".into());
        for i in 0..4 {
            action
                .curve_ensure(&full, ChannelProperty::RotationQuaternion, i)
                .insert(0.0, if i == 3 { 1.0 } else { 0.0 }, Interpolation::Linear);
        }
        action
            .curve_ensure(&partial, ChannelProperty::RotationQuaternion, 0)
            .insert(0.0, 0.0, Interpolation::Linear);
        assert_eq!(action.quaternion_targets(), vec![full]);
    }
}
