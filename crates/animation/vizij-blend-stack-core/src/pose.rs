//! Pose data: bone transforms, named curves, and custom attributes.
//!
//! A [`Pose`] is always laid out in compact (LOD-filtered) order as described by the
//! [`BoneContainer`](crate::skeleton::BoneContainer) it was evaluated against.

use hashbrown::HashMap;
use serde::{Deserialize, Serialize};

use crate::skeleton::EvalContext;

pub const IDENTITY_ROTATION: [f32; 4] = [0.0, 0.0, 0.0, 1.0];

/// Local bone transform. Rotation is a quaternion stored as (x, y, z, w).
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct BoneTransform {
    pub translation: [f32; 3],
    pub rotation: [f32; 4],
    pub scale: [f32; 3],
}

impl Default for BoneTransform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl BoneTransform {
    pub const IDENTITY: BoneTransform = BoneTransform {
        translation: [0.0; 3],
        rotation: IDENTITY_ROTATION,
        scale: [1.0; 3],
    };

    pub fn from_translation(translation: [f32; 3]) -> Self {
        Self {
            translation,
            ..Self::IDENTITY
        }
    }

    pub fn from_rotation(rotation: [f32; 4]) -> Self {
        Self {
            rotation,
            ..Self::IDENTITY
        }
    }
}

/// Bone transforms in compact-pose order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Pose {
    pub bones: Vec<BoneTransform>,
}

impl Pose {
    #[inline]
    pub fn len(&self) -> usize {
        self.bones.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bones.is_empty()
    }
}

/// Named float curves (morph targets, material parameters, gameplay markers...).
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CurveSet {
    values: HashMap<String, f32>,
}

impl CurveSet {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn get(&self, name: &str) -> Option<f32> {
        self.values.get(name).copied()
    }

    pub fn set(&mut self, name: &str, value: f32) {
        if let Some(v) = self.values.get_mut(name) {
            *v = value;
        } else {
            self.values.insert(name.to_string(), value);
        }
    }

    pub fn remove(&mut self, name: &str) -> Option<f32> {
        self.values.remove(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f32)> {
        self.values.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = (&String, &mut f32)> {
        self.values.iter_mut()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn clear(&mut self) {
        self.values.clear();
    }

    /// Union: values in `other` overwrite values here, everything else is kept.
    pub fn merge_from(&mut self, other: &CurveSet) {
        for (name, value) in other.iter() {
            self.set(name, value);
        }
    }
}

/// Custom attribute payload. Floats blend; ints and text step.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum AttributeValue {
    Float(f32),
    Int(i32),
    Text(String),
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct AttributeSet {
    values: HashMap<String, AttributeValue>,
}

impl AttributeSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&AttributeValue> {
        self.values.get(name)
    }

    pub fn set(&mut self, name: &str, value: AttributeValue) {
        self.values.insert(name.to_string(), value);
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &AttributeValue)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub(crate) fn retain(&mut self, f: impl FnMut(&String, &mut AttributeValue) -> bool) {
        self.values.retain(f);
    }

    pub(crate) fn get_mut(&mut self, name: &str) -> Option<&mut AttributeValue> {
        self.values.get_mut(name)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn clear(&mut self) {
        self.values.clear();
    }
}

/// Everything one evaluation produces: bones, curves and attributes.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PoseContext {
    pub pose: Pose,
    pub curves: CurveSet,
    pub attributes: AttributeSet,
}

impl PoseContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-size for `bones` compact bones.
    pub fn with_capacity(bones: usize) -> Self {
        Self {
            pose: Pose {
                bones: Vec::with_capacity(bones),
            },
            ..Self::default()
        }
    }

    /// Reference pose of the context's compact bones; curves and attributes cleared.
    pub fn reset_to_ref_pose(&mut self, ctx: &EvalContext) {
        let bones = &ctx.bones;
        self.pose.bones.clear();
        self.pose.bones.extend(
            (0..bones.num_bones()).map(|compact| ctx.skeleton.ref_pose(bones.skeleton_index(compact))),
        );
        self.curves.clear();
        self.attributes.clear();
    }

    /// Copy another context into this one, reusing allocations.
    pub fn copy_from(&mut self, other: &PoseContext) {
        self.pose.bones.clone_from(&other.pose.bones);
        self.curves.clone_from(&other.curves);
        self.attributes.clone_from(&other.attributes);
    }
}
