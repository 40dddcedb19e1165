//! Left/right mirroring of evaluated poses.
//!
//! A [`MirrorTable`] maps each skeleton bone to its mirror twin (itself for centre-line
//! bones) and names the plane the pose is reflected across. Applying it swaps twin
//! transforms, then reflects every translation and rotation.

use hashbrown::HashMap;
use serde::{Deserialize, Serialize};

use crate::pose::{BoneTransform, PoseContext};
use crate::skeleton::{EvalContext, Skeleton};

/// Axis normal to the mirror plane.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum MirrorAxis {
    #[default]
    X,
    Y,
    Z,
}

impl MirrorAxis {
    #[inline]
    fn index(self) -> usize {
        match self {
            MirrorAxis::X => 0,
            MirrorAxis::Y => 1,
            MirrorAxis::Z => 2,
        }
    }

    /// Reflect a local transform across the plane normal to this axis.
    pub fn reflect(self, t: &BoneTransform) -> BoneTransform {
        let i = self.index();
        let mut out = *t;
        out.translation[i] = -out.translation[i];
        // Reflection keeps the rotation component along the normal and flips the other
        // two imaginary parts.
        for (axis, value) in out.rotation.iter_mut().take(3).enumerate() {
            if axis != i {
                *value = -*value;
            }
        }
        out
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MirrorTable {
    /// Skeleton index -> skeleton index of its twin.
    pub bone_map: Vec<usize>,
    pub axis: MirrorAxis,
    /// Curve name -> curve name of its twin. Stored one-way; both directions are listed.
    #[serde(default)]
    pub curve_pairs: HashMap<String, String>,
}

impl MirrorTable {
    /// Identity table: every bone mirrors onto itself.
    pub fn identity(skeleton: &Skeleton, axis: MirrorAxis) -> Self {
        Self {
            bone_map: (0..skeleton.num_bones()).collect(),
            axis,
            curve_pairs: HashMap::new(),
        }
    }

    /// Build from pairs of bone names. Unknown names are skipped.
    pub fn from_name_pairs(skeleton: &Skeleton, pairs: &[(&str, &str)], axis: MirrorAxis) -> Self {
        let mut table = Self::identity(skeleton, axis);
        for (a, b) in pairs {
            match (skeleton.bone_index(a), skeleton.bone_index(b)) {
                (Some(ia), Some(ib)) => {
                    table.bone_map[ia] = ib;
                    table.bone_map[ib] = ia;
                }
                _ => log::warn!("mirror pair '{a}'/'{b}' not found in skeleton '{}'", skeleton.name),
            }
        }
        table
    }

    /// Pair every bone ending in `left` with the bone ending in `right` of the same stem.
    pub fn from_suffixes(skeleton: &Skeleton, left: &str, right: &str, axis: MirrorAxis) -> Self {
        let mut table = Self::identity(skeleton, axis);
        for (i, bone) in skeleton.bones().iter().enumerate() {
            let Some(stem) = bone.name.strip_suffix(left) else {
                continue;
            };
            if let Some(j) = skeleton.bone_index(&format!("{stem}{right}")) {
                table.bone_map[i] = j;
                table.bone_map[j] = i;
            }
        }
        table
    }

    pub fn with_curve_pair(mut self, a: &str, b: &str) -> Self {
        self.curve_pairs.insert(a.to_string(), b.to_string());
        self.curve_pairs.insert(b.to_string(), a.to_string());
        self
    }

    #[inline]
    pub fn twin(&self, skeleton_index: usize) -> usize {
        self.bone_map
            .get(skeleton_index)
            .copied()
            .unwrap_or(skeleton_index)
    }

    /// Mirror `out` in place. Twins are swapped pairwise, so `bone_map` and
    /// `curve_pairs` must be symmetric (every constructor keeps them that way).
    pub fn apply(&self, ctx: &EvalContext, out: &mut PoseContext) {
        let bones = &mut out.pose.bones;
        for compact in 0..bones.len() {
            let skel = ctx.bones.skeleton_index(compact);
            if let Some(twin) = ctx.bones.compact_index(self.twin(skel)) {
                if twin > compact && twin < bones.len() {
                    bones.swap(compact, twin);
                }
            }
        }
        for bone in bones.iter_mut() {
            *bone = self.axis.reflect(bone);
        }

        for (name, twin) in &self.curve_pairs {
            // Each pair is listed both ways; handle it once.
            if name >= twin {
                continue;
            }
            match (out.curves.get(name), out.curves.get(twin)) {
                (Some(a), Some(b)) => {
                    out.curves.set(name, b);
                    out.curves.set(twin, a);
                }
                (Some(a), None) => {
                    out.curves.remove(name);
                    out.curves.set(twin, a);
                }
                (None, Some(b)) => {
                    out.curves.remove(twin);
                    out.curves.set(name, b);
                }
                (None, None) => {}
            }
        }
    }
}
