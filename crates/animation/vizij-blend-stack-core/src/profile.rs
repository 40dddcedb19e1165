//! Blend profiles: per-bone blend-in durations.
//!
//! Entries are authored against skeleton bones and inherited down the hierarchy, so a
//! single entry on the spine also covers every bone below it.

use serde::{Deserialize, Serialize};

use crate::error::{BlendStackError, Result};
use crate::skeleton::Skeleton;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum BlendProfileMode {
    /// duration = blend_time * scale
    #[default]
    TimeFactor,
    /// duration = blend_time / scale; scales at or below zero blend instantly.
    WeightFactor,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct BlendProfileEntry {
    /// Skeleton bone index.
    pub bone: usize,
    pub scale: f32,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct BlendProfile {
    pub name: String,
    #[serde(default)]
    pub mode: BlendProfileMode,
    #[serde(default)]
    pub entries: Vec<BlendProfileEntry>,
}

impl BlendProfile {
    pub fn new(name: &str, mode: BlendProfileMode) -> Self {
        Self {
            name: name.to_string(),
            mode,
            entries: Vec::new(),
        }
    }

    /// Profile keyed by bone name. Names missing from `skeleton` are logged and skipped.
    pub fn from_names(
        name: &str,
        mode: BlendProfileMode,
        skeleton: &Skeleton,
        scales: &[(&str, f32)],
    ) -> Self {
        let mut profile = Self::new(name, mode);
        for (bone, scale) in scales {
            match skeleton.bone_index(bone) {
                Some(bone) => profile.entries.push(BlendProfileEntry { bone, scale: *scale }),
                None => log::warn!("blend profile '{name}': unknown bone '{bone}'"),
            }
        }
        profile
    }

    fn duration(&self, blend_time: f32, scale: f32) -> f32 {
        match self.mode {
            BlendProfileMode::TimeFactor => blend_time * scale.max(0.0),
            BlendProfileMode::WeightFactor => {
                if scale > 0.0 {
                    blend_time / scale
                } else {
                    0.0
                }
            }
        }
    }

    /// One blend-in duration per skeleton bone.
    ///
    /// Bones without an entry inherit their parent's scale; roots without one use a
    /// scale of 1.
    pub fn per_bone_durations(&self, blend_time: f32, skeleton: &Skeleton) -> Result<Vec<f32>> {
        let bone_count = skeleton.num_bones();
        let mut scales: Vec<Option<f32>> = vec![None; bone_count];
        for entry in &self.entries {
            let slot = scales
                .get_mut(entry.bone)
                .ok_or(BlendStackError::InvalidBlendProfile {
                    bone: entry.bone,
                    bone_count,
                })?;
            *slot = Some(entry.scale);
        }

        // Parents precede children, so one forward pass resolves inheritance.
        let mut resolved = vec![1.0f32; bone_count];
        for bone in 0..bone_count {
            resolved[bone] = match (scales[bone], skeleton.parent(bone)) {
                (Some(scale), _) => scale,
                (None, Some(parent)) => resolved[parent],
                (None, None) => 1.0,
            };
        }
        Ok(resolved
            .into_iter()
            .map(|scale| self.duration(blend_time, scale))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pose::BoneTransform;
    use crate::skeleton::SkeletonBone;

    fn skeleton() -> Skeleton {
        let bones = ["root", "spine", "head", "leg"]
            .iter()
            .zip([None, Some(0), Some(1), Some(0)])
            .map(|(name, parent)| SkeletonBone {
                name: name.to_string(),
                parent,
                ref_pose: BoneTransform::IDENTITY,
            })
            .collect();
        Skeleton::new("s", bones)
    }

    #[test]
    fn children_inherit_parent_scale() {
        let skel = skeleton();
        let profile = BlendProfile::from_names(
            "upper",
            BlendProfileMode::TimeFactor,
            &skel,
            &[("root", 0.5), ("spine", 2.0)],
        );
        let d = profile.per_bone_durations(1.0, &skel).unwrap();
        assert_eq!(d, vec![0.5, 2.0, 2.0, 0.5]);
    }

    #[test]
    fn weight_factor_divides() {
        let skel = skeleton();
        let profile = BlendProfile::from_names(
            "w",
            BlendProfileMode::WeightFactor,
            &skel,
            &[("root", 2.0), ("leg", 0.0)],
        );
        let d = profile.per_bone_durations(1.0, &skel).unwrap();
        assert_eq!(d, vec![0.5, 0.5, 0.5, 0.0]);
    }

    #[test]
    fn out_of_range_entry_is_rejected() {
        let skel = skeleton();
        let mut profile = BlendProfile::new("bad", BlendProfileMode::TimeFactor);
        profile.entries.push(BlendProfileEntry { bone: 9, scale: 1.0 });
        assert_eq!(
            profile.per_bone_durations(1.0, &skel),
            Err(BlendStackError::InvalidBlendProfile {
                bone: 9,
                bone_count: 4
            })
        );
    }
}
