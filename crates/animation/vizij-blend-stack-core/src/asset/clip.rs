//! Keyframed clip: the built-in [`SequenceAsset`].

use serde::{Deserialize, Serialize};

use super::SequenceAsset;
use crate::blend::{lerp_f32, lerp_vec3, nlerp_quat};
use crate::pose::{BoneTransform, PoseContext};
use crate::skeleton::EvalContext;

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct BoneKey {
    pub time: f32,
    pub transform: BoneTransform,
}

/// Keys for one bone, addressed by skeleton bone name. Keys are sorted by time.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BoneTrack {
    pub bone: String,
    pub keys: Vec<BoneKey>,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CurveKey {
    pub time: f32,
    pub value: f32,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CurveTrack {
    pub name: String,
    pub keys: Vec<CurveKey>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Clip {
    pub name: String,
    /// Seconds.
    pub duration: f32,
    /// Montage-style clips cannot be played by a blend-stack sample.
    #[serde(default)]
    pub montage: bool,
    #[serde(default)]
    pub bone_tracks: Vec<BoneTrack>,
    #[serde(default)]
    pub curve_tracks: Vec<CurveTrack>,
}

impl Clip {
    pub fn empty(name: &str, duration: f32) -> Self {
        Self {
            name: name.to_string(),
            duration,
            montage: false,
            bone_tracks: Vec::new(),
            curve_tracks: Vec::new(),
        }
    }

    /// Clip holding one constant transform per listed bone.
    pub fn constant(name: &str, duration: f32, bones: &[(&str, BoneTransform)]) -> Self {
        let bone_tracks = bones
            .iter()
            .map(|(bone, transform)| BoneTrack {
                bone: bone.to_string(),
                keys: vec![BoneKey {
                    time: 0.0,
                    transform: *transform,
                }],
            })
            .collect();
        Self {
            bone_tracks,
            ..Self::empty(name, duration)
        }
    }

    pub fn with_curve(mut self, name: &str, keys: &[(f32, f32)]) -> Self {
        self.curve_tracks.push(CurveTrack {
            name: name.to_string(),
            keys: keys
                .iter()
                .map(|&(time, value)| CurveKey { time, value })
                .collect(),
        });
        self
    }
}

/// Segment around `time` in time-sorted keys: (left, right, local fraction).
fn locate<K>(keys: &[K], time_of: impl Fn(&K) -> f32, time: f32) -> (usize, usize, f32) {
    let upper = keys.partition_point(|k| time_of(k) <= time);
    if upper == 0 {
        return (0, 0, 0.0);
    }
    if upper >= keys.len() {
        let last = keys.len() - 1;
        return (last, last, 0.0);
    }
    let t0 = time_of(&keys[upper - 1]);
    let t1 = time_of(&keys[upper]);
    let span = t1 - t0;
    let u = if span > 0.0 { (time - t0) / span } else { 0.0 };
    (upper - 1, upper, u)
}

fn sample_bone_keys(keys: &[BoneKey], time: f32) -> Option<BoneTransform> {
    if keys.is_empty() {
        return None;
    }
    let (i0, i1, u) = locate(keys, |k| k.time, time);
    let (a, b) = (&keys[i0].transform, &keys[i1].transform);
    Some(BoneTransform {
        translation: lerp_vec3(a.translation, b.translation, u),
        rotation: nlerp_quat(a.rotation, b.rotation, u),
        scale: lerp_vec3(a.scale, b.scale, u),
    })
}

fn sample_curve_keys(keys: &[CurveKey], time: f32) -> Option<f32> {
    if keys.is_empty() {
        return None;
    }
    let (i0, i1, u) = locate(keys, |k| k.time, time);
    Some(lerp_f32(keys[i0].value, keys[i1].value, u))
}

impl SequenceAsset for Clip {
    fn name(&self) -> &str {
        &self.name
    }

    fn length(&self) -> f32 {
        self.duration
    }

    fn sample(&self, time: f32, ctx: &EvalContext, out: &mut PoseContext) {
        out.reset_to_ref_pose(ctx);
        let time = time.clamp(0.0, self.duration.max(0.0));
        for track in &self.bone_tracks {
            let Some(compact) = ctx
                .skeleton
                .bone_index(&track.bone)
                .and_then(|skel| ctx.bones.compact_index(skel))
            else {
                continue;
            };
            if let Some(transform) = sample_bone_keys(&track.keys, time) {
                out.pose.bones[compact] = transform;
            }
        }
        for track in &self.curve_tracks {
            if let Some(value) = sample_curve_keys(&track.keys, time) {
                out.curves.set(&track.name, value);
            }
        }
    }
}
