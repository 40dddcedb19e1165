//! Playable assets.
//!
//! The stack only distinguishes three kinds: sequential clips, 2D-parametrised blend
//! spaces, and anything else (unsupported, degrades to the reference pose). The first two
//! are capabilities the host implements; [`Clip`] and [`BlendSpace2d`] are the built-in
//! implementations.

pub mod blend_space;
pub mod clip;

use std::fmt;
use std::sync::Arc;

pub use blend_space::{BlendSample, BlendSpace2d};
pub use clip::{BoneKey, BoneTrack, Clip, CurveKey, CurveTrack};

use crate::pose::PoseContext;
use crate::skeleton::EvalContext;

/// A play-head-driven clip: sampled at an absolute time in seconds.
pub trait SequenceAsset: fmt::Debug + Send + Sync {
    fn name(&self) -> &str;
    fn length(&self) -> f32;
    /// Write the pose at `time` into `out` (compact layout of `ctx`).
    fn sample(&self, time: f32, ctx: &EvalContext, out: &mut PoseContext);
}

/// A 2D-parametrised blend of clips, sampled at a normalised time in [0, 1].
pub trait BlendSpaceAsset: fmt::Debug + Send + Sync {
    fn name(&self) -> &str;
    /// Playback length at the given parameters.
    fn length(&self, params: [f32; 2]) -> f32;
    /// Write the pose into `out`; `scratch` is a caller-owned buffer for intermediate
    /// poses so sampling does not allocate per frame.
    fn sample(
        &self,
        normalized_time: f32,
        params: [f32; 2],
        ctx: &EvalContext,
        scratch: &mut PoseContext,
        out: &mut PoseContext,
    );
}

/// Closed set of asset kinds a sample can be asked to play.
#[derive(Clone, Debug)]
pub enum AnimAsset {
    Sequence(Arc<dyn SequenceAsset>),
    BlendSpace(Arc<dyn BlendSpaceAsset>),
    /// Montages and other kinds the stack cannot play.
    Unsupported { name: String },
}

impl AnimAsset {
    pub fn name(&self) -> &str {
        match self {
            AnimAsset::Sequence(a) => a.name(),
            AnimAsset::BlendSpace(a) => a.name(),
            AnimAsset::Unsupported { name } => name,
        }
    }

    /// Identity comparison: same underlying allocation, not structural equality.
    pub fn same_asset(&self, other: &AnimAsset) -> bool {
        match (self, other) {
            (AnimAsset::Sequence(a), AnimAsset::Sequence(b)) => {
                std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b))
            }
            (AnimAsset::BlendSpace(a), AnimAsset::BlendSpace(b)) => {
                std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b))
            }
            (AnimAsset::Unsupported { name: a }, AnimAsset::Unsupported { name: b }) => a == b,
            _ => false,
        }
    }

    /// Advance `time` by `delta` seconds of asset playback.
    ///
    /// Sequences move in seconds; blend spaces move in normalised time scaled by their
    /// length at `params`. Looping wraps, otherwise the result is clamped.
    pub fn advance_time(&self, time: f32, delta: f32, looping: bool, params: [f32; 2]) -> f32 {
        match self {
            AnimAsset::Sequence(a) => advance_sequence_time(time, delta, a.length(), looping),
            AnimAsset::BlendSpace(a) => {
                let length = a.length(params);
                if length <= 0.0 {
                    return time;
                }
                advance_sequence_time(time, delta / length, 1.0, looping)
            }
            AnimAsset::Unsupported { .. } => time,
        }
    }
}

impl From<Arc<Clip>> for AnimAsset {
    fn from(clip: Arc<Clip>) -> Self {
        if clip.montage {
            AnimAsset::Unsupported {
                name: clip.name.clone(),
            }
        } else {
            AnimAsset::Sequence(clip)
        }
    }
}

impl From<Arc<BlendSpace2d>> for AnimAsset {
    fn from(space: Arc<BlendSpace2d>) -> Self {
        AnimAsset::BlendSpace(space)
    }
}

fn fmod(a: f32, b: f32) -> f32 {
    if b == 0.0 {
        return 0.0;
    }
    let m = a % b;
    if (m < 0.0 && b > 0.0) || (m > 0.0 && b < 0.0) {
        m + b
    } else {
        m
    }
}

/// Time after advancing by `delta` within `[0, length]`.
pub fn advance_sequence_time(time: f32, delta: f32, length: f32, looping: bool) -> f32 {
    if length <= 0.0 {
        return 0.0;
    }
    let t = time + delta;
    if looping {
        fmod(t, length)
    } else {
        t.clamp(0.0, length)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn looping_wraps_both_directions() {
        assert!((advance_sequence_time(0.9, 0.3, 1.0, true) - 0.2).abs() < 1e-5);
        assert!((advance_sequence_time(0.1, -0.3, 1.0, true) - 0.8).abs() < 1e-5);
    }

    #[test]
    fn non_looping_clamps() {
        assert_eq!(advance_sequence_time(0.9, 0.3, 1.0, false), 1.0);
        assert_eq!(advance_sequence_time(0.1, -0.3, 1.0, false), 0.0);
    }

    #[test]
    fn montage_clips_are_unsupported() {
        let clip = Arc::new(Clip {
            montage: true,
            ..Clip::empty("attack", 1.0)
        });
        let asset = AnimAsset::from(clip);
        assert!(matches!(asset, AnimAsset::Unsupported { .. }));
        assert_eq!(asset.name(), "attack");
    }

    #[test]
    fn identity_is_by_allocation() {
        let a = Arc::new(Clip::empty("walk", 1.0));
        let b = Arc::new(Clip::empty("walk", 1.0));
        let a1 = AnimAsset::from(a.clone());
        let a2 = AnimAsset::from(a);
        let b1 = AnimAsset::from(b);
        assert!(a1.same_asset(&a2));
        assert!(!a1.same_asset(&b1));
    }
}
