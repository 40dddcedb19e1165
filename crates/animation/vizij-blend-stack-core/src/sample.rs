//! One entry of the blend stack.
//!
//! A [`SamplePlayer`] is either a live play-head over an asset ([`SamplePayload`]) or a
//! frozen pose snapshot ([`StoredPose`]); setting one clears the other. It also owns the
//! blend-in timer that the stack turns into composition weights.

use std::sync::Arc;

use crate::asset::{advance_sequence_time, AnimAsset, BlendSpaceAsset, SequenceAsset};
use crate::curve::BlendOption;
use crate::error::{BlendStackError, Result};
use crate::mirror::MirrorTable;
use crate::pose::{AttributeSet, BoneTransform, CurveSet, PoseContext};
use crate::request::{BlendRequest, SyncParams};
use crate::skeleton::{BoneContainer, EvalContext, Skeleton};
use crate::trace::SampleTrace;

#[derive(Clone, Debug)]
pub struct SequencePlayhead {
    pub asset: Arc<dyn SequenceAsset>,
    /// Seconds.
    pub time: f32,
    pub looping: bool,
    pub play_rate: f32,
    pub sync: Option<SyncParams>,
}

#[derive(Clone, Debug)]
pub struct BlendSpacePlayhead {
    pub asset: Arc<dyn BlendSpaceAsset>,
    /// Normalised to [0, 1].
    pub normalized_time: f32,
    pub looping: bool,
    pub params: [f32; 2],
    pub play_rate: f32,
    pub sync: Option<SyncParams>,
}

#[derive(Clone, Debug, Default)]
pub enum SamplePayload {
    /// The stored pose (if any) is authoritative.
    #[default]
    None,
    Sequence(SequencePlayhead),
    BlendSpace(BlendSpacePlayhead),
}

/// A frozen pose together with the bone container it was captured against.
#[derive(Clone, Debug)]
pub struct StoredPose {
    pub container: Arc<BoneContainer>,
    pub bones: Vec<BoneTransform>,
    pub curves: CurveSet,
    pub attributes: AttributeSet,
}

#[derive(Clone, Debug, Default)]
pub struct SamplePlayer {
    /// Requested asset, kept for identity checks even when it cannot be played.
    asset: Option<AnimAsset>,
    payload: SamplePayload,
    stored: Option<Box<StoredPose>>,
    mirrored: bool,
    mirror_table: Option<Arc<MirrorTable>>,
    total_blend_in_time: f32,
    current_blend_in_time: f32,
    time_to_activation: f32,
    blend_option: BlendOption,
    /// Skeleton-indexed; only allocated when a blend profile was supplied.
    per_bone_durations: Option<Vec<f32>>,
    curve_overrides: CurveSet,
    time_eps: f32,
}

impl SamplePlayer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reset the sample and start playing `req` with the given blend time.
    ///
    /// On error the sample is still usable: it plays whatever could be set up and falls
    /// back to the reference pose otherwise.
    pub fn initialize(
        &mut self,
        req: &BlendRequest,
        blend_time: f32,
        skeleton: &Skeleton,
        time_eps: f32,
    ) -> Result<()> {
        self.payload = SamplePayload::None;
        self.stored = None;
        self.curve_overrides.clear();
        self.asset = req.asset.clone();
        self.mirrored = req.mirrored;
        self.mirror_table = req.mirror_table.clone();
        self.total_blend_in_time = blend_time.max(0.0);
        self.current_blend_in_time = 0.0;
        self.time_to_activation = req.activation_delay.max(0.0);
        self.blend_option = req.blend_option;
        self.per_bone_durations = None;
        self.time_eps = time_eps;

        if skeleton.num_bones() == 0 {
            return Err(BlendStackError::EmptySkeleton);
        }

        match &req.asset {
            None => return Err(BlendStackError::MissingAsset),
            Some(AnimAsset::Unsupported { name }) => {
                return Err(BlendStackError::UnsupportedAsset { name: name.clone() })
            }
            Some(AnimAsset::Sequence(asset)) => {
                self.payload = SamplePayload::Sequence(SequencePlayhead {
                    asset: asset.clone(),
                    time: req.start_time,
                    looping: req.looping,
                    play_rate: req.play_rate,
                    sync: req.sync.clone(),
                });
            }
            Some(AnimAsset::BlendSpace(asset)) => {
                self.payload = SamplePayload::BlendSpace(BlendSpacePlayhead {
                    asset: asset.clone(),
                    normalized_time: req.start_time.clamp(0.0, 1.0),
                    looping: req.looping,
                    params: req.blend_parameters,
                    play_rate: req.play_rate,
                    sync: req.sync.clone(),
                });
            }
        }

        if self.total_blend_in_time > time_eps {
            if let Some(profile) = &req.blend_profile {
                self.per_bone_durations =
                    Some(profile.per_bone_durations(self.total_blend_in_time, skeleton)?);
            }
        }

        if req.mirrored && req.mirror_table.is_none() {
            return Err(BlendStackError::MirrorTableMissing {
                asset: req.asset.as_ref().map(|a| a.name().to_string()).unwrap_or_default(),
            });
        }
        Ok(())
    }

    /// Advance activation countdown, blend-in timer and play-head by `delta_time`.
    ///
    /// Buried samples (`stack_index > 0`) scale their blend timer by
    /// `depth_blend_multiplier^(stack_index + 1)`.
    pub fn update_with_delta_time(
        &mut self,
        delta_time: f32,
        stack_index: usize,
        depth_blend_multiplier: f32,
    ) {
        let mut dt = delta_time;
        if self.time_to_activation > 0.0 {
            self.time_to_activation -= dt;
            if self.time_to_activation > 0.0 {
                return;
            }
            dt = -self.time_to_activation;
            self.time_to_activation = 0.0;
        }

        let scale = if stack_index == 0 {
            1.0
        } else {
            depth_blend_multiplier.powi(stack_index as i32 + 1)
        };
        self.current_blend_in_time += dt * scale;

        match &mut self.payload {
            SamplePayload::None => {}
            SamplePayload::Sequence(p) => {
                p.time = advance_sequence_time(p.time, dt * p.play_rate, p.asset.length(), p.looping);
            }
            SamplePayload::BlendSpace(p) => {
                let length = p.asset.length(p.params);
                if length > 0.0 {
                    p.normalized_time = advance_sequence_time(
                        p.normalized_time,
                        dt * p.play_rate / length,
                        1.0,
                        p.looping,
                    );
                }
            }
        }
    }

    /// Linear blend-in progress in [0, 1].
    pub fn blend_in_percentage(&self) -> f32 {
        if self.total_blend_in_time <= self.time_eps {
            if self.is_active() {
                1.0
            } else {
                0.0
            }
        } else {
            (self.current_blend_in_time / self.total_blend_in_time).min(1.0)
        }
    }

    /// Blend-in progress mapped through the sample's curve shape.
    pub fn blend_in_weight(&self) -> f32 {
        self.blend_option.alpha(self.blend_in_percentage())
    }

    fn bone_weight(&self, duration: f32) -> f32 {
        if duration <= self.time_eps {
            if self.is_active() {
                1.0
            } else {
                0.0
            }
        } else {
            self.blend_option
                .alpha((self.current_blend_in_time / duration).min(1.0))
        }
    }

    /// Per-skeleton-bone weights. Returns `false` (and leaves `out` alone) without a
    /// blend profile.
    pub fn blend_in_weights_skeleton(&self, out: &mut Vec<f32>) -> bool {
        let Some(durations) = &self.per_bone_durations else {
            return false;
        };
        out.clear();
        out.extend(durations.iter().map(|&d| self.bone_weight(d)));
        true
    }

    /// Per-compact-bone weights for `bones`. Returns `false` without a blend profile.
    pub fn blend_in_weights_compact(&self, bones: &BoneContainer, out: &mut Vec<f32>) -> bool {
        let Some(durations) = &self.per_bone_durations else {
            return false;
        };
        out.clear();
        out.extend((0..bones.num_bones()).map(|compact| {
            durations
                .get(bones.skeleton_index(compact))
                .map_or_else(|| self.blend_in_weight(), |&d| self.bone_weight(d))
        }));
        true
    }

    /// Write this sample's pose into `out`: the live play-head (mirrored if requested,
    /// then curve overrides), or the stored pose.
    pub fn evaluate(&self, ctx: &EvalContext, out: &mut PoseContext) {
        self.evaluate_with(ctx, &mut PoseContext::new(), out);
    }

    /// [`evaluate`](Self::evaluate) with a caller-owned intermediate buffer, reused
    /// across frames by the stack.
    pub fn evaluate_with(&self, ctx: &EvalContext, scratch: &mut PoseContext, out: &mut PoseContext) {
        match &self.payload {
            SamplePayload::None => {
                self.restore_pose_context(ctx, out);
                return;
            }
            SamplePayload::Sequence(p) => p.asset.sample(p.time, ctx, out),
            SamplePayload::BlendSpace(p) => {
                p.asset.sample(p.normalized_time, p.params, ctx, scratch, out)
            }
        }
        if self.mirrored {
            if let Some(table) = &self.mirror_table {
                table.apply(ctx, out);
            }
        }
        out.curves.merge_from(&self.curve_overrides);
    }

    /// Write the stored pose into `out`, remapping when the bone container changed.
    pub fn restore_pose_context(&self, ctx: &EvalContext, out: &mut PoseContext) {
        let Some(stored) = &self.stored else {
            out.reset_to_ref_pose(ctx);
            return;
        };
        if stored.container.serial() == ctx.bones.serial() {
            debug_assert_eq!(stored.bones.len(), ctx.bones.num_bones(), "stored pose size");
            out.pose.bones.clone_from(&stored.bones);
        } else {
            out.pose.bones.clear();
            out.pose.bones.extend((0..ctx.bones.num_bones()).map(|compact| {
                let skel = ctx.bones.skeleton_index(compact);
                stored
                    .container
                    .compact_index(skel)
                    .and_then(|i| stored.bones.get(i))
                    .copied()
                    .unwrap_or_else(|| ctx.skeleton.ref_pose(skel))
            }));
        }
        out.curves.clone_from(&stored.curves);
        out.attributes.clone_from(&stored.attributes);
    }

    /// Freeze `pose` (evaluated against `ctx`) into this sample, dropping any play-head.
    pub fn store_pose_context(&mut self, ctx: &EvalContext, pose: &PoseContext) {
        self.payload = SamplePayload::None;
        self.asset = None;
        match &mut self.stored {
            Some(stored) => {
                stored.container = ctx.bones.clone();
                stored.bones.clone_from(&pose.pose.bones);
                stored.curves.clone_from(&pose.curves);
                stored.attributes.clone_from(&pose.attributes);
            }
            None => {
                self.stored = Some(Box::new(StoredPose {
                    container: ctx.bones.clone(),
                    bones: pose.pose.bones.clone(),
                    curves: pose.curves.clone(),
                    attributes: pose.attributes.clone(),
                }));
            }
        }
    }

    /// Hand this sample's stored pose to `other`, leaving this one without a snapshot.
    pub fn move_pose_context_to(&mut self, other: &mut SamplePlayer) {
        other.payload = SamplePayload::None;
        other.asset = None;
        other.stored = self.stored.take();
    }

    pub fn set_curve_override(&mut self, name: &str, value: f32) {
        self.curve_overrides.set(name, value);
    }

    pub fn clear_curve_overrides(&mut self) {
        self.curve_overrides.clear();
    }

    pub fn asset(&self) -> Option<&AnimAsset> {
        self.asset.as_ref()
    }

    pub fn payload(&self) -> &SamplePayload {
        &self.payload
    }

    #[inline]
    pub fn is_active(&self) -> bool {
        self.time_to_activation <= 0.0
    }

    pub fn has_stored_pose(&self) -> bool {
        self.stored.is_some()
    }

    pub fn has_payload(&self) -> bool {
        !matches!(self.payload, SamplePayload::None)
    }

    pub fn has_per_bone_blend(&self) -> bool {
        self.per_bone_durations.is_some()
    }

    pub fn is_blend_space(&self) -> bool {
        matches!(self.payload, SamplePayload::BlendSpace(_))
    }

    /// Seconds for sequences, normalised time for blend spaces, 0 otherwise.
    pub fn accumulated_time(&self) -> f32 {
        match &self.payload {
            SamplePayload::None => 0.0,
            SamplePayload::Sequence(p) => p.time,
            SamplePayload::BlendSpace(p) => p.normalized_time,
        }
    }

    pub fn blend_parameters(&self) -> [f32; 2] {
        match &self.payload {
            SamplePayload::BlendSpace(p) => p.params,
            _ => [0.0; 2],
        }
    }

    pub fn is_looping(&self) -> bool {
        match &self.payload {
            SamplePayload::None => false,
            SamplePayload::Sequence(p) => p.looping,
            SamplePayload::BlendSpace(p) => p.looping,
        }
    }

    /// Seconds left before the play-head reaches the end of its asset.
    pub fn remaining_time(&self) -> f32 {
        match &self.payload {
            SamplePayload::None => 0.0,
            SamplePayload::Sequence(p) => (p.asset.length() - p.time).max(0.0),
            SamplePayload::BlendSpace(p) => {
                (1.0 - p.normalized_time).max(0.0) * p.asset.length(p.params)
            }
        }
    }

    pub fn sync(&self) -> Option<&SyncParams> {
        match &self.payload {
            SamplePayload::None => None,
            SamplePayload::Sequence(p) => p.sync.as_ref(),
            SamplePayload::BlendSpace(p) => p.sync.as_ref(),
        }
    }

    pub fn is_mirrored(&self) -> bool {
        self.mirrored
    }

    pub fn total_blend_in_time(&self) -> f32 {
        self.total_blend_in_time
    }

    pub fn current_blend_in_time(&self) -> f32 {
        self.current_blend_in_time
    }

    pub fn time_to_activation(&self) -> f32 {
        self.time_to_activation
    }

    pub fn blend_option(&self) -> BlendOption {
        self.blend_option
    }

    pub fn trace(&self, frame: u64, index: usize) -> SampleTrace {
        SampleTrace {
            frame,
            index,
            asset: self.asset.as_ref().map(|a| a.name().to_string()),
            accumulated_time: self.accumulated_time(),
            blend_in_time: self.current_blend_in_time,
            total_blend_in_time: self.total_blend_in_time,
            time_to_activation: self.time_to_activation,
            mirrored: self.mirrored,
            frozen: self.has_stored_pose(),
        }
    }
}
