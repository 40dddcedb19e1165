//! The blend stack: an ordered list of samples composited into one pose per frame.
//!
//! Index 0 is the newest sample, higher indices are older. Insertion and eviction shift
//! indices, so callers must re-fetch samples by index every frame (`sample(0)`) and never
//! keep references across a frame boundary.
//!
//! Per frame the host calls [`BlendStack::update`] then [`BlendStack::evaluate`].
//! Composition starts at the oldest sample and blends each newer one on top by its
//! blend-in weight. Samples beyond `max_active_blends + 1` are folded into the running
//! result and evicted; with `store_evicted_pose` the folded result is frozen into the new
//! oldest slot so nothing visibly pops.

use std::fmt;

use crate::asset::AnimAsset;
use crate::blend::{blend_per_bone, blend_uniform};
use crate::config::BlendStackConfig;
use crate::pose::PoseContext;
use crate::request::{BlendRequest, InertializationRequest};
use crate::sample::SamplePlayer;
use crate::scratch::Scratch;
use crate::skeleton::{EvalContext, Skeleton};
use crate::trace::{SampleTrace, TraceSink};

/// Which slot an insert ended up in.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InsertOutcome {
    /// A new sample was pushed at index 0.
    Pushed,
    /// Slot 0 was still waiting on its activation delay and was replaced.
    ReplacedPending,
    /// Slot 0 had only just started blending in and was retargeted.
    ReplacedBlending,
    /// The stack was full; slot 0 was overwritten.
    Overwritten,
}

#[derive(Clone, Debug)]
pub struct BlendStack {
    config: BlendStackConfig,
    samples: Vec<SamplePlayer>,
    scratch: Scratch,
    inertialization: Option<InertializationRequest>,
}

impl Default for BlendStack {
    fn default() -> Self {
        Self::new(BlendStackConfig::default())
    }
}

impl BlendStack {
    pub fn new(config: BlendStackConfig) -> Self {
        let scratch = Scratch::new(&config);
        Self {
            samples: Vec::with_capacity(config.max_active_blends + 2),
            config,
            scratch,
            inertialization: None,
        }
    }

    pub fn config(&self) -> &BlendStackConfig {
        &self.config
    }

    /// Start blending to `req`.
    pub fn insert(&mut self, req: &BlendRequest, skeleton: &Skeleton) -> InsertOutcome {
        self.insert_with(req, skeleton, true)
    }

    /// `allow_override = false` skips the near-start retarget rule so a second insert in
    /// the same frame always stacks on top of the first.
    pub(crate) fn insert_with(
        &mut self,
        req: &BlendRequest,
        skeleton: &Skeleton,
        allow_override: bool,
    ) -> InsertOutcome {
        let eps = self.config.zero_time_threshold;
        let mut blend_time = if self.samples.is_empty() {
            0.0
        } else {
            req.blend_time
        };
        if req.use_inertial_blend {
            if blend_time > eps {
                self.inertialization = Some(InertializationRequest {
                    duration: blend_time,
                    blend_profile: req.blend_profile.clone(),
                    blend_option: req.blend_option,
                });
            }
            blend_time = 0.0;
        }

        let room = self.samples.len() < self.config.max_active_blends + 2;
        let outcome = match self.samples.first() {
            Some(top) if !top.is_active() => InsertOutcome::ReplacedPending,
            Some(top)
                if allow_override
                    && top.blend_in_percentage() < 1.0
                    && top.current_blend_in_time() < self.config.max_blend_in_time_to_override =>
            {
                InsertOutcome::ReplacedBlending
            }
            _ if room => {
                self.samples.insert(0, SamplePlayer::new());
                InsertOutcome::Pushed
            }
            _ => {
                log::warn!(
                    "blend stack full ({} samples), overwriting newest sample with '{}'",
                    self.samples.len(),
                    req.asset.as_ref().map_or("<none>", |a| a.name())
                );
                InsertOutcome::Overwritten
            }
        };

        if let Err(err) = self.samples[0].initialize(req, blend_time, skeleton, eps) {
            log::error!("blend stack insert: {err}");
        }
        log::debug!(
            "blend stack insert '{}' ({outcome:?}), blend {blend_time:.3}s, {} samples",
            req.asset.as_ref().map_or("<none>", |a| a.name()),
            self.samples.len()
        );
        debug_assert!(
            self.samples.iter().skip(1).all(SamplePlayer::is_active),
            "only slot 0 may wait on an activation delay"
        );
        outcome
    }

    /// Top-down contribution of each sample: newest first, the oldest takes whatever is
    /// left. Sums to 1 for a non-empty stack.
    pub fn sample_weights(&self) -> Vec<f32> {
        let mut weights = Vec::with_capacity(self.samples.len());
        let mut remaining = 1.0f32;
        let last = self.samples.len().saturating_sub(1);
        for (i, sample) in self.samples.iter().enumerate() {
            let share = if i == last {
                1.0
            } else {
                sample.blend_in_percentage()
            };
            weights.push(remaining * share);
            remaining *= 1.0 - share;
        }
        weights
    }

    /// Prune samples that no longer contribute, then advance every retained sample.
    pub fn update(&mut self, delta_time: f32) {
        if self.samples.is_empty() {
            return;
        }
        let mut remaining = 1.0f32;
        let mut keep = self.samples.len();
        let last = self.samples.len() - 1;
        for (i, sample) in self.samples.iter().enumerate() {
            let share = if i == last {
                1.0
            } else {
                sample.blend_in_percentage()
            };
            remaining *= 1.0 - share;
            if remaining < self.config.zero_weight_threshold {
                keep = i + 1;
                break;
            }
        }
        if keep < self.samples.len() {
            log::debug!(
                "blend stack pruning {} fully covered samples",
                self.samples.len() - keep
            );
            self.samples.truncate(keep);
        }

        let multiplier = self.config.depth_blend_multiplier;
        for (i, sample) in self.samples.iter_mut().enumerate() {
            sample.update_with_delta_time(delta_time, i, multiplier);
        }
    }

    /// Composite all samples into `out`.
    pub fn evaluate(&mut self, ctx: &EvalContext, out: &mut PoseContext) {
        let n = self.samples.len();
        if n == 0 {
            out.reset_to_ref_pose(ctx);
            return;
        }

        let max = self.config.max_active_blends;
        if n == 1 || max == 0 || !self.config.enabled {
            self.samples.truncate(max + 1);
            let top = &self.samples[0];
            if top.is_active() {
                top.evaluate_with(ctx, &mut self.scratch.asset_pose, out);
            } else {
                out.reset_to_ref_pose(ctx);
            }
            return;
        }

        let mut scratch = std::mem::take(&mut self.scratch);
        scratch.begin_frame(ctx.bones.num_bones());

        self.samples[n - 1].evaluate_with(ctx, &mut scratch.asset_pose, out);
        let mut i = n - 1;
        while i > 0 {
            i -= 1;
            let sample = &self.samples[i];
            if sample.is_active() {
                sample.evaluate_with(ctx, &mut scratch.asset_pose, &mut scratch.pose);
                let weight = sample.blend_in_weight();
                if sample.blend_in_weights_compact(&ctx.bones, &mut scratch.bone_weights) {
                    blend_per_bone(out, &scratch.pose, &scratch.bone_weights, weight);
                } else {
                    blend_uniform(out, &scratch.pose, weight);
                }
            }
            if i == max && self.samples.len() > max + 1 {
                self.fold_overflow(ctx, out);
            }
        }

        self.scratch = scratch;
        debug_assert!(self.samples.len() <= max + 1);
        debug_assert!(
            self.samples
                .iter()
                .rev()
                .skip(1)
                .all(|s| !s.has_stored_pose()),
            "only the oldest sample may hold a stored pose"
        );
    }

    /// `out` holds samples `max..` blended together; keep `max + 1` samples.
    fn fold_overflow(&mut self, ctx: &EvalContext, out: &PoseContext) {
        let max = self.config.max_active_blends;
        if self.config.store_evicted_pose {
            // Reuse the current snapshot's buffers for the new one.
            let (keep, evicted) = self.samples.split_at_mut(max + 1);
            if let Some(oldest) = evicted.last_mut() {
                if oldest.has_stored_pose() {
                    oldest.move_pose_context_to(&mut keep[max]);
                }
            }
            keep[max].store_pose_context(ctx, out);
            self.samples.truncate(max + 1);
            log::debug!("blend stack froze overflow into slot {max}");
        } else {
            let dropped = 1.0 - self.samples[max].blend_in_weight();
            if dropped > self.config.zero_weight_threshold {
                log::warn!(
                    "blend stack dropped {} samples still carrying {dropped:.3} weight",
                    self.samples.len() - (max + 1)
                );
            }
            self.samples.truncate(max + 1);
        }
    }

    /// Drop the oldest sample. Its stored pose moves to the new oldest sample if that
    /// one has no play-head of its own.
    pub fn pop_last_sample(&mut self) -> Option<SamplePlayer> {
        let mut last = self.samples.pop()?;
        if let Some(new_last) = self.samples.last_mut() {
            if last.has_stored_pose() && !new_last.has_payload() {
                last.move_pose_context_to(new_last);
            }
        }
        Some(last)
    }

    /// Empty the stack.
    pub fn reset(&mut self) {
        self.samples.clear();
        self.inertialization = None;
    }

    /// The pending request for an external inertial blend, if any.
    pub fn take_inertialization_request(&mut self) -> Option<InertializationRequest> {
        self.inertialization.take()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn sample(&self, index: usize) -> Option<&SamplePlayer> {
        self.samples.get(index)
    }

    pub fn sample_mut(&mut self, index: usize) -> Option<&mut SamplePlayer> {
        self.samples.get_mut(index)
    }

    pub fn samples(&self) -> impl Iterator<Item = &SamplePlayer> {
        self.samples.iter()
    }

    pub fn current_asset(&self) -> Option<&AnimAsset> {
        self.samples.first().and_then(SamplePlayer::asset)
    }

    pub fn accumulated_time(&self) -> f32 {
        self.samples.first().map_or(0.0, SamplePlayer::accumulated_time)
    }

    pub fn blend_parameters(&self) -> [f32; 2] {
        self.samples
            .first()
            .map_or([0.0; 2], SamplePlayer::blend_parameters)
    }

    pub fn is_mirrored(&self) -> bool {
        self.samples.first().is_some_and(SamplePlayer::is_mirrored)
    }

    pub fn is_looping(&self) -> bool {
        self.samples.first().is_some_and(SamplePlayer::is_looping)
    }

    pub fn remaining_time(&self) -> f32 {
        self.samples.first().map_or(0.0, SamplePlayer::remaining_time)
    }

    pub fn emit_traces(&self, frame: u64, sink: &mut dyn TraceSink) {
        for (i, sample) in self.samples.iter().enumerate() {
            sink.record(sample.trace(frame, i));
        }
    }

    pub fn traces(&self, frame: u64) -> Vec<SampleTrace> {
        let mut out = Vec::with_capacity(self.samples.len());
        self.emit_traces(frame, &mut out);
        out
    }
}

impl fmt::Display for BlendStack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, s) in self.samples.iter().enumerate() {
            let name = match s.asset() {
                Some(asset) => asset.name(),
                None if s.has_stored_pose() => "<frozen>",
                None => "<none>",
            };
            writeln!(
                f,
                "[{i}] {name} blend {:.3}/{:.3} delay {:.3}{}",
                s.current_blend_in_time(),
                s.total_blend_in_time(),
                s.time_to_activation(),
                if s.is_mirrored() { " mirrored" } else { "" }
            )?;
        }
        Ok(())
    }
}
