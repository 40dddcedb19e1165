//! Per-instance scratch buffers for stack composition.
//!
//! Buffers are sized from the config up front and grown on demand; they are owned by a
//! single `BlendStack` and never shared across instances.

use crate::config::BlendStackConfig;
use crate::pose::PoseContext;

#[derive(Clone, Debug, Default)]
pub struct Scratch {
    pub cap_bones: usize,
    /// Layer being evaluated before it is blended onto the accumulator.
    pub pose: PoseContext,
    /// Intermediate buffer handed to assets that blend several poses themselves.
    pub asset_pose: PoseContext,
    /// Per-compact-bone blend-in weights of the current layer.
    pub bone_weights: Vec<f32>,
}

impl Scratch {
    pub fn new(cfg: &BlendStackConfig) -> Self {
        Self {
            cap_bones: cfg.scratch_bones,
            pose: PoseContext::with_capacity(cfg.scratch_bones),
            asset_pose: PoseContext::with_capacity(cfg.scratch_bones),
            bone_weights: Vec::with_capacity(cfg.scratch_bones),
        }
    }

    /// Grow buffers for a frame evaluating `num_bones` compact bones.
    #[inline]
    pub fn begin_frame(&mut self, num_bones: usize) {
        if num_bones > self.cap_bones {
            log::debug!("growing blend scratch from {} to {num_bones} bones", self.cap_bones);
            self.cap_bones = num_bones;
        }
        self.pose.pose.bones.reserve(num_bones);
        self.asset_pose.pose.bones.reserve(num_bones);
        self.bone_weights.reserve(num_bones);
    }
}
