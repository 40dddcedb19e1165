//! Parameters of one "blend to" request, plus the side channel handed to an external
//! inertial blender.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::asset::AnimAsset;
use crate::curve::BlendOption;
use crate::mirror::MirrorTable;
use crate::profile::BlendProfile;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SyncRole {
    #[default]
    CanBeLeader,
    AlwaysFollower,
    AlwaysLeader,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SyncMethod {
    #[default]
    DoNotSync,
    SyncGroup,
    Graph,
}

/// Sync-group membership carried through to the host's play-head.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncParams {
    pub group_name: String,
    pub role: SyncRole,
    pub method: SyncMethod,
}

/// Everything [`BlendStack::insert`](crate::stack::BlendStack::insert) needs to start a
/// new sample.
#[derive(Clone, Debug)]
pub struct BlendRequest {
    pub asset: Option<AnimAsset>,
    /// Seconds for sequences, normalised [0, 1] for blend spaces.
    pub start_time: f32,
    pub looping: bool,
    pub mirrored: bool,
    pub mirror_table: Option<Arc<MirrorTable>>,
    pub blend_time: f32,
    pub blend_profile: Option<Arc<BlendProfile>>,
    pub blend_option: BlendOption,
    /// Hand the transition to an external inertial blender instead of blending here.
    pub use_inertial_blend: bool,
    pub blend_parameters: [f32; 2],
    pub play_rate: f32,
    pub activation_delay: f32,
    pub sync: Option<SyncParams>,
}

impl Default for BlendRequest {
    fn default() -> Self {
        Self {
            asset: None,
            start_time: 0.0,
            looping: false,
            mirrored: false,
            mirror_table: None,
            blend_time: 0.0,
            blend_profile: None,
            blend_option: BlendOption::Linear,
            use_inertial_blend: false,
            blend_parameters: [0.0; 2],
            play_rate: 1.0,
            activation_delay: 0.0,
            sync: None,
        }
    }
}

impl BlendRequest {
    pub fn new(asset: impl Into<AnimAsset>) -> Self {
        Self {
            asset: Some(asset.into()),
            ..Self::default()
        }
    }

    pub fn with_blend_time(mut self, blend_time: f32) -> Self {
        self.blend_time = blend_time;
        self
    }

    pub fn with_start_time(mut self, start_time: f32) -> Self {
        self.start_time = start_time;
        self
    }

    pub fn with_looping(mut self, looping: bool) -> Self {
        self.looping = looping;
        self
    }

    pub fn with_mirror(mut self, table: Option<Arc<MirrorTable>>) -> Self {
        self.mirrored = true;
        self.mirror_table = table;
        self
    }

    pub fn with_profile(mut self, profile: Arc<BlendProfile>) -> Self {
        self.blend_profile = Some(profile);
        self
    }

    pub fn with_option(mut self, option: BlendOption) -> Self {
        self.blend_option = option;
        self
    }

    pub fn with_parameters(mut self, params: [f32; 2]) -> Self {
        self.blend_parameters = params;
        self
    }

    pub fn with_play_rate(mut self, play_rate: f32) -> Self {
        self.play_rate = play_rate;
        self
    }

    pub fn with_activation_delay(mut self, delay: f32) -> Self {
        self.activation_delay = delay;
        self
    }

    pub fn with_inertial_blend(mut self) -> Self {
        self.use_inertial_blend = true;
        self
    }
}

/// Transition parameters for an external inertialization node.
#[derive(Clone, Debug, PartialEq)]
pub struct InertializationRequest {
    pub duration: f32,
    pub blend_profile: Option<Arc<BlendProfile>>,
    pub blend_option: BlendOption,
}
