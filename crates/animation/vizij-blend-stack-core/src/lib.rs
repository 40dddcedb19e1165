//! Vizij Blend Stack Core (engine-agnostic)
//!
//! A small ordered stack of animation samples composited into one skeletal pose per
//! frame. New requests blend in on top of older ones; overflow is folded into a frozen
//! pose so history never pops. A driver decides when a request warrants a new insertion,
//! optionally routing it through a stitch planner that splices in a connector clip.
//!
//! The crate never installs a logger; diagnostics go through the `log` facade.

pub mod asset;
pub mod blend;
pub mod config;
pub mod curve;
pub mod driver;
pub mod error;
pub mod mirror;
pub mod pose;
pub mod profile;
pub mod request;
pub mod sample;
pub mod scratch;
pub mod skeleton;
pub mod stack;
pub mod stitch;
pub mod trace;

// Re-exports for hosts
pub use asset::{AnimAsset, BlendSample, BlendSpace2d, BlendSpaceAsset, Clip, SequenceAsset};
pub use config::{BlendStackConfig, DriverConfig, StitchConfig};
pub use curve::BlendOption;
pub use driver::{BlendStackDriver, ChangeReason};
pub use error::{BlendStackError, Result};
pub use mirror::{MirrorAxis, MirrorTable};
pub use pose::{AttributeSet, AttributeValue, BoneTransform, CurveSet, Pose, PoseContext};
pub use profile::{BlendProfile, BlendProfileEntry, BlendProfileMode};
pub use request::{BlendRequest, InertializationRequest, SyncMethod, SyncParams, SyncRole};
pub use sample::{SamplePayload, SamplePlayer, StoredPose};
pub use scratch::Scratch;
pub use skeleton::{BoneContainer, EvalContext, Skeleton, SkeletonBone};
pub use stack::{BlendStack, InsertOutcome};
pub use stitch::{
    PlayingState, StitchCandidate, StitchOutcome, StitchPlanner, StitchRejection, StitchSearch,
};
pub use trace::{LogTraceSink, SampleTrace, TraceSink};
