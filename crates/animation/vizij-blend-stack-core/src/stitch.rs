//! Stitching: splice a short connector clip in front of a requested transition.
//!
//! The planner asks a [`StitchSearch`] for a connector from what is playing now toward the
//! requested target. An accepted connector becomes two inserts: the connector blending in
//! over the stitch blend time, and the original target queued behind it with an
//! activation delay so that it lands where a direct blend would have put it. Every
//! rejection falls back to one direct insert of the unmodified request.

use crate::asset::AnimAsset;
use crate::config::StitchConfig;
use crate::error::BlendStackError;
use crate::request::BlendRequest;
use crate::skeleton::Skeleton;
use crate::stack::BlendStack;

/// What the stack is currently playing, as seen by the search.
#[derive(Clone, Debug, Default)]
pub struct PlayingState {
    pub asset: Option<AnimAsset>,
    pub time: f32,
    pub mirrored: bool,
    pub blend_parameters: [f32; 2],
}

impl PlayingState {
    pub fn from_stack(stack: &BlendStack) -> Self {
        Self {
            asset: stack.current_asset().cloned(),
            time: stack.accumulated_time(),
            mirrored: stack.is_mirrored(),
            blend_parameters: stack.blend_parameters(),
        }
    }
}

#[derive(Clone, Debug)]
pub struct StitchCandidate {
    pub asset: AnimAsset,
    /// Start time inside the connector asset.
    pub time: f32,
    /// Dissimilarity; lower is better.
    pub cost: f32,
    pub play_rate: f32,
    pub mirrored: bool,
}

/// Similarity search for connector clips.
pub trait StitchSearch {
    fn find_stitch(
        &self,
        current: &PlayingState,
        target: &BlendRequest,
        blend_time: f32,
    ) -> Option<StitchCandidate>;
}

#[derive(Clone, Debug, PartialEq)]
pub enum StitchRejection {
    NothingPlaying,
    NoSearchProvider,
    NoBlendBudget,
    /// No room for both the connector and the delayed target.
    StackFull,
    /// The requested blend is not longer than the stitch blend itself.
    BlendTooShort,
    NotFound,
    TooExpensive { cost: f32, max_cost: f32 },
}

#[derive(Clone, Debug, PartialEq)]
pub enum StitchOutcome {
    Stitched { cost: f32 },
    Direct(StitchRejection),
}

pub struct StitchPlanner {
    config: StitchConfig,
    search: Option<Box<dyn StitchSearch + Send + Sync>>,
}

impl std::fmt::Debug for StitchPlanner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StitchPlanner")
            .field("config", &self.config)
            .field("has_search", &self.search.is_some())
            .finish()
    }
}

impl StitchPlanner {
    pub fn new(config: StitchConfig) -> Self {
        Self {
            config,
            search: None,
        }
    }

    pub fn with_search(mut self, search: impl StitchSearch + Send + Sync + 'static) -> Self {
        self.search = Some(Box::new(search));
        self
    }

    pub fn config(&self) -> &StitchConfig {
        &self.config
    }

    fn find(
        &self,
        stack: &BlendStack,
        current: &PlayingState,
        request: &BlendRequest,
    ) -> Result<StitchCandidate, StitchRejection> {
        if current.asset.is_none() {
            return Err(StitchRejection::NothingPlaying);
        }
        let Some(search) = &self.search else {
            log::error!("{}", BlendStackError::SearchProviderMissing);
            return Err(StitchRejection::NoSearchProvider);
        };
        if stack.config().max_active_blends == 0 {
            log::error!("{}", BlendStackError::StitchBudgetExhausted);
            return Err(StitchRejection::NoBlendBudget);
        }
        if stack.len() > stack.config().max_active_blends {
            log::warn!(
                "blend stack holds {} samples, no room to stitch",
                stack.len()
            );
            return Err(StitchRejection::StackFull);
        }
        if request.blend_time <= self.config.blend_time {
            return Err(StitchRejection::BlendTooShort);
        }
        let candidate = search
            .find_stitch(current, request, self.config.blend_time)
            .ok_or(StitchRejection::NotFound)?;
        if candidate.cost > self.config.max_cost {
            return Err(StitchRejection::TooExpensive {
                cost: candidate.cost,
                max_cost: self.config.max_cost,
            });
        }
        Ok(candidate)
    }

    /// Insert `request` into `stack`, through a connector clip when one is acceptable.
    pub fn plan(
        &self,
        stack: &mut BlendStack,
        current: &PlayingState,
        request: &BlendRequest,
        skeleton: &Skeleton,
    ) -> StitchOutcome {
        let candidate = match self.find(stack, current, request) {
            Ok(candidate) => candidate,
            Err(rejection) => {
                log::debug!("stitch rejected ({rejection:?}), blending directly");
                stack.insert(request, skeleton);
                return StitchOutcome::Direct(rejection);
            }
        };

        let stitch_time = self.config.blend_time;
        let delay = request.blend_time - stitch_time;
        let connector = BlendRequest {
            asset: Some(candidate.asset.clone()),
            start_time: candidate.time,
            looping: false,
            mirrored: candidate.mirrored,
            mirror_table: request.mirror_table.clone(),
            blend_time: stitch_time,
            blend_profile: request.blend_profile.clone(),
            blend_option: request.blend_option,
            use_inertial_blend: false,
            blend_parameters: current.blend_parameters,
            play_rate: candidate.play_rate,
            activation_delay: 0.0,
            sync: None,
        };
        stack.insert(&connector, skeleton);

        let start_time = request.asset.as_ref().map_or(request.start_time, |asset| {
            asset.advance_time(
                request.start_time,
                delay * request.play_rate,
                request.looping,
                request.blend_parameters,
            )
        });
        let target = BlendRequest {
            start_time,
            blend_time: stitch_time,
            activation_delay: delay,
            ..request.clone()
        };
        stack.insert_with(&target, skeleton, false);

        log::debug!(
            "stitched through '{}' (cost {:.3}), target delayed {delay:.3}s",
            candidate.asset.name(),
            candidate.cost
        );
        StitchOutcome::Stitched {
            cost: candidate.cost,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::asset::Clip;
    use crate::config::BlendStackConfig;
    use crate::pose::BoneTransform;
    use crate::skeleton::SkeletonBone;

    struct Fixed(Option<StitchCandidate>);

    impl StitchSearch for Fixed {
        fn find_stitch(&self, _: &PlayingState, _: &BlendRequest, _: f32) -> Option<StitchCandidate> {
            self.0.clone()
        }
    }

    fn skeleton() -> Skeleton {
        Skeleton::new(
            "s",
            vec![SkeletonBone {
                name: "root".into(),
                parent: None,
                ref_pose: BoneTransform::IDENTITY,
            }],
        )
    }

    #[test]
    fn missing_provider_falls_back_to_direct() {
        let skel = skeleton();
        let mut stack = BlendStack::new(BlendStackConfig::default());
        stack.insert(&BlendRequest::new(Arc::new(Clip::empty("idle", 1.0))), &skel);
        let planner = StitchPlanner::new(StitchConfig::default());
        let req = BlendRequest::new(Arc::new(Clip::empty("run", 1.0))).with_blend_time(0.5);
        let current = PlayingState::from_stack(&stack);
        let outcome = planner.plan(&mut stack, &current, &req, &skel);
        assert_eq!(outcome, StitchOutcome::Direct(StitchRejection::NoSearchProvider));
        assert_eq!(stack.len(), 2);
    }

    #[test]
    fn not_found_is_direct() {
        let skel = skeleton();
        let mut stack = BlendStack::default();
        stack.insert(&BlendRequest::new(Arc::new(Clip::empty("idle", 1.0))), &skel);
        let planner = StitchPlanner::new(StitchConfig::default()).with_search(Fixed(None));
        let req = BlendRequest::new(Arc::new(Clip::empty("run", 1.0))).with_blend_time(0.5);
        let current = PlayingState::from_stack(&stack);
        let outcome = planner.plan(&mut stack, &current, &req, &skel);
        assert_eq!(outcome, StitchOutcome::Direct(StitchRejection::NotFound));
    }
}
