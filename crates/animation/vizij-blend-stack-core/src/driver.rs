//! Per-frame policy: decide whether the current request needs a new insertion.
//!
//! The host keeps the driver's request up to date with [`BlendStackDriver::set_request`]
//! and calls [`BlendStackDriver::update`] once per frame followed by
//! [`BlendStackDriver::evaluate`].

use crate::asset::AnimAsset;
use crate::config::{BlendStackConfig, DriverConfig};
use crate::pose::PoseContext;
use crate::request::BlendRequest;
use crate::skeleton::{EvalContext, Skeleton};
use crate::stack::BlendStack;
use crate::stitch::{PlayingState, StitchPlanner};
use crate::trace::TraceSink;

/// Why the driver did (or did not) insert this frame. First matching rule wins.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChangeReason {
    NoChangeNeeded,
    ForcedChange,
    AssetChanged,
    MirrorChanged,
    ParameterDrifted,
    TimeDesynced,
}

pub struct BlendStackDriver {
    config: DriverConfig,
    stack: BlendStack,
    stitch: Option<StitchPlanner>,
    request: BlendRequest,
    force_next: bool,
    last_frame: Option<u64>,
    trace_sink: Option<Box<dyn TraceSink + Send>>,
}

impl std::fmt::Debug for BlendStackDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlendStackDriver")
            .field("config", &self.config)
            .field("stack", &self.stack)
            .field("stitch", &self.stitch)
            .field("force_next", &self.force_next)
            .field("last_frame", &self.last_frame)
            .finish()
    }
}

impl BlendStackDriver {
    pub fn new(stack_config: BlendStackConfig, config: DriverConfig) -> Self {
        Self {
            config,
            stack: BlendStack::new(stack_config),
            stitch: None,
            request: BlendRequest::default(),
            force_next: false,
            last_frame: None,
            trace_sink: None,
        }
    }

    pub fn with_stitch(mut self, planner: StitchPlanner) -> Self {
        self.stitch = Some(planner);
        self
    }

    pub fn with_trace_sink(mut self, sink: impl TraceSink + Send + 'static) -> Self {
        self.trace_sink = Some(Box::new(sink));
        self
    }

    /// Replace the request compared against the stack each frame.
    pub fn set_request(&mut self, request: BlendRequest) {
        self.request = request;
    }

    pub fn request(&self) -> &BlendRequest {
        &self.request
    }

    /// Insert on the next update even if nothing changed.
    pub fn force_next_change(&mut self) {
        self.force_next = true;
    }

    pub fn stack(&self) -> &BlendStack {
        &self.stack
    }

    pub fn stack_mut(&mut self) -> &mut BlendStack {
        &mut self.stack
    }

    /// Evaluate the change rules without acting on them.
    pub fn decide(&self) -> ChangeReason {
        let req = &self.request;
        if req.asset.is_none() && !self.force_next {
            return ChangeReason::NoChangeNeeded;
        }
        let Some(top) = self.stack.sample(0) else {
            return ChangeReason::ForcedChange;
        };
        if self.force_next {
            return ChangeReason::ForcedChange;
        }
        let same_asset = match (top.asset(), &req.asset) {
            (Some(playing), Some(requested)) => playing.same_asset(requested),
            _ => false,
        };
        if !same_asset {
            return ChangeReason::AssetChanged;
        }
        if top.is_mirrored() != req.mirrored {
            return ChangeReason::MirrorChanged;
        }
        if matches!(req.asset, Some(AnimAsset::BlendSpace(_))) {
            let [px, py] = top.blend_parameters();
            let [rx, ry] = req.blend_parameters;
            let dist2 = (px - rx) * (px - rx) + (py - ry) * (py - ry);
            let threshold = self.config.blend_params_threshold;
            if dist2 > threshold * threshold {
                return ChangeReason::ParameterDrifted;
            }
        }
        if self.config.max_time_desync >= 0.0
            && (req.start_time - top.accumulated_time()).abs() > self.config.max_time_desync
        {
            return ChangeReason::TimeDesynced;
        }
        ChangeReason::NoChangeNeeded
    }

    /// Apply the change rules, inserting the current request when needed.
    pub fn decide_and_insert(&mut self, skeleton: &Skeleton) -> ChangeReason {
        let reason = self.decide();
        self.force_next = false;
        if reason == ChangeReason::NoChangeNeeded {
            return reason;
        }
        log::debug!("blend stack driver change: {reason:?}");
        match &self.stitch {
            Some(planner) => {
                let current = PlayingState::from_stack(&self.stack);
                planner.plan(&mut self.stack, &current, &self.request, skeleton);
            }
            None => {
                self.stack.insert(&self.request, skeleton);
            }
        }
        reason
    }

    /// One frame: relevancy check, change rules, then stack advancement.
    ///
    /// `frame` is the host's frame counter; anything other than the previous frame plus
    /// one (a gap, a repeat, or a counter that wrapped or restarted) means the driver was
    /// not relevant in between.
    pub fn update(&mut self, delta_time: f32, frame: u64, skeleton: &Skeleton) -> ChangeReason {
        if let Some(last) = self.last_frame {
            if frame != last.wrapping_add(1) && self.config.reset_on_becoming_relevant {
                log::debug!("blend stack driver relevant again after frame {last}, resetting");
                self.stack.reset();
            }
        }
        self.last_frame = Some(frame);

        let reason = self.decide_and_insert(skeleton);
        self.stack.update(delta_time);

        if self.config.emit_trace {
            if let Some(sink) = self.trace_sink.as_deref_mut() {
                self.stack.emit_traces(frame, sink);
            }
        }
        reason
    }

    pub fn evaluate(&mut self, ctx: &EvalContext, out: &mut PoseContext) {
        self.stack.evaluate(ctx, out);
    }

    pub fn current_asset(&self) -> Option<&AnimAsset> {
        self.stack.current_asset()
    }

    pub fn accumulated_time(&self) -> f32 {
        self.stack.accumulated_time()
    }

    pub fn blend_parameters(&self) -> [f32; 2] {
        self.stack.blend_parameters()
    }

    pub fn is_mirrored(&self) -> bool {
        self.stack.is_mirrored()
    }

    pub fn is_looping(&self) -> bool {
        self.stack.is_looping()
    }

    pub fn remaining_time(&self) -> f32 {
        self.stack.remaining_time()
    }
}
