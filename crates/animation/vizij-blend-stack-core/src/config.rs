//! Configuration for the blend stack, its driver, and the stitch planner.
//!
//! Every value here is plain data so hosts can keep it in their own settings files
//! (JSON/RON) and thread it through explicitly; nothing is read from process globals.

use serde::{Deserialize, Serialize};

/// Sizing and policy knobs for a [`BlendStack`](crate::stack::BlendStack).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BlendStackConfig {
    /// Maximum number of asset-driven samples that may blend at once. `0` turns the
    /// stack into a single-sample player (pair it with an external inertial blend).
    pub max_active_blends: usize,
    /// When the stack overflows, freeze the accumulated overflow into the oldest
    /// retained slot instead of dropping it.
    pub store_evicted_pose: bool,
    /// A slot-0 sample that has blended in for less than this many seconds is
    /// overwritten in place instead of pushed down the stack.
    pub max_blend_in_time_to_override: f32,
    /// Blend timers of buried samples (stack index `i > 0`) advance `multiplier^(i + 1)` times faster.
    pub depth_blend_multiplier: f32,
    /// Remaining top-down weight below which older samples are pruned.
    pub zero_weight_threshold: f32,
    /// Blend durations at or below this are treated as instantaneous.
    pub zero_time_threshold: f32,
    /// `false` evaluates only the newest sample (debug/comparison path).
    pub enabled: bool,
    /// Capacity hint for per-instance scratch buffers (bones).
    pub scratch_bones: usize,
}

impl Default for BlendStackConfig {
    fn default() -> Self {
        Self {
            max_active_blends: 4,
            store_evicted_pose: true,
            max_blend_in_time_to_override: 0.0,
            depth_blend_multiplier: 1.0,
            zero_weight_threshold: 1e-5,
            zero_time_threshold: 1e-4,
            enabled: true,
            scratch_bones: 128,
        }
    }
}

/// Change-detection policy for [`BlendStackDriver`](crate::driver::BlendStackDriver).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DriverConfig {
    /// Blend-space parameter drift that forces a new insertion (compared squared).
    pub blend_params_threshold: f32,
    /// Maximum tolerated |requested - playing| time; negative disables the check.
    pub max_time_desync: f32,
    /// Empty the stack when the frame counter breaks sequence (skipped, repeated or restarted frames).
    pub reset_on_becoming_relevant: bool,
    /// Emit per-sample traces to the driver's trace sink each update.
    pub emit_trace: bool,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            blend_params_threshold: 0.1,
            max_time_desync: -1.0,
            reset_on_becoming_relevant: true,
            emit_trace: false,
        }
    }
}

/// Acceptance policy for [`StitchPlanner`](crate::stitch::StitchPlanner).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StitchConfig {
    /// Seconds the connector clip blends in over (and the target after it).
    pub blend_time: f32,
    /// Candidates costing more than this are rejected.
    pub max_cost: f32,
}

impl Default for StitchConfig {
    fn default() -> Self {
        Self {
            blend_time: 0.2,
            max_cost: 100.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_fills_defaults() {
        let cfg: BlendStackConfig =
            serde_json::from_str(r#"{ "max_active_blends": 1, "enabled": false }"#).unwrap();
        assert_eq!(cfg.max_active_blends, 1);
        assert!(!cfg.enabled);
        assert!(cfg.store_evicted_pose);
        assert_eq!(cfg.depth_blend_multiplier, 1.0);
    }

    #[test]
    fn driver_desync_disabled_by_default() {
        assert!(DriverConfig::default().max_time_desync < 0.0);
    }
}
