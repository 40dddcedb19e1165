//! Per-frame sample traces for debugging overlays and telemetry.
//!
//! Traces are observational only. Nothing in evaluation reads them back.

use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SampleTrace {
    pub frame: u64,
    pub index: usize,
    /// Asset name, or `None` for a frozen/empty sample.
    pub asset: Option<String>,
    pub accumulated_time: f32,
    pub blend_in_time: f32,
    pub total_blend_in_time: f32,
    pub time_to_activation: f32,
    pub mirrored: bool,
    pub frozen: bool,
}

pub trait TraceSink {
    fn record(&mut self, trace: SampleTrace);
}

impl TraceSink for Vec<SampleTrace> {
    fn record(&mut self, trace: SampleTrace) {
        self.push(trace);
    }
}

/// Writes each trace as one JSON object at `trace` level.
#[derive(Clone, Copy, Debug, Default)]
pub struct LogTraceSink;

impl TraceSink for LogTraceSink {
    fn record(&mut self, trace: SampleTrace) {
        match serde_json::to_string(&trace) {
            Ok(json) => log::trace!(target: "blend_stack", "{json}"),
            Err(err) => log::warn!("failed to serialise sample trace: {err}"),
        }
    }
}
