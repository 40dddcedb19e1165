//! 2D blend space: the built-in [`BlendSpaceAsset`].
//!
//! Samples are weighted by normalised inverse squared distance to the query point. A
//! query that lands on a sample takes that sample alone.

use std::sync::Arc;

use super::{BlendSpaceAsset, SequenceAsset};
use crate::asset::Clip;
use crate::blend::blend_uniform;
use crate::pose::PoseContext;
use crate::skeleton::EvalContext;

const EXACT_HIT_DIST2: f32 = 1e-8;

#[derive(Clone, Debug)]
pub struct BlendSample {
    pub position: [f32; 2],
    pub clip: Arc<Clip>,
}

#[derive(Clone, Debug)]
pub struct BlendSpace2d {
    pub name: String,
    pub samples: Vec<BlendSample>,
}

/// How raw inverse distances turn into normalised weights at one query point.
#[derive(Clone, Copy)]
enum Normaliser {
    Exact(usize),
    Total(f32),
}

#[inline]
fn dist2(a: [f32; 2], b: [f32; 2]) -> f32 {
    let dx = a[0] - b[0];
    let dy = a[1] - b[1];
    dx * dx + dy * dy
}

impl BlendSpace2d {
    pub fn new(name: &str, samples: Vec<BlendSample>) -> Self {
        Self {
            name: name.to_string(),
            samples,
        }
    }

    fn normaliser(&self, params: [f32; 2]) -> Normaliser {
        let mut total = 0.0;
        for (i, sample) in self.samples.iter().enumerate() {
            let d2 = dist2(sample.position, params);
            if d2 <= EXACT_HIT_DIST2 {
                return Normaliser::Exact(i);
            }
            total += d2.recip();
        }
        Normaliser::Total(total)
    }

    fn weight(&self, norm: Normaliser, index: usize, params: [f32; 2]) -> f32 {
        match norm {
            Normaliser::Exact(hit) if hit == index => 1.0,
            Normaliser::Exact(_) => 0.0,
            Normaliser::Total(total) if total > 0.0 => {
                dist2(self.samples[index].position, params).recip() / total
            }
            Normaliser::Total(_) => 0.0,
        }
    }

    /// Per-sample weights at `params`; sums to 1 unless the space is empty.
    pub fn weights(&self, params: [f32; 2]) -> Vec<f32> {
        let norm = self.normaliser(params);
        (0..self.samples.len())
            .map(|i| self.weight(norm, i, params))
            .collect()
    }
}

impl BlendSpaceAsset for BlendSpace2d {
    fn name(&self) -> &str {
        &self.name
    }

    fn length(&self, params: [f32; 2]) -> f32 {
        let norm = self.normaliser(params);
        self.samples
            .iter()
            .enumerate()
            .map(|(i, s)| self.weight(norm, i, params) * s.clip.duration)
            .sum()
    }

    fn sample(
        &self,
        normalized_time: f32,
        params: [f32; 2],
        ctx: &EvalContext,
        scratch: &mut PoseContext,
        out: &mut PoseContext,
    ) {
        let norm = self.normaliser(params);
        let mut accumulated = 0.0;
        for (i, sample) in self.samples.iter().enumerate() {
            let w = self.weight(norm, i, params);
            if w <= 0.0 {
                continue;
            }
            let time = normalized_time.clamp(0.0, 1.0) * sample.clip.duration;
            if accumulated == 0.0 {
                sample.clip.sample(time, ctx, out);
            } else {
                sample.clip.sample(time, ctx, scratch);
                blend_uniform(out, scratch, w / (accumulated + w));
            }
            accumulated += w;
        }
        if accumulated == 0.0 {
            out.reset_to_ref_pose(ctx);
        }
    }
}
