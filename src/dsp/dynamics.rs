//! Dynamics processor: static soft-knee peak limiting.
//!
//! No lookahead and no attack/release smoothing: each sample above the
//! threshold is compressed by the static curve
//! `sign(x) * (T + (|x| - T) / ratio)`, everything below passes untouched.
//! The curve is intentionally not first-derivative-continuous at the
//! threshold; downstream behavior depends on that exact shape.

use crate::buffer::PcmBuffer;
use crate::error::PipelineError;

use super::pipeline::Stage;

#[derive(Debug, Clone, Copy)]
pub struct DynamicsProcessor {
    pub threshold: f32,
    pub ratio: f32,
}

impl DynamicsProcessor {
    pub fn new(threshold: f32, ratio: f32) -> Result<Self, PipelineError> {
        if !(threshold > 0.0 && threshold <= 1.0) {
            return Err(PipelineError::new(
                "dynamics",
                format!("threshold must be in (0, 1], got {threshold}"),
            ));
        }
        if ratio < 1.0 {
            return Err(PipelineError::new(
                "dynamics",
                format!("ratio must be at least 1, got {ratio}"),
            ));
        }
        Ok(DynamicsProcessor { threshold, ratio })
    }

    #[inline]
    fn limit(&self, x: f32) -> f32 {
        let magnitude = x.abs();
        if magnitude > self.threshold {
            x.signum() * (self.threshold + (magnitude - self.threshold) / self.ratio)
        } else {
            x
        }
    }
}

impl Stage for DynamicsProcessor {
    fn name(&self) -> &'static str {
        "dynamics"
    }

    fn process(&mut self, pcm: &mut PcmBuffer) -> Result<(), PipelineError> {
        let this = *self;
        pcm.for_each_sample_mut(|s| *s = this.limit(*s));
        Ok(())
    }
}
