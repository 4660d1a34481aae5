//! Normalizer: global peak normalization followed by TPDF dither.
//!
//! The peak is taken across all samples and channels; an all-zero buffer is
//! left untouched. Dither is the sum of two independent uniform draws in
//! `[-d, d)` per sample, added after scaling, from an injected seedable RNG
//! so renders are reproducible.

use rand::Rng;
use rand_pcg::Pcg32;

use crate::buffer::PcmBuffer;
use crate::error::PipelineError;

use super::pipeline::Stage;

#[derive(Debug, Clone)]
pub struct Normalizer {
    dither_amplitude: f32,
    rng: Pcg32,
}

impl Normalizer {
    pub fn new(dither_amplitude: f32, rng: Pcg32) -> Result<Self, PipelineError> {
        if dither_amplitude < 0.0 {
            return Err(PipelineError::new(
                "normalize",
                format!("dither amplitude must be non-negative, got {dither_amplitude}"),
            ));
        }
        Ok(Normalizer {
            dither_amplitude,
            rng,
        })
    }
}

impl Stage for Normalizer {
    fn name(&self) -> &'static str {
        "normalize"
    }

    fn process(&mut self, pcm: &mut PcmBuffer) -> Result<(), PipelineError> {
        let peak = pcm.peak();
        if peak > 0.0 {
            let inv = 1.0 / peak;
            pcm.for_each_sample_mut(|s| *s *= inv);
        }

        let d = self.dither_amplitude;
        if d > 0.0 {
            let rng = &mut self.rng;
            pcm.for_each_sample_mut(|s| {
                let noise = rng.gen_range(-d..d) + rng.gen_range(-d..d);
                *s += noise;
            });
        }
        Ok(())
    }
}
