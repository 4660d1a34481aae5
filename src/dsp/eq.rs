//! Parametric EQ: a cascade of peaking biquads.
//!
//! Bands apply sequentially per channel in configured order. Ordering affects
//! numerical rounding but is not corrected for. When no bands are configured
//! a single default band (+3 dB at 1 kHz, Q = 1) is used.

use crate::buffer::PcmBuffer;
use crate::config::EqBand;
use crate::error::PipelineError;

use super::filter::Biquad;
use super::pipeline::Stage;

pub struct ParametricEq {
    sample_rate: f64,
    bands: Vec<EqBand>,
}

impl ParametricEq {
    pub fn new(sample_rate: f64, bands: Vec<EqBand>) -> Result<Self, PipelineError> {
        if sample_rate <= 0.0 {
            return Err(PipelineError::new("eq", "sample rate must be positive"));
        }
        let bands = if bands.is_empty() {
            vec![EqBand::default()]
        } else {
            bands
        };
        // Design each band up front so a bad configuration fails before
        // any audio is touched.
        for band in &bands {
            Biquad::peaking(sample_rate, band.freq_hz, band.q, band.gain_db)?;
        }
        Ok(ParametricEq { sample_rate, bands })
    }
}

impl Stage for ParametricEq {
    fn name(&self) -> &'static str {
        "eq"
    }

    fn process(&mut self, pcm: &mut PcmBuffer) -> Result<(), PipelineError> {
        for band in &self.bands {
            let mut biquad = Biquad::peaking(self.sample_rate, band.freq_hz, band.q, band.gain_db)?;
            for ch in pcm.iter_channels_mut() {
                biquad.process_channel(ch);
            }
        }
        Ok(())
    }
}
