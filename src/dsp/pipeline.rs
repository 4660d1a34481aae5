//! Processing pipeline: chains stages over one PCM buffer.
//!
//! Stages run strictly in sequence, each consuming the previous stage's full
//! buffer. After every stage the buffer is checked for NaN/Inf; a structurally
//! invalid signal is fatal to the conversion rather than papered over. The
//! rate-change stages (Oversampler, Decimator) also live here.

use log::debug;

use crate::buffer::PcmBuffer;
use crate::error::PipelineError;

use super::resample::resample;

/// One processing block in the chain.
pub trait Stage {
    fn name(&self) -> &'static str;
    fn process(&mut self, pcm: &mut PcmBuffer) -> Result<(), PipelineError>;
}

/// Sequential stage runner with per-stage integrity checks.
pub struct AudioPipeline {
    stages: Vec<Box<dyn Stage>>,
}

impl AudioPipeline {
    pub fn new(stages: Vec<Box<dyn Stage>>) -> Self {
        AudioPipeline { stages }
    }

    pub fn process(&mut self, pcm: &mut PcmBuffer) -> Result<(), PipelineError> {
        if pcm.frames() == 0 {
            return Err(PipelineError::new("pipeline", "zero-length input buffer"));
        }
        for stage in &mut self.stages {
            stage.process(pcm)?;
            if pcm.frames() == 0 {
                return Err(PipelineError::new(stage.name(), "stage emptied the buffer"));
            }
            if pcm.has_non_finite() {
                return Err(PipelineError::new(stage.name(), "produced non-finite samples"));
            }
            debug!(
                "{}: {} frames x {} channels",
                stage.name(),
                pcm.frames(),
                pcm.channels()
            );
        }
        Ok(())
    }
}

/// Upsamples every channel by an integer factor with band-limited polyphase
/// interpolation, giving the nonlinear stages headroom above the audio band.
#[derive(Debug, Clone, Copy)]
pub struct Oversampler {
    factor: usize,
}

impl Oversampler {
    pub fn new(factor: usize) -> Result<Self, PipelineError> {
        if factor == 0 {
            return Err(PipelineError::new("oversample", "factor must be at least 1"));
        }
        Ok(Oversampler { factor })
    }
}

impl Stage for Oversampler {
    fn name(&self) -> &'static str {
        "oversample"
    }

    fn process(&mut self, pcm: &mut PcmBuffer) -> Result<(), PipelineError> {
        if self.factor == 1 {
            return Ok(());
        }
        let mut channels = Vec::with_capacity(pcm.channels());
        for ch in pcm.iter_channels() {
            channels.push(resample(ch, self.factor, 1)?);
        }
        pcm.replace(channels);
        Ok(())
    }
}

/// Restores the original rate by plain every-F-th-sample selection. The
/// anti-alias stage ahead of it is the only band limiting; the factor must
/// equal the oversampling factor or pitch is corrupted.
#[derive(Debug, Clone, Copy)]
pub struct Decimator {
    factor: usize,
}

impl Decimator {
    pub fn new(factor: usize) -> Result<Self, PipelineError> {
        if factor == 0 {
            return Err(PipelineError::new("decimate", "factor must be at least 1"));
        }
        Ok(Decimator { factor })
    }
}

impl Stage for Decimator {
    fn name(&self) -> &'static str {
        "decimate"
    }

    fn process(&mut self, pcm: &mut PcmBuffer) -> Result<(), PipelineError> {
        if self.factor == 1 {
            return Ok(());
        }
        let channels = pcm
            .iter_channels()
            .map(|ch| ch.iter().copied().step_by(self.factor).collect())
            .collect();
        pcm.replace(channels);
        Ok(())
    }
}
