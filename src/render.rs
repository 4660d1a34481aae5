//! Renderer: the orchestrator tying synthesis, mastering, and hand-off.
//!
//! Fixed stage order: synthesize → oversample → anti-alias → dynamics →
//! normalize+dither → decimate → reverb → EQ → optional time-stretch →
//! encoders. The renderer owns the PCM buffer for the whole conversion and
//! the encoders only ever see it read-only.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use log::{debug, info};
use rand::SeedableRng;
use rand_pcg::Pcg32;

use crate::buffer::PcmBuffer;
use crate::config::RenderConfig;
use crate::dsp::dynamics::DynamicsProcessor;
use crate::dsp::eq::ParametricEq;
use crate::dsp::filter::AntiAliasFilter;
use crate::dsp::normalize::Normalizer;
use crate::dsp::pipeline::{AudioPipeline, Decimator, Oversampler, Stage};
use crate::dsp::resample::resample;
use crate::dsp::reverb::Reverb;
use crate::dsp::synth::Synthesizer;
use crate::encoder::{encode_all, Encoder};
use crate::error::{EncodeError, NoteloomError, PipelineError};
use crate::event::{Event, EventKind};

/// Extra render time after the last event, so releases and reverb
/// onsets are not cut off.
const TAIL_SEC: f64 = 0.5;

/// Separates the reverb-tail RNG stream from the dither stream.
const REVERB_SEED_TAG: u64 = 0x7265_7665_7262_0000;

pub struct Renderer {
    config: RenderConfig,
}

impl Renderer {
    /// Validates the configuration; rejects bad parameters before any
    /// processing starts.
    pub fn new(config: RenderConfig) -> Result<Self, NoteloomError> {
        config.validate()?;
        Ok(Renderer { config })
    }

    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    /// Apply transposition to note events and the tempo override to tempo
    /// events, leaving everything else untouched.
    fn prepare_events(&self, events: &[Event]) -> Vec<Event> {
        let mut prepared = events.to_vec();
        for event in &mut prepared {
            if let Some(note) = event.note {
                let shifted = (note as i32 + self.config.transposition).clamp(0, 127);
                event.note = Some(shifted as u8);
            }
            if event.kind == EventKind::Tempo {
                event.value = Some(self.config.tempo);
            }
        }
        prepared
    }

    /// Total render length: the later of the configured minimum and the
    /// last event plus the tail.
    fn derive_duration(&self, events: &[Event]) -> f64 {
        match events.last() {
            Some(last) => self
                .config
                .default_duration_sec
                .max(last.time_sec() + TAIL_SEC),
            None => self.config.default_duration_sec,
        }
    }

    /// Run the full synthesis + mastering chain, returning the finalized
    /// buffer and leaving the encoders to the caller.
    pub fn render(&self, events: &[Event]) -> Result<PcmBuffer, NoteloomError> {
        let cfg = &self.config;
        let events = self.prepare_events(events);
        let duration_sec = self.derive_duration(&events);
        let sample_rate = cfg.sample_rate as f64;
        info!(
            "rendering {} events: {:.2} s at {} Hz, {} channels",
            events.len(),
            duration_sec,
            cfg.sample_rate,
            cfg.channels
        );

        let synth = Synthesizer::new(
            sample_rate,
            cfg.channels,
            duration_sec,
            cfg.adsr,
            cfg.default_note_duration_sec,
        )?;
        let mut pcm = synth.render(&events);

        let stages: Vec<Box<dyn Stage>> = vec![
            Box::new(Oversampler::new(cfg.oversample_factor)?),
            Box::new(AntiAliasFilter::new(
                cfg.filter_taps,
                cfg.filter_cutoff,
                cfg.filter_beta,
            )?),
            Box::new(DynamicsProcessor::new(
                cfg.dynamics_threshold,
                cfg.dynamics_ratio,
            )?),
            Box::new(Normalizer::new(
                cfg.dither_amplitude,
                Pcg32::seed_from_u64(cfg.seed),
            )?),
            Box::new(Decimator::new(cfg.oversample_factor)?),
            Box::new(Reverb::new(
                sample_rate,
                cfg.reverb.clone(),
                Pcg32::seed_from_u64(cfg.seed ^ REVERB_SEED_TAG),
            )?),
            Box::new(ParametricEq::new(sample_rate, cfg.eq_bands.clone())?),
        ];
        AudioPipeline::new(stages).process(&mut pcm)?;

        if let Some(target_sec) = cfg.target_duration_sec {
            time_stretch(&mut pcm, target_sec, sample_rate)?;
        }

        debug!(
            "render finished: {} frames x {} channels, peak {:.4}",
            pcm.frames(),
            pcm.channels(),
            pcm.peak()
        );
        Ok(pcm)
    }

    /// Render and hand the finalized buffer to every requested encoder.
    /// Encode results are isolated per format; only render failures abort.
    pub fn render_to_files(
        &self,
        events: &[Event],
        encoders: &[Box<dyn Encoder>],
        out_dir: &Path,
        stem: &str,
    ) -> Result<HashMap<String, Result<PathBuf, EncodeError>>, NoteloomError> {
        let pcm = self.render(events)?;
        Ok(encode_all(
            encoders,
            &pcm,
            self.config.sample_rate,
            out_dir,
            stem,
        ))
    }
}

/// Resample every channel so the buffer lasts `target_sec`. Plain rate
/// conversion, so pitch shifts with the ratio.
fn time_stretch(
    pcm: &mut PcmBuffer,
    target_sec: f64,
    sample_rate: f64,
) -> Result<(), PipelineError> {
    let frames = pcm.frames();
    if frames == 0 {
        return Err(PipelineError::new("time-stretch", "zero-length input buffer"));
    }
    let current_sec = frames as f64 / sample_rate;
    let new_frames = (frames as f64 * target_sec / current_sec).round() as usize;
    if new_frames == 0 {
        return Err(PipelineError::new(
            "time-stretch",
            format!("target duration {target_sec} s collapses the buffer"),
        ));
    }
    if new_frames == frames {
        return Ok(());
    }
    info!(
        "time-stretching from {:.2} s to {:.2} s",
        current_sec, target_sec
    );
    let mut channels = Vec::with_capacity(pcm.channels());
    for ch in pcm.iter_channels() {
        channels.push(resample(ch, new_frames, frames)?);
    }
    pcm.replace(channels);
    Ok(())
}
