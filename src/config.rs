//! Render configuration: the options record handed down by the caller.
//!
//! All fields have defaults matching the reference converter, so an empty
//! `{}` deserializes to a usable configuration. `validate()` rejects
//! out-of-range values before any processing starts.

use serde::{Deserialize, Serialize};

use crate::error::ParameterError;

/// ADSR envelope parameters. Times in seconds, sustain as a level ratio.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct AdsrParams {
    pub attack: f64,
    pub decay: f64,
    pub sustain_level: f64,
    pub release: f64,
}

impl Default for AdsrParams {
    fn default() -> Self {
        AdsrParams {
            attack: 0.01,
            decay: 0.1,
            sustain_level: 0.7,
            release: 0.2,
        }
    }
}

/// Composite-impulse-response reverb parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReverbParams {
    /// Early reflection delays in milliseconds.
    pub early_delays_ms: Vec<f64>,
    /// Gain of each early reflection.
    pub early_decay: f32,
    /// Per-sample multiplicative decay of the noise tail.
    pub tail_decay: f64,
    /// Tail duration in seconds.
    pub tail_length_sec: f64,
    /// Wet/dry mix: 0 = dry passthrough, 1 = fully convolved.
    pub wet_mix: f32,
}

impl Default for ReverbParams {
    fn default() -> Self {
        ReverbParams {
            early_delays_ms: vec![20.0, 40.0, 60.0],
            early_decay: 0.6,
            tail_decay: 0.995,
            tail_length_sec: 1.5,
            wet_mix: 0.5,
        }
    }
}

/// One parametric EQ band (peaking/bell filter).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct EqBand {
    pub gain_db: f64,
    pub freq_hz: f64,
    pub q: f64,
}

impl Default for EqBand {
    fn default() -> Self {
        EqBand {
            gain_db: 3.0,
            freq_hz: 1000.0,
            q: 1.0,
        }
    }
}

/// Full configuration for one render.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    pub sample_rate: u32,
    pub channels: usize,
    /// Minimum total render length in seconds. The actual length is the
    /// later of this and the last event time + 0.5 s.
    pub default_duration_sec: f64,
    /// Fallback note length when a NoteOn has no matching NoteOff.
    pub default_note_duration_sec: f64,
    /// Semitone shift applied to every note event before synthesis.
    pub transposition: i32,
    /// Overrides the value of every Tempo event.
    pub tempo: f64,
    pub adsr: AdsrParams,
    pub oversample_factor: usize,
    /// Anti-alias FIR tap count. Must be odd.
    pub filter_taps: usize,
    /// Normalized cutoff, fraction of the oversampled Nyquist.
    pub filter_cutoff: f64,
    /// Kaiser window shape parameter.
    pub filter_beta: f64,
    pub dynamics_threshold: f32,
    pub dynamics_ratio: f32,
    pub dither_amplitude: f32,
    pub reverb: ReverbParams,
    /// EQ bands applied in order. Empty means the default single band.
    pub eq_bands: Vec<EqBand>,
    /// When set, the final buffer is resampled to this duration.
    /// This shifts pitch; it is a plain rate conversion, not a
    /// pitch-preserving stretch.
    pub target_duration_sec: Option<f64>,
    /// Seed for dither and reverb-tail noise. Same seed, same output.
    pub seed: u64,
}

impl Default for RenderConfig {
    fn default() -> Self {
        RenderConfig {
            sample_rate: 44100,
            channels: 2,
            default_duration_sec: 1.0,
            default_note_duration_sec: 0.5,
            transposition: 0,
            tempo: 120.0,
            adsr: AdsrParams::default(),
            oversample_factor: 8,
            filter_taps: 151,
            filter_cutoff: 0.45,
            filter_beta: 8.0,
            dynamics_threshold: 0.9,
            dynamics_ratio: 10.0,
            dither_amplitude: 1e-5,
            reverb: ReverbParams::default(),
            eq_bands: Vec::new(),
            target_duration_sec: None,
            seed: 0,
        }
    }
}

impl RenderConfig {
    /// Check every field against its documented range.
    pub fn validate(&self) -> Result<(), ParameterError> {
        if self.sample_rate == 0 {
            return Err(ParameterError::new("sample_rate", "must be positive"));
        }
        if self.channels == 0 {
            return Err(ParameterError::new("channels", "must be at least 1"));
        }
        if self.default_duration_sec <= 0.0 {
            return Err(ParameterError::new("default_duration_sec", "must be positive"));
        }
        if self.default_note_duration_sec <= 0.0 {
            return Err(ParameterError::new(
                "default_note_duration_sec",
                "must be positive",
            ));
        }
        if self.oversample_factor == 0 {
            return Err(ParameterError::new("oversample_factor", "must be at least 1"));
        }
        if self.filter_taps == 0 || self.filter_taps % 2 == 0 {
            return Err(ParameterError::new(
                "filter_taps",
                format!("must be odd and at least 1, got {}", self.filter_taps),
            ));
        }
        if !(self.filter_cutoff > 0.0 && self.filter_cutoff < 1.0) {
            return Err(ParameterError::new(
                "filter_cutoff",
                format!("must be in (0, 1), got {}", self.filter_cutoff),
            ));
        }
        if self.filter_beta < 0.0 {
            return Err(ParameterError::new("filter_beta", "must be non-negative"));
        }
        if !(self.dynamics_threshold > 0.0 && self.dynamics_threshold <= 1.0) {
            return Err(ParameterError::new(
                "dynamics_threshold",
                format!("must be in (0, 1], got {}", self.dynamics_threshold),
            ));
        }
        if self.dynamics_ratio < 1.0 {
            return Err(ParameterError::new("dynamics_ratio", "must be at least 1"));
        }
        if self.dither_amplitude < 0.0 {
            return Err(ParameterError::new("dither_amplitude", "must be non-negative"));
        }
        for &delay_ms in &self.reverb.early_delays_ms {
            // A negative delay would truncate to index 0 and overwrite the
            // direct-path impulse.
            if !(delay_ms.is_finite() && delay_ms >= 0.0) {
                return Err(ParameterError::new(
                    "reverb.early_delays_ms",
                    format!("delays must be finite and non-negative, got {delay_ms}"),
                ));
            }
        }
        if self.reverb.tail_length_sec < 0.0 {
            return Err(ParameterError::new(
                "reverb.tail_length_sec",
                "must be non-negative",
            ));
        }
        if !(0.0..=1.0).contains(&self.reverb.wet_mix) {
            return Err(ParameterError::new(
                "reverb.wet_mix",
                format!("must be in [0, 1], got {}", self.reverb.wet_mix),
            ));
        }
        let nyquist = self.sample_rate as f64 / 2.0;
        for band in &self.eq_bands {
            if !(band.freq_hz > 0.0 && band.freq_hz < nyquist) {
                return Err(ParameterError::new(
                    "eq_bands.freq_hz",
                    format!("must be in (0, {nyquist}), got {}", band.freq_hz),
                ));
            }
            if band.q <= 0.0 {
                return Err(ParameterError::new("eq_bands.q", "must be positive"));
            }
        }
        if let Some(t) = self.target_duration_sec {
            if t <= 0.0 {
                return Err(ParameterError::new("target_duration_sec", "must be positive"));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(RenderConfig::default().validate().is_ok());
    }

    #[test]
    fn rejects_zero_sample_rate() {
        let cfg = RenderConfig {
            sample_rate: 0,
            ..Default::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn rejects_even_filter_taps() {
        let cfg = RenderConfig {
            filter_taps: 150,
            ..Default::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn rejects_negative_early_delay() {
        let cfg = RenderConfig {
            reverb: ReverbParams {
                early_delays_ms: vec![20.0, -5.0],
                ..Default::default()
            },
            ..Default::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn rejects_eq_band_above_nyquist() {
        let cfg = RenderConfig {
            eq_bands: vec![EqBand {
                freq_hz: 30_000.0,
                ..Default::default()
            }],
            ..Default::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn empty_json_deserializes_to_defaults() {
        let cfg: RenderConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(cfg.sample_rate, 44100);
        assert_eq!(cfg.channels, 2);
        assert_eq!(cfg.oversample_factor, 8);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn partial_json_overrides() {
        let cfg: RenderConfig =
            serde_json::from_str(r#"{"sample_rate": 48000, "channels": 1}"#).unwrap();
        assert_eq!(cfg.sample_rate, 48000);
        assert_eq!(cfg.channels, 1);
        assert_eq!(cfg.filter_taps, 151);
    }
}
