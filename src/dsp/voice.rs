//! Voice: the ephemeral render task for one note.
//!
//! A voice is created per matched NoteOn, renders a mono sine waveform shaped
//! by the ADSR envelope and velocity gain, and is destroyed once its samples
//! are merged into the master buffer.

use std::f64::consts::PI;

use crate::config::AdsrParams;
use crate::error::ParameterError;

use super::envelope::adsr_envelope;

/// One note scheduled for rendering.
#[derive(Debug, Clone)]
pub struct Voice {
    pub note: u8,
    /// Oscillator frequency, 440·2^((note-69)/12).
    pub frequency: f64,
    /// Offset into the master buffer where this voice starts.
    pub start_sample: usize,
    pub duration_sec: f64,
    /// Velocity gain, velocity / 127.
    pub gain: f32,
}

impl Voice {
    /// Render the mono waveform: sine oscillator × envelope × gain.
    /// The oscillator and envelope are trimmed to the shorter of the two.
    pub fn render(&self, sample_rate: f64, adsr: &AdsrParams) -> Result<Vec<f32>, ParameterError> {
        if !self.frequency.is_finite() || self.frequency <= 0.0 {
            return Err(ParameterError::new(
                "frequency",
                format!("must be positive and finite, got {}", self.frequency),
            ));
        }

        let num_samples = (self.duration_sec * sample_rate) as usize;
        let envelope = adsr_envelope(self.duration_sec, sample_rate, adsr)?;
        let len = num_samples.min(envelope.len());

        let step = self.duration_sec / num_samples as f64;
        let mut wave = Vec::with_capacity(len);
        for i in 0..len {
            let t = i as f64 * step;
            let tone = (2.0 * PI * self.frequency * t).sin() as f32;
            wave.push(tone * envelope[i] * self.gain);
        }
        Ok(wave)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn voice(freq: f64, duration: f64, gain: f32) -> Voice {
        Voice {
            note: 69,
            frequency: freq,
            start_sample: 0,
            duration_sec: duration,
            gain,
        }
    }

    #[test]
    fn render_length_matches_duration() {
        let wave = voice(440.0, 0.5, 1.0).render(48000.0, &AdsrParams::default()).unwrap();
        assert_eq!(wave.len(), 24000);
    }

    #[test]
    fn render_is_deterministic() {
        let v = voice(440.0, 0.25, 0.5);
        let a = v.render(44100.0, &AdsrParams::default()).unwrap();
        let b = v.render(44100.0, &AdsrParams::default()).unwrap();
        assert_eq!(a, b, "identical parameters must produce bit-identical output");
    }

    #[test]
    fn gain_scales_amplitude() {
        let adsr = AdsrParams::default();
        let loud = voice(440.0, 0.5, 1.0).render(44100.0, &adsr).unwrap();
        let quiet = voice(440.0, 0.5, 0.5).render(44100.0, &adsr).unwrap();
        let peak = |w: &[f32]| w.iter().fold(0.0_f32, |m, &s| m.max(s.abs()));
        let ratio = peak(&quiet) / peak(&loud);
        assert!((ratio - 0.5).abs() < 1e-3, "half gain should halve the peak, got {ratio}");
    }

    #[test]
    fn rejects_invalid_frequency() {
        assert!(voice(0.0, 0.5, 1.0).render(44100.0, &AdsrParams::default()).is_err());
        assert!(voice(f64::NAN, 0.5, 1.0).render(44100.0, &AdsrParams::default()).is_err());
    }

    #[test]
    fn output_stays_within_gain() {
        let wave = voice(880.0, 0.3, 0.8).render(44100.0, &AdsrParams::default()).unwrap();
        for &s in &wave {
            assert!(s.abs() <= 0.8 + 1e-6, "sample exceeds velocity gain: {s}");
        }
    }
}
