//! Band-limited rational resampling.
//!
//! Polyphase evaluation of a Kaiser-window lowpass interpolator: the signal
//! is conceptually zero-stuffed by `up`, filtered, and decimated by `down`,
//! but only the taps that land on real input samples are ever touched. The
//! kernel's group delay is compensated so the output stays time-aligned with
//! the input. Output length is `ceil(n * up / down)` and the whole operation
//! is deterministic for identical input.

use crate::error::PipelineError;

use super::filter::firwin_lowpass;

/// Kernel half-length per unit rate; total taps are `2 * 10 * max(up, down) + 1`.
const HALF_LEN_PER_RATE: usize = 10;

/// Shape parameter for the resampling prototype's Kaiser window.
const PROTOTYPE_BETA: f64 = 5.0;

fn gcd(mut a: usize, mut b: usize) -> usize {
    while b != 0 {
        let t = a % b;
        a = b;
        b = t;
    }
    a
}

/// Resample `input` by the rational factor `up / down`.
pub fn resample(input: &[f32], up: usize, down: usize) -> Result<Vec<f32>, PipelineError> {
    if up == 0 || down == 0 {
        return Err(PipelineError::new(
            "resample",
            format!("rate factors must be positive, got {up}/{down}"),
        ));
    }
    let g = gcd(up, down);
    let (up, down) = (up / g, down / g);
    if up == 1 && down == 1 {
        return Ok(input.to_vec());
    }
    let n = input.len();
    if n == 0 {
        return Ok(Vec::new());
    }

    let max_rate = up.max(down);
    let half_len = HALF_LEN_PER_RATE * max_rate;
    let taps = 2 * half_len + 1;
    // Cut at the tighter of the two Nyquists, in units of the upsampled rate.
    let cutoff = 1.0 / max_rate as f64;
    let mut kernel = firwin_lowpass(taps, cutoff, PROTOTYPE_BETA)?;
    // Interpolation gain: zero-stuffing divides the energy by `up`.
    for k in kernel.iter_mut() {
        *k *= up as f64;
    }

    let out_len = (n * up + down - 1) / down;
    let mut out = Vec::with_capacity(out_len);
    for m in 0..out_len {
        // Position on the upsampled grid, shifted by the kernel's group delay.
        let center = m * down + half_len;
        let i_lo = (center + 1).saturating_sub(taps).div_ceil(up);
        let i_hi = (center / up).min(n - 1);
        let mut acc = 0.0_f64;
        for i in i_lo..=i_hi {
            acc += kernel[center - i * up] * input[i] as f64;
        }
        out.push(acc as f32);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    fn sine(freq: f64, sample_rate: f64, n: usize) -> Vec<f32> {
        (0..n)
            .map(|i| (2.0 * PI * freq * i as f64 / sample_rate).sin() as f32)
            .collect()
    }

    /// Dominant frequency by zero-crossing count, ignoring filter edges.
    fn dominant_freq(signal: &[f32], sample_rate: f64) -> f64 {
        let trim = signal.len() / 10;
        let body = &signal[trim..signal.len() - trim];
        let crossings = body
            .windows(2)
            .filter(|w| (w[0] >= 0.0) != (w[1] >= 0.0))
            .count();
        crossings as f64 / 2.0 * sample_rate / body.len() as f64
    }

    #[test]
    fn upsample_length_is_exact_multiple() {
        let x = sine(440.0, 8000.0, 800);
        let y = resample(&x, 8, 1).unwrap();
        assert_eq!(y.len(), 6400);
    }

    #[test]
    fn round_trip_length_within_factor() {
        let x = sine(440.0, 8000.0, 801);
        let up = resample(&x, 4, 1).unwrap();
        let down: Vec<f32> = up.iter().copied().step_by(4).collect();
        assert!(
            (down.len() as isize - 801).unsigned_abs() < 4,
            "round-trip length should match within the factor, got {}",
            down.len()
        );
    }

    #[test]
    fn upsample_preserves_tone_frequency() {
        let x = sine(440.0, 8000.0, 4000);
        let y = resample(&x, 4, 1).unwrap();
        let f = dominant_freq(&y, 32000.0);
        assert!((f - 440.0).abs() < 5.0, "tone should survive upsampling, got {f} Hz");
    }

    #[test]
    fn downsample_preserves_tone_frequency() {
        let x = sine(440.0, 32000.0, 16000);
        let y = resample(&x, 1, 4).unwrap();
        let f = dominant_freq(&y, 8000.0);
        assert!((f - 440.0).abs() < 5.0, "tone should survive downsampling, got {f} Hz");
    }

    #[test]
    fn rational_ratio_hits_requested_length() {
        let x = sine(440.0, 8000.0, 8000);
        // Stretch to exactly 12000 samples: up/down = 12000/8000 = 3/2.
        let y = resample(&x, 12000, 8000).unwrap();
        assert_eq!(y.len(), 12000);
    }

    #[test]
    fn amplitude_is_preserved() {
        let x = sine(440.0, 8000.0, 4000);
        let y = resample(&x, 4, 1).unwrap();
        let trim = y.len() / 10;
        let peak = y[trim..y.len() - trim]
            .iter()
            .fold(0.0_f32, |m, &s| m.max(s.abs()));
        assert!((peak - 1.0).abs() < 0.02, "interpolation gain should hold amplitude, got {peak}");
    }

    #[test]
    fn deterministic_for_identical_input() {
        let x = sine(440.0, 8000.0, 1000);
        assert_eq!(resample(&x, 8, 1).unwrap(), resample(&x, 8, 1).unwrap());
    }

    #[test]
    fn unity_ratio_is_passthrough() {
        let x = sine(440.0, 8000.0, 100);
        assert_eq!(resample(&x, 3, 3).unwrap(), x);
    }

    #[test]
    fn empty_input_yields_empty_output() {
        assert!(resample(&[], 8, 1).unwrap().is_empty());
    }

    #[test]
    fn rejects_zero_factors() {
        assert!(resample(&[0.0; 4], 0, 1).is_err());
        assert!(resample(&[0.0; 4], 1, 0).is_err());
    }
}
