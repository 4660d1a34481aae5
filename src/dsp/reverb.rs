//! Convolution reverb: composite impulse response applied by FFT.
//!
//! The impulse response is built at the post-decimation sample rate from two
//! parts: early reflections (unit direct impulse plus one attenuated impulse
//! per configured delay) and a late tail of exponentially shaped noise. Each
//! part is peak-normalized on its own, then the two are summed with no
//! renormalization: the combined peak may legitimately exceed 1, and that
//! headroom choice is part of the sound.

use rand_distr::{Distribution, Normal};
use rand_pcg::Pcg32;
use rustfft::{num_complex::Complex, FftPlanner};

use crate::buffer::PcmBuffer;
use crate::config::ReverbParams;
use crate::error::PipelineError;

use super::pipeline::Stage;

/// Full linear convolution (length `n + m - 1`) via FFT.
pub fn fft_convolve(signal: &[f32], kernel: &[f32]) -> Vec<f32> {
    if signal.is_empty() || kernel.is_empty() {
        return Vec::new();
    }
    let out_len = signal.len() + kernel.len() - 1;
    let fft_len = out_len.next_power_of_two();

    let mut planner = FftPlanner::<f64>::new();
    let fft = planner.plan_fft_forward(fft_len);
    let ifft = planner.plan_fft_inverse(fft_len);

    let mut a: Vec<Complex<f64>> = signal
        .iter()
        .map(|&s| Complex::new(s as f64, 0.0))
        .chain(std::iter::repeat(Complex::new(0.0, 0.0)))
        .take(fft_len)
        .collect();
    let mut b: Vec<Complex<f64>> = kernel
        .iter()
        .map(|&s| Complex::new(s as f64, 0.0))
        .chain(std::iter::repeat(Complex::new(0.0, 0.0)))
        .take(fft_len)
        .collect();

    fft.process(&mut a);
    fft.process(&mut b);
    for (x, y) in a.iter_mut().zip(&b) {
        *x *= y;
    }
    ifft.process(&mut a);

    let scale = 1.0 / fft_len as f64;
    a[..out_len].iter().map(|c| (c.re * scale) as f32).collect()
}

fn peak_normalize(ir: &mut [f32]) {
    let peak = ir.iter().fold(0.0_f32, |m, &s| m.max(s.abs()));
    if peak > 0.0 {
        for s in ir.iter_mut() {
            *s /= peak;
        }
    }
}

/// The reverb stage. Owns its RNG so the tail is reproducible per seed.
pub struct Reverb {
    sample_rate: f64,
    params: ReverbParams,
    rng: Pcg32,
}

impl Reverb {
    pub fn new(sample_rate: f64, params: ReverbParams, rng: Pcg32) -> Result<Self, PipelineError> {
        if sample_rate <= 0.0 {
            return Err(PipelineError::new("reverb", "sample rate must be positive"));
        }
        if !(0.0..=1.0).contains(&params.wet_mix) {
            return Err(PipelineError::new(
                "reverb",
                format!("wet mix must be in [0, 1], got {}", params.wet_mix),
            ));
        }
        Ok(Reverb {
            sample_rate,
            params,
            rng,
        })
    }

    /// Direct path plus one attenuated impulse per configured delay,
    /// normalized by its own peak.
    fn early_reflections(&self) -> Vec<f32> {
        let max_delay_ms = self
            .params
            .early_delays_ms
            .iter()
            .copied()
            .fold(0.0_f64, f64::max);
        let len = (max_delay_ms * self.sample_rate / 1000.0) as usize + 1;
        let mut ir = vec![0.0_f32; len];
        ir[0] = 1.0;
        for &delay_ms in &self.params.early_delays_ms {
            let idx = (delay_ms * self.sample_rate / 1000.0) as usize;
            if idx < len {
                ir[idx] = self.params.early_decay;
            }
        }
        peak_normalize(&mut ir);
        ir
    }

    /// Noise tail shaped by exp(-3t) and the per-sample decay factor,
    /// normalized by its own peak.
    fn late_tail(&mut self) -> Vec<f32> {
        let len = (self.params.tail_length_sec * self.sample_rate) as usize;
        if len == 0 {
            return Vec::new();
        }
        let normal = Normal::new(0.0_f64, 1.0).expect("unit normal is well-formed");
        let step = self.params.tail_length_sec / len as f64;
        let mut decay_pow = 1.0_f64;
        let mut ir = Vec::with_capacity(len);
        for i in 0..len {
            let t = i as f64 * step;
            let noise = normal.sample(&mut self.rng);
            ir.push((noise * (-3.0 * t).exp() * decay_pow) as f32);
            decay_pow *= self.params.tail_decay;
        }
        peak_normalize(&mut ir);
        ir
    }

    /// Early and tail components zero-padded to the longer length and summed.
    pub fn build_impulse_response(&mut self) -> Vec<f32> {
        let early = self.early_reflections();
        let tail = self.late_tail();
        let len = early.len().max(tail.len());
        let mut ir = vec![0.0_f32; len];
        for (o, &e) in ir.iter_mut().zip(&early) {
            *o += e;
        }
        for (o, &t) in ir.iter_mut().zip(&tail) {
            *o += t;
        }
        ir
    }
}

impl Stage for Reverb {
    fn name(&self) -> &'static str {
        "reverb"
    }

    fn process(&mut self, pcm: &mut PcmBuffer) -> Result<(), PipelineError> {
        let ir = self.build_impulse_response();
        if ir.is_empty() {
            return Err(PipelineError::new("reverb", "empty impulse response"));
        }
        let n = pcm.frames();
        let wet_mix = self.params.wet_mix;
        let dry_mix = 1.0 - wet_mix;
        for ch in pcm.iter_channels_mut() {
            let wet = fft_convolve(ch, &ir);
            for (dry, &w) in ch.iter_mut().zip(&wet[..n]) {
                *dry = dry_mix * *dry + wet_mix * w;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn reverb(params: ReverbParams, seed: u64) -> Reverb {
        Reverb::new(8000.0, params, Pcg32::seed_from_u64(seed)).unwrap()
    }

    fn impulse_input(n: usize) -> PcmBuffer {
        let mut pcm = PcmBuffer::zeroed(n, 1);
        pcm.channel_mut(0)[0] = 1.0;
        pcm
    }

    #[test]
    fn fft_convolve_matches_direct() {
        let x = [1.0_f32, 2.0, 3.0, 4.0];
        let h = [0.5_f32, -0.25, 0.125];
        let got = fft_convolve(&x, &h);
        assert_eq!(got.len(), 6);
        // Direct convolution by hand.
        let want = [0.5, 0.75, 1.125, 1.5, -0.625, 0.5];
        for (g, w) in got.iter().zip(&want) {
            assert!((g - w).abs() < 1e-5, "convolution mismatch: {g} vs {w}");
        }
    }

    #[test]
    fn early_reflections_place_impulses() {
        let params = ReverbParams {
            tail_length_sec: 0.0,
            ..Default::default()
        };
        let r = reverb(params, 0);
        let ir = r.early_reflections();
        // max delay 60 ms at 8 kHz = 480 samples, +1 for the direct impulse.
        assert_eq!(ir.len(), 481);
        assert_eq!(ir[0], 1.0, "direct path must be the unit impulse");
        assert!((ir[160] - 0.6).abs() < 1e-6, "20 ms reflection missing");
        assert!((ir[480] - 0.6).abs() < 1e-6, "60 ms reflection missing");
    }

    #[test]
    fn tail_decays_over_time() {
        let mut r = reverb(ReverbParams::default(), 3);
        let tail = r.late_tail();
        assert_eq!(tail.len(), 12000);
        let head_peak = tail[..1000].iter().fold(0.0_f32, |m, &s| m.max(s.abs()));
        let end_peak = tail[11_000..].iter().fold(0.0_f32, |m, &s| m.max(s.abs()));
        assert!(
            end_peak < head_peak * 0.1,
            "tail should decay strongly: head {head_peak}, end {end_peak}"
        );
    }

    #[test]
    fn combined_ir_may_exceed_unity() {
        // Both components are individually peak-normalized then summed with
        // no renormalization, so the direct-path sample can exceed 1.
        let mut r = reverb(ReverbParams::default(), 1);
        let ir = r.build_impulse_response();
        let peak = ir.iter().fold(0.0_f32, |m, &s| m.max(s.abs()));
        assert!(peak >= 1.0, "combined IR keeps the summed headroom, peak {peak}");
    }

    #[test]
    fn dry_mix_is_exact_passthrough() {
        let params = ReverbParams {
            wet_mix: 0.0,
            ..Default::default()
        };
        let mut r = reverb(params, 9);
        let mut pcm = impulse_input(4000);
        let before = pcm.clone();
        r.process(&mut pcm).unwrap();
        assert_eq!(pcm, before, "wet_mix = 0 must be an exact dry passthrough");
    }

    #[test]
    fn full_wet_equals_convolved_signal() {
        let params = ReverbParams {
            wet_mix: 1.0,
            ..Default::default()
        };
        let mut a = Reverb::new(8000.0, params.clone(), Pcg32::seed_from_u64(5)).unwrap();
        let mut b = Reverb::new(8000.0, params, Pcg32::seed_from_u64(5)).unwrap();

        let mut pcm = impulse_input(4000);
        a.process(&mut pcm).unwrap();

        let ir = b.build_impulse_response();
        let want = fft_convolve(&{
            let mut x = vec![0.0_f32; 4000];
            x[0] = 1.0;
            x
        }, &ir);
        for (got, w) in pcm.channel(0).iter().zip(&want[..4000]) {
            assert!((got - w).abs() < 1e-6, "wet_mix = 1 must equal the convolution");
        }
    }

    #[test]
    fn same_seed_reproduces_tail() {
        let a = reverb(ReverbParams::default(), 11).build_impulse_response();
        let b = reverb(ReverbParams::default(), 11).build_impulse_response();
        assert_eq!(a, b);
    }

    #[test]
    fn process_preserves_length() {
        let mut r = reverb(ReverbParams::default(), 2);
        let mut pcm = PcmBuffer::zeroed(5000, 2);
        pcm.channel_mut(0)[100] = 0.7;
        pcm.channel_mut(1)[200] = -0.4;
        r.process(&mut pcm).unwrap();
        assert_eq!(pcm.frames(), 5000);
        assert_eq!(pcm.channels(), 2);
        assert!(!pcm.has_non_finite());
    }
}
