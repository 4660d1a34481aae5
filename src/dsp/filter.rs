//! FIR design and biquad filtering.
//!
//! Two filter families live here: the Kaiser-window linear-phase lowpass used
//! by the anti-alias stage and the resampler, and the RBJ peaking biquad
//! (Direct Form II Transposed, coefficients from the Audio EQ Cookbook) used
//! by the parametric EQ.

use std::f64::consts::PI;

use crate::buffer::PcmBuffer;
use crate::error::PipelineError;

use super::pipeline::Stage;

/// Zeroth-order modified Bessel function of the first kind, by power series.
/// Converges quickly for the beta range used in window design.
fn bessel_i0(x: f64) -> f64 {
    let half_x = x / 2.0;
    let mut sum = 1.0;
    let mut term = 1.0;
    let mut k = 1.0;
    loop {
        term *= (half_x / k) * (half_x / k);
        sum += term;
        if term < sum * 1e-12 {
            return sum;
        }
        k += 1.0;
    }
}

/// Kaiser window of length `taps` with shape parameter `beta`.
pub fn kaiser_window(taps: usize, beta: f64) -> Vec<f64> {
    if taps == 1 {
        return vec![1.0];
    }
    let denom = bessel_i0(beta);
    let half = (taps - 1) as f64 / 2.0;
    (0..taps)
        .map(|i| {
            let r = (i as f64 - half) / half;
            bessel_i0(beta * (1.0 - r * r).max(0.0).sqrt()) / denom
        })
        .collect()
}

/// Normalized sinc, sin(pi x) / (pi x).
fn sinc(x: f64) -> f64 {
    if x == 0.0 {
        1.0
    } else {
        (PI * x).sin() / (PI * x)
    }
}

/// Kaiser-window lowpass FIR design, unity gain at DC.
/// `cutoff` is normalized so 1.0 is Nyquist. Tap count must be odd so the
/// filter is symmetric around an integer group delay.
pub fn firwin_lowpass(taps: usize, cutoff: f64, beta: f64) -> Result<Vec<f64>, PipelineError> {
    if taps == 0 || taps % 2 == 0 {
        return Err(PipelineError::new(
            "filter design",
            format!("tap count must be odd and at least 1, got {taps}"),
        ));
    }
    if !(cutoff > 0.0 && cutoff < 1.0) {
        return Err(PipelineError::new(
            "filter design",
            format!("cutoff must be in (0, 1), got {cutoff}"),
        ));
    }

    let window = kaiser_window(taps, beta);
    let center = (taps - 1) as f64 / 2.0;
    let mut kernel: Vec<f64> = (0..taps)
        .map(|i| {
            let m = i as f64 - center;
            cutoff * sinc(cutoff * m) * window[i]
        })
        .collect();

    let sum: f64 = kernel.iter().sum();
    if sum == 0.0 || !sum.is_finite() {
        return Err(PipelineError::new(
            "filter design",
            "kernel is degenerate (zero or non-finite DC gain)",
        ));
    }
    for k in kernel.iter_mut() {
        *k /= sum;
    }
    Ok(kernel)
}

/// Centered same-length convolution: the output has the input's length and
/// the kernel's group delay is absorbed, so a symmetric kernel stays aligned.
pub fn convolve_same(signal: &[f32], kernel: &[f64]) -> Vec<f32> {
    let n = signal.len();
    let k = kernel.len();
    if n == 0 || k == 0 {
        return vec![0.0; n];
    }
    let offset = (k - 1) / 2;
    let mut out = Vec::with_capacity(n);
    for i in 0..n {
        let t = i + offset;
        let j_lo = t.saturating_sub(n - 1);
        let j_hi = t.min(k - 1);
        let mut acc = 0.0_f64;
        for j in j_lo..=j_hi {
            acc += kernel[j] * signal[t - j] as f64;
        }
        out.push(acc as f32);
    }
    out
}

/// The anti-alias stage: a linear-phase Kaiser lowpass applied as a centered
/// convolution per channel. Coefficients are computed once per configuration
/// and carry no state between pipeline invocations.
#[derive(Debug, Clone)]
pub struct AntiAliasFilter {
    kernel: Vec<f64>,
}

impl AntiAliasFilter {
    pub fn new(taps: usize, cutoff: f64, beta: f64) -> Result<Self, PipelineError> {
        let kernel = firwin_lowpass(taps, cutoff, beta)?;
        Ok(AntiAliasFilter { kernel })
    }

    pub fn taps(&self) -> usize {
        self.kernel.len()
    }
}

impl Stage for AntiAliasFilter {
    fn name(&self) -> &'static str {
        "anti-alias"
    }

    fn process(&mut self, pcm: &mut PcmBuffer) -> Result<(), PipelineError> {
        for ch in pcm.iter_channels_mut() {
            *ch = convolve_same(ch, &self.kernel);
        }
        Ok(())
    }
}

/// Second-order IIR section, Direct Form II Transposed.
#[derive(Debug, Clone)]
pub struct Biquad {
    b0: f64,
    b1: f64,
    b2: f64,
    a1: f64,
    a2: f64,
    z1: f64,
    z2: f64,
}

impl Biquad {
    /// Peaking (bell) EQ design. Boost at `freq_hz` is `10^(gain_db/20)`;
    /// zero gain is a numeric identity pass.
    pub fn peaking(
        sample_rate: f64,
        freq_hz: f64,
        q: f64,
        gain_db: f64,
    ) -> Result<Self, PipelineError> {
        if !(freq_hz > 0.0 && freq_hz < sample_rate / 2.0) {
            return Err(PipelineError::new(
                "eq",
                format!("center frequency {freq_hz} Hz outside (0, Nyquist)"),
            ));
        }
        if q <= 0.0 {
            return Err(PipelineError::new("eq", format!("Q must be positive, got {q}")));
        }

        let a = (10.0_f64).powf(gain_db / 40.0);
        let w0 = 2.0 * PI * freq_hz / sample_rate;
        let alpha = w0.sin() / (2.0 * q);

        let b0 = 1.0 + alpha * a;
        let b1 = -2.0 * w0.cos();
        let b2 = 1.0 - alpha * a;
        let a0 = 1.0 + alpha / a;
        let a1 = -2.0 * w0.cos();
        let a2 = 1.0 - alpha / a;

        Ok(Biquad {
            b0: b0 / a0,
            b1: b1 / a0,
            b2: b2 / a0,
            a1: a1 / a0,
            a2: a2 / a0,
            z1: 0.0,
            z2: 0.0,
        })
    }

    #[inline]
    pub fn process(&mut self, input: f64) -> f64 {
        let output = self.b0 * input + self.z1;
        self.z1 = self.b1 * input - self.a1 * output + self.z2;
        self.z2 = self.b2 * input - self.a2 * output;
        output
    }

    /// Filter a channel in place, starting from cleared state.
    pub fn process_channel(&mut self, samples: &mut [f32]) {
        self.reset();
        for s in samples.iter_mut() {
            *s = self.process(*s as f64) as f32;
        }
    }

    pub fn reset(&mut self) {
        self.z1 = 0.0;
        self.z2 = 0.0;
    }
}
