//! ADSR envelope generator: one gain value per sample over a note's lifetime.
//!
//! Linear attack/decay/release segments. Segment lengths are floored sample
//! counts; the sustain segment absorbs whatever remains (clamped at zero for
//! short notes, in which case decay and release still run and the result is
//! truncated). The output always has exactly `floor(duration * sample_rate)`
//! samples, zero-padded if the segments fall short.

use crate::config::AdsrParams;
use crate::error::ParameterError;

/// Generate the gain curve for one note.
pub fn adsr_envelope(
    duration_sec: f64,
    sample_rate: f64,
    params: &AdsrParams,
) -> Result<Vec<f32>, ParameterError> {
    if duration_sec <= 0.0 {
        return Err(ParameterError::new(
            "duration_sec",
            format!("must be positive, got {duration_sec}"),
        ));
    }
    if sample_rate <= 0.0 {
        return Err(ParameterError::new(
            "sample_rate",
            format!("must be positive, got {sample_rate}"),
        ));
    }

    let total = (duration_sec * sample_rate) as usize;
    let attack_n = (params.attack * sample_rate) as usize;
    let decay_n = (params.decay * sample_rate) as usize;
    let release_n = (params.release * sample_rate) as usize;
    let sustain_n = total.saturating_sub(attack_n + decay_n + release_n);
    let sustain = params.sustain_level as f32;

    let mut env = Vec::with_capacity(attack_n + decay_n + sustain_n + release_n);

    // Attack: 0 -> 1, endpoint excluded so the ramp never double-counts 1.0.
    for i in 0..attack_n {
        env.push(i as f32 / attack_n as f32);
    }
    // Decay: 1 -> sustain, endpoint excluded.
    for i in 0..decay_n {
        env.push(1.0 + (sustain - 1.0) * i as f32 / decay_n as f32);
    }
    env.extend(std::iter::repeat(sustain).take(sustain_n));
    // Release: sustain -> 0, endpoint included so the note lands on silence.
    if release_n == 1 {
        env.push(sustain);
    } else {
        for i in 0..release_n {
            env.push(sustain * (1.0 - i as f32 / (release_n - 1) as f32));
        }
    }

    // Segments can overshoot `total` for short notes, or undershoot when the
    // floored lengths lose fractional samples.
    env.truncate(total);
    env.resize(total, 0.0);
    Ok(env)
}
