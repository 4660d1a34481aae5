//! Synthesizer: renders the event stream into the master PCM buffer.
//!
//! Each matched NoteOn becomes a Voice. Voices are embarrassingly parallel,
//! so they render into private buffers on the rayon pool and are merged by a
//! single-threaded additive pass; no locks, and the merge order is fixed, so
//! the output is bit-stable across runs. A voice that fails to render is
//! logged and skipped: one malformed note must not sink the whole render.

use log::{debug, info, warn};
use rayon::prelude::*;

use crate::buffer::PcmBuffer;
use crate::config::AdsrParams;
use crate::error::ParameterError;
use crate::event::{midi_to_frequency, Event, EventKind};

use super::voice::Voice;

/// Minimum matched-note duration in seconds.
const MIN_NOTE_DURATION_SEC: f64 = 0.1;

/// Offline additive synthesizer over a fixed-length master buffer.
#[derive(Debug, Clone)]
pub struct Synthesizer {
    sample_rate: f64,
    channels: usize,
    duration_sec: f64,
    adsr: AdsrParams,
    /// Fallback duration for a NoteOn with no matching NoteOff.
    default_note_duration_sec: f64,
}

impl Synthesizer {
    pub fn new(
        sample_rate: f64,
        channels: usize,
        duration_sec: f64,
        adsr: AdsrParams,
        default_note_duration_sec: f64,
    ) -> Result<Self, ParameterError> {
        if sample_rate <= 0.0 {
            return Err(ParameterError::new("sample_rate", "must be positive"));
        }
        if channels == 0 {
            return Err(ParameterError::new("channels", "must be at least 1"));
        }
        if duration_sec <= 0.0 {
            return Err(ParameterError::new("duration_sec", "must be positive"));
        }
        if default_note_duration_sec <= 0.0 {
            return Err(ParameterError::new(
                "default_note_duration_sec",
                "must be positive",
            ));
        }
        Ok(Synthesizer {
            sample_rate,
            channels,
            duration_sec,
            adsr,
            default_note_duration_sec,
        })
    }

    /// Build the voice list: match each NoteOn to the nearest later NoteOff
    /// with the same note and channel; unmatched notes use the fallback.
    fn schedule_voices(&self, events: &[Event]) -> Vec<Voice> {
        let mut voices = Vec::new();
        for (idx, event) in events.iter().enumerate() {
            if event.kind != EventKind::NoteOn {
                continue;
            }
            let (note, velocity) = match (event.note, event.velocity) {
                (Some(n), Some(v)) => (n, v),
                _ => {
                    warn!("NoteOn at {}us missing note or velocity; skipped", event.time_micros);
                    continue;
                }
            };

            let mut duration_sec = self.default_note_duration_sec;
            for later in &events[idx + 1..] {
                if later.kind == EventKind::NoteOff
                    && later.note == Some(note)
                    && later.channel == event.channel
                {
                    duration_sec =
                        (later.time_sec() - event.time_sec()).max(MIN_NOTE_DURATION_SEC);
                    break;
                }
            }

            voices.push(Voice {
                note,
                frequency: midi_to_frequency(note as i32),
                start_sample: (event.time_sec() * self.sample_rate).round() as usize,
                duration_sec,
                gain: velocity as f32 / 127.0,
            });
        }
        voices
    }

    /// Render all events into a `frames × channels` master buffer.
    /// The mono voice waveform is broadcast identically into every channel.
    pub fn render(&self, events: &[Event]) -> PcmBuffer {
        let num_samples = (self.sample_rate * self.duration_sec) as usize;
        let voices = self.schedule_voices(events);
        debug!(
            "rendering {} voices into {} frames x {} channels",
            voices.len(),
            num_samples,
            self.channels
        );

        // Parallel render into private buffers; collect preserves voice order.
        let rendered: Vec<(usize, Vec<f32>)> = voices
            .par_iter()
            .filter_map(|v| match v.render(self.sample_rate, &self.adsr) {
                Ok(wave) => Some((v.start_sample, wave)),
                Err(e) => {
                    warn!("skipping note {}: {e}", v.note);
                    None
                }
            })
            .collect();

        // Single-threaded additive merge. A voice either lands completely
        // (clipped to buffer bounds) or not at all.
        let mut master = PcmBuffer::zeroed(num_samples, self.channels);
        for (start, wave) in &rendered {
            if *start >= num_samples {
                continue;
            }
            let end = (start + wave.len()).min(num_samples);
            let span = end - start;
            for ch in 0..self.channels {
                let out = &mut master.channel_mut(ch)[*start..end];
                for (o, &s) in out.iter_mut().zip(&wave[..span]) {
                    *o += s;
                }
            }
        }

        info!(
            "synthesis complete: {} frames x {} channels",
            master.frames(),
            master.channels()
        );
        master
    }
}
