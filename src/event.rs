//! Note event model: the sanitized, time-ordered stream consumed by the synthesizer.
//!
//! Events arrive from an upstream collaborator (MIDI parser, notation parser)
//! already validated and sorted ascending by `time_micros`. The core does not
//! re-validate pairing beyond matching each NoteOn to the nearest later
//! NoteOff with the same note and channel.

use serde::{Deserialize, Serialize};

/// The kinds of events the synthesizer understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    NoteOn,
    NoteOff,
    Tempo,
    Sustain,
    PitchBend,
}

/// A single timed event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub kind: EventKind,
    /// Absolute time in microseconds from the start of the piece.
    pub time_micros: u64,
    /// MIDI note number (0–127). Present for NoteOn/NoteOff.
    pub note: Option<u8>,
    /// MIDI velocity (0–127). Present for NoteOn.
    pub velocity: Option<u8>,
    pub channel: u8,
    /// Event payload for Tempo (BPM), Sustain (pedal), PitchBend (semitones).
    pub value: Option<f64>,
}

impl Event {
    pub fn note_on(time_micros: u64, note: u8, velocity: u8, channel: u8) -> Self {
        Event {
            kind: EventKind::NoteOn,
            time_micros,
            note: Some(note),
            velocity: Some(velocity),
            channel,
            value: None,
        }
    }

    pub fn note_off(time_micros: u64, note: u8, channel: u8) -> Self {
        Event {
            kind: EventKind::NoteOff,
            time_micros,
            note: Some(note),
            velocity: Some(0),
            channel,
            value: None,
        }
    }

    pub fn tempo(time_micros: u64, bpm: f64) -> Self {
        Event {
            kind: EventKind::Tempo,
            time_micros,
            note: None,
            velocity: None,
            channel: 0,
            value: Some(bpm),
        }
    }

    /// Event time in seconds.
    pub fn time_sec(&self) -> f64 {
        self.time_micros as f64 / 1e6
    }
}

/// Convert a MIDI note number to frequency in Hz, A4 (MIDI 69) = 440 Hz.
pub fn midi_to_frequency(note: i32) -> f64 {
    440.0 * (2.0_f64).powf((note as f64 - 69.0) / 12.0)
}
