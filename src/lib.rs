pub mod buffer;
pub mod config;
pub mod dsp;
pub mod encoder;
pub mod error;
pub mod event;
pub mod render;

pub use buffer::PcmBuffer;
pub use config::RenderConfig;
pub use encoder::{Encoder, WavEncoder};
pub use error::NoteloomError;
pub use event::{Event, EventKind};
pub use render::Renderer;

/// The crate version, read from Cargo.toml at compile time.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Parse a JSON array of note events.
pub fn parse_events(json: &str) -> Result<Vec<Event>, NoteloomError> {
    serde_json::from_str(json).map_err(|e| {
        NoteloomError::InvalidParameter(error::ParameterError::new(
            "events",
            format!("invalid event JSON: {e}"),
        ))
    })
}

/// Render a list of note events into a finalized PCM buffer using the
/// full synthesis and mastering chain.
pub fn render(events: &[Event], config: RenderConfig) -> Result<PcmBuffer, NoteloomError> {
    Renderer::new(config)?.render(events)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_event_json() {
        let json = r#"[
            {"kind": "note_on", "time_micros": 0, "note": 60, "velocity": 100, "channel": 0},
            {"kind": "note_off", "time_micros": 500000, "note": 60, "channel": 0}
        ]"#;
        let events = parse_events(json).unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].kind, EventKind::NoteOn);
        assert_eq!(events[0].note, Some(60));
        assert_eq!(events[1].time_sec(), 0.5);
    }

    #[test]
    fn rejects_malformed_event_json() {
        assert!(parse_events("[{\"kind\": \"note_on\"").is_err());
    }

    #[test]
    fn render_helper_matches_renderer() {
        let cfg = RenderConfig {
            sample_rate: 8000,
            oversample_factor: 4,
            ..Default::default()
        };
        let events = vec![
            Event::note_on(0, 69, 100, 0),
            Event::note_off(250_000, 69, 0),
        ];
        let a = render(&events, cfg.clone()).unwrap();
        let b = Renderer::new(cfg).unwrap().render(&events).unwrap();
        assert_eq!(a, b);
    }
}
