//! PCM buffer: planar frames × channels, 32-bit float.
//!
//! Owned exclusively by the orchestrator during a render. Amplitude is only
//! guaranteed within [-1, 1] after the normalizer stage has run.

/// A multichannel PCM buffer with planar storage (one Vec per channel,
/// all the same length).
#[derive(Debug, Clone, PartialEq)]
pub struct PcmBuffer {
    channels: Vec<Vec<f32>>,
}

impl PcmBuffer {
    /// Silent buffer of `frames` samples across `channels` channels.
    pub fn zeroed(frames: usize, channels: usize) -> Self {
        PcmBuffer {
            channels: vec![vec![0.0; frames]; channels],
        }
    }

    /// Build from planar channel data. All channels must have equal length.
    pub fn from_planar(channels: Vec<Vec<f32>>) -> Self {
        debug_assert!(
            channels.windows(2).all(|w| w[0].len() == w[1].len()),
            "channel lengths must match"
        );
        PcmBuffer { channels }
    }

    /// Number of sample frames per channel.
    pub fn frames(&self) -> usize {
        self.channels.first().map_or(0, |c| c.len())
    }

    /// Number of channels.
    pub fn channels(&self) -> usize {
        self.channels.len()
    }

    pub fn channel(&self, ch: usize) -> &[f32] {
        &self.channels[ch]
    }

    pub fn channel_mut(&mut self, ch: usize) -> &mut [f32] {
        &mut self.channels[ch]
    }

    pub fn iter_channels(&self) -> impl Iterator<Item = &[f32]> {
        self.channels.iter().map(|c| c.as_slice())
    }

    pub fn iter_channels_mut(&mut self) -> impl Iterator<Item = &mut Vec<f32>> {
        self.channels.iter_mut()
    }

    /// Replace the contents with new planar data (e.g. after a rate change).
    pub fn replace(&mut self, channels: Vec<Vec<f32>>) {
        debug_assert!(
            channels.windows(2).all(|w| w[0].len() == w[1].len()),
            "channel lengths must match"
        );
        self.channels = channels;
    }

    /// Global peak absolute value across all samples and channels.
    pub fn peak(&self) -> f32 {
        self.channels
            .iter()
            .flat_map(|c| c.iter())
            .fold(0.0_f32, |acc, &s| acc.max(s.abs()))
    }

    /// True if any sample is NaN or infinite.
    pub fn has_non_finite(&self) -> bool {
        self.channels
            .iter()
            .any(|c| c.iter().any(|s| !s.is_finite()))
    }

    /// Apply `f` to every sample, channel-major order.
    pub fn for_each_sample_mut(&mut self, mut f: impl FnMut(&mut f32)) {
        for ch in &mut self.channels {
            for s in ch.iter_mut() {
                f(s);
            }
        }
    }

    /// Interleaved frame-major copy (frame 0 ch 0, frame 0 ch 1, ...),
    /// the layout encoders expect.
    pub fn interleaved(&self) -> Vec<f32> {
        let frames = self.frames();
        let n_ch = self.channels();
        let mut out = Vec::with_capacity(frames * n_ch);
        for i in 0..frames {
            for ch in &self.channels {
                out.push(ch[i]);
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zeroed_has_expected_shape() {
        let b = PcmBuffer::zeroed(100, 2);
        assert_eq!(b.frames(), 100);
        assert_eq!(b.channels(), 2);
        assert_eq!(b.peak(), 0.0);
    }

    #[test]
    fn peak_spans_all_channels() {
        let mut b = PcmBuffer::zeroed(4, 2);
        b.channel_mut(0)[1] = 0.3;
        b.channel_mut(1)[3] = -0.8;
        assert!((b.peak() - 0.8).abs() < 1e-7);
    }

    #[test]
    fn detects_non_finite() {
        let mut b = PcmBuffer::zeroed(4, 1);
        assert!(!b.has_non_finite());
        b.channel_mut(0)[2] = f32::NAN;
        assert!(b.has_non_finite());
    }

    #[test]
    fn interleave_order() {
        let b = PcmBuffer::from_planar(vec![vec![1.0, 2.0], vec![10.0, 20.0]]);
        assert_eq!(b.interleaved(), vec![1.0, 10.0, 2.0, 20.0]);
    }
}
