//! Encoder seam: hands the finalized buffer to format writers.
//!
//! The core produces one read-only PCM buffer; each requested format is
//! encoded independently and concurrently, and one format's failure never
//! blocks the others. Only the float-WAV writer lives in this crate;
//! compressed containers (FLAC, MP3, AAC, ...) are external collaborators
//! implementing the same trait.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use log::info;
use rayon::prelude::*;

use crate::buffer::PcmBuffer;
use crate::error::EncodeError;

/// A format writer. Implementations must not mutate the buffer.
pub trait Encoder: Send + Sync {
    /// Uppercase format tag used as the result-map key (e.g. "WAV").
    fn format(&self) -> &str;
    /// File extension, lowercase without the dot.
    fn extension(&self) -> &str;
    fn encode(
        &self,
        pcm: &PcmBuffer,
        sample_rate: u32,
        path: &Path,
    ) -> Result<PathBuf, EncodeError>;
}

/// 32-bit float WAV writer.
#[derive(Debug, Clone, Copy, Default)]
pub struct WavEncoder;

impl Encoder for WavEncoder {
    fn format(&self) -> &str {
        "WAV"
    }

    fn extension(&self) -> &str {
        "wav"
    }

    fn encode(
        &self,
        pcm: &PcmBuffer,
        sample_rate: u32,
        path: &Path,
    ) -> Result<PathBuf, EncodeError> {
        let spec = hound::WavSpec {
            channels: pcm.channels() as u16,
            sample_rate,
            bits_per_sample: 32,
            sample_format: hound::SampleFormat::Float,
        };
        let mut writer = hound::WavWriter::create(path, spec)
            .map_err(|e| EncodeError::new("WAV", e.to_string()))?;
        for sample in pcm.interleaved() {
            writer
                .write_sample(sample)
                .map_err(|e| EncodeError::new("WAV", e.to_string()))?;
        }
        writer
            .finalize()
            .map_err(|e| EncodeError::new("WAV", e.to_string()))?;
        info!("WAV file saved as {}", path.display());
        Ok(path.to_path_buf())
    }
}

/// Encode the finalized buffer into every requested format in parallel.
/// Output files are `<out_dir>/<stem>.<ext>`. Returns one result per
/// format; failures are isolated.
pub fn encode_all(
    encoders: &[Box<dyn Encoder>],
    pcm: &PcmBuffer,
    sample_rate: u32,
    out_dir: &Path,
    stem: &str,
) -> HashMap<String, Result<PathBuf, EncodeError>> {
    encoders
        .par_iter()
        .map(|enc| {
            let path = out_dir.join(format!("{stem}.{}", enc.extension()));
            (enc.format().to_string(), enc.encode(pcm, sample_rate, &path))
        })
        .collect()
}
