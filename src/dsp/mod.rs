//! DSP core: synthesis and the mastering pipeline.
//!
//! Everything here operates on fully materialized buffers; there is no
//! streaming and no external I/O. Voices render in parallel, the pipeline
//! stages run strictly in sequence.

pub mod dynamics;
pub mod envelope;
pub mod eq;
pub mod filter;
pub mod normalize;
pub mod pipeline;
pub mod resample;
pub mod reverb;
pub mod synth;
pub mod voice;
