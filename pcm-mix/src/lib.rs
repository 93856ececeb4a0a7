//! PCM Mixer - Real-time resampling mixer
//!
//! Merges independently clocked 16-bit stereo producers into one output
//! stream at a fixed backend rate, following a variable host speed.
//!
//! Key features:
//! - Lock-free SPSC rings between producer threads and the audio callback
//! - 16.16 fixed-point linear resampling per source
//! - Occupancy feedback that bends playback rate within a bounded shift
//! - AVX2 saturating accumulation into the output buffer
//! - Optional WAV capture of raw pushed audio

pub mod clamping;
pub mod control;
pub mod error;
pub mod fifo;
pub mod mixer;
pub mod producer;
pub mod ring_buffer;
pub mod types;
pub mod wave;

pub use clamping::*;
pub use control::*;
pub use error::*;
pub use fifo::*;
pub use mixer::*;
pub use producer::SourceProducer;
pub use ring_buffer::*;
pub use types::*;
pub use wave::*;
