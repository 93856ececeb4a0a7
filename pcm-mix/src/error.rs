//! Error type for the non-realtime surface of the mixer

use crate::types::Source;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MixError {
    #[error("diagnostic wav file: {0}")]
    Wav(#[from] hound::Error),

    #[error("ring capacity must be a non-zero power of two, got {0} frames")]
    InvalidCapacity(usize),

    #[error("invalid rate-control config: {0}")]
    InvalidConfig(String),

    #[error("{0} source already has a producer")]
    ProducerClaimed(Source),
}

pub type Result<T> = std::result::Result<T, MixError>;
