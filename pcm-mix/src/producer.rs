//! Exclusive producer handles
//!
//! A ring accepts exactly one writer. Claiming a [`SourceProducer`] turns
//! that convention into an API guarantee: only one handle per source can
//! exist at a time, and pushing needs `&mut` access to it.

use crate::error::{MixError, Result};
use crate::mixer::Mixer;
use crate::types::Source;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Claim flags, one per source
#[derive(Default)]
pub(crate) struct ProducerClaims {
    claimed: [AtomicBool; 3],
}

impl ProducerClaims {
    fn claim(&self, source: Source) -> Result<()> {
        self.claimed[source.index()]
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map(|_| ())
            .map_err(|_| MixError::ProducerClaimed(source))
    }

    fn release(&self, source: Source) {
        self.claimed[source.index()].store(false, Ordering::Release);
    }
}

/// Sole writer for one source's fifo
pub struct SourceProducer {
    mixer: Arc<Mixer>,
    source: Source,
}

impl SourceProducer {
    pub(crate) fn claim(mixer: &Arc<Mixer>, source: Source) -> Result<Self> {
        mixer.claims().claim(source)?;
        log::debug!("Claimed {} producer", source);
        Ok(Self {
            mixer: mixer.clone(),
            source,
        })
    }

    pub fn source(&self) -> Source {
        self.source
    }

    /// Push interleaved stereo samples at the source's current input rate
    pub fn push(&mut self, samples: &[i16]) {
        match self.source {
            Source::Dma => self.mixer.push_samples(samples),
            Source::Streaming => self.mixer.push_streaming_samples(samples),
            Source::WiimoteSpeaker => {
                let rate = self.mixer.fifo(Source::WiimoteSpeaker).input_sample_rate();
                self.mixer.push_wiimote_speaker_samples(samples, rate);
            }
        }
    }

    pub fn set_input_sample_rate(&mut self, rate: u32) {
        self.mixer.fifo(self.source).set_input_sample_rate(rate);
    }
}

impl Drop for SourceProducer {
    fn drop(&mut self) {
        self.mixer.claims().release(self.source);
    }
}

impl Mixer {
    /// Claim the single producer role for `source`
    ///
    /// Fails with [`MixError::ProducerClaimed`] while another handle for the
    /// same source is alive.
    pub fn producer(self: &Arc<Self>, source: Source) -> Result<SourceProducer> {
        SourceProducer::claim(self, source)
    }
}
