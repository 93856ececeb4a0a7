//! Mixer engine: three resampling fifos summed into one output stream

use crate::control::{ConfigCell, ControlConfig};
use crate::error::Result;
use crate::fifo::{MixContext, MixerFifo};
use crate::producer::ProducerClaims;
use crate::types::*;
use crate::wave::WaveLog;
use crossbeam::atomic::AtomicCell;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};

/// Audio mixer for the DMA, streaming and Wiimote speaker sources
///
/// Producers push from their own threads; exactly one audio callback
/// thread calls [`Mixer::mix`]. Nothing here locks on the mix path.
pub struct Mixer {
    sample_rate: u32,
    fifos: [MixerFifo; 3],

    // Current rate of emulation (1.0 = 100% speed, 0.0 = unknown)
    speed: AtomicCell<f32>,
    control: ConfigCell,

    dtk_log: WaveLog,
    dsp_log: WaveLog,

    frames_mixed: AtomicU64,
    claims: ProducerClaims,
}

impl Mixer {
    /// Create a mixer producing `sample_rate` Hz output
    pub fn new(sample_rate: u32) -> Self {
        Self {
            sample_rate,
            fifos: Source::ALL.map(|source| MixerFifo::new(source.nominal_sample_rate())),
            speed: AtomicCell::new(0.0),
            control: ConfigCell::default(),
            dtk_log: WaveLog::new("DTK"),
            dsp_log: WaveLog::new("DSP"),
            frames_mixed: AtomicU64::new(0),
            claims: ProducerClaims::default(),
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn fifo(&self, source: Source) -> &MixerFifo {
        &self.fifos[source.index()]
    }

    pub(crate) fn claims(&self) -> &ProducerClaims {
        &self.claims
    }

    /// Render `num_frames` interleaved stereo frames into `samples`
    ///
    /// Called from the audio callback thread. The output is cleared and every
    /// fifo adds its contribution, saturating at the 16-bit range. Returns the
    /// frames produced: fewer than requested if `samples` is too short, zero
    /// if the mixer has no output rate yet.
    pub fn mix(&self, samples: &mut [i16], num_frames: usize, consider_framelimit: bool) -> usize {
        if self.sample_rate == 0 {
            return 0;
        }

        let frames = num_frames.min(samples.len() / 2);
        let out = &mut samples[..frames * 2];
        out.fill(0);

        let ctx = MixContext {
            output_sample_rate: self.sample_rate,
            speed: self.current_speed(),
            consider_framelimit,
            control: self.control.load(),
        };

        for fifo in &self.fifos {
            fifo.mix(out, &ctx);
        }

        self.frames_mixed.fetch_add(frames as u64, Ordering::Relaxed);
        frames
    }

    /// Push DMA (DSP) audio; mirrored to the DSP log when enabled
    pub fn push_samples(&self, samples: &[i16]) {
        let fifo = self.fifo(Source::Dma);
        fifo.push_samples(samples);
        self.dsp_log.write(samples, fifo.input_sample_rate());
    }

    /// Push streaming (DTK) audio; mirrored to the DTK log when enabled
    pub fn push_streaming_samples(&self, samples: &[i16]) {
        let fifo = self.fifo(Source::Streaming);
        fifo.push_samples(samples);
        self.dtk_log.write(samples, fifo.input_sample_rate());
    }

    /// Push Wiimote speaker audio produced at `sample_rate`
    ///
    /// Blocks of a full ring or more are discarded outright.
    pub fn push_wiimote_speaker_samples(&self, samples: &[i16], sample_rate: u32) {
        if samples.len() / 2 >= MAX_SAMPLES {
            return;
        }
        let fifo = self.fifo(Source::WiimoteSpeaker);
        fifo.set_input_sample_rate(sample_rate);
        fifo.push_samples(samples);
    }

    pub fn set_dma_input_sample_rate(&self, rate: u32) {
        self.fifo(Source::Dma).set_input_sample_rate(rate);
    }

    pub fn set_stream_input_sample_rate(&self, rate: u32) {
        self.fifo(Source::Streaming).set_input_sample_rate(rate);
    }

    pub fn set_streaming_volume(&self, left: u32, right: u32) {
        self.fifo(Source::Streaming)
            .set_volume(StereoVolume::new(left, right));
    }

    pub fn set_wiimote_speaker_volume(&self, left: u32, right: u32) {
        self.fifo(Source::WiimoteSpeaker)
            .set_volume(StereoVolume::new(left, right));
    }

    /// Start capturing streaming pushes to a WAV file
    pub fn start_log_dtk_audio(&self, path: impl AsRef<Path>) -> Result<()> {
        let rate = self.fifo(Source::Streaming).input_sample_rate();
        self.dtk_log.start(path, rate)
    }

    pub fn stop_log_dtk_audio(&self) -> Result<()> {
        self.dtk_log.stop()
    }

    /// Start capturing DMA pushes to a WAV file
    pub fn start_log_dsp_audio(&self, path: impl AsRef<Path>) -> Result<()> {
        let rate = self.fifo(Source::Dma).input_sample_rate();
        self.dsp_log.start(path, rate)
    }

    pub fn stop_log_dsp_audio(&self) -> Result<()> {
        self.dsp_log.stop()
    }

    pub fn current_speed(&self) -> f32 {
        self.speed.load()
    }

    pub fn update_speed(&self, speed: f32) {
        self.speed.store(speed);
    }

    /// Publish a new rate-control snapshot, picked up by the next mix
    pub fn set_control_config(&self, config: ControlConfig) -> Result<()> {
        config.validate()?;
        self.control.store(config);
        log::info!("Rate control updated: {:?}", config);
        Ok(())
    }

    pub fn control_config(&self) -> ControlConfig {
        self.control.load()
    }

    /// Get mixer statistics
    pub fn stats(&self) -> MixerStats {
        MixerStats {
            frames_mixed: self.frames_mixed.load(Ordering::Relaxed),
            dma: self.fifo(Source::Dma).stats(),
            streaming: self.fifo(Source::Streaming).stats(),
            wiimote_speaker: self.fifo(Source::WiimoteSpeaker).stats(),
        }
    }
}
