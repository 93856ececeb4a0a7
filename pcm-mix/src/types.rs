//! Mixer data types and tuning constants

use std::fmt;

/// Ring capacity in stereo frames (128 ms at 32 kHz)
pub const MAX_SAMPLES: usize = 1024 * 4;

/// Address mask for a ring of `MAX_SAMPLES` frames, in sample units
pub const INDEX_MASK: u32 = (MAX_SAMPLES * 2 - 1) as u32;

/// Largest rate correction, in Hz per 32000 Hz of input rate
pub const MAX_FREQ_SHIFT: f32 = 200.0;

/// Rate correction in Hz per frame of fill error
pub const CONTROL_FACTOR: f32 = 0.2;

/// Number of callbacks averaged by the fill estimate
pub const CONTROL_AVG: u32 = 32;

/// Target ring occupancy in frames (40 ms at 32 kHz)
pub const LOW_WATERMARK: u32 = 1280;

/// Rate the frequency shift is expressed against
pub const FREQ_SHIFT_REFERENCE_RATE: f32 = 32000.0;

/// One whole source frame in 16.16 fixed point
pub const FRAC_ONE: u32 = 1 << 16;

/// Unity gain
pub const MAX_VOLUME: u32 = 256;

/// Producer feeding one of the three fifos
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Source {
    /// Primary DMA audio (DSP output)
    Dma = 0,
    /// Disc streaming audio (DTK)
    Streaming = 1,
    /// Low-rate Wiimote speaker
    WiimoteSpeaker = 2,
}

impl Source {
    pub const ALL: [Source; 3] = [Source::Dma, Source::Streaming, Source::WiimoteSpeaker];

    /// Input rate a fifo starts with before the host reports one
    pub fn nominal_sample_rate(self) -> u32 {
        match self {
            Source::Dma => 32000,
            Source::Streaming => 48000,
            Source::WiimoteSpeaker => 3000,
        }
    }

    pub(crate) fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Source::Dma => "dma",
            Source::Streaming => "streaming",
            Source::WiimoteSpeaker => "wiimote-speaker",
        };
        f.write_str(name)
    }
}

/// Per-channel linear gain, 0 (mute) to 256 (unity)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StereoVolume {
    pub left: u32,
    pub right: u32,
}

impl StereoVolume {
    pub const UNITY: StereoVolume = StereoVolume {
        left: MAX_VOLUME,
        right: MAX_VOLUME,
    };

    /// Build a volume pair, clamping each channel to 0..=256
    pub fn new(left: u32, right: u32) -> Self {
        Self {
            left: left.min(MAX_VOLUME),
            right: right.min(MAX_VOLUME),
        }
    }
}

impl Default for StereoVolume {
    fn default() -> Self {
        Self::UNITY
    }
}

/// Snapshot of one fifo's counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FifoStats {
    pub input_sample_rate: u32,
    /// Unread frames at the time of the snapshot
    pub available_frames: usize,
    /// Frames discarded because the ring was full
    pub dropped_frames: u64,
    /// Output frames rendered by holding the last frame
    pub underrun_frames: u64,
}

/// Mixer statistics
#[derive(Debug, Clone, Copy, Default)]
pub struct MixerStats {
    pub frames_mixed: u64,
    pub dma: FifoStats,
    pub streaming: FifoStats,
    pub wiimote_speaker: FifoStats,
}

impl MixerStats {
    pub fn source(&self, source: Source) -> &FifoStats {
        match source {
            Source::Dma => &self.dma,
            Source::Streaming => &self.streaming,
            Source::WiimoteSpeaker => &self.wiimote_speaker,
        }
    }
}
