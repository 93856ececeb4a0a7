//! Resampling fifo: one producer channel with rate, volume and phase state
//!
//! The producer side only appends raw frames. All resampling happens on
//! the consumer (audio callback) thread, which walks the ring with a 16.16
//! fixed-point position, linearly interpolates adjacent frames, applies
//! volume and accumulates into the caller's buffer.

use crate::clamping::{accumulate_saturating, clamp_sample};
use crate::control::ControlConfig;
use crate::error::Result;
use crate::ring_buffer::SampleRing;
use crate::types::{FifoStats, StereoVolume, FRAC_ONE};
use crossbeam::atomic::AtomicCell;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};

/// Frames rendered per stack block before accumulation
const RENDER_BLOCK_FRAMES: usize = 256;

/// Largest step per output frame; a held `frac` below one frame plus this
/// still fits in 32 bits
const MAX_RATIO: u32 = u32::MAX - (FRAC_ONE - 1);

/// Per-cycle parameters handed down by the engine
#[derive(Debug, Clone, Copy)]
pub struct MixContext {
    pub output_sample_rate: u32,
    /// Host emulation speed, 0.0 when unknown
    pub speed: f32,
    pub consider_framelimit: bool,
    pub control: ControlConfig,
}

/// Single producer/consumer channel with resampling state
pub struct MixerFifo {
    ring: SampleRing,
    input_sample_rate: AtomicU32,
    left_volume: AtomicU32,
    right_volume: AtomicU32,

    // Consumer-owned; atomics only so the fifo can be shared by reference
    frac: AtomicU32,
    fill_average: AtomicCell<f32>,

    dropped_frames: AtomicU64,
    underrun_frames: AtomicU64,
}

impl MixerFifo {
    pub fn new(input_sample_rate: u32) -> Self {
        Self::with_ring(SampleRing::new(), input_sample_rate)
    }

    /// Fifo over a ring of `frames` capacity (power of two)
    pub fn with_capacity(input_sample_rate: u32, frames: usize) -> Result<Self> {
        Ok(Self::with_ring(
            SampleRing::with_capacity(frames)?,
            input_sample_rate,
        ))
    }

    fn with_ring(ring: SampleRing, input_sample_rate: u32) -> Self {
        Self {
            ring,
            input_sample_rate: AtomicU32::new(input_sample_rate),
            left_volume: AtomicU32::new(StereoVolume::UNITY.left),
            right_volume: AtomicU32::new(StereoVolume::UNITY.right),
            frac: AtomicU32::new(0),
            fill_average: AtomicCell::new(0.0),
            dropped_frames: AtomicU64::new(0),
            underrun_frames: AtomicU64::new(0),
        }
    }

    /// Append raw interleaved stereo samples (producer side)
    ///
    /// Frames that do not fit are dropped silently.
    pub fn push_samples(&self, samples: &[i16]) {
        let frames = samples.len() / 2;
        let stored = self.ring.push(samples);
        if stored < frames {
            self.dropped_frames
                .fetch_add((frames - stored) as u64, Ordering::Relaxed);
        }
    }

    pub fn set_input_sample_rate(&self, rate: u32) {
        self.input_sample_rate.store(rate, Ordering::Relaxed);
    }

    pub fn input_sample_rate(&self) -> u32 {
        self.input_sample_rate.load(Ordering::Relaxed)
    }

    pub fn set_volume(&self, volume: StereoVolume) {
        let volume = StereoVolume::new(volume.left, volume.right);
        self.left_volume.store(volume.left, Ordering::Relaxed);
        self.right_volume.store(volume.right, Ordering::Relaxed);
    }

    pub fn volume(&self) -> StereoVolume {
        StereoVolume {
            left: self.left_volume.load(Ordering::Relaxed),
            right: self.right_volume.load(Ordering::Relaxed),
        }
    }

    pub fn available_frames(&self) -> usize {
        self.ring.available_frames()
    }

    pub fn stats(&self) -> FifoStats {
        FifoStats {
            input_sample_rate: self.input_sample_rate(),
            available_frames: self.available_frames(),
            dropped_frames: self.dropped_frames.load(Ordering::Relaxed),
            underrun_frames: self.underrun_frames.load(Ordering::Relaxed),
        }
    }

    /// Resample into `out`, adding to what is already there (consumer side)
    ///
    /// `out` holds interleaved stereo; every frame of it is written. When the
    /// ring runs dry the last consumed frame is held. Returns frames rendered.
    pub fn mix(&self, out: &mut [i16], ctx: &MixContext) -> usize {
        let frames = out.len() / 2;
        if frames == 0 || ctx.output_sample_rate == 0 {
            return 0;
        }

        // The producer only moves `write` forward; data pushed during this
        // callback is picked up next time.
        let write = self.ring.write_index();
        let mut read = self.ring.read_index();
        let capacity = self.ring.capacity_samples();

        let available = write.wrapping_sub(read) as usize / 2;
        let fill_average = ctx
            .control
            .update_fill_average(self.fill_average.load(), available);
        self.fill_average.store(fill_average);

        let rate = ctx.control.corrected_rate(
            self.input_sample_rate(),
            fill_average,
            ctx.speed,
            ctx.consider_framelimit,
        );
        let ratio = (FRAC_ONE as f32 * rate / ctx.output_sample_rate as f32)
            .min(MAX_RATIO as f32) as u32;

        let left_volume = self.left_volume.load(Ordering::Relaxed) as i32;
        let right_volume = self.right_volume.load(Ordering::Relaxed) as i32;

        let mut frac = self.frac.load(Ordering::Relaxed);
        let mut underruns = 0u64;
        let mut block = [0i16; RENDER_BLOCK_FRAMES * 2];

        for chunk in out[..frames * 2].chunks_mut(RENDER_BLOCK_FRAMES * 2) {
            let rendered = &mut block[..chunk.len()];

            for frame in rendered.chunks_exact_mut(2) {
                if write.wrapping_sub(read) > 2 {
                    let next = read.wrapping_add(2);
                    let left = interpolate(self.ring.sample(read), self.ring.sample(next), frac);
                    let right = interpolate(
                        self.ring.sample(read.wrapping_add(1)),
                        self.ring.sample(next.wrapping_add(1)),
                        frac,
                    );
                    frame[0] = scale(left, left_volume);
                    frame[1] = scale(right, right_volume);

                    frac += ratio;
                    read = read.wrapping_add(2 * (frac >> 16));
                    frac &= FRAC_ONE - 1;

                    // A ratio above one can step past the producer
                    if write.wrapping_sub(read) > capacity {
                        read = write;
                    }
                } else {
                    // Underrun: hold the last consumed frame (silence before any data)
                    frame[0] = scale(self.ring.sample(read.wrapping_sub(2)) as i32, left_volume);
                    frame[1] = scale(self.ring.sample(read.wrapping_sub(1)) as i32, right_volume);
                    underruns += 1;
                }
            }

            accumulate_saturating(chunk, rendered);
        }

        self.frac.store(frac, Ordering::Relaxed);
        self.ring.commit_read(read);
        if underruns > 0 {
            self.underrun_frames.fetch_add(underruns, Ordering::Relaxed);
        }

        frames
    }
}

/// Linear interpolation with a 16-bit fractional weight
#[inline]
fn interpolate(current: i16, next: i16, frac: u32) -> i32 {
    let current = current as i64;
    let next = next as i64;
    (((current << 16) + (next - current) * frac as i64) >> 16) as i32
}

#[inline]
fn scale(sample: i32, volume: i32) -> i16 {
    clamp_sample((sample * volume) >> 8)
}
