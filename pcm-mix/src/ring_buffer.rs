//! Lock-free SPSC ring of interleaved stereo samples
//!
//! One producer thread appends frames, one consumer thread reads them.
//! Both indices count samples (not frames), grow monotonically and wrap
//! through `u32` arithmetic; only addressing is masked. The producer
//! release-publishes `write_index` after copying, the consumer
//! release-publishes `read_index` after reading.

use crate::error::{MixError, Result};
use crate::types::MAX_SAMPLES;
use crossbeam::utils::CachePadded;
use std::sync::atomic::{AtomicI16, AtomicU32, Ordering};

/// Fixed-capacity circular buffer shared by one producer and one consumer
pub struct SampleRing {
    // Atomic cells so a misbehaving second writer garbles audio instead of racing
    buffer: Box<[AtomicI16]>,
    mask: u32,
    write_index: CachePadded<AtomicU32>,
    read_index: CachePadded<AtomicU32>,
}

impl SampleRing {
    /// Create a ring holding `MAX_SAMPLES` frames
    pub fn new() -> Self {
        Self::allocate(MAX_SAMPLES)
    }

    /// Create a ring holding `frames` stereo frames
    ///
    /// The capacity must be a non-zero power of two so wraparound is a mask.
    pub fn with_capacity(frames: usize) -> Result<Self> {
        if frames == 0 || !frames.is_power_of_two() || frames > (u32::MAX as usize) / 4 {
            return Err(MixError::InvalidCapacity(frames));
        }
        Ok(Self::allocate(frames))
    }

    fn allocate(frames: usize) -> Self {
        let samples = frames * 2;
        let buffer = (0..samples).map(|_| AtomicI16::new(0)).collect();

        Self {
            buffer,
            mask: (samples - 1) as u32,
            write_index: CachePadded::new(AtomicU32::new(0)),
            read_index: CachePadded::new(AtomicU32::new(0)),
        }
    }

    /// Capacity in frames
    pub fn capacity(&self) -> usize {
        self.buffer.len() / 2
    }

    /// Append interleaved stereo frames (producer side)
    ///
    /// Frames that do not fit are dropped; unread data is never overwritten.
    /// A trailing odd sample is ignored. Returns the number of frames stored.
    pub fn push(&self, samples: &[i16]) -> usize {
        let frames = samples.len() / 2;
        let write = self.write_index.load(Ordering::Relaxed);
        let read = self.read_index.load(Ordering::Acquire);

        let used = write.wrapping_sub(read) as usize;
        let free_frames = self.buffer.len().saturating_sub(used) / 2;
        let stored = frames.min(free_frames);

        for (offset, &sample) in samples[..stored * 2].iter().enumerate() {
            self.cell(write.wrapping_add(offset as u32))
                .store(sample, Ordering::Relaxed);
        }

        self.write_index
            .store(write.wrapping_add((stored * 2) as u32), Ordering::Release);
        stored
    }

    /// Copy unread frames into `out` and release them (consumer side)
    ///
    /// Returns the number of frames copied.
    pub fn pop(&self, out: &mut [i16]) -> usize {
        let read = self.read_index();
        let available = self.write_index().wrapping_sub(read) as usize / 2;
        let frames = available.min(out.len() / 2);

        for (offset, slot) in out[..frames * 2].iter_mut().enumerate() {
            *slot = self.sample(read.wrapping_add(offset as u32));
        }

        self.commit_read(read.wrapping_add((frames * 2) as u32));
        frames
    }

    /// Unread frames, clamped to capacity
    pub fn available_frames(&self) -> usize {
        let write = self.write_index.load(Ordering::Acquire);
        let read = self.read_index.load(Ordering::Acquire);
        (write.wrapping_sub(read) as usize / 2).min(self.capacity())
    }

    /// Producer position, acquire-loaded so samples before it are visible
    pub(crate) fn write_index(&self) -> u32 {
        self.write_index.load(Ordering::Acquire)
    }

    /// Consumer position; only the consumer stores it
    pub(crate) fn read_index(&self) -> u32 {
        self.read_index.load(Ordering::Relaxed)
    }

    /// Publish consumption up to `index`
    pub(crate) fn commit_read(&self, index: u32) {
        self.read_index.store(index, Ordering::Release);
    }

    /// Sample at an unmasked index
    #[inline]
    pub(crate) fn sample(&self, index: u32) -> i16 {
        self.cell(index).load(Ordering::Relaxed)
    }

    /// Capacity in samples
    pub(crate) fn capacity_samples(&self) -> u32 {
        self.mask + 1
    }

    #[inline]
    fn cell(&self, index: u32) -> &AtomicI16 {
        &self.buffer[(index & self.mask) as usize]
    }
}

impl Default for SampleRing {
    fn default() -> Self {
        Self::new()
    }
}
