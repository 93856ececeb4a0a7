//! Diagnostic WAV capture of raw pushed samples
//!
//! Captures are written on the producer thread, never on the mix path.
//! Start/stop may be called from a control thread at any time.
//!
//! This is the one place that locks: while a capture is enabled, each push
//! takes the writer's `parking_lot::Mutex` and performs file I/O on the
//! producer thread. With capture off a push costs one atomic load, and
//! [`Mixer::mix`](crate::Mixer::mix) never touches a log.

use crate::error::Result;
use hound::{SampleFormat, WavSpec, WavWriter};
use parking_lot::Mutex;
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

/// 16-bit stereo PCM WAV writer
///
/// A sample-rate change mid-capture finalizes the current file and
/// continues in `<stem>_<n>.wav`.
pub struct WaveFileWriter {
    writer: Option<WavWriter<BufWriter<File>>>,
    base_path: PathBuf,
    current_path: PathBuf,
    sample_rate: u32,
    file_index: u32,
    frames_written: u64,
}

impl WaveFileWriter {
    pub fn create(path: impl AsRef<Path>, sample_rate: u32) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let writer = WavWriter::create(&path, stereo_spec(sample_rate))?;

        Ok(Self {
            writer: Some(writer),
            base_path: path.clone(),
            current_path: path,
            sample_rate,
            file_index: 1,
            frames_written: 0,
        })
    }

    /// Append interleaved stereo frames captured at `sample_rate`
    pub fn add_stereo_samples(&mut self, samples: &[i16], sample_rate: u32) -> Result<()> {
        if sample_rate != self.sample_rate {
            self.roll_over(sample_rate)?;
        }

        let frames = samples.len() / 2;
        if let Some(writer) = self.writer.as_mut() {
            for &sample in &samples[..frames * 2] {
                writer.write_sample(sample)?;
            }
        }
        self.frames_written += frames as u64;
        Ok(())
    }

    fn roll_over(&mut self, sample_rate: u32) -> Result<()> {
        if let Some(writer) = self.writer.take() {
            writer.finalize()?;
        }

        self.file_index += 1;
        self.current_path = numbered_path(&self.base_path, self.file_index);
        log::warn!(
            "Sample rate changed {} -> {} Hz, continuing capture in {}",
            self.sample_rate,
            sample_rate,
            self.current_path.display()
        );

        self.writer = Some(WavWriter::create(&self.current_path, stereo_spec(sample_rate))?);
        self.sample_rate = sample_rate;
        Ok(())
    }

    /// Patch the header with the final length and close the file
    pub fn finalize(mut self) -> Result<()> {
        if let Some(writer) = self.writer.take() {
            writer.finalize()?;
        }
        Ok(())
    }

    /// Frames written across all files of this capture
    pub fn frames_written(&self) -> u64 {
        self.frames_written
    }

    /// File currently receiving samples
    pub fn path(&self) -> &Path {
        &self.current_path
    }
}

fn stereo_spec(sample_rate: u32) -> WavSpec {
    WavSpec {
        channels: 2,
        sample_rate,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    }
}

fn numbered_path(base: &Path, index: u32) -> PathBuf {
    let stem = base
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let name = match base.extension() {
        Some(ext) => format!("{}_{}.{}", stem, index, ext.to_string_lossy()),
        None => format!("{}_{}", stem, index),
    };
    base.with_file_name(name)
}

/// Toggleable capture sink for one source
///
/// The enable flag is the only state the push path checks before taking
/// the writer lock, so a disabled log costs one atomic load.
pub struct WaveLog {
    name: &'static str,
    enabled: AtomicBool,
    writer: Mutex<Option<WaveFileWriter>>,
}

impl WaveLog {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            enabled: AtomicBool::new(false),
            writer: Mutex::new(None),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }

    /// Open a capture file; a capture already running is kept
    pub fn start(&self, path: impl AsRef<Path>, sample_rate: u32) -> Result<()> {
        let path = path.as_ref();
        let mut slot = self.writer.lock();

        if let Some(existing) = slot.as_ref() {
            log::warn!(
                "{} audio log already running to {}",
                self.name,
                existing.path().display()
            );
            return Ok(());
        }

        *slot = Some(WaveFileWriter::create(path, sample_rate)?);
        self.enabled.store(true, Ordering::Release);
        log::info!("Started {} audio log: {}", self.name, path.display());
        Ok(())
    }

    /// Finalize and release the capture file
    pub fn stop(&self) -> Result<()> {
        self.enabled.store(false, Ordering::Release);
        let writer = self.writer.lock().take();

        match writer {
            Some(writer) => {
                let frames = writer.frames_written();
                let path = writer.path().to_path_buf();
                writer.finalize()?;
                log::info!(
                    "Stopped {} audio log: {} ({} frames)",
                    self.name,
                    path.display(),
                    frames
                );
            }
            None => log::warn!("{} audio log was not running", self.name),
        }
        Ok(())
    }

    /// Capture pushed samples if enabled (producer thread)
    ///
    /// A write failure closes the log instead of reaching the caller.
    pub fn write(&self, samples: &[i16], sample_rate: u32) {
        if !self.is_enabled() {
            return;
        }

        let mut slot = self.writer.lock();
        let Some(writer) = slot.as_mut() else {
            return;
        };

        if let Err(e) = writer.add_stereo_samples(samples, sample_rate) {
            log::error!("{} audio log write failed, closing: {}", self.name, e);
            self.enabled.store(false, Ordering::Release);
            slot.take();
        }
    }
}
