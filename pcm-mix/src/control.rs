//! Buffer-occupancy rate control
//!
//! Each fifo nudges its effective input rate so ring occupancy hovers
//! around a target: a ring filling up plays slightly faster, a ring
//! draining plays slightly slower. Tuning lives in a [`ControlConfig`]
//! snapshot that the mix callback loads once per cycle.

use crate::error::{MixError, Result};
use crate::types::{
    CONTROL_AVG, CONTROL_FACTOR, FREQ_SHIFT_REFERENCE_RATE, LOW_WATERMARK, MAX_FREQ_SHIFT,
    MAX_SAMPLES,
};
use crossbeam::atomic::AtomicCell;
use std::sync::atomic::{AtomicU32, Ordering};

/// Rate-control tuning snapshot
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ControlConfig {
    /// Target occupancy in frames
    pub low_watermark: u32,
    /// Hz of correction per frame of occupancy error
    pub control_factor: f32,
    /// Callbacks averaged by the occupancy estimate
    pub control_avg: u32,
    /// Correction bound in Hz per 32000 Hz of input rate
    pub max_freq_shift: f32,
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            low_watermark: LOW_WATERMARK,
            control_factor: CONTROL_FACTOR,
            control_avg: CONTROL_AVG,
            max_freq_shift: MAX_FREQ_SHIFT,
        }
    }
}

impl ControlConfig {
    pub fn validate(&self) -> Result<()> {
        if self.control_avg == 0 {
            return Err(MixError::InvalidConfig("control_avg must be at least 1".into()));
        }
        if self.low_watermark as usize > MAX_SAMPLES {
            return Err(MixError::InvalidConfig(format!(
                "low_watermark {} exceeds ring capacity {}",
                self.low_watermark, MAX_SAMPLES
            )));
        }
        if !self.control_factor.is_finite() || self.control_factor < 0.0 {
            return Err(MixError::InvalidConfig(format!(
                "control_factor must be finite and non-negative, got {}",
                self.control_factor
            )));
        }
        if !self.max_freq_shift.is_finite() || self.max_freq_shift < 0.0 {
            return Err(MixError::InvalidConfig(format!(
                "max_freq_shift must be finite and non-negative, got {}",
                self.max_freq_shift
            )));
        }
        Ok(())
    }

    /// Largest correction in Hz for a source at `input_rate`
    pub fn max_shift_hz(&self, input_rate: u32) -> f32 {
        self.max_freq_shift * input_rate as f32 / FREQ_SHIFT_REFERENCE_RATE
    }

    /// Occupancy target in frames for a source at `input_rate`
    ///
    /// `low_watermark` is expressed against 32000 Hz so every source keeps
    /// the same latency; the result never exceeds half a ring.
    pub fn target_fill(&self, input_rate: u32) -> f32 {
        let scaled = self.low_watermark as f32 * input_rate as f32 / FREQ_SHIFT_REFERENCE_RATE;
        scaled.min((MAX_SAMPLES / 2) as f32)
    }

    /// Fold the current occupancy into the running average
    pub fn update_fill_average(&self, average: f32, available_frames: usize) -> f32 {
        let n = self.control_avg as f32;
        (available_frames as f32 + average * (n - 1.0)) / n
    }

    /// Effective input rate for one mix cycle
    ///
    /// With framelimiting off the nominal rate is used untouched. Otherwise
    /// the occupancy correction is applied and, when the host has reported
    /// a speed, the result is scaled by it.
    pub fn corrected_rate(
        &self,
        input_rate: u32,
        fill_average: f32,
        speed: f32,
        consider_framelimit: bool,
    ) -> f32 {
        let rate = input_rate as f32;
        if !consider_framelimit {
            return rate;
        }

        let bound = self.max_shift_hz(input_rate);
        let offset = ((fill_average - self.target_fill(input_rate)) * self.control_factor)
            .clamp(-bound, bound);

        if speed > 0.0 {
            (rate + offset) * speed
        } else {
            rate + offset
        }
    }
}

/// Atomically swappable [`ControlConfig`]
///
/// Each field is its own lock-free atomic, so loading never allocates,
/// frees or waits. A load racing a store may mix old and new fields; every
/// field is validated on its own, so any mix is still a valid config.
pub struct ConfigCell {
    low_watermark: AtomicU32,
    control_factor: AtomicCell<f32>,
    control_avg: AtomicU32,
    max_freq_shift: AtomicCell<f32>,
}

impl ConfigCell {
    pub fn new(config: ControlConfig) -> Self {
        Self {
            low_watermark: AtomicU32::new(config.low_watermark),
            control_factor: AtomicCell::new(config.control_factor),
            control_avg: AtomicU32::new(config.control_avg),
            max_freq_shift: AtomicCell::new(config.max_freq_shift),
        }
    }

    pub fn load(&self) -> ControlConfig {
        ControlConfig {
            low_watermark: self.low_watermark.load(Ordering::Acquire),
            control_factor: self.control_factor.load(),
            control_avg: self.control_avg.load(Ordering::Acquire),
            max_freq_shift: self.max_freq_shift.load(),
        }
    }

    pub fn store(&self, config: ControlConfig) {
        self.low_watermark.store(config.low_watermark, Ordering::Release);
        self.control_factor.store(config.control_factor);
        self.control_avg.store(config.control_avg, Ordering::Release);
        self.max_freq_shift.store(config.max_freq_shift);
    }
}

impl Default for ConfigCell {
    fn default() -> Self {
        Self::new(ControlConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_valid() {
        assert!(ControlConfig::default().validate().is_ok());
    }

    #[test]
    fn test_invalid_configs_rejected() {
        let zero_avg = ControlConfig {
            control_avg: 0,
            ..Default::default()
        };
        assert!(matches!(zero_avg.validate(), Err(MixError::InvalidConfig(_))));

        let huge_watermark = ControlConfig {
            low_watermark: MAX_SAMPLES as u32 + 1,
            ..Default::default()
        };
        assert!(huge_watermark.validate().is_err());

        let nan_factor = ControlConfig {
            control_factor: f32::NAN,
            ..Default::default()
        };
        assert!(nan_factor.validate().is_err());
    }

    #[test]
    fn test_correction_sign() {
        let config = ControlConfig::default();

        // Draining ring: play slower
        assert!(config.corrected_rate(32000, 100.0, 0.0, true) < 32000.0);
        // Filling ring: play faster
        assert!(config.corrected_rate(32000, 2000.0, 0.0, true) > 32000.0);
        // On target: nominal
        assert_eq!(config.corrected_rate(32000, LOW_WATERMARK as f32, 0.0, true), 32000.0);
    }

    #[test]
    fn test_correction_bounded() {
        let config = ControlConfig::default();

        for input_rate in [3000u32, 32000, 48000] {
            for speed in [0.0f32, 0.5, 1.0, 2.0] {
                let nominal = if speed > 0.0 {
                    input_rate as f32 * speed
                } else {
                    input_rate as f32
                };

                for fill in (0..=MAX_SAMPLES).step_by(64) {
                    let rate = config.corrected_rate(input_rate, fill as f32, speed, true);
                    let deviation = (rate - nominal).abs() / nominal;
                    assert!(
                        deviation <= MAX_FREQ_SHIFT / FREQ_SHIFT_REFERENCE_RATE + 1e-6,
                        "rate {} deviates {} from {}",
                        rate,
                        deviation,
                        nominal
                    );
                }
            }
        }
    }

    #[test]
    fn test_framelimit_off_is_nominal() {
        let config = ControlConfig::default();
        assert_eq!(config.corrected_rate(32000, 4000.0, 2.0, false), 32000.0);
        assert_eq!(config.corrected_rate(32000, 0.0, 0.5, false), 32000.0);
    }

    #[test]
    fn test_speed_scales_rate() {
        let config = ControlConfig::default();
        let rate = config.corrected_rate(32000, LOW_WATERMARK as f32, 2.0, true);
        assert_eq!(rate, 64000.0);
    }

    #[test]
    fn test_fill_average_converges() {
        let config = ControlConfig::default();
        let mut average = 0.0;
        for _ in 0..1000 {
            average = config.update_fill_average(average, 2000);
        }
        assert!((average - 2000.0).abs() < 1.0);
    }

    #[test]
    fn test_config_cell_swap() {
        let cell = ConfigCell::default();
        assert_eq!(cell.load(), ControlConfig::default());

        let tuned = ControlConfig {
            low_watermark: 512,
            ..Default::default()
        };
        cell.store(tuned);
        assert_eq!(cell.load().low_watermark, 512);
    }

    #[test]
    fn test_config_cell_is_lock_free() {
        assert!(AtomicCell::<f32>::is_lock_free());
    }

    #[test]
    fn test_target_fill_scales_with_rate() {
        let config = ControlConfig::default();

        assert_eq!(config.target_fill(32000), LOW_WATERMARK as f32);
        assert_eq!(config.target_fill(3000), 120.0);
        // 1920 frames at 48 kHz still fits in half a ring
        assert_eq!(config.target_fill(48000), 1920.0);
        assert_eq!(config.target_fill(96000), (MAX_SAMPLES / 2) as f32);

        // A low-rate ring sitting on its own target gets no correction
        assert_eq!(config.corrected_rate(3000, 120.0, 0.0, true), 3000.0);
        assert!(config.corrected_rate(3000, 200.0, 0.0, true) > 3000.0);
    }
}
