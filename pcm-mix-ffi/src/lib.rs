//! PCM Mixer FFI - C Foreign Function Interface
//!
//! C-compatible API for audio backends and host loops. Sample buffers are
//! interleaved 16-bit stereo; counts are in frames.

use libc::{c_char, c_int, c_uint};
use pcm_mix::Mixer;
use std::ffi::CStr;
use std::slice;

/// Opaque handle to Mixer (C-compatible)
pub struct PcmMixer {
    _private: [u8; 0],
}

unsafe fn as_mixer<'a>(ptr: *const PcmMixer) -> Option<&'a Mixer> {
    (ptr as *const Mixer).as_ref()
}

unsafe fn as_frames<'a>(samples: *const i16, num_frames: c_uint) -> Option<&'a [i16]> {
    if samples.is_null() {
        return None;
    }
    Some(slice::from_raw_parts(samples, num_frames as usize * 2))
}

unsafe fn path_arg<'a>(path: *const c_char) -> Option<&'a str> {
    if path.is_null() {
        return None;
    }
    match CStr::from_ptr(path).to_str() {
        Ok(path) => Some(path),
        Err(e) => {
            log::error!("Log path is not valid UTF-8: {}", e);
            None
        }
    }
}

// ============================================================================
// LIFECYCLE
// ============================================================================

/// Create a mixer producing `sample_rate` Hz output
///
/// # Safety
/// Safe to call. Release with `pcm_mix_destroy`.
#[no_mangle]
pub unsafe extern "C" fn pcm_mix_create(sample_rate: c_uint) -> *mut PcmMixer {
    let mixer = Box::new(Mixer::new(sample_rate));
    Box::into_raw(mixer) as *mut PcmMixer
}

/// Destroy a mixer
///
/// # Safety
/// Caller must ensure ptr is valid, not already freed, and no longer
/// reachable from the audio callback.
#[no_mangle]
pub unsafe extern "C" fn pcm_mix_destroy(ptr: *mut PcmMixer) {
    if !ptr.is_null() {
        let _ = Box::from_raw(ptr as *mut Mixer);
    }
}

/// Output sample rate in Hz
///
/// # Safety
/// Caller must ensure ptr is valid.
#[no_mangle]
pub unsafe extern "C" fn pcm_mix_get_sample_rate(ptr: *const PcmMixer) -> c_uint {
    as_mixer(ptr).map_or(0, |m| m.sample_rate())
}

// ============================================================================
// AUDIO CALLBACK
// ============================================================================

/// Mix `num_frames` frames into `samples`
///
/// Returns the number of frames produced.
///
/// # Safety
/// Caller must ensure ptr is valid and `samples` holds `num_frames * 2` values.
#[no_mangle]
pub unsafe extern "C" fn pcm_mix_mix(
    ptr: *const PcmMixer,
    samples: *mut i16,
    num_frames: c_uint,
    consider_framelimit: bool,
) -> c_uint {
    let Some(mixer) = as_mixer(ptr) else {
        return 0;
    };
    if samples.is_null() {
        return 0;
    }

    let out = slice::from_raw_parts_mut(samples, num_frames as usize * 2);
    mixer.mix(out, num_frames as usize, consider_framelimit) as c_uint
}

// ============================================================================
// PRODUCERS
// ============================================================================

/// Push DMA audio
///
/// # Safety
/// Caller must ensure ptr is valid and `samples` holds `num_frames * 2` values.
/// Only one thread may push DMA audio at a time.
#[no_mangle]
pub unsafe extern "C" fn pcm_mix_push_samples(
    ptr: *const PcmMixer,
    samples: *const i16,
    num_frames: c_uint,
) {
    if let (Some(mixer), Some(samples)) = (as_mixer(ptr), as_frames(samples, num_frames)) {
        mixer.push_samples(samples);
    }
}

/// Push streaming audio
///
/// # Safety
/// Caller must ensure ptr is valid and `samples` holds `num_frames * 2` values.
/// Only one thread may push streaming audio at a time.
#[no_mangle]
pub unsafe extern "C" fn pcm_mix_push_streaming_samples(
    ptr: *const PcmMixer,
    samples: *const i16,
    num_frames: c_uint,
) {
    if let (Some(mixer), Some(samples)) = (as_mixer(ptr), as_frames(samples, num_frames)) {
        mixer.push_streaming_samples(samples);
    }
}

/// Push Wiimote speaker audio produced at `sample_rate`
///
/// # Safety
/// Caller must ensure ptr is valid and `samples` holds `num_frames * 2` values.
/// Only one thread may push Wiimote speaker audio at a time.
#[no_mangle]
pub unsafe extern "C" fn pcm_mix_push_wiimote_speaker_samples(
    ptr: *const PcmMixer,
    samples: *const i16,
    num_frames: c_uint,
    sample_rate: c_uint,
) {
    if let (Some(mixer), Some(samples)) = (as_mixer(ptr), as_frames(samples, num_frames)) {
        mixer.push_wiimote_speaker_samples(samples, sample_rate);
    }
}

// ============================================================================
// CONTROL
// ============================================================================

/// # Safety
/// Caller must ensure ptr is valid.
#[no_mangle]
pub unsafe extern "C" fn pcm_mix_set_dma_input_sample_rate(ptr: *const PcmMixer, rate: c_uint) {
    if let Some(mixer) = as_mixer(ptr) {
        mixer.set_dma_input_sample_rate(rate);
    }
}

/// # Safety
/// Caller must ensure ptr is valid.
#[no_mangle]
pub unsafe extern "C" fn pcm_mix_set_stream_input_sample_rate(ptr: *const PcmMixer, rate: c_uint) {
    if let Some(mixer) = as_mixer(ptr) {
        mixer.set_stream_input_sample_rate(rate);
    }
}

/// Set streaming volume, 0-256 per channel
///
/// # Safety
/// Caller must ensure ptr is valid.
#[no_mangle]
pub unsafe extern "C" fn pcm_mix_set_streaming_volume(
    ptr: *const PcmMixer,
    left: c_uint,
    right: c_uint,
) {
    if let Some(mixer) = as_mixer(ptr) {
        mixer.set_streaming_volume(left, right);
    }
}

/// Set Wiimote speaker volume, 0-256 per channel
///
/// # Safety
/// Caller must ensure ptr is valid.
#[no_mangle]
pub unsafe extern "C" fn pcm_mix_set_wiimote_speaker_volume(
    ptr: *const PcmMixer,
    left: c_uint,
    right: c_uint,
) {
    if let Some(mixer) = as_mixer(ptr) {
        mixer.set_wiimote_speaker_volume(left, right);
    }
}

/// Current emulation speed (1.0 = full speed, 0.0 = unknown)
///
/// # Safety
/// Caller must ensure ptr is valid.
#[no_mangle]
pub unsafe extern "C" fn pcm_mix_get_current_speed(ptr: *const PcmMixer) -> f32 {
    as_mixer(ptr).map_or(0.0, |m| m.current_speed())
}

/// # Safety
/// Caller must ensure ptr is valid.
#[no_mangle]
pub unsafe extern "C" fn pcm_mix_update_speed(ptr: *const PcmMixer, speed: f32) {
    if let Some(mixer) = as_mixer(ptr) {
        mixer.update_speed(speed);
    }
}

// ============================================================================
// DIAGNOSTIC LOGS
// ============================================================================

/// Start capturing streaming pushes to a WAV file
///
/// Returns 1 on success, 0 on failure.
///
/// # Safety
/// Caller must ensure ptr is valid and `path` is a NUL-terminated string.
#[no_mangle]
pub unsafe extern "C" fn pcm_mix_start_log_dtk_audio(
    ptr: *const PcmMixer,
    path: *const c_char,
) -> c_int {
    let (Some(mixer), Some(path)) = (as_mixer(ptr), path_arg(path)) else {
        return 0;
    };
    match mixer.start_log_dtk_audio(path) {
        Ok(()) => 1,
        Err(e) => {
            log::error!("Failed to start DTK audio log: {}", e);
            0
        }
    }
}

/// # Safety
/// Caller must ensure ptr is valid.
#[no_mangle]
pub unsafe extern "C" fn pcm_mix_stop_log_dtk_audio(ptr: *const PcmMixer) {
    if let Some(mixer) = as_mixer(ptr) {
        if let Err(e) = mixer.stop_log_dtk_audio() {
            log::error!("Failed to finalize DTK audio log: {}", e);
        }
    }
}

/// Start capturing DMA pushes to a WAV file
///
/// Returns 1 on success, 0 on failure.
///
/// # Safety
/// Caller must ensure ptr is valid and `path` is a NUL-terminated string.
#[no_mangle]
pub unsafe extern "C" fn pcm_mix_start_log_dsp_audio(
    ptr: *const PcmMixer,
    path: *const c_char,
) -> c_int {
    let (Some(mixer), Some(path)) = (as_mixer(ptr), path_arg(path)) else {
        return 0;
    };
    match mixer.start_log_dsp_audio(path) {
        Ok(()) => 1,
        Err(e) => {
            log::error!("Failed to start DSP audio log: {}", e);
            0
        }
    }
}

/// # Safety
/// Caller must ensure ptr is valid.
#[no_mangle]
pub unsafe extern "C" fn pcm_mix_stop_log_dsp_audio(ptr: *const PcmMixer) {
    if let Some(mixer) = as_mixer(ptr) {
        if let Err(e) = mixer.stop_log_dsp_audio() {
            log::error!("Failed to finalize DSP audio log: {}", e);
        }
    }
}

// ============================================================================
// UTILITY FUNCTIONS
// ============================================================================

/// Get library version string
#[no_mangle]
pub extern "C" fn pcm_rust_version() -> *const c_char {
    "0.1.0\0".as_ptr() as *const c_char
}

/// Check if AVX2 (used for saturating accumulation) is available
#[no_mangle]
pub extern "C" fn pcm_rust_has_avx2() -> c_int {
    #[cfg(target_arch = "x86_64")]
    {
        if is_x86_feature_detected!("avx2") {
            return 1;
        }
    }
    0
}
