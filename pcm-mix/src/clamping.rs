//! Saturating 16-bit accumulation with AVX2 SIMD
//!
//! Adds a rendered block of interleaved samples into the mix buffer,
//! saturating at the signed 16-bit range instead of wrapping.
//! AVX2 implementation processes 16 samples per iteration.

#[cfg(target_arch = "x86_64")]
use std::arch::x86_64::*;

/// Clamp a widened sample back into the signed 16-bit range
#[inline]
pub fn clamp_sample(value: i32) -> i16 {
    value.clamp(i16::MIN as i32, i16::MAX as i32) as i16
}

/// Saturating `dst[i] += src[i]` with AVX2 SIMD
///
/// # Safety
/// Requires AVX2 CPU support.
#[target_feature(enable = "avx2")]
#[cfg(target_arch = "x86_64")]
pub unsafe fn accumulate_saturating_avx2(dst: &mut [i16], src: &[i16]) {
    let len = dst.len().min(src.len());
    let mut i = 0;

    while i + 16 <= len {
        let a = _mm256_loadu_si256(dst.as_ptr().add(i) as *const __m256i);
        let b = _mm256_loadu_si256(src.as_ptr().add(i) as *const __m256i);
        _mm256_storeu_si256(dst.as_mut_ptr().add(i) as *mut __m256i, _mm256_adds_epi16(a, b));
        i += 16;
    }

    // Remaining samples (< 16)
    while i < len {
        dst[i] = dst[i].saturating_add(src[i]);
        i += 1;
    }
}

/// Scalar fallback (portable, slower)
pub fn accumulate_saturating_scalar(dst: &mut [i16], src: &[i16]) {
    for (d, s) in dst.iter_mut().zip(src) {
        *d = d.saturating_add(*s);
    }
}

/// Auto-dispatch accumulation with runtime CPU detection
pub fn accumulate_saturating(dst: &mut [i16], src: &[i16]) {
    #[cfg(target_arch = "x86_64")]
    {
        if is_x86_feature_detected!("avx2") {
            unsafe {
                accumulate_saturating_avx2(dst, src);
            }
            return;
        }
    }

    accumulate_saturating_scalar(dst, src);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accumulate_in_range() {
        let mut dst = vec![100, -100, 0, 2000];
        accumulate_saturating(&mut dst, &[1, 1, -5, -1000]);

        assert_eq!(dst, vec![101, -99, -5, 1000]);
    }

    #[test]
    fn test_accumulate_saturates() {
        let mut dst = vec![30000, -30000, i16::MAX, i16::MIN];
        accumulate_saturating(&mut dst, &[10000, -10000, 1, -1]);

        assert_eq!(dst, vec![i16::MAX, i16::MIN, i16::MAX, i16::MIN]);
    }

    #[test]
    fn test_accumulate_shorter_source() {
        let mut dst = vec![1i16; 40];
        accumulate_saturating(&mut dst, &[1i16; 20]);

        assert!(dst[..20].iter().all(|&s| s == 2));
        assert!(dst[20..].iter().all(|&s| s == 1));
    }

    #[test]
    fn test_clamp_sample() {
        assert_eq!(clamp_sample(40000), i16::MAX);
        assert_eq!(clamp_sample(-40000), i16::MIN);
        assert_eq!(clamp_sample(-1234), -1234);
    }

    #[test]
    #[cfg(target_arch = "x86_64")]
    fn test_avx2_vs_scalar() {
        if !is_x86_feature_detected!("avx2") {
            return; // Skip if no AVX2 support
        }

        let src: Vec<i16> = (0..1027).map(|i| ((i * 7919) % 65536 - 32768) as i16).collect();
        let base: Vec<i16> = (0..1027).map(|i| ((i * 104729) % 65536 - 32768) as i16).collect();

        let mut simd = base.clone();
        let mut scalar = base;

        unsafe {
            accumulate_saturating_avx2(&mut simd, &src);
        }
        accumulate_saturating_scalar(&mut scalar, &src);

        assert_eq!(simd, scalar);
    }
}
