// Ostinato
// Copyright (c) 2026 The Project Ostinato Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! SSE2 conversion kernels.
//!
//! Interleaving quantizes four samples per vector: scale, mask out non-finite lanes, clamp, then
//! `cvtps2dq` (round half to even in the default rounding mode) and a saturating pack to i16.
//! Deinterleaving sign-extends, converts, and scales by the exact power of two, so its output is
//! bit-identical to the reference converter.

#[cfg(target_arch = "x86")]
use core::arch::x86::*;
#[cfg(target_arch = "x86_64")]
use core::arch::x86_64::*;

use super::{quantize, NAN_SAMPLE, NEG_INFINITY_SAMPLE, POS_INFINITY_SAMPLE};

/// Lane select: `(mask & a) | (!mask & b)`. SSE2 has no blend instruction.
#[inline]
#[target_feature(enable = "sse2")]
unsafe fn select(mask: __m128i, a: __m128i, b: __m128i) -> __m128i {
    unsafe { _mm_or_si128(_mm_and_si128(mask, a), _mm_andnot_si128(mask, b)) }
}

/// Quantize four planar samples to four i32 lanes in the i16 range.
///
/// Non-finite lanes are detected before the clamp and rewritten with the architecture-declared
/// constants, so no lane ever reaches the converter out of range.
#[inline]
#[target_feature(enable = "sse2")]
unsafe fn quantize_ps(x: __m128) -> __m128i {
    unsafe {
        let scaled = _mm_mul_ps(x, _mm_set1_ps(32768.0));

        let nan = _mm_castps_si128(_mm_cmpunord_ps(scaled, scaled));
        let pos_inf = _mm_castps_si128(_mm_cmpeq_ps(scaled, _mm_set1_ps(f32::INFINITY)));
        let neg_inf = _mm_castps_si128(_mm_cmpeq_ps(scaled, _mm_set1_ps(f32::NEG_INFINITY)));

        // Clamp in the float domain so every remaining lane converts exactly. cvtps2dq uses the
        // thread's default round-to-nearest-even mode.
        let clamped = _mm_min_ps(_mm_max_ps(scaled, _mm_set1_ps(-32768.0)), _mm_set1_ps(32767.0));

        let mut conv = _mm_cvtps_epi32(clamped);

        conv = select(pos_inf, _mm_set1_epi32(i32::from(POS_INFINITY_SAMPLE)), conv);
        conv = select(neg_inf, _mm_set1_epi32(i32::from(NEG_INFINITY_SAMPLE)), conv);
        conv = select(nan, _mm_set1_epi32(i32::from(NAN_SAMPLE)), conv);

        conv
    }
}

/// # Safety
///
/// The caller must ensure SSE2 is available and that `dst` holds at least `frames` samples while
/// `src` holds at least `frames` samples.
#[target_feature(enable = "sse2")]
pub(super) unsafe fn interleave_mono(src: &[f32], dst: &mut [i16], frames: usize) {
    let mut f = 0;

    unsafe {
        let sp = src.as_ptr();
        let out = dst.as_mut_ptr();

        // 8 samples per iteration.
        while f + 8 <= frames {
            let a = quantize_ps(_mm_loadu_ps(sp.add(f)));
            let b = quantize_ps(_mm_loadu_ps(sp.add(f + 4)));

            // The lanes are already in i16 range; the saturating pack only narrows.
            _mm_storeu_si128(out.add(f) as *mut __m128i, _mm_packs_epi32(a, b));

            f += 8;
        }
    }

    // Scalar tail with identical per-sample semantics.
    while f < frames {
        dst[f] = quantize(src[f]);
        f += 1;
    }
}

/// # Safety
///
/// The caller must ensure SSE2 is available, that `left` and `right` hold at least `frames`
/// samples, and that `dst` holds at least `2 * frames` samples.
#[target_feature(enable = "sse2")]
pub(super) unsafe fn interleave_stereo(left: &[f32], right: &[f32], dst: &mut [i16], frames: usize) {
    let mut f = 0;

    unsafe {
        let lp = left.as_ptr();
        let rp = right.as_ptr();
        let out = dst.as_mut_ptr();

        // 4 frames (8 samples) per iteration.
        while f + 4 <= frames {
            let l = quantize_ps(_mm_loadu_ps(lp.add(f)));
            let r = quantize_ps(_mm_loadu_ps(rp.add(f)));

            // [l0 r0 l1 r1] and [l2 r2 l3 r3] as i32 lanes, then narrow to the eight interleaved
            // i16 samples.
            let lo = _mm_unpacklo_epi32(l, r);
            let hi = _mm_unpackhi_epi32(l, r);

            _mm_storeu_si128(out.add(2 * f) as *mut __m128i, _mm_packs_epi32(lo, hi));

            f += 4;
        }
    }

    // Scalar tail with identical per-sample semantics.
    while f < frames {
        dst[2 * f] = quantize(left[f]);
        dst[2 * f + 1] = quantize(right[f]);
        f += 1;
    }
}

/// # Safety
///
/// The caller must ensure SSE2 is available and that `src` and `dst` hold at least `frames`
/// samples.
#[target_feature(enable = "sse2")]
pub(super) unsafe fn deinterleave_mono(src: &[i16], dst: &mut [f32], frames: usize) {
    let mut f = 0;

    unsafe {
        let sp = src.as_ptr();
        let dp = dst.as_mut_ptr();

        let scale = _mm_set1_ps(1.0 / 32768.0);

        // 8 samples per iteration.
        while f + 8 <= frames {
            let v = _mm_loadu_si128(sp.add(f) as *const __m128i);

            // Sign extend the eight i16 samples to i32 lanes.
            let lo = _mm_srai_epi32::<16>(_mm_unpacklo_epi16(v, v));
            let hi = _mm_srai_epi32::<16>(_mm_unpackhi_epi16(v, v));

            _mm_storeu_ps(dp.add(f), _mm_mul_ps(_mm_cvtepi32_ps(lo), scale));
            _mm_storeu_ps(dp.add(f + 4), _mm_mul_ps(_mm_cvtepi32_ps(hi), scale));

            f += 8;
        }
    }

    while f < frames {
        dst[f] = src[f] as f32 / 32768.0;
        f += 1;
    }
}

/// # Safety
///
/// The caller must ensure SSE2 is available, that `src` holds at least `2 * frames` samples, and
/// that `left` and `right` hold at least `frames` samples.
#[target_feature(enable = "sse2")]
pub(super) unsafe fn deinterleave_stereo(
    src: &[i16],
    left: &mut [f32],
    right: &mut [f32],
    frames: usize,
) {
    let mut f = 0;

    unsafe {
        let sp = src.as_ptr();
        let lp = left.as_mut_ptr();
        let rp = right.as_mut_ptr();

        let scale = _mm_set1_ps(1.0 / 32768.0);

        // 4 frames (8 samples) per iteration.
        while f + 4 <= frames {
            let v = _mm_loadu_si128(sp.add(2 * f) as *const __m128i);

            // Sign extend to [l0 r0 l1 r1] and [l2 r2 l3 r3] as i32 lanes.
            let lo = _mm_srai_epi32::<16>(_mm_unpacklo_epi16(v, v));
            let hi = _mm_srai_epi32::<16>(_mm_unpackhi_epi16(v, v));

            let flo = _mm_mul_ps(_mm_cvtepi32_ps(lo), scale);
            let fhi = _mm_mul_ps(_mm_cvtepi32_ps(hi), scale);

            // Gather the even lanes into the left plane and the odd lanes into the right.
            _mm_storeu_ps(lp.add(f), _mm_shuffle_ps::<0b10_00_10_00>(flo, fhi));
            _mm_storeu_ps(rp.add(f), _mm_shuffle_ps::<0b11_01_11_01>(flo, fhi));

            f += 4;
        }
    }

    while f < frames {
        left[f] = src[2 * f] as f32 / 32768.0;
        right[f] = src[2 * f + 1] as f32 / 32768.0;
        f += 1;
    }
}
