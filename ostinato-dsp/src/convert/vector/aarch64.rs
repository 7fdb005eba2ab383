// Ostinato
// Copyright (c) 2026 The Project Ostinato Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! NEON conversion kernels.
//!
//! `FCVTNS` rounds half to even, converts NaN to 0, and saturates out-of-range values per sign,
//! which is exactly the architecture-declared edge behavior on AArch64, so interleaving needs no
//! lane fixups. Deinterleaving widens, converts, and scales by the exact power of two, so its
//! output is bit-identical to the reference converter.

use core::arch::aarch64::*;

use super::quantize;

/// # Safety
///
/// The caller must ensure that `src` and `dst` hold at least `frames` samples.
#[target_feature(enable = "neon")]
pub(super) unsafe fn interleave_mono(src: &[f32], dst: &mut [i16], frames: usize) {
    let mut f = 0;

    unsafe {
        let sp = src.as_ptr();
        let out = dst.as_mut_ptr();

        let scale = vdupq_n_f32(32768.0);

        // 8 samples per iteration.
        while f + 8 <= frames {
            let a = vcvtnq_s32_f32(vmulq_f32(vld1q_f32(sp.add(f)), scale));
            let b = vcvtnq_s32_f32(vmulq_f32(vld1q_f32(sp.add(f + 4)), scale));

            vst1q_s16(out.add(f), vcombine_s16(vqmovn_s32(a), vqmovn_s32(b)));

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
/// The caller must ensure that `left` and `right` hold at least `frames` samples and that `dst`
/// holds at least `2 * frames` samples.
#[target_feature(enable = "neon")]
pub(super) unsafe fn interleave_stereo(left: &[f32], right: &[f32], dst: &mut [i16], frames: usize) {
    let mut f = 0;

    unsafe {
        let lp = left.as_ptr();
        let rp = right.as_ptr();
        let out = dst.as_mut_ptr();

        let scale = vdupq_n_f32(32768.0);

        // 4 frames (8 samples) per iteration.
        while f + 4 <= frames {
            let l = vcvtnq_s32_f32(vmulq_f32(vld1q_f32(lp.add(f)), scale));
            let r = vcvtnq_s32_f32(vmulq_f32(vld1q_f32(rp.add(f)), scale));

            // Interleaving store: l0 r0 l1 r1 l2 r2 l3 r3.
            vst2_s16(out.add(2 * f), int16x4x2_t(vqmovn_s32(l), vqmovn_s32(r)));

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
/// The caller must ensure that `src` and `dst` hold at least `frames` samples.
#[target_feature(enable = "neon")]
pub(super) unsafe fn deinterleave_mono(src: &[i16], dst: &mut [f32], frames: usize) {
    let mut f = 0;

    unsafe {
        let sp = src.as_ptr();
        let dp = dst.as_mut_ptr();

        let scale = 1.0 / 32768.0;

        // 8 samples per iteration.
        while f + 8 <= frames {
            let v = vld1q_s16(sp.add(f));

            let lo = vcvtq_f32_s32(vmovl_s16(vget_low_s16(v)));
            let hi = vcvtq_f32_s32(vmovl_s16(vget_high_s16(v)));

            vst1q_f32(dp.add(f), vmulq_n_f32(lo, scale));
            vst1q_f32(dp.add(f + 4), vmulq_n_f32(hi, scale));

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
/// The caller must ensure that `src` holds at least `2 * frames` samples and that `left` and
/// `right` hold at least `frames` samples.
#[target_feature(enable = "neon")]
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

        let scale = 1.0 / 32768.0;

        // 4 frames (8 samples) per iteration, de-interleaved on load.
        while f + 4 <= frames {
            let v = vld2_s16(sp.add(2 * f));

            let l = vcvtq_f32_s32(vmovl_s16(v.0));
            let r = vcvtq_f32_s32(vmovl_s16(v.1));

            vst1q_f32(lp.add(f), vmulq_n_f32(l, scale));
            vst1q_f32(rp.add(f), vmulq_n_f32(r, scale));

            f += 4;
        }
    }

    while f < frames {
        left[f] = src[2 * f] as f32 / 32768.0;
        right[f] = src[2 * f + 1] as f32 / 32768.0;
        f += 1;
    }
}
