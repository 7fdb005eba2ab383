// Ostinato
// Copyright (c) 2026 The Project Ostinato Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The `vector` module implements the architecture-vectorized production converter.
//!
//! Mono and stereo, the audio server's operating channel counts, are processed with SIMD kernels
//! and a scalar tail; any other channel count takes the optimized scalar path. The kernel family
//! is detected once per process and cached. Every path shares one set of per-sample semantics:
//! round half to even, clamp per sign, and the architecture-declared constants for non-finite
//! inputs.

use log::debug;
use once_cell::sync::Lazy;

use super::reference;
use super::{NAN_SAMPLE, NEG_INFINITY_SAMPLE, POS_INFINITY_SAMPLE};

#[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
mod x86;

#[cfg(target_arch = "aarch64")]
mod aarch64;

/// The kernel families the vectorized converter can dispatch to.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Kernel {
    Scalar,
    #[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
    Sse2,
    #[cfg(target_arch = "aarch64")]
    Neon,
}

impl Kernel {
    fn name(self) -> &'static str {
        match self {
            Kernel::Scalar => "scalar",
            #[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
            Kernel::Sse2 => "sse2",
            #[cfg(target_arch = "aarch64")]
            Kernel::Neon => "neon",
        }
    }
}

/// The kernel family selected for the host processor. Detected on first use.
static KERNEL: Lazy<Kernel> = Lazy::new(|| {
    let kernel = detect();

    debug!("vectorized pcm converter selected {} kernels", kernel.name());

    kernel
});

#[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
fn detect() -> Kernel {
    if is_x86_feature_detected!("sse2") {
        Kernel::Sse2
    }
    else {
        Kernel::Scalar
    }
}

#[cfg(target_arch = "aarch64")]
fn detect() -> Kernel {
    // NEON is a baseline feature of AArch64.
    Kernel::Neon
}

#[cfg(not(any(target_arch = "x86", target_arch = "x86_64", target_arch = "aarch64")))]
fn detect() -> Kernel {
    Kernel::Scalar
}

pub(super) fn name() -> &'static str {
    match *KERNEL {
        Kernel::Scalar => "vector (scalar)",
        #[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
        Kernel::Sse2 => "vector (sse2)",
        #[cfg(target_arch = "aarch64")]
        Kernel::Neon => "vector (neon)",
    }
}

/// Quantize one planar sample to i16 with the optimized policy: scale to full scale, map
/// non-finite values to the architecture-declared constants, clamp, then round half to even.
///
/// The vector kernels produce exactly these semantics lane-wise; this function serves their
/// scalar tails and the unspecialized channel counts.
#[inline]
pub(super) fn quantize(s: f32) -> i16 {
    let x = s * 32768.0;

    if x.is_nan() {
        return NAN_SAMPLE;
    }

    if x == f32::INFINITY {
        return POS_INFINITY_SAMPLE;
    }

    if x == f32::NEG_INFINITY {
        return NEG_INFINITY_SAMPLE;
    }

    x.clamp(-32768.0, 32767.0).round_ties_even() as i16
}

pub(super) fn interleave(src: &[&[f32]], dst: &mut [i16], frames: usize) {
    match *KERNEL {
        #[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
        Kernel::Sse2 => match src {
            &[plane] => unsafe { x86::interleave_mono(plane, dst, frames) },
            &[left, right] => unsafe { x86::interleave_stereo(left, right, dst, frames) },
            _ => interleave_scalar(src, dst, frames),
        },
        #[cfg(target_arch = "aarch64")]
        Kernel::Neon => match src {
            &[plane] => unsafe { aarch64::interleave_mono(plane, dst, frames) },
            &[left, right] => unsafe { aarch64::interleave_stereo(left, right, dst, frames) },
            _ => interleave_scalar(src, dst, frames),
        },
        Kernel::Scalar => interleave_scalar(src, dst, frames),
    }
}

pub(super) fn deinterleave(src: &[i16], dst: &mut [&mut [f32]], frames: usize) {
    match *KERNEL {
        #[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
        Kernel::Sse2 => match dst {
            [plane] => unsafe { x86::deinterleave_mono(src, plane, frames) },
            [left, right] => unsafe { x86::deinterleave_stereo(src, left, right, frames) },
            _ => reference::deinterleave(src, dst, frames),
        },
        #[cfg(target_arch = "aarch64")]
        Kernel::Neon => match dst {
            [plane] => unsafe { aarch64::deinterleave_mono(src, plane, frames) },
            [left, right] => unsafe { aarch64::deinterleave_stereo(src, left, right, frames) },
            _ => reference::deinterleave(src, dst, frames),
        },
        // Deinterleaving has no rounding ambiguity: the scalar path is the reference path.
        Kernel::Scalar => reference::deinterleave(src, dst, frames),
    }
}

fn interleave_scalar(src: &[&[f32]], dst: &mut [i16], frames: usize) {
    let num_channels = src.len();

    for (f, frame) in dst.chunks_exact_mut(num_channels).take(frames).enumerate() {
        for (ch, out) in frame.iter_mut().enumerate() {
            *out = quantize(src[ch][f]);
        }
    }
}
