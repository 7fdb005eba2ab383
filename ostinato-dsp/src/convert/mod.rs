// Ostinato
// Copyright (c) 2026 The Project Ostinato Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The `convert` module implements sample format conversion between the interleaved signed 16-bit
//! PCM format used by audio hardware and codecs, and the per-channel planar 32-bit floating point
//! format used by the processing pipeline.
//!
//! Two converters share one contract. [`ReferenceConverter`] is the portable scalar oracle.
//! [`VectorConverter`] is the production converter: it dispatches to SIMD kernels selected by
//! runtime capability detection and is a drop-in replacement for the reference converter.
//!
//! # Interleaving
//!
//! Each planar sample is scaled by 32768.0, clamped to [-32768, 32767], rounded to the nearest
//! integer, and stored at `frame * channels + channel`. The reference converter rounds half away
//! from zero; the vectorized converter uses the hardware round-half-to-even mode. An exact
//! half-step tie is therefore the one input where the converters may disagree, by one step, and
//! callers must not depend on either direction there.
//!
//! Non-finite inputs never reach a numeric cast. Both converters test for them explicitly and
//! produce deterministic, per-architecture values: the reference converter clamps infinities per
//! sign and converts NaN to 0 on every target, while the vectorized converter produces
//! [`NAN_SAMPLE`], [`POS_INFINITY_SAMPLE`] and [`NEG_INFINITY_SAMPLE`]. An input whose scaled
//! magnitude overflows to infinity follows the infinity constants of the converter it passes
//! through.
//!
//! # Deinterleaving
//!
//! `plane[frame] = interleaved[frame * channels + channel] / 32768.0`, exact in f32 over the
//! whole i16 domain. Reference and vectorized output is bit-identical for every input.
//!
//! # Realtime safety
//!
//! Converters are stateless and reentrant. They operate only on the caller's buffers, never
//! allocate, never block, and may run concurrently on disjoint buffers without locking. A
//! real-time thread should call [`crate::fpenv::enable_flush_to_zero`] once before its first
//! conversion so denormal samples do not take slow arithmetic paths.

mod reference;
mod vector;

/// Interleaved sample produced by the vectorized converter for a NaN input.
///
/// A documented platform quirk, not a correctness property: x86 targets produce the saturated
/// maximum while everything else produces silence.
#[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
pub const NAN_SAMPLE: i16 = 32767;
#[cfg(not(any(target_arch = "x86", target_arch = "x86_64")))]
pub const NAN_SAMPLE: i16 = 0;

/// Interleaved sample produced by the vectorized converter for a positive infinity input, or for
/// an input whose scaled magnitude overflows to positive infinity.
///
/// x86 targets produce the saturated minimum for either sign of infinity; every other target
/// saturates per sign.
#[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
pub const POS_INFINITY_SAMPLE: i16 = -32768;
#[cfg(not(any(target_arch = "x86", target_arch = "x86_64")))]
pub const POS_INFINITY_SAMPLE: i16 = 32767;

/// Interleaved sample produced by the vectorized converter for a negative infinity input, or for
/// an input whose scaled magnitude overflows to negative infinity. The same on every target.
pub const NEG_INFINITY_SAMPLE: i16 = -32768;

/// `PcmConverter` is a pair of pure buffer transforms between planar f32 and interleaved i16
/// audio.
///
/// Implementations hold no state: both operations are bounded, synchronous computations over the
/// buffers passed to each call.
pub trait PcmConverter {
    /// A short diagnostic name for the implementation.
    fn name(&self) -> &'static str;

    /// Convert planar floating point samples into interleaved 16-bit samples.
    ///
    /// `src` holds one plane per channel, each at least `frames` samples long. `dst` must be
    /// exactly `src.len() * frames` samples long.
    ///
    /// Panics if the buffer geometry is violated.
    fn interleave(&self, src: &[&[f32]], dst: &mut [i16], frames: usize);

    /// Convert interleaved 16-bit samples into planar floating point samples.
    ///
    /// `src` must be exactly `dst.len() * frames` samples long. `dst` holds one plane per
    /// channel, each at least `frames` samples long.
    ///
    /// Panics if the buffer geometry is violated.
    fn deinterleave(&self, src: &[i16], dst: &mut [&mut [f32]], frames: usize);
}

/// The portable scalar converter. It defines the conversion contract and is the correctness
/// oracle the vectorized converter is validated against.
#[derive(Copy, Clone, Debug, Default)]
pub struct ReferenceConverter;

impl PcmConverter for ReferenceConverter {
    fn name(&self) -> &'static str {
        "reference"
    }

    fn interleave(&self, src: &[&[f32]], dst: &mut [i16], frames: usize) {
        assert_interleave_geometry(src, dst, frames);
        reference::interleave(src, dst, frames);
    }

    fn deinterleave(&self, src: &[i16], dst: &mut [&mut [f32]], frames: usize) {
        assert_deinterleave_geometry(src, dst, frames);
        reference::deinterleave(src, dst, frames);
    }
}

/// The architecture-vectorized production converter.
///
/// A drop-in replacement for [`ReferenceConverter`]: identical output for every finite non-tie
/// input, round half to even at exact ties, byte-identical deinterleaving, and the declared
/// per-architecture constants for non-finite inputs.
#[derive(Copy, Clone, Debug, Default)]
pub struct VectorConverter;

impl PcmConverter for VectorConverter {
    fn name(&self) -> &'static str {
        vector::name()
    }

    fn interleave(&self, src: &[&[f32]], dst: &mut [i16], frames: usize) {
        assert_interleave_geometry(src, dst, frames);
        vector::interleave(src, dst, frames);
    }

    fn deinterleave(&self, src: &[i16], dst: &mut [&mut [f32]], frames: usize) {
        assert_deinterleave_geometry(src, dst, frames);
        vector::deinterleave(src, dst, frames);
    }
}

/// Convert planar floating point samples into interleaved 16-bit samples using the best kernels
/// available on the host processor. See [`PcmConverter::interleave`].
pub fn interleave(src: &[&[f32]], dst: &mut [i16], frames: usize) {
    VectorConverter.interleave(src, dst, frames)
}

/// Convert interleaved 16-bit samples into planar floating point samples using the best kernels
/// available on the host processor. See [`PcmConverter::deinterleave`].
pub fn deinterleave(src: &[i16], dst: &mut [&mut [f32]], frames: usize) {
    VectorConverter.deinterleave(src, dst, frames)
}

fn assert_interleave_geometry(src: &[&[f32]], dst: &[i16], frames: usize) {
    assert!(!src.is_empty(), "interleave requires at least one audio plane");
    assert!(
        dst.len() == src.len() * frames,
        "interleaved buffer length does not match channels x frames"
    );

    for plane in src {
        assert!(plane.len() >= frames, "audio plane is shorter than the frame count");
    }
}

fn assert_deinterleave_geometry(src: &[i16], dst: &[&mut [f32]], frames: usize) {
    assert!(!dst.is_empty(), "deinterleave requires at least one audio plane");
    assert!(
        src.len() == dst.len() * frames,
        "interleaved buffer length does not match channels x frames"
    );

    for plane in dst {
        assert!(plane.len() >= frames, "audio plane is shorter than the frame count");
    }
}

#[cfg(test)]
mod tests {
    use super::{PcmConverter, ReferenceConverter, VectorConverter};
    use super::{NAN_SAMPLE, NEG_INFINITY_SAMPLE, POS_INFINITY_SAMPLE};

    use crate::buf::PlanarBuffer;
    use crate::fpenv;

    use rand::rngs::SmallRng;
    use rand::{Rng, SeedableRng};

    /// Not a multiple of the widest vector so the scalar tails are always exercised too.
    const FRAMES: usize = 19;

    const E: f32 = 1e-9;

    fn converters() -> [&'static dyn PcmConverter; 2] {
        [&ReferenceConverter, &VectorConverter]
    }

    /// Broadcast `value` over a stereo buffer, interleave it, and return the output samples.
    fn broadcast(conv: &dyn PcmConverter, value: f32) -> Vec<i16> {
        let mut buf = PlanarBuffer::new(2, FRAMES);
        buf.fill(value);

        let planes = buf.planes();
        let mut out = vec![0; 2 * FRAMES];

        conv.interleave(&planes, &mut out, FRAMES);

        out
    }

    fn assert_broadcast(conv: &dyn PcmConverter, value: f32, expected: i16) {
        let out = broadcast(conv, value);

        for &s in &out {
            assert_eq!(s, expected, "{}: in={:e} expected={} got={}", conv.name(), value, expected, s);
        }
    }

    #[test]
    fn verify_interleave_clamping() {
        for conv in converters() {
            assert_broadcast(conv, 1.0, 32767);
            assert_broadcast(conv, -1.0, -32768);
            assert_broadcast(conv, 1.1, 32767);
            assert_broadcast(conv, -1.1, -32768);
            assert_broadcast(conv, 2000000000.0 / 32768.0, 32767);
            assert_broadcast(conv, -2000000000.0 / 32768.0, -32768);
            assert_broadcast(conv, 5000000000.0 / 32768.0, 32767);
            assert_broadcast(conv, -5000000000.0 / 32768.0, -32768);
            // Scaled magnitude is exactly 2^31, one past the i32 range.
            assert_broadcast(conv, 65536.0, 32767);
            assert_broadcast(conv, -65536.0, -32768);
        }
    }

    #[test]
    fn verify_interleave_quantization_boundaries() {
        for conv in converters() {
            assert_broadcast(conv, 0.25, 8192);
            assert_broadcast(conv, -0.25, -8192);
            assert_broadcast(conv, 0.5, 16384);
            assert_broadcast(conv, -0.5, -16384);
            assert_broadcast(conv, 1.0 / 32768.0, 1);
            assert_broadcast(conv, -1.0 / 32768.0, -1);
            assert_broadcast(conv, 1.0 / 32768.0 + E, 1);
            assert_broadcast(conv, -1.0 / 32768.0 - E, -1);
            assert_broadcast(conv, 1.0 / 32768.0 - E, 1);
            assert_broadcast(conv, -1.0 / 32768.0 + E, -1);
        }
    }

    #[test]
    fn verify_interleave_near_ties() {
        for conv in converters() {
            assert_broadcast(conv, 1.5 / 32768.0, 2);
            assert_broadcast(conv, -1.5 / 32768.0, -2);
            assert_broadcast(conv, 1.5 / 32768.0 + E, 2);
            assert_broadcast(conv, -1.5 / 32768.0 - E, -2);
            assert_broadcast(conv, 1.5 / 32768.0 - E, 1);
            assert_broadcast(conv, -1.5 / 32768.0 + E, -1);

            assert_broadcast(conv, 0.5 / 32768.0 + E, 1);
            assert_broadcast(conv, -0.5 / 32768.0 - E, -1);
            assert_broadcast(conv, 0.5 / 32768.0 - E, 0);
            assert_broadcast(conv, -0.5 / 32768.0 + E, 0);
        }
    }

    #[test]
    fn verify_interleave_exact_ties() {
        // The sanctioned divergence: a scaled value exactly halfway between two integers rounds
        // away from zero in the reference converter and to even in the vectorized converter.
        assert_broadcast(&ReferenceConverter, 0.5 / 32768.0, 1);
        assert_broadcast(&ReferenceConverter, -0.5 / 32768.0, -1);

        assert_broadcast(&VectorConverter, 0.5 / 32768.0, 0);
        assert_broadcast(&VectorConverter, -0.5 / 32768.0, 0);

        // 1.5 scaled ties round to 2 under both policies.
        assert_broadcast(&ReferenceConverter, 1.5 / 32768.0, 2);
        assert_broadcast(&VectorConverter, 1.5 / 32768.0, 2);
    }

    #[test]
    fn verify_interleave_denormals() {
        fpenv::enable_flush_to_zero();

        for conv in converters() {
            assert_broadcast(conv, f32::from_bits(0x0000_0001), 0);
            assert_broadcast(conv, f32::from_bits(0x8000_0001), 0);
        }
    }

    #[test]
    fn verify_interleave_denormals_without_flush_mode() {
        // Tests run on their own threads, so the flush mode enabled elsewhere does not apply
        // here. A subnormal scaled by 32768 still rounds to 0 through the ordinary path.
        for conv in converters() {
            assert_broadcast(conv, f32::from_bits(0x0000_0001), 0);
            assert_broadcast(conv, f32::from_bits(0x8000_0001), 0);
        }
    }

    #[test]
    fn verify_interleave_non_finite_reference() {
        // The reference converter is portable: infinities clamp per sign and NaN falls through
        // the range comparisons into a defined saturating cast.
        assert_broadcast(&ReferenceConverter, f32::INFINITY, 32767);
        assert_broadcast(&ReferenceConverter, f32::NEG_INFINITY, -32768);
        assert_broadcast(&ReferenceConverter, f32::NAN, 0);

        // Scaling the largest finite float overflows to infinity.
        assert_broadcast(&ReferenceConverter, f32::MAX, 32767);
        assert_broadcast(&ReferenceConverter, f32::MIN, -32768);
    }

    #[test]
    fn verify_interleave_non_finite_vector() {
        assert_broadcast(&VectorConverter, f32::NAN, NAN_SAMPLE);
        assert_broadcast(&VectorConverter, f32::from_bits(0xffc0_0001), NAN_SAMPLE);
        assert_broadcast(&VectorConverter, f32::INFINITY, POS_INFINITY_SAMPLE);
        assert_broadcast(&VectorConverter, f32::NEG_INFINITY, NEG_INFINITY_SAMPLE);

        // Scaling the largest finite float overflows to infinity.
        assert_broadcast(&VectorConverter, f32::MAX, POS_INFINITY_SAMPLE);
        assert_broadcast(&VectorConverter, f32::MIN, NEG_INFINITY_SAMPLE);
    }

    #[test]
    fn verify_round_trip_all_i16_stereo() {
        let frames = 32768;
        let src: Vec<i16> = (0..2 * frames).map(|j| (j as i32 - 32768) as i16).collect();

        for conv in converters() {
            let mut buf = PlanarBuffer::new(2, frames);

            let mut planes = buf.planes_mut();
            conv.deinterleave(&src, &mut planes, frames);
            drop(planes);

            let planes = buf.planes();
            let mut out = vec![0; 2 * frames];
            conv.interleave(&planes, &mut out, frames);

            assert_eq!(out, src, "{}: stereo round trip is not exact", conv.name());
        }
    }

    #[test]
    fn verify_round_trip_all_i16_mono() {
        let frames = 65536;
        let src: Vec<i16> = (0..frames).map(|j| (j as i32 - 32768) as i16).collect();

        for conv in converters() {
            let mut buf = PlanarBuffer::new(1, frames);

            let mut planes = buf.planes_mut();
            conv.deinterleave(&src, &mut planes, frames);
            drop(planes);

            let planes = buf.planes();
            let mut out = vec![0; frames];
            conv.interleave(&planes, &mut out, frames);

            assert_eq!(out, src, "{}: mono round trip is not exact", conv.name());
        }
    }

    /// Nudge an exact half-step tie off the tie. Ties are the documented divergence point between
    /// the converters and are tested separately.
    fn detie(x: f32) -> f32 {
        if (x * 32768.0).fract().abs() == 0.5 {
            0.0
        }
        else {
            x
        }
    }

    #[test]
    fn verify_vector_matches_reference_interleave() {
        let mut rng = SmallRng::seed_from_u64(0xb2c1_01f4_425b_987e);

        for num_channels in 1..=3 {
            for frames in [3, 1024, 1027, 4096] {
                let mut buf = PlanarBuffer::new(num_channels, frames);

                for ch in 0..num_channels {
                    for s in buf.plane_mut(ch) {
                        *s = detie(rng.random_range(-2.0f32..2.0));
                    }
                }

                let planes = buf.planes();

                let mut expected = vec![0; num_channels * frames];
                let mut actual = vec![0; num_channels * frames];

                ReferenceConverter.interleave(&planes, &mut expected, frames);
                VectorConverter.interleave(&planes, &mut actual, frames);

                assert_eq!(
                    actual, expected,
                    "interleave diverges at channels={} frames={}",
                    num_channels, frames
                );
            }
        }
    }

    #[test]
    fn verify_vector_matches_reference_deinterleave() {
        let mut rng = SmallRng::seed_from_u64(0x1d47_0c2e_9a11_53bf);

        for num_channels in 1..=3 {
            for frames in [3, 1024, 1027, 4096] {
                let src: Vec<i16> =
                    (0..num_channels * frames).map(|_| rng.random_range(i16::MIN..=i16::MAX)).collect();

                let mut expected = PlanarBuffer::new(num_channels, frames);
                let mut actual = PlanarBuffer::new(num_channels, frames);

                ReferenceConverter.deinterleave(&src, &mut expected.planes_mut(), frames);
                VectorConverter.deinterleave(&src, &mut actual.planes_mut(), frames);

                for ch in 0..num_channels {
                    // Byte-exact, not merely numerically equal.
                    let e: &[u8] = bytemuck::cast_slice(expected.plane(ch));
                    let a: &[u8] = bytemuck::cast_slice(actual.plane(ch));

                    assert_eq!(
                        a, e,
                        "deinterleave diverges at channels={} frames={} ch={}",
                        num_channels, frames, ch
                    );
                }
            }
        }
    }

    #[test]
    fn verify_deinterleave_values() {
        let src = [0, 1, -1, 32767, -32768, 16384, -16384, 3];

        for conv in converters() {
            let mut buf = PlanarBuffer::new(2, 4);
            conv.deinterleave(&src, &mut buf.planes_mut(), 4);

            assert_eq!(buf.plane(0), [0.0, -1.0 / 32768.0, -1.0, -0.5]);
            assert_eq!(buf.plane(1), [1.0 / 32768.0, 32767.0 / 32768.0, 0.5, 3.0 / 32768.0]);
        }
    }

    #[test]
    fn verify_free_functions_round_trip() {
        let src: Vec<i16> = (0..64).map(|j| (j * 512 - 16384) as i16).collect();

        let mut buf = PlanarBuffer::new(2, 32);
        super::deinterleave(&src, &mut buf.planes_mut(), 32);

        let mut out = vec![0; 64];
        super::interleave(&buf.planes(), &mut out, 32);

        assert_eq!(out, src);
    }

    #[test]
    #[should_panic(expected = "interleaved buffer length")]
    fn verify_interleave_geometry_panics() {
        let left = [0.0f32; 8];
        let right = [0.0f32; 8];
        let mut out = [0i16; 15];

        VectorConverter.interleave(&[&left, &right], &mut out, 8);
    }

    #[test]
    #[should_panic(expected = "audio plane is shorter")]
    fn verify_deinterleave_geometry_panics() {
        let src = [0i16; 16];
        let mut left = [0.0f32; 8];
        let mut right = [0.0f32; 4];

        VectorConverter.deinterleave(&src, &mut [&mut left, &mut right], 8);
    }
}
