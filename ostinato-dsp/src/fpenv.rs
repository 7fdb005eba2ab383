// Ostinato
// Copyright (c) 2026 The Project Ostinato Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The `fpenv` module controls the floating point execution environment of the calling thread.

use log::debug;

/// Enable flush-to-zero and denormals-are-zero arithmetic on the calling thread.
///
/// Denormal operands take slow microcoded paths on most processors. A real-time audio thread
/// should call this once at start-up, before its first conversion call, so denormal inputs and
/// results are flushed to zero instead of being computed exactly. Conversion output is correct
/// either way; if the mode cannot be enabled only the performance benefit is lost.
///
/// The flush mode is a property of the calling thread's floating point state, not of the process:
/// every thread that performs conversion work must enable it independently.
///
/// Returns `true` if the mode was applied.
pub fn enable_flush_to_zero() -> bool {
    let enabled = enable_flush_to_zero_impl();

    if enabled {
        debug!("enabled flush-to-zero and denormals-are-zero arithmetic");
    }
    else {
        debug!("flush-to-zero arithmetic is not supported on this target");
    }

    enabled
}

#[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
fn enable_flush_to_zero_impl() -> bool {
    // MXCSR flush-to-zero is bit 15, denormals-are-zero is bit 6. Both bits are guaranteed
    // present when SSE2 is: without it, leave the control register untouched.
    if !is_x86_feature_detected!("sse2") {
        return false;
    }

    let mut csr: u32 = 0;
    let p = &mut csr as *mut u32;

    unsafe {
        core::arch::asm!("stmxcsr [{0}]", in(reg) p, options(nostack, preserves_flags));
    }

    csr |= (1 << 15) | (1 << 6);

    unsafe {
        core::arch::asm!("ldmxcsr [{0}]", in(reg) p, options(nostack, preserves_flags));
    }

    true
}

#[cfg(target_arch = "aarch64")]
fn enable_flush_to_zero_impl() -> bool {
    // FPCR flush-to-zero is bit 24. It flushes both denormal operands and denormal results of
    // AArch64 data processing instructions.
    let mut fpcr: u64;

    unsafe {
        core::arch::asm!("mrs {0}, fpcr", out(reg) fpcr, options(nomem, nostack, preserves_flags));
    }

    fpcr |= 1 << 24;

    unsafe {
        core::arch::asm!("msr fpcr, {0}", in(reg) fpcr, options(nomem, nostack, preserves_flags));
    }

    true
}

#[cfg(not(any(target_arch = "x86", target_arch = "x86_64", target_arch = "aarch64")))]
fn enable_flush_to_zero_impl() -> bool {
    false
}

#[cfg(test)]
mod tests {
    use super::enable_flush_to_zero;

    #[test]
    fn verify_enable_is_idempotent() {
        let first = enable_flush_to_zero();
        let second = enable_flush_to_zero();

        assert_eq!(first, second);
    }

    #[cfg(any(target_arch = "x86_64", target_arch = "aarch64"))]
    #[test]
    fn verify_denormals_flush_when_enabled() {
        use std::hint::black_box;

        assert!(enable_flush_to_zero());

        // The smallest positive subnormal. With denormals-are-zero in effect it is treated as 0.0
        // by the multiply below.
        let denorm = f32::from_bits(0x1);

        assert_eq!(black_box(denorm) * black_box(1.0f32), 0.0);
    }
}
