// Ostinato Check Tool
// Copyright (c) 2026 The Project Ostinato Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

#![warn(rust_2018_idioms)]
#![forbid(unsafe_code)]

use std::hint::black_box;
use std::time::Instant;

use ostinato_dsp::buf::PlanarBuffer;
use ostinato_dsp::convert::{PcmConverter, ReferenceConverter, VectorConverter};
use ostinato_dsp::fpenv;

use clap::{Arg, ArgAction};
use log::info;

/// Number of frames a sweep value is broadcast over. Not a multiple of the vector width, so the
/// kernels' scalar tails are compared too.
const SWEEP_FRAMES: usize = 19;

/// The smallest frame count in the benchmark ladder.
const MIN_BENCH_FRAMES: usize = 1024;

struct TestOptions {
    iterations: u32,
    max_frames: usize,
    is_quiet: bool,
    no_bench: bool,
}

#[derive(Default)]
struct TestResult {
    n_values: u64,
    n_passed: u64,
    n_expected_diff: u64,
    n_regressions: u64,
    abs_max_delta: i32,
}

struct SweepCase {
    input: f32,
    /// Whether a reference/vectorized difference at this input is a documented platform variant
    /// (exact tie, NaN, infinity) rather than a regression.
    platform_variant: bool,
}

fn case(input: f32) -> SweepCase {
    SweepCase { input, platform_variant: false }
}

fn variant_case(input: f32) -> SweepCase {
    SweepCase { input, platform_variant: true }
}

fn sweep_cases() -> Vec<SweepCase> {
    let e = 0.000000001f32;

    vec![
        // Clamping.
        case(1.0),
        case(-1.0),
        case(1.1),
        case(-1.1),
        case(2000000000.0 / 32768.0),
        case(-2000000000.0 / 32768.0),
        case(5000000000.0 / 32768.0),
        case(-5000000000.0 / 32768.0),
        // Largest finite floats: scaling overflows to infinity, a documented platform variant.
        variant_case(f32::MAX),
        variant_case(f32::MIN),
        variant_case(f32::INFINITY),
        variant_case(f32::NEG_INFINITY),
        // Rounding.
        case(0.25),
        case(-0.25),
        case(0.5),
        case(-0.5),
        case(1.0 / 32768.0),
        case(-1.0 / 32768.0),
        case(1.0 / 32768.0 + e),
        case(-1.0 / 32768.0 - e),
        case(1.0 / 32768.0 - e),
        case(-1.0 / 32768.0 + e),
        // Exact half-step ties round away from zero in the reference converter and to even in
        // the vectorized converter.
        variant_case(0.5 / 32768.0),
        variant_case(-0.5 / 32768.0),
        case(0.5 / 32768.0 + e),
        case(-0.5 / 32768.0 - e),
        case(0.5 / 32768.0 - e),
        case(-0.5 / 32768.0 + e),
        variant_case(1.5 / 32768.0),
        variant_case(-1.5 / 32768.0),
        case(1.5 / 32768.0 + e),
        case(-1.5 / 32768.0 - e),
        case(1.5 / 32768.0 - e),
        case(-1.5 / 32768.0 + e),
        // Denormals.
        case(f32::from_bits(0x0000_0001)),
        case(f32::from_bits(0x8000_0001)),
        // NaNs.
        variant_case(f32::NAN),
        variant_case(f32::from_bits(0xffc0_0001)),
    ]
}

/// Broadcast one value over a stereo buffer and interleave it with both converters, comparing
/// every output sample.
fn run_sweep(opts: &TestOptions, result: &mut TestResult) {
    let mut buf = PlanarBuffer::new(2, SWEEP_FRAMES);

    for case in sweep_cases() {
        buf.fill(case.input);

        let planes = buf.planes();

        let mut out_ref = vec![0; 2 * SWEEP_FRAMES];
        let mut out_vec = vec![0; 2 * SWEEP_FRAMES];

        ReferenceConverter.interleave(&planes, &mut out_ref, SWEEP_FRAMES);
        VectorConverter.interleave(&planes, &mut out_vec, SWEEP_FRAMES);

        let max_diff = out_ref
            .iter()
            .zip(&out_vec)
            .map(|(&r, &v)| (i32::from(r) - i32::from(v)).abs())
            .max()
            .unwrap();

        let verdict = if max_diff == 0 {
            result.n_passed += 1;
            "PASS"
        }
        else if case.platform_variant {
            result.n_expected_diff += 1;
            "EXPECTED DIFFERENCE"
        }
        else {
            result.n_regressions += 1;
            "UNEXPECTED DIFFERENCE"
        };

        if !case.platform_variant {
            result.abs_max_delta = result.abs_max_delta.max(max_diff);
        }

        result.n_values += 1;

        if !opts.is_quiet {
            println!(
                "interleave compare diff={:>6} in={:>14.6e} scaled={:>14.6e} ref={:>6} vec={:>6} {}",
                max_diff,
                case.input,
                case.input * 32768.0,
                out_ref[0],
                out_vec[0],
                verdict
            );
        }
    }
}

/// Deinterleave every representable i16 with both converters and require byte-exact equality.
fn run_deinterleave_check(opts: &TestOptions, result: &mut TestResult) {
    let frames = 32768;

    // Two channels covering the whole i16 domain.
    let src: Vec<i16> = (0..2 * frames).map(|j| (j as i32 - 32768) as i16).collect();

    let mut planar_ref = PlanarBuffer::new(2, frames);
    let mut planar_vec = PlanarBuffer::new(2, frames);

    ReferenceConverter.deinterleave(&src, &mut planar_ref.planes_mut(), frames);
    VectorConverter.deinterleave(&src, &mut planar_vec.planes_mut(), frames);

    let mut failed = false;

    for ch in 0..2 {
        let r: &[u8] = bytemuck::cast_slice(planar_ref.plane(ch));
        let v: &[u8] = bytemuck::cast_slice(planar_vec.plane(ch));

        if r != v {
            failed = true;

            if !opts.is_quiet {
                println!("deinterleave compare ch={} output is not byte-identical", ch);
            }
        }
    }

    result.n_values += 1;

    if failed {
        result.n_regressions += 1;
    }
    else {
        result.n_passed += 1;

        if !opts.is_quiet {
            println!("deinterleave compare 2 x {} frames byte-identical PASS", frames);
        }
    }
}

fn time_ms<F: FnMut()>(iterations: u32, mut f: F) -> u128 {
    let start = Instant::now();

    for _ in 0..iterations {
        f();
    }

    start.elapsed().as_millis()
}

/// Time both converters in both directions over a ladder of buffer sizes stepping down by powers
/// of two, verifying output equality at each step.
fn run_bench(opts: &TestOptions, result: &mut TestResult) {
    let max_frames = opts.max_frames;
    let iterations = opts.iterations;

    // Fixed-size allocations reused across the ladder so allocation jitter stays out of the
    // measurements. The pattern deinterleaves to exact multiples of 1/32768, where the converters
    // must agree exactly.
    let in_shorts: Vec<i16> = (0..2 * max_frames).map(|j| (j as i32 % 65536 - 32768) as i16).collect();

    let mut planar = PlanarBuffer::new(2, max_frames);
    let mut out_ref = vec![0; 2 * max_frames];
    let mut out_vec = vec![0; 2 * max_frames];

    ReferenceConverter.deinterleave(&in_shorts, &mut planar.planes_mut(), max_frames);

    // Interleave ladder.
    let mut frames = max_frames;

    while frames >= MIN_BENCH_FRAMES {
        let planes = planar.planes();

        let ref_ms = time_ms(iterations, || {
            ReferenceConverter.interleave(black_box(&planes), black_box(&mut out_ref[..2 * frames]), frames);
        });

        let vec_ms = time_ms(iterations, || {
            VectorConverter.interleave(black_box(&planes), black_box(&mut out_vec[..2 * frames]), frames);
        });

        println!(
            "interleave   frames = {:>6}  reference = {:>6} ms  vector = {:>6} ms  speedup = {:.2}x",
            frames,
            ref_ms,
            vec_ms,
            ref_ms as f64 / vec_ms.max(1) as f64
        );

        if out_ref[..2 * frames] != out_vec[..2 * frames] {
            println!("interleave   frames = {:>6}  outputs differ, regression", frames);
            result.n_regressions += 1;
        }

        frames /= 2;
    }

    // Deinterleave ladder.
    let mut planar_ref = PlanarBuffer::new(2, max_frames);
    let mut planar_vec = PlanarBuffer::new(2, max_frames);

    let mut frames = max_frames;

    while frames >= MIN_BENCH_FRAMES {
        let ref_ms = time_ms(iterations, || {
            let mut planes = planar_ref.planes_mut();
            ReferenceConverter.deinterleave(black_box(&in_shorts[..2 * frames]), black_box(&mut planes), frames);
        });

        let vec_ms = time_ms(iterations, || {
            let mut planes = planar_vec.planes_mut();
            VectorConverter.deinterleave(black_box(&in_shorts[..2 * frames]), black_box(&mut planes), frames);
        });

        println!(
            "deinterleave frames = {:>6}  reference = {:>6} ms  vector = {:>6} ms  speedup = {:.2}x",
            frames,
            ref_ms,
            vec_ms,
            ref_ms as f64 / vec_ms.max(1) as f64
        );

        let mut failed = false;

        for ch in 0..2 {
            let r: &[u8] = bytemuck::cast_slice(&planar_ref.plane(ch)[..frames]);
            let v: &[u8] = bytemuck::cast_slice(&planar_vec.plane(ch)[..frames]);

            if r != v {
                failed = true;
            }
        }

        if failed {
            println!("deinterleave frames = {:>6}  outputs differ, regression", frames);
            result.n_regressions += 1;
        }

        frames /= 2;
    }
}

fn main() {
    pretty_env_logger::init();

    let matches = clap::Command::new("Ostinato Check")
        .version("1.0")
        .about("Check the vectorized sample converter against the reference converter")
        .arg(
            Arg::new("iterations")
                .long("iterations")
                .value_parser(clap::value_parser!(u32))
                .default_value("40000")
                .help("Number of iterations for each benchmark measurement"),
        )
        .arg(
            Arg::new("frames")
                .long("frames")
                .value_parser(clap::value_parser!(usize))
                .default_value("65536")
                .help("Largest frame count in the benchmark ladder"),
        )
        .arg(
            Arg::new("no-bench")
                .long("no-bench")
                .action(ArgAction::SetTrue)
                .help("Skip the performance benchmark"),
        )
        .arg(
            Arg::new("quiet")
                .long("quiet")
                .short('q')
                .action(ArgAction::SetTrue)
                .help("Only print test results"),
        )
        .get_matches();

    let opts = TestOptions {
        iterations: *matches.get_one::<u32>("iterations").unwrap(),
        max_frames: *matches.get_one::<usize>("frames").unwrap(),
        is_quiet: matches.get_flag("quiet"),
        no_bench: matches.get_flag("no-bench"),
    };

    assert!(
        opts.max_frames >= MIN_BENCH_FRAMES && opts.max_frames.is_power_of_two(),
        "frames must be a power of two of at least {}",
        MIN_BENCH_FRAMES
    );

    // A real-time audio thread enables the flush mode before converting; so does the harness.
    fpenv::enable_flush_to_zero();

    info!("vectorized converter: {}", VectorConverter.name());

    let mut result = TestResult::default();

    run_sweep(&opts, &mut result);
    run_deinterleave_check(&opts, &mut result);

    if !opts.no_bench {
        run_bench(&opts, &mut result);
    }

    if !opts.is_quiet {
        println!();
    }

    println!("Test Results");
    println!("=================================================");
    println!();
    println!("  Passed/Total Values:  {:>12}/{:>12}", result.n_passed, result.n_values);
    println!("  Expected Differences: {:>12}", result.n_expected_diff);
    println!("  Regressions:          {:>12}", result.n_regressions);
    println!();
    println!("  Absolute Maximum Sample Delta: {}", result.abs_max_delta);
    println!();

    let ret = if result.n_regressions == 0 {
        println!("PASS");
        0
    }
    else {
        println!("FAIL");
        1
    };

    std::process::exit(ret);
}
