//! Throughput measurements and the scalar-versus-vectorized comparison reported to hosts.
//!
//! These are informational. Nothing in the engines depends on the numbers.

use core::hint::black_box;
use std::time::{Duration, Instant};

use tracing::debug;

use crate::{
    adler32::adler32_with, crc32::crc32_with, deflate::compress_slice_with, CpuFeatures,
    DeflateConfig, Dispatch, ADLER32_INITIAL_VALUE, CRC32_INITIAL_VALUE,
};

/// Inputs shorter than this skip the carry-less multiplication kernel.
pub const CRC32_THRESHOLD: usize = crate::crc32::VECTOR_THRESHOLD;

/// Inputs shorter than this see no measurable benefit from the vector kernels.
pub const COMPRESSION_THRESHOLD: usize = 64;

/// Scalar time divided by vectorized time, per operation. `1.0` means no difference (or that a
/// timing was too small to measure).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Speedups {
    pub crc32: f64,
    pub adler32: f64,
    pub compression: f64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PerformanceInfo {
    pub simd_supported: bool,
    /// Names of the detected extensions, e.g. `["sse2", "avx2"]`.
    pub features: Vec<&'static str>,
    pub crc32_threshold: usize,
    pub compression_threshold: usize,
}

/// Deterministic, moderately compressible input.
fn sample_input(size: usize) -> Vec<u8> {
    let mut state = 0x9e37_79b9u32;

    (0..size)
        .map(|i| {
            state = state.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
            // runs of text-like bytes interleaved with noise
            if (i / 32) % 2 == 0 {
                b'a' + (state >> 28) as u8
            } else {
                (state >> 24) as u8
            }
        })
        .collect()
}

fn per_second(iterations: u32, elapsed: Duration) -> f64 {
    let secs = elapsed.as_secs_f64();

    if secs > 0.0 {
        iterations as f64 / secs
    } else {
        f64::INFINITY
    }
}

fn time<T>(iterations: u32, mut f: impl FnMut() -> T) -> Duration {
    let start = Instant::now();
    for _ in 0..iterations {
        black_box(f());
    }
    start.elapsed()
}

/// CRC-32 operations per second over `size` bytes. `-1.0` when `size` or `iterations` is zero.
pub fn benchmark_crc32(size: usize, iterations: u32) -> f64 {
    if size == 0 || iterations == 0 {
        return -1.0;
    }

    let data = sample_input(size);
    let dispatch = Dispatch::detect();

    let elapsed = time(iterations, || {
        crc32_with(dispatch, CRC32_INITIAL_VALUE, black_box(&data))
    });

    debug!(size, iterations, ?elapsed, "crc32 benchmark");

    per_second(iterations, elapsed)
}

/// Compressions per second of `size` bytes at `level`. `-1.0` when `size` or `iterations` is
/// zero, or `level` is outside `0..=9`.
pub fn benchmark_compression(size: usize, level: i32, iterations: u32) -> f64 {
    if size == 0 || iterations == 0 || !(0..=9).contains(&level) {
        return -1.0;
    }

    let data = sample_input(size);
    let mut output = vec![0; crate::compress_bound(size)];
    let config = DeflateConfig::new(level);
    let dispatch = Dispatch::detect();

    let elapsed = time(iterations, || {
        let (compressed, code) = compress_slice_with(&mut output, black_box(&data), config, dispatch);
        (compressed.len(), code)
    });

    debug!(size, level, iterations, ?elapsed, "compression benchmark");

    per_second(iterations, elapsed)
}

fn speedup(scalar: Duration, vectorized: Duration) -> f64 {
    if scalar.is_zero() || vectorized.is_zero() {
        1.0
    } else {
        scalar.as_secs_f64() / vectorized.as_secs_f64()
    }
}

/// Time `data` through the scalar kernels and the detected vector kernels.
///
/// Empty `data`, zero `iterations`, or a machine without vector extensions give all `1.0`.
pub fn performance_analysis(data: &[u8], iterations: u32) -> Speedups {
    let vectorized = Dispatch::detect();

    if data.is_empty() || iterations == 0 || !vectorized.is_vectorized() {
        return Speedups {
            crc32: 1.0,
            adler32: 1.0,
            compression: 1.0,
        };
    }

    let scalar = Dispatch::Scalar;

    let crc32 = speedup(
        time(iterations, || crc32_with(scalar, CRC32_INITIAL_VALUE, black_box(data))),
        time(iterations, || crc32_with(vectorized, CRC32_INITIAL_VALUE, black_box(data))),
    );

    let adler32 = speedup(
        time(iterations, || adler32_with(scalar, ADLER32_INITIAL_VALUE, black_box(data))),
        time(iterations, || adler32_with(vectorized, ADLER32_INITIAL_VALUE, black_box(data))),
    );

    let mut output = vec![0; crate::compress_bound(data.len())];
    let config = DeflateConfig::default();
    let mut compress = |dispatch| {
        time(iterations, || {
            compress_slice_with(&mut output, black_box(data), config, dispatch)
                .0
                .len()
        })
    };

    let compression = speedup(compress(scalar), compress(vectorized));

    let speedups = Speedups {
        crc32,
        adler32,
        compression,
    };

    debug!(len = data.len(), iterations, ?speedups, "performance analysis");

    speedups
}

pub fn performance_info() -> PerformanceInfo {
    let features = CpuFeatures::detect();

    PerformanceInfo {
        simd_supported: features.any(),
        features: features.names(),
        crc32_threshold: CRC32_THRESHOLD,
        compression_threshold: COMPRESSION_THRESHOLD,
    }
}
