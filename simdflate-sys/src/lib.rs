#![allow(non_camel_case_types)]
#![allow(non_snake_case)]
#![allow(clippy::missing_safety_doc)]

//! C ABI over `simdflate`.
//!
//! One-shot functions follow the zlib calling convention: the output length is passed in and
//! written back through a pointer, and the result is a status code (see [`ReturnCode`]). Null
//! buffers are allowed when their length is zero; a null buffer with a non-zero length is a
//! `StreamError`.

use std::ffi::{c_char, c_int, c_uint, c_ulong};
use std::ptr;

use simdflate::{
    deflate::{compress_slice_with, DeflateConfig, Strategy},
    inflate::{uncompress_slice_with, InflateConfig},
    Deflate, Dispatch, Flush, Inflate, ReturnCode,
};

/// A streaming compressor or decompressor, with the counters of its last call.
pub struct simdflate_stream {
    engine: Engine,
    avail_in: c_uint,
    avail_out: c_uint,
}

enum Engine {
    Deflate(Deflate),
    Inflate(Inflate),
}

const VERSION: &str = concat!(env!("CARGO_PKG_VERSION"), "\0");

unsafe fn input_slice<'a>(ptr: *const u8, len: usize) -> Option<&'a [u8]> {
    if len == 0 {
        Some(&[])
    } else if ptr.is_null() {
        None
    } else {
        Some(unsafe { std::slice::from_raw_parts(ptr, len) })
    }
}

unsafe fn output_slice<'a>(ptr: *mut u8, len: usize) -> Option<&'a mut [u8]> {
    if len == 0 {
        Some(&mut [])
    } else if ptr.is_null() {
        None
    } else {
        Some(unsafe { std::slice::from_raw_parts_mut(ptr, len) })
    }
}

/// Compresses `source` into `dest` at the default level, and writes the compressed size into
/// `destLen`.
///
/// # Safety
///
/// - `destLen` must be null or valid for reads and writes.
/// - `dest` must be valid for writes of `*destLen` bytes, `source` for reads of `sourceLen`
///   bytes, and the two ranges must not overlap.
#[no_mangle]
pub unsafe extern "C" fn simdflate_compress(
    dest: *mut u8,
    destLen: *mut c_ulong,
    source: *const u8,
    sourceLen: c_ulong,
) -> c_int {
    unsafe { simdflate_compress2(dest, destLen, source, sourceLen, simdflate::DEFAULT_LEVEL) }
}

/// Like [`simdflate_compress`], at `level`. Levels outside `0..=9` use the default level.
///
/// Returns `BufError` when `dest` cannot hold the stream; size it with
/// [`simdflate_compress_bound`].
///
/// # Safety
///
/// As for [`simdflate_compress`].
#[no_mangle]
pub unsafe extern "C" fn simdflate_compress2(
    dest: *mut u8,
    destLen: *mut c_ulong,
    source: *const u8,
    sourceLen: c_ulong,
    level: c_int,
) -> c_int {
    if destLen.is_null() {
        return ReturnCode::StreamError as c_int;
    }

    let Some(output) = (unsafe { output_slice(dest, ptr::read(destLen) as usize) }) else {
        return ReturnCode::StreamError as c_int;
    };

    let Some(input) = (unsafe { input_slice(source, sourceLen as usize) }) else {
        return ReturnCode::StreamError as c_int;
    };

    let config = DeflateConfig::new(level);
    let (output, err) = compress_slice_with(output, input, config, Dispatch::detect());

    unsafe { ptr::write(destLen, output.len() as c_ulong) };

    err as c_int
}

/// Inflates the zlib stream in `source` into `dest`, and writes the inflated size into
/// `destLen`.
///
/// Returns `BufError` when `dest` is too small, and `DataError` for corrupt or truncated input
/// and for streams that need a preset dictionary.
///
/// # Safety
///
/// As for [`simdflate_compress`].
#[no_mangle]
pub unsafe extern "C" fn simdflate_uncompress(
    dest: *mut u8,
    destLen: *mut c_ulong,
    source: *const u8,
    sourceLen: c_ulong,
) -> c_int {
    if destLen.is_null() {
        return ReturnCode::StreamError as c_int;
    }

    let Some(output) = (unsafe { output_slice(dest, ptr::read(destLen) as usize) }) else {
        return ReturnCode::StreamError as c_int;
    };

    let Some(input) = (unsafe { input_slice(source, sourceLen as usize) }) else {
        return ReturnCode::StreamError as c_int;
    };

    let (output, err) =
        uncompress_slice_with(output, input, InflateConfig::default(), Dispatch::detect());

    unsafe { ptr::write(destLen, output.len() as c_ulong) };

    err as c_int
}

/// CRC-32 of `buf`, continuing from `crc`. A null `buf` gives 0.
///
/// # Safety
///
/// `buf` must be null or valid for reads of `len` bytes.
#[no_mangle]
pub unsafe extern "C" fn simdflate_crc32(crc: c_ulong, buf: *const u8, len: c_uint) -> c_ulong {
    if buf.is_null() {
        return 0;
    }

    match unsafe { input_slice(buf, len as usize) } {
        Some(buf) => simdflate::crc32(crc as u32, buf) as c_ulong,
        None => 0,
    }
}

/// Adler-32 of `buf`, continuing from `adler`. A null `buf` gives 1.
///
/// # Safety
///
/// `buf` must be null or valid for reads of `len` bytes.
#[no_mangle]
pub unsafe extern "C" fn simdflate_adler32(adler: c_ulong, buf: *const u8, len: c_uint) -> c_ulong {
    if buf.is_null() {
        return 1;
    }

    match unsafe { input_slice(buf, len as usize) } {
        Some(buf) => simdflate::adler32(adler as u32, buf) as c_ulong,
        None => 1,
    }
}

#[no_mangle]
pub extern "C" fn simdflate_compress_bound(sourceLen: c_ulong) -> c_ulong {
    simdflate::compress_bound(sourceLen as usize) as c_ulong
}

/// The library version as a NUL-terminated string with static lifetime.
#[no_mangle]
pub extern "C" fn simdflate_version() -> *const c_char {
    VERSION.as_ptr().cast()
}

/// 1 when vector kernels are available on this machine, 0 otherwise.
#[no_mangle]
pub extern "C" fn simdflate_simd_supported() -> c_int {
    simdflate::capabilities().simd_supported as c_int
}

/// Create a streaming compressor. Out-of-range `level`, `window_bits` and `mem_level` use their
/// defaults; a negative `window_bits` produces raw DEFLATE. Returns null for an unknown
/// `strategy` or when allocation fails.
#[no_mangle]
pub extern "C" fn simdflate_deflate_init(
    level: c_int,
    window_bits: c_int,
    mem_level: c_int,
    strategy: c_int,
) -> *mut simdflate_stream {
    let Ok(strategy) = Strategy::try_from(strategy) else {
        tracing::warn!(strategy, "unknown strategy");
        return ptr::null_mut();
    };

    let config = DeflateConfig {
        level,
        window_bits,
        mem_level,
        strategy,
        ..DeflateConfig::default()
    };

    match Deflate::new(config, Dispatch::detect()) {
        Ok(deflate) => new_stream(Engine::Deflate(deflate)),
        Err(err) => {
            tracing::warn!(%err, "deflate init failed");
            ptr::null_mut()
        }
    }
}

/// Compress `input` into `output`. `flush` is a zlib flush value (0 to 5).
///
/// Returns `Ok`, `StreamEnd` once a `Finish` call completed the stream, or `BufError` when no
/// progress was possible. The unused input and output counts are available afterwards through
/// [`simdflate_stream_avail_in`] and [`simdflate_stream_avail_out`].
///
/// # Safety
///
/// - `ctx` must be null or a pointer returned by [`simdflate_deflate_init`] that was not ended.
/// - `input` must be valid for reads of `input_len` bytes, `output` for writes of `output_len`
///   bytes.
#[no_mangle]
pub unsafe extern "C" fn simdflate_deflate_process(
    ctx: *mut simdflate_stream,
    input: *const u8,
    input_len: c_uint,
    output: *mut u8,
    output_len: c_uint,
    flush: c_int,
) -> c_int {
    let Ok(flush) = Flush::try_from(flush) else {
        return ReturnCode::StreamError as c_int;
    };

    let Some(stream) = (unsafe { ctx.as_mut() }) else {
        return ReturnCode::StreamError as c_int;
    };

    let Engine::Deflate(deflate) = &mut stream.engine else {
        return ReturnCode::StreamError as c_int;
    };

    let (Some(input), Some(output)) = (unsafe {
        (
            input_slice(input, input_len as usize),
            output_slice(output, output_len as usize),
        )
    }) else {
        return ReturnCode::StreamError as c_int;
    };

    let progress = deflate.deflate(input, output, flush);

    stream.avail_in = input_len - progress.consumed as c_uint;
    stream.avail_out = output_len - progress.produced as c_uint;

    progress.code as c_int
}

/// Free a compressor. Null is ignored.
///
/// # Safety
///
/// `ctx` must be null or a pointer returned by [`simdflate_deflate_init`] that was not ended.
#[no_mangle]
pub unsafe extern "C" fn simdflate_deflate_end(ctx: *mut simdflate_stream) {
    unsafe { end_stream(ctx) }
}

/// Create a streaming decompressor. `window_bits` outside `8..=15` uses 15; negative values
/// read raw DEFLATE.
#[no_mangle]
pub extern "C" fn simdflate_inflate_init(window_bits: c_int) -> *mut simdflate_stream {
    let config = InflateConfig { window_bits };

    match Inflate::new(config, Dispatch::detect()) {
        Ok(inflate) => new_stream(Engine::Inflate(inflate)),
        Err(err) => {
            tracing::warn!(%err, "inflate init failed");
            ptr::null_mut()
        }
    }
}

/// Decompress `input` into `output`.
///
/// Returns `Ok` while the stream is incomplete, `StreamEnd` at its end, `NeedDict` when it needs
/// a preset dictionary, `DataError` for corrupt input and `BufError` when no progress was
/// possible.
///
/// # Safety
///
/// - `ctx` must be null or a pointer returned by [`simdflate_inflate_init`] that was not ended.
/// - `input` must be valid for reads of `input_len` bytes, `output` for writes of `output_len`
///   bytes.
#[no_mangle]
pub unsafe extern "C" fn simdflate_inflate_process(
    ctx: *mut simdflate_stream,
    input: *const u8,
    input_len: c_uint,
    output: *mut u8,
    output_len: c_uint,
) -> c_int {
    let Some(stream) = (unsafe { ctx.as_mut() }) else {
        return ReturnCode::StreamError as c_int;
    };

    let Engine::Inflate(inflate) = &mut stream.engine else {
        return ReturnCode::StreamError as c_int;
    };

    let (Some(input), Some(output)) = (unsafe {
        (
            input_slice(input, input_len as usize),
            output_slice(output, output_len as usize),
        )
    }) else {
        return ReturnCode::StreamError as c_int;
    };

    let progress = inflate.inflate(input, output, Flush::NoFlush);

    stream.avail_in = input_len - progress.consumed as c_uint;
    stream.avail_out = output_len - progress.produced as c_uint;

    progress.code as c_int
}

/// Free a decompressor. Null is ignored.
///
/// # Safety
///
/// `ctx` must be null or a pointer returned by [`simdflate_inflate_init`] that was not ended.
#[no_mangle]
pub unsafe extern "C" fn simdflate_inflate_end(ctx: *mut simdflate_stream) {
    unsafe { end_stream(ctx) }
}

/// Input bytes the last call did not consume. 0 for null.
///
/// # Safety
///
/// `ctx` must be null or a live stream.
#[no_mangle]
pub unsafe extern "C" fn simdflate_stream_avail_in(ctx: *const simdflate_stream) -> c_uint {
    unsafe { ctx.as_ref() }.map_or(0, |stream| stream.avail_in)
}

/// Output space the last call left unused. 0 for null.
///
/// # Safety
///
/// `ctx` must be null or a live stream.
#[no_mangle]
pub unsafe extern "C" fn simdflate_stream_avail_out(ctx: *const simdflate_stream) -> c_uint {
    unsafe { ctx.as_ref() }.map_or(0, |stream| stream.avail_out)
}

/// # Safety
///
/// `ctx` must be null or a live stream.
#[no_mangle]
pub unsafe extern "C" fn simdflate_stream_total_in(ctx: *const simdflate_stream) -> c_ulong {
    unsafe { ctx.as_ref() }.map_or(0, |stream| match &stream.engine {
        Engine::Deflate(deflate) => deflate.total_in() as c_ulong,
        Engine::Inflate(inflate) => inflate.total_in() as c_ulong,
    })
}

/// # Safety
///
/// `ctx` must be null or a live stream.
#[no_mangle]
pub unsafe extern "C" fn simdflate_stream_total_out(ctx: *const simdflate_stream) -> c_ulong {
    unsafe { ctx.as_ref() }.map_or(0, |stream| match &stream.engine {
        Engine::Deflate(deflate) => deflate.total_out() as c_ulong,
        Engine::Inflate(inflate) => inflate.total_out() as c_ulong,
    })
}

fn new_stream(engine: Engine) -> *mut simdflate_stream {
    Box::into_raw(Box::new(simdflate_stream {
        engine,
        avail_in: 0,
        avail_out: 0,
    }))
}

unsafe fn end_stream(ctx: *mut simdflate_stream) {
    if !ctx.is_null() {
        drop(unsafe { Box::from_raw(ctx) });
    }
}
