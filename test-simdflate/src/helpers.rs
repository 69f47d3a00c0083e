//! Slice-based wrappers over the C ABI, and the flate2 oracle.

use std::ffi::{c_uint, c_ulong};
use std::io::Read;

use simdflate::{deflate::DeflateConfig, Flush, ReturnCode};
use simdflate_sys::*;

pub fn compress_slice_sys<'a>(
    output: &'a mut [u8],
    input: &[u8],
    level: i32,
) -> (&'a mut [u8], ReturnCode) {
    let mut dest_len = output.len() as c_ulong;

    let err = unsafe {
        simdflate_compress2(
            output.as_mut_ptr(),
            &mut dest_len,
            input.as_ptr(),
            input.len() as c_ulong,
            level,
        )
    };

    (&mut output[..dest_len as usize], ReturnCode::from(err))
}

pub fn uncompress_slice_sys<'a>(output: &'a mut [u8], input: &[u8]) -> (&'a mut [u8], ReturnCode) {
    let mut dest_len = output.len() as c_ulong;

    let err = unsafe {
        simdflate_uncompress(
            output.as_mut_ptr(),
            &mut dest_len,
            input.as_ptr(),
            input.len() as c_ulong,
        )
    };

    (&mut output[..dest_len as usize], ReturnCode::from(err))
}

/// Compress through a streaming handle, feeding input and collecting output `chunk` bytes at a
/// time.
pub fn deflate_stream_sys(
    input: &[u8],
    config: DeflateConfig,
    chunk: usize,
) -> Result<Vec<u8>, ReturnCode> {
    let ctx = simdflate_deflate_init(
        config.level,
        config.window_bits,
        config.mem_level,
        config.strategy as i32,
    );
    if ctx.is_null() {
        return Err(ReturnCode::StreamError);
    }

    let mut output = Vec::new();
    let mut buf = vec![0u8; chunk];
    let mut pos = 0;

    let result = loop {
        let end = Ord::min(pos + chunk, input.len());
        let flush = if end == input.len() {
            Flush::Finish
        } else {
            Flush::NoFlush
        };

        let err = unsafe {
            simdflate_deflate_process(
                ctx,
                input[pos..].as_ptr(),
                (end - pos) as c_uint,
                buf.as_mut_ptr(),
                buf.len() as c_uint,
                flush as i32,
            )
        };

        let (avail_in, avail_out) =
            unsafe { (simdflate_stream_avail_in(ctx), simdflate_stream_avail_out(ctx)) };

        pos = end - avail_in as usize;
        output.extend_from_slice(&buf[..chunk - avail_out as usize]);

        match ReturnCode::from(err) {
            ReturnCode::StreamEnd => break Ok(output),
            ReturnCode::Ok | ReturnCode::BufError => continue,
            other => break Err(other),
        }
    };

    unsafe { simdflate_deflate_end(ctx) };

    result
}

/// Decompress through a streaming handle, `chunk` bytes of input and output at a time.
pub fn inflate_stream_sys(input: &[u8], window_bits: i32, chunk: usize) -> Result<Vec<u8>, ReturnCode> {
    let ctx = simdflate_inflate_init(window_bits);
    if ctx.is_null() {
        return Err(ReturnCode::StreamError);
    }

    let mut output = Vec::new();
    let mut buf = vec![0u8; chunk];
    let mut pos = 0;

    let result = loop {
        let end = Ord::min(pos + chunk, input.len());

        let err = unsafe {
            simdflate_inflate_process(
                ctx,
                input[pos..].as_ptr(),
                (end - pos) as c_uint,
                buf.as_mut_ptr(),
                buf.len() as c_uint,
            )
        };

        let (avail_in, avail_out) =
            unsafe { (simdflate_stream_avail_in(ctx), simdflate_stream_avail_out(ctx)) };

        pos = end - avail_in as usize;
        let produced = chunk - avail_out as usize;
        output.extend_from_slice(&buf[..produced]);

        match ReturnCode::from(err) {
            ReturnCode::StreamEnd => break Ok(output),
            ReturnCode::Ok => continue,
            // no progress possible: the input ended early
            ReturnCode::BufError if pos == input.len() => break Err(ReturnCode::DataError),
            ReturnCode::BufError => continue,
            other => break Err(other),
        }
    };

    unsafe { simdflate_inflate_end(ctx) };

    result
}

/// Decode with flate2. `raw` selects a bare DEFLATE stream, otherwise zlib.
pub fn flate2_decompress(compressed: &[u8], raw: bool) -> std::io::Result<Vec<u8>> {
    let mut out = Vec::new();

    if raw {
        flate2::read::DeflateDecoder::new(compressed).read_to_end(&mut out)?;
    } else {
        flate2::read::ZlibDecoder::new(compressed).read_to_end(&mut out)?;
    }

    Ok(out)
}

/// Encode with flate2 as a zlib stream.
pub fn flate2_compress(input: &[u8], level: u32) -> Vec<u8> {
    let mut out = Vec::new();
    let mut encoder = flate2::read::ZlibEncoder::new(input, flate2::Compression::new(level));

    match encoder.read_to_end(&mut out) {
        Ok(_) => out,
        Err(err) => panic!("flate2 cannot fail on an in-memory reader: {err}"),
    }
}
