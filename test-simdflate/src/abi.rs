use core::ffi::{c_uint, c_ulong};
use core::ptr;
use std::ffi::CStr;

use simdflate::{deflate::DeflateConfig, Flush, ReturnCode, Strategy};
use simdflate_sys::*;

use crate::helpers::{
    compress_slice_sys, deflate_stream_sys, flate2_compress, flate2_decompress,
    inflate_stream_sys, uncompress_slice_sys,
};

fn sample_text(len: usize) -> Vec<u8> {
    b"a line of text for the c interface, with some repetition in it\n"
        .iter()
        .copied()
        .cycle()
        .take(len)
        .collect()
}

mod null {
    use super::*;

    #[test]
    fn checksums() {
        unsafe {
            assert_eq!(simdflate_crc32(0, ptr::null(), 0), 0);
            assert_eq!(simdflate_crc32(0x1234, ptr::null(), 32), 0);
            assert_eq!(simdflate_adler32(0x1234, ptr::null(), 32), 1);

            // an empty buffer leaves the checksum alone
            let empty: [u8; 0] = [];
            assert_eq!(simdflate_crc32(0x1234, empty.as_ptr(), 0), 0x1234);
            assert_eq!(simdflate_adler32(0x1234, empty.as_ptr(), 0), 0x1234);
        }
    }

    #[test]
    fn one_shot() {
        let mut dest = [0u8; 64];
        let source = [1u8, 2, 3];

        unsafe {
            let mut dest_len = dest.len() as c_ulong;
            let err = simdflate_compress(dest.as_mut_ptr(), &mut dest_len, ptr::null(), 3);
            assert_eq!(ReturnCode::from(err), ReturnCode::StreamError);

            let err = simdflate_compress(ptr::null_mut(), &mut dest_len, source.as_ptr(), 3);
            assert_eq!(ReturnCode::from(err), ReturnCode::StreamError);

            let err = simdflate_compress(dest.as_mut_ptr(), ptr::null_mut(), source.as_ptr(), 3);
            assert_eq!(ReturnCode::from(err), ReturnCode::StreamError);

            let err = simdflate_uncompress(dest.as_mut_ptr(), &mut dest_len, ptr::null(), 3);
            assert_eq!(ReturnCode::from(err), ReturnCode::StreamError);

            // null with length zero is an empty buffer
            let mut dest_len = dest.len() as c_ulong;
            let err = simdflate_compress(dest.as_mut_ptr(), &mut dest_len, ptr::null(), 0);
            assert_eq!(ReturnCode::from(err), ReturnCode::Ok);
            assert_eq!(&dest[..dest_len as usize], &[0x78, 0x9c, 0x03, 0x00, 0x00, 0x00, 0x00, 0x01]);
        }
    }

    #[test]
    fn streams() {
        let mut buf = [0u8; 16];

        unsafe {
            let err = simdflate_deflate_process(
                ptr::null_mut(),
                buf.as_ptr(),
                0,
                buf.as_mut_ptr(),
                16,
                0,
            );
            assert_eq!(ReturnCode::from(err), ReturnCode::StreamError);

            let err = simdflate_inflate_process(ptr::null_mut(), buf.as_ptr(), 0, buf.as_mut_ptr(), 16);
            assert_eq!(ReturnCode::from(err), ReturnCode::StreamError);

            assert_eq!(simdflate_stream_avail_in(ptr::null()), 0);
            assert_eq!(simdflate_stream_avail_out(ptr::null()), 0);
            assert_eq!(simdflate_stream_total_in(ptr::null()), 0);
            assert_eq!(simdflate_stream_total_out(ptr::null()), 0);

            simdflate_deflate_end(ptr::null_mut());
            simdflate_inflate_end(ptr::null_mut());

            // a null input with a length
            let ctx = simdflate_inflate_init(15);
            let err = simdflate_inflate_process(ctx, ptr::null(), 4, buf.as_mut_ptr(), 16);
            assert_eq!(ReturnCode::from(err), ReturnCode::StreamError);
            simdflate_inflate_end(ctx);
        }
    }
}

#[test]
fn version_and_capabilities() {
    let version = unsafe { CStr::from_ptr(simdflate_version()) };
    assert_eq!(version.to_str(), Ok(simdflate::version()));

    let capabilities = simdflate::capabilities();
    assert_eq!(simdflate_simd_supported() == 1, capabilities.simd_supported);
    assert_eq!(capabilities.version, simdflate::version());
}

#[test]
fn compress_bound_matches_the_library() {
    for len in [0, 1, 100, 1 << 16, 1 << 24] {
        assert_eq!(
            simdflate_compress_bound(len as c_ulong) as usize,
            simdflate::compress_bound(len)
        );
    }

    // n + (n+7)/8 + (n+63)/64 + 5 + 6
    assert_eq!(simdflate_compress_bound(1000), 1000 + 125 + 16 + 11);
}

#[test]
fn checksums_match_the_library() {
    let input = sample_text(10_000);

    unsafe {
        assert_eq!(
            simdflate_crc32(0, input.as_ptr(), input.len() as c_uint) as u32,
            crc32fast::hash(&input)
        );
        assert_eq!(
            simdflate_adler32(1, input.as_ptr(), input.len() as c_uint) as u32,
            simdflate::adler32(1, &input)
        );
    }
}

#[test]
fn one_shot_round_trip() {
    let input = sample_text(50_000);

    for level in [-1, 0, 1, 6, 9, 42] {
        let mut compressed = vec![0; simdflate::compress_bound(input.len())];
        let (compressed, err) = compress_slice_sys(&mut compressed, &input, level);
        assert_eq!(err, ReturnCode::Ok, "level {level}");

        // the same bytes as the library
        let expected = simdflate::compress(&input, level).map(|c| c.data);
        assert_eq!(expected.as_deref(), Ok(&*compressed), "level {level}");

        assert_eq!(flate2_decompress(compressed, false).ok(), Some(input.clone()));

        let mut output = vec![0; input.len()];
        let (output, err) = uncompress_slice_sys(&mut output, compressed);
        assert_eq!(err, ReturnCode::Ok);
        assert_eq!(output, input.as_slice());
    }
}

#[test]
fn buffer_errors() {
    let input = sample_text(50_000);

    let mut small = vec![0; 100];
    let (_, err) = compress_slice_sys(&mut small, &input, 6);
    assert_eq!(err, ReturnCode::BufError);

    let compressed = flate2_compress(&input, 6);

    let mut small = vec![0; input.len() / 2];
    let (written, err) = uncompress_slice_sys(&mut small, &compressed);
    assert_eq!(err, ReturnCode::BufError);
    assert_eq!(written, &input[..input.len() / 2]);

    // retrying with enough space works
    let mut output = vec![0; input.len()];
    let (output, err) = uncompress_slice_sys(&mut output, &compressed);
    assert_eq!(err, ReturnCode::Ok);
    assert_eq!(output, input.as_slice());
}

#[test]
fn corrupt_input() {
    let mut output = [0u8; 256];

    let (_, err) = uncompress_slice_sys(&mut output, &[0x12, 0x34, 0x56, 0x78, 0x9a]);
    assert_eq!(err, ReturnCode::DataError);

    let compressed = flate2_compress(&sample_text(1000), 6);
    let mut output = vec![0u8; 2000];
    let (_, err) = uncompress_slice_sys(&mut output, &compressed[..compressed.len() / 2]);
    assert_eq!(err, ReturnCode::DataError);
}

#[test]
fn streaming_handles() {
    let input = sample_text(100_000);

    for (level, window_bits, strategy) in [
        (6, 15, Strategy::Default),
        (1, -15, Strategy::Default),
        (9, 9, Strategy::Filtered),
        (4, 12, Strategy::Rle),
        (2, 15, Strategy::HuffmanOnly),
        (6, 15, Strategy::Fixed),
    ] {
        let config = DeflateConfig {
            level,
            window_bits,
            strategy,
            ..DeflateConfig::default()
        };

        let compressed = deflate_stream_sys(&input, config, 333).unwrap();
        assert_eq!(
            flate2_decompress(&compressed, window_bits < 0).ok().as_deref(),
            Some(input.as_slice()),
            "{config:?}"
        );

        let output = inflate_stream_sys(&compressed, window_bits, 1024).unwrap();
        assert_eq!(output, input, "{config:?}");
    }
}

#[test]
fn stream_counters() {
    let input = sample_text(4096);

    let ctx = simdflate_deflate_init(6, 15, 8, 0);
    assert!(!ctx.is_null());

    let mut compressed = vec![0u8; 8192];

    unsafe {
        let err = simdflate_deflate_process(
            ctx,
            input.as_ptr(),
            input.len() as c_uint,
            compressed.as_mut_ptr(),
            compressed.len() as c_uint,
            Flush::Finish as i32,
        );
        assert_eq!(ReturnCode::from(err), ReturnCode::StreamEnd);

        let produced = compressed.len() - simdflate_stream_avail_out(ctx) as usize;
        assert_eq!(simdflate_stream_avail_in(ctx), 0);
        assert_eq!(simdflate_stream_total_in(ctx), input.len() as c_ulong);
        assert_eq!(simdflate_stream_total_out(ctx), produced as c_ulong);

        // an inflate call on a deflate handle
        let err = simdflate_inflate_process(ctx, input.as_ptr(), 1, compressed.as_mut_ptr(), 1);
        assert_eq!(ReturnCode::from(err), ReturnCode::StreamError);

        simdflate_deflate_end(ctx);

        let ctx = simdflate_inflate_init(15);
        let mut output = vec![0u8; input.len()];
        let err = simdflate_inflate_process(
            ctx,
            compressed.as_ptr(),
            produced as c_uint,
            output.as_mut_ptr(),
            output.len() as c_uint,
        );
        assert_eq!(ReturnCode::from(err), ReturnCode::StreamEnd);
        assert_eq!(output, input);
        assert_eq!(simdflate_stream_avail_out(ctx), 0);
        assert_eq!(simdflate_stream_total_in(ctx), produced as c_ulong);
        assert_eq!(simdflate_stream_total_out(ctx), input.len() as c_ulong);

        simdflate_inflate_end(ctx);
    }
}

#[test]
fn invalid_init_parameters() {
    // unknown strategy
    assert!(simdflate_deflate_init(6, 15, 8, 5).is_null());

    unsafe {
        // an unknown flush value
        let ctx = simdflate_deflate_init(6, 15, 8, 0);
        let mut buf = [0u8; 64];
        let err = simdflate_deflate_process(ctx, buf.as_ptr(), 0, buf.as_mut_ptr(), 64, 17);
        assert_eq!(ReturnCode::from(err), ReturnCode::StreamError);
        simdflate_deflate_end(ctx);

        // out-of-range values fall back to the defaults
        let ctx = simdflate_deflate_init(42, 99, 0, 0);
        assert!(!ctx.is_null());
        simdflate_deflate_end(ctx);

        let ctx = simdflate_inflate_init(3);
        assert!(!ctx.is_null());
        simdflate_inflate_end(ctx);
    }
}
