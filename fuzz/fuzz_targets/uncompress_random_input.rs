#![no_main]
use std::io::Read;

use libfuzzer_sys::fuzz_target;
use simdflate::{inflate::InflateConfig, Dispatch, ReturnCode};

fuzz_target!(|input: (&[u8], bool)| {
    let (source, raw) = input;
    let config = InflateConfig {
        window_bits: if raw { -15 } else { 15 },
    };

    let mut scalar = vec![0u8; 1 << 16];
    let mut vectorized = vec![0u8; 1 << 16];

    let (scalar, err_scalar) =
        simdflate::inflate::uncompress_slice_with(&mut scalar, source, config, Dispatch::Scalar);
    let (vectorized, err_vectorized) =
        simdflate::inflate::uncompress_slice_with(&mut vectorized, source, config, Dispatch::detect());

    assert_eq!(err_scalar, err_vectorized);
    assert_eq!(scalar, vectorized);

    if err_scalar == ReturnCode::Ok {
        // a stream we accept must mean the same to flate2
        let mut expected = Vec::new();
        let result = if raw {
            flate2::read::DeflateDecoder::new(source).read_to_end(&mut expected)
        } else {
            flate2::read::ZlibDecoder::new(source).read_to_end(&mut expected)
        };

        assert!(result.is_ok());
        assert_eq!(expected, scalar);
    }
});
