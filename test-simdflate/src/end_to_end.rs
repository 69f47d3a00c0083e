use simdflate::{deflate::DeflateConfig, inflate::InflateConfig, Dispatch, ReturnCode};

use crate::helpers::{deflate_stream_sys, flate2_decompress, inflate_stream_sys};

#[test]
fn end_to_end() {
    ::quickcheck::quickcheck(test as fn(_, _) -> _);
}

/// Compress `data` with `config` every way the crates offer, and check that every decoder
/// (ours, the C ABI, flate2) gets `data` back.
pub fn test(data: String, config: DeflateConfig) -> bool {
    let data = data.as_bytes();

    let compressed = match simdflate::compress_with(data, config, Dispatch::detect()) {
        Ok(compressed) => compressed.data,
        Err(err) => panic!("compression failed for {config:?}: {err}"),
    };

    // the kernels must not change the output
    let scalar = simdflate::compress_with(data, config, Dispatch::Scalar).map(|c| c.data);
    assert_eq!(scalar.as_ref(), Ok(&compressed), "{config:?}");

    // a 256-byte window is compressed as a 512-byte one
    let window_bits = match config.window_bits {
        8 => 9,
        -8 => -9,
        n => n,
    };
    let raw = window_bits < 0;

    match flate2_decompress(&compressed, raw) {
        Ok(decompressed) => assert_eq!(decompressed, data, "flate2 cannot decode {config:?}"),
        Err(err) => panic!("flate2 rejects the output for {config:?}: {err}"),
    }

    let inflate_config = InflateConfig { window_bits };

    let mut output = vec![0u8; data.len()];
    let (output, err) = simdflate::inflate::uncompress_slice(&mut output, &compressed, inflate_config);
    assert_eq!(err, ReturnCode::Ok, "{config:?}");
    assert_eq!(output, data);

    let streamed = deflate_stream_sys(data, config, 1000);
    let streamed = match streamed {
        Ok(streamed) => streamed,
        Err(code) => panic!("streaming compression failed for {config:?}: {code:?}"),
    };

    assert_eq!(
        inflate_stream_sys(&streamed, window_bits, 77).as_deref(),
        Ok(data),
        "{config:?}"
    );

    true
}
