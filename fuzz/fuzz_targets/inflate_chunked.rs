#![no_main]
use libfuzzer_sys::fuzz_target;

use simdflate::{Dispatch, Flush, Inflate, InflateConfig, ReturnCode};

fuzz_target!(|input: (Vec<u8>, u8, u8, u8)| {
    let (data, level, in_chunk, out_chunk) = input;

    let level = (level % 10) as i32;
    let in_chunk = Ord::max(in_chunk, 1) as usize;
    let out_chunk = Ord::max(out_chunk, 1) as usize;

    let compressed = simdflate::compress(&data, level).unwrap().data;

    let mut inflate = Inflate::new(InflateConfig::default(), Dispatch::detect()).unwrap();
    let mut output = Vec::with_capacity(data.len());
    let mut buf = vec![0u8; out_chunk];
    let mut pos = 0;

    loop {
        let end = Ord::min(pos + in_chunk, compressed.len());
        let progress = inflate.inflate(&compressed[pos..end], &mut buf, Flush::NoFlush);
        pos += progress.consumed;
        output.extend_from_slice(&buf[..progress.produced]);

        match progress.code {
            ReturnCode::StreamEnd => break,
            ReturnCode::Ok | ReturnCode::BufError => {
                assert!(pos < compressed.len() || progress.produced > 0)
            }
            other => panic!("{other:?}: {:?}", inflate.msg()),
        }
    }

    assert_eq!(pos, compressed.len());
    assert_eq!(output, data);
    assert_eq!(inflate.adler(), simdflate::adler32(1, &data));
});
