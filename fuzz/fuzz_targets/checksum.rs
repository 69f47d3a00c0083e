#![no_main]

//! Checks the vector checksum kernels against crc32fast, the scalar code, and the combine
//! functions.

use libfuzzer_sys::fuzz_target;
use simdflate::{adler32, adler32_combine, crc32, crc32_combine, Dispatch};

fuzz_target!(|input: (Vec<u8>, u32, u8)| {
    let (data, start, split) = input;

    let expected = {
        let mut h = crc32fast::Hasher::new_with_initial(start);
        h.update(&data);
        h.finalize()
    };

    let actual = crc32(start, &data);
    assert_eq!(expected, actual);

    let scalar = simdflate::crc32::crc32_with(Dispatch::Scalar, start, &data);
    assert_eq!(scalar, actual);

    // feed the data in pieces, checking that combining agrees with continuing
    let chunk_size = Ord::max(split, 1) as usize;

    let mut crc = 0;
    let mut adler = 1;

    for chunk in data.chunks(chunk_size) {
        let crc_combined = crc32_combine(crc, crc32(0, chunk), chunk.len() as u64);
        let adler_combined = adler32_combine(adler, adler32(1, chunk), chunk.len() as u64);

        crc = crc32(crc, chunk);
        adler = adler32(adler, chunk);

        assert_eq!(crc, crc_combined);
        assert_eq!(adler, adler_combined);
    }

    assert_eq!(crc, crc32(0, &data));
    assert_eq!(adler, adler32(1, &data));
});
