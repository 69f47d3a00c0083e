#![no_main]
use libfuzzer_sys::fuzz_target;

use simdflate::deflate::DeflateConfig;

fuzz_target!(|input: (String, DeflateConfig)| {
    test_simdflate::end_to_end::test(input.0, input.1);
});
