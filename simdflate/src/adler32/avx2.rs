use std::arch::x86_64::{
    __m256i, _mm256_add_epi32, _mm256_castsi256_si128, _mm256_extracti128_si256,
    _mm256_loadu_si256, _mm256_madd_epi16, _mm256_maddubs_epi16, _mm256_permutevar8x32_epi32,
    _mm256_sad_epu8, _mm256_slli_epi32, _mm256_zextsi128_si256, _mm_add_epi32,
    _mm_cvtsi128_si32, _mm_cvtsi32_si128, _mm_shuffle_epi32, _mm_unpackhi_epi64,
};

use super::{
    generic::{adler32_len_16, adler32_len_64},
    BASE, NMAX,
};

const fn __m256i_literal(bytes: [u8; 32]) -> __m256i {
    unsafe { std::mem::transmute(bytes) }
}

const DOT2V: __m256i = __m256i_literal([
    32, 31, 30, 29, 28, 27, 26, 25, 24, 23, 22, 21, 20, 19, 18, 17, 16, 15, 14, 13, 12, 11, 10, 9,
    8, 7, 6, 5, 4, 3, 2, 1,
]);

const DOT3V: __m256i = __m256i_literal([
    1, 0, 1, 0, 1, 0, 1, 0, 1, 0, 1, 0, 1, 0, 1, 0, 1, 0, 1, 0, 1, 0, 1, 0, 1, 0, 1, 0, 1, 0, 1, 0,
]);

const ZERO: __m256i = __m256i_literal([0; 32]);

// 32 bit horizontal sum, adapted from Agner Fog's vector library.
#[target_feature(enable = "avx2")]
unsafe fn hsum256(x: __m256i) -> u32 {
    let sum1 = _mm_add_epi32(_mm256_extracti128_si256(x, 1), _mm256_castsi256_si128(x));
    let sum2 = _mm_add_epi32(sum1, _mm_unpackhi_epi64(sum1, sum1));
    let sum3 = _mm_add_epi32(sum2, _mm_shuffle_epi32(sum2, 1));
    _mm_cvtsi128_si32(sum3) as u32
}

// only the even lanes of a `sad` result are non-zero
#[target_feature(enable = "avx2")]
unsafe fn partial_hsum256(x: __m256i) -> u32 {
    const PERM_VEC: __m256i = __m256i_literal([
        0, 0, 0, 0, //
        2, 0, 0, 0, //
        4, 0, 0, 0, //
        6, 0, 0, 0, //
        1, 0, 0, 0, //
        1, 0, 0, 0, //
        1, 0, 0, 0, //
        1, 0, 0, 0, //
    ]);

    let non_zero = _mm256_permutevar8x32_epi32(x, PERM_VEC);
    let non_zero_sse = _mm256_castsi256_si128(non_zero);
    let sum2 = _mm_add_epi32(non_zero_sse, _mm_unpackhi_epi64(non_zero_sse, non_zero_sse));
    let sum3 = _mm_add_epi32(sum2, _mm_shuffle_epi32(sum2, 1));
    _mm_cvtsi128_si32(sum3) as u32
}

/// # Safety
///
/// The CPU must support avx2.
#[target_feature(enable = "avx2")]
pub unsafe fn adler32_avx2(adler: u32, src: &[u8]) -> u32 {
    if src.is_empty() {
        return adler;
    }

    let mut adler1 = (adler >> 16) & 0xffff;
    let mut adler0 = adler & 0xffff;

    if src.len() < 16 {
        return adler32_len_16(adler0, src, adler1);
    } else if src.len() < 32 {
        return adler32_len_64(adler0, src, adler1);
    }

    // use largest step possible (without causing overflow)
    const N: usize = (NMAX - (NMAX % 32)) as usize;
    let mut big_chunks = src.chunks_exact(N);
    for chunk in big_chunks.by_ref() {
        (adler0, adler1) = helper_32_bytes(adler0, adler1, chunk);
    }

    // then take steps of 32 bytes
    let remainder = big_chunks.remainder();
    let split = remainder.len() - remainder.len() % 32;
    let (chunks, remainder) = remainder.split_at(split);
    if !chunks.is_empty() {
        (adler0, adler1) = helper_32_bytes(adler0, adler1, chunks);
    }

    if remainder.len() < 16 {
        adler32_len_16(adler0, remainder, adler1)
    } else {
        adler32_len_64(adler0, remainder, adler1)
    }
}

#[target_feature(enable = "avx2")]
unsafe fn helper_32_bytes(adler0: u32, adler1: u32, src: &[u8]) -> (u32, u32) {
    debug_assert_eq!(src.len() % 32, 0);

    let mut vs1 = _mm256_zextsi128_si256(_mm_cvtsi32_si128(adler0 as i32));
    let mut vs2 = _mm256_zextsi128_si256(_mm_cvtsi32_si128(adler1 as i32));

    let mut vs1_0 = vs1;
    let mut vs3 = ZERO;

    for in_chunk in src.chunks_exact(32) {
        let vbuf = _mm256_loadu_si256(in_chunk.as_ptr() as *const __m256i);

        let vs1_sad = _mm256_sad_epu8(vbuf, ZERO); // Sum of abs diff, resulting in 2 x int32's

        vs1 = _mm256_add_epi32(vs1, vs1_sad);
        vs3 = _mm256_add_epi32(vs3, vs1_0);
        let v_short_sum2 = _mm256_maddubs_epi16(vbuf, DOT2V); // sum 32 uint8s to 16 shorts
        let vsum2 = _mm256_madd_epi16(v_short_sum2, DOT3V); // sum 16 shorts to 8 uint32s
        vs2 = _mm256_add_epi32(vsum2, vs2);
        vs1_0 = vs1;
    }

    /* Defer the multiplication with 32 to outside of the loop */
    vs3 = _mm256_slli_epi32(vs3, 5);
    vs2 = _mm256_add_epi32(vs2, vs3);

    (partial_hsum256(vs1) % BASE, hsum256(vs2) % BASE)
}

#[cfg(test)]
mod test {
    use crate::adler32::naive_adler32;

    use super::*;

    #[test]
    fn equivalent_small_inputs() {
        if !std::is_x86_feature_detected!("avx2") {
            return;
        }

        let vec: Vec<_> = (0..128).map(|x| x as u8).collect();

        for (i, _) in vec.iter().enumerate() {
            assert_eq!(naive_adler32(1, &vec[..i]), unsafe {
                adler32_avx2(1, &vec[..i])
            });
        }
    }

    #[test]
    fn equivalent_big_inputs() {
        if !std::is_x86_feature_detected!("avx2") {
            return;
        }

        // in particular the NMAX boundary is of interest
        const L: usize = NMAX as usize - 128;
        const H: usize = NMAX as usize + 128;
        let vec: Vec<_> = (L..H).map(|x| x as u8).collect();

        for (i, _) in vec.iter().enumerate() {
            assert_eq!(naive_adler32(1, &vec[..i]), unsafe {
                adler32_avx2(1, &vec[..i])
            });
        }
    }
}
