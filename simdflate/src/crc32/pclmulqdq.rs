//! Carry-less multiplication folding.
//!
//! Four 128-bit accumulators each absorb one 16-byte lane of every 64-byte super-block. The
//! accumulators are then folded into one, reduced to 64 and 32 bits, and finished with a Barrett
//! reduction. Constants are powers of x modulo the bit-reflected polynomial.

use std::arch::x86_64::{
    __m128i, _mm_and_si128, _mm_clmulepi64_si128, _mm_cvtsi32_si128, _mm_extract_epi32,
    _mm_loadu_si128, _mm_set_epi32, _mm_set_epi64x, _mm_srli_si128, _mm_xor_si128,
};

use super::{table::crc32_slice16, VECTOR_THRESHOLD};

// fold constants for 4 lanes (K1, K2), 1 lane (K3, K4) and 64 -> 32 bits (K5)
const K1: i64 = 0x154442bd4;
const K2: i64 = 0x1c6e41596;
const K3: i64 = 0x1751997d0;
const K4: i64 = 0x0ccaa009e;
const K5: i64 = 0x163cd6124;
const P_X: i64 = 0x1DB710641;
const U_PRIME: i64 = 0x1F7011641;

/// # Safety
///
/// The CPU must support pclmulqdq, sse2 and sse4.1.
#[target_feature(enable = "pclmulqdq,sse2,sse4.1")]
pub unsafe fn crc32_pclmulqdq(crc: u32, mut data: &[u8]) -> u32 {
    if data.len() < VECTOR_THRESHOLD {
        return crc32_slice16(crc, data);
    }

    let mut x3 = get(&mut data);
    let mut x2 = get(&mut data);
    let mut x1 = get(&mut data);
    let mut x0 = get(&mut data);

    // the initial crc is folded into the first lane
    x3 = _mm_xor_si128(x3, _mm_cvtsi32_si128(!crc as i32));

    let k1k2 = _mm_set_epi64x(K2, K1);
    while data.len() >= 64 {
        x3 = reduce128(x3, get(&mut data), k1k2);
        x2 = reduce128(x2, get(&mut data), k1k2);
        x1 = reduce128(x1, get(&mut data), k1k2);
        x0 = reduce128(x0, get(&mut data), k1k2);
    }

    let k3k4 = _mm_set_epi64x(K4, K3);
    let mut x = reduce128(x3, x2, k3k4);
    x = reduce128(x, x1, k3k4);
    x = reduce128(x, x0, k3k4);

    while data.len() >= 16 {
        x = reduce128(x, get(&mut data), k3k4);
    }

    // 128 -> 64 bits
    x = _mm_xor_si128(_mm_clmulepi64_si128(x, k3k4, 0x10), _mm_srli_si128(x, 8));

    // 64 -> 32 bits
    let low32 = _mm_set_epi32(0, 0, 0, !0);
    x = _mm_xor_si128(
        _mm_clmulepi64_si128(_mm_and_si128(x, low32), _mm_set_epi64x(0, K5), 0x00),
        _mm_srli_si128(x, 4),
    );

    // Barrett reduction
    let pu = _mm_set_epi64x(U_PRIME, P_X);
    let t1 = _mm_clmulepi64_si128(_mm_and_si128(x, low32), pu, 0x10);
    let t2 = _mm_clmulepi64_si128(_mm_and_si128(t1, low32), pu, 0x00);
    let c = _mm_extract_epi32(_mm_xor_si128(x, t2), 1) as u32;

    if data.is_empty() {
        !c
    } else {
        crc32_slice16(!c, data)
    }
}

#[inline(always)]
unsafe fn reduce128(a: __m128i, b: __m128i, keys: __m128i) -> __m128i {
    let t1 = _mm_clmulepi64_si128(a, keys, 0x00);
    let t2 = _mm_clmulepi64_si128(a, keys, 0x11);
    _mm_xor_si128(_mm_xor_si128(b, t1), t2)
}

#[inline(always)]
unsafe fn get(data: &mut &[u8]) -> __m128i {
    debug_assert!(data.len() >= 16);
    let r = _mm_loadu_si128(data.as_ptr() as *const __m128i);
    *data = &data[16..];
    r
}
