use crate::Dispatch;

/// Number of equal leading bytes of two 256-byte blocks.
pub fn compare256(dispatch: Dispatch, src0: &[u8; 256], src1: &[u8; 256]) -> usize {
    #[cfg(target_arch = "x86_64")]
    if dispatch.avx2() {
        // SAFETY: avx2 was detected.
        return unsafe { avx2::compare256(src0, src1) };
    }

    #[cfg(target_arch = "x86_64")]
    if dispatch.sse2() {
        // SAFETY: sse2 was detected.
        return unsafe { sse2::compare256(src0, src1) };
    }

    let _ = dispatch;
    rust::compare256(src0, src1)
}

/// Length of the common prefix of `src0` and `src1`, at most 256.
pub fn match_len(dispatch: Dispatch, src0: &[u8], src1: &[u8]) -> usize {
    if let (Some(src0), Some(src1)) = (src0.first_chunk::<256>(), src1.first_chunk::<256>()) {
        return compare256(dispatch, src0, src1);
    }

    let max = Ord::min(src0.len(), src1.len());

    #[cfg(target_arch = "x86_64")]
    if dispatch.sse2() {
        // SAFETY: sse2 was detected.
        return unsafe { sse2::compare_prefix(&src0[..max], &src1[..max]) };
    }

    let _ = dispatch;
    rust::compare_slice(src0, src1, max)
}

mod rust {
    pub fn compare256(src0: &[u8; 256], src1: &[u8; 256]) -> usize {
        compare_slice(src0, src1, 256)
    }

    pub fn compare_slice(src0: &[u8], src1: &[u8], max: usize) -> usize {
        src0.iter()
            .zip(src1)
            .take(max)
            .take_while(|(x, y)| x == y)
            .count()
    }
}

#[cfg(target_arch = "x86_64")]
mod sse2 {
    use core::arch::x86_64::{__m128i, _mm_cmpeq_epi8, _mm_loadu_si128, _mm_movemask_epi8};

    #[target_feature(enable = "sse2")]
    pub unsafe fn compare256(src0: &[u8; 256], src1: &[u8; 256]) -> usize {
        let mut len = 0;

        for (chunk0, chunk1) in src0.chunks_exact(16).zip(src1.chunks_exact(16)) {
            let xmm_src0 = _mm_loadu_si128(chunk0.as_ptr().cast::<__m128i>());
            let xmm_src1 = _mm_loadu_si128(chunk1.as_ptr().cast::<__m128i>());

            // equal bytes set their bit
            let mask = _mm_movemask_epi8(_mm_cmpeq_epi8(xmm_src0, xmm_src1)) as u32;

            if mask != 0xFFFF {
                return len + (!mask).trailing_zeros() as usize;
            }

            len += 16;
        }

        256
    }

    /// Whole 16-byte chunks are compared with vectors, the tail byte by byte.
    #[target_feature(enable = "sse2")]
    pub unsafe fn compare_prefix(src0: &[u8], src1: &[u8]) -> usize {
        debug_assert_eq!(src0.len(), src1.len());

        let mut len = 0;

        for (chunk0, chunk1) in src0.chunks_exact(16).zip(src1.chunks_exact(16)) {
            let xmm_src0 = _mm_loadu_si128(chunk0.as_ptr().cast::<__m128i>());
            let xmm_src1 = _mm_loadu_si128(chunk1.as_ptr().cast::<__m128i>());

            let mask = _mm_movemask_epi8(_mm_cmpeq_epi8(xmm_src0, xmm_src1)) as u32;

            if mask != 0xFFFF {
                return len + (!mask).trailing_zeros() as usize;
            }

            len += 16;
        }

        len + super::rust::compare_slice(&src0[len..], &src1[len..], 16)
    }
}

#[cfg(target_arch = "x86_64")]
mod avx2 {
    use core::arch::x86_64::{__m256i, _mm256_cmpeq_epi8, _mm256_loadu_si256, _mm256_movemask_epi8};

    #[target_feature(enable = "avx2")]
    pub unsafe fn compare256(src0: &[u8; 256], src1: &[u8; 256]) -> usize {
        let mut len = 0;

        for (chunk0, chunk1) in src0.chunks_exact(32).zip(src1.chunks_exact(32)) {
            let ymm_src0 = _mm256_loadu_si256(chunk0.as_ptr().cast::<__m256i>());
            let ymm_src1 = _mm256_loadu_si256(chunk1.as_ptr().cast::<__m256i>());

            let mask = _mm256_movemask_epi8(_mm256_cmpeq_epi8(ymm_src0, ymm_src1)) as u32;

            if mask != 0xFFFF_FFFF {
                return len + (!mask).trailing_zeros() as usize;
            }

            len += 32;
        }

        256
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn pair(mismatch: Option<usize>) -> ([u8; 256], [u8; 256]) {
        let a: [u8; 256] = core::array::from_fn(|i| i as u8);
        let mut b = a;
        if let Some(i) = mismatch {
            b[i] = b[i].wrapping_add(1);
        }
        (a, b)
    }

    #[test]
    fn every_mismatch_position() {
        let dispatches = [Dispatch::Scalar, Dispatch::detect()];

        for i in 0..256 {
            let (a, b) = pair(Some(i));
            for dispatch in dispatches {
                assert_eq!(compare256(dispatch, &a, &b), i, "{dispatch:?}");
            }
        }

        let (a, b) = pair(None);
        for dispatch in dispatches {
            assert_eq!(compare256(dispatch, &a, &b), 256);
        }
    }

    #[test]
    #[cfg(target_arch = "x86_64")]
    fn sse2_without_avx2() {
        let dispatch = Dispatch::Vectorized(crate::CpuFeatures::detect().without_avx2());

        for i in [0, 15, 16, 17, 100, 255] {
            let (a, b) = pair(Some(i));
            assert_eq!(compare256(dispatch, &a, &b), i);
        }
    }

    #[test]
    fn short_slices() {
        assert_eq!(match_len(Dispatch::Scalar, b"abcdef", b"abcxef"), 3);
        assert_eq!(match_len(Dispatch::detect(), b"abc", b"abcdef"), 3);
        assert_eq!(match_len(Dispatch::detect(), &[7; 300], &[7; 300]), 256);
    }

    #[test]
    fn short_slices_every_mismatch_position() {
        let dispatches = [Dispatch::Scalar, Dispatch::detect()];

        for len in [1, 15, 16, 17, 40, 100, 255] {
            let a: Vec<u8> = (0..len).map(|i| i as u8).collect();

            for dispatch in dispatches {
                assert_eq!(match_len(dispatch, &a, &a), len, "{dispatch:?}");
                assert_eq!(match_len(dispatch, &a, &a[..len / 2]), len / 2, "{dispatch:?}");
            }

            for i in 0..len {
                let mut b = a.clone();
                b[i] = b[i].wrapping_add(1);

                for dispatch in dispatches {
                    assert_eq!(match_len(dispatch, &a, &b), i, "len {len} {dispatch:?}");
                }
            }
        }
    }
}
