use crate::Dispatch;

/// Rebase the hash head and chain tables after the window moved down by `w_size` bytes.
/// Entries that fall out of the window become 0.
pub fn slide_hash(state: &mut crate::deflate::State) {
    let wsize = state.w_size as u16;
    let dispatch = state.dispatch;

    slide_hash_chain(dispatch, &mut state.head, wsize);
    slide_hash_chain(dispatch, &mut state.prev, wsize);
}

fn slide_hash_chain(dispatch: Dispatch, table: &mut [u16], wsize: u16) {
    #[cfg(target_arch = "x86_64")]
    if dispatch.avx2() {
        // SAFETY: avx2 was detected.
        return unsafe { avx2::slide_hash_chain(table, wsize) };
    }

    #[cfg(target_arch = "x86_64")]
    if dispatch.sse2() {
        // SAFETY: sse2 was detected.
        return unsafe { sse2::slide_hash_chain(table, wsize) };
    }

    let _ = dispatch;
    rust::slide_hash_chain(table, wsize);
}

mod rust {
    pub fn slide_hash_chain(table: &mut [u16], wsize: u16) {
        for m in table.iter_mut() {
            *m = m.saturating_sub(wsize);
        }
    }
}

#[cfg(target_arch = "x86_64")]
mod sse2 {
    use core::arch::x86_64::{
        __m128i, _mm_loadu_si128, _mm_set1_epi16, _mm_storeu_si128, _mm_subs_epu16,
    };

    #[target_feature(enable = "sse2")]
    pub unsafe fn slide_hash_chain(table: &mut [u16], wsize: u16) {
        let xmm_wsize = _mm_set1_epi16(wsize as i16);

        let mut chunks = table.chunks_exact_mut(8);
        for chunk in &mut chunks {
            let chunk = chunk.as_mut_ptr().cast::<__m128i>();

            let value = _mm_loadu_si128(chunk);
            _mm_storeu_si128(chunk, _mm_subs_epu16(value, xmm_wsize));
        }

        super::rust::slide_hash_chain(chunks.into_remainder(), wsize);
    }
}

#[cfg(target_arch = "x86_64")]
mod avx2 {
    use core::arch::x86_64::{
        __m256i, _mm256_loadu_si256, _mm256_set1_epi16, _mm256_storeu_si256, _mm256_subs_epu16,
    };

    #[target_feature(enable = "avx2")]
    pub unsafe fn slide_hash_chain(table: &mut [u16], wsize: u16) {
        let ymm_wsize = _mm256_set1_epi16(wsize as i16);

        let mut chunks = table.chunks_exact_mut(16);
        for chunk in &mut chunks {
            let chunk = chunk.as_mut_ptr().cast::<__m256i>();

            let value = _mm256_loadu_si256(chunk);
            _mm256_storeu_si256(chunk, _mm256_subs_epu16(value, ymm_wsize));
        }

        super::rust::slide_hash_chain(chunks.into_remainder(), wsize);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WSIZE: u16 = 32768;

    const INPUT: [u16; 64] = [
        0, 0, 28790, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 43884, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0,
        0, 0, 0, 0, 64412, 0, 0, 0, 0, 0, 21043, 0, 0, 0, 0, 0, 23707, 0, 0, 0, 0, 0, 0, 0, 0, 0,
        0, 0, 0, 0, 0, 0, 64026, 0, 0, 20182,
    ];

    const OUTPUT: [u16; 64] = [
        0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 11116, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0,
        0, 0, 0, 31644, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0,
        0, 0, 31258, 0, 0, 0,
    ];

    #[test]
    fn test_slide_hash_rust() {
        let mut input = INPUT;
        rust::slide_hash_chain(&mut input, WSIZE);
        assert_eq!(input, OUTPUT);
    }

    #[test]
    fn test_slide_hash_dispatch() {
        for dispatch in [Dispatch::Scalar, Dispatch::detect()] {
            let mut input = INPUT;
            slide_hash_chain(dispatch, &mut input, WSIZE);
            assert_eq!(input, OUTPUT);
        }
    }

    #[test]
    #[cfg(target_arch = "x86_64")]
    fn test_slide_hash_sse2_remainder() {
        let dispatch = Dispatch::Vectorized(crate::CpuFeatures::detect().without_avx2());

        // not a multiple of the vector width
        let mut input = INPUT[..61].to_vec();
        slide_hash_chain(dispatch, &mut input, WSIZE);
        assert_eq!(input, OUTPUT[..61]);
    }
}
