use crate::deflate::{State, HASH_SIZE};
use crate::Dispatch;

const HASH_CALC_MASK: u32 = (HASH_SIZE - 1) as u32;

/// Avalanche mix of a 32-bit value (multiply, xor and shift).
#[inline(always)]
pub const fn mix(mut h: u32) -> u32 {
    h ^= h >> 16;
    h = h.wrapping_mul(0x85eb_ca6b);
    h ^= h >> 13;
    h = h.wrapping_mul(0xc2b2_ae35);
    h ^= h >> 16;
    h
}

#[inline(always)]
fn read_u32(window: &[u8], pos: usize) -> u32 {
    let bytes = window[pos..][..4].try_into().unwrap_or([0; 4]);
    u32::from_be_bytes(bytes)
}

/// Hash of the 4 bytes starting at `pos`.
#[inline(always)]
pub fn hash(window: &[u8], pos: usize) -> u32 {
    mix(read_u32(window, pos)) & HASH_CALC_MASK
}

pub trait HashCalc {
    /// Hashes of the four consecutive positions `pos..pos + 4`.
    fn hash4(window: &[u8], pos: usize) -> [u32; 4];

    fn quick_insert_string(state: &mut State, string: usize) -> u16 {
        let hm = hash(state.window.filled(), string) as usize;

        let head = state.head[hm];
        if head != string as u16 {
            state.prev[string & state.w_mask] = head;
            state.head[hm] = string as u16;
        }

        head
    }

    fn insert_string(state: &mut State, string: usize, count: usize) {
        let mut offset = 0;

        while offset < count {
            let hashes = Self::hash4(state.window.filled(), string + offset);

            // the chains must see the positions in order
            for (i, h) in hashes.into_iter().take(count - offset).enumerate() {
                let idx = (string + offset + i) as u16;
                let hm = h as usize;

                let head = state.head[hm];
                if head != idx {
                    state.prev[idx as usize & state.w_mask] = head;
                    state.head[hm] = idx;
                }
            }

            offset += 4;
        }
    }
}

pub struct StandardHashCalc;

impl HashCalc for StandardHashCalc {
    fn hash4(window: &[u8], pos: usize) -> [u32; 4] {
        core::array::from_fn(|i| hash(window, pos + i))
    }
}

/// Computes four hashes per step with 128-bit lanes.
pub struct Sse41HashCalc;

impl Sse41HashCalc {
    pub fn is_supported(dispatch: Dispatch) -> bool {
        cfg!(target_arch = "x86_64") && dispatch.sse41()
    }
}

impl HashCalc for Sse41HashCalc {
    #[cfg(target_arch = "x86_64")]
    fn hash4(window: &[u8], pos: usize) -> [u32; 4] {
        let bytes = window[pos..][..8].try_into().unwrap_or([0; 8]);
        let v = u64::from_be_bytes(bytes);

        // lane k holds the big endian value of bytes pos + k .. pos + k + 4
        let words: [u32; 4] = core::array::from_fn(|k| (v >> (32 - 8 * k)) as u32);

        // SAFETY: only selected when sse4.1 was detected.
        unsafe { sse41::mix4(words) }
    }

    #[cfg(not(target_arch = "x86_64"))]
    fn hash4(window: &[u8], pos: usize) -> [u32; 4] {
        StandardHashCalc::hash4(window, pos)
    }
}

#[cfg(target_arch = "x86_64")]
mod sse41 {
    use core::arch::x86_64::*;

    use super::HASH_CALC_MASK;

    #[target_feature(enable = "sse4.1")]
    pub unsafe fn mix4(words: [u32; 4]) -> [u32; 4] {
        let mut h = _mm_set_epi32(
            words[3] as i32,
            words[2] as i32,
            words[1] as i32,
            words[0] as i32,
        );

        h = _mm_xor_si128(h, _mm_srli_epi32::<16>(h));
        h = _mm_mullo_epi32(h, _mm_set1_epi32(0x85eb_ca6bu32 as i32));
        h = _mm_xor_si128(h, _mm_srli_epi32::<13>(h));
        h = _mm_mullo_epi32(h, _mm_set1_epi32(0xc2b2_ae35u32 as i32));
        h = _mm_xor_si128(h, _mm_srli_epi32::<16>(h));
        h = _mm_and_si128(h, _mm_set1_epi32(HASH_CALC_MASK as i32));

        let mut out = [0u32; 4];
        _mm_storeu_si128(out.as_mut_ptr().cast(), h);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mix_values() {
        assert_eq!(mix(0), 0);
        assert_eq!(mix(1), 0x514e_28b7);
        assert_ne!(mix(0x6162_6364), mix(0x6162_6365));
    }

    #[test]
    fn hash_reads_big_endian() {
        let window = b"abcdefgh";
        assert_eq!(hash(window, 0), mix(0x6162_6364) & HASH_CALC_MASK);
        assert_eq!(hash(window, 1), mix(0x6263_6465) & HASH_CALC_MASK);
    }

    #[test]
    fn hash4_matches_scalar() {
        let window: Vec<u8> = (0..64u32).map(|i| (i * 37 % 251) as u8).collect();

        for pos in 0..window.len() - 8 {
            let expected = StandardHashCalc::hash4(&window, pos);
            assert_eq!(expected[1], hash(&window, pos + 1));

            if Sse41HashCalc::is_supported(Dispatch::detect()) {
                assert_eq!(Sse41HashCalc::hash4(&window, pos), expected, "pos {pos}");
            }
        }
    }
}
