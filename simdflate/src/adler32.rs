use crate::cpu_features::Dispatch;

#[cfg(target_arch = "x86_64")]
mod avx2;
mod generic;
mod lanes;

const BASE: u32 = 65521; /* largest prime smaller than 65536 */
const NMAX: u32 = 5552;

/// Inputs shorter than this always take the scalar path.
pub(crate) const VECTOR_THRESHOLD: usize = 64;

/// Adler-32 of `data`, continuing from `start_checksum` (1 for a fresh checksum).
pub fn adler32(start_checksum: u32, data: &[u8]) -> u32 {
    adler32_with(Dispatch::detect(), start_checksum, data)
}

pub fn adler32_with(dispatch: Dispatch, start_checksum: u32, data: &[u8]) -> u32 {
    if data.len() >= VECTOR_THRESHOLD && dispatch.lanes() {
        #[cfg(target_arch = "x86_64")]
        if dispatch.avx2() {
            // SAFETY: avx2 support was established by the dispatch
            return unsafe { avx2::adler32_avx2(start_checksum, data) };
        }

        return lanes::adler32_lanes(start_checksum, data);
    }

    generic::adler32_rust(start_checksum, data)
}

/// Adler-32 of the concatenation, given the checksums of both parts and the length of the second.
pub fn adler32_combine(adler1: u32, adler2: u32, len2: u64) -> u32 {
    let rem = (len2 % BASE as u64) as u32;

    let mut sum1 = adler1 & 0xffff;
    let mut sum2 = (rem * sum1) % BASE;

    sum1 += (adler2 & 0xffff) + BASE - 1;
    sum2 += ((adler1 >> 16) & 0xffff) + ((adler2 >> 16) & 0xffff) + BASE - rem;

    if sum1 >= BASE {
        sum1 -= BASE;
    }
    if sum1 >= BASE {
        sum1 -= BASE;
    }
    if sum2 >= (BASE << 1) {
        sum2 -= BASE << 1;
    }
    if sum2 >= BASE {
        sum2 -= BASE;
    }

    sum1 | (sum2 << 16)
}

// inefficient but correct, useful for testing
#[cfg(test)]
fn naive_adler32(start_checksum: u32, data: &[u8]) -> u32 {
    let mut a = start_checksum & 0xFFFF;
    let mut b = (start_checksum >> 16) & 0xFFFF;

    for &byte in data {
        a = (a + byte as u32) % BASE;
        b = (b + a) % BASE;
    }

    (b << 16) | a
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn naive_is_fancy_small_inputs() {
        for i in 0..128 {
            let v = (0u8..i).collect::<Vec<_>>();
            assert_eq!(naive_adler32(1, &v), generic::adler32_rust(1, &v));
            assert_eq!(naive_adler32(1, &v), adler32(1, &v));
        }
    }

    #[test]
    fn known_value() {
        assert_eq!(adler32(1, b"Wikipedia"), 0x11E60398);
        assert_eq!(adler32(1, b""), 1);
    }

    #[test]
    fn all_ones_near_nmax() {
        // the worst case for the deferred modulo
        let v = vec![0xff; 3 * NMAX as usize + 17];
        for dispatch in [Dispatch::Scalar, Dispatch::detect()] {
            assert_eq!(adler32_with(dispatch, 1, &v), naive_adler32(1, &v));
            assert_eq!(
                adler32_with(dispatch, 0xfff0_fff0, &v),
                naive_adler32(0xfff0_fff0, &v)
            );
        }
    }

    #[test]
    fn combine_matches_concatenation() {
        let a: Vec<u8> = (0..1000u32).map(|x| (x * 7) as u8).collect();
        let b: Vec<u8> = (0..3000u32).map(|x| (x * 13) as u8).collect();

        let whole = adler32(1, &[a.as_slice(), b.as_slice()].concat());
        let combined = adler32_combine(adler32(1, &a), adler32(1, &b), b.len() as u64);

        assert_eq!(whole, combined);
    }

    quickcheck::quickcheck! {
        fn vectorized_is_scalar(v: Vec<u8>, start: u32) -> bool {
            // keep the start a valid checksum
            let start = (start % BASE) | (((start >> 16) % BASE) << 16);
            adler32_with(Dispatch::detect(), start, &v) == adler32_with(Dispatch::Scalar, start, &v)
        }

        fn streaming(a: Vec<u8>, b: Vec<u8>) -> bool {
            adler32(adler32(1, &a), &b) == adler32(1, &[a, b].concat())
        }
    }
}
