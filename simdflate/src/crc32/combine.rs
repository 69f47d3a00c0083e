const POLY: u32 = 0xedb88320;

/// `X2N_TABLE[k]` is x^(2^k) modulo the crc polynomial.
const X2N_TABLE: [u32; 32] = {
    let mut table = [0; 32];
    let mut p = 1 << 30; // x^1
    table[0] = p;

    let mut n = 1;
    while n < 32 {
        p = multmodp(p, p);
        table[n] = p;
        n += 1;
    }

    table
};

/// CRC-32 of the concatenation, given the checksums of both parts and the length of the second.
pub fn crc32_combine(crc1: u32, crc2: u32, len2: u64) -> u32 {
    multmodp(x2nmodp(len2, 3), crc1) ^ crc2
}

/// Return a(x) multiplied by b(x) modulo p(x). Both are in reflected bit order.
const fn multmodp(a: u32, mut b: u32) -> u32 {
    let mut m = 1 << 31;
    let mut p = 0;

    loop {
        if (a & m) != 0 {
            p ^= b;
            if (a & (m - 1)) == 0 {
                break;
            }
        }
        m >>= 1;
        b = if (b & 1) != 0 { (b >> 1) ^ POLY } else { b >> 1 };
    }

    p
}

/// Return x^(n * 2^k) modulo p(x).
const fn x2nmodp(mut n: u64, mut k: u32) -> u32 {
    let mut p: u32 = 1 << 31; /* x^0 == 1 */

    while n > 0 {
        if (n & 1) != 0 {
            p = multmodp(X2N_TABLE[k as usize & 31], p);
        }
        n >>= 1;
        k += 1;
    }

    p
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::crc32::crc32;

    #[test]
    fn combine_empty_second_part() {
        let crc1 = crc32(0, b"hello");
        assert_eq!(crc32_combine(crc1, 0, 0), crc1);
    }

    quickcheck::quickcheck! {
        fn combine_is_concatenation(a: Vec<u8>, b: Vec<u8>) -> bool {
            let expected = crc32(0, &[a.as_slice(), b.as_slice()].concat());
            crc32_combine(crc32(0, &a), crc32(0, &b), b.len() as u64) == expected
        }
    }
}
