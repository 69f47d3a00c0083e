//! Fixed tables of the deflate format, computed at compile time.

use crate::deflate::{Value, DIST_CODE_LEN, D_CODES, LENGTH_CODES, L_CODES, STD_MAX_MATCH, STD_MIN_MATCH};

/// extra bits for each length code
pub(crate) const EXTRA_LBITS: [u8; LENGTH_CODES] = [
    0, 0, 0, 0, 0, 0, 0, 0, 1, 1, 1, 1, 2, 2, 2, 2, 3, 3, 3, 3, 4, 4, 4, 4, 5, 5, 5, 5, 0,
];

/// extra bits for each distance code
pub(crate) const EXTRA_DBITS: [u8; D_CODES] = [
    0, 0, 0, 0, 1, 1, 2, 2, 3, 3, 4, 4, 5, 5, 6, 6, 7, 7, 8, 8, 9, 9, 10, 10, 11, 11, 12, 12, 13,
    13,
];

/// extra bits for each bit length code
pub(crate) const EXTRA_BLBITS: [u8; 19] = [0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 2, 3, 7];

/// The lengths of the bit length codes are sent in order of decreasing probability.
pub(crate) const BL_ORDER: [u8; 19] = [
    16, 17, 18, 0, 8, 7, 9, 6, 10, 5, 11, 4, 12, 3, 13, 2, 14, 1, 15,
];

pub(crate) const STATIC_LTREE: [Value; L_CODES + 2] = static_ltree();

pub(crate) const STATIC_DTREE: [Value; D_CODES] = {
    let mut tree = [Value::new(0, 0); D_CODES];

    let mut n = 0;
    while n < D_CODES {
        tree[n] = Value::new(reverse_bits(n as u16, 5), 5);
        n += 1;
    }

    tree
};

/// Distance codes. The first 256 values correspond to the distances 3 .. 258, the last 256
/// values correspond to the top 8 bits of the 15 bit distances.
pub(crate) const DIST_CODE: [u8; DIST_CODE_LEN] = {
    let mut dist_code = [0u8; DIST_CODE_LEN];

    let mut dist = 0;
    let mut code = 0;
    while code < 16 {
        let mut n = 0;
        while n < (1 << EXTRA_DBITS[code]) {
            dist_code[dist] = code as u8;
            dist += 1;
            n += 1;
        }
        code += 1;
    }

    // from now on, all distances are divided by 128
    dist >>= 7;
    while code < D_CODES {
        let mut n = 0;
        while n < (1 << (EXTRA_DBITS[code] - 7)) {
            dist_code[256 + dist] = code as u8;
            dist += 1;
            n += 1;
        }
        code += 1;
    }

    dist_code
};

/// length code for each normalized match length (0 == STD_MIN_MATCH)
pub(crate) const LENGTH_CODE: [u8; STD_MAX_MATCH - STD_MIN_MATCH + 1] = {
    let mut length_code = [0u8; STD_MAX_MATCH - STD_MIN_MATCH + 1];

    let mut length = 0;
    let mut code = 0;
    while code < LENGTH_CODES - 1 {
        let mut n = 0;
        while n < (1 << EXTRA_LBITS[code]) {
            length_code[length] = code as u8;
            length += 1;
            n += 1;
        }
        code += 1;
    }

    // length 258 gets its own code instead of the longest form of code 27
    length_code[length - 1] = code as u8;

    length_code
};

/// First normalized length for each code (0 = STD_MIN_MATCH)
pub(crate) const BASE_LENGTH: [u8; LENGTH_CODES] = {
    let mut base_length = [0u8; LENGTH_CODES];

    let mut length = 0;
    let mut code = 0;
    while code < LENGTH_CODES - 1 {
        base_length[code] = length as u8;
        length += 1 << EXTRA_LBITS[code];
        code += 1;
    }

    base_length
};

/// First normalized distance for each code (0 = distance of 1)
pub(crate) const BASE_DIST: [u16; D_CODES] = {
    let mut base_dist = [0u16; D_CODES];

    let mut dist = 0;
    let mut code = 0;
    while code < D_CODES {
        base_dist[code] = dist as u16;
        dist += 1 << EXTRA_DBITS[code];
        code += 1;
    }

    base_dist
};

const fn reverse_bits(code: u16, len: u8) -> u16 {
    code.reverse_bits() >> (16 - len)
}

const fn static_ltree() -> [Value; L_CODES + 2] {
    const fn len_of(n: usize) -> u16 {
        match n {
            0..=143 => 8,
            144..=255 => 9,
            256..=279 => 7,
            _ => 8,
        }
    }

    let mut bl_count = [0u16; 16];
    let mut n = 0;
    while n < L_CODES + 2 {
        bl_count[len_of(n) as usize] += 1;
        n += 1;
    }

    let mut next_code = [0u16; 16];
    let mut code = 0u16;
    let mut bits = 1;
    while bits < 16 {
        code = (code + bl_count[bits - 1]) << 1;
        next_code[bits] = code;
        bits += 1;
    }

    let mut tree = [Value::new(0, 0); L_CODES + 2];
    let mut n = 0;
    while n < L_CODES + 2 {
        let len = len_of(n);
        tree[n] = Value::new(reverse_bits(next_code[len as usize], len as u8), len);
        next_code[len as usize] += 1;
        n += 1;
    }

    tree
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn static_trees() {
        assert_eq!(STATIC_LTREE[0], Value::new(12, 8));
        assert_eq!(STATIC_LTREE[1], Value::new(140, 8));
        assert_eq!(STATIC_LTREE[144], Value::new(19, 9));
        assert_eq!(STATIC_LTREE[256], Value::new(0, 7));
        assert_eq!(STATIC_LTREE[280], Value::new(3, 8));

        assert_eq!(STATIC_DTREE[0], Value::new(0, 5));
        assert_eq!(STATIC_DTREE[1], Value::new(16, 5));
        assert_eq!(STATIC_DTREE[2], Value::new(8, 5));
    }

    #[test]
    fn code_tables() {
        assert_eq!(DIST_CODE[..5], [0, 1, 2, 3, 4]);
        assert_eq!(DIST_CODE[255], 15);
        assert_eq!(DIST_CODE[256], 0);
        assert_eq!(DIST_CODE[DIST_CODE_LEN - 1], 29);

        assert_eq!(LENGTH_CODE[0], 0);
        assert_eq!(LENGTH_CODE[254], 27);
        assert_eq!(LENGTH_CODE[255], 28);

        assert_eq!(BASE_LENGTH[8], 8);
        assert_eq!(BASE_LENGTH[27], 224);
        assert_eq!(BASE_LENGTH[28], 0);

        assert_eq!(BASE_DIST[4], 4);
        assert_eq!(BASE_DIST[29], 24576);
    }
}
