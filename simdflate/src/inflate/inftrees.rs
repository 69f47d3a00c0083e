//! Decoding tables for canonical Huffman codes.
//!
//! A table is indexed by the next `root` bits of input. Codes longer than `root` bits go through
//! a second-level table, linked from the root entry (`op` holds the sub-table index bits, `val` its
//! offset). Leaf entries use `op` as follows:
//!
//! - `0`: literal, `val` is the byte
//! - `16 + extra`: length or distance base `val`, followed by `extra` bits
//! - `32 + 64`: end of block
//! - `64`: invalid code

use crate::{Code, ENOUGH_DISTS, ENOUGH_LENS};

use super::MAX_BITS;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CodeType {
    Codes,
    Lens,
    Dists,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum InflateTable {
    /// The table was built; the value is the number of root bits.
    Success(usize),
    /// Over-subscribed or incomplete set of lengths.
    InvalidCode,
    /// The table does not fit in the space reserved for it.
    EnoughIsNotEnough,
}

const LBASE: [u16; 31] = [
    3, 4, 5, 6, 7, 8, 9, 10, 11, 13, 15, 17, 19, 23, 27, 31, 35, 43, 51, 59, 67, 83, 99, 115, 131,
    163, 195, 227, 258, 0, 0,
];

const LEXT: [u8; 31] = [
    16, 16, 16, 16, 16, 16, 16, 16, 17, 17, 17, 17, 18, 18, 18, 18, 19, 19, 19, 19, 20, 20, 20, 20,
    21, 21, 21, 21, 16, 77, 202,
];

const DBASE: [u16; 32] = [
    1, 2, 3, 4, 5, 7, 9, 13, 17, 25, 33, 49, 65, 97, 129, 193, 257, 385, 513, 769, 1025, 1537, 2049,
    3073, 4097, 6145, 8193, 12289, 16385, 24577, 0, 0,
];

const DEXT: [u8; 32] = [
    16, 16, 16, 16, 17, 17, 18, 18, 19, 19, 20, 20, 21, 21, 22, 22, 23, 23, 24, 24, 25, 25, 26, 26,
    27, 27, 28, 28, 29, 29, 64, 64,
];

/// Build the decoding table for the first `codes` entries of `lens` into `table`.
///
/// `root` is the preferred number of root bits; it is adjusted to the code lengths actually in
/// use. `work` must hold at least `codes` entries.
pub(crate) fn inflate_table(
    code_type: CodeType,
    lens: &[u16],
    codes: usize,
    table: &mut [Code],
    root: usize,
    work: &mut [u16],
) -> InflateTable {
    let max_bits = MAX_BITS as usize;

    // number of codes of each length
    let mut count = [0u16; MAX_BITS as usize + 1];
    for &len in &lens[..codes] {
        count[len as usize] += 1;
    }

    let mut max = max_bits;
    while max >= 1 && count[max] == 0 {
        max -= 1;
    }

    let mut root = Ord::min(root, max);

    if max == 0 {
        // no symbols at all; every lookup is an invalid code
        let here = Code {
            op: 64,
            bits: 1,
            val: 0,
        };
        table[0] = here;
        table[1] = here;

        return InflateTable::Success(1);
    }

    let mut min = 1;
    while min < max && count[min] == 0 {
        min += 1;
    }

    root = Ord::max(root, min);

    // over-subscribed or incomplete
    let mut left: i32 = 1;
    for &n in &count[1..] {
        left <<= 1;
        left -= n as i32;
        if left < 0 {
            return InflateTable::InvalidCode;
        }
    }

    // a single code of length one is the only incomplete set allowed
    if left > 0 && (code_type == CodeType::Codes || max != 1) {
        return InflateTable::InvalidCode;
    }

    // sort symbols by length, then by symbol
    let mut offs = [0u16; MAX_BITS as usize + 1];
    for len in 1..max_bits {
        offs[len + 1] = offs[len] + count[len];
    }

    for (sym, &len) in lens[..codes].iter().enumerate() {
        if len != 0 {
            work[offs[len as usize] as usize] = sym as u16;
            offs[len as usize] += 1;
        }
    }

    let (base, extra, match_): (&[u16], &[u8], usize) = match code_type {
        // code length symbols are their own values
        CodeType::Codes => (&[], &[], 20),
        CodeType::Lens => (&LBASE, &LEXT, 257),
        CodeType::Dists => (&DBASE, &DEXT, 0),
    };

    let mut used = 1usize << root;
    let mask = used - 1;

    let overflows = |used: usize| match code_type {
        CodeType::Lens => used > ENOUGH_LENS,
        CodeType::Dists => used > ENOUGH_DISTS,
        CodeType::Codes => false,
    };

    if overflows(used) {
        return InflateTable::EnoughIsNotEnough;
    }

    let mut huff = 0usize; // starting code, bit-reversed
    let mut sym = 0;
    let mut len = min;
    let mut next = 0; // start of the current (sub-)table
    let mut curr = root;
    let mut drop = 0;
    let mut low = usize::MAX;

    loop {
        let symbol = work[sym] as usize;

        let here = if symbol + 1 < match_ {
            Code {
                op: 0,
                bits: (len - drop) as u8,
                val: symbol as u16,
            }
        } else if symbol >= match_ {
            Code {
                op: extra[symbol - match_],
                bits: (len - drop) as u8,
                val: base[symbol - match_],
            }
        } else {
            // end of block
            Code {
                op: 32 + 64,
                bits: (len - drop) as u8,
                val: 0,
            }
        };

        // replicate for all indices that share the low `len - drop` bits
        let incr = 1 << (len - drop);
        let mut fill = 1 << curr;
        loop {
            fill -= incr;
            table[next + (huff >> drop) + fill] = here;
            if fill == 0 {
                break;
            }
        }

        // increment the bit-reversed code
        let mut incr = 1 << (len - 1);
        while huff & incr != 0 {
            incr >>= 1;
        }
        if incr != 0 {
            huff &= incr - 1;
            huff += incr;
        } else {
            huff = 0;
        }

        sym += 1;
        count[len] -= 1;
        if count[len] == 0 {
            if len == max {
                break;
            }
            len = lens[work[sym] as usize] as usize;
        }

        // start a new sub-table
        if len > root && (huff & mask) != low {
            if drop == 0 {
                drop = root;
            }

            next += 1 << curr;

            curr = len - drop;
            let mut left = 1i32 << curr;
            while curr + drop < max {
                left -= count[curr + drop] as i32;
                if left <= 0 {
                    break;
                }
                curr += 1;
                left <<= 1;
            }

            used += 1 << curr;
            if overflows(used) {
                return InflateTable::EnoughIsNotEnough;
            }

            low = huff & mask;
            table[low] = Code {
                op: curr as u8,
                bits: root as u8,
                val: next as u16,
            };
        }
    }

    // an incomplete code has one entry left to fill
    if huff != 0 {
        table[next + huff] = Code {
            op: 64,
            bits: (len - drop) as u8,
            val: 0,
        };
    }

    InflateTable::Success(root)
}

/// The tables for fixed-Huffman blocks: 9 root bits for literal/lengths, 5 for distances.
pub(crate) fn fixed_tables() -> ([Code; 512], [Code; 32]) {
    let mut lens = [0u16; 288];
    let mut work = [0u16; 288];

    lens[..144].fill(8);
    lens[144..256].fill(9);
    lens[256..280].fill(7);
    lens[280..].fill(8);

    let mut len_fix = [Code::default(); 512];
    let built = inflate_table(CodeType::Lens, &lens, 288, &mut len_fix, 9, &mut work);
    debug_assert_eq!(built, InflateTable::Success(9));

    lens[..32].fill(5);

    let mut dist_fix = [Code::default(); 32];
    let built = inflate_table(CodeType::Dists, &lens, 32, &mut dist_fix, 5, &mut work);
    debug_assert_eq!(built, InflateTable::Success(5));

    (len_fix, dist_fix)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn fixed_literal_codes() {
        let (len_fix, dist_fix) = fixed_tables();

        // 'a' (97) has the 8-bit code 0x30 + 97 = 0x91, read bit-reversed
        let code = (0x30u16 + 97).reverse_bits() >> 8;
        let here = len_fix[code as usize];
        assert_eq!(here, Code { op: 0, bits: 8, val: 97 });

        // end of block is the all-zero 7-bit code
        assert_eq!(len_fix[0], Code { op: 96, bits: 7, val: 0 });

        // distance code 4 (reversed 00100) is base 5 with one extra bit
        assert_eq!(dist_fix[0b00100], Code { op: 17, bits: 5, val: 5 });
        // distance codes 30 and 31 are invalid
        assert_eq!(dist_fix[0b01111].op, 64);
    }

    #[test]
    fn rejects_bad_length_sets() {
        let mut table = [Code::default(); ENOUGH_LENS];
        let mut work = [0u16; 288];

        // three codes of length one
        let lens = [1, 1, 1];
        assert_eq!(
            inflate_table(CodeType::Codes, &lens, 3, &mut table, 7, &mut work),
            InflateTable::InvalidCode
        );

        // incomplete: one code of length two
        let lens = [2, 0, 0];
        assert_eq!(
            inflate_table(CodeType::Lens, &lens, 3, &mut table, 10, &mut work),
            InflateTable::InvalidCode
        );

        // a single distance code of length one is allowed
        let lens = [1];
        assert_eq!(
            inflate_table(CodeType::Dists, &lens, 1, &mut table, 9, &mut work),
            InflateTable::Success(1)
        );
        assert_eq!(table[1].op, 64);
    }

    #[test]
    fn long_codes_use_sub_tables() {
        let mut table = [Code::default(); ENOUGH_LENS];
        let mut work = [0u16; 288];

        // lengths 1, 2, ..., 14, 15, 15: complete, with codes longer than the root
        let mut lens = [0u16; 16];
        for (i, len) in lens.iter_mut().enumerate() {
            *len = Ord::min(i as u16 + 1, 15);
        }

        let InflateTable::Success(root) =
            inflate_table(CodeType::Codes, &lens, 16, &mut table, 7, &mut work)
        else {
            panic!("complete code rejected");
        };
        assert_eq!(root, 7);

        // the all-ones prefix of 7 bits links to a sub-table
        let link = table[0x7f];
        assert!(link.op != 0 && link.op & 0xf0 == 0);
        assert_eq!(link.bits, 7);
    }
}
