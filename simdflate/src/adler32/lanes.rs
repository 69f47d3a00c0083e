//! Portable vector path: 64-byte super-blocks split into four 16-byte lanes.
//!
//! For a block `d[0..64]` the sums advance as
//!
//! ```text
//! a' = a + sum(d)
//! b' = b + 64 * a + sum_j ((48 - 16j) * S_j + sum_k (16 - k) * d[16j + k])
//! ```
//!
//! where `S_j` is the byte sum of lane `j`. The per-lane loops have no cross-lane dependency, so
//! they compile to packed adds and multiplies.

use super::{generic::adler32_rust, BASE, NMAX};

const BLOCK: usize = 64;
const LANES: usize = 4;
const LANE_WIDTH: usize = BLOCK / LANES;

/// Blocks that fit between two modulo reductions without overflowing `b`.
const BLOCKS_PER_REDUCTION: usize = NMAX as usize / BLOCK;

pub fn adler32_lanes(adler: u32, data: &[u8]) -> u32 {
    let mut a = adler & 0xffff;
    let mut b = (adler >> 16) & 0xffff;

    let mut blocks = data.chunks_exact(BLOCK);
    let mut pending = 0;

    for block in blocks.by_ref() {
        let (sums, weighted) = lane_sums(block);

        b += BLOCK as u32 * a;
        for lane in 0..LANES {
            b += (((LANES - 1 - lane) * LANE_WIDTH) as u32) * sums[lane] + weighted[lane];
            a += sums[lane];
        }

        pending += 1;
        if pending == BLOCKS_PER_REDUCTION {
            a %= BASE;
            b %= BASE;
            pending = 0;
        }
    }

    a %= BASE;
    b %= BASE;

    adler32_rust(a | (b << 16), blocks.remainder())
}

#[inline(always)]
fn lane_sums(block: &[u8]) -> ([u32; LANES], [u32; LANES]) {
    let mut sums = [0u32; LANES];
    let mut weighted = [0u32; LANES];

    for (lane, bytes) in block.chunks_exact(LANE_WIDTH).enumerate() {
        for (k, &byte) in bytes.iter().enumerate() {
            sums[lane] += byte as u32;
            weighted[lane] += (LANE_WIDTH - k) as u32 * byte as u32;
        }
    }

    (sums, weighted)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::adler32::naive_adler32;

    #[test]
    fn lanes_match_naive() {
        let vec: Vec<_> = (0..3 * NMAX as usize).map(|x| (x * 31 + 7) as u8).collect();

        for len in [0, 1, 63, 64, 65, 127, 128, 1000, NMAX as usize, vec.len()] {
            assert_eq!(
                adler32_lanes(1, &vec[..len]),
                naive_adler32(1, &vec[..len]),
                "len = {len}"
            );
        }
    }

    #[test]
    fn lanes_worst_case() {
        let vec = vec![0xffu8; 2 * NMAX as usize + 64];
        let start = ((BASE - 1) << 16) | (BASE - 1);
        assert_eq!(adler32_lanes(start, &vec), naive_adler32(start, &vec));
    }
}
