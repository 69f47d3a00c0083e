//! LSB-first bit packing into the pending output.

use crate::Error;

use super::pending::Pending;

pub(crate) struct BitWriter {
    pub(crate) pending: Pending,
    bit_buffer: u64,
    bits_used: u8,
}

impl BitWriter {
    pub(crate) const BIT_BUF_SIZE: u8 = 64;

    pub(crate) fn new(pending_capacity: usize) -> Result<Self, Error> {
        Ok(Self {
            pending: Pending::new(pending_capacity)?,
            bit_buffer: 0,
            bits_used: 0,
        })
    }

    pub(crate) fn reset(&mut self) {
        self.pending.reset_keep();
        self.bit_buffer = 0;
        self.bits_used = 0;
    }

    /// Number of bits waiting in the bit buffer.
    pub(crate) fn bits_used(&self) -> u8 {
        self.bits_used
    }

    /// Append the low `len` bits of `val`.
    #[inline(always)]
    pub(crate) fn send_bits(&mut self, val: u64, len: u8) {
        debug_assert!(len <= 64);
        debug_assert!(self.bits_used <= 64);
        debug_assert!(len == 64 || val >> len == 0, "value wider than its length");

        let total_bits = len + self.bits_used;

        if total_bits < Self::BIT_BUF_SIZE {
            self.bit_buffer |= val << self.bits_used;
            self.bits_used = total_bits;
        } else if self.bits_used == Self::BIT_BUF_SIZE {
            self.pending.extend(&self.bit_buffer.to_le_bytes());
            self.bit_buffer = val;
            self.bits_used = len;
        } else {
            self.bit_buffer |= val << self.bits_used;
            self.pending.extend(&self.bit_buffer.to_le_bytes());
            self.bit_buffer = val
                .checked_shr((Self::BIT_BUF_SIZE - self.bits_used) as u32)
                .unwrap_or(0);
            self.bits_used = total_bits - Self::BIT_BUF_SIZE;
        }
    }

    /// Append `codes[i]` with bit length `lengths[i]`, in order.
    ///
    /// Up to four codes are combined into one 64-bit word before they reach the bit buffer.
    /// The accumulation itself stays serial, the grouping only saves buffer round trips.
    pub(crate) fn pack(&mut self, codes: &[u16], lengths: &[u8]) {
        debug_assert_eq!(codes.len(), lengths.len());

        let mut pairs = codes.chunks_exact(4).zip(lengths.chunks_exact(4));
        for (code4, len4) in &mut pairs {
            let mut word = 0u64;
            let mut bits = 0u8;

            for (&code, &len) in code4.iter().zip(len4) {
                word |= (code as u64) << bits;
                bits += len;
            }

            self.send_bits(word, bits);
        }

        let tail = codes.len() - codes.len() % 4;
        for (&code, &len) in codes[tail..].iter().zip(&lengths[tail..]) {
            self.send_bits(code as u64, len);
        }
    }

    /// Move all complete bytes from the bit buffer to the pending output.
    pub(crate) fn flush(&mut self) {
        debug_assert!(self.bits_used <= 64);
        let removed = self.bits_used.saturating_sub(7).next_multiple_of(8);
        let keep_bytes = self.bits_used / 8;

        let src = &self.bit_buffer.to_le_bytes();
        self.pending.extend(&src[..keep_bytes as usize]);

        self.bits_used -= removed;
        self.bit_buffer = self.bit_buffer.checked_shr(removed as u32).unwrap_or(0);
    }

    /// Flush everything, padding the last partial byte with zero bits.
    pub(crate) fn finish(&mut self) {
        debug_assert!(self.bits_used <= 64);
        let keep_bytes = self.bits_used.div_ceil(8);
        let src = &self.bit_buffer.to_le_bytes();
        self.pending.extend(&src[..keep_bytes as usize]);

        self.bits_used = 0;
        self.bit_buffer = 0;
    }
}
