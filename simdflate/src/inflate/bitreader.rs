use crate::ReturnCode;

/// Reads the input of one call least-significant bit first.
///
/// The bit buffer outlives the call: [`BitReader::into_parts`] hands back the bits that were
/// pulled from the input but not consumed yet, and [`BitReader::resume`] continues with them.
#[derive(Debug)]
pub(crate) struct BitReader<'a> {
    input: &'a [u8],
    pos: usize,
    bit_buffer: u64,
    bits_used: u8,
}

impl<'a> BitReader<'a> {
    #[cfg(test)]
    pub fn new(input: &'a [u8]) -> Self {
        Self::resume(input, 0, 0)
    }

    pub fn resume(input: &'a [u8], bit_buffer: u64, bits_used: u8) -> Self {
        debug_assert!(bits_used < 64);

        Self {
            input,
            pos: 0,
            bit_buffer: bit_buffer & low_bits(bits_used),
            bits_used,
        }
    }

    pub fn into_parts(self) -> (u64, u8) {
        (self.bit_buffer, self.bits_used)
    }

    /// Number of input bytes pulled into the bit buffer or skipped.
    #[inline(always)]
    pub fn consumed(&self) -> usize {
        self.pos
    }

    #[inline(always)]
    pub fn bytes_remaining(&self) -> usize {
        self.input.len() - self.pos
    }

    #[inline(always)]
    pub fn as_slice(&self) -> &'a [u8] {
        &self.input[self.pos..]
    }

    /// Skip `n` bytes of input. Only valid when the bit buffer is empty.
    #[inline(always)]
    pub fn advance(&mut self, n: usize) {
        debug_assert_eq!(self.bits_used, 0);
        self.pos += n;
    }

    #[inline(always)]
    pub fn hold(&self) -> u64 {
        self.bit_buffer
    }

    #[inline(always)]
    pub fn bits_in_buffer(&self) -> u8 {
        self.bits_used
    }

    #[inline(always)]
    pub fn init_bits(&mut self) {
        self.bit_buffer = 0;
        self.bits_used = 0;
    }

    /// The lowest `n` bits of the buffer. Bits that were not pulled yet read as zero.
    #[inline(always)]
    pub fn bits(&self, n: usize) -> u64 {
        debug_assert!(n < 64);
        self.bit_buffer & low_bits(n as u8)
    }

    #[inline(always)]
    pub fn drop_bits(&mut self, n: u8) {
        debug_assert!(n <= self.bits_used);
        self.bit_buffer >>= n;
        self.bits_used -= n;
    }

    /// Drop the bits up to the next byte boundary of the input.
    #[inline(always)]
    pub fn next_byte_boundary(&mut self) {
        self.drop_bits(self.bits_used & 7);
    }

    /// Pull one more byte into the buffer. Fails with `Ok` (come back with more input) when the
    /// input is exhausted.
    #[inline(always)]
    pub fn pull_byte(&mut self) -> Result<(), ReturnCode> {
        match self.input.get(self.pos) {
            None => Err(ReturnCode::Ok),
            Some(&byte) => {
                self.bit_buffer |= (byte as u64) << self.bits_used;
                self.bits_used += 8;
                self.pos += 1;

                Ok(())
            }
        }
    }

    /// Make sure there are at least `n` bits in the buffer.
    #[inline(always)]
    pub fn need_bits(&mut self, n: usize) -> Result<(), ReturnCode> {
        while (self.bits_used as usize) < n {
            self.pull_byte()?;
        }

        Ok(())
    }

    /// Top the buffer up to at least 56 bits, or with whatever input is left.
    #[inline(always)]
    pub fn refill(&mut self) {
        match self.input[self.pos..].first_chunk::<8>() {
            Some(chunk) if self.bits_used < 56 => {
                let increment = (63 - self.bits_used) >> 3;
                let read = u64::from_le_bytes(*chunk) & low_bits(increment * 8);

                self.bit_buffer |= read << self.bits_used;
                self.pos += increment as usize;
                self.bits_used |= 56;
            }
            _ => {
                while self.bits_used < 56 && self.pull_byte().is_ok() {}
            }
        }
    }

    /// Give back whole bytes that were pulled from this call's input but not consumed.
    pub fn return_unused_bytes(&mut self) {
        let bytes = Ord::min((self.bits_used >> 3) as usize, self.pos);

        self.pos -= bytes;
        self.bits_used -= (bytes * 8) as u8;
        self.bit_buffer &= low_bits(self.bits_used);
    }
}

#[inline(always)]
const fn low_bits(n: u8) -> u64 {
    match 1u64.checked_shl(n as u32) {
        Some(v) => v - 1,
        None => u64::MAX,
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn reads_lsb_first() {
        let mut reader = BitReader::new(&[0b1010_1100, 0xff]);

        reader.need_bits(3).unwrap();
        assert_eq!(reader.bits(3), 0b100);
        reader.drop_bits(3);

        reader.need_bits(9).unwrap();
        assert_eq!(reader.bits(9), 0b1_1111_0101);
        assert_eq!(reader.consumed(), 2);

        assert_eq!(reader.need_bits(24), Err(ReturnCode::Ok));
    }

    #[test]
    fn refill_and_return() {
        let input: Vec<u8> = (0..20).collect();
        let mut reader = BitReader::new(&input);

        reader.need_bits(3).unwrap();
        reader.drop_bits(3);
        reader.refill();
        assert!(reader.bits_in_buffer() >= 56);

        // 3 + 13 bits is exactly two bytes
        reader.drop_bits(13);
        reader.return_unused_bytes();
        assert_eq!(reader.bits_in_buffer(), 0);
        assert_eq!(reader.hold(), 0);
        assert_eq!(reader.consumed(), 2);

        reader.need_bits(8).unwrap();
        assert_eq!(reader.bits(8), 2);
    }

    #[test]
    fn refill_near_the_end() {
        let mut reader = BitReader::new(&[1, 2, 3]);
        reader.refill();
        assert_eq!(reader.bits_in_buffer(), 24);
        assert_eq!(reader.bits(24), 0x03_02_01);
        assert_eq!(reader.bytes_remaining(), 0);
    }

    #[test]
    fn resume_keeps_pending_bits() {
        let mut reader = BitReader::new(&[0xAB]);
        reader.need_bits(8).unwrap();
        reader.drop_bits(4);

        let (hold, bits) = reader.into_parts();
        let mut reader = BitReader::resume(&[0xCD], hold, bits);
        reader.need_bits(12).unwrap();
        assert_eq!(reader.bits(12), 0xCDA);
        assert_eq!(reader.consumed(), 1);
    }
}
