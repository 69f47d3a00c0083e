use crate::Error;

/// Symbols of the current block, 3 bytes each: distance (little endian, 0 for a literal) and the
/// literal byte or `match length - STD_MIN_MATCH`.
pub(crate) struct SymBuf {
    buf: Vec<u8>,
    sym_end: usize,
}

impl SymBuf {
    pub(crate) fn new(lit_bufsize: usize) -> Result<Self, Error> {
        let len = lit_bufsize * 3;
        let mut buf = Vec::new();
        buf.try_reserve_exact(len).map_err(|_| Error::alloc(len))?;

        Ok(Self {
            buf,
            sym_end: len - 3,
        })
    }

    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = (u16, u8)> + '_ {
        self.buf
            .chunks_exact(3)
            .map(|chunk| (u16::from_le_bytes([chunk[0], chunk[1]]), chunk[2]))
    }

    #[inline]
    pub fn should_flush_block(&self) -> bool {
        self.buf.len() >= self.sym_end
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Number of symbols.
    #[inline]
    pub fn len(&self) -> usize {
        self.buf.len() / 3
    }

    #[inline]
    pub fn clear(&mut self) {
        self.buf.clear();
    }

    #[inline(always)]
    pub fn push_lit(&mut self, byte: u8) {
        self.buf.extend_from_slice(&[0, 0, byte]);
    }

    #[inline(always)]
    pub fn push_dist(&mut self, dist: u16, len: u8) {
        let [dist1, dist2] = dist.to_le_bytes();
        self.buf.extend_from_slice(&[dist1, dist2, len]);
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn push_and_iterate() {
        let mut buf = SymBuf::new(4).unwrap();
        assert!(buf.is_empty());

        buf.push_lit(b'a');
        buf.push_dist(300, 7);
        assert_eq!(buf.len(), 2);
        assert!(!buf.should_flush_block());

        buf.push_lit(b'b');
        assert!(buf.should_flush_block());

        let symbols: Vec<_> = buf.iter().collect();
        assert_eq!(symbols, [(0, b'a'), (300, 7), (0, b'b')]);

        buf.clear();
        assert!(buf.is_empty());
    }
}
