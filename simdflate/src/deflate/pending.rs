use crate::Error;

/// Output that has been produced but not yet copied to the caller's buffer.
///
/// `capacity` is the nominal size; the buffer grows past it when a single block is larger, so a
/// worst-case block never overflows.
pub struct Pending {
    buf: Vec<u8>,
    /// next pending byte to output to the stream
    out: usize,
    capacity: usize,
}

impl Pending {
    pub(crate) fn new(capacity: usize) -> Result<Self, Error> {
        let mut buf = Vec::new();
        buf.try_reserve_exact(capacity)
            .map_err(|_| Error::alloc(capacity))?;

        Ok(Self {
            buf,
            out: 0,
            capacity,
        })
    }

    pub fn reset_keep(&mut self) {
        self.buf.clear();
        self.out = 0;
    }

    pub fn pending(&self) -> &[u8] {
        &self.buf[self.out..]
    }

    pub fn is_empty(&self) -> bool {
        self.out == self.buf.len()
    }

    /// Nominal size of the pending buffer.
    pub(crate) fn capacity(&self) -> usize {
        self.capacity
    }

    /// Mark a number of pending bytes as no longer pending
    #[inline(always)]
    #[track_caller]
    pub fn advance(&mut self, number_of_bytes: usize) {
        debug_assert!(self.pending().len() >= number_of_bytes);

        self.out += number_of_bytes;

        if self.out == self.buf.len() {
            self.buf.clear();
            self.out = 0;
        }
    }

    #[inline(always)]
    #[track_caller]
    pub fn rewind(&mut self, n: usize) {
        assert!(n <= self.pending().len(), "rewinding past the start");

        self.buf.truncate(self.buf.len() - n);

        if self.out == self.buf.len() {
            self.buf.clear();
            self.out = 0;
        }
    }

    #[inline(always)]
    pub fn extend(&mut self, buf: &[u8]) {
        self.buf.extend_from_slice(buf);
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn advance_and_rewind() {
        let mut pending = Pending::new(8).unwrap();
        assert!(pending.is_empty());

        pending.extend(b"hello world");
        assert_eq!(pending.capacity(), 8);
        assert_eq!(pending.pending(), b"hello world");

        pending.advance(6);
        assert_eq!(pending.pending(), b"world");

        pending.rewind(2);
        assert_eq!(pending.pending(), b"wor");

        pending.advance(3);
        assert!(pending.is_empty());
        assert_eq!(pending.pending(), b"");
    }
}
