use crate::Error;

/// Extra zeroed bytes past `2 * w_size`, so vector loads near the end of the lookahead stay in
/// bounds.
const WINDOW_PADDING: usize = 64;

#[derive(Debug)]
pub struct Window {
    // the full window allocation, zero-initialized
    buf: Box<[u8]>,

    // same as 2 * (1 << window_bits)
    capacity: usize,
}

impl Window {
    pub fn new(window_bits: usize) -> Result<Self, Error> {
        let capacity = 2 * (1 << window_bits);
        let len = capacity + WINDOW_PADDING;

        let mut buf = Vec::new();
        buf.try_reserve_exact(len).map_err(|_| Error::alloc(len))?;
        buf.resize(len, 0);

        Ok(Self {
            buf: buf.into_boxed_slice(),
            capacity,
        })
    }

    /// The whole window, including the padding. Bytes that were never written are zero.
    #[inline]
    pub fn filled(&self) -> &[u8] {
        &self.buf
    }

    #[inline]
    pub fn filled_mut(&mut self) -> &mut [u8] {
        &mut self.buf
    }

    /// Usable size, `2 * w_size`.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn copy_in(&mut self, offset: usize, src: &[u8]) {
        debug_assert!(offset + src.len() <= self.capacity);
        self.buf[offset..][..src.len()].copy_from_slice(src);
    }

    pub fn clear(&mut self) {
        self.buf.fill(0);
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn padding_is_readable() {
        let window = Window::new(9).unwrap();
        assert_eq!(window.capacity(), 1024);
        assert!(window.filled().len() >= window.capacity() + 32);
        assert!(window.filled().iter().all(|&b| b == 0));
    }
}
