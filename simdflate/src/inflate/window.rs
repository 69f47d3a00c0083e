use crate::Error;

/// Circular history of the output of previous calls, for matches that reach back past the start
/// of the current output buffer.
///
/// The buffer is only allocated once output actually has to be kept.
#[derive(Debug, Default)]
pub(crate) struct Window {
    buf: Vec<u8>,
    /// number of valid bytes, saturates at the size
    have: usize,
    /// write position
    next: usize,
}

impl Window {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn size(&self) -> usize {
        self.buf.len()
    }

    pub fn have(&self) -> usize {
        self.have
    }

    pub fn clear(&mut self) {
        self.have = 0;
        self.next = 0;
    }

    /// Allocate `1 << wbits` bytes if that has not happened yet.
    pub fn ensure(&mut self, wbits: u8) -> Result<(), Error> {
        let size = 1usize << wbits;

        if self.buf.len() != size {
            let mut buf = Vec::new();
            buf.try_reserve_exact(size)
                .map_err(|_| Error::alloc(size))?;
            buf.resize(size, 0);

            self.buf = buf;
            self.clear();
        }

        Ok(())
    }

    /// The `len` bytes starting `dist` bytes back from the end of the history, as the part up to
    /// the end of the buffer and the part that wrapped around to its start.
    pub fn back(&self, dist: usize, len: usize) -> (&[u8], &[u8]) {
        debug_assert!(len <= dist && dist <= self.have);

        if dist > self.next {
            let start = self.size() - (dist - self.next);
            let first = Ord::min(len, self.size() - start);

            (&self.buf[start..][..first], &self.buf[..len - first])
        } else {
            (&self.buf[self.next - dist..][..len], &[])
        }
    }

    pub fn extend(&mut self, slice: &[u8]) {
        let size = self.size();

        if slice.len() >= size {
            // only the tail survives
            self.buf.copy_from_slice(&slice[slice.len() - size..]);

            self.next = 0;
            self.have = size;
        } else {
            let dist = Ord::min(size - self.next, slice.len());

            // the end part goes onto the end of the window. The start part wraps around and is
            // written to the start of the window.
            let (end_part, start_part) = slice.split_at(dist);

            self.buf[self.next..][..dist].copy_from_slice(end_part);

            if !start_part.is_empty() {
                self.buf[..start_part.len()].copy_from_slice(start_part);

                self.next = start_part.len();
                self.have = size;
            } else {
                self.next += dist;
                if self.next == size {
                    self.next = 0;
                }
                if self.have < size {
                    self.have += dist;
                }
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn window_of(size_bits: u8) -> Window {
        let mut window = Window::empty();
        window.ensure(size_bits).unwrap();
        window
    }

    #[test]
    fn extend_in_bounds() {
        let mut window = window_of(4);

        window.extend(&[1; 5]);
        assert_eq!(window.have, 5);
        assert_eq!(window.next, 5);

        window.extend(&[2; 11]);
        assert_eq!(window.have, 16);
        assert_eq!(window.next, 0);
        assert_eq!(&window.buf[..6], &[1, 1, 1, 1, 1, 2]);
    }

    #[test]
    fn extend_crosses_bounds() {
        let mut window = window_of(3);

        window.extend(&[1; 6]);
        window.extend(&[2; 4]);
        assert_eq!(window.have, 8);
        assert_eq!(window.next, 2);
        assert_eq!(&window.buf, &[2, 2, 1, 1, 1, 1, 2, 2]);

        // the newest 5 bytes straddle the end of the buffer
        let (first, second) = window.back(5, 5);
        assert_eq!(first, &[1, 2, 2]);
        assert_eq!(second, &[2, 2]);
        assert_eq!(window.back(2, 2), (&[2, 2][..], &[][..]));
    }

    #[test]
    fn extend_out_of_bounds() {
        let mut window = window_of(3);

        window.extend(&[1, 2, 3, 4, 5, 6, 7, 8, 9, 10]);
        assert_eq!(window.have, 8);
        assert_eq!(window.next, 0);
        assert_eq!(&window.buf, &[3, 4, 5, 6, 7, 8, 9, 10]);

        let (first, second) = window.back(8, 3);
        assert_eq!(first, &[3, 4, 5]);
        assert!(second.is_empty());
    }
}
