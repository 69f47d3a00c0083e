use core::fmt;

use crate::Dispatch;

/// The caller's output buffer for one call, filled from the front.
pub(crate) struct Writer<'a> {
    buf: &'a mut [u8],
    filled: usize,
    dispatch: Dispatch,
}

impl<'a> Writer<'a> {
    #[inline]
    pub fn new(buf: &'a mut [u8], dispatch: Dispatch) -> Writer<'a> {
        Writer {
            buf,
            filled: 0,
            dispatch,
        }
    }

    /// Returns the total capacity of the buffer.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.buf.len()
    }

    /// Returns the length of the filled part of the buffer
    #[inline]
    pub fn len(&self) -> usize {
        self.filled
    }

    #[inline]
    pub fn filled(&self) -> &[u8] {
        &self.buf[..self.filled]
    }

    /// Returns the number of bytes at the end of the slice that have not yet been filled.
    #[inline]
    pub fn remaining(&self) -> usize {
        self.capacity() - self.filled
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.filled == self.buf.len()
    }

    #[inline(always)]
    pub fn push(&mut self, byte: u8) {
        self.buf[self.filled] = byte;

        self.filled += 1;
    }

    /// Appends data to the buffer
    #[inline(always)]
    pub fn extend(&mut self, buf: &[u8]) {
        self.buf[self.filled..][..buf.len()].copy_from_slice(buf);

        self.filled += buf.len();
    }

    /// Append `length` bytes copied from `offset_from_end` bytes back in the filled part.
    ///
    /// The source may overlap the bytes being written: with the last two bytes `X Y`, a copy of
    /// length 5 at distance 2 appends `X Y X Y X`.
    #[inline(always)]
    pub fn copy_match(&mut self, offset_from_end: usize, length: usize) {
        debug_assert!(offset_from_end != 0 && offset_from_end <= self.filled);
        debug_assert!(self.filled + length <= self.capacity());

        let current = self.filled;
        let start = current - offset_from_end;

        let (history, out) = self.buf.split_at_mut(current);
        let out = &mut out[..length];

        if offset_from_end >= length {
            chunk_copy(self.dispatch, out, &history[start..][..length]);
        } else {
            // the output repeats the last `offset_from_end` bytes
            let pattern = &history[start..];

            match offset_from_end {
                1 | 2 | 4 | 8 => broadcast(self.dispatch, out, pattern),
                _ => {
                    for chunk in out.chunks_mut(offset_from_end) {
                        chunk.copy_from_slice(&pattern[..chunk.len()]);
                    }
                }
            }
        }

        self.filled += length
    }
}

impl fmt::Debug for Writer<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Writer")
            .field("filled", &self.filled)
            .field("capacity", &self.capacity())
            .finish()
    }
}

/// Copy the non-overlapping `src` into `out`.
#[inline(always)]
fn chunk_copy(dispatch: Dispatch, out: &mut [u8], src: &[u8]) {
    #[cfg(target_arch = "x86_64")]
    if dispatch.avx2() && out.len() >= 32 {
        // SAFETY: avx2 was detected.
        return unsafe { avx2::chunk_copy(out, src) };
    }

    #[cfg(target_arch = "x86_64")]
    if dispatch.sse2() && out.len() >= 16 {
        // SAFETY: sse2 was detected.
        return unsafe { sse2::chunk_copy(out, src) };
    }

    let _ = dispatch;
    out.copy_from_slice(src)
}

/// Tile `out` with `pattern`, whose length is 1, 2, 4 or 8.
#[inline(always)]
fn broadcast(dispatch: Dispatch, out: &mut [u8], pattern: &[u8]) {
    #[cfg(target_arch = "x86_64")]
    if dispatch.sse2() {
        // SAFETY: sse2 was detected.
        return unsafe { sse2::broadcast(out, pattern) };
    }

    let _ = dispatch;
    if let [byte] = pattern {
        out.fill(*byte);
    } else {
        for chunk in out.chunks_mut(pattern.len()) {
            chunk.copy_from_slice(&pattern[..chunk.len()]);
        }
    }
}

#[cfg(target_arch = "x86_64")]
mod sse2 {
    use core::arch::x86_64::{
        __m128i, _mm_loadu_si128, _mm_set1_epi16, _mm_set1_epi32, _mm_set1_epi64x, _mm_set1_epi8,
        _mm_storeu_si128,
    };

    /// `out` and `src` have the same length of at least 16 bytes.
    #[target_feature(enable = "sse2")]
    pub unsafe fn chunk_copy(out: &mut [u8], src: &[u8]) {
        debug_assert!(out.len() == src.len() && out.len() >= 16);

        let mut out_chunks = out.chunks_exact_mut(16);
        for (dst, src) in (&mut out_chunks).zip(src.chunks_exact(16)) {
            let chunk = _mm_loadu_si128(src.as_ptr().cast::<__m128i>());
            _mm_storeu_si128(dst.as_mut_ptr().cast::<__m128i>(), chunk);
        }

        if !out_chunks.into_remainder().is_empty() {
            // one more chunk that ends exactly at the end, overlapping what was already written
            let tail = out.len() - 16;
            let chunk = _mm_loadu_si128(src[tail..].as_ptr().cast::<__m128i>());
            _mm_storeu_si128(out[tail..].as_mut_ptr().cast::<__m128i>(), chunk);
        }
    }

    /// Broadcast `pattern` (1, 2, 4 or 8 bytes) into all lanes, then tile `out` with it.
    #[target_feature(enable = "sse2")]
    pub unsafe fn broadcast(out: &mut [u8], pattern: &[u8]) {
        let lanes = match *pattern {
            [a] => _mm_set1_epi8(a as i8),
            [a, b] => _mm_set1_epi16(i16::from_le_bytes([a, b])),
            [a, b, c, d] => _mm_set1_epi32(i32::from_le_bytes([a, b, c, d])),
            [a, b, c, d, e, f, g, h] => _mm_set1_epi64x(i64::from_le_bytes([a, b, c, d, e, f, g, h])),
            _ => unreachable!("pattern length must divide 16"),
        };

        let mut tiled = [0u8; 16];
        _mm_storeu_si128(tiled.as_mut_ptr().cast::<__m128i>(), lanes);

        let mut chunks = out.chunks_exact_mut(16);
        for chunk in &mut chunks {
            _mm_storeu_si128(chunk.as_mut_ptr().cast::<__m128i>(), lanes);
        }

        let remainder = chunks.into_remainder();
        let n = remainder.len();
        remainder.copy_from_slice(&tiled[..n]);
    }
}

#[cfg(target_arch = "x86_64")]
mod avx2 {
    use core::arch::x86_64::{__m256i, _mm256_loadu_si256, _mm256_storeu_si256};

    /// `out` and `src` have the same length of at least 32 bytes.
    #[target_feature(enable = "avx2")]
    pub unsafe fn chunk_copy(out: &mut [u8], src: &[u8]) {
        debug_assert!(out.len() == src.len() && out.len() >= 32);

        let mut out_chunks = out.chunks_exact_mut(32);
        for (dst, src) in (&mut out_chunks).zip(src.chunks_exact(32)) {
            let chunk = _mm256_loadu_si256(src.as_ptr().cast::<__m256i>());
            _mm256_storeu_si256(dst.as_mut_ptr().cast::<__m256i>(), chunk);
        }

        if !out_chunks.into_remainder().is_empty() {
            let tail = out.len() - 32;
            let chunk = _mm256_loadu_si256(src[tail..].as_ptr().cast::<__m256i>());
            _mm256_storeu_si256(out[tail..].as_mut_ptr().cast::<__m256i>(), chunk);
        }
    }
}
