use crate::cpu_features::Dispatch;

mod combine;
#[cfg(target_arch = "x86_64")]
mod pclmulqdq;
mod table;

pub use combine::crc32_combine;

/// The folding kernel needs at least one full super-block of four 16-byte lanes.
pub(crate) const VECTOR_THRESHOLD: usize = 64;

/// CRC-32 (ISO-HDLC, as used by zlib and gzip) of `buf`, continuing from `start`
/// (0 for a fresh checksum).
pub fn crc32(start: u32, buf: &[u8]) -> u32 {
    crc32_with(Dispatch::detect(), start, buf)
}

pub fn crc32_with(dispatch: Dispatch, start: u32, buf: &[u8]) -> u32 {
    match dispatch {
        Dispatch::Scalar => table::crc32_bytewise(start, buf),
        Dispatch::Vectorized(_) => {
            #[cfg(target_arch = "x86_64")]
            if buf.len() >= VECTOR_THRESHOLD && dispatch.pclmulqdq() {
                // SAFETY: pclmulqdq, sse2 and sse4.1 support was established by the dispatch
                return unsafe { pclmulqdq::crc32_pclmulqdq(start, buf) };
            }

            table::crc32_slice16(start, buf)
        }
    }
}
