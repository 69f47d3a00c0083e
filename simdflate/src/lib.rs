#![doc = core::include_str!("../README.md")]

pub mod adler32;
pub mod bench;
pub mod cpu_features;
pub mod crc32;
pub mod deflate;
mod error;
pub mod inflate;

pub use adler32::{adler32, adler32_combine};
pub use cpu_features::{CpuFeatures, Dispatch};
pub use crc32::{crc32, crc32_combine};
pub use deflate::{compress_bound, Deflate, DeflateConfig, Strategy};
pub use error::{Error, Result};
pub use inflate::{Inflate, InflateConfig};

#[macro_export]
macro_rules! trace {
    ($($arg:tt)*) => {
        ::tracing::trace!($($arg)*)
    };
}

/// Maximum size of the dynamic table. The maximum number of code structures is
/// 1924, which is the sum of 1332 for literal/length codes and 592 for distance
/// codes. "enough 286 10 15" for literal/length codes returns 1332, and
/// "enough 30 9 15" for distance codes returns 592.
#[allow(unused)]
pub(crate) const ENOUGH: usize = ENOUGH_LENS + ENOUGH_DISTS;
pub(crate) const ENOUGH_LENS: usize = 1332;
pub(crate) const ENOUGH_DISTS: usize = 592;

/// initial adler-32 hash value
pub(crate) const ADLER32_INITIAL_VALUE: u32 = 1;
/// initial crc-32 hash value
pub(crate) const CRC32_INITIAL_VALUE: u32 = 0;

pub const MIN_WBITS: i32 = 8; // 256b LZ77 window
pub const MAX_WBITS: i32 = 15; // 32kb LZ77 window
pub(crate) const DEF_WBITS: i32 = MAX_WBITS;

/// Level used when none (or an out-of-range one) is given.
pub const DEFAULT_LEVEL: i32 = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Flush {
    #[default]
    NoFlush = 0,
    PartialFlush = 1,
    SyncFlush = 2,
    FullFlush = 3,
    Finish = 4,
    Block = 5,
}

impl TryFrom<i32> for Flush {
    type Error = ();

    fn try_from(value: i32) -> core::result::Result<Self, Self::Error> {
        match value {
            0 => Ok(Flush::NoFlush),
            1 => Ok(Flush::PartialFlush),
            2 => Ok(Flush::SyncFlush),
            3 => Ok(Flush::FullFlush),
            4 => Ok(Flush::Finish),
            5 => Ok(Flush::Block),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Code {
    /// operation, extra bits, table bits
    pub op: u8,
    /// bits in this part of the code
    pub bits: u8,
    /// offset in table or code value
    pub val: u16,
}

/// Status codes shared by the streaming engines and the C ABI.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[repr(i32)]
pub enum ReturnCode {
    Ok = 0,
    StreamEnd = 1,
    NeedDict = 2,
    ErrNo = -1,
    StreamError = -2,
    DataError = -3,
    MemError = -4,
    BufError = -5,
    VersionError = -6,
}

impl From<i32> for ReturnCode {
    fn from(value: i32) -> Self {
        use ReturnCode::*;

        match value {
            0 => Ok,
            1 => StreamEnd,
            2 => NeedDict,
            -1 => ErrNo,
            -2 => StreamError,
            -3 => DataError,
            -4 => MemError,
            -5 => BufError,
            -6 => VersionError,
            // anything else did not come from us
            _ => StreamError,
        }
    }
}

impl ReturnCode {
    pub const fn error_message(self) -> &'static str {
        match self {
            ReturnCode::NeedDict => "need dictionary",
            ReturnCode::StreamEnd => "stream end",
            ReturnCode::Ok => "",
            ReturnCode::ErrNo => "file error",
            ReturnCode::StreamError => "stream error",
            ReturnCode::DataError => "data error",
            ReturnCode::MemError => "insufficient memory",
            ReturnCode::BufError => "buffer error",
            ReturnCode::VersionError => "incompatible version",
        }
    }
}

/// What a single [`Deflate::deflate`] or [`Inflate::inflate`] call did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    /// input bytes consumed
    pub consumed: usize,
    /// output bytes written
    pub produced: usize,
    pub code: ReturnCode,
}

/// Output of [`compress`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Compressed {
    pub data: Vec<u8>,
    /// Whether any vectorized kernel took part in producing `data`.
    pub vectorized: bool,
}

/// Reported by [`capabilities`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    pub simd_supported: bool,
    pub version: &'static str,
    pub features: CpuFeatures,
}

/// The crate version.
pub const fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

/// Reports the vector extensions this build can use on the running machine.
pub fn capabilities() -> Capabilities {
    let features = CpuFeatures::detect();

    Capabilities {
        simd_supported: features.any(),
        version: version(),
        features,
    }
}

/// Compress `input` into a zlib stream at `level`.
///
/// Levels outside `0..=9` fall back to [`DEFAULT_LEVEL`]. Empty input produces a valid stream
/// (8 bytes, or 11 at level 0).
pub fn compress(input: &[u8], level: i32) -> Result<Compressed> {
    compress_with(input, DeflateConfig::new(level), Dispatch::detect())
}

/// Like [`compress`], with an explicit configuration and kernel selection.
pub fn compress_with(input: &[u8], config: DeflateConfig, dispatch: Dispatch) -> Result<Compressed> {
    let mut data = Vec::new();
    let bound = compress_bound(input.len());
    data.try_reserve_exact(bound)
        .map_err(|_| Error::alloc(bound))?;
    data.resize(bound, 0);

    let (written, code) = {
        let (output, code) = deflate::compress_slice_with(&mut data, input, config, dispatch);
        (output.len(), code)
    };

    match code {
        ReturnCode::Ok => {
            data.truncate(written);
            Ok(Compressed {
                data,
                vectorized: dispatch.is_vectorized(),
            })
        }
        other => Err(Error::from_return_code(other, "compression failed", bound)),
    }
}

/// Decompress a zlib stream.
///
/// The output grows as needed; `output_hint` only sets the initial capacity.
pub fn decompress(input: &[u8], output_hint: Option<usize>) -> Result<Vec<u8>> {
    inflate::decompress_with(input, output_hint, InflateConfig::default(), Dispatch::detect())
}
