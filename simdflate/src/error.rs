//! Error types for the compress/decompress entry points.

use thiserror::Error;

use crate::ReturnCode;

/// Result type alias for compression operations.
pub type Result<T> = core::result::Result<T, Error>;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    /// Invalid call parameters.
    #[error("stream error: {message}")]
    Stream { message: &'static str },

    /// Input data is corrupted or truncated.
    #[error("corrupted data: {message}")]
    Data { message: &'static str },

    /// Memory allocation failed.
    #[error("allocation failed: could not allocate {requested_bytes} bytes")]
    Memory { requested_bytes: usize },

    /// Buffer too small for output.
    #[error("buffer too small: need {required} bytes, got {provided}")]
    BufferTooSmall { required: usize, provided: usize },
}

impl Error {
    pub fn stream(message: &'static str) -> Self {
        Error::Stream { message }
    }

    pub fn data(message: &'static str) -> Self {
        Error::Data { message }
    }

    pub fn alloc(requested_bytes: usize) -> Self {
        Error::Memory { requested_bytes }
    }

    /// Build an error from a non-success status. `size` is the buffer size involved, used for
    /// `MemError` and `BufError`.
    pub(crate) fn from_return_code(code: ReturnCode, message: &'static str, size: usize) -> Self {
        match code {
            ReturnCode::DataError | ReturnCode::NeedDict => Error::data(message),
            ReturnCode::MemError => Error::alloc(size),
            ReturnCode::BufError => Error::BufferTooSmall {
                required: size.saturating_add(1),
                provided: size,
            },
            _ => Error::stream(message),
        }
    }

    pub fn return_code(&self) -> ReturnCode {
        match self {
            Error::Stream { .. } => ReturnCode::StreamError,
            Error::Data { .. } => ReturnCode::DataError,
            Error::Memory { .. } => ReturnCode::MemError,
            Error::BufferTooSmall { .. } => ReturnCode::BufError,
        }
    }

    /// A larger output buffer makes the same call succeed.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Error::BufferTooSmall { .. })
    }
}

impl From<Error> for ReturnCode {
    fn from(error: Error) -> Self {
        error.return_code()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn error_codes() {
        assert_eq!(Error::data("x").return_code(), ReturnCode::DataError);
        assert_eq!(Error::alloc(10).return_code(), ReturnCode::MemError);
        assert_eq!(Error::stream("x").return_code(), ReturnCode::StreamError);

        let small = Error::from_return_code(ReturnCode::BufError, "x", 16);
        assert_eq!(ReturnCode::from(small.clone()), ReturnCode::BufError);
        assert!(small.is_recoverable());
        assert!(!Error::data("x").is_recoverable());
    }

    #[test]
    fn error_display() {
        assert_eq!(
            Error::data("incorrect header check").to_string(),
            "corrupted data: incorrect header check"
        );
        assert_eq!(
            Error::BufferTooSmall {
                required: 10,
                provided: 4
            }
            .to_string(),
            "buffer too small: need 10 bytes, got 4"
        );
    }
}
