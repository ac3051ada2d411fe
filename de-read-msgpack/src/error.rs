//! Deserialization errors
use alloc::string::{String, ToString};
use core::convert::Infallible;
use core::fmt;
use core::num::TryFromIntError;
use core::str::Utf8Error;

use de_read::ReadError;
use serde::de;
use thiserror::Error;

/// Deserialization result
pub type Result<T> = core::result::Result<T, Error>;

/// The kind of a MessagePack value a decoder expected to find at the cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Expected {
    Nil,
    Bool,
    Integer,
    Number,
    Float32,
    String,
    Bin,
    Array,
    Map,
    Identifier,
    Ext,
}

impl fmt::Display for Expected {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Expected::Nil => "nil",
            Expected::Bool => "bool",
            Expected::Integer => "integer",
            Expected::Number => "number",
            Expected::Float32 => "number representable as f32",
            Expected::String => "string",
            Expected::Bin => "bin",
            Expected::Array => "array",
            Expected::Map => "map",
            Expected::Identifier => "struct field or enum variant identifier",
            Expected::Ext => "extension",
        })
    }
}

/// Deserialization error
#[derive(Debug, PartialEq, Eq, Clone, Error)]
#[non_exhaustive]
pub enum Error {
    /// Input ended before a value was complete
    #[error("Unexpected end of MessagePack input: {needed} byte(s) needed at offset {offset}")]
    UnexpectedEof {
        offset: usize,
        needed: usize
    },
    /// The top level value did not span the whole input
    #[error("MessagePack size mismatch: input has {len} bytes, value ended at {consumed}")]
    SizeMismatch {
        len: usize,
        consumed: usize
    },
    /// Wire code incompatible with the decoded kind
    #[error("Invalid MessagePack code {code:#04x}, expected {expected}")]
    InvalidCode {
        code: u8,
        expected: Expected
    },
    /// Fixed size target is smaller than the wire element count
    #[error("Too many elements: capacity is {capacity}, MessagePack has {len}")]
    CapacityExceeded {
        capacity: usize,
        len: usize
    },
    /// Nesting exceeded the configured limit
    #[error("MessagePack nesting exceeds the maximum depth of {max_depth}")]
    DepthExceeded {
        max_depth: usize
    },
    /// Reserved code was detected
    #[error("Reserved MessagePack code in input")]
    ReservedCode,
    /// Extension not claimed by any registered decoder
    #[error("Unsupported MessagePack extension code {code:#04x} in input")]
    UnsupportedExt {
        code: u8
    },
    /// Number could not be coerced
    #[error("Could not coerce integer to a deserialized type")]
    InvalidInteger,
    /// String payload is not UTF-8
    #[error("Invalid UTF-8 in MessagePack string")]
    InvalidUtf8,
    /// Invalid length
    #[error("Invalid length")]
    InvalidLength,
    /// Malformed timestamp extension payload
    #[error("Invalid MessagePack timestamp")]
    InvalidTimestamp,
    /// A visitor stopped before consuming all elements
    #[error("Trailing unconsumed MessagePack elements")]
    TrailingElements,
    /// An error passed down from a [`serde::de::Deserialize`] implementation
    #[error("{0} while deserializing MessagePack")]
    Custom(String),
}

impl Error {
    #[inline]
    pub(crate) fn invalid_code(code: u8, expected: Expected) -> Self {
        Error::InvalidCode { code, expected }
    }
}

impl de::Error for Error {
    fn custom<T: fmt::Display>(msg: T) -> Self {
        Error::Custom(msg.to_string())
    }
}

impl From<ReadError> for Error {
    fn from(err: ReadError) -> Self {
        match err {
            ReadError::UnexpectedEof { offset, needed } => Error::UnexpectedEof { offset, needed },
        }
    }
}

impl From<Infallible> for Error {
    fn from(err: Infallible) -> Self {
        match err {}
    }
}

impl From<TryFromIntError> for Error {
    fn from(_err: TryFromIntError) -> Self {
        Error::InvalidInteger
    }
}

impl From<Utf8Error> for Error {
    fn from(_err: Utf8Error) -> Self {
        Error::InvalidUtf8
    }
}
