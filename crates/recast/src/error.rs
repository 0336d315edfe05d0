// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 recast contributors

//! Error types for conversion compilation and execution.

use recast_rtti::StreamError;
use std::fmt;

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while compiling sequences, decoding them from the wire,
/// or executing compiled conversions.
#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    /// Name lookup found no registered operation.
    UnknownOperation(String),

    /// More than one registered operation with the name accepts the
    /// (source, destination) pair.
    AmbiguousOperation(String),

    /// Source, destination or intermediate type cannot be inferred.
    TypeUnspecified(&'static str),

    /// The chosen operations cannot convert the given type triple.
    Incompatible {
        source: String,
        destination: String,
    },

    /// A supplied parameter has a type that is neither the declared type
    /// nor `String`.
    ParameterType { parameter: String },

    /// A list or array element access saw an index past the end.
    IndexOutOfBounds { index: usize, len: usize },

    /// Element-wise conversion between fixed-size sequences of unequal
    /// length.
    SizeMismatch {
        source: usize,
        destination: usize,
    },

    /// An operation only usable as a leading step was invoked as a single
    /// or second step.
    MisuseFinal(&'static str),

    /// A conversion option reported a const offset in the reserved range.
    InvalidOffset(usize),

    /// A serialized sequence is structurally invalid.
    MalformedWire(String),

    /// A stream raised an error while (de)serializing values.
    Stream(StreamError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownOperation(name) => {
                write!(f, "no registered conversion operation named {:?}", name)
            }
            Self::AmbiguousOperation(name) => {
                write!(f, "lookup of conversion operation {:?} is ambiguous", name)
            }
            Self::TypeUnspecified(which) => write!(f, "{} type must be specified", which),
            Self::Incompatible {
                source,
                destination,
            } => write!(
                f,
                "type {} cannot be converted to {} with the selected operations",
                source, destination
            ),
            Self::ParameterType { parameter } => {
                write!(f, "parameter {} has invalid type", parameter)
            }
            Self::IndexOutOfBounds { index, len } => {
                write!(f, "index {} out of bounds (size {})", index, len)
            }
            Self::SizeMismatch {
                source,
                destination,
            } => write!(
                f,
                "element-wise conversion between sequences of size {} and {}",
                source, destination
            ),
            Self::MisuseFinal(name) => write!(
                f,
                "{} is not supported as single or second operation",
                name
            ),
            Self::InvalidOffset(offset) => {
                write!(f, "invalid fixed offset {} in conversion option", offset)
            }
            Self::MalformedWire(msg) => write!(f, "malformed serialized sequence: {}", msg),
            Self::Stream(e) => write!(f, "stream error: {}", e),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Stream(e) => Some(e),
            _ => None,
        }
    }
}

impl From<StreamError> for Error {
    fn from(e: StreamError) -> Self {
        Self::Stream(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_messages() {
        assert_eq!(
            Error::TypeUnspecified("intermediate").to_string(),
            "intermediate type must be specified"
        );
        assert_eq!(
            Error::IndexOutOfBounds { index: 4, len: 2 }.to_string(),
            "index 4 out of bounds (size 2)"
        );
    }

    #[test]
    fn test_stream_error_source() {
        use std::error::Error as _;
        let err = Error::from(StreamError::UnexpectedEof);
        assert!(err.source().is_some());
    }
}
