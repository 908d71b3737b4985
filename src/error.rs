//! The error type for everything that can go wrong while reading a PLY file.

use std::io;

use thiserror::Error;


/// An error that occurred while opening, parsing or extracting from a PLY
/// file.
///
/// Stream, schema and row errors are not recoverable: once a [`Reader`]
/// operation returns an error, the reader is latched into an invalid state
/// ([`Reader::valid`] returns `false`) and further loads and advances fail
/// with [`Error::InvalidState`]. No partial data is ever handed out for an
/// element that failed to load.
///
/// [`Reader`]: crate::Reader
/// [`Reader::valid`]: crate::Reader::valid
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// The underlying reader failed with an IO error other than an
    /// unexpected EOF.
    #[error("IO error: {0}")]
    Io(io::Error),

    /// The input ended although more data was required.
    #[error("unexpected end of file while parsing")]
    UnexpectedEof,

    /// The header violates the PLY grammar.
    #[error("malformed header at byte {offset}: {msg}")]
    MalformedHeader {
        msg: String,
        offset: usize,
    },

    /// The format line declared a version other than 1.0.
    #[error("unsupported PLY version '{0}' (only 1.0 is supported)")]
    UnsupportedVersion(String),

    /// A list length was absurdly large or violated a fixed-size
    /// conversion.
    #[error("bad list length {len} for property '{property}'")]
    BadListLength {
        property: String,
        len: u64,
        /// The fixed size the list was converted to, if the error stems
        /// from such a conversion.
        expected: Option<u32>,
    },

    /// An ASCII token was not a valid number of the required type.
    #[error("invalid number at byte {offset}: {msg}")]
    NumericParse {
        msg: String,
        offset: usize,
    },

    /// A scalar operation was invoked on a list property or vice versa.
    #[error("operation not applicable to property '{0}': list/scalar mismatch")]
    ListProperty(String),

    /// A polygon referenced a vertex index outside the caller-supplied
    /// position array.
    #[error("vertex index {index} out of range (file has {limit} vertices)")]
    OutOfRange {
        index: u64,
        limit: u64,
    },

    /// The reader was used after a previous operation already failed.
    #[error("reader is invalid after an earlier error")]
    InvalidState,
}

impl From<io::Error> for Error {
    fn from(src: io::Error) -> Self {
        if src.kind() == io::ErrorKind::UnexpectedEof {
            Error::UnexpectedEof
        } else {
            Error::Io(src)
        }
    }
}
