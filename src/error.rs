//! Library error types.
//!
use std::fmt;

/// A yajbe `Result`, normally returning a yajbe [`Error`].
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// A yajbe error. Encompasses any issue that can happen while encoding or
/// decoding a document.
#[derive(Debug)]
pub enum Error {
    /// The byte source ran out while a declared payload was still being read.
    UnexpectedEof,
    /// A tag byte mapped to no handler, a length field produced an invalid
    /// width, or some other structural rule of the encoding was broken.
    Malformed(String),
    /// A tag is in the reserved range and isn't implemented by this codec
    /// (e.g. the VLE-float tag `0x04`).
    Unsupported(String),
    /// A typed reader was called on a tag of a different category.
    TypeMismatch {
        /// What the caller asked for.
        expected: &'static str,
        /// What tag was actually present.
        found: &'static str,
    },
    /// The encoder was asked to write a value outside what it can
    /// represent, e.g. a field name longer than the dictionary's length
    /// field allows.
    InvalidArgument(String),
    /// A fixed-size sink has no room left for more bytes.
    BufferFull,
    /// The underlying byte sink or source failed.
    IoError(std::io::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::UnexpectedEof => write!(f, "unexpected end of input"),
            Error::Malformed(msg) => write!(f, "malformed encoding: {}", msg),
            Error::Unsupported(msg) => write!(f, "unsupported feature: {}", msg),
            Error::TypeMismatch { expected, found } => {
                write!(f, "expected {}, found {}", expected, found)
            }
            Error::InvalidArgument(msg) => write!(f, "invalid argument: {}", msg),
            Error::BufferFull => write!(f, "sink buffer is full"),
            Error::IoError(err) => write!(f, "I/O error: {}", err),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::IoError(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        match e.kind() {
            std::io::ErrorKind::UnexpectedEof => Error::UnexpectedEof,
            _ => Error::IoError(e),
        }
    }
}
