use std::fmt;

/// The error kinds surfaced anywhere in this crate.
///
/// Unlike a boxed-trait-object hierarchy, callers can match on the kind while
/// `Display` still prints a human-readable message carried alongside it.
#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    /// A syscall failed, or a read/write returned fewer bytes than requested.
    Io(String),
    /// A page or slot index fell outside the valid range for its container.
    OutOfRange(String),
    /// A named field, or a backing file, does not exist.
    NotFound(String),
    /// An operation compared or combined fields of incompatible types.
    TypeMismatch(String),
    /// A caller-supplied value violates a precondition (oversized string,
    /// duplicate names, mismatched arity).
    InvalidArgument(String),
    /// A structural invariant was violated while reading a page from disk.
    Corrupt(String),
    /// The operation is deliberately unimplemented (B+-tree deletion).
    Unsupported(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Io(msg) => write!(f, "io error: {}", msg),
            Error::OutOfRange(msg) => write!(f, "out of range: {}", msg),
            Error::NotFound(msg) => write!(f, "not found: {}", msg),
            Error::TypeMismatch(msg) => write!(f, "type mismatch: {}", msg),
            Error::InvalidArgument(msg) => write!(f, "invalid argument: {}", msg),
            Error::Corrupt(msg) => write!(f, "corrupt: {}", msg),
            Error::Unsupported(msg) => write!(f, "unsupported: {}", msg),
        }
    }
}

impl std::error::Error for Error {}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(e.to_string())
    }
}
