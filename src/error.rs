//! Error types for the block layer.

use std::fmt;

/// The result type used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// The error type for block operations.
///
/// Errors are clonable so a cursor can hold one as its status and keep
/// surfacing it on every later call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Structural damage: the buffer is too small to hold a trailer, or the
    /// restart trailer describes an impossible layout.
    BadBlockContents(String),

    /// An entry inside the block failed to decode: short header, varint
    /// overrun, payload running past the restart array, or a prefix length
    /// inconsistent with the previous key.
    BadEntryInBlock(String),

    /// The block is well formed but holds no entries, so the requested
    /// quantity does not exist.
    Incomplete(String),
}

impl Error {
    /// Creates a new structural-corruption error.
    pub fn bad_block_contents(msg: impl Into<String>) -> Self {
        Error::BadBlockContents(msg.into())
    }

    /// Creates a new entry-corruption error.
    pub fn bad_entry_in_block(msg: impl Into<String>) -> Self {
        Error::BadEntryInBlock(msg.into())
    }

    /// Creates a new incomplete error.
    pub fn incomplete(msg: impl Into<String>) -> Self {
        Error::Incomplete(msg.into())
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::BadBlockContents(msg) => write!(f, "bad block contents: {}", msg),
            Error::BadEntryInBlock(msg) => write!(f, "bad entry in block: {}", msg),
            Error::Incomplete(msg) => write!(f, "incomplete: {}", msg),
        }
    }
}

impl std::error::Error for Error {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::bad_block_contents("trailer truncated");
        assert_eq!(err.to_string(), "bad block contents: trailer truncated");

        let err = Error::bad_entry_in_block("varint overrun");
        assert_eq!(err.to_string(), "bad entry in block: varint overrun");

        let err = Error::incomplete("empty block");
        assert_eq!(err.to_string(), "incomplete: empty block");
    }

    #[test]
    fn test_error_matching() {
        let err = Error::bad_entry_in_block("x");
        assert!(matches!(err, Error::BadEntryInBlock(_)));
        assert_eq!(err.clone(), err);
    }
}
