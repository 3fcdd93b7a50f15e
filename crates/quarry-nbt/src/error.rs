//! Errors raised while encoding or decoding tagged values.

use std::io;

/// Errors from the tagged value codec.
///
/// `Format` and `Truncated` are the two decode failures; both are fatal only
/// to the decode call that raised them.
#[derive(Debug, thiserror::Error)]
pub enum NbtError {
    /// The byte stream is structurally invalid (unknown type id, negative
    /// length, invalid UTF-8, excessive nesting, wrong root type).
    #[error("malformed tag data: {0}")]
    Format(String),

    /// The byte stream ended in the middle of a value.
    #[error("tag data truncated")]
    Truncated,

    /// A list being written holds elements of more than one type.
    #[error("list mixes {expected:?} and {found:?} elements")]
    HeterogeneousList {
        /// Type of the first element.
        expected: crate::TagType,
        /// First mismatching element type.
        found: crate::TagType,
    },

    /// Underlying reader or writer failed.
    #[error("I/O error: {0}")]
    Io(#[source] io::Error),
}

impl From<io::Error> for NbtError {
    fn from(err: io::Error) -> Self {
        if err.kind() == io::ErrorKind::UnexpectedEof {
            NbtError::Truncated
        } else {
            NbtError::Io(err)
        }
    }
}

impl NbtError {
    pub(crate) fn format(message: impl Into<String>) -> Self {
        NbtError::Format(message.into())
    }
}
