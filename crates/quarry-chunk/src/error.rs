use quarry_nbt::NbtError;
use thiserror::Error;

/// Failures that stop a chunk from being read or written at all.
///
/// Content problems inside an otherwise readable chunk are not errors; see
/// [`DecodeIssue`](crate::DecodeIssue).
#[derive(Debug, Error)]
pub enum ChunkError {
    /// The bytes could not be decompressed or parsed into a tag tree.
    #[error("failed to decode chunk data: {0}")]
    Decode(#[source] NbtError),

    /// The tag tree could not be encoded.
    #[error("failed to encode chunk data: {0}")]
    Encode(#[source] NbtError),
}
