//! Registry error types.

/// Errors from registry construction and resolution.
///
/// The lookup variants are recoverable at every call site in the chunk codec.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    /// The registry itself is not part of the active set.
    #[error("unknown registry: {0}")]
    UnknownRegistry(String),

    /// No entry with this key exists in the registry.
    #[error("unknown key {key} in registry {registry}")]
    UnknownKey {
        /// Registry that was searched.
        registry: String,
        /// Symbolic key that was not found.
        key: String,
    },

    /// No entry with this id exists in the registry.
    #[error("unknown id {id} in registry {registry}")]
    UnknownId {
        /// Registry that was searched.
        registry: String,
        /// Numeric id that was not found.
        id: u32,
    },

    /// A key was registered twice.
    #[error("duplicate key {key} in registry {registry}")]
    DuplicateKey {
        /// Registry being populated.
        registry: String,
        /// Key that already existed.
        key: String,
    },

    /// The key is not a valid `namespace:path` identifier.
    #[error("invalid registry key: {0:?}")]
    InvalidKey(String),
}
