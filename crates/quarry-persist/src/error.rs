use std::io;
use std::path::PathBuf;

use quarry_config::ConfigError;
use quarry_nbt::NbtError;
use thiserror::Error;

/// Errors raised by the persistence helpers.
#[derive(Debug, Error)]
pub enum PersistError {
    /// A filesystem operation on `path` failed.
    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A list file could not be parsed or encoded.
    #[error("invalid list file {}: {source}", .path.display())]
    Nbt {
        path: PathBuf,
        #[source]
        source: NbtError,
    },

    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A cache path does not name a file inside the output root.
    #[error("{} is outside the output root", .path.display())]
    OutsideRoot { path: PathBuf },
}

impl PersistError {
    pub(crate) fn io(path: impl Into<PathBuf>) -> impl FnOnce(io::Error) -> Self {
        let path = path.into();
        move |source| PersistError::Io { path, source }
    }

    pub(crate) fn nbt(path: impl Into<PathBuf>) -> impl FnOnce(NbtError) -> Self {
        let path = path.into();
        move |source| PersistError::Nbt { path, source }
    }
}
