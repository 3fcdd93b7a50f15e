//! Registry resolution: symbolic namespaced keys to and from small numeric ids.
//!
//! A [`RegistrySet`] is built once per world session and is read-only
//! afterwards. It is `Send + Sync`, so codecs on several worker threads can
//! share one `Arc<RegistrySet>` without locking.

mod error;
mod key;
mod registry;

pub use error::RegistryError;
pub use key::{DEFAULT_NAMESPACE, RegistryKey};
pub use registry::{IdMap, RegistryLookup, RegistrySet, RegistrySetBuilder, names};
