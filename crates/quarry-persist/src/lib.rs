//! Small persistence helpers that sit beside the chunk codec.
//!
//! - [`WriteCache`]: content-hash table that skips rewriting unchanged
//!   generated files and deletes stale ones at the end of a run.
//! - [`EntryList`]: ordered list of [`ListEntry`] values stored as one NBT
//!   file, e.g. the saved server list ([`ServerEntry`]).

mod atomic;
mod entry_list;
mod error;
mod write_cache;

pub use entry_list::{EntryList, ListEntry, ServerEntry};
pub use error::PersistError;
pub use write_cache::{FinalizeSummary, WriteCache};
