//! Lock file: the record of what conduit installed, where, and from which
//! source.

pub mod hash;
pub mod store;
pub mod types;

pub use hash::generate_metadata_hash;
pub use store::LockStore;
pub use types::{LOCK_VERSION, LockEntry, LockFile, LockSource, LockTarget, SourceKind};
