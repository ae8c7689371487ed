//! Source resolution: turn a source string into normalized servers plus the
//! source descriptor recorded in the lock file.
//!
//! Handles:
//! - Registry sources (`registry:`), fetched over HTTP
//! - Git sources (`git:`, `github:`, `.git` URLs), cloned with libgit2
//! - Local manifest files and directories

mod git;
mod resolver;
mod spec;

pub use resolver::{MANIFEST_FILE, ResolvedSource, SourceResolver};
pub use spec::{GitSpec, SourceSpec};
