//! File manifest construction and entry encoding.
//!
//! # Overview
//!
//! A sender describes the files it offers as a manifest: a sequence of entry
//! records followed by id-to-name tables. Entries are diff-compressed against
//! their predecessor, so fields matching the previous entry (mode, mtime,
//! owner, a shared name prefix) are elided and flagged instead of repeated.
//!
//! # Design
//!
//! The crate is split along the lifecycle of a manifest:
//!
//! - [`Entry`] captures one file's metadata through the [`Filesystem`]
//!   collaborator.
//! - [`DiffState`] carries the previous entry's fields across the list.
//! - [`compute_xmit_flags`] decides which fields the wire record elides,
//!   updating the diff state and the name tables as it goes.
//! - [`encode_entry`] and [`decode_entry`] move one record to and from its
//!   wire form.
//! - [`NameTables`] accumulates uid/gid display names for the table section.
//! - [`ManifestBuilder`] drives the whole list and flushes it to a
//!   [`Transport`](protocol::Transport).
//!
//! Lookups and policy the engine must not own (stat calls, id resolution,
//! glob matching) stay behind the [`Filesystem`], [`IdResolver`], and
//! [`FilterMatcher`] traits.

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

mod builder;
mod entry;
mod error;
pub mod flags;
mod names;
mod read;
mod state;
mod write;

pub use builder::{FilterMatcher, ManifestBuilder};
#[cfg(unix)]
pub use entry::LocalFs;
pub use entry::{mode, Entry, EntryFlags, Filesystem, Metadata};
pub use error::FileListError;
pub use names::{IdResolver, NameTable, NameTables};
pub use read::{DecodedEntry, decode_entry, decode_names};
pub use state::DiffState;
pub use write::{XmitFlags, compute_xmit_flags, encode_entry};
