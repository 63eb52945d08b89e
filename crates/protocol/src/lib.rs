#![deny(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(missing_docs)]

//! # Overview
//!
//! `protocol` provides the binary primitives of the rsync wire protocol as
//! spoken over an SSH exec channel: a bounded little-endian message codec,
//! the adaptive-length integer schemes (`varint`/`varlong`), the protocol
//! version handshake with per-connection compatibility negotiation, and the
//! read-only [`SyncOptions`] capability shared by the higher layers.
//!
//! # Design
//!
//! - [`MsgReader`] and [`MsgWriter`] operate on caller-supplied byte spans
//!   and update their cursors in place only on success. A read or write that
//!   would exceed the remaining span is a [`ProtocolError`], never a silent
//!   truncation.
//! - [`varint`] implements rsync's variable-length integer codec, including
//!   the 64-entry tag lookup table and the `min_bytes`-parameterized 64-bit
//!   variant used for sizes and times from protocol 30 onward.
//! - [`negotiate`] performs the once-per-session version exchange, clamping
//!   the peer's advertisement to our supported range and gating options that
//!   the negotiated version cannot carry.
//!
//! Wire data comes from a possibly hostile peer, so every decoding failure
//! is fail-fast: [`ProtocolError`] terminates the owning session.
//!
//! # Examples
//!
//! ```
//! use protocol::{MsgReader, MsgWriter, varint};
//!
//! let mut buf = [0u8; 8];
//! let mut writer = MsgWriter::new(&mut buf);
//! varint::write_varint(&mut writer, -42).expect("fits");
//! let written = writer.written();
//!
//! let mut reader = MsgReader::new(&buf[..written]);
//! assert_eq!(varint::read_varint(&mut reader).expect("valid"), -42);
//! ```

mod error;
mod msg;
mod options;
mod transport;
pub mod varint;
mod version;

pub use error::ProtocolError;
pub use msg::{MsgReader, MsgWriter};
pub use options::{AppendMode, DeleteTiming, SyncOptions};
pub use transport::{ChannelId, Transport};
pub use version::{
    CompatFlags, Negotiation, PROTOCOL_VERSION, PROTOCOL_VERSION_MAX, PROTOCOL_VERSION_MIN,
    negotiate,
};
