//! Per-channel sessions and the handshake state machine.
//!
//! # Overview
//!
//! Each exec channel that requests a transfer gets one [`Session`]. Inbound
//! data for the channel is handed to the [`SessionRegistry`], whose
//! dispatcher runs the handshake phases in their fixed order: protocol
//! version, checksum seed, filter rules, and finally the role-specific data
//! phase (the sender builds and sends the file manifest).
//!
//! # Design
//!
//! Sessions never own sockets or spawn tasks. Input arrives as byte buffers
//! from the host, output leaves through the [`Transport`](protocol::Transport)
//! collaborator, and a phase that runs out of input returns control to the
//! host until more bytes arrive. Protocol failures tear the session down;
//! the registry removes it and reports the disconnect reason.

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

mod dispatch;
mod error;
mod filters;
mod phase;
mod registry;
mod seed;
mod session;

pub use dispatch::{Collaborators, HandshakeStatus};
pub use error::SessionError;
pub use phase::{Phase, PhaseSet};
pub use registry::SessionRegistry;
pub use session::Session;
