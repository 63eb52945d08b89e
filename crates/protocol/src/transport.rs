//! The byte-stream seam between the engine and its host.
//!
//! The engine never owns a socket. Assembled messages are handed to a
//! [`Transport`] supplied by the embedding program, which is responsible for
//! framing them onto whatever carries the session (typically an exec channel
//! of an SSH connection).

use std::fmt;
use std::io;

/// Identifies one exec channel within the host connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChannelId(pub u32);

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "channel {}", self.0)
    }
}

/// Outbound byte sink provided by the embedding program.
pub trait Transport {
    /// Sends `data` to the peer on `channel`.
    ///
    /// The engine treats any failure as fatal for the session.
    fn send(&mut self, channel: ChannelId, data: &[u8]) -> io::Result<()>;
}
