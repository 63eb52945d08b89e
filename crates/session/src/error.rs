use flist::FileListError;
use protocol::{ChannelId, ProtocolError};
use thiserror::Error;

/// Failures at the session layer.
#[derive(Debug, Error)]
pub enum SessionError {
    /// No session is open for the channel.
    #[error("no session open for {0}")]
    NotFound(ChannelId),

    /// A session is already open for the channel.
    #[error("session already open for {0}")]
    AlreadyExists(ChannelId),

    /// A wire-level failure; the session is torn down.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// Manifest construction failed; the session is torn down.
    #[error(transparent)]
    FileList(#[from] FileListError),
}

impl SessionError {
    /// Whether this failure must tear the session down.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(self, Self::Protocol(_) | Self::FileList(_))
    }
}
