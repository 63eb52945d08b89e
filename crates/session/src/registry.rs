//! The channel-id-keyed session registry.

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use protocol::{ChannelId, SyncOptions};
use tracing::debug;

use crate::dispatch::{self, Collaborators, HandshakeStatus};
use crate::session::Session;
use crate::SessionError;

/// All open sessions, keyed by channel id.
///
/// Shared across the threads the host runs channels on; each session is only
/// ever driven by one channel's data, so the per-entry locking of the map is
/// the only synchronization needed.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: DashMap<ChannelId, Session>,
}

impl SessionRegistry {
    /// An empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens a session for `channel`.
    ///
    /// # Errors
    ///
    /// `AlreadyExists` when the channel already has a session.
    pub fn open(
        &self,
        channel: ChannelId,
        options: SyncOptions,
        args: Vec<String>,
    ) -> Result<(), SessionError> {
        match self.sessions.entry(channel) {
            Entry::Occupied(_) => Err(SessionError::AlreadyExists(channel)),
            Entry::Vacant(vacant) => {
                vacant.insert(Session::new(channel, options, args));
                debug!(%channel, "opened session");
                Ok(())
            }
        }
    }

    /// Closes the session for `channel`.
    ///
    /// # Errors
    ///
    /// `NotFound` when no session is open for the channel.
    pub fn close(&self, channel: ChannelId) -> Result<(), SessionError> {
        if self.sessions.remove(&channel).is_none() {
            return Err(SessionError::NotFound(channel));
        }
        debug!(%channel, "closed session");
        Ok(())
    }

    /// Whether a session is open for `channel`.
    #[must_use]
    pub fn contains(&self, channel: ChannelId) -> bool {
        self.sessions.contains_key(&channel)
    }

    /// Number of open sessions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Whether no sessions are open.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Runs `f` against the session for `channel`.
    ///
    /// # Errors
    ///
    /// `NotFound` when no session is open for the channel.
    pub fn with_session<T>(
        &self,
        channel: ChannelId,
        f: impl FnOnce(&Session) -> T,
    ) -> Result<T, SessionError> {
        self.sessions
            .get(&channel)
            .map(|session| f(&session))
            .ok_or(SessionError::NotFound(channel))
    }

    /// Dispatches one buffer of channel data into the session's handshake.
    ///
    /// A fatal protocol failure removes the session before the error is
    /// returned; the host only has to report the disconnect.
    pub fn handle_data(
        &self,
        channel: ChannelId,
        data: &[u8],
        collab: &mut Collaborators<'_>,
    ) -> Result<HandshakeStatus, SessionError> {
        let result = {
            let mut session = self
                .sessions
                .get_mut(&channel)
                .ok_or(SessionError::NotFound(channel))?;
            dispatch::handle_data(&mut session, data, collab)
        };

        // The map guard is released above; a fatal error may now remove the
        // session without deadlocking on its own shard.
        if let Err(err) = &result {
            if err.is_fatal() {
                debug!(%channel, reason = %err, "disconnecting");
                self.sessions.remove(&channel);
            }
        }
        result
    }
}
