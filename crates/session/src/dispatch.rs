//! The handshake dispatcher.
//!
//! Inbound channel data drives the incomplete phases in their fixed order.
//! Early phases consume the front of the buffer; the version and seed phases
//! also produce replies through the transport. A phase that needs bytes the
//! buffer does not hold yet leaves the session parked until the next call.

use flist::{Filesystem, FilterMatcher, IdResolver, ManifestBuilder};
use protocol::{MsgReader, MsgWriter, ProtocolError, Transport, negotiate};
use tracing::trace;

use crate::phase::Phase;
use crate::session::Session;
use crate::{SessionError, filters, seed};

/// The collaborator set one dispatch call runs against.
pub struct Collaborators<'a> {
    /// Outbound byte sink.
    pub transport: &'a mut dyn Transport,
    /// Path resolution and stat retrieval.
    pub fs: &'a dyn Filesystem,
    /// Id-to-name resolution for the name tables.
    pub resolver: &'a dyn IdResolver,
    /// Glob matching for filter rules.
    pub matcher: &'a dyn FilterMatcher,
}

/// Where the handshake stands after a dispatch call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandshakeStatus {
    /// More channel data is needed.
    InProgress,
    /// The final phase for this session's role has completed.
    Complete,
}

/// Feeds one buffer of channel data through the incomplete phases.
pub(crate) fn handle_data(
    session: &mut Session,
    data: &[u8],
    collab: &mut Collaborators<'_>,
) -> Result<HandshakeStatus, SessionError> {
    let mut reader = MsgReader::new(data);

    if !session.phases().contains(Phase::ProtocolVersion) {
        trace!(channel = %session.channel(), "handling protocol version");
        let mut out = [0u8; 8];
        let mut writer = MsgWriter::new(&mut out);
        let negotiation = negotiate(&mut reader, &mut writer, session.options())?;
        collab
            .transport
            .send(session.channel(), writer.as_slice())
            .map_err(|source| ProtocolError::Io {
                context: "sending protocol version",
                source,
            })?;
        session.set_negotiation(negotiation);
        session.complete_phase(Phase::ProtocolVersion);
    }

    if !session.phases().contains(Phase::ChecksumSeed) {
        trace!(channel = %session.channel(), "handling checksum seed");
        seed::handle(session, &mut reader, collab.transport)?;
        session.complete_phase(Phase::ChecksumSeed);
    }

    // The filter list and manifest ride in later packets; wait for them.
    if reader.is_empty() {
        return Ok(HandshakeStatus::InProgress);
    }

    if !session.phases().contains(Phase::Filters) {
        trace!(channel = %session.channel(), "handling filters");
        filters::handle(session, &mut reader)?;
        session.complete_phase(Phase::Filters);
    }

    if session.options().sender {
        if !session.phases().contains(Phase::SentManifest) {
            let mut builder = ManifestBuilder::new(session.version(), session.options());
            builder.send(
                session.channel(),
                collab.transport,
                collab.fs,
                collab.resolver,
                collab.matcher,
                session.filters(),
                session.args(),
            )?;
            session.complete_phase(Phase::SentManifest);
        }
        if !reader.is_empty() {
            trace!(
                channel = %session.channel(),
                remaining = reader.remaining(),
                "unconsumed channel data after manifest"
            );
        }
        Ok(HandshakeStatus::Complete)
    } else {
        // Receiving file data is outside this engine's scope.
        Err(ProtocolError::Unsupported("receiving file data").into())
    }
}
