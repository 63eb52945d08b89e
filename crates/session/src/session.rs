//! Per-channel session state.

use protocol::{ChannelId, Negotiation, SyncOptions};

use crate::phase::{Phase, PhaseSet};

/// The state of one transfer on one exec channel.
///
/// Everything here is owned by the channel: the handshake phase set, the
/// negotiation outcome once the version phase ran, the checksum seed, the
/// filter rules read so far, and the non-option path arguments the transfer
/// operates on.
#[derive(Debug)]
pub struct Session {
    channel: ChannelId,
    options: SyncOptions,
    args: Vec<String>,
    phases: PhaseSet,
    negotiation: Option<Negotiation>,
    checksum_seed: i32,
    filters: Vec<String>,
}

impl Session {
    /// A fresh session for `channel` with the client's requested options and
    /// path arguments.
    #[must_use]
    pub fn new(channel: ChannelId, options: SyncOptions, args: Vec<String>) -> Self {
        Self {
            channel,
            options,
            args,
            phases: PhaseSet::new(),
            negotiation: None,
            checksum_seed: 0,
            filters: Vec::new(),
        }
    }

    /// The channel this session belongs to.
    #[must_use]
    pub const fn channel(&self) -> ChannelId {
        self.channel
    }

    /// The client's requested options; never mutated after open.
    #[must_use]
    pub const fn options(&self) -> &SyncOptions {
        &self.options
    }

    /// The non-option path arguments.
    #[must_use]
    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// The completed handshake phases.
    #[must_use]
    pub const fn phases(&self) -> PhaseSet {
        self.phases
    }

    /// Marks `phase` complete; each phase completes exactly once.
    pub fn complete_phase(&mut self, phase: Phase) {
        self.phases.complete(phase);
    }

    /// The negotiation outcome, once the version phase has run.
    #[must_use]
    pub const fn negotiation(&self) -> Option<&Negotiation> {
        self.negotiation.as_ref()
    }

    /// The negotiated protocol version, or our native version before the
    /// version phase has run.
    #[must_use]
    pub fn version(&self) -> i32 {
        self.negotiation
            .map_or(protocol::PROTOCOL_VERSION, |negotiation| negotiation.version)
    }

    /// Records the outcome of the version phase.
    pub fn set_negotiation(&mut self, negotiation: Negotiation) {
        self.negotiation = Some(negotiation);
    }

    /// The session's checksum seed.
    #[must_use]
    pub const fn checksum_seed(&self) -> i32 {
        self.checksum_seed
    }

    /// Records the checksum seed.
    pub const fn set_checksum_seed(&mut self, seed: i32) {
        self.checksum_seed = seed;
    }

    /// The filter rules read from the peer.
    #[must_use]
    pub fn filters(&self) -> &[String] {
        &self.filters
    }

    /// Appends one filter rule.
    pub fn push_filter(&mut self, rule: String) {
        self.filters.push(rule);
    }
}
