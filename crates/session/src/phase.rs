//! Handshake phases and the per-session completion set.

use std::fmt;

/// One step of the handshake, in dispatch order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Version exchange and option vetting.
    ProtocolVersion,
    /// Checksum seed sent (sender) or read (receiver).
    ChecksumSeed,
    /// Filter rule list read.
    Filters,
    /// File manifest sent; terminal for the sender role.
    SentManifest,
    /// File data received; terminal for the receiver role.
    ReceivedData,
}

impl Phase {
    const fn bit(self) -> u8 {
        match self {
            Self::ProtocolVersion => 1 << 0,
            Self::ChecksumSeed => 1 << 1,
            Self::Filters => 1 << 2,
            Self::SentManifest => 1 << 3,
            Self::ReceivedData => 1 << 4,
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::ProtocolVersion => "protocol version",
            Self::ChecksumSeed => "checksum seed",
            Self::Filters => "filters",
            Self::SentManifest => "sent manifest",
            Self::ReceivedData => "received data",
        };
        f.write_str(name)
    }
}

/// The set of phases a session has completed.
///
/// Phases accumulate and are never cleared; completing a phase twice is a
/// dispatcher bug and panics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PhaseSet(u8);

impl PhaseSet {
    /// The empty set a fresh session starts with.
    #[must_use]
    pub const fn new() -> Self {
        Self(0)
    }

    /// Whether `phase` has completed.
    #[must_use]
    pub const fn contains(self, phase: Phase) -> bool {
        self.0 & phase.bit() != 0
    }

    /// Marks `phase` complete.
    ///
    /// # Panics
    ///
    /// Panics if `phase` was already completed.
    pub fn complete(&mut self, phase: Phase) {
        assert!(!self.contains(phase), "phase completed twice: {phase}");
        self.0 |= phase.bit();
    }
}
