//! Protocol version negotiation.
//!
//! Runs once per session at handshake start: read the client's proposed
//! version, answer with ours, settle on the minimum, then vet the requested
//! options against what the settled version can carry.

use tracing::trace;

use crate::ProtocolError;
use crate::msg::{MsgReader, MsgWriter};
use crate::options::{AppendMode, DeleteTiming, SyncOptions};

/// The protocol version this implementation speaks natively.
pub const PROTOCOL_VERSION: i32 = 30;

/// The oldest peer version we will talk to.
pub const PROTOCOL_VERSION_MIN: i32 = 28;

/// The newest peer version we will talk to.
pub const PROTOCOL_VERSION_MAX: i32 = 30;

/// Compatibility bits exchanged after settling on version 30 or newer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CompatFlags(i32);

impl CompatFlags {
    /// Incremental recursion is available.
    pub const INC_RECURSE: i32 = 1 << 0;

    /// Flags as the fixed 32-bit value carried on the wire.
    #[must_use]
    pub const fn bits(self) -> i32 {
        self.0
    }

    /// Whether the incremental-recursion bit is set.
    #[must_use]
    pub const fn incremental_recursion(self) -> bool {
        self.0 & Self::INC_RECURSE != 0
    }

    const fn from_options(options: &SyncOptions) -> Self {
        let mut bits = 0;
        if options.allow_incr_recurse {
            bits |= Self::INC_RECURSE;
        }
        Self(bits)
    }
}

/// The outcome of a successful handshake.
///
/// Requested options are never mutated; anything the settled version forces
/// to change is reported here instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Negotiation {
    /// The protocol version both sides will speak.
    pub version: i32,
    /// Compatibility flags sent to the peer (zero below version 30).
    pub compat: CompatFlags,
    /// The append mode after version normalization.
    pub append: AppendMode,
    /// The effective deletion timing, if deletion was requested.
    pub delete_timing: Option<DeleteTiming>,
}

/// Performs the version handshake.
///
/// Reads the client's fixed 32-bit version proposal from `reader`, appends
/// our own version (and, at version 30 or newer, the compatibility flags) to
/// `writer`, and vets `options` against the settled version.
///
/// # Errors
///
/// Fails when the client version falls outside the supported range or an
/// option requires a newer version than was settled on.
pub fn negotiate(
    reader: &mut MsgReader<'_>,
    writer: &mut MsgWriter<'_>,
    options: &SyncOptions,
) -> Result<Negotiation, ProtocolError> {
    let client_version = reader.read_int()?;
    trace!(client_version, "client sent protocol version");

    writer.write_int(PROTOCOL_VERSION)?;

    let version = client_version.min(PROTOCOL_VERSION);
    if version < PROTOCOL_VERSION_MIN {
        return Err(ProtocolError::VersionTooOld(client_version));
    }
    if version > PROTOCOL_VERSION_MAX {
        return Err(ProtocolError::VersionTooNew(client_version));
    }

    if version < 29 {
        if options.fuzzy_basis {
            return Err(ProtocolError::IncompatibleOption {
                option: "--fuzzy",
                required: 29,
                negotiated: version,
            });
        }
        if options.prune_empty_dirs {
            return Err(ProtocolError::IncompatibleOption {
                option: "--prune-empty-dirs",
                required: 29,
                negotiated: version,
            });
        }
    }

    let mut append = options.append;
    if version < 30 {
        // Older peers cannot express the verifying variant.
        if append == AppendMode::Verify {
            append = AppendMode::Plain;
        }
        if options.preserve_acls {
            return Err(ProtocolError::IncompatibleOption {
                option: "--acls",
                required: 30,
                negotiated: version,
            });
        }
        if options.preserve_xattrs {
            return Err(ProtocolError::IncompatibleOption {
                option: "--xattrs",
                required: 30,
                negotiated: version,
            });
        }
    }

    let delete_timing = if options.delete {
        options.delete_timing.or(Some(if version < 30 {
            DeleteTiming::Before
        } else {
            DeleteTiming::During
        }))
    } else {
        options.delete_timing
    };

    let compat = if version >= 30 {
        let compat = CompatFlags::from_options(options);
        writer.write_int(compat.bits())?;
        trace!(flags = compat.bits(), "sending compatibility flags");
        compat
    } else {
        CompatFlags::default()
    };

    trace!(version, "negotiated protocol version");
    Ok(Negotiation {
        version,
        compat,
        append,
        delete_timing,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(client_version: i32, options: &SyncOptions) -> Result<(Negotiation, Vec<u8>), ProtocolError> {
        let input = client_version.to_le_bytes();
        let mut reader = MsgReader::new(&input);
        let mut buf = [0u8; 8];
        let mut writer = MsgWriter::new(&mut buf);
        let negotiation = negotiate(&mut reader, &mut writer, options)?;
        Ok((negotiation, writer.as_slice().to_vec()))
    }

    #[test]
    fn same_version_settles_on_it_and_exchanges_compat_flags() {
        let (negotiation, sent) = run(30, &SyncOptions::default()).unwrap();
        assert_eq!(negotiation.version, 30);
        assert_eq!(negotiation.compat.bits(), 0);
        // Our version followed by zero compat flags.
        assert_eq!(sent, [30, 0, 0, 0, 0, 0, 0, 0]);
    }

    #[test]
    fn newer_client_is_clamped_to_our_version() {
        let (negotiation, _) = run(35, &SyncOptions::default()).unwrap();
        assert_eq!(negotiation.version, 30);
    }

    #[test]
    fn older_client_keeps_its_version_without_compat_flags() {
        let (negotiation, sent) = run(29, &SyncOptions::default()).unwrap();
        assert_eq!(negotiation.version, 29);
        assert_eq!(sent, [30, 0, 0, 0]);
    }

    #[test]
    fn ancient_client_is_rejected() {
        let err = run(25, &SyncOptions::default()).unwrap_err();
        assert!(matches!(err, ProtocolError::VersionTooOld(25)));
    }

    #[test]
    fn incremental_recursion_sets_the_compat_bit() {
        let options = SyncOptions {
            allow_incr_recurse: true,
            ..SyncOptions::default()
        };
        let (negotiation, sent) = run(30, &options).unwrap();
        assert!(negotiation.compat.incremental_recursion());
        assert_eq!(&sent[4..], [1, 0, 0, 0]);
    }

    #[test]
    fn fuzzy_basis_needs_version_29() {
        let options = SyncOptions {
            fuzzy_basis: true,
            ..SyncOptions::default()
        };
        let err = run(28, &options).unwrap_err();
        assert!(matches!(
            err,
            ProtocolError::IncompatibleOption {
                option: "--fuzzy",
                required: 29,
                ..
            }
        ));
        assert!(run(29, &options).is_ok());
    }

    #[test]
    fn acls_need_version_30() {
        let options = SyncOptions {
            preserve_acls: true,
            ..SyncOptions::default()
        };
        let err = run(29, &options).unwrap_err();
        assert!(matches!(
            err,
            ProtocolError::IncompatibleOption {
                option: "--acls",
                required: 30,
                ..
            }
        ));
    }

    #[test]
    fn append_verify_downgrades_below_30() {
        let options = SyncOptions {
            append: AppendMode::Verify,
            ..SyncOptions::default()
        };
        let (old, _) = run(29, &options).unwrap();
        assert_eq!(old.append, AppendMode::Plain);
        let (new, _) = run(30, &options).unwrap();
        assert_eq!(new.append, AppendMode::Verify);
    }

    #[test]
    fn delete_timing_defaults_follow_the_version() {
        let options = SyncOptions {
            delete: true,
            ..SyncOptions::default()
        };
        let (old, _) = run(29, &options).unwrap();
        assert_eq!(old.delete_timing, Some(DeleteTiming::Before));
        let (new, _) = run(30, &options).unwrap();
        assert_eq!(new.delete_timing, Some(DeleteTiming::During));
    }

    #[test]
    fn explicit_delete_timing_is_preserved() {
        let options = SyncOptions {
            delete: true,
            delete_timing: Some(DeleteTiming::After),
            ..SyncOptions::default()
        };
        let (negotiation, _) = run(29, &options).unwrap();
        assert_eq!(negotiation.delete_timing, Some(DeleteTiming::After));
    }
}
