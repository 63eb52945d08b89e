use std::io;

use thiserror::Error;

/// Fatal wire-protocol failures.
///
/// Every variant terminates the owning session: wire data originates from a
/// possibly hostile peer, so malformed or truncated input is never retried or
/// partially accepted. Locally recoverable conditions (bad caller arguments,
/// duplicate name-table ids) live in the higher-layer error types instead.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// A read requested more bytes than the remaining input span holds.
    #[error("unable to read {needed} bytes from {available} byte buffer")]
    BufferUnderflow {
        /// Bytes the caller asked for.
        needed: usize,
        /// Bytes left in the span.
        available: usize,
    },

    /// A write would exceed the remaining capacity of the output span.
    #[error("unable to write {needed} bytes to {available} byte buffer")]
    BufferOverflow {
        /// Bytes the caller tried to append.
        needed: usize,
        /// Capacity left in the span.
        available: usize,
    },

    /// An adaptive-length integer required more bytes than its scheme allows.
    #[error("overflow decoding adaptive-length integer ({0})")]
    IntegerOverflow(&'static str),

    /// A length field on the wire was negative or otherwise unusable.
    #[error("invalid length {0} on the wire")]
    InvalidLength(i32),

    /// The negotiated protocol version predates our minimum.
    #[error("protocol version {0} too old (minimum supported is {min})", min = super::PROTOCOL_VERSION_MIN)]
    VersionTooOld(i32),

    /// The negotiated protocol version exceeds our maximum.
    #[error("protocol version {0} too new (maximum supported is {max})", max = super::PROTOCOL_VERSION_MAX)]
    VersionTooNew(i32),

    /// A requested option cannot be carried by the negotiated version.
    #[error("{option} requires protocol version {required} or newer (negotiated {negotiated})")]
    IncompatibleOption {
        /// The offending option, named as the client spells it.
        option: &'static str,
        /// Minimum protocol version that can carry the option.
        required: i32,
        /// The version the handshake settled on.
        negotiated: i32,
    },

    /// A filter rule exceeded the protocol's maximum pattern length.
    #[error("filter rule too long ({0} bytes)")]
    FilterRuleTooLong(usize),

    /// A feature path that is intentionally not implemented was requested.
    #[error("{0} is not implemented")]
    Unsupported(&'static str),

    /// The transport collaborator failed while flushing an assembled buffer.
    #[error("I/O error while {context}")]
    Io {
        /// What the engine was doing when the transport failed.
        context: &'static str,
        /// The underlying transport failure.
        #[source]
        source: io::Error,
    },
}
