//! Client-requested transfer options that shape negotiation and encoding.

/// How append-style transfers verify existing destination data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AppendMode {
    /// Appending was not requested.
    #[default]
    Off,
    /// Append without re-checksumming existing data.
    Plain,
    /// Append after verifying existing data against the sender's copy.
    Verify,
}

/// When deletions run relative to the transfer, if deletion was requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteTiming {
    /// Delete extraneous destination files before the transfer.
    Before,
    /// Delete incrementally while the transfer runs.
    During,
    /// Delete after the transfer completes.
    After,
}

/// The option set a client asked for, fixed for the life of a session.
///
/// Negotiation reads these but never writes them back; version-dependent
/// adjustments (append downgrades, delete-timing defaults) are reported in
/// the negotiation result instead.
#[derive(Debug, Clone, Default)]
pub struct SyncOptions {
    /// This side sends files rather than receiving them.
    pub sender: bool,
    /// Recurse into directories.
    pub recurse: bool,
    /// Preserve file owners.
    pub preserve_uid: bool,
    /// Preserve file groups.
    pub preserve_gid: bool,
    /// Preserve device nodes.
    pub preserve_devices: bool,
    /// Preserve special files (fifos, sockets).
    pub preserve_specials: bool,
    /// Preserve POSIX ACLs.
    pub preserve_acls: bool,
    /// Preserve extended attributes.
    pub preserve_xattrs: bool,
    /// Preserve hard links.
    pub preserve_hard_links: bool,
    /// Transmit numeric ids only, never user or group names.
    pub numeric_ids: bool,
    /// Use a similarly named destination file as a delta basis.
    pub fuzzy_basis: bool,
    /// Skip creating directories that would end up empty.
    pub prune_empty_dirs: bool,
    /// Append to shorter destination files instead of rewriting them.
    pub append: AppendMode,
    /// Delete extraneous destination files.
    pub delete: bool,
    /// Explicit delete timing, if the client chose one.
    pub delete_timing: Option<DeleteTiming>,
    /// Permit incremental recursion when the peer also supports it.
    pub allow_incr_recurse: bool,
    /// Seed mixed into block checksums for this session.
    pub checksum_seed: i32,
}
