//! Manifest assembly: from path arguments to one flushed buffer.

use protocol::{ChannelId, MsgWriter, ProtocolError, SyncOptions, Transport};
use tracing::{debug, trace, warn};

use crate::entry::{Entry, EntryFlags, Filesystem};
use crate::names::{IdResolver, NameTables};
use crate::state::DiffState;
use crate::write::{compute_xmit_flags, encode_entry};
use crate::FileListError;

/// Glob matching for filter rules, supplied by the embedding program.
///
/// Matching must treat path separators and a leading period as significant,
/// the way shell filename expansion does.
pub trait FilterMatcher {
    /// Whether `path` matches the filter `pattern`.
    fn matches(&self, pattern: &str, path: &str) -> bool;
}

/// Assembles and sends the file manifest for one session.
///
/// Walks the session's path arguments, drops paths the filter rules exclude,
/// diff-encodes the surviving entries, appends the end-of-list marker, the
/// name tables, and (below protocol 30) the legacy io-error flag, then
/// flushes the whole buffer through the transport in one send.
#[derive(Debug)]
pub struct ManifestBuilder<'a> {
    version: i32,
    options: &'a SyncOptions,
    state: DiffState,
    names: NameTables,
}

impl<'a> ManifestBuilder<'a> {
    /// A builder for one manifest at the negotiated `version`.
    #[must_use]
    pub fn new(version: i32, options: &'a SyncOptions) -> Self {
        Self {
            version,
            options,
            state: DiffState::new(),
            names: NameTables::new(),
        }
    }

    /// Builds the manifest for `args` and sends it on `channel`.
    ///
    /// A path the filters exclude is skipped silently; a path whose metadata
    /// cannot be read is skipped with a warning. Returns the number of
    /// entries sent.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` for an empty path argument, `Protocol` for encoding
    /// failures, `Io` when the transport rejects the assembled buffer.
    pub fn send(
        &mut self,
        channel: ChannelId,
        transport: &mut dyn Transport,
        fs: &dyn Filesystem,
        resolver: &dyn IdResolver,
        matcher: &dyn FilterMatcher,
        filters: &[String],
        args: &[String],
    ) -> Result<usize, FileListError> {
        let mut entries = Vec::with_capacity(args.len());
        for arg in args {
            if excluded(matcher, filters, arg) {
                trace!(path = %arg, "path excluded by filters");
                continue;
            }
            match Entry::create(fs, arg.as_ref(), EntryFlags::default()) {
                Ok(entry) => entries.push(entry),
                Err(err @ FileListError::InvalidArgument(_)) => return Err(err),
                Err(err) => {
                    warn!(path = %arg, error = %err, "skipping manifest entry");
                }
            }
        }

        // Worst case per record: two flag bytes, adaptive length fields, the
        // fixed mode, uid and gid each trailed by an inline name, both device
        // fields, plus up to two fresh name-table records further on. That
        // sums to under 1100 bytes beyond the name itself; the flat slack
        // covers the marker ints and table terminators.
        let capacity = 64
            + entries
                .iter()
                .map(|ent| ent.name().len() + 1100)
                .sum::<usize>();
        let mut buf = vec![0u8; capacity];
        let mut writer = MsgWriter::new(&mut buf);

        for entry in &entries {
            let xflags = compute_xmit_flags(
                entry,
                &mut self.state,
                &mut self.names,
                resolver,
                self.version,
                self.options,
            );
            encode_entry(
                &mut writer,
                entry,
                xflags,
                &self.names,
                self.version,
                self.options,
            )?;
        }

        // End-of-manifest marker.
        writer.write_int(0)?;

        self.names.encode(&mut writer, self.version, self.options)?;

        if self.version < 30 {
            // Legacy io-error flag.
            writer.write_int(0)?;
        }

        let assembled = writer.as_slice();
        transport
            .send(channel, assembled)
            .map_err(|source| ProtocolError::Io {
                context: "sending file manifest",
                source,
            })?;

        debug!(entries = entries.len(), bytes = assembled.len(), "sent file manifest");
        Ok(entries.len())
    }

    /// The name tables accumulated so far.
    #[must_use]
    pub const fn names(&self) -> &NameTables {
        &self.names
    }
}

/// First matching rule excludes the path; no match keeps it.
fn excluded(matcher: &dyn FilterMatcher, filters: &[String], path: &str) -> bool {
    filters.iter().any(|rule| {
        trace!(path = %path, rule = %rule, "matching against filter rule");
        matcher.matches(rule, path)
    })
}
