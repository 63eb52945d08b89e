//! Entry encoding: diff-flag computation and the wire record writer.

use protocol::varint::{write_varint, write_varlong};
use protocol::{MsgWriter, ProtocolError, SyncOptions};
use tracing::trace;

use crate::entry::{Entry, EntryFlags};
use crate::flags::{
    XMIT_EXTENDED_FLAGS, XMIT_GROUP_NAME_FOLLOWS, XMIT_LONG_NAME, XMIT_NO_CONTENT_DIR,
    XMIT_SAME_GID, XMIT_SAME_MODE, XMIT_SAME_NAME, XMIT_SAME_RDEV_MAJOR, XMIT_SAME_TIME,
    XMIT_SAME_UID, XMIT_TOP_DIR, XMIT_USER_NAME_FOLLOWS,
};
use crate::names::{IdResolver, NameTables};
use crate::state::DiffState;
use crate::FileListError;

/// Wire sizes in protocol 30's adaptive encodings: both sides must agree on
/// the guaranteed byte counts per field.
pub(crate) const SIZE_MIN_BYTES: usize = 3;
pub(crate) const MTIME_MIN_BYTES: usize = 4;

/// The flags the diff step settled on for one entry.
///
/// Besides the wire bits this carries the shared-prefix length the flags were
/// computed against, so the encoder elides exactly the bytes the flags claim.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct XmitFlags {
    bits: u16,
    name_prefix_len: u8,
}

impl XmitFlags {
    /// The raw flag bits.
    #[must_use]
    pub const fn bits(self) -> u16 {
        self.bits
    }

    /// Leading name bytes shared with the previous entry.
    #[must_use]
    pub const fn name_prefix_len(self) -> usize {
        self.name_prefix_len as usize
    }

    /// Whether every bit of `mask` is set.
    #[must_use]
    pub const fn contains(self, mask: u16) -> bool {
        self.bits & mask == mask
    }

    /// Whether the flags need the two-byte field on the wire.
    #[must_use]
    pub const fn is_extended(self) -> bool {
        self.contains(XMIT_EXTENDED_FLAGS)
    }
}

/// Decides which fields of `entry` the wire record elides.
///
/// Pure function of the entry, the carried [`DiffState`], the protocol
/// version, and the negotiated options, except that it advances the diff
/// state to this entry and records freshly seen owner and group names in
/// `names` as its documented side effects.
pub fn compute_xmit_flags(
    entry: &Entry,
    state: &mut DiffState,
    names: &mut NameTables,
    resolver: &dyn IdResolver,
    version: i32,
    options: &SyncOptions,
) -> XmitFlags {
    let meta = entry.metadata();
    let mut bits: u16 = 0;

    if entry.is_dir() {
        if version >= 30 {
            if entry.flags().contains(EntryFlags::CONTENT_DIR) {
                if entry.flags().contains(EntryFlags::TOP_DIR) {
                    bits |= XMIT_TOP_DIR;
                }
            } else {
                // Implied directory: on the path to a transferred file but
                // not itself transferred.
                bits |= XMIT_NO_CONTENT_DIR;
            }
        } else if entry.flags().contains(EntryFlags::TOP_DIR) {
            bits |= XMIT_TOP_DIR;
        }
    }

    if meta.mode == state.last_mode() {
        bits |= XMIT_SAME_MODE;
    } else {
        state.set_last_mode(meta.mode);
    }

    if options.preserve_uid {
        if state.last_uid() == Some(meta.uid) {
            bits |= XMIT_SAME_UID;
        } else {
            state.set_last_uid(meta.uid);
            if !options.numeric_ids
                && version >= 30
                && names.add_user(meta.uid, resolver).is_some()
            {
                bits |= XMIT_USER_NAME_FOLLOWS;
            }
        }
    } else {
        bits |= XMIT_SAME_UID;
    }

    if options.preserve_gid {
        if state.last_gid() == Some(meta.gid) {
            bits |= XMIT_SAME_GID;
        } else {
            state.set_last_gid(meta.gid);
            if !options.numeric_ids
                && version >= 30
                && names.add_group(meta.gid, resolver).is_some()
            {
                bits |= XMIT_GROUP_NAME_FOLLOWS;
            }
        }
    } else {
        bits |= XMIT_SAME_GID;
    }

    if meta.mtime == state.last_mtime() {
        bits |= XMIT_SAME_TIME;
    } else {
        state.set_last_mtime(meta.mtime);
    }

    if wants_rdev(entry, options) {
        if state.last_rdev_major() == Some(meta.rdev_major) {
            bits |= XMIT_SAME_RDEV_MAJOR;
        } else {
            state.set_last_rdev_major(meta.rdev_major);
        }
    }

    let prefix = state.common_prefix_len(entry.name());
    if prefix > 0 {
        bits |= XMIT_SAME_NAME;
    }
    if entry.name().len() - prefix > 255 {
        bits |= XMIT_LONG_NAME;
    }
    state.set_last_name(entry.name());

    // The flags field may never be all-zero on the wire: a zero byte is the
    // end-of-list marker.
    if version >= 28 {
        if bits == 0 && !entry.is_dir() {
            bits |= XMIT_TOP_DIR;
        }
        if bits & 0xFF00 != 0 || bits == 0 {
            bits |= XMIT_EXTENDED_FLAGS;
        }
    } else if bits & 0xFF == 0 {
        bits |= if entry.is_dir() {
            XMIT_LONG_NAME
        } else {
            XMIT_TOP_DIR
        };
    }

    XmitFlags {
        bits,
        name_prefix_len: prefix as u8,
    }
}

fn wants_rdev(entry: &Entry, options: &SyncOptions) -> bool {
    (options.preserve_devices && entry.is_device())
        || (options.preserve_specials && entry.is_special())
}

/// Writes one entry record in its wire form.
///
/// Layout, in order: the flags field (one byte, or two when extended), the
/// shared-prefix length byte when SAME_NAME, the suffix length (adaptive when
/// LONG_NAME, one byte otherwise), the suffix bytes, the size, then mtime,
/// mode, owner, and group unless their SAME bits elide them, with inline
/// display names after ids whose name-follows bits are set, and the device
/// numbers for device and special entries. Returns the bytes written.
///
/// # Errors
///
/// `Unsupported` for features this engine refuses to emit (hard-link
/// tracking, ACL and xattr payloads, the legacy 64-bit length extension);
/// these disconnect rather than produce a record the peer would misparse.
pub fn encode_entry(
    writer: &mut MsgWriter<'_>,
    entry: &Entry,
    xflags: XmitFlags,
    names: &NameTables,
    version: i32,
    options: &SyncOptions,
) -> Result<usize, FileListError> {
    let meta = entry.metadata();

    if options.preserve_hard_links && !entry.is_dir() {
        return Err(ProtocolError::Unsupported("hard-link tracking").into());
    }
    if options.preserve_acls {
        return Err(ProtocolError::Unsupported("ACL payloads").into());
    }
    if options.preserve_xattrs {
        return Err(ProtocolError::Unsupported("extended attribute payloads").into());
    }
    if version < 30 && meta.size > u64::from(u32::MAX) {
        return Err(ProtocolError::Unsupported("64-bit length extension").into());
    }

    let start = writer.written();

    if xflags.is_extended() {
        writer.write_short(xflags.bits())?;
    } else {
        writer.write_byte(xflags.bits() as u8)?;
    }

    let prefix = xflags.name_prefix_len();
    let suffix = &entry.name()[prefix..];
    if xflags.contains(XMIT_SAME_NAME) {
        writer.write_byte(prefix as u8)?;
    }
    if xflags.contains(XMIT_LONG_NAME) {
        write_varint(writer, suffix.len() as i32)?;
    } else {
        writer.write_byte(suffix.len() as u8)?;
    }
    writer.write_data(suffix)?;

    if version >= 30 {
        write_varlong(writer, meta.size as i64, SIZE_MIN_BYTES)?;
    } else {
        write_varint(writer, meta.size as i32)?;
    }

    if !xflags.contains(XMIT_SAME_TIME) {
        if version >= 30 {
            write_varlong(writer, meta.mtime, MTIME_MIN_BYTES)?;
        } else {
            writer.write_int(meta.mtime as i32)?;
        }
    }

    if !xflags.contains(XMIT_SAME_MODE) {
        writer.write_int(meta.mode as i32)?;
    }

    if options.preserve_uid && !xflags.contains(XMIT_SAME_UID) {
        if version < 30 {
            writer.write_int(meta.uid as i32)?;
        } else {
            write_varint(writer, meta.uid as i32)?;
            if xflags.contains(XMIT_USER_NAME_FOLLOWS) {
                write_inline_name(writer, names.users().get(meta.uid))?;
            }
        }
    }

    if options.preserve_gid && !xflags.contains(XMIT_SAME_GID) {
        if version < 30 {
            writer.write_int(meta.gid as i32)?;
        } else {
            write_varint(writer, meta.gid as i32)?;
            if xflags.contains(XMIT_GROUP_NAME_FOLLOWS) {
                write_inline_name(writer, names.groups().get(meta.gid))?;
            }
        }
    }

    if wants_rdev(entry, options) {
        if !xflags.contains(XMIT_SAME_RDEV_MAJOR) {
            encode_rdev_part(writer, version, meta.rdev_major)?;
        }
        encode_rdev_part(writer, version, meta.rdev_minor)?;
    }

    let written = writer.written() - start;
    trace!(
        name = %String::from_utf8_lossy(entry.name()),
        flags = format_args!("{:#06x}", xflags.bits()),
        written,
        "encoded manifest entry"
    );
    Ok(written)
}

fn write_inline_name(
    writer: &mut MsgWriter<'_>,
    name: Option<&[u8]>,
) -> Result<(), ProtocolError> {
    // The name-follows flag is only set for ids the table resolved.
    let name = name.unwrap_or_default();
    writer.write_byte(name.len() as u8)?;
    writer.write_data(name)
}

fn encode_rdev_part(
    writer: &mut MsgWriter<'_>,
    version: i32,
    value: u32,
) -> Result<(), ProtocolError> {
    if version < 30 {
        writer.write_int(value as i32)
    } else {
        write_varint(writer, value as i32)
    }
}
