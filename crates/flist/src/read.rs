//! Entry decoding: the receiver-side inverse of [`encode_entry`].
//!
//! [`encode_entry`]: crate::write::encode_entry

use protocol::varint::{read_varint, read_varlong};
use protocol::{MsgReader, ProtocolError, SyncOptions};

use crate::entry::mode::{S_IFBLK, S_IFCHR, S_IFDIR, S_IFIFO, S_IFMT, S_IFSOCK};
use crate::flags::{
    XMIT_EXTENDED_FLAGS, XMIT_GROUP_NAME_FOLLOWS, XMIT_LONG_NAME, XMIT_SAME_GID, XMIT_SAME_MODE,
    XMIT_SAME_NAME, XMIT_SAME_RDEV_MAJOR, XMIT_SAME_TIME, XMIT_SAME_UID, XMIT_USER_NAME_FOLLOWS,
};
use crate::names::decode_table;
use crate::state::DiffState;
use crate::write::{MTIME_MIN_BYTES, SIZE_MIN_BYTES};
use crate::FileListError;

/// One entry reconstructed from the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedEntry {
    /// Full path bytes, with any shared prefix reapplied.
    pub name: Vec<u8>,
    /// File length in bytes.
    pub size: u64,
    /// Modification time.
    pub mtime: i64,
    /// Type and permission bits.
    pub mode: u32,
    /// Owner id (zero when owners are not preserved).
    pub uid: u32,
    /// Group id (zero when groups are not preserved).
    pub gid: u32,
    /// Inline owner name, when the record carried one.
    pub user_name: Option<Vec<u8>>,
    /// Inline group name, when the record carried one.
    pub group_name: Option<Vec<u8>>,
    /// Device major number, for device and special entries.
    pub rdev_major: u32,
    /// Device minor number, for device and special entries.
    pub rdev_minor: u32,
    /// The raw flag bits the record arrived with.
    pub xflags: u16,
}

/// Reads one entry record, or `None` at the end-of-list marker.
///
/// Threads the same [`DiffState`] the encoder used, reconstructing elided
/// fields from it and advancing it to this entry. The end marker is a full
/// zero int; its remaining bytes are consumed here, so the cursor lands on
/// the name tables and [`decode_names`] can follow directly.
pub fn decode_entry(
    reader: &mut MsgReader<'_>,
    state: &mut DiffState,
    version: i32,
    options: &SyncOptions,
) -> Result<Option<DecodedEntry>, FileListError> {
    let first = reader.read_byte()?;
    if first == 0 {
        let residue = reader.read_data(3)?;
        if residue.iter().any(|&byte| byte != 0) {
            let mut raw = [0u8; 4];
            raw[1..].copy_from_slice(residue);
            return Err(ProtocolError::InvalidLength(i32::from_le_bytes(raw)).into());
        }
        return Ok(None);
    }
    let mut xflags = u16::from(first);
    if version >= 28 && xflags & XMIT_EXTENDED_FLAGS != 0 {
        xflags |= u16::from(reader.read_byte()?) << 8;
    }

    let prefix = if xflags & XMIT_SAME_NAME != 0 {
        usize::from(reader.read_byte()?)
    } else {
        0
    };
    if prefix > state.last_name().len() {
        return Err(ProtocolError::InvalidLength(prefix as i32).into());
    }
    let suffix_len = if xflags & XMIT_LONG_NAME != 0 {
        let len = read_varint(reader)?;
        if len < 0 {
            return Err(ProtocolError::InvalidLength(len).into());
        }
        len as usize
    } else {
        usize::from(reader.read_byte()?)
    };

    let mut name = Vec::with_capacity(prefix + suffix_len);
    name.extend_from_slice(&state.last_name()[..prefix]);
    name.extend_from_slice(reader.read_data(suffix_len)?);

    let size = if version >= 30 {
        read_varlong(reader, SIZE_MIN_BYTES)?
    } else {
        i64::from(read_varint(reader)?)
    };
    if size < 0 {
        return Err(ProtocolError::InvalidLength(size as i32).into());
    }

    let mtime = if xflags & XMIT_SAME_TIME != 0 {
        state.last_mtime()
    } else {
        let mtime = if version >= 30 {
            read_varlong(reader, MTIME_MIN_BYTES)?
        } else {
            i64::from(reader.read_int()?)
        };
        state.set_last_mtime(mtime);
        mtime
    };

    let mode = if xflags & XMIT_SAME_MODE != 0 {
        state.last_mode()
    } else {
        let mode = reader.read_int()? as u32;
        state.set_last_mode(mode);
        mode
    };

    let mut user_name = None;
    let uid = if !options.preserve_uid {
        0
    } else if xflags & XMIT_SAME_UID != 0 {
        state.last_uid().unwrap_or(0)
    } else {
        let uid = if version < 30 {
            reader.read_int()? as u32
        } else {
            let uid = read_varint(reader)? as u32;
            if xflags & XMIT_USER_NAME_FOLLOWS != 0 {
                user_name = Some(read_inline_name(reader)?);
            }
            uid
        };
        state.set_last_uid(uid);
        uid
    };

    let mut group_name = None;
    let gid = if !options.preserve_gid {
        0
    } else if xflags & XMIT_SAME_GID != 0 {
        state.last_gid().unwrap_or(0)
    } else {
        let gid = if version < 30 {
            reader.read_int()? as u32
        } else {
            let gid = read_varint(reader)? as u32;
            if xflags & XMIT_GROUP_NAME_FOLLOWS != 0 {
                group_name = Some(read_inline_name(reader)?);
            }
            gid
        };
        state.set_last_gid(gid);
        gid
    };

    let mut rdev_major = 0;
    let mut rdev_minor = 0;
    if wants_rdev(mode, options) {
        rdev_major = if xflags & XMIT_SAME_RDEV_MAJOR != 0 {
            state.last_rdev_major().unwrap_or(0)
        } else {
            let major = decode_rdev_part(reader, version)?;
            state.set_last_rdev_major(major);
            major
        };
        rdev_minor = decode_rdev_part(reader, version)?;
    }

    state.set_last_name(&name);
    Ok(Some(DecodedEntry {
        name,
        size: size as u64,
        mtime,
        mode,
        uid,
        gid,
        user_name,
        group_name,
        rdev_major,
        rdev_minor,
        xflags,
    }))
}

/// Reads the table section that follows the entry list.
///
/// Returns the user and group records; a table whose preserve option is off
/// was never written and comes back empty.
pub fn decode_names(
    reader: &mut MsgReader<'_>,
    version: i32,
    options: &SyncOptions,
) -> Result<(Vec<(u32, Vec<u8>)>, Vec<(u32, Vec<u8>)>), ProtocolError> {
    let users = if options.preserve_uid || options.preserve_acls {
        decode_table(reader, version)?
    } else {
        Vec::new()
    };
    let groups = if options.preserve_gid || options.preserve_acls {
        decode_table(reader, version)?
    } else {
        Vec::new()
    };
    Ok((users, groups))
}

fn read_inline_name(reader: &mut MsgReader<'_>) -> Result<Vec<u8>, ProtocolError> {
    let len = usize::from(reader.read_byte()?);
    Ok(reader.read_data(len)?.to_vec())
}

fn decode_rdev_part(reader: &mut MsgReader<'_>, version: i32) -> Result<u32, ProtocolError> {
    let value = if version < 30 {
        reader.read_int()?
    } else {
        read_varint(reader)?
    };
    Ok(value as u32)
}

fn wants_rdev(mode: u32, options: &SyncOptions) -> bool {
    let kind = mode & S_IFMT;
    if kind == S_IFDIR {
        // Bit 8 means no-content-dir for directories, never a device field.
        return false;
    }
    (options.preserve_devices && matches!(kind, S_IFCHR | S_IFBLK))
        || (options.preserve_specials && matches!(kind, S_IFIFO | S_IFSOCK))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::{mode, Entry, EntryFlags, Metadata};
    use crate::names::{IdResolver, NameTables};
    use crate::write::{compute_xmit_flags, encode_entry};
    use protocol::MsgWriter;

    struct AllNames;

    impl IdResolver for AllNames {
        fn user_name(&self, uid: u32) -> Option<String> {
            Some(format!("user{uid}"))
        }

        fn group_name(&self, gid: u32) -> Option<String> {
            Some(format!("group{gid}"))
        }
    }

    fn entry(name: &[u8], size: u64, mtime: i64, mode_bits: u32, uid: u32, gid: u32) -> Entry {
        Entry::from_parts(
            name.to_vec(),
            Metadata {
                size,
                mtime,
                mode: mode_bits,
                uid,
                gid,
                ..Metadata::default()
            },
            EntryFlags::default(),
        )
    }

    fn round_trip(entries: &[Entry], version: i32, options: &SyncOptions) -> Vec<DecodedEntry> {
        let mut buf = vec![0u8; 4096];
        let mut writer = MsgWriter::new(&mut buf);
        let mut state = DiffState::new();
        let mut names = NameTables::new();
        for ent in entries {
            let flags =
                compute_xmit_flags(ent, &mut state, &mut names, &AllNames, version, options);
            encode_entry(&mut writer, ent, flags, &names, version, options).unwrap();
        }
        writer.write_int(0).unwrap();

        let written = writer.written();
        let mut reader = MsgReader::new(&buf[..written]);
        let mut state = DiffState::new();
        let mut decoded = Vec::new();
        while let Some(ent) = decode_entry(&mut reader, &mut state, version, options).unwrap() {
            decoded.push(ent);
        }
        assert!(reader.is_empty());
        decoded
    }

    #[test]
    fn file_sequence_round_trips_at_version_30() {
        let options = SyncOptions {
            preserve_uid: true,
            preserve_gid: true,
            ..SyncOptions::default()
        };
        let entries = [
            entry(b"dir/a.txt", 5, 1_700_000_000, mode::S_IFREG | 0o644, 1000, 100),
            entry(b"dir/b.txt", 99, 1_700_000_000, mode::S_IFREG | 0o644, 1000, 100),
            entry(b"dir/sub/c", 1 << 40, 1_700_000_500, mode::S_IFREG | 0o600, 1001, 100),
        ];
        let decoded = round_trip(&entries, 30, &options);

        assert_eq!(decoded.len(), 3);
        for (got, want) in decoded.iter().zip(&entries) {
            assert_eq!(got.name, want.name());
            assert_eq!(got.size, want.metadata().size);
            assert_eq!(got.mtime, want.metadata().mtime);
            assert_eq!(got.mode, want.metadata().mode);
            assert_eq!(got.uid, want.metadata().uid);
            assert_eq!(got.gid, want.metadata().gid);
        }
        assert_eq!(decoded[0].user_name.as_deref(), Some(&b"user1000"[..]));
        // Repeated uid: no second inline name.
        assert_eq!(decoded[1].user_name, None);
        assert_eq!(decoded[2].user_name.as_deref(), Some(&b"user1001"[..]));
    }

    #[test]
    fn file_sequence_round_trips_at_version_28() {
        let options = SyncOptions {
            preserve_uid: true,
            ..SyncOptions::default()
        };
        let entries = [
            entry(b"alpha", 1, 1_600_000_000, mode::S_IFREG | 0o644, 500, 0),
            entry(b"beta", 2, 1_600_000_111, mode::S_IFREG | 0o755, 501, 0),
        ];
        let decoded = round_trip(&entries, 28, &options);
        assert_eq!(decoded.len(), 2);
        assert_eq!(decoded[1].name, b"beta");
        assert_eq!(decoded[1].uid, 501);
        // Inline names are a version 30 feature.
        assert_eq!(decoded[1].user_name, None);
    }

    #[test]
    fn long_names_round_trip() {
        let long_name = [b"deep/".to_vec(), vec![b'x'; 400]].concat();
        let options = SyncOptions::default();
        let entries = [
            entry(b"deep/first", 1, 1, mode::S_IFREG | 0o644, 0, 0),
            entry(&long_name, 2, 2, mode::S_IFREG | 0o644, 0, 0),
        ];
        let decoded = round_trip(&entries, 30, &options);
        assert_eq!(decoded[1].name, long_name);
    }

    #[test]
    fn device_entries_carry_their_numbers() {
        let mut dev = entry(b"dev/null", 0, 1, mode::S_IFCHR | 0o666, 0, 0);
        dev = Entry::from_parts(
            dev.name().to_vec(),
            Metadata {
                rdev_major: 1,
                rdev_minor: 3,
                ..*dev.metadata()
            },
            dev.flags(),
        );
        let options = SyncOptions {
            preserve_devices: true,
            ..SyncOptions::default()
        };
        let decoded = round_trip(std::slice::from_ref(&dev), 30, &options);
        assert_eq!(decoded[0].rdev_major, 1);
        assert_eq!(decoded[0].rdev_minor, 3);
    }

    #[test]
    fn end_marker_consumes_its_whole_int() {
        let bytes = 0i32.to_le_bytes();
        let mut reader = MsgReader::new(&bytes);
        let mut state = DiffState::new();
        let decoded =
            decode_entry(&mut reader, &mut state, 30, &SyncOptions::default()).unwrap();
        assert!(decoded.is_none());
        assert!(reader.is_empty());
    }

    #[test]
    fn garbled_end_marker_is_rejected() {
        // A leading zero byte whose int has junk in its upper bytes.
        let bytes = [0u8, 0, 0, 1];
        let mut reader = MsgReader::new(&bytes);
        let mut state = DiffState::new();
        let err =
            decode_entry(&mut reader, &mut state, 30, &SyncOptions::default()).unwrap_err();
        assert!(matches!(
            err,
            FileListError::Protocol(ProtocolError::InvalidLength(_))
        ));
    }

    #[test]
    fn corrupt_prefix_length_is_rejected() {
        // SAME_NAME with a prefix longer than anything seen before.
        let bytes = [XMIT_SAME_NAME as u8, 200, 1, b'x'];
        let mut reader = MsgReader::new(&bytes);
        let mut state = DiffState::new();
        let err = decode_entry(&mut reader, &mut state, 30, &SyncOptions::default()).unwrap_err();
        assert!(matches!(
            err,
            FileListError::Protocol(ProtocolError::InvalidLength(200))
        ));
    }

    #[test]
    fn truncated_record_is_rejected() {
        let options = SyncOptions::default();
        let entries = [entry(b"abc", 7, 9, mode::S_IFREG | 0o644, 0, 0)];

        let mut buf = vec![0u8; 256];
        let mut writer = MsgWriter::new(&mut buf);
        let mut state = DiffState::new();
        let mut names = NameTables::new();
        let flags =
            compute_xmit_flags(&entries[0], &mut state, &mut names, &AllNames, 30, &options);
        encode_entry(&mut writer, &entries[0], flags, &names, 30, &options).unwrap();
        let written = writer.written();

        let mut reader = MsgReader::new(&buf[..written - 1]);
        let mut state = DiffState::new();
        let err = decode_entry(&mut reader, &mut state, 30, &options).unwrap_err();
        assert!(matches!(
            err,
            FileListError::Protocol(ProtocolError::BufferUnderflow { .. })
        ));
    }
}
