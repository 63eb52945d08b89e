//! Id-to-name tables transmitted after the entry list.
//!
//! Entry records carry numeric owner and group ids; the display names behind
//! them travel once, in two tables appended to the manifest. Each table lists
//! its records in insertion order and is terminated by the reserved id 0,
//! which is why that id can never be added.

use protocol::varint::{read_varint, write_varint};
use protocol::{MsgReader, MsgWriter, ProtocolError, SyncOptions};
use rustc_hash::FxHashMap;
use tracing::trace;

use crate::FileListError;

/// Maps numeric ids to display names, supplied by the embedding program.
///
/// `None` means the id has no known name; the entry then travels numeric-only.
pub trait IdResolver {
    /// Display name for a user id.
    fn user_name(&self, uid: u32) -> Option<String>;

    /// Display name for a group id.
    fn group_name(&self, gid: u32) -> Option<String>;
}

/// One id-keyed table of display names, remembering insertion order.
#[derive(Debug, Default)]
pub struct NameTable {
    order: Vec<u32>,
    names: FxHashMap<u32, Vec<u8>>,
}

impl NameTable {
    /// Number of records in the table.
    #[must_use]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Whether the table holds no records.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Whether `id` is already recorded.
    #[must_use]
    pub fn contains(&self, id: u32) -> bool {
        self.names.contains_key(&id)
    }

    /// The recorded name for `id`, if present.
    #[must_use]
    pub fn get(&self, id: u32) -> Option<&[u8]> {
        self.names.get(&id).map(Vec::as_slice)
    }

    /// Records `name` for `id`.
    ///
    /// Names longer than 255 bytes are truncated to fit the one-byte length
    /// field.
    ///
    /// # Errors
    ///
    /// `PermissionDenied` for the reserved id 0, `AlreadyExists` for an id
    /// that was recorded before.
    pub fn add(&mut self, id: u32, name: &str) -> Result<&[u8], FileListError> {
        if id == 0 {
            return Err(FileListError::PermissionDenied(0));
        }
        if self.names.contains_key(&id) {
            return Err(FileListError::AlreadyExists(id));
        }

        let mut bytes = name.as_bytes().to_vec();
        bytes.truncate(255);
        self.order.push(id);
        Ok(self.names.entry(id).or_insert(bytes))
    }

    /// Records in insertion order.
    fn records(&self) -> impl Iterator<Item = (u32, &[u8])> {
        self.order
            .iter()
            .filter_map(|id| self.names.get(id).map(|name| (*id, name.as_slice())))
    }
}

/// The user and group tables for one manifest.
///
/// Owned by the manifest builder; dropping the tables releases every record.
#[derive(Debug, Default)]
pub struct NameTables {
    users: NameTable,
    groups: NameTable,
}

impl NameTables {
    /// Empty tables.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The user table.
    #[must_use]
    pub const fn users(&self) -> &NameTable {
        &self.users
    }

    /// The group table.
    #[must_use]
    pub const fn groups(&self) -> &NameTable {
        &self.groups
    }

    /// Records the display name for `uid`, resolving it through `resolver`.
    ///
    /// Returns the recorded name, or `None` when the id is reserved, already
    /// recorded, or unknown to the resolver.
    pub fn add_user(&mut self, uid: u32, resolver: &dyn IdResolver) -> Option<&[u8]> {
        if uid == 0 || self.users.contains(uid) {
            return None;
        }
        let name = resolver.user_name(uid)?;
        match self.users.add(uid, &name) {
            Ok(name) => Some(name),
            Err(_) => None,
        }
    }

    /// Records the display name for `gid`, resolving it through `resolver`.
    pub fn add_group(&mut self, gid: u32, resolver: &dyn IdResolver) -> Option<&[u8]> {
        if gid == 0 || self.groups.contains(gid) {
            return None;
        }
        let name = resolver.group_name(gid)?;
        match self.groups.add(gid, &name) {
            Ok(name) => Some(name),
            Err(_) => None,
        }
    }

    /// Appends the table section of the manifest.
    ///
    /// Each table is emitted only when its governing preserve option (or ACL
    /// preservation) is on: records in insertion order, each as the id (fixed
    /// 32-bit below protocol 30, adaptive otherwise), a one-byte name length,
    /// and the name bytes, with a terminating id 0.
    pub fn encode(
        &self,
        writer: &mut MsgWriter<'_>,
        version: i32,
        options: &SyncOptions,
    ) -> Result<(), ProtocolError> {
        if options.preserve_uid || options.preserve_acls {
            Self::encode_table(&self.users, writer, version)?;
            trace!(records = self.users.len(), "sent user name table");
        }
        if options.preserve_gid || options.preserve_acls {
            Self::encode_table(&self.groups, writer, version)?;
            trace!(records = self.groups.len(), "sent group name table");
        }
        Ok(())
    }

    fn encode_table(
        table: &NameTable,
        writer: &mut MsgWriter<'_>,
        version: i32,
    ) -> Result<(), ProtocolError> {
        for (id, name) in table.records() {
            Self::encode_id(writer, version, id as i32)?;
            writer.write_byte(name.len() as u8)?;
            writer.write_data(name)?;
        }
        Self::encode_id(writer, version, 0)
    }

    fn encode_id(
        writer: &mut MsgWriter<'_>,
        version: i32,
        id: i32,
    ) -> Result<(), ProtocolError> {
        if version < 30 {
            writer.write_int(id)
        } else {
            write_varint(writer, id)
        }
    }
}

/// Reads one name table: records until a terminating id 0.
pub(crate) fn decode_table(
    reader: &mut MsgReader<'_>,
    version: i32,
) -> Result<Vec<(u32, Vec<u8>)>, ProtocolError> {
    let mut records = Vec::new();
    loop {
        let id = if version < 30 {
            reader.read_int()?
        } else {
            read_varint(reader)?
        };
        if id == 0 {
            return Ok(records);
        }
        let len = usize::from(reader.read_byte()?);
        let name = reader.read_data(len)?.to_vec();
        records.push((id as u32, name));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct StaticResolver;

    impl IdResolver for StaticResolver {
        fn user_name(&self, uid: u32) -> Option<String> {
            match uid {
                1000 => Some("alice".into()),
                1001 => Some("bob".into()),
                _ => None,
            }
        }

        fn group_name(&self, gid: u32) -> Option<String> {
            (gid == 100).then(|| "users".into())
        }
    }

    #[test]
    fn reserved_id_is_rejected() {
        let mut table = NameTable::default();
        let err = table.add(0, "root").unwrap_err();
        assert!(matches!(err, FileListError::PermissionDenied(0)));
        assert!(table.is_empty());
    }

    #[test]
    fn duplicate_id_is_rejected() {
        let mut table = NameTable::default();
        table.add(1000, "alice").unwrap();
        let err = table.add(1000, "other").unwrap_err();
        assert!(matches!(err, FileListError::AlreadyExists(1000)));
        assert_eq!(table.get(1000), Some(&b"alice"[..]));
    }

    #[test]
    fn unknown_ids_are_not_recorded() {
        let mut tables = NameTables::new();
        assert!(tables.add_user(4242, &StaticResolver).is_none());
        assert!(tables.users().is_empty());
    }

    #[test]
    fn encode_preserves_insertion_order() {
        let mut tables = NameTables::new();
        tables.add_user(1001, &StaticResolver).unwrap();
        tables.add_user(1000, &StaticResolver).unwrap();

        let options = SyncOptions {
            preserve_uid: true,
            ..SyncOptions::default()
        };
        let mut buf = [0u8; 64];
        let mut writer = MsgWriter::new(&mut buf);
        tables.encode(&mut writer, 30, &options).unwrap();

        let mut reader = MsgReader::new(writer.as_slice());
        let records = decode_table(&mut reader, 30).unwrap();
        assert_eq!(
            records,
            vec![(1001, b"bob".to_vec()), (1000, b"alice".to_vec())]
        );
        assert!(reader.is_empty());
    }

    #[test]
    fn tables_are_omitted_when_not_preserved() {
        let mut tables = NameTables::new();
        tables.add_user(1000, &StaticResolver).unwrap();
        tables.add_group(100, &StaticResolver).unwrap();

        let mut buf = [0u8; 64];
        let mut writer = MsgWriter::new(&mut buf);
        tables
            .encode(&mut writer, 30, &SyncOptions::default())
            .unwrap();
        assert_eq!(writer.written(), 0);
    }

    #[test]
    fn acl_preservation_forces_both_tables() {
        let tables = NameTables::new();
        let options = SyncOptions {
            preserve_acls: true,
            ..SyncOptions::default()
        };
        let mut buf = [0u8; 16];
        let mut writer = MsgWriter::new(&mut buf);
        tables.encode(&mut writer, 30, &options).unwrap();
        // Two empty tables: just the terminators.
        assert_eq!(writer.as_slice(), &[0, 0]);
    }

    #[test]
    fn legacy_ids_use_fixed_width() {
        let mut tables = NameTables::new();
        tables.add_group(100, &StaticResolver).unwrap();

        let options = SyncOptions {
            preserve_gid: true,
            ..SyncOptions::default()
        };
        let mut buf = [0u8; 32];
        let mut writer = MsgWriter::new(&mut buf);
        tables.encode(&mut writer, 29, &options).unwrap();

        // Fixed i32 id, length byte, name, fixed i32 terminator.
        assert_eq!(
            writer.as_slice(),
            &[100, 0, 0, 0, 5, b'u', b's', b'e', b'r', b's', 0, 0, 0, 0]
        );
    }

    #[test]
    fn overlong_names_are_truncated() {
        let mut table = NameTable::default();
        let long = "n".repeat(300);
        let name = table.add(7, &long).unwrap();
        assert_eq!(name.len(), 255);
    }
}
