//! Wire flag bits for manifest entry records.
//!
//! The flags field leads every entry record and announces which fields were
//! elided because they match the previous entry. Bits 0-7 travel in the first
//! byte; when [`XMIT_EXTENDED_FLAGS`] is set (protocol 28 and newer) a second
//! byte carries bits 8-15.

/// Entry is a transfer-root directory.
pub const XMIT_TOP_DIR: u16 = 1 << 0;

/// Mode matches the previous entry; no mode field follows.
pub const XMIT_SAME_MODE: u16 = 1 << 1;

/// A second flags byte follows the first.
pub const XMIT_EXTENDED_FLAGS: u16 = 1 << 2;

/// Owner id matches the previous entry (or owners are not preserved).
pub const XMIT_SAME_UID: u16 = 1 << 3;

/// Group id matches the previous entry (or groups are not preserved).
pub const XMIT_SAME_GID: u16 = 1 << 4;

/// The name shares a prefix with the previous entry; a prefix-length byte
/// follows the flags.
pub const XMIT_SAME_NAME: u16 = 1 << 5;

/// The name suffix exceeds 255 bytes; its length is an adaptive integer
/// rather than one byte.
pub const XMIT_LONG_NAME: u16 = 1 << 6;

/// Modification time matches the previous entry; no mtime field follows.
pub const XMIT_SAME_TIME: u16 = 1 << 7;

/// Device major number matches the previous device entry.
pub const XMIT_SAME_RDEV_MAJOR: u16 = 1 << 8;

/// Directory whose contents are not being transferred (protocol 30+).
///
/// Shares its bit with [`XMIT_SAME_RDEV_MAJOR`]; the entry's mode
/// disambiguates.
pub const XMIT_NO_CONTENT_DIR: u16 = 1 << 8;

/// The owner's display name follows the uid (protocol 30+).
pub const XMIT_USER_NAME_FOLLOWS: u16 = 1 << 10;

/// The group's display name follows the gid (protocol 30+).
pub const XMIT_GROUP_NAME_FOLLOWS: u16 = 1 << 11;
