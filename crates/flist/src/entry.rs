//! Manifest entries and the filesystem collaborator that feeds them.

use std::io;
use std::path::{Path, PathBuf};

use tracing::trace;

use crate::FileListError;

/// File-type bits of a mode word, matching POSIX `st_mode` layout.
pub mod mode {
    /// Mask selecting the file-type bits.
    pub const S_IFMT: u32 = 0o170_000;
    /// Regular file.
    pub const S_IFREG: u32 = 0o100_000;
    /// Directory.
    pub const S_IFDIR: u32 = 0o040_000;
    /// Symbolic link.
    pub const S_IFLNK: u32 = 0o120_000;
    /// Character device.
    pub const S_IFCHR: u32 = 0o020_000;
    /// Block device.
    pub const S_IFBLK: u32 = 0o060_000;
    /// Named pipe.
    pub const S_IFIFO: u32 = 0o010_000;
    /// Socket.
    pub const S_IFSOCK: u32 = 0o140_000;
}

/// Metadata for one path, as reported by the [`Filesystem`] collaborator.
#[derive(Debug, Clone, Copy, Default)]
pub struct Metadata {
    /// File length in bytes.
    pub size: u64,
    /// Modification time, seconds since the epoch.
    pub mtime: i64,
    /// Type and permission bits.
    pub mode: u32,
    /// Owner id.
    pub uid: u32,
    /// Group id.
    pub gid: u32,
    /// Device major number, for device nodes.
    pub rdev_major: u32,
    /// Device minor number, for device nodes.
    pub rdev_minor: u32,
}

/// Path resolution and stat retrieval, supplied by the embedding program.
///
/// Lookups never follow the final symlink: a link entry describes the link
/// itself.
pub trait Filesystem {
    /// Resolves `path` to the canonical form entries are named by.
    fn canonical(&self, path: &Path) -> io::Result<PathBuf>;

    /// Retrieves metadata for `path`.
    fn metadata(&self, path: &Path) -> io::Result<Metadata>;
}

/// Entry-level flags, set at creation and refined by the diff step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EntryFlags(u16);

impl EntryFlags {
    /// Transfer-root directory.
    pub const TOP_DIR: Self = Self(1 << 0);
    /// Directory whose contents are part of the transfer.
    pub const CONTENT_DIR: Self = Self(1 << 1);
    /// The canonical path exceeds 255 bytes.
    pub const LONG_NAME: Self = Self(1 << 2);

    /// Whether every bit of `other` is set in `self`.
    #[must_use]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// The union of `self` and `other`.
    #[must_use]
    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }
}

/// One file in the manifest.
#[derive(Debug, Clone)]
pub struct Entry {
    name: Vec<u8>,
    metadata: Metadata,
    flags: EntryFlags,
}

impl Entry {
    /// Captures `path` as a manifest entry through `fs`.
    ///
    /// Directories additionally get the top-dir and content-dir flags, which
    /// the diff step refines per protocol version.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` for an empty path; `NotFound` or `Io` when the
    /// collaborator cannot resolve or stat the path.
    pub fn create(
        fs: &dyn Filesystem,
        path: &Path,
        flags: EntryFlags,
    ) -> Result<Self, FileListError> {
        if path.as_os_str().is_empty() {
            return Err(FileListError::InvalidArgument("empty path"));
        }

        let canonical = fs
            .canonical(path)
            .map_err(|err| FileListError::from_fs(path, err))?;
        let metadata = fs
            .metadata(&canonical)
            .map_err(|err| FileListError::from_fs(&canonical, err))?;

        let name = canonical.into_os_string().into_encoded_bytes();
        let mut flags = flags;
        if metadata.mode & mode::S_IFMT == mode::S_IFDIR {
            flags = flags.union(EntryFlags::TOP_DIR).union(EntryFlags::CONTENT_DIR);
        }
        if name.len() > 255 {
            flags = flags.union(EntryFlags::LONG_NAME);
        }

        trace!(
            path = %String::from_utf8_lossy(&name),
            mode = format_args!("{:o}", metadata.mode),
            "created manifest entry"
        );
        Ok(Self {
            name,
            metadata,
            flags,
        })
    }

    /// Builds an entry directly from its fields, without filesystem access.
    #[must_use]
    pub const fn from_parts(name: Vec<u8>, metadata: Metadata, flags: EntryFlags) -> Self {
        Self {
            name,
            metadata,
            flags,
        }
    }

    /// The canonical path bytes this entry is named by.
    #[must_use]
    pub fn name(&self) -> &[u8] {
        &self.name
    }

    /// The entry's metadata.
    #[must_use]
    pub const fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    /// Entry-level flags.
    #[must_use]
    pub const fn flags(&self) -> EntryFlags {
        self.flags
    }

    /// Whether the entry is a directory.
    #[must_use]
    pub const fn is_dir(&self) -> bool {
        self.metadata.mode & mode::S_IFMT == mode::S_IFDIR
    }

    /// Whether the entry is a block or character device.
    #[must_use]
    pub const fn is_device(&self) -> bool {
        matches!(self.metadata.mode & mode::S_IFMT, mode::S_IFCHR | mode::S_IFBLK)
    }

    /// Whether the entry is a fifo or socket.
    #[must_use]
    pub const fn is_special(&self) -> bool {
        matches!(self.metadata.mode & mode::S_IFMT, mode::S_IFIFO | mode::S_IFSOCK)
    }
}

/// [`Filesystem`] backed by the local machine.
///
/// `canonical` resolves the parent directory only, so symlink entries name
/// the link rather than its target; `metadata` is an lstat.
#[cfg(unix)]
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalFs;

#[cfg(unix)]
impl Filesystem for LocalFs {
    fn canonical(&self, path: &Path) -> io::Result<PathBuf> {
        match (path.parent(), path.file_name()) {
            (Some(parent), Some(name)) if !parent.as_os_str().is_empty() => {
                Ok(std::fs::canonicalize(parent)?.join(name))
            }
            _ => std::fs::canonicalize(path),
        }
    }

    fn metadata(&self, path: &Path) -> io::Result<Metadata> {
        use std::os::unix::fs::MetadataExt;

        let st = std::fs::symlink_metadata(path)?;
        let rdev = st.rdev();
        Ok(Metadata {
            size: st.size(),
            mtime: st.mtime(),
            mode: st.mode(),
            uid: st.uid(),
            gid: st.gid(),
            rdev_major: ((rdev >> 8) & 0xFFF) as u32,
            rdev_minor: (rdev & 0xFF) as u32,
        })
    }
}
