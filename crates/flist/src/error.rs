use std::io;
use std::path::PathBuf;

use protocol::ProtocolError;
use thiserror::Error;

/// Failures while building or decoding a file manifest.
///
/// [`Protocol`](FileListError::Protocol) variants are fatal to the session;
/// the rest are reported to the caller, who decides whether to skip the
/// offending entry or give up.
#[derive(Debug, Error)]
pub enum FileListError {
    /// The caller passed an argument the operation cannot work with.
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),

    /// The named path does not exist.
    #[error("no such file or directory: {}", path.display())]
    NotFound {
        /// The path that failed to resolve.
        path: PathBuf,
    },

    /// The id is already present in the name table.
    #[error("id {0} already present in name table")]
    AlreadyExists(u32),

    /// The reserved zero id may never enter a name table.
    #[error("permission denied: id {0} is reserved")]
    PermissionDenied(u32),

    /// A filesystem operation failed for reasons other than absence.
    #[error("I/O error on {}", path.display())]
    Io {
        /// The path the operation touched.
        path: PathBuf,
        /// The underlying filesystem failure.
        #[source]
        source: io::Error,
    },

    /// A wire-level failure; terminates the session.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}

impl FileListError {
    /// Classifies a filesystem failure on `path` into the matching variant.
    pub(crate) fn from_fs(path: &std::path::Path, source: io::Error) -> Self {
        if source.kind() == io::ErrorKind::NotFound {
            Self::NotFound {
                path: path.to_path_buf(),
            }
        } else {
            Self::Io {
                path: path.to_path_buf(),
                source,
            }
        }
    }
}
