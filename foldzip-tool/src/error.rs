use std::path::{Path, PathBuf};
use thiserror::Error;

/// Low-level cause behind a failed archive write.
#[derive(Error, Debug)]
pub enum WriteFailure {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Zip(#[from] async_zip::error::ZipError),
}

#[derive(Error, Debug)]
pub enum ArchiveError {
    // Fatal for the whole run
    #[error("root directory {path:?} cannot be listed")]
    RootNotFound {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // Recovered per entry / per folder
    #[error("cannot inspect {path:?}")]
    EntryAccess {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot remove stale archive {path:?}")]
    Deletion {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot read {path:?}, skipped")]
    Walk {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot write archive {path:?}")]
    ArchiveWrite {
        path: PathBuf,
        #[source]
        source: WriteFailure,
    },
}

impl ArchiveError {
    pub fn archive_write(path: &Path, source: impl Into<WriteFailure>) -> Self {
        Self::ArchiveWrite {
            path: path.to_path_buf(),
            source: source.into(),
        }
    }

    /// The path this error occurred at.
    pub fn path(&self) -> &Path {
        match self {
            Self::RootNotFound { path, .. }
            | Self::EntryAccess { path, .. }
            | Self::Deletion { path, .. }
            | Self::Walk { path, .. }
            | Self::ArchiveWrite { path, .. } => path,
        }
    }
}
