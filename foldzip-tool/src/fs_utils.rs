use std::{
    ffi::OsStr,
    fs,
    path::{Path, PathBuf},
};

use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::error::ArchiveError;
use crate::naming::{FolderEntry, entry_name, is_archive_name, is_staging_name};
use crate::packaging::FileEntry;

/// Immediate children of the root, classified.
#[derive(Debug, Default)]
pub struct RootListing {
    pub folders: Vec<FolderEntry>,
    /// Children that are not directories; never touched.
    pub others: Vec<PathBuf>,
    pub inaccessible: Vec<ArchiveError>,
}

/// Lists the immediate children of `root`, sorted by name.
///
/// Only a root that cannot be listed at all is an error; children that cannot
/// be classified end up in `inaccessible`.
pub fn list_root(root: &Path) -> Result<RootListing, ArchiveError> {
    let read_dir = fs::read_dir(root).map_err(|source| ArchiveError::RootNotFound {
        path: root.to_path_buf(),
        source,
    })?;

    let mut listing = RootListing::default();
    let mut children = Vec::new();

    for entry in read_dir {
        match entry {
            Ok(entry) => children.push(entry.path()),
            Err(source) => listing.inaccessible.push(ArchiveError::EntryAccess {
                path: root.to_path_buf(),
                source,
            }),
        }
    }
    children.sort();

    for path in children {
        // Follows symlinks, so a link to a directory counts as a folder.
        match fs::metadata(&path) {
            Ok(meta) if meta.is_dir() => match FolderEntry::new(&path) {
                Some(folder) => listing.folders.push(folder),
                None => listing.others.push(path),
            },
            Ok(_) => {
                debug!("Skipping {} (not a directory)", path.display());
                listing.others.push(path);
            }
            Err(source) => listing
                .inaccessible
                .push(ArchiveError::EntryAccess { path, source }),
        }
    }

    Ok(listing)
}

/// Finds archives an earlier run may have left in `folder`.
///
/// Shallow by default: every direct child whose name ends with `.zip`,
/// whatever its type, plus staging files a killed run left behind. With
/// `deep`, `.zip` files in nested directories are returned as well.
pub fn find_stale_archives(folder: &Path, deep: bool) -> Result<Vec<PathBuf>, ArchiveError> {
    let access = |source: std::io::Error| ArchiveError::EntryAccess {
        path: folder.to_path_buf(),
        source,
    };

    let mut stale = Vec::new();
    for entry in fs::read_dir(folder).map_err(access)? {
        let entry = entry.map_err(access)?;
        let name = entry.file_name();
        if is_archive_name(&name) || is_staging_name(&name) {
            stale.push(entry.path());
        }
    }

    if deep {
        for entry in WalkDir::new(folder).min_depth(2) {
            match entry {
                Ok(entry) if entry.file_type().is_file() && is_archive_name(entry.file_name()) => {
                    stale.push(entry.into_path());
                }
                Ok(_) => {}
                Err(e) => warn!("Cannot look for stale archives: {e}"),
            }
        }
    }

    stale.sort();
    Ok(stale)
}

/// Recursively collects the regular files under `folder`, ordered by path.
///
/// Files named `excluded` and leftover staging files are left out at any
/// depth. Directories that cannot
/// be read are reported as [`ArchiveError::Walk`] and skipped.
pub fn collect_files(folder: &Path, excluded: &OsStr) -> (Vec<FileEntry>, Vec<ArchiveError>) {
    let mut files = Vec::new();
    let mut skipped = Vec::new();

    for entry in WalkDir::new(folder).min_depth(1).sort_by_file_name() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                let path = e
                    .path()
                    .map(Path::to_path_buf)
                    .unwrap_or_else(|| folder.to_path_buf());
                let source = e
                    .into_io_error()
                    .unwrap_or_else(|| std::io::Error::other("walk error"));
                skipped.push(ArchiveError::Walk { path, source });
                continue;
            }
        };

        if !entry.file_type().is_file()
            || entry.file_name() == excluded
            || is_staging_name(entry.file_name())
        {
            continue;
        }

        if let Some(name_in_archive) = entry_name(folder, entry.path()) {
            files.push(FileEntry {
                path: entry.into_path(),
                name_in_archive,
            });
        }
    }

    (files, skipped)
}

/// Convert bytes into a human-friendly string using binary (KiB, MiB, GiB...) units.
pub fn encode_size(bytes: u64) -> String {
    const UNITS: [&str; 6] = ["B", "KiB", "MiB", "GiB", "TiB", "PiB"];

    if bytes == 0 {
        return "0 B".to_string();
    }

    let mut size = bytes as f64;
    let mut unit_index = 0;

    while size >= 1024.0 && unit_index < UNITS.len() - 1 {
        size /= 1024.0;
        unit_index += 1;
    }

    if (size * 10.0) % 10.0 == 0.0 {
        format!("{:.0} {}", size, UNITS[unit_index])
    } else {
        format!("{:.1} {}", size, UNITS[unit_index])
    }
}
