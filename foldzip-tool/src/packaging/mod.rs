use std::path::PathBuf;

pub mod zip;

/// Represents a file to include in the ZIP archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    pub path: PathBuf,
    pub name_in_archive: String,
}
