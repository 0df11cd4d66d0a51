use std::ffi::{OsStr, OsString};
use std::path::{Component, Path, PathBuf};

/// Suffix shared by every archive this tool writes or cleans up.
pub const ARCHIVE_SUFFIX: &str = ".zip";

/// Name parts of the temporary file an archive is written to before it is
/// renamed into place. A killed run can leave one behind.
pub const STAGING_PREFIX: &str = ".foldzip-";
pub const STAGING_SUFFIX: &str = ".partial";

/// One immediate subdirectory of the root: the unit of archiving.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FolderEntry {
    pub path: PathBuf,
    pub name: OsString,
}

impl FolderEntry {
    /// Returns `None` for paths without a final component (`/`, `..`).
    pub fn new(path: impl Into<PathBuf>) -> Option<Self> {
        let path = path.into();
        let name = path.file_name()?.to_os_string();
        Some(Self { path, name })
    }

    pub fn display_name(&self) -> String {
        self.name.to_string_lossy().to_string()
    }
}

/// Where a folder's archive lives: `<folder>/<folder-name>.zip`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveTarget {
    pub path: PathBuf,
    pub file_name: OsString,
}

pub fn archive_target(folder: &FolderEntry) -> ArchiveTarget {
    let mut file_name = folder.name.clone();
    file_name.push(ARCHIVE_SUFFIX);
    ArchiveTarget {
        path: folder.path.join(&file_name),
        file_name,
    }
}

/// Whether a file name looks like an archive left behind by an earlier run.
pub fn is_archive_name(name: &OsStr) -> bool {
    name.to_string_lossy().ends_with(ARCHIVE_SUFFIX)
}

pub fn is_staging_name(name: &OsStr) -> bool {
    let name = name.to_string_lossy();
    name.starts_with(STAGING_PREFIX) && name.ends_with(STAGING_SUFFIX)
}

/// Name of `file` inside the archive of `base`: its relative path, `/`-separated.
pub fn entry_name(base: &Path, file: &Path) -> Option<String> {
    let relative = file.strip_prefix(base).ok()?;
    let parts: Vec<String> = relative
        .components()
        .map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().to_string()),
            _ => None,
        })
        .collect::<Option<_>>()?;

    if parts.is_empty() {
        None
    } else {
        Some(parts.join("/"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn target_sits_inside_the_folder() {
        let folder = FolderEntry::new("/data/projectA").unwrap();
        let target = archive_target(&folder);
        assert_eq!(target.path, PathBuf::from("/data/projectA/projectA.zip"));
        assert_eq!(target.file_name, OsString::from("projectA.zip"));
    }

    #[test]
    fn folder_entry_needs_a_name() {
        assert!(FolderEntry::new("/").is_none());
        assert_eq!(
            FolderEntry::new("./root/b").unwrap().display_name(),
            "b".to_string()
        );
    }

    #[test]
    fn archive_names_match_on_suffix_only() {
        assert!(is_archive_name(OsStr::new("old.zip")));
        assert!(is_archive_name(OsStr::new("projectA.zip")));
        assert!(is_archive_name(OsStr::new(".zip")));
        assert!(!is_archive_name(OsStr::new("old.ZIP")));
        assert!(!is_archive_name(OsStr::new("zip")));
        assert!(!is_archive_name(OsStr::new("notes.zip.txt")));
    }

    #[test]
    fn staging_names_need_prefix_and_suffix() {
        assert!(is_staging_name(OsStr::new(".foldzip-a1B2c3.partial")));
        assert!(!is_staging_name(OsStr::new("foldzip-a1B2c3.partial")));
        assert!(!is_staging_name(OsStr::new(".foldzip-a1B2c3.zip")));
        assert!(!is_staging_name(OsStr::new("notes.partial")));
    }

    #[test]
    fn entry_names_are_relative_with_forward_slashes() {
        let base = Path::new("/data/projectA");
        assert_eq!(
            entry_name(base, &base.join("src").join("main.txt")),
            Some("src/main.txt".to_string())
        );
        assert_eq!(
            entry_name(base, &base.join("readme.md")),
            Some("readme.md".to_string())
        );
        assert_eq!(entry_name(base, base), None);
        assert_eq!(entry_name(base, Path::new("/elsewhere/file")), None);
    }
}
