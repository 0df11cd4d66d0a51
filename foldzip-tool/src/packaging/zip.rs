use async_zip::tokio::write::ZipFileWriter;
use async_zip::{Compression, ZipDateTime, ZipEntryBuilder};
use chrono::{DateTime, Datelike, Utc};
use std::path::Path;
use tokio::io::AsyncWriteExt;
use tracing::debug;

use super::FileEntry;
use crate::error::ArchiveError;
use crate::naming::{STAGING_PREFIX, STAGING_SUFFIX};

/// What ended up in a freshly written archive.
#[derive(Debug, Default)]
pub struct WrittenArchive {
    pub entries: usize,
    pub bytes: u64,
    /// Files that vanished or became unreadable between the walk and the write.
    pub skipped: Vec<ArchiveError>,
}

/// Writes `files` into a new ZIP archive at `target`.
///
/// The archive is staged in a temporary file next to `target` and only
/// renamed over it once the central directory is written and flushed. On any
/// error the staging file is dropped, so `target` is either the complete new
/// archive or untouched. The staging file is created like any other file
/// (mode 0666 minus the umask), so the archive is not left owner-only.
///
/// Entries are stored uncompressed, stamped with the source file's
/// modification time. Each file is read whole into memory before it is
/// written, so peak memory grows with the largest single file in `files`.
pub async fn write_archive(
    target: &Path,
    files: &[FileEntry],
) -> Result<WrittenArchive, ArchiveError> {
    let dir = target.parent().unwrap_or_else(|| Path::new("."));

    let mut builder = tempfile::Builder::new();
    builder.prefix(STAGING_PREFIX).suffix(STAGING_SUFFIX);
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        builder.permissions(std::fs::Permissions::from_mode(0o666));
    }
    let staging = builder
        .tempfile_in(dir)
        .map_err(|e| ArchiveError::archive_write(target, e))?;
    let handle = staging
        .as_file()
        .try_clone()
        .map_err(|e| ArchiveError::archive_write(target, e))?;

    let mut writer = ZipFileWriter::with_tokio(tokio::fs::File::from_std(handle));
    let mut written = WrittenArchive::default();

    for fe in files {
        let data = match tokio::fs::read(&fe.path).await {
            Ok(data) => data,
            Err(source) => {
                written.skipped.push(ArchiveError::Walk {
                    path: fe.path.clone(),
                    source,
                });
                continue;
            }
        };

        let mut builder =
            ZipEntryBuilder::new(fe.name_in_archive.clone().into(), Compression::Stored);
        if let Some(modified) = modification_date(&fe.path).await {
            builder = builder.last_modification_date(modified);
        }

        writer
            .write_entry_whole(builder, &data)
            .await
            .map_err(|e| ArchiveError::archive_write(target, e))?;

        debug!("Adding {}", fe.name_in_archive);
        written.entries += 1;
        written.bytes += data.len() as u64;
    }

    let mut file = writer
        .close()
        .await
        .map_err(|e| ArchiveError::archive_write(target, e))?
        .into_inner();
    file.flush()
        .await
        .map_err(|e| ArchiveError::archive_write(target, e))?;
    file.sync_all()
        .await
        .map_err(|e| ArchiveError::archive_write(target, e))?;
    drop(file);

    staging
        .persist(target)
        .map_err(|e| ArchiveError::archive_write(target, e.error))?;

    Ok(written)
}

/// ZIP timestamps start in 1980; older (or unknown) times are left unset.
async fn modification_date(path: &Path) -> Option<ZipDateTime> {
    let modified = tokio::fs::metadata(path).await.ok()?.modified().ok()?;
    let modified: DateTime<Utc> = modified.into();
    (modified.year() >= 1980).then(|| ZipDateTime::from_chrono(&modified))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::io::Read;

    fn read_back(path: &Path) -> Vec<(String, String)> {
        let mut archive = ::zip::ZipArchive::new(fs::File::open(path).unwrap()).unwrap();
        (0..archive.len())
            .map(|i| {
                let mut entry = archive.by_index(i).unwrap();
                let mut content = String::new();
                entry.read_to_string(&mut content).unwrap();
                (entry.name().to_string(), content)
            })
            .collect()
    }

    #[tokio::test]
    async fn writes_entries_under_their_archive_names() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.txt"), "alpha").unwrap();
        fs::write(dir.path().join("b.txt"), "beta").unwrap();
        let target = dir.path().join("out.zip");

        let files = vec![
            FileEntry {
                path: dir.path().join("a.txt"),
                name_in_archive: "a.txt".into(),
            },
            FileEntry {
                path: dir.path().join("b.txt"),
                name_in_archive: "nested/b.txt".into(),
            },
        ];

        let written = write_archive(&target, &files).await.unwrap();
        assert_eq!(written.entries, 2);
        assert_eq!(written.bytes, 9);
        assert!(written.skipped.is_empty());
        assert_eq!(
            read_back(&target),
            vec![
                ("a.txt".to_string(), "alpha".to_string()),
                ("nested/b.txt".to_string(), "beta".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn unreadable_files_are_skipped_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("kept.txt"), "kept").unwrap();
        let target = dir.path().join("out.zip");

        let files = vec![
            FileEntry {
                path: dir.path().join("gone.txt"),
                name_in_archive: "gone.txt".into(),
            },
            FileEntry {
                path: dir.path().join("kept.txt"),
                name_in_archive: "kept.txt".into(),
            },
        ];

        let written = write_archive(&target, &files).await.unwrap();
        assert_eq!(written.entries, 1);
        assert_eq!(written.skipped.len(), 1);
        assert!(matches!(written.skipped[0], ArchiveError::Walk { .. }));
        assert_eq!(
            read_back(&target),
            vec![("kept.txt".to_string(), "kept".to_string())]
        );
    }

    #[tokio::test]
    async fn staging_file_does_not_outlive_the_write() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("empty.zip");

        let written = write_archive(&target, &[]).await.unwrap();
        assert_eq!(written.entries, 0);
        assert!(read_back(&target).is_empty());

        let left: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(left, vec![std::ffi::OsString::from("empty.zip")]);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn archive_gets_the_same_mode_as_ordinary_files() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let plain = dir.path().join("plain.txt");
        fs::write(&plain, "x").unwrap();
        let target = dir.path().join("out.zip");

        write_archive(&target, &[]).await.unwrap();

        let mode = |p: &Path| fs::metadata(p).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode(&target), mode(&plain));
    }

    #[tokio::test]
    async fn failed_write_leaves_no_target() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("missing-dir").join("out.zip");

        let err = write_archive(&target, &[]).await.unwrap_err();
        assert!(matches!(err, ArchiveError::ArchiveWrite { .. }));
        assert!(!target.exists());
    }
}
