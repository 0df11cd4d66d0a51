use std::fs;
use std::path::{Path, PathBuf};

use foldzip_lib::Config;
use tracing::{error, info, warn};

use crate::error::ArchiveError;
use crate::fs_utils::{collect_files, find_stale_archives, list_root};
use crate::naming::{FolderEntry, archive_target};
use crate::packaging::zip::write_archive;

/// Outcome of one successfully processed folder.
#[derive(Debug)]
pub struct FolderReport {
    pub archive: PathBuf,
    pub removed: Vec<PathBuf>,
    pub entries: usize,
    pub bytes: u64,
    pub skipped: Vec<ArchiveError>,
}

#[derive(Debug, Default)]
pub struct RunSummary {
    pub folders: Vec<(FolderEntry, Result<FolderReport, ArchiveError>)>,
    /// Root children that are not directories.
    pub others: Vec<PathBuf>,
    pub inaccessible: Vec<ArchiveError>,
}

impl RunSummary {
    pub fn failed(&self) -> usize {
        self.folders.iter().filter(|(_, r)| r.is_err()).count()
    }

    pub fn is_clean(&self) -> bool {
        self.failed() == 0 && self.inaccessible.is_empty()
    }

    pub fn total_bytes(&self) -> u64 {
        self.folders
            .iter()
            .filter_map(|(_, r)| r.as_ref().ok())
            .map(|r| r.bytes)
            .sum()
    }
}

/// Archives every immediate subdirectory of `root`, one after another.
///
/// Fails only when `root` itself cannot be listed; everything else is
/// recorded per folder in the returned summary.
pub fn archive_all_folders(root: &Path, config: &Config) -> anyhow::Result<RunSummary> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    runtime.block_on(async {
        let listing = list_root(root)?;
        for err in &listing.inaccessible {
            warn!("{err}: {}", source_of(err));
        }

        let mut summary = RunSummary {
            others: listing.others,
            inaccessible: listing.inaccessible,
            ..Default::default()
        };

        for folder in listing.folders {
            info!("Processing {}", folder.display_name());
            let result = process_folder(&folder, config).await;
            match &result {
                Ok(report) => {
                    for err in &report.skipped {
                        warn!("{err}: {}", source_of(err));
                    }
                    info!(
                        "Finished processing {} -> {} ({} files, {} old archives removed)",
                        folder.display_name(),
                        report.archive.display(),
                        report.entries,
                        report.removed.len()
                    );
                }
                Err(err) => error!(path = %err.path().display(), "{err}: {}", source_of(err)),
            }
            summary.folders.push((folder, result));
        }

        Ok::<_, anyhow::Error>(summary)
    })
}

/// Cleans up stale archives in one folder, then writes its new archive.
///
/// A stale archive that cannot be removed aborts the folder before anything
/// is written.
pub async fn process_folder(
    folder: &FolderEntry,
    config: &Config,
) -> Result<FolderReport, ArchiveError> {
    let target = archive_target(folder);
    let stale = find_stale_archives(&folder.path, config.is_deep_clean())?;

    if config.is_dry() {
        let (mut files, skipped) = collect_files(&folder.path, &target.file_name);
        files.retain(|fe| !stale.contains(&fe.path));
        for path in &stale {
            println!("  would remove {}", path.display());
        }
        println!("  would create {}", target.path.display());
        for fe in &files {
            println!("    {} -> {}", fe.path.display(), fe.name_in_archive);
        }
        let bytes = files
            .iter()
            .filter_map(|fe| fs::metadata(&fe.path).ok())
            .map(|m| m.len())
            .sum();
        return Ok(FolderReport {
            archive: target.path,
            removed: stale,
            entries: files.len(),
            bytes,
            skipped,
        });
    }

    for path in &stale {
        info!("Removing existing zip file {}", path.display());
        fs::remove_file(path).map_err(|source| ArchiveError::Deletion {
            path: path.clone(),
            source,
        })?;
    }

    let (files, mut skipped) = collect_files(&folder.path, &target.file_name);
    info!("Creating {}", target.path.display());
    let written = write_archive(&target.path, &files).await?;
    skipped.extend(written.skipped);

    Ok(FolderReport {
        archive: target.path,
        removed: stale,
        entries: written.entries,
        bytes: written.bytes,
        skipped,
    })
}

fn source_of(err: &ArchiveError) -> String {
    std::error::Error::source(err)
        .map(|s| s.to_string())
        .unwrap_or_default()
}
