use crate::metadata::{ResolvedDate, TagStatus};
use crate::resolver::{resolve_all, resolve_date, Progress, ResolveOptions};
use crate::scanner::{collect_files, ScanOptions, ScanStats};
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FillEntry {
    pub path: PathBuf,
    pub resolved: ResolvedDate,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct FillReport {
    pub scan: ScanStats,
    pub written: usize,
    pub pending: usize,
    pub already_tagged: usize,
    pub missing: usize,
    pub entries: Vec<FillEntry>,
}

/// Fills `DateTimeOriginal` into the untagged JPEGs of a folder. With
/// `resolve.write_back` off, the report lists what would be written.
pub fn fill_missing_dates(
    scan: &ScanOptions,
    resolve: &ResolveOptions,
    on_progress: &(dyn Fn(Progress) + Sync),
) -> Result<FillReport> {
    let mut report = FillReport::default();
    let files = collect_files(scan, &mut report.scan)?;
    let resolved = resolve_all(&files, resolve, on_progress)?;

    for (path, resolved) in files.into_iter().zip(resolved) {
        match resolved.tag {
            TagStatus::Written => report.written += 1,
            TagStatus::Pending => report.pending += 1,
            TagStatus::Present => report.already_tagged += 1,
            TagStatus::Missing => report.missing += 1,
            TagStatus::NotApplicable => {}
        }
        report.entries.push(FillEntry { path, resolved });
    }

    Ok(report)
}

/// Every date candidate of a single file. Never writes to the file.
pub fn inspect_file(path: &Path) -> Result<ResolvedDate> {
    resolve_date(path, &ResolveOptions::default())
}
