use crate::metadata::{DateSource, ResolvedDate, TagStatus};
use crate::resolver::{resolve_all, Progress, ResolveOptions};
use crate::scanner::{collect_files, ScanOptions, ScanStats};
use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileRecord {
    pub original_path: PathBuf,
    /// Extension including the leading dot, or empty.
    pub extension: String,
    pub resolved: ResolvedDate,
}

impl FileRecord {
    pub fn new(original_path: PathBuf, resolved: ResolvedDate) -> Self {
        let extension = original_path
            .extension()
            .map(|v| format!(".{}", v.to_string_lossy()))
            .unwrap_or_default();
        Self {
            original_path,
            extension,
            resolved,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenameEntry {
    pub sequence: usize,
    pub original_path: PathBuf,
    pub target_path: PathBuf,
    pub date: DateTime<Local>,
    pub source: DateSource,
    pub changed: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct RenameStats {
    pub scanned_files: usize,
    pub skipped_hidden: usize,
    pub skipped_temp: usize,
    pub planned: usize,
    pub unchanged: usize,
    pub exif_written: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenamePlan {
    pub root: PathBuf,
    pub entries: Vec<RenameEntry>,
    pub stats: RenameStats,
}

/// Scans `scan.root`, resolves every file's capture date and numbers the
/// files in chronological order.
pub fn generate_plan(
    scan: &ScanOptions,
    resolve: &ResolveOptions,
    on_progress: &(dyn Fn(Progress) + Sync),
) -> Result<RenamePlan> {
    let mut scan_stats = ScanStats::default();
    let files = collect_files(scan, &mut scan_stats)?;
    let resolved = resolve_all(&files, resolve, on_progress)?;

    let records: Vec<FileRecord> = files
        .into_iter()
        .zip(resolved)
        .map(|(path, resolved)| FileRecord::new(path, resolved))
        .collect();
    let exif_written = records
        .iter()
        .filter(|r| r.resolved.tag == TagStatus::Written)
        .count();

    let mut plan = plan_renames(&scan.root, records)?;
    plan.stats.scanned_files = scan_stats.scanned_files;
    plan.stats.skipped_hidden = scan_stats.skipped_hidden;
    plan.stats.skipped_temp = scan_stats.skipped_temp;
    plan.stats.exif_written = exif_written;
    Ok(plan)
}

/// Orders records by resolved date (stable, so ties keep their input order)
/// and assigns `1..=N`, zero-padded to the digit count of N. Each file keeps
/// its directory and extension.
pub fn plan_renames(root: &Path, mut records: Vec<FileRecord>) -> Result<RenamePlan> {
    records.sort_by(|a, b| a.resolved.date.cmp(&b.resolved.date));

    let width = sequence_width(records.len());
    let mut stats = RenameStats::default();
    let mut entries = Vec::with_capacity(records.len());

    for (index, record) in records.into_iter().enumerate() {
        let sequence = index + 1;
        let parent = record.original_path.parent().with_context(|| {
            format!(
                "親ディレクトリを取得できませんでした: {}",
                record.original_path.display()
            )
        })?;
        let target_path = parent.join(format!(
            "{:0width$}{}",
            sequence,
            record.extension,
            width = width
        ));

        let changed = target_path != record.original_path;
        if !changed {
            stats.unchanged += 1;
        }
        stats.planned += 1;

        entries.push(RenameEntry {
            sequence,
            original_path: record.original_path,
            target_path,
            date: record.resolved.date,
            source: record.resolved.source,
            changed,
        });
    }

    Ok(RenamePlan {
        root: root.to_path_buf(),
        entries,
        stats,
    })
}

pub fn sequence_width(count: usize) -> usize {
    count.max(1).to_string().len()
}
