use crate::metadata::{DateCandidate, DateSource};
use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use std::fs::{self, Metadata};
use std::path::Path;
use std::time::SystemTime;

/// Filesystem timestamps for `path`: the best available creation time
/// followed by the last-modified time.
pub fn filesystem_candidates(path: &Path) -> Result<Vec<DateCandidate>> {
    let meta = fs::metadata(path)
        .with_context(|| format!("ファイル情報を取得できませんでした: {}", path.display()))?;

    let mut out = Vec::with_capacity(2);
    if let Some(created) = best_creation_time(&meta) {
        out.push(DateCandidate {
            source: DateSource::FileCreated,
            date: DateTime::<Local>::from(created),
        });
    }
    let modified = meta
        .modified()
        .with_context(|| format!("更新日時を取得できませんでした: {}", path.display()))?;
    out.push(DateCandidate {
        source: DateSource::FileModified,
        date: DateTime::<Local>::from(modified),
    });
    Ok(out)
}

#[cfg(windows)]
pub fn best_creation_time(meta: &Metadata) -> Option<SystemTime> {
    meta.created().ok()
}

// Birth time where the filesystem records it (statx on Linux, st_birthtime
// on BSD/macOS), otherwise the modification time.
#[cfg(not(windows))]
pub fn best_creation_time(meta: &Metadata) -> Option<SystemTime> {
    meta.created().or_else(|_| meta.modified()).ok()
}
