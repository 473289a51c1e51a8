use crate::exif_reader::{is_jpeg, probe_capture_date, ExifProbe};
use crate::exif_writer::write_date_time_original;
use crate::filename_date::date_from_filename;
use crate::fs_times::filesystem_candidates;
use crate::metadata::{DateCandidate, DateSource, ResolvedDate, TagStatus};
use crate::video_reader::read_video_creation_date;
use anyhow::{Context, Result};
use log::debug;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default)]
pub struct ResolveOptions {
    /// Write `DateTimeOriginal` into untagged JPEGs. When false the file is
    /// never touched, which makes resolution a dry run.
    pub write_back: bool,
    /// Also write untagged JPEGs whose name carries no date, using the
    /// filesystem-derived date.
    pub filesystem_fallback: bool,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Progress {
    pub done: usize,
    pub total: usize,
}

/// Resolves every path in parallel. The result keeps the order of `paths`.
pub fn resolve_all(
    paths: &[PathBuf],
    options: &ResolveOptions,
    on_progress: &(dyn Fn(Progress) + Sync),
) -> Result<Vec<ResolvedDate>> {
    let total = paths.len();
    let done = AtomicUsize::new(0);

    paths
        .par_iter()
        .map(|path| {
            let resolved = resolve_date(path, options);
            let done = done.fetch_add(1, Ordering::Relaxed) + 1;
            on_progress(Progress { done, total });
            resolved
        })
        .collect()
}

/// Best-guess capture date of a single file: the earliest of its filesystem
/// times, EXIF `DateTimeOriginal`, export-name stamp and video creation date.
pub fn resolve_date(path: &Path, options: &ResolveOptions) -> Result<ResolvedDate> {
    let mut candidates = filesystem_candidates(path)?;

    match probe_capture_date(path) {
        ExifProbe::Dated(date) => {
            candidates.push(DateCandidate {
                source: DateSource::ExifOriginal,
                date,
            });
            let mut resolved = finish(path, candidates)?;
            resolved.tag = TagStatus::Present;
            return Ok(resolved);
        }
        ExifProbe::Unparseable => {
            let mut resolved = finish(path, candidates)?;
            resolved.tag = TagStatus::Present;
            return Ok(resolved);
        }
        ExifProbe::Undated => {
            if is_jpeg(path)? {
                return resolve_untagged_jpeg(path, candidates, options);
            }
            debug!("書き込み非対応の画像形式です: {}", path.display());
        }
        ExifProbe::NotImage => {
            if let Some(date) = read_video_creation_date(path) {
                candidates.push(DateCandidate {
                    source: DateSource::VideoContainer,
                    date,
                });
            }
        }
    }

    finish(path, candidates)
}

fn resolve_untagged_jpeg(
    path: &Path,
    mut candidates: Vec<DateCandidate>,
    options: &ResolveOptions,
) -> Result<ResolvedDate> {
    let from_name = date_from_filename(path);
    if let Some(date) = from_name {
        candidates.push(DateCandidate {
            source: DateSource::FilenamePattern,
            date,
        });
    }

    let writable = from_name.is_some() || options.filesystem_fallback;
    let mut resolved = finish(path, candidates)?;
    resolved.tag = if !writable {
        TagStatus::Missing
    } else if options.write_back {
        write_date_time_original(path, resolved.date)?;
        TagStatus::Written
    } else {
        TagStatus::Pending
    };
    Ok(resolved)
}

fn finish(path: &Path, candidates: Vec<DateCandidate>) -> Result<ResolvedDate> {
    ResolvedDate::from_candidates(candidates)
        .with_context(|| format!("日時候補がありません: {}", path.display()))
}
