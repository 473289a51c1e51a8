use crate::apply::TEMP_SUFFIX;
use anyhow::{Context, Result};
use log::warn;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanOptions {
    pub root: PathBuf,
    pub recursive: bool,
    pub include_hidden: bool,
}

impl ScanOptions {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            recursive: false,
            include_hidden: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct ScanStats {
    pub scanned_files: usize,
    pub skipped_hidden: usize,
    pub skipped_temp: usize,
}

/// Flattened, path-sorted list of the files under `options.root`.
pub fn collect_files(options: &ScanOptions, stats: &mut ScanStats) -> Result<Vec<PathBuf>> {
    let root = &options.root;
    if !root.is_dir() {
        anyhow::bail!("フォルダが存在しません: {}", root.display());
    }

    let mut out = Vec::new();
    if options.recursive {
        for entry in WalkDir::new(root).sort_by_file_name() {
            let entry =
                entry.with_context(|| format!("フォルダ走査に失敗しました: {}", root.display()))?;
            if entry.file_type().is_dir() {
                continue;
            }
            accept(entry.path(), options, stats, &mut out);
        }
    } else {
        for entry in fs::read_dir(root)
            .with_context(|| format!("フォルダを読めませんでした: {}", root.display()))?
        {
            let entry =
                entry.with_context(|| format!("エントリ読み取り失敗: {}", root.display()))?;
            let path = entry.path();
            if path.is_dir() {
                continue;
            }
            accept(&path, options, stats, &mut out);
        }
    }
    out.sort();

    Ok(out)
}

fn accept(path: &Path, options: &ScanOptions, stats: &mut ScanStats, out: &mut Vec<PathBuf>) {
    stats.scanned_files += 1;

    if is_temp(path) {
        warn!("前回の一時ファイルが残っています: {}", path.display());
        stats.skipped_temp += 1;
        return;
    }
    if is_hidden(path) && !options.include_hidden {
        stats.skipped_hidden += 1;
        return;
    }
    out.push(path.to_path_buf());
}

fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .map(|name| name.to_string_lossy().starts_with('.'))
        .unwrap_or(false)
}

/// `<name>.shotdate-tmp` or `<name>.shotdate-tmp-<n>`, as produced by the
/// mover. The marker elsewhere in a name belongs to the user.
fn is_temp(path: &Path) -> bool {
    let Some(name) = path.file_name().map(|v| v.to_string_lossy().to_string()) else {
        return false;
    };
    match name.rfind(TEMP_SUFFIX) {
        Some(at) => {
            let rest = &name[at + TEMP_SUFFIX.len()..];
            rest.is_empty()
                || rest
                    .strip_prefix('-')
                    .map(|n| !n.is_empty() && n.bytes().all(|b| b.is_ascii_digit()))
                    .unwrap_or(false)
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::{collect_files, ScanOptions, ScanStats};
    use std::fs;
    use std::path::Path;
    use tempfile::tempdir;

    fn touch(path: &Path) {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("create parent");
        }
        fs::write(path, b"x").expect("touch file");
    }

    #[test]
    fn flat_scan_skips_directories_and_hidden_files() {
        let temp = tempdir().expect("tempdir");
        let root = temp.path();
        touch(&root.join("b.jpg"));
        touch(&root.join("a.mp4"));
        touch(&root.join(".DS_Store"));
        touch(&root.join("nested/c.jpg"));

        let mut stats = ScanStats::default();
        let files = collect_files(&ScanOptions::new(root), &mut stats).expect("scan");

        assert_eq!(files, vec![root.join("a.mp4"), root.join("b.jpg")]);
        assert_eq!(stats.scanned_files, 3);
        assert_eq!(stats.skipped_hidden, 1);
    }

    #[test]
    fn recursive_scan_flattens_subdirectories() {
        let temp = tempdir().expect("tempdir");
        let root = temp.path();
        touch(&root.join("a.jpg"));
        touch(&root.join("day1/b.jpg"));
        touch(&root.join("day2/deeper/c.jpg"));

        let options = ScanOptions {
            recursive: true,
            ..ScanOptions::new(root)
        };
        let mut stats = ScanStats::default();
        let files = collect_files(&options, &mut stats).expect("scan");

        assert_eq!(
            files,
            vec![
                root.join("a.jpg"),
                root.join("day1/b.jpg"),
                root.join("day2/deeper/c.jpg"),
            ]
        );
    }

    #[test]
    fn include_hidden_keeps_dot_files() {
        let temp = tempdir().expect("tempdir");
        let root = temp.path();
        touch(&root.join(".hidden.jpg"));

        let options = ScanOptions {
            include_hidden: true,
            ..ScanOptions::new(root)
        };
        let mut stats = ScanStats::default();
        let files = collect_files(&options, &mut stats).expect("scan");
        assert_eq!(files, vec![root.join(".hidden.jpg")]);
    }

    #[test]
    fn leftover_temp_files_are_never_collected() {
        let temp = tempdir().expect("tempdir");
        let root = temp.path();
        touch(&root.join("1.jpg.shotdate-tmp"));
        touch(&root.join("3.jpg.shotdate-tmp-2"));
        touch(&root.join("2.jpg"));

        let mut stats = ScanStats::default();
        let files = collect_files(&ScanOptions::new(root), &mut stats).expect("scan");
        assert_eq!(files, vec![root.join("2.jpg")]);
        assert_eq!(stats.skipped_temp, 2);
    }

    #[test]
    fn marker_inside_user_name_is_not_temp() {
        let temp = tempdir().expect("tempdir");
        let root = temp.path();
        touch(&root.join("trip.shotdate-tmp.notes.jpg"));
        touch(&root.join("4.jpg.shotdate-tmp-old"));

        let mut stats = ScanStats::default();
        let files = collect_files(&ScanOptions::new(root), &mut stats).expect("scan");
        assert_eq!(
            files,
            vec![
                root.join("4.jpg.shotdate-tmp-old"),
                root.join("trip.shotdate-tmp.notes.jpg"),
            ]
        );
        assert_eq!(stats.skipped_temp, 0);
    }

    #[test]
    fn missing_root_is_an_error() {
        let temp = tempdir().expect("tempdir");
        let mut stats = ScanStats::default();
        let err = collect_files(&ScanOptions::new(temp.path().join("nope")), &mut stats)
            .expect_err("missing root");
        assert!(err.to_string().contains("フォルダが存在しません"));
    }
}
