use crate::config::app_paths;
use crate::planner::RenamePlan;
use anyhow::{Context, Result};
use log::info;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Marker appended to a file parked while its final name is still taken.
pub const TEMP_SUFFIX: &str = ".shotdate-tmp";

#[derive(Debug, Error)]
pub enum RenameError {
    #[error("重複した元ファイルが含まれています: {}", .0.display())]
    DuplicateSource(PathBuf),
    #[error("重複したリネーム先が含まれています: {}", .0.display())]
    DuplicateTarget(PathBuf),
    #[error("対象フォルダ外のファイルは扱えません: {}", .0.display())]
    OutsideRoot(PathBuf),
    #[error("リネーム先が対象外のファイルで使用されています: {}", .0.display())]
    TargetOccupied(PathBuf),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct UndoLog {
    operations: Vec<RenameOperation>,
    #[serde(default)]
    root: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
struct RenameOperation {
    from: PathBuf,
    to: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplyResult {
    pub applied: usize,
    pub deferred: usize,
    pub unchanged: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UndoResult {
    pub restored: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct MoveOutcome {
    moved: usize,
    deferred: usize,
}

pub fn apply_plan(plan: &RenamePlan) -> Result<ApplyResult> {
    let paths = app_paths()?;
    apply_plan_with_log(plan, &paths.undo_path)
}

pub fn apply_plan_with_log(plan: &RenamePlan, undo_path: &Path) -> Result<ApplyResult> {
    let operations: Vec<RenameOperation> = plan
        .entries
        .iter()
        .filter(|e| e.changed)
        .map(|e| RenameOperation {
            from: e.original_path.clone(),
            to: e.target_path.clone(),
        })
        .collect();
    let unchanged = plan.entries.len() - operations.len();
    if operations.is_empty() {
        return Ok(ApplyResult {
            applied: 0,
            deferred: 0,
            unchanged,
        });
    }

    validate_operations(&plan.root, &operations)?;
    let outcome = execute_moves(&operations)?;
    persist_undo(undo_path, &operations, &plan.root)?;

    Ok(ApplyResult {
        applied: outcome.moved,
        deferred: outcome.deferred,
        unchanged,
    })
}

fn validate_operations(root: &Path, operations: &[RenameOperation]) -> Result<()> {
    let root = fs::canonicalize(root)
        .with_context(|| format!("対象フォルダを解決できませんでした: {}", root.display()))?;
    let mut seen_sources = HashSet::<PathBuf>::new();
    let mut seen_targets = HashSet::<PathBuf>::new();

    for op in operations {
        let source = fs::canonicalize(&op.from).with_context(|| {
            format!("元ファイルを解決できませんでした: {}", op.from.display())
        })?;
        if !source.starts_with(&root) {
            return Err(RenameError::OutsideRoot(op.from.clone()).into());
        }
        if !seen_sources.insert(source) {
            return Err(RenameError::DuplicateSource(op.from.clone()).into());
        }

        let target_parent = op.to.parent().with_context(|| {
            format!("リネーム先に親ディレクトリがありません: {}", op.to.display())
        })?;
        let target_name = op
            .to
            .file_name()
            .with_context(|| format!("リネーム先ファイル名が不正です: {}", op.to.display()))?;
        let target_parent = fs::canonicalize(target_parent).with_context(|| {
            format!(
                "リネーム先親ディレクトリを解決できませんでした: {}",
                target_parent.display()
            )
        })?;
        if !target_parent.starts_with(&root) {
            return Err(RenameError::OutsideRoot(op.to.clone()).into());
        }
        if !seen_targets.insert(target_parent.join(target_name)) {
            return Err(RenameError::DuplicateTarget(op.to.clone()).into());
        }
    }

    Ok(())
}

/// Moves every `from` to its `to` without ever overwriting.
///
/// A move whose target is still taken parks the source under a temporary
/// name; once the main pass has moved the occupants away, a second pass
/// moves the parked files into place. On failure every completed rename,
/// parking included, is reversed so the folder is left as it was found.
fn execute_moves(operations: &[RenameOperation]) -> Result<MoveOutcome> {
    let mut completed = Vec::<RenameOperation>::with_capacity(operations.len());
    match run_moves(operations, &mut completed) {
        Ok(outcome) => Ok(outcome),
        Err(err) => {
            if let Err(rollback_err) = rollback_moves(&completed) {
                return Err(err.context(format!(
                    "リネーム失敗後のロールバックにも失敗しました: {rollback_err}"
                )));
            }
            Err(err)
        }
    }
}

fn run_moves(
    operations: &[RenameOperation],
    completed: &mut Vec<RenameOperation>,
) -> Result<MoveOutcome> {
    let mut parked = Vec::<(PathBuf, &RenameOperation)>::new();
    let mut outcome = MoveOutcome::default();

    for op in operations {
        if occupied(&op.to) {
            let temp = temp_path_for(&op.to);
            rename_recorded(&op.from, &temp, completed).with_context(|| {
                format!(
                    "一時リネームに失敗しました: {} -> {}",
                    op.from.display(),
                    temp.display()
                )
            })?;
            info!(
                "リネーム先が使用中のため後回しにします: {} -> {}",
                op.from.display(),
                op.to.display()
            );
            parked.push((temp, op));
            continue;
        }

        rename_recorded(&op.from, &op.to, completed).with_context(|| {
            format!(
                "リネームに失敗しました: {} -> {}",
                op.from.display(),
                op.to.display()
            )
        })?;
        outcome.moved += 1;
    }

    for (temp, op) in &parked {
        if occupied(&op.to) {
            return Err(anyhow::Error::from(RenameError::TargetOccupied(op.to.clone()))
                .context(format!("退避中のファイル: {}", temp.display())));
        }
        rename_recorded(temp, &op.to, completed).with_context(|| {
            format!(
                "最終リネームに失敗しました: {} -> {}",
                temp.display(),
                op.to.display()
            )
        })?;
        outcome.moved += 1;
        outcome.deferred += 1;
    }

    Ok(outcome)
}

fn rename_recorded(from: &Path, to: &Path, completed: &mut Vec<RenameOperation>) -> Result<()> {
    fs::rename(from, to)?;
    completed.push(RenameOperation {
        from: from.to_path_buf(),
        to: to.to_path_buf(),
    });
    Ok(())
}

/// Reverses completed renames newest first, so each name is free again by
/// the time it is restored.
fn rollback_moves(completed: &[RenameOperation]) -> Result<()> {
    for op in completed.iter().rev() {
        if occupied(&op.from) {
            return Err(RenameError::TargetOccupied(op.from.clone()).into());
        }
        fs::rename(&op.to, &op.from).with_context(|| {
            format!(
                "ロールバックに失敗しました: {} -> {}",
                op.to.display(),
                op.from.display()
            )
        })?;
    }
    Ok(())
}

fn occupied(path: &Path) -> bool {
    fs::symlink_metadata(path).is_ok()
}

fn temp_path_for(target: &Path) -> PathBuf {
    let parent = target.parent().unwrap_or_else(|| Path::new("."));
    let file_name = target
        .file_name()
        .map(|v| v.to_string_lossy().to_string())
        .unwrap_or_else(|| "file".to_string());

    let first = parent.join(format!("{}{}", file_name, TEMP_SUFFIX));
    if !occupied(&first) {
        return first;
    }
    let mut n = 1usize;
    loop {
        let next = parent.join(format!("{}{}-{}", file_name, TEMP_SUFFIX, n));
        if !occupied(&next) {
            return next;
        }
        n += 1;
    }
}

pub fn undo_last() -> Result<UndoResult> {
    let paths = app_paths()?;
    undo_from_log(&paths.undo_path)
}

pub fn undo_from_log(undo_path: &Path) -> Result<UndoResult> {
    if !undo_path.exists() {
        anyhow::bail!("取り消し可能な履歴がありません");
    }

    let raw = fs::read_to_string(undo_path)
        .with_context(|| format!("取り消しログを読めませんでした: {}", undo_path.display()))?;
    let log = serde_json::from_str::<UndoLog>(&raw).context("取り消しログが壊れています")?;

    let reversed: Vec<RenameOperation> = log
        .operations
        .iter()
        .rev()
        .filter(|op| op.to.exists())
        .map(|op| RenameOperation {
            from: op.to.clone(),
            to: op.from.clone(),
        })
        .collect();
    let outcome = execute_moves(&reversed)?;

    fs::remove_file(undo_path)
        .with_context(|| format!("取り消しログ削除に失敗しました: {}", undo_path.display()))?;

    Ok(UndoResult {
        restored: outcome.moved,
    })
}

fn persist_undo(undo_path: &Path, operations: &[RenameOperation], root: &Path) -> Result<()> {
    if let Some(dir) = undo_path.parent() {
        fs::create_dir_all(dir)
            .with_context(|| format!("設定ディレクトリ作成に失敗しました: {}", dir.display()))?;
    }

    let log = UndoLog {
        operations: operations.to_vec(),
        root: Some(root.to_path_buf()),
    };
    let body =
        serde_json::to_string_pretty(&log).context("取り消しログのシリアライズに失敗しました")?;
    fs::write(undo_path, body)
        .with_context(|| format!("取り消しログ書き込みに失敗しました: {}", undo_path.display()))?;
    Ok(())
}
