mod apply;
mod commands;
mod config;
mod exif_reader;
mod exif_writer;
mod filename_date;
mod fs_times;
mod metadata;
mod planner;
mod resolver;
mod scanner;
mod video_reader;

pub use apply::{
    apply_plan, apply_plan_with_log, undo_from_log, undo_last, ApplyResult, RenameError,
    UndoResult, TEMP_SUFFIX,
};
pub use commands::{fill_missing_dates, inspect_file, FillEntry, FillReport};
pub use config::{
    app_paths, load_config, load_config_from, save_config, save_config_to, AppConfig, AppPaths,
};
pub use fs_times::best_creation_time;
pub use metadata::{DateCandidate, DateSource, ResolvedDate, TagStatus};
pub use planner::{
    generate_plan, plan_renames, sequence_width, FileRecord, RenameEntry, RenamePlan, RenameStats,
};
pub use resolver::{resolve_all, resolve_date, Progress, ResolveOptions};
pub use scanner::{collect_files, ScanOptions, ScanStats};
