use anyhow::Result;
use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use log::{info, LevelFilter};
use shotdate_core::{
    app_paths, apply_plan, fill_missing_dates, generate_plan, inspect_file, load_config,
    save_config, undo_last, AppConfig, FillReport, Progress, RenamePlan, ResolveOptions,
    ScanOptions, TagStatus,
};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "shotdate-cli")]
#[command(about = "写真・動画の撮影日時を推定し、EXIF補完と日時順リネームを行います")]
struct Cli {
    /// -v=INFO, -vv=DEBUG, -vvv=TRACE
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// JPGに欠けているDateTimeOriginalを書き込む
    Fill(FillArgs),
    /// 撮影日時順に連番へリネームする
    Rename(RenameArgs),
    /// 1ファイルの日時候補を表示する
    Inspect { file: PathBuf },
    /// 直前のリネームを取り消す
    Undo,
    Config(ConfigArgs),
}

#[derive(Debug, Args)]
struct ConfigArgs {
    #[command(subcommand)]
    action: ConfigAction,
}

#[derive(Debug, Subcommand)]
enum ConfigAction {
    Show,
    /// 既定値で設定ファイルを作成する
    Init,
}

#[derive(Debug, Args)]
struct FolderArgs {
    #[arg(long)]
    input: PathBuf,
    #[arg(long, default_value_t = false)]
    recursive: bool,
    #[arg(long, default_value_t = false)]
    include_hidden: bool,
}

impl FolderArgs {
    fn scan_options(&self, config: &AppConfig) -> ScanOptions {
        ScanOptions {
            root: self.input.clone(),
            recursive: self.recursive || config.recursive_default,
            include_hidden: self.include_hidden || config.include_hidden_default,
        }
    }
}

#[derive(Debug, Args)]
struct FillArgs {
    #[command(flatten)]
    folder: FolderArgs,
    /// ファイル名に日時がないJPGにもファイル日時を書き込む
    #[arg(long, default_value_t = false)]
    from_file_dates: bool,
    #[arg(long, default_value_t = false)]
    apply: bool,
}

#[derive(Debug, Args)]
struct RenameArgs {
    #[command(flatten)]
    folder: FolderArgs,
    #[arg(long, default_value_t = false)]
    apply: bool,
    #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
    output: OutputFormat,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    Table,
    Json,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose);

    match cli.command {
        Commands::Fill(args) => cmd_fill(args),
        Commands::Rename(args) => cmd_rename(args),
        Commands::Inspect { file } => cmd_inspect(file),
        Commands::Undo => cmd_undo(),
        Commands::Config(config) => match config.action {
            ConfigAction::Show => cmd_config_show(),
            ConfigAction::Init => cmd_config_init(),
        },
    }
}

fn setup_logging(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();
}

fn progress_bar() -> ProgressBar {
    let bar = ProgressBar::new(0);
    if let Ok(style) = ProgressStyle::with_template("{bar:40} {pos}/{len} {msg}") {
        bar.set_style(style);
    }
    bar
}

fn report_progress(bar: &ProgressBar, progress: Progress) {
    bar.set_length(progress.total as u64);
    bar.set_position(progress.done as u64);
}

fn cmd_fill(args: FillArgs) -> Result<()> {
    let config = load_config()?;
    let scan = args.folder.scan_options(&config);
    let resolve = ResolveOptions {
        write_back: args.apply,
        filesystem_fallback: args.from_file_dates || config.filesystem_fallback_default,
    };
    info!("EXIF補完を開始します: {}", scan.root.display());

    let bar = progress_bar();
    let report = fill_missing_dates(&scan, &resolve, &|p: Progress| report_progress(&bar, p))?;
    bar.finish_and_clear();

    print_fill(&report);
    if !args.apply {
        eprintln!("dry-runモード: 実ファイルは変更していません。適用するには --apply を指定してください。");
    }
    Ok(())
}

fn cmd_rename(args: RenameArgs) -> Result<()> {
    let config = load_config()?;
    let scan = args.folder.scan_options(&config);
    let resolve = ResolveOptions {
        write_back: args.apply,
        filesystem_fallback: false,
    };
    info!("リネーム計画を作成します: {}", scan.root.display());

    let bar = progress_bar();
    let plan = generate_plan(&scan, &resolve, &|p: Progress| report_progress(&bar, p))?;
    bar.finish_and_clear();

    match args.output {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&plan)?);
        }
        OutputFormat::Table => {
            print_table(&plan);
        }
    }

    if args.apply {
        let result = apply_plan(&plan)?;
        eprintln!(
            "適用完了: {}件 (後回し {}件, 変更なし {}件)",
            result.applied, result.deferred, result.unchanged
        );
    } else {
        eprintln!("dry-runモード: 実ファイルは変更していません。適用するには --apply を指定してください。");
    }

    Ok(())
}

fn cmd_inspect(file: PathBuf) -> Result<()> {
    let resolved = inspect_file(&file)?;
    println!("{}", file.display());
    for candidate in &resolved.candidates {
        let mark = if candidate.source == resolved.source {
            "*"
        } else {
            " "
        };
        println!(
            "{} {:<14} {}",
            mark,
            candidate.source.label(),
            candidate.date.format("%Y-%m-%d %H:%M:%S")
        );
    }
    println!("DateTimeOriginal: {}", resolved.tag.label());
    Ok(())
}

fn cmd_undo() -> Result<()> {
    let result = undo_last()?;
    println!("取り消し完了: {}件", result.restored);
    Ok(())
}

fn cmd_config_show() -> Result<()> {
    let config = load_config()?;
    let paths = app_paths()?;
    println!("設定ファイル: {}", paths.config_path.display());
    println!("{}", toml::to_string_pretty(&config)?);
    Ok(())
}

fn cmd_config_init() -> Result<()> {
    let paths = app_paths()?;
    if paths.config_path.exists() {
        anyhow::bail!(
            "設定ファイルは既に存在します: {}",
            paths.config_path.display()
        );
    }
    save_config(&AppConfig::default())?;
    println!("設定ファイルを作成しました: {}", paths.config_path.display());
    Ok(())
}

fn print_fill(report: &FillReport) {
    for entry in &report.entries {
        if matches!(entry.resolved.tag, TagStatus::Written | TagStatus::Pending) {
            println!(
                "{} <- {} ({})",
                entry.path.display(),
                entry.resolved.date.format("%Y:%m:%d %H:%M:%S"),
                entry.resolved.source.label()
            );
        }
    }

    println!(
        "\n集計: scanned={} hidden_skip={} written={} pending={} tagged={} missing={}",
        report.scan.scanned_files,
        report.scan.skipped_hidden,
        report.written,
        report.pending,
        report.already_tagged,
        report.missing
    );
}

fn print_table(plan: &RenamePlan) {
    println!("元ファイル -> 新ファイル (撮影日時 source)");
    for entry in &plan.entries {
        println!(
            "{} -> {} ({} {})",
            entry.original_path.display(),
            entry.target_path.display(),
            entry.date.format("%Y-%m-%d %H:%M:%S"),
            entry.source.label()
        );
    }

    println!(
        "\n集計: scanned={} hidden_skip={} temp_skip={} planned={} unchanged={} exif_written={}",
        plan.stats.scanned_files,
        plan.stats.skipped_hidden,
        plan.stats.skipped_temp,
        plan.stats.planned,
        plan.stats.unchanged,
        plan.stats.exif_written
    );
}
