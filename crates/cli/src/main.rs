use anyhow::Result;
use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use dphoto_renamer_core::{
    app_paths, apply_plan, generate_plan, load_config, save_config, AppConfig, PlanOptions,
    RenamePlan, SkipReason,
};
use env_logger::Builder;
use log::LevelFilter;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "dphoto-renamer-cli")]
#[command(about = "写真・動画ファイルを日付ベースの名前 YYYY.MM.DD (N) に一括リネームします")]
struct Cli {
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count, global = true)]
    verbose: u8,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    Rename(RenameArgs),
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
    Init,
}

#[derive(Debug, Args)]
struct RenameArgs {
    input: PathBuf,
    #[arg(long, default_value_t = false)]
    apply: bool,
    #[arg(long)]
    max_sequence: Option<usize>,
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
    configure_logging(cli.verbose);

    match cli.command {
        Commands::Rename(args) => cmd_rename(args),
        Commands::Config(config) => match config.action {
            ConfigAction::Show => cmd_config_show(),
            ConfigAction::Init => cmd_config_init(),
        },
    }
}

fn configure_logging(verbosity: u8) {
    let level = match verbosity {
        0 => LevelFilter::Info,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };

    Builder::new().filter_level(level).format_timestamp(None).init();
}

fn cmd_rename(args: RenameArgs) -> Result<()> {
    let config = load_config()?;
    let options = PlanOptions {
        input: args.input,
        max_sequence: args.max_sequence.unwrap_or(config.max_sequence),
    };

    let plan = generate_plan(&options)?;

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
        for failure in &result.failures {
            eprintln!(
                "適用失敗: {} -> {} ({})",
                failure.original_path.display(),
                failure.target_path.display(),
                failure.message
            );
        }
        eprintln!(
            "適用完了: {}件 (変更なし {}件, 失敗 {}件)",
            result.applied,
            result.unchanged,
            result.failures.len()
        );
    } else {
        eprintln!("dry-runモード: 実ファイルは変更していません。適用するには --apply を指定してください。");
    }

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
    let config = AppConfig::default();
    save_config(&config)?;
    let paths = app_paths()?;
    println!("設定ファイルを作成しました: {}", paths.config_path.display());
    Ok(())
}

fn print_table(plan: &RenamePlan) {
    println!("元ファイル -> 新ファイル (日付ソース)");
    for candidate in &plan.candidates {
        println!(
            "{} -> {} ({:?})",
            candidate.original_path.display(),
            candidate.target_path.display(),
            candidate.date_source
        );
    }

    for skipped in &plan.skipped {
        println!(
            "スキップ: {} ({})",
            skipped.path.display(),
            skip_reason_label(skipped.reason)
        );
    }

    println!(
        "\n集計: scanned={} media={} planned={} unchanged={} non_media_skip={} unreadable_skip={} no_date_skip={} sequence_skip={}",
        plan.stats.scanned_files,
        plan.stats.media_files,
        plan.stats.planned,
        plan.stats.unchanged,
        plan.stats.skipped_non_media,
        plan.stats.skipped_unreadable,
        plan.stats.skipped_no_date,
        plan.stats.skipped_sequence_exhausted
    );
}

fn skip_reason_label(reason: SkipReason) -> &'static str {
    match reason {
        SkipReason::NotMedia => "画像/動画ではありません",
        SkipReason::UnreadableImage => "画像として読めませんでした",
        SkipReason::NoUsableDate => "日付を特定できませんでした",
        SkipReason::SequenceExhausted => "連番が上限に達しました",
    }
}
