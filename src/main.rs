use anyhow::{anyhow, Context, Result};
use clap::{Args, Parser, Subcommand};
use impactlens_lib::commands::preprocess::process_all;
use impactlens_lib::commands::settings::{get_settings, load_effective_settings, save_settings};
use impactlens_lib::{default_model, run_full_analysis_internal, write_reports, InputPaths, ReportFormat};
use std::path::PathBuf;

/// Rank backlog items by the customer impact found in feedback and tickets.
#[derive(Debug, Parser)]
#[command(name = "impactlens")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Workspace holding `.impactlens/settings.json` and the data directory
    #[arg(long, default_value = ".")]
    workspace: PathBuf,

    /// Log at debug level (RUST_LOG still wins when set)
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Clean raw CSAT and ticket exports into `<data>/output`
    Preprocess,
    /// Score the backlog and write reports
    Score(ScoreArgs),
    Settings {
        #[command(subcommand)]
        command: SettingsCommand,
    },
}

#[derive(Debug, Args)]
struct ScoreArgs {
    /// Processed CSAT file (default: discovered in `<data>/output`)
    #[arg(long)]
    csat: Option<PathBuf>,

    /// Processed support ticket file (default: discovered in `<data>/output`)
    #[arg(long)]
    tickets: Option<PathBuf>,

    /// Development backlog export (default: discovered in `<data>/raw`)
    #[arg(long)]
    backlog: Option<PathBuf>,

    /// Report directory (default: the `outputDir` setting)
    #[arg(long)]
    out: Option<PathBuf>,

    #[arg(long, value_enum, default_value_t = ReportFormat::All)]
    format: ReportFormat,
}

#[derive(Debug, Subcommand)]
enum SettingsCommand {
    /// Print the effective settings file
    Show,
    /// Merge a JSON object into the settings and save
    Set { json: String },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let workspace = cli
        .workspace
        .to_str()
        .ok_or_else(|| anyhow!("workspace path is not valid UTF-8: {}", cli.workspace.display()))?
        .to_string();

    match cli.command {
        Command::Preprocess => preprocess(&workspace),
        Command::Score(args) => score(&workspace, args),
        Command::Settings { command } => settings(&workspace, command),
    }
}

fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

fn preprocess(workspace: &str) -> Result<()> {
    let settings = load_effective_settings(workspace).map_err(|e| anyhow!(e))?;
    let summary = process_all(&settings.data_dir)
        .map_err(|e| anyhow!(e))
        .context("preprocessing failed")?;

    println!(
        "Processed {} CSAT rows from {} files and {} ticket rows from {} files",
        summary.csat_rows, summary.csat_files, summary.ticket_rows, summary.ticket_files
    );
    for skipped in &summary.skipped_files {
        println!("  skipped: {skipped}");
    }
    Ok(())
}

fn score(workspace: &str, args: ScoreArgs) -> Result<()> {
    let settings = load_effective_settings(workspace).map_err(|e| anyhow!(e))?;
    let model = default_model().map_err(|e| anyhow!(e))?;

    let overrides = InputPaths {
        feedback: args.csat,
        tickets: args.tickets,
        backlog: args.backlog,
    };
    let result = run_full_analysis_internal(workspace, overrides, model, |p| {
        log::debug!("[{}/{}] {}", p.current, p.total, p.stage);
    })
    .map_err(|e| anyhow!(e))
    .context("impact analysis failed")?;

    let out_dir = args.out.unwrap_or(settings.output_dir);
    let written = write_reports(&result, &out_dir, args.format, settings.summary_top_n)
        .map_err(|e| anyhow!(e))?;

    println!(
        "Ranked {} backlog items ({} high impact, average {:.2})",
        result.backlog_count, result.high_impact_count, result.average_score
    );
    for (rank, item) in result.scores.iter().take(settings.summary_top_n).enumerate() {
        println!(
            "{:>3}. {:<12} {:.3}  {}  [{}]",
            rank + 1,
            item.ticket_id,
            item.composite_score,
            item.title,
            item.relevant_themes()
        );
    }
    for path in written {
        println!("wrote {}", path.display());
    }
    Ok(())
}

fn settings(workspace: &str, command: SettingsCommand) -> Result<()> {
    let value = match command {
        SettingsCommand::Show => get_settings(workspace).map_err(|e| anyhow!(e))?,
        SettingsCommand::Set { json } => {
            let patch: serde_json::Value =
                serde_json::from_str(&json).context("settings must be a JSON object")?;
            if !patch.is_object() {
                return Err(anyhow!("settings must be a JSON object"));
            }
            save_settings(workspace, patch).map_err(|e| anyhow!(e))?
        }
    };
    println!("{}", serde_json::to_string_pretty(&value)?);
    Ok(())
}
