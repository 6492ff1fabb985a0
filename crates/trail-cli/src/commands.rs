use std::fmt::Write as _;
use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context};
use colored::Colorize;
use serde::Deserialize;
use tracing::debug;
use trail_changelog::{process_change_list, SimpleTextChangeLog};
use trail_diff::{Diff, Differ, SnapshotSet};
use trail_ledger::HistoryValidator;
use trail_sdk::{JsonConverter, Trail, TrailConfig};
use trail_store::JsonFileRepository;
use trail_types::{CdoSnapshot, Commit, GlobalId};

use crate::cli::*;

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    let Cli {
        command,
        format,
        config,
        ..
    } = cli;
    let config = match config {
        Some(path) => TrailConfig::from_toml_file(&path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => TrailConfig::default(),
    };
    match command {
        Command::Diff(args) => cmd_diff(args, &config, format),
        Command::Changelog(args) => cmd_changelog(args, &config, format),
        Command::History(args) => cmd_history(args, &config, format),
        Command::Validate(args) => cmd_validate(args, &config, format),
        Command::Ids(args) => cmd_ids(args, &config, format),
    }
}

/// Contents accepted by `trail diff`.
#[derive(Deserialize)]
#[serde(untagged)]
enum SnapshotFile {
    Snapshots(Vec<CdoSnapshot>),
    Commit(Commit),
    Single(Box<CdoSnapshot>),
}

fn load_snapshots(path: &Path) -> anyhow::Result<Vec<CdoSnapshot>> {
    let text = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let file: SnapshotFile = serde_json::from_str(&text)
        .with_context(|| format!("{} holds no snapshots", path.display()))?;
    let snapshots = match file {
        SnapshotFile::Snapshots(snapshots) => snapshots,
        SnapshotFile::Commit(commit) => commit.snapshots,
        SnapshotFile::Single(snapshot) => vec![*snapshot],
    };
    debug!(path = %path.display(), snapshots = snapshots.len(), "loaded snapshots");
    Ok(snapshots)
}

fn diff_files(left: &Path, right: &Path, new_object_snapshot: bool) -> anyhow::Result<Diff> {
    let left = load_snapshots(left)?;
    let right = load_snapshots(right)?;
    let differ = Differ::new().with_new_object_snapshot(new_object_snapshot);
    Ok(differ.compare(
        &SnapshotSet::from_snapshots(&left),
        &SnapshotSet::from_snapshots(&right),
    ))
}

fn open_trail(log: &Path, config: &TrailConfig) -> anyhow::Result<Trail> {
    if !log.exists() {
        bail!("no commit log at {}", log.display());
    }
    let repository = JsonFileRepository::open(log)
        .with_context(|| format!("opening commit log {}", log.display()))?;
    Ok(Trail::builder()
        .config(config.clone())
        .repository(Arc::new(repository))
        .build()?)
}

fn parse_id(id: &str) -> anyhow::Result<GlobalId> {
    id.parse().with_context(|| format!("invalid global id {id:?}"))
}

fn render_history(history: &[CdoSnapshot]) -> String {
    let mut out = String::new();
    for snapshot in history {
        let kind = match snapshot.kind {
            trail_types::SnapshotKind::Initial => "initial".green(),
            trail_types::SnapshotKind::Update => "update".yellow(),
            trail_types::SnapshotKind::Terminal => "terminal".red(),
        };
        let _ = writeln!(
            out,
            "{} {}  commit {} by {} at {}",
            format!("v{}", snapshot.version).bold(),
            kind,
            snapshot.commit.id,
            snapshot.commit.author,
            snapshot.commit.timestamp.format("%Y-%m-%d %H:%M:%S UTC"),
        );
        for (name, value) in snapshot.state.iter() {
            let _ = writeln!(out, "  {} = {}", name.cyan(), value);
        }
    }
    out
}

fn cmd_diff(args: DiffArgs, config: &TrailConfig, format: OutputFormat) -> anyhow::Result<()> {
    let diff = diff_files(
        &args.left,
        &args.right,
        args.new_object_snapshot || config.new_object_snapshot,
    )?;
    match format {
        OutputFormat::Json => println!("{}", JsonConverter.to_json_pretty(&diff)?),
        OutputFormat::Text if diff.is_empty() => println!("No changes."),
        OutputFormat::Text => {
            print!("{}", process_change_list(&diff.changes, SimpleTextChangeLog::new()));
            println!(
                "{} changes: {} new, {} removed, {} property changes",
                diff.len().to_string().bold(),
                diff.new_objects().to_string().green(),
                diff.removed_objects().to_string().red(),
                diff.property_changes().to_string().yellow(),
            );
        }
    }
    Ok(())
}

fn cmd_changelog(args: LogQueryArgs, config: &TrailConfig, format: OutputFormat) -> anyhow::Result<()> {
    let trail = open_trail(&args.log.log, config)?;
    let id = parse_id(&args.id)?;
    let changes = trail.get_change_history(&id, args.limit)?;
    match format {
        OutputFormat::Json => println!("{}", trail.json().to_json_pretty(&changes)?),
        OutputFormat::Text if changes.is_empty() => println!("No changes recorded for {}.", id.to_string().bold()),
        OutputFormat::Text => print!("{}", trail.process_change_list(&changes, SimpleTextChangeLog::new())),
    }
    Ok(())
}

fn cmd_history(args: LogQueryArgs, config: &TrailConfig, format: OutputFormat) -> anyhow::Result<()> {
    let trail = open_trail(&args.log.log, config)?;
    let id = parse_id(&args.id)?;
    let history = trail.get_state_history(&id, args.limit)?;
    match format {
        OutputFormat::Json => println!("{}", trail.json().to_json_pretty(&history)?),
        OutputFormat::Text if history.is_empty() => println!("{} was never committed.", id.to_string().bold()),
        OutputFormat::Text => print!("{}", render_history(&history)),
    }
    Ok(())
}

fn cmd_validate(args: LogArgs, config: &TrailConfig, format: OutputFormat) -> anyhow::Result<()> {
    let trail = open_trail(&args.log, config)?;
    let reports = HistoryValidator::validate_all(trail.repository().as_ref())?;
    let invalid = reports.iter().filter(|r| !r.is_valid()).count();

    match format {
        OutputFormat::Json => println!("{}", trail.json().to_json_pretty(&reports)?),
        OutputFormat::Text => {
            for report in &reports {
                if report.is_valid() {
                    println!("{} {} ({} snapshots)", "✓".green(), report.global_id, report.snapshot_count);
                    continue;
                }
                println!("{} {}", "✗".red().bold(), report.global_id);
                for violation in &report.violations {
                    println!("  v{} {:?}: {}", violation.version, violation.kind, violation.description);
                }
            }
        }
    }
    if invalid > 0 {
        bail!("{invalid} of {} histories are invalid", reports.len());
    }
    if format == OutputFormat::Text {
        println!("{} {} histories verified", "✓".green().bold(), reports.len());
    }
    Ok(())
}

fn cmd_ids(args: LogArgs, config: &TrailConfig, format: OutputFormat) -> anyhow::Result<()> {
    let trail = open_trail(&args.log, config)?;
    let ids = trail.repository().global_ids()?;
    match format {
        OutputFormat::Json => println!("{}", trail.json().to_json_pretty(&ids)?),
        OutputFormat::Text => {
            for id in &ids {
                println!("{id}");
            }
        }
    }
    Ok(())
}
