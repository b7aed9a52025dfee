//! Command implementations for the tabload CLI
//!
//! Each subcommand sets up logging, resolves its configuration and hands off
//! to the library. The returned flag tells `main` whether every task
//! succeeded.

use crate::cli::args::{Args, Commands, LoadArgs, RunArgs, ValidateArgs};
use crate::config::{PipelineConfig, TransformConfig, default_config_path};
use crate::constants::PREVIEW_ROWS;
use crate::loader::TabularLoader;
use crate::models::{LoadJob, LoadStats, RunSummary, TaskOutcome};
use crate::pipeline::Pipeline;
use crate::sink::{ConnectionHandle, ConnectionRegistry, validate_table_name};
use crate::{LoaderError, Result};

use anyhow::Context;
use colored::*;
use indicatif::HumanDuration;
use polars::prelude::DataFrame;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::task;
use tracing::{debug, info};

/// Connection id registered for one-off `load` invocations
const CLI_CONNECTION_ID: &str = "cli";

/// Main entry point for command execution
pub async fn run(args: Args) -> anyhow::Result<bool> {
    setup_logging(&args)?;
    debug!("Command line arguments: {:?}", args);

    match &args.command {
        Some(Commands::Run(run_args)) => run_pipeline(&args, run_args).await,
        Some(Commands::Load(load_args)) => run_load(load_args).await,
        Some(Commands::Validate(validate_args)) => validate_pipeline(validate_args),
        None => Ok(true),
    }
}

/// Set up structured logging based on CLI arguments
fn setup_logging(args: &Args) -> anyhow::Result<()> {
    use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

    let log_level = args.get_log_level();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("tabload={}", log_level)));

    if args.quiet {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_level(true)
                    .with_writer(std::io::stderr)
                    .compact(),
            )
            .try_init()
            .context("Failed to initialize logging")?;
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_level(true)
                    .with_timer(fmt::time::uptime())
                    .with_writer(std::io::stderr),
            )
            .try_init()
            .context("Failed to initialize logging")?;
    }

    debug!("Logging initialized at level: {}", log_level);
    Ok(())
}

/// Pick the pipeline file: explicit path first, then the default locations
fn resolve_config_path(explicit: Option<&Path>) -> Result<PathBuf> {
    match explicit {
        Some(path) => Ok(path.to_path_buf()),
        None => default_config_path().ok_or_else(|| {
            LoaderError::configuration(
                "no pipeline file given and none found at ./pipeline.toml or in the user config directory",
            )
        }),
    }
}

fn load_config(explicit: Option<&Path>) -> anyhow::Result<PipelineConfig> {
    let path = resolve_config_path(explicit)?;
    info!("Using pipeline file {}", path.display());
    PipelineConfig::load(&path)
        .with_context(|| format!("Failed to load pipeline file {}", path.display()))
}

async fn run_pipeline(args: &Args, run_args: &RunArgs) -> anyhow::Result<bool> {
    run_args.validate()?;

    let mut config = load_config(run_args.config.as_deref())?;
    if let Some(max_parallel) = run_args.max_parallel {
        config.pipeline = config.pipeline.with_max_parallel_tasks(max_parallel);
    }

    let pipeline = Pipeline::new(config)
        .context("Invalid pipeline configuration")?
        .with_progress(args.show_progress() && !run_args.no_progress);

    if run_args.dry_run {
        let previews = pipeline.dry_run(&run_args.tasks).await?;
        if !args.quiet {
            for (job, df) in &previews {
                print_preview(job, df);
            }
        }
        return Ok(true);
    }

    let summary = pipeline.run(&run_args.tasks).await?;
    if !args.quiet {
        print_summary(&summary);
    }
    Ok(summary.is_success())
}

async fn run_load(load_args: &LoadArgs) -> anyhow::Result<bool> {
    load_args.validate()?;
    validate_table_name(&load_args.table)?;

    let mut transform = TransformConfig::default();
    if let Some(rate) = load_args.tax_rate {
        transform = transform.with_tax_rate(rate);
    }
    if let Some(policy) = load_args.coercion_policy {
        transform = transform.with_coercion_policy(policy);
    }

    let mut registry = ConnectionRegistry::new();
    registry.register(ConnectionHandle::sqlite(
        CLI_CONNECTION_ID,
        &load_args.database,
    ));

    let loader = Arc::new(TabularLoader::new(transform, registry));
    let job = LoadJob::new(
        format!("load_{}", load_args.table),
        &load_args.source,
        &load_args.table,
        CLI_CONNECTION_ID,
    );

    if load_args.dry_run {
        let preview_job = job.clone();
        let df = task::spawn_blocking(move || loader.preview(&preview_job))
            .await
            .context("Load worker stopped unexpectedly")??;
        print_preview(&job, &df);
        return Ok(true);
    }

    let task_job = job.clone();
    let stats = task::spawn_blocking(move || loader.run(&task_job))
        .await
        .context("Load worker stopped unexpectedly")??;

    println!(
        "{} {}",
        "Loaded".bright_green().bold(),
        format_stats(&stats, &load_args.database.display().to_string())
    );
    Ok(true)
}

fn validate_pipeline(validate_args: &ValidateArgs) -> anyhow::Result<bool> {
    let config = load_config(validate_args.config.as_deref())?;
    config.validate().context("Invalid pipeline configuration")?;

    println!(
        "{} pipeline '{}' ({} tasks)",
        "Valid".bright_green().bold(),
        config.pipeline.dag_id.bright_cyan(),
        config.tasks.len()
    );
    for job in config.jobs() {
        println!(
            "  {} {} -> {}.{}",
            job.task_id.bright_yellow(),
            job.source_path.display(),
            job.connection_id,
            job.table_name
        );
    }
    Ok(true)
}

fn print_preview(job: &LoadJob, df: &DataFrame) {
    let (rows, columns) = df.shape();
    println!(
        "{} {} -> {} ({} rows, {} columns)",
        "Dry run".bright_blue().bold(),
        job.task_id.bright_yellow(),
        job.table_name,
        rows,
        columns
    );
    println!("{}", df.head(Some(PREVIEW_ROWS)));
}

fn print_summary(summary: &RunSummary) {
    println!();
    println!(
        "{} {} (started {})",
        "Pipeline".bright_green().bold(),
        summary.dag_id.bright_cyan(),
        summary.started_at.format("%Y-%m-%d %H:%M:%S UTC")
    );

    for outcome in &summary.outcomes {
        println!("  {}", format_outcome(outcome));
    }

    let succeeded = summary.succeeded().count();
    let failed = summary.failed().count();
    let counts = format!("{} succeeded, {} failed", succeeded, failed);
    println!(
        "  {} | {} rows loaded | {}",
        if failed == 0 {
            counts.bright_green()
        } else {
            counts.bright_red()
        },
        summary.total_rows_loaded(),
        HumanDuration(summary.elapsed)
    );
    println!();
}

fn format_outcome(outcome: &TaskOutcome) -> String {
    let attempts = if outcome.attempts > 1 {
        format!(" after {} attempts", outcome.attempts)
    } else {
        String::new()
    };

    match &outcome.result {
        Ok(stats) => format!(
            "{} {}: {}{}",
            "ok".bright_green(),
            outcome.task_id,
            format_stats(stats, &stats.table_name),
            attempts
        ),
        Err(e) => format!(
            "{} {}: {}{}",
            "failed".bright_red(),
            outcome.task_id,
            e,
            attempts
        ),
    }
}

fn format_stats(stats: &LoadStats, target: &str) -> String {
    format!(
        "{} rows into {} ({} dropped, {} columns, {})",
        stats.rows_loaded,
        target,
        stats.rows_dropped(),
        stats.columns.len(),
        HumanDuration(Duration::from_millis(stats.processing_time_ms as u64))
    )
}
