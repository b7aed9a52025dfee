//! Pipeline runner for configured load tasks.
//!
//! Tasks have no ordering dependency on each other. They are dispatched
//! concurrently up to `max_parallel_tasks`, each on a blocking worker since
//! polars and SQLite calls are synchronous. A failing task never cancels its
//! siblings; every outcome is collected into the run summary.

#[cfg(test)]
pub mod tests;

use crate::config::PipelineConfig;
use crate::constants::{SPINNER_TEMPLATE, SPINNER_TICK_MS};
use crate::error::{LoaderError, Result};
use crate::loader::TabularLoader;
use crate::models::{LoadJob, RunSummary, TaskOutcome};
use crate::sink::ConnectionRegistry;

use chrono::Utc;
use futures::stream::{self, StreamExt};
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use polars::prelude::DataFrame;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task;
use tracing::{debug, error, info, warn};

/// Executes the tasks of a pipeline configuration
#[derive(Debug)]
pub struct Pipeline {
    config: PipelineConfig,
    loader: Arc<TabularLoader>,
    progress: Option<MultiProgress>,
}

impl Pipeline {
    /// Validate the configuration and build the shared loader
    pub fn new(config: PipelineConfig) -> Result<Self> {
        config.validate()?;

        let registry = ConnectionRegistry::from_config(&config.connections);
        let loader = TabularLoader::new(config.transform.clone(), registry);

        Ok(Self {
            config,
            loader: Arc::new(loader),
            progress: None,
        })
    }

    /// Show a spinner per running task
    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.progress = show_progress.then(MultiProgress::new);
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Jobs to run, optionally restricted to the given task ids
    pub fn select_jobs(&self, task_ids: &[String]) -> Result<Vec<LoadJob>> {
        let jobs = self.config.jobs();
        if task_ids.is_empty() {
            return Ok(jobs);
        }

        if let Some(unknown) = task_ids
            .iter()
            .find(|id| !jobs.iter().any(|job| &job.task_id == *id))
        {
            return Err(LoaderError::configuration(format!(
                "unknown task_id '{}'",
                unknown
            )));
        }

        Ok(jobs
            .into_iter()
            .filter(|job| task_ids.contains(&job.task_id))
            .collect())
    }

    /// Run the selected tasks and collect their outcomes in configuration order
    pub async fn run(&self, task_ids: &[String]) -> Result<RunSummary> {
        let jobs = self.select_jobs(task_ids)?;
        let started_at = Utc::now();
        let start_time = Instant::now();
        let settings = &self.config.pipeline;

        info!(
            "Starting pipeline '{}' with {} tasks ({} parallel)",
            settings.dag_id,
            jobs.len(),
            settings.max_parallel_tasks
        );

        let mut indexed: Vec<(usize, TaskOutcome)> = stream::iter(jobs.into_iter().enumerate())
            .map(|(index, job)| async move { (index, self.run_task(job).await) })
            .buffer_unordered(settings.max_parallel_tasks.max(1))
            .collect()
            .await;
        indexed.sort_by_key(|(index, _)| *index);

        let summary = RunSummary {
            dag_id: settings.dag_id.clone(),
            started_at,
            elapsed: start_time.elapsed(),
            outcomes: indexed.into_iter().map(|(_, outcome)| outcome).collect(),
        };

        info!(
            "Pipeline '{}' finished: {} succeeded, {} failed, {} rows loaded",
            summary.dag_id,
            summary.succeeded().count(),
            summary.failed().count(),
            summary.total_rows_loaded()
        );
        Ok(summary)
    }

    /// Extract and transform the selected tasks without loading anything
    pub async fn dry_run(&self, task_ids: &[String]) -> Result<Vec<(LoadJob, DataFrame)>> {
        let jobs = self.select_jobs(task_ids)?;

        stream::iter(jobs)
            .map(|job| {
                let loader = Arc::clone(&self.loader);
                async move {
                    let preview_job = job.clone();
                    let df = task::spawn_blocking(move || loader.preview(&preview_job))
                        .await
                        .map_err(|e| LoaderError::TaskFailed {
                            task_id: job.task_id.clone(),
                            reason: e.to_string(),
                        })??;
                    Ok::<_, LoaderError>((job, df))
                }
            })
            .buffered(self.config.pipeline.max_parallel_tasks.max(1))
            .collect::<Vec<Result<_>>>()
            .await
            .into_iter()
            .collect()
    }

    /// Run one task, retrying retryable failures up to the configured limit
    async fn run_task(&self, job: LoadJob) -> TaskOutcome {
        let max_attempts = self.config.pipeline.retries + 1;
        let spinner = self.create_spinner(&job);
        let mut attempts = 0;

        loop {
            attempts += 1;
            debug!(
                "Task '{}' attempt {}/{}",
                job.task_id, attempts, max_attempts
            );

            let loader = Arc::clone(&self.loader);
            let task_job = job.clone();
            let result = task::spawn_blocking(move || loader.run(&task_job))
                .await
                .unwrap_or_else(|e| {
                    Err(LoaderError::TaskFailed {
                        task_id: job.task_id.clone(),
                        reason: e.to_string(),
                    })
                });

            match result {
                Ok(stats) => {
                    if let Some(pb) = &spinner {
                        pb.finish_with_message(format!(
                            "{}: {} rows -> {}",
                            job.task_id, stats.rows_loaded, job.table_name
                        ));
                    }
                    return TaskOutcome {
                        task_id: job.task_id,
                        table_name: job.table_name,
                        attempts,
                        result: Ok(stats),
                    };
                }
                Err(e) if e.is_retryable() && attempts < max_attempts => {
                    warn!(
                        "Task '{}' failed on attempt {}: {}; retrying",
                        job.task_id, attempts, e
                    );
                    if let Some(pb) = &spinner {
                        pb.set_message(format!("{}: retrying ({})", job.task_id, attempts));
                    }
                    tokio::time::sleep(self.config.pipeline.retry_delay()).await;
                }
                Err(e) => {
                    error!("Task '{}' failed: {}", job.task_id, e);
                    if let Some(pb) = &spinner {
                        pb.abandon_with_message(format!("{}: failed", job.task_id));
                    }
                    return TaskOutcome {
                        task_id: job.task_id,
                        table_name: job.table_name,
                        attempts,
                        result: Err(e),
                    };
                }
            }
        }
    }

    fn create_spinner(&self, job: &LoadJob) -> Option<ProgressBar> {
        let multi = self.progress.as_ref()?;
        let pb = multi.add(ProgressBar::new_spinner());
        if let Ok(style) = ProgressStyle::default_spinner().template(SPINNER_TEMPLATE) {
            pb.set_style(style);
        }
        pb.set_message(format!("{}: loading {}", job.task_id, job.table_name));
        pb.enable_steady_tick(Duration::from_millis(SPINNER_TICK_MS));
        Some(pb)
    }
}
