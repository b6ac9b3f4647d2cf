// src/scheduler.rs
//! Fixed-interval driver: run an iteration, mark processed keys, sleep the
//! rest of the interval. Stops on the shutdown signal.

use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::time::{Duration, Instant};

use anyhow::{anyhow, Result};
use futures::FutureExt;
use tracing::{error, info, warn};

use crate::ingest::dedup::ProcessedSet;
use crate::pipeline::{IterationReport, Pipeline};
use crate::scrape::navigator::Navigator;

/// Time left in the interval, or `None` when the iteration overran it.
pub fn sleep_remainder(interval: Duration, elapsed: Duration) -> Option<Duration> {
    interval.checked_sub(elapsed).filter(|d| !d.is_zero())
}

#[derive(Debug, Clone, Copy)]
pub struct LoopOptions {
    pub interval: Duration,
    /// Stop after this many iterations (used by `--once`).
    pub max_iterations: Option<usize>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoopSummary {
    pub iterations: usize,
    pub failed_iterations: usize,
    pub processed: usize,
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s
    } else {
        "non-string panic payload"
    }
}

/// Add the iteration's keys to the processed set and persist it.
pub async fn apply_marks(seen: &mut ProcessedSet, report: &IterationReport) -> Result<usize> {
    let added = seen.extend(report.to_mark.iter().cloned());
    if added > 0 {
        seen.save().await?;
    }
    Ok(added)
}

pub async fn run_loop<N, S>(
    pipeline: &Pipeline<N>,
    seen: &mut ProcessedSet,
    opts: LoopOptions,
    shutdown: S,
) -> LoopSummary
where
    N: Navigator,
    S: Future<Output = ()>,
{
    tokio::pin!(shutdown);
    let mut summary = LoopSummary::default();

    info!(
        target: "scheduler",
        interval_secs = opts.interval.as_secs(),
        already_processed = seen.len(),
        "scheduler started"
    );

    loop {
        let iteration = summary.iterations + summary.failed_iterations + 1;
        let started = Instant::now();
        info!(target: "scheduler", iteration, at = %chrono::Utc::now().format("%Y-%m-%d %H:%M:%S"), "starting iteration");

        // A panicking stage fails this iteration only; nothing gets marked.
        let outcome = tokio::select! {
            _ = &mut shutdown => break,
            r = AssertUnwindSafe(pipeline.run_iteration(seen)).catch_unwind() => r,
        };
        let marked = match outcome {
            Ok(report) => apply_marks(seen, &report).await,
            Err(payload) => Err(anyhow!("iteration panicked: {}", panic_message(&*payload))),
        };

        match marked {
            Ok(added) => {
                summary.iterations += 1;
                info!(
                    target: "scheduler",
                    iteration,
                    newly_processed = added,
                    total_processed = seen.len(),
                    elapsed_secs = started.elapsed().as_secs_f64(),
                    "iteration finished"
                );
            }
            Err(e) => {
                summary.failed_iterations += 1;
                error!(
                    target: "scheduler",
                    iteration,
                    elapsed_secs = started.elapsed().as_secs_f64(),
                    error = %format!("{e:#}"),
                    "iteration failed"
                );
            }
        }
        metrics::gauge!("processed_keys").set(seen.len() as f64);
        crate::metrics::log_snapshot();

        if opts
            .max_iterations
            .is_some_and(|max| summary.iterations + summary.failed_iterations >= max)
        {
            break;
        }

        let elapsed = started.elapsed();
        match sleep_remainder(opts.interval, elapsed) {
            Some(wait) => {
                info!(target: "scheduler", wait_secs = wait.as_secs(), "waiting for next iteration");
                tokio::select! {
                    _ = &mut shutdown => break,
                    _ = tokio::time::sleep(wait) => {}
                }
            }
            None => {
                warn!(
                    target: "scheduler",
                    elapsed_secs = elapsed.as_secs(),
                    interval_secs = opts.interval.as_secs(),
                    "iteration overran the interval; starting next one now"
                );
            }
        }
    }

    summary.processed = seen.len();
    info!(
        target: "scheduler",
        iterations = summary.iterations,
        failed_iterations = summary.failed_iterations,
        unique_processed = summary.processed,
        "scheduler stopped"
    );
    summary
}
