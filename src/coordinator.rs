use crate::model::{Config, WorkerMessage, PROGRESS_INTERVAL};
use crate::term::log_line;
use crate::worker::worker;
use crate::Error;
use chrono::{DateTime, Utc};
use console::style;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use serde::Serialize;
use std::future::Future;
use tokio::sync::mpsc;
use tokio::task::{JoinError, JoinSet};

/// Running totals. Only the coordinator loop mutates this.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Tally {
    pub completed: usize,
    pub failed: usize,
}

impl Tally {
    /// Count one outcome. Returns true when a progress line is due.
    pub fn record(&mut self, success: bool) -> bool {
        self.completed += 1;
        if !success {
            self.failed += 1;
        }
        self.completed % PROGRESS_INTERVAL == 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// The completed count reached the configured total.
    Completed,
    /// Every worker exited before the total was reached.
    Stalled,
    /// The shutdown signal fired first.
    Interrupted,
}

#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub status: RunStatus,
    pub total_requests: usize,
    pub completed: usize,
    pub failed: usize,
    pub elapsed_secs: f64,
    pub success_rate: f64,
    pub rate: f64,
}

impl Report {
    pub fn new(status: RunStatus, total_requests: usize, tally: Tally, elapsed_secs: f64) -> Self {
        let success_rate = if tally.completed == 0 {
            0.0
        } else {
            (tally.completed - tally.failed) as f64 / tally.completed as f64 * 100.0
        };
        Self {
            status,
            total_requests,
            completed: tally.completed,
            failed: tally.failed,
            elapsed_secs,
            success_rate,
            rate: rate(tally.completed, elapsed_secs),
        }
    }

    pub fn summary_lines(&self) -> Vec<String> {
        vec![
            format!("Total requests: {}", self.completed),
            format!("Failed requests: {}", self.failed),
            format!("Success rate: {:.2}%", self.success_rate),
            format!("Total time: {:.2} seconds", self.elapsed_secs),
            format!("Average rate: {} req/s", self.rate.round()),
        ]
    }
}

fn rate(completed: usize, elapsed_secs: f64) -> f64 {
    if elapsed_secs > 0.0 {
        completed as f64 / elapsed_secs
    } else {
        0.0
    }
}

pub fn progress_line(tally: &Tally, total_requests: usize, elapsed_secs: f64) -> String {
    let percent = tally.completed as f64 / total_requests as f64 * 100.0;
    format!(
        "Completed: {}/{} ({}%) - Rate: {} req/s - Failed: {}",
        tally.completed,
        total_requests,
        percent.round(),
        rate(tally.completed, elapsed_secs).round(),
        tally.failed
    )
}

fn elapsed_secs(start: DateTime<Utc>) -> f64 {
    (Utc::now() - start).num_milliseconds() as f64 / 1000.0
}

/// Spawn the workers and aggregate their outcomes until the configured total
/// is reached or `shutdown` resolves. If every worker exits short of the
/// total, the run reports the stall and then waits for `shutdown`.
pub async fn run(
    config: Config,
    m: MultiProgress,
    shutdown: impl Future<Output = ()>,
) -> Result<Report, Error> {
    config.validate()?;

    log_line(
        &m,
        format!(
            "Starting load test with {} requests and {} concurrent connections against {}",
            config.total_requests, config.concurrency, config.url
        ),
    )?;
    log_line(&m, format!("Using {} workers", config.workers))?;

    let sty = ProgressStyle::with_template(
        "{spinner} [{elapsed_precise}] {bar:40} {pos}/{len} {msg}",
    )?;
    let pb = m.add(ProgressBar::new(config.total_requests as u64));
    pb.set_style(sty);

    let (tx, mut rx) = mpsc::channel(100);

    let mut set = JoinSet::new();
    for rank in 0..config.workers {
        let worker = worker(rank, config.clone(), m.clone(), tx.clone());
        set.spawn(async move { (rank, worker.await) });
    }

    drop(tx);

    let start = Utc::now();
    let mut tally = Tally::default();
    tokio::pin!(shutdown);

    let status = loop {
        tokio::select! {
            msg = rx.recv() => {
                let Some(WorkerMessage::RequestComplete { success }) = msg else {
                    // every sender is gone; collect the exits before giving up
                    while let Some(res) = set.join_next().await {
                        log_exit(&m, res)?;
                    }
                    break RunStatus::Stalled;
                };
                let due = tally.record(success);
                pb.inc(1);
                pb.set_message(format!("failed: {}", tally.failed));
                if due {
                    let line = progress_line(&tally, config.total_requests, elapsed_secs(start));
                    log_line(&m, line)?;
                }
                if tally.completed >= config.total_requests {
                    break RunStatus::Completed;
                }
            }
            Some(res) = set.join_next() => log_exit(&m, res)?,
            _ = &mut shutdown => break RunStatus::Interrupted,
        }
    };

    set.abort_all();
    if status == RunStatus::Stalled {
        pb.abandon();
    } else {
        pb.finish();
    }

    let report = Report::new(status, config.total_requests, tally, elapsed_secs(start));
    for line in closing_lines(&report) {
        log_line(&m, line)?;
    }

    // a stalled run never reaches its target; it only ends on shutdown
    if status == RunStatus::Stalled {
        shutdown.await;
    }

    Ok(report)
}

type WorkerExit = Result<(usize, Result<(), Error>), JoinError>;

fn exit_line(res: &WorkerExit) -> Option<String> {
    match res {
        Ok((_, Ok(()))) => None,
        Ok((rank, Err(e))) => Some(format!("Worker {rank} died: {e}")),
        Err(e) => Some(format!("Worker died: {e}")),
    }
}

fn log_exit(m: &MultiProgress, res: WorkerExit) -> std::io::Result<()> {
    match exit_line(&res) {
        Some(line) => log_line(m, line),
        None => Ok(()),
    }
}

/// Lines printed once the run loop ends. A stalled run gets no summary.
pub fn closing_lines(report: &Report) -> Vec<String> {
    let heading = match report.status {
        RunStatus::Completed => style("Load test completed!").bold().green(),
        RunStatus::Interrupted => style("Load test interrupted").bold().yellow(),
        RunStatus::Stalled => {
            return vec![style(format!(
                "All workers exited after {}/{} requests; target not reached",
                report.completed, report.total_requests
            ))
            .yellow()
            .to_string()];
        }
    };

    let mut lines = vec![String::new(), heading.to_string()];
    lines.extend(report.summary_lines());
    lines
}
