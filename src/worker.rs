use crate::model::{is_success_status, Config, WorkerMessage};
use crate::term::log_line;
use crate::Error;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::{JoinError, JoinSet};

/// How long a worker at its concurrency cap waits before checking again.
pub const ADMISSION_BACKOFF: Duration = Duration::from_millis(1);

/// How a single request ended.
#[derive(Debug)]
pub enum Outcome {
    Status(u16),
    Failed(reqwest::Error),
    TimedOut,
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        match self {
            Outcome::Status(status) => is_success_status(*status),
            Outcome::Failed(_) | Outcome::TimedOut => false,
        }
    }
}

pub fn pick_endpoint<'a, R: Rng>(endpoints: &'a [String], rng: &mut R) -> &'a str {
    endpoints.choose(rng).map(String::as_str).unwrap_or("/")
}

/// Issue one GET. The body is drained before the status counts; if the
/// timeout fires first the request future is dropped, which aborts it.
pub async fn send_request(client: reqwest::Client, url: String, timeout: Duration) -> Outcome {
    let request = async {
        let response = client.get(&url).send().await?;
        let status = response.status().as_u16();
        response.bytes().await?;
        Ok::<_, reqwest::Error>(status)
    };

    match tokio::time::timeout(timeout, request).await {
        Ok(Ok(status)) => Outcome::Status(status),
        Ok(Err(e)) => Outcome::Failed(e),
        Err(_) => Outcome::TimedOut,
    }
}

async fn report(
    tx: &mpsc::Sender<WorkerMessage>,
    res: Result<Outcome, JoinError>,
) -> Result<(), Error> {
    // a panicked request task counts as a failed request
    let success = res.map(|outcome| outcome.is_success()).unwrap_or(false);
    tx.send(WorkerMessage::RequestComplete { success }).await?;
    Ok(())
}

/// Drive this worker's share of the load until its budget is spent and every
/// in-flight request has reported.
pub async fn worker(
    rank: usize,
    config: Config,
    m: MultiProgress,
    tx: mpsc::Sender<WorkerMessage>,
) -> Result<(), Error> {
    let share = config.share();
    let client = reqwest::Client::builder().build()?;
    let mut rng = StdRng::from_entropy();

    log_line(&m, format!("Worker {rank} started"))?;
    if share.concurrency == 0 {
        log_line(
            &m,
            format!("Worker {rank} has no concurrency share, issuing nothing"),
        )?;
        return Ok(());
    }

    let sty = ProgressStyle::with_template("{spinner} {msg}")?;
    let pb = m.add(ProgressBar::new_spinner());
    pb.set_style(sty);

    let mut in_flight = JoinSet::new();
    let mut sent = 0;

    loop {
        while let Some(res) = in_flight.try_join_next() {
            report(&tx, res).await?;
        }

        if sent >= share.budget {
            break;
        }

        if in_flight.len() >= share.concurrency {
            tokio::time::sleep(ADMISSION_BACKOFF).await;
            continue;
        }

        let url = config.endpoint_url(pick_endpoint(&config.endpoints, &mut rng));
        in_flight.spawn(send_request(client.clone(), url, config.timeout));
        sent += 1;

        pb.set_message(format!(
            "worker {rank}: {sent}/{} sent, {} in flight",
            share.budget,
            in_flight.len()
        ));
        pb.tick();
    }

    while let Some(res) = in_flight.join_next().await {
        report(&tx, res).await?;
    }

    pb.finish_with_message(format!("worker {rank}: budget of {} exhausted", share.budget));
    Ok(())
}
