use loadgen::*;

use clap::Parser;
use indicatif::MultiProgress;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Base URL of the server
    #[arg(long, default_value = model::DEFAULT_URL)]
    url: String,

    /// Total number of requests across all workers
    #[arg(short = 'n', long, default_value_t = model::TOTAL_REQUESTS)]
    requests: usize,

    /// Total number of concurrent requests across all workers
    #[arg(short, long, default_value_t = model::CONCURRENT_CONNECTIONS)]
    concurrency: usize,

    /// Number of workers (defaults to the number of logical CPUs)
    #[arg(short, long)]
    workers: Option<usize>,

    /// Per-request timeout in milliseconds
    #[arg(short, long, default_value_t = model::REQUEST_TIMEOUT.as_millis() as u64)]
    timeout_ms: u64,

    /// Also print the final report as JSON
    #[arg(long)]
    json: bool,
}

async fn ctrl_c() {
    if tokio::signal::ctrl_c().await.is_err() {
        // no signal handler available; never interrupt
        std::future::pending::<()>().await;
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let defaults = model::Config::default();
    let config = model::Config {
        url: args.url,
        total_requests: args.requests,
        concurrency: args.concurrency,
        workers: args.workers.unwrap_or(defaults.workers),
        endpoints: defaults.endpoints,
        timeout: Duration::from_millis(args.timeout_ms),
    };

    let m = MultiProgress::new();
    let report = coordinator::run(config, m, ctrl_c()).await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    }

    Ok(())
}
