use crate::Error;
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_URL: &str = "http://localhost:8080";
pub const TOTAL_REQUESTS: usize = 100_000;
pub const CONCURRENT_CONNECTIONS: usize = 1_000;
pub const REQUEST_TIMEOUT: Duration = Duration::from_millis(5000);
pub const ENDPOINTS: [&str; 2] = ["/health", "/api/quote/simple"];

/// A progress line is printed every time this many requests have completed.
pub const PROGRESS_INTERVAL: usize = 1000;

#[derive(Clone, Debug)]
pub struct Config {
    /// Base URL of the target, without a trailing slash.
    pub url: String,
    pub total_requests: usize,
    pub concurrency: usize,
    pub workers: usize,
    pub endpoints: Vec<String>,
    pub timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            url: DEFAULT_URL.to_string(),
            total_requests: TOTAL_REQUESTS,
            concurrency: CONCURRENT_CONNECTIONS,
            workers: num_cpus::get(),
            endpoints: ENDPOINTS.iter().map(|e| e.to_string()).collect(),
            timeout: REQUEST_TIMEOUT,
        }
    }
}

impl Config {
    pub fn validate(&self) -> Result<(), Error> {
        if self.workers == 0 {
            return Err(Error::InvalidConfig("worker count must be > 0".into()));
        }
        if self.total_requests == 0 {
            return Err(Error::InvalidConfig("total requests must be > 0".into()));
        }
        if self.timeout.is_zero() {
            return Err(Error::InvalidConfig("request timeout must be > 0".into()));
        }
        if self.endpoints.is_empty() {
            return Err(Error::InvalidConfig("endpoint list is empty".into()));
        }
        Ok(())
    }

    /// The slice of the global budget and concurrency cap owned by one worker.
    pub fn share(&self) -> Share {
        Share {
            budget: self.total_requests / self.workers,
            concurrency: self.concurrency / self.workers,
        }
    }

    pub fn endpoint_url(&self, path: &str) -> String {
        format!("{}{}", self.url.trim_end_matches('/'), path)
    }
}

/// Per-worker limits. Both are floor-divided, so `workers * budget` may fall
/// short of the configured total.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Share {
    pub budget: usize,
    pub concurrency: usize,
}

/// The only message a worker sends to the coordinator.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WorkerMessage {
    RequestComplete { success: bool },
}

pub fn is_success_status(status: u16) -> bool {
    (200..=299).contains(&status)
}
