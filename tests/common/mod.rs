#![allow(dead_code)]

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::Router;
use indicatif::{MultiProgress, ProgressDrawTarget};
use loadgen::model::Config;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Counters observed by the stub server.
#[derive(Default)]
pub struct Hits {
    pub health: AtomicUsize,
    pub quote: AtomicUsize,
    pub in_flight: AtomicUsize,
    pub max_in_flight: AtomicUsize,
}

impl Hits {
    pub fn get(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }
}

async fn health(State(hits): State<Arc<Hits>>) -> StatusCode {
    hits.health.fetch_add(1, Ordering::SeqCst);
    StatusCode::OK
}

async fn quote(State(hits): State<Arc<Hits>>) -> StatusCode {
    hits.quote.fetch_add(1, Ordering::SeqCst);
    StatusCode::INTERNAL_SERVER_ERROR
}

async fn slow_ok(State(hits): State<Arc<Hits>>) -> StatusCode {
    let now = hits.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
    hits.max_in_flight.fetch_max(now, Ordering::SeqCst);
    tokio::time::sleep(Duration::from_millis(25)).await;
    hits.in_flight.fetch_sub(1, Ordering::SeqCst);
    StatusCode::OK
}

async fn hang() -> StatusCode {
    tokio::time::sleep(Duration::from_secs(30)).await;
    StatusCode::OK
}

/// Serves `/health` (200), `/api/quote/simple` (500), `/slow` (200 after
/// 25ms, tracking concurrency) and `/hang` (never answers in time).
pub async fn spawn_stub() -> (SocketAddr, Arc<Hits>) {
    let hits = Arc::new(Hits::default());
    let app = Router::new()
        .route("/health", get(health))
        .route("/api/quote/simple", get(quote))
        .route("/slow", get(slow_ok))
        .route("/hang", get(hang))
        .with_state(hits.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (addr, hits)
}

/// An address nothing is listening on.
pub fn closed_addr() -> SocketAddr {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap()
}

pub fn config(addr: SocketAddr, total_requests: usize, concurrency: usize, workers: usize) -> Config {
    Config {
        url: format!("http://{addr}"),
        total_requests,
        concurrency,
        workers,
        ..Config::default()
    }
}

pub fn hidden() -> MultiProgress {
    MultiProgress::with_draw_target(ProgressDrawTarget::hidden())
}
