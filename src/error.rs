use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),

    /// The coordinator went away while a worker still had outcomes to report.
    #[error("coordinator channel closed")]
    ChannelClosed,

    #[error("invalid progress template: {0}")]
    Template(#[from] indicatif::style::TemplateError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to encode report: {0}")]
    Json(#[from] serde_json::Error),
}

impl<T> From<tokio::sync::mpsc::error::SendError<T>> for Error {
    fn from(_: tokio::sync::mpsc::error::SendError<T>) -> Self {
        Error::ChannelClosed
    }
}
