//! Loads a patient's history from the hospital REST API.

pub mod client;
pub mod config;
pub mod endpoints;
pub mod fetch;
pub mod loader;

pub use client::{ApiClient, HttpClient};
pub use config::{ClientConfig, DEFAULT_TIMEOUT_SECS};
pub use endpoints::{endpoint, Endpoint};
pub use fetch::HistoryFetcher;
pub use loader::{HistoryLoader, LoadTicket};

use history_core::HistoryError;
use history_normalize::NormalizeError;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("invalid client configuration: {0}")]
    Config(String),
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{url} answered HTTP {status}: {body}")]
    Status { url: String, status: u16, body: String },
    #[error("could not decode response from {url}: {message}")]
    Decode { url: String, message: String },
}

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error(transparent)]
    InvalidPatientId(#[from] HistoryError),
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error(transparent)]
    Normalize(#[from] NormalizeError),
}
