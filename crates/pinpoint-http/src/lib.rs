//! HTTP transport for Pinpoint.
//!
//! Provides [`HttpGeocodeClient`], a [`pinpoint::GeocodeClient`] that performs each
//! request as a task on a tokio runtime using `reqwest`. Cancelling a request's token
//! drops the in-progress request and answers with [`pinpoint::TransportError::Cancelled`].

mod client;

pub use client::{DEFAULT_TIMEOUT, DEFAULT_USER_AGENT, HttpClientConfig, HttpGeocodeClient};
pub use error::{HttpError, Result};

mod error {
    use thiserror::Error;

    pub type Result<T> = std::result::Result<T, HttpError>;

    #[derive(Error, Debug)]
    pub enum HttpError {
        #[error("HTTP error: {0}")]
        Http(#[from] reqwest::Error),
        #[error("No tokio runtime available: {0}")]
        NoRuntime(#[from] tokio::runtime::TryCurrentError),
    }
}
