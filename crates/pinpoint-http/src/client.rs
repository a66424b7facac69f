use std::time::Duration;

use pinpoint::{FetchResponse, GeocodeClient, RequestToken, Responder, TransportError, Url};
use reqwest::Client;
use tokio::runtime::Handle;
use tracing::{Instrument, debug, info_span};

use super::Result;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);
pub const DEFAULT_USER_AGENT: &str = concat!("pinpoint/", env!("CARGO_PKG_VERSION"));

/// Settings for the underlying `reqwest` client.
#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    /// Whole-request timeout, connection included.
    pub timeout: Duration,
    pub user_agent: String,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

/// [`GeocodeClient`] backed by `reqwest`.
///
/// Every fetch runs as its own task on the runtime the client was created with and
/// answers through the [`Responder`], so the orchestrator picks the result up on its
/// own thread.
#[derive(Debug, Clone)]
pub struct HttpGeocodeClient {
    client: Client,
    runtime: Handle,
}

impl HttpGeocodeClient {
    /// Build a client on the current tokio runtime.
    pub fn new(config: &HttpClientConfig) -> Result<Self> {
        Self::with_handle(config, Handle::try_current()?)
    }

    /// Build a client that spawns its requests on `runtime`.
    pub fn with_handle(config: &HttpClientConfig, runtime: Handle) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent.as_str())
            .build()?;
        Ok(Self { client, runtime })
    }
}

impl GeocodeClient for HttpGeocodeClient {
    fn fetch(&self, url: Url, responder: Responder) -> RequestToken {
        let token = RequestToken::new();
        let span = info_span!("Geocode request", token = %token.id(), url = %url);

        let client = self.client.clone();
        let task_token = token.clone();
        self.runtime.spawn(
            async move {
                let response = tokio::select! {
                    () = task_token.cancelled() => {
                        debug!("Request cancelled before completion");
                        FetchResponse::failed(TransportError::Cancelled)
                    }
                    response = execute(&client, url) => response,
                };
                responder.respond(&task_token, response);
            }
            .instrument(span),
        );
        token
    }
}

async fn execute(client: &Client, url: Url) -> FetchResponse {
    let response = match client.get(url).send().await {
        Ok(response) => response,
        Err(e) => {
            debug!(error = %e, "Request failed before a response arrived");
            return FetchResponse::failed(transport_error(&e));
        }
    };

    let status = response.status().as_u16();
    match response.bytes().await {
        Ok(body) => {
            debug!(status, bytes = body.len(), "Response received");
            FetchResponse::new(status, body)
        }
        Err(e) => {
            debug!(status, error = %e, "Failed to read response body");
            FetchResponse {
                status: Some(status),
                body: None,
                error: Some(transport_error(&e)),
            }
        }
    }
}

fn transport_error(error: &reqwest::Error) -> TransportError {
    if error.is_timeout() {
        TransportError::Timeout
    } else if error.is_connect() {
        TransportError::Connect(error.to_string())
    } else {
        TransportError::Other(error.to_string())
    }
}
