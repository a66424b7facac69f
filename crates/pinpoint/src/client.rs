//! The boundary between the orchestrator and whatever performs HTTP requests.
//!
//! A transport implements [`GeocodeClient`]. Each fetch gets a [`Responder`], which is
//! the only way to report the outcome back: it forwards a [`Completion`] over a channel
//! owned by the orchestrator, so the result is applied on the orchestrator's thread
//! no matter where the transport finished its work.

use bytes::Bytes;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::trace;
use url::Url;

use crate::token::{RequestToken, TokenId};

/// Why a fetch produced no usable response.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// The request's token was cancelled before a response arrived.
    #[error("request was cancelled")]
    Cancelled,
    #[error("request timed out")]
    Timeout,
    #[error("connection failed: {0}")]
    Connect(String),
    #[error("{0}")]
    Other(String),
}

/// Everything a transport knows about a finished request.
#[derive(Debug, Clone, Default)]
pub struct FetchResponse {
    /// HTTP status, absent when the request never got a response.
    pub status: Option<u16>,
    /// Raw response body.
    pub body: Option<Bytes>,
    pub error: Option<TransportError>,
}

impl FetchResponse {
    #[must_use]
    pub fn new(status: u16, body: impl Into<Bytes>) -> Self {
        Self {
            status: Some(status),
            body: Some(body.into()),
            error: None,
        }
    }

    #[must_use]
    pub fn ok(body: impl Into<Bytes>) -> Self {
        Self::new(200, body)
    }

    #[must_use]
    pub fn failed(error: TransportError) -> Self {
        Self {
            status: None,
            body: None,
            error: Some(error),
        }
    }

    /// A 2xx status with no transport error.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.error.is_none() && self.status.is_some_and(|s| (200..300).contains(&s))
    }
}

/// A response tagged with the token of the request it answers.
#[derive(Debug)]
pub struct Completion {
    pub token: TokenId,
    pub response: FetchResponse,
}

/// One-shot callback handed to [`GeocodeClient::fetch`].
///
/// Safe to move to another thread. Responding after the orchestrator is gone is
/// silently ignored.
#[derive(Debug)]
pub struct Responder {
    tx: mpsc::UnboundedSender<Completion>,
}

impl Responder {
    #[must_use]
    pub const fn new(tx: mpsc::UnboundedSender<Completion>) -> Self {
        Self { tx }
    }

    /// Deliver the outcome of the request identified by `token`.
    pub fn respond(self, token: &RequestToken, response: FetchResponse) {
        let completion = Completion {
            token: token.id(),
            response,
        };
        if self.tx.send(completion).is_err() {
            trace!(token = %token.id(), "Completion receiver dropped; discarding response");
        }
    }
}

/// Performs the network call for a fully formed request URL.
///
/// Implementations must not block: start the request, return its token, and call
/// [`Responder::respond`] at most once when it finishes or fails. A request abandoned
/// after cancellation may answer with [`TransportError::Cancelled`] or drop its
/// responder without answering. Honour cancellation where the underlying transport
/// allows it (see [`RequestToken::cancelled`]); timeouts are the transport's
/// responsibility.
pub trait GeocodeClient {
    fn fetch(&self, url: Url, responder: Responder) -> RequestToken;
}

impl<T: GeocodeClient + ?Sized> GeocodeClient for std::sync::Arc<T> {
    fn fetch(&self, url: Url, responder: Responder) -> RequestToken {
        (**self).fetch(url, responder)
    }
}

impl<T: GeocodeClient + ?Sized> GeocodeClient for std::rc::Rc<T> {
    fn fetch(&self, url: Url, responder: Responder) -> RequestToken {
        (**self).fetch(url, responder)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_requires_2xx_and_no_error() {
        assert!(FetchResponse::ok("{}").is_success());
        assert!(FetchResponse::new(204, "").is_success());
        assert!(!FetchResponse::new(404, "").is_success());
        assert!(!FetchResponse::new(500, "").is_success());
        assert!(!FetchResponse::failed(TransportError::Timeout).is_success());
        assert!(!FetchResponse::default().is_success());

        let mut response = FetchResponse::ok("{}");
        response.error = Some(TransportError::Other("reset".into()));
        assert!(!response.is_success());
    }

    #[test]
    fn test_responder_forwards_completion() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let token = RequestToken::new();
        Responder::new(tx).respond(&token, FetchResponse::ok("body"));

        let completion = rx.try_recv().expect("completion should be queued");
        assert_eq!(completion.token, token.id());
        assert_eq!(completion.response.status, Some(200));
    }

    #[test]
    fn test_responder_tolerates_closed_channel() {
        let (tx, rx) = mpsc::unbounded_channel();
        drop(rx);
        Responder::new(tx).respond(&RequestToken::new(), FetchResponse::ok("body"));
    }
}
