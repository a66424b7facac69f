//! In-memory collaborators for exercising a search session without a network.
//!
//! [`MockGeocodeClient`] records every request and lets the caller answer them in any
//! order; [`RecordingListener`] keeps every listener event for later assertions.

use std::cell::RefCell;

use url::Url;

use crate::{
    client::{FetchResponse, GeocodeClient, Responder},
    location::LocationSnapshot,
    orchestrator::SearchListener,
    parser::Poi,
    token::RequestToken,
};

struct RecordedRequest {
    url: Url,
    token: RequestToken,
    responder: Option<Responder>,
}

/// Transport that never touches the network.
///
/// Requests stay pending until answered with [`respond`](Self::respond). Like a
/// transport without real cancellation support, it will still deliver a response for a
/// cancelled token if asked to.
#[derive(Default)]
pub struct MockGeocodeClient {
    requests: RefCell<Vec<RecordedRequest>>,
}

impl MockGeocodeClient {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn request_count(&self) -> usize {
        self.requests.borrow().len()
    }

    /// URL of the `index`-th request, in dispatch order.
    #[must_use]
    pub fn url(&self, index: usize) -> Option<Url> {
        self.requests.borrow().get(index).map(|r| r.url.clone())
    }

    #[must_use]
    pub fn token(&self, index: usize) -> Option<RequestToken> {
        self.requests.borrow().get(index).map(|r| r.token.clone())
    }

    /// Answer the `index`-th request. Returns `false` if it does not exist or was
    /// already answered.
    pub fn respond(&self, index: usize, response: FetchResponse) -> bool {
        let (token, responder) = {
            let mut requests = self.requests.borrow_mut();
            let Some(request) = requests.get_mut(index) else {
                return false;
            };
            let Some(responder) = request.responder.take() else {
                return false;
            };
            (request.token.clone(), responder)
        };
        responder.respond(&token, response);
        true
    }

    /// Answer the most recent request.
    pub fn respond_latest(&self, response: FetchResponse) -> bool {
        match self.request_count() {
            0 => false,
            n => self.respond(n - 1, response),
        }
    }
}

impl GeocodeClient for MockGeocodeClient {
    fn fetch(&self, url: Url, responder: Responder) -> RequestToken {
        let token = RequestToken::new();
        self.requests.borrow_mut().push(RecordedRequest {
            url,
            token: token.clone(),
            responder: Some(responder),
        });
        token
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ListenerEvent {
    Started,
    ResultsUpdated(Vec<Poi>, Option<LocationSnapshot>),
    Cancelled,
}

/// Listener that remembers everything it was told.
#[derive(Debug, Clone, Default)]
pub struct RecordingListener {
    pub events: Vec<ListenerEvent>,
    pub telemetry_context: String,
}

impl RecordingListener {
    #[must_use]
    pub fn with_telemetry_context(context: impl Into<String>) -> Self {
        Self {
            events: Vec::new(),
            telemetry_context: context.into(),
        }
    }

    #[must_use]
    pub fn started_count(&self) -> usize {
        self.events
            .iter()
            .filter(|e| matches!(e, ListenerEvent::Started))
            .count()
    }

    /// Every result delivery, in order.
    pub fn updates(&self) -> impl Iterator<Item = (&[Poi], Option<LocationSnapshot>)> {
        self.events.iter().filter_map(|e| match e {
            ListenerEvent::ResultsUpdated(results, location) => {
                Some((results.as_slice(), *location))
            }
            _ => None,
        })
    }

    /// The most recent result delivery.
    #[must_use]
    pub fn latest_results(&self) -> Option<(&[Poi], Option<LocationSnapshot>)> {
        self.updates().last()
    }
}

impl SearchListener for RecordingListener {
    fn on_search_started(&mut self) {
        self.events.push(ListenerEvent::Started);
    }

    fn on_results_updated(&mut self, results: Vec<Poi>, location: Option<LocationSnapshot>) {
        self.events.push(ListenerEvent::ResultsUpdated(results, location));
    }

    fn on_search_cancelled(&mut self) {
        self.events.push(ListenerEvent::Cancelled);
    }

    fn telemetry_context(&self) -> &str {
        &self.telemetry_context
    }
}
