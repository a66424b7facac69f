//! Search session state machine.
//!
//! [`SearchOrchestrator`] turns input events into geocoding requests. It keeps at most
//! one request live, cancels the previous one whenever a new dispatch starts, and only
//! lets the most recent request's results reach the listener.
//!
//! Everything here runs on the owner's thread. Transports report back through a channel
//! and nothing touches orchestrator state until the owner drains it with
//! [`SearchOrchestrator::pump_completions`] or awaits
//! [`SearchOrchestrator::next_completion`].

use tokio::sync::{mpsc, watch};
use tracing::{debug, info, instrument, warn};

use crate::{
    client::{Completion, GeocodeClient, Responder},
    config::SearchConfig,
    error::{PinpointError, Result},
    location::{ConnectivityProvider, LocationProvider, LocationSnapshot},
    parser::{Poi, parse_features},
    request::build_request_url,
    token::{RequestToken, TokenId},
};

/// Whether typing triggers searches or only an explicit submit does.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SearchMode {
    /// As-you-type: input changes start an update cycle.
    Partial,
    /// Input changes are ignored until the query is submitted.
    #[default]
    Complete,
}

/// Receives the lifecycle events of a search session.
///
/// The listener only ever sees "started", "updated" (with zero or more results) and
/// "cancelled"; failures surface as an absence of updates.
pub trait SearchListener {
    fn on_search_started(&mut self);

    /// `location` is the snapshot that was current when the request was dispatched.
    fn on_results_updated(&mut self, results: Vec<Poi>, location: Option<LocationSnapshot>);

    fn on_search_cancelled(&mut self);

    fn is_presenting_default_results(&self) -> bool {
        false
    }

    /// Free-form tag attached to log spans for this session.
    fn telemetry_context(&self) -> &str {
        ""
    }

    fn is_caching_required(&self) -> bool {
        false
    }
}

/// What an input event did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// A request went out and is now the live one.
    Issued(TokenId),
    /// Empty input; listener received an empty result set.
    Cleared,
    /// Partial-mode input acknowledged without a network call.
    Deferred,
    /// Not online, so nothing was sent.
    SuppressedOffline,
    /// The request URL could not be built.
    Rejected,
    /// Nothing to do: empty submit, complete-mode typing, or a closed session.
    Ignored,
}

/// What a completion did once it reached the orchestrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionOutcome {
    /// Results were handed to the listener.
    Delivered { results: usize },
    /// The request failed; dropped without notifying the listener.
    Failed,
    /// The completion belongs to a superseded or cancelled request.
    Stale,
}

#[derive(Debug)]
struct InFlight {
    token: RequestToken,
    location: Option<LocationSnapshot>,
}

/// Owns one search session.
///
/// Created once per presentation of a search surface: it subscribes to location
/// updates when built and unsubscribes (and cancels any live request) on
/// [`close`](Self::close) or drop.
///
/// # Examples
///
/// ```rust
/// use pinpoint::{
///     Connectivity, DispatchOutcome, LocationTracker, SearchConfig, SearchOrchestrator,
///     StaticConnectivity,
///     testing::{MockGeocodeClient, RecordingListener},
/// };
/// use std::rc::Rc;
///
/// let client = Rc::new(MockGeocodeClient::new());
/// let mut search = SearchOrchestrator::new(
///     SearchConfig::default(),
///     Rc::clone(&client),
///     &LocationTracker::new(),
///     StaticConnectivity(Connectivity::Online),
///     RecordingListener::default(),
/// )?;
///
/// assert!(matches!(search.on_submit("coffee"), DispatchOutcome::Issued(_)));
/// assert_eq!(client.request_count(), 1);
/// # Ok::<(), pinpoint::error::PinpointError>(())
/// ```
pub struct SearchOrchestrator<C, N, L> {
    config: SearchConfig,
    client: C,
    connectivity: N,
    listener: L,
    mode: SearchMode,
    location: Option<LocationSnapshot>,
    location_updates: Option<watch::Receiver<Option<LocationSnapshot>>>,
    in_flight: Option<InFlight>,
    updating: bool,
    completions_tx: mpsc::UnboundedSender<Completion>,
    completions_rx: mpsc::UnboundedReceiver<Completion>,
    closed: bool,
}

impl<C, N, L> SearchOrchestrator<C, N, L>
where
    C: GeocodeClient,
    N: ConnectivityProvider,
    L: SearchListener,
{
    /// Start a session, subscribing to `location` and seeding the cache with its last value.
    #[instrument(name = "Create SearchOrchestrator", level = "debug", skip_all, fields(endpoint = %config.endpoint))]
    pub fn new(
        config: SearchConfig,
        client: C,
        location: &impl LocationProvider,
        connectivity: N,
        listener: L,
    ) -> Result<Self> {
        if config.endpoint.cannot_be_a_base() {
            return Err(PinpointError::EndpointNotQueryable(
                config.endpoint.to_string(),
            ));
        }

        let mut location_updates = location.subscribe();
        let initial = *location_updates.borrow_and_update();
        let (completions_tx, completions_rx) = mpsc::unbounded_channel();

        debug!(has_location = initial.is_some(), mode = ?config.initial_mode, "Search session started");
        Ok(Self {
            mode: config.initial_mode,
            config,
            client,
            connectivity,
            listener,
            location: initial,
            location_updates: Some(location_updates),
            in_flight: None,
            updating: false,
            completions_tx,
            completions_rx,
            closed: false,
        })
    }

    /// Handle a change of the search text.
    ///
    /// Empty text clears the results immediately. In partial mode non-empty text starts
    /// an update cycle; the suggestion request itself is not sent yet. Complete mode
    /// waits for [`on_submit`](Self::on_submit).
    #[instrument(name = "Input changed", level = "debug", skip_all, fields(mode = ?self.mode, len = text.len()))]
    pub fn on_input_changed(&mut self, text: &str) -> DispatchOutcome {
        if self.closed {
            return DispatchOutcome::Ignored;
        }
        self.sync_location();

        if text.is_empty() {
            self.updating = false;
            self.listener.on_results_updated(Vec::new(), None);
            return DispatchOutcome::Cleared;
        }

        match self.mode {
            SearchMode::Complete => DispatchOutcome::Ignored,
            SearchMode::Partial => {
                self.begin_update();
                if !self.connectivity.connectivity().is_online() {
                    debug!("Offline; skipping suggestions");
                    return DispatchOutcome::SuppressedOffline;
                }
                debug!("Suggestion requests are not dispatched while typing");
                DispatchOutcome::Deferred
            }
        }
    }

    /// Run a full search for `text`. Empty text is ignored.
    #[instrument(
        name = "Submit search",
        level = "info",
        skip_all,
        fields(
            query = text,
            telemetry = self.listener.telemetry_context(),
            default_results = self.listener.is_presenting_default_results(),
            caching = self.listener.is_caching_required(),
        )
    )]
    pub fn on_submit(&mut self, text: &str) -> DispatchOutcome {
        if self.closed || text.is_empty() {
            return DispatchOutcome::Ignored;
        }
        self.sync_location();

        self.updating = true;
        self.listener.on_search_started();
        self.dispatch(text)
    }

    /// The user dismissed the search. The live request, if any, keeps running.
    pub fn on_cancelled(&mut self) {
        if self.closed {
            return;
        }
        self.updating = false;
        self.listener.on_search_cancelled();
    }

    /// Replace the cached location. Does not start a search.
    pub fn on_location_updated(&mut self, snapshot: Option<LocationSnapshot>) {
        debug!(?snapshot, "Location updated");
        self.location = snapshot;
    }

    /// Apply every completion the transport has delivered so far.
    ///
    /// Returns how many completions were processed, stale ones included.
    pub fn pump_completions(&mut self) -> usize {
        if self.closed {
            return 0;
        }
        self.sync_location();

        let mut processed = 0;
        while let Ok(completion) = self.completions_rx.try_recv() {
            self.handle_completion(completion);
            processed += 1;
        }
        processed
    }

    /// Wait for the next completion and apply it.
    ///
    /// Returns `None` once the session is closed.
    pub async fn next_completion(&mut self) -> Option<CompletionOutcome> {
        if self.closed {
            return None;
        }
        let completion = self.completions_rx.recv().await?;
        self.sync_location();
        Some(self.handle_completion(completion))
    }

    pub fn set_mode(&mut self, mode: SearchMode) {
        if self.mode != mode {
            debug!(from = ?self.mode, to = ?mode, "Search mode changed");
            self.mode = mode;
        }
    }

    fn begin_update(&mut self) {
        if !self.updating {
            self.updating = true;
            self.listener.on_search_started();
        }
    }

    fn dispatch(&mut self, text: &str) -> DispatchOutcome {
        if let Some(previous) = self.in_flight.take()
            && previous.token.cancel()
        {
            debug!(token = %previous.token.id(), "Superseded in-flight request");
        }

        if !self.connectivity.connectivity().is_online() {
            info!("Offline; search not sent");
            self.updating = false;
            return DispatchOutcome::SuppressedOffline;
        }

        let location = self.location;
        let url = match build_request_url(&self.config, text, location) {
            Ok(url) => url,
            Err(e) => {
                warn!(error = %e, "Could not build search request");
                self.updating = false;
                return DispatchOutcome::Rejected;
            }
        };

        debug!(%url, "Dispatching search");
        let token = self
            .client
            .fetch(url, Responder::new(self.completions_tx.clone()));
        let id = token.id();
        self.in_flight = Some(InFlight { token, location });
        DispatchOutcome::Issued(id)
    }

    fn handle_completion(&mut self, completion: Completion) -> CompletionOutcome {
        let Completion { token, response } = completion;

        let Some(in_flight) = self
            .in_flight
            .take_if(|in_flight| in_flight.token.id() == token)
        else {
            debug!(%token, "Discarding stale completion");
            return CompletionOutcome::Stale;
        };
        if !in_flight.token.settle() {
            debug!(%token, "Discarding completion of a cancelled request");
            return CompletionOutcome::Stale;
        }

        if !response.is_success() {
            self.updating = false;
            warn!(
                %token,
                status = ?response.status,
                error = ?response.error,
                "Search request failed"
            );
            return CompletionOutcome::Failed;
        }

        let results = parse_features(response.body.as_deref());
        let count = results.len();
        info!(%token, results = count, "Search results updated");

        self.updating = false;
        self.listener
            .on_results_updated(results, in_flight.location);
        CompletionOutcome::Delivered { results: count }
    }

    fn sync_location(&mut self) {
        let Some(updates) = self.location_updates.as_mut() else {
            return;
        };
        match updates.has_changed() {
            Ok(true) => {
                let snapshot = *updates.borrow_and_update();
                self.on_location_updated(snapshot);
            }
            Ok(false) => {}
            Err(_) => {
                debug!("Location provider went away; keeping last known location");
                self.location_updates = None;
            }
        }
    }
}

impl<C, N, L> SearchOrchestrator<C, N, L> {
    #[must_use]
    pub const fn mode(&self) -> SearchMode {
        self.mode
    }

    /// Whether a search cycle has started and not yet finished.
    ///
    /// A submit that sends nothing (offline, unbuildable URL) does not leave the
    /// session updating, even though the listener already saw "started".
    #[must_use]
    pub const fn is_updating(&self) -> bool {
        self.updating
    }

    #[must_use]
    pub const fn cached_location(&self) -> Option<LocationSnapshot> {
        self.location
    }

    /// Token of the live request, if one is outstanding.
    #[must_use]
    pub fn current_token(&self) -> Option<&RequestToken> {
        self.in_flight.as_ref().map(|in_flight| &in_flight.token)
    }

    #[must_use]
    pub const fn config(&self) -> &SearchConfig {
        &self.config
    }

    #[must_use]
    pub const fn listener(&self) -> &L {
        &self.listener
    }

    pub const fn listener_mut(&mut self) -> &mut L {
        &mut self.listener
    }

    #[must_use]
    pub const fn is_closed(&self) -> bool {
        self.closed
    }

    /// Tear the session down: cancel the live request and stop listening for locations.
    ///
    /// Idempotent; also runs on drop.
    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        if let Some(in_flight) = self.in_flight.take() {
            in_flight.token.cancel();
        }
        self.location_updates = None;
        self.completions_rx.close();
        debug!("Search session closed");
    }
}

impl<C, N, L> Drop for SearchOrchestrator<C, N, L> {
    fn drop(&mut self) {
        self.close();
    }
}
