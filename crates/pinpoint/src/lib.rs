//! Pinpoint - Point-of-Interest Search Orchestration
//!
//! Pinpoint turns raw, rapid-fire search input into well-formed geocoding requests and
//! normalises the answers into a flat list of points of interest. It owns the fiddly
//! parts of a search box: keeping exactly one request live, cancelling the previous one
//! when the user keeps typing, biasing queries towards the user's last known location,
//! and making sure a slow answer to an old query never overwrites a newer one.
//!
//! # Quick Start
//!
//! ```rust
//! use std::rc::Rc;
//!
//! use pinpoint::{
//!     Connectivity, FetchResponse, LocationSnapshot, LocationTracker, SearchConfig,
//!     SearchOrchestrator, StaticConnectivity,
//!     testing::{MockGeocodeClient, RecordingListener},
//! };
//!
//! let client = Rc::new(MockGeocodeClient::new());
//! let tracker = LocationTracker::new();
//! tracker.update(LocationSnapshot::new(40.7128, -74.0060));
//!
//! let mut search = SearchOrchestrator::new(
//!     SearchConfig::default(),
//!     Rc::clone(&client),
//!     &tracker,
//!     StaticConnectivity(Connectivity::Online),
//!     RecordingListener::default(),
//! )?;
//!
//! search.on_submit("coffee");
//! client.respond_latest(FetchResponse::ok(
//!     r#"{"features":[{"properties":{"name":"Cafe A"},"geometry":{"coordinates":[-74.01,40.71]}}]}"#,
//! ));
//! search.pump_completions();
//!
//! let (results, location) = search.listener().latest_results().unwrap();
//! assert_eq!(results[0].name, "Cafe A");
//! assert_eq!(location, Some(LocationSnapshot::new(40.7128, -74.0060)));
//! # Ok::<(), pinpoint::error::PinpointError>(())
//! ```
//!
//! # Failure model
//!
//! Searches never fail loudly. Offline dispatches, transport errors, non-success
//! statuses and stale answers are logged and dropped; malformed payloads degrade to
//! fewer (or zero) results. The listener only ever sees "started", "updated" and
//! "cancelled".
//!
//! # Transports
//!
//! The core is transport-agnostic: anything implementing [`GeocodeClient`] can carry
//! requests. The `pinpoint-http` crate provides a `reqwest`-based implementation.
use once_cell::sync::OnceCell;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::{EnvFilter, fmt::format::FmtSpan};

mod client;
mod config;
pub mod error;
mod location;
mod orchestrator;
mod parser;
mod request;
pub mod testing;
mod token;

pub use client::{Completion, FetchResponse, GeocodeClient, Responder, TransportError};
pub use config::{
    DEFAULT_ENDPOINT, ENV_ENDPOINT, ENV_LANG, ENV_LIMIT, SearchConfig, SearchConfigBuilder,
};
pub use location::{
    Connectivity, ConnectivityProvider, LocationProvider, LocationSnapshot, LocationTracker,
    SharedConnectivity, StaticConnectivity,
};
pub use orchestrator::{
    CompletionOutcome, DispatchOutcome, SearchListener, SearchMode, SearchOrchestrator,
};
pub use parser::{FeatureError, Poi, assemble_address, parse_features};
pub use request::{COORDINATE_PRECISION, build_request_url, format_coordinate};
pub use token::{RequestToken, TokenId, TokenState};
pub use url::Url;

static LOGGER_INIT: OnceCell<()> = OnceCell::new();

/// Initialize logging for the Pinpoint library.
///
/// This sets up structured logging with configurable levels and filtering.
/// `RUST_LOG` takes precedence over `level` when it is set. Calling this more
/// than once is harmless.
///
/// # Examples
///
/// ```rust
/// use pinpoint::init_logging;
/// use tracing::Level;
///
/// // Initialize with info-level logging
/// init_logging(Level::INFO)?;
/// # Ok::<(), pinpoint::error::PinpointError>(())
/// ```
pub fn init_logging(level: impl Into<LevelFilter>) -> Result<&'static (), error::PinpointError> {
    LOGGER_INIT.get_or_try_init(|| {
        let filter = EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(level.into().to_string()))?
            .add_directive("hyper_util=warn".parse()?)
            .add_directive("reqwest=warn".parse()?);

        // Another subscriber may already be installed by the host application.
        let _ = tracing_subscriber::fmt::fmt()
            .with_env_filter(filter)
            .with_span_events(FmtSpan::CLOSE)
            .try_init();
        Ok(())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_logging_is_idempotent() {
        assert!(init_logging(tracing::Level::WARN).is_ok());
        assert!(init_logging(tracing::Level::DEBUG).is_ok());
    }
}
