//! Integration tests for Pinpoint search sessions
//!
//! These tests drive the public API end to end with the in-memory transport and
//! listener from `pinpoint::testing`, checking the behaviour a search box relies on.

use std::rc::Rc;

use pinpoint::{
    CompletionOutcome, Connectivity, DispatchOutcome, FetchResponse, LocationSnapshot,
    LocationTracker, Poi, SearchConfig, SearchConfigBuilder, SearchOrchestrator,
    SharedConnectivity, TransportError,
    testing::{ListenerEvent, MockGeocodeClient, RecordingListener},
};

type Session = SearchOrchestrator<Rc<MockGeocodeClient>, SharedConnectivity, RecordingListener>;

fn setup_test_env() {
    let _ = pinpoint::init_logging(tracing::Level::WARN);
}

fn session(
    config: SearchConfig,
    tracker: &LocationTracker,
    connectivity: Connectivity,
) -> (Session, Rc<MockGeocodeClient>, SharedConnectivity) {
    setup_test_env();
    let client = Rc::new(MockGeocodeClient::new());
    let connectivity = SharedConnectivity::new(connectivity);
    let session = SearchOrchestrator::new(
        config,
        Rc::clone(&client),
        tracker,
        connectivity.clone(),
        RecordingListener::with_telemetry_context("integration"),
    )
    .expect("Should create search session");
    (session, client, connectivity)
}

const CAFE_A: &str = r#"{
    "type": "FeatureCollection",
    "features": [
        {
            "type": "Feature",
            "properties": { "name": "Cafe A" },
            "geometry": { "type": "Point", "coordinates": [-74.01, 40.71] }
        }
    ]
}"#;

#[test]
fn test_coffee_end_to_end() {
    let tracker = LocationTracker::new();
    tracker.update(LocationSnapshot::new(40.7128, -74.0060));
    let (mut search, client, _) = session(SearchConfig::default(), &tracker, Connectivity::Online);

    let outcome = search.on_submit("coffee");
    assert!(matches!(outcome, DispatchOutcome::Issued(_)));

    let url = client.url(0).expect("Should have issued a request");
    assert_eq!(url.host_str(), Some("photon.komoot.io"));
    assert_eq!(url.path(), "/api/");
    assert_eq!(url.query(), Some("q=coffee&lat=40.7128&lon=-74.0060"));

    assert!(client.respond(0, FetchResponse::ok(CAFE_A)));
    assert_eq!(search.pump_completions(), 1);

    let (results, location) = search
        .listener()
        .latest_results()
        .expect("Should have delivered results");
    assert_eq!(
        results,
        &[Poi {
            name: "Cafe A".to_string(),
            latitude: 40.71,
            longitude: -74.01,
            address: String::new(),
        }]
    );
    assert_eq!(location, Some(LocationSnapshot::new(40.7128, -74.0060)));
}

#[test]
fn test_query_without_known_location_omits_coordinates() {
    let tracker = LocationTracker::new();
    let (mut search, client, _) = session(SearchConfig::default(), &tracker, Connectivity::Online);

    search.on_submit("coffee shop");
    assert_eq!(client.url(0).unwrap().query(), Some("q=coffee+shop"));

    client.respond(0, FetchResponse::ok(CAFE_A));
    search.pump_completions();
    let (_, location) = search.listener().latest_results().unwrap();
    assert_eq!(location, None);
}

#[test]
fn test_location_updates_flow_from_tracker() {
    let tracker = LocationTracker::new();
    let (mut search, client, _) = session(SearchConfig::default(), &tracker, Connectivity::Online);
    assert_eq!(search.cached_location(), None);

    tracker.update(LocationSnapshot::new(38.89610, -77.03637));
    search.on_submit("monument");
    assert_eq!(
        client.url(0).unwrap().query(),
        Some("q=monument&lat=38.8961&lon=-77.0364")
    );

    tracker.clear();
    search.on_submit("monument");
    assert_eq!(client.url(1).unwrap().query(), Some("q=monument"));
}

#[test]
fn test_empty_text_never_hits_the_network() {
    let tracker = LocationTracker::starting_at(Some(LocationSnapshot::new(1.0, 1.0)));
    let (mut search, client, _) = session(
        SearchConfigBuilder::type_ahead().build(),
        &tracker,
        Connectivity::Online,
    );

    assert_eq!(search.on_input_changed(""), DispatchOutcome::Cleared);
    assert_eq!(search.on_submit(""), DispatchOutcome::Ignored);
    assert_eq!(client.request_count(), 0);
    assert_eq!(
        search.listener().events,
        vec![ListenerEvent::ResultsUpdated(Vec::new(), None)]
    );
}

#[test]
fn test_rapid_typing_last_dispatch_wins() {
    let tracker = LocationTracker::new();
    let (mut search, client, _) = session(SearchConfig::default(), &tracker, Connectivity::Online);

    for query in ["c", "co", "cof", "coff", "coffee"] {
        search.on_submit(query);
    }
    assert_eq!(client.request_count(), 5);
    for index in 0..4 {
        assert!(client.token(index).unwrap().is_cancelled());
    }

    // Answers arrive newest first, then the rest trickle in.
    client.respond(4, FetchResponse::ok(CAFE_A));
    for index in (0..4).rev() {
        client.respond(index, FetchResponse::ok(CAFE_A));
    }
    assert_eq!(search.pump_completions(), 5);
    assert_eq!(search.listener().updates().count(), 1);
    assert!(!search.is_updating());
}

#[test]
fn test_offline_then_online() {
    let tracker = LocationTracker::new();
    let (mut search, client, connectivity) =
        session(SearchConfig::default(), &tracker, Connectivity::Offline);

    assert_eq!(
        search.on_submit("coffee"),
        DispatchOutcome::SuppressedOffline
    );
    assert_eq!(client.request_count(), 0);
    assert_eq!(search.listener().events, vec![ListenerEvent::Started]);

    connectivity.set(Connectivity::Online);
    assert!(matches!(
        search.on_submit("coffee"),
        DispatchOutcome::Issued(_)
    ));
    assert_eq!(client.request_count(), 1);
}

#[test]
fn test_transport_failure_looks_like_no_update() {
    let tracker = LocationTracker::new();
    let (mut search, client, _) = session(SearchConfig::default(), &tracker, Connectivity::Online);

    search.on_submit("coffee");
    client.respond(
        0,
        FetchResponse::failed(TransportError::Connect("refused".into())),
    );
    search.pump_completions();

    assert_eq!(search.listener().events, vec![ListenerEvent::Started]);
}

#[test]
fn test_partial_batch_survives_bad_features() {
    let tracker = LocationTracker::new();
    let (mut search, client, _) = session(SearchConfig::default(), &tracker, Connectivity::Online);

    search.on_submit("main street");
    client.respond(
        0,
        FetchResponse::ok(
            r#"{"features": [
                {"properties": {"name": "Diner", "street": "Main St", "country": "USA"},
                 "geometry": {"coordinates": [-73.9, 40.7]}},
                {"properties": {"street": "Main St"},
                 "geometry": {"coordinates": [-73.8, 40.6]}}
            ]}"#,
        ),
    );
    search.pump_completions();

    let (results, _) = search.listener().latest_results().unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].name, "Diner");
    assert_eq!(results[0].address, "Main St, USA");
}

#[test]
fn test_configured_parameters_reach_the_wire() {
    let tracker = LocationTracker::starting_at(Some(LocationSnapshot::new(52.52, 13.405)));
    let config = SearchConfigBuilder::new()
        .endpoint("http://localhost:2322/api")
        .expect("Should accept endpoint")
        .limit(3)
        .language("de")
        .build();
    let (mut search, client, _) = session(config, &tracker, Connectivity::Online);

    search.on_submit("Brandenburger Tor");
    assert_eq!(
        client.url(0).unwrap().as_str(),
        "http://localhost:2322/api?q=Brandenburger+Tor&lat=52.5200&lon=13.4050&limit=3&lang=de"
    );
}

#[tokio::test]
async fn test_async_host_drives_completions() {
    let tracker = LocationTracker::new();
    let (mut search, client, _) = session(SearchConfig::default(), &tracker, Connectivity::Online);

    search.on_submit("tea");
    search.on_submit("coffee");
    client.respond(1, FetchResponse::ok(CAFE_A));
    client.respond(0, FetchResponse::ok(CAFE_A));

    assert_eq!(
        search.next_completion().await,
        Some(CompletionOutcome::Delivered { results: 1 })
    );
    assert_eq!(
        search.next_completion().await,
        Some(CompletionOutcome::Stale)
    );
}

#[test]
fn test_session_teardown() {
    let tracker = LocationTracker::new();
    let (mut search, client, _) = session(SearchConfig::default(), &tracker, Connectivity::Online);
    assert_eq!(tracker.subscriber_count(), 1);

    search.on_submit("coffee");
    drop(search);

    assert!(client.token(0).unwrap().is_cancelled());
    assert_eq!(tracker.subscriber_count(), 0);
    // Answering after teardown goes nowhere.
    assert!(client.respond(0, FetchResponse::ok(CAFE_A)));
}
