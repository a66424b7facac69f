//! Interactive point-of-interest search
//!
//! This example wires a search session to the real HTTP transport:
//! - Reads the endpoint and options from `PINPOINT_*` environment variables
//! - Optionally biases searches with `--near <lat> <lon>`
//! - Submits every line typed on stdin and prints the results
//!
//! ```sh
//! cargo run -p pinpoint-http --example interactive_search -- --near 40.7128 -74.0060
//! ```

use pinpoint::{
    CompletionOutcome, Connectivity, DispatchOutcome, LocationSnapshot, LocationTracker, Poi,
    SearchConfig, SearchListener, SearchOrchestrator, StaticConnectivity,
};
use pinpoint_http::{HttpClientConfig, HttpGeocodeClient};
use tokio::io::{AsyncBufReadExt, BufReader};

struct PrintingListener;

impl SearchListener for PrintingListener {
    fn on_search_started(&mut self) {
        println!("Searching...");
    }

    fn on_results_updated(&mut self, results: Vec<Poi>, location: Option<LocationSnapshot>) {
        if let Some(location) = location {
            println!(
                "Results near ({:.4}, {:.4}):",
                location.latitude, location.longitude
            );
        }
        print_results(&results, 10);
    }

    fn on_search_cancelled(&mut self) {
        println!("Search cancelled");
    }

    fn telemetry_context(&self) -> &str {
        "interactive_search"
    }
}

fn print_results(results: &[Poi], limit: usize) {
    if results.is_empty() {
        println!("  No results");
        return;
    }
    for (i, poi) in results.iter().take(limit).enumerate() {
        println!(
            "  {}. {} ({:.5}, {:.5}) {}",
            i + 1,
            poi.name,
            poi.latitude,
            poi.longitude,
            poi.address
        );
    }
    if results.len() > limit {
        println!("  ... and {} more results", results.len() - limit);
    }
}

fn parse_near(args: &[String]) -> Result<Option<LocationSnapshot>, Box<dyn std::error::Error>> {
    match args {
        [flag, lat, lon, ..] if flag == "--near" => {
            Ok(Some(LocationSnapshot::new(lat.parse()?, lon.parse()?)))
        }
        [] => Ok(None),
        _ => Err("usage: interactive_search [--near <lat> <lon>]".into()),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    pinpoint::init_logging(tracing::Level::INFO)?;

    let args: Vec<String> = std::env::args().skip(1).collect();
    let tracker = LocationTracker::starting_at(parse_near(&args)?);

    let config = SearchConfig::from_env()?;
    println!("Using endpoint {}", config.endpoint);

    let client = HttpGeocodeClient::new(&HttpClientConfig::default())?;
    let mut search = SearchOrchestrator::new(
        config,
        client,
        &tracker,
        StaticConnectivity(Connectivity::Online),
        PrintingListener,
    )?;

    println!("Type a query and press enter (Ctrl-D to quit):");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let query = line.trim();
        if let DispatchOutcome::Issued(_) = search.on_submit(query)
            && let Some(CompletionOutcome::Failed) = search.next_completion().await
        {
            println!("  Search failed; see the log for details");
        }
    }

    search.close();
    Ok(())
}
