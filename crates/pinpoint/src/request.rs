//! Outbound request construction.
//!
//! The wire contract is fixed: `q` carries the raw search text, and `lat`/`lon` follow
//! when a usable location is known, each with exactly four fractional digits. A
//! snapshot with a NaN or infinite coordinate is treated as no location. Optional
//! `limit`/`lang` parameters come last. Query parameters already present on the
//! configured endpoint (API keys and the like) are kept in front.

use url::Url;

use crate::{
    config::SearchConfig,
    error::{PinpointError, Result},
    location::LocationSnapshot,
};

pub const COORDINATE_PRECISION: usize = 4;

/// Fixed-point rendering used for `lat`/`lon`.
///
/// Rounds the exact binary value to the nearest representable four-digit decimal,
/// ties to even.
#[must_use]
pub fn format_coordinate(value: f64) -> String {
    format!("{value:.COORDINATE_PRECISION$}")
}

/// Build the full request URL for `text`, biased towards `location` when allowed.
pub fn build_request_url(
    config: &SearchConfig,
    text: &str,
    location: Option<LocationSnapshot>,
) -> Result<Url> {
    let mut url = config.endpoint.clone();
    if url.cannot_be_a_base() {
        return Err(PinpointError::EndpointNotQueryable(url.to_string()));
    }

    {
        let mut query = url.query_pairs_mut();
        query.append_pair("q", text);
        if let Some(location) = location.filter(|l| config.location_bias && l.is_finite()) {
            query.append_pair("lat", &format_coordinate(location.latitude));
            query.append_pair("lon", &format_coordinate(location.longitude));
        }
        if let Some(limit) = config.limit {
            query.append_pair("limit", &limit.to_string());
        }
        if let Some(language) = &config.language {
            query.append_pair("lang", language);
        }
    }

    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SearchConfigBuilder;

    fn query_of(url: &Url) -> Vec<(String, String)> {
        url.query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect()
    }

    #[test]
    fn test_coordinate_formatting() {
        assert_eq!(format_coordinate(38.89610), "38.8961");
        assert_eq!(format_coordinate(-77.03637), "-77.0364");
        assert_eq!(format_coordinate(38.896), "38.8960");
        assert_eq!(format_coordinate(-77.0223), "-77.0223");
        assert_eq!(format_coordinate(0.0), "0.0000");
        assert_eq!(format_coordinate(180.0), "180.0000");
    }

    #[test]
    fn test_query_without_location() {
        let config = SearchConfig::default();
        let url = build_request_url(&config, "coffee", None).unwrap();

        assert_eq!(url.as_str(), "https://photon.komoot.io/api/?q=coffee");
    }

    #[test]
    fn test_query_with_location() {
        let config = SearchConfig::default();
        let location = LocationSnapshot::new(38.89610, -77.03637);
        let url = build_request_url(&config, "coffee", Some(location)).unwrap();

        assert_eq!(
            url.query(),
            Some("q=coffee&lat=38.8961&lon=-77.0364"),
            "lat/lon must follow q with four fractional digits"
        );
    }

    #[test]
    fn test_text_is_url_encoded() {
        let config = SearchConfig::default();
        let url = build_request_url(&config, "café & bar/2", None).unwrap();

        assert_eq!(url.query(), Some("q=caf%C3%A9+%26+bar%2F2"));
        assert_eq!(
            query_of(&url),
            vec![("q".to_string(), "café & bar/2".to_string())]
        );
    }

    #[test]
    fn test_location_bias_can_be_disabled() {
        let config = SearchConfigBuilder::new().without_location_bias().build();
        let location = LocationSnapshot::new(40.7128, -74.0060);
        let url = build_request_url(&config, "pizza", Some(location)).unwrap();

        assert_eq!(url.query(), Some("q=pizza"));
    }

    #[test]
    fn test_non_finite_location_is_omitted() {
        let config = SearchConfig::default();
        for location in [
            LocationSnapshot::new(f64::NAN, -74.0060),
            LocationSnapshot::new(40.7128, f64::INFINITY),
        ] {
            let url = build_request_url(&config, "pizza", Some(location)).unwrap();
            assert_eq!(url.query(), Some("q=pizza"));
        }
    }

    #[test]
    fn test_optional_parameters_follow_location() {
        let config = SearchConfigBuilder::new().limit(5).language("en").build();
        let location = LocationSnapshot::new(40.7128, -74.0060);
        let url = build_request_url(&config, "pizza", Some(location)).unwrap();

        assert_eq!(
            url.query(),
            Some("q=pizza&lat=40.7128&lon=-74.0060&limit=5&lang=en")
        );
    }

    #[test]
    fn test_existing_endpoint_query_is_kept() {
        let config = SearchConfigBuilder::new()
            .endpoint("https://geo.example.org/search?api_key=abc")
            .unwrap()
            .build();
        let url = build_request_url(&config, "museum", None).unwrap();

        assert_eq!(url.query(), Some("api_key=abc&q=museum"));
    }

    #[test]
    fn test_unqueryable_endpoint_is_rejected() {
        let config = SearchConfig {
            endpoint: Url::parse("data:text/plain,hello").unwrap(),
            ..SearchConfig::default()
        };
        assert!(matches!(
            build_request_url(&config, "x", None),
            Err(PinpointError::EndpointNotQueryable(_))
        ));
    }
}
