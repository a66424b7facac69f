//! Normalisation of geocoder responses into [`Poi`] records.
//!
//! The payload is a GeoJSON-style feature collection. Decoding is tolerant: an
//! undecodable body yields no results, and each feature is validated on its own so
//! one bad entry never costs the rest of the batch.

use itertools::Itertools;
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{debug, instrument};

/// Address parts in the order they are joined, regardless of payload key order.
const ADDRESS_KEYS: [&str; 4] = ["street", "city", "state", "country"];
const ADDRESS_SEPARATOR: &str = ", ";

/// A named point of interest returned by a search.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct Poi {
    pub name: String,
    /// Latitude in decimal degrees
    pub latitude: f64,
    /// Longitude in decimal degrees
    pub longitude: f64,
    /// Street, city, state and country joined with `", "`; empty when none are known.
    pub address: String,
}

/// Reason a single feature was skipped.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FeatureError {
    #[error("feature is not an object")]
    NotAnObject,
    #[error("missing string `properties.name`")]
    MissingName,
    #[error("missing `geometry.coordinates`")]
    MissingCoordinates,
    #[error("`geometry.coordinates` must be two numbers, got {0}")]
    InvalidCoordinates(String),
}

impl Poi {
    /// Validate and normalise one feature object.
    ///
    /// Coordinates follow the GeoJSON order: `[longitude, latitude]`.
    pub fn from_feature(feature: &Value) -> Result<Self, FeatureError> {
        let feature = feature.as_object().ok_or(FeatureError::NotAnObject)?;
        let properties = feature.get("properties").and_then(Value::as_object);

        let name = properties
            .and_then(|p| p.get("name"))
            .and_then(Value::as_str)
            .ok_or(FeatureError::MissingName)?;

        let coordinates = feature
            .get("geometry")
            .and_then(|g| g.get("coordinates"))
            .ok_or(FeatureError::MissingCoordinates)?;
        let (longitude, latitude) = match coordinates.as_array().map(Vec::as_slice) {
            Some([lon, lat]) => lon
                .as_f64()
                .zip(lat.as_f64())
                .ok_or_else(|| FeatureError::InvalidCoordinates(coordinates.to_string()))?,
            _ => return Err(FeatureError::InvalidCoordinates(coordinates.to_string())),
        };

        Ok(Self {
            name: name.to_string(),
            latitude,
            longitude,
            address: properties.map(assemble_address).unwrap_or_default(),
        })
    }
}

/// Join the string-valued address parts that are present, in fixed order.
///
/// Whitespace-only parts count as missing; the others are kept verbatim.
#[must_use]
pub fn assemble_address(properties: &Map<String, Value>) -> String {
    ADDRESS_KEYS
        .iter()
        .filter_map(|key| properties.get(*key).and_then(Value::as_str))
        .filter(|part| !part.trim().is_empty())
        .join(ADDRESS_SEPARATOR)
}

/// Parse a raw response body into points of interest, preserving feature order.
///
/// Never fails: missing bodies, invalid UTF-8, invalid JSON, non-object payloads and
/// a missing `features` array all produce an empty list.
///
/// ```rust
/// let body = br#"{"features":[{"properties":{"name":"Cafe A"},"geometry":{"coordinates":[-74.01,40.71]}}]}"#;
/// let pois = pinpoint::parse_features(Some(body));
/// assert_eq!(pois.len(), 1);
/// assert_eq!(pois[0].latitude, 40.71);
/// ```
#[instrument(name = "Parse features", level = "debug", skip_all, fields(bytes = body.map_or(0, <[u8]>::len)))]
pub fn parse_features(body: Option<&[u8]>) -> Vec<Poi> {
    let Some(body) = body else {
        debug!("Empty response body");
        return Vec::new();
    };
    let text = match std::str::from_utf8(body) {
        Ok(text) => text,
        Err(e) => {
            debug!(error = %e, "Response body is not UTF-8");
            return Vec::new();
        }
    };
    let payload: Value = match serde_json::from_str(text) {
        Ok(payload) => payload,
        Err(e) => {
            debug!(error = %e, "Response body is not JSON");
            return Vec::new();
        }
    };

    let Some(features) = payload
        .as_object()
        .and_then(|object| object.get("features"))
        .and_then(Value::as_array)
    else {
        debug!("Response has no `features` array");
        return Vec::new();
    };

    let pois: Vec<Poi> = features
        .iter()
        .enumerate()
        .filter_map(|(index, feature)| match Poi::from_feature(feature) {
            Ok(poi) => Some(poi),
            Err(reason) => {
                debug!(index, %reason, "Skipping malformed feature");
                None
            }
        })
        .collect();

    debug!(
        parsed = pois.len(),
        skipped = features.len() - pois.len(),
        "Parsed features"
    );
    pois
}
