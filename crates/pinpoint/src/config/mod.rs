use url::Url;

use crate::{
    error::{PinpointError, Result},
    orchestrator::SearchMode,
};

/// Public Photon instance; its `/api/` endpoint speaks the `q`/`lat`/`lon` dialect.
pub const DEFAULT_ENDPOINT: &str = "https://photon.komoot.io/api/";

pub const ENV_ENDPOINT: &str = "PINPOINT_ENDPOINT";
pub const ENV_LIMIT: &str = "PINPOINT_LIMIT";
pub const ENV_LANG: &str = "PINPOINT_LANG";

/// Configuration for a search session.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct SearchConfig {
    /// Geocoding endpoint; the query string is appended to it.
    pub endpoint: Url,
    /// Mode the orchestrator starts in.
    pub initial_mode: SearchMode,
    /// Optional `limit` parameter forwarded to the service.
    pub limit: Option<usize>,
    /// Optional `lang` parameter forwarded to the service.
    pub language: Option<String>,
    /// Send the cached location as `lat`/`lon` when one is known.
    pub location_bias: bool,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            endpoint: Url::parse(DEFAULT_ENDPOINT).expect("default endpoint is a valid URL"),
            initial_mode: SearchMode::default(),
            limit: None,
            language: None,
            location_bias: true,
        }
    }
}

impl SearchConfig {
    #[must_use]
    pub fn builder() -> SearchConfigBuilder {
        SearchConfigBuilder::new()
    }

    /// Defaults overlaid with `PINPOINT_ENDPOINT`, `PINPOINT_LIMIT` and `PINPOINT_LANG`.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Like [`from_env`](Self::from_env) but reads variables through `lookup`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut builder = SearchConfigBuilder::new();
        if let Some(endpoint) = lookup(ENV_ENDPOINT) {
            builder = builder.endpoint(&endpoint)?;
        }
        if let Some(limit) = lookup(ENV_LIMIT) {
            let limit = limit.trim().parse::<usize>().map_err(|e| {
                PinpointError::ConfigError(format!("{ENV_LIMIT} must be a positive integer: {e}"))
            })?;
            builder = builder.limit(limit);
        }
        if let Some(lang) = lookup(ENV_LANG).filter(|l| !l.trim().is_empty()) {
            builder = builder.language(lang.trim());
        }
        builder.try_build()
    }
}

/// Builder for creating search configurations with ergonomic defaults
#[derive(Debug, Clone, Default)]
pub struct SearchConfigBuilder {
    config: SearchConfig,
}

impl SearchConfigBuilder {
    /// Create a new builder with sensible defaults
    pub fn new() -> Self {
        Self {
            config: SearchConfig::default(),
        }
    }

    /// As-you-type preset: starts in partial mode and asks for a short result list
    pub fn type_ahead() -> Self {
        Self::new().mode(SearchMode::Partial).limit(5)
    }

    /// Submit-only preset: starts in complete mode with the service's default result count
    pub fn submit_only() -> Self {
        Self::new().mode(SearchMode::Complete)
    }

    /// Point the session at another geocoding endpoint
    pub fn endpoint(mut self, endpoint: &str) -> Result<Self> {
        let url = Url::parse(endpoint)?;
        if url.cannot_be_a_base() || !matches!(url.scheme(), "http" | "https") {
            return Err(PinpointError::EndpointNotQueryable(endpoint.to_string()));
        }
        self.config.endpoint = url;
        Ok(self)
    }

    pub fn mode(mut self, mode: SearchMode) -> Self {
        self.config.initial_mode = mode;
        self
    }

    /// Set the maximum number of results to request
    pub fn limit(mut self, limit: usize) -> Self {
        self.config.limit = Some(limit);
        self
    }

    /// Preferred result language, e.g. `"en"` or `"de"`
    pub fn language(mut self, language: impl Into<String>) -> Self {
        self.config.language = Some(language.into());
        self
    }

    /// Never send the cached location with a request
    pub fn without_location_bias(mut self) -> Self {
        self.config.location_bias = false;
        self
    }

    /// Build the final configuration
    pub fn build(self) -> SearchConfig {
        self.config
    }

    /// Build, rejecting values the service would refuse
    pub fn try_build(self) -> Result<SearchConfig> {
        if self.config.limit == Some(0) {
            return Err(PinpointError::ConfigError(
                "Result limit must be at least 1".to_string(),
            ));
        }
        Ok(self.config)
    }
}
