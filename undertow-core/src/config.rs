//! Centralized configuration for Undertow.
//!
//! All tunable parameters live here so upstream hosts, timeouts and
//! header values are not hard-coded in adapter code. Scraping upstreams
//! rotate domains regularly, so every base URL is a runtime setting.

use std::time::Duration;

/// Central configuration for all Undertow components.
///
/// Groups related settings into logical sections.
#[derive(Debug, Clone, Default)]
pub struct UndertowConfig {
    pub network: NetworkConfig,
    pub providers: ProvidersConfig,
    pub metadata: MetadataConfig,
}

/// HTTP transport configuration.
///
/// Applies to every upstream call made through the relay client.
#[derive(Debug, Clone)]
pub struct NetworkConfig {
    /// Bound on each upstream request; scraping targets hang often
    pub request_timeout: Duration,
    /// User agent presented to upstreams
    pub user_agent: &'static str,
    /// Optional relay endpoint; when set, requests are routed through it
    /// with the target URL as an encoded query parameter
    pub relay_base: Option<String>,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(15),
            user_agent: "undertow/0.1.0",
            relay_base: None,
        }
    }
}

/// Upstream base URLs for the source providers.
#[derive(Debug, Clone)]
pub struct ProvidersConfig {
    /// Gogo-style REST API root
    pub gogo_base: String,
    /// AllAnime GraphQL endpoint
    pub allanime_api: String,
    /// Referer the AllAnime API expects on every request
    pub allanime_referer: String,
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        Self {
            gogo_base: "https://api.gogoanime3.co".to_string(),
            allanime_api: "https://api.allanime.day/api".to_string(),
            allanime_referer: "https://allanime.to".to_string(),
        }
    }
}

/// Metadata catalog configuration.
#[derive(Debug, Clone)]
pub struct MetadataConfig {
    /// AniList GraphQL endpoint
    pub graphql_url: String,
}

impl Default for MetadataConfig {
    fn default() -> Self {
        Self {
            graphql_url: "https://graphql.anilist.co".to_string(),
        }
    }
}
