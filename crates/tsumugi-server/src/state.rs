use std::sync::Arc;

use tsumugi_api::{AniListClient, AniListError, AniListMeta};
use tsumugi_core::cache::CacheOrchestrator;
use tsumugi_core::config::AppConfig;

/// Shared handler state.
#[derive(Debug, Clone)]
pub struct AppState {
    pub search: Arc<AniListClient>,
    pub meta: Arc<AniListMeta>,
    pub cache: CacheOrchestrator,
    /// Default for the `isAdult` filter.
    pub nsfw: bool,
    pub default_provider: String,
}

impl AppState {
    pub fn new(config: &AppConfig, cache: CacheOrchestrator) -> Result<Self, AniListError> {
        let client = AniListClient::new(&config.upstream.endpoint, config.upstream_timeout())?;
        Ok(Self {
            search: Arc::new(client.clone()),
            meta: Arc::new(AniListMeta::new(client)),
            cache,
            nsfw: config.content.nsfw,
            default_provider: config.provider.default.clone(),
        })
    }

    /// Lower-cased provider name for cache keys.
    pub fn provider_name(&self, requested: Option<&str>) -> String {
        requested
            .filter(|p| !p.is_empty())
            .unwrap_or(&self.default_provider)
            .to_lowercase()
    }
}
