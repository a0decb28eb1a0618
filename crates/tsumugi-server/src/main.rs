use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use tsumugi_core::cache::CacheOrchestrator;
use tsumugi_core::config::AppConfig;
use tsumugi_server::error::ServerError;
use tsumugi_server::redis_cache::RedisCache;
use tsumugi_server::AppState;

#[derive(Parser, Debug)]
#[command(name = "tsumugi", version)]
#[command(about = "Normalized anime metadata over AniList-compatible GraphQL backends")]
struct Cli {
    /// Config file (defaults to the platform config dir).
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), ServerError> {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tsumugi=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let config = AppConfig::load(cli.config.as_deref())?;

    let cache = connect_cache(config.cache.redis_url.as_deref()).await;
    let state = AppState::new(&config, cache)?;
    let app = tsumugi_server::app(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(
        endpoint = %config.upstream.endpoint,
        nsfw = config.content.nsfw,
        "tsumugi listening on {addr}"
    );
    axum::serve(listener, app).await?;
    Ok(())
}

/// Redis when configured and reachable, otherwise a pass-through cache.
async fn connect_cache(redis_url: Option<&str>) -> CacheOrchestrator {
    let Some(url) = redis_url.filter(|u| !u.is_empty()) else {
        info!("No Redis configured, caching disabled");
        return CacheOrchestrator::disabled();
    };
    match RedisCache::connect(url).await {
        Ok(cache) => CacheOrchestrator::new(Arc::new(cache)),
        Err(e) => {
            warn!(error = %e, "Redis unavailable, caching disabled");
            CacheOrchestrator::disabled()
        }
    }
}
