//! HTTP surface under `/meta/anilist`.

use std::time::Duration;

use axum::{
    extract::{Path, Query, State},
    http::Method,
    routing::get,
    Json, Router,
};
use chrono::{Datelike, Weekday};
use serde::Deserialize;
use serde_json::{json, Value};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tsumugi_api::anilist::query::{validate_genres, MediaType, SearchRequest, Season};
use tsumugi_api::episodes::{shape_episodes, EpisodeEntry};
use tsumugi_api::random::RandomPicker;
use tsumugi_api::traits::{validate_server, AiringScheduleQuery};
use tsumugi_api::{AniListError, MediaSearch, MetaProvider, SearchResult};
use tsumugi_core::cache::{cache_key, ttl};
use tsumugi_core::config::parse_flag;

use crate::error::ApiResult;
use crate::state::AppState;

const TRENDING_SORT: &[&str] = &["TRENDING_DESC", "POPULARITY_DESC"];
const POPULAR_SORT: &[&str] = &["POPULARITY_DESC"];

const TRENDING_NAMESPACE: &str = "anilist:trending";
const POPULAR_NAMESPACE: &str = "anilist:popular";
const INFO_NAMESPACE: &str = "anilist:info";
const EPISODES_NAMESPACE: &str = "anilist:episodes";
const WATCH_NAMESPACE: &str = "anilist:watch";

/// Full application: routes, CORS and request tracing.
pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET])
        .allow_headers(Any);

    Router::new()
        .nest("/meta/anilist", anilist_routes())
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn anilist_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(index))
        .route("/advanced-search", get(advanced_search))
        .route("/trending", get(trending))
        .route("/popular", get(popular))
        .route("/genre", get(genre))
        .route("/airing-schedule", get(airing_schedule))
        .route("/recent-episodes", get(recent_episodes))
        .route("/random-anime", get(random_anime))
        .route("/servers/{id}", get(servers))
        .route("/episodes/{id}", get(episodes))
        .route("/data/{id}", get(data))
        .route("/info/{id}", get(info))
        .route("/character/{id}", get(character))
        .route("/watch/{episode_id}", get(watch))
        .route("/{query}", get(search))
}

// ── Query parameters ─────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageParams {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdvancedParams {
    pub query: Option<String>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    #[serde(rename = "type")]
    pub media_type: Option<String>,
    /// JSON array, e.g. `["Action","Drama"]`.
    pub genres: Option<String>,
    pub id: Option<u64>,
    pub format: Option<String>,
    /// JSON array of `MediaSort` values.
    pub sort: Option<String>,
    pub status: Option<String>,
    pub year: Option<u32>,
    pub season: Option<String>,
    pub nsfw: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenreParams {
    pub genres: Option<String>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AiringParams {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    pub week_start: Option<i64>,
    pub week_end: Option<i64>,
    pub not_yet_aired: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InfoParams {
    pub provider: Option<String>,
    pub dub: Option<String>,
    pub fetch_filler: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct WatchParams {
    pub provider: Option<String>,
    pub server: Option<String>,
}

fn flag(value: Option<&str>) -> bool {
    value.is_some_and(parse_flag)
}

/// Decode a JSON-array query value.
fn parse_list(raw: &str, field: &str) -> Result<Vec<String>, AniListError> {
    serde_json::from_str(raw).map_err(|_| {
        AniListError::InvalidInput(format!("{field} must be a JSON array of strings"))
    })
}

fn preset(sort: &[&str]) -> Option<Vec<String>> {
    Some(sort.iter().map(|s| s.to_string()).collect())
}

// ── Cache keys ───────────────────────────────────────────────────

/// `namespace;page;perPage`, with paging defaulted to 1 and 20.
fn listing_key(namespace: &str, params: &PageParams) -> String {
    let page = params.page.unwrap_or(1);
    let per_page = params.per_page.unwrap_or(20);
    cache_key(namespace, &[&page, &per_page])
}

/// Key shared by the info and episodes lookups.
fn info_key(namespace: &str, id: &str, dub: bool, fetch_filler: bool, provider: &str) -> String {
    cache_key(namespace, &[&id, &dub, &fetch_filler, &provider])
}

fn watch_key(episode_id: &str, provider: &str, server: Option<&str>) -> String {
    cache_key(
        WATCH_NAMESPACE,
        &[&episode_id, &provider, &server.unwrap_or("default")],
    )
}

/// Lifetime of an entry cached under `namespace` on `day`.
fn route_ttl(namespace: &str, day: Weekday) -> Duration {
    match namespace {
        INFO_NAMESPACE | EPISODES_NAMESPACE => ttl::episodes(day),
        WATCH_NAMESPACE => ttl::WATCH,
        _ => ttl::AGGREGATE,
    }
}

fn today() -> Weekday {
    chrono::Local::now().weekday()
}

// ── Handlers ─────────────────────────────────────────────────────

async fn index() -> Json<Value> {
    Json(json!({
        "intro": "Welcome to the anilist provider: check out the provider's website @ https://anilist.co/",
        "routes": ["/:query", "/info/:id", "/watch/:episodeId"],
        "documentation": "https://docs.consumet.org/#tag/anilist",
    }))
}

async fn search(
    State(state): State<AppState>,
    Path(query): Path<String>,
    Query(params): Query<PageParams>,
) -> ApiResult<Json<SearchResult>> {
    let request = SearchRequest {
        query: Some(query),
        page: params.page,
        per_page: params.per_page,
        ..Default::default()
    };
    Ok(Json(state.search.search(request).await?))
}

async fn advanced_search(
    State(state): State<AppState>,
    Query(params): Query<AdvancedParams>,
) -> ApiResult<Json<SearchResult>> {
    let genres = params
        .genres
        .as_deref()
        .map(|raw| parse_list(raw, "genres"))
        .transpose()?;
    if let Some(genres) = &genres {
        validate_genres(genres)?;
    }
    let sort = params
        .sort
        .as_deref()
        .map(|raw| parse_list(raw, "sort"))
        .transpose()?;
    let season = params
        .season
        .as_deref()
        .filter(|s| !s.is_empty())
        .map(str::parse::<Season>)
        .transpose()?;
    let media_type = params
        .media_type
        .as_deref()
        .map(str::parse::<MediaType>)
        .transpose()?;
    let is_adult = flag(params.nsfw.as_deref()) || state.nsfw;

    let request = SearchRequest {
        query: params.query,
        page: params.page,
        per_page: params.per_page,
        media_type,
        year: params.year,
        genres,
        sort,
        status: params.status,
        season,
        format: params.format,
        id: params.id,
        is_adult: Some(is_adult),
    };
    Ok(Json(state.search.search(request).await?))
}

async fn trending(
    State(state): State<AppState>,
    Query(params): Query<PageParams>,
) -> ApiResult<Json<SearchResult>> {
    cached_listing(&state, TRENDING_NAMESPACE, TRENDING_SORT, params).await
}

async fn popular(
    State(state): State<AppState>,
    Query(params): Query<PageParams>,
) -> ApiResult<Json<SearchResult>> {
    cached_listing(&state, POPULAR_NAMESPACE, POPULAR_SORT, params).await
}

/// Sorted listing cached for an hour under `namespace;page;perPage`.
async fn cached_listing(
    state: &AppState,
    namespace: &str,
    sort: &[&str],
    params: PageParams,
) -> ApiResult<Json<SearchResult>> {
    let key = listing_key(namespace, &params);
    let request = SearchRequest {
        page: Some(params.page.unwrap_or(1)),
        per_page: Some(params.per_page.unwrap_or(20)),
        sort: preset(sort),
        is_adult: Some(state.nsfw),
        ..Default::default()
    };

    let search = state.search.as_ref();
    let result = state
        .cache
        .fetch(&key, route_ttl(namespace, today()), move || {
            search.search(request)
        })
        .await?;
    Ok(Json(result))
}

async fn genre(
    State(state): State<AppState>,
    Query(params): Query<GenreParams>,
) -> ApiResult<Json<SearchResult>> {
    let raw = params
        .genres
        .ok_or_else(|| AniListError::InvalidInput("genres is required".into()))?;
    let genres = parse_list(&raw, "genres")?;
    validate_genres(&genres)?;

    let request = SearchRequest {
        genres: Some(genres),
        page: params.page,
        per_page: params.per_page,
        is_adult: Some(state.nsfw),
        ..Default::default()
    };
    Ok(Json(state.search.search(request).await?))
}

async fn airing_schedule(
    State(state): State<AppState>,
    Query(params): Query<AiringParams>,
) -> ApiResult<Json<Value>> {
    let query = AiringScheduleQuery::resolve(
        params.page,
        params.per_page,
        params.week_start,
        params.week_end,
        params.not_yet_aired.as_deref().map(parse_flag),
        chrono::Utc::now().timestamp(),
    );
    Ok(Json(state.meta.fetch_airing_schedule(query).await?))
}

async fn recent_episodes(
    State(state): State<AppState>,
    Query(params): Query<PageParams>,
) -> ApiResult<Json<Value>> {
    let page = params.page.unwrap_or(1);
    let per_page = params.per_page.unwrap_or(20);
    Ok(Json(state.meta.fetch_recent_episodes(page, per_page).await?))
}

async fn random_anime(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    let picker = RandomPicker::new(state.search.as_ref(), state.meta.as_ref(), Some(state.nsfw));
    Ok(Json(picker.pick().await?))
}

async fn servers(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    Ok(Json(state.meta.fetch_episode_servers(&id).await?))
}

async fn episodes(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(params): Query<InfoParams>,
) -> ApiResult<Json<Vec<EpisodeEntry>>> {
    let dub = flag(params.dub.as_deref());
    let fetch_filler = flag(params.fetch_filler.as_deref());
    let provider = state.provider_name(params.provider.as_deref());
    let key = info_key(EPISODES_NAMESPACE, &id, dub, fetch_filler, &provider);
    let meta = state.meta.as_ref();
    let id = id.as_str();

    let listing = state
        .cache
        .fetch(&key, route_ttl(EPISODES_NAMESPACE, today()), move || async move {
            let info = meta.fetch_anime_info(id, dub, fetch_filler).await?;
            let listed = meta.fetch_episodes_list_by_id(id, dub, fetch_filler).await?;
            Ok::<_, AniListError>(shape_episodes(&info, listed))
        })
        .await?;
    Ok(Json(listing))
}

async fn data(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Json<Value>> {
    Ok(Json(state.meta.fetch_anilist_info_by_id(&id).await?))
}

async fn info(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(params): Query<InfoParams>,
) -> ApiResult<Json<Value>> {
    let dub = flag(params.dub.as_deref());
    let fetch_filler = flag(params.fetch_filler.as_deref());
    let provider = state.provider_name(params.provider.as_deref());
    let key = info_key(INFO_NAMESPACE, &id, dub, fetch_filler, &provider);
    let meta = state.meta.as_ref();
    let id = id.as_str();

    let info = state
        .cache
        .fetch(&key, route_ttl(INFO_NAMESPACE, today()), move || {
            meta.fetch_anime_info(id, dub, fetch_filler)
        })
        .await?;
    Ok(Json(info))
}

async fn character(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    Ok(Json(state.meta.fetch_character_info_by_id(&id).await?))
}

async fn watch(
    State(state): State<AppState>,
    Path(episode_id): Path<String>,
    Query(params): Query<WatchParams>,
) -> ApiResult<Json<Value>> {
    if let Some(server) = params.server.as_deref() {
        validate_server(server)?;
    }
    let provider = state.provider_name(params.provider.as_deref());
    let server = params.server.as_deref();
    let key = watch_key(&episode_id, &provider, server);
    let meta = state.meta.as_ref();
    let episode_id = episode_id.as_str();

    let sources = state
        .cache
        .fetch(&key, route_ttl(WATCH_NAMESPACE, today()), move || {
            meta.fetch_episode_sources(episode_id, server)
        })
        .await?;
    Ok(Json(sources))
}
