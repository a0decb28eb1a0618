use std::time::Duration;

use reqwest::Client;
use serde_json::Value;

use super::error::AniListError;
use super::query::{GraphQLQuery, SearchRequest};
use super::types::{Envelope, PageInfo, RawMediaItem};
use crate::models::SearchResult;
use crate::traits::MediaSearch;

pub const API_URL: &str = "https://graphql.anilist.co";

/// GraphQL client for AniList or an AniList-compatible aggregator.
#[derive(Debug, Clone)]
pub struct AniListClient {
    endpoint: String,
    http: Client,
}

impl AniListClient {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, AniListError> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AniListError::Transport(e.to_string()))?;
        Ok(Self {
            endpoint: endpoint.into(),
            http,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Issue one POST and return the HTTP status and the body as JSON.
    /// Non-2xx answers are rejected before the body is decoded.
    pub async fn post(&self, query: &GraphQLQuery) -> Result<(u16, Value), AniListError> {
        tracing::debug!(kind = ?query.kind, endpoint = %self.endpoint, "AniList GraphQL request");

        let resp = self
            .http
            .post(&self.endpoint)
            .header("Content-Type", "application/json")
            .header("Accept", "application/json")
            .json(query)
            .send()
            .await
            .map_err(|e| AniListError::Transport(e.to_string()))?;

        let status = resp.status().as_u16();
        let body = resp.bytes().await.map_err(|e| AniListError::Transport(e.to_string()))?;
        let json = decode_body(status, &body)?;

        tracing::debug!(kind = ?query.kind, status, "AniList response received");
        Ok((status, json))
    }

    /// Execute a page query and normalize the result.
    pub async fn execute(&self, query: &GraphQLQuery) -> Result<SearchResult, AniListError> {
        let (status, body) = self.post(query).await?;
        parse_search_response(status, body)
    }

    /// Execute a non-page query and return its `data` object.
    pub async fn execute_data(&self, query: &GraphQLQuery) -> Result<Value, AniListError> {
        let (status, body) = self.post(query).await?;
        ensure_success(status)?;
        match body.get("data") {
            Some(data) if !data.is_null() => Ok(data.clone()),
            _ => Err(AniListError::NoData),
        }
    }
}

impl MediaSearch for AniListClient {
    async fn search(&self, request: SearchRequest) -> Result<SearchResult, AniListError> {
        self.execute(&request.into_query()).await
    }
}

fn ensure_success(status: u16) -> Result<(), AniListError> {
    if (200..300).contains(&status) {
        Ok(())
    } else {
        tracing::warn!(status, "AniList API rejected request");
        Err(AniListError::UpstreamRejected { status })
    }
}

/// Gateways answer errors with HTML, so the status is checked first.
fn decode_body(status: u16, body: &[u8]) -> Result<Value, AniListError> {
    ensure_success(status)?;
    serde_json::from_slice(body).map_err(|e| AniListError::Decode(e.to_string()))
}

/// Classify a page response and normalize its media.
///
/// `EmptyResults` covers both a missing/non-object `pageInfo` and a
/// missing/non-array `media`; zero matches and a malformed page look the
/// same to the caller.
pub fn parse_search_response(status: u16, body: Value) -> Result<SearchResult, AniListError> {
    ensure_success(status)?;

    let envelope: Envelope =
        serde_json::from_value(body).map_err(|e| AniListError::Decode(e.to_string()))?;
    let data = envelope.data.ok_or(AniListError::NoData)?;
    let page = data.page.ok_or(AniListError::NoPage)?;

    let (info, media) = match (page.get("pageInfo"), page.get("media")) {
        (Some(info @ Value::Object(_)), Some(Value::Array(media))) => (info, media),
        _ => return Err(AniListError::EmptyResults),
    };

    let info: PageInfo =
        serde_json::from_value(info.clone()).map_err(|e| AniListError::Decode(e.to_string()))?;
    let meta = data.meta.unwrap_or_default();

    let results = media
        .iter()
        .cloned()
        .map(serde_json::from_value::<RawMediaItem>)
        .map(|item| item.map(RawMediaItem::into_canonical))
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| AniListError::Decode(e.to_string()))?;

    Ok(SearchResult {
        current_page: info.current_page.or(meta.current_page),
        has_next_page: info
            .has_next_page
            .unwrap_or(meta.current_page != meta.last_page),
        total_pages: info.last_page,
        total_results: info.total,
        results,
    })
}
