//! Seams between the search pipeline and its collaborators.
//!
//! [`MediaSearch`] is the normalized page search (implemented by
//! [`AniListClient`](crate::anilist::AniListClient)); [`MetaProvider`] is the
//! detail collaborator that resolves per-title info, episodes and sources.

use std::future::{ready, Future};

use serde_json::Value;

use crate::anilist::error::AniListError;
use crate::anilist::query::SearchRequest;
use crate::models::SearchResult;

/// Seconds in the default airing-schedule window.
pub const ONE_WEEK_SECS: i64 = 604_800;

/// Streaming server names accepted by the watch endpoint.
pub const STREAMING_SERVERS: &[&str] = &[
    "asianload",
    "gogocdn",
    "streamsb",
    "mixdrop",
    "mp4upload",
    "upcloud",
    "vidcloud",
    "streamtape",
    "vizcloud",
    "mycloud",
    "filemoon",
    "vidstreaming",
    "smashystream",
    "streamhub",
    "streamwish",
    "vidmoly",
];

/// Reject a server name outside [`STREAMING_SERVERS`].
pub fn validate_server(server: &str) -> Result<(), AniListError> {
    if STREAMING_SERVERS.contains(&server) {
        Ok(())
    } else {
        Err(AniListError::InvalidInput(format!(
            "{server} is not a valid server"
        )))
    }
}

/// Normalized page search.
pub trait MediaSearch: Send + Sync {
    fn search(
        &self,
        request: SearchRequest,
    ) -> impl Future<Output = Result<SearchResult, AniListError>> + Send;
}

/// Parameters for an airing-schedule lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AiringScheduleQuery {
    pub page: u32,
    pub per_page: u32,
    pub week_start: i64,
    pub week_end: i64,
    pub not_yet_aired: bool,
}

impl AiringScheduleQuery {
    /// Fill absent fields: page 1, 20 per page, a one-week window starting
    /// at `now` (unix seconds), upcoming episodes only.
    pub fn resolve(
        page: Option<u32>,
        per_page: Option<u32>,
        week_start: Option<i64>,
        week_end: Option<i64>,
        not_yet_aired: Option<bool>,
        now: i64,
    ) -> Self {
        let week_start = week_start.unwrap_or(now);
        Self {
            page: page.unwrap_or(1),
            per_page: per_page.unwrap_or(20),
            week_start,
            week_end: week_end.unwrap_or(week_start + ONE_WEEK_SECS),
            not_yet_aired: not_yet_aired.unwrap_or(true),
        }
    }
}

/// Detail collaborator. Records are provider-shaped JSON.
///
/// Only [`fetch_anilist_info_by_id`](Self::fetch_anilist_info_by_id) is
/// required; every other lookup answers [`AniListError::Unsupported`]
/// unless the provider overrides it.
pub trait MetaProvider: Send + Sync {
    /// Lower-case provider name, used in cache keys.
    fn name(&self) -> &str;

    fn fetch_anilist_info_by_id(
        &self,
        id: &str,
    ) -> impl Future<Output = Result<Value, AniListError>> + Send;

    /// Info record including an `episodes` array.
    fn fetch_anime_info(
        &self,
        id: &str,
        dub: bool,
        fetch_filler: bool,
    ) -> impl Future<Output = Result<Value, AniListError>> + Send {
        let _ = (id, dub, fetch_filler);
        unsupported(self.name(), "anime info with episodes")
    }

    fn fetch_episodes_list_by_id(
        &self,
        id: &str,
        dub: bool,
        fetch_filler: bool,
    ) -> impl Future<Output = Result<Vec<Value>, AniListError>> + Send {
        let _ = (id, dub, fetch_filler);
        unsupported(self.name(), "episode lists")
    }

    fn fetch_episode_sources(
        &self,
        episode_id: &str,
        server: Option<&str>,
    ) -> impl Future<Output = Result<Value, AniListError>> + Send {
        let _ = (episode_id, server);
        unsupported(self.name(), "episode sources")
    }

    fn fetch_episode_servers(
        &self,
        episode_id: &str,
    ) -> impl Future<Output = Result<Value, AniListError>> + Send {
        let _ = episode_id;
        unsupported(self.name(), "episode servers")
    }

    fn fetch_recent_episodes(
        &self,
        page: u32,
        per_page: u32,
    ) -> impl Future<Output = Result<Value, AniListError>> + Send {
        let _ = (page, per_page);
        unsupported(self.name(), "recent episodes")
    }

    fn fetch_airing_schedule(
        &self,
        query: AiringScheduleQuery,
    ) -> impl Future<Output = Result<Value, AniListError>> + Send {
        let _ = query;
        unsupported(self.name(), "airing schedules")
    }

    fn fetch_character_info_by_id(
        &self,
        id: &str,
    ) -> impl Future<Output = Result<Value, AniListError>> + Send {
        let _ = id;
        unsupported(self.name(), "character info")
    }
}

fn unsupported<T: Send + 'static>(
    provider: &str,
    what: &str,
) -> impl Future<Output = Result<T, AniListError>> + Send + 'static {
    ready(Err(AniListError::Unsupported(format!(
        "{provider} does not provide {what}"
    ))))
}

#[cfg(test)]
mod tests {
    use super::*;

    struct InfoOnly;

    impl MetaProvider for InfoOnly {
        fn name(&self) -> &str {
            "infoonly"
        }

        async fn fetch_anilist_info_by_id(&self, id: &str) -> Result<Value, AniListError> {
            Ok(serde_json::json!({ "id": id }))
        }
    }

    #[tokio::test]
    async fn test_default_lookups_are_unsupported() {
        let provider = InfoOnly;
        assert_eq!(
            provider.fetch_anilist_info_by_id("1").await.unwrap()["id"],
            "1"
        );

        let err = provider.fetch_episode_sources("ep-1", None).await.unwrap_err();
        assert_eq!(err.status_code(), 501);
        assert_eq!(
            err.to_string(),
            "[AniList] unsupported: infoonly does not provide episode sources"
        );
        assert!(provider.fetch_episodes_list_by_id("1", false, false).await.is_err());
        assert!(provider.fetch_recent_episodes(1, 20).await.is_err());
    }

    #[tokio::test]
    async fn test_unsupported_future_can_be_spawned() {
        let pending = unsupported::<Vec<Value>>("infoonly", "episode lists");
        let err = tokio::spawn(pending).await.unwrap().unwrap_err();
        assert!(matches!(err, AniListError::Unsupported(_)));
    }

    #[test]
    fn test_airing_schedule_defaults() {
        let q = AiringScheduleQuery::resolve(None, None, None, None, None, 1_700_000_000);
        assert_eq!(q.page, 1);
        assert_eq!(q.per_page, 20);
        assert_eq!(q.week_start, 1_700_000_000);
        assert_eq!(q.week_end, 1_700_000_000 + ONE_WEEK_SECS);
        assert!(q.not_yet_aired);

        let explicit = AiringScheduleQuery::resolve(Some(2), Some(5), Some(10), None, Some(false), 99);
        assert_eq!(explicit.week_start, 10);
        assert_eq!(explicit.week_end, 10 + ONE_WEEK_SECS);
        assert!(!explicit.not_yet_aired);
    }

    #[test]
    fn test_server_validation() {
        assert!(validate_server("gogocdn").is_ok());
        assert!(matches!(
            validate_server("myserver"),
            Err(AniListError::InvalidInput(_))
        ));
    }
}
