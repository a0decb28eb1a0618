use serde_json::{json, Value};

use super::client::AniListClient;
use super::error::AniListError;
use super::query::{GraphQLQuery, QueryKind};
use super::types::{
    AiringSchedulePage, DetailFields, MediaDetail, NativeMedia, PageInfo, RawAiringSchedule,
    RawCharacter,
};
use crate::traits::{AiringScheduleQuery, MetaProvider};

macro_rules! media_fields {
    () => {
        "id idMal title { romaji english native userPreferred } \
         coverImage { extraLarge large medium color } bannerImage status episodes \
         nextAiringEpisode { airingAt timeUntilAiring episode } popularity description \
         averageScore genres format seasonYear countryOfOrigin"
    };
}

const MEDIA_DOCUMENT: &str = concat!(
    "query ($id: Int) { Media(id: $id) { ",
    media_fields!(),
    " synonyms season duration isAdult studios(isMain: true) { nodes { name } } \
     startDate { year month day } endDate { year month day } \
     trailer { id site thumbnail } } }"
);

const CHARACTER_DOCUMENT: &str = concat!(
    "query ($id: Int) { Character(id: $id) { id \
     name { first middle last full native userPreferred alternative } \
     image { large medium } description gender dateOfBirth { year month day } \
     bloodType age media(page: 1, perPage: 25) { edges { characterRole node { ",
    media_fields!(),
    " } } } } }"
);

const AIRING_DOCUMENT: &str = concat!(
    "query ($page: Int, $perPage: Int, $notYetAired: Boolean, $weekStart: Int, $weekEnd: Int) { \
     Page(page: $page, perPage: $perPage) { \
     pageInfo { total perPage currentPage lastPage hasNextPage } \
     airingSchedules(notYetAired: $notYetAired, airingAt_greater: $weekStart, \
     airingAt_lesser: $weekEnd, sort: TIME) { id episode airingAt timeUntilAiring media { ",
    media_fields!(),
    " } } } }"
);

/// Detail provider backed by the AniList GraphQL API itself.
///
/// Serves info, character and airing-schedule lookups. AniList carries no
/// per-episode data, so info records list no episodes and episode lists are
/// empty. Lookups that need a scraping provider keep the trait's
/// `Unsupported` answer.
#[derive(Debug, Clone)]
pub struct AniListMeta {
    client: AniListClient,
}

impl AniListMeta {
    pub fn new(client: AniListClient) -> Self {
        Self { client }
    }

    async fn detail(&self, query: &'static str, id: &str) -> Result<Value, AniListError> {
        let id = parse_id(id)?;
        let q = GraphQLQuery::new(QueryKind::Detail, query, json!({ "id": id }));
        // AniList answers a missing id with 404 and a null object.
        match self.client.execute_data(&q).await {
            Err(AniListError::UpstreamRejected { status: 404 }) => {
                Err(AniListError::NotFound(format!("{id} not found")))
            }
            other => other,
        }
    }
}

impl MetaProvider for AniListMeta {
    fn name(&self) -> &str {
        "anilist"
    }

    async fn fetch_anilist_info_by_id(&self, id: &str) -> Result<Value, AniListError> {
        let data = self.detail(MEDIA_DOCUMENT, id).await?;
        let detail = parse_media_detail(data, id)?;
        to_json(&detail)
    }

    async fn fetch_anime_info(
        &self,
        id: &str,
        _dub: bool,
        _fetch_filler: bool,
    ) -> Result<Value, AniListError> {
        let detail = self.fetch_anilist_info_by_id(id).await?;
        Ok(with_empty_episodes(detail))
    }

    async fn fetch_episodes_list_by_id(
        &self,
        _id: &str,
        _dub: bool,
        _fetch_filler: bool,
    ) -> Result<Vec<Value>, AniListError> {
        Ok(Vec::new())
    }

    async fn fetch_character_info_by_id(&self, id: &str) -> Result<Value, AniListError> {
        let data = self.detail(CHARACTER_DOCUMENT, id).await?;
        let character = match data.get("Character") {
            Some(c) if !c.is_null() => c.clone(),
            _ => return Err(AniListError::NotFound(format!("character {id} not found"))),
        };
        let raw: RawCharacter =
            serde_json::from_value(character).map_err(|e| AniListError::Decode(e.to_string()))?;
        to_json(&raw.into_detail())
    }

    async fn fetch_airing_schedule(
        &self,
        query: AiringScheduleQuery,
    ) -> Result<Value, AniListError> {
        let vars = json!({
            "page": query.page,
            "perPage": query.per_page,
            "notYetAired": query.not_yet_aired,
            "weekStart": query.week_start,
            "weekEnd": query.week_end,
        });
        let q = GraphQLQuery::new(QueryKind::Detail, AIRING_DOCUMENT, vars);
        let data = self.client.execute_data(&q).await?;
        to_json(&parse_airing_schedule(data)?)
    }
}

fn parse_id(id: &str) -> Result<u64, AniListError> {
    id.parse()
        .map_err(|_| AniListError::InvalidInput(format!("{id} is not a valid id")))
}

/// Attach an empty `episodes` array to a detail record.
fn with_empty_episodes(mut detail: Value) -> Value {
    if let Value::Object(fields) = &mut detail {
        fields.insert("episodes".into(), Value::Array(Vec::new()));
    }
    detail
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<Value, AniListError> {
    serde_json::to_value(value).map_err(|e| AniListError::Decode(e.to_string()))
}

/// Read the `Media` object of a detail response.
pub fn parse_media_detail(data: Value, id: &str) -> Result<MediaDetail, AniListError> {
    let media = match data.get("Media") {
        Some(m) if !m.is_null() => m.clone(),
        _ => return Err(AniListError::NotFound(format!("anime {id} not found"))),
    };
    let base: NativeMedia =
        serde_json::from_value(media.clone()).map_err(|e| AniListError::Decode(e.to_string()))?;
    let extra: DetailFields =
        serde_json::from_value(media).map_err(|e| AniListError::Decode(e.to_string()))?;
    Ok(MediaDetail::from_parts(base, extra))
}

/// Read a `Page.airingSchedules` response.
pub fn parse_airing_schedule(data: Value) -> Result<AiringSchedulePage, AniListError> {
    let page = data.get("Page").ok_or(AniListError::NoPage)?;
    let info: PageInfo = match page.get("pageInfo") {
        Some(info) => {
            serde_json::from_value(info.clone()).map_err(|e| AniListError::Decode(e.to_string()))?
        }
        None => PageInfo::default(),
    };
    let schedules: Vec<RawAiringSchedule> = match page.get("airingSchedules") {
        Some(list @ Value::Array(_)) => serde_json::from_value(list.clone())
            .map_err(|e| AniListError::Decode(e.to_string()))?,
        _ => return Err(AniListError::EmptyResults),
    };

    Ok(AiringSchedulePage {
        current_page: info.current_page,
        has_next_page: info.has_next_page.unwrap_or(false),
        total_pages: info.last_page,
        total_results: info.total,
        results: schedules
            .into_iter()
            .map(RawAiringSchedule::into_entry)
            .collect(),
    })
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::models::MediaStatus;

    const MEDIA_FIXTURE: &str = r##"{
        "Media": {
            "id": 21,
            "idMal": 21,
            "title": { "romaji": "ONE PIECE", "english": "ONE PIECE" },
            "coverImage": { "extraLarge": "https://img/xl.jpg", "color": "#e4a15d" },
            "bannerImage": "https://img/banner.jpg",
            "status": "RELEASING",
            "episodes": null,
            "nextAiringEpisode": { "airingAt": 1760000000, "timeUntilAiring": 3600, "episode": 1146 },
            "genres": ["Action", "Adventure"],
            "format": "TV",
            "seasonYear": 1999,
            "countryOfOrigin": "JP",
            "synonyms": ["OP"],
            "season": "FALL",
            "duration": 24,
            "isAdult": false,
            "studios": { "nodes": [{ "name": "Toei Animation" }] },
            "startDate": { "year": 1999, "month": 10, "day": 20 },
            "endDate": { "year": null, "month": null, "day": null },
            "trailer": { "id": "abc", "site": "youtube", "thumbnail": "https://img/t.jpg" }
        }
    }"##;

    #[test]
    fn test_parse_media_detail() {
        let data: Value = serde_json::from_str(MEDIA_FIXTURE).unwrap();
        let detail = parse_media_detail(data, "21").unwrap();
        assert_eq!(detail.media.id, "21");
        assert_eq!(detail.media.status, MediaStatus::Ongoing);
        assert_eq!(detail.media.current_episode_count, Some(1145));
        assert_eq!(detail.media.total_episodes, Some(1145));
        assert_eq!(detail.studios, vec!["Toei Animation".to_string()]);
        assert_eq!(detail.season.as_deref(), Some("FALL"));
        assert_eq!(detail.start_date.as_ref().and_then(|d| d.year), Some(1999));

        let json = serde_json::to_value(&detail).unwrap();
        assert_eq!(json["id"], "21");
        assert_eq!(json["malId"], 21);
        assert_eq!(json["image"], "https://img/xl.jpg");
        assert_eq!(json["synonyms"][0], "OP");
        assert_eq!(json["trailer"]["site"], "youtube");
        assert_eq!(json["isAdult"], false);
    }

    #[test]
    fn test_null_media_is_not_found() {
        let err = parse_media_detail(json!({ "Media": null }), "9999999").unwrap_err();
        assert!(matches!(err, AniListError::NotFound(_)));
        assert_eq!(err.status_code(), 404);
    }

    #[test]
    fn test_parse_airing_schedule() {
        let data = json!({
            "Page": {
                "pageInfo": { "currentPage": 1, "hasNextPage": true, "lastPage": 3, "total": 55 },
                "airingSchedules": [
                    {
                        "id": 400,
                        "episode": 7,
                        "airingAt": 1760003600,
                        "timeUntilAiring": 3600,
                        "media": { "id": 170942, "status": "RELEASING", "episodes": 12 }
                    },
                    { "id": 401, "episode": 2, "media": null }
                ]
            }
        });
        let page = parse_airing_schedule(data).unwrap();
        assert_eq!(page.current_page, Some(1));
        assert!(page.has_next_page);
        assert_eq!(page.total_results, Some(55));
        assert_eq!(page.results.len(), 2);
        assert_eq!(page.results[0].id, "400");
        assert_eq!(page.results[0].media.as_ref().unwrap().id, "170942");
        assert!(page.results[1].media.is_none());
    }

    #[test]
    fn test_airing_schedule_without_list() {
        let err = parse_airing_schedule(json!({ "Page": { "pageInfo": {} } })).unwrap_err();
        assert!(matches!(err, AniListError::EmptyResults));
        let err = parse_airing_schedule(json!({})).unwrap_err();
        assert!(matches!(err, AniListError::NoPage));
    }

    #[test]
    fn test_character_detail() {
        let raw: RawCharacter = serde_json::from_value(json!({
            "id": 40,
            "name": { "full": "Monkey D. Luffy" },
            "image": { "large": null, "medium": "https://img/luffy.jpg" },
            "age": "19",
            "media": {
                "edges": [
                    { "characterRole": "MAIN", "node": { "id": 21, "status": "RELEASING" } }
                ]
            }
        }))
        .unwrap();
        let detail = raw.into_detail();
        assert_eq!(detail.id, "40");
        assert_eq!(detail.image.as_deref(), Some("https://img/luffy.jpg"));
        assert_eq!(detail.relations.len(), 1);

        let json = serde_json::to_value(&detail).unwrap();
        assert_eq!(json["relations"][0]["role"], "MAIN");
        assert_eq!(json["relations"][0]["id"], "21");
        assert_eq!(json["relations"][0]["status"], "Ongoing");
    }

    #[tokio::test]
    async fn test_non_numeric_id_is_rejected_before_request() {
        let client = AniListClient::new("http://127.0.0.1:9/graphql", Duration::from_secs(1)).unwrap();
        let meta = AniListMeta::new(client);
        let err = meta.fetch_anilist_info_by_id("one-piece").await.unwrap_err();
        assert!(matches!(err, AniListError::InvalidInput(_)));
        let err = meta.fetch_anime_info("one-piece", true, false).await.unwrap_err();
        assert!(matches!(err, AniListError::InvalidInput(_)));
        let err = meta.fetch_episode_sources("ep", None).await.unwrap_err();
        assert!(matches!(err, AniListError::Unsupported(_)));
    }

    #[tokio::test]
    async fn test_episode_list_is_empty() {
        let client = AniListClient::new("http://127.0.0.1:9/graphql", Duration::from_secs(1)).unwrap();
        let meta = AniListMeta::new(client);
        let listed = meta.fetch_episodes_list_by_id("21", false, true).await.unwrap();
        assert!(listed.is_empty());
    }

    #[test]
    fn test_info_record_lists_no_episodes() {
        let data: Value = serde_json::from_str(MEDIA_FIXTURE).unwrap();
        let detail = to_json(&parse_media_detail(data, "21").unwrap()).unwrap();
        let info = with_empty_episodes(detail);
        assert_eq!(info["id"], "21");
        assert_eq!(info["episodes"], json!([]));
        // The episode count survives next to the empty list.
        assert_eq!(info["totalEpisodes"], 1145);

        let shaped = crate::episodes::shape_episodes(&info, Vec::new());
        assert!(shaped.is_empty());

        assert_eq!(with_empty_episodes(json!("opaque")), "opaque");
    }

    #[test]
    fn test_documents_embed_media_fields() {
        for doc in [MEDIA_DOCUMENT, CHARACTER_DOCUMENT, AIRING_DOCUMENT] {
            assert!(doc.contains("nextAiringEpisode { airingAt timeUntilAiring episode }"));
        }
    }
}
