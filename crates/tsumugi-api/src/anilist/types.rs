use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};

use crate::models::{CanonicalMedia, MediaStatus};

/// Placeholder carried in `imageHash`/`coverHash`.
const IMAGE_HASH: &str = "hash";

// ── Page envelope ────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct Envelope {
    pub data: Option<EnvelopeData>,
}

#[derive(Debug, Deserialize)]
pub struct EnvelopeData {
    #[serde(rename = "Page")]
    pub page: Option<Value>,
    pub meta: Option<PageMeta>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    pub current_page: Option<u32>,
    pub has_next_page: Option<bool>,
    pub last_page: Option<u32>,
    pub total: Option<u64>,
}

/// Pagination block some aggregator backends send beside `Page`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageMeta {
    pub current_page: Option<u32>,
    pub last_page: Option<u32>,
}

// ── Raw media shapes ─────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
pub struct NextAiringEpisode {
    pub episode: Option<u32>,
}

/// Shape A: item from the aggregated backend, keyed by `anilistId`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregatorMedia {
    pub anilist_id: Value,
    pub mappings: Option<Map<String, Value>>,
    pub title: Option<Value>,
    pub status: Option<String>,
    pub cover_image: Option<String>,
    pub banner_image: Option<String>,
    pub popularity: Option<Number>,
    pub description: Option<String>,
    pub average_score: Option<Number>,
    pub genre: Option<Vec<String>>,
    pub color: Option<String>,
    pub current_episode: Option<u32>,
    pub next_airing_episode: Option<NextAiringEpisode>,
    pub format: Option<String>,
    pub year: Option<u32>,
}

/// Shape B: item straight from the AniList `Media` type.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NativeMedia {
    pub id: Value,
    pub id_mal: Option<u64>,
    pub title: Option<Value>,
    pub status: Option<String>,
    pub cover_image: Option<CoverImage>,
    pub banner_image: Option<String>,
    pub popularity: Option<Number>,
    pub description: Option<String>,
    pub average_score: Option<Number>,
    pub genres: Option<Vec<String>>,
    pub episodes: Option<u32>,
    pub next_airing_episode: Option<NextAiringEpisode>,
    pub format: Option<String>,
    pub season_year: Option<u32>,
    pub country_of_origin: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoverImage {
    pub extra_large: Option<String>,
    pub large: Option<String>,
    pub medium: Option<String>,
    pub color: Option<String>,
}

/// One element of the upstream `media` array. A truthy `anilistId`
/// selects the aggregator shape; anything else is read as AniList-native.
#[derive(Debug, Clone, Deserialize)]
#[serde(try_from = "Value")]
pub enum RawMediaItem {
    Aggregator(AggregatorMedia),
    Native(NativeMedia),
}

impl TryFrom<Value> for RawMediaItem {
    type Error = serde_json::Error;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        if value.get("anilistId").is_some_and(is_truthy) {
            serde_json::from_value(value).map(Self::Aggregator)
        } else {
            serde_json::from_value(value).map(Self::Native)
        }
    }
}

// ── Detail shapes ────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FuzzyDate {
    pub year: Option<i32>,
    pub month: Option<u32>,
    pub day: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trailer {
    pub id: Option<String>,
    pub site: Option<String>,
    pub thumbnail: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Studio {
    pub name: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StudioConnection {
    #[serde(default)]
    pub nodes: Vec<Studio>,
}

/// Fields of `Media(id)` beyond those the page documents select.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetailFields {
    #[serde(default)]
    pub synonyms: Vec<String>,
    pub season: Option<String>,
    pub duration: Option<u32>,
    #[serde(default)]
    pub studios: StudioConnection,
    pub start_date: Option<FuzzyDate>,
    pub end_date: Option<FuzzyDate>,
    pub trailer: Option<Trailer>,
    pub is_adult: Option<bool>,
}

/// A single title with its detail fields, flattened over the canonical record.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaDetail {
    #[serde(flatten)]
    pub media: CanonicalMedia,
    pub synonyms: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub season: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<u32>,
    pub studios: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<FuzzyDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_date: Option<FuzzyDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trailer: Option<Trailer>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_adult: Option<bool>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawCharacter {
    pub id: Value,
    pub name: Option<Value>,
    pub image: Option<CharacterImage>,
    pub description: Option<String>,
    pub gender: Option<String>,
    pub date_of_birth: Option<FuzzyDate>,
    pub blood_type: Option<String>,
    pub age: Option<String>,
    pub media: Option<CharacterMediaConnection>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CharacterImage {
    pub large: Option<String>,
    pub medium: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CharacterMediaConnection {
    #[serde(default)]
    pub edges: Vec<CharacterMediaEdge>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CharacterMediaEdge {
    pub character_role: Option<String>,
    pub node: NativeMedia,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CharacterAppearance {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(flatten)]
    pub media: CanonicalMedia,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CharacterDetail {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_of_birth: Option<FuzzyDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blood_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub age: Option<String>,
    pub relations: Vec<CharacterAppearance>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawAiringSchedule {
    pub id: Value,
    pub episode: Option<u32>,
    pub airing_at: Option<i64>,
    pub time_until_airing: Option<i64>,
    pub media: Option<NativeMedia>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AiringEntry {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub episode: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub airing_at: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_until_airing: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub media: Option<CanonicalMedia>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AiringSchedulePage {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_page: Option<u32>,
    pub has_next_page: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_pages: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_results: Option<u64>,
    pub results: Vec<AiringEntry>,
}

// ── Conversions ──────────────────────────────────────────────────

impl RawMediaItem {
    pub fn into_canonical(self) -> CanonicalMedia {
        match self {
            Self::Aggregator(media) => media.into_canonical(),
            Self::Native(media) => media.into_canonical(),
        }
    }
}

impl AggregatorMedia {
    pub fn into_canonical(self) -> CanonicalMedia {
        let (total_episodes, current_episode_count) =
            episode_counts(self.current_episode, self.next_airing_episode.as_ref());
        let mal_id = self
            .mappings
            .as_ref()
            .and_then(|m| m.get("mal"))
            .and_then(value_as_u64);

        CanonicalMedia {
            id: id_string(&self.anilist_id),
            mal_id,
            title: self.title,
            status: MediaStatus::from_upstream(self.status.as_deref()),
            image: first_present([self.cover_image, self.banner_image.clone()]),
            image_hash: IMAGE_HASH.into(),
            cover: self.banner_image,
            cover_hash: IMAGE_HASH.into(),
            popularity: self.popularity,
            description: self.description,
            rating: self.average_score,
            genres: self.genre,
            color: self.color,
            total_episodes,
            current_episode_count,
            format: self.format,
            release_date: self.year,
            country_of_origin: None,
        }
    }
}

impl NativeMedia {
    pub fn into_canonical(self) -> CanonicalMedia {
        let (total_episodes, current_episode_count) =
            episode_counts(self.episodes, self.next_airing_episode.as_ref());
        let cover = self.cover_image.unwrap_or_default();

        CanonicalMedia {
            id: id_string(&self.id),
            mal_id: self.id_mal,
            title: self.title,
            status: MediaStatus::from_upstream(self.status.as_deref()),
            image: first_present([cover.extra_large, cover.large, cover.medium]),
            image_hash: IMAGE_HASH.into(),
            cover: self.banner_image,
            cover_hash: IMAGE_HASH.into(),
            popularity: self.popularity,
            description: self.description,
            rating: self.average_score,
            genres: self.genres,
            color: cover.color,
            total_episodes,
            current_episode_count,
            format: self.format,
            release_date: self.season_year,
            country_of_origin: self.country_of_origin,
        }
    }
}

impl MediaDetail {
    pub fn from_parts(media: NativeMedia, extra: DetailFields) -> Self {
        Self {
            media: media.into_canonical(),
            synonyms: extra.synonyms,
            season: extra.season,
            duration: extra.duration,
            studios: extra.studios.nodes.into_iter().map(|s| s.name).collect(),
            start_date: extra.start_date,
            end_date: extra.end_date,
            trailer: extra.trailer,
            is_adult: extra.is_adult,
        }
    }
}

impl RawCharacter {
    pub fn into_detail(self) -> CharacterDetail {
        let image = self.image.unwrap_or_default();
        let relations = self
            .media
            .unwrap_or_default()
            .edges
            .into_iter()
            .map(|edge| CharacterAppearance {
                role: edge.character_role,
                media: edge.node.into_canonical(),
            })
            .collect();

        CharacterDetail {
            id: id_string(&self.id),
            name: self.name,
            image: first_present([image.large, image.medium]),
            description: self.description,
            gender: self.gender,
            date_of_birth: self.date_of_birth,
            blood_type: self.blood_type,
            age: self.age,
            relations,
        }
    }
}

impl RawAiringSchedule {
    pub fn into_entry(self) -> AiringEntry {
        AiringEntry {
            id: id_string(&self.id),
            episode: self.episode,
            airing_at: self.airing_at,
            time_until_airing: self.time_until_airing,
            media: self.media.map(NativeMedia::into_canonical),
        }
    }
}

/// First `Some` in priority order.
fn first_present<T>(candidates: impl IntoIterator<Item = Option<T>>) -> Option<T> {
    candidates.into_iter().flatten().next()
}

/// `(totalEpisodes, currentEpisodeCount)`. The explicit count wins for the
/// total; the aired count (next airing episode - 1) wins for the current.
/// A next airing episode of 0 counts as nothing aired yet, not -1.
fn episode_counts(
    explicit: Option<u32>,
    next_airing: Option<&NextAiringEpisode>,
) -> (Option<u32>, Option<u32>) {
    let aired = next_airing
        .and_then(|n| n.episode)
        .map(|episode| episode.saturating_sub(1));
    (
        first_present([explicit, aired]),
        first_present([aired, explicit]),
    )
}

fn id_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn value_as_u64(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

pub(crate) fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn normalize(value: Value) -> CanonicalMedia {
        serde_json::from_value::<RawMediaItem>(value)
            .unwrap()
            .into_canonical()
    }

    #[test]
    fn test_aggregator_item_normalizes() {
        let media = normalize(json!({
            "anilistId": 101,
            "mappings": { "mal": 55 },
            "status": "RELEASING",
            "coverImage": "http://x/img.jpg",
            "currentEpisode": 10
        }));
        assert_eq!(media.id, "101");
        assert_eq!(media.mal_id, Some(55));
        assert_eq!(media.status, MediaStatus::Ongoing);
        assert_eq!(media.image.as_deref(), Some("http://x/img.jpg"));
        assert_eq!(media.total_episodes, Some(10));
        assert_eq!(media.current_episode_count, Some(10));
        assert_eq!(media.image_hash, "hash");
        assert!(media.country_of_origin.is_none());
    }

    #[test]
    fn test_aggregator_falls_back_to_banner() {
        let media = normalize(json!({
            "anilistId": "202",
            "mappings": { "mal": "77" },
            "bannerImage": "http://x/banner.jpg",
            "genre": ["Drama"],
            "year": 2021,
            "color": "#e4a15d",
            "nextAiringEpisode": { "episode": 8 }
        }));
        assert_eq!(media.id, "202");
        assert_eq!(media.mal_id, Some(77));
        assert_eq!(media.image.as_deref(), Some("http://x/banner.jpg"));
        assert_eq!(media.cover.as_deref(), Some("http://x/banner.jpg"));
        assert_eq!(media.genres, Some(vec!["Drama".to_string()]));
        assert_eq!(media.release_date, Some(2021));
        assert_eq!(media.color.as_deref(), Some("#e4a15d"));
        assert_eq!(media.total_episodes, Some(7));
        assert_eq!(media.current_episode_count, Some(7));
        assert_eq!(media.status, MediaStatus::Unknown);
    }

    #[test]
    fn test_native_episode_precedence_is_asymmetric() {
        let media = normalize(json!({
            "id": 1,
            "episodes": 12,
            "nextAiringEpisode": { "episode": 5 }
        }));
        assert_eq!(media.total_episodes, Some(12));
        assert_eq!(media.current_episode_count, Some(4));

        let no_airing = normalize(json!({ "id": 2, "episodes": 24 }));
        assert_eq!(no_airing.total_episodes, Some(24));
        assert_eq!(no_airing.current_episode_count, Some(24));

        let no_total = normalize(json!({ "id": 3, "nextAiringEpisode": { "episode": 9 } }));
        assert_eq!(no_total.total_episodes, Some(8));
        assert_eq!(no_total.current_episode_count, Some(8));

        let neither = normalize(json!({ "id": 4 }));
        assert_eq!(neither.total_episodes, None);
        assert_eq!(neither.current_episode_count, None);
    }

    #[test]
    fn test_episode_zero_airing_clamps_to_zero() {
        let media = normalize(json!({ "id": 5, "nextAiringEpisode": { "episode": 0 } }));
        assert_eq!(media.total_episodes, Some(0));
        assert_eq!(media.current_episode_count, Some(0));

        let with_total = normalize(json!({
            "id": 6,
            "episodes": 13,
            "nextAiringEpisode": { "episode": 0 }
        }));
        assert_eq!(with_total.total_episodes, Some(13));
        assert_eq!(with_total.current_episode_count, Some(0));
    }

    #[test]
    fn test_native_image_resolution_order() {
        let full = normalize(json!({
            "id": 5,
            "coverImage": { "extraLarge": "xl", "large": "l", "medium": "m", "color": "#fff" }
        }));
        assert_eq!(full.image.as_deref(), Some("xl"));
        assert_eq!(full.color.as_deref(), Some("#fff"));

        let partial = normalize(json!({ "id": 6, "coverImage": { "large": null, "medium": "m" } }));
        assert_eq!(partial.image.as_deref(), Some("m"));

        let none = normalize(json!({ "id": 7 }));
        assert_eq!(none.image, None);
        assert_eq!(none.color, None);
    }

    #[test]
    fn test_native_item_full_mapping() {
        let media = normalize(json!({
            "id": 154587,
            "idMal": 52991,
            "title": { "romaji": "Sousou no Frieren", "english": "Frieren: Beyond Journey's End" },
            "status": "FINISHED",
            "coverImage": { "large": "https://img/large.jpg" },
            "bannerImage": "https://img/banner.jpg",
            "episodes": 28,
            "popularity": 500000,
            "description": "An elf mage...",
            "averageScore": 91,
            "genres": ["Adventure", "Drama", "Fantasy"],
            "format": "TV",
            "seasonYear": 2023,
            "countryOfOrigin": "JP"
        }));
        assert_eq!(media.id, "154587");
        assert_eq!(media.mal_id, Some(52991));
        assert_eq!(media.status, MediaStatus::Completed);
        assert_eq!(media.title.unwrap()["romaji"], "Sousou no Frieren");
        assert_eq!(media.cover.as_deref(), Some("https://img/banner.jpg"));
        assert_eq!(media.rating, Some(Number::from(91)));
        assert_eq!(media.popularity, Some(Number::from(500000)));
        assert_eq!(media.genres.unwrap().len(), 3);
        assert_eq!(media.format.as_deref(), Some("TV"));
        assert_eq!(media.release_date, Some(2023));
        assert_eq!(media.country_of_origin.as_deref(), Some("JP"));
    }

    #[test]
    fn test_falsy_anilist_id_reads_native_shape() {
        let item: RawMediaItem =
            serde_json::from_value(json!({ "anilistId": 0, "id": 9, "genres": ["Music"] })).unwrap();
        assert!(matches!(item, RawMediaItem::Native(_)));
        let media = item.into_canonical();
        assert_eq!(media.id, "9");
        assert_eq!(media.genres, Some(vec!["Music".to_string()]));
    }

    #[test]
    fn test_normalization_is_deterministic() {
        let raw = json!({
            "id": 11,
            "status": "HIATUS",
            "episodes": 3,
            "nextAiringEpisode": { "episode": 2 }
        });
        assert_eq!(normalize(raw.clone()), normalize(raw));
    }

    #[test]
    fn test_item_matching_no_shape_fails_to_decode() {
        let result = serde_json::from_value::<RawMediaItem>(json!({ "title": "orphan" }));
        assert!(result.is_err());
    }
}
