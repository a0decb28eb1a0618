//! Outbound GraphQL document and variable construction.

use std::str::FromStr;

use chrono::Datelike;
use serde::Serialize;
use serde_json::{json, Map, Value};

use super::error::AniListError;

const DEFAULT_PAGE: u32 = 1;
const DEFAULT_PER_PAGE: u32 = 20;

const SEARCH_DOCUMENT: &str = r#"
query ($search: String, $page: Int = 1, $perPage: Int = 20, $type: MediaType = ANIME) {
    Page(page: $page, perPage: $perPage) {
        pageInfo { total perPage currentPage lastPage hasNextPage }
        media(search: $search, type: $type) {
            id
            idMal
            title { romaji english native userPreferred }
            coverImage { extraLarge large medium color }
            bannerImage
            status
            episodes
            nextAiringEpisode { airingAt timeUntilAiring episode }
            popularity
            description
            averageScore
            genres
            format
            seasonYear
            countryOfOrigin
        }
    }
}
"#;

const ADVANCED_DOCUMENT: &str = r#"
query ($page: Int = 1, $perPage: Int = 20, $id: Int, $type: MediaType = ANIME, $isAdult: Boolean = false,
       $format: MediaFormat, $status: MediaStatus, $season: MediaSeason, $seasonYear: Int,
       $genres: [String], $sort: [MediaSort] = [POPULARITY_DESC, SCORE_DESC]) {
    Page(page: $page, perPage: $perPage) {
        pageInfo { total perPage currentPage lastPage hasNextPage }
        media(id: $id, type: $type, isAdult: $isAdult, format: $format, status: $status,
              season: $season, seasonYear: $seasonYear, genre_in: $genres, sort: $sort) {
            id
            idMal
            title { romaji english native userPreferred }
            coverImage { extraLarge large medium color }
            bannerImage
            status
            episodes
            nextAiringEpisode { airingAt timeUntilAiring episode }
            popularity
            description
            averageScore
            genres
            format
            seasonYear
            countryOfOrigin
        }
    }
}
"#;

/// Genres accepted by the genre and advanced-search filters.
pub const GENRES: &[&str] = &[
    "Action",
    "Adventure",
    "Cars",
    "Comedy",
    "Drama",
    "Fantasy",
    "Horror",
    "Mahou Shoujo",
    "Mecha",
    "Music",
    "Mystery",
    "Psychological",
    "Romance",
    "Sci-Fi",
    "Slice of Life",
    "Sports",
    "Supernatural",
    "Thriller",
];

/// Reject any genre outside [`GENRES`].
pub fn validate_genres(genres: &[String]) -> Result<(), AniListError> {
    match genres.iter().find(|g| !GENRES.contains(&g.as_str())) {
        Some(genre) => Err(AniListError::InvalidInput(format!(
            "{genre} is not a valid genre"
        ))),
        None => Ok(()),
    }
}

/// AniList `MediaType`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MediaType {
    #[default]
    Anime,
    Manga,
}

impl MediaType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Anime => "ANIME",
            Self::Manga => "MANGA",
        }
    }
}

impl FromStr for MediaType {
    type Err = AniListError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "ANIME" => Ok(Self::Anime),
            "MANGA" => Ok(Self::Manga),
            _ => Err(AniListError::InvalidInput(format!(
                "{s} is not a valid media type"
            ))),
        }
    }
}

/// AniList `MediaSeason`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Season {
    Winter,
    Spring,
    Summer,
    Fall,
}

impl Season {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Winter => "WINTER",
            Self::Spring => "SPRING",
            Self::Summer => "SUMMER",
            Self::Fall => "FALL",
        }
    }
}

impl FromStr for Season {
    type Err = AniListError;

    /// Only the exact upper-case AniList tags are accepted.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "WINTER" => Ok(Self::Winter),
            "SPRING" => Ok(Self::Spring),
            "SUMMER" => Ok(Self::Summer),
            "FALL" => Ok(Self::Fall),
            _ => Err(AniListError::InvalidInput(format!(
                "{s} is not a valid season"
            ))),
        }
    }
}

/// Search parameters as received from a caller. Absent fields are defaulted
/// or omitted when the query is built.
#[derive(Debug, Clone, Default)]
pub struct SearchRequest {
    pub query: Option<String>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    pub media_type: Option<MediaType>,
    pub year: Option<u32>,
    pub genres: Option<Vec<String>>,
    pub sort: Option<Vec<String>>,
    pub status: Option<String>,
    pub season: Option<Season>,
    pub format: Option<String>,
    pub id: Option<u64>,
    pub is_adult: Option<bool>,
}

/// Which document a [`GraphQLQuery`] carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryKind {
    Search,
    Advanced,
    Detail,
}

/// A GraphQL document plus its variables, serialized as the POST body.
#[derive(Debug, Clone, Serialize)]
pub struct GraphQLQuery {
    #[serde(skip)]
    pub kind: QueryKind,
    pub query: &'static str,
    pub variables: Value,
}

impl GraphQLQuery {
    pub fn new(kind: QueryKind, query: &'static str, variables: Value) -> Self {
        Self {
            kind,
            query,
            variables,
        }
    }

    /// Whether this is the free-text search document.
    pub fn is_search(&self) -> bool {
        self.kind == QueryKind::Search
    }
}

impl SearchRequest {
    /// Build against the current calendar year.
    pub fn into_query(self) -> GraphQLQuery {
        let year = u32::try_from(chrono::Utc::now().year()).unwrap_or_default();
        self.build(year)
    }

    /// Build the document and variables. A non-empty `query` selects the
    /// search document, anything else the advanced filter document.
    /// `year` is consumed into `seasonYear` and never forwarded itself.
    pub fn build(self, current_year: u32) -> GraphQLQuery {
        let page = self.page.filter(|p| *p >= 1).unwrap_or(DEFAULT_PAGE);
        let per_page = self.per_page.filter(|p| *p >= 1).unwrap_or(DEFAULT_PER_PAGE);
        let season_year = self.year.filter(|y| *y > 0).unwrap_or(current_year);
        let search = self.query.filter(|q| !q.is_empty());

        let mut vars = Map::new();
        vars.insert("page".into(), json!(page));
        vars.insert("perPage".into(), json!(per_page));
        vars.insert(
            "type".into(),
            json!(self.media_type.unwrap_or_default().as_str()),
        );
        vars.insert("seasonYear".into(), json!(season_year));

        let optional = [
            ("search", search.as_ref().map(|s| json!(s))),
            ("genres", self.genres.map(|g| json!(g))),
            ("sort", self.sort.map(|s| json!(s))),
            ("status", self.status.map(|s| json!(s))),
            ("season", self.season.map(|s| json!(s.as_str()))),
            ("format", self.format.map(|f| json!(f))),
            ("id", self.id.map(|id| json!(id))),
            // The search document has no adult filter.
            (
                "isAdult",
                self.is_adult.filter(|_| search.is_none()).map(|a| json!(a)),
            ),
        ];
        for (name, value) in optional {
            if let Some(value) = value {
                vars.insert(name.into(), value);
            }
        }

        let (kind, query) = if search.is_some() {
            (QueryKind::Search, SEARCH_DOCUMENT)
        } else {
            (QueryKind::Advanced, ADVANCED_DOCUMENT)
        };

        GraphQLQuery::new(kind, query, Value::Object(vars))
    }
}
