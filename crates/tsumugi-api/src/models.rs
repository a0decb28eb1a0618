//! Source-agnostic media records returned to callers.

use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};

/// Airing status after translation from the upstream `MediaStatus`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MediaStatus {
    #[serde(rename = "Ongoing")]
    Ongoing,
    #[serde(rename = "Completed")]
    Completed,
    #[serde(rename = "Not yet aired")]
    NotYetAired,
    #[serde(rename = "Cancelled")]
    Cancelled,
    #[serde(rename = "Hiatus")]
    Hiatus,
    #[serde(rename = "Unknown")]
    Unknown,
}

impl MediaStatus {
    pub fn from_upstream(status: Option<&str>) -> Self {
        match status {
            Some("RELEASING") => Self::Ongoing,
            Some("FINISHED") => Self::Completed,
            Some("NOT_YET_RELEASED") => Self::NotYetAired,
            Some("CANCELLED") => Self::Cancelled,
            Some("HIATUS") => Self::Hiatus,
            _ => Self::Unknown,
        }
    }
}

/// Normalized media record. Absent upstream fields stay absent in JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CanonicalMedia {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mal_id: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<Value>,
    pub status: MediaStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    pub image_hash: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cover: Option<String>,
    pub cover_hash: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub popularity: Option<Number>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rating: Option<Number>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub genres: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_episodes: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_episode_count: Option<u32>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub release_date: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country_of_origin: Option<String>,
}

/// One page of normalized search results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResult {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_page: Option<u32>,
    pub has_next_page: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_pages: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_results: Option<u64>,
    pub results: Vec<CanonicalMedia>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping_table() {
        let table = [
            ("RELEASING", MediaStatus::Ongoing),
            ("FINISHED", MediaStatus::Completed),
            ("NOT_YET_RELEASED", MediaStatus::NotYetAired),
            ("CANCELLED", MediaStatus::Cancelled),
            ("HIATUS", MediaStatus::Hiatus),
        ];
        for (upstream, expected) in table {
            assert_eq!(MediaStatus::from_upstream(Some(upstream)), expected);
        }
        assert_eq!(MediaStatus::from_upstream(Some("releasing")), MediaStatus::Unknown);
        assert_eq!(MediaStatus::from_upstream(Some("")), MediaStatus::Unknown);
        assert_eq!(MediaStatus::from_upstream(None), MediaStatus::Unknown);
    }

    #[test]
    fn test_status_serializes_display_names() {
        assert_eq!(
            serde_json::to_value(MediaStatus::NotYetAired).unwrap(),
            "Not yet aired"
        );
        assert_eq!(serde_json::to_value(MediaStatus::Ongoing).unwrap(), "Ongoing");
    }

    #[test]
    fn test_absent_fields_are_omitted() {
        let media = CanonicalMedia {
            id: "1".into(),
            mal_id: None,
            title: None,
            status: MediaStatus::Unknown,
            image: None,
            image_hash: "hash".into(),
            cover: None,
            cover_hash: "hash".into(),
            popularity: None,
            description: None,
            rating: None,
            genres: None,
            color: None,
            total_episodes: None,
            current_episode_count: None,
            format: Some("TV".into()),
            release_date: None,
            country_of_origin: None,
        };
        let json = serde_json::to_value(&media).unwrap();
        let obj = json.as_object().unwrap();
        assert_eq!(obj.len(), 5);
        assert_eq!(json["type"], "TV");
        assert!(!obj.contains_key("malId"));
        assert!(!obj.contains_key("countryOfOrigin"));
    }
}
