//! Reshaping provider episode lists into the public episode listing.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::anilist::types::is_truthy;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EpisodeEntry {
    pub id: Value,
    pub title: String,
    pub image: Value,
    pub image_hash: Value,
    pub number: usize,
    pub created_at: Value,
    pub release_date: Value,
    pub description: Value,
    pub url: Value,
}

/// Build the listing from `listed` (the provider's episode list) or, when
/// that is empty, from the `episodes` array of the info record.
pub fn shape_episodes(info: &Value, listed: Vec<Value>) -> Vec<EpisodeEntry> {
    let source = if listed.is_empty() {
        info.get("episodes")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default()
    } else {
        listed
    };

    let anime_title = display_title(info.get("title"));
    let is_movie = info
        .get("type")
        .and_then(Value::as_str)
        .is_some_and(|t| t.eq_ignore_ascii_case("movie"));

    source
        .iter()
        .enumerate()
        .map(|(index, ep)| {
            let number = index + 1;
            let label = if is_movie { "Movie" } else { "Episode" };
            let default_title = format!("{anime_title} {label} {number}");
            let placeholder = format!("EP {number}");

            let title = match ep.get("title").and_then(Value::as_str) {
                Some(t) if !t.is_empty() && t != placeholder => t.to_string(),
                _ => default_title,
            };
            let release_date = first_truthy(ep.get("releaseDate"), info.get("releaseDate"));

            EpisodeEntry {
                id: field(ep, "id"),
                title,
                image: field(ep, "image"),
                image_hash: field(ep, "imageHash"),
                number,
                created_at: release_date.clone(),
                release_date,
                description: first_truthy(ep.get("description"), info.get("description")),
                url: field(ep, "url"),
            }
        })
        .collect()
}

/// english → romaji → native → userPreferred for title objects; plain
/// values are used as-is.
fn display_title(title: Option<&Value>) -> String {
    match title {
        Some(Value::Object(t)) => ["english", "romaji", "native", "userPreferred"]
            .iter()
            .filter_map(|key| t.get(*key))
            .find(|v| is_truthy(v))
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        Some(Value::String(s)) => s.clone(),
        Some(Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    }
}

fn field(ep: &Value, key: &str) -> Value {
    ep.get(key).cloned().unwrap_or(Value::Null)
}

fn first_truthy(primary: Option<&Value>, fallback: Option<&Value>) -> Value {
    [primary, fallback]
        .into_iter()
        .flatten()
        .find(|v| is_truthy(v))
        .cloned()
        .unwrap_or(Value::Null)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn info() -> Value {
        json!({
            "title": { "romaji": "Kimetsu no Yaiba", "english": "Demon Slayer" },
            "type": "TV",
            "releaseDate": 2019,
            "description": "Tanjiro...",
            "episodes": [
                { "id": "from-info-1", "title": "EP 1" }
            ]
        })
    }

    #[test]
    fn test_listed_episodes_are_preferred() {
        let listed = vec![
            json!({ "id": "kny-1", "title": "Cruelty", "url": "https://x/1", "releaseDate": "2019-04-06" }),
            json!({ "id": "kny-2", "title": "EP 2" }),
        ];
        let shaped = shape_episodes(&info(), listed);
        assert_eq!(shaped.len(), 2);
        assert_eq!(shaped[0].id, "kny-1");
        assert_eq!(shaped[0].title, "Cruelty");
        assert_eq!(shaped[0].number, 1);
        assert_eq!(shaped[0].release_date, "2019-04-06");
        assert_eq!(shaped[0].created_at, "2019-04-06");
        assert_eq!(shaped[1].title, "Demon Slayer Episode 2");
        assert_eq!(shaped[1].release_date, 2019);
        assert_eq!(shaped[1].description, "Tanjiro...");
    }

    #[test]
    fn test_falls_back_to_info_episodes() {
        let shaped = shape_episodes(&info(), Vec::new());
        assert_eq!(shaped.len(), 1);
        assert_eq!(shaped[0].id, "from-info-1");
        assert_eq!(shaped[0].title, "Demon Slayer Episode 1");
    }

    #[test]
    fn test_movie_labels_and_title_fallbacks() {
        let info = json!({
            "title": { "english": null, "romaji": "Kimi no Na wa." },
            "type": "MOVIE"
        });
        let shaped = shape_episodes(&info, vec![json!({ "id": "movie" })]);
        assert_eq!(shaped[0].title, "Kimi no Na wa. Movie 1");
        assert_eq!(shaped[0].release_date, Value::Null);

        let plain = json!({ "title": "Plain Title" });
        let shaped = shape_episodes(&plain, vec![json!({ "id": "a", "title": "" })]);
        assert_eq!(shaped[0].title, "Plain Title Episode 1");
    }

    #[test]
    fn test_no_episodes_anywhere() {
        assert!(shape_episodes(&json!({}), Vec::new()).is_empty());
    }
}
