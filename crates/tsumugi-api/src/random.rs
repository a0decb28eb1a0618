//! Random title selection over paginated search results.

use rand::Rng;
use serde_json::Value;

use crate::anilist::error::AniListError;
use crate::anilist::query::SearchRequest;
use crate::models::CanonicalMedia;
use crate::traits::{MediaSearch, MetaProvider};

/// Attempts after the first before giving up.
pub const MAX_RANDOM_TRIES: u32 = 50;
/// Random pages are drawn from `1..=RANDOM_PAGE_SPAN`.
pub const RANDOM_PAGE_SPAN: u32 = 50;
pub const RANDOM_PER_PAGE: u32 = 500;

/// Draws one title from the search corpus and enriches it with detail.
pub struct RandomPicker<'a, S, P> {
    search: &'a S,
    provider: &'a P,
    is_adult: Option<bool>,
}

impl<'a, S, P> RandomPicker<'a, S, P>
where
    S: MediaSearch,
    P: MetaProvider,
{
    pub fn new(search: &'a S, provider: &'a P, is_adult: Option<bool>) -> Self {
        Self {
            search,
            provider,
            is_adult,
        }
    }

    /// Search pages until one yields an item with an id, then merge its
    /// detail record over the summary. Search failures end the loop at once.
    pub async fn pick(&self) -> Result<Value, AniListError> {
        let mut page = 0;
        let mut tries = 0;

        loop {
            if tries > MAX_RANDOM_TRIES {
                return Err(AniListError::NotFound("anime not found".into()));
            }

            let drawn = page == 0;
            let current = if drawn { random_page() } else { page };
            let next_page = if drawn { 1 } else { page + 1 };
            tries += 1;

            let result = self
                .search
                .search(SearchRequest {
                    page: Some(current),
                    per_page: Some(RANDOM_PER_PAGE),
                    is_adult: self.is_adult,
                    ..Default::default()
                })
                .await?;

            let Some(summary) = choose(&result.results) else {
                tracing::debug!(page = current, tries, "Random page was empty");
                page = next_page;
                continue;
            };
            if summary.id.is_empty() {
                tracing::debug!(page = current, tries, "Random pick had no id");
                page = next_page;
                continue;
            }

            let detail = self.provider.fetch_anilist_info_by_id(&summary.id).await?;
            return merge_detail(summary, detail);
        }
    }
}

fn random_page() -> u32 {
    rand::rng().random_range(1..=RANDOM_PAGE_SPAN)
}

fn choose(results: &[CanonicalMedia]) -> Option<&CanonicalMedia> {
    if results.is_empty() {
        return None;
    }
    let index = rand::rng().random_range(0..results.len());
    results.get(index)
}

/// Overlay `detail` on the summary; detail keys win.
fn merge_detail(summary: &CanonicalMedia, detail: Value) -> Result<Value, AniListError> {
    let mut merged =
        serde_json::to_value(summary).map_err(|e| AniListError::Decode(e.to_string()))?;
    match (merged.as_object_mut(), detail) {
        (Some(base), Value::Object(detail)) => {
            base.extend(detail);
            Ok(merged)
        }
        (_, detail) => Ok(detail),
    }
}
