pub mod anilist;
pub mod episodes;
pub mod models;
pub mod random;
pub mod traits;

pub use anilist::{AniListClient, AniListError, AniListMeta};
pub use models::{CanonicalMedia, MediaStatus, SearchResult};
pub use traits::{MediaSearch, MetaProvider};
