use thiserror::Error;

/// Errors from the AniList pipeline and detail providers.
#[derive(Debug, Error)]
pub enum AniListError {
    #[error("[AniList] internal error: {0}")]
    Transport(String),

    #[error("[AniList] bad request, upstream responded with status {status}")]
    UpstreamRejected { status: u16 },

    #[error("[AniList] did not receive any data")]
    NoData,

    #[error("[AniList] did not receive any page data")]
    NoPage,

    #[error("[AniList] empty results were received")]
    EmptyResults,

    #[error("[AniList] could not decode response: {0}")]
    Decode(String),

    #[error("[AniList] not found: {0}")]
    NotFound(String),

    #[error("[AniList] invalid input: {0}")]
    InvalidInput(String),

    #[error("[AniList] unsupported: {0}")]
    Unsupported(String),
}

impl AniListError {
    /// HTTP-like severity of this error.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Transport(_) | Self::UpstreamRejected { .. } | Self::NoData | Self::Decode(_) => {
                500
            }
            Self::NoPage | Self::EmptyResults | Self::NotFound(_) => 404,
            Self::InvalidInput(_) => 400,
            Self::Unsupported(_) => 501,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(AniListError::Transport("dns".into()).status_code(), 500);
        assert_eq!(AniListError::UpstreamRejected { status: 429 }.status_code(), 500);
        assert_eq!(AniListError::NoData.status_code(), 500);
        assert_eq!(AniListError::NoPage.status_code(), 404);
        assert_eq!(AniListError::EmptyResults.status_code(), 404);
        assert_eq!(AniListError::NotFound("anime".into()).status_code(), 404);
        assert_eq!(AniListError::InvalidInput("genre".into()).status_code(), 400);
        assert_eq!(AniListError::Unsupported("sources".into()).status_code(), 501);
    }

    #[test]
    fn test_rejection_message_hides_body() {
        let msg = AniListError::UpstreamRejected { status: 400 }.to_string();
        assert_eq!(msg, "[AniList] bad request, upstream responded with status 400");
    }
}
