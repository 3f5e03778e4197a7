use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};

/// Body returned for every failed redirect. Storage details stay in the logs.
pub const NOT_AVAILABLE: &str = "This link is not available.";

/// Why a slug could not be dispatched.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    /// The slug does not exist or has been deactivated.
    #[error("slug not found or inactive")]
    SlugNotFoundOrInactive,

    /// The slug exists but none of its targets are active.
    #[error("slug has no active targets")]
    NoActiveTargets,

    /// Slug or target lookup failed.
    #[error("failed to load slug configuration: {0}")]
    Lookup(#[source] sqlx::Error),

    /// The stored cursor could not be read; no position is guessed.
    #[error("failed to read rotation cursor: {0}")]
    CursorRead(#[source] sqlx::Error),

    /// The advanced cursor could not be persisted; the selected target is
    /// withheld so it is served again on retry.
    #[error("failed to persist rotation cursor: {0}")]
    CursorWrite(#[source] sqlx::Error),
}

impl DispatchError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::SlugNotFoundOrInactive | Self::NoActiveTargets => StatusCode::NOT_FOUND,
            Self::Lookup(_) | Self::CursorRead(_) | Self::CursorWrite(_) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
        }
    }
}

impl IntoResponse for DispatchError {
    fn into_response(self) -> Response {
        (self.status(), NOT_AVAILABLE).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn render(err: DispatchError) -> (StatusCode, String) {
        let response = err.into_response();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, String::from_utf8(body.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn storage_failures_are_503_with_generic_body() {
        let detail = sqlx::Error::PoolTimedOut.to_string();

        for err in [
            DispatchError::Lookup(sqlx::Error::PoolTimedOut),
            DispatchError::CursorRead(sqlx::Error::PoolTimedOut),
            DispatchError::CursorWrite(sqlx::Error::PoolTimedOut),
        ] {
            let (status, body) = render(err).await;
            assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
            assert_eq!(body, NOT_AVAILABLE);
            assert!(!body.contains(&detail));
        }
    }

    #[tokio::test]
    async fn unavailable_slugs_are_404_with_the_same_body() {
        for err in [
            DispatchError::SlugNotFoundOrInactive,
            DispatchError::NoActiveTargets,
        ] {
            let (status, body) = render(err).await;
            assert_eq!(status, StatusCode::NOT_FOUND);
            assert_eq!(body, NOT_AVAILABLE);
        }
    }
}
