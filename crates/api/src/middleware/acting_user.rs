//! Acting-user extractor.
//!
//! The shop has no sessions; callers name the user they act as in the
//! `X-Acting-User` header and the cart guard decides what that user may do.

use axum::{extract::FromRequestParts, http::request::Parts};

use crate::error::AppError;

/// The HTTP header naming the acting user.
pub const ACTING_USER_HEADER: &str = "x-acting-user";

/// Extractor for the username the request acts as.
///
/// Rejects with 401 when the header is missing or blank.
///
/// # Example
///
/// ```rust,ignore
/// async fn handler(ActingUser(acting): ActingUser) -> String {
///     format!("acting as {acting}")
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActingUser(pub String);

impl<S> FromRequestParts<S> for ActingUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let acting = parts
            .headers
            .get(ACTING_USER_HEADER)
            .and_then(|h| h.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .ok_or_else(|| {
                AppError::Unauthorized("X-Acting-User header is required.".to_owned())
            })?;

        tracing::Span::current().record("acting_user", acting);
        Ok(Self(acting.to_owned()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::{
        Router,
        body::Body,
        http::{Request, StatusCode},
        routing::get,
    };
    use tower::ServiceExt;

    use super::*;

    fn app() -> Router {
        Router::new().route("/", get(|ActingUser(name): ActingUser| async move { name }))
    }

    #[tokio::test]
    async fn test_header_is_extracted() {
        let request = Request::builder()
            .uri("/")
            .header(ACTING_USER_HEADER, " alice ")
            .body(Body::empty())
            .unwrap();

        let response = app().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&body[..], b"alice");
    }

    #[tokio::test]
    async fn test_missing_or_blank_header_is_unauthorized() {
        let missing = Request::builder().uri("/").body(Body::empty()).unwrap();
        let response = app().oneshot(missing).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let blank = Request::builder()
            .uri("/")
            .header(ACTING_USER_HEADER, "  ")
            .body(Body::empty())
            .unwrap();
        let response = app().oneshot(blank).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
