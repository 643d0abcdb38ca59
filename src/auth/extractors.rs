use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use tracing::warn;

use crate::{accounts::repo_types::Account, error::ApiError, state::AppState};

use super::{jwt::JwtKeys, services::load_by_subject};

/// The authenticated account behind the bearer token.
///
/// Every rejection surfaces as the same generic `AccessDenied`; the concrete
/// cause (missing header, bad scheme, expired token, vanished subject) is
/// only ever logged, never sent to the client.
#[derive(Debug)]
pub struct CurrentAccount(pub Account);

#[async_trait]
impl FromRequestParts<AppState> for CurrentAccount {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let Some(header) = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
        else {
            warn!("missing Authorization header");
            return Err(ApiError::AccessDenied);
        };

        // Prefix is case-sensitive by design.
        let Some(token) = header.strip_prefix("Bearer ") else {
            warn!("Authorization header is not a Bearer token");
            return Err(ApiError::AccessDenied);
        };

        let keys = JwtKeys::from_ref(state);
        let claims = match keys.verify(token) {
            Ok(claims) => claims,
            Err(e) => {
                // Unverified subject, usable for correlation only.
                let subject = keys.extract_subject(token);
                warn!(error = %e, subject = ?subject, "token rejected");
                return Err(ApiError::AccessDenied);
            }
        };

        let account = load_by_subject(&state.db, &claims.sub).await?;
        Ok(CurrentAccount(account))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    fn parts_with_auth(value: Option<&str>) -> Parts {
        let mut builder = Request::builder().uri("/accounts");
        if let Some(value) = value {
            builder = builder.header(axum::http::header::AUTHORIZATION, value);
        }
        let (parts, _) = builder.body(()).expect("request").into_parts();
        parts
    }

    #[tokio::test]
    async fn missing_header_is_denied() {
        let mut parts = parts_with_auth(None);
        let err = CurrentAccount::from_request_parts(&mut parts, &AppState::fake())
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::AccessDenied));
    }

    #[tokio::test]
    async fn non_bearer_scheme_is_denied() {
        let mut parts = parts_with_auth(Some("Basic dXNlcjpwYXNz"));
        let err = CurrentAccount::from_request_parts(&mut parts, &AppState::fake())
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::AccessDenied));
    }

    #[tokio::test]
    async fn lowercase_bearer_prefix_is_denied() {
        let mut parts = parts_with_auth(Some("bearer some.token.here"));
        let err = CurrentAccount::from_request_parts(&mut parts, &AppState::fake())
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::AccessDenied));
    }

    #[tokio::test]
    async fn garbage_token_is_denied() {
        let mut parts = parts_with_auth(Some("Bearer not-a-jwt"));
        let err = CurrentAccount::from_request_parts(&mut parts, &AppState::fake())
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::AccessDenied));
    }

    #[tokio::test]
    async fn empty_bearer_token_is_denied() {
        let mut parts = parts_with_auth(Some("Bearer "));
        let err = CurrentAccount::from_request_parts(&mut parts, &AppState::fake())
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::AccessDenied));
    }
}
