use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};

use crate::errors::AppError;
use crate::state::AppState;

/// Proof that the request carried one of the configured bearer tokens.
#[derive(Debug, Clone, Copy)]
pub struct Authenticated;

#[async_trait]
impl FromRequestParts<AppState> for Authenticated {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, AppError> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok());
        match bearer_token(header) {
            Some(token) if state.config.api_tokens.contains(token) => Ok(Authenticated),
            _ => {
                tracing::debug!("Rejected request without a valid bearer token");
                Err(AppError::Unauthorized)
            }
        }
    }
}

/// Token from an `Authorization` header value, with or without the `Bearer` scheme.
pub fn bearer_token(header: Option<&str>) -> Option<&str> {
    let value = header?.trim();
    if value.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = match value.split_once(' ') {
        Some((scheme, rest)) if scheme.eq_ignore_ascii_case("bearer") => rest.trim(),
        _ => value,
    };
    (!token.is_empty()).then_some(token)
}
