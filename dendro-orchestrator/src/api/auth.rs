//! Bearer token extraction
//!
//! Every credential (user API token, compute client private key, job
//! private key) arrives as `Authorization: Bearer <token>`. Which one is
//! expected is up to the handler.

use std::convert::Infallible;

use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;

/// The bearer token of a request, if any
#[derive(Debug, Clone, Default)]
pub struct BearerToken(pub Option<String>);

impl BearerToken {
    pub fn as_deref(&self) -> Option<&str> {
        self.0.as_deref()
    }
}

/// Accepts `Bearer <token>` as well as the `Bearer: <token>` form some
/// older clients send
fn parse_bearer(value: &str) -> Option<String> {
    let rest = value.trim().strip_prefix("Bearer")?;
    let token = rest.trim_start_matches(':').trim();
    (!token.is_empty()).then(|| token.to_string())
}

impl<S> FromRequestParts<S> for BearerToken
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(parse_bearer);
        Ok(BearerToken(token))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bearer_forms() {
        assert_eq!(parse_bearer("Bearer abc").as_deref(), Some("abc"));
        assert_eq!(parse_bearer("Bearer: abc").as_deref(), Some("abc"));
        assert_eq!(parse_bearer("  Bearer   abc  ").as_deref(), Some("abc"));
        assert_eq!(parse_bearer("Bearer "), None);
        assert_eq!(parse_bearer("Basic abc"), None);
    }
}
