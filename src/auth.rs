//! Caller identity resolution.
//!
//! [`TokenResolver`] turns request headers into an opaque [`SubjectId`].
//! The shipped resolver verifies an HS256 bearer JWT and reads its `sub`
//! claim; issuer and audience checks are optional.

use std::fmt;

use axum::http::{HeaderMap, header::AUTHORIZATION};
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

/// Authenticated caller identity. Opaque to the pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SubjectId(String);

impl SubjectId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SubjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("missing bearer credential")]
    MissingCredential,
    #[error("malformed authorization header")]
    MalformedHeader,
    #[error("invalid token: {0}")]
    InvalidToken(String),
}

/// Resolves the calling subject from request headers.
pub trait TokenResolver: Send + Sync + 'static {
    fn subject(&self, headers: &HeaderMap) -> Result<SubjectId, AuthError>;
}

/// Extract the token from an `Authorization: Bearer <token>` header.
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, AuthError> {
    let value = headers.get(AUTHORIZATION).ok_or(AuthError::MissingCredential)?;
    let value = value.to_str().map_err(|_| AuthError::MalformedHeader)?;
    let (scheme, token) = value.trim().split_once(' ').ok_or(AuthError::MalformedHeader)?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return Err(AuthError::MalformedHeader);
    }
    let token = token.trim();
    if token.is_empty() {
        return Err(AuthError::MissingCredential);
    }
    Ok(token)
}

#[derive(Deserialize)]
struct Claims {
    sub: String,
}

/// HS256 JWT verifier. `exp` and `sub` are required claims.
pub struct JwtTokenResolver {
    key: DecodingKey,
    validation: Validation,
}

impl JwtTokenResolver {
    pub fn hs256(secret: &[u8], issuer: Option<&str>, audience: Option<&str>) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_required_spec_claims(&["exp", "sub"]);
        if let Some(iss) = issuer {
            validation.set_issuer(&[iss]);
        }
        match audience {
            Some(aud) => validation.set_audience(&[aud]),
            None => validation.validate_aud = false,
        }
        Self { key: DecodingKey::from_secret(secret), validation }
    }
}

impl TokenResolver for JwtTokenResolver {
    fn subject(&self, headers: &HeaderMap) -> Result<SubjectId, AuthError> {
        let token = bearer_token(headers)?;
        let data = decode::<Claims>(token, &self.key, &self.validation).map_err(|e| {
            debug!(error = %e, "bearer token rejected");
            AuthError::InvalidToken(e.to_string())
        })?;
        if data.claims.sub.trim().is_empty() {
            return Err(AuthError::InvalidToken("empty sub claim".into()));
        }
        Ok(SubjectId(data.claims.sub))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use jsonwebtoken::{EncodingKey, Header, encode, get_current_timestamp};
    use serde::Serialize;

    const SECRET: &[u8] = b"test-secret";

    #[derive(Serialize)]
    struct TestClaims<'a> {
        sub: &'a str,
        exp: u64,
        #[serde(skip_serializing_if = "Option::is_none")]
        iss: Option<&'a str>,
    }

    fn token(sub: &str, exp: u64, iss: Option<&str>) -> String {
        encode(
            &Header::default(),
            &TestClaims { sub, exp, iss },
            &EncodingKey::from_secret(SECRET),
        )
        .unwrap()
    }

    fn headers(value: &str) -> HeaderMap {
        let mut h = HeaderMap::new();
        h.insert(AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        h
    }

    #[test]
    fn valid_token_resolves_subject() {
        let r = JwtTokenResolver::hs256(SECRET, None, None);
        let t = token("user-42", get_current_timestamp() + 3600, None);
        let subject = r.subject(&headers(&format!("Bearer {t}"))).unwrap();
        assert_eq!(subject.as_str(), "user-42");
        assert_eq!(subject.to_string(), "user-42");
    }

    #[test]
    fn scheme_is_case_insensitive() {
        let r = JwtTokenResolver::hs256(SECRET, None, None);
        let t = token("user-42", get_current_timestamp() + 3600, None);
        assert!(r.subject(&headers(&format!("bearer {t}"))).is_ok());
    }

    #[test]
    fn missing_header_is_rejected() {
        let r = JwtTokenResolver::hs256(SECRET, None, None);
        assert!(matches!(r.subject(&HeaderMap::new()), Err(AuthError::MissingCredential)));
    }

    #[test]
    fn non_bearer_scheme_is_rejected() {
        let r = JwtTokenResolver::hs256(SECRET, None, None);
        assert!(matches!(
            r.subject(&headers("Basic dXNlcjpwYXNz")),
            Err(AuthError::MalformedHeader)
        ));
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let r = JwtTokenResolver::hs256(b"other-secret", None, None);
        let t = token("user-42", get_current_timestamp() + 3600, None);
        assert!(matches!(
            r.subject(&headers(&format!("Bearer {t}"))),
            Err(AuthError::InvalidToken(_))
        ));
    }

    #[test]
    fn expired_token_is_rejected() {
        let r = JwtTokenResolver::hs256(SECRET, None, None);
        let t = token("user-42", get_current_timestamp() - 3600, None);
        assert!(r.subject(&headers(&format!("Bearer {t}"))).is_err());
    }

    #[test]
    fn issuer_is_checked_when_configured() {
        let r = JwtTokenResolver::hs256(SECRET, Some("https://issuer.example"), None);
        let exp = get_current_timestamp() + 3600;
        let good = token("u", exp, Some("https://issuer.example"));
        let bad = token("u", exp, Some("https://elsewhere.example"));
        assert!(r.subject(&headers(&format!("Bearer {good}"))).is_ok());
        assert!(r.subject(&headers(&format!("Bearer {bad}"))).is_err());
    }

    #[test]
    fn empty_subject_is_rejected() {
        let r = JwtTokenResolver::hs256(SECRET, None, None);
        let t = token("  ", get_current_timestamp() + 3600, None);
        assert!(matches!(
            r.subject(&headers(&format!("Bearer {t}"))),
            Err(AuthError::InvalidToken(_))
        ));
    }
}
