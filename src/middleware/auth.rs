use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header, request::Parts, HeaderMap},
};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::Deserialize;

use crate::error::ApiError;
use crate::server::AppState;
use crate::types::RequestContext;

/// Identity claims this service reads from a bearer token
#[derive(Debug, Deserialize)]
pub struct Claims {
    pub iss: Option<String>,
    pub sub: Option<String>,
    pub user_id: Option<String>,
}

impl Claims {
    /// `issuer#subject` when both are present, else whichever identifier exists
    pub fn subject(&self) -> Option<String> {
        match (&self.iss, &self.sub) {
            (Some(iss), Some(sub)) => Some(format!("{}#{}", iss, sub)),
            (None, Some(sub)) => Some(sub.clone()),
            _ => self.user_id.clone(),
        }
    }
}

/// Every resource handler takes a RequestContext. Requests without an
/// Authorization header are anonymous; a Bearer token that cannot be decoded
/// is rejected with 401.
#[async_trait]
impl FromRequestParts<AppState> for RequestContext {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let base_url = external_base_url(&parts.headers, state.config.service.public_base_url.as_deref());

        let authorization = match parts.headers.get(header::AUTHORIZATION) {
            Some(value) => Some(
                value
                    .to_str()
                    .map_err(|_| ApiError::unauthorized("Invalid Authorization header format"))?
                    .to_string(),
            ),
            None => None,
        };

        let subject = match authorization.as_deref().and_then(bearer_token) {
            Some(token) => validate_jwt(token, state.config.security.jwt_secret.as_deref())
                .map_err(ApiError::unauthorized)?
                .subject(),
            None => None,
        };

        Ok(RequestContext {
            subject,
            authorization,
            base_url,
        })
    }
}

fn bearer_token(header_value: &str) -> Option<&str> {
    header_value.strip_prefix("Bearer ").map(str::trim)
}

/// Decode the token. With a secret it must be a valid HS256 token; without
/// one the claims are read as-is and the permission service, which receives
/// the same header, is left to verify them.
pub fn validate_jwt(token: &str, secret: Option<&str>) -> Result<Claims, String> {
    if token.is_empty() {
        return Err("Empty JWT token".to_string());
    }

    let (key, validation) = match secret {
        Some(secret) => {
            let mut validation = Validation::new(Algorithm::HS256);
            validation.validate_aud = false;
            (DecodingKey::from_secret(secret.as_bytes()), validation)
        }
        None => {
            let mut validation = Validation::default();
            validation.insecure_disable_signature_validation();
            validation.required_spec_claims.clear();
            validation.validate_exp = false;
            validation.validate_aud = false;
            (DecodingKey::from_secret(&[]), validation)
        }
    };

    let token_data =
        decode::<Claims>(token, &key, &validation).map_err(|e| format!("Invalid JWT token: {}", e))?;

    Ok(token_data.claims)
}

/// Scheme and authority clients use to reach this service, no trailing slash
pub fn external_base_url(headers: &HeaderMap, public_base_url: Option<&str>) -> String {
    if let Some(base) = public_base_url {
        return base.trim_end_matches('/').to_string();
    }

    let proto = headers
        .get("x-forwarded-proto")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .unwrap_or("http");
    let host = headers
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("localhost");

    format!("{}://{}", proto, host)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use jsonwebtoken::{encode, EncodingKey, Header};
    use serde_json::json;

    fn token(claims: serde_json::Value, secret: &str) -> String {
        encode(&Header::default(), &claims, &EncodingKey::from_secret(secret.as_bytes())).unwrap()
    }

    #[test]
    fn subject_prefers_issuer_and_subject() {
        let claims = Claims {
            iss: Some("http://idp".into()),
            sub: Some("alice".into()),
            user_id: Some("ignored".into()),
        };
        assert_eq!(claims.subject().as_deref(), Some("http://idp#alice"));

        let claims = Claims { iss: None, sub: None, user_id: Some("u1".into()) };
        assert_eq!(claims.subject().as_deref(), Some("u1"));
    }

    #[test]
    fn decodes_unverified_tokens_without_secret() {
        let jwt = token(json!({"iss": "http://idp", "sub": "bob"}), "someone-elses-secret");
        let claims = validate_jwt(&jwt, None).unwrap();
        assert_eq!(claims.subject().as_deref(), Some("http://idp#bob"));
    }

    #[test]
    fn verifies_tokens_with_secret() {
        let exp = chrono::Utc::now().timestamp() + 600;
        let jwt = token(json!({"sub": "carol", "exp": exp}), "s3cret");
        assert!(validate_jwt(&jwt, Some("s3cret")).is_ok());
        assert!(validate_jwt(&jwt, Some("wrong")).is_err());
    }

    #[test]
    fn rejects_garbage() {
        assert!(validate_jwt("not-a-jwt", None).is_err());
        assert!(validate_jwt("", None).is_err());
    }

    #[test]
    fn base_url_from_headers() {
        let mut headers = HeaderMap::new();
        headers.insert(header::HOST, HeaderValue::from_static("api.example.com"));
        assert_eq!(external_base_url(&headers, None), "http://api.example.com");

        headers.insert("x-forwarded-proto", HeaderValue::from_static("https, http"));
        assert_eq!(external_base_url(&headers, None), "https://api.example.com");

        assert_eq!(
            external_base_url(&headers, Some("https://public.example.com/")),
            "https://public.example.com"
        );
    }
}
