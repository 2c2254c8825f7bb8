use axum::http::HeaderMap;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{AuthError, AUTHORIZATION_HEADER};
use crate::config::PersonnelConfig;

/// Claims this service reads from platform-issued access tokens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenClaims {
    pub sub: String,
    pub email: Option<String>,
    pub exp: usize,
}

/// Verifies HS256 access tokens minted by the hosting platform.
pub struct TokenVerifier {
    decoding_key: DecodingKey,
    validation: Validation,
}

impl TokenVerifier {
    pub fn new(config: &PersonnelConfig) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.algorithms = vec![Algorithm::HS256];

        if let Some(issuer) = &config.jwt_issuer {
            validation.set_issuer(&[issuer]);
        }

        match &config.jwt_audience {
            Some(audience) => validation.set_audience(&[audience]),
            None => validation.validate_aud = false,
        }

        Self {
            decoding_key: DecodingKey::from_secret(config.jwt_secret.as_bytes()),
            validation,
        }
    }

    pub fn verify(&self, token: &str) -> Result<TokenClaims, AuthError> {
        let token_data = decode::<TokenClaims>(token, &self.decoding_key, &self.validation)?;
        let claims = token_data.claims;

        if claims.sub.trim().is_empty() {
            return Err(AuthError::InvalidToken("subject claim is empty".into()));
        }

        debug!(subject = %claims.sub, "verified access token");
        Ok(claims)
    }

    pub fn verify_headers(&self, headers: &HeaderMap) -> Result<TokenClaims, AuthError> {
        let token = bearer_token(headers)?;
        self.verify(token)
    }
}

pub fn bearer_token(headers: &HeaderMap) -> Result<&str, AuthError> {
    let value = headers
        .get(AUTHORIZATION_HEADER)
        .ok_or(AuthError::MissingAuthHeader)?;
    let value = value.to_str().map_err(|_| AuthError::MalformedAuthHeader)?;
    value
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or(AuthError::MalformedAuthHeader)
}
