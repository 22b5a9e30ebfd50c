use std::sync::Arc;

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::SaltString;
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use axum::extract::{FromRef, FromRequestParts};
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use shared::ShopError;

use crate::error::ApiError;
use crate::models::UserProfile;

/// Claims carried by a storefront bearer token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub iat: i64,
    pub exp: i64,
}

/// HS256 signing material plus the token lifetime.
pub struct AuthKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl AuthKeys {
    pub fn new(secret: &str) -> Self {
        Self::with_ttl(secret, Duration::hours(24))
    }

    pub fn with_ttl(secret: &str, ttl: Duration) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl,
        }
    }

    pub fn issue(&self, user: &UserProfile) -> anyhow::Result<String> {
        let now = Utc::now();
        let claims = Claims {
            sub: user.id.to_string(),
            email: user.email.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            iat: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
        };
        self.sign(&claims)
    }

    pub fn sign(&self, claims: &Claims) -> anyhow::Result<String> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding)
            .map_err(|e| anyhow::anyhow!("failed to sign token: {}", e))
    }

    pub fn verify(&self, token: &str) -> Result<Claims, ShopError> {
        let validation = Validation::new(Algorithm::HS256);
        decode::<Claims>(token, &self.decoding, &validation)
            .map(|data| data.claims)
            .map_err(|e| {
                tracing::warn!("Rejected bearer token: {}", e);
                ShopError::Forbidden("invalid or expired token".to_string())
            })
    }
}

pub async fn hash_password(password: String) -> anyhow::Result<String> {
    tokio::task::spawn_blocking(move || {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| anyhow::anyhow!("failed to hash password: {}", e))
    })
    .await?
}

/// Checks a password against a stored PHC string. A malformed stored hash
/// never verifies.
pub async fn verify_password(password: String, stored_hash: String) -> bool {
    tokio::task::spawn_blocking(move || {
        PasswordHash::new(&stored_hash)
            .map(|parsed| {
                Argon2::default()
                    .verify_password(password.as_bytes(), &parsed)
                    .is_ok()
            })
            .unwrap_or(false)
    })
    .await
    .unwrap_or(false)
}

/// Extracts and validates the `Authorization: Bearer` header.
#[derive(Debug, Clone)]
pub struct AuthUser(pub Claims);

#[axum::async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    Arc<AuthKeys>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .ok_or_else(|| ShopError::Unauthorized("access token required".to_string()))?;

        let keys = Arc::<AuthKeys>::from_ref(state);
        Ok(AuthUser(keys.verify(token)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn profile() -> UserProfile {
        UserProfile {
            id: Uuid::new_v4(),
            email: "rider@example.com".into(),
            first_name: "Ada".into(),
            last_name: "Rider".into(),
        }
    }

    #[test]
    fn issued_token_verifies_and_expires_in_a_day() {
        let keys = AuthKeys::new("test-secret");
        let user = profile();
        let token = keys.issue(&user).unwrap();
        let claims = keys.verify(&token).unwrap();
        assert_eq!(claims.sub, user.id.to_string());
        assert_eq!(claims.email, user.email);
        assert_eq!(claims.exp - claims.iat, 24 * 60 * 60);
    }

    #[test]
    fn token_signed_with_other_secret_is_forbidden() {
        let token = AuthKeys::new("one").issue(&profile()).unwrap();
        assert!(matches!(
            AuthKeys::new("two").verify(&token),
            Err(ShopError::Forbidden(_))
        ));
    }

    #[test]
    fn expired_token_is_forbidden() {
        let keys = AuthKeys::new("test-secret");
        let now = Utc::now().timestamp();
        let token = keys
            .sign(&Claims {
                sub: Uuid::new_v4().to_string(),
                email: "old@example.com".into(),
                first_name: "Old".into(),
                last_name: "Token".into(),
                iat: now - 2 * 24 * 60 * 60,
                exp: now - 24 * 60 * 60,
            })
            .unwrap();
        assert!(matches!(keys.verify(&token), Err(ShopError::Forbidden(_))));
    }

    #[test]
    fn garbage_token_is_forbidden() {
        let keys = AuthKeys::new("test-secret");
        assert!(matches!(keys.verify("not.a.jwt"), Err(ShopError::Forbidden(_))));
    }

    #[tokio::test]
    async fn password_hash_round_trip() {
        let hash = hash_password("correct horse".into()).await.unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(verify_password("correct horse".into(), hash.clone()).await);
        assert!(!verify_password("wrong horse".into(), hash).await);
        assert!(!verify_password("anything".into(), "not-a-phc-string".into()).await);
    }
}
