//! Password hashing and bearer token issuance
//!
//! Passwords are hashed with bcrypt on the blocking thread pool. Tokens are
//! HS256 JWTs carrying the user id and username; there is no refresh or
//! revocation, a token is valid until it expires.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::{
    config::Config,
    error::{AppError, AppResult},
    models::{user::PASSWORD_MAX_BYTES, User},
};

/// Claims carried by every bearer token
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Claims {
    pub user_id: i32,
    pub username: String,
    pub iat: usize,
    pub exp: usize,
}

/// A freshly signed token
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub expires_in: u64,
}

#[derive(Clone)]
pub struct AuthService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    token_ttl_secs: u64,
    bcrypt_cost: u32,
}

impl AuthService {
    pub fn new(secret: &str, token_ttl_secs: u64, bcrypt_cost: u32) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation: Validation::default(),
            token_ttl_secs,
            bcrypt_cost,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(&config.jwt_secret, config.jwt_ttl_secs, config.bcrypt_cost)
    }

    /// Hashes a password with the configured bcrypt cost
    pub async fn hash_password(&self, password: &str) -> AppResult<String> {
        if password.len() > PASSWORD_MAX_BYTES {
            return Err(AppError::InvalidInput(format!(
                "Password must be at most {} bytes",
                PASSWORD_MAX_BYTES
            )));
        }

        let password = password.to_owned();
        let cost = self.bcrypt_cost;

        tokio::task::spawn_blocking(move || bcrypt::hash(password, cost))
            .await
            .map_err(|e| AppError::Internal(e.to_string()))?
            .map_err(AppError::from)
    }

    /// Checks a password against a stored bcrypt hash
    ///
    /// Passwords longer than bcrypt's input never match, since bcrypt would
    /// compare only their first [`PASSWORD_MAX_BYTES`] bytes.
    pub async fn verify_password(&self, password: &str, hashed_password: &str) -> AppResult<bool> {
        if password.len() > PASSWORD_MAX_BYTES {
            return Ok(false);
        }

        let password = password.to_owned();
        let hashed_password = hashed_password.to_owned();

        tokio::task::spawn_blocking(move || bcrypt::verify(password, &hashed_password))
            .await
            .map_err(|e| AppError::Internal(e.to_string()))?
            .map_err(AppError::from)
    }

    /// Signs a token for `user` valid for the configured lifetime
    pub fn issue_token(&self, user: &User) -> AppResult<IssuedToken> {
        self.issue_token_at(user, Utc::now())
    }

    fn issue_token_at(&self, user: &User, now: DateTime<Utc>) -> AppResult<IssuedToken> {
        let ttl = i64::try_from(self.token_ttl_secs)
            .map_err(|_| AppError::Internal("Token lifetime out of range".to_string()))?;
        let expires_at = now + Duration::seconds(ttl);

        let claims = Claims {
            user_id: user.user_id,
            username: user.username.clone(),
            iat: now.timestamp().max(0) as usize,
            exp: expires_at.timestamp().max(0) as usize,
        };

        let token = encode(&Header::default(), &claims, &self.encoding_key)?;
        Ok(IssuedToken {
            token,
            expires_in: self.token_ttl_secs,
        })
    }

    /// Verifies signature and expiry, returning the token's claims
    pub fn verify_token(&self, token: &str) -> AppResult<Claims> {
        decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| {
                tracing::debug!(error = %e, "Rejected bearer token");
                AppError::Unauthorized("Invalid or expired token".to_string())
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::{assert_err, assert_ok};

    fn service() -> AuthService {
        AuthService::new("test-secret", 3600, 4)
    }

    fn user() -> User {
        User {
            user_id: 42,
            username: "alice".to_string(),
            image_url: None,
            profile_bio: None,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_password_round_trip() {
        let auth = service();
        let hash = auth.hash_password("correct horse").await.unwrap();

        assert_ne!(hash, "correct horse");
        assert!(auth.verify_password("correct horse", &hash).await.unwrap());
        assert!(!auth.verify_password("wrong horse", &hash).await.unwrap());
    }

    #[tokio::test]
    async fn test_bytes_past_bcrypt_limit_do_not_match() {
        let auth = service();
        let password = "a".repeat(PASSWORD_MAX_BYTES);
        let hash = auth.hash_password(&password).await.unwrap();

        assert!(auth.verify_password(&password, &hash).await.unwrap());
        let longer = format!("{}totally-different", password);
        assert!(!auth.verify_password(&longer, &hash).await.unwrap());
        assert!(matches!(
            auth.hash_password(&longer).await,
            Err(AppError::InvalidInput(_))
        ));
    }

    #[tokio::test]
    async fn test_verify_against_garbage_hash_errors() {
        let auth = service();
        assert_err!(auth.verify_password("anything", "not-a-bcrypt-hash").await);
    }

    #[test]
    fn test_token_carries_user_identity() {
        let auth = service();
        let issued = auth.issue_token(&user()).unwrap();
        assert_eq!(issued.expires_in, 3600);

        let claims = assert_ok!(auth.verify_token(&issued.token));
        assert_eq!(claims.user_id, 42);
        assert_eq!(claims.username, "alice");
        assert_eq!(claims.exp - claims.iat, 3600);
    }

    #[test]
    fn test_token_from_other_secret_rejected() {
        let issued = AuthService::new("other-secret", 3600, 4)
            .issue_token(&user())
            .unwrap();

        let result = service().verify_token(&issued.token);
        assert!(matches!(result, Err(AppError::Unauthorized(_))));
    }

    #[test]
    fn test_expired_token_rejected() {
        let auth = service();
        let issued = auth
            .issue_token_at(&user(), Utc::now() - Duration::hours(3))
            .unwrap();

        let result = auth.verify_token(&issued.token);
        assert!(matches!(result, Err(AppError::Unauthorized(_))));
    }

    #[test]
    fn test_malformed_token_rejected() {
        assert!(matches!(
            service().verify_token("not.a.jwt"),
            Err(AppError::Unauthorized(_))
        ));
    }
}
