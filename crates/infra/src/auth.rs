use argon2::Argon2;
use argon2::password_hash::{
    PasswordHash, PasswordHasher as _, PasswordVerifier, SaltString,
};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use respawn_domain::DomainResult;
use respawn_domain::auth::Role;
use respawn_domain::error::DomainError;
use respawn_domain::identity::ActorIdentity;
use respawn_domain::ports::BoxFuture;
use respawn_domain::ports::credentials::PasswordHasher;
use respawn_domain::users::User;
use respawn_domain::util::now_ms;

use crate::config::AppConfig;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub username: String,
    pub role: String,
    pub iat: u64,
    pub exp: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct AuthToken {
    pub access_token: String,
    pub token_type: &'static str,
    pub expires_at_ms: i64,
}

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("token encoding failed: {0}")]
    Encode(String),
    #[error("invalid token: {0}")]
    Invalid(String),
    #[error("token carries unknown role '{0}'")]
    UnknownRole(String),
}

/// Issues and validates HS256 access tokens.
#[derive(Clone)]
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    ttl_secs: u64,
}

impl TokenService {
    pub fn new(secret: &str, ttl_secs: u64) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            ttl_secs,
        }
    }

    pub fn from_app_config(config: &AppConfig) -> Self {
        Self::new(&config.jwt_secret, config.jwt_ttl_secs)
    }

    pub fn issue(&self, user: &User) -> Result<AuthToken, TokenError> {
        let iat = (now_ms() / 1000).max(0) as u64;
        let exp = iat + self.ttl_secs;
        let claims = Claims {
            sub: user.user_id.clone(),
            username: user.username.clone(),
            role: user.role.as_str().to_string(),
            iat,
            exp,
        };
        let access_token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|err| TokenError::Encode(err.to_string()))?;
        Ok(AuthToken {
            access_token,
            token_type: "Bearer",
            expires_at_ms: (exp as i64) * 1000,
        })
    }

    pub fn validate(&self, token: &str) -> Result<ActorIdentity, TokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        let data = decode::<Claims>(token, &self.decoding_key, &validation)
            .map_err(|err| TokenError::Invalid(err.to_string()))?;
        let role = Role::parse(&data.claims.role)
            .ok_or_else(|| TokenError::UnknownRole(data.claims.role.clone()))?;
        Ok(ActorIdentity::new(data.claims.sub, data.claims.username).with_role(role))
    }
}

/// Argon2id with the crate's default parameters, PHC string output.
#[derive(Clone, Default)]
pub struct Argon2PasswordHasher {
    argon2: Argon2<'static>,
}

impl Argon2PasswordHasher {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Argon2PasswordHasher {
    fn hash_blocking(&self, password: &str) -> DomainResult<String> {
        let salt = SaltString::encode_b64(uuid::Uuid::new_v4().as_bytes())
            .map_err(|err| DomainError::Storage(format!("salt generation failed: {err}")))?;
        self.argon2
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|err| DomainError::Storage(format!("password hashing failed: {err}")))
    }

    fn verify_blocking(&self, password: &str, password_hash: &str) -> DomainResult<bool> {
        let parsed = PasswordHash::new(password_hash)
            .map_err(|err| DomainError::Storage(format!("stored password hash invalid: {err}")))?;
        Ok(self
            .argon2
            .verify_password(password.as_bytes(), &parsed)
            .is_ok())
    }
}

async fn run_blocking<T, F>(work: F) -> DomainResult<T>
where
    T: Send + 'static,
    F: FnOnce() -> DomainResult<T> + Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|err| DomainError::Storage(format!("password worker failed: {err}")))?
}

impl PasswordHasher for Argon2PasswordHasher {
    fn hash(&self, password: &str) -> BoxFuture<'_, DomainResult<String>> {
        let hasher = self.clone();
        let password = password.to_string();
        Box::pin(async move { run_blocking(move || hasher.hash_blocking(&password)).await })
    }

    fn verify(&self, password: &str, password_hash: &str) -> BoxFuture<'_, DomainResult<bool>> {
        let hasher = self.clone();
        let password = password.to_string();
        let password_hash = password_hash.to_string();
        Box::pin(async move {
            run_blocking(move || hasher.verify_blocking(&password, &password_hash)).await
        })
    }
}
