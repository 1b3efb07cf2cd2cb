use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::DomainResult;
use crate::auth::Role;
use crate::error::DomainError;
use crate::identity::ActorIdentity;
use crate::ports::credentials::PasswordHasher;
use crate::ports::users::UserRepository;
use crate::util::{now_ms, optional_text, validate_http_url};

const MIN_USERNAME_LENGTH: usize = 3;
const MAX_USERNAME_LENGTH: usize = 32;
const MAX_EMAIL_LENGTH: usize = 254;
const MIN_PASSWORD_LENGTH: usize = 8;
const MAX_PASSWORD_LENGTH: usize = 128;
const MAX_DISPLAY_NAME_LENGTH: usize = 64;
const MAX_BIO_LENGTH: usize = 500;

#[derive(Clone, Debug, PartialEq)]
pub struct User {
    pub user_id: String,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub display_name: Option<String>,
    pub bio: Option<String>,
    pub avatar_url: Option<String>,
    pub role: Role,
    pub created_at_ms: i64,
    pub updated_at_ms: i64,
}

impl User {
    pub fn actor(&self) -> ActorIdentity {
        ActorIdentity::new(self.user_id.clone(), self.username.clone()).with_role(self.role)
    }
}

/// Public view of a user; safe to show to anyone.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct UserProfile {
    pub user_id: String,
    pub username: String,
    pub display_name: Option<String>,
    pub bio: Option<String>,
    pub avatar_url: Option<String>,
    pub created_at_ms: i64,
}

impl From<&User> for UserProfile {
    fn from(user: &User) -> Self {
        Self {
            user_id: user.user_id.clone(),
            username: user.username.clone(),
            display_name: user.display_name.clone(),
            bio: user.bio.clone(),
            avatar_url: user.avatar_url.clone(),
            created_at_ms: user.created_at_ms,
        }
    }
}

/// The caller's own account.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct UserAccount {
    #[serde(flatten)]
    pub profile: UserProfile,
    pub email: String,
    pub role: Role,
    pub updated_at_ms: i64,
}

impl From<&User> for UserAccount {
    fn from(user: &User) -> Self {
        Self {
            profile: UserProfile::from(user),
            email: user.email.clone(),
            role: user.role,
            updated_at_ms: user.updated_at_ms,
        }
    }
}

#[derive(Clone, Debug)]
pub struct RegisterInput {
    pub username: String,
    pub email: String,
    pub password: String,
    pub display_name: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct ProfileUpdate {
    pub display_name: Option<String>,
    pub bio: Option<String>,
    pub avatar_url: Option<String>,
}

#[derive(Clone)]
pub struct UserService {
    repository: Arc<dyn UserRepository>,
    hasher: Arc<dyn PasswordHasher>,
}

impl UserService {
    pub fn new(repository: Arc<dyn UserRepository>, hasher: Arc<dyn PasswordHasher>) -> Self {
        Self { repository, hasher }
    }

    pub async fn register(&self, input: RegisterInput) -> DomainResult<User> {
        let username = normalize_username(&input.username)?;
        let email = normalize_email(&input.email)?;
        validate_password(&input.password)?;
        let display_name =
            optional_text("display_name", input.display_name.as_deref(), MAX_DISPLAY_NAME_LENGTH)?;

        if self.repository.get_by_username(&username).await?.is_some() {
            return Err(DomainError::Conflict("username already taken".into()));
        }
        if self.repository.get_by_email(&email).await?.is_some() {
            return Err(DomainError::Conflict("email already registered".into()));
        }

        let now = now_ms();
        let user = User {
            user_id: crate::util::uuid_v7_without_dashes(),
            username,
            email,
            password_hash: self.hasher.hash(&input.password).await?,
            display_name,
            bio: None,
            avatar_url: None,
            role: Role::User,
            created_at_ms: now,
            updated_at_ms: now,
        };
        let user = self.repository.create(&user).await?;
        tracing::info!(user_id = %user.user_id, username = %user.username, "user registered");
        Ok(user)
    }

    /// `identifier` is either a username or an email address. Unknown
    /// identifiers and wrong passwords are indistinguishable to the caller.
    pub async fn authenticate(&self, identifier: &str, password: &str) -> DomainResult<User> {
        let identifier = identifier.trim();
        if identifier.is_empty() || password.is_empty() {
            return Err(DomainError::Unauthorized);
        }
        let user = if identifier.contains('@') {
            self.repository
                .get_by_email(&identifier.to_ascii_lowercase())
                .await?
        } else {
            self.repository.get_by_username(identifier).await?
        };
        let Some(user) = user else {
            return Err(DomainError::Unauthorized);
        };
        if !self
            .hasher
            .verify(password, &user.password_hash)
            .await?
        {
            return Err(DomainError::Unauthorized);
        }
        Ok(user)
    }

    pub async fn get(&self, user_id: &str) -> DomainResult<User> {
        self.repository
            .get(user_id)
            .await?
            .ok_or(DomainError::NotFound)
    }

    pub async fn update_profile(
        &self,
        actor: &ActorIdentity,
        update: ProfileUpdate,
    ) -> DomainResult<User> {
        let mut user = self.get(&actor.user_id).await?;
        if let Some(display_name) = update.display_name.as_deref() {
            user.display_name =
                optional_text("display_name", Some(display_name), MAX_DISPLAY_NAME_LENGTH)?;
        }
        if let Some(bio) = update.bio.as_deref() {
            user.bio = optional_text("bio", Some(bio), MAX_BIO_LENGTH)?;
        }
        if let Some(avatar_url) = update.avatar_url.as_deref() {
            user.avatar_url = if avatar_url.trim().is_empty() {
                None
            } else {
                Some(validate_http_url("avatar_url", avatar_url)?)
            };
        }
        user.updated_at_ms = now_ms();
        self.repository.update(&user).await
    }
}

fn normalize_username(value: &str) -> DomainResult<String> {
    let username = value.trim();
    let length = username.chars().count();
    if !(MIN_USERNAME_LENGTH..=MAX_USERNAME_LENGTH).contains(&length) {
        return Err(DomainError::Validation(format!(
            "username must be between {MIN_USERNAME_LENGTH} and {MAX_USERNAME_LENGTH} characters"
        )));
    }
    if !username
        .chars()
        .all(|ch| ch.is_ascii_alphanumeric() || ch == '_')
    {
        return Err(DomainError::Validation(
            "username may only contain letters, digits and underscores".into(),
        ));
    }
    Ok(username.to_string())
}

fn normalize_email(value: &str) -> DomainResult<String> {
    let email = value.trim().to_ascii_lowercase();
    if email.len() > MAX_EMAIL_LENGTH {
        return Err(DomainError::Validation(format!(
            "email exceeds max length of {MAX_EMAIL_LENGTH}"
        )));
    }
    let mut parts = email.split('@');
    let valid = match (parts.next(), parts.next(), parts.next()) {
        (Some(local), Some(domain), None) => {
            !local.is_empty() && !domain.is_empty() && !email.contains(char::is_whitespace)
        }
        _ => false,
    };
    if !valid {
        return Err(DomainError::Validation("email is invalid".into()));
    }
    Ok(email)
}

fn validate_password(value: &str) -> DomainResult<()> {
    let length = value.chars().count();
    if !(MIN_PASSWORD_LENGTH..=MAX_PASSWORD_LENGTH).contains(&length) {
        return Err(DomainError::Validation(format!(
            "password must be between {MIN_PASSWORD_LENGTH} and {MAX_PASSWORD_LENGTH} characters"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn username_rules() {
        assert!(normalize_username("ab").is_err());
        assert!(normalize_username("has space").is_err());
        assert!(normalize_username("dash-name").is_err());
        assert_eq!(normalize_username("  speed_runner ").unwrap(), "speed_runner");
    }

    #[test]
    fn email_is_lowercased_and_checked() {
        assert_eq!(
            normalize_email(" Player@Example.COM ").unwrap(),
            "player@example.com"
        );
        assert!(normalize_email("no-at-sign").is_err());
        assert!(normalize_email("two@@example.com").is_err());
        assert!(normalize_email("@example.com").is_err());
    }

    #[test]
    fn password_length_bounds() {
        assert!(validate_password("short").is_err());
        assert!(validate_password("long enough").is_ok());
        assert!(validate_password(&"x".repeat(129)).is_err());
    }

    #[test]
    fn account_serializes_without_password_hash() {
        let user = User {
            user_id: "u1".into(),
            username: "tester".into(),
            email: "t@example.com".into(),
            password_hash: "secret-hash".into(),
            display_name: None,
            bio: None,
            avatar_url: None,
            role: Role::User,
            created_at_ms: 1,
            updated_at_ms: 2,
        };
        let value = serde_json::to_value(UserAccount::from(&user)).unwrap();
        assert_eq!(value["username"], "tester");
        assert_eq!(value["email"], "t@example.com");
        assert!(value.get("password_hash").is_none());
    }
}
