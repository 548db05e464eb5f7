use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};

use super::validate_length;

pub const USERNAME_MIN_LEN: usize = 3;
pub const USERNAME_MAX_LEN: usize = 32;
pub const PASSWORD_MIN_LEN: usize = 8;
/// bcrypt only reads this many bytes of a password
pub const PASSWORD_MAX_BYTES: usize = 72;
pub const PROFILE_BIO_MAX_LEN: usize = 1000;

/// Public view of a user account
///
/// Never carries the password hash, so it is safe to return from any route.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub user_id: i32,
    pub username: String,
    pub image_url: Option<String>,
    pub profile_bio: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Row used only for password verification at sign-in
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct UserCredentials {
    pub user_id: i32,
    pub username: String,
    pub hashed_password: String,
}

/// A user about to be inserted, password already hashed
#[derive(Debug, Clone, PartialEq)]
pub struct NewUser {
    pub username: String,
    pub hashed_password: String,
}

/// Sign-up and sign-in request body
#[derive(Debug, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    /// Validates a new account's username and password
    pub fn validate_new(&self) -> AppResult<()> {
        let username_len = self.username.chars().count();
        if !(USERNAME_MIN_LEN..=USERNAME_MAX_LEN).contains(&username_len) {
            return Err(AppError::InvalidInput(format!(
                "Username must be between {} and {} characters",
                USERNAME_MIN_LEN, USERNAME_MAX_LEN
            )));
        }

        if !self
            .username
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
        {
            return Err(AppError::InvalidInput(
                "Username may only contain letters, digits, '_', '.' and '-'".to_string(),
            ));
        }

        if self.password.chars().count() < PASSWORD_MIN_LEN
            || self.password.len() > PASSWORD_MAX_BYTES
        {
            return Err(AppError::InvalidInput(format!(
                "Password must be at least {} characters and at most {} bytes",
                PASSWORD_MIN_LEN, PASSWORD_MAX_BYTES
            )));
        }

        Ok(())
    }
}

/// Sign-in response: the bearer token and the user it was issued for
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthPayload {
    pub token: String,
    pub token_type: String,
    /// Seconds until the token expires
    pub expires_in: u64,
    pub user: User,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileBio {
    pub profile_bio: Option<String>,
}

impl ProfileBio {
    /// Validates the bio and normalizes blank text to `None`
    pub fn normalized(self) -> AppResult<Option<String>> {
        match self.profile_bio {
            Some(bio) if !bio.trim().is_empty() => {
                validate_length("profileBio", &bio, PROFILE_BIO_MAX_LEN)?;
                Ok(Some(bio))
            }
            _ => Ok(None),
        }
    }
}

/// A user whose picture was just replaced, with the URL it replaced
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct PictureUpdate {
    #[sqlx(flatten)]
    pub user: User,
    pub previous_image_url: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfilePicture {
    pub image_url: String,
}
