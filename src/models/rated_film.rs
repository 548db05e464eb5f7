use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};

use super::{validate_id_imdb, validate_length};

pub const MIN_RATING: i32 = 1;
pub const MAX_RATING: i32 = 10;
pub const USER_NOTE_MAX_LEN: usize = 2000;

/// A user's rating of a film, with cached title and poster when known
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct RatedFilm {
    pub user_id: i32,
    pub id_imdb: String,
    pub rating: i32,
    pub user_note: Option<String>,
    pub likes: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub title: Option<String>,
    pub poster: Option<String>,
}

/// Editable part of a rating (PUT body)
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RatingInput {
    pub rating: i32,
    #[serde(default)]
    pub user_note: Option<String>,
}

impl RatingInput {
    pub fn validate(&self) -> AppResult<()> {
        if !(MIN_RATING..=MAX_RATING).contains(&self.rating) {
            return Err(AppError::InvalidInput(format!(
                "Rating must be between {} and {}",
                MIN_RATING, MAX_RATING
            )));
        }
        if let Some(note) = &self.user_note {
            validate_length("userNote", note, USER_NOTE_MAX_LEN)?;
        }
        Ok(())
    }
}

/// New rating submission (POST body)
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewRating {
    pub id_imdb: String,
    pub rating: i32,
    #[serde(default)]
    pub user_note: Option<String>,
}

impl NewRating {
    /// Validates and splits the submission into the film id and the rating
    pub fn into_parts(self) -> AppResult<(String, RatingInput)> {
        validate_id_imdb(&self.id_imdb)?;
        let input = RatingInput {
            rating: self.rating,
            user_note: self.user_note,
        };
        input.validate()?;
        Ok((self.id_imdb, input))
    }
}

/// One user's review of a film, as shown on the film's page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct FilmReview {
    pub user_id: i32,
    pub username: String,
    pub rating: i32,
    pub user_note: Option<String>,
    pub likes: i32,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LikeCount {
    pub likes: i32,
}
