use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};

use super::validate_id_imdb;

/// Cached film metadata, keyed by IMDb id
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Film {
    pub id_imdb: String,
    pub title: String,
    pub year: Option<String>,
    pub genre: Option<String>,
    pub director: Option<String>,
    pub plot: Option<String>,
    pub poster: Option<String>,
    pub trailer: Option<String>,
    pub cached_at: DateTime<Utc>,
}

/// Film details as posted by the client
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilmDetails {
    pub id_imdb: String,
    pub title: String,
    #[serde(default)]
    pub year: Option<String>,
    #[serde(default)]
    pub genre: Option<String>,
    #[serde(default)]
    pub director: Option<String>,
    #[serde(default)]
    pub plot: Option<String>,
    #[serde(default)]
    pub poster: Option<String>,
    #[serde(default)]
    pub trailer: Option<String>,
}

impl FilmDetails {
    pub fn validate(&self) -> AppResult<()> {
        validate_id_imdb(&self.id_imdb)?;
        if self.title.trim().is_empty() {
            return Err(AppError::InvalidInput("Film title is required".to_string()));
        }
        Ok(())
    }

    /// Builds the cached row stamped with `cached_at`
    pub fn into_film(self, cached_at: DateTime<Utc>) -> Film {
        Film {
            id_imdb: self.id_imdb,
            title: self.title,
            year: self.year,
            genre: self.genre,
            director: self.director,
            plot: self.plot,
            poster: self.poster,
            trailer: self.trailer,
            cached_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_details_with_only_required_fields() {
        let details: FilmDetails =
            serde_json::from_str(r#"{"idImdb":"tt0110912","title":"Pulp Fiction"}"#).unwrap();

        assert!(details.validate().is_ok());
        assert_eq!(details.poster, None);
    }

    #[test]
    fn test_details_require_title_and_id() {
        let details: FilmDetails =
            serde_json::from_str(r#"{"idImdb":"tt0110912","title":"  "}"#).unwrap();
        assert!(details.validate().is_err());

        let details: FilmDetails =
            serde_json::from_str(r#"{"idImdb":"0110912","title":"Pulp Fiction"}"#).unwrap();
        assert!(details.validate().is_err());
    }
}
