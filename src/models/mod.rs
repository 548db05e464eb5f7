pub mod film;
pub mod rated_film;
pub mod user;
pub mod watchlist;

pub use film::{Film, FilmDetails};
pub use rated_film::{FilmReview, LikeCount, NewRating, RatedFilm, RatingInput};
pub use user::{
    AuthPayload, Credentials, NewUser, PictureUpdate, ProfileBio, ProfilePicture, User,
    UserCredentials,
};
pub use watchlist::{AddToWatchlist, WatchlistEntry};

use crate::error::{AppError, AppResult};

/// Outcome of an insert guarded by an existence check
#[derive(Debug, Clone, PartialEq)]
pub enum Insertion<T> {
    /// A new row was written
    Created(T),
    /// The row was already present and left untouched
    Existing(T),
}

impl<T> Insertion<T> {
    pub fn is_created(&self) -> bool {
        matches!(self, Insertion::Created(_))
    }

    pub fn into_inner(self) -> T {
        match self {
            Insertion::Created(value) | Insertion::Existing(value) => value,
        }
    }
}

/// Checks that an id looks like an IMDb title id (e.g. "tt1375666")
pub fn validate_id_imdb(id_imdb: &str) -> AppResult<()> {
    let valid = id_imdb
        .strip_prefix("tt")
        .is_some_and(|digits| !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()));

    if valid {
        Ok(())
    } else {
        Err(AppError::InvalidInput(format!(
            "'{}' is not a valid IMDb id",
            id_imdb
        )))
    }
}

/// Rejects text longer than `max` characters
pub(crate) fn validate_length(field: &str, value: &str, max: usize) -> AppResult<()> {
    if value.chars().count() > max {
        return Err(AppError::InvalidInput(format!(
            "{} must be at most {} characters",
            field, max
        )));
    }
    Ok(())
}
