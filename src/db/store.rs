use crate::{
    error::AppResult,
    models::{
        Film, FilmDetails, FilmReview, Insertion, NewUser, PictureUpdate, RatedFilm, RatingInput,
        User, UserCredentials, WatchlistEntry,
    },
};

/// Persistence operations backing the REST routes
///
/// Every method maps to one request handler's data access. Implementations
/// must scope per-user data strictly by the `user_id` they are given.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait Store: Send + Sync {
    // Users

    /// Inserts a new user; fails with `Conflict` when the username is taken
    async fn create_user(&self, new_user: NewUser) -> AppResult<User>;

    async fn find_credentials(&self, username: &str) -> AppResult<Option<UserCredentials>>;

    async fn find_user(&self, user_id: i32) -> AppResult<Option<User>>;

    async fn update_profile_bio(
        &self,
        user_id: i32,
        profile_bio: Option<String>,
    ) -> AppResult<Option<User>>;

    /// Swaps in a new picture URL, returning the one it replaced
    async fn update_image_url(
        &self,
        user_id: i32,
        image_url: &str,
    ) -> AppResult<Option<PictureUpdate>>;

    // Watchlist

    /// Lists a user's watchlist, newest first
    async fn list_watchlist(&self, user_id: i32) -> AppResult<Vec<WatchlistEntry>>;

    async fn add_to_watchlist(
        &self,
        user_id: i32,
        id_imdb: &str,
    ) -> AppResult<Insertion<WatchlistEntry>>;

    /// Returns whether an entry was removed
    async fn remove_from_watchlist(&self, user_id: i32, id_imdb: &str) -> AppResult<bool>;

    // Rated films

    /// Lists a user's ratings, most recently updated first
    async fn list_ratings(&self, user_id: i32) -> AppResult<Vec<RatedFilm>>;

    async fn find_rating(&self, user_id: i32, id_imdb: &str) -> AppResult<Option<RatedFilm>>;

    /// Inserts a rating; fails with `Conflict` when the user already rated the film
    async fn create_rating(
        &self,
        user_id: i32,
        id_imdb: &str,
        input: &RatingInput,
    ) -> AppResult<RatedFilm>;

    async fn update_rating(
        &self,
        user_id: i32,
        id_imdb: &str,
        input: &RatingInput,
    ) -> AppResult<Option<RatedFilm>>;

    /// Returns whether a rating was removed
    async fn delete_rating(&self, user_id: i32, id_imdb: &str) -> AppResult<bool>;

    /// Increments the like counter and returns its new value
    async fn like_rating(&self, user_id: i32, id_imdb: &str) -> AppResult<Option<i32>>;

    /// Lists every user's rating of a film, most liked first
    async fn film_reviews(&self, id_imdb: &str) -> AppResult<Vec<FilmReview>>;

    // Films

    /// Caches film metadata unless the film is already cached
    async fn cache_film(&self, details: FilmDetails) -> AppResult<Insertion<Film>>;

    async fn find_film(&self, id_imdb: &str) -> AppResult<Option<Film>>;
}
