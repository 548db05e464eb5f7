use sqlx::{postgres::PgPoolOptions, PgPool};

use crate::{
    db::Store,
    error::{AppError, AppResult},
    models::{
        Film, FilmDetails, FilmReview, Insertion, NewUser, PictureUpdate, RatedFilm, RatingInput,
        User, UserCredentials, WatchlistEntry,
    },
};

/// Creates a PostgreSQL connection pool
///
/// Establishes a pool of database connections for efficient reuse.
/// The pool automatically manages connection lifecycle and limits.
pub async fn create_pool(database_url: &str, max_connections: u32) -> anyhow::Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await?;

    Ok(pool)
}

/// Applies the embedded schema migrations
pub async fn run_migrations(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

const USER_COLUMNS: &str = "user_id, username, image_url, profile_bio, created_at";

const WATCHLIST_SELECT: &str = r#"
    SELECT w.user_id, w.id_imdb, w.added_at, f.title, f.poster
    FROM watchlist w
    LEFT JOIN films f ON f.id_imdb = w.id_imdb
"#;

const RATED_SELECT: &str = r#"
    SELECT r.user_id, r.id_imdb, r.rating, r.user_note, r.likes,
           r.created_at, r.updated_at, f.title, f.poster
    FROM rated_films r
    LEFT JOIN films f ON f.id_imdb = r.id_imdb
"#;

/// Maps a unique-constraint violation to `Conflict`, anything else to `Database`
fn conflict_on_unique(err: sqlx::Error, message: &str) -> AppError {
    match &err {
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
            AppError::Conflict(message.to_string())
        }
        _ => AppError::Database(err),
    }
}

/// Postgres-backed store; every method is a single parameterized statement
/// (plus a read-back where the write does not return joined columns)
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn find_watchlist_entry(
        &self,
        user_id: i32,
        id_imdb: &str,
    ) -> AppResult<WatchlistEntry> {
        let query = format!("{WATCHLIST_SELECT} WHERE w.user_id = $1 AND w.id_imdb = $2");
        let entry = sqlx::query_as::<_, WatchlistEntry>(&query)
            .bind(user_id)
            .bind(id_imdb)
            .fetch_one(&self.pool)
            .await?;
        Ok(entry)
    }
}

#[async_trait::async_trait]
impl Store for PgStore {
    async fn create_user(&self, new_user: NewUser) -> AppResult<User> {
        let query = format!(
            "INSERT INTO users (username, hashed_password) VALUES ($1, $2) RETURNING {USER_COLUMNS}"
        );
        sqlx::query_as::<_, User>(&query)
            .bind(&new_user.username)
            .bind(&new_user.hashed_password)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| conflict_on_unique(e, "Username already taken"))
    }

    async fn find_credentials(&self, username: &str) -> AppResult<Option<UserCredentials>> {
        let credentials = sqlx::query_as::<_, UserCredentials>(
            "SELECT user_id, username, hashed_password FROM users WHERE username = $1",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;
        Ok(credentials)
    }

    async fn find_user(&self, user_id: i32) -> AppResult<Option<User>> {
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE user_id = $1");
        let user = sqlx::query_as::<_, User>(&query)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn update_profile_bio(
        &self,
        user_id: i32,
        profile_bio: Option<String>,
    ) -> AppResult<Option<User>> {
        let query = format!(
            "UPDATE users SET profile_bio = $2 WHERE user_id = $1 RETURNING {USER_COLUMNS}"
        );
        let user = sqlx::query_as::<_, User>(&query)
            .bind(user_id)
            .bind(profile_bio)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn update_image_url(
        &self,
        user_id: i32,
        image_url: &str,
    ) -> AppResult<Option<PictureUpdate>> {
        // The row lock makes concurrent uploads see each other's URL as previous
        let update = sqlx::query_as::<_, PictureUpdate>(
            r#"
            UPDATE users u SET image_url = $2
            FROM (SELECT user_id, image_url FROM users WHERE user_id = $1 FOR UPDATE) old
            WHERE u.user_id = old.user_id
            RETURNING u.user_id, u.username, u.image_url, u.profile_bio, u.created_at,
                      old.image_url AS previous_image_url
            "#,
        )
        .bind(user_id)
        .bind(image_url)
        .fetch_optional(&self.pool)
        .await?;
        Ok(update)
    }

    async fn list_watchlist(&self, user_id: i32) -> AppResult<Vec<WatchlistEntry>> {
        let query = format!("{WATCHLIST_SELECT} WHERE w.user_id = $1 ORDER BY w.added_at DESC");
        let entries = sqlx::query_as::<_, WatchlistEntry>(&query)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(entries)
    }

    async fn add_to_watchlist(
        &self,
        user_id: i32,
        id_imdb: &str,
    ) -> AppResult<Insertion<WatchlistEntry>> {
        let result = sqlx::query(
            "INSERT INTO watchlist (user_id, id_imdb) VALUES ($1, $2) ON CONFLICT DO NOTHING",
        )
        .bind(user_id)
        .bind(id_imdb)
        .execute(&self.pool)
        .await?;

        let entry = self.find_watchlist_entry(user_id, id_imdb).await?;
        Ok(if result.rows_affected() > 0 {
            Insertion::Created(entry)
        } else {
            Insertion::Existing(entry)
        })
    }

    async fn remove_from_watchlist(&self, user_id: i32, id_imdb: &str) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM watchlist WHERE user_id = $1 AND id_imdb = $2")
            .bind(user_id)
            .bind(id_imdb)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_ratings(&self, user_id: i32) -> AppResult<Vec<RatedFilm>> {
        let query = format!("{RATED_SELECT} WHERE r.user_id = $1 ORDER BY r.updated_at DESC");
        let ratings = sqlx::query_as::<_, RatedFilm>(&query)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(ratings)
    }

    async fn find_rating(&self, user_id: i32, id_imdb: &str) -> AppResult<Option<RatedFilm>> {
        let query = format!("{RATED_SELECT} WHERE r.user_id = $1 AND r.id_imdb = $2");
        let rating = sqlx::query_as::<_, RatedFilm>(&query)
            .bind(user_id)
            .bind(id_imdb)
            .fetch_optional(&self.pool)
            .await?;
        Ok(rating)
    }

    async fn create_rating(
        &self,
        user_id: i32,
        id_imdb: &str,
        input: &RatingInput,
    ) -> AppResult<RatedFilm> {
        sqlx::query(
            "INSERT INTO rated_films (user_id, id_imdb, rating, user_note) VALUES ($1, $2, $3, $4)",
        )
        .bind(user_id)
        .bind(id_imdb)
        .bind(input.rating)
        .bind(&input.user_note)
        .execute(&self.pool)
        .await
        .map_err(|e| conflict_on_unique(e, "Film already rated"))?;

        self.find_rating(user_id, id_imdb)
            .await?
            .ok_or_else(|| AppError::Internal("Rating vanished after insert".to_string()))
    }

    async fn update_rating(
        &self,
        user_id: i32,
        id_imdb: &str,
        input: &RatingInput,
    ) -> AppResult<Option<RatedFilm>> {
        let result = sqlx::query(
            r#"
            UPDATE rated_films
            SET rating = $3, user_note = $4, updated_at = now()
            WHERE user_id = $1 AND id_imdb = $2
            "#,
        )
        .bind(user_id)
        .bind(id_imdb)
        .bind(input.rating)
        .bind(&input.user_note)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }
        self.find_rating(user_id, id_imdb).await
    }

    async fn delete_rating(&self, user_id: i32, id_imdb: &str) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM rated_films WHERE user_id = $1 AND id_imdb = $2")
            .bind(user_id)
            .bind(id_imdb)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn like_rating(&self, user_id: i32, id_imdb: &str) -> AppResult<Option<i32>> {
        let likes = sqlx::query_scalar::<_, i32>(
            r#"
            UPDATE rated_films
            SET likes = likes + 1
            WHERE user_id = $1 AND id_imdb = $2
            RETURNING likes
            "#,
        )
        .bind(user_id)
        .bind(id_imdb)
        .fetch_optional(&self.pool)
        .await?;
        Ok(likes)
    }

    async fn film_reviews(&self, id_imdb: &str) -> AppResult<Vec<FilmReview>> {
        let reviews = sqlx::query_as::<_, FilmReview>(
            r#"
            SELECT r.user_id, u.username, r.rating, r.user_note, r.likes, r.updated_at
            FROM rated_films r
            JOIN users u ON u.user_id = r.user_id
            WHERE r.id_imdb = $1
            ORDER BY r.likes DESC, r.updated_at DESC
            "#,
        )
        .bind(id_imdb)
        .fetch_all(&self.pool)
        .await?;
        Ok(reviews)
    }

    async fn cache_film(&self, details: FilmDetails) -> AppResult<Insertion<Film>> {
        let inserted = sqlx::query_as::<_, Film>(
            r#"
            INSERT INTO films (id_imdb, title, year, genre, director, plot, poster, trailer)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (id_imdb) DO NOTHING
            RETURNING id_imdb, title, year, genre, director, plot, poster, trailer, cached_at
            "#,
        )
        .bind(&details.id_imdb)
        .bind(&details.title)
        .bind(&details.year)
        .bind(&details.genre)
        .bind(&details.director)
        .bind(&details.plot)
        .bind(&details.poster)
        .bind(&details.trailer)
        .fetch_optional(&self.pool)
        .await?;

        match inserted {
            Some(film) => Ok(Insertion::Created(film)),
            None => self
                .find_film(&details.id_imdb)
                .await?
                .map(Insertion::Existing)
                .ok_or_else(|| AppError::Internal("Cached film vanished".to_string())),
        }
    }

    async fn find_film(&self, id_imdb: &str) -> AppResult<Option<Film>> {
        let film = sqlx::query_as::<_, Film>(
            r#"
            SELECT id_imdb, title, year, genre, director, plot, poster, trailer, cached_at
            FROM films
            WHERE id_imdb = $1
            "#,
        )
        .bind(id_imdb)
        .fetch_optional(&self.pool)
        .await?;
        Ok(film)
    }
}
