use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::{
    db::Store,
    error::{AppError, AppResult},
    models::{
        Film, FilmDetails, FilmReview, Insertion, NewUser, PictureUpdate, RatedFilm, RatingInput,
        User, UserCredentials, WatchlistEntry,
    },
};

type EntryKey = (i32, String);

/// In-memory store used by tests and `STORE=memory` local runs
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<RwLock<MemoryStoreInner>>,
}

#[derive(Default)]
struct MemoryStoreInner {
    last_user_id: i32,
    /// Monotonic counter ordering rows that share a timestamp
    clock: u64,
    users: HashMap<i32, StoredUser>,
    films: HashMap<String, Film>,
    watchlist: HashMap<EntryKey, StoredEntry>,
    ratings: HashMap<EntryKey, StoredRating>,
}

struct StoredUser {
    user: User,
    hashed_password: String,
}

struct StoredEntry {
    added_at: DateTime<Utc>,
    seq: u64,
}

struct StoredRating {
    rating: i32,
    user_note: Option<String>,
    likes: i32,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    seq: u64,
}

impl MemoryStoreInner {
    fn tick(&mut self) -> u64 {
        self.clock += 1;
        self.clock
    }

    fn film_summary(&self, id_imdb: &str) -> (Option<String>, Option<String>) {
        self.films
            .get(id_imdb)
            .map(|film| (Some(film.title.clone()), film.poster.clone()))
            .unwrap_or((None, None))
    }

    fn watchlist_entry(&self, key: &EntryKey, stored: &StoredEntry) -> WatchlistEntry {
        let (title, poster) = self.film_summary(&key.1);
        WatchlistEntry {
            user_id: key.0,
            id_imdb: key.1.clone(),
            added_at: stored.added_at,
            title,
            poster,
        }
    }

    fn rated_film(&self, key: &EntryKey, stored: &StoredRating) -> RatedFilm {
        let (title, poster) = self.film_summary(&key.1);
        RatedFilm {
            user_id: key.0,
            id_imdb: key.1.clone(),
            rating: stored.rating,
            user_note: stored.user_note.clone(),
            likes: stored.likes,
            created_at: stored.created_at,
            updated_at: stored.updated_at,
            title,
            poster,
        }
    }

    fn update_user<F>(&mut self, user_id: i32, update: F) -> Option<User>
    where
        F: FnOnce(&mut User),
    {
        self.users.get_mut(&user_id).map(|stored| {
            update(&mut stored.user);
            stored.user.clone()
        })
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn key(user_id: i32, id_imdb: &str) -> EntryKey {
    (user_id, id_imdb.to_string())
}

#[async_trait::async_trait]
impl Store for MemoryStore {
    async fn create_user(&self, new_user: NewUser) -> AppResult<User> {
        let mut inner = self.inner.write().await;

        if inner
            .users
            .values()
            .any(|stored| stored.user.username == new_user.username)
        {
            return Err(AppError::Conflict("Username already taken".to_string()));
        }

        inner.last_user_id += 1;
        let user = User {
            user_id: inner.last_user_id,
            username: new_user.username,
            image_url: None,
            profile_bio: None,
            created_at: Utc::now(),
        };
        inner.users.insert(
            user.user_id,
            StoredUser {
                user: user.clone(),
                hashed_password: new_user.hashed_password,
            },
        );
        Ok(user)
    }

    async fn find_credentials(&self, username: &str) -> AppResult<Option<UserCredentials>> {
        let inner = self.inner.read().await;
        Ok(inner
            .users
            .values()
            .find(|stored| stored.user.username == username)
            .map(|stored| UserCredentials {
                user_id: stored.user.user_id,
                username: stored.user.username.clone(),
                hashed_password: stored.hashed_password.clone(),
            }))
    }

    async fn find_user(&self, user_id: i32) -> AppResult<Option<User>> {
        let inner = self.inner.read().await;
        Ok(inner.users.get(&user_id).map(|stored| stored.user.clone()))
    }

    async fn update_profile_bio(
        &self,
        user_id: i32,
        profile_bio: Option<String>,
    ) -> AppResult<Option<User>> {
        let mut inner = self.inner.write().await;
        Ok(inner.update_user(user_id, |user| user.profile_bio = profile_bio))
    }

    async fn update_image_url(
        &self,
        user_id: i32,
        image_url: &str,
    ) -> AppResult<Option<PictureUpdate>> {
        let mut inner = self.inner.write().await;
        Ok(inner.users.get_mut(&user_id).map(|stored| {
            let previous_image_url = stored.user.image_url.replace(image_url.to_string());
            PictureUpdate {
                user: stored.user.clone(),
                previous_image_url,
            }
        }))
    }

    async fn list_watchlist(&self, user_id: i32) -> AppResult<Vec<WatchlistEntry>> {
        let inner = self.inner.read().await;

        let mut rows: Vec<_> = inner
            .watchlist
            .iter()
            .filter(|(key, _)| key.0 == user_id)
            .collect();
        rows.sort_by(|a, b| b.1.seq.cmp(&a.1.seq));

        Ok(rows
            .into_iter()
            .map(|(key, stored)| inner.watchlist_entry(key, stored))
            .collect())
    }

    async fn add_to_watchlist(
        &self,
        user_id: i32,
        id_imdb: &str,
    ) -> AppResult<Insertion<WatchlistEntry>> {
        let mut inner = self.inner.write().await;
        let key = key(user_id, id_imdb);

        if let Some(stored) = inner.watchlist.get(&key) {
            return Ok(Insertion::Existing(inner.watchlist_entry(&key, stored)));
        }

        let stored = StoredEntry {
            added_at: Utc::now(),
            seq: inner.tick(),
        };
        let entry = inner.watchlist_entry(&key, &stored);
        inner.watchlist.insert(key, stored);
        Ok(Insertion::Created(entry))
    }

    async fn remove_from_watchlist(&self, user_id: i32, id_imdb: &str) -> AppResult<bool> {
        let mut inner = self.inner.write().await;
        Ok(inner.watchlist.remove(&key(user_id, id_imdb)).is_some())
    }

    async fn list_ratings(&self, user_id: i32) -> AppResult<Vec<RatedFilm>> {
        let inner = self.inner.read().await;

        let mut rows: Vec<_> = inner
            .ratings
            .iter()
            .filter(|(key, _)| key.0 == user_id)
            .collect();
        rows.sort_by(|a, b| b.1.seq.cmp(&a.1.seq));

        Ok(rows
            .into_iter()
            .map(|(key, stored)| inner.rated_film(key, stored))
            .collect())
    }

    async fn find_rating(&self, user_id: i32, id_imdb: &str) -> AppResult<Option<RatedFilm>> {
        let inner = self.inner.read().await;
        let key = key(user_id, id_imdb);
        Ok(inner
            .ratings
            .get(&key)
            .map(|stored| inner.rated_film(&key, stored)))
    }

    async fn create_rating(
        &self,
        user_id: i32,
        id_imdb: &str,
        input: &RatingInput,
    ) -> AppResult<RatedFilm> {
        let mut inner = self.inner.write().await;
        let key = key(user_id, id_imdb);

        if inner.ratings.contains_key(&key) {
            return Err(AppError::Conflict("Film already rated".to_string()));
        }

        let now = Utc::now();
        let stored = StoredRating {
            rating: input.rating,
            user_note: input.user_note.clone(),
            likes: 0,
            created_at: now,
            updated_at: now,
            seq: inner.tick(),
        };
        let rated = inner.rated_film(&key, &stored);
        inner.ratings.insert(key, stored);
        Ok(rated)
    }

    async fn update_rating(
        &self,
        user_id: i32,
        id_imdb: &str,
        input: &RatingInput,
    ) -> AppResult<Option<RatedFilm>> {
        let mut inner = self.inner.write().await;
        let key = key(user_id, id_imdb);
        let seq = inner.tick();

        let Some(stored) = inner.ratings.get_mut(&key) else {
            return Ok(None);
        };
        stored.rating = input.rating;
        stored.user_note = input.user_note.clone();
        stored.updated_at = Utc::now();
        stored.seq = seq;

        let inner = &*inner;
        Ok(inner
            .ratings
            .get(&key)
            .map(|stored| inner.rated_film(&key, stored)))
    }

    async fn delete_rating(&self, user_id: i32, id_imdb: &str) -> AppResult<bool> {
        let mut inner = self.inner.write().await;
        Ok(inner.ratings.remove(&key(user_id, id_imdb)).is_some())
    }

    async fn like_rating(&self, user_id: i32, id_imdb: &str) -> AppResult<Option<i32>> {
        let mut inner = self.inner.write().await;
        let Some(stored) = inner.ratings.get_mut(&key(user_id, id_imdb)) else {
            return Ok(None);
        };

        stored.likes = stored
            .likes
            .checked_add(1)
            .ok_or_else(|| AppError::Internal("Like count overflow".to_string()))?;
        Ok(Some(stored.likes))
    }

    async fn film_reviews(&self, id_imdb: &str) -> AppResult<Vec<FilmReview>> {
        let inner = self.inner.read().await;

        let mut reviews: Vec<(u64, FilmReview)> = inner
            .ratings
            .iter()
            .filter(|(key, _)| key.1 == id_imdb)
            .filter_map(|(key, stored)| {
                let user = &inner.users.get(&key.0)?.user;
                Some((
                    stored.seq,
                    FilmReview {
                        user_id: user.user_id,
                        username: user.username.clone(),
                        rating: stored.rating,
                        user_note: stored.user_note.clone(),
                        likes: stored.likes,
                        updated_at: stored.updated_at,
                    },
                ))
            })
            .collect();
        reviews.sort_by(|a, b| b.1.likes.cmp(&a.1.likes).then(b.0.cmp(&a.0)));

        Ok(reviews.into_iter().map(|(_, review)| review).collect())
    }

    async fn cache_film(&self, details: FilmDetails) -> AppResult<Insertion<Film>> {
        let mut inner = self.inner.write().await;

        if let Some(film) = inner.films.get(&details.id_imdb) {
            return Ok(Insertion::Existing(film.clone()));
        }

        let film = details.into_film(Utc::now());
        inner.films.insert(film.id_imdb.clone(), film.clone());
        Ok(Insertion::Created(film))
    }

    async fn find_film(&self, id_imdb: &str) -> AppResult<Option<Film>> {
        let inner = self.inner.read().await;
        Ok(inner.films.get(id_imdb).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn store_with_user(username: &str) -> (MemoryStore, User) {
        let store = MemoryStore::new();
        let user = store
            .create_user(NewUser {
                username: username.to_string(),
                hashed_password: "hash".to_string(),
            })
            .await
            .unwrap();
        (store, user)
    }

    fn input(rating: i32) -> RatingInput {
        RatingInput {
            rating,
            user_note: None,
        }
    }

    #[tokio::test]
    async fn test_duplicate_username_conflicts() {
        let (store, _) = store_with_user("alice").await;

        let result = store
            .create_user(NewUser {
                username: "alice".to_string(),
                hashed_password: "other".to_string(),
            })
            .await;

        assert!(matches!(result, Err(AppError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_user_ids_are_sequential() {
        let (store, alice) = store_with_user("alice").await;
        let bob = store
            .create_user(NewUser {
                username: "bob".to_string(),
                hashed_password: "hash".to_string(),
            })
            .await
            .unwrap();

        assert_eq!(alice.user_id, 1);
        assert_eq!(bob.user_id, 2);
    }

    #[tokio::test]
    async fn test_picture_update_returns_replaced_url() {
        let (store, user) = store_with_user("alice").await;

        let first = store
            .update_image_url(user.user_id, "/images/1-a.png")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(first.previous_image_url, None);

        let second = store
            .update_image_url(user.user_id, "/images/1-b.png")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(second.previous_image_url.as_deref(), Some("/images/1-a.png"));
        assert_eq!(second.user.image_url.as_deref(), Some("/images/1-b.png"));

        assert!(store.update_image_url(99, "/images/x.png").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_watchlist_is_newest_first_with_film_metadata() {
        let (store, user) = store_with_user("alice").await;
        store
            .cache_film(FilmDetails {
                id_imdb: "tt0110912".to_string(),
                title: "Pulp Fiction".to_string(),
                year: None,
                genre: None,
                director: None,
                plot: None,
                poster: Some("https://img/pf.jpg".to_string()),
                trailer: None,
            })
            .await
            .unwrap();

        store.add_to_watchlist(user.user_id, "tt0110912").await.unwrap();
        store.add_to_watchlist(user.user_id, "tt0068646").await.unwrap();

        let entries = store.list_watchlist(user.user_id).await.unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].id_imdb, "tt0068646");
        assert_eq!(entries[0].title, None);
        assert_eq!(entries[1].title.as_deref(), Some("Pulp Fiction"));
        assert_eq!(entries[1].poster.as_deref(), Some("https://img/pf.jpg"));
    }

    #[tokio::test]
    async fn test_update_moves_rating_to_front() {
        let (store, user) = store_with_user("alice").await;
        store
            .create_rating(user.user_id, "tt0000001", &input(5))
            .await
            .unwrap();
        store
            .create_rating(user.user_id, "tt0000002", &input(6))
            .await
            .unwrap();

        let updated = store
            .update_rating(user.user_id, "tt0000001", &input(9))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.rating, 9);

        let ratings = store.list_ratings(user.user_id).await.unwrap();
        assert_eq!(ratings[0].id_imdb, "tt0000001");
    }

    #[tokio::test]
    async fn test_update_missing_rating_is_none() {
        let (store, user) = store_with_user("alice").await;
        let updated = store
            .update_rating(user.user_id, "tt0000001", &input(9))
            .await
            .unwrap();
        assert!(updated.is_none());
    }

    #[tokio::test]
    async fn test_concurrent_likes_are_not_lost() {
        let (store, user) = store_with_user("alice").await;
        store
            .create_rating(user.user_id, "tt0000001", &input(8))
            .await
            .unwrap();

        let user_id = user.user_id;
        let mut tasks = Vec::new();
        for _ in 0..20 {
            let store = store.clone();
            tasks.push(tokio::spawn(async move {
                store.like_rating(user_id, "tt0000001").await.unwrap()
            }));
        }
        for task in tasks {
            task.await.unwrap();
        }

        let rating = store
            .find_rating(user.user_id, "tt0000001")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(rating.likes, 20);
    }

    #[tokio::test]
    async fn test_like_overflow_is_an_error() {
        let (store, user) = store_with_user("alice").await;
        store
            .create_rating(user.user_id, "tt0000001", &input(8))
            .await
            .unwrap();
        {
            let mut inner = store.inner.write().await;
            let key = key(user.user_id, "tt0000001");
            inner.ratings.get_mut(&key).unwrap().likes = i32::MAX;
        }

        let result = store.like_rating(user.user_id, "tt0000001").await;
        assert!(matches!(result, Err(AppError::Internal(_))));

        let rating = store
            .find_rating(user.user_id, "tt0000001")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(rating.likes, i32::MAX);
    }

    #[tokio::test]
    async fn test_film_reviews_join_usernames() {
        let (store, alice) = store_with_user("alice").await;
        let bob = store
            .create_user(NewUser {
                username: "bob".to_string(),
                hashed_password: "hash".to_string(),
            })
            .await
            .unwrap();

        store
            .create_rating(alice.user_id, "tt0000001", &input(4))
            .await
            .unwrap();
        store
            .create_rating(bob.user_id, "tt0000001", &input(10))
            .await
            .unwrap();
        store.like_rating(alice.user_id, "tt0000001").await.unwrap();

        let reviews = store.film_reviews("tt0000001").await.unwrap();
        assert_eq!(reviews.len(), 2);
        assert_eq!(reviews[0].username, "alice");
        assert_eq!(reviews[0].likes, 1);
        assert_eq!(reviews[1].username, "bob");
    }
}
