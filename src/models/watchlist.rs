use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A film saved to a user's watchlist, with cached title and poster when known
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct WatchlistEntry {
    pub user_id: i32,
    pub id_imdb: String,
    pub added_at: DateTime<Utc>,
    pub title: Option<String>,
    pub poster: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddToWatchlist {
    pub id_imdb: String,
}
