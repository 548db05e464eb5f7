use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};

use crate::{
    error::AppResult,
    middleware::AuthUser,
    models::{validate_id_imdb, AddToWatchlist, WatchlistEntry},
    state::AppState,
};

use super::insertion_response;

/// Handler listing the caller's watchlist
pub async fn list(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthUser>,
) -> AppResult<Json<Vec<WatchlistEntry>>> {
    let entries = state.store.list_watchlist(caller.user_id).await?;
    Ok(Json(entries))
}

/// Handler saving a film to the caller's watchlist
pub async fn add(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthUser>,
    Json(request): Json<AddToWatchlist>,
) -> AppResult<(StatusCode, Json<WatchlistEntry>)> {
    validate_id_imdb(&request.id_imdb)?;

    let insertion = state
        .store
        .add_to_watchlist(caller.user_id, &request.id_imdb)
        .await?;

    tracing::info!(
        user_id = caller.user_id,
        id_imdb = %request.id_imdb,
        created = insertion.is_created(),
        "Watchlist add"
    );

    Ok(insertion_response(insertion))
}

/// Handler removing a film from the caller's watchlist
///
/// Always 204, whether or not the film was on the list.
pub async fn remove(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthUser>,
    Path(id_imdb): Path<String>,
) -> AppResult<StatusCode> {
    validate_id_imdb(&id_imdb)?;

    let removed = state
        .store
        .remove_from_watchlist(caller.user_id, &id_imdb)
        .await?;

    tracing::debug!(user_id = caller.user_id, id_imdb = %id_imdb, removed, "Watchlist remove");

    Ok(StatusCode::NO_CONTENT)
}
