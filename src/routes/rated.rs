use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};

use crate::{
    error::{AppError, AppResult},
    middleware::AuthUser,
    models::{validate_id_imdb, FilmReview, LikeCount, NewRating, RatedFilm, RatingInput},
    state::AppState,
};

fn rating_not_found(id_imdb: &str) -> AppError {
    AppError::NotFound(format!("No rating for {}", id_imdb))
}

/// Handler listing the caller's rated films
pub async fn list(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthUser>,
) -> AppResult<Json<Vec<RatedFilm>>> {
    let ratings = state.store.list_ratings(caller.user_id).await?;
    Ok(Json(ratings))
}

/// Handler for a single rated film of the caller
pub async fn get(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthUser>,
    Path(id_imdb): Path<String>,
) -> AppResult<Json<RatedFilm>> {
    validate_id_imdb(&id_imdb)?;

    let rating = state
        .store
        .find_rating(caller.user_id, &id_imdb)
        .await?
        .ok_or_else(|| rating_not_found(&id_imdb))?;
    Ok(Json(rating))
}

/// Handler for submitting a new rating
pub async fn create(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthUser>,
    Json(request): Json<NewRating>,
) -> AppResult<(StatusCode, Json<RatedFilm>)> {
    let (id_imdb, input) = request.into_parts()?;

    let rating = state
        .store
        .create_rating(caller.user_id, &id_imdb, &input)
        .await?;

    tracing::info!(
        user_id = caller.user_id,
        id_imdb = %id_imdb,
        rating = rating.rating,
        "Film rated"
    );

    Ok((StatusCode::CREATED, Json(rating)))
}

/// Handler for editing an existing rating
pub async fn edit(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthUser>,
    Path(id_imdb): Path<String>,
    Json(input): Json<RatingInput>,
) -> AppResult<Json<RatedFilm>> {
    validate_id_imdb(&id_imdb)?;
    input.validate()?;

    let rating = state
        .store
        .update_rating(caller.user_id, &id_imdb, &input)
        .await?
        .ok_or_else(|| rating_not_found(&id_imdb))?;
    Ok(Json(rating))
}

/// Handler deleting one of the caller's ratings; 204 whether or not it existed
pub async fn delete(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthUser>,
    Path(id_imdb): Path<String>,
) -> AppResult<StatusCode> {
    validate_id_imdb(&id_imdb)?;

    let removed = state.store.delete_rating(caller.user_id, &id_imdb).await?;
    tracing::debug!(user_id = caller.user_id, id_imdb = %id_imdb, removed, "Rating delete");

    Ok(StatusCode::NO_CONTENT)
}

/// Handler liking another user's rating
pub async fn like(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthUser>,
    Path((user_id, id_imdb)): Path<(i32, String)>,
) -> AppResult<Json<LikeCount>> {
    validate_id_imdb(&id_imdb)?;

    let likes = state
        .store
        .like_rating(user_id, &id_imdb)
        .await?
        .ok_or_else(|| rating_not_found(&id_imdb))?;

    tracing::debug!(
        liked_by = caller.user_id,
        user_id,
        id_imdb = %id_imdb,
        likes,
        "Rating liked"
    );

    Ok(Json(LikeCount { likes }))
}

/// Handler listing every user's review of a film
pub async fn film_reviews(
    State(state): State<AppState>,
    Path(id_imdb): Path<String>,
) -> AppResult<Json<Vec<FilmReview>>> {
    validate_id_imdb(&id_imdb)?;

    let reviews = state.store.film_reviews(&id_imdb).await?;
    Ok(Json(reviews))
}
