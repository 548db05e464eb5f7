use axum::{
    extract::{Multipart, State},
    Extension, Json,
};

use crate::{
    error::{AppError, AppResult},
    middleware::AuthUser,
    models::{ProfileBio, ProfilePicture, User},
    services::ImageKind,
    state::AppState,
};

/// Multipart field carrying the picture
const IMAGE_FIELD: &str = "image";

fn user_not_found(caller: &AuthUser) -> AppError {
    AppError::NotFound(format!("User {}", caller.user_id))
}

async fn current_user(state: &AppState, caller: &AuthUser) -> AppResult<User> {
    state
        .store
        .find_user(caller.user_id)
        .await?
        .ok_or_else(|| user_not_found(caller))
}

/// Handler returning the caller's bio
pub async fn get_bio(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthUser>,
) -> AppResult<Json<ProfileBio>> {
    let user = current_user(&state, &caller).await?;
    Ok(Json(ProfileBio {
        profile_bio: user.profile_bio,
    }))
}

/// Handler replacing the caller's bio; a blank bio clears it
pub async fn set_bio(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthUser>,
    Json(request): Json<ProfileBio>,
) -> AppResult<Json<ProfileBio>> {
    let profile_bio = request.normalized()?;

    let user = state
        .store
        .update_profile_bio(caller.user_id, profile_bio)
        .await?
        .ok_or_else(|| user_not_found(&caller))?;

    tracing::info!(user_id = caller.user_id, "Profile bio updated");

    Ok(Json(ProfileBio {
        profile_bio: user.profile_bio,
    }))
}

/// Handler storing a new profile picture from the `image` multipart field
pub async fn update_picture(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthUser>,
    mut multipart: Multipart,
) -> AppResult<Json<ProfilePicture>> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(IMAGE_FIELD) {
            continue;
        }

        let kind = field
            .content_type()
            .and_then(ImageKind::from_content_type)
            .ok_or_else(|| {
                AppError::InvalidInput(
                    "Profile picture must be a PNG, JPEG, GIF or WebP image".to_string(),
                )
            })?;

        let bytes = field.bytes().await?;
        if bytes.is_empty() {
            return Err(AppError::InvalidInput("Profile picture is empty".to_string()));
        }

        let image_url = state.images.save(caller.user_id, kind, &bytes).await?;

        let update = match state
            .store
            .update_image_url(caller.user_id, &image_url)
            .await
            .and_then(|update| update.ok_or_else(|| user_not_found(&caller)))
        {
            Ok(update) => update,
            Err(e) => {
                // Nothing points at the new file
                state.images.remove(&image_url).await;
                return Err(e);
            }
        };

        if let Some(previous) = update.previous_image_url {
            state.images.remove(&previous).await;
        }

        return Ok(Json(ProfilePicture {
            image_url: update.user.image_url.unwrap_or(image_url),
        }));
    }

    Err(AppError::InvalidInput(format!(
        "Missing '{}' field",
        IMAGE_FIELD
    )))
}
