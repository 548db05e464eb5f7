use axum::{extract::State, http::StatusCode, Extension, Json};

use crate::{
    error::{AppError, AppResult},
    middleware::AuthUser,
    models::{AuthPayload, Credentials, NewUser, User},
    state::AppState,
};

fn invalid_credentials() -> AppError {
    AppError::Unauthorized("Invalid username or password".to_string())
}

/// Handler for account creation
pub async fn sign_up(
    State(state): State<AppState>,
    Json(credentials): Json<Credentials>,
) -> AppResult<(StatusCode, Json<User>)> {
    credentials.validate_new()?;

    if state
        .store
        .find_credentials(&credentials.username)
        .await?
        .is_some()
    {
        return Err(AppError::Conflict("Username already taken".to_string()));
    }

    let hashed_password = state.auth.hash_password(&credentials.password).await?;
    let user = state
        .store
        .create_user(NewUser {
            username: credentials.username,
            hashed_password,
        })
        .await?;

    tracing::info!(user_id = user.user_id, username = %user.username, "User signed up");

    Ok((StatusCode::CREATED, Json(user)))
}

/// Handler for sign-in; returns a bearer token and the user's profile
pub async fn sign_in(
    State(state): State<AppState>,
    Json(credentials): Json<Credentials>,
) -> AppResult<Json<AuthPayload>> {
    let stored = state
        .store
        .find_credentials(&credentials.username)
        .await?
        .ok_or_else(invalid_credentials)?;

    if !state
        .auth
        .verify_password(&credentials.password, &stored.hashed_password)
        .await?
    {
        tracing::warn!(username = %stored.username, "Sign-in with wrong password");
        return Err(invalid_credentials());
    }

    let user = state
        .store
        .find_user(stored.user_id)
        .await?
        .ok_or_else(invalid_credentials)?;
    let issued = state.auth.issue_token(&user)?;

    tracing::info!(user_id = user.user_id, "User signed in");

    Ok(Json(AuthPayload {
        token: issued.token,
        token_type: "Bearer".to_string(),
        expires_in: issued.expires_in,
        user,
    }))
}

/// Handler returning the authenticated user's profile
pub async fn me(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthUser>,
) -> AppResult<Json<User>> {
    let user = state
        .store
        .find_user(caller.user_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User {}", caller.user_id)))?;
    Ok(Json(user))
}
