use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderValue, Method, StatusCode},
    middleware,
    routing::{delete, get, post},
    Json, Router,
};
use serde::Serialize;
use serde_json::{json, Value};
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};

use crate::{
    middleware::{make_span_with_request_id, request_id_middleware, require_auth},
    models::Insertion,
    services::IMAGES_ROUTE,
    state::{AppState, HttpSettings},
};

pub mod auth;
pub mod films;
pub mod profile;
pub mod rated;
pub mod watchlist;

/// Creates the application router with all routes
pub fn create_router(state: AppState) -> Router {
    let cors = cors_layer(&state.settings);
    let images = ServeDir::new(state.images.dir());

    Router::new()
        .route("/health", get(health_check))
        .nest("/api", api_routes(state.clone()))
        .nest_service(IMAGES_ROUTE, images)
        .layer(TraceLayer::new_for_http().make_span_with(make_span_with_request_id))
        .layer(middleware::from_fn(request_id_middleware))
        .layer(cors)
        .with_state(state)
}

/// API routes under /api
fn api_routes(state: AppState) -> Router<AppState> {
    let public = Router::new()
        .route("/auth/sign-up", post(auth::sign_up))
        .route("/auth/sign-in", post(auth::sign_in))
        .route("/films/:id_imdb", get(films::get_film))
        .route("/films/:id_imdb/reviews", get(rated::film_reviews));

    let protected = Router::new()
        .route("/auth/me", get(auth::me))
        // Watchlist
        .route("/watchlist", get(watchlist::list).post(watchlist::add))
        .route("/watchlist/:id_imdb", delete(watchlist::remove))
        // Rated films, also reachable under the /ratedFilms alias
        .nest("/rated", rated_routes())
        .nest("/ratedFilms", rated_routes())
        .route("/likes/:user_id/:id_imdb", post(rated::like))
        // Film metadata cache
        .route("/films", post(films::cache_film))
        // Profile
        .route("/userBio", get(profile::get_bio))
        .route("/enter/userBio", post(profile::set_bio))
        .route(
            "/updateProfilePicture",
            post(profile::update_picture)
                .layer(DefaultBodyLimit::max(state.settings.max_upload_bytes)),
        )
        .route_layer(middleware::from_fn_with_state(state, require_auth));

    public.merge(protected)
}

fn rated_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(rated::list).post(rated::create))
        .route(
            "/:id_imdb",
            get(rated::get).put(rated::edit).delete(rated::delete),
        )
}

fn cors_layer(settings: &HttpSettings) -> CorsLayer {
    let Some(origin) = settings.cors_origin.as_deref() else {
        return CorsLayer::permissive();
    };

    match HeaderValue::from_str(origin) {
        Ok(origin) => CorsLayer::new()
            .allow_origin(origin)
            .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
            .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]),
        Err(e) => {
            tracing::warn!(error = %e, origin, "Invalid CORS origin, allowing any origin");
            CorsLayer::permissive()
        }
    }
}

/// 201 for a fresh insert, 200 when the row already existed
pub(crate) fn insertion_response<T: Serialize>(insertion: Insertion<T>) -> (StatusCode, Json<T>) {
    let status = if insertion.is_created() {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    (status, Json(insertion.into_inner()))
}

/// Health check endpoint
async fn health_check() -> (StatusCode, Json<Value>) {
    (StatusCode::OK, Json(json!({ "status": "healthy" })))
}
