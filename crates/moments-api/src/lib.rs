pub mod error;
pub mod middleware;
pub mod moments;
pub mod search;

use std::sync::Arc;

use axum::{
    Extension, Json, Router,
    response::IntoResponse,
    routing::{get, post},
};
use serde_json::json;
use tracing::error;

use moments_db::Database;

use crate::error::ApiError;
use crate::middleware::{Identity, require_identity};

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
    pub jwt_secret: String,
    /// Where unauthenticated requests are redirected.
    pub identity_url: String,
}

/// Every route sits behind [`require_identity`].
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/home", get(home))
        .route("/moments", post(moments::leave_moment))
        .route(
            "/moments/{id}",
            get(moments::get_moment).delete(moments::delete_moment),
        )
        .route(
            "/moments/{id}/media",
            post(moments::add_media).delete(moments::remove_media),
        )
        .route(
            "/moments/{id}/finds",
            post(moments::add_finds).delete(moments::remove_finds),
        )
        .route("/moments/{id}/found", post(moments::mark_found))
        .route(
            "/moments/{id}/shares",
            post(moments::share).delete(moments::unshare),
        )
        .route("/search/public", get(search::public))
        .route("/search/hidden", get(search::hidden))
        .route("/search/lost", get(search::lost))
        .route("/search/found", get(search::found))
        .route("/search/left", get(search::left))
        .route("/search/shared", get(search::shared))
        .layer(axum::middleware::from_fn_with_state(state.clone(), require_identity))
        .with_state(state)
}

async fn home(Extension(me): Extension<Identity>) -> impl IntoResponse {
    Json(json!({ "message": format!("Welcome to Moments, {}", me.user_id) }))
}

/// Run a blocking database call off the async runtime.
pub(crate) async fn blocking<F, T>(state: &AppState, f: F) -> Result<T, ApiError>
where
    F: FnOnce(&Database) -> moments_db::Result<T> + Send + 'static,
    T: Send + 'static,
{
    let state = state.clone();
    tokio::task::spawn_blocking(move || f(&state.db))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            ApiError::internal()
        })?
        .map_err(ApiError::from)
}
