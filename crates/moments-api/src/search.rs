use axum::{
    Extension, Json,
    extract::{Query, State},
    response::IntoResponse,
};

use moments_types::api::{NearQuery, SharedQuery};
use moments_types::models::Location;

use crate::error::ApiError;
use crate::middleware::Identity;
use crate::{AppState, blocking};

fn location(q: NearQuery) -> Result<Location, ApiError> {
    Ok(Location::new(q.lat, q.lon)?)
}

/// GET /search/public?lat=&lon=
pub async fn public(
    State(state): State<AppState>,
    Query(q): Query<NearQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let loc = location(q)?;
    let moments = blocking(&state, move |db| db.search_public(loc)).await?;
    Ok(Json(moments))
}

/// GET /search/hidden?lat=&lon=
pub async fn hidden(
    State(state): State<AppState>,
    Query(q): Query<NearQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let loc = location(q)?;
    let moments = blocking(&state, move |db| db.search_hidden(loc)).await?;
    Ok(Json(moments))
}

/// GET /search/lost?lat=&lon=: positions only.
pub async fn lost(
    State(state): State<AppState>,
    Extension(me): Extension<Identity>,
    Query(q): Query<NearQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let loc = location(q)?;
    let pins = blocking(&state, move |db| db.search_lost(&me.user_id, loc)).await?;
    Ok(Json(pins))
}

pub async fn found(
    State(state): State<AppState>,
    Extension(me): Extension<Identity>,
) -> Result<impl IntoResponse, ApiError> {
    let moments = blocking(&state, move |db| db.search_found(&me.user_id)).await?;
    Ok(Json(moments))
}

pub async fn left(
    State(state): State<AppState>,
    Extension(me): Extension<Identity>,
) -> Result<impl IntoResponse, ApiError> {
    let moments = blocking(&state, move |db| db.search_left(&me.user_id)).await?;
    Ok(Json(moments))
}

/// GET /search/shared?from=: what `from` shared with the caller or everyone.
pub async fn shared(
    State(state): State<AppState>,
    Extension(me): Extension<Identity>,
    Query(q): Query<SharedQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let moments = blocking(&state, move |db| db.search_shared(&q.from, &me.user_id)).await?;
    Ok(Json(moments))
}
