use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use serde_json::json;

use moments_types::api::{
    CountResponse, LeaveMomentRequest, LeaveMomentResponse, MediaBody, MediaDeleteRequest,
    RecipientsRequest, ShareRequest,
};
use moments_types::models::{
    Find, Location, Media, MediaContent, MediaType, Moment, MomentAggregate, MomentId, Share,
};
use moments_types::{ValidationError, validate};

use crate::error::ApiError;
use crate::middleware::Identity;
use crate::{AppState, blocking};

/// POST /moments: the caller leaves a moment, optionally with media and
/// recipients (private or hidden moments only).
pub async fn leave_moment(
    State(state): State<AppState>,
    Extension(me): Extension<Identity>,
    Json(req): Json<LeaveMomentRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let location = req
        .location
        .map(|l| Location::new(l.latitude, l.longitude))
        .transpose()?;
    let location = *validate::location(location.as_ref())?;

    let moment = Moment::new(me.user_id, location, req.public, req.hidden, Utc::now())?;
    let media = req
        .media
        .into_iter()
        .map(|m| MediaContent::new(m.message, m.kind, m.dir))
        .collect::<Result<Vec<_>, _>>()?;
    let recipients = req.recipients;

    let id = blocking(&state, move |db| db.leave_moment(&moment, media, &recipients)).await?;

    Ok((StatusCode::CREATED, Json(LeaveMomentResponse { id })))
}

/// GET /moments/{id}: visible to the sender, to anyone holding a Find on it,
/// and to everyone when public and not hidden.
pub async fn get_moment(
    State(state): State<AppState>,
    Path(id): Path<MomentId>,
    Extension(me): Extension<Identity>,
) -> Result<impl IntoResponse, ApiError> {
    let aggregate = blocking(&state, move |db| db.get_moment(id)).await?;

    let moment = &aggregate.moment;
    let open = moment.is_public() && !moment.is_hidden();
    let addressed = aggregate.finds.iter().any(|f| f.user_id() == me.user_id);
    if !open && !addressed && moment.user_id() != me.user_id {
        return Err(ApiError::not_found(format!("moment {} not found", id)));
    }

    Ok(Json(aggregate))
}

/// DELETE /moments/{id}: sender only.
pub async fn delete_moment(
    State(state): State<AppState>,
    Path(id): Path<MomentId>,
    Extension(me): Extension<Identity>,
) -> Result<impl IntoResponse, ApiError> {
    load_owned(&state, id, &me).await?;
    blocking(&state, move |db| db.delete_moment(id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /moments/{id}/media: sender only.
pub async fn add_media(
    State(state): State<AppState>,
    Path(id): Path<MomentId>,
    Extension(me): Extension<Identity>,
    Json(req): Json<Vec<MediaBody>>,
) -> Result<impl IntoResponse, ApiError> {
    let set = req
        .into_iter()
        .map(|m| Media::new(id, m.message, m.kind, m.dir))
        .collect::<Result<Vec<_>, _>>()?;

    load_owned(&state, id, &me).await?;
    let count = blocking(&state, move |db| db.insert_media(&set)).await?;

    Ok((StatusCode::CREATED, Json(CountResponse { count })))
}

/// DELETE /moments/{id}/media: removes the media of the listed types.
pub async fn remove_media(
    State(state): State<AppState>,
    Path(id): Path<MomentId>,
    Extension(me): Extension<Identity>,
    Json(req): Json<MediaDeleteRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let kinds = req
        .types
        .into_iter()
        .map(MediaType::try_from)
        .collect::<Result<Vec<_>, _>>()?;

    let aggregate = load_owned(&state, id, &me).await?;
    let set = kinds
        .iter()
        .map(|kind| {
            aggregate
                .media
                .iter()
                .find(|m| m.kind() == *kind)
                .cloned()
                .ok_or_else(|| ApiError::not_found(format!("media type {} on moment {}", u8::from(*kind), id)))
        })
        .collect::<Result<Vec<_>, _>>()?;

    let count = blocking(&state, move |db| db.delete_media(&set)).await?;
    Ok(Json(CountResponse { count }))
}

/// POST /moments/{id}/finds: addresses more recipients.
pub async fn add_finds(
    State(state): State<AppState>,
    Path(id): Path<MomentId>,
    Extension(me): Extension<Identity>,
    Json(req): Json<RecipientsRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let set = req
        .recipients
        .iter()
        .map(|user| Find::pending(id, user.as_str()))
        .collect::<Result<Vec<_>, _>>()?;

    let aggregate = load_owned(&state, id, &me).await?;
    if !aggregate.moment.is_targeted() {
        return Err(ValidationError::RecipientsOnOpenMoment.into());
    }

    let count = blocking(&state, move |db| db.insert_finds(&set)).await?;
    Ok((StatusCode::CREATED, Json(CountResponse { count })))
}

/// DELETE /moments/{id}/finds: withdraws recipients.
pub async fn remove_finds(
    State(state): State<AppState>,
    Path(id): Path<MomentId>,
    Extension(me): Extension<Identity>,
    Json(req): Json<RecipientsRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let aggregate = load_owned(&state, id, &me).await?;
    let set = req
        .recipients
        .iter()
        .map(|user| {
            aggregate
                .finds
                .iter()
                .find(|f| f.user_id() == user.as_str())
                .cloned()
                .ok_or_else(|| ApiError::not_found(format!("find for {} on moment {}", user, id)))
        })
        .collect::<Result<Vec<_>, _>>()?;

    let count = blocking(&state, move |db| db.delete_finds(&set)).await?;
    Ok(Json(CountResponse { count }))
}

/// POST /moments/{id}/found: the caller marks their Find as found.
pub async fn mark_found(
    State(state): State<AppState>,
    Path(id): Path<MomentId>,
    Extension(me): Extension<Identity>,
) -> Result<impl IntoResponse, ApiError> {
    let find_date = blocking(&state, move |db| db.mark_found(id, &me.user_id)).await?;
    Ok(Json(json!({ "momentId": id, "findDate": find_date })))
}

/// POST /moments/{id}/shares: the caller, as finder, shares the moment.
pub async fn share(
    State(state): State<AppState>,
    Path(id): Path<MomentId>,
    Extension(me): Extension<Identity>,
    Json(req): Json<ShareRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let set = shares_from(id, &me, req)?;
    let count = blocking(&state, move |db| db.insert_shares(&set)).await?;
    Ok((StatusCode::CREATED, Json(CountResponse { count })))
}

/// DELETE /moments/{id}/shares: withdraws the caller's shares.
pub async fn unshare(
    State(state): State<AppState>,
    Path(id): Path<MomentId>,
    Extension(me): Extension<Identity>,
    Json(req): Json<ShareRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let set = shares_from(id, &me, req)?;
    let count = blocking(&state, move |db| db.delete_shares(&set)).await?;
    Ok(Json(CountResponse { count }))
}

fn shares_from(id: MomentId, me: &Identity, req: ShareRequest) -> Result<Vec<Share>, ValidationError> {
    if req.all {
        if !req.recipients.is_empty() {
            return Err(ValidationError::ShareAllHasRecipient);
        }
        return Ok(vec![Share::with_everyone(id, me.user_id.as_str())?]);
    }
    if req.recipients.is_empty() {
        return Err(ValidationError::ShareMissingRecipient);
    }
    req.recipients
        .into_iter()
        .map(|recipient| Share::new(id, me.user_id.as_str(), false, recipient))
        .collect()
}

/// Loads the moment and checks the caller is its sender.
async fn load_owned(state: &AppState, id: MomentId, me: &Identity) -> Result<MomentAggregate, ApiError> {
    let aggregate = blocking(state, move |db| db.get_moment(id)).await?;
    if aggregate.moment.user_id() != me.user_id {
        return Err(ApiError::forbidden(format!("moment {} belongs to another user", id)));
    }
    Ok(aggregate)
}
