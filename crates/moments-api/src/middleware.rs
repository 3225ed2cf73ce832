use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::headers::{Authorization, HeaderMapExt, authorization::Bearer};
use jsonwebtoken::{DecodingKey, Validation, decode};
use tracing::debug;

use moments_types::api::Claims;
use moments_types::validate;

use crate::AppState;

/// The caller as established by the identity service.
#[derive(Debug, Clone)]
pub struct Identity {
    pub user_id: String,
}

/// Validate the bearer JWT; anything missing or invalid is sent to the
/// identity service instead of reaching a handler.
pub async fn require_identity(State(state): State<AppState>, mut req: Request, next: Next) -> Response {
    let Some(identity) = identify(&req, &state.jwt_secret) else {
        debug!("Unauthenticated request to {}, redirecting", req.uri().path());
        return Redirect::to(&state.identity_url).into_response();
    };

    req.extensions_mut().insert(identity);
    next.run(req).await
}

fn identify(req: &Request, secret: &str) -> Option<Identity> {
    let bearer = req.headers().typed_get::<Authorization<Bearer>>()?;

    let token_data = decode::<Claims>(
        bearer.token(),
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .ok()?;

    let user_id = token_data.claims.sub;
    validate::user_id(&user_id).ok()?;
    Some(Identity { user_id })
}
