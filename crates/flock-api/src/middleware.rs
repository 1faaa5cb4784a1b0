use axum::extract::{Request, State};
use axum::http::header;
use axum::middleware::Next;
use axum::response::Response;

use crate::auth::AppState;
use crate::error::ApiError;
use crate::token;

/// Session gate: extract and validate the bearer token, then attach the
/// decoded identity to the request for downstream handlers. Every request
/// is authenticated independently — there is no session store.
pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let header = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or(ApiError::MissingCredential)?;

    let raw = header.strip_prefix("Bearer ").unwrap_or(header);

    let claims = token::verify(&state.jwt_secret, raw).map_err(|_| ApiError::InvalidToken)?;

    req.extensions_mut().insert(claims);
    Ok(next.run(req).await)
}
