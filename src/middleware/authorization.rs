use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::app::AppState;
use crate::auth::AuthDecision;
use crate::error::ApiError;

/// Reject requests whose API key the gate does not accept.
///
/// Granted requests carry the matching [`ApiUser`](crate::auth::ApiUser)
/// in their extensions when a key was checked.
pub async fn authorization_gate(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let key = request
        .headers()
        .get(state.gate.header())
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned);

    match state.gate.check(key.as_deref()).await {
        AuthDecision::Granted(user) => {
            if let Some(user) = user {
                tracing::debug!("Request authorized for user {}", user.id);
                request.extensions_mut().insert(user);
            }
            next.run(request).await
        }
        AuthDecision::Rejected(reason) => {
            tracing::warn!(
                "Rejected {} {}: {}",
                request.method(),
                request.uri().path(),
                reason.message()
            );
            ApiError::unauthorized(reason.message()).into_response()
        }
    }
}
