//! Account lookups served in the identity envelope format.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use roomcast_users::{UserError, ACCESS_TOKEN_HEADER};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{GatewayError, GatewayResult};
use crate::state::GatewayState;

/// `{"err": "...", "data": ...}`; `err` is empty on success.
#[derive(Debug, Serialize)]
pub struct Envelope<T> {
    pub err: String,
    pub data: Option<T>,
}

impl<T: Serialize> Envelope<T> {
    fn ok(data: T) -> Self {
        Self {
            err: String::new(),
            data: Some(data),
        }
    }
}

impl Envelope<()> {
    fn error(message: impl Into<String>) -> Self {
        Self {
            err: message.into(),
            data: None,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ProfilePicRequest {
    pub profile_pic: String,
}

/// Read through the account cache.
pub async fn get_account(
    State(state): State<Arc<GatewayState>>,
    Path(user_id): Path<i64>,
) -> GatewayResult<Response> {
    match state.accounts.find_by_id(user_id).await {
        Ok(entry) => {
            debug!(user_id, provenance = ?entry.provenance, "account served");
            Ok(Json(Envelope::ok(entry.value)).into_response())
        }
        Err(UserError::NotFound(_)) => Ok((
            StatusCode::NOT_FOUND,
            Json(Envelope::error("User not found")),
        )
            .into_response()),
        Err(other) => Err(other.into()),
    }
}

/// Only the session's own account may be changed. Writes go straight to the
/// store; a cached copy ages out on its own.
pub async fn update_profile_pic(
    State(state): State<Arc<GatewayState>>,
    Path(user_id): Path<i64>,
    headers: HeaderMap,
    Json(request): Json<ProfilePicRequest>,
) -> GatewayResult<Json<Envelope<()>>> {
    let session_user = session_user(&state, &headers).await?;
    if session_user != user_id {
        warn!(session_user, user_id, "refusing to update another user's profile picture");
        return Err(GatewayError::Forbidden(format!(
            "session cannot modify user {user_id}"
        )));
    }

    state
        .accounts
        .update_profile_pic(user_id, request.profile_pic.trim())
        .await?;
    Ok(Json(Envelope {
        err: String::new(),
        data: None,
    }))
}

async fn session_user(state: &GatewayState, headers: &HeaderMap) -> GatewayResult<i64> {
    let token = headers
        .get(ACCESS_TOKEN_HEADER)
        .and_then(|value| value.to_str().ok())
        .filter(|token| !token.is_empty())
        .ok_or_else(|| {
            GatewayError::AuthenticationFailed(format!("missing {ACCESS_TOKEN_HEADER} header"))
        })?;

    state
        .identity
        .validate_session(token)
        .await
        .map_err(|e| GatewayError::AuthenticationFailed(format!("invalid token: {e}")))
}
