//! WebSocket endpoint admitting connections into rooms.

pub mod connection;

use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    response::Response,
    routing::get,
    Router,
};
use futures_util::{SinkExt, StreamExt};
use roomcast_chats::Member;
use roomcast_users::UserProfile;
use serde::Deserialize;
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::error::{GatewayError, GatewayResult};
use crate::state::GatewayState;
use connection::{run_connection, ConnectionSettings, Session};

pub fn create_websocket_routes() -> Router<Arc<GatewayState>> {
    Router::new().route("/ws", get(connect_handler))
}

#[derive(Debug, Deserialize)]
pub struct ConnectQuery {
    room_id: Option<i64>,
    #[serde(rename = "authToken")]
    auth_token: Option<String>,
}

/// Authenticates the caller and authorises the room before upgrading; any
/// failure answers with a plain HTTP error and no socket is opened.
pub async fn connect_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<GatewayState>>,
    Query(query): Query<ConnectQuery>,
) -> GatewayResult<Response> {
    let room_id = query
        .room_id
        .ok_or_else(|| GatewayError::InvalidRequest("missing room_id".to_string()))?;
    let token = query
        .auth_token
        .filter(|token| !token.is_empty())
        .ok_or_else(|| GatewayError::AuthenticationFailed("missing authToken".to_string()))?;

    let profile = authenticate(&state, &token).await?;
    state.rooms.join_room(room_id).await?;

    let settings = ConnectionSettings::from(&state.chat);
    Ok(ws
        .max_message_size(settings.max_message_size)
        .on_upgrade(move |socket| handle_socket(socket, state, room_id, profile, settings)))
}

async fn authenticate(state: &GatewayState, token: &str) -> GatewayResult<UserProfile> {
    let user_id = state
        .identity
        .validate_session(token)
        .await
        .map_err(|e| GatewayError::AuthenticationFailed(format!("invalid token: {e}")))?;

    let profile = state
        .identity
        .get_user_info(token)
        .await
        .map_err(|e| GatewayError::AuthenticationFailed(format!("unknown user: {e}")))?;

    if profile.user_id != user_id {
        warn!(session_user = user_id, profile_user = profile.user_id, "session and profile disagree");
        return Err(GatewayError::AuthenticationFailed(
            "session does not match user".to_string(),
        ));
    }

    Ok(profile)
}

async fn handle_socket(
    socket: WebSocket,
    state: Arc<GatewayState>,
    room_id: i64,
    profile: UserProfile,
    settings: ConnectionSettings,
) {
    let (mut sink, stream) = socket.split();
    let (outbound_tx, outbound_rx) = mpsc::channel(state.chat.outbound_queue_capacity);
    let member = Member::new(profile.clone(), outbound_tx);
    let member_id = member.id;
    let user_id = profile.user_id;

    let hub = match state.rooms.join(room_id, member).await {
        Ok(hub) => hub,
        Err(error) => {
            warn!(room_id, user_id, %error, "could not join room after upgrade");
            let _ = sink.send(Message::Close(None)).await;
            return;
        }
    };

    info!(room_id, user_id, connection = %member_id, "connection joined room");

    let session = Session {
        room_id,
        member_id,
        author: profile,
        hub,
        messages: state.messages.clone(),
    };
    run_connection(sink, stream, session, outbound_rx, settings).await;

    info!(room_id, user_id, connection = %member_id, "connection closed");
}
