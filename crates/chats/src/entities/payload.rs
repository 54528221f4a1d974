use roomcast_users::UserProfile;
use serde::{Deserialize, Serialize};

/// One chat line as delivered to clients and carried over the bus.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatPayload {
    pub user_id: i64,
    pub username: String,
    pub profile_pic: String,
    pub msg: String,
}

impl ChatPayload {
    pub fn from_profile(profile: &UserProfile, msg: impl Into<String>, default_avatar: &str) -> Self {
        Self {
            user_id: profile.user_id,
            username: profile.username.clone(),
            profile_pic: profile.avatar_or(default_avatar).to_string(),
            msg: msg.into(),
        }
    }
}

/// Join-time replay frame, sent only to the connection that just joined.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryBatch {
    pub chats: Vec<ChatPayload>,
}
