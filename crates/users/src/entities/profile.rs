use roomcast_database::Account;
use serde::{Deserialize, Serialize};

/// Public view of a user as served by the identity service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub user_id: i64,
    pub username: String,
    #[serde(default)]
    pub profile_pic: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

impl UserProfile {
    /// The stored avatar, or `fallback` when none is set.
    pub fn avatar_or<'a>(&'a self, fallback: &'a str) -> &'a str {
        if self.profile_pic.trim().is_empty() {
            fallback
        } else {
            &self.profile_pic
        }
    }
}

impl From<Account> for UserProfile {
    fn from(account: Account) -> Self {
        Self {
            user_id: account.user_id,
            username: account.username,
            profile_pic: account.profile_pic,
            created_at: Some(account.created_at),
        }
    }
}
