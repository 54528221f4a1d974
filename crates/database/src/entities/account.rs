//! Account entity definitions

use serde::{Deserialize, Serialize};

/// Profile view of an account row. Credentials live with the identity service
/// and are never loaded here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub user_id: i64,
    pub username: String,
    pub profile_pic: String,
    pub created_at: String,
}
